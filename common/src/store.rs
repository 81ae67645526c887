//! Port between the progress logic and whatever holds durable state.
//!
//! Each method maps onto a single row-level operation against one table.
//! Nothing here is transactional: callers sequence these calls and live
//! with partial writes when one of them fails.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::models::{
    Achievement, Challenge, CompletedChallenge, EarnedAchievement, NewUserChallenge, Preferences,
    Profile, StreakLog, UserChallenge,
};

#[async_trait]
pub trait ProgressStore: Send + Sync {
    // profiles
    async fn get_profile(&self, user_id: Uuid) -> anyhow::Result<Option<Profile>>;
    async fn create_profile(&self, user_id: Uuid, username: Option<String>)
        -> anyhow::Result<Profile>;
    async fn update_points(&self, user_id: Uuid, total_points: i32, level: i32)
        -> anyhow::Result<()>;
    async fn update_streak(
        &self,
        user_id: Uuid,
        current_streak: i32,
        longest_streak: i32,
        last_active: DateTime<Utc>,
    ) -> anyhow::Result<()>;
    async fn update_preferences(&self, user_id: Uuid, preferences: &Preferences)
        -> anyhow::Result<()>;
    async fn reset_profile(&self, user_id: Uuid) -> anyhow::Result<()>;

    // challenges
    async fn list_challenges(&self) -> anyhow::Result<Vec<Challenge>>;
    async fn get_challenge(&self, challenge_id: i32) -> anyhow::Result<Option<Challenge>>;
    async fn find_daily_challenge(&self, date: NaiveDate) -> anyhow::Result<Option<Challenge>>;
    async fn clear_daily_flags(&self) -> anyhow::Result<()>;
    async fn mark_daily(&self, challenge_id: i32, date: NaiveDate) -> anyhow::Result<()>;

    // user_challenges
    async fn find_user_challenge(
        &self,
        user_id: Uuid,
        challenge_id: i32,
    ) -> anyhow::Result<Option<UserChallenge>>;
    async fn insert_user_challenge(&self, row: NewUserChallenge) -> anyhow::Result<()>;
    async fn update_user_challenge(
        &self,
        id: i32,
        points_earned: i32,
        attempts: i32,
        time_spent: Option<i32>,
        completed_at: DateTime<Utc>,
    ) -> anyhow::Result<()>;
    async fn list_completed_challenges(
        &self,
        user_id: Uuid,
    ) -> anyhow::Result<Vec<CompletedChallenge>>;
    async fn delete_user_challenges(&self, user_id: Uuid) -> anyhow::Result<()>;

    // achievements, user_achievements
    async fn list_achievements(&self) -> anyhow::Result<Vec<Achievement>>;
    async fn list_earned_achievements(&self, user_id: Uuid)
        -> anyhow::Result<Vec<EarnedAchievement>>;
    async fn insert_user_achievements(&self, user_id: Uuid, achievement_ids: &[i32])
        -> anyhow::Result<()>;
    async fn delete_user_achievements(&self, user_id: Uuid) -> anyhow::Result<()>;

    // streak_logs
    async fn find_streak_log(&self, user_id: Uuid, date: NaiveDate)
        -> anyhow::Result<Option<StreakLog>>;
    async fn insert_streak_log(&self, user_id: Uuid, date: NaiveDate) -> anyhow::Result<()>;
    /// Most recent first.
    async fn list_streak_dates(&self, user_id: Uuid) -> anyhow::Result<Vec<NaiveDate>>;
    async fn delete_streak_logs(&self, user_id: Uuid) -> anyhow::Result<()>;
}
