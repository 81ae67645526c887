use std::collections::HashMap;

use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{postgres::PgPoolOptions, types::Json, PgPool};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    models::{
        Achievement, Challenge, CompletedChallenge, EarnedAchievement, NewUserChallenge,
        Preferences, Profile, StreakLog, UserAchievement, UserChallenge,
    },
    store::ProgressStore,
};

pub async fn establish_connection(database_url: &str) -> anyhow::Result<PgPool> {
    info!("Connecting to the progress database");

    PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await
        .context("Failed to create pool")
}

/// `ProgressStore` backed by the hosted Postgres schema
/// (profiles, challenges, user_challenges, achievements, user_achievements,
/// streak_logs). One statement per call.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProgressStore for PgStore {
    async fn get_profile(&self, user_id: Uuid) -> anyhow::Result<Option<Profile>> {
        let profile = sqlx::query_as("SELECT * FROM profiles WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .context("Error fetching profile")?;

        Ok(profile)
    }

    async fn create_profile(
        &self,
        user_id: Uuid,
        username: Option<String>,
    ) -> anyhow::Result<Profile> {
        let profile = sqlx::query_as(
            "INSERT INTO profiles (id, username, preferences) VALUES ($1, $2, $3) RETURNING *",
        )
        .bind(user_id)
        .bind(username)
        .bind(Json(Preferences::default()))
        .fetch_one(&self.pool)
        .await
        .context("Error creating profile")?;

        Ok(profile)
    }

    async fn update_points(
        &self,
        user_id: Uuid,
        total_points: i32,
        level: i32,
    ) -> anyhow::Result<()> {
        sqlx::query(
            "UPDATE profiles SET total_points = $1, level = $2, updated_at = NOW() WHERE id = $3",
        )
        .bind(total_points)
        .bind(level)
        .bind(user_id)
        .execute(&self.pool)
        .await
        .context("Error updating profile points")?;

        Ok(())
    }

    async fn update_streak(
        &self,
        user_id: Uuid,
        current_streak: i32,
        longest_streak: i32,
        last_active: DateTime<Utc>,
    ) -> anyhow::Result<()> {
        sqlx::query(
            "UPDATE profiles SET current_streak = $1, longest_streak = $2, last_active = $3, \
             updated_at = NOW() WHERE id = $4",
        )
        .bind(current_streak)
        .bind(longest_streak)
        .bind(last_active)
        .bind(user_id)
        .execute(&self.pool)
        .await
        .context("Error updating profile streak")?;

        Ok(())
    }

    async fn update_preferences(
        &self,
        user_id: Uuid,
        preferences: &Preferences,
    ) -> anyhow::Result<()> {
        sqlx::query("UPDATE profiles SET preferences = $1, updated_at = NOW() WHERE id = $2")
            .bind(Json(preferences))
            .bind(user_id)
            .execute(&self.pool)
            .await
            .context("Error updating preferences")?;

        Ok(())
    }

    async fn reset_profile(&self, user_id: Uuid) -> anyhow::Result<()> {
        sqlx::query(
            "UPDATE profiles SET level = 1, total_points = 0, current_streak = 0, \
             longest_streak = 0, updated_at = NOW() WHERE id = $1",
        )
        .bind(user_id)
        .execute(&self.pool)
        .await
        .context("Error resetting profile")?;

        Ok(())
    }

    async fn list_challenges(&self) -> anyhow::Result<Vec<Challenge>> {
        let challenges = sqlx::query_as("SELECT * FROM challenges ORDER BY id ASC")
            .fetch_all(&self.pool)
            .await
            .context("Error fetching challenges")?;

        Ok(challenges)
    }

    async fn get_challenge(&self, challenge_id: i32) -> anyhow::Result<Option<Challenge>> {
        let challenge = sqlx::query_as("SELECT * FROM challenges WHERE id = $1")
            .bind(challenge_id)
            .fetch_optional(&self.pool)
            .await
            .context("Error fetching challenge")?;

        Ok(challenge)
    }

    async fn find_daily_challenge(&self, date: NaiveDate) -> anyhow::Result<Option<Challenge>> {
        let challenge = sqlx::query_as(
            "SELECT * FROM challenges WHERE is_daily = TRUE AND daily_date = $1 LIMIT 1",
        )
        .bind(date)
        .fetch_optional(&self.pool)
        .await
        .context("Error fetching daily challenge")?;

        Ok(challenge)
    }

    async fn clear_daily_flags(&self) -> anyhow::Result<()> {
        sqlx::query("UPDATE challenges SET is_daily = FALSE WHERE is_daily = TRUE")
            .execute(&self.pool)
            .await
            .context("Error clearing daily flags")?;

        Ok(())
    }

    async fn mark_daily(&self, challenge_id: i32, date: NaiveDate) -> anyhow::Result<()> {
        sqlx::query("UPDATE challenges SET is_daily = TRUE, daily_date = $1 WHERE id = $2")
            .bind(date)
            .bind(challenge_id)
            .execute(&self.pool)
            .await
            .context("Error marking daily challenge")?;

        Ok(())
    }

    async fn find_user_challenge(
        &self,
        user_id: Uuid,
        challenge_id: i32,
    ) -> anyhow::Result<Option<UserChallenge>> {
        let row = sqlx::query_as(
            "SELECT * FROM user_challenges WHERE user_id = $1 AND challenge_id = $2",
        )
        .bind(user_id)
        .bind(challenge_id)
        .fetch_optional(&self.pool)
        .await
        .context("Error fetching user challenge")?;

        Ok(row)
    }

    async fn insert_user_challenge(&self, row: NewUserChallenge) -> anyhow::Result<()> {
        sqlx::query(
            "INSERT INTO user_challenges \
             (user_id, challenge_id, completed, points_earned, attempts, time_spent, completed_at) \
             VALUES ($1, $2, TRUE, $3, 1, $4, $5)",
        )
        .bind(row.user_id)
        .bind(row.challenge_id)
        .bind(row.points_earned)
        .bind(row.time_spent)
        .bind(row.completed_at)
        .execute(&self.pool)
        .await
        .context("Error inserting user challenge")?;

        Ok(())
    }

    async fn update_user_challenge(
        &self,
        id: i32,
        points_earned: i32,
        attempts: i32,
        time_spent: Option<i32>,
        completed_at: DateTime<Utc>,
    ) -> anyhow::Result<()> {
        sqlx::query(
            "UPDATE user_challenges SET completed = TRUE, points_earned = $1, attempts = $2, \
             time_spent = COALESCE($3, time_spent), completed_at = $4 WHERE id = $5",
        )
        .bind(points_earned)
        .bind(attempts)
        .bind(time_spent)
        .bind(completed_at)
        .bind(id)
        .execute(&self.pool)
        .await
        .context("Error updating user challenge")?;

        Ok(())
    }

    async fn list_completed_challenges(
        &self,
        user_id: Uuid,
    ) -> anyhow::Result<Vec<CompletedChallenge>> {
        let rows: Vec<UserChallenge> = sqlx::query_as(
            "SELECT * FROM user_challenges WHERE user_id = $1 AND completed = TRUE \
             ORDER BY completed_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .context("Error fetching completed challenges")?;

        let ids: Vec<i32> = rows.iter().map(|r| r.challenge_id).collect();
        let challenges: Vec<Challenge> =
            sqlx::query_as("SELECT * FROM challenges WHERE id = ANY($1)")
                .bind(ids)
                .fetch_all(&self.pool)
                .await
                .context("Error fetching completed challenge definitions")?;
        let by_id: HashMap<i32, Challenge> = challenges.into_iter().map(|c| (c.id, c)).collect();

        Ok(rows
            .into_iter()
            .filter_map(|record| match by_id.get(&record.challenge_id) {
                Some(challenge) => Some(CompletedChallenge {
                    challenge: challenge.clone(),
                    record,
                }),
                None => {
                    warn!("Challenge {} no longer exists", record.challenge_id);
                    None
                }
            })
            .collect())
    }

    async fn delete_user_challenges(&self, user_id: Uuid) -> anyhow::Result<()> {
        sqlx::query("DELETE FROM user_challenges WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await
            .context("Error deleting user challenges")?;

        Ok(())
    }

    async fn list_achievements(&self) -> anyhow::Result<Vec<Achievement>> {
        let achievements = sqlx::query_as("SELECT * FROM achievements ORDER BY id ASC")
            .fetch_all(&self.pool)
            .await
            .context("Error fetching achievements")?;

        Ok(achievements)
    }

    async fn list_earned_achievements(
        &self,
        user_id: Uuid,
    ) -> anyhow::Result<Vec<EarnedAchievement>> {
        let rows: Vec<UserAchievement> = sqlx::query_as(
            "SELECT * FROM user_achievements WHERE user_id = $1 ORDER BY earned_at ASC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .context("Error fetching user achievements")?;

        let by_id: HashMap<i32, Achievement> = self
            .list_achievements()
            .await?
            .into_iter()
            .map(|a| (a.id, a))
            .collect();

        Ok(rows
            .into_iter()
            .filter_map(|record| {
                by_id.get(&record.achievement_id).map(|achievement| EarnedAchievement {
                    achievement: achievement.clone(),
                    record,
                })
            })
            .collect())
    }

    async fn insert_user_achievements(
        &self,
        user_id: Uuid,
        achievement_ids: &[i32],
    ) -> anyhow::Result<()> {
        sqlx::query(
            "INSERT INTO user_achievements (user_id, achievement_id) \
             SELECT $1, UNNEST($2::int4[])",
        )
        .bind(user_id)
        .bind(achievement_ids)
        .execute(&self.pool)
        .await
        .context("Error inserting user achievements")?;

        Ok(())
    }

    async fn delete_user_achievements(&self, user_id: Uuid) -> anyhow::Result<()> {
        sqlx::query("DELETE FROM user_achievements WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await
            .context("Error deleting user achievements")?;

        Ok(())
    }

    async fn find_streak_log(
        &self,
        user_id: Uuid,
        date: NaiveDate,
    ) -> anyhow::Result<Option<StreakLog>> {
        let log = sqlx::query_as(
            "SELECT * FROM streak_logs WHERE user_id = $1 AND streak_date = $2",
        )
        .bind(user_id)
        .bind(date)
        .fetch_optional(&self.pool)
        .await
        .context("Error fetching streak log")?;

        Ok(log)
    }

    async fn insert_streak_log(&self, user_id: Uuid, date: NaiveDate) -> anyhow::Result<()> {
        sqlx::query("INSERT INTO streak_logs (user_id, streak_date) VALUES ($1, $2)")
            .bind(user_id)
            .bind(date)
            .execute(&self.pool)
            .await
            .context("Error inserting streak log")?;

        Ok(())
    }

    async fn list_streak_dates(&self, user_id: Uuid) -> anyhow::Result<Vec<NaiveDate>> {
        let dates: Vec<(NaiveDate,)> = sqlx::query_as(
            "SELECT streak_date FROM streak_logs WHERE user_id = $1 ORDER BY streak_date DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .context("Error fetching streak logs")?;

        Ok(dates.into_iter().map(|(date,)| date).collect())
    }

    async fn delete_streak_logs(&self, user_id: Uuid) -> anyhow::Result<()> {
        sqlx::query("DELETE FROM streak_logs WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await
            .context("Error deleting streak logs")?;

        Ok(())
    }
}
