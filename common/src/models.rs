use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use uuid::Uuid;

use crate::utils::{AchievementCategory, Category, Difficulty};

/// Stored in `profiles.preferences` as JSONB.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Preferences {
    pub difficulty: String,
    pub categories: Vec<Category>,
    pub notifications: bool,
    pub email_notifications: bool,
    pub dark_mode: bool,
}

impl Default for Preferences {
    fn default() -> Self {
        Preferences {
            difficulty: "adaptive".to_string(),
            categories: vec![
                Category::Logic,
                Category::Memory,
                Category::Riddle,
                Category::Puzzle,
            ],
            notifications: true,
            email_notifications: true,
            dark_mode: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Profile {
    pub id: Uuid, // matches the auth user id
    pub username: Option<String>,
    pub full_name: Option<String>,
    pub avatar_url: Option<String>,
    pub level: i32,
    pub total_points: i32,
    pub current_streak: i32,
    pub longest_streak: i32,
    pub last_active: Option<DateTime<Utc>>,
    pub preferences: Json<Preferences>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Profile {
    /// A fresh profile as the sign-up trigger creates it.
    pub fn new(id: Uuid, username: Option<String>, now: DateTime<Utc>) -> Profile {
        Profile {
            id,
            username,
            full_name: None,
            avatar_url: None,
            level: 1,
            total_points: 0,
            current_streak: 0,
            longest_streak: 0,
            last_active: Some(now),
            preferences: Json(Preferences::default()),
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Challenge {
    pub id: i32,
    pub title: String,
    pub description: String,
    pub category: Category,
    #[serde(rename = "type")]
    #[sqlx(rename = "type")]
    pub challenge_type: Category,
    pub difficulty: Difficulty,
    pub points: i32,
    pub estimated_time: i32, // minutes
    pub question: String,
    pub content: Option<String>,
    pub hint: Option<String>,
    #[serde(default, skip_serializing)]
    pub answer: String,
    pub options: Option<Json<Vec<String>>>,
    pub is_daily: bool,
    pub daily_date: Option<NaiveDate>,
}

impl Challenge {
    pub fn check_answer(&self, answer: &str) -> bool {
        answer.trim().to_lowercase() == self.answer.trim().to_lowercase()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct UserChallenge {
    pub id: i32,
    pub user_id: Uuid,
    pub challenge_id: i32,
    pub completed: bool,
    pub points_earned: i32,
    pub attempts: i32,
    pub time_spent: Option<i32>, // seconds
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewUserChallenge {
    pub user_id: Uuid,
    pub challenge_id: i32,
    pub points_earned: i32,
    pub time_spent: Option<i32>,
    pub completed_at: DateTime<Utc>,
}

/// A completion row joined with the challenge it refers to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletedChallenge {
    #[serde(flatten)]
    pub record: UserChallenge,
    pub challenge: Challenge,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Achievement {
    pub id: i32,
    pub code: String,
    pub name: String,
    pub description: String,
    pub icon: String,
    pub category: AchievementCategory,
    pub points: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct UserAchievement {
    pub id: i32,
    pub user_id: Uuid,
    pub achievement_id: i32,
    pub earned_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EarnedAchievement {
    #[serde(flatten)]
    pub record: UserAchievement,
    pub achievement: Achievement,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct StreakLog {
    pub id: i32,
    pub user_id: Uuid,
    pub streak_date: NaiveDate,
    pub created_at: DateTime<Utc>,
}
