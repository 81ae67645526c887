//! In-process `ProgressStore` used for local development (`serve --memory`)
//! and as the fake store in tests.
//!
//! Enforces the same unique constraints as the hosted schema and can be told
//! to fail a named operation, which is how tests exercise partial writes.

use std::{
    collections::{HashMap, HashSet},
    sync::{Mutex, MutexGuard, PoisonError},
};

use anyhow::{anyhow, bail};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::types::Json;
use uuid::Uuid;

use crate::{
    catalog,
    models::{
        Achievement, Challenge, CompletedChallenge, EarnedAchievement, NewUserChallenge,
        Preferences, Profile, StreakLog, UserAchievement, UserChallenge,
    },
    store::ProgressStore,
};

#[derive(Default)]
struct Tables {
    profiles: HashMap<Uuid, Profile>,
    challenges: Vec<Challenge>,
    user_challenges: Vec<UserChallenge>,
    achievements: Vec<Achievement>,
    user_achievements: Vec<UserAchievement>,
    streak_logs: Vec<StreakLog>,
    next_id: i32,
    failing: HashSet<String>,
}

impl Tables {
    fn check(&self, op: &str) -> anyhow::Result<()> {
        if self.failing.contains(op) {
            bail!("{op} failed: store unavailable");
        }
        Ok(())
    }

    fn next_id(&mut self) -> i32 {
        self.next_id += 1;
        self.next_id
    }

    fn profile_mut(&mut self, user_id: Uuid) -> Option<&mut Profile> {
        self.profiles.get_mut(&user_id)
    }
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store holding the seed challenge and achievement catalog.
    pub fn seeded() -> Self {
        Self::with_catalog(catalog::seed_challenges(), catalog::seed_achievements())
    }

    pub fn with_catalog(challenges: Vec<Challenge>, achievements: Vec<Achievement>) -> Self {
        let store = Self::new();
        {
            let mut tables = store.lock();
            tables.challenges = challenges;
            tables.achievements = achievements;
        }
        store
    }

    /// Make every subsequent call to `op` (a `ProgressStore` method name) fail.
    pub fn fail_on(&self, op: &str) {
        self.lock().failing.insert(op.to_string());
    }

    pub fn recover(&self, op: &str) {
        self.lock().failing.remove(op);
    }

    /// Insert or replace a profile row as-is.
    pub fn put_profile(&self, profile: Profile) {
        self.lock().profiles.insert(profile.id, profile);
    }

    pub fn user_challenge_count(&self, user_id: Uuid) -> usize {
        self.lock()
            .user_challenges
            .iter()
            .filter(|r| r.user_id == user_id)
            .count()
    }

    pub fn daily_flag_count(&self) -> usize {
        self.lock().challenges.iter().filter(|c| c.is_daily).count()
    }

    fn lock(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl ProgressStore for MemoryStore {
    async fn get_profile(&self, user_id: Uuid) -> anyhow::Result<Option<Profile>> {
        let tables = self.lock();
        tables.check("get_profile")?;
        Ok(tables.profiles.get(&user_id).cloned())
    }

    async fn create_profile(
        &self,
        user_id: Uuid,
        username: Option<String>,
    ) -> anyhow::Result<Profile> {
        let mut tables = self.lock();
        tables.check("create_profile")?;
        if tables.profiles.contains_key(&user_id) {
            bail!("duplicate key value violates unique constraint \"profiles_pkey\"");
        }
        let profile = Profile::new(user_id, username, Utc::now());
        tables.profiles.insert(user_id, profile.clone());
        Ok(profile)
    }

    async fn update_points(
        &self,
        user_id: Uuid,
        total_points: i32,
        level: i32,
    ) -> anyhow::Result<()> {
        let mut tables = self.lock();
        tables.check("update_points")?;
        if let Some(profile) = tables.profile_mut(user_id) {
            profile.total_points = total_points;
            profile.level = level;
            profile.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn update_streak(
        &self,
        user_id: Uuid,
        current_streak: i32,
        longest_streak: i32,
        last_active: DateTime<Utc>,
    ) -> anyhow::Result<()> {
        let mut tables = self.lock();
        tables.check("update_streak")?;
        if let Some(profile) = tables.profile_mut(user_id) {
            profile.current_streak = current_streak;
            profile.longest_streak = longest_streak;
            profile.last_active = Some(last_active);
            profile.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn update_preferences(
        &self,
        user_id: Uuid,
        preferences: &Preferences,
    ) -> anyhow::Result<()> {
        let mut tables = self.lock();
        tables.check("update_preferences")?;
        if let Some(profile) = tables.profile_mut(user_id) {
            profile.preferences = Json(preferences.clone());
            profile.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn reset_profile(&self, user_id: Uuid) -> anyhow::Result<()> {
        let mut tables = self.lock();
        tables.check("reset_profile")?;
        if let Some(profile) = tables.profile_mut(user_id) {
            profile.level = 1;
            profile.total_points = 0;
            profile.current_streak = 0;
            profile.longest_streak = 0;
            profile.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn list_challenges(&self) -> anyhow::Result<Vec<Challenge>> {
        let tables = self.lock();
        tables.check("list_challenges")?;
        let mut challenges = tables.challenges.clone();
        challenges.sort_by_key(|c| c.id);
        Ok(challenges)
    }

    async fn get_challenge(&self, challenge_id: i32) -> anyhow::Result<Option<Challenge>> {
        let tables = self.lock();
        tables.check("get_challenge")?;
        Ok(tables
            .challenges
            .iter()
            .find(|c| c.id == challenge_id)
            .cloned())
    }

    async fn find_daily_challenge(&self, date: NaiveDate) -> anyhow::Result<Option<Challenge>> {
        let tables = self.lock();
        tables.check("find_daily_challenge")?;
        Ok(tables
            .challenges
            .iter()
            .find(|c| c.is_daily && c.daily_date == Some(date))
            .cloned())
    }

    async fn clear_daily_flags(&self) -> anyhow::Result<()> {
        let mut tables = self.lock();
        tables.check("clear_daily_flags")?;
        for challenge in tables.challenges.iter_mut().filter(|c| c.is_daily) {
            challenge.is_daily = false;
        }
        Ok(())
    }

    async fn mark_daily(&self, challenge_id: i32, date: NaiveDate) -> anyhow::Result<()> {
        let mut tables = self.lock();
        tables.check("mark_daily")?;
        if let Some(challenge) = tables.challenges.iter_mut().find(|c| c.id == challenge_id) {
            challenge.is_daily = true;
            challenge.daily_date = Some(date);
        }
        Ok(())
    }

    async fn find_user_challenge(
        &self,
        user_id: Uuid,
        challenge_id: i32,
    ) -> anyhow::Result<Option<UserChallenge>> {
        let tables = self.lock();
        tables.check("find_user_challenge")?;
        Ok(tables
            .user_challenges
            .iter()
            .find(|r| r.user_id == user_id && r.challenge_id == challenge_id)
            .cloned())
    }

    async fn insert_user_challenge(&self, row: NewUserChallenge) -> anyhow::Result<()> {
        let mut tables = self.lock();
        tables.check("insert_user_challenge")?;
        if tables
            .user_challenges
            .iter()
            .any(|r| r.user_id == row.user_id && r.challenge_id == row.challenge_id)
        {
            bail!("duplicate key value violates unique constraint \"user_challenges_user_id_challenge_id_key\"");
        }
        let id = tables.next_id();
        tables.user_challenges.push(UserChallenge {
            id,
            user_id: row.user_id,
            challenge_id: row.challenge_id,
            completed: true,
            points_earned: row.points_earned,
            attempts: 1,
            time_spent: row.time_spent,
            completed_at: Some(row.completed_at),
            created_at: row.completed_at,
        });
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
        let mut tables = self.lock();
        tables.check("update_user_challenge")?;
        if let Some(row) = tables.user_challenges.iter_mut().find(|r| r.id == id) {
            row.completed = true;
            row.points_earned = points_earned;
            row.attempts = attempts;
            row.time_spent = time_spent.or(row.time_spent);
            row.completed_at = Some(completed_at);
        }
        Ok(())
    }

    async fn list_completed_challenges(
        &self,
        user_id: Uuid,
    ) -> anyhow::Result<Vec<CompletedChallenge>> {
        let tables = self.lock();
        tables.check("list_completed_challenges")?;
        let mut completed: Vec<CompletedChallenge> = tables
            .user_challenges
            .iter()
            .filter(|r| r.user_id == user_id && r.completed)
            .filter_map(|record| {
                tables
                    .challenges
                    .iter()
                    .find(|c| c.id == record.challenge_id)
                    .map(|challenge| CompletedChallenge {
                        record: record.clone(),
                        challenge: challenge.clone(),
                    })
            })
            .collect();
        completed.sort_by(|a, b| b.record.completed_at.cmp(&a.record.completed_at));
        Ok(completed)
    }

    async fn delete_user_challenges(&self, user_id: Uuid) -> anyhow::Result<()> {
        let mut tables = self.lock();
        tables.check("delete_user_challenges")?;
        tables.user_challenges.retain(|r| r.user_id != user_id);
        Ok(())
    }

    async fn list_achievements(&self) -> anyhow::Result<Vec<Achievement>> {
        let tables = self.lock();
        tables.check("list_achievements")?;
        Ok(tables.achievements.clone())
    }

    async fn list_earned_achievements(
        &self,
        user_id: Uuid,
    ) -> anyhow::Result<Vec<EarnedAchievement>> {
        let tables = self.lock();
        tables.check("list_earned_achievements")?;
        Ok(tables
            .user_achievements
            .iter()
            .filter(|r| r.user_id == user_id)
            .filter_map(|record| {
                tables
                    .achievements
                    .iter()
                    .find(|a| a.id == record.achievement_id)
                    .map(|achievement| EarnedAchievement {
                        record: record.clone(),
                        achievement: achievement.clone(),
                    })
            })
            .collect())
    }

    async fn insert_user_achievements(
        &self,
        user_id: Uuid,
        achievement_ids: &[i32],
    ) -> anyhow::Result<()> {
        let mut tables = self.lock();
        tables.check("insert_user_achievements")?;
        let duplicate = achievement_ids.iter().find(|id| {
            tables
                .user_achievements
                .iter()
                .any(|r| r.user_id == user_id && r.achievement_id == **id)
        });
        if let Some(id) = duplicate {
            return Err(anyhow!(
                "duplicate key value violates unique constraint: achievement {id} already earned"
            ));
        }
        let now = Utc::now();
        for &achievement_id in achievement_ids {
            let id = tables.next_id();
            tables.user_achievements.push(UserAchievement {
                id,
                user_id,
                achievement_id,
                earned_at: now,
            });
        }
        Ok(())
    }

    async fn delete_user_achievements(&self, user_id: Uuid) -> anyhow::Result<()> {
        let mut tables = self.lock();
        tables.check("delete_user_achievements")?;
        tables.user_achievements.retain(|r| r.user_id != user_id);
        Ok(())
    }

    async fn find_streak_log(
        &self,
        user_id: Uuid,
        date: NaiveDate,
    ) -> anyhow::Result<Option<StreakLog>> {
        let tables = self.lock();
        tables.check("find_streak_log")?;
        Ok(tables
            .streak_logs
            .iter()
            .find(|l| l.user_id == user_id && l.streak_date == date)
            .cloned())
    }

    async fn insert_streak_log(&self, user_id: Uuid, date: NaiveDate) -> anyhow::Result<()> {
        let mut tables = self.lock();
        tables.check("insert_streak_log")?;
        if tables
            .streak_logs
            .iter()
            .any(|l| l.user_id == user_id && l.streak_date == date)
        {
            bail!("duplicate key value violates unique constraint \"streak_logs_user_id_streak_date_key\"");
        }
        let id = tables.next_id();
        tables.streak_logs.push(StreakLog {
            id,
            user_id,
            streak_date: date,
            created_at: Utc::now(),
        });
        Ok(())
    }

    async fn list_streak_dates(&self, user_id: Uuid) -> anyhow::Result<Vec<NaiveDate>> {
        let tables = self.lock();
        tables.check("list_streak_dates")?;
        let mut dates: Vec<NaiveDate> = tables
            .streak_logs
            .iter()
            .filter(|l| l.user_id == user_id)
            .map(|l| l.streak_date)
            .collect();
        dates.sort_by(|a, b| b.cmp(a));
        Ok(dates)
    }

    async fn delete_streak_logs(&self, user_id: Uuid) -> anyhow::Result<()> {
        let mut tables = self.lock();
        tables.check("delete_streak_logs")?;
        tables.streak_logs.retain(|l| l.user_id != user_id);
        Ok(())
    }
}
