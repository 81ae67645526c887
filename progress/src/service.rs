use std::sync::Arc;

use anyhow::anyhow;
use chrono::NaiveDate;
use common::{
    models::{
        Achievement, Challenge, CompletedChallenge, EarnedAchievement, NewUserChallenge,
        Preferences, Profile,
    },
    store::ProgressStore,
    utils::Category,
};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::{
    clock::{Clock, SystemClock},
    level::level_for_points,
    streak,
    summary::{summarize, ProgressSummary},
};

/// Everything the progress page needs about one user.
#[derive(Debug, Clone, Serialize)]
pub struct Progress {
    pub profile: Profile,
    pub completed_challenges: Vec<CompletedChallenge>,
    /// Most recent first.
    pub streak_logs: Vec<NaiveDate>,
    pub achievements: Vec<EarnedAchievement>,
}

#[derive(Debug, Clone)]
pub struct SaveProgress {
    pub user_id: Uuid,
    pub challenge_id: i32,
    pub points_earned: i32,
    pub time_spent: Option<i32>,
}

/// Partial update of the preferences JSON; absent fields are left alone.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreferencesUpdate {
    pub difficulty: Option<String>,
    pub categories: Option<Vec<Category>>,
    pub notifications: Option<bool>,
    pub email_notifications: Option<bool>,
    pub dark_mode: Option<bool>,
}

impl PreferencesUpdate {
    pub fn apply(self, preferences: &mut Preferences) {
        if let Some(difficulty) = self.difficulty {
            preferences.difficulty = difficulty;
        }
        if let Some(categories) = self.categories {
            preferences.categories = categories;
        }
        if let Some(notifications) = self.notifications {
            preferences.notifications = notifications;
        }
        if let Some(email_notifications) = self.email_notifications {
            preferences.email_notifications = email_notifications;
        }
        if let Some(dark_mode) = self.dark_mode {
            preferences.dark_mode = dark_mode;
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Submission {
    UnknownChallenge,
    Incorrect,
    Correct {
        category: Category,
        points_earned: i32,
        /// Updated profile; absent for anonymous submissions.
        profile: Option<Profile>,
        new_achievements: Vec<Achievement>,
    },
}

/// Signed-in caller of `submit_answer`. The username only matters when the
/// submission is the user's first request.
#[derive(Debug, Clone)]
pub struct Player {
    pub id: Uuid,
    pub username: Option<String>,
}

impl Player {
    pub fn new(id: Uuid) -> Self {
        Self { id, username: None }
    }

    pub fn with_username(mut self, username: Option<String>) -> Self {
        self.username = username;
        self
    }
}

/// Data-access layer over a `ProgressStore`.
///
/// Every public operation is a sequence of independent store calls. A
/// failure part-way through is logged and reported as `None`/`false`;
/// writes made before the failure stay in place.
#[derive(Clone)]
pub struct ProgressService {
    pub(crate) store: Arc<dyn ProgressStore>,
    pub(crate) clock: Arc<dyn Clock>,
}

impl ProgressService {
    pub fn new(store: Arc<dyn ProgressStore>) -> Self {
        Self::with_clock(store, Arc::new(SystemClock))
    }

    pub fn with_clock(store: Arc<dyn ProgressStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Record a completed challenge and return the updated profile.
    pub async fn save_progress(
        &self,
        user_id: Uuid,
        challenge_id: i32,
        points_earned: i32,
    ) -> Option<Profile> {
        self.save_progress_with(SaveProgress {
            user_id,
            challenge_id,
            points_earned,
            time_spent: None,
        })
        .await
    }

    pub async fn save_progress_with(&self, request: SaveProgress) -> Option<Profile> {
        if request.user_id.is_nil() {
            error!("User ID is required to save progress");
            return None;
        }

        match self.try_save_progress(&request).await {
            Ok((profile, _)) => Some(profile),
            Err(e) => {
                error!("Error saving progress: {:?}", e);
                None
            }
        }
    }

    async fn try_save_progress(
        &self,
        request: &SaveProgress,
    ) -> anyhow::Result<(Profile, Vec<Achievement>)> {
        let SaveProgress {
            user_id,
            challenge_id,
            points_earned,
            time_spent,
        } = *request;
        if points_earned < 0 {
            return Err(anyhow!("Points earned must not be negative, got {points_earned}"));
        }
        let now = self.clock.now();

        let profile = self.require_profile(user_id).await?;
        let total_points = profile
            .total_points
            .checked_add(points_earned)
            .ok_or_else(|| anyhow!("Crediting {points_earned} points to {user_id} overflows"))?;

        // Re-completion updates the existing row and credits the points again.
        match self
            .store
            .find_user_challenge(user_id, challenge_id)
            .await?
        {
            Some(existing) => {
                self.store
                    .update_user_challenge(
                        existing.id,
                        points_earned,
                        existing.attempts + 1,
                        time_spent,
                        now,
                    )
                    .await?
            }
            None => {
                self.store
                    .insert_user_challenge(NewUserChallenge {
                        user_id,
                        challenge_id,
                        points_earned,
                        time_spent,
                        completed_at: now,
                    })
                    .await?
            }
        }

        self.store
            .update_points(user_id, total_points, level_for_points(total_points))
            .await?;

        // Streaks move at most once per calendar day.
        let today = self.clock.today();
        if self.store.find_streak_log(user_id, today).await?.is_none() {
            self.store.insert_streak_log(user_id, today).await?;

            let dates = self.store.list_streak_dates(user_id).await?;
            let current_streak = streak::current_streak(&dates);
            let profile = self.require_profile(user_id).await?;
            let longest_streak = profile.longest_streak.max(current_streak);

            self.store
                .update_streak(user_id, current_streak, longest_streak, now)
                .await?;
            info!(
                "User {} streak is now {} (longest {})",
                user_id, current_streak, longest_streak
            );
        }

        let awarded = self.check_achievements(user_id).await;

        let profile = self.require_profile(user_id).await?;
        Ok((profile, awarded))
    }

    pub async fn load_progress(&self, user_id: Uuid) -> Option<Progress> {
        if user_id.is_nil() {
            error!("User ID is required to load progress");
            return None;
        }

        match self.try_load_progress(user_id).await {
            Ok(progress) => Some(progress),
            Err(e) => {
                error!("Error loading progress: {:?}", e);
                None
            }
        }
    }

    async fn try_load_progress(&self, user_id: Uuid) -> anyhow::Result<Progress> {
        let profile = self.require_profile(user_id).await?;
        let completed_challenges = self.store.list_completed_challenges(user_id).await?;
        let streak_logs = self.store.list_streak_dates(user_id).await?;
        let achievements = self.store.list_earned_achievements(user_id).await?;

        Ok(Progress {
            profile,
            completed_challenges,
            streak_logs,
            achievements,
        })
    }

    /// Wipe completions, achievements and streak history and zero the
    /// profile counters.
    pub async fn reset_progress(&self, user_id: Uuid) -> bool {
        if user_id.is_nil() {
            error!("User ID is required to reset progress");
            return false;
        }

        match self.try_reset_progress(user_id).await {
            Ok(()) => {
                info!("Reset progress for {}", user_id);
                true
            }
            Err(e) => {
                error!("Error resetting progress: {:?}", e);
                false
            }
        }
    }

    async fn try_reset_progress(&self, user_id: Uuid) -> anyhow::Result<()> {
        self.store.delete_user_challenges(user_id).await?;
        self.store.delete_user_achievements(user_id).await?;
        self.store.delete_streak_logs(user_id).await?;
        self.store.reset_profile(user_id).await?;
        Ok(())
    }

    /// The user's profile, created with defaults on first access.
    pub async fn get_profile(&self, user_id: Uuid, username: Option<String>) -> Option<Profile> {
        match self.ensure_profile(user_id, username).await {
            Ok(profile) => Some(profile),
            Err(e) => {
                error!("Error fetching profile: {:?}", e);
                None
            }
        }
    }

    async fn ensure_profile(
        &self,
        user_id: Uuid,
        username: Option<String>,
    ) -> anyhow::Result<Profile> {
        if user_id.is_nil() {
            return Err(anyhow!("User ID is required"));
        }
        if let Some(profile) = self.store.get_profile(user_id).await? {
            return Ok(profile);
        }

        info!("Creating profile for {}", user_id);
        self.store.create_profile(user_id, username).await
    }

    async fn require_profile(&self, user_id: Uuid) -> anyhow::Result<Profile> {
        self.store
            .get_profile(user_id)
            .await?
            .ok_or_else(|| anyhow!("Profile {user_id} not found"))
    }

    pub async fn update_preferences(
        &self,
        user_id: Uuid,
        update: PreferencesUpdate,
    ) -> Option<Profile> {
        match self.try_update_preferences(user_id, update).await {
            Ok(profile) => Some(profile),
            Err(e) => {
                error!("Error updating preferences: {:?}", e);
                None
            }
        }
    }

    async fn try_update_preferences(
        &self,
        user_id: Uuid,
        update: PreferencesUpdate,
    ) -> anyhow::Result<Profile> {
        let profile = self.ensure_profile(user_id, None).await?;
        let mut preferences = profile.preferences.0;
        update.apply(&mut preferences);

        self.store.update_preferences(user_id, &preferences).await?;
        self.require_profile(user_id).await
    }

    /// The catalog ordered by id, optionally narrowed to one category.
    pub async fn list_challenges(&self, category: Option<Category>) -> Option<Vec<Challenge>> {
        match self.store.list_challenges().await {
            Ok(challenges) => Some(
                challenges
                    .into_iter()
                    .filter(|c| category.map_or(true, |category| c.category == category))
                    .collect(),
            ),
            Err(e) => {
                error!("Error fetching challenges: {:?}", e);
                None
            }
        }
    }

    /// Check an answer and, when it is correct and the caller is signed in,
    /// record the completion worth the challenge's points.
    pub async fn submit_answer(
        &self,
        player: Option<Player>,
        challenge_id: i32,
        answer: &str,
        time_spent: Option<i32>,
    ) -> Option<Submission> {
        match self
            .try_submit_answer(player, challenge_id, answer, time_spent)
            .await
        {
            Ok(submission) => Some(submission),
            Err(e) => {
                error!("Error submitting answer: {:?}", e);
                None
            }
        }
    }

    async fn try_submit_answer(
        &self,
        player: Option<Player>,
        challenge_id: i32,
        answer: &str,
        time_spent: Option<i32>,
    ) -> anyhow::Result<Submission> {
        let Some(challenge) = self.store.get_challenge(challenge_id).await? else {
            warn!("Answer submitted for unknown challenge {}", challenge_id);
            return Ok(Submission::UnknownChallenge);
        };

        if !challenge.check_answer(answer) {
            return Ok(Submission::Incorrect);
        }

        let Some(Player {
            id: user_id,
            username,
        }) = player
        else {
            return Ok(Submission::Correct {
                category: challenge.category,
                points_earned: challenge.points,
                profile: None,
                new_achievements: Vec::new(),
            });
        };

        self.ensure_profile(user_id, username).await?;
        let (profile, new_achievements) = self
            .try_save_progress(&SaveProgress {
                user_id,
                challenge_id,
                points_earned: challenge.points,
                time_spent,
            })
            .await?;

        Ok(Submission::Correct {
            category: challenge.category,
            points_earned: challenge.points,
            profile: Some(profile),
            new_achievements,
        })
    }

    pub async fn summary(&self, user_id: Uuid) -> Option<ProgressSummary> {
        let progress = self.load_progress(user_id).await?;
        Some(summarize(&progress, self.clock.as_ref()))
    }
}
