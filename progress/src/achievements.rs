//! Achievement unlock rules and their evaluation.

use std::collections::{HashMap, HashSet};

use anyhow::anyhow;
use common::{
    models::{Achievement, CompletedChallenge},
    utils::Category,
};
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::{level::level_for_points, ProgressService};

/// What an achievement requires, looked up by the achievement's stable code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AchievementRule {
    Progress { threshold: usize },
    Streak { threshold: i32 },
    Category { category: Category, threshold: usize },
}

impl AchievementRule {
    pub fn for_code(code: &str) -> Option<AchievementRule> {
        let rule = match code {
            "first_steps" => AchievementRule::Progress { threshold: 1 },
            "brain_starter" => AchievementRule::Progress { threshold: 5 },
            "mind_master" => AchievementRule::Progress { threshold: 25 },
            "streak_beginner" => AchievementRule::Streak { threshold: 3 },
            "streak_enthusiast" => AchievementRule::Streak { threshold: 7 },
            "streak_master" => AchievementRule::Streak { threshold: 30 },
            "logic_novice" => AchievementRule::per_category(Category::Logic),
            "memory_whiz" => AchievementRule::per_category(Category::Memory),
            "riddle_solver" => AchievementRule::per_category(Category::Riddle),
            "puzzle_master" => AchievementRule::per_category(Category::Puzzle),
            _ => return None,
        };
        Some(rule)
    }

    fn per_category(category: Category) -> AchievementRule {
        AchievementRule::Category {
            category,
            threshold: 3,
        }
    }

    pub fn is_met(&self, tally: &Tally, current_streak: i32) -> bool {
        match *self {
            AchievementRule::Progress { threshold } => tally.total >= threshold,
            AchievementRule::Streak { threshold } => current_streak >= threshold,
            AchievementRule::Category {
                category,
                threshold,
            } => tally.count(category) >= threshold,
        }
    }
}

/// Completed-challenge counts, overall and per category.
#[derive(Debug, Default, Clone)]
pub struct Tally {
    pub total: usize,
    by_category: HashMap<Category, usize>,
}

impl Tally {
    pub fn from_completed(completed: &[CompletedChallenge]) -> Tally {
        let mut tally = Tally {
            total: completed.len(),
            ..Tally::default()
        };
        for entry in completed {
            *tally.by_category.entry(entry.challenge.category).or_default() += 1;
        }
        tally
    }

    pub fn count(&self, category: Category) -> usize {
        self.by_category.get(&category).copied().unwrap_or(0)
    }
}

/// Achievements from `catalog` not yet in `earned` whose rule is satisfied.
pub fn qualifying<'a>(
    catalog: &'a [Achievement],
    earned: &HashSet<i32>,
    tally: &Tally,
    current_streak: i32,
) -> Vec<&'a Achievement> {
    catalog
        .iter()
        .filter(|achievement| !earned.contains(&achievement.id))
        .filter(|achievement| match AchievementRule::for_code(&achievement.code) {
            Some(rule) => rule.is_met(tally, current_streak),
            None => {
                debug!("No unlock rule for achievement code {}", achievement.code);
                false
            }
        })
        .collect()
}

impl ProgressService {
    /// Award every achievement the user newly qualifies for and credit its
    /// points. Returns the newly awarded achievements; failures are logged
    /// and reported as nothing awarded.
    pub async fn check_achievements(&self, user_id: Uuid) -> Vec<Achievement> {
        match self.try_check_achievements(user_id).await {
            Ok(awarded) => awarded,
            Err(e) => {
                error!("Error checking achievements: {:?}", e);
                Vec::new()
            }
        }
    }

    async fn try_check_achievements(&self, user_id: Uuid) -> anyhow::Result<Vec<Achievement>> {
        let completed = self.store.list_completed_challenges(user_id).await?;
        let profile = self
            .store
            .get_profile(user_id)
            .await?
            .ok_or_else(|| anyhow!("Profile {user_id} not found"))?;
        let catalog = self.store.list_achievements().await?;
        let earned: HashSet<i32> = self
            .store
            .list_earned_achievements(user_id)
            .await?
            .iter()
            .map(|e| e.record.achievement_id)
            .collect();

        let tally = Tally::from_completed(&completed);
        let awarded: Vec<Achievement> =
            qualifying(&catalog, &earned, &tally, profile.current_streak)
                .into_iter()
                .cloned()
                .collect();

        if awarded.is_empty() {
            return Ok(awarded);
        }

        let bonus = awarded
            .iter()
            .try_fold(0i32, |sum, a| sum.checked_add(a.points))
            .ok_or_else(|| anyhow!("Achievement bonus for {user_id} overflows"))?;
        let total_points = profile
            .total_points
            .checked_add(bonus)
            .ok_or_else(|| anyhow!("Crediting {bonus} bonus points to {user_id} overflows"))?;

        let ids: Vec<i32> = awarded.iter().map(|a| a.id).collect();
        self.store.insert_user_achievements(user_id, &ids).await?;

        if bonus > 0 {
            self.store
                .update_points(user_id, total_points, level_for_points(total_points))
                .await?;
        }

        info!(
            "Awarded {} achievement(s) worth {} points to {}",
            awarded.len(),
            bonus,
            user_id
        );
        Ok(awarded)
    }
}
