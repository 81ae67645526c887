use std::sync::Arc;

use chrono::NaiveDate;
use common::{
    catalog,
    memory::MemoryStore,
    models::{NewUserChallenge, Profile},
    store::ProgressStore,
    utils::Category,
};
use uuid::Uuid;

use crate::{clock::FixedClock, Player, PreferencesUpdate, ProgressService, Submission};

struct Harness {
    store: Arc<MemoryStore>,
    clock: Arc<FixedClock>,
    service: ProgressService,
}

impl Harness {
    fn new(store: MemoryStore) -> Self {
        let store = Arc::new(store);
        let clock = Arc::new(FixedClock::on(
            NaiveDate::from_ymd_opt(2026, 10, 18).unwrap(),
        ));
        let service = ProgressService::with_clock(store.clone(), clock.clone());
        Harness {
            store,
            clock,
            service,
        }
    }

    fn seeded() -> Self {
        Self::new(MemoryStore::seeded())
    }

    /// Challenges but no achievements, so point totals only move by
    /// challenge points.
    fn without_achievements() -> Self {
        Self::new(MemoryStore::with_catalog(
            catalog::seed_challenges(),
            Vec::new(),
        ))
    }

    async fn user(&self) -> Uuid {
        let user = Uuid::new_v4();
        self.store.create_profile(user, None).await.unwrap();
        user
    }

    async fn user_with_points(&self, total_points: i32) -> Uuid {
        let user = Uuid::new_v4();
        let mut profile = Profile::new(user, None, self.clock_now());
        profile.total_points = total_points;
        profile.level = total_points / 500 + 1;
        self.store.put_profile(profile);
        user
    }

    fn clock_now(&self) -> chrono::DateTime<chrono::Utc> {
        use crate::clock::Clock;
        self.clock.now()
    }
}

#[tokio::test]
async fn completing_challenge_crosses_level_boundary() {
    let h = Harness::without_achievements();
    let user = h.user_with_points(450).await;

    let profile = h.service.save_progress(user, 1, 100).await.unwrap();

    assert_eq!(profile.total_points, 550);
    assert_eq!(profile.level, 2);
}

#[tokio::test]
async fn recompletion_updates_row_and_credits_again() {
    let h = Harness::without_achievements();
    let user = h.user().await;

    h.service.save_progress(user, 2, 75).await.unwrap();
    let profile = h.service.save_progress(user, 2, 75).await.unwrap();

    assert_eq!(h.store.user_challenge_count(user), 1);
    let row = h.store.find_user_challenge(user, 2).await.unwrap().unwrap();
    assert_eq!(row.attempts, 2);
    assert!(row.completed);
    assert_eq!(profile.total_points, 150);
}

#[tokio::test]
async fn streak_moves_once_per_day() {
    let h = Harness::without_achievements();
    let user = h.user().await;

    h.service.save_progress(user, 1, 100).await.unwrap();
    let profile = h.service.save_progress(user, 2, 75).await.unwrap();

    assert_eq!(profile.current_streak, 1);
    assert_eq!(h.store.list_streak_dates(user).await.unwrap().len(), 1);
}

#[tokio::test]
async fn consecutive_days_build_streak_and_gap_resets_it() {
    let h = Harness::without_achievements();
    let user = h.user().await;

    let mut profile = None;
    for challenge_id in 1..=3 {
        profile = h.service.save_progress(user, challenge_id, 10).await;
        h.clock.advance_days(1);
    }
    let profile = profile.unwrap();
    assert_eq!(profile.current_streak, 3);
    assert_eq!(profile.longest_streak, 3);

    // skip a day
    h.clock.advance_days(1);
    let profile = h.service.save_progress(user, 4, 10).await.unwrap();
    assert_eq!(profile.current_streak, 1);
    assert_eq!(profile.longest_streak, 3);
}

#[tokio::test]
async fn longest_streak_never_decreases() {
    let h = Harness::without_achievements();
    let user = h.user().await;
    let mut longest = 0;

    for (step, gap) in [1, 1, 3, 1, 1, 1, 1, 2, 1].into_iter().enumerate() {
        let profile = h
            .service
            .save_progress(user, step as i32 % 8 + 1, 10)
            .await
            .unwrap();
        assert!(profile.longest_streak >= longest);
        assert!(profile.longest_streak >= profile.current_streak);
        longest = profile.longest_streak;
        h.clock.advance_days(gap);
    }
    assert_eq!(longest, 5);
}

#[tokio::test]
async fn first_steps_is_awarded_exactly_once() {
    let h = Harness::seeded();
    let user = h.user().await;

    let first = h.service.save_progress(user, 1, 100).await.unwrap();
    let progress = h.service.load_progress(user).await.unwrap();
    let codes: Vec<_> = progress
        .achievements
        .iter()
        .map(|e| e.achievement.code.as_str())
        .collect();
    assert_eq!(codes, vec!["first_steps"]);
    assert_eq!(first.total_points, 110);

    let second = h.service.save_progress(user, 2, 75).await.unwrap();
    let progress = h.service.load_progress(user).await.unwrap();
    assert_eq!(progress.achievements.len(), 1);
    assert_eq!(second.total_points, 185);
}

#[tokio::test]
async fn check_achievements_is_idempotent() {
    let h = Harness::seeded();
    let user = h.user().await;
    for challenge_id in [3, 6] {
        h.service.save_progress(user, challenge_id, 1).await.unwrap();
    }

    assert!(h.service.check_achievements(user).await.is_empty());
    let profile = h.store.get_profile(user).await.unwrap().unwrap();
    assert_eq!(profile.total_points, 12);
}

#[tokio::test]
async fn achievement_failure_does_not_abort_save() {
    let h = Harness::seeded();
    let user = h.user().await;
    h.store.fail_on("insert_user_achievements");

    let profile = h.service.save_progress(user, 1, 100).await.unwrap();

    assert_eq!(profile.total_points, 100);
    assert!(h.store.list_earned_achievements(user).await.unwrap().is_empty());
}

#[tokio::test]
async fn failed_step_keeps_earlier_writes() {
    let h = Harness::without_achievements();
    let user = h.user().await;
    h.store.fail_on("update_points");

    assert!(h.service.save_progress(user, 1, 100).await.is_none());

    // the completion row was written before the failure
    assert_eq!(h.store.user_challenge_count(user), 1);
    let profile = h.store.get_profile(user).await.unwrap().unwrap();
    assert_eq!(profile.total_points, 0);
}

#[tokio::test]
async fn nil_user_is_rejected_without_writes() {
    let h = Harness::seeded();

    assert!(h.service.save_progress(Uuid::nil(), 1, 100).await.is_none());
    assert!(h.service.load_progress(Uuid::nil()).await.is_none());
    assert!(!h.service.reset_progress(Uuid::nil()).await);
    assert_eq!(h.store.user_challenge_count(Uuid::nil()), 0);
}

#[tokio::test]
async fn missing_profile_fails_save() {
    let h = Harness::without_achievements();

    assert!(h.service.save_progress(Uuid::new_v4(), 1, 100).await.is_none());
}

#[tokio::test]
async fn overflowing_credit_is_rejected_without_writes() {
    let h = Harness::without_achievements();
    let user = h.user_with_points(450).await;

    assert!(h.service.save_progress(user, 1, i32::MAX).await.is_none());

    assert_eq!(h.store.user_challenge_count(user), 0);
    let profile = h.store.get_profile(user).await.unwrap().unwrap();
    assert_eq!(profile.total_points, 450);
}

#[tokio::test]
async fn negative_credit_is_rejected_without_writes() {
    let h = Harness::without_achievements();
    let user = h.user().await;

    assert!(h.service.save_progress(user, 1, -300).await.is_none());

    assert_eq!(h.store.user_challenge_count(user), 0);
    let profile = h.store.get_profile(user).await.unwrap().unwrap();
    assert_eq!(profile.total_points, 0);
    assert_eq!(profile.level, 1);
}

#[tokio::test]
async fn overflowing_bonus_awards_nothing() {
    let h = Harness::seeded();
    let user = h.user_with_points(i32::MAX - 5).await;
    h.store
        .insert_user_challenge(NewUserChallenge {
            user_id: user,
            challenge_id: 1,
            points_earned: 0,
            time_spent: None,
            completed_at: h.clock_now(),
        })
        .await
        .unwrap();

    assert!(h.service.check_achievements(user).await.is_empty());

    assert!(h.store.list_earned_achievements(user).await.unwrap().is_empty());
    let profile = h.store.get_profile(user).await.unwrap().unwrap();
    assert_eq!(profile.total_points, i32::MAX - 5);
}

#[tokio::test]
async fn load_fails_as_a_whole() {
    let h = Harness::seeded();
    let user = h.user().await;
    h.service.save_progress(user, 1, 100).await.unwrap();
    h.store.fail_on("list_earned_achievements");

    assert!(h.service.load_progress(user).await.is_none());
}

#[tokio::test]
async fn reset_then_load_is_empty() {
    let h = Harness::seeded();
    let user = h.user().await;
    for challenge_id in 1..=5 {
        h.service.save_progress(user, challenge_id, 100).await.unwrap();
        h.clock.advance_days(1);
    }

    assert!(h.service.reset_progress(user).await);
    let progress = h.service.load_progress(user).await.unwrap();

    assert_eq!(progress.profile.total_points, 0);
    assert_eq!(progress.profile.level, 1);
    assert_eq!(progress.profile.current_streak, 0);
    assert_eq!(progress.profile.longest_streak, 0);
    assert!(progress.completed_challenges.is_empty());
    assert!(progress.achievements.is_empty());
    assert!(progress.streak_logs.is_empty());
}

#[tokio::test]
async fn reset_stops_at_first_failure() {
    let h = Harness::without_achievements();
    let user = h.user().await;
    h.service.save_progress(user, 1, 100).await.unwrap();
    h.store.fail_on("delete_streak_logs");

    assert!(!h.service.reset_progress(user).await);

    assert_eq!(h.store.user_challenge_count(user), 0);
    assert_eq!(h.store.list_streak_dates(user).await.unwrap().len(), 1);
    let profile = h.store.get_profile(user).await.unwrap().unwrap();
    assert_eq!(profile.total_points, 100);
}

#[tokio::test]
async fn daily_challenge_is_stable_within_a_day() {
    let h = Harness::seeded();

    let first = h.service.get_daily_challenge().await.unwrap();
    let second = h.service.get_daily_challenge().await.unwrap();

    assert_eq!(first.id, second.id);
    assert!(first.is_daily);
    assert_eq!(first.daily_date, NaiveDate::from_ymd_opt(2026, 10, 18));
    assert_eq!(h.store.daily_flag_count(), 1);
}

#[tokio::test]
async fn new_day_rotates_daily_flag() {
    let h = Harness::seeded();
    h.service.get_daily_challenge().await.unwrap();
    h.clock.advance_days(1);

    let next = h.service.get_daily_challenge().await.unwrap();

    assert_eq!(next.daily_date, NaiveDate::from_ymd_opt(2026, 10, 19));
    assert_eq!(h.store.daily_flag_count(), 1);
}

#[tokio::test]
async fn daily_challenge_needs_a_catalog() {
    let h = Harness::new(MemoryStore::new());

    assert!(h.service.get_daily_challenge().await.is_none());
}

#[tokio::test]
async fn daily_lookup_failure_falls_back_to_fresh_pick() {
    let h = Harness::seeded();
    h.store.fail_on("find_daily_challenge");

    let picked = h.service.get_daily_challenge().await.unwrap();

    assert!(picked.is_daily);
    assert_eq!(h.store.daily_flag_count(), 1);
}

#[tokio::test]
async fn anonymous_correct_answer_is_not_saved() {
    let h = Harness::seeded();

    match h.service.submit_answer(None, 2, "COLD", None).await.unwrap() {
        Submission::Correct {
            points_earned,
            profile,
            ..
        } => {
            assert_eq!(points_earned, 75);
            assert!(profile.is_none());
        }
        other => panic!("unexpected submission {other:?}"),
    }
}

#[tokio::test]
async fn signed_in_correct_answer_saves_progress() {
    let h = Harness::seeded();
    let user = Uuid::new_v4();

    let submission = h
        .service
        .submit_answer(Some(Player::new(user)), 3, " 33 ", Some(42))
        .await
        .unwrap();

    let Submission::Correct {
        profile,
        new_achievements,
        ..
    } = submission
    else {
        panic!("expected a correct submission");
    };
    let profile = profile.unwrap();
    assert_eq!(profile.total_points, 160);
    assert_eq!(profile.current_streak, 1);
    assert_eq!(new_achievements.len(), 1);

    let row = h.store.find_user_challenge(user, 3).await.unwrap().unwrap();
    assert_eq!(row.time_spent, Some(42));
}

#[tokio::test]
async fn first_submission_provisions_named_profile() {
    let h = Harness::seeded();
    let user = Uuid::new_v4();
    let player = Player::new(user).with_username(Some("ada".to_string()));

    h.service
        .submit_answer(Some(player), 2, "cold", None)
        .await
        .unwrap();

    let profile = h.store.get_profile(user).await.unwrap().unwrap();
    assert_eq!(profile.username.as_deref(), Some("ada"));
}

#[tokio::test]
async fn wrong_and_unknown_submissions() {
    let h = Harness::seeded();
    let user = h.user().await;

    assert!(matches!(
        h.service.submit_answer(Some(Player::new(user)), 1, "ball", None).await,
        Some(Submission::Incorrect)
    ));
    assert!(matches!(
        h.service.submit_answer(Some(Player::new(user)), 99, "racket", None).await,
        Some(Submission::UnknownChallenge)
    ));
    assert_eq!(h.store.user_challenge_count(user), 0);
}

#[tokio::test]
async fn preferences_update_only_touches_given_fields() {
    let h = Harness::seeded();
    let user = h.user().await;

    let profile = h
        .service
        .update_preferences(
            user,
            PreferencesUpdate {
                dark_mode: Some(true),
                categories: Some(vec![Category::Logic]),
                ..PreferencesUpdate::default()
            },
        )
        .await
        .unwrap();

    assert!(profile.preferences.0.dark_mode);
    assert_eq!(profile.preferences.0.categories, vec![Category::Logic]);
    assert!(profile.preferences.0.notifications);
    assert_eq!(profile.preferences.0.difficulty, "adaptive");
}

#[tokio::test]
async fn get_profile_creates_on_first_access() {
    let h = Harness::seeded();
    let user = Uuid::new_v4();

    let created = h
        .service
        .get_profile(user, Some("ada".to_string()))
        .await
        .unwrap();
    let again = h.service.get_profile(user, None).await.unwrap();

    assert_eq!(created.id, user);
    assert_eq!(again.username.as_deref(), Some("ada"));
    assert_eq!(again.level, 1);
}

#[tokio::test]
async fn challenges_filter_by_category() {
    let h = Harness::seeded();

    let riddles = h.service.list_challenges(Some(Category::Riddle)).await.unwrap();
    assert_eq!(riddles.len(), 2);
    assert!(riddles.iter().all(|c| c.category == Category::Riddle));

    h.store.fail_on("list_challenges");
    assert!(h.service.list_challenges(None).await.is_none());
}

#[tokio::test]
async fn summary_reflects_saved_progress() {
    let h = Harness::without_achievements();
    let user = h.user().await;
    h.service.save_progress(user, 1, 100).await.unwrap();
    h.clock.advance_days(1);
    h.service.save_progress(user, 3, 150).await.unwrap();

    let summary = h.service.summary(user).await.unwrap();

    assert_eq!(summary.total_points, 250);
    assert_eq!(summary.current_streak, 2);
    assert_eq!(summary.completed_challenges, 2);
    assert_eq!(summary.daily_points[6].points, 150);
    assert_eq!(summary.daily_points[5].points, 100);
    assert!(summary.streak_calendar[13].completed);
    assert!(summary.streak_calendar[12].completed);
}
