//! Derived figures for the progress page: streak calendar, category split
//! and recent daily points.

use std::collections::HashSet;

use chrono::{Duration, NaiveDate};
use common::utils::Category;
use serde::Serialize;

use crate::{achievements::Tally, clock::Clock, service::Progress};

pub const CALENDAR_DAYS: i64 = 14;
pub const POINTS_DAYS: i64 = 7;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DayActivity {
    pub date: NaiveDate,
    pub completed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryShare {
    pub category: Category,
    pub percent: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyPoints {
    pub date: NaiveDate,
    pub weekday: String,
    pub points: i32,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProgressSummary {
    pub level: i32,
    pub total_points: i32,
    pub current_streak: i32,
    pub longest_streak: i32,
    pub completed_challenges: usize,
    pub streak_calendar: Vec<DayActivity>,
    pub category_breakdown: Vec<CategoryShare>,
    pub daily_points: Vec<DailyPoints>,
}

/// Oldest day first in both the calendar and the daily points. Completions
/// are bucketed on the clock's calendar, the same one streak logs use.
pub fn summarize(progress: &Progress, clock: &dyn Clock) -> ProgressSummary {
    let today = clock.today();
    let active: HashSet<NaiveDate> = progress.streak_logs.iter().copied().collect();
    let streak_calendar = (0..CALENDAR_DAYS)
        .rev()
        .map(|offset| {
            let date = today - Duration::days(offset);
            DayActivity {
                date,
                completed: active.contains(&date),
            }
        })
        .collect();

    let tally = Tally::from_completed(&progress.completed_challenges);
    let category_breakdown = if tally.total == 0 {
        Vec::new()
    } else {
        Category::ALL
            .iter()
            .filter(|category| tally.count(**category) > 0)
            .map(|category| CategoryShare {
                category: *category,
                percent: (tally.count(*category) as f64 / tally.total as f64 * 100.0).round()
                    as u32,
            })
            .collect()
    };

    let daily_points = (0..POINTS_DAYS)
        .rev()
        .map(|offset| {
            let date = today - Duration::days(offset);
            let points = progress
                .completed_challenges
                .iter()
                .filter(|c| c.record.completed_at.map(|at| clock.day_of(at)) == Some(date))
                .map(|c| c.record.points_earned)
                .sum();
            DailyPoints {
                date,
                weekday: date.format("%a").to_string(),
                points,
            }
        })
        .collect();

    let profile = &progress.profile;
    ProgressSummary {
        level: profile.level,
        total_points: profile.total_points,
        current_streak: profile.current_streak,
        longest_streak: profile.longest_streak,
        completed_challenges: progress.completed_challenges.len(),
        streak_calendar,
        category_breakdown,
        daily_points,
    }
}
