use chrono::NaiveDate;

/// Length of the run of consecutive calendar days ending at the most recent
/// date in `dates`. Order and duplicates in the input do not matter.
pub fn current_streak(dates: &[NaiveDate]) -> i32 {
    let mut sorted = dates.to_vec();
    sorted.sort_by(|a, b| b.cmp(a));
    sorted.dedup();

    let Some(first) = sorted.first() else {
        return 0;
    };

    let mut streak = 1;
    let mut previous = *first;
    for date in &sorted[1..] {
        if (previous - *date).num_days() != 1 {
            break;
        }
        streak += 1;
        previous = *date;
    }
    streak
}
