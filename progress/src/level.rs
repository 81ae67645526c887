pub const POINTS_PER_LEVEL: i32 = 500;

/// `floor(total_points / 500) + 1`; negative totals count as zero.
pub fn level_for_points(total_points: i32) -> i32 {
    total_points.max(0) / POINTS_PER_LEVEL + 1
}
