// Confidence scoring and best-time ranking for call windows.

use crate::config::RankPolicy;
use crate::scoring::statistics::round2;
use crate::timeslot::segment::TimeSlotPattern;

/// Number of patterns flagged best per cluster (fewer when fewer
/// patterns exist).
pub const MAX_BEST_TIMES: usize = 3;

/// Multi-factor confidence for a time slot, 0-100.
///
/// Weighted blend: sample size (0.3, saturating at 100 samples),
/// pickup rate (0.3, saturating at 50%), duration (0.2, saturating at
/// 300 s), and the interval's consistency score (0.2).
pub fn calculate_confidence(
    sample_size: usize,
    pickup_rate: f32,
    duration: f32,
    consistency: f32,
) -> f32 {
    let sample_weight = (sample_size as f32 / 100.0).min(1.0);
    let pickup_weight = (pickup_rate / 50.0).min(1.0);
    let duration_weight = (duration / 300.0).min(1.0);

    round2(
        (sample_weight * 0.3 + pickup_weight * 0.3 + duration_weight * 0.2 + consistency * 0.2)
            * 100.0,
    )
}

/// Sort patterns descending by the policy's key and flag the top 3 as
/// best times. The sort is stable, so equal keys keep day order and
/// re-runs are deterministic.
pub fn rank_patterns(patterns: &mut [TimeSlotPattern], policy: RankPolicy) {
    match policy {
        RankPolicy::SuccessConfidence => patterns.sort_by(|a, b| {
            b.success_probability
                .total_cmp(&a.success_probability)
                .then(b.confidence.total_cmp(&a.confidence))
        }),
        RankPolicy::RawPerformance => patterns.sort_by(|a, b| {
            b.pickup_rate
                .total_cmp(&a.pickup_rate)
                .then(b.avg_duration.total_cmp(&a.avg_duration))
        }),
    }

    for pattern in patterns.iter_mut().take(MAX_BEST_TIMES) {
        pattern.best_time = true;
    }
}
