// Time-Slot Segmentation
//
// Objective: for one cluster's member records, find the contiguous
// (day, hour-range) windows where pickup behavior is similar enough to
// be treated as a single call-scheduling recommendation.
//
// Key insight: adjacent hours with near-identical pickup rate and talk
// time are one window, not 24 independent cells. A single greedy
// left-to-right merge per day is enough; intervals are never reopened.

mod confidence;
mod segment;

pub use confidence::{calculate_confidence, rank_patterns, MAX_BEST_TIMES};
pub use segment::{analyze_time_slots, TimeSlotPattern};
