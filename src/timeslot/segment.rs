// Per-day hourly aggregation and greedy interval merging.

use crate::config::EngineConfig;
use crate::record::Record;
use crate::scoring::statistics::{mean, round2, stddev};
use crate::timeslot::confidence::{calculate_confidence, rank_patterns};
use serde::Serialize;
use std::collections::BTreeMap;

/// One contiguous (day, hour-range) call window for a single cluster.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeSlotPattern {
    /// Day-of-week name
    pub day: String,
    pub start_hour: u8,
    /// Exclusive
    pub end_hour: u8,
    /// Display label, e.g. "09:00–11:00"
    pub label: String,
    /// Arithmetic mean of the constituent hourly means
    pub pickup_rate: f32,
    pub avg_duration: f32,
    /// Total record count across the interval's hours
    pub sample_size: usize,
    /// 0-100
    pub confidence: f32,
    /// 0-100
    pub success_probability: f32,
    /// 0-1, stability of the hourly means within the interval
    pub consistency: f32,
    pub best_time: bool,
}

/// Mean pickup/duration for one hour of one day, with its sample count.
#[derive(Debug, Clone)]
struct HourlyAggregate {
    hour: u8,
    pickup: f32,
    duration: f32,
    samples: usize,
}

/// An open or closed merge interval accumulating hourly means.
#[derive(Debug)]
struct Interval {
    start: u8,
    end: u8,
    pickups: Vec<f32>,
    durations: Vec<f32>,
    samples: usize,
}

impl Interval {
    fn open(agg: &HourlyAggregate) -> Self {
        Self {
            start: agg.hour,
            end: agg.hour,
            pickups: vec![agg.pickup],
            durations: vec![agg.duration],
            samples: agg.samples,
        }
    }

    fn extend(&mut self, agg: &HourlyAggregate) {
        self.end = agg.hour;
        self.pickups.push(agg.pickup);
        self.durations.push(agg.duration);
        self.samples += agg.samples;
    }

    /// The most recently accepted hour's means; the merge criterion
    /// compares against these, not the interval averages.
    fn last_point(&self) -> (f32, f32) {
        (
            self.pickups.last().copied().unwrap_or(0.0),
            self.durations.last().copied().unwrap_or(0.0),
        )
    }

    fn into_pattern(self, day: &str) -> TimeSlotPattern {
        let pickup = mean(&self.pickups);
        let duration = mean(&self.durations);

        let pickup_consistency = if pickup > 0.0 {
            1.0 - stddev(&self.pickups) / pickup
        } else {
            0.0
        };
        let duration_consistency = if duration > 0.0 {
            1.0 - stddev(&self.durations) / duration
        } else {
            0.0
        };
        let consistency = (pickup_consistency + duration_consistency) / 2.0;

        let confidence = calculate_confidence(self.samples, pickup, duration, consistency);
        let success = round2(((pickup / 100.0) * (duration / 300.0) * 100.0).min(100.0));

        TimeSlotPattern {
            day: day.to_string(),
            start_hour: self.start,
            end_hour: self.end + 1,
            label: format!("{:02}:00–{:02}:00", self.start, self.end + 1),
            pickup_rate: round2(pickup),
            avg_duration: round2(duration),
            sample_size: self.samples,
            confidence,
            success_probability: success,
            consistency: round2(consistency),
            best_time: false,
        }
    }
}

/// Segment one cluster's member records into ranked call windows.
///
/// Each day is segmented independently; the ranking and best-time
/// flags run across all days. Returns an empty sequence for an empty
/// member set.
pub fn analyze_time_slots(
    records: &[Record],
    members: &[usize],
    config: &EngineConfig,
) -> Vec<TimeSlotPattern> {
    let mut by_day: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
    for &idx in members {
        by_day
            .entry(records[idx].day.as_str())
            .or_default()
            .push(idx);
    }

    let mut patterns = Vec::new();
    for (day, day_members) in by_day {
        let hourly = hourly_aggregates(records, &day_members, config.min_samples);
        for interval in merge_intervals(
            &hourly,
            config.pickup_threshold,
            config.duration_threshold,
        ) {
            patterns.push(interval.into_pattern(day));
        }
    }

    rank_patterns(&mut patterns, config.rank);
    patterns
}

/// Hourly means for one day, ascending by hour, with hours below the
/// sample floor discarded.
fn hourly_aggregates(
    records: &[Record],
    members: &[usize],
    min_samples: usize,
) -> Vec<HourlyAggregate> {
    let mut by_hour: BTreeMap<u8, (Vec<f32>, Vec<f32>)> = BTreeMap::new();
    for &idx in members {
        let record = &records[idx];
        let (pickups, durations) = by_hour.entry(record.hour).or_default();
        pickups.push(record.pickup_rate);
        durations.push(record.call_duration);
    }

    by_hour
        .into_iter()
        .filter(|(_, (pickups, _))| pickups.len() >= min_samples)
        .map(|(hour, (pickups, durations))| HourlyAggregate {
            hour,
            pickup: mean(&pickups),
            duration: mean(&durations),
            samples: pickups.len(),
        })
        .collect()
}

/// Single left-to-right greedy merge: an hour joins the open interval
/// when both gaps against the last accepted hour are within the
/// thresholds; otherwise the interval closes and a new one opens. No
/// backtracking, no re-merging of closed intervals.
fn merge_intervals(
    hours: &[HourlyAggregate],
    pickup_threshold: f32,
    duration_threshold: f32,
) -> Vec<Interval> {
    let mut iter = hours.iter();
    let Some(first) = iter.next() else {
        return Vec::new();
    };

    let mut intervals = Vec::new();
    let mut current = Interval::open(first);
    for agg in iter {
        let (last_pickup, last_duration) = current.last_point();
        if (agg.pickup - last_pickup).abs() <= pickup_threshold
            && (agg.duration - last_duration).abs() <= duration_threshold
        {
            current.extend(agg);
        } else {
            intervals.push(current);
            current = Interval::open(agg);
        }
    }
    intervals.push(current);
    intervals
}
