// Homogeneity, success-probability, and predictive scoring, plus the
// auxiliary behavioral/trend insights reported per cluster.

use crate::cluster::{Cluster, FieldSpec};
use crate::record::Record;
use crate::scoring::statistics::{consistency, mean, round2, slope, stddev};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Clusters below this member count score 0: too small a basis.
pub const MIN_SCORED_MEMBERS: usize = 10;

/// Call durations saturate the duration factor at this many seconds.
const DURATION_SATURATION_SECS: f32 = 300.0;

/// Member counts saturate the sample factor at this size.
const SAMPLE_SATURATION: f32 = 1000.0;

/// Trends compare the most recent window of members to the whole set.
const TREND_WINDOW: usize = 100;
const TREND_MIN_SAMPLES: usize = 10;

/// Direction of a recent metric trend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Improving,
    Declining,
}

impl fmt::Display for TrendDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrendDirection::Improving => write!(f, "improving"),
            TrendDirection::Declining => write!(f, "declining"),
        }
    }
}

/// Sign and strength of a least-squares trend over the recent window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trend {
    pub direction: TrendDirection,
    /// |slope| of the metric over the window
    pub magnitude: f32,
}

/// Recommended daily call frequency band, from mean pickup rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CallFrequency {
    High,
    Medium,
    Low,
}

impl fmt::Display for CallFrequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallFrequency::High => write!(f, "High (3-5 calls/day)"),
            CallFrequency::Medium => write!(f, "Medium (2-3 calls/day)"),
            CallFrequency::Low => write!(f, "Low (1-2 calls/day)"),
        }
    }
}

/// Auxiliary descriptive fields for a cluster. Never used for
/// partitioning decisions.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ClusterInsights {
    pub avg_pickup_rate: f32,
    pub pickup_stddev: f32,
    pub avg_duration: f32,
    pub duration_stddev: f32,

    /// Summed TotalCalls, when the export carries that column
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_call_volume: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub peak_day: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub peak_hour: Option<u8>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub recommended_frequency: Option<CallFrequency>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub pickup_trend: Option<Trend>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_trend: Option<Trend>,
}

/// Homogeneity score, 0-100: how internally uniform the cluster's
/// configured categorical fields are. Averages `1 - distinct/members`
/// over the fields present on the members.
pub fn quality_score(records: &[Record], members: &[usize], spec: &FieldSpec) -> f32 {
    if members.len() < MIN_SCORED_MEMBERS {
        return 0.0;
    }

    let mut total = 0.0;
    let mut counted = 0;
    for binding in spec.bindings() {
        let distinct: std::collections::BTreeSet<&str> = members
            .iter()
            .filter_map(|&i| binding.field.value(&records[i]))
            .collect();
        if distinct.is_empty() {
            continue;
        }
        total += 1.0 - distinct.len() as f32 / members.len() as f32;
        counted += 1;
    }

    if counted == 0 {
        return 0.0;
    }
    round2(total / counted as f32 * 100.0)
}

/// Success probability, 0-100: base pickup rate damped by duration,
/// consistency, and sample-size factors.
pub fn success_probability(records: &[Record], members: &[usize]) -> f32 {
    if members.len() < MIN_SCORED_MEMBERS {
        return 0.0;
    }

    let pickups: Vec<f32> = members.iter().map(|&i| records[i].pickup_rate).collect();
    let durations: Vec<f32> = members.iter().map(|&i| records[i].call_duration).collect();

    let avg_pickup = mean(&pickups);
    let duration_factor = (mean(&durations) / DURATION_SATURATION_SECS).min(1.0);
    let consistency_factor = consistency(&pickups);
    let sample_factor = (members.len() as f32 / SAMPLE_SATURATION).min(1.0);

    round2((avg_pickup / 100.0) * duration_factor * consistency_factor * sample_factor * 100.0)
}

/// Predictive score: success probability projected forward by the
/// recent trend (1.2 when the last window's mean pickup beats the
/// overall mean, else 0.8), damped again by consistency and sample
/// factors.
pub fn predictive_score(records: &[Record], members: &[usize]) -> f32 {
    if members.len() < MIN_SCORED_MEMBERS {
        return 0.0;
    }

    let base = success_probability(records, members);

    let pickups: Vec<f32> = members.iter().map(|&i| records[i].pickup_rate).collect();
    let overall = mean(&pickups);
    let tail_start = pickups.len().saturating_sub(TREND_WINDOW);
    let recent = mean(&pickups[tail_start..]);
    let trend_factor = if recent > overall { 1.2 } else { 0.8 };

    let consistency_factor = consistency(&pickups);
    let sample_factor = (members.len() as f32 / SAMPLE_SATURATION).min(1.0);

    round2(base * trend_factor * consistency_factor * sample_factor)
}

/// Behavioral and trend insights for a cluster's member set.
pub fn cluster_insights(records: &[Record], members: &[usize]) -> ClusterInsights {
    let pickups: Vec<f32> = members.iter().map(|&i| records[i].pickup_rate).collect();
    let durations: Vec<f32> = members.iter().map(|&i| records[i].call_duration).collect();

    let avg_pickup = mean(&pickups);
    let mut insights = ClusterInsights {
        avg_pickup_rate: round2(avg_pickup),
        pickup_stddev: round2(stddev(&pickups)),
        avg_duration: round2(mean(&durations)),
        duration_stddev: round2(stddev(&durations)),
        ..ClusterInsights::default()
    };

    // Call volume peaks, only when the export carries TotalCalls
    let mut day_volume: BTreeMap<&str, u64> = BTreeMap::new();
    let mut hour_volume: BTreeMap<u8, u64> = BTreeMap::new();
    let mut total_volume = 0u64;
    let mut have_volume = false;
    for &idx in members {
        let record = &records[idx];
        if let Some(calls) = record.total_calls {
            have_volume = true;
            total_volume += u64::from(calls);
            *day_volume.entry(record.day.as_str()).or_default() += u64::from(calls);
            *hour_volume.entry(record.hour).or_default() += u64::from(calls);
        }
    }
    if have_volume {
        insights.total_call_volume = Some(total_volume);
        insights.peak_day = peak_key(&day_volume).map(str::to_string);
        insights.peak_hour = peak_key(&hour_volume);
    }

    insights.recommended_frequency = Some(if avg_pickup > 50.0 {
        CallFrequency::High
    } else if avg_pickup > 30.0 {
        CallFrequency::Medium
    } else {
        CallFrequency::Low
    });

    if members.len() >= TREND_MIN_SAMPLES {
        let start = pickups.len().saturating_sub(TREND_WINDOW);
        insights.pickup_trend = Some(trend_of(&pickups[start..]));
        insights.duration_trend = Some(trend_of(&durations[start..]));
    }

    insights
}

/// Rule-based actionable recommendations for a scored cluster.
pub fn recommendations(cluster: &Cluster) -> Vec<String> {
    let mut recs = Vec::new();

    if cluster.success_probability > 70.0 {
        recs.push("High performing cluster - increase call volume".to_string());
    } else if cluster.success_probability < 30.0 {
        recs.push("Low performing cluster - optimize timing or reconsider approach".to_string());
    }

    if cluster.predictive_score > cluster.success_probability {
        recs.push("Improving trend - maintain current strategy".to_string());
    } else if cluster.predictive_score < cluster.success_probability {
        recs.push("Declining trend - review and adjust strategy".to_string());
    }

    if cluster.quality > 80.0 {
        recs.push("Well-defined cluster - highly targeted approach recommended".to_string());
    } else if cluster.quality < 50.0 {
        recs.push("Heterogeneous cluster - consider sub-segmentation".to_string());
    }

    let windows: Vec<&str> = cluster
        .best_windows()
        .take(2)
        .map(|p| p.label.as_str())
        .collect();
    if !windows.is_empty() {
        recs.push(format!("Focus calls during: {}", windows.join(", ")));
    }

    if let Some(frequency) = cluster.insights.recommended_frequency {
        recs.push(format!("Call frequency: {}", frequency));
    }

    recs
}

fn trend_of(window: &[f32]) -> Trend {
    let s = slope(window);
    Trend {
        direction: if s > 0.0 {
            TrendDirection::Improving
        } else {
            TrendDirection::Declining
        },
        magnitude: s.abs(),
    }
}

/// Key with the largest value; ties resolve to the first key in sorted
/// order.
fn peak_key<K: Clone + Ord>(volumes: &BTreeMap<K, u64>) -> Option<K> {
    let mut best: Option<(&K, u64)> = None;
    for (key, &volume) in volumes {
        match best {
            Some((_, best_volume)) if volume <= best_volume => {}
            _ => best = Some((key, volume)),
        }
    }
    best.map(|(k, _)| k.clone())
}
