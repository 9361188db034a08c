//! CSV output for cluster analysis results
//!
//! Flattens clusters into one row per time-slot pattern (cluster
//! columns repeated), or a single blank-slot row for a cluster with no
//! patterns, so the file loads straight into a spreadsheet.

use crate::cluster::{Cluster, LEFTOVER_TAG};
use crate::scoring::Trend;

/// CSV output formatter for flattened cluster rows.
#[derive(Debug)]
pub struct CsvOutput {
    labels: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl CsvOutput {
    /// Create a formatter for the given field-spec output labels.
    pub fn new(labels: Vec<String>) -> Self {
        Self {
            labels,
            rows: Vec::new(),
        }
    }

    /// Append one cluster's rows. `index` is the 1-based cluster index.
    pub fn add_cluster(&mut self, index: usize, cluster: &Cluster) {
        let base = self.base_fields(index, cluster);

        if cluster.patterns.is_empty() {
            let mut row = base;
            row.extend(blank_slot_fields());
            row.push(suggestion_field(cluster));
            self.rows.push(row);
            return;
        }

        for pattern in &cluster.patterns {
            let mut row = base.clone();
            row.push(pattern.day.clone());
            row.push(pattern.label.clone());
            row.push(pattern.pickup_rate.to_string());
            row.push(pattern.avg_duration.to_string());
            row.push(pattern.sample_size.to_string());
            row.push(pattern.confidence.to_string());
            row.push(pattern.success_probability.to_string());
            row.push(pattern.consistency.to_string());
            row.push(pattern.best_time.to_string());
            row.push(suggestion_field(cluster));
            self.rows.push(row);
        }
    }

    fn base_fields(&self, index: usize, cluster: &Cluster) -> Vec<String> {
        let mut fields = vec![index.to_string()];
        for label in &self.labels {
            fields.push(cluster.value(label).unwrap_or("").to_string());
        }
        fields.push(cluster.lead_count.to_string());
        fields.push(if cluster.merged_from_leftovers {
            LEFTOVER_TAG.to_string()
        } else {
            String::new()
        });
        fields.push(cluster.quality.to_string());
        fields.push(cluster.success_probability.to_string());
        fields.push(cluster.predictive_score.to_string());

        let insights = &cluster.insights;
        fields.push(insights.avg_pickup_rate.to_string());
        fields.push(insights.pickup_stddev.to_string());
        fields.push(insights.avg_duration.to_string());
        fields.push(insights.duration_stddev.to_string());
        fields.push(opt_string(insights.total_call_volume));
        fields.push(insights.peak_day.clone().unwrap_or_default());
        fields.push(opt_string(insights.peak_hour));
        fields.push(
            insights
                .recommended_frequency
                .map(|f| f.to_string())
                .unwrap_or_default(),
        );
        let (pickup_trend, pickup_score) = trend_fields(&insights.pickup_trend);
        let (duration_trend, duration_score) = trend_fields(&insights.duration_trend);
        fields.push(pickup_trend);
        fields.push(pickup_score);
        fields.push(duration_trend);
        fields.push(duration_score);
        fields
    }

    /// Generate the CSV header row.
    fn header(&self) -> String {
        let mut headers = vec!["ClusterIndex".to_string()];
        headers.extend(self.labels.iter().cloned());
        for name in [
            "LeadCount",
            "MergedFrom",
            "ClusterQuality",
            "SuccessProbability",
            "PredictiveScore",
            "AvgPickupRate",
            "PickupStdDev",
            "AvgDuration",
            "DurationStdDev",
            "TotalCallVolume",
            "PeakDay",
            "PeakHour",
            "RecommendedFrequency",
            "PickupTrend",
            "PickupTrendScore",
            "DurationTrend",
            "DurationTrendScore",
            "Day",
            "Time",
            "SlotPickupRate",
            "SlotAvgDuration",
            "SlotSampleSize",
            "Confidence",
            "SlotSuccessProbability",
            "ConsistencyScore",
            "BestTime",
            "Suggestion",
        ] {
            headers.push(name.to_string());
        }
        headers
            .iter()
            .map(|h| Self::escape_field(h))
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Escape a CSV field (handle commas, quotes, newlines).
    fn escape_field(field: &str) -> String {
        if field.contains(',') || field.contains('"') || field.contains('\n') {
            format!("\"{}\"", field.replace('"', "\"\""))
        } else {
            field.to_string()
        }
    }

    /// Generate CSV output as a string.
    pub fn to_csv(&self) -> String {
        let mut output = String::new();
        output.push_str(&self.header());
        output.push('\n');
        for row in &self.rows {
            let line: Vec<String> = row.iter().map(|f| Self::escape_field(f)).collect();
            output.push_str(&line.join(","));
            output.push('\n');
        }
        output
    }
}

fn blank_slot_fields() -> Vec<String> {
    let mut fields = vec![String::new(); 8];
    fields.push("false".to_string());
    fields
}

fn suggestion_field(cluster: &Cluster) -> String {
    cluster.suggestion.clone().unwrap_or_default()
}

fn opt_string<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn trend_fields(trend: &Option<Trend>) -> (String, String) {
    match trend {
        Some(t) => (t.direction.to_string(), t.magnitude.to_string()),
        None => (String::new(), String::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::ClusterInsights;
    use crate::timeslot::TimeSlotPattern;

    fn pattern(day: &str, best: bool) -> TimeSlotPattern {
        TimeSlotPattern {
            day: day.to_string(),
            start_hour: 9,
            end_hour: 11,
            label: "09:00–11:00".to_string(),
            pickup_rate: 40.5,
            avg_duration: 205.0,
            sample_size: 120,
            confidence: 75.0,
            success_probability: 27.67,
            consistency: 0.98,
            best_time: best,
        }
    }

    fn cluster_with_patterns(patterns: Vec<TimeSlotPattern>) -> Cluster {
        Cluster {
            values: vec![
                ("AgeGroup".to_string(), "23-27".to_string()),
                ("CityId".to_string(), "2,3".to_string()),
            ],
            members: Vec::new(),
            lead_count: 6000,
            merged_from_leftovers: false,
            quality: 82.5,
            success_probability: 41.0,
            predictive_score: 35.2,
            insights: ClusterInsights::default(),
            patterns,
            suggestion: None,
        }
    }

    #[test]
    fn test_header_includes_labels_and_slot_columns() {
        let output = CsvOutput::new(vec!["AgeGroup".to_string(), "CityId".to_string()]);
        let header = output.header();
        assert!(header.starts_with("ClusterIndex,AgeGroup,CityId,LeadCount"));
        assert!(header.contains("SlotPickupRate"));
        assert!(header.ends_with("BestTime,Suggestion"));
    }

    #[test]
    fn test_one_row_per_pattern() {
        let mut output = CsvOutput::new(vec!["AgeGroup".to_string(), "CityId".to_string()]);
        output.add_cluster(
            1,
            &cluster_with_patterns(vec![pattern("Monday", true), pattern("Friday", false)]),
        );
        let csv = output.to_csv();
        assert_eq!(csv.lines().count(), 3);
        assert!(csv.contains("Monday"));
        assert!(csv.contains("Friday"));
    }

    #[test]
    fn test_patternless_cluster_gets_blank_slot_row() {
        let mut output = CsvOutput::new(vec!["AgeGroup".to_string(), "CityId".to_string()]);
        output.add_cluster(1, &cluster_with_patterns(Vec::new()));
        let csv = output.to_csv();
        assert_eq!(csv.lines().count(), 2);
        let row = csv.lines().nth(1).unwrap();
        assert!(row.contains(",false,"));
    }

    #[test]
    fn test_comma_joined_values_are_quoted() {
        let mut output = CsvOutput::new(vec!["AgeGroup".to_string(), "CityId".to_string()]);
        output.add_cluster(1, &cluster_with_patterns(Vec::new()));
        let csv = output.to_csv();
        assert!(csv.contains("\"2,3\""));
    }

    #[test]
    fn test_escape_field() {
        assert_eq!(CsvOutput::escape_field("plain"), "plain");
        assert_eq!(CsvOutput::escape_field("a,b"), "\"a,b\"");
        assert_eq!(CsvOutput::escape_field("say \"hi\""), "\"say \"\"hi\"\"\"");
    }

    #[test]
    fn test_leftover_tag_in_merged_from_column() {
        let mut cluster = cluster_with_patterns(Vec::new());
        cluster.merged_from_leftovers = true;
        let mut output = CsvOutput::new(vec!["AgeGroup".to_string(), "CityId".to_string()]);
        output.add_cluster(2, &cluster);
        assert!(output.to_csv().contains("Leftovers"));
    }
}
