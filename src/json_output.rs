//! JSON output format for cluster analysis results

use crate::cluster::{Cluster, LEFTOVER_TAG};
use crate::ingest::IngestStats;
use crate::pipeline::Analysis;
use crate::scoring::{self, ClusterInsights};
use crate::timeslot::TimeSlotPattern;
use serde::Serialize;

/// One resolved (label, value) pair of a cluster.
#[derive(Debug, Clone, Serialize)]
pub struct JsonFieldValue {
    pub label: String,
    pub value: String,
}

/// A single cluster with its scores, insights, and call windows.
#[derive(Debug, Clone, Serialize)]
pub struct JsonCluster {
    /// 1-based cluster index
    pub index: usize,
    pub fields: Vec<JsonFieldValue>,
    pub lead_count: usize,
    /// "Leftovers" for the catch-all cluster
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merged_from: Option<String>,
    pub cluster_quality: f32,
    pub success_probability: f32,
    pub predictive_score: f32,
    pub insights: ClusterInsights,
    pub patterns: Vec<TimeSlotPattern>,
    pub recommendations: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

/// Top-level report: run counters plus every cluster.
#[derive(Debug, Clone, Serialize)]
pub struct JsonReport {
    pub rows_seen: usize,
    pub records_loaded: usize,
    pub records_excluded: usize,
    pub records_without_fields: usize,
    pub interrupted: bool,
    pub cluster_count: usize,
    pub clusters: Vec<JsonCluster>,
}

/// Assemble the report for one analysis run.
pub fn build_report(analysis: &Analysis, stats: &IngestStats) -> JsonReport {
    let clusters = analysis
        .clusters
        .iter()
        .enumerate()
        .map(|(i, cluster)| json_cluster(i + 1, cluster))
        .collect();

    JsonReport {
        rows_seen: stats.total_seen,
        records_loaded: stats.loaded,
        records_excluded: stats.excluded_total(),
        records_without_fields: analysis.excluded_for_fields,
        interrupted: stats.interrupted,
        cluster_count: analysis.clusters.len(),
        clusters,
    }
}

fn json_cluster(index: usize, cluster: &Cluster) -> JsonCluster {
    JsonCluster {
        index,
        fields: cluster
            .values
            .iter()
            .map(|(label, value)| JsonFieldValue {
                label: label.clone(),
                value: value.clone(),
            })
            .collect(),
        lead_count: cluster.lead_count,
        merged_from: cluster
            .merged_from_leftovers
            .then(|| LEFTOVER_TAG.to_string()),
        cluster_quality: cluster.quality,
        success_probability: cluster.success_probability,
        predictive_score: cluster.predictive_score,
        insights: cluster.insights.clone(),
        patterns: cluster.patterns.clone(),
        recommendations: scoring::recommendations(cluster),
        suggestion: cluster.suggestion.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_cluster() -> Cluster {
        Cluster {
            values: vec![("AgeGroup".to_string(), "23-27".to_string())],
            members: Vec::new(),
            lead_count: 6000,
            merged_from_leftovers: false,
            quality: 90.0,
            success_probability: 75.0,
            predictive_score: 80.0,
            insights: ClusterInsights::default(),
            patterns: Vec::new(),
            suggestion: None,
        }
    }

    fn minimal_analysis(clusters: Vec<Cluster>) -> Analysis {
        Analysis {
            total_records: 6000,
            eligible_records: 6000,
            excluded_for_fields: 0,
            clusters,
        }
    }

    #[test]
    fn test_report_counters() {
        let stats = IngestStats {
            total_seen: 6100,
            loaded: 6000,
            ..Default::default()
        };
        let report = build_report(&minimal_analysis(vec![minimal_cluster()]), &stats);
        assert_eq!(report.rows_seen, 6100);
        assert_eq!(report.records_loaded, 6000);
        assert_eq!(report.cluster_count, 1);
        assert_eq!(report.clusters[0].index, 1);
    }

    #[test]
    fn test_suggestion_omitted_when_absent() {
        let stats = IngestStats::default();
        let report = build_report(&minimal_analysis(vec![minimal_cluster()]), &stats);
        let json = serde_json::to_string(&report).unwrap();
        assert!(!json.contains("suggestion"));
        assert!(!json.contains("merged_from"));
    }

    #[test]
    fn test_leftover_cluster_tagged() {
        let mut cluster = minimal_cluster();
        cluster.merged_from_leftovers = true;
        let report = build_report(&minimal_analysis(vec![cluster]), &IngestStats::default());
        assert_eq!(report.clusters[0].merged_from.as_deref(), Some("Leftovers"));
    }

    #[test]
    fn test_recommendations_present_for_scored_cluster() {
        // success 75 > 70 and predictive 80 > success
        let report = build_report(
            &minimal_analysis(vec![minimal_cluster()]),
            &IngestStats::default(),
        );
        let recs = &report.clusters[0].recommendations;
        assert!(recs.iter().any(|r| r.contains("High performing")));
        assert!(recs.iter().any(|r| r.contains("Improving trend")));
    }
}
