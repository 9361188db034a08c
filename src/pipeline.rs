//! Batch analysis pipeline
//!
//! Drives one run: partition the arena, then segment and score each
//! discovered cluster. A pure function of (records, spec, config) —
//! no shared mutable state, nothing suspends mid-computation.

use crate::cluster::{self, Cluster, EngineError, FieldSpec};
use crate::config::EngineConfig;
use crate::enrich::ClusterSummarizer;
use crate::record::Record;
use crate::scoring;
use crate::timeslot;
use tracing::{info, warn};

/// Result of one batch analysis.
#[derive(Debug)]
pub struct Analysis {
    pub clusters: Vec<Cluster>,

    /// Size of the normalized record arena
    pub total_records: usize,

    /// Records carrying every configured grouping field
    pub eligible_records: usize,

    /// Records excluded because a configured field was absent
    pub excluded_for_fields: usize,
}

impl Analysis {
    /// Whether the run produced a leftover catch-all cluster.
    pub fn has_leftover(&self) -> bool {
        self.clusters.iter().any(|c| c.merged_from_leftovers)
    }
}

/// Partition the records, then attach call windows, scores, and
/// insights to every cluster.
pub fn analyze(
    records: &[Record],
    spec: &FieldSpec,
    config: &EngineConfig,
) -> Result<Analysis, EngineError> {
    let partition = cluster::partition(records, spec, config)?;
    let excluded_for_fields = partition.excluded.len();
    let mut clusters = partition.clusters;

    for cluster in &mut clusters {
        cluster.patterns = timeslot::analyze_time_slots(records, &cluster.members, config);
        cluster.quality = scoring::quality_score(records, &cluster.members, spec);
        cluster.success_probability = scoring::success_probability(records, &cluster.members);
        cluster.predictive_score = scoring::predictive_score(records, &cluster.members);
        cluster.insights = scoring::cluster_insights(records, &cluster.members);
    }

    info!(clusters = clusters.len(), "analysis complete");

    Ok(Analysis {
        total_records: records.len(),
        eligible_records: records.len() - excluded_for_fields,
        excluded_for_fields,
        clusters,
    })
}

/// Run the optional external refinement over every cluster. A failure
/// becomes an error marker on that cluster's output; the batch never
/// aborts. Retry/timeout policy belongs to the summarizer's owner.
pub fn apply_summaries(clusters: &mut [Cluster], summarizer: &dyn ClusterSummarizer) {
    for (index, cluster) in clusters.iter_mut().enumerate() {
        match summarizer.summarize(cluster) {
            Ok(text) => cluster.suggestion = Some(text),
            Err(e) => {
                warn!(cluster = index, error = %e, "cluster refinement failed");
                cluster.suggestion = Some(format!("Error: {e}"));
            }
        }
    }
}
