//! Priority-ordered combinatorial partition engine
//!
//! Walks field subsets from most specific (all configured fields) down
//! to single fields; at each level, every subset is grouped over the
//! still-unassigned pool and any group reaching the minimum size is
//! carved out as a cluster. Records never captured by a qualifying
//! subset end up in one merged leftover cluster, so every eligible
//! record is covered exactly once.
//!
//! Assignment state lives in a flat index array parallel to the record
//! arena, mutated only here. Iteration order is stable everywhere
//! (lexicographic subsets, sorted group keys), so identical input
//! yields byte-identical output.

use crate::cluster::fields::{Field, FieldBinding, FieldSpec};
use crate::config::{EngineConfig, GroupingMode};
use crate::record::Record;
use crate::scoring::ClusterInsights;
use crate::timeslot::TimeSlotPattern;
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;
use tracing::{debug, info};

/// Placeholder value for fields outside the subset that produced a
/// cluster.
pub const ANY_VALUE: &str = "any";

/// Tag reported for the catch-all cluster of never-captured records.
pub const LEFTOVER_TAG: &str = "Leftovers";

/// Fatal errors that abort a clustering run before any work starts.
/// Everything softer (undersized groups, incomplete records) is
/// absorbed into the output instead.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("no usable grouping fields configured")]
    NoFields,

    #[error("stratified grouping requires the '{0}' field in the spec")]
    MissingPrimaryField(&'static str),

    #[error("invalid engine configuration: {0}")]
    InvalidConfig(String),
}

/// One discovered micro-cluster.
///
/// Created exactly once by the engine and never merged or split. The
/// score, insight, pattern, and suggestion fields start empty and are
/// appended post-hoc by the pipeline.
#[derive(Debug, Clone)]
pub struct Cluster {
    /// Output label -> resolved value, in field-spec order. A single
    /// uniform value, a sorted comma-joined multi-value (leftover
    /// cluster), or [`ANY_VALUE`].
    pub values: Vec<(String, String)>,

    /// Arena indices of member records; each record appears in exactly
    /// one cluster.
    pub members: Vec<usize>,

    pub lead_count: usize,

    /// True for the single catch-all cluster of leftover records.
    pub merged_from_leftovers: bool,

    /// Homogeneity score, 0-100.
    pub quality: f32,

    /// Success probability, 0-100.
    pub success_probability: f32,

    pub predictive_score: f32,

    pub insights: ClusterInsights,

    /// Ranked call windows; at most 3 flagged best.
    pub patterns: Vec<TimeSlotPattern>,

    /// External refinement text, or an error marker when the
    /// enrichment call failed.
    pub suggestion: Option<String>,
}

impl Cluster {
    fn new(values: Vec<(String, String)>, members: Vec<usize>, merged_from_leftovers: bool) -> Self {
        Self {
            values,
            lead_count: members.len(),
            members,
            merged_from_leftovers,
            quality: 0.0,
            success_probability: 0.0,
            predictive_score: 0.0,
            insights: ClusterInsights::default(),
            patterns: Vec::new(),
            suggestion: None,
        }
    }

    /// Resolved value for an output label, if that label is configured.
    pub fn value(&self, label: &str) -> Option<&str> {
        self.values
            .iter()
            .find(|(l, _)| l == label)
            .map(|(_, v)| v.as_str())
    }

    /// Patterns flagged as best call windows, in rank order.
    pub fn best_windows(&self) -> impl Iterator<Item = &TimeSlotPattern> {
        self.patterns.iter().filter(|p| p.best_time)
    }
}

/// Result of a partition run.
#[derive(Debug)]
pub struct Partition {
    pub clusters: Vec<Cluster>,

    /// Cluster id per arena index; None for records excluded from
    /// clustering (missing a configured field).
    pub assigned: Vec<Option<u32>>,

    /// Arena indices excluded because a configured field was absent.
    pub excluded: Vec<usize>,
}

/// Partition the record arena into micro-clusters.
pub fn partition(
    records: &[Record],
    spec: &FieldSpec,
    config: &EngineConfig,
) -> Result<Partition, EngineError> {
    if spec.is_empty() {
        return Err(EngineError::NoFields);
    }
    config.validate().map_err(EngineError::InvalidConfig)?;

    let bindings = spec.bindings();
    let mut assigned: Vec<Option<u32>> = vec![None; records.len()];

    let mut eligible = Vec::new();
    let mut excluded = Vec::new();
    for (idx, record) in records.iter().enumerate() {
        if bindings.iter().all(|b| b.field.value(record).is_some()) {
            eligible.push(idx);
        } else {
            excluded.push(idx);
        }
    }
    if !excluded.is_empty() {
        info!(
            excluded = excluded.len(),
            "records missing configured fields excluded from clustering"
        );
    }

    // Spec positions of the primary pair (stratified) and of the
    // searchable fields.
    let primary: Vec<usize> = match config.grouping {
        GroupingMode::Unstratified => Vec::new(),
        GroupingMode::Stratified => {
            let age = spec
                .position(Field::AgeBracket)
                .ok_or(EngineError::MissingPrimaryField("age_bracket"))?;
            let income = spec
                .position(Field::IncomeBracket)
                .ok_or(EngineError::MissingPrimaryField("income_bracket"))?;
            let mut pair = [age, income];
            pair.sort_unstable();
            pair.to_vec()
        }
    };
    let search: Vec<usize> = (0..bindings.len())
        .filter(|i| !primary.contains(i))
        .collect();

    let mut strata: BTreeMap<Vec<String>, Vec<usize>> = BTreeMap::new();
    for &idx in &eligible {
        let key: Vec<String> = primary
            .iter()
            .map(|&i| field_value(bindings[i].field, &records[idx]))
            .collect();
        strata.entry(key).or_default().push(idx);
    }

    let mut clusters: Vec<Cluster> = Vec::new();
    for (stratum_key, stratum_members) in &strata {
        search_stratum(
            records,
            spec,
            config,
            &primary,
            stratum_key,
            &search,
            stratum_members,
            &mut assigned,
            &mut clusters,
        );
    }

    let leftover: Vec<usize> = eligible
        .iter()
        .copied()
        .filter(|&i| assigned[i].is_none())
        .collect();
    if !leftover.is_empty() {
        let id = clusters.len() as u32;
        for &m in &leftover {
            assigned[m] = Some(id);
        }
        let values = bindings
            .iter()
            .map(|b| (b.label.clone(), join_distinct(records, &leftover, b.field)))
            .collect();
        clusters.push(Cluster::new(values, leftover, true));
    }

    info!(
        clusters = clusters.len(),
        eligible = eligible.len(),
        "partition complete"
    );

    Ok(Partition {
        clusters,
        assigned,
        excluded,
    })
}

/// Run the subset search for one stratum, from the most specific level
/// down, stopping early once the stratum is fully assigned.
#[allow(clippy::too_many_arguments)]
fn search_stratum(
    records: &[Record],
    spec: &FieldSpec,
    config: &EngineConfig,
    primary: &[usize],
    stratum_key: &[String],
    search: &[usize],
    stratum_members: &[usize],
    assigned: &mut [Option<u32>],
    clusters: &mut Vec<Cluster>,
) {
    let bindings = spec.bindings();

    for level in (1..=search.len()).rev() {
        for combo in combinations(search.len(), level) {
            let subset: Vec<usize> = combo.iter().map(|&i| search[i]).collect();

            let mut groups: BTreeMap<Vec<String>, Vec<usize>> = BTreeMap::new();
            for &idx in stratum_members {
                if assigned[idx].is_some() {
                    continue;
                }
                let key: Vec<String> = subset
                    .iter()
                    .map(|&f| field_value(bindings[f].field, &records[idx]))
                    .collect();
                groups.entry(key).or_default().push(idx);
            }

            for (key, members) in groups {
                // Undersized groups simply don't qualify at this level
                if members.len() < config.min_cluster_size {
                    continue;
                }
                let id = clusters.len() as u32;
                for &m in &members {
                    assigned[m] = Some(id);
                }
                let values = resolve_values(bindings, primary, stratum_key, &subset, &key);
                clusters.push(Cluster::new(values, members, false));
            }
        }

        let remaining = stratum_members
            .iter()
            .filter(|&&i| assigned[i].is_none())
            .count();
        debug!(
            level,
            clusters = clusters.len(),
            remaining,
            "subset level complete"
        );
        if remaining == 0 {
            break;
        }
    }
}

/// Resolve one value per configured field, in spec order: the stratum
/// value for primary fields, the group-key value for subset fields,
/// and the `any` placeholder for the rest.
fn resolve_values(
    bindings: &[FieldBinding],
    primary: &[usize],
    stratum_key: &[String],
    subset: &[usize],
    key: &[String],
) -> Vec<(String, String)> {
    bindings
        .iter()
        .enumerate()
        .map(|(i, b)| {
            let value = if let Some(p) = primary.iter().position(|&x| x == i) {
                stratum_key[p].clone()
            } else if let Some(s) = subset.iter().position(|&x| x == i) {
                key[s].clone()
            } else {
                ANY_VALUE.to_string()
            };
            (b.label.clone(), value)
        })
        .collect()
}

fn field_value(field: Field, record: &Record) -> String {
    field.value(record).unwrap_or("").to_string()
}

/// Sorted, de-duplicated, comma-joined values of a field over a member
/// pool. Used for the leftover cluster, where fields are heterogeneous.
fn join_distinct(records: &[Record], members: &[usize], field: Field) -> String {
    let distinct: BTreeSet<&str> = members
        .iter()
        .filter_map(|&i| field.value(&records[i]))
        .collect();
    distinct.into_iter().collect::<Vec<_>>().join(",")
}

/// All k-subsets of 0..n in lexicographic order.
fn combinations(n: usize, k: usize) -> Vec<Vec<usize>> {
    if k == 0 || k > n {
        return Vec::new();
    }
    let mut out = Vec::new();
    let mut combo: Vec<usize> = (0..k).collect();
    loop {
        out.push(combo.clone());
        let mut i = k as isize - 1;
        while i >= 0 && combo[i as usize] == i as usize + n - k {
            i -= 1;
        }
        if i < 0 {
            break;
        }
        let i = i as usize;
        combo[i] += 1;
        for j in i + 1..k {
            combo[j] = combo[j - 1] + 1;
        }
    }
    out
}
