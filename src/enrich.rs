//! External text-refinement capability
//!
//! The clustering core treats free-form "suggestions" as an opaque,
//! fallible external collaborator behind one narrow interface. The
//! shipped implementation pipes a cluster digest through a local
//! text-generation command (ollama by default). Retry and timeout
//! policy is owned by the caller, not here.

use crate::cluster::Cluster;
use std::io::Write;
use std::process::{Command, Stdio};
use thiserror::Error;

/// Errors from an external summarization call. Always soft: the
/// pipeline turns them into error markers on the affected cluster.
#[derive(Debug, Error)]
pub enum SummaryError {
    #[error("failed to run summarizer: {0}")]
    Io(#[from] std::io::Error),

    #[error("summarizer exited with status {code}: {stderr}")]
    Failed { code: i32, stderr: String },

    #[error("summarizer returned no output")]
    Empty,
}

/// Capability interface for per-cluster refinement.
pub trait ClusterSummarizer {
    fn summarize(&self, cluster: &Cluster) -> Result<String, SummaryError>;
}

const DEFAULT_PROMPT: &str = "You are an expert data analyst. Review the following \
tele-calling cluster and suggest refinements, corrections, or improvements. \
Mention merged city, age, and income ranges explicitly.";

/// Summarizer that shells out to a local text-generation command,
/// `<program> run <model>`, writing the prompt and digest to stdin.
pub struct CommandSummarizer {
    program: String,
    model: String,
    prompt: String,
}

impl CommandSummarizer {
    pub fn new(program: &str, model: &str) -> Self {
        Self {
            program: program.to_string(),
            model: model.to_string(),
            prompt: DEFAULT_PROMPT.to_string(),
        }
    }

    pub fn with_prompt(mut self, prompt: &str) -> Self {
        self.prompt = prompt.to_string();
        self
    }
}

impl ClusterSummarizer for CommandSummarizer {
    fn summarize(&self, cluster: &Cluster) -> Result<String, SummaryError> {
        let mut child = Command::new(&self.program)
            .arg("run")
            .arg(&self.model)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        if let Some(stdin) = child.stdin.as_mut() {
            stdin.write_all(self.prompt.as_bytes())?;
            stdin.write_all(b"\n\n")?;
            stdin.write_all(cluster_digest(cluster).as_bytes())?;
        }

        let output = child.wait_with_output()?;
        if !output.status.success() {
            return Err(SummaryError::Failed {
                code: output.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let text = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if text.is_empty() {
            return Err(SummaryError::Empty);
        }
        Ok(text)
    }
}

/// Plain-text digest of a cluster for the refinement prompt.
pub fn cluster_digest(cluster: &Cluster) -> String {
    let mut digest = String::new();
    for (label, value) in &cluster.values {
        digest.push_str(&format!("{label}: {value}\n"));
    }
    digest.push_str(&format!("LeadCount: {}\n", cluster.lead_count));
    digest.push_str(&format!("ClusterQuality: {}\n", cluster.quality));
    digest.push_str(&format!(
        "SuccessProbability: {}\n",
        cluster.success_probability
    ));
    digest.push_str(&format!("PredictiveScore: {}\n", cluster.predictive_score));
    for pattern in cluster.best_windows() {
        digest.push_str(&format!(
            "BestTime: {} {} (pickup {}%, {}s)\n",
            pattern.day, pattern.label, pattern.pickup_rate, pattern.avg_duration
        ));
    }
    digest
}
