use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::Parser;
use llamada::cli::{Cli, OutputFormat};
use llamada::cluster::FieldSpec;
use llamada::csv_output::CsvOutput;
use llamada::enrich::CommandSummarizer;
use llamada::ingest::{self, IngestConfig, IngestStats};
use llamada::pipeline::{self, Analysis};
use llamada::{json_output, scoring};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber for diagnostics on stderr
fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    run(cli)
}

fn run(cli: Cli) -> Result<()> {
    let spec = match &cli.fields {
        Some(path) => FieldSpec::from_toml(path)?,
        None => FieldSpec::default_calling_fields()?,
    };

    let reference_date = cli
        .reference_date
        .as_deref()
        .map(|text| {
            NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .with_context(|| format!("Invalid --reference-date: {}", text))
        })
        .transpose()?;

    ingest::install_interrupt_handler()?;
    let ingest_config = IngestConfig {
        chunk_size: cli.chunk_size,
        limit: cli.limit,
        reference_date,
    };
    let loaded = ingest::load_records(&cli.input, &ingest_config)?;
    if loaded.records.is_empty() {
        anyhow::bail!("No usable records in {}", cli.input.display());
    }

    info!(records = loaded.records.len(), "clustering");
    let config = cli.engine_config();
    let mut analysis = pipeline::analyze(&loaded.records, &spec, &config)?;

    if let Some(model) = &cli.refine {
        let summarizer = CommandSummarizer::new(&cli.refine_cmd, model);
        pipeline::apply_summaries(&mut analysis.clusters, &summarizer);
    }

    match cli.format {
        OutputFormat::Text => print_summary(&analysis, &loaded.stats),
        OutputFormat::Json => {
            let report = json_output::build_report(&analysis, &loaded.stats);
            let text =
                serde_json::to_string_pretty(&report).context("Failed to serialize report")?;
            write_or_print(&cli, text)?;
        }
        OutputFormat::Csv => {
            let labels: Vec<String> = spec.bindings().iter().map(|b| b.label.clone()).collect();
            let mut output = CsvOutput::new(labels);
            for (i, cluster) in analysis.clusters.iter().enumerate() {
                output.add_cluster(i + 1, cluster);
            }
            write_or_print(&cli, output.to_csv())?;
        }
    }

    Ok(())
}

/// Write machine output to --output, or stdout when absent.
fn write_or_print(cli: &Cli, content: String) -> Result<()> {
    match &cli.output {
        Some(path) => {
            std::fs::write(path, content)
                .with_context(|| format!("Failed to write output: {}", path.display()))?;
            info!(path = %path.display(), "output written");
        }
        None => print!("{}", content),
    }
    Ok(())
}

/// Human-readable run summary on stdout.
fn print_summary(analysis: &Analysis, stats: &IngestStats) {
    println!("=== Micro-Cluster Analysis ===");
    println!(
        "rows seen: {}   loaded: {}   excluded: {}",
        stats.total_seen,
        stats.loaded,
        stats.excluded_total()
    );
    if !stats.excluded.is_empty() {
        let reasons: Vec<String> = stats
            .excluded
            .iter()
            .map(|(reason, count)| format!("{}={}", reason, count))
            .collect();
        println!("excluded by reason: {}", reasons.join(" "));
    }
    if analysis.excluded_for_fields > 0 {
        println!(
            "records missing configured fields: {}",
            analysis.excluded_for_fields
        );
    }
    if stats.interrupted {
        println!("(ingestion interrupted; results cover accumulated rows only)");
    }
    println!();

    for (i, cluster) in analysis.clusters.iter().enumerate() {
        let tag = if cluster.merged_from_leftovers {
            " [Leftovers]"
        } else {
            ""
        };
        let values: Vec<String> = cluster
            .values
            .iter()
            .map(|(label, value)| format!("{}={}", label, value))
            .collect();
        println!("Cluster {}{}: {}", i + 1, tag, values.join(", "));
        println!(
            "  leads {}   quality {:.2}   success {:.2}   predictive {:.2}",
            cluster.lead_count,
            cluster.quality,
            cluster.success_probability,
            cluster.predictive_score
        );
        for window in cluster.best_windows() {
            println!(
                "  best: {} {} (pickup {:.2}%, {:.2}s, confidence {:.2})",
                window.day,
                window.label,
                window.pickup_rate,
                window.avg_duration,
                window.confidence
            );
        }
        for recommendation in scoring::recommendations(cluster) {
            println!("  - {}", recommendation);
        }
        println!();
    }

    println!(
        "{} clusters over {} records",
        analysis.clusters.len(),
        analysis.eligible_records
    );
}
