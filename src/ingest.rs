//! Chunked, interruptible record ingestion
//!
//! Streams a JSON array or JSON-lines file of raw contact rows without
//! materializing the document, normalizing in bounded chunks to cap
//! peak memory. A SIGINT sets a process-global flag checked between
//! records: the stream stops cleanly and the run proceeds with
//! whatever was accumulated. Chunking is purely a memory-management
//! technique — clustering starts only after ingestion finishes.

use crate::record::{normalize, RawRecord, Record};
use anyhow::{Context, Result};
use chrono::NaiveDate;
use nix::sys::signal::{self, SigHandler, Signal};
use serde::de::{SeqAccess, Visitor};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info};

static INTERRUPTED: AtomicBool = AtomicBool::new(false);

extern "C" fn on_sigint(_signal: libc::c_int) {
    INTERRUPTED.store(true, Ordering::SeqCst);
}

/// Install the SIGINT handler that lets a user cut ingestion short.
pub fn install_interrupt_handler() -> Result<()> {
    // The handler only stores to an atomic flag (async-signal-safe).
    unsafe { signal::signal(Signal::SIGINT, SigHandler::Handler(on_sigint)) }
        .context("Failed to install SIGINT handler")?;
    Ok(())
}

/// Whether an early stop has been requested.
pub fn interrupted() -> bool {
    INTERRUPTED.load(Ordering::SeqCst)
}

/// Request the same early stop a SIGINT would trigger.
pub fn request_stop() {
    INTERRUPTED.store(true, Ordering::SeqCst);
}

/// Clear the stop flag before a new run.
pub fn reset_interrupt() {
    INTERRUPTED.store(false, Ordering::SeqCst);
}

fn default_chunk_size() -> usize {
    100_000
}

/// Configuration for record ingestion.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Rows normalized per chunk
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Optional cap on rows read from the input
    pub limit: Option<usize>,

    /// Reference date for age computation; today when absent. Fixing
    /// it makes a run reproducible.
    pub reference_date: Option<NaiveDate>,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            limit: None,
            reference_date: None,
        }
    }
}

/// Counters for ingestion monitoring and diagnostics.
#[derive(Debug, Clone, Default)]
pub struct IngestStats {
    /// Raw rows read from the input
    pub total_seen: usize,
    /// Rows that normalized into canonical records
    pub loaded: usize,
    /// Exclusion counts keyed by the missing attribute
    pub excluded: BTreeMap<&'static str, usize>,
    /// Chunks normalized
    pub chunks: usize,
    /// True when the run was cut short by SIGINT
    pub interrupted: bool,
}

impl IngestStats {
    pub fn excluded_total(&self) -> usize {
        self.excluded.values().sum()
    }
}

/// Result of an ingestion run: the record arena plus its counters.
#[derive(Debug)]
pub struct Loaded {
    pub records: Vec<Record>,
    pub stats: IngestStats,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InputFormat {
    /// One JSON array of row objects
    Array,
    /// One row object per line (JSON lines)
    Lines,
}

/// Stream records from `path`, normalizing in chunks.
pub fn load_records<P: AsRef<Path>>(path: P, config: &IngestConfig) -> Result<Loaded> {
    let path = path.as_ref();
    let file = fs::File::open(path)
        .with_context(|| format!("Failed to open input: {}", path.display()))?;
    let mut reader = BufReader::new(file);
    let format = sniff_format(&mut reader)?;

    let today = config
        .reference_date
        .unwrap_or_else(|| chrono::Local::now().date_naive());

    let mut sink = RecordSink {
        config,
        today,
        chunk: Vec::new(),
        records: Vec::new(),
        stats: IngestStats::default(),
        stopped: false,
    };

    match format {
        InputFormat::Array => {
            use serde::Deserializer as _;
            let mut de = serde_json::Deserializer::from_reader(reader);
            let result = de.deserialize_seq(ArrayVisitor { sink: &mut sink });
            // A deliberate early stop abandons the parse mid-array;
            // only surface errors from complete reads.
            if let Err(e) = result {
                if !sink.stopped {
                    return Err(e).with_context(|| {
                        format!("Failed to parse JSON record array: {}", path.display())
                    });
                }
            }
        }
        InputFormat::Lines => {
            for (number, line) in reader.lines().enumerate() {
                let line = line.context("Failed to read input line")?;
                if line.trim().is_empty() {
                    continue;
                }
                let raw: RawRecord = serde_json::from_str(&line)
                    .with_context(|| format!("Invalid record on line {}", number + 1))?;
                if !sink.push(raw) {
                    break;
                }
            }
        }
    }

    sink.flush();
    if sink.stats.interrupted {
        info!(
            loaded = sink.stats.loaded,
            "ingestion interrupted; proceeding with accumulated records"
        );
    }
    info!(
        total_seen = sink.stats.total_seen,
        loaded = sink.stats.loaded,
        excluded = sink.stats.excluded_total(),
        "ingestion complete"
    );

    Ok(Loaded {
        records: sink.records,
        stats: sink.stats,
    })
}

/// Peek the first non-whitespace byte to tell a JSON array from JSON
/// lines, consuming nothing the parser needs.
fn sniff_format<R: BufRead>(reader: &mut R) -> Result<InputFormat> {
    loop {
        let buf = reader.fill_buf().context("Failed to read input")?;
        if buf.is_empty() {
            return Ok(InputFormat::Lines);
        }
        match buf.iter().position(|b| !b.is_ascii_whitespace()) {
            Some(i) => {
                return Ok(if buf[i] == b'[' {
                    InputFormat::Array
                } else {
                    InputFormat::Lines
                });
            }
            None => {
                let len = buf.len();
                reader.consume(len);
            }
        }
    }
}

/// Accumulates raw rows into chunks and normalizes chunk-by-chunk.
struct RecordSink<'a> {
    config: &'a IngestConfig,
    today: NaiveDate,
    chunk: Vec<RawRecord>,
    records: Vec<Record>,
    stats: IngestStats,
    stopped: bool,
}

impl RecordSink<'_> {
    /// Accept one raw row. Returns false when the stream should stop
    /// (interrupt or row limit).
    fn push(&mut self, raw: RawRecord) -> bool {
        if interrupted() {
            self.stats.interrupted = true;
            self.stopped = true;
            return false;
        }

        self.stats.total_seen += 1;
        self.chunk.push(raw);
        if self.chunk.len() >= self.config.chunk_size {
            self.flush();
        }

        if let Some(limit) = self.config.limit {
            if self.stats.total_seen >= limit {
                self.stopped = true;
                return false;
            }
        }
        true
    }

    fn flush(&mut self) {
        if self.chunk.is_empty() {
            return;
        }
        self.stats.chunks += 1;
        for raw in self.chunk.drain(..) {
            match normalize(&raw, self.today) {
                Ok(record) => {
                    self.records.push(record);
                    self.stats.loaded += 1;
                }
                Err(reason) => {
                    *self.stats.excluded.entry(reason.label()).or_default() += 1;
                }
            }
        }
        debug!(
            chunk = self.stats.chunks,
            loaded = self.stats.loaded,
            "chunk normalized"
        );
    }
}

struct ArrayVisitor<'a, 'b> {
    sink: &'a mut RecordSink<'b>,
}

impl<'de, 'a, 'b> Visitor<'de> for ArrayVisitor<'a, 'b> {
    type Value = ();

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("an array of contact records")
    }

    fn visit_seq<A>(self, mut seq: A) -> Result<(), A::Error>
    where
        A: SeqAccess<'de>,
    {
        while let Some(raw) = seq.next_element::<RawRecord>()? {
            if !self.sink.push(raw) {
                break;
            }
        }
        Ok(())
    }
}
