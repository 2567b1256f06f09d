//! Replaying a JSONL usage log into the embedded store.

use anyhow::Context;
use covis_config::Config;
use covis_core::{ReportedAction, SimilarityImport, UsageRecorder};
use covis_store::MemoryStore;
use serde::Deserialize;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// One line of the usage log.
#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum LogEntry {
    /// A view or copy reported by the search platform.
    Action(ReportedAction),
    /// An externally computed record similarity.
    Similarity(SimilarityImport),
    /// A record taken out of circulation.
    Deactivate { record_id: String },
}

#[derive(Debug, Default)]
pub struct IngestReport {
    pub actions_recorded: usize,
    pub actions_duplicate: usize,
    pub similarities_stored: usize,
    pub similarities_rejected: usize,
    pub deactivated: usize,
}

/// Loads the log into a fresh store.
pub fn load_store(log: &Path, config: &Config) -> anyhow::Result<(Arc<MemoryStore>, IngestReport)> {
    let store = MemoryStore::with_max_sims_per_record(config.store.max_sims_per_record);
    let mut report = IngestReport::default();

    let file = File::open(log).with_context(|| format!("opening usage log {}", log.display()))?;
    for (line_no, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let entry: LogEntry = serde_json::from_str(&line)
            .with_context(|| format!("parsing line {} of {}", line_no + 1, log.display()))?;
        match entry {
            LogEntry::Action(action) => {
                if store.report_action(&action)? {
                    report.actions_recorded += 1;
                } else {
                    report.actions_duplicate += 1;
                }
            }
            LogEntry::Similarity(import) => {
                if store.import_record_similarity(&import)? {
                    report.similarities_stored += 1;
                } else {
                    report.similarities_rejected += 1;
                }
            }
            LogEntry::Deactivate { record_id } => {
                store.set_record_active(&record_id, false)?;
                report.deactivated += 1;
            }
        }
    }

    info!(
        actions = report.actions_recorded,
        duplicates = report.actions_duplicate,
        similarities = report.similarities_stored,
        "usage log ingested"
    );
    Ok((Arc::new(store), report))
}

pub fn run(log: &Path, config: &Config) -> anyhow::Result<()> {
    let (_, report) = load_store(log, config)?;

    println!(
        "recorded {} actions ({} duplicates ignored), {} similarities ({} rejected), {} records deactivated",
        report.actions_recorded,
        report.actions_duplicate,
        report.similarities_stored,
        report.similarities_rejected,
        report.deactivated
    );
    Ok(())
}
