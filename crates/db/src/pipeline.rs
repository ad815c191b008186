//! Period posting pipeline.
//!
//! Runs one accounting period end to end: load the source batch, resolve a
//! template per routing group, expand groups into balanced journals, stage
//! them, post them into the ledger, and refresh the balance snapshots.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::fmt;
use std::time::{Duration, Instant};

use sea_orm::DatabaseConnection;
use tracing::info;

use saldo_core::batch::TransactionBatch;
use saldo_core::journal::{ExpansionEngine, ExpansionError};
use saldo_core::template::{Template, TemplateId};
use saldo_shared::{AppConfig, Period, RunId};

use crate::repositories::{
    BalanceError, BalanceRepository, LedgerRepository, PostOutcome, PostingError, StagingError,
    StagingRepository, TemplateError, TemplateRepository, TxnSourceError, TxnSourceRepository,
};

/// Errors from a pipeline run. The first failing stage aborts the run.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Source load failed.
    #[error("Source load failed: {0}")]
    Source(#[from] TxnSourceError),

    /// Template resolution failed.
    #[error("Template resolution failed: {0}")]
    Template(#[from] TemplateError),

    /// Journal expansion failed.
    #[error("Expansion failed: {0}")]
    Expansion(#[from] ExpansionError),

    /// Staging write failed.
    #[error("Staging failed: {0}")]
    Staging(#[from] StagingError),

    /// Ledger posting failed.
    #[error("Posting failed: {0}")]
    Posting(#[from] PostingError),

    /// Balance snapshot failed.
    #[error("Snapshot failed: {0}")]
    Snapshot(#[from] BalanceError),
}

/// Row count and wall-clock duration of one pipeline stage.
#[derive(Debug, Clone, Copy)]
pub struct StageTiming {
    /// Stage name.
    pub stage: &'static str,
    /// Rows the stage handled.
    pub rows: u64,
    /// Wall-clock time spent in the stage.
    pub duration: Duration,
}

impl StageTiming {
    const fn new(stage: &'static str, rows: u64, duration: Duration) -> Self {
        Self {
            stage,
            rows,
            duration,
        }
    }
}

/// Outcome of one expansion run within the pipeline.
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// Run id minted at expansion.
    pub run_id: RunId,
    /// Template the run expanded.
    pub template: TemplateId,
    /// Source transactions in the run.
    pub transactions: usize,
    /// Journal lines the run produced.
    pub lines: usize,
    /// Whether this invocation posted the run (false = already posted).
    pub posted: bool,
}

/// Summary of one full pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineReport {
    /// Period the pipeline ran for.
    pub period: Period,
    /// Source transactions loaded.
    pub source_rows: usize,
    /// Per-template expansion runs, in template order.
    pub runs: Vec<RunSummary>,
    /// Balance snapshot rows upserted.
    pub snapshot_rows: u64,
    /// Per-stage timings, in execution order.
    pub timings: Vec<StageTiming>,
}

impl PipelineReport {
    /// Total ledger lines across all posted runs.
    #[must_use]
    pub fn total_lines(&self) -> usize {
        self.runs.iter().map(|r| r.lines).sum()
    }
}

impl fmt::Display for PipelineReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "period {}: {} transactions, {} runs, {} lines, {} snapshot rows",
            self.period,
            self.source_rows,
            self.runs.len(),
            self.total_lines(),
            self.snapshot_rows
        )?;
        for run in &self.runs {
            let status = if run.posted { "posted" } else { "already posted" };
            writeln!(
                f,
                "  run {} [{}]: {} transactions, {} lines, {}",
                run.run_id, run.template, run.transactions, run.lines, status
            )?;
        }
        for timing in &self.timings {
            writeln!(
                f,
                "  {:<9} {:>8} rows  {:?}",
                timing.stage, timing.rows, timing.duration
            )?;
        }
        Ok(())
    }
}

/// Orchestrates the period posting pipeline over the repositories.
pub struct PipelineRunner {
    engine: ExpansionEngine,
    sources: TxnSourceRepository,
    templates: TemplateRepository,
    staging: StagingRepository,
    ledger: LedgerRepository,
    balances: BalanceRepository,
}

impl PipelineRunner {
    /// Creates a pipeline runner over one connection pool.
    #[must_use]
    pub fn new(db: DatabaseConnection, config: &AppConfig) -> Self {
        let chunk_size = config.pipeline.insert_chunk_size;
        Self {
            engine: ExpansionEngine::new(config.pipeline.created_by.clone()),
            sources: TxnSourceRepository::new(db.clone()),
            templates: TemplateRepository::new(db.clone()),
            staging: StagingRepository::new(db.clone(), chunk_size),
            ledger: LedgerRepository::new(db.clone(), chunk_size),
            balances: BalanceRepository::new(db),
        }
    }

    /// Runs the pipeline for one accounting period.
    ///
    /// Stages run strictly in order; the first failure aborts the run and
    /// leaves the store consistent. Posting is idempotent per run id and
    /// journal numbers are deterministic per period, so a failed run can be
    /// retried end to end.
    pub async fn run(&self, period: Period) -> Result<PipelineReport, PipelineError> {
        let mut timings = Vec::new();

        // 1. Load the period's source batch.
        let started = Instant::now();
        let batch = self.sources.load_period(period).await?;
        timings.push(StageTiming::new(
            "load",
            batch.len() as u64,
            started.elapsed(),
        ));
        info!(period = %period, rows = batch.len(), "Loaded transaction source");

        // 2. Resolve one template per routing group. Groups that resolve to
        //    the same template version merge into a single expansion job, so
        //    each template expands at most once per run.
        let started = Instant::now();
        let mut jobs: BTreeMap<TemplateId, (Template, TransactionBatch)> = BTreeMap::new();
        for (key, group) in batch.partition_by_routing() {
            let template = self
                .templates
                .resolve(&key.txn_type, &key.product_code, &key.channel, period.start())
                .await?;
            info!(routing = %key, template = %template.id(), rows = group.len(), "Resolved template");
            match jobs.entry(template.id()) {
                Entry::Occupied(mut slot) => slot.get_mut().1.merge(group),
                Entry::Vacant(slot) => {
                    slot.insert((template, group));
                }
            }
        }
        timings.push(StageTiming::new(
            "resolve",
            jobs.len() as u64,
            started.elapsed(),
        ));

        // 3. Expand all jobs; every journal is balance-checked here.
        let started = Instant::now();
        let job_refs: Vec<(&Template, &TransactionBatch)> =
            jobs.values().map(|(t, b)| (t, b)).collect();
        let journals = self.engine.expand_all(&job_refs, period)?;
        let expanded_lines: usize = journals.iter().map(|j| j.lines.len()).sum();
        timings.push(StageTiming::new(
            "expand",
            expanded_lines as u64,
            started.elapsed(),
        ));
        info!(period = %period, runs = journals.len(), "Expanded journals");

        // 4. Stage each run.
        let started = Instant::now();
        let mut staged_rows = 0u64;
        for journal in &journals {
            let counts = self.staging.stage(journal).await?;
            staged_rows += (counts.headers + counts.lines) as u64;
            info!(
                run_id = %journal.run_id,
                headers = counts.headers,
                lines = counts.lines,
                "Staged journal run"
            );
        }
        timings.push(StageTiming::new("stage", staged_rows, started.elapsed()));

        // 5. Post each run into the ledger.
        let started = Instant::now();
        let mut runs = Vec::with_capacity(journals.len());
        for journal in &journals {
            let outcome = self.ledger.post(journal).await?;
            let posted = matches!(outcome, PostOutcome::Posted { .. });
            info!(run_id = %journal.run_id, template = %journal.template, posted, "Posted run");
            runs.push(RunSummary {
                run_id: journal.run_id,
                template: journal.template.clone(),
                transactions: journal.headers.len(),
                lines: journal.lines.len(),
                posted,
            });
        }
        let posted_lines: usize = runs.iter().filter(|r| r.posted).map(|r| r.lines).sum();
        timings.push(StageTiming::new(
            "post",
            posted_lines as u64,
            started.elapsed(),
        ));

        // 6. Refresh the period's balance snapshots.
        let started = Instant::now();
        let snapshot_rows = self.balances.snapshot_period(period).await?;
        timings.push(StageTiming::new(
            "snapshot",
            snapshot_rows,
            started.elapsed(),
        ));
        info!(period = %period, rows = snapshot_rows, "Refreshed balance snapshots");

        Ok(PipelineReport {
            period,
            source_rows: batch.len(),
            runs,
            snapshot_rows,
            timings,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report() -> PipelineReport {
        PipelineReport {
            period: Period::new(2026, 1).unwrap(),
            source_rows: 120,
            runs: vec![
                RunSummary {
                    run_id: RunId::new(),
                    template: TemplateId {
                        code: "TPL-PREMIUM".to_string(),
                        version: 1,
                    },
                    transactions: 100,
                    lines: 580,
                    posted: true,
                },
                RunSummary {
                    run_id: RunId::new(),
                    template: TemplateId {
                        code: "TPL-CLAIM".to_string(),
                        version: 2,
                    },
                    transactions: 20,
                    lines: 40,
                    posted: false,
                },
            ],
            snapshot_rows: 9,
            timings: vec![StageTiming::new("load", 120, Duration::from_millis(12))],
        }
    }

    #[test]
    fn test_report_totals_lines_across_runs() {
        assert_eq!(report().total_lines(), 620);
    }

    #[test]
    fn test_report_display_names_each_run() {
        let rendered = report().to_string();
        assert!(rendered.starts_with("period 2026-01: 120 transactions, 2 runs, 620 lines"));
        assert!(rendered.contains("[TPL-PREMIUM v1]: 100 transactions, 580 lines, posted"));
        assert!(rendered.contains("[TPL-CLAIM v2]: 20 transactions, 40 lines, already posted"));
    }
}
