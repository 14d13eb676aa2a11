// ⚖️ Reconciliation Engine
// Bank statement vs financial register, matched by same-day subset sums
//
// Normalizer → Partitioner → Matcher (consuming the pool) → Emitter
//
// Within a date, bank entries are processed strictly in input order because
// each accepted match consumes financial entries the next search would see.
// Dates share nothing, so they may run on separate rayon workers.

use crate::config::MatchConfig;
use crate::error::Result;
use crate::matcher::{SearchOutcome, SubsetSumMatcher};
use crate::normalizer::{normalize_bank, normalize_financial, BankEntry, FinancialEntry};
use crate::partition::{partition, DatePartition};
use crate::report::{emit, MatchResult, MatchStatus, ReconciliationReport};
use crate::table::RawTable;
use rayon::prelude::*;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

pub struct ReconciliationEngine {
    pub config: MatchConfig,
}

impl ReconciliationEngine {
    pub fn new() -> Self {
        ReconciliationEngine {
            config: MatchConfig::default(),
        }
    }

    /// Engine with a validated configuration
    pub fn with_config(config: MatchConfig) -> Result<Self> {
        config.validate()?;
        Ok(ReconciliationEngine { config })
    }

    /// Full run over the two raw tables
    ///
    /// Fails only when a required column cannot be resolved in either table.
    pub fn reconcile(&self, bank: &RawTable, financial: &RawTable) -> Result<ReconciliationReport> {
        let bank = normalize_bank(bank, &self.config)?;
        let financial = normalize_financial(financial, &self.config)?;

        info!(
            bank_rows = bank.stats.rows,
            bank_entries = bank.entries.len(),
            financial_rows = financial.stats.rows,
            financial_entries = financial.entries.len(),
            "normalized input tables"
        );

        let parts = partition(bank.entries, financial.entries);
        if parts.is_empty() {
            info!("no dated bank entries to match");
        } else {
            debug!(
                dates = parts.partitions.len(),
                bank_entries = parts.bank_count(),
                "partitioned by date"
            );
        }
        let financial_without_bank_date = parts.financial_without_bank_date;
        let results = self.match_partitions(parts.partitions);

        let report = ReconciliationReport::new(
            results,
            bank.stats,
            financial.stats,
            financial_without_bank_date,
        );
        info!("{}", report.summary_line());
        Ok(report)
    }

    /// Match already-normalized entries
    ///
    /// Bank entries without a code are skipped here too.
    pub fn reconcile_entries(
        &self,
        bank: Vec<BankEntry>,
        financial: Vec<FinancialEntry>,
    ) -> Vec<MatchResult> {
        let parts = partition(bank, financial);
        self.match_partitions(parts.partitions)
    }

    fn match_partitions(&self, partitions: Vec<DatePartition>) -> Vec<MatchResult> {
        let matcher = SubsetSumMatcher::from_config(&self.config);
        let deadline = self
            .config
            .time_budget_ms
            .map(|ms| Instant::now() + Duration::from_millis(ms));

        let per_partition: Vec<Vec<MatchResult>> = if self.config.parallel {
            partitions
                .into_par_iter()
                .map(|p| process_partition(&matcher, p, deadline))
                .collect()
        } else {
            partitions
                .into_iter()
                .map(|p| process_partition(&matcher, p, deadline))
                .collect()
        };

        emit(per_partition)
    }
}

impl Default for ReconciliationEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Sequential pass over one date: search, then consume on success
fn process_partition(
    matcher: &SubsetSumMatcher,
    partition: DatePartition,
    deadline: Option<Instant>,
) -> Vec<MatchResult> {
    let DatePartition {
        date,
        bank,
        mut pool,
    } = partition;

    debug!(%date, bank = bank.len(), candidates = pool.len(), "matching partition");

    let mut results = Vec::with_capacity(bank.len());
    let mut out_of_time = false;

    for entry in bank {
        if entry.code.trim().is_empty() {
            continue;
        }

        let mut result = MatchResult {
            bank_id: entry.id,
            bank_code: entry.code,
            date,
            target_amount: entry.amount,
            matched_fin_ids: Vec::new(),
            status: MatchStatus::NotAttempted,
            matched_sum: None,
            iterations: 0,
            matched_rows: Vec::new(),
        };

        if !out_of_time && deadline.is_some_and(|d| Instant::now() >= d) {
            warn!(%date, "time budget exhausted; remaining bank entries not attempted");
            out_of_time = true;
        }
        if out_of_time {
            results.push(result);
            continue;
        }

        let outcome = matcher.search(&pool, entry.amount);
        result.iterations = outcome.iterations();

        match outcome {
            SearchOutcome::Found { mut indices, sum, .. } => {
                pool.consume(&indices);
                indices.sort_by_key(|&i| pool.get(i).id);
                result.matched_fin_ids = indices.iter().map(|&i| pool.get(i).id).collect();
                result.matched_rows = indices.iter().map(|&i| pool.get(i).raw.clone()).collect();
                result.matched_sum = Some(sum);
                result.status = MatchStatus::Matched;
            }
            SearchOutcome::Exhausted { .. } => {
                result.status = MatchStatus::Unmatched;
            }
            SearchOutcome::BudgetExceeded { iterations } => {
                warn!(
                    bank_id = result.bank_id,
                    code = %result.bank_code,
                    %date,
                    iterations,
                    "search budget exceeded; reporting unmatched"
                );
                result.status = MatchStatus::BudgetExceeded;
            }
        }

        results.push(result);
    }

    results
}

// ============================================================================
// TESTS
// ============================================================================
