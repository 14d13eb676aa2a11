// 📤 Result Emitter - one MatchResult per coded bank entry
//
// Pure aggregation: partition results are flattened in partition order
// (ascending date) then bank-entry order, and summarized.

use crate::error::Result;
use crate::normalizer::IngestStats;
use crate::table::RawRow;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use uuid::Uuid;

// ============================================================================
// MATCH RESULT
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    /// A subset within tolerance was found and consumed
    Matched,
    /// Search completed without a fitting subset
    Unmatched,
    /// Gave up after the per-entry combination budget
    BudgetExceeded,
    /// Wall-clock budget ran out before this entry was searched
    NotAttempted,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub bank_id: usize,
    pub bank_code: String,
    /// Serialized as ISO-8601 (YYYY-MM-DD)
    pub date: NaiveDate,
    pub target_amount: f64,
    /// Ascending; empty unless status is Matched
    pub matched_fin_ids: Vec<usize>,
    pub status: MatchStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched_sum: Option<f64>,
    /// Combinations examined
    pub iterations: u64,
    /// Original rows of the matched financial entries
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub matched_rows: Vec<RawRow>,
}

impl MatchResult {
    pub fn is_matched(&self) -> bool {
        self.status == MatchStatus::Matched
    }
}

// ============================================================================
// REPORT
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub bank_entries: usize,
    pub matched: usize,
    pub unmatched: usize,
    pub budget_exceeded: usize,
    pub not_attempted: usize,
    pub financial_consumed: usize,
    /// Financial entries on dates with no coded bank entry
    pub financial_without_bank_date: usize,
    pub bank: IngestStats,
    pub financial: IngestStats,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconciliationReport {
    pub run_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub summary: ReportSummary,
    pub results: Vec<MatchResult>,
}

/// Flatten per-partition results, keeping partition order
pub fn emit(partition_results: Vec<Vec<MatchResult>>) -> Vec<MatchResult> {
    partition_results.into_iter().flatten().collect()
}

impl ReconciliationReport {
    pub fn new(
        results: Vec<MatchResult>,
        bank: IngestStats,
        financial: IngestStats,
        financial_without_bank_date: usize,
    ) -> Self {
        let mut summary = ReportSummary {
            bank_entries: results.len(),
            financial_without_bank_date,
            bank,
            financial,
            ..Default::default()
        };

        for result in &results {
            match result.status {
                MatchStatus::Matched => {
                    summary.matched += 1;
                    summary.financial_consumed += result.matched_fin_ids.len();
                }
                MatchStatus::Unmatched => summary.unmatched += 1,
                MatchStatus::BudgetExceeded => summary.budget_exceeded += 1,
                MatchStatus::NotAttempted => summary.not_attempted += 1,
            }
        }

        ReconciliationReport {
            run_id: Uuid::new_v4(),
            generated_at: Utc::now(),
            summary,
            results,
        }
    }

    pub fn matched(&self) -> impl Iterator<Item = &MatchResult> {
        self.results.iter().filter(|r| r.is_matched())
    }

    pub fn match_rate(&self) -> f64 {
        if self.results.is_empty() {
            return 0.0;
        }
        self.summary.matched as f64 / self.results.len() as f64
    }

    pub fn summary_line(&self) -> String {
        let s = &self.summary;
        format!(
            "Reconciled {} bank entries: {} matched, {} unmatched, {} gave up, {} not attempted ({:.1}% match rate); dropped for unparsable date: {} bank / {} financial",
            s.bank_entries,
            s.matched,
            s.unmatched,
            s.budget_exceeded,
            s.not_attempted,
            self.match_rate() * 100.0,
            s.bank.dropped_unparsable_date,
            s.financial.dropped_unparsable_date,
        )
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn write_json(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_json_pretty()?)?;
        Ok(())
    }
}

// ============================================================================
// TESTS
// ============================================================================
