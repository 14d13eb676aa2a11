// Bank Reconciliation Engine - Core Library
// Matches coded bank movements to same-day subsets of financial entries

pub mod config;
pub mod engine;
pub mod error;
pub mod loader;
pub mod logging;
pub mod matcher;
pub mod normalizer;
pub mod partition;
pub mod pool;
pub mod report;
pub mod table;

// Re-export commonly used types
pub use config::{ColumnCandidates, MatchConfig, UnparsableAmountPolicy};
pub use engine::ReconciliationEngine;
pub use error::{ReconciliationError, Result};
pub use loader::{load_csv, read_csv};
pub use matcher::{SearchOutcome, SubsetSumMatcher};
pub use normalizer::{
    normalize_bank, normalize_financial, parse_currency, parse_currency_str, parse_date,
    parse_date_str, BankEntry, FinancialEntry, IngestStats, ParsedAmount,
};
pub use partition::{partition, DatePartition, Partitions};
pub use pool::CandidatePool;
pub use report::{MatchResult, MatchStatus, ReconciliationReport, ReportSummary};
pub use table::{Cell, RawRow, RawTable};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
