// ⚙️ Engine configuration
//
// Every search cap is a tunable. Defaults reproduce the reference behaviour:
// tolerance 0.01, at most 15 entries per subset, 50k combinations per bank entry.

use crate::error::{ReconciliationError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_TOLERANCE: f64 = 0.01;
pub const DEFAULT_MAX_COMBINATION_SIZE: usize = 15;
pub const DEFAULT_ITER_LIMIT: u64 = 50_000;

/// What to do with an amount cell that cannot be parsed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum UnparsableAmountPolicy {
    /// Treat as 0.0 and keep the row
    #[default]
    Zero,
    /// Keep financial rows out of the candidate pool; bank rows still
    /// fall back to 0.0 so every coded movement is reported
    Exclude,
}

/// Candidate header tokens per canonical field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnCandidates {
    pub bank_date: Vec<String>,
    pub bank_amount: Vec<String>,
    pub bank_code: Vec<String>,
    pub financial_date: Vec<String>,
    pub financial_amount: Vec<String>,
}

fn tokens(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

impl Default for ColumnCandidates {
    fn default() -> Self {
        ColumnCandidates {
            bank_date: tokens(&["Data", "Date", "Data movimento"]),
            bank_amount: tokens(&["Valor", "Value", "Amount", "Valor (R$)"]),
            bank_code: tokens(&["Codigo Conciliação", "Codigo", "Conciliation Code"]),
            financial_date: tokens(&["Data movimento", "Data Movimento", "Data", "Date"]),
            financial_amount: tokens(&["Valor (R$)", "Valor", "Value", "Amount"]),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchConfig {
    /// Max absolute difference between subset sum and target
    pub tolerance: f64,

    /// Largest subset size tried
    pub max_combination_size: usize,

    /// Combinations examined per bank entry before giving up
    pub iter_limit: u64,

    pub unparsable_amount: UnparsableAmountPolicy,

    /// Process date partitions on the rayon pool
    pub parallel: bool,

    /// Wall-clock budget for the matching phase, in milliseconds
    pub time_budget_ms: Option<u64>,

    pub columns: ColumnCandidates,
}

impl Default for MatchConfig {
    fn default() -> Self {
        MatchConfig {
            tolerance: DEFAULT_TOLERANCE,
            max_combination_size: DEFAULT_MAX_COMBINATION_SIZE,
            iter_limit: DEFAULT_ITER_LIMIT,
            unparsable_amount: UnparsableAmountPolicy::Zero,
            parallel: false,
            time_budget_ms: None,
            columns: ColumnCandidates::default(),
        }
    }
}

impl MatchConfig {
    /// Load from a JSON file; absent keys keep their defaults
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: MatchConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.tolerance.is_finite() || self.tolerance < 0.0 {
            return Err(ReconciliationError::InvalidConfig(format!(
                "tolerance must be a non-negative number, got {}",
                self.tolerance
            )));
        }
        if self.max_combination_size == 0 {
            return Err(ReconciliationError::InvalidConfig(
                "max_combination_size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn with_max_combination_size(mut self, size: usize) -> Self {
        self.max_combination_size = size;
        self
    }

    pub fn with_iter_limit(mut self, limit: u64) -> Self {
        self.iter_limit = limit;
        self
    }

    pub fn with_unparsable_amount(mut self, policy: UnparsableAmountPolicy) -> Self {
        self.unparsable_amount = policy;
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn with_time_budget_ms(mut self, budget: Option<u64>) -> Self {
        self.time_budget_ms = budget;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = MatchConfig::default();
        assert_eq!(config.tolerance, 0.01);
        assert_eq!(config.max_combination_size, 15);
        assert_eq!(config.iter_limit, 50_000);
        assert_eq!(config.unparsable_amount, UnparsableAmountPolicy::Zero);
        assert!(!config.parallel);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        assert!(MatchConfig::default().with_tolerance(-0.5).validate().is_err());
        assert!(MatchConfig::default().with_tolerance(f64::NAN).validate().is_err());
        assert!(MatchConfig::default()
            .with_max_combination_size(0)
            .validate()
            .is_err());
    }

    #[test]
    fn test_load_partial_json_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"iter_limit": 1000, "unparsable_amount": "exclude"}}"#).unwrap();

        let config = MatchConfig::load(file.path()).unwrap();
        assert_eq!(config.iter_limit, 1000);
        assert_eq!(config.unparsable_amount, UnparsableAmountPolicy::Exclude);
        assert_eq!(config.tolerance, DEFAULT_TOLERANCE);
        assert_eq!(config.columns, ColumnCandidates::default());
    }

    #[test]
    fn test_load_rejects_invalid_values() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"max_combination_size": 0}}"#).unwrap();

        let err = MatchConfig::load(file.path()).unwrap_err();
        assert!(matches!(err, ReconciliationError::InvalidConfig(_)));
    }
}
