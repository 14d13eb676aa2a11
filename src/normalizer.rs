// 🧹 Record Normalizer
// Raw tables → typed bank / financial entries
//
// - Column headers resolved to canonical fields by keyword containment
// - Currency strings in either locale ("1.234,56" / "1,234.56")
// - Dates in DD/MM/YYYY, YYYY-MM-DD, DD-MM-YYYY, YYYY/MM/DD

use crate::config::{ColumnCandidates, MatchConfig, UnparsableAmountPolicy};
use crate::error::{ReconciliationError, Result};
use crate::table::{Cell, RawRow, RawTable};
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const BANK_TABLE: &str = "bank";
pub const FINANCIAL_TABLE: &str = "financial";

/// Tried in order, first success wins
pub const DATE_FORMATS: [&str; 4] = ["%d/%m/%Y", "%Y-%m-%d", "%d-%m-%Y", "%Y/%m/%d"];

/// Accepted after a date, separated by ' ' or 'T'
const TIME_FORMATS: [&str; 3] = ["%H:%M:%S", "%H:%M:%S%.f", "%H:%M"];

const CURRENCY_SYMBOLS: [&str; 4] = ["R$", "$", "€", "£"];

// ============================================================================
// ENTRIES
// ============================================================================

/// Bank statement movement carrying a reconciliation code
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BankEntry {
    /// Row index in the source table
    pub id: usize,
    pub date: NaiveDate,
    pub amount: f64,
    pub code: String,
    pub raw: RawRow,
}

/// Internal register row, a match candidate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinancialEntry {
    pub id: usize,
    pub date: NaiveDate,
    pub amount: f64,
    pub raw: RawRow,
}

/// Outcome of parsing one amount cell
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParsedAmount {
    Parsed(f64),
    Unparsable,
}

impl ParsedAmount {
    pub fn value(self) -> Option<f64> {
        match self {
            ParsedAmount::Parsed(v) => Some(v),
            ParsedAmount::Unparsable => None,
        }
    }
}

/// Per-table ingestion counters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestStats {
    pub rows: usize,
    /// Bank rows with an empty reconciliation code
    pub skipped_without_code: usize,
    pub dropped_unparsable_date: usize,
    /// Amount cells that failed to parse (coerced or excluded)
    pub unparsable_amounts: usize,
    /// Rows dropped because of the Exclude policy
    pub excluded_unparsable_amount: usize,
}

#[derive(Debug, Clone, Default)]
pub struct NormalizedBank {
    pub entries: Vec<BankEntry>,
    pub stats: IngestStats,
}

#[derive(Debug, Clone, Default)]
pub struct NormalizedFinancial {
    pub entries: Vec<FinancialEntry>,
    pub stats: IngestStats,
}

// ============================================================================
// VALUE PARSING
// ============================================================================

/// Parse a currency string
///
/// When both '.' and ',' appear, whichever comes last is the decimal
/// separator and the other is thousands grouping. A lone ',' is decimal.
pub fn parse_currency_str(value: &str) -> ParsedAmount {
    let mut clean: String = value.chars().filter(|c| !c.is_whitespace()).collect();
    for symbol in CURRENCY_SYMBOLS {
        clean = clean.replace(symbol, "");
    }

    if clean.is_empty() {
        return ParsedAmount::Unparsable;
    }

    let normalized = match (clean.rfind(','), clean.rfind('.')) {
        (Some(comma), Some(dot)) if comma > dot => clean.replace('.', "").replace(',', "."),
        (Some(_), Some(_)) => clean.replace(',', ""),
        (Some(_), None) => clean.replace(',', "."),
        _ => clean,
    };

    match normalized.parse::<f64>() {
        Ok(v) if v.is_finite() => ParsedAmount::Parsed(v),
        _ => ParsedAmount::Unparsable,
    }
}

pub fn parse_currency(cell: &Cell) -> ParsedAmount {
    match cell {
        Cell::Number(n) if n.is_finite() => ParsedAmount::Parsed(*n),
        Cell::Number(_) | Cell::Empty => ParsedAmount::Unparsable,
        Cell::Text(s) => parse_currency_str(s),
    }
}

pub fn parse_date_str(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    let try_formats =
        |s: &str| DATE_FORMATS.iter().find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok());

    // Spreadsheet exports often append a time: "2023-10-01 00:00:00"
    try_formats(value).or_else(|| {
        let (date, time) = value.split_once(|c: char| c == ' ' || c == 'T')?;
        let is_time = TIME_FORMATS
            .iter()
            .any(|fmt| NaiveTime::parse_from_str(time.trim(), fmt).is_ok());
        if is_time {
            try_formats(date)
        } else {
            None
        }
    })
}

pub fn parse_date(cell: &Cell) -> Option<NaiveDate> {
    match cell {
        Cell::Text(s) => parse_date_str(s),
        _ => None,
    }
}

/// Codes like "nan"/"none" come from upstream null coercion
fn normalize_code(cell: &Cell) -> Option<String> {
    if cell.is_blank() {
        return None;
    }
    let code = cell.as_display();
    let lower = code.to_lowercase();
    if lower == "nan" || lower == "none" || lower == "null" {
        None
    } else {
        Some(code)
    }
}

// ============================================================================
// COLUMN RESOLUTION
// ============================================================================

/// Pick the header that best matches any candidate token
///
/// Exact match beats containment, longer tokens beat shorter ones, and ties
/// go to the leftmost header. Columns in `taken` are never returned.
pub fn resolve_column(headers: &[String], candidates: &[String], taken: &[usize]) -> Option<usize> {
    let mut best: Option<(u8, usize, usize)> = None;

    for (idx, header) in headers.iter().enumerate() {
        if taken.contains(&idx) {
            continue;
        }
        let header = header.trim().to_lowercase();

        for token in candidates {
            let token = token.trim().to_lowercase();
            if token.is_empty() {
                continue;
            }
            let rank = if header == token {
                2
            } else if header.contains(&token) {
                1
            } else {
                continue;
            };
            let len = token.chars().count();

            let better = match best {
                None => true,
                Some((r, l, _)) => (rank, len) > (r, l),
            };
            if better {
                best = Some((rank, len, idx));
            }
        }
    }

    best.map(|(_, _, idx)| idx)
}

/// Resolve every (field, candidates) pair or fail with all missing fields
fn resolve_columns(
    table_name: &str,
    headers: &[String],
    fields: &[(&str, &[String])],
) -> Result<Vec<usize>> {
    let mut taken = Vec::new();
    let mut missing = Vec::new();

    for (field, candidates) in fields {
        match resolve_column(headers, candidates, &taken) {
            Some(idx) => taken.push(idx),
            None => missing.push(field.to_string()),
        }
    }

    if !missing.is_empty() {
        return Err(ReconciliationError::MissingColumns {
            table: table_name.to_string(),
            fields: missing,
            found: headers.to_vec(),
        });
    }

    Ok(taken)
}

// ============================================================================
// TABLE NORMALIZATION
// ============================================================================

/// Amount under the given policy; `None` means drop the row
fn resolve_amount(
    cell: &Cell,
    policy: UnparsableAmountPolicy,
    stats: &mut IngestStats,
) -> Option<f64> {
    match parse_currency(cell) {
        ParsedAmount::Parsed(v) => Some(v),
        ParsedAmount::Unparsable => {
            stats.unparsable_amounts += 1;
            match policy {
                UnparsableAmountPolicy::Zero => Some(0.0),
                UnparsableAmountPolicy::Exclude => {
                    stats.excluded_unparsable_amount += 1;
                    None
                }
            }
        }
    }
}

pub fn normalize_bank(table: &RawTable, config: &MatchConfig) -> Result<NormalizedBank> {
    let ColumnCandidates {
        bank_date,
        bank_amount,
        bank_code,
        ..
    } = &config.columns;

    let cols = resolve_columns(
        BANK_TABLE,
        &table.headers,
        &[
            ("date", bank_date.as_slice()),
            ("amount", bank_amount.as_slice()),
            ("code", bank_code.as_slice()),
        ],
    )?;
    let (date_col, amount_col, code_col) = (cols[0], cols[1], cols[2]);

    let mut out = NormalizedBank::default();
    out.stats.rows = table.len();

    for row in 0..table.len() {
        let code = match normalize_code(table.cell(row, code_col)) {
            Some(code) => code,
            None => {
                out.stats.skipped_without_code += 1;
                continue;
            }
        };

        let date = match parse_date(table.cell(row, date_col)) {
            Some(date) => date,
            None => {
                debug!(row, code = %code, "bank row dropped: unparsable date");
                out.stats.dropped_unparsable_date += 1;
                continue;
            }
        };

        // Coded rows are always reported, so a bad amount becomes 0.00 here
        // whatever the policy; Exclude only shapes the candidate pool.
        let cell = table.cell(row, amount_col);
        let amount = resolve_amount(cell, UnparsableAmountPolicy::Zero, &mut out.stats)
            .unwrap_or_default();

        out.entries.push(BankEntry {
            id: row,
            date,
            amount,
            code,
            raw: table.raw_row(row),
        });
    }

    Ok(out)
}

pub fn normalize_financial(table: &RawTable, config: &MatchConfig) -> Result<NormalizedFinancial> {
    let cols = resolve_columns(
        FINANCIAL_TABLE,
        &table.headers,
        &[
            ("date", config.columns.financial_date.as_slice()),
            ("amount", config.columns.financial_amount.as_slice()),
        ],
    )?;
    let (date_col, amount_col) = (cols[0], cols[1]);

    let mut out = NormalizedFinancial::default();
    out.stats.rows = table.len();

    for row in 0..table.len() {
        let date = match parse_date(table.cell(row, date_col)) {
            Some(date) => date,
            None => {
                debug!(row, "financial row dropped: unparsable date");
                out.stats.dropped_unparsable_date += 1;
                continue;
            }
        };

        let cell = table.cell(row, amount_col);
        let amount = match resolve_amount(cell, config.unparsable_amount, &mut out.stats) {
            Some(amount) => amount,
            None => continue,
        };

        out.entries.push(FinancialEntry {
            id: row,
            date,
            amount,
            raw: table.raw_row(row),
        });
    }

    Ok(out)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_currency_brazilian_format() {
        assert_eq!(parse_currency_str("1.234,56"), ParsedAmount::Parsed(1234.56));
        assert_eq!(parse_currency_str("R$ 1.000,00"), ParsedAmount::Parsed(1000.0));
        assert_eq!(parse_currency_str("30,00"), ParsedAmount::Parsed(30.0));
        assert_eq!(parse_currency_str("-45,90"), ParsedAmount::Parsed(-45.9));
    }

    #[test]
    fn test_currency_us_format() {
        // Period after comma: period is decimal, comma is grouping
        assert_eq!(parse_currency_str("1,234.56"), ParsedAmount::Parsed(1234.56));
        assert_eq!(parse_currency_str("$ 2,000.10"), ParsedAmount::Parsed(2000.1));
        assert_eq!(parse_currency_str("100.00"), ParsedAmount::Parsed(100.0));
    }

    #[test]
    fn test_currency_unparsable() {
        assert_eq!(parse_currency_str(""), ParsedAmount::Unparsable);
        assert_eq!(parse_currency_str("R$"), ParsedAmount::Unparsable);
        assert_eq!(parse_currency_str("abc"), ParsedAmount::Unparsable);
        assert_eq!(parse_currency_str("1.234.567"), ParsedAmount::Unparsable);
        assert_eq!(parse_currency_str("nan"), ParsedAmount::Unparsable);
        assert_eq!(parse_currency(&Cell::Empty), ParsedAmount::Unparsable);
    }

    #[test]
    fn test_currency_numeric_cell_passthrough() {
        assert_eq!(parse_currency(&Cell::Number(42.5)), ParsedAmount::Parsed(42.5));
        assert_eq!(ParsedAmount::Parsed(1.0).value(), Some(1.0));
        assert_eq!(ParsedAmount::Unparsable.value(), None);
    }

    #[test]
    fn test_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2023, 10, 1).unwrap();
        assert_eq!(parse_date_str("01/10/2023"), Some(expected));
        assert_eq!(parse_date_str("2023-10-01"), Some(expected));
        assert_eq!(parse_date_str("01-10-2023"), Some(expected));
        assert_eq!(parse_date_str("2023/10/01"), Some(expected));
        assert_eq!(parse_date_str(" 2023-10-01 00:00:00"), Some(expected));
        assert_eq!(parse_date_str("2023-10-01T08:30:00"), Some(expected));
        assert_eq!(parse_date_str("01/10/2023 08:30"), Some(expected));
    }

    #[test]
    fn test_date_day_first_wins_for_slashes() {
        // 02/03/2024 is 2 March, never February 3rd
        assert_eq!(
            parse_date_str("02/03/2024"),
            NaiveDate::from_ymd_opt(2024, 3, 2)
        );
    }

    #[test]
    fn test_date_unparsable() {
        assert_eq!(parse_date_str(""), None);
        assert_eq!(parse_date_str("31/02/2023"), None);
        assert_eq!(parse_date_str("yesterday"), None);
        assert_eq!(parse_date_str("01/10/2023 lixo"), None);
        assert_eq!(parse_date_str("2023-10-01T"), None);
        assert_eq!(parse_date_str("2023-10-01 25:00:00"), None);
        assert_eq!(parse_date(&Cell::Number(45000.0)), None);
    }

    #[test]
    fn test_resolve_column_exact_beats_containment() {
        let h = headers(&["Data vencimento", "Data movimento", "Valor (R$)"]);
        let candidates = headers(&["Data movimento", "Data"]);
        assert_eq!(resolve_column(&h, &candidates, &[]), Some(1));
    }

    #[test]
    fn test_resolve_column_case_and_whitespace_insensitive() {
        let h = headers(&["  VALOR (R$) ", "DATA"]);
        assert_eq!(resolve_column(&h, &headers(&["Valor"]), &[]), Some(0));
        assert_eq!(resolve_column(&h, &headers(&["data"]), &[]), Some(1));
    }

    #[test]
    fn test_resolve_column_skips_taken() {
        let h = headers(&["Data", "Data movimento"]);
        assert_eq!(resolve_column(&h, &headers(&["Data"]), &[0]), Some(1));
        assert_eq!(resolve_column(&h, &headers(&["Valor"]), &[]), None);
    }

    #[test]
    fn test_normalize_bank_missing_code_column() {
        let table = RawTable::from_str_rows(&["Data", "Valor"], &[&["01/10/2023", "10,00"]]);
        let err = normalize_bank(&table, &MatchConfig::default()).unwrap_err();

        match err {
            ReconciliationError::MissingColumns { table, fields, .. } => {
                assert_eq!(table, "bank");
                assert_eq!(fields, vec!["code".to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_normalize_financial_reports_all_missing_fields() {
        let table = RawTable::from_str_rows(&["Historico"], &[]);
        let err = normalize_financial(&table, &MatchConfig::default()).unwrap_err();

        match err {
            ReconciliationError::MissingColumns { table, fields, found } => {
                assert_eq!(table, "financial");
                assert_eq!(fields, vec!["date".to_string(), "amount".to_string()]);
                assert_eq!(found, vec!["Historico".to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_normalize_bank_filters_rows() {
        let table = RawTable::from_str_rows(
            &["Data", "Valor", "Codigo Conciliação"],
            &[
                &["01/10/2023", "100,00", "CONF123"],
                &["01/10/2023", "50,00", ""],
                &["01/10/2023", "50,00", "nan"],
                &["01/10/2023", "50,00", "   "],
                &["not a date", "10,00", "CONF9"],
                &["02/10/2023", "???", "CONF7"],
            ],
        );

        let bank = normalize_bank(&table, &MatchConfig::default()).unwrap();

        assert_eq!(bank.entries.len(), 2);
        assert_eq!(bank.entries[0].id, 0);
        assert_eq!(bank.entries[0].code, "CONF123");
        assert_eq!(bank.entries[0].amount, 100.0);
        assert_eq!(bank.entries[1].id, 5);
        assert_eq!(bank.entries[1].amount, 0.0);

        assert_eq!(bank.stats.rows, 6);
        assert_eq!(bank.stats.skipped_without_code, 3);
        assert_eq!(bank.stats.dropped_unparsable_date, 1);
        assert_eq!(bank.stats.unparsable_amounts, 1);
        assert_eq!(bank.stats.excluded_unparsable_amount, 0);
    }

    #[test]
    fn test_normalize_financial_exclude_policy() {
        let table = RawTable::from_str_rows(
            &["Data movimento", "Valor (R$)", "Historico"],
            &[
                &["01/10/2023", "30,00", "Payment A"],
                &["01/10/2023", "", "Blank"],
                &["", "40,00", "No date"],
            ],
        );
        let config = MatchConfig::default().with_unparsable_amount(UnparsableAmountPolicy::Exclude);

        let fin = normalize_financial(&table, &config).unwrap();

        assert_eq!(fin.entries.len(), 1);
        assert_eq!(fin.entries[0].amount, 30.0);
        assert_eq!(fin.stats.dropped_unparsable_date, 1);
        assert_eq!(fin.stats.unparsable_amounts, 1);
        assert_eq!(fin.stats.excluded_unparsable_amount, 1);
        assert_eq!(fin.entries[0].raw.get("Historico"), Some(&Cell::text("Payment A")));
    }

    #[test]
    fn test_normalize_bank_keeps_coded_row_under_exclude_policy() {
        let table = RawTable::from_str_rows(
            &["Data", "Valor", "Codigo Conciliação"],
            &[
                &["01/10/2023", "10,00", "A"],
                &["01/10/2023", "corrupt", "B"],
            ],
        );
        let config = MatchConfig::default().with_unparsable_amount(UnparsableAmountPolicy::Exclude);

        let bank = normalize_bank(&table, &config).unwrap();

        assert_eq!(bank.entries.len(), 2);
        assert_eq!(bank.entries[1].code, "B");
        assert_eq!(bank.entries[1].amount, 0.0);
        assert_eq!(bank.stats.unparsable_amounts, 1);
        assert_eq!(bank.stats.excluded_unparsable_amount, 0);
    }
}
