// 📋 Raw tables - what the ingestion side hands to the engine
//
// A table is a header row plus rows of cells. Cells are either text (as read
// from CSV/XLSX) or already-numeric values (spreadsheet exports, JSON).

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Single cell value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Cell {
    Number(f64),
    Text(String),
    Empty,
}

impl Cell {
    pub fn text(value: impl Into<String>) -> Self {
        Cell::Text(value.into())
    }

    pub fn is_blank(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(s) => s.trim().is_empty(),
            Cell::Number(n) => n.is_nan(),
        }
    }

    /// Text form used for codes and dates
    pub fn as_display(&self) -> String {
        match self {
            Cell::Text(s) => s.trim().to_string(),
            Cell::Number(n) => n.to_string(),
            Cell::Empty => String::new(),
        }
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        if value.is_empty() {
            Cell::Empty
        } else {
            Cell::Text(value.to_string())
        }
    }
}

impl From<f64> for Cell {
    fn from(value: f64) -> Self {
        Cell::Number(value)
    }
}

/// Original row keyed by header, kept for reporting
pub type RawRow = BTreeMap<String, Cell>;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl RawTable {
    pub fn new(headers: Vec<String>) -> Self {
        RawTable {
            headers,
            rows: Vec::new(),
        }
    }

    /// Builder used mostly by tests: `RawTable::from_str_rows(&["Data"], &[&["01/10/2023"]])`
    pub fn from_str_rows(headers: &[&str], rows: &[&[&str]]) -> Self {
        let mut table = RawTable::new(headers.iter().map(|h| h.to_string()).collect());
        for row in rows {
            table.push_row(row.iter().map(|v| Cell::from(*v)).collect());
        }
        table
    }

    pub fn push_row(&mut self, row: Vec<Cell>) {
        self.rows.push(row);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Cell at (row, column); short rows read as empty
    pub fn cell(&self, row: usize, column: usize) -> &Cell {
        self.rows
            .get(row)
            .and_then(|r| r.get(column))
            .unwrap_or(&Cell::Empty)
    }

    pub fn raw_row(&self, row: usize) -> RawRow {
        self.headers
            .iter()
            .enumerate()
            .map(|(i, h)| (h.clone(), self.cell(row, i).clone()))
            .collect()
    }
}
