// 📂 CSV ingestion → RawTable
//
// Cells are kept as text; numeric and date parsing belong to the normalizer.

use crate::error::Result;
use crate::table::{Cell, RawTable};
use csv::ReaderBuilder;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Read a headered CSV file
pub fn load_csv(path: &Path, delimiter: u8) -> Result<RawTable> {
    let file = File::open(path)?;
    read_csv(file, delimiter)
}

/// Read headered CSV from any reader (ragged rows allowed)
pub fn read_csv<R: Read>(reader: R, delimiter: u8) -> Result<RawTable> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .delimiter(delimiter)
        .flexible(true)
        .from_reader(reader);

    let headers = reader
        .headers()?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').to_string())
        .collect();
    let mut table = RawTable::new(headers);

    for record in reader.records() {
        let record = record?;
        table.push_row(record.iter().map(Cell::from).collect());
    }

    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_csv_keeps_text_cells() {
        let data = "Data;Valor;Codigo Conciliação\n01/10/2023;1.234,56;CONF1\n02/10/2023;;\n";
        let table = read_csv(data.as_bytes(), b';').unwrap();

        assert_eq!(table.headers, vec!["Data", "Valor", "Codigo Conciliação"]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.cell(0, 1), &Cell::text("1.234,56"));
        assert_eq!(table.cell(1, 2), &Cell::Empty);
    }

    #[test]
    fn test_read_csv_strips_bom_and_allows_ragged_rows() {
        let data = "\u{feff}Date,Amount\n2023-10-01\n";
        let table = read_csv(data.as_bytes(), b',').unwrap();

        assert_eq!(table.headers[0], "Date");
        assert_eq!(table.cell(0, 1), &Cell::Empty);
    }

    #[test]
    fn test_load_csv_missing_file() {
        let result = load_csv(Path::new("/nonexistent/bank.csv"), b',');
        assert!(result.is_err());
    }
}
