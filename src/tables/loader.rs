//! CSV loader for per-mille lookup tables
//!
//! Table files use `;` as delimiter, `.` as thousands separator and `,` as
//! decimal separator. The first column (`Maand`) holds the elapsed months,
//! every other header is a contract duration in years.

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;

use csv::{ReaderBuilder, Trim};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::error::TableError;

/// Default path to the table directory
pub const DEFAULT_TABLES_PATH: &str = "data/tables";

/// Header of the elapsed months column
pub const MONTH_COLUMN: &str = "Maand";

/// Parse a locale formatted number (`1.234,56`)
///
/// Returns `None` for empty cells.
pub fn parse_locale_decimal(raw: &str) -> Option<Result<Decimal, rust_decimal::Error>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    let normalized = trimmed.replace('.', "").replace(',', ".");
    Some(Decimal::from_str(&normalized))
}

/// Read a table into a map keyed by `(elapsed_months, duration_months)`
pub fn read_table<R: Read>(reader: R) -> Result<HashMap<(u32, u32), Decimal>, TableError> {
    let mut csv_reader = ReaderBuilder::new()
        .delimiter(b';')
        .trim(Trim::All)
        .flexible(true)
        .from_reader(reader);

    let headers = csv_reader.headers()?.clone();
    match headers.get(0) {
        Some(first) if first.eq_ignore_ascii_case(MONTH_COLUMN) => {}
        other => {
            return Err(TableError::Header(format!(
                "expected '{}' as first column, found {:?}",
                MONTH_COLUMN, other
            )))
        }
    }

    let mut durations = Vec::with_capacity(headers.len().saturating_sub(1));
    for header in headers.iter().skip(1) {
        let years: u32 = header
            .parse()
            .map_err(|_| TableError::Header(format!("invalid duration column '{}'", header)))?;
        durations.push(years * 12);
    }

    let mut values = HashMap::new();

    for (line, result) in csv_reader.records().enumerate() {
        let record = result?;
        let row = line + 2;

        let month_cell = record.get(0).unwrap_or("");
        let elapsed = match parse_locale_decimal(month_cell) {
            // Blank trailing lines
            None => continue,
            Some(parsed) => parsed
                .ok()
                .filter(|m| m.fract().is_zero())
                .and_then(|m| m.to_u32())
                .ok_or_else(|| TableError::Cell {
                    row,
                    column: MONTH_COLUMN.to_string(),
                    value: month_cell.to_string(),
                })?,
        };

        for (idx, duration_months) in durations.iter().enumerate() {
            let cell = record.get(idx + 1).unwrap_or("");
            match parse_locale_decimal(cell) {
                None => {}
                Some(Ok(factor)) => {
                    values.insert((elapsed, *duration_months), factor);
                }
                Some(Err(_)) => {
                    return Err(TableError::Cell {
                        row,
                        column: headers.get(idx + 1).unwrap_or("").to_string(),
                        value: cell.to_string(),
                    })
                }
            }
        }
    }

    Ok(values)
}

/// Read a table file from disk
pub fn read_table_file(path: &Path) -> Result<HashMap<(u32, u32), Decimal>, TableError> {
    let file = File::open(path).map_err(|source| TableError::Io {
        path: path.display().to_string(),
        source,
    })?;
    read_table(file)
}
