//! Per-mille lookup tables keyed by elapsed months and contract duration
//!
//! Each table is read from its CSV resource on first use and kept for the
//! lifetime of the [`TableSet`]. There is no reload.

pub mod loader;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use rust_decimal::Decimal;

use crate::error::TableError;

pub use loader::{parse_locale_decimal, DEFAULT_TABLES_PATH};

/// The four contractual value tables
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TableKind {
    SurrenderValue,
    MathematicalReserve,
    ReductionValue,
    TheoreticalValue,
}

impl TableKind {
    pub const ALL: [TableKind; 4] = [
        TableKind::SurrenderValue,
        TableKind::MathematicalReserve,
        TableKind::ReductionValue,
        TableKind::TheoreticalValue,
    ];

    /// File name of the table resource inside the table directory
    pub fn file_name(&self) -> &'static str {
        match self {
            TableKind::SurrenderValue => "surrender_value.csv",
            TableKind::MathematicalReserve => "mathematical_reserve.csv",
            TableKind::ReductionValue => "reduction_value.csv",
            TableKind::TheoreticalValue => "theoretical_value.csv",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TableKind::SurrenderValue => "surrender_value",
            TableKind::MathematicalReserve => "mathematical_reserve",
            TableKind::ReductionValue => "reduction_value",
            TableKind::TheoreticalValue => "theoretical_value",
        }
    }

    fn index(&self) -> usize {
        match self {
            TableKind::SurrenderValue => 0,
            TableKind::MathematicalReserve => 1,
            TableKind::ReductionValue => 2,
            TableKind::TheoreticalValue => 3,
        }
    }
}

/// Immutable mapping `(elapsed_months, duration_months) -> per-mille factor`
#[derive(Debug, Clone, Default)]
pub struct LookupTable {
    values: HashMap<(u32, u32), Decimal>,
}

impl LookupTable {
    fn new(values: HashMap<(u32, u32), Decimal>) -> Self {
        Self { values }
    }

    /// Parse a table from any CSV source
    pub fn from_reader<R: std::io::Read>(reader: R) -> Result<Self, TableError> {
        Ok(Self::new(loader::read_table(reader)?))
    }

    /// Parse a table file
    pub fn from_path(path: &Path) -> Result<Self, TableError> {
        Ok(Self::new(loader::read_table_file(path)?))
    }

    /// Per-mille factor for the key, `None` when the table has no entry
    pub fn get(&self, elapsed_months: u32, duration_months: u32) -> Option<Decimal> {
        self.values.get(&(elapsed_months, duration_months)).copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// The four tables, each loaded at most once
///
/// Safe to share between threads. Concurrent first accesses may both read
/// the file; only the first result is kept.
#[derive(Debug)]
pub struct TableSet {
    dir: Option<PathBuf>,
    tables: [OnceLock<LookupTable>; 4],
}

impl TableSet {
    /// Tables read lazily from `dir`
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: Some(dir.into()),
            tables: Default::default(),
        }
    }

    /// Tables read lazily from the default location (data/tables/)
    pub fn from_default_path() -> Self {
        Self::new(DEFAULT_TABLES_PATH)
    }

    /// Empty set with no backing directory; populate with [`TableSet::with_table`]
    pub fn in_memory() -> Self {
        Self {
            dir: None,
            tables: Default::default(),
        }
    }

    /// Install an already parsed table. Ignored if the table was loaded before.
    pub fn with_table(self, kind: TableKind, table: LookupTable) -> Self {
        let _ = self.tables[kind.index()].set(table);
        self
    }

    /// Load every table now instead of on first use
    pub fn preload(&self) -> Result<(), TableError> {
        for kind in TableKind::ALL {
            self.table(kind)?;
        }
        Ok(())
    }

    /// Access a table, loading it if this is the first use
    pub fn table(&self, kind: TableKind) -> Result<&LookupTable, TableError> {
        let cell = &self.tables[kind.index()];
        if let Some(table) = cell.get() {
            return Ok(table);
        }

        let dir = self.dir.as_ref().ok_or(TableError::Missing {
            table: kind.as_str(),
        })?;
        let path = dir.join(kind.file_name());
        let table = LookupTable::from_path(&path)?;
        log::debug!("Loaded {} ({} entries) from {}", kind.as_str(), table.len(), path.display());

        Ok(cell.get_or_init(|| table))
    }

    /// Per-mille factor of a table, `Ok(None)` on a missing key
    pub fn factor(
        &self,
        kind: TableKind,
        elapsed_months: u32,
        duration_months: u32,
    ) -> Result<Option<Decimal>, TableError> {
        Ok(self.table(kind)?.get(elapsed_months, duration_months))
    }
}

impl Default for TableSet {
    fn default() -> Self {
        Self::from_default_path()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn tables_dir() -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR")).join(DEFAULT_TABLES_PATH)
    }

    #[test]
    fn test_load_default_tables() {
        let tables = TableSet::new(tables_dir());
        let result = tables.preload();
        assert!(result.is_ok(), "Failed to load tables: {:?}", result.err());

        for kind in TableKind::ALL {
            assert!(!tables.table(kind).unwrap().is_empty());
        }

        // 60 of 180 months on the linear theoretical value table
        let factor = tables.factor(TableKind::TheoreticalValue, 60, 180).unwrap();
        assert_eq!(factor, Some(dec!(333.3333)));

        // Boundary rows are not stored
        assert_eq!(tables.factor(TableKind::SurrenderValue, 120, 120).unwrap(), None);
    }

    #[test]
    fn test_load_once() {
        let tables = TableSet::new(tables_dir());
        let first = tables.table(TableKind::SurrenderValue).unwrap() as *const LookupTable;
        let second = tables.table(TableKind::SurrenderValue).unwrap() as *const LookupTable;
        assert_eq!(first, second);
    }

    #[test]
    fn test_in_memory_tables() {
        let table = LookupTable::from_reader("Maand;10\n6;50,0\n".as_bytes()).unwrap();
        let tables = TableSet::in_memory().with_table(TableKind::SurrenderValue, table);

        assert_eq!(tables.factor(TableKind::SurrenderValue, 6, 120).unwrap(), Some(dec!(50.0)));
        assert_eq!(tables.factor(TableKind::SurrenderValue, 7, 120).unwrap(), None);
        assert!(matches!(
            tables.table(TableKind::ReductionValue),
            Err(TableError::Missing { .. })
        ));
    }

    #[test]
    fn test_missing_directory() {
        let tables = TableSet::new("/nonexistent/tables");
        assert!(matches!(
            tables.table(TableKind::SurrenderValue),
            Err(TableError::Io { .. })
        ));
    }
}
