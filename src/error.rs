//! Error types for table loading and amount calculations

use chrono::NaiveDate;
use thiserror::Error;

/// Errors raised while reading a lookup table resource
#[derive(Debug, Error)]
pub enum TableError {
    /// The table file could not be opened or read
    #[error("Failed to read table {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// An in-memory table set has no such table
    #[error("Table {table} is not available")]
    Missing { table: &'static str },

    /// The CSV layer rejected the resource
    #[error("Malformed CSV in table: {0}")]
    Csv(#[from] csv::Error),

    /// The header row does not start with the month column or has a bad duration
    #[error("Invalid table header: {0}")]
    Header(String),

    /// A cell could not be parsed as a locale formatted number
    #[error("Invalid value '{value}' at row {row}, column {column}")]
    Cell {
        row: usize,
        column: String,
        value: String,
    },
}

/// Errors raised by the computation engine
#[derive(Debug, Error)]
pub enum CalculationError {
    /// The formula dispatcher received a name it does not know
    #[error("Unknown amount type: {name}")]
    UnknownAmountType { name: String },

    /// The market fluctuation formula found no index curve
    #[error("No index defined at {date}")]
    MissingIndexDefinition { date: NaiveDate },

    /// A formula received inputs it cannot compute with
    #[error("Formula {formula} failed: {detail}")]
    Formula {
        formula: &'static str,
        detail: String,
    },

    /// A lookup table could not be loaded
    #[error(transparent)]
    Table(#[from] TableError),

    /// A schedule status string could not be parsed
    #[error("Invalid schedule status: {value}")]
    InvalidStatus { value: String },

    /// Timeline dates or payment plan are inconsistent
    #[error("Invalid contract timeline: {reason}")]
    InvalidTimeline { reason: String },

    /// A structured contract reference is malformed
    #[error("Invalid contract reference '{value}': {reason}")]
    InvalidReference { value: String, reason: String },
}

impl CalculationError {
    /// Build a formula error, logging it with its context first
    pub fn formula(formula: &'static str, detail: impl Into<String>) -> Self {
        let detail = detail.into();
        log::error!("{} failed: {}", formula, detail);
        CalculationError::Formula { formula, detail }
    }
}

pub type CalcResult<T> = Result<T, CalculationError>;
