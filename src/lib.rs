//! Contract Engine - Financial computation engine for insurance and savings contracts
//!
//! This library provides:
//! - Cent rounding and contract month arithmetic
//! - Per-mille lookup tables (surrender, reserve, reduction, theoretical values)
//! - A contract state machine over reduction and buy-out events
//! - Payment counts, surrender values, withholding tax and mathematical reserves
//! - A premium amount formula engine driven by dated schedule features
//! - Structured contract reference numbers

pub mod config;
pub mod contract;
pub mod dates;
pub mod error;
pub mod formulas;
pub mod numeric;
pub mod reference;
pub mod runner;
pub mod tables;
pub mod valuation;

// Re-export commonly used types
pub use config::EngineConfig;
pub use contract::{Contract, ContractTimeline, ScheduleStatus, VirtualState};
pub use error::{CalcResult, CalculationError, TableError};
pub use formulas::{amount_at, amount_at_named, AmountType, PremiumSchedule, ScheduleSnapshot};
pub use reference::{contract_reference_number, parse_contract_reference};
pub use runner::ValuationRunner;
pub use tables::{LookupTable, TableKind, TableSet};
pub use valuation::{value_contract, ContractValuation};
