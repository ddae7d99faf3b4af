//! Valuation runner for contract batches
//!
//! Holds one shared [`TableSet`] so every contract of a batch reads the same
//! tables, each loaded from disk at most once.

use std::sync::Arc;

use chrono::NaiveDate;
use rayon::prelude::*;

use crate::config::EngineConfig;
use crate::contract::Contract;
use crate::error::CalcResult;
use crate::tables::TableSet;
use crate::valuation::{value_contract, ContractValuation};

/// Values contracts against a shared set of lookup tables
///
/// # Example
/// ```ignore
/// let runner = ValuationRunner::from_config(&EngineConfig::from_env())?;
/// let valuations = runner.value_batch(&contracts, date);
/// ```
#[derive(Debug, Clone)]
pub struct ValuationRunner {
    tables: Arc<TableSet>,
}

impl ValuationRunner {
    /// Runner over the tables in data/tables/
    pub fn new() -> Self {
        Self::with_tables(TableSet::from_default_path())
    }

    /// Runner over the configured table directory, preloading when asked to
    pub fn from_config(config: &EngineConfig) -> CalcResult<Self> {
        let tables = config.table_set();
        if config.preload_tables {
            tables.preload()?;
        }
        Ok(Self::with_tables(tables))
    }

    pub fn with_tables(tables: TableSet) -> Self {
        Self {
            tables: Arc::new(tables),
        }
    }

    /// Value a single contract
    pub fn value(&self, contract: &Contract, date: NaiveDate) -> CalcResult<ContractValuation> {
        value_contract(&self.tables, contract, date)
    }

    /// Value contracts in parallel; results keep the input order
    pub fn value_batch(&self, contracts: &[Contract], date: NaiveDate) -> Vec<CalcResult<ContractValuation>> {
        contracts
            .par_iter()
            .map(|contract| value_contract(&self.tables, contract, date))
            .collect()
    }

    /// Value one contract at several dates
    pub fn value_dates(&self, contract: &Contract, dates: &[NaiveDate]) -> Vec<CalcResult<ContractValuation>> {
        dates
            .par_iter()
            .map(|date| value_contract(&self.tables, contract, *date))
            .collect()
    }

    pub fn tables(&self) -> &TableSet {
        &self.tables
    }
}

impl Default for ValuationRunner {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::load_contracts;
    use crate::tables::{TableKind, DEFAULT_TABLES_PATH};
    use std::path::Path;

    fn manifest_path(relative: &str) -> std::path::PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR")).join(relative)
    }

    fn runner() -> ValuationRunner {
        let config = EngineConfig {
            tables_path: manifest_path(DEFAULT_TABLES_PATH),
            preload_tables: true,
        };
        ValuationRunner::from_config(&config).expect("Failed to load tables")
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_batch_matches_single_valuations() {
        let runner = runner();
        let contracts = load_contracts(manifest_path("data/contracts.csv")).unwrap();
        let valuation_date = date(2020, 12, 31);

        let batch = runner.value_batch(&contracts, valuation_date);
        assert_eq!(batch.len(), contracts.len());

        for (contract, result) in contracts.iter().zip(&batch) {
            let valuation = result.as_ref().expect("Valuation failed");
            assert_eq!(valuation.contract_id, contract.contract_id);
            assert_eq!(*valuation, runner.value(contract, valuation_date).unwrap());
        }
    }

    #[test]
    fn test_value_dates_in_order() {
        let runner = runner();
        let contracts = load_contracts(manifest_path("data/contracts.csv")).unwrap();
        let dates = [date(2011, 1, 1), date(2015, 1, 1), date(2025, 1, 1)];

        let results = runner.value_dates(&contracts[0], &dates);
        let elapsed: Vec<u32> = results.iter().map(|r| r.as_ref().unwrap().elapsed_months).collect();
        assert_eq!(elapsed, vec![12, 60, 120]);
    }

    #[test]
    fn test_missing_table_directory() {
        let config = EngineConfig::default().with_tables_path("/nonexistent/tables");
        assert!(ValuationRunner::from_config(&config).is_ok());

        let config = EngineConfig {
            preload_tables: true,
            ..config
        };
        assert!(ValuationRunner::from_config(&config).is_err());
    }

    #[test]
    fn test_tables_shared_between_clones() {
        let runner = runner();
        let clone = runner.clone();
        let a = runner.tables().table(TableKind::SurrenderValue).unwrap() as *const _;
        let b = clone.tables().table(TableKind::SurrenderValue).unwrap() as *const _;
        assert_eq!(a, b);
    }
}
