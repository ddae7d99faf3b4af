//! Engine configuration

use std::path::PathBuf;

use crate::tables::{TableSet, DEFAULT_TABLES_PATH};

/// Environment variable overriding the table directory
pub const TABLES_PATH_ENV: &str = "CONTRACT_TABLES_PATH";

/// Configuration of a valuation run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Directory holding the four table CSV files
    pub tables_path: PathBuf,

    /// Read every table up front instead of on first use
    pub preload_tables: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tables_path: PathBuf::from(DEFAULT_TABLES_PATH),
            preload_tables: false,
        }
    }
}

impl EngineConfig {
    /// Defaults, with the table directory taken from `CONTRACT_TABLES_PATH` when set
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(path) = std::env::var_os(TABLES_PATH_ENV).filter(|p| !p.is_empty()) {
            config.tables_path = PathBuf::from(path);
        }
        config
    }

    pub fn with_tables_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.tables_path = path.into();
        self
    }

    /// Lazily loaded tables from the configured directory
    pub fn table_set(&self) -> TableSet {
        TableSet::new(&self.tables_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.tables_path, PathBuf::from("data/tables"));
        assert!(!config.preload_tables);
    }

    #[test]
    fn test_tables_path_override() {
        let config = EngineConfig::default().with_tables_path("/srv/tables");
        assert_eq!(config.tables_path, PathBuf::from("/srv/tables"));
    }
}
