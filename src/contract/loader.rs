//! Load contracts from a CSV extract

use super::{Contract, ContractTimeline, MonetaryInputs, ScheduleStatus};
use chrono::NaiveDate;
use csv::Reader;
use rust_decimal::Decimal;
use std::error::Error;
use std::path::Path;

/// Raw CSV row of a contract extract
#[derive(Debug, serde::Deserialize)]
struct CsvRow {
    #[serde(rename = "id")]
    contract_id: u32,
    start_date: NaiveDate,
    reduction_date: Option<NaiveDate>,
    buyout_date: Option<NaiveDate>,
    status: String,
    duration_years: u32,
    payment_interval_months: u32,
    capital: Decimal,
    premium: Decimal,
    #[serde(default)]
    applied_amount: Option<Decimal>,
}

impl CsvRow {
    fn to_contract(self) -> Result<Contract, Box<dyn Error>> {
        let status: ScheduleStatus = self.status.parse()?;
        let timeline = ContractTimeline::new(
            self.start_date,
            self.reduction_date,
            self.buyout_date,
            status,
            self.duration_years,
            self.payment_interval_months,
        )
        .map_err(|e| format!("Contract {}: {}", self.contract_id, e))?;

        Ok(Contract {
            contract_id: self.contract_id,
            timeline,
            amounts: MonetaryInputs {
                capital_amount: self.capital,
                premium_amount: self.premium,
                applied_amount: self.applied_amount,
            },
        })
    }
}

/// Load all contracts from a CSV file
pub fn load_contracts<P: AsRef<Path>>(path: P) -> Result<Vec<Contract>, Box<dyn Error>> {
    let reader = Reader::from_path(path)?;
    collect_contracts(reader)
}

/// Load contracts from any reader (e.g., string buffer, network stream)
pub fn load_contracts_from_reader<R: std::io::Read>(reader: R) -> Result<Vec<Contract>, Box<dyn Error>> {
    collect_contracts(Reader::from_reader(reader))
}

fn collect_contracts<R: std::io::Read>(mut reader: Reader<R>) -> Result<Vec<Contract>, Box<dyn Error>> {
    let mut contracts = Vec::new();

    for result in reader.deserialize() {
        let row: CsvRow = result?;
        contracts.push(row.to_contract()?);
    }

    Ok(contracts)
}
