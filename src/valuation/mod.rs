//! Contract valuation: elapsed time, payment counts and table-backed values
//!
//! [`value_contract`] combines the state machine, the payment counts and the
//! lookup tables into a single snapshot of a contract at a date.

mod payments;
mod values;

pub use payments::{
    buyout_interest, capital_due, elapsed_months, payments_due, withholding_tax_on_buyout_interest,
    WITHHOLDING_TAX_CUTOFF, WITHHOLDING_TAX_RATE_AFTER_CUTOFF, WITHHOLDING_TAX_RATE_BEFORE_CUTOFF,
};
pub use values::{
    mathematical_reserve, payable_amount, reduction_value, surrender_value, table_value,
    theoretical_value,
};

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::contract::{Contract, VirtualState};
use crate::dates::months_between;
use crate::error::CalcResult;
use crate::tables::TableSet;

/// Snapshot of a contract's values at a valuation date
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractValuation {
    pub contract_id: u32,
    pub valuation_date: NaiveDate,
    pub state: VirtualState,
    pub elapsed_months: u32,

    /// Months since the reduction (0 unless reduced)
    pub reduction_elapsed_months: u32,

    pub payments_due: u32,
    pub capital_due: Decimal,

    /// `None` when the surrender table has no factor
    pub surrender_value: Option<Decimal>,
    pub buyout_interest: Option<Decimal>,
    pub withholding_tax: Option<Decimal>,
    pub payable_amount: Option<Decimal>,
    pub mathematical_reserve: Decimal,
}

/// Value a contract at `date`
pub fn value_contract(
    tables: &TableSet,
    contract: &Contract,
    date: NaiveDate,
) -> CalcResult<ContractValuation> {
    let timeline = &contract.timeline;
    let capital = contract.amounts.capital_amount;

    let state = timeline.virtual_state_at(date);
    let elapsed = elapsed_months(
        date,
        &timeline.status,
        timeline.buyout_date,
        timeline.reduction_date,
        timeline.start_date,
        timeline.duration_years,
    );
    let reduction_elapsed = match (state, timeline.reduction_date) {
        (VirtualState::Reduced, Some(reduction_date)) => months_between(reduction_date, date).max(0) as u32,
        _ => 0,
    };

    let payments = payments_due(
        state,
        elapsed,
        timeline.payments_per_year(),
        timeline.duration_years,
    );
    let due = capital_due(contract.amounts.premium_amount, payments);

    let surrender = surrender_value(
        tables,
        state,
        timeline.duration_years,
        elapsed,
        capital,
        reduction_elapsed,
    )?;
    let interest = surrender.map(|value| buyout_interest(value, due));
    let tax_date = match timeline.buyout_date {
        Some(buyout_date) if state.is_bought_out() => buyout_date,
        _ => date,
    };
    let withholding_tax = interest.map(|i| withholding_tax_on_buyout_interest(i, tax_date));

    let payable = payable_amount(tables, state, timeline.duration_years, elapsed, capital)?;
    let reserve = mathematical_reserve(tables, timeline, capital, date)?;

    Ok(ContractValuation {
        contract_id: contract.contract_id,
        valuation_date: date,
        state,
        elapsed_months: elapsed,
        reduction_elapsed_months: reduction_elapsed,
        payments_due: payments,
        capital_due: due,
        surrender_value: surrender,
        buyout_interest: interest,
        withholding_tax,
        payable_amount: payable,
        mathematical_reserve: reserve,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::{ContractTimeline, MonetaryInputs};
    use crate::tables::{LookupTable, TableKind};
    use rust_decimal_macros::dec;
    use std::path::Path;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn contract(timeline: ContractTimeline) -> Contract {
        Contract {
            contract_id: 7,
            timeline,
            amounts: MonetaryInputs {
                capital_amount: dec!(10000),
                premium_amount: dec!(1000),
                applied_amount: None,
            },
        }
    }

    #[test]
    fn test_value_in_force_contract() {
        let table = |csv: &str| LookupTable::from_reader(csv.as_bytes()).unwrap();
        let tables = TableSet::in_memory()
            .with_table(TableKind::SurrenderValue, table("Maand;10\n24;2.150,5\n"))
            .with_table(TableKind::MathematicalReserve, table("Maand;10\n24;220,0\n"));

        let valuation = value_contract(&tables, &contract(ContractTimeline::in_force(date(2010, 1, 1), 10, 12)), date(2012, 1, 1)).unwrap();

        assert_eq!(valuation.state, VirtualState::Processed);
        assert_eq!(valuation.elapsed_months, 24);
        assert_eq!(valuation.payments_due, 3);
        assert_eq!(valuation.capital_due, dec!(3000));
        // 10000 * 2150.5 / 1000
        assert_eq!(valuation.surrender_value, Some(dec!(21505)));
        assert_eq!(valuation.buyout_interest, Some(dec!(18505)));
        assert_eq!(valuation.withholding_tax, Some(dec!(2775.75)));
        assert_eq!(valuation.payable_amount, Some(dec!(10000)));
        assert_eq!(valuation.mathematical_reserve, dec!(2200));
    }

    #[test]
    fn test_withholding_tax_date_follows_state() {
        let table = |csv: &str| LookupTable::from_reader(csv.as_bytes()).unwrap();
        let tables = TableSet::in_memory()
            .with_table(TableKind::SurrenderValue, table("Maand;10\n12;150,0\n"))
            .with_table(TableKind::MathematicalReserve, table("Maand;10\n12;140,0\n"));

        // Buy-out scheduled after the valuation date: taxed at the valuation date
        let mut timeline = ContractTimeline::in_force(date(2002, 1, 1), 10, 12);
        timeline.status = timeline.status.with_buyout();
        timeline.buyout_date = Some(date(2005, 1, 1));
        let contract = contract(timeline);

        let before = value_contract(&tables, &contract, date(2003, 1, 1)).unwrap();
        assert_eq!(before.state, VirtualState::Processed);
        // 10000 * 150 / 1000 - 2 * 1000 = -500, no tax
        assert_eq!(before.buyout_interest, Some(dec!(-500)));
        assert_eq!(before.withholding_tax, Some(dec!(0)));

        let tables = TableSet::in_memory()
            .with_table(TableKind::SurrenderValue, table("Maand;10\n12;350,0\n"))
            .with_table(TableKind::MathematicalReserve, table("Maand;10\n12;140,0\n"));
        let before = value_contract(&tables, &contract, date(2003, 1, 1)).unwrap();
        // Interest 1500 taxed at 25 % (on or before the cutoff), not 15 % from the future buy-out date
        assert_eq!(before.buyout_interest, Some(dec!(1500)));
        assert_eq!(before.withholding_tax, Some(dec!(375)));
    }

    #[test]
    fn test_value_is_idempotent() {
        let tables = TableSet::new(Path::new(env!("CARGO_MANIFEST_DIR")).join("data/tables"));
        let mut timeline = ContractTimeline::in_force(date(2008, 3, 15), 20, 1);
        timeline.status = timeline.status.with_reduction();
        timeline.reduction_date = Some(date(2012, 3, 15));
        let contract = contract(timeline);

        let first = value_contract(&tables, &contract, date(2015, 6, 30)).unwrap();
        let second = value_contract(&tables, &contract, date(2015, 6, 30)).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.state, VirtualState::Reduced);
        assert_eq!(first.elapsed_months, 48);
        assert_eq!(first.payments_due, 48);
        assert!(first.surrender_value.is_some());
    }
}
