//! Table-backed contractual values
//!
//! All values share the same boundaries: nothing at zero elapsed months and
//! the full capital from the end of the contract on. In between the value is
//! `capital * factor / 1000`. A missing factor is logged and reported as an
//! unknown value, except for the mathematical reserve which falls back to 0.

use chrono::NaiveDate;
use log::warn;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::contract::{ContractTimeline, VirtualState};
use crate::dates::months_between;
use crate::error::CalcResult;
use crate::numeric::round_money;
use crate::tables::{TableKind, TableSet};

const PER_MILLE: Decimal = dec!(1000);

/// Months over which the reserve of a freshly reduced schedule is prorated
const REDUCTION_PRORATION_MONTHS: Decimal = dec!(300);

/// Value of `capital` after `elapsed_months` according to a table
pub fn table_value(
    tables: &TableSet,
    kind: TableKind,
    duration_years: u32,
    elapsed_months: u32,
    capital: Decimal,
) -> CalcResult<Option<Decimal>> {
    let duration_months = duration_years * 12;
    if elapsed_months == 0 {
        return Ok(Some(Decimal::ZERO));
    }
    if elapsed_months >= duration_months {
        return Ok(Some(round_money(capital)));
    }

    match tables.factor(kind, elapsed_months, duration_months)? {
        Some(factor) => Ok(Some(round_money(capital * factor / PER_MILLE))),
        None => {
            warn!(
                "No {} factor for {} elapsed months on a {} month contract",
                kind.as_str(),
                elapsed_months,
                duration_months
            );
            Ok(None)
        }
    }
}

/// Value of a schedule at reduction
pub fn reduction_value(
    tables: &TableSet,
    duration_years: u32,
    elapsed_months: u32,
    capital: Decimal,
) -> CalcResult<Option<Decimal>> {
    table_value(tables, TableKind::ReductionValue, duration_years, elapsed_months, capital)
}

/// Value of a schedule assuming it runs to term
pub fn theoretical_value(
    tables: &TableSet,
    duration_years: u32,
    elapsed_months: u32,
    capital: Decimal,
) -> CalcResult<Option<Decimal>> {
    table_value(tables, TableKind::TheoreticalValue, duration_years, elapsed_months, capital)
}

/// Buy-back value of a schedule
///
/// A reduced schedule that has reached its term is worth its reduction value.
pub fn surrender_value(
    tables: &TableSet,
    state: VirtualState,
    duration_years: u32,
    elapsed_months: u32,
    capital: Decimal,
    reduction_elapsed_months: u32,
) -> CalcResult<Option<Decimal>> {
    if state.is_reduced() && elapsed_months + reduction_elapsed_months >= duration_years * 12 {
        return reduction_value(tables, duration_years, elapsed_months, capital);
    }
    table_value(tables, TableKind::SurrenderValue, duration_years, elapsed_months, capital)
}

/// Amount paid out at the end of a schedule in the given state
pub fn payable_amount(
    tables: &TableSet,
    state: VirtualState,
    duration_years: u32,
    elapsed_months: u32,
    capital: Decimal,
) -> CalcResult<Option<Decimal>> {
    match state {
        VirtualState::Buyout => Ok(Some(Decimal::ZERO)),
        VirtualState::Reduced => reduction_value(tables, duration_years, elapsed_months, capital),
        _ => Ok(Some(round_money(capital))),
    }
}

/// Mathematical reserve of a schedule at `date`
///
/// Nothing is reserved once bought out. Between a reduction and the next
/// due date the theoretical value is prorated upwards by
/// `reduction_elapsed / 300`; from that due date on the reduction value is
/// reserved.
pub fn mathematical_reserve(
    tables: &TableSet,
    timeline: &ContractTimeline,
    capital: Decimal,
    date: NaiveDate,
) -> CalcResult<Decimal> {
    let state = timeline.virtual_state_at(date);
    let total_months = timeline.total_months();
    let months_until = |end: NaiveDate| (months_between(timeline.start_date, end).max(0) as u32).min(total_months);

    let reserve = match (state, timeline.reduction_date) {
        (VirtualState::Buyout, _) => Some(Decimal::ZERO),
        (s, _) if s.is_pre_issue() => Some(Decimal::ZERO),
        (VirtualState::Reduced, Some(reduction_date)) => {
            let elapsed = months_until(reduction_date);
            let next_due = timeline.next_due_date_on_or_after(reduction_date);

            if next_due.map_or(true, |due| date >= due) {
                reduction_value(tables, timeline.duration_years, elapsed, capital)?
            } else {
                let reduction_elapsed = Decimal::from(months_between(reduction_date, date).max(0));
                theoretical_value(tables, timeline.duration_years, elapsed, capital)?.map(|value| {
                    round_money(value + value * reduction_elapsed / REDUCTION_PRORATION_MONTHS)
                })
            }
        }
        _ => table_value(
            tables,
            TableKind::MathematicalReserve,
            timeline.duration_years,
            months_until(date),
            capital,
        )?,
    };

    Ok(reserve.unwrap_or_else(|| {
        warn!("Mathematical reserve unknown at {}, using 0", date);
        Decimal::ZERO
    }))
}
