//! Calendar arithmetic used by the contract formulas
//!
//! Month differences are an approximation based on day-of-month fractions,
//! not an exact day count. Payment counts and table keys depend on that
//! approximation, so it is reproduced as is.

use chrono::{Datelike, Months, NaiveDate};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

/// Number of days in the given month
pub fn days_in_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|d| d.pred_opt())
        .map(|d| d.day())
        .unwrap_or(31)
}

/// Whole months between two dates
///
/// When the start day is past the end day, the month difference is corrected
/// by `end.day / days_in(end.month) - start.day / days_in(start.month)`,
/// subtracted from the plain difference, and truncated toward zero.
pub fn months_between(start: NaiveDate, end: NaiveDate) -> i32 {
    let months = (end.year() - start.year()) * 12 + end.month() as i32 - start.month() as i32;
    if start.day() <= end.day() {
        return months;
    }

    let end_fraction =
        Decimal::from(end.day()) / Decimal::from(days_in_month(end.year(), end.month()));
    let start_fraction =
        Decimal::from(start.day()) / Decimal::from(days_in_month(start.year(), start.month()));
    let correction = end_fraction - start_fraction;

    (Decimal::from(months) - correction)
        .trunc()
        .to_i32()
        .unwrap_or(months)
}

/// Shift a date by `n` months, clamping the day to the end of the target month
pub fn add_months(date: NaiveDate, n: i32) -> NaiveDate {
    let shifted = if n >= 0 {
        date.checked_add_months(Months::new(n as u32))
    } else {
        date.checked_sub_months(Months::new(n.unsigned_abs()))
    };
    shifted.unwrap_or(if n >= 0 { NaiveDate::MAX } else { NaiveDate::MIN })
}

/// Number of 29 February days in `(start, end]`
pub fn leap_days(start: NaiveDate, end: NaiveDate) -> i64 {
    if end <= start {
        return 0;
    }
    (start.year()..=end.year())
        .filter_map(|year| NaiveDate::from_ymd_opt(year, 2, 29))
        .filter(|leap_day| *leap_day > start && *leap_day <= end)
        .count() as i64
}

/// Date on which a contract of `duration_years` started at `start` ends
pub fn maturity_date(start: NaiveDate, duration_years: u32) -> NaiveDate {
    add_months(start, (duration_years * 12) as i32)
}

/// Whether a scheduled due date falls in `[period_start, period_end)`
///
/// Due dates are `contract_start + k * payment_interval_months` for every
/// payment of the contract. Periods starting on or after maturity never have
/// a due date.
pub fn has_due_date_in_period(
    period_start: NaiveDate,
    period_end: NaiveDate,
    contract_start: NaiveDate,
    duration_years: u32,
    payment_interval_months: u32,
) -> bool {
    if payment_interval_months == 0 {
        return false;
    }
    if period_start >= maturity_date(contract_start, duration_years) {
        return false;
    }

    let payments = duration_years * (12 / payment_interval_months);
    (0..payments)
        .map(|k| add_months(contract_start, (k * payment_interval_months) as i32))
        .any(|due| due >= period_start && due < period_end)
}
