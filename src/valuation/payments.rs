//! Elapsed time, payment counts and amounts derived from them

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::contract::{ScheduleStatus, VirtualState};
use crate::dates::months_between;
use crate::numeric::{percent_of, round_money};

/// Buy-outs on or before this date are taxed at the old rate
pub const WITHHOLDING_TAX_CUTOFF: (i32, u32, u32) = (2004, 1, 1);

/// Withholding tax rate (percent) up to the cutoff
pub const WITHHOLDING_TAX_RATE_BEFORE_CUTOFF: Decimal = dec!(25);

/// Withholding tax rate (percent) after the cutoff
pub const WITHHOLDING_TAX_RATE_AFTER_CUTOFF: Decimal = dec!(15);

/// Months a schedule has been running at `today`
///
/// Counting stops at the reduction or buy-out date once that date has
/// passed, and never exceeds the contract duration. Pre-issue schedules
/// have no elapsed months.
pub fn elapsed_months(
    today: NaiveDate,
    status: &ScheduleStatus,
    buyout_date: Option<NaiveDate>,
    reduction_date: Option<NaiveDate>,
    start_date: NaiveDate,
    duration_years: u32,
) -> u32 {
    if status.is_pre_issue() {
        return 0;
    }

    let end = [reduction_date, buyout_date]
        .into_iter()
        .flatten()
        .filter(|d| *d <= today)
        .fold(today, |earliest, d| earliest.min(d));

    let months = months_between(start_date, end).max(0) as u32;
    months.min(duration_years * 12)
}

/// Number of premiums due after `elapsed_months`
///
/// The payment on the start date counts as well while the schedule is in
/// force and not yet at term.
pub fn payments_due(
    state: VirtualState,
    elapsed_months: u32,
    payments_per_year: u32,
    duration_years: u32,
) -> u32 {
    if payments_per_year == 0 || payments_per_year > 12 {
        return 0;
    }
    let months_per_payment = 12 / payments_per_year;
    let mut payments = elapsed_months / months_per_payment;
    if state == VirtualState::Processed && elapsed_months < duration_years * 12 {
        payments += 1;
    }
    payments
}

/// Total premium due for a number of payments
pub fn capital_due(premium_amount: Decimal, payments: u32) -> Decimal {
    round_money(premium_amount * Decimal::from(payments))
}

/// Interest realised on a buy-out: surrender value minus premiums paid
///
/// Negative when the surrender value is below the premiums.
pub fn buyout_interest(surrender_value: Decimal, capital_due: Decimal) -> Decimal {
    round_money(surrender_value - capital_due)
}

/// Withholding tax on the interest of a buy-out
pub fn withholding_tax_on_buyout_interest(interest: Decimal, buyout_date: NaiveDate) -> Decimal {
    if interest.is_zero() {
        return Decimal::ZERO;
    }

    let (y, m, d) = WITHHOLDING_TAX_CUTOFF;
    let cutoff = NaiveDate::from_ymd_opt(y, m, d).unwrap_or(NaiveDate::MIN);
    let rate = if buyout_date <= cutoff {
        WITHHOLDING_TAX_RATE_BEFORE_CUTOFF
    } else {
        WITHHOLDING_TAX_RATE_AFTER_CUTOFF
    };

    round_money(percent_of(interest, rate)).max(Decimal::ZERO)
}
