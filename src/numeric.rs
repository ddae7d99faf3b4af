//! Rounding helpers applied to monetary amounts
//!
//! Every amount leaves the engine through [`round_money`]. The directional
//! helpers are only used where a formula asks for them.

use rust_decimal::{Decimal, RoundingStrategy};

/// Number of decimals of a monetary amount
pub const MONEY_DECIMALS: u32 = 2;

/// Round to cents, half away from zero
pub fn round_money(x: Decimal) -> Decimal {
    x.round_dp_with_strategy(MONEY_DECIMALS, RoundingStrategy::MidpointAwayFromZero)
}

/// Round up to the next cent (in the insurer's favour)
pub fn round_up(x: Decimal) -> Decimal {
    x.round_dp_with_strategy(MONEY_DECIMALS, RoundingStrategy::ToPositiveInfinity)
}

/// Round down to the previous cent
pub fn round_down(x: Decimal) -> Decimal {
    x.round_dp_with_strategy(MONEY_DECIMALS, RoundingStrategy::ToNegativeInfinity)
}

/// Percentage of an amount, unrounded
pub fn percent_of(amount: Decimal, rate: Decimal) -> Decimal {
    amount * rate / Decimal::ONE_HUNDRED
}
