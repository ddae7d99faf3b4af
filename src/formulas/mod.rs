//! Premium amount formulas
//!
//! [`amount_at`] computes one named amount of a premium schedule from the
//! schedule's applied features. Every result is rounded to cents once before
//! it is returned. Formulas built from other formulas go through
//! [`amount_at`] again, so each component is rounded on its own before being
//! combined.

mod features;
mod index;

pub use features::{
    load_features, load_features_from_reader, Feature, FeatureValue, PremiumSchedule, Role,
    RoleType, ScheduleSnapshot, PREMIUM_FEE_BRACKETS, PREMIUM_RATE_BRACKETS,
};
pub use index::IndexCurve;

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use log::debug;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, MathematicalOps};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::dates::{add_months, leap_days, months_between};
use crate::error::{CalcResult, CalculationError};
use crate::numeric::{percent_of, round_down, round_money, round_up};

const DAYS_PER_YEAR: Decimal = dec!(365);

/// Amounts [`amount_at`] can compute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum AmountType {
    NetPremium,
    PremiumMinusTaxes,
    Taxation,
    FundedPremium,
    EntryFee,
    /// Tiered premium rate, brackets `1..=5`
    PremiumRate(u8),
    /// Fixed premium fee, brackets `1..=4`
    PremiumFee(u8),
    FinancedCommissions,
    EffectiveInterestTax,
    FictiveInterestTax,
    RedemptionRate,
    MarketFluctuation,
    DistributedMedicalFee,
}

impl AmountType {
    /// Every amount type, in the order they appear in a premium breakdown
    pub fn all() -> Vec<AmountType> {
        let mut all = vec![
            AmountType::NetPremium,
            AmountType::PremiumMinusTaxes,
            AmountType::Taxation,
            AmountType::FundedPremium,
            AmountType::EntryFee,
        ];
        all.extend((1..=PREMIUM_RATE_BRACKETS).map(AmountType::PremiumRate));
        all.extend((1..=PREMIUM_FEE_BRACKETS).map(AmountType::PremiumFee));
        all.extend([
            AmountType::FinancedCommissions,
            AmountType::EffectiveInterestTax,
            AmountType::FictiveInterestTax,
            AmountType::RedemptionRate,
            AmountType::MarketFluctuation,
            AmountType::DistributedMedicalFee,
        ]);
        all
    }
}

impl fmt::Display for AmountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AmountType::NetPremium => f.write_str("net_premium"),
            AmountType::PremiumMinusTaxes => f.write_str("premium_minus_taxes"),
            AmountType::Taxation => f.write_str("taxation"),
            AmountType::FundedPremium => f.write_str("funded_premium"),
            AmountType::EntryFee => f.write_str("entry_fee"),
            AmountType::PremiumRate(i) => write!(f, "premium_rate_{}", i),
            AmountType::PremiumFee(i) => write!(f, "premium_fee_{}", i),
            AmountType::FinancedCommissions => f.write_str("financed_commissions"),
            AmountType::EffectiveInterestTax => f.write_str("effective_interest_tax"),
            AmountType::FictiveInterestTax => f.write_str("fictive_interest_tax"),
            AmountType::RedemptionRate => f.write_str("redemption_rate"),
            AmountType::MarketFluctuation => f.write_str("market_fluctuation"),
            AmountType::DistributedMedicalFee => f.write_str("distributed_medical_fee"),
        }
    }
}

impl FromStr for AmountType {
    type Err = CalculationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AmountType::all()
            .into_iter()
            .find(|amount_type| amount_type.to_string() == s)
            .ok_or_else(|| CalculationError::UnknownAmountType { name: s.to_string() })
    }
}

impl TryFrom<String> for AmountType {
    type Error = CalculationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<AmountType> for String {
    fn from(amount_type: AmountType) -> Self {
        amount_type.to_string()
    }
}

/// Inputs shared by every formula of a single evaluation
struct FormulaContext<'a, S: PremiumSchedule + ?Sized> {
    schedule: &'a S,
    premium_amount: Decimal,
    application_date: NaiveDate,
    attribution_date: NaiveDate,
    applied_amount: Option<Decimal>,
}

impl<S: PremiumSchedule + ?Sized> FormulaContext<'_, S> {
    /// Feature value for an amount, 0 when the schedule has none
    fn feature_for(&self, feature: Feature, amount: Decimal) -> Decimal {
        self.schedule
            .applied_feature_at(self.application_date, self.attribution_date, amount, feature, Decimal::ZERO)
            .value
    }

    fn feature(&self, feature: Feature) -> Decimal {
        self.feature_for(feature, self.premium_amount)
    }

    /// Another formula of the same evaluation, rounded
    fn amount(&self, amount_type: AmountType) -> CalcResult<Decimal> {
        amount_at(
            self.schedule,
            self.premium_amount,
            self.application_date,
            self.attribution_date,
            amount_type,
            self.applied_amount,
        )
    }

    fn applied(&self) -> Decimal {
        self.applied_amount.unwrap_or(self.premium_amount)
    }

    /// `1 + premium_multiplier / 100`
    fn multiplier(&self) -> Decimal {
        Decimal::ONE + self.feature(Feature::PremiumMultiplier) / Decimal::ONE_HUNDRED
    }
}

/// Compute one amount of a premium schedule, rounded to cents
///
/// `application_date` is the date the amount is booked, `attribution_date`
/// the date the premium was attributed to the schedule. `applied_amount` is
/// the amount a deduction applies to; formulas that need one fall back to
/// the premium amount.
pub fn amount_at<S: PremiumSchedule + ?Sized>(
    schedule: &S,
    premium_amount: Decimal,
    application_date: NaiveDate,
    attribution_date: NaiveDate,
    amount_type: AmountType,
    applied_amount: Option<Decimal>,
) -> CalcResult<Decimal> {
    let ctx = FormulaContext {
        schedule,
        premium_amount,
        application_date,
        attribution_date,
        applied_amount,
    };

    let amount = match amount_type {
        AmountType::NetPremium => net_premium(&ctx)?,
        AmountType::PremiumMinusTaxes => premium_amount - ctx.amount(AmountType::Taxation)?,
        AmountType::Taxation => taxation(&ctx)?,
        AmountType::FundedPremium => round_down(percent_of(premium_amount, ctx.feature(Feature::FundedPremiumRate))),
        AmountType::EntryFee => entry_fee(&ctx),
        AmountType::PremiumRate(i) if (1..=PREMIUM_RATE_BRACKETS).contains(&i) => premium_rate(&ctx, i)?,
        AmountType::PremiumFee(i) if (1..=PREMIUM_FEE_BRACKETS).contains(&i) => {
            round_down(ctx.feature(Feature::PremiumFee(i)) * ctx.multiplier())
        }
        AmountType::PremiumRate(_) | AmountType::PremiumFee(_) => {
            return Err(CalculationError::UnknownAmountType {
                name: amount_type.to_string(),
            })
        }
        AmountType::FinancedCommissions => {
            let base = ctx.amount(AmountType::PremiumMinusTaxes)?;
            round_up(percent_of(base, ctx.feature(Feature::FinancedCommissionsRate)))
        }
        AmountType::EffectiveInterestTax => interest_tax(&ctx, Feature::EffectiveInterestTaxRate),
        AmountType::FictiveInterestTax => interest_tax(&ctx, Feature::FictiveInterestTaxRate),
        AmountType::RedemptionRate => redemption_rate(&ctx),
        AmountType::MarketFluctuation => market_fluctuation(&ctx)?,
        AmountType::DistributedMedicalFee => distributed_medical_fee(&ctx),
    };

    let amount = round_money(amount);
    debug!("{} at {} (attributed {}): {}", amount_type, application_date, attribution_date, amount);
    Ok(amount)
}

/// [`amount_at`] with the amount type given by name
pub fn amount_at_named<S: PremiumSchedule + ?Sized>(
    schedule: &S,
    premium_amount: Decimal,
    application_date: NaiveDate,
    attribution_date: NaiveDate,
    amount_type: &str,
    applied_amount: Option<Decimal>,
) -> CalcResult<Decimal> {
    let amount_type: AmountType = amount_type.parse()?;
    amount_at(schedule, premium_amount, application_date, attribution_date, amount_type, applied_amount)
}

/// Premium after taxes, fees and rates, plus funding, minus medical fees
fn net_premium<S: PremiumSchedule + ?Sized>(ctx: &FormulaContext<'_, S>) -> CalcResult<Decimal> {
    let mut net = ctx.premium_amount - ctx.amount(AmountType::Taxation)? - ctx.amount(AmountType::EntryFee)?;
    for i in 1..=PREMIUM_RATE_BRACKETS {
        net -= ctx.amount(AmountType::PremiumRate(i))?;
    }
    for i in 1..=PREMIUM_FEE_BRACKETS {
        net -= ctx.amount(AmountType::PremiumFee(i))?;
    }
    net += ctx.amount(AmountType::FundedPremium)?;
    net -= ctx.amount(AmountType::DistributedMedicalFee)?;
    Ok(net)
}

/// Tax included in the premium
///
/// Legal-person subscribers are taxed at their own rate.
fn taxation<S: PremiumSchedule + ?Sized>(ctx: &FormulaContext<'_, S>) -> CalcResult<Decimal> {
    let legal_person = ctx
        .schedule
        .roles_at(ctx.attribution_date, RoleType::Subscriber)
        .iter()
        .any(|role| role.legal_person);
    let feature = if legal_person {
        Feature::PremiumTaxationLegalPerson
    } else {
        Feature::PremiumTaxationPhysicalPerson
    };

    let rate = ctx.feature(feature) / Decimal::ONE_HUNDRED;
    if Decimal::ONE + rate <= Decimal::ZERO {
        return Err(CalculationError::formula(
            "taxation",
            format!("{} of {} for premium {}", feature, ctx.feature(feature), ctx.premium_amount),
        ));
    }
    Ok(round_up(ctx.premium_amount * rate / (Decimal::ONE + rate)))
}

/// Entry fee, only charged on the premium attributed at the schedule start
fn entry_fee<S: PremiumSchedule + ?Sized>(ctx: &FormulaContext<'_, S>) -> Decimal {
    if ctx.attribution_date == ctx.schedule.valid_from_date() {
        ctx.feature(Feature::EntryFee)
    } else {
        Decimal::ZERO
    }
}

/// Tiered premium rate, clamped between its scaled minimum and maximum
///
/// A maximum of 0 means no maximum.
fn premium_rate<S: PremiumSchedule + ?Sized>(ctx: &FormulaContext<'_, S>, bracket: u8) -> CalcResult<Decimal> {
    let multiplier = ctx.multiplier();
    if multiplier <= Decimal::ZERO {
        return Err(CalculationError::formula(
            "premium_rate",
            format!("premium multiplier {} for premium {}", multiplier, ctx.premium_amount),
        ));
    }

    let base = ctx.premium_amount - ctx.amount(AmountType::Taxation)?;
    let unit_amount = ctx.premium_amount / multiplier;

    let rate = ctx.feature_for(Feature::PremiumRate(bracket), unit_amount);
    let minimum = ctx.feature_for(Feature::MinimumPremiumRate(bracket), unit_amount) * multiplier;
    let maximum = match ctx.feature_for(Feature::MaximumPremiumRate(bracket), unit_amount) {
        m if m.is_zero() => base,
        m => m * multiplier,
    };

    let charged = round_down(multiplier * round_up(rate * base / (Decimal::ONE_HUNDRED * multiplier)));
    Ok(charged.min(maximum).max(minimum))
}

/// Tax on realised interest, never negative
fn interest_tax<S: PremiumSchedule + ?Sized>(ctx: &FormulaContext<'_, S>, rate: Feature) -> Decimal {
    round_up(percent_of(ctx.applied(), ctx.feature(rate))).max(Decimal::ZERO)
}

/// Redemption charge; its rate decreases with the age of the contract and of the premium
fn redemption_rate<S: PremiumSchedule + ?Sized>(ctx: &FormulaContext<'_, S>) -> Decimal {
    let contract_months = Decimal::from(months_between(ctx.schedule.valid_from_date(), ctx.application_date).max(0));
    let premium_months = Decimal::from(months_between(ctx.attribution_date, ctx.application_date).max(0));

    let rate = (ctx.feature(Feature::RedemptionRate)
        - contract_months * ctx.feature(Feature::RedemptionRateMonthlyContractDecrease)
        - premium_months * ctx.feature(Feature::RedemptionRateMonthlyPremiumDecrease))
    .max(Decimal::ZERO);

    round_up(percent_of(ctx.applied(), rate)).max(Decimal::ZERO)
}

/// Deduction for adverse market movement on an early exit
///
/// Nothing is deducted once the reference period of the premium has passed
/// or when the exit rate is 0. Otherwise the guaranteed rate is compared with
/// the index rate at the remaining horizon, over the remaining days excluding
/// leap days.
fn market_fluctuation<S: PremiumSchedule + ?Sized>(ctx: &FormulaContext<'_, S>) -> CalcResult<Decimal> {
    let applied = ctx.applied();
    let reference_months = ctx.feature(Feature::MarketFluctuationReferenceDuration);
    let reference_end = add_months(ctx.attribution_date, reference_months.trunc().to_i32().unwrap_or(0));
    let exit_rate = ctx.feature(Feature::MarketFluctuationExitRate);

    if reference_end <= ctx.application_date || exit_rate.is_zero() {
        return Ok(Decimal::ZERO);
    }

    let remaining_months = months_between(ctx.application_date, reference_end).max(0) as u32;
    let index = ctx
        .schedule
        .index_curve_at(ctx.application_date)
        .and_then(|curve| curve.interpolate(remaining_months))
        .ok_or(CalculationError::MissingIndexDefinition {
            date: ctx.application_date,
        })?;

    let total_rate = ctx.feature(Feature::InterestRate) + ctx.feature(Feature::AdditionalInterestRate);
    let reference_rate = index - ctx.feature(Feature::MarketFluctuationIndexDifference);
    let denominator = Decimal::ONE + reference_rate / Decimal::ONE_HUNDRED;
    let numerator = Decimal::ONE + total_rate / Decimal::ONE_HUNDRED;
    if denominator <= Decimal::ZERO || numerator <= Decimal::ZERO {
        return Err(CalculationError::formula(
            "market_fluctuation",
            format!("total rate {} against reference rate {}", total_rate, reference_rate),
        ));
    }
    let factor = numerator / denominator;

    let remaining_days = (reference_end - ctx.application_date).num_days()
        - leap_days(ctx.application_date, reference_end);
    let exponent = Decimal::from(remaining_days) / DAYS_PER_YEAR;
    let growth = factor.checked_powd(exponent).ok_or_else(|| {
        CalculationError::formula("market_fluctuation", format!("{} raised to {} overflows", factor, exponent))
    })?;
    let erosion = (Decimal::ONE - growth).max(Decimal::ZERO);

    let deduction = round_up(percent_of(applied, exit_rate) * erosion);
    Ok(deduction.min(applied))
}

/// Medical fee spread over the planned premiums
fn distributed_medical_fee<S: PremiumSchedule + ?Sized>(ctx: &FormulaContext<'_, S>) -> Decimal {
    let fee = ctx.feature(Feature::MedicalFee);
    match ctx.schedule.planned_premiums() {
        0 | 1 => fee,
        planned => round_up(fee / Decimal::from(planned)),
    }
}
