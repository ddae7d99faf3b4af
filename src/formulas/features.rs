//! Applied features: dated rate, fee and threshold parameters of a schedule
//!
//! The engine does not own schedule data. It reads it through the
//! [`PremiumSchedule`] trait; [`ScheduleSnapshot`] is an in-memory
//! implementation loaded from a CSV extract.

use std::error::Error;
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use csv::Reader;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::index::IndexCurve;

/// Number of tiered premium rate brackets
pub const PREMIUM_RATE_BRACKETS: u8 = 5;

/// Number of fixed premium fee brackets
pub const PREMIUM_FEE_BRACKETS: u8 = 4;

/// Named parameters a formula can resolve
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Feature {
    PremiumTaxationPhysicalPerson,
    PremiumTaxationLegalPerson,
    EntryFee,
    PremiumMultiplier,
    PremiumRate(u8),
    MinimumPremiumRate(u8),
    MaximumPremiumRate(u8),
    PremiumFee(u8),
    FundedPremiumRate,
    FinancedCommissionsRate,
    EffectiveInterestTaxRate,
    FictiveInterestTaxRate,
    RedemptionRate,
    RedemptionRateMonthlyContractDecrease,
    RedemptionRateMonthlyPremiumDecrease,
    MarketFluctuationExitRate,
    MarketFluctuationReferenceDuration,
    MarketFluctuationIndexDifference,
    InterestRate,
    AdditionalInterestRate,
    MedicalFee,
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Feature::PremiumTaxationPhysicalPerson => f.write_str("premium_taxation_physical_person"),
            Feature::PremiumTaxationLegalPerson => f.write_str("premium_taxation_legal_person"),
            Feature::EntryFee => f.write_str("entry_fee"),
            Feature::PremiumMultiplier => f.write_str("premium_multiplier"),
            Feature::PremiumRate(i) => write!(f, "premium_rate_{}", i),
            Feature::MinimumPremiumRate(i) => write!(f, "minimum_premium_rate_{}", i),
            Feature::MaximumPremiumRate(i) => write!(f, "maximum_premium_rate_{}", i),
            Feature::PremiumFee(i) => write!(f, "premium_fee_{}", i),
            Feature::FundedPremiumRate => f.write_str("funded_premium_rate"),
            Feature::FinancedCommissionsRate => f.write_str("financed_commissions_rate"),
            Feature::EffectiveInterestTaxRate => f.write_str("effective_interest_tax_rate"),
            Feature::FictiveInterestTaxRate => f.write_str("fictive_interest_tax_rate"),
            Feature::RedemptionRate => f.write_str("redemption_rate"),
            Feature::RedemptionRateMonthlyContractDecrease => {
                f.write_str("redemption_rate_monthly_contract_decrease")
            }
            Feature::RedemptionRateMonthlyPremiumDecrease => {
                f.write_str("redemption_rate_monthly_premium_decrease")
            }
            Feature::MarketFluctuationExitRate => f.write_str("market_fluctuation_exit_rate"),
            Feature::MarketFluctuationReferenceDuration => {
                f.write_str("market_fluctuation_reference_duration")
            }
            Feature::MarketFluctuationIndexDifference => {
                f.write_str("market_fluctuation_index_difference")
            }
            Feature::InterestRate => f.write_str("interest_rate"),
            Feature::AdditionalInterestRate => f.write_str("additional_interest_rate"),
            Feature::MedicalFee => f.write_str("medical_fee"),
        }
    }
}

/// Split `prefix_<n>` into its bracket number when `n` is within `1..=max`
fn bracket(name: &str, prefix: &str, max: u8) -> Option<u8> {
    let n: u8 = name.strip_prefix(prefix)?.parse().ok()?;
    (1..=max).contains(&n).then_some(n)
}

impl FromStr for Feature {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let feature = match s {
            "premium_taxation_physical_person" => Feature::PremiumTaxationPhysicalPerson,
            "premium_taxation_legal_person" => Feature::PremiumTaxationLegalPerson,
            "entry_fee" => Feature::EntryFee,
            "premium_multiplier" => Feature::PremiumMultiplier,
            "funded_premium_rate" => Feature::FundedPremiumRate,
            "financed_commissions_rate" => Feature::FinancedCommissionsRate,
            "effective_interest_tax_rate" => Feature::EffectiveInterestTaxRate,
            "fictive_interest_tax_rate" => Feature::FictiveInterestTaxRate,
            "redemption_rate" => Feature::RedemptionRate,
            "redemption_rate_monthly_contract_decrease" => Feature::RedemptionRateMonthlyContractDecrease,
            "redemption_rate_monthly_premium_decrease" => Feature::RedemptionRateMonthlyPremiumDecrease,
            "market_fluctuation_exit_rate" => Feature::MarketFluctuationExitRate,
            "market_fluctuation_reference_duration" => Feature::MarketFluctuationReferenceDuration,
            "market_fluctuation_index_difference" => Feature::MarketFluctuationIndexDifference,
            "interest_rate" => Feature::InterestRate,
            "additional_interest_rate" => Feature::AdditionalInterestRate,
            "medical_fee" => Feature::MedicalFee,
            other => {
                if let Some(n) = bracket(other, "minimum_premium_rate_", PREMIUM_RATE_BRACKETS) {
                    Feature::MinimumPremiumRate(n)
                } else if let Some(n) = bracket(other, "maximum_premium_rate_", PREMIUM_RATE_BRACKETS) {
                    Feature::MaximumPremiumRate(n)
                } else if let Some(n) = bracket(other, "premium_rate_", PREMIUM_RATE_BRACKETS) {
                    Feature::PremiumRate(n)
                } else if let Some(n) = bracket(other, "premium_fee_", PREMIUM_FEE_BRACKETS) {
                    Feature::PremiumFee(n)
                } else {
                    return Err(format!("Unknown feature: {}", other));
                }
            }
        };
        Ok(feature)
    }
}

/// A feature value with its validity windows
///
/// The application window is checked against the date the amount is applied,
/// the premium window against the attribution date of the premium and the
/// amount window against the premium amount.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureValue {
    pub feature: Feature,
    pub value: Decimal,
    pub apply_from_date: NaiveDate,
    pub apply_thru_date: Option<NaiveDate>,
    pub premium_from_date: NaiveDate,
    pub premium_thru_date: Option<NaiveDate>,
    pub from_amount: Decimal,
    pub thru_amount: Option<Decimal>,
}

impl FeatureValue {
    /// A value valid at every date and for every amount
    pub fn new(feature: Feature, value: Decimal) -> Self {
        Self {
            feature,
            value,
            apply_from_date: NaiveDate::MIN,
            apply_thru_date: None,
            premium_from_date: NaiveDate::MIN,
            premium_thru_date: None,
            from_amount: Decimal::ZERO,
            thru_amount: None,
        }
    }

    pub fn applied_between(mut self, from: NaiveDate, thru: Option<NaiveDate>) -> Self {
        self.apply_from_date = from;
        self.apply_thru_date = thru;
        self
    }

    pub fn for_premiums_between(mut self, from: NaiveDate, thru: Option<NaiveDate>) -> Self {
        self.premium_from_date = from;
        self.premium_thru_date = thru;
        self
    }

    pub fn for_amounts_between(mut self, from: Decimal, thru: Option<Decimal>) -> Self {
        self.from_amount = from;
        self.thru_amount = thru;
        self
    }

    /// Whether the value applies at these dates and to this amount
    pub fn applies(&self, application_date: NaiveDate, attribution_date: NaiveDate, amount: Decimal) -> bool {
        let within = |date: NaiveDate, from: NaiveDate, thru: Option<NaiveDate>| {
            date >= from && thru.map_or(true, |t| date <= t)
        };
        within(application_date, self.apply_from_date, self.apply_thru_date)
            && within(attribution_date, self.premium_from_date, self.premium_thru_date)
            && amount >= self.from_amount
            && self.thru_amount.map_or(true, |t| amount <= t)
    }
}

/// Role a party plays on a schedule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoleType {
    Subscriber,
}

/// A party in a role over a period
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub role_type: RoleType,
    pub legal_person: bool,
    pub from_date: NaiveDate,
    pub thru_date: Option<NaiveDate>,
}

impl Role {
    pub fn active_at(&self, date: NaiveDate) -> bool {
        date >= self.from_date && self.thru_date.map_or(true, |t| date <= t)
    }
}

/// What the formula engine needs to know about a premium schedule
pub trait PremiumSchedule {
    /// The feature value effective at the dates for the amount, or `default`
    fn applied_feature_at(
        &self,
        application_date: NaiveDate,
        attribution_date: NaiveDate,
        amount: Decimal,
        feature: Feature,
        default: Decimal,
    ) -> FeatureValue;

    /// Parties holding a role at `date`
    fn roles_at(&self, date: NaiveDate, role_type: RoleType) -> Vec<Role>;

    /// Index curve of the market fluctuation deduction at `date`
    fn index_curve_at(&self, date: NaiveDate) -> Option<IndexCurve>;

    fn valid_from_date(&self) -> NaiveDate;

    fn valid_thru_date(&self) -> Option<NaiveDate>;

    fn premium_amount(&self) -> Decimal;

    fn planned_premiums(&self) -> u32;
}

/// In-memory premium schedule
#[derive(Debug, Clone)]
pub struct ScheduleSnapshot {
    pub valid_from_date: NaiveDate,
    pub valid_thru_date: Option<NaiveDate>,
    pub premium_amount: Decimal,
    pub planned_premiums: u32,
    features: Vec<FeatureValue>,
    roles: Vec<Role>,
    /// Curves with the date from which they apply
    index_curves: Vec<(NaiveDate, IndexCurve)>,
}

impl ScheduleSnapshot {
    pub fn new(valid_from_date: NaiveDate, premium_amount: Decimal, planned_premiums: u32) -> Self {
        Self {
            valid_from_date,
            valid_thru_date: None,
            premium_amount,
            planned_premiums,
            features: Vec::new(),
            roles: Vec::new(),
            index_curves: Vec::new(),
        }
    }

    pub fn with_feature(mut self, value: FeatureValue) -> Self {
        self.features.push(value);
        self
    }

    pub fn with_features(mut self, values: impl IntoIterator<Item = FeatureValue>) -> Self {
        self.features.extend(values);
        self
    }

    pub fn with_role(mut self, role: Role) -> Self {
        self.roles.push(role);
        self
    }

    pub fn with_index_curve(mut self, from: NaiveDate, curve: IndexCurve) -> Self {
        self.index_curves.push((from, curve));
        self
    }

}

impl PremiumSchedule for ScheduleSnapshot {
    fn applied_feature_at(
        &self,
        application_date: NaiveDate,
        attribution_date: NaiveDate,
        amount: Decimal,
        feature: Feature,
        default: Decimal,
    ) -> FeatureValue {
        // Most recently started window wins, later entries on a tie
        self.features
            .iter()
            .filter(|fv| fv.feature == feature && fv.applies(application_date, attribution_date, amount))
            .max_by_key(|fv| (fv.apply_from_date, fv.premium_from_date))
            .cloned()
            .unwrap_or_else(|| FeatureValue::new(feature, default))
    }

    fn roles_at(&self, date: NaiveDate, role_type: RoleType) -> Vec<Role> {
        self.roles
            .iter()
            .filter(|r| r.role_type == role_type && r.active_at(date))
            .cloned()
            .collect()
    }

    fn index_curve_at(&self, date: NaiveDate) -> Option<IndexCurve> {
        self.index_curves
            .iter()
            .filter(|(from, _)| *from <= date)
            .max_by_key(|(from, _)| *from)
            .map(|(_, curve)| curve.clone())
    }

    fn valid_from_date(&self) -> NaiveDate {
        self.valid_from_date
    }

    fn valid_thru_date(&self) -> Option<NaiveDate> {
        self.valid_thru_date
    }

    fn premium_amount(&self) -> Decimal {
        self.premium_amount
    }

    fn planned_premiums(&self) -> u32 {
        self.planned_premiums
    }
}

/// Raw CSV row of a feature extract
#[derive(Debug, Deserialize)]
struct CsvRow {
    feature: String,
    value: Decimal,
    apply_from_date: Option<NaiveDate>,
    apply_thru_date: Option<NaiveDate>,
    premium_from_date: Option<NaiveDate>,
    premium_thru_date: Option<NaiveDate>,
    from_amount: Option<Decimal>,
    thru_amount: Option<Decimal>,
}

impl CsvRow {
    fn to_feature_value(self) -> Result<FeatureValue, Box<dyn Error>> {
        let feature: Feature = self.feature.parse()?;
        Ok(FeatureValue::new(feature, self.value)
            .applied_between(self.apply_from_date.unwrap_or(NaiveDate::MIN), self.apply_thru_date)
            .for_premiums_between(self.premium_from_date.unwrap_or(NaiveDate::MIN), self.premium_thru_date)
            .for_amounts_between(self.from_amount.unwrap_or(Decimal::ZERO), self.thru_amount))
    }
}

/// Load feature values from any CSV reader
pub fn load_features_from_reader<R: std::io::Read>(reader: R) -> Result<Vec<FeatureValue>, Box<dyn Error>> {
    let mut csv_reader = Reader::from_reader(reader);
    let mut values = Vec::new();

    for result in csv_reader.deserialize() {
        let row: CsvRow = result?;
        values.push(row.to_feature_value()?);
    }

    Ok(values)
}

/// Load feature values from a CSV file
pub fn load_features<P: AsRef<std::path::Path>>(path: P) -> Result<Vec<FeatureValue>, Box<dyn Error>> {
    let file = std::fs::File::open(path)?;
    load_features_from_reader(file)
}
