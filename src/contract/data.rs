//! Contract timeline and status structures

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::dates::{add_months, maturity_date};
use crate::error::CalculationError;

/// Payment intervals (in months) a premium schedule may use
pub const VALID_PAYMENT_INTERVALS: [u32; 6] = [1, 2, 3, 4, 6, 12];

/// Administrative status of a premium schedule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdministrativeStatus {
    Draft,
    Complete,
    Approved,
    Canceled,
    Processed,
}

impl AdministrativeStatus {
    /// Statuses of a schedule that has not been issued yet
    pub fn is_pre_issue(&self) -> bool {
        !matches!(self, AdministrativeStatus::Processed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AdministrativeStatus::Draft => "draft",
            AdministrativeStatus::Complete => "complete",
            AdministrativeStatus::Approved => "approved",
            AdministrativeStatus::Canceled => "canceled",
            AdministrativeStatus::Processed => "processed",
        }
    }
}

/// Compound schedule status: an administrative status plus lifecycle markers
///
/// Written as `processed`, `processed_reduced`, `processed_buyout` or
/// `processed_reduced_buyout`. `reduced`, `buyout` and `bought-out` on their
/// own imply `processed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ScheduleStatus {
    pub base: AdministrativeStatus,
    pub reduced: bool,
    pub buyout: bool,
}

impl ScheduleStatus {
    pub fn new(base: AdministrativeStatus) -> Self {
        Self {
            base,
            reduced: false,
            buyout: false,
        }
    }

    pub fn processed() -> Self {
        Self::new(AdministrativeStatus::Processed)
    }

    pub fn with_reduction(mut self) -> Self {
        self.reduced = true;
        self
    }

    pub fn with_buyout(mut self) -> Self {
        self.buyout = true;
        self
    }

    pub fn is_pre_issue(&self) -> bool {
        self.base.is_pre_issue()
    }
}

impl FromStr for ScheduleStatus {
    type Err = CalculationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || CalculationError::InvalidStatus {
            value: s.to_string(),
        };

        let mut base = None;
        let mut status = ScheduleStatus::processed();

        for token in s.trim().to_ascii_lowercase().split('_') {
            match token {
                "draft" => base = Some(AdministrativeStatus::Draft),
                "complete" => base = Some(AdministrativeStatus::Complete),
                "approved" => base = Some(AdministrativeStatus::Approved),
                "canceled" | "cancelled" => base = Some(AdministrativeStatus::Canceled),
                "processed" => base = Some(AdministrativeStatus::Processed),
                "reduced" => status.reduced = true,
                "buyout" | "bought-out" => status.buyout = true,
                _ => return Err(invalid()),
            }
        }

        status.base = base.unwrap_or(AdministrativeStatus::Processed);
        if status.base.is_pre_issue() && (status.reduced || status.buyout) {
            return Err(invalid());
        }
        Ok(status)
    }
}

impl fmt::Display for ScheduleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.base.as_str())?;
        if self.reduced {
            f.write_str("_reduced")?;
        }
        if self.buyout {
            f.write_str("_buyout")?;
        }
        Ok(())
    }
}

impl TryFrom<String> for ScheduleStatus {
    type Error = CalculationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ScheduleStatus> for String {
    fn from(status: ScheduleStatus) -> Self {
        status.to_string()
    }
}

/// Lifecycle dates and payment plan of a premium schedule
///
/// Deserialized timelines are validated like [`ContractTimeline::new`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawTimeline")]
pub struct ContractTimeline {
    pub start_date: NaiveDate,
    pub reduction_date: Option<NaiveDate>,
    pub buyout_date: Option<NaiveDate>,
    pub status: ScheduleStatus,
    pub duration_years: u32,
    pub payment_interval_months: u32,
}

/// Unchecked timeline fields as read from serialized data
#[derive(Deserialize)]
struct RawTimeline {
    start_date: NaiveDate,
    #[serde(default)]
    reduction_date: Option<NaiveDate>,
    #[serde(default)]
    buyout_date: Option<NaiveDate>,
    status: ScheduleStatus,
    duration_years: u32,
    payment_interval_months: u32,
}

impl TryFrom<RawTimeline> for ContractTimeline {
    type Error = CalculationError;

    fn try_from(raw: RawTimeline) -> Result<Self, Self::Error> {
        ContractTimeline::new(
            raw.start_date,
            raw.reduction_date,
            raw.buyout_date,
            raw.status,
            raw.duration_years,
            raw.payment_interval_months,
        )
    }
}

impl ContractTimeline {
    /// Create a timeline, checking the date ordering and the payment interval
    pub fn new(
        start_date: NaiveDate,
        reduction_date: Option<NaiveDate>,
        buyout_date: Option<NaiveDate>,
        status: ScheduleStatus,
        duration_years: u32,
        payment_interval_months: u32,
    ) -> Result<Self, CalculationError> {
        let timeline = Self {
            start_date,
            reduction_date,
            buyout_date,
            status,
            duration_years,
            payment_interval_months,
        };
        timeline.validate()?;
        Ok(timeline)
    }

    /// Processed timeline without lifecycle events
    pub fn in_force(start_date: NaiveDate, duration_years: u32, payment_interval_months: u32) -> Self {
        Self {
            start_date,
            reduction_date: None,
            buyout_date: None,
            status: ScheduleStatus::processed(),
            duration_years,
            payment_interval_months,
        }
    }

    pub fn validate(&self) -> Result<(), CalculationError> {
        let fail = |reason: String| CalculationError::InvalidTimeline { reason };

        for (label, date) in [("reduction", self.reduction_date), ("buyout", self.buyout_date)] {
            if let Some(date) = date {
                if date < self.start_date {
                    return Err(fail(format!(
                        "{} date {} before start date {}",
                        label, date, self.start_date
                    )));
                }
            }
        }
        if !VALID_PAYMENT_INTERVALS.contains(&self.payment_interval_months) {
            return Err(fail(format!(
                "invalid payment interval of {} months",
                self.payment_interval_months
            )));
        }
        Ok(())
    }

    /// Contract duration in months
    pub fn total_months(&self) -> u32 {
        self.duration_years * 12
    }

    /// Number of payments per contract year
    pub fn payments_per_year(&self) -> u32 {
        if self.payment_interval_months == 0 {
            0
        } else {
            12 / self.payment_interval_months
        }
    }

    pub fn maturity_date(&self) -> NaiveDate {
        maturity_date(self.start_date, self.duration_years)
    }

    /// Every scheduled due date, starting with the start date
    pub fn due_dates(&self) -> Vec<NaiveDate> {
        (0..self.duration_years * self.payments_per_year())
            .map(|k| add_months(self.start_date, (k * self.payment_interval_months) as i32))
            .collect()
    }

    /// First due date on or after `date`
    pub fn next_due_date_on_or_after(&self, date: NaiveDate) -> Option<NaiveDate> {
        self.due_dates().into_iter().find(|due| *due >= date)
    }
}

/// Amounts a contract carries into a calculation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonetaryInputs {
    /// Insured capital
    pub capital_amount: Decimal,

    /// Premium due at every payment
    pub premium_amount: Decimal,

    /// Amount subject to a deduction, when one applies
    #[serde(default)]
    pub applied_amount: Option<Decimal>,
}

/// A contract as seen by the valuation layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contract {
    pub contract_id: u32,
    pub timeline: ContractTimeline,
    pub amounts: MonetaryInputs,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_parse_status() {
        let status: ScheduleStatus = "processed_reduced".parse().unwrap();
        assert_eq!(status.base, AdministrativeStatus::Processed);
        assert!(status.reduced);
        assert!(!status.buyout);

        let status: ScheduleStatus = "bought-out".parse().unwrap();
        assert!(status.buyout);
        assert_eq!(status.to_string(), "processed_buyout");

        let status: ScheduleStatus = "draft".parse().unwrap();
        assert!(status.is_pre_issue());

        assert!("draft_reduced".parse::<ScheduleStatus>().is_err());
        assert!("active".parse::<ScheduleStatus>().is_err());
    }

    #[test]
    fn test_status_display_roundtrip() {
        let status = ScheduleStatus::processed().with_reduction().with_buyout();
        assert_eq!(status.to_string(), "processed_reduced_buyout");
        assert_eq!(status.to_string().parse::<ScheduleStatus>().unwrap(), status);
    }

    #[test]
    fn test_timeline_validation() {
        let status = ScheduleStatus::processed().with_reduction();
        assert!(ContractTimeline::new(date(2010, 1, 1), Some(date(2009, 12, 31)), None, status, 10, 12).is_err());
        assert!(ContractTimeline::new(date(2010, 1, 1), None, None, status, 10, 5).is_err());
        assert!(ContractTimeline::new(date(2010, 1, 1), Some(date(2012, 1, 1)), None, status, 10, 1).is_ok());
    }

    #[test]
    fn test_timeline_json_is_validated() {
        let valid = r#"{"start_date":"2010-01-01","reduction_date":"2012-01-01","buyout_date":null,"status":"processed_reduced","duration_years":10,"payment_interval_months":12}"#;
        let timeline: ContractTimeline = serde_json::from_str(valid).unwrap();
        assert_eq!(timeline.reduction_date, Some(date(2012, 1, 1)));
        assert_eq!(serde_json::from_str::<ContractTimeline>(&serde_json::to_string(&timeline).unwrap()).unwrap(), timeline);

        let early_reduction = r#"{"start_date":"2010-01-01","reduction_date":"2005-01-01","buyout_date":null,"status":"processed_reduced","duration_years":10,"payment_interval_months":12}"#;
        assert!(serde_json::from_str::<ContractTimeline>(early_reduction).is_err());

        let bad_interval = r#"{"start_date":"2010-01-01","reduction_date":null,"buyout_date":null,"status":"processed","duration_years":10,"payment_interval_months":5}"#;
        assert!(serde_json::from_str::<ContractTimeline>(bad_interval).is_err());
    }

    #[test]
    fn test_invalid_timeline_error() {
        match ContractTimeline::new(date(2010, 1, 1), None, None, ScheduleStatus::processed(), 10, 5) {
            Err(CalculationError::InvalidTimeline { reason }) => assert!(reason.contains("payment interval")),
            other => panic!("expected invalid timeline, got {:?}", other),
        }
    }

    #[test]
    fn test_due_dates() {
        let timeline = ContractTimeline::in_force(date(2010, 1, 31), 1, 3);
        assert_eq!(
            timeline.due_dates(),
            vec![date(2010, 1, 31), date(2010, 4, 30), date(2010, 7, 31), date(2010, 10, 31)]
        );
        assert_eq!(timeline.next_due_date_on_or_after(date(2010, 5, 1)), Some(date(2010, 7, 31)));
        assert_eq!(timeline.next_due_date_on_or_after(date(2010, 11, 1)), None);
        assert_eq!(timeline.maturity_date(), date(2011, 1, 31));
        assert_eq!(timeline.total_months(), 12);
    }
}
