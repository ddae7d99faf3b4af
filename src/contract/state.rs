//! Effective state of a premium schedule at a given date

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::data::{AdministrativeStatus, ContractTimeline, ScheduleStatus};

/// State of a premium schedule as of a query date
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VirtualState {
    Draft,
    Complete,
    Approved,
    Canceled,
    /// In force, premiums being paid
    Processed,
    /// Premium payments stopped, reduced value in force
    Reduced,
    /// Surrendered
    Buyout,
}

impl VirtualState {
    pub fn is_pre_issue(&self) -> bool {
        matches!(
            self,
            VirtualState::Draft | VirtualState::Complete | VirtualState::Approved | VirtualState::Canceled
        )
    }

    pub fn is_reduced(&self) -> bool {
        matches!(self, VirtualState::Reduced)
    }

    pub fn is_bought_out(&self) -> bool {
        matches!(self, VirtualState::Buyout)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            VirtualState::Draft => "draft",
            VirtualState::Complete => "complete",
            VirtualState::Approved => "approved",
            VirtualState::Canceled => "canceled",
            VirtualState::Processed => "processed",
            VirtualState::Reduced => "reduced",
            VirtualState::Buyout => "buyout",
        }
    }
}

impl From<AdministrativeStatus> for VirtualState {
    fn from(status: AdministrativeStatus) -> Self {
        match status {
            AdministrativeStatus::Draft => VirtualState::Draft,
            AdministrativeStatus::Complete => VirtualState::Complete,
            AdministrativeStatus::Approved => VirtualState::Approved,
            AdministrativeStatus::Canceled => VirtualState::Canceled,
            AdministrativeStatus::Processed => VirtualState::Processed,
        }
    }
}

/// Derive the state of a schedule at `date`
///
/// Pre-issue statuses never evolve. A buy-out wins over a reduction once both
/// dates have passed. Only events recorded in the status are considered.
pub fn virtual_state_at(
    date: NaiveDate,
    status: &ScheduleStatus,
    buyout_date: Option<NaiveDate>,
    reduction_date: Option<NaiveDate>,
) -> VirtualState {
    if status.is_pre_issue() {
        return status.base.into();
    }
    if status.buyout && buyout_date.is_some_and(|d| d <= date) {
        return VirtualState::Buyout;
    }
    if status.reduced && reduction_date.is_some_and(|d| d <= date) {
        return VirtualState::Reduced;
    }
    VirtualState::Processed
}

impl ContractTimeline {
    /// State of this timeline at `date`
    pub fn virtual_state_at(&self, date: NaiveDate) -> VirtualState {
        virtual_state_at(date, &self.status, self.buyout_date, self.reduction_date)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_reduced_after_reduction_date() {
        let status: ScheduleStatus = "processed_reduced".parse().unwrap();
        let state = virtual_state_at(date(2020, 6, 1), &status, None, Some(date(2020, 1, 1)));
        assert_eq!(state, VirtualState::Reduced);

        // Before the reduction the schedule is still in force
        let state = virtual_state_at(date(2019, 6, 1), &status, None, Some(date(2020, 1, 1)));
        assert_eq!(state, VirtualState::Processed);
    }

    #[test]
    fn test_buyout_wins_over_reduction() {
        let status = ScheduleStatus::processed().with_reduction().with_buyout();
        let state = virtual_state_at(
            date(2021, 1, 1),
            &status,
            Some(date(2020, 12, 1)),
            Some(date(2020, 1, 1)),
        );
        assert_eq!(state, VirtualState::Buyout);
        assert!(state.is_bought_out());
    }

    #[test]
    fn test_dates_ignored_without_status_marker() {
        let status = ScheduleStatus::processed();
        let state = virtual_state_at(date(2021, 1, 1), &status, Some(date(2020, 12, 1)), None);
        assert_eq!(state, VirtualState::Processed);
    }

    #[test]
    fn test_pre_issue_is_unchanged() {
        let status = ScheduleStatus::new(AdministrativeStatus::Approved);
        let state = virtual_state_at(date(2021, 1, 1), &status, None, None);
        assert_eq!(state, VirtualState::Approved);
        assert!(state.is_pre_issue());
    }

    #[test]
    fn test_timeline_state() {
        let mut timeline = ContractTimeline::in_force(date(2010, 1, 1), 20, 12);
        timeline.status = timeline.status.with_reduction();
        timeline.reduction_date = Some(date(2015, 1, 1));

        assert_eq!(timeline.virtual_state_at(date(2014, 12, 31)), VirtualState::Processed);
        assert_eq!(timeline.virtual_state_at(date(2015, 1, 1)), VirtualState::Reduced);
    }
}
