//! Contract timelines, statuses and contract extract loading

mod data;
mod state;
pub mod loader;

pub use data::{
    AdministrativeStatus, Contract, ContractTimeline, MonetaryInputs, ScheduleStatus,
    VALID_PAYMENT_INTERVALS,
};
pub use state::{virtual_state_at, VirtualState};
pub use loader::{load_contracts, load_contracts_from_reader};
