//! Session roster policies.

mod slot_warning;

pub use slot_warning::{evaluate_roster, get_slot_warning, RosterSlotState, SlotWarning};
