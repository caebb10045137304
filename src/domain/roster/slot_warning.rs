//! "Running low on slots" warning for session rosters.

use serde::{Deserialize, Serialize};

use crate::domain::messages::remaining_slots_label;

/// Warn once at most this share of the capacity is left, in percent.
const WARNING_THRESHOLD_PERCENT: i64 = 30;

/// Participant count and capacity of one session roster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterSlotState {
    pub participant_count: u32,
    /// `None` when the session has no capacity limit
    pub max_player: Option<u32>,
}

impl RosterSlotState {
    pub fn new(participant_count: u32, max_player: Option<u32>) -> Self {
        Self {
            participant_count,
            max_player,
        }
    }

    /// Free slots, or `None` for an uncapped or unconfigured (zero) capacity.
    ///
    /// Negative when the roster is overbooked.
    pub fn remaining_slots(&self) -> Option<i64> {
        match self.max_player {
            None | Some(0) => None,
            Some(max) => Some(i64::from(max) - i64::from(self.participant_count)),
        }
    }
}

/// Warning shown next to a roster that is nearly full.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SlotWarning {
    pub remaining_slots: i64,
    pub label: String,
}

/// Decide whether a roster should show a low-slots warning.
///
/// Returns a warning when `remaining / max_player <= 0.3` (full rosters
/// included) and `None` otherwise. A capacity of `None` or `0` never warns.
pub fn get_slot_warning(state: &RosterSlotState) -> Option<SlotWarning> {
    let max_player = i64::from(state.max_player.filter(|max| *max > 0)?);
    let remaining_slots = state.remaining_slots()?;

    // remaining / max <= 30%, kept in integers so the boundary is exact
    if remaining_slots * 100 > max_player * WARNING_THRESHOLD_PERCENT {
        return None;
    }

    Some(SlotWarning {
        remaining_slots,
        label: remaining_slots_label(remaining_slots),
    })
}

/// Evaluate every row of a roster listing, preserving order.
pub fn evaluate_roster(states: &[RosterSlotState]) -> Vec<Option<SlotWarning>> {
    states.iter().map(get_slot_warning).collect()
}
