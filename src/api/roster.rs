//! Roster slot warning endpoints.

use axum::Json;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::metrics::RosterMetrics;
use crate::roster::{evaluate_roster, get_slot_warning, RosterSlotState, SlotWarning};
use crate::telemetry::attributes;

/// Maximum rows accepted by the batch endpoint
const MAX_ROSTER_ROWS: usize = 500;

#[derive(Debug, Serialize)]
pub struct SlotWarningResponse {
    pub warning: Option<SlotWarning>,
}

#[derive(Debug, Deserialize)]
pub struct SlotWarningsRequest {
    pub rosters: Vec<RosterSlotState>,
}

#[derive(Debug, Serialize)]
pub struct SlotWarningsResponse {
    pub warnings: Vec<Option<SlotWarning>>,
}

/// POST /api/v1/roster/slot-warning - Evaluate one roster
pub async fn slot_warning(Json(state): Json<RosterSlotState>) -> Json<SlotWarningResponse> {
    let warning = get_slot_warning(&state);
    RosterMetrics::record_evaluation(warning.is_some());

    Json(SlotWarningResponse { warning })
}

/// POST /api/v1/roster/slot-warnings - Evaluate a roster listing, one entry per row
#[tracing::instrument(name = "http.slot_warnings", skip_all)]
pub async fn slot_warnings(
    Json(body): Json<SlotWarningsRequest>,
) -> Result<Json<SlotWarningsResponse>> {
    if body.rosters.len() > MAX_ROSTER_ROWS {
        return Err(AppError::Validation(format!(
            "at most {} rosters per request",
            MAX_ROSTER_ROWS
        )));
    }

    attributes::record(
        &tracing::Span::current(),
        attributes::roster_rows(body.rosters.len()),
    );

    let warnings = evaluate_roster(&body.rosters);
    for warning in &warnings {
        RosterMetrics::record_evaluation(warning.is_some());
    }

    Ok(Json(SlotWarningsResponse { warnings }))
}
