//! Store open/closed status and pickup slots.

use axum::{Json, extract::Query, extract::State};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sunville_core::hours;
use sunville_core::pickup::format_slot;

use crate::error::{AppError, Result};
use crate::state::AppState;

/// Query for `GET /api/store-status`.
#[derive(Debug, Deserialize)]
pub struct StoreStatusQuery {
    /// `YYYY-MM-DD`; defaults to today in store-local time.
    pub date: Option<String>,
}

/// Response for `GET /api/store-status`.
#[derive(Debug, Serialize)]
pub struct StoreStatus {
    pub open: bool,
    pub status: String,
    pub date: NaiveDate,
    /// Remaining pickup slots on `date`, e.g. `"08:00 AM"`.
    pub slots: Vec<String>,
}

/// GET /api/store-status?date=YYYY-MM-DD
pub async fn show(
    State(state): State<AppState>,
    Query(query): Query<StoreStatusQuery>,
) -> Result<Json<StoreStatus>> {
    let now = state.config().local_now();
    let date = match query.date.as_deref().map(str::trim) {
        None | Some("") => now.date(),
        Some(raw) => NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .map_err(|_| AppError::Validation("Invalid date (expected YYYY-MM-DD)".to_string()))?,
    };

    Ok(Json(StoreStatus {
        open: hours::is_open(now),
        status: hours::status_message(now),
        date,
        slots: hours::pickup_slots(date, now)
            .into_iter()
            .map(format_slot)
            .collect(),
    }))
}
