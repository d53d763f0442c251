//! Request/response DTOs for the entry, task, and calendar endpoints.
//!
//! Conventions:
//! - `*Request`  → deserialized from client JSON body or query params
//! - `*Response` → serialized to client JSON
//! - Body validation is expressed via `validator` derive macros

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::entry::EnergyLevel;
use crate::planner::day_map::{DayKind, DayView, EnergyTier};

/// Standard success message response
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Standard delete confirmation
#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub deleted: bool,
    pub id: Uuid,
}

/// Shared `?start_date=&end_date=` range filter. Handlers default missing
/// bounds from the user's local calendar, not UTC.
#[derive(Debug, Deserialize)]
pub struct DateRangeQuery {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

/// PATCH /api/entries/{id} — partial update, absent fields keep their value
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateEntryRequest {
    pub energy_level: Option<EnergyLevel>,

    #[validate(length(max = 10000, message = "Note must be under 10000 characters"))]
    pub note: Option<String>,
}

/// POST /api/tasks
#[derive(Debug, Deserialize, Validate)]
pub struct CreateTaskRequest {
    /// Defaults to the user's current local date.
    pub date: Option<NaiveDate>,

    #[validate(length(min = 1, max = 200, message = "Title must be 1-200 characters"))]
    pub title: String,
}

/// PUT /api/tasks/{id}
#[derive(Debug, Deserialize)]
pub struct UpdateTaskRequest {
    pub completed: bool,
}

/// PATCH /api/me
#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    /// IANA timezone identifier (e.g., "America/New_York")
    pub timezone: Option<String>,
}

/// One calendar cell: the aggregated day plus its derived display state.
#[derive(Debug, Serialize)]
pub struct CalendarDay {
    #[serde(flatten)]
    pub day: DayView,
    pub kind: DayKind,
    pub energy_tier: EnergyTier,
}

/// GET /api/calendar
#[derive(Debug, Serialize)]
pub struct CalendarResponse {
    pub today: NaiveDate,
    pub days: Vec<CalendarDay>,
}

/// GET /api/history — one row per past day that has an entry
#[derive(Debug, Serialize)]
pub struct HistoryDay {
    pub id: Uuid,
    pub date: NaiveDate,
    pub energy_level: Option<EnergyLevel>,
    pub note: Option<String>,
    pub completed_tasks: i64,
    pub total_tasks: i64,
}
