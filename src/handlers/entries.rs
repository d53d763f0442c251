use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::auth::middleware::AuthUser;
use crate::dto::{DateRangeQuery, UpdateEntryRequest};
use crate::error::{AppError, AppResult};
use crate::models::entry::DailyEntry;
use crate::planner::{self, clock};
use crate::AppState;

#[derive(sqlx::FromRow)]
struct UpsertedEntry {
    #[sqlx(flatten)]
    entry: DailyEntry,
    // xmax = 0 on the returned row means this statement inserted it
    // rather than hitting the conflict arm.
    inserted: bool,
}

/// Get-or-create the entry for the user's current local date. The date is
/// recomputed from the user's timezone on every call, and creation is a
/// single upsert so two tabs racing past midnight cannot produce duplicate
/// rows. A fresh insert is announced on the change channel like any other
/// entry mutation.
pub async fn get_today(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> AppResult<Json<DailyEntry>> {
    let tz = planner::user_timezone(&state.db, auth_user.id).await?;
    let today = clock::current_local_date(tz);

    let row = sqlx::query_as::<_, UpsertedEntry>(
        r#"
        INSERT INTO daily_entries (id, user_id, entry_date)
        VALUES ($1, $2, $3)
        ON CONFLICT (user_id, entry_date) DO UPDATE
            SET entry_date = daily_entries.entry_date  -- no-op update to trigger RETURNING
        RETURNING *, (xmax = 0) AS inserted
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(auth_user.id)
    .bind(today)
    .fetch_one(&state.db)
    .await?;

    if row.inserted {
        crate::handlers::notify_change(
            state.ws_tx.as_ref(),
            auth_user.id,
            "entry_changed",
            row.entry.id,
        );
    }

    Ok(Json(row.entry))
}

pub async fn list_entries(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Query(query): Query<DateRangeQuery>,
) -> AppResult<Json<Vec<DailyEntry>>> {
    let tz = planner::user_timezone(&state.db, auth_user.id).await?;
    let today = clock::current_local_date(tz);

    let start = query
        .start_date
        .unwrap_or_else(|| today - chrono::Duration::days(30));
    let end = query.end_date.unwrap_or(today);

    let entries = sqlx::query_as::<_, DailyEntry>(
        r#"
        SELECT * FROM daily_entries
        WHERE user_id = $1 AND entry_date BETWEEN $2 AND $3
        ORDER BY entry_date ASC
        "#,
    )
    .bind(auth_user.id)
    .bind(start)
    .bind(end)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(entries))
}

pub async fn update_entry(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(entry_id): Path<Uuid>,
    Json(body): Json<UpdateEntryRequest>,
) -> AppResult<Json<DailyEntry>> {
    body.validate()?;

    let entry = sqlx::query_as::<_, DailyEntry>(
        r#"
        UPDATE daily_entries SET
            energy_level = COALESCE($3, energy_level),
            note = COALESCE($4, note),
            updated_at = NOW()
        WHERE id = $1 AND user_id = $2
        RETURNING *
        "#,
    )
    .bind(entry_id)
    .bind(auth_user.id)
    .bind(body.energy_level)
    .bind(&body.note)
    .fetch_optional(&state.db)
    .await?
    .ok_or(AppError::NotFound("Entry not found".into()))?;

    crate::handlers::notify_change(state.ws_tx.as_ref(), auth_user.id, "entry_changed", entry.id);

    Ok(Json(entry))
}
