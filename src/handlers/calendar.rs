use axum::{
    extract::{Query, State},
    Extension, Json,
};
use chrono::NaiveDate;
use uuid::Uuid;

use crate::auth::middleware::AuthUser;
use crate::dto::{CalendarDay, CalendarResponse, DateRangeQuery, HistoryDay};
use crate::error::AppResult;
use crate::models::entry::DailyEntry;
use crate::models::task::Task;
use crate::planner::day_map::{build_day_map, classify_day, energy_tier};
use crate::planner::{self, clock};
use crate::AppState;

async fn fetch_entries(
    state: &AppState,
    user_id: Uuid,
    start: NaiveDate,
    end: NaiveDate,
) -> AppResult<Vec<DailyEntry>> {
    let entries = sqlx::query_as::<_, DailyEntry>(
        r#"
        SELECT * FROM daily_entries
        WHERE user_id = $1 AND entry_date BETWEEN $2 AND $3
        ORDER BY entry_date ASC
        "#,
    )
    .bind(user_id)
    .bind(start)
    .bind(end)
    .fetch_all(&state.db)
    .await?;
    Ok(entries)
}

async fn fetch_tasks(
    state: &AppState,
    user_id: Uuid,
    start: NaiveDate,
    end: NaiveDate,
) -> AppResult<Vec<Task>> {
    // The aggregator preserves input order, so creation-time ordering here
    // is what keeps task lists stable in every day view.
    let tasks = sqlx::query_as::<_, Task>(
        r#"
        SELECT * FROM tasks
        WHERE user_id = $1 AND task_date BETWEEN $2 AND $3
        ORDER BY created_at ASC
        "#,
    )
    .bind(user_id)
    .bind(start)
    .bind(end)
    .fetch_all(&state.db)
    .await?;
    Ok(tasks)
}

/// Aggregated month view: one cell per day that has any data, each tagged
/// with its classification against the user's current local date.
pub async fn get_calendar(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Query(query): Query<DateRangeQuery>,
) -> AppResult<Json<CalendarResponse>> {
    let tz = planner::user_timezone(&state.db, auth_user.id).await?;
    let today = clock::current_local_date(tz);

    let start = query.start_date.unwrap_or_else(|| clock::month_start(today));
    let end = query.end_date.unwrap_or_else(|| clock::month_end(today));

    let entries = fetch_entries(&state, auth_user.id, start, end).await?;
    let tasks = fetch_tasks(&state, auth_user.id, start, end).await?;

    let days = build_day_map(&entries, &tasks)
        .into_values()
        .map(|day| CalendarDay {
            kind: classify_day(day.date, today),
            energy_tier: energy_tier(day.energy_level),
            day,
        })
        .collect();

    Ok(Json(CalendarResponse { today, days }))
}

/// Past days only, newest first, with task completion counts. Days without
/// an entry row are not listed even if they have tasks.
pub async fn get_history(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> AppResult<Json<Vec<HistoryDay>>> {
    let tz = planner::user_timezone(&state.db, auth_user.id).await?;
    let today = clock::current_local_date(tz);

    let entries = sqlx::query_as::<_, DailyEntry>(
        r#"
        SELECT * FROM daily_entries
        WHERE user_id = $1 AND entry_date < $2
        ORDER BY entry_date DESC
        "#,
    )
    .bind(auth_user.id)
    .bind(today)
    .fetch_all(&state.db)
    .await?;

    let tasks = sqlx::query_as::<_, Task>(
        r#"
        SELECT * FROM tasks
        WHERE user_id = $1 AND task_date < $2
        ORDER BY created_at ASC
        "#,
    )
    .bind(auth_user.id)
    .bind(today)
    .fetch_all(&state.db)
    .await?;

    let day_map = build_day_map(&entries, &tasks);

    let history = entries
        .iter()
        .map(|entry| {
            let (completed, total) = day_map
                .get(&entry.entry_date)
                .map(|day| (day.completed_count, day.tasks.len() as i64))
                .unwrap_or((0, 0));
            HistoryDay {
                id: entry.id,
                date: entry.entry_date,
                energy_level: entry.energy_level,
                note: entry.note.clone(),
                completed_tasks: completed,
                total_tasks: total,
            }
        })
        .collect();

    Ok(Json(history))
}
