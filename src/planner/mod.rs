//! Core planning logic: the local-day clock and the per-day aggregation
//! used by the today, calendar, and history endpoints.

pub mod clock;
pub mod day_map;

use chrono_tz::Tz;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// Resolve a user's stored IANA timezone. Unknown or missing names fall
/// back to UTC rather than failing the request.
pub async fn user_timezone(db: &PgPool, user_id: Uuid) -> AppResult<Tz> {
    let name = sqlx::query_scalar::<_, String>("SELECT timezone FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(db)
        .await?
        .ok_or(AppError::NotFound("User not found".into()))?;

    Ok(clock::parse_timezone(&name))
}
