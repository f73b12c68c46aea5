//! Session resolution
//!
//! A session is identified by its (subject, date, number) triple. Repeated
//! registration for the same triple must return the same row, so creation
//! goes through insert-on-conflict against the unique index followed by a
//! re-select rather than a check-then-insert.

use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SessionRow {
    pub id: Uuid,
    pub subject_id: Uuid,
    pub session_date: NaiveDate,
    pub number: i32,
    pub start_time: DateTime<Utc>,
}

/// Derive the session start time from its date (midnight UTC)
pub fn start_time_for(date: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN))
}

/// Find the session for (subject, date, number), creating a minimal one if
/// absent
///
/// When the session is created the acting user is recorded as a participant;
/// an existing session is returned unchanged. Losing the insert race to a
/// concurrent request falls through to the re-select, so exactly one row
/// exists per triple.
#[tracing::instrument(skip(pool), fields(subject_id = %subject_id, date = %date, number))]
pub async fn find_or_create_session(
    pool: &PgPool,
    subject_id: Uuid,
    date: NaiveDate,
    number: i32,
    user_id: Uuid,
) -> Result<SessionRow, sqlx::Error> {
    let existing = fetch_session(pool, subject_id, date, number).await?;
    if let Some(session) = existing {
        return Ok(session);
    }

    let inserted = sqlx::query_as::<_, SessionRow>(
        r#"
        INSERT INTO sessions (subject_id, session_date, number, start_time)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (subject_id, session_date, number) DO NOTHING
        RETURNING id, subject_id, session_date, number, start_time
        "#,
    )
    .bind(subject_id)
    .bind(date)
    .bind(number)
    .bind(start_time_for(date))
    .fetch_optional(pool)
    .await?;

    match inserted {
        Some(session) => {
            sqlx::query(
                "INSERT INTO session_users (session_id, user_id) VALUES ($1, $2)
                 ON CONFLICT DO NOTHING",
            )
            .bind(session.id)
            .bind(user_id)
            .execute(pool)
            .await?;

            tracing::info!(session_id = %session.id, "Session created");
            Ok(session)
        },
        // Another request created the row between our select and insert.
        None => {
            let session = fetch_session(pool, subject_id, date, number).await?;
            session.ok_or(sqlx::Error::RowNotFound)
        },
    }
}

async fn fetch_session(
    pool: &PgPool,
    subject_id: Uuid,
    date: NaiveDate,
    number: i32,
) -> Result<Option<SessionRow>, sqlx::Error> {
    sqlx::query_as::<_, SessionRow>(
        r#"
        SELECT id, subject_id, session_date, number, start_time
        FROM sessions
        WHERE subject_id = $1 AND session_date = $2 AND number = $3
        "#,
    )
    .bind(subject_id)
    .bind(date)
    .bind(number)
    .fetch_optional(pool)
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_time_is_midnight_utc() {
        let date = NaiveDate::from_ymd_opt(2021, 3, 4).unwrap();
        let start = start_time_for(date);
        assert_eq!(start.to_rfc3339(), "2021-03-04T00:00:00+00:00");
    }
}
