//! Session and attendance read queries used by views and sync.
//!
//! # Invariants
//! - Query results never include rows flagged `deleted`.
//! - Session ordering is `(date, start_time, id)` everywhere.

use crate::model::{Attendance, Session};
use crate::repo::entity_repo::{query_records, RepoError, RepoResult, Repository};
use crate::repo::reference_repo::placeholders;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter};

const SESSION_ORDER: &str = "ORDER BY date ASC, start_time ASC, id ASC";

impl Repository<Session> {
    pub fn list_by_activity(&self, activity_id: &str) -> RepoResult<Vec<Session>> {
        self.store().with_conn(|conn| {
            query_records::<Session, _>(
                conn,
                &format!("activity_id = ?1 AND deleted = 0 {SESSION_ORDER}"),
                [activity_id],
            )
        })
    }

    /// Live sessions of `activity_ids` dated within `[from, to]` (epoch ms).
    pub fn list_in_range(
        &self,
        activity_ids: &[String],
        from: i64,
        to: i64,
    ) -> RepoResult<Vec<Session>> {
        if activity_ids.is_empty() || from > to {
            return Ok(Vec::new());
        }

        let mut bind_values = vec![Value::Integer(from), Value::Integer(to)];
        bind_values.extend(activity_ids.iter().cloned().map(Value::Text));
        let id_placeholders = (3..3 + activity_ids.len())
            .map(|index| format!("?{index}"))
            .collect::<Vec<_>>()
            .join(", ");

        self.store().with_conn(|conn| {
            query_records::<Session, _>(
                conn,
                &format!(
                    "deleted = 0
                     AND date BETWEEN ?1 AND ?2
                     AND activity_id IN ({id_placeholders})
                     {SESSION_ORDER}"
                ),
                params_from_iter(bind_values),
            )
        })
    }

    /// The live session of the same activity that immediately precedes
    /// `session` in `(date, start_time, id)` order.
    pub fn previous_session(&self, session: &Session) -> RepoResult<Option<Session>> {
        self.store().with_conn(|conn| {
            let mut sessions = query_records::<Session, _>(
                conn,
                "activity_id = ?1
                 AND deleted = 0
                 AND id <> ?2
                 AND (COALESCE(date, 0), COALESCE(start_time, ''), id) < (?3, ?4, ?2)
                 ORDER BY COALESCE(date, 0) DESC, COALESCE(start_time, '') DESC, id DESC
                 LIMIT 1",
                params![
                    session.activity_id,
                    session.id,
                    session.date.unwrap_or(0),
                    session.start_time.as_deref().unwrap_or(""),
                ],
            )?;
            Ok(sessions.pop())
        })
    }
}

impl Repository<Attendance> {
    /// Live attendance rows of one session.
    pub fn list_by_session(&self, session_id: &str) -> RepoResult<Vec<Attendance>> {
        self.store().with_conn(|conn| {
            query_records::<Attendance, _>(
                conn,
                "session_id = ?1 AND deleted = 0 ORDER BY id ASC",
                [session_id],
            )
        })
    }

    /// Number of live attendance rows of one session.
    pub fn count_by_session(&self, session_id: &str) -> RepoResult<i64> {
        self.store().with_conn(|conn| {
            conn.query_row(
                "SELECT COUNT(*)
                 FROM attendances
                 WHERE session_id = ?1
                   AND deleted = 0;",
                [session_id],
                |row| row.get(0),
            )
            .map_err(RepoError::from)
        })
    }

    /// Live attendance counts for many sessions in one query.
    pub fn counts_by_sessions(&self, session_ids: &[String]) -> RepoResult<Vec<(String, i64)>> {
        if session_ids.is_empty() {
            return Ok(Vec::new());
        }

        self.store().with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT session_id, COUNT(*)
                 FROM attendances
                 WHERE deleted = 0
                   AND session_id IN ({})
                 GROUP BY session_id
                 ORDER BY session_id ASC;",
                placeholders(session_ids.len())
            ))?;
            let counts = stmt
                .query_map(params_from_iter(session_ids.iter()), |row| {
                    Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(counts)
        })
    }
}
