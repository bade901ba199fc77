//! SQLite-Backend-Implementierungen fuer alle Repository-Traits

pub mod channels;
pub mod messages;
pub mod pool;
pub mod users;
pub mod voice;

pub use pool::SqliteDb;

use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::Row as _;
use uuid::Uuid;

use crate::error::DbError;
use crate::repository::DbResult;

/// Liest eine UUID-Spalte in einen ID-Newtype
pub(crate) fn id_spalte<T: From<Uuid>>(row: &SqliteRow, spalte: &str) -> DbResult<T> {
    let s: String = row.try_get(spalte)?;
    Uuid::parse_str(&s)
        .map(T::from)
        .map_err(|e| DbError::intern(format!("Ungueltige UUID in '{spalte}': '{s}': {e}")))
}

pub(crate) fn optionale_id_spalte<T: From<Uuid>>(
    row: &SqliteRow,
    spalte: &str,
) -> DbResult<Option<T>> {
    let s: Option<String> = row.try_get(spalte)?;
    s.as_deref()
        .map(|s| {
            Uuid::parse_str(s)
                .map(T::from)
                .map_err(|e| DbError::intern(format!("Ungueltige UUID in '{spalte}': '{s}': {e}")))
        })
        .transpose()
}

fn zeit_parsen(s: &str, spalte: &str) -> DbResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| DbError::intern(format!("Ungueltiger Zeitstempel in '{spalte}': '{s}': {e}")))
}

pub(crate) fn zeit_spalte(row: &SqliteRow, spalte: &str) -> DbResult<DateTime<Utc>> {
    let s: String = row.try_get(spalte)?;
    zeit_parsen(&s, spalte)
}

pub(crate) fn optionale_zeit_spalte(
    row: &SqliteRow,
    spalte: &str,
) -> DbResult<Option<DateTime<Utc>>> {
    let s: Option<String> = row.try_get(spalte)?;
    s.as_deref().map(|s| zeit_parsen(s, spalte)).transpose()
}

pub(crate) fn bool_spalte(row: &SqliteRow, spalte: &str) -> DbResult<bool> {
    let v: i64 = row.try_get(spalte)?;
    Ok(v != 0)
}
