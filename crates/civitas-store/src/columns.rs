//! Column encoding helpers shared by the `row_to_*` mappers.
//!
//! Timestamps are stored as fixed-width RFC-3339 strings (UTC, microsecond
//! precision) so that lexical order equals chronological order.

use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Type;

pub(crate) fn encode_time(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn conversion_failure<E>(idx: usize, err: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err))
}

/// Read a TEXT column and parse it as a timestamp.
pub(crate) fn time_at(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| conversion_failure(idx, e))
}

/// Read a TEXT column and parse it through the type's `FromStr`
/// (identifiers and the closed enumerations).
pub(crate) fn parsed_at<T>(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw: String = row.get(idx)?;
    raw.parse::<T>().map_err(|e| conversion_failure(idx, e))
}

/// Nullable variant of [`parsed_at`].
pub(crate) fn parsed_opt_at<T>(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw: Option<String> = row.get(idx)?;
    raw.map(|s| s.parse::<T>().map_err(|e| conversion_failure(idx, e)))
        .transpose()
}

/// Read a JSON-encoded TEXT column.
pub(crate) fn json_at<T>(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: serde::de::DeserializeOwned,
{
    let raw: String = row.get(idx)?;
    serde_json::from_str(&raw).map_err(|e| conversion_failure(idx, e))
}

/// Read a 0/1 INTEGER column.
pub(crate) fn flag_at(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<bool> {
    let raw: i64 = row.get(idx)?;
    Ok(raw != 0)
}
