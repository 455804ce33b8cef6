//! QSO log storage
//!
//! Every query is scoped by `created_by`; a row owned by someone else is
//! indistinguishable from a missing one.

use chrono::{NaiveDate, NaiveTime, Utc};
use hamlog_common::qso::{Qso, QsoFields, QsoList};
use hamlog_common::{Error, Result};
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use uuid::Uuid;

use super::parse_uuid;

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIME_FORMAT: &str = "%H:%M:%S";

const SELECT_COLUMNS: &str = "id, created_by, call, band, freq, mode, rst_sent, rst_rcvd, \
     qso_date, time_on, name, qth, grid, dxcc, notes";

/// Newest contact first; undated and untimed records sink to the bottom
const ORDER_BY: &str = "ORDER BY qso_date IS NULL, qso_date DESC, \
     time_on IS NULL, time_on DESC, created_at DESC, rowid DESC";

/// Build a `LIKE` pattern matching `needle` anywhere, with wildcards escaped
///
/// The escape character is `\`.
pub fn like_pattern(needle: &str) -> String {
    let mut escaped = String::with_capacity(needle.len() + 2);
    escaped.push('%');
    for c in needle.trim().to_uppercase().chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

fn qso_from_row(row: &SqliteRow) -> Result<Qso> {
    let id: String = row.get("id");
    let created_by: String = row.get("created_by");
    let qso_date: Option<String> = row.get("qso_date");
    let time_on: Option<String> = row.get("time_on");

    let qso_date = qso_date
        .map(|d| NaiveDate::parse_from_str(&d, DATE_FORMAT))
        .transpose()
        .map_err(|e| Error::Internal(format!("Failed to parse qso_date: {}", e)))?;
    let time_on = time_on
        .map(|t| NaiveTime::parse_from_str(&t, TIME_FORMAT))
        .transpose()
        .map_err(|e| Error::Internal(format!("Failed to parse time_on: {}", e)))?;

    Ok(Qso {
        id: parse_uuid("qsos.id", &id)?,
        created_by: parse_uuid("qsos.created_by", &created_by)?,
        fields: QsoFields {
            call: row.get("call"),
            band: row.get("band"),
            freq: row.get("freq"),
            mode: row.get("mode"),
            rst_sent: row.get("rst_sent"),
            rst_rcvd: row.get("rst_rcvd"),
            qso_date,
            time_on,
            name: row.get("name"),
            qth: row.get("qth"),
            grid: row.get("grid"),
            dxcc: row.get("dxcc"),
            notes: row.get("notes"),
        },
    })
}

/// Insert an already-validated record
pub async fn insert_qso(pool: &SqlitePool, owner: Uuid, fields: &QsoFields) -> Result<Qso> {
    let id = Uuid::new_v4();

    sqlx::query(
        r#"
        INSERT INTO qsos (
            id, created_by, call, band, freq, mode, rst_sent, rst_rcvd,
            qso_date, time_on, name, qth, grid, dxcc, notes, created_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(id.to_string())
    .bind(owner.to_string())
    .bind(&fields.call)
    .bind(&fields.band)
    .bind(fields.freq)
    .bind(&fields.mode)
    .bind(&fields.rst_sent)
    .bind(&fields.rst_rcvd)
    .bind(fields.qso_date.map(|d| d.format(DATE_FORMAT).to_string()))
    .bind(fields.time_on.map(|t| t.format(TIME_FORMAT).to_string()))
    .bind(&fields.name)
    .bind(&fields.qth)
    .bind(&fields.grid)
    .bind(&fields.dxcc)
    .bind(&fields.notes)
    .bind(Utc::now().to_rfc3339())
    .execute(pool)
    .await?;

    get_qso(pool, owner, id).await
}

/// Fetch one of `owner`'s records
///
/// # Errors
/// [`Error::NotFound`] if the id does not exist or belongs to another user.
pub async fn get_qso(pool: &SqlitePool, owner: Uuid, id: Uuid) -> Result<Qso> {
    let sql = format!(
        "SELECT {} FROM qsos WHERE id = ? AND created_by = ?",
        SELECT_COLUMNS
    );
    let row = sqlx::query(&sql)
        .bind(id.to_string())
        .bind(owner.to_string())
        .fetch_optional(pool)
        .await?;

    match row {
        Some(row) => qso_from_row(&row),
        None => Err(Error::NotFound(format!("QSO {}", id))),
    }
}

/// Replace every editable field of one of `owner`'s records
pub async fn replace_qso(
    pool: &SqlitePool,
    owner: Uuid,
    id: Uuid,
    fields: &QsoFields,
) -> Result<Qso> {
    let result = sqlx::query(
        r#"
        UPDATE qsos SET
            call = ?, band = ?, freq = ?, mode = ?, rst_sent = ?, rst_rcvd = ?,
            qso_date = ?, time_on = ?, name = ?, qth = ?, grid = ?, dxcc = ?, notes = ?
        WHERE id = ? AND created_by = ?
        "#,
    )
    .bind(&fields.call)
    .bind(&fields.band)
    .bind(fields.freq)
    .bind(&fields.mode)
    .bind(&fields.rst_sent)
    .bind(&fields.rst_rcvd)
    .bind(fields.qso_date.map(|d| d.format(DATE_FORMAT).to_string()))
    .bind(fields.time_on.map(|t| t.format(TIME_FORMAT).to_string()))
    .bind(&fields.name)
    .bind(&fields.qth)
    .bind(&fields.grid)
    .bind(&fields.dxcc)
    .bind(&fields.notes)
    .bind(id.to_string())
    .bind(owner.to_string())
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("QSO {}", id)));
    }

    get_qso(pool, owner, id).await
}

pub async fn delete_qso(pool: &SqlitePool, owner: Uuid, id: Uuid) -> Result<()> {
    let result = sqlx::query("DELETE FROM qsos WHERE id = ? AND created_by = ?")
        .bind(id.to_string())
        .bind(owner.to_string())
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("QSO {}", id)));
    }

    Ok(())
}

/// One page of `owner`'s log, optionally filtered by callsign substring
///
/// `limit = None` returns every row from `offset` on.
pub async fn list_qsos(
    pool: &SqlitePool,
    owner: Uuid,
    call: Option<&str>,
    offset: i64,
    limit: Option<i64>,
) -> Result<QsoList> {
    let owner = owner.to_string();
    let pattern = call
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(like_pattern);

    let filter = if pattern.is_some() {
        "WHERE created_by = ? AND call LIKE ? ESCAPE '\\'"
    } else {
        "WHERE created_by = ?"
    };

    let count_sql = format!("SELECT COUNT(*) FROM qsos {}", filter);
    let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql).bind(&owner);
    if let Some(pattern) = &pattern {
        count_query = count_query.bind(pattern);
    }
    let total = count_query.fetch_one(pool).await?;

    let list_sql = format!(
        "SELECT {} FROM qsos {} {} LIMIT ? OFFSET ?",
        SELECT_COLUMNS, filter, ORDER_BY
    );
    let mut list_query = sqlx::query(&list_sql).bind(&owner);
    if let Some(pattern) = &pattern {
        list_query = list_query.bind(pattern);
    }
    // SQLite treats a negative LIMIT as unbounded
    let rows = list_query
        .bind(limit.unwrap_or(-1))
        .bind(offset)
        .fetch_all(pool)
        .await?;

    let items = rows.iter().map(qso_from_row).collect::<Result<Vec<_>>>()?;

    Ok(QsoList { items, total })
}
