use std::error::Error;
use std::net::IpAddr;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::Value;
use tokio_postgres::error::SqlState;
use tokio_postgres::types::{FromSql, Kind, Type};
use tokio_postgres::{Client, Row, SimpleQueryMessage, Statement};
use uuid::Uuid;

use crate::error::SqlAdapterError;
use crate::pool::SqlClient;
use crate::results::ResultSet;
use crate::types::RowValues;

impl SqlClient for Client {
    async fn query_rows(&mut self, statement: &str) -> Result<ResultSet, SqlAdapterError> {
        match self.prepare(statement).await {
            Ok(stmt) => {
                // `query` collects the whole response before returning
                let rows = self.query(&stmt, &[]).await?;
                build_result_set_from_statement(&stmt, &rows)
            }
            // several statements in one string cannot be prepared
            Err(err) if err.code() == Some(&SqlState::SYNTAX_ERROR) => {
                tracing::debug!("prepare rejected statement, retrying with the simple query protocol");
                let messages = self.simple_query(statement).await?;
                Ok(build_result_set_from_simple_query(&messages))
            }
            Err(err) => Err(err.into()),
        }
    }
}

/// Build a result set using statement metadata for column names.
///
/// # Errors
/// Returns errors from row value extraction.
pub fn build_result_set_from_statement(
    stmt: &Statement,
    rows: &[Row],
) -> Result<ResultSet, SqlAdapterError> {
    let column_names: Vec<String> = stmt
        .columns()
        .iter()
        .map(|col| col.name().to_string())
        .collect();
    let column_count = column_names.len();

    let mut result_set = ResultSet::with_capacity(rows.len());
    result_set.set_column_names(Arc::new(column_names));

    for row in rows {
        let mut row_values = Vec::with_capacity(column_count);
        for idx in 0..column_count {
            row_values.push(postgres_extract_value(row, idx)?);
        }
        result_set.add_row_values(row_values);
    }

    Ok(result_set)
}

/// Build a result set from a simple-query response.
///
/// Only the last statement that returned rows is kept. The simple protocol
/// carries values as text, so every non-null value is `RowValues::Text`.
#[must_use]
pub fn build_result_set_from_simple_query(messages: &[SimpleQueryMessage]) -> ResultSet {
    let mut result_set = ResultSet::default();
    for message in messages {
        match message {
            SimpleQueryMessage::RowDescription(columns) => {
                result_set = ResultSet::default();
                result_set.set_column_names(Arc::new(
                    columns.iter().map(|c| c.name().to_string()).collect(),
                ));
            }
            SimpleQueryMessage::Row(row) => {
                let values = (0..row.len())
                    .map(|idx| {
                        row.get(idx)
                            .map_or(RowValues::Null, |v| RowValues::Text(v.to_string()))
                    })
                    .collect();
                result_set.add_row_values(values);
            }
            _ => {}
        }
    }
    result_set
}

/// Undecoded wire bytes of a column, whatever its type.
struct RawColumn(Vec<u8>);

impl<'a> FromSql<'a> for RawColumn {
    fn from_sql(_ty: &Type, raw: &'a [u8]) -> Result<Self, Box<dyn Error + Sync + Send>> {
        Ok(RawColumn(raw.to_vec()))
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }
}

/// Extracts a `RowValues` from a `tokio_postgres` Row at the given index.
///
/// Types without a native variant come back as `Text` (numeric, uuid, time,
/// inet, enum labels, "char") or as a JSON array (one-dimensional arrays of
/// scalars). Anything that still cannot be decoded is returned as the raw
/// binary column value in a `Blob`.
///
/// # Errors
/// Returns `SqlAdapterError` if the column index is out of range or a
/// natively mapped column cannot be read.
pub fn postgres_extract_value(row: &Row, idx: usize) -> Result<RowValues, SqlAdapterError> {
    let column = row.columns().get(idx).ok_or_else(|| {
        SqlAdapterError::ExecutionError(format!("column index {idx} out of range"))
    })?;
    let ty = column.type_();

    match ty.name() {
        "int2" => {
            let val: Option<i16> = row.try_get(idx)?;
            Ok(val.map_or(RowValues::Null, |v| RowValues::Int(i64::from(v))))
        }
        "int4" => {
            let val: Option<i32> = row.try_get(idx)?;
            Ok(val.map_or(RowValues::Null, |v| RowValues::Int(i64::from(v))))
        }
        "int8" => {
            let val: Option<i64> = row.try_get(idx)?;
            Ok(val.map_or(RowValues::Null, RowValues::Int))
        }
        "oid" => {
            let val: Option<u32> = row.try_get(idx)?;
            Ok(val.map_or(RowValues::Null, |v| RowValues::Int(i64::from(v))))
        }
        "float4" => {
            let val: Option<f32> = row.try_get(idx)?;
            Ok(val.map_or(RowValues::Null, |v| RowValues::Float(f64::from(v))))
        }
        "float8" => {
            let val: Option<f64> = row.try_get(idx)?;
            Ok(val.map_or(RowValues::Null, RowValues::Float))
        }
        "bool" => {
            let val: Option<bool> = row.try_get(idx)?;
            Ok(val.map_or(RowValues::Null, RowValues::Bool))
        }
        "timestamp" => {
            let val: Option<NaiveDateTime> = row.try_get(idx)?;
            Ok(val.map_or(RowValues::Null, RowValues::Timestamp))
        }
        "timestamptz" => {
            let val: Option<DateTime<Utc>> = row.try_get(idx)?;
            Ok(val.map_or(RowValues::Null, |v| RowValues::Timestamp(v.naive_utc())))
        }
        "date" => {
            let val: Option<NaiveDate> = row.try_get(idx)?;
            Ok(val
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .map_or(RowValues::Null, RowValues::Timestamp))
        }
        "json" | "jsonb" => {
            let val: Option<Value> = row.try_get(idx)?;
            Ok(val.map_or(RowValues::Null, RowValues::JSON))
        }
        "bytea" => {
            let val: Option<Vec<u8>> = row.try_get(idx)?;
            Ok(val.map_or(RowValues::Null, RowValues::Blob))
        }
        "text" | "varchar" | "bpchar" | "name" | "citext" | "unknown" => {
            let val: Option<String> = row.try_get(idx)?;
            Ok(val.map_or(RowValues::Null, RowValues::Text))
        }
        "numeric" => text_or_raw::<Decimal>(row, idx),
        "uuid" => text_or_raw::<Uuid>(row, idx),
        "time" => text_or_raw::<NaiveTime>(row, idx),
        "inet" => text_or_raw::<IpAddr>(row, idx),
        "char" => match row.try_get::<_, Option<i8>>(idx) {
            Ok(val) => Ok(val.map_or(RowValues::Null, |v| {
                RowValues::Text(char::from(v as u8).to_string())
            })),
            Err(_) => raw_value(row, idx),
        },
        "_int2" => json_or_raw::<i16>(row, idx),
        "_int4" => json_or_raw::<i32>(row, idx),
        "_int8" => json_or_raw::<i64>(row, idx),
        "_float4" => json_or_raw::<f32>(row, idx),
        "_float8" => json_or_raw::<f64>(row, idx),
        "_bool" => json_or_raw::<bool>(row, idx),
        "_text" | "_varchar" | "_bpchar" | "_name" => json_or_raw::<String>(row, idx),
        _ if matches!(ty.kind(), Kind::Enum(_)) => {
            let val: Option<RawColumn> = row.try_get(idx)?;
            Ok(val.map_or(RowValues::Null, |v| {
                RowValues::Text(String::from_utf8_lossy(&v.0).into_owned())
            }))
        }
        _ => raw_value(row, idx),
    }
}

/// Decode through `T` and keep its display form, or fall back to raw bytes.
fn text_or_raw<'a, T>(row: &'a Row, idx: usize) -> Result<RowValues, SqlAdapterError>
where
    T: FromSql<'a> + ToString,
{
    match row.try_get::<_, Option<T>>(idx) {
        Ok(val) => Ok(val.map_or(RowValues::Null, |v| RowValues::Text(v.to_string()))),
        // e.g. numeric NaN or more digits than `Decimal` holds
        Err(_) => raw_value(row, idx),
    }
}

/// Decode a one-dimensional array into a JSON array, or fall back to raw bytes.
fn json_or_raw<'a, T>(row: &'a Row, idx: usize) -> Result<RowValues, SqlAdapterError>
where
    T: FromSql<'a> + Serialize,
{
    match row.try_get::<_, Option<Vec<Option<T>>>>(idx) {
        Ok(None) => Ok(RowValues::Null),
        Ok(Some(items)) => Ok(RowValues::JSON(serde_json::to_value(items).map_err(
            |e| SqlAdapterError::ExecutionError(format!("array column {idx}: {e}")),
        )?)),
        // multi-dimensional arrays
        Err(_) => raw_value(row, idx),
    }
}

fn raw_value(row: &Row, idx: usize) -> Result<RowValues, SqlAdapterError> {
    let val: Option<RawColumn> = row.try_get(idx)?;
    Ok(val.map_or(RowValues::Null, |v| RowValues::Blob(v.0)))
}
