//! PostgreSQL Executor Implementation
//!
//! Runs criteria through sqlx on a PostgreSQL pool.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::TimeZone;
use sqlx::postgres::{PgArguments, PgPoolOptions, PgRow, PgValueFormat};
use sqlx::query::Query;
use sqlx::{Column, Pool, Postgres, Row as SqlxRow, TypeInfo, ValueRef};
use tracing::{debug, error, info};

use crate::config::DatabaseConfig;
use crate::error::{OrmError, OrmResult};
use crate::query::{insert_sql, Criteria};
use crate::row::Row;
use crate::value::DatabaseValue;

use super::core::QueryExecutor;

/// PostgreSQL query executor backed by a sqlx pool
#[derive(Clone)]
pub struct PostgresExecutor {
    pool: Arc<Pool<Postgres>>,
    log_statements: bool,
}

impl PostgresExecutor {
    /// Wrap an existing pool
    pub fn new(pool: Arc<Pool<Postgres>>) -> Self {
        Self {
            pool,
            log_statements: false,
        }
    }

    /// Create the pool described by `config` and wrap it
    pub async fn connect(config: &DatabaseConfig) -> OrmResult<Self> {
        config.validate()?;

        let pool_config = &config.pool;
        debug!(
            "Creating database pool with config: max={}, min={}, timeout={}s",
            pool_config.max_connections, pool_config.min_connections, pool_config.acquire_timeout
        );

        let mut options = PgPoolOptions::new()
            .max_connections(pool_config.max_connections)
            .min_connections(pool_config.min_connections)
            .acquire_timeout(Duration::from_secs(pool_config.acquire_timeout))
            .test_before_acquire(pool_config.test_before_acquire);

        if let Some(idle_timeout) = pool_config.idle_timeout {
            options = options.idle_timeout(Duration::from_secs(idle_timeout));
        }

        if let Some(max_lifetime) = pool_config.max_lifetime {
            options = options.max_lifetime(Duration::from_secs(max_lifetime));
        }

        let pool = options.connect(&config.database_url).await.map_err(|e| {
            error!("Failed to create database pool: {}", e);
            OrmError::Connection(format!("Failed to create database pool: {}", e))
        })?;

        info!(
            "Database pool created with {} max connections",
            pool_config.max_connections
        );

        Ok(Self {
            pool: Arc::new(pool),
            log_statements: config.log_statements,
        })
    }

    /// Get the underlying pool
    pub fn pool(&self) -> &Pool<Postgres> {
        &self.pool
    }

    fn prepare<'q>(&self, sql: &'q str, params: &[DatabaseValue]) -> Query<'q, Postgres, PgArguments> {
        if self.log_statements {
            debug!(sql, params = params.len(), "executing statement");
        }

        params
            .iter()
            .fold(sqlx::query(sql), |query, param| bind_database_value(query, param))
    }
}

#[async_trait]
impl QueryExecutor for PostgresExecutor {
    async fn fetch_all(&self, criteria: &Criteria) -> OrmResult<Vec<Row>> {
        let (sql, params) = criteria.to_select_sql()?;

        let rows = self
            .prepare(&sql, &params)
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| OrmError::Database(format!("Query fetch failed: {}", e)))?;

        rows.iter().map(pg_row_to_row).collect()
    }

    async fn count(&self, criteria: &Criteria) -> OrmResult<i64> {
        let (sql, params) = criteria.to_count_sql()?;

        let row = self
            .prepare(&sql, &params)
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| OrmError::Database(format!("Count query failed: {}", e)))?;

        let count: i64 = row.try_get(0)?;
        Ok(count)
    }

    async fn insert(&self, table: &str, values: Row) -> OrmResult<bool> {
        let (sql, params) = insert_sql(table, &values);

        let result = self
            .prepare(&sql, &params)
            .execute(&*self.pool)
            .await
            .map_err(|e| OrmError::Database(format!("Insert failed: {}", e)))?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, criteria: &Criteria) -> OrmResult<u64> {
        let (sql, params) = criteria.to_delete_sql()?;

        let result = self
            .prepare(&sql, &params)
            .execute(&*self.pool)
            .await
            .map_err(|e| OrmError::Database(format!("Delete failed: {}", e)))?;

        Ok(result.rows_affected())
    }
}

fn bind_database_value<'q>(
    query: Query<'q, Postgres, PgArguments>,
    value: &DatabaseValue,
) -> Query<'q, Postgres, PgArguments> {
    match value {
        DatabaseValue::Null => query.bind(Option::<String>::None),
        DatabaseValue::Bool(b) => query.bind(*b),
        DatabaseValue::Int32(i) => query.bind(*i),
        DatabaseValue::Int64(i) => query.bind(*i),
        DatabaseValue::Float64(f) => query.bind(*f),
        DatabaseValue::String(s) => query.bind(s.clone()),
        DatabaseValue::Bytes(b) => query.bind(b.clone()),
        DatabaseValue::Uuid(u) => query.bind(*u),
        DatabaseValue::DateTime(dt) => query.bind(*dt),
        DatabaseValue::Date(d) => query.bind(*d),
        DatabaseValue::Time(t) => query.bind(*t),
        DatabaseValue::Json(j) => query.bind(j.clone()),
    }
}

fn pg_row_to_row(row: &PgRow) -> OrmResult<Row> {
    let mut result = Row::new();
    for (index, column) in row.columns().iter().enumerate() {
        result.insert(column.name(), postgres_value_to_database_value(row, index)?);
    }
    Ok(result)
}

/// Convert a PostgreSQL column value to DatabaseValue
fn postgres_value_to_database_value(row: &PgRow, index: usize) -> OrmResult<DatabaseValue> {
    let type_name = row.columns()[index].type_info().name().to_string();

    let decode_error =
        |e: sqlx::Error| OrmError::Serialization(format!("Failed to decode {} value: {}", type_name, e));

    let value = match type_name.as_str() {
        "BOOL" => row
            .try_get::<Option<bool>, _>(index)
            .map_err(decode_error)?
            .map(DatabaseValue::Bool),
        "INT2" => row
            .try_get::<Option<i16>, _>(index)
            .map_err(decode_error)?
            .map(|v| DatabaseValue::Int32(i32::from(v))),
        "INT4" => row
            .try_get::<Option<i32>, _>(index)
            .map_err(decode_error)?
            .map(DatabaseValue::Int32),
        "INT8" => row
            .try_get::<Option<i64>, _>(index)
            .map_err(decode_error)?
            .map(DatabaseValue::Int64),
        "FLOAT4" => row
            .try_get::<Option<f32>, _>(index)
            .map_err(decode_error)?
            .map(|v| DatabaseValue::Float64(f64::from(v))),
        "FLOAT8" => row
            .try_get::<Option<f64>, _>(index)
            .map_err(decode_error)?
            .map(DatabaseValue::Float64),
        "UUID" => row
            .try_get::<Option<uuid::Uuid>, _>(index)
            .map_err(decode_error)?
            .map(DatabaseValue::Uuid),
        "TIMESTAMPTZ" => row
            .try_get::<Option<chrono::DateTime<chrono::Utc>>, _>(index)
            .map_err(decode_error)?
            .map(DatabaseValue::DateTime),
        // Zone-less timestamps are taken as UTC
        "TIMESTAMP" => row
            .try_get::<Option<chrono::NaiveDateTime>, _>(index)
            .map_err(decode_error)?
            .map(|v| DatabaseValue::DateTime(chrono::Utc.from_utc_datetime(&v))),
        "DATE" => row
            .try_get::<Option<chrono::NaiveDate>, _>(index)
            .map_err(decode_error)?
            .map(DatabaseValue::Date),
        "TIME" => row
            .try_get::<Option<chrono::NaiveTime>, _>(index)
            .map_err(decode_error)?
            .map(DatabaseValue::Time),
        "BYTEA" => row
            .try_get::<Option<Vec<u8>>, _>(index)
            .map_err(decode_error)?
            .map(DatabaseValue::Bytes),
        "NUMERIC" => {
            let raw = row.try_get_raw(index).map_err(decode_error)?;
            if raw.is_null() {
                None
            } else {
                let text = match raw.format() {
                    PgValueFormat::Text => raw.as_str().map(str::to_string).ok(),
                    PgValueFormat::Binary => raw.as_bytes().ok().and_then(numeric_to_string),
                };
                let text = text.ok_or_else(|| {
                    OrmError::Serialization(format!("Failed to decode {} value", type_name))
                })?;
                Some(DatabaseValue::String(text))
            }
        }
        "JSON" | "JSONB" => row
            .try_get::<Option<serde_json::Value>, _>(index)
            .map_err(decode_error)?
            .map(DatabaseValue::Json),
        _ => row
            .try_get::<Option<String>, _>(index)
            .map_err(decode_error)?
            .map(DatabaseValue::String),
    };

    Ok(value.unwrap_or(DatabaseValue::Null))
}

/// Render PostgreSQL's binary NUMERIC (base-10000 digit groups) as decimal text
fn numeric_to_string(bytes: &[u8]) -> Option<String> {
    let word = |at: usize| bytes.get(at..at + 2).map(|b| u16::from_be_bytes([b[0], b[1]]));

    let ndigits = usize::from(word(0)?);
    let weight = i32::from(word(2)? as i16);
    let sign = word(4)?;
    let scale = usize::from(word(6)?);

    match sign {
        0xC000 => return Some("NaN".to_string()),
        0xD000 => return Some("Infinity".to_string()),
        0xF000 => return Some("-Infinity".to_string()),
        _ => {}
    }

    let digits = (0..ndigits)
        .map(|i| word(8 + 2 * i))
        .collect::<Option<Vec<u16>>>()?;
    let digit = |position: i32| {
        usize::try_from(position)
            .ok()
            .and_then(|p| digits.get(p).copied())
            .unwrap_or(0)
    };

    let mut text = String::new();
    if sign == 0x4000 {
        text.push('-');
    }

    if weight < 0 {
        text.push('0');
    } else {
        text.push_str(&digit(0).to_string());
        for position in 1..=weight {
            text.push_str(&format!("{:04}", digit(position)));
        }
    }

    if scale > 0 {
        let mut fraction = String::with_capacity(scale + 4);
        let mut position = weight + 1;
        while fraction.len() < scale {
            fraction.push_str(&format!("{:04}", digit(position)));
            position += 1;
        }
        fraction.truncate(scale);
        text.push('.');
        text.push_str(&fraction);
    }

    Some(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numeric(weight: i16, sign: u16, scale: u16, digits: &[u16]) -> Vec<u8> {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&(digits.len() as u16).to_be_bytes());
        bytes.extend_from_slice(&weight.to_be_bytes());
        bytes.extend_from_slice(&sign.to_be_bytes());
        bytes.extend_from_slice(&scale.to_be_bytes());
        for digit in digits {
            bytes.extend_from_slice(&digit.to_be_bytes());
        }
        bytes
    }

    #[test]
    fn test_numeric_to_string() {
        assert_eq!(numeric_to_string(&numeric(0, 0, 2, &[123, 4500])).as_deref(), Some("123.45"));
        assert_eq!(numeric_to_string(&numeric(-1, 0, 2, &[500])).as_deref(), Some("0.05"));
        assert_eq!(numeric_to_string(&numeric(1, 0, 0, &[1])).as_deref(), Some("10000"));
        assert_eq!(numeric_to_string(&numeric(1, 0x4000, 1, &[12, 3456, 7000])).as_deref(), Some("-123456.7"));
        assert_eq!(numeric_to_string(&numeric(0, 0, 3, &[])).as_deref(), Some("0.000"));
        assert_eq!(numeric_to_string(&numeric(0, 0xC000, 0, &[])).as_deref(), Some("NaN"));
    }

    #[test]
    fn test_numeric_to_string_rejects_truncated_input() {
        assert_eq!(numeric_to_string(&[0, 2, 0, 0]), None);
        assert_eq!(numeric_to_string(&numeric(0, 0, 0, &[1, 2])[..10]), None);
    }
}
