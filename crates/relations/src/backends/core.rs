//! Core Executor Trait
//!
//! The execution collaborator the relation layer talks to. It runs one
//! statement per call and reports storage failures unchanged.

use async_trait::async_trait;

use crate::error::OrmResult;
use crate::query::Criteria;
use crate::row::Row;

/// Runs criteria produced by the query builder
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    /// Execute a SELECT and return rows in projection order
    async fn fetch_all(&self, criteria: &Criteria) -> OrmResult<Vec<Row>>;

    /// Execute a COUNT over the same table, joins and conditions
    async fn count(&self, criteria: &Criteria) -> OrmResult<i64>;

    /// Insert one row; `true` when a row was written
    async fn insert(&self, table: &str, values: Row) -> OrmResult<bool>;

    /// Delete matching rows and return how many were removed
    async fn delete(&self, criteria: &Criteria) -> OrmResult<u64>;
}
