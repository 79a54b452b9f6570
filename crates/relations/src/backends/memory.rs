//! In-process executor
//!
//! Evaluates [`Criteria`] over tables held in memory. Every statement is
//! rendered through the same SQL generator as the PostgreSQL backend and
//! recorded, so tests can assert on both the result and the round trips
//! that produced it.

use std::cmp::Ordering;
use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

use crate::error::{OrmError, OrmResult};
use crate::query::{insert_sql, Criteria, JoinType, OrderDirection, QueryOperator, WhereCondition};
use crate::row::Row;
use crate::value::DatabaseValue;

use super::core::QueryExecutor;

/// Kind of statement an executor received
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatementKind {
    Select,
    Count,
    Insert,
    Delete,
}

/// One statement as the executor received it
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutedStatement {
    pub kind: StatementKind,
    pub sql: String,
    pub params: Vec<DatabaseValue>,
}

/// Executor over in-memory tables
///
/// Tables must exist before they are queried, as they would in a database.
/// Unique constraints declared with [`with_unique`](Self::with_unique) are
/// enforced on insert.
#[derive(Debug, Default)]
pub struct MemoryExecutor {
    tables: RwLock<HashMap<String, Vec<Row>>>,
    unique: RwLock<HashMap<String, Vec<Vec<String>>>>,
    failure: Mutex<Option<OrmError>>,
    statements: Mutex<Vec<ExecutedStatement>>,
}

impl MemoryExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a table holding `rows`
    pub fn with_table(mut self, table: &str, rows: Vec<Row>) -> Self {
        self.tables.get_mut().insert(table.to_string(), rows);
        self
    }

    /// Declare a unique constraint over `columns` of `table`
    pub fn with_unique(mut self, table: &str, columns: &[&str]) -> Self {
        self.unique
            .get_mut()
            .entry(table.to_string())
            .or_default()
            .push(columns.iter().map(|c| c.to_string()).collect());
        self
    }

    /// Snapshot of a table's rows, `None` when the table does not exist
    pub async fn table_rows(&self, table: &str) -> Option<Vec<Row>> {
        self.tables.read().await.get(table).cloned()
    }

    /// Make the next statement fail with `error`
    pub async fn fail_next(&self, error: OrmError) {
        *self.failure.lock().await = Some(error);
    }

    /// All statements received so far, in order
    pub async fn statements(&self) -> Vec<ExecutedStatement> {
        self.statements.lock().await.clone()
    }

    /// Number of statements of `kind` received so far
    pub async fn statement_count(&self, kind: StatementKind) -> usize {
        self.statements
            .lock()
            .await
            .iter()
            .filter(|statement| statement.kind == kind)
            .count()
    }

    /// Forget recorded statements
    pub async fn clear_statements(&self) {
        self.statements.lock().await.clear();
    }

    async fn record(&self, kind: StatementKind, sql: String, params: Vec<DatabaseValue>) -> OrmResult<()> {
        debug!(?kind, %sql, "memory executor statement");
        self.statements.lock().await.push(ExecutedStatement { kind, sql, params });

        match self.failure.lock().await.take() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl QueryExecutor for MemoryExecutor {
    async fn fetch_all(&self, criteria: &Criteria) -> OrmResult<Vec<Row>> {
        let (sql, params) = criteria.to_select_sql()?;
        self.record(StatementKind::Select, sql, params).await?;

        let tables = self.tables.read().await;
        let mut scopes = matching_scopes(&tables, criteria)?;

        if !criteria.order_by().is_empty() {
            let keys = scopes
                .iter()
                .map(|scope| {
                    criteria
                        .order_by()
                        .iter()
                        .map(|(column, _)| scope.resolve(column))
                        .collect::<OrmResult<Vec<_>>>()
                })
                .collect::<OrmResult<Vec<_>>>()?;

            let mut indexed: Vec<(Vec<DatabaseValue>, Scope<'_>)> = keys.into_iter().zip(scopes).collect();
            indexed.sort_by(|(a, _), (b, _)| order_keys(a, b, criteria.order_by()));
            scopes = indexed.into_iter().map(|(_, scope)| scope).collect();
        }

        let offset = criteria.offset_value().unwrap_or(0).max(0) as usize;
        let limit = criteria
            .limit_count()
            .map(|limit| limit.max(0) as usize)
            .unwrap_or(usize::MAX);

        scopes
            .iter()
            .skip(offset)
            .take(limit)
            .map(|scope| scope.project(criteria.columns(), &tables))
            .collect()
    }

    async fn count(&self, criteria: &Criteria) -> OrmResult<i64> {
        let (sql, params) = criteria.to_count_sql()?;
        self.record(StatementKind::Count, sql, params).await?;

        let tables = self.tables.read().await;
        Ok(matching_scopes(&tables, criteria)?.len() as i64)
    }

    async fn insert(&self, table: &str, values: Row) -> OrmResult<bool> {
        let (sql, params) = insert_sql(table, &values);
        self.record(StatementKind::Insert, sql, params).await?;

        let constraints = self.unique.read().await.get(table).cloned().unwrap_or_default();
        let mut tables = self.tables.write().await;
        let rows = tables.get_mut(table).ok_or_else(|| undefined_table(table))?;

        for columns in &constraints {
            let duplicate = rows.iter().any(|existing| {
                columns.iter().all(|column| match (existing.get(column), values.get(column)) {
                    (Some(a), Some(b)) if !a.is_null() => compare(a, b) == Some(Ordering::Equal),
                    _ => false,
                })
            });

            if duplicate {
                return Err(OrmError::Database(format!(
                    "duplicate key value violates unique constraint \"{}_{}_key\"",
                    table,
                    columns.join("_")
                )));
            }
        }

        rows.push(values);
        Ok(true)
    }

    async fn delete(&self, criteria: &Criteria) -> OrmResult<u64> {
        let (sql, params) = criteria.to_delete_sql()?;
        self.record(StatementKind::Delete, sql, params).await?;

        let table = criteria.require_table()?;
        let mut tables = self.tables.write().await;
        let rows = tables.get_mut(table).ok_or_else(|| undefined_table(table))?;

        let mut keep = Vec::with_capacity(rows.len());
        for row in rows.iter() {
            let scope = Scope {
                entries: vec![(table, Some(row))],
            };
            keep.push(!scope.matches(criteria.conditions())?);
        }

        let before = rows.len();
        let mut flags = keep.into_iter();
        rows.retain(|_| flags.next().unwrap_or(true));
        Ok((before - rows.len()) as u64)
    }
}

/// One combination of joined rows; `None` is the null side of a LEFT JOIN
#[derive(Debug, Clone)]
struct Scope<'a> {
    entries: Vec<(&'a str, Option<&'a Row>)>,
}

impl<'a> Scope<'a> {
    fn resolve(&self, column: &str) -> OrmResult<DatabaseValue> {
        match column.split_once('.') {
            Some((table, name)) => {
                let (_, row) = self
                    .entries
                    .iter()
                    .find(|(entry, _)| *entry == table)
                    .ok_or_else(|| {
                        OrmError::Database(format!("missing FROM-clause entry for table \"{}\"", table))
                    })?;

                match row {
                    None => Ok(DatabaseValue::Null),
                    Some(row) => row.get(name).cloned().ok_or_else(|| undefined_column(column)),
                }
            }
            None => self
                .entries
                .iter()
                .filter_map(|(_, row)| *row)
                .find_map(|row| row.get(column).cloned())
                .ok_or_else(|| undefined_column(column)),
        }
    }

    fn matches(&self, conditions: &[WhereCondition]) -> OrmResult<bool> {
        for condition in conditions {
            if !self.satisfies(condition)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn satisfies(&self, condition: &WhereCondition) -> OrmResult<bool> {
        let actual = self.resolve(&condition.column)?;

        let result = match condition.operator {
            QueryOperator::IsNull => actual.is_null(),
            QueryOperator::IsNotNull => !actual.is_null(),
            QueryOperator::In => condition
                .values
                .iter()
                .any(|value| compare(&actual, value) == Some(Ordering::Equal)),
            QueryOperator::NotIn => {
                !actual.is_null()
                    && condition
                        .values
                        .iter()
                        .all(|value| compare(&actual, value).map_or(false, |o| o != Ordering::Equal))
            }
            operator => match &condition.value {
                // Rendered as IS NULL / IS NOT NULL
                Some(DatabaseValue::Null) | None => {
                    if operator == QueryOperator::NotEqual {
                        !actual.is_null()
                    } else {
                        actual.is_null()
                    }
                }
                Some(expected) => evaluate(&actual, operator, expected),
            },
        };
        Ok(result)
    }

    fn project(&self, columns: &[String], tables: &HashMap<String, Vec<Row>>) -> OrmResult<Row> {
        let mut row = Row::new();

        if columns.is_empty() {
            for (table, _) in &self.entries {
                self.project_table(table, tables, &mut row);
            }
            return Ok(row);
        }

        for column in columns {
            if column == "*" {
                for (table, _) in &self.entries {
                    self.project_table(table, tables, &mut row);
                }
            } else if let Some(table) = column.strip_suffix(".*") {
                if !self.entries.iter().any(|(entry, _)| *entry == table) {
                    return Err(OrmError::Database(format!(
                        "missing FROM-clause entry for table \"{}\"",
                        table
                    )));
                }
                self.project_table(table, tables, &mut row);
            } else {
                let (expression, alias) = split_alias(column);
                let name = alias.unwrap_or_else(|| {
                    expression
                        .rsplit_once('.')
                        .map(|(_, name)| name)
                        .unwrap_or(expression)
                });
                row.insert(name, self.resolve(expression)?);
            }
        }
        Ok(row)
    }

    fn project_table(&self, table: &str, tables: &HashMap<String, Vec<Row>>, out: &mut Row) {
        match self.entries.iter().find(|(entry, _)| *entry == table) {
            Some((_, Some(row))) => {
                for (name, value) in row.iter() {
                    out.insert(name, value.clone());
                }
            }
            Some((_, None)) => {
                let schema = tables.get(table).and_then(|rows| rows.first());
                for name in schema.map(Row::column_names).unwrap_or_default() {
                    out.insert(name, DatabaseValue::Null);
                }
            }
            None => {}
        }
    }
}

fn matching_scopes<'a>(tables: &'a HashMap<String, Vec<Row>>, criteria: &'a Criteria) -> OrmResult<Vec<Scope<'a>>> {
    let base = criteria.require_table()?;
    let base_rows = tables.get(base).ok_or_else(|| undefined_table(base))?;

    let mut scopes: Vec<Scope<'a>> = base_rows
        .iter()
        .map(|row| Scope {
            entries: vec![(base, Some(row))],
        })
        .collect();

    for join in criteria.joins() {
        let joined_rows = tables.get(&join.table).ok_or_else(|| undefined_table(&join.table))?;
        let mut next = Vec::new();

        for scope in &scopes {
            let mut matched = false;
            for joined in joined_rows {
                let mut candidate = scope.clone();
                candidate.entries.push((join.table.as_str(), Some(joined)));

                let left = candidate.resolve(&join.left)?;
                let right = candidate.resolve(&join.right)?;
                if evaluate(&left, join.operator, &right) {
                    matched = true;
                    next.push(candidate);
                }
            }

            if !matched && join.join_type == JoinType::Left {
                let mut candidate = scope.clone();
                candidate.entries.push((join.table.as_str(), None));
                next.push(candidate);
            }
        }
        scopes = next;
    }

    let mut matching = Vec::with_capacity(scopes.len());
    for scope in scopes {
        if scope.matches(criteria.conditions())? {
            matching.push(scope);
        }
    }
    Ok(matching)
}

/// Split `expression AS alias`
fn split_alias(column: &str) -> (&str, Option<&str>) {
    let upper = column.to_uppercase();
    match upper.find(" AS ") {
        Some(index) => (column[..index].trim(), Some(column[index + 4..].trim())),
        None => (column.trim(), None),
    }
}

/// SQL comparison; `None` when either side is null or the types do not compare
fn compare(a: &DatabaseValue, b: &DatabaseValue) -> Option<Ordering> {
    use DatabaseValue::*;

    if let (Some(x), Some(y)) = (a.as_i64(), b.as_i64()) {
        return Some(x.cmp(&y));
    }

    match (a, b) {
        (Float64(x), Float64(y)) => x.partial_cmp(y),
        (Float64(x), other) => other.as_i64().and_then(|y| x.partial_cmp(&(y as f64))),
        (other, Float64(y)) => other.as_i64().and_then(|x| (x as f64).partial_cmp(y)),
        (Bool(x), Bool(y)) => Some(x.cmp(y)),
        (String(x), String(y)) => Some(x.cmp(y)),
        (Uuid(x), Uuid(y)) => Some(x.cmp(y)),
        (Uuid(x), String(y)) => y.parse::<uuid::Uuid>().ok().map(|y| x.cmp(&y)),
        (String(x), Uuid(y)) => x.parse::<uuid::Uuid>().ok().map(|x| x.cmp(y)),
        (DateTime(x), DateTime(y)) => Some(x.cmp(y)),
        (Date(x), Date(y)) => Some(x.cmp(y)),
        (Time(x), Time(y)) => Some(x.cmp(y)),
        (Bytes(x), Bytes(y)) => Some(x.cmp(y)),
        (Json(x), Json(y)) => (x == y).then_some(Ordering::Equal),
        _ => None,
    }
}

fn evaluate(actual: &DatabaseValue, operator: QueryOperator, expected: &DatabaseValue) -> bool {
    match operator {
        QueryOperator::Like | QueryOperator::NotLike => {
            let (DatabaseValue::String(text), DatabaseValue::String(pattern)) = (actual, expected) else {
                return false;
            };
            let matched = like(text, pattern);
            if operator == QueryOperator::Like {
                matched
            } else {
                !matched
            }
        }
        _ => match compare(actual, expected) {
            None => false,
            Some(ordering) => match operator {
                QueryOperator::Equal | QueryOperator::In => ordering == Ordering::Equal,
                QueryOperator::NotEqual | QueryOperator::NotIn => ordering != Ordering::Equal,
                QueryOperator::GreaterThan => ordering == Ordering::Greater,
                QueryOperator::GreaterThanOrEqual => ordering != Ordering::Less,
                QueryOperator::LessThan => ordering == Ordering::Less,
                QueryOperator::LessThanOrEqual => ordering != Ordering::Greater,
                _ => false,
            },
        },
    }
}

/// SQL LIKE with `%` and `_` wildcards
fn like(text: &str, pattern: &str) -> bool {
    let text: Vec<char> = text.chars().collect();
    let pattern: Vec<char> = pattern.chars().collect();

    // matches[j]: text[..i] matches pattern[..j]
    let mut matches = vec![false; pattern.len() + 1];
    matches[0] = true;
    for j in 1..=pattern.len() {
        matches[j] = matches[j - 1] && pattern[j - 1] == '%';
    }

    for c in &text {
        let mut next = vec![false; pattern.len() + 1];
        for j in 1..=pattern.len() {
            next[j] = match pattern[j - 1] {
                '%' => next[j - 1] || matches[j],
                '_' => matches[j - 1],
                p => matches[j - 1] && p == *c,
            };
        }
        matches = next;
    }
    matches[pattern.len()]
}

/// ORDER BY comparison; nulls sort last ascending and first descending
fn order_keys(a: &[DatabaseValue], b: &[DatabaseValue], order: &[(String, OrderDirection)]) -> Ordering {
    for ((x, y), (_, direction)) in a.iter().zip(b).zip(order) {
        let ordering = match (x.is_null(), y.is_null()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            (false, false) => compare(x, y).unwrap_or(Ordering::Equal),
        };
        let ordering = match direction {
            OrderDirection::Asc => ordering,
            OrderDirection::Desc => ordering.reverse(),
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

fn undefined_table(table: &str) -> OrmError {
    OrmError::Database(format!("relation \"{}\" does not exist", table))
}

fn undefined_column(column: &str) -> OrmError {
    OrmError::Database(format!("column \"{}\" does not exist", column))
}
