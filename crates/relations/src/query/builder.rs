//! Query Builder - Core builder implementation

use std::marker::PhantomData;

use crate::relationships::EagerInclude;

use super::types::*;

/// The accumulated parts of one query: what executors consume
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Criteria {
    pub(crate) table: Option<String>,
    pub(crate) columns: Vec<String>,
    pub(crate) joins: Vec<JoinClause>,
    pub(crate) conditions: Vec<WhereCondition>,
    pub(crate) order_by: Vec<(String, OrderDirection)>,
    pub(crate) limit_count: Option<i64>,
    pub(crate) offset_value: Option<i64>,
}

impl Criteria {
    /// Base table, if set
    pub fn table(&self) -> Option<&str> {
        self.table.as_deref()
    }

    /// Projected columns; empty means `*`
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Joins in call order
    pub fn joins(&self) -> &[JoinClause] {
        &self.joins
    }

    /// Predicates in call order, combined with AND
    pub fn conditions(&self) -> &[WhereCondition] {
        &self.conditions
    }

    pub fn order_by(&self) -> &[(String, OrderDirection)] {
        &self.order_by
    }

    pub fn limit_count(&self) -> Option<i64> {
        self.limit_count
    }

    pub fn offset_value(&self) -> Option<i64> {
        self.offset_value
    }
}

/// Query builder for constructing database queries
///
/// Every method takes the builder by value and returns it, and executing
/// terminals consume it, so a built query runs at most once.
#[derive(Debug)]
pub struct QueryBuilder<M = ()> {
    pub(crate) criteria: Criteria,
    pub(crate) includes: Vec<EagerInclude>,
    _phantom: PhantomData<fn() -> M>,
}

impl<M> Clone for QueryBuilder<M> {
    fn clone(&self) -> Self {
        Self {
            criteria: self.criteria.clone(),
            includes: self.includes.clone(),
            _phantom: PhantomData,
        }
    }
}

impl<M> Default for QueryBuilder<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M> QueryBuilder<M> {
    /// Create a new query builder
    pub fn new() -> Self {
        Self {
            criteria: Criteria::default(),
            includes: Vec::new(),
            _phantom: PhantomData,
        }
    }

    /// Set the FROM table
    pub fn from(mut self, table: &str) -> Self {
        self.criteria.table = Some(table.to_string());
        self
    }

    /// The accumulated criteria
    pub fn criteria(&self) -> &Criteria {
        &self.criteria
    }

    /// Eager includes requested for the result models
    pub fn includes(&self) -> &[EagerInclude] {
        &self.includes
    }

    /// Same criteria, different result model
    pub(crate) fn retype<N>(self) -> QueryBuilder<N> {
        QueryBuilder {
            criteria: self.criteria,
            includes: self.includes,
            _phantom: PhantomData,
        }
    }
}

impl QueryBuilder<()> {
    /// Untyped builder over a table, for junction rows and other plain tables
    pub fn table(table: &str) -> Self {
        Self::new().from(table)
    }
}
