//! Query Builder WHERE clause operations

use crate::value::DatabaseValue;

use super::builder::QueryBuilder;
use super::types::*;

impl<M> QueryBuilder<M> {
    fn push_condition(mut self, column: &str, operator: QueryOperator, value: Option<DatabaseValue>) -> Self {
        self.criteria.conditions.push(WhereCondition {
            column: column.to_string(),
            operator,
            value,
            values: Vec::new(),
        });
        self
    }

    /// Add WHERE condition with equality
    pub fn where_eq<T: Into<DatabaseValue>>(self, column: &str, value: T) -> Self {
        self.push_condition(column, QueryOperator::Equal, Some(value.into()))
    }

    /// Add WHERE condition with not equal
    pub fn where_ne<T: Into<DatabaseValue>>(self, column: &str, value: T) -> Self {
        self.push_condition(column, QueryOperator::NotEqual, Some(value.into()))
    }

    /// Add WHERE condition with greater than
    pub fn where_gt<T: Into<DatabaseValue>>(self, column: &str, value: T) -> Self {
        self.push_condition(column, QueryOperator::GreaterThan, Some(value.into()))
    }

    /// Add WHERE condition with greater than or equal
    pub fn where_gte<T: Into<DatabaseValue>>(self, column: &str, value: T) -> Self {
        self.push_condition(column, QueryOperator::GreaterThanOrEqual, Some(value.into()))
    }

    /// Add WHERE condition with less than
    pub fn where_lt<T: Into<DatabaseValue>>(self, column: &str, value: T) -> Self {
        self.push_condition(column, QueryOperator::LessThan, Some(value.into()))
    }

    /// Add WHERE condition with less than or equal
    pub fn where_lte<T: Into<DatabaseValue>>(self, column: &str, value: T) -> Self {
        self.push_condition(column, QueryOperator::LessThanOrEqual, Some(value.into()))
    }

    /// Add WHERE condition with LIKE
    pub fn where_like(self, column: &str, pattern: &str) -> Self {
        self.push_condition(column, QueryOperator::Like, Some(pattern.into()))
    }

    /// Add WHERE condition with an explicit operator.
    ///
    /// `In`/`NotIn` take a single value here; use [`where_in`](Self::where_in)
    /// for lists. `IsNull`/`IsNotNull` ignore the value.
    pub fn where_condition<T: Into<DatabaseValue>>(
        self,
        column: &str,
        operator: QueryOperator,
        value: T,
    ) -> Self {
        match operator {
            QueryOperator::In | QueryOperator::NotIn => {
                let mut query = self.push_condition(column, operator, None);
                if let Some(condition) = query.criteria.conditions.last_mut() {
                    condition.values.push(value.into());
                }
                query
            }
            QueryOperator::IsNull | QueryOperator::IsNotNull => {
                self.push_condition(column, operator, None)
            }
            _ => self.push_condition(column, operator, Some(value.into())),
        }
    }

    /// Add WHERE condition with IN
    pub fn where_in<T: Into<DatabaseValue>>(mut self, column: &str, values: Vec<T>) -> Self {
        self.criteria.conditions.push(WhereCondition {
            column: column.to_string(),
            operator: QueryOperator::In,
            value: None,
            values: values.into_iter().map(Into::into).collect(),
        });
        self
    }

    /// Add WHERE condition with NOT IN
    pub fn where_not_in<T: Into<DatabaseValue>>(mut self, column: &str, values: Vec<T>) -> Self {
        self.criteria.conditions.push(WhereCondition {
            column: column.to_string(),
            operator: QueryOperator::NotIn,
            value: None,
            values: values.into_iter().map(Into::into).collect(),
        });
        self
    }

    /// Add WHERE condition with IS NULL
    pub fn where_null(self, column: &str) -> Self {
        self.push_condition(column, QueryOperator::IsNull, None)
    }

    /// Add WHERE condition with IS NOT NULL
    pub fn where_not_null(self, column: &str) -> Self {
        self.push_condition(column, QueryOperator::IsNotNull, None)
    }
}
