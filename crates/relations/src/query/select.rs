//! Query Builder SELECT, ORDER and LIMIT operations

use super::builder::QueryBuilder;
use super::types::OrderDirection;

impl<M> QueryBuilder<M> {
    /// Add SELECT fields to the query
    pub fn select(mut self, fields: &str) -> Self {
        if fields == "*" {
            self.criteria.columns.push("*".to_string());
        } else {
            self.criteria.columns.extend(
                fields
                    .split(',')
                    .map(|f| f.trim())
                    .filter(|f| !f.is_empty())
                    .map(str::to_string),
            );
        }
        self
    }

    /// Replace the projection
    pub fn set_columns<S: Into<String>>(mut self, columns: Vec<S>) -> Self {
        self.criteria.columns = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Add ORDER BY clause
    pub fn order_by(mut self, column: &str) -> Self {
        self.criteria.order_by.push((column.to_string(), OrderDirection::Asc));
        self
    }

    /// Add ORDER BY DESC clause
    pub fn order_by_desc(mut self, column: &str) -> Self {
        self.criteria.order_by.push((column.to_string(), OrderDirection::Desc));
        self
    }

    /// Add LIMIT clause
    pub fn limit(mut self, count: i64) -> Self {
        self.criteria.limit_count = Some(count);
        self
    }

    /// Add OFFSET clause
    pub fn offset(mut self, count: i64) -> Self {
        self.criteria.offset_value = Some(count);
        self
    }
}
