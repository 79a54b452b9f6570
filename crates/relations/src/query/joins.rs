//! Query Builder JOIN operations

use super::builder::QueryBuilder;
use super::types::*;

impl<M> QueryBuilder<M> {
    /// Add INNER JOIN to the query
    pub fn join(self, table: &str, left_col: &str, right_col: &str) -> Self {
        self.join_on(table, left_col, QueryOperator::Equal, right_col)
    }

    /// Add INNER JOIN with an explicit comparison operator
    pub fn join_on(mut self, table: &str, left_col: &str, operator: QueryOperator, right_col: &str) -> Self {
        self.criteria.joins.push(JoinClause {
            join_type: JoinType::Inner,
            table: table.to_string(),
            left: left_col.to_string(),
            operator,
            right: right_col.to_string(),
        });
        self
    }

    /// Add LEFT JOIN to the query
    pub fn left_join(mut self, table: &str, left_col: &str, right_col: &str) -> Self {
        self.criteria.joins.push(JoinClause {
            join_type: JoinType::Left,
            table: table.to_string(),
            left: left_col.to_string(),
            operator: QueryOperator::Equal,
            right: right_col.to_string(),
        });
        self
    }
}
