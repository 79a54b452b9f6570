//! Query Builder SQL generation
//!
//! Renders [`Criteria`] as PostgreSQL with `$n` placeholders. Values are
//! always bound, never interpolated.

use crate::error::QueryError;
use crate::row::Row;
use crate::value::DatabaseValue;

use super::builder::{Criteria, QueryBuilder};
use super::types::*;

impl Criteria {
    /// Build SELECT SQL with parameters
    pub fn to_select_sql(&self) -> Result<(String, Vec<DatabaseValue>), QueryError> {
        let mut sql = String::from("SELECT ");
        let mut params = Vec::new();

        if self.columns.is_empty() {
            sql.push('*');
        } else {
            sql.push_str(&self.columns.join(", "));
        }

        self.push_from_and_joins(&mut sql)?;
        self.push_where(&mut sql, &mut params);
        self.push_order_limit(&mut sql);

        Ok((sql, params))
    }

    /// Build `SELECT COUNT(*)` SQL; projection, order and limit are ignored
    pub fn to_count_sql(&self) -> Result<(String, Vec<DatabaseValue>), QueryError> {
        let mut sql = String::from("SELECT COUNT(*)");
        let mut params = Vec::new();

        self.push_from_and_joins(&mut sql)?;
        self.push_where(&mut sql, &mut params);

        Ok((sql, params))
    }

    /// Build DELETE SQL with parameters
    pub fn to_delete_sql(&self) -> Result<(String, Vec<DatabaseValue>), QueryError> {
        if !self.joins.is_empty() {
            return Err(QueryError::UnsupportedOperation(
                "DELETE with JOIN clauses".to_string(),
            ));
        }

        let table = self.require_table()?;
        let mut sql = format!("DELETE FROM {}", table);
        let mut params = Vec::new();
        self.push_where(&mut sql, &mut params);

        Ok((sql, params))
    }

    pub(crate) fn require_table(&self) -> Result<&str, QueryError> {
        self.table
            .as_deref()
            .ok_or_else(|| QueryError::MissingFields("query has no table".to_string()))
    }

    fn push_from_and_joins(&self, sql: &mut String) -> Result<(), QueryError> {
        sql.push_str(" FROM ");
        sql.push_str(self.require_table()?);

        for join in &self.joins {
            sql.push_str(&format!(
                " {} {} ON {} {} {}",
                join.join_type, join.table, join.left, join.operator, join.right
            ));
        }
        Ok(())
    }

    fn push_where(&self, sql: &mut String, params: &mut Vec<DatabaseValue>) {
        if self.conditions.is_empty() {
            return;
        }

        sql.push_str(" WHERE ");
        for (i, condition) in self.conditions.iter().enumerate() {
            if i > 0 {
                sql.push_str(" AND ");
            }

            match condition.operator {
                QueryOperator::In | QueryOperator::NotIn if condition.values.is_empty() => {
                    // An empty list matches nothing (IN) or everything (NOT IN)
                    if condition.operator == QueryOperator::In {
                        sql.push_str("1 = 0");
                    } else {
                        sql.push_str("1 = 1");
                    }
                }
                QueryOperator::In | QueryOperator::NotIn => {
                    let placeholders: Vec<String> = condition
                        .values
                        .iter()
                        .map(|value| {
                            params.push(value.clone());
                            format!("${}", params.len())
                        })
                        .collect();
                    sql.push_str(&format!(
                        "{} {} ({})",
                        condition.column,
                        condition.operator,
                        placeholders.join(", ")
                    ));
                }
                QueryOperator::IsNull | QueryOperator::IsNotNull => {
                    sql.push_str(&format!("{} {}", condition.column, condition.operator));
                }
                _ => match &condition.value {
                    Some(DatabaseValue::Null) | None => {
                        let operator = if condition.operator == QueryOperator::NotEqual {
                            QueryOperator::IsNotNull
                        } else {
                            QueryOperator::IsNull
                        };
                        sql.push_str(&format!("{} {}", condition.column, operator));
                    }
                    Some(value) => {
                        params.push(value.clone());
                        sql.push_str(&format!(
                            "{} {} ${}",
                            condition.column,
                            condition.operator,
                            params.len()
                        ));
                    }
                },
            }
        }
    }

    fn push_order_limit(&self, sql: &mut String) {
        if !self.order_by.is_empty() {
            let order: Vec<String> = self
                .order_by
                .iter()
                .map(|(column, direction)| format!("{} {}", column, direction))
                .collect();
            sql.push_str(" ORDER BY ");
            sql.push_str(&order.join(", "));
        }

        if let Some(limit) = self.limit_count {
            sql.push_str(&format!(" LIMIT {}", limit));
        }

        if let Some(offset) = self.offset_value {
            sql.push_str(&format!(" OFFSET {}", offset));
        }
    }
}

/// Build INSERT SQL with parameters
pub fn insert_sql(table: &str, row: &Row) -> (String, Vec<DatabaseValue>) {
    let columns = row.column_names();
    let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("${}", i)).collect();
    let params = row.iter().map(|(_, value)| value.clone()).collect();

    let sql = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        table,
        columns.join(", "),
        placeholders.join(", ")
    );
    (sql, params)
}

impl<M> QueryBuilder<M> {
    /// Generate SELECT SQL with parameter placeholders and return parameters
    pub fn to_sql_with_params(&self) -> Result<(String, Vec<DatabaseValue>), QueryError> {
        self.criteria.to_select_sql()
    }

    /// Generate SELECT SQL only
    pub fn to_sql(&self) -> Result<String, QueryError> {
        self.to_sql_with_params().map(|(sql, _)| sql)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_with_join_and_in() {
        let (sql, params) = QueryBuilder::table("tags")
            .join("posts_tags", "posts_tags.tag_id", "tags.id")
            .where_eq("tags.active", true)
            .where_in("posts_tags.post_id", vec![1i64, 2, 3])
            .set_columns(vec!["tags.*"])
            .to_sql_with_params()
            .unwrap();

        assert_eq!(
            sql,
            "SELECT tags.* FROM tags INNER JOIN posts_tags ON posts_tags.tag_id = tags.id \
             WHERE tags.active = $1 AND posts_tags.post_id IN ($2, $3, $4)"
        );
        assert_eq!(params.len(), 4);
        assert_eq!(params[0], DatabaseValue::Bool(true));
        assert_eq!(params[3], DatabaseValue::Int64(3));
    }

    #[test]
    fn test_empty_in_list() {
        let sql = QueryBuilder::table("tags")
            .where_in::<i64>("id", vec![])
            .where_not_in::<i64>("id", vec![])
            .to_sql()
            .unwrap();
        assert_eq!(sql, "SELECT * FROM tags WHERE 1 = 0 AND 1 = 1");
    }

    #[test]
    fn test_null_comparison_becomes_is_null() {
        let sql = QueryBuilder::table("tags")
            .where_eq("deleted_at", DatabaseValue::Null)
            .to_sql()
            .unwrap();
        assert_eq!(sql, "SELECT * FROM tags WHERE deleted_at IS NULL");
    }

    #[test]
    fn test_order_limit_offset() {
        let sql = QueryBuilder::table("tags")
            .order_by("name")
            .order_by_desc("id")
            .limit(10)
            .offset(20)
            .to_sql()
            .unwrap();
        assert_eq!(sql, "SELECT * FROM tags ORDER BY name ASC, id DESC LIMIT 10 OFFSET 20");
    }

    #[test]
    fn test_count_ignores_projection_and_limit() {
        let (sql, params) = QueryBuilder::table("posts_tags")
            .where_eq("post_id", 1i64)
            .where_eq("tag_id", 5i64)
            .select("post_id")
            .limit(1)
            .criteria()
            .to_count_sql()
            .unwrap();
        assert_eq!(sql, "SELECT COUNT(*) FROM posts_tags WHERE post_id = $1 AND tag_id = $2");
        assert_eq!(params, vec![DatabaseValue::Int64(1), DatabaseValue::Int64(5)]);
    }

    #[test]
    fn test_delete_sql() {
        let (sql, _) = QueryBuilder::table("posts_tags")
            .where_eq("post_id", 1i64)
            .criteria()
            .to_delete_sql()
            .unwrap();
        assert_eq!(sql, "DELETE FROM posts_tags WHERE post_id = $1");

        let joined = QueryBuilder::table("tags")
            .join("posts_tags", "posts_tags.tag_id", "tags.id")
            .criteria()
            .to_delete_sql();
        assert!(matches!(joined, Err(QueryError::UnsupportedOperation(_))));
    }

    #[test]
    fn test_insert_sql() {
        let row = Row::new().with("post_id", 1i64).with("tag_id", 5i64);
        let (sql, params) = insert_sql("posts_tags", &row);
        assert_eq!(sql, "INSERT INTO posts_tags (post_id, tag_id) VALUES ($1, $2)");
        assert_eq!(params, vec![DatabaseValue::Int64(1), DatabaseValue::Int64(5)]);
    }

    #[test]
    fn test_missing_table() {
        let result = QueryBuilder::<()>::new().where_eq("id", 1i64).to_sql();
        assert!(matches!(result, Err(QueryError::MissingFields(_))));
    }
}
