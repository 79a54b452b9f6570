//! Query Builder Module - Fluent criteria builder for relation queries

pub mod builder;
pub mod execution;
pub mod joins;
pub mod select;
pub mod sql_generation;
pub mod types;
pub mod where_clause;
pub mod with;

pub use builder::{Criteria, QueryBuilder};
pub use sql_generation::insert_sql;
pub use types::{JoinClause, JoinType, OrderDirection, QueryOperator, WhereCondition};
