//! # elif-relations: Relation resolution for elif.rs
//!
//! Turns declared associations between models into query criteria and merges
//! related rows back onto their owners. Many-to-many associations go through
//! a junction table; relations load lazily for one record or eagerly for a
//! whole batch in a single query.
//!
//! ```ignore
//! let tags = post.tags().all(&executor).await?;
//! post.tags().link(&executor, 5).await?;
//!
//! let posts = Post::query().with("tags.posts").all(&executor).await?;
//! ```

pub mod backends;
pub mod config;
pub mod error;
pub mod model;
pub mod query;
pub mod relationships;
pub mod row;
pub mod security;
pub mod value;

// Re-export core traits and types
pub use backends::{MemoryExecutor, PostgresExecutor, QueryExecutor};
pub use config::{DatabaseConfig, PoolConfig};
pub use error::*;
pub use model::{Model, PrimaryKey, TableDescriptor};
pub use query::{Criteria, QueryBuilder, QueryOperator};
pub use relationships::{
    EagerConstraint, EagerInclude, HasMany, LoadMode, ManyToMany, RelatedRef, RelatedSets,
    Relationship, ResultSet,
};
pub use row::Row;
pub use value::DatabaseValue;
