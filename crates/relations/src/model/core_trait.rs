//! Core Model Trait - Base definition for database entities
//!
//! A model declares its table, key names and key value statically, hydrates
//! from a [`Row`], and owns a [`RelatedSets`] slot map that eager loading fills.

use std::fmt::Debug;

use async_trait::async_trait;

use crate::backends::QueryExecutor;
use crate::error::{ModelResult, RelationshipError};
use crate::query::QueryBuilder;
use crate::relationships::{EagerInclude, RelatedSets, ResultSet};
use crate::row::Row;

use super::naming;
use super::primary_key::PrimaryKey;

/// Core trait for database models with relation support
#[async_trait]
pub trait Model: Send + Sync + Debug + Sized + 'static {
    /// Table name for this model
    fn table_name() -> &'static str;

    /// Primary key column name
    fn primary_key_name() -> &'static str {
        "id"
    }

    /// Column other tables use to reference this model
    fn foreign_key_name() -> String {
        naming::foreign_key_for(Self::table_name())
    }

    /// Get the primary key value for this model instance; `None` until persisted
    fn primary_key(&self) -> Option<PrimaryKey>;

    /// Create a model instance from a database row
    fn from_row(row: Row) -> ModelResult<Self>;

    /// Convert model to column-value pairs for inserts
    fn to_row(&self) -> Row;

    /// Related collections attached to this instance
    fn relations(&self) -> &RelatedSets;

    fn relations_mut(&mut self) -> &mut RelatedSets;

    /// Resolve one eager include for a batch of records.
    ///
    /// Models dispatch on `include.relation()` to the relation that owns the
    /// name; the default knows no relations.
    async fn load_relation(
        records: &mut [Self],
        include: &EagerInclude,
        executor: &dyn QueryExecutor,
    ) -> ModelResult<()> {
        let _ = (records, executor);
        Err(RelationshipError::NotFound(format!(
            "{}.{}",
            Self::table_name(),
            include.relation()
        ))
        .into())
    }

    /// Start a query against this model's table
    fn query() -> QueryBuilder<Self> {
        QueryBuilder::new().from(Self::table_name())
    }

    /// Whether the record exists in storage
    fn exists(&self) -> bool {
        self.primary_key().is_some()
    }

    /// Related collection previously attached under `relation`
    fn related<R: Model>(&self, relation: &str) -> Option<&ResultSet<R>> {
        self.relations().get::<R>(relation)
    }
}
