//! HasMany Relationship - related rows reference the parent directly

use std::fmt;
use std::marker::PhantomData;

use crate::error::ModelResult;
use crate::model::{Model, PrimaryKey};
use crate::query::QueryBuilder;
use crate::security::validate_identifier;

use super::grouping::GroupingColumn;
use super::traits::{LoadMode, RelationMeta, Relationship};

/// HasMany relationship - parent model has many related models
pub struct HasMany<Parent, Related> {
    meta: RelationMeta,
    parent_key: Option<PrimaryKey>,
    _marker: PhantomData<fn() -> (Parent, Related)>,
}

impl<Parent, Related> HasMany<Parent, Related>
where
    Parent: Model,
    Related: Model,
{
    /// Create a new HasMany relationship
    pub fn new(parent: &Parent) -> Self {
        let mut relation = Self::unbound();
        relation.parent_key = parent.primary_key();
        relation
    }

    pub fn unbound() -> Self {
        Self {
            meta: RelationMeta::between::<Parent, Related>(),
            parent_key: None,
            _marker: PhantomData,
        }
    }

    /// Column of the related table that references the parent
    pub fn with_foreign_key(mut self, foreign_key: &str) -> Self {
        self.meta.foreign_key = foreign_key.to_string();
        self
    }

    pub fn foreign_key(&self) -> &str {
        &self.meta.foreign_key
    }

    fn foreign_key_column(&self) -> String {
        self.meta.related.qualified(&self.meta.foreign_key)
    }
}

impl<Parent, Related> Relationship<Related> for HasMany<Parent, Related>
where
    Parent: Model,
    Related: Model,
{
    fn meta(&self) -> &RelationMeta {
        &self.meta
    }

    fn parent_key(&self) -> Option<&PrimaryKey> {
        self.parent_key.as_ref()
    }

    fn base_query(&self) -> ModelResult<QueryBuilder<Related>> {
        validate_identifier(&self.meta.foreign_key)?;
        Ok(Related::query())
    }

    fn lazy_criterion(&self, query: QueryBuilder<Related>, parent_key: &PrimaryKey) -> QueryBuilder<Related> {
        query.where_eq(&self.foreign_key_column(), parent_key)
    }

    fn eager_criterion(&self, query: QueryBuilder<Related>, keys: &[PrimaryKey]) -> QueryBuilder<Related> {
        query.where_in(&self.foreign_key_column(), keys.to_vec())
    }

    fn select(&self, _mode: LoadMode) -> Vec<String> {
        vec![self.meta.related.all_columns()]
    }

    // The foreign key is a real column of the related table
    fn grouping_column(&self) -> GroupingColumn {
        GroupingColumn::kept(self.meta.foreign_key.clone())
    }
}

impl<Parent, Related> Clone for HasMany<Parent, Related> {
    fn clone(&self) -> Self {
        Self {
            meta: self.meta.clone(),
            parent_key: self.parent_key.clone(),
            _marker: PhantomData,
        }
    }
}

impl<Parent, Related> fmt::Debug for HasMany<Parent, Related> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HasMany")
            .field("parent", &self.meta.parent.table)
            .field("related", &self.meta.related.table)
            .field("parent_key", &self.parent_key)
            .field("foreign_key", &self.meta.foreign_key)
            .finish()
    }
}
