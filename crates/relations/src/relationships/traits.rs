//! Relationship Traits - Core trait shared by every relation kind
//!
//! A relation is an immutable plan. Each terminal call builds a fresh
//! [`QueryBuilder`] from the hooks below, so clauses never accumulate across
//! calls and a relation can be reused freely.

use std::collections::HashSet;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::backends::QueryExecutor;
use crate::error::{ModelError, ModelResult};
use crate::model::{Model, PrimaryKey, TableDescriptor};
use crate::query::QueryBuilder;

use super::eager::{apply_constraint, load_includes, merge_include, EagerConstraint, EagerInclude};
use super::grouping::{GroupingColumn, ResultGrouper};
use super::result_set::ResultSet;

/// How a plan is being loaded; decides the projection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadMode {
    /// One parent, on demand
    Lazy,
    /// A batch of parents in one query
    Eager,
}

/// Names shared by every relation kind
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationMeta {
    pub parent: TableDescriptor,
    pub related: TableDescriptor,
    /// Column that references the parent key
    pub foreign_key: String,
}

impl RelationMeta {
    /// Descriptors for a parent/related pair with the conventional foreign key
    pub fn between<Parent: Model, Related: Model>() -> Self {
        Self {
            parent: TableDescriptor::of::<Parent>(),
            related: TableDescriptor::of::<Related>(),
            foreign_key: Parent::foreign_key_name(),
        }
    }
}

/// Core relationship trait
#[async_trait]
pub trait Relationship<Related>: Send + Sync
where
    Related: Model,
{
    fn meta(&self) -> &RelationMeta;

    /// Key of the bound parent; `None` for unbound relations and unsaved parents
    fn parent_key(&self) -> Option<&PrimaryKey>;

    /// Related table plus whatever joins the association needs
    fn base_query(&self) -> ModelResult<QueryBuilder<Related>>;

    /// Restrict a plan to one parent
    fn lazy_criterion(&self, query: QueryBuilder<Related>, parent_key: &PrimaryKey) -> QueryBuilder<Related>;

    /// Restrict a plan to a batch of parents
    fn eager_criterion(&self, query: QueryBuilder<Related>, keys: &[PrimaryKey]) -> QueryBuilder<Related>;

    /// Columns to fetch in `mode`
    fn select(&self, mode: LoadMode) -> Vec<String>;

    /// Where an eagerly fetched row carries its parent key
    fn grouping_column(&self) -> GroupingColumn;

    /// The bound parent key, or the precondition error for `operation`
    fn require_parent_key(&self, operation: &str) -> ModelResult<PrimaryKey> {
        self.parent_key()
            .cloned()
            .ok_or_else(|| ModelError::missing_primary_key(operation, &self.meta().parent.table))
    }

    /// A fresh plan with the projection for `mode`
    fn plan(&self, mode: LoadMode) -> ModelResult<QueryBuilder<Related>> {
        Ok(self.base_query()?.set_columns(self.select(mode)))
    }

    /// Lazy query for the bound parent; callers may narrow it or replace the projection
    fn query(&self) -> ModelResult<QueryBuilder<Related>> {
        self.lazy_query("query")
    }

    #[doc(hidden)]
    fn lazy_query(&self, operation: &str) -> ModelResult<QueryBuilder<Related>> {
        let parent_key = self.require_parent_key(operation)?;
        Ok(self.lazy_criterion(self.plan(LoadMode::Lazy)?, &parent_key))
    }

    /// All related records of the bound parent
    async fn all(&self, executor: &dyn QueryExecutor) -> ModelResult<ResultSet<Related>> {
        self.lazy_query("all")?.all(executor).await
    }

    /// First related record of the bound parent
    async fn first(&self, executor: &dyn QueryExecutor) -> ModelResult<Option<Related>> {
        self.lazy_query("first")?.first(executor).await
    }

    /// Related records as the value of a relation accessor
    async fn get_related(&self, executor: &dyn QueryExecutor) -> ModelResult<ResultSet<Related>> {
        self.lazy_query("get_related")?.all(executor).await
    }

    /// Load this relation for every parent in one query and attach the groups under `relation`.
    ///
    /// `constraint` narrows the related query ahead of the batch predicate;
    /// `includes` are resolved on the related records before they are attached.
    async fn eager_load<Parent>(
        &self,
        executor: &dyn QueryExecutor,
        parents: &mut [Parent],
        relation: &str,
        constraint: Option<&EagerConstraint>,
        includes: &[EagerInclude],
    ) -> ModelResult<()>
    where
        Parent: Model,
        Related: Clone,
    {
        if parents.is_empty() {
            debug!(relation, "no parents to eager load");
            return Ok(());
        }

        let mut seen = HashSet::with_capacity(parents.len());
        let mut keys = Vec::with_capacity(parents.len());
        for parent in parents.iter() {
            let key = parent
                .primary_key()
                .ok_or_else(|| ModelError::missing_primary_key("eager_load", Parent::table_name()))?;
            if seen.insert(key.clone()) {
                keys.push(key);
            }
        }

        let mut query = self.plan(LoadMode::Eager)?;
        if let Some(constraint) = constraint {
            query = apply_constraint(constraint, query);
        }

        let mut nested = includes.to_vec();
        for include in std::mem::take(&mut query.includes) {
            merge_include(&mut nested, include);
        }

        let query = self.eager_criterion(query, &keys);
        let rows = query.rows(executor).await?;
        debug!(
            relation,
            parents = parents.len(),
            keys = keys.len(),
            rows = rows.len(),
            "eager loaded related rows"
        );

        let grouping = self.grouping_column();
        let mut grouper = ResultGrouper::new();
        grouper.group_rows(rows, &grouping, &self.meta().related.table, Related::from_row)?;

        if grouper.is_empty() {
            warn!(relation, parents = parents.len(), "eager load matched no related rows");
        }

        load_includes(grouper.records_mut(), &nested, executor).await?;
        grouper.attach(parents, relation);
        Ok(())
    }

    /// [`eager_load`](Self::eager_load) driven by an include
    async fn load_include<Parent>(
        &self,
        executor: &dyn QueryExecutor,
        parents: &mut [Parent],
        include: &EagerInclude,
    ) -> ModelResult<()>
    where
        Parent: Model,
        Related: Clone,
    {
        self.eager_load(
            executor,
            parents,
            include.relation(),
            include.constraint(),
            include.nested(),
        )
        .await
    }
}
