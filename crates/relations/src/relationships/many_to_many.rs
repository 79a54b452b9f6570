//! ManyToMany Relationship - associations through a junction table
//!
//! `posts` and `tags` are linked through `posts_tags(post_id, tag_id)`:
//!
//! ```text
//! SELECT tags.* FROM tags
//!   INNER JOIN posts_tags ON posts_tags.tag_id = tags.id
//!   WHERE posts_tags.post_id = $1
//! ```
//!
//! Eager loads add `posts_tags.post_id AS __pivot_post_id` to the projection
//! so each row can be matched to its post; the alias is removed before the
//! row becomes a `Tag`.

use std::collections::HashSet;
use std::fmt;
use std::marker::PhantomData;

use tracing::debug;
use uuid::Uuid;

use crate::backends::QueryExecutor;
use crate::error::{ModelError, ModelResult, RelationshipError};
use crate::model::{naming, Model, PrimaryKey};
use crate::query::QueryBuilder;
use crate::row::Row;
use crate::security::validate_identifiers;

use super::grouping::GroupingColumn;
use super::traits::{LoadMode, RelationMeta, Relationship};

/// Prefix of the transient column carrying the parent key in eager rows
pub const PIVOT_PREFIX: &str = "__pivot_";

/// Alias under which an eager load projects the junction foreign key
pub fn pivot_alias(foreign_key: &str) -> String {
    format!("{}{}", PIVOT_PREFIX, foreign_key)
}

/// A related record given either by key or as an instance
#[derive(Debug)]
pub enum RelatedRef<'a, R> {
    Key(PrimaryKey),
    Instance(&'a R),
}

impl<'a, R: Model> RelatedRef<'a, R> {
    /// The key this reference points at; an instance must be persisted
    pub fn resolve(self, operation: &str) -> ModelResult<PrimaryKey> {
        match self {
            RelatedRef::Key(key) => Ok(key),
            RelatedRef::Instance(record) => record
                .primary_key()
                .ok_or_else(|| ModelError::missing_primary_key(operation, R::table_name())),
        }
    }
}

impl<'a, R: Model> From<&'a R> for RelatedRef<'a, R> {
    fn from(record: &'a R) -> Self {
        RelatedRef::Instance(record)
    }
}

impl<'a, R> From<PrimaryKey> for RelatedRef<'a, R> {
    fn from(key: PrimaryKey) -> Self {
        RelatedRef::Key(key)
    }
}

impl<'a, R> From<i64> for RelatedRef<'a, R> {
    fn from(id: i64) -> Self {
        RelatedRef::Key(PrimaryKey::Integer(id))
    }
}

impl<'a, R> From<Uuid> for RelatedRef<'a, R> {
    fn from(id: Uuid) -> Self {
        RelatedRef::Key(PrimaryKey::Uuid(id))
    }
}

/// Outcome of [`ManyToMany::sync`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncChanges {
    pub attached: Vec<PrimaryKey>,
    pub detached: Vec<PrimaryKey>,
}

/// ManyToMany relationship between `Parent` and `Related`
pub struct ManyToMany<Parent, Related> {
    meta: RelationMeta,
    parent_key: Option<PrimaryKey>,
    junction_table: String,
    junction_key: String,
    _marker: PhantomData<fn() -> (Parent, Related)>,
}

impl<Parent, Related> ManyToMany<Parent, Related>
where
    Parent: Model,
    Related: Model,
{
    /// Relation of one parent record
    pub fn new(parent: &Parent) -> Self {
        let mut relation = Self::unbound();
        relation.parent_key = parent.primary_key();
        relation
    }

    /// Relation with no parent, for eager loading
    pub fn unbound() -> Self {
        Self {
            meta: RelationMeta::between::<Parent, Related>(),
            parent_key: None,
            junction_table: naming::junction_table_name(Parent::table_name(), Related::table_name()),
            junction_key: Related::foreign_key_name(),
            _marker: PhantomData,
        }
    }

    /// Junction column referencing the parent
    pub fn with_foreign_key(mut self, foreign_key: &str) -> Self {
        self.meta.foreign_key = foreign_key.to_string();
        self
    }

    pub fn with_junction_table(mut self, junction_table: &str) -> Self {
        self.junction_table = junction_table.to_string();
        self
    }

    /// Junction column referencing the related record
    pub fn with_junction_key(mut self, junction_key: &str) -> Self {
        self.junction_key = junction_key.to_string();
        self
    }

    pub fn foreign_key(&self) -> &str {
        &self.meta.foreign_key
    }

    pub fn junction_table(&self) -> &str {
        &self.junction_table
    }

    pub fn junction_key(&self) -> &str {
        &self.junction_key
    }

    /// Check the resolved names before they reach SQL
    pub fn validate(&self) -> ModelResult<()> {
        validate_identifiers([
            self.junction_table.as_str(),
            self.meta.foreign_key.as_str(),
            self.junction_key.as_str(),
        ])?;

        if self.meta.foreign_key == self.junction_key {
            return Err(RelationshipError::InvalidConfiguration(format!(
                "junction table '{}' uses '{}' for both sides of {} <-> {}; set a foreign key or junction key",
                self.junction_table, self.junction_key, self.meta.parent.table, self.meta.related.table
            ))
            .into());
        }
        Ok(())
    }

    fn junction_column(&self, column: &str) -> String {
        format!("{}.{}", self.junction_table, column)
    }

    fn junction(&self) -> ModelResult<QueryBuilder> {
        self.validate()?;
        Ok(QueryBuilder::table(&self.junction_table))
    }

    /// Link a related record to the parent; `false` when the link already exists.
    ///
    /// The existence check and the insert are separate statements. A unique
    /// constraint on `(foreign key, junction key)` is what rules out
    /// duplicates under concurrent calls.
    pub async fn link<'a, T>(&self, executor: &dyn QueryExecutor, target: T) -> ModelResult<bool>
    where
        T: Into<RelatedRef<'a, Related>>,
    {
        let parent_key = self.require_parent_key("link")?;
        let target_key = target.into().resolve("link")?;

        let existing = self
            .junction()?
            .where_eq(self.foreign_key(), &parent_key)
            .where_eq(self.junction_key(), &target_key)
            .count(executor)
            .await?;

        if existing > 0 {
            debug!(junction = %self.junction_table, parent = %parent_key, target = %target_key, "already linked");
            return Ok(false);
        }

        let row = Row::new()
            .with(self.foreign_key(), &parent_key)
            .with(self.junction_key(), &target_key);
        let inserted = self.junction()?.insert(executor, row).await?;

        debug!(junction = %self.junction_table, parent = %parent_key, target = %target_key, inserted, "linked");
        Ok(inserted)
    }

    /// Remove the link to one related record
    pub async fn unlink<'a, T>(&self, executor: &dyn QueryExecutor, target: T) -> ModelResult<bool>
    where
        T: Into<RelatedRef<'a, Related>>,
    {
        self.remove_links("unlink", executor, Some(target.into())).await
    }

    /// Remove every link of the parent
    pub async fn unlink_all(&self, executor: &dyn QueryExecutor) -> ModelResult<bool> {
        self.remove_links("unlink_all", executor, None).await
    }

    /// Remove the link to `target`, or every link when `None`; `true` when rows were deleted
    pub async fn detach(
        &self,
        executor: &dyn QueryExecutor,
        target: Option<RelatedRef<'_, Related>>,
    ) -> ModelResult<bool> {
        self.remove_links("detach", executor, target).await
    }

    async fn remove_links(
        &self,
        operation: &str,
        executor: &dyn QueryExecutor,
        target: Option<RelatedRef<'_, Related>>,
    ) -> ModelResult<bool> {
        let parent_key = self.require_parent_key(operation)?;
        let target_key = target.map(|target| target.resolve(operation)).transpose()?;

        let mut query = self.junction()?.where_eq(self.foreign_key(), &parent_key);
        if let Some(target_key) = &target_key {
            query = query.where_eq(self.junction_key(), target_key);
        }

        let deleted = query.delete(executor).await?;
        debug!(junction = %self.junction_table, parent = %parent_key, ?target_key, deleted, "unlinked");
        Ok(deleted > 0)
    }

    /// Make the parent's links exactly `targets`: link the missing, unlink the rest
    pub async fn sync<'a, I, T>(&self, executor: &dyn QueryExecutor, targets: I) -> ModelResult<SyncChanges>
    where
        I: IntoIterator<Item = T>,
        T: Into<RelatedRef<'a, Related>>,
    {
        let parent_key = self.require_parent_key("sync")?;

        let mut wanted = Vec::new();
        let mut wanted_set = HashSet::new();
        for target in targets {
            let key = target.into().resolve("sync")?;
            if wanted_set.insert(key.clone()) {
                wanted.push(key);
            }
        }

        let current: Vec<PrimaryKey> = self
            .junction()?
            .where_eq(self.foreign_key(), &parent_key)
            .set_columns(vec![self.junction_key()])
            .rows(executor)
            .await?
            .iter()
            .filter_map(|row| row.get(self.junction_key()).and_then(PrimaryKey::from_value))
            .collect();
        let current_set: HashSet<&PrimaryKey> = current.iter().collect();

        let mut changes = SyncChanges {
            detached: current.iter().filter(|key| !wanted_set.contains(*key)).cloned().collect(),
            ..SyncChanges::default()
        };

        if !changes.detached.is_empty() {
            self.junction()?
                .where_eq(self.foreign_key(), &parent_key)
                .where_in(self.junction_key(), changes.detached.clone())
                .delete(executor)
                .await?;
        }

        for key in wanted.into_iter().filter(|key| !current_set.contains(key)) {
            let row = Row::new()
                .with(self.foreign_key(), &parent_key)
                .with(self.junction_key(), &key);
            if self.junction()?.insert(executor, row).await? {
                changes.attached.push(key);
            }
        }

        debug!(
            junction = %self.junction_table,
            parent = %parent_key,
            attached = changes.attached.len(),
            detached = changes.detached.len(),
            "synced links"
        );
        Ok(changes)
    }
}

impl<Parent, Related> Relationship<Related> for ManyToMany<Parent, Related>
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
        self.validate()?;
        Ok(Related::query().join(
            &self.junction_table,
            &self.junction_column(&self.junction_key),
            &self.meta.related.qualified_primary_key(),
        ))
    }

    fn lazy_criterion(&self, query: QueryBuilder<Related>, parent_key: &PrimaryKey) -> QueryBuilder<Related> {
        query.where_eq(&self.junction_column(&self.meta.foreign_key), parent_key)
    }

    fn eager_criterion(&self, query: QueryBuilder<Related>, keys: &[PrimaryKey]) -> QueryBuilder<Related> {
        query.where_in(&self.junction_column(&self.meta.foreign_key), keys.to_vec())
    }

    fn select(&self, mode: LoadMode) -> Vec<String> {
        let mut columns = vec![self.meta.related.all_columns()];
        if mode == LoadMode::Eager {
            columns.push(format!(
                "{} AS {}",
                self.junction_column(&self.meta.foreign_key),
                pivot_alias(&self.meta.foreign_key)
            ));
        }
        columns
    }

    fn grouping_column(&self) -> GroupingColumn {
        GroupingColumn::stripped(pivot_alias(&self.meta.foreign_key))
    }
}

impl<Parent, Related> Clone for ManyToMany<Parent, Related> {
    fn clone(&self) -> Self {
        Self {
            meta: self.meta.clone(),
            parent_key: self.parent_key.clone(),
            junction_table: self.junction_table.clone(),
            junction_key: self.junction_key.clone(),
            _marker: PhantomData,
        }
    }
}

impl<Parent, Related> fmt::Debug for ManyToMany<Parent, Related> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManyToMany")
            .field("parent", &self.meta.parent.table)
            .field("related", &self.meta.related.table)
            .field("parent_key", &self.parent_key)
            .field("junction_table", &self.junction_table)
            .field("foreign_key", &self.meta.foreign_key)
            .field("junction_key", &self.junction_key)
            .finish()
    }
}
