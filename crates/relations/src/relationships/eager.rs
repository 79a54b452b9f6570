//! Eager Loading Instructions
//!
//! An [`EagerInclude`] names a relation to resolve for a batch of records,
//! optionally narrowed by an [`EagerConstraint`], with deeper includes that
//! are resolved on the related records in the same pass.

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::backends::QueryExecutor;
use crate::error::ModelResult;
use crate::model::Model;
use crate::query::QueryBuilder;

/// Extra criteria applied to a related query before its batch predicate
pub type EagerConstraint = Arc<dyn Fn(QueryBuilder) -> QueryBuilder + Send + Sync>;

/// A relation to load eagerly, with its own nested includes
#[derive(Clone)]
pub struct EagerInclude {
    relation: String,
    constraint: Option<EagerConstraint>,
    nested: Vec<EagerInclude>,
}

impl EagerInclude {
    pub fn new(relation: &str) -> Self {
        Self {
            relation: relation.to_string(),
            constraint: None,
            nested: Vec::new(),
        }
    }

    /// Parse a dotted path: `tags.category` loads `tags`, then `category` on each tag
    pub fn parse(path: &str) -> Self {
        let mut segments = path.split('.').map(str::trim).filter(|s| !s.is_empty()).rev();

        let leaf = Self::new(segments.next().unwrap_or_default());
        segments.fold(leaf, |child, segment| Self::new(segment).with_nested(child))
    }

    pub fn relation(&self) -> &str {
        &self.relation
    }

    pub fn constraint(&self) -> Option<&EagerConstraint> {
        self.constraint.as_ref()
    }

    pub fn nested(&self) -> &[EagerInclude] {
        &self.nested
    }

    pub fn with_constraint(mut self, constraint: EagerConstraint) -> Self {
        self.constraint = Some(constraint);
        self
    }

    /// Attach `constraint` to the deepest include of a single-path chain
    pub fn with_leaf_constraint(mut self, constraint: EagerConstraint) -> Self {
        match self.nested.last_mut() {
            Some(child) => {
                let leaf = std::mem::replace(child, EagerInclude::new(""));
                *child = leaf.with_leaf_constraint(constraint);
                self
            }
            None => self.with_constraint(constraint),
        }
    }

    pub fn with_nested(mut self, include: EagerInclude) -> Self {
        merge_include(&mut self.nested, include);
        self
    }

    /// Apply the constraint, if any, to a related query
    pub fn apply_constraint<M>(&self, query: QueryBuilder<M>) -> QueryBuilder<M> {
        match &self.constraint {
            Some(constraint) => apply_constraint(constraint, query),
            None => query,
        }
    }
}

impl fmt::Debug for EagerInclude {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EagerInclude")
            .field("relation", &self.relation)
            .field("constrained", &self.constraint.is_some())
            .field("nested", &self.nested)
            .finish()
    }
}

/// Run an untyped constraint over a typed related query
pub(crate) fn apply_constraint<M>(constraint: &EagerConstraint, query: QueryBuilder<M>) -> QueryBuilder<M> {
    (**constraint)(query.retype()).retype()
}

/// Add `include` to `includes`, merging with an existing include of the same relation.
///
/// Nested includes merge recursively; a later constraint replaces an earlier one.
pub fn merge_include(includes: &mut Vec<EagerInclude>, include: EagerInclude) {
    match includes.iter_mut().find(|existing| existing.relation == include.relation) {
        Some(existing) => {
            if include.constraint.is_some() {
                existing.constraint = include.constraint;
            }
            for child in include.nested {
                merge_include(&mut existing.nested, child);
            }
        }
        None => includes.push(include),
    }
}

/// Resolve `includes` on a batch of records, one relation at a time
pub async fn load_includes<M: Model>(
    records: &mut [M],
    includes: &[EagerInclude],
    executor: &dyn QueryExecutor,
) -> ModelResult<()> {
    if records.is_empty() || includes.is_empty() {
        return Ok(());
    }

    for include in includes {
        debug!(
            model = M::table_name(),
            relation = include.relation(),
            records = records.len(),
            "eager loading relation"
        );
        M::load_relation(records, include, executor).await?;
    }
    Ok(())
}
