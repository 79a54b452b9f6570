//! Query Builder WITH Methods - Eager loading instructions on a query

use std::sync::Arc;

use crate::relationships::eager::{merge_include, EagerInclude};

use super::builder::QueryBuilder;

impl<M> QueryBuilder<M> {
    /// Add a relationship to eagerly load; dotted paths (`tags.category`) nest
    pub fn with(mut self, relation: &str) -> Self {
        merge_include(&mut self.includes, EagerInclude::parse(relation));
        self
    }

    /// Add a relationship whose related query is narrowed by `constraint`.
    ///
    /// For a dotted path the constraint applies to the last segment.
    pub fn with_constraint<F>(mut self, relation: &str, constraint: F) -> Self
    where
        F: Fn(QueryBuilder) -> QueryBuilder + Send + Sync + 'static,
    {
        let include = EagerInclude::parse(relation).with_leaf_constraint(Arc::new(constraint));
        merge_include(&mut self.includes, include);
        self
    }
}
