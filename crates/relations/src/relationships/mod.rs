//! Relationships - association plans, eager loading and result grouping

pub mod eager;
pub mod grouping;
pub mod has_many;
pub mod many_to_many;
pub mod result_set;
pub mod traits;

#[cfg(test)]
mod test_models;


#[cfg(test)]
mod eager_loading_tests;

pub use eager::{load_includes, merge_include, EagerConstraint, EagerInclude};
pub use grouping::{GroupingColumn, ResultGrouper};
pub use has_many::HasMany;
pub use many_to_many::{pivot_alias, ManyToMany, RelatedRef, SyncChanges, PIVOT_PREFIX};
pub use result_set::{RelatedSets, ResultSet};
pub use traits::{LoadMode, RelationMeta, Relationship};
