//! Related collections and the per-record slots that hold them

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Ordered collection of records returned by a query or attached by eager loading
#[derive(Debug, Clone, PartialEq)]
pub struct ResultSet<T> {
    items: Vec<T>,
}

impl<T> Default for ResultSet<T> {
    fn default() -> Self {
        Self { items: Vec::new() }
    }
}

impl<T> ResultSet<T> {
    pub fn new(items: Vec<T>) -> Self {
        Self { items }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    pub fn first(&self) -> Option<&T> {
        self.items.first()
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        self.items.get(index)
    }

    pub fn into_vec(self) -> Vec<T> {
        self.items
    }
}

impl<T> IntoIterator for ResultSet<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'a, T> IntoIterator for &'a ResultSet<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl<T> FromIterator<T> for ResultSet<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// Named slots of related collections on one record
///
/// Each slot holds a `ResultSet` of whatever related type the relation
/// produces; readers name the type they expect.
#[derive(Clone, Default)]
pub struct RelatedSets {
    slots: HashMap<String, Arc<dyn Any + Send + Sync>>,
}

impl RelatedSets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `set` under `relation`, replacing any previous value
    pub fn set<R: Send + Sync + 'static>(&mut self, relation: &str, set: ResultSet<R>) {
        self.slots.insert(relation.to_string(), Arc::new(set));
    }

    /// The collection under `relation`, if loaded with records of type `R`
    pub fn get<R: 'static>(&self, relation: &str) -> Option<&ResultSet<R>> {
        self.slots.get(relation)?.downcast_ref::<ResultSet<R>>()
    }

    pub fn is_loaded(&self, relation: &str) -> bool {
        self.slots.contains_key(relation)
    }

    pub fn remove(&mut self, relation: &str) -> bool {
        self.slots.remove(relation).is_some()
    }

    /// Loaded relation names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.slots.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

impl fmt::Debug for RelatedSets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RelatedSets")
            .field("loaded", &self.names())
            .finish()
    }
}
