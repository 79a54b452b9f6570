//! Result Grouper - matches eagerly fetched related rows to their parents
//!
//! Related rows arrive as one stream for the whole batch. Each row carries the
//! parent key in a grouping column; the grouper reads it, optionally strips it,
//! hydrates the row and later hands every parent its own ordered group.

use std::collections::HashMap;

use tracing::debug;

use crate::error::{ModelResult, RelationshipError};
use crate::model::{Model, PrimaryKey};
use crate::row::Row;

use super::result_set::ResultSet;

/// Column of an eagerly fetched row that holds the owning parent's key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupingColumn {
    pub name: String,
    /// Remove the column before hydration; set when it is not part of the related record
    pub strip: bool,
}

impl GroupingColumn {
    pub fn kept(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            strip: false,
        }
    }

    pub fn stripped(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            strip: true,
        }
    }
}

/// Related records keyed by parent, in executor order
#[derive(Debug)]
pub struct ResultGrouper<R> {
    keys: Vec<PrimaryKey>,
    records: Vec<R>,
}

impl<R> Default for ResultGrouper<R> {
    fn default() -> Self {
        Self {
            keys: Vec::new(),
            records: Vec::new(),
        }
    }
}

impl<R> ResultGrouper<R> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a record owned by the parent with `key`
    pub fn push(&mut self, key: PrimaryKey, record: R) {
        self.keys.push(key);
        self.records.push(record);
    }

    /// Read the parent key from each row, then hydrate and push it
    pub fn group_rows<F>(
        &mut self,
        rows: Vec<Row>,
        column: &GroupingColumn,
        table: &str,
        mut hydrate: F,
    ) -> ModelResult<()>
    where
        F: FnMut(Row) -> ModelResult<R>,
    {
        self.keys.reserve(rows.len());
        self.records.reserve(rows.len());

        for mut row in rows {
            let value = if column.strip {
                row.remove(&column.name)
            } else {
                row.get(&column.name).cloned()
            };

            let key = value
                .as_ref()
                .and_then(PrimaryKey::from_value)
                .ok_or_else(|| RelationshipError::MissingGroupingColumn {
                    column: column.name.clone(),
                    table: table.to_string(),
                })?;

            self.push(key, hydrate(row)?);
        }
        Ok(())
    }

    /// Grouped records, for loading deeper relations before attaching
    pub fn records_mut(&mut self) -> &mut [R] {
        &mut self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records grouped by parent key, each group in push order
    pub fn into_groups(self) -> HashMap<PrimaryKey, Vec<R>> {
        let mut groups: HashMap<PrimaryKey, Vec<R>> = HashMap::new();
        for (key, record) in self.keys.into_iter().zip(self.records) {
            groups.entry(key).or_default().push(record);
        }
        groups
    }

    /// Give every parent its group under `relation`; parents without matches get an empty set
    pub fn attach<P: Model>(self, parents: &mut [P], relation: &str)
    where
        R: Clone + Send + Sync + 'static,
    {
        let mut groups = self.into_groups();
        let mut remaining: HashMap<PrimaryKey, usize> = HashMap::new();
        for key in parents.iter().filter_map(P::primary_key) {
            *remaining.entry(key).or_default() += 1;
        }

        let mut matched = 0usize;
        for parent in parents.iter_mut() {
            let group = parent.primary_key().and_then(|key| {
                let uses = remaining.get_mut(&key)?;
                *uses -= 1;
                // Later parents with the same key still need the group
                if *uses == 0 {
                    groups.remove(&key)
                } else {
                    groups.get(&key).cloned()
                }
            });

            if group.is_some() {
                matched += 1;
            }
            parent
                .relations_mut()
                .set(relation, ResultSet::new(group.unwrap_or_default()));
        }

        debug!(relation, parents = parents.len(), matched, "attached related groups");
    }
}
