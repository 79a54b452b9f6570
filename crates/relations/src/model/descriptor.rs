//! Table descriptors - schema-level names of a model, captured as a value

use super::core_trait::Model;

/// Table, primary key and foreign key names of a model
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableDescriptor {
    pub table: String,
    pub primary_key: String,
    pub foreign_key: String,
}

impl TableDescriptor {
    /// Capture the names a model declares
    pub fn of<M: Model>() -> Self {
        Self {
            table: M::table_name().to_string(),
            primary_key: M::primary_key_name().to_string(),
            foreign_key: M::foreign_key_name(),
        }
    }

    /// `table.column`
    pub fn qualified(&self, column: &str) -> String {
        format!("{}.{}", self.table, column)
    }

    /// `table.<primary key>`
    pub fn qualified_primary_key(&self) -> String {
        self.qualified(&self.primary_key)
    }

    /// `table.*`
    pub fn all_columns(&self) -> String {
        self.qualified("*")
    }
}
