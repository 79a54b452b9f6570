//! Primary Key System - Hashable key values used to match related rows to parents
//!
//! Integer keys read back as `INT4` or `INT8` both become [`PrimaryKey::Integer`],
//! so a key from a junction column groups with the parent key it references.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::value::DatabaseValue;

/// Primary key types supported by the ORM
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PrimaryKey {
    /// Auto-incrementing integer primary key
    Integer(i64),
    /// UUID primary key
    Uuid(Uuid),
    /// Natural string key
    String(String),
}

impl std::fmt::Display for PrimaryKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PrimaryKey::Integer(id) => write!(f, "{}", id),
            PrimaryKey::Uuid(id) => write!(f, "{}", id),
            PrimaryKey::String(id) => write!(f, "{}", id),
        }
    }
}

impl PrimaryKey {
    /// Read a key from a column value; `None` for null and non-key types
    pub fn from_value(value: &DatabaseValue) -> Option<Self> {
        match value {
            DatabaseValue::Int32(id) => Some(PrimaryKey::Integer(i64::from(*id))),
            DatabaseValue::Int64(id) => Some(PrimaryKey::Integer(*id)),
            DatabaseValue::Uuid(id) => Some(PrimaryKey::Uuid(*id)),
            DatabaseValue::String(id) => Some(PrimaryKey::String(id.clone())),
            _ => None,
        }
    }

    /// Extract as i64 if this is an Integer primary key
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            PrimaryKey::Integer(id) => Some(*id),
            _ => None,
        }
    }
}

impl From<PrimaryKey> for DatabaseValue {
    fn from(key: PrimaryKey) -> Self {
        match key {
            PrimaryKey::Integer(id) => DatabaseValue::Int64(id),
            PrimaryKey::Uuid(id) => DatabaseValue::Uuid(id),
            PrimaryKey::String(id) => DatabaseValue::String(id),
        }
    }
}

impl From<&PrimaryKey> for DatabaseValue {
    fn from(key: &PrimaryKey) -> Self {
        key.clone().into()
    }
}

impl From<i64> for PrimaryKey {
    fn from(id: i64) -> Self {
        PrimaryKey::Integer(id)
    }
}

impl From<i32> for PrimaryKey {
    fn from(id: i32) -> Self {
        PrimaryKey::Integer(i64::from(id))
    }
}

impl From<Uuid> for PrimaryKey {
    fn from(id: Uuid) -> Self {
        PrimaryKey::Uuid(id)
    }
}

impl From<&str> for PrimaryKey {
    fn from(id: &str) -> Self {
        PrimaryKey::String(id.to_string())
    }
}
