//! Database layer (Supabase PostgREST tables).

pub mod postgrest;
pub mod rows;

pub use postgrest::PostgrestDb;

use crate::error::AppError;
use async_trait::async_trait;

/// Table names as constants.
pub mod tables {
    pub const PEAKS: &str = "peaks";
    pub const CHECKINS: &str = "checkins";
}

/// An equality filter on a column (`column = value`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    pub column: String,
    pub value: String,
}

impl Filter {
    pub fn eq(column: &str, value: &str) -> Self {
        Self {
            column: column.to_string(),
            value: value.to_string(),
        }
    }

    /// PostgREST query-string form: `(column, "eq.value")`.
    pub fn to_query_pair(&self) -> (String, String) {
        (self.column.clone(), format!("eq.{}", self.value))
    }

    /// Whether a JSON row satisfies this filter.
    pub fn matches(&self, row: &serde_json::Value) -> bool {
        match row.get(&self.column) {
            Some(serde_json::Value::String(s)) => *s == self.value,
            Some(other) if !other.is_null() => other.to_string() == self.value,
            _ => false,
        }
    }
}

/// Row-level table operations of the backend.
///
/// Rows travel as raw JSON in the backend's snake_case convention.
#[async_trait]
pub trait TableGateway: Send + Sync {
    /// Select all columns of the rows matching every filter.
    async fn select(
        &self,
        table: &str,
        filters: &[Filter],
    ) -> Result<Vec<serde_json::Value>, AppError>;

    async fn insert(&self, table: &str, row: serde_json::Value) -> Result<(), AppError>;

    /// Delete the rows matching every filter.
    async fn delete(&self, table: &str, filters: &[Filter]) -> Result<(), AppError>;
}
