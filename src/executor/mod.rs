//! Statement execution seam
//!
//! The capture trigger, the replay engine and the swap all run generated
//! SQL text through a [`StatementExecutor`]. A backend binding implements it
//! on top of its own plan machinery; [`MemoryExecutor`] implements it for a
//! single migration held in memory.

pub mod plan_cache;
pub mod memory;

pub use plan_cache::{CachedPlan, PlanCache};
pub use memory::MemoryExecutor;

use crate::core::{MigrateError, Oid, Result, Value};

/// Opaque handle of a prepared statement, valid for the executor that issued it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PlanHandle(pub u64);

/// What kind of statement produced an [`Outcome`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeKind {
    Select,
    Insert,
    Update,
    Delete,
    Utility,
}

impl OutcomeKind {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Select => "SELECT",
            Self::Insert => "INSERT",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
            Self::Utility => "UTILITY",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMeta {
    pub name: String,
    pub type_oid: Oid,
}

impl ColumnMeta {
    #[must_use]
    pub fn new(name: &str, type_oid: Oid) -> Self {
        Self { name: name.to_string(), type_oid }
    }
}

/// Result of one statement
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    pub kind: OutcomeKind,
    /// Rows returned (SELECT) or affected (DML)
    pub processed: u64,
    pub columns: Vec<ColumnMeta>,
    pub rows: Vec<Vec<Value>>,
}

impl Outcome {
    #[must_use]
    pub const fn affected(kind: OutcomeKind, processed: u64) -> Self {
        Self { kind, processed, columns: Vec::new(), rows: Vec::new() }
    }

    #[must_use]
    pub fn rows(columns: Vec<ColumnMeta>, rows: Vec<Vec<Value>>) -> Self {
        Self {
            kind: OutcomeKind::Select,
            processed: rows.len() as u64,
            columns,
            rows,
        }
    }

    /// Fails unless the statement was of the `expected` kind
    pub fn expect(self, expected: OutcomeKind, sql: &str) -> Result<Self> {
        if self.kind == expected {
            Ok(self)
        } else {
            Err(MigrateError::UnexpectedResult {
                sql: sql.to_string(),
                expected: expected.as_str().to_string(),
                actual: self.kind.as_str().to_string(),
            })
        }
    }

    /// Type of result column `index` (zero based)
    pub fn column_type(&self, index: usize, sql: &str) -> Result<Oid> {
        self.columns.get(index).map(|c| c.type_oid).ok_or_else(|| MigrateError::UnexpectedResult {
            sql: sql.to_string(),
            expected: format!("at least {} result columns", index + 1),
            actual: self.columns.len().to_string(),
        })
    }
}

pub trait StatementExecutor {
    /// Prepares `sql` with parameters `$1..$n` of the given types
    fn prepare(&mut self, sql: &str, arg_types: &[Oid]) -> Result<PlanHandle>;

    /// Runs a prepared statement; `Value::Null` binds SQL NULL
    fn execute_plan(&mut self, plan: PlanHandle, args: &[Value]) -> Result<Outcome>;

    /// Runs a statement without parameters
    fn execute(&mut self, sql: &str) -> Result<Outcome>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expect_kind() {
        let outcome = Outcome::affected(OutcomeKind::Insert, 1);
        assert!(outcome.clone().expect(OutcomeKind::Insert, "INSERT ...").is_ok());

        let err = outcome.expect(OutcomeKind::Delete, "INSERT ...").unwrap_err();
        assert_eq!(
            err.to_string(),
            "unexpected result for \"INSERT ...\": expected DELETE, got INSERT"
        );
    }

    #[test]
    fn test_column_type() {
        let outcome = Outcome::rows(vec![ColumnMeta::new("id", Oid(20))], vec![]);
        assert_eq!(outcome.processed, 0);
        assert_eq!(outcome.column_type(0, "q").unwrap(), Oid(20));
        assert!(outcome.column_type(2, "q").is_err());
    }
}
