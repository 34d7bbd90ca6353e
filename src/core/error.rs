use thiserror::Error;
use super::oid::{Oid, RelKind};

#[derive(Error, Debug)]
pub enum MigrateError {
    #[error("must be superuser to use {0} function")]
    PermissionDenied(String),
    #[error("invalid trigger call: {0}")]
    InvalidTriggerCall(String),
    #[error("invalid change log entry {sequence}: neither key nor row image present")]
    InvalidLogEntry { sequence: String },
    #[error("unexpected index definition: {0}")]
    UnsupportedIndexDefinition(String),
    #[error("cache lookup failed for relation {0}")]
    RelationNotFound(Oid),
    #[error("relation \"{0}\" does not exist")]
    RelationNameNotFound(String),
    #[error("operator class \"{opclass}\" does not exist for access method \"{access_method}\"")]
    OpClassNotFound { opclass: String, access_method: String },
    #[error("missing operator {strategy}({left},{right}) in opfamily {family}")]
    MissingOperator { strategy: i16, left: Oid, right: Oid, family: Oid },
    #[error("index {index} has no attribute at position {position}")]
    AttributeNotFound { index: Oid, position: usize },
    #[error("no swap target for {0}")]
    ShadowNotFound(String),
    #[error("Could not find index '{name}', found {found} matches")]
    AmbiguousShadow { name: String, found: usize },
    #[error("unexpected toast relations (T1={toast1}, I1={index1}, T2={toast2}, I2={index2})")]
    UnexpectedToastTopology { toast1: Oid, index1: Oid, toast2: Oid, index2: Oid },
    #[error("expected one dependency record for TOAST table {toast}, found {found}")]
    DependencyCount { toast: Oid, found: usize },
    #[error("cannot swap {left_kind} {left} with {right_kind} {right}")]
    KindMismatch { left: Oid, left_kind: RelKind, right: Oid, right_kind: RelKind },
    #[error("relation \"{0}\" already exists")]
    NameConflict(String),
    #[error("unexpected result for \"{sql}\": expected {expected}, got {actual}")]
    UnexpectedResult { sql: String, expected: String, actual: String },
    #[error("statement failed (query={sql}): {message}")]
    Execution { sql: String, message: String },
    #[error("Config error: {0}")]
    Config(#[from] config::ConfigError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Binary Serialization error: {0}")]
    BinarySerialization(String),
}

pub type Result<T, E = MigrateError> = std::result::Result<T, E>;
