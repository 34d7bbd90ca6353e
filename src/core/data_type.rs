use serde::{Deserialize, Serialize};
use super::oid::{type_oid, Oid};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum DataType {
    // Numeric types
    SmallInt,
    Integer,
    BigInt,
    Real,
    Numeric { precision: u8, scale: u8 },
    // String types
    Text,
    Varchar { max_length: usize },
    Char { length: usize },
    Boolean,
    // Date/Time types
    Date,
    Timestamp,
    TimestampTz,
    // Special types
    Uuid,
    Json,
    Jsonb,
    Bytea,
    /// Object identifier
    ObjectId,
    /// Composite type registered in the catalog (row types, primary-key types)
    Composite { type_oid: Oid },
}

impl DataType {
    /// Physical type identifier of a column of this type
    #[must_use]
    pub const fn type_oid(&self) -> Oid {
        match self {
            Self::SmallInt => type_oid::INT2,
            Self::Integer => type_oid::INT4,
            Self::BigInt => type_oid::INT8,
            Self::Real => type_oid::FLOAT8,
            Self::Numeric { .. } => type_oid::NUMERIC,
            Self::Text => type_oid::TEXT,
            Self::Varchar { .. } => type_oid::VARCHAR,
            Self::Char { .. } => type_oid::BPCHAR,
            Self::Boolean => type_oid::BOOL,
            Self::Date => type_oid::DATE,
            Self::Timestamp => type_oid::TIMESTAMP,
            Self::TimestampTz => type_oid::TIMESTAMPTZ,
            Self::Uuid => type_oid::UUID,
            Self::Json => type_oid::JSON,
            Self::Jsonb => type_oid::JSONB,
            Self::Bytea => type_oid::BYTEA,
            Self::ObjectId => type_oid::OID,
            Self::Composite { type_oid } => *type_oid,
        }
    }
}
