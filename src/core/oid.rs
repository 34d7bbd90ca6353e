use serde::{Deserialize, Serialize};
use std::fmt;

/// Catalog object identifier
///
/// Zero is never assigned to a live object and stands for "no object",
/// e.g. a table without auxiliary storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Oid(pub u32);

impl Oid {
    pub const INVALID: Self = Self(0);

    #[must_use]
    pub const fn is_valid(self) -> bool {
        self.0 != 0
    }

    /// `Some(self)` for a live identifier, `None` for `INVALID`
    #[must_use]
    pub const fn valid(self) -> Option<Self> {
        if self.is_valid() { Some(self) } else { None }
    }
}

impl fmt::Display for Oid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for Oid {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

/// Well-known type identifiers (same numbering as the PostgreSQL catalog)
pub mod type_oid {
    use super::Oid;

    pub const BOOL: Oid = Oid(16);
    pub const BYTEA: Oid = Oid(17);
    pub const INT8: Oid = Oid(20);
    pub const INT2: Oid = Oid(21);
    pub const INT4: Oid = Oid(23);
    pub const TEXT: Oid = Oid(25);
    pub const OID: Oid = Oid(26);
    pub const JSON: Oid = Oid(114);
    pub const FLOAT8: Oid = Oid(701);
    pub const BPCHAR: Oid = Oid(1042);
    pub const VARCHAR: Oid = Oid(1043);
    pub const DATE: Oid = Oid(1082);
    pub const TIMESTAMP: Oid = Oid(1114);
    pub const TIMESTAMPTZ: Oid = Oid(1184);
    pub const NUMERIC: Oid = Oid(1700);
    pub const UUID: Oid = Oid(2950);
    pub const JSONB: Oid = Oid(3802);
    /// Generic composite row type
    pub const RECORD: Oid = Oid(2249);
}

/// Relation kinds that take part in a swap
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RelKind {
    Table,
    Index,
    /// Auxiliary large-object storage of a table
    Toast,
}

impl RelKind {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Table => "table",
            Self::Index => "index",
            Self::Toast => "toast table",
        }
    }

    /// Indexes carry no transaction-visibility watermarks
    #[must_use]
    pub const fn has_visibility_horizon(&self) -> bool {
        !matches!(self, Self::Index)
    }
}

impl fmt::Display for RelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_oid() {
        assert!(!Oid::INVALID.is_valid());
        assert_eq!(Oid::INVALID.valid(), None);
        assert_eq!(Oid(16384).valid(), Some(Oid(16384)));
    }

    #[test]
    fn test_index_has_no_horizon() {
        assert!(RelKind::Table.has_visibility_horizon());
        assert!(RelKind::Toast.has_visibility_horizon());
        assert!(!RelKind::Index.has_visibility_horizon());
    }
}
