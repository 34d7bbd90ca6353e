use serde::{Deserialize, Serialize};
use crate::core::Oid;

/// Access method whose operator classes define sort order
pub const BTREE_AM: &str = "btree";

/// "Less than" strategy number of btree operator families
pub const BT_LESS_STRATEGY: i16 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpClass {
    pub oid: Oid,
    pub name: String,
    pub access_method: String,
    pub family: Oid,
    /// Declared input type; `Oid::INVALID` for polymorphic classes
    pub input_type: Oid,
    pub is_default: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operator {
    pub oid: Oid,
    /// Operator symbol, e.g. `<` or `~<~`
    pub name: String,
    pub left: Oid,
    pub right: Oid,
}

/// Operator family membership (`pg_amop` in PostgreSQL terms)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpFamilyMember {
    pub family: Oid,
    pub left: Oid,
    pub right: Oid,
    pub strategy: i16,
    pub operator: Oid,
}
