use serde::{Deserialize, Serialize};
use crate::core::{DataType, Oid, RelKind};

/// Catalog row describing the physical storage of a table, index or toast relation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationDescriptor {
    pub oid: Oid,
    pub name: String,
    pub namespace: String,
    pub kind: RelKind,
    /// On-disk identity, distinct from `oid`
    pub filenode: Oid,
    /// `Oid::INVALID` means the database default tablespace
    pub tablespace: Oid,
    /// Auxiliary large-object storage, `Oid::INVALID` if none
    pub toast_relid: Oid,
    pub owner: Oid,
    /// Frozen transaction watermark (tables and toast relations only)
    pub frozen_xid: u32,
    /// Minimum multi-transaction id (tables and toast relations only)
    pub min_mxid: u32,
    pub pages: i32,
    pub tuples: f32,
    pub all_visible: i32,
}

impl RelationDescriptor {
    #[must_use]
    pub fn new(oid: Oid, namespace: &str, name: &str, kind: RelKind, owner: Oid) -> Self {
        Self {
            oid,
            name: name.to_string(),
            namespace: namespace.to_string(),
            kind,
            filenode: oid,
            tablespace: Oid::INVALID,
            toast_relid: Oid::INVALID,
            owner,
            frozen_xid: 0,
            min_mxid: 0,
            pages: 0,
            tuples: 0.0,
            all_visible: 0,
        }
    }

    /// Fields a file swap exchanges, for before/after comparisons
    #[must_use]
    pub const fn storage_identity(&self) -> (Oid, Oid, Oid) {
        (self.filenode, self.tablespace, self.toast_relid)
    }
}

/// Index metadata the rewriter and the swap need
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexInfo {
    pub index: Oid,
    pub table: Oid,
    /// Invalid indexes (failed concurrent builds) never take part in a swap
    pub valid: bool,
    /// Canonical reconstruction of the index definition
    pub definition: String,
    /// Physical type of each index attribute, in column order
    pub attribute_types: Vec<DataType>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DependencyKind {
    Normal,
    Auto,
    /// Dependent object is an implementation part of the referenced one
    Internal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependency {
    pub dependent: Oid,
    pub referenced: Oid,
    pub kind: DependencyKind,
}
