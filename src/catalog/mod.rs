//! Catalog access used by the rewriter and the swap engine
//!
//! The migration core never touches storage directly: every lookup and
//! metadata change goes through [`Catalog`]. Locks are the caller's business;
//! the swap assumes the source table is already held exclusively.

pub mod relation;
pub mod opclass;
pub mod memory;

pub use relation::{Dependency, DependencyKind, IndexInfo, RelationDescriptor};
pub use opclass::{OpClass, OpFamilyMember, Operator, BTREE_AM, BT_LESS_STRATEGY};
pub use memory::MemoryCatalog;

use crate::core::{MigrateError, Oid, RelKind, Result};
use crate::parser::{quote_identifier, quote_qualified_identifier};

pub trait Catalog {
    fn relation(&self, oid: Oid) -> Result<RelationDescriptor>;

    /// Writes both descriptors back as one metadata update: either both
    /// rows change or neither does.
    fn update_relation_pair(
        &mut self,
        first: &RelationDescriptor,
        second: &RelationDescriptor,
    ) -> Result<()>;

    /// Renames within the relation's namespace; fails on a name already taken
    fn rename_relation(&mut self, oid: Oid, new_name: &str) -> Result<()>;

    /// Changes the owner of a table together with its indexes and toast relation
    fn change_owner(&mut self, oid: Oid, owner: Oid) -> Result<()>;

    /// Dependency records whose dependent is `dependent`
    fn dependencies_of(&self, dependent: Oid) -> Vec<Dependency>;

    /// Removes every dependency record whose dependent is `dependent`, returns how many
    fn delete_dependencies_for(&mut self, dependent: Oid) -> Result<usize>;

    fn record_dependency(&mut self, dependency: Dependency) -> Result<()>;

    /// Drops cached descriptors of `oid` held by the current session
    fn invalidate_relation(&mut self, oid: Oid);

    /// Runs `f` as one metadata transaction: when `f` fails, none of its
    /// changes stay visible. Invalidations already sent are kept.
    fn atomically<T, F>(&mut self, f: F) -> Result<T>
    where
        Self: Sized,
        F: FnOnce(&mut Self) -> Result<T>;

    fn index(&self, index: Oid) -> Result<IndexInfo>;

    fn indexes_of(&self, table: Oid) -> Result<Vec<IndexInfo>>;

    /// All relations of `kind` named `name` (in `namespace`, if given)
    fn find_relations(&self, namespace: Option<&str>, name: &str, kind: RelKind) -> Vec<Oid>;

    /// Valid index of a toast relation
    fn toast_index(&self, toast: Oid) -> Option<Oid>;

    fn opclass_by_name(&self, access_method: &str, name: &str) -> Result<OpClass>;

    fn opfamily_member(&self, family: Oid, left: Oid, right: Oid, strategy: i16) -> Option<Operator>;

    fn index_definition(&self, index: Oid) -> Result<String> {
        Ok(self.index(index)?.definition)
    }

    /// Relation name quoted as the index reconstruction prints it
    fn quoted_relation_name(&self, oid: Oid) -> Result<String> {
        Ok(quote_identifier(&self.relation(oid)?.name))
    }

    /// `schema.name`, always qualified
    fn qualified_relation_name(&self, oid: Oid) -> Result<String> {
        let rel = self.relation(oid)?;
        Ok(quote_qualified_identifier(Some(&rel.namespace), &rel.name))
    }

    /// Physical type of the index attribute at `position` (zero based)
    fn index_attribute_type(&self, index: Oid, position: usize) -> Result<Oid> {
        self.index(index)?
            .attribute_types
            .get(position)
            .map(crate::core::DataType::type_oid)
            .ok_or(MigrateError::AttributeNotFound { index, position })
    }
}
