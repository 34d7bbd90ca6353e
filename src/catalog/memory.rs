//! In-process catalog
//!
//! Keeps relation descriptors, index metadata, dependency records and the
//! btree operator class tables in plain maps. Used by tests and by dry runs of
//! a migration; snapshots can be persisted with `storage::CatalogStore`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use crate::core::{type_oid, DataType, MigrateError, Oid, RelKind, Result};
use super::opclass::{OpClass, OpFamilyMember, Operator, BTREE_AM, BT_LESS_STRATEGY};
use super::relation::{Dependency, DependencyKind, IndexInfo, RelationDescriptor};
use super::Catalog;

/// Namespace toast relations live in
pub const TOAST_NAMESPACE: &str = "pg_toast";

// First oid handed out to user objects
const FIRST_NORMAL_OID: u32 = 16384;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryCatalog {
    relations: BTreeMap<Oid, RelationDescriptor>,
    indexes: BTreeMap<Oid, IndexInfo>,
    dependencies: Vec<Dependency>,
    opclasses: Vec<OpClass>,
    operators: BTreeMap<Oid, Operator>,
    opfamily_members: Vec<OpFamilyMember>,
    next_oid: u32,
    #[serde(skip)]
    invalidations: Vec<Oid>,
}

impl Default for MemoryCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryCatalog {
    #[must_use]
    pub fn new() -> Self {
        Self {
            relations: BTreeMap::new(),
            indexes: BTreeMap::new(),
            dependencies: Vec::new(),
            opclasses: Vec::new(),
            operators: BTreeMap::new(),
            opfamily_members: Vec::new(),
            next_oid: FIRST_NORMAL_OID,
            invalidations: Vec::new(),
        }
    }

    /// Catalog preloaded with the btree operator classes the rewriter resolves
    #[must_use]
    pub fn with_builtin_opclasses() -> Self {
        let mut catalog = Self::new();
        // (opclass, family, input type, ordering operator, is_default)
        let builtin = [
            ("int4_ops", Oid(1976), type_oid::INT4, "<", Oid(97), true),
            ("int8_ops", Oid(1976), type_oid::INT8, "<", Oid(412), true),
            ("text_ops", Oid(1994), type_oid::TEXT, "<", Oid(664), true),
            ("text_pattern_ops", Oid(2095), type_oid::TEXT, "~<~", Oid(2314), false),
            ("varchar_pattern_ops", Oid(2095), type_oid::TEXT, "~<~", Oid(2314), false),
            ("bpchar_pattern_ops", Oid(2097), type_oid::BPCHAR, "~<~", Oid(2326), false),
            ("numeric_ops", Oid(1988), type_oid::NUMERIC, "<", Oid(1754), true),
            ("uuid_ops", Oid(2968), type_oid::UUID, "<", Oid(2974), true),
        ];
        for (name, family, input, op_name, op_oid, is_default) in builtin {
            catalog.add_opclass(name, BTREE_AM, family, input, is_default);
            catalog.add_operator(op_oid, op_name, family, input, BT_LESS_STRATEGY);
        }
        catalog
    }

    fn allocate_oid(&mut self) -> Oid {
        let oid = Oid(self.next_oid);
        self.next_oid += 1;
        oid
    }

    /// Registers an operator class and returns its oid
    pub fn add_opclass(
        &mut self,
        name: &str,
        access_method: &str,
        family: Oid,
        input_type: Oid,
        is_default: bool,
    ) -> Oid {
        let oid = self.allocate_oid();
        self.opclasses.push(OpClass {
            oid,
            name: name.to_string(),
            access_method: access_method.to_string(),
            family,
            input_type,
            is_default,
        });
        oid
    }

    /// Registers `name(input, input)` as member `strategy` of `family`
    pub fn add_operator(&mut self, oid: Oid, name: &str, family: Oid, input: Oid, strategy: i16) {
        self.operators.entry(oid).or_insert_with(|| Operator {
            oid,
            name: name.to_string(),
            left: input,
            right: input,
        });
        let member = OpFamilyMember { family, left: input, right: input, strategy, operator: oid };
        if !self.opfamily_members.contains(&member) {
            self.opfamily_members.push(member);
        }
    }

    pub fn create_table(&mut self, namespace: &str, name: &str, owner: Oid) -> Result<Oid> {
        self.ensure_name_free(namespace, name)?;
        let oid = self.allocate_oid();
        self.relations
            .insert(oid, RelationDescriptor::new(oid, namespace, name, RelKind::Table, owner));
        Ok(oid)
    }

    /// Gives `table` auxiliary storage named after its oid; returns (toast, toast index)
    pub fn create_toast(&mut self, table: Oid) -> Result<(Oid, Oid)> {
        let owner = self.relation(table)?.owner;
        let name = format!("pg_toast_{table}");
        let index_name = format!("pg_toast_{table}_index");
        self.ensure_name_free(TOAST_NAMESPACE, &name)?;
        self.ensure_name_free(TOAST_NAMESPACE, &index_name)?;

        let toast = self.allocate_oid();
        self.relations.insert(
            toast,
            RelationDescriptor::new(toast, TOAST_NAMESPACE, &name, RelKind::Toast, owner),
        );
        let toast_index = self.allocate_oid();
        self.relations.insert(
            toast_index,
            RelationDescriptor::new(toast_index, TOAST_NAMESPACE, &index_name, RelKind::Index, owner),
        );
        self.indexes.insert(
            toast_index,
            IndexInfo {
                index: toast_index,
                table: toast,
                valid: true,
                definition: format!(
                    "CREATE UNIQUE INDEX {index_name} ON {TOAST_NAMESPACE}.{name} USING btree (chunk_id, chunk_seq)"
                ),
                attribute_types: vec![DataType::ObjectId, DataType::Integer],
            },
        );

        self.relation_mut(table)?.toast_relid = toast;
        self.dependencies.push(Dependency {
            dependent: toast,
            referenced: table,
            kind: DependencyKind::Internal,
        });
        Ok((toast, toast_index))
    }

    /// Creates an index on `table`. `definition` is the canonical text the
    /// catalog hands back from [`Catalog::index_definition`].
    pub fn create_index(
        &mut self,
        table: Oid,
        name: &str,
        definition: &str,
        attribute_types: Vec<DataType>,
    ) -> Result<Oid> {
        let table_rel = self.relation(table)?;
        self.ensure_name_free(&table_rel.namespace, name)?;
        let oid = self.allocate_oid();
        self.relations.insert(
            oid,
            RelationDescriptor::new(oid, &table_rel.namespace, name, RelKind::Index, table_rel.owner),
        );
        self.indexes.insert(
            oid,
            IndexInfo {
                index: oid,
                table,
                valid: true,
                definition: definition.to_string(),
                attribute_types,
            },
        );
        self.dependencies.push(Dependency {
            dependent: oid,
            referenced: table,
            kind: DependencyKind::Auto,
        });
        Ok(oid)
    }

    pub fn relation_mut(&mut self, oid: Oid) -> Result<&mut RelationDescriptor> {
        self.relations.get_mut(&oid).ok_or(MigrateError::RelationNotFound(oid))
    }

    pub fn set_index_valid(&mut self, index: Oid, valid: bool) -> Result<()> {
        self.indexes
            .get_mut(&index)
            .map(|info| info.valid = valid)
            .ok_or(MigrateError::RelationNotFound(index))
    }

    /// Relations invalidated so far, in order
    #[must_use]
    pub fn invalidations(&self) -> &[Oid] {
        &self.invalidations
    }

    /// Oid of the relation called `name` in `namespace`
    pub fn relation_by_name(&self, namespace: &str, name: &str) -> Result<Oid> {
        self.relations
            .values()
            .find(|r| r.namespace == namespace && r.name == name)
            .map(|r| r.oid)
            .ok_or_else(|| MigrateError::RelationNameNotFound(format!("{namespace}.{name}")))
    }

    fn ensure_name_free(&self, namespace: &str, name: &str) -> Result<()> {
        if self.relations.values().any(|r| r.namespace == namespace && r.name == name) {
            return Err(MigrateError::NameConflict(format!("{namespace}.{name}")));
        }
        Ok(())
    }
}

impl Catalog for MemoryCatalog {
    fn relation(&self, oid: Oid) -> Result<RelationDescriptor> {
        self.relations.get(&oid).cloned().ok_or(MigrateError::RelationNotFound(oid))
    }

    fn update_relation_pair(
        &mut self,
        first: &RelationDescriptor,
        second: &RelationDescriptor,
    ) -> Result<()> {
        for rel in [first, second] {
            if !self.relations.contains_key(&rel.oid) {
                return Err(MigrateError::RelationNotFound(rel.oid));
            }
        }
        self.relations.insert(first.oid, first.clone());
        self.relations.insert(second.oid, second.clone());
        Ok(())
    }

    fn rename_relation(&mut self, oid: Oid, new_name: &str) -> Result<()> {
        let namespace = self.relation(oid)?.namespace;
        if self
            .relations
            .values()
            .any(|r| r.oid != oid && r.namespace == namespace && r.name == new_name)
        {
            return Err(MigrateError::NameConflict(format!("{namespace}.{new_name}")));
        }
        self.relation_mut(oid)?.name = new_name.to_string();
        Ok(())
    }

    fn change_owner(&mut self, oid: Oid, owner: Oid) -> Result<()> {
        let rel = self.relation(oid)?;
        let mut targets = vec![oid];
        if let Some(toast) = rel.toast_relid.valid() {
            targets.push(toast);
            targets.extend(self.toast_index(toast));
        }
        targets.extend(self.indexes.values().filter(|i| i.table == oid).map(|i| i.index));

        for target in targets {
            self.relation_mut(target)?.owner = owner;
        }
        Ok(())
    }

    fn dependencies_of(&self, dependent: Oid) -> Vec<Dependency> {
        self.dependencies.iter().filter(|d| d.dependent == dependent).copied().collect()
    }

    fn delete_dependencies_for(&mut self, dependent: Oid) -> Result<usize> {
        let before = self.dependencies.len();
        self.dependencies.retain(|d| d.dependent != dependent);
        Ok(before - self.dependencies.len())
    }

    fn record_dependency(&mut self, dependency: Dependency) -> Result<()> {
        for oid in [dependency.dependent, dependency.referenced] {
            if !self.relations.contains_key(&oid) {
                return Err(MigrateError::RelationNotFound(oid));
            }
        }
        self.dependencies.push(dependency);
        Ok(())
    }

    fn invalidate_relation(&mut self, oid: Oid) {
        self.invalidations.push(oid);
    }

    fn atomically<T, F>(&mut self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Self) -> Result<T>,
    {
        let saved = self.clone();
        match f(self) {
            Ok(value) => Ok(value),
            Err(err) => {
                let invalidations = std::mem::take(&mut self.invalidations);
                *self = saved;
                self.invalidations = invalidations;
                Err(err)
            }
        }
    }

    fn index(&self, index: Oid) -> Result<IndexInfo> {
        self.indexes.get(&index).cloned().ok_or(MigrateError::RelationNotFound(index))
    }

    fn indexes_of(&self, table: Oid) -> Result<Vec<IndexInfo>> {
        self.relation(table)?;
        Ok(self.indexes.values().filter(|i| i.table == table).cloned().collect())
    }

    fn find_relations(&self, namespace: Option<&str>, name: &str, kind: RelKind) -> Vec<Oid> {
        self.relations
            .values()
            .filter(|r| r.kind == kind && r.name == name)
            .filter(|r| namespace.is_none_or(|ns| r.namespace == ns))
            .map(|r| r.oid)
            .collect()
    }

    fn toast_index(&self, toast: Oid) -> Option<Oid> {
        self.indexes.values().find(|i| i.table == toast && i.valid).map(|i| i.index)
    }

    fn opclass_by_name(&self, access_method: &str, name: &str) -> Result<OpClass> {
        self.opclasses
            .iter()
            .find(|c| c.access_method == access_method && c.name == name)
            .cloned()
            .ok_or_else(|| MigrateError::OpClassNotFound {
                opclass: name.to_string(),
                access_method: access_method.to_string(),
            })
    }

    fn opfamily_member(&self, family: Oid, left: Oid, right: Oid, strategy: i16) -> Option<Operator> {
        self.opfamily_members
            .iter()
            .find(|m| m.family == family && m.left == left && m.right == right && m.strategy == strategy)
            .and_then(|m| self.operators.get(&m.operator))
            .cloned()
    }
}
