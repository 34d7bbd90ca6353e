use crate::catalog::Catalog;
use crate::core::{MigrateConfig, MigrateError, Oid, RelKind, Result};
use std::collections::BTreeMap;

/// Source to shadow mapping of one migration
///
/// Recorded as each shadow object is created, so the swap never has to
/// guess a counterpart by name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShadowMap {
    pub source: Oid,
    pub table: Oid,
    indexes: BTreeMap<Oid, Oid>,
}

impl ShadowMap {
    #[must_use]
    pub const fn new(source: Oid, shadow_table: Oid) -> Self {
        Self { source, table: shadow_table, indexes: BTreeMap::new() }
    }

    /// Records `shadow` as the rebuilt copy of source index `original`
    pub fn record(&mut self, original: Oid, shadow: Oid) {
        self.indexes.insert(original, shadow);
    }

    #[must_use]
    pub fn shadow_of(&self, original: Oid) -> Option<Oid> {
        self.indexes.get(&original).copied()
    }

    /// (original, shadow) index pairs
    pub fn index_pairs(&self) -> impl Iterator<Item = (Oid, Oid)> + '_ {
        self.indexes.iter().map(|(k, v)| (*k, *v))
    }

    /// Rebuilds the mapping of `source` from the `table_<oid>` / `index_<oid>`
    /// names in the migration schema; used to resume an interrupted migration.
    /// Source indexes without a shadow are left unmapped.
    pub fn by_convention<C: Catalog + ?Sized>(
        catalog: &C,
        config: &MigrateConfig,
        source: Oid,
    ) -> Result<Self> {
        let table_name = config.shadow_table_name(source);
        let table = unique_match(catalog, Some(&config.schema), &table_name, RelKind::Table)?
            .ok_or_else(|| MigrateError::ShadowNotFound(format!("{}.{table_name}", config.schema)))?;

        let mut map = Self::new(source, table);
        for index in catalog.indexes_of(source)? {
            let name = config.shadow_index_name(index.index);
            if let Some(shadow) = unique_match(catalog, Some(&config.schema), &name, RelKind::Index)? {
                map.record(index.index, shadow);
            }
        }
        Ok(map)
    }
}

/// The only relation named `name`; more than one match is an error
pub(super) fn unique_match<C: Catalog + ?Sized>(
    catalog: &C,
    namespace: Option<&str>,
    name: &str,
    kind: RelKind,
) -> Result<Option<Oid>> {
    match catalog.find_relations(namespace, name, kind).as_slice() {
        [] => Ok(None),
        [oid] => Ok(Some(*oid)),
        found => Err(MigrateError::AmbiguousShadow { name: name.to_string(), found: found.len() }),
    }
}
