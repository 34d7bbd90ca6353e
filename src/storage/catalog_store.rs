use crate::catalog::MemoryCatalog;
use crate::core::{MigrateError, Result};
use std::fs;
use std::path::{Path, PathBuf};

const SNAPSHOT_FILE: &str = "catalog.db";

/// Bincode snapshots of a [`MemoryCatalog`]
///
/// Lets a dry run of a migration be stopped and resumed: the catalog is saved
/// between steps and the shadow map is rebuilt with `ShadowMap::by_convention`.
pub struct CatalogStore {
    data_dir: PathBuf,
}

impl CatalogStore {
    pub fn new<P: AsRef<Path>>(data_dir: P) -> Result<Self> {
        let data_dir = data_dir.as_ref().to_path_buf();
        fs::create_dir_all(&data_dir)?;
        Ok(Self { data_dir })
    }

    #[must_use]
    pub fn snapshot_path(&self) -> PathBuf {
        self.data_dir.join(SNAPSHOT_FILE)
    }

    /// Writes the catalog snapshot in bincode format
    pub fn save(&self, catalog: &MemoryCatalog) -> Result<()> {
        let encoded = bincode::serialize(catalog)
            .map_err(|e| MigrateError::BinarySerialization(e.to_string()))?;
        // Written to a temporary file first, then renamed over the snapshot
        let tmp_path = self.data_dir.join(format!("{SNAPSHOT_FILE}.tmp"));
        fs::write(&tmp_path, encoded)?;
        fs::rename(tmp_path, self.snapshot_path())?;
        tracing::debug!(path = %self.snapshot_path().display(), "saved catalog snapshot");
        Ok(())
    }

    /// Reads the catalog snapshot; `None` when none was saved yet
    pub fn load(&self) -> Result<Option<MemoryCatalog>> {
        let path = self.snapshot_path();
        if !path.exists() {
            return Ok(None);
        }
        let data = fs::read(path)?;
        let catalog = bincode::deserialize(&data)
            .map_err(|e| MigrateError::BinarySerialization(e.to_string()))?;
        Ok(Some(catalog))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use crate::core::{DataType, Oid};
    use tempfile::TempDir;

    #[test]
    fn test_missing_snapshot() {
        let dir = TempDir::new().unwrap();
        let store = CatalogStore::new(dir.path()).unwrap();
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let store = CatalogStore::new(dir.path().join("nested")).unwrap();

        let mut catalog = MemoryCatalog::with_builtin_opclasses();
        let table = catalog.create_table("public", "orders", Oid(10)).unwrap();
        let (toast, _) = catalog.create_toast(table).unwrap();
        let index = catalog
            .create_index(
                table,
                "orders_pkey",
                "CREATE UNIQUE INDEX orders_pkey ON public.orders USING btree (id)",
                vec![DataType::BigInt],
            )
            .unwrap();
        catalog.invalidate_relation(table);
        store.save(&catalog).unwrap();

        let loaded = store.load().unwrap().unwrap();
        assert_eq!(loaded.relation(table).unwrap(), catalog.relation(table).unwrap());
        assert_eq!(loaded.relation(table).unwrap().toast_relid, toast);
        assert_eq!(loaded.index_definition(index).unwrap(), catalog.index_definition(index).unwrap());
        assert!(loaded.opclass_by_name("btree", "text_pattern_ops").is_ok());
        // Invalidations belong to the session that sent them
        assert!(loaded.invalidations().is_empty());

        // Oids keep counting from where the saved catalog stopped
        let mut loaded = loaded;
        let next = loaded.create_table("public", "next", Oid(10)).unwrap();
        assert!(next > index);
    }

    #[test]
    fn test_corrupt_snapshot() {
        let dir = TempDir::new().unwrap();
        let store = CatalogStore::new(dir.path()).unwrap();
        fs::write(store.snapshot_path(), b"not a catalog").unwrap();
        assert!(matches!(store.load(), Err(MigrateError::BinarySerialization(_))));
    }
}
