use crate::catalog::{Catalog, Dependency, DependencyKind};
use crate::core::{MigrateError, Oid, RelKind, Result};
use crate::executor::{OutcomeKind, StatementExecutor};
use crate::parser::quote_identifier;
use super::session::Session;
use super::shadow::{unique_match, ShadowMap};
use super::toast::ToastLayout;
use std::mem;

/// Exchanges physical storage between catalog objects
pub struct SwapExecutor;

impl SwapExecutor {
    /// Swaps the storage identity of two relations of the same kind
    ///
    /// Filenode, tablespace, toast link and size statistics change places
    /// (for non-index relations also the frozen xid and minimum multixact id)
    /// in one catalog update. Toast relations are then re-owned by their new
    /// table and both cached descriptors are dropped. On error the catalog is
    /// left as it was.
    pub fn swap_relation_files<C: Catalog>(catalog: &mut C, first: Oid, second: Oid) -> Result<()> {
        let mut rel1 = catalog.relation(first)?;
        let mut rel2 = catalog.relation(second)?;
        if rel1.kind != rel2.kind {
            return Err(MigrateError::KindMismatch {
                left: first,
                left_kind: rel1.kind,
                right: second,
                right_kind: rel2.kind,
            });
        }

        // Each toast relation hangs off its table through exactly one record
        for toast in [rel1.toast_relid, rel2.toast_relid] {
            if let Some(toast) = toast.valid() {
                let found = catalog.dependencies_of(toast).len();
                if found != 1 {
                    return Err(MigrateError::DependencyCount { toast, found });
                }
            }
        }

        mem::swap(&mut rel1.filenode, &mut rel2.filenode);
        mem::swap(&mut rel1.tablespace, &mut rel2.tablespace);
        mem::swap(&mut rel1.toast_relid, &mut rel2.toast_relid);
        if rel1.kind.has_visibility_horizon() {
            mem::swap(&mut rel1.frozen_xid, &mut rel2.frozen_xid);
            mem::swap(&mut rel1.min_mxid, &mut rel2.min_mxid);
        }
        // The new relation carries fresh statistics
        mem::swap(&mut rel1.pages, &mut rel2.pages);
        mem::swap(&mut rel1.tuples, &mut rel2.tuples);
        mem::swap(&mut rel1.all_visible, &mut rel2.all_visible);

        catalog.atomically(|catalog| {
            catalog.update_relation_pair(&rel1, &rel2)?;
            for (owner, toast) in [(first, rel1.toast_relid), (second, rel2.toast_relid)] {
                let Some(toast) = toast.valid() else { continue };
                let found = catalog.delete_dependencies_for(toast)?;
                if found != 1 {
                    return Err(MigrateError::DependencyCount { toast, found });
                }
                catalog.record_dependency(Dependency {
                    dependent: toast,
                    referenced: owner,
                    kind: DependencyKind::Internal,
                })?;
            }
            Ok(())
        })?;

        catalog.invalidate_relation(first);
        catalog.invalidate_relation(second);

        tracing::debug!(%first, %second, kind = %rel1.kind, "swapped relation files");
        Ok(())
    }

    /// Moves the shadow table into place of `source`
    ///
    /// The caller holds an exclusive lock on `source`. Steps: align the
    /// shadow's owner, swap the tables, swap every valid index with its
    /// shadow, rename toast relations after their new owners and drop the
    /// capture trigger. All of it happens as one catalog transaction.
    pub fn swap_table<C, E>(
        session: &Session,
        catalog: &mut C,
        executor: &mut E,
        source: Oid,
        shadows: &ShadowMap,
    ) -> Result<()>
    where
        C: Catalog,
        E: StatementExecutor + ?Sized,
    {
        session.must_be_superuser("migrate_swap")?;
        if shadows.source != source {
            return Err(MigrateError::ShadowNotFound(format!("table {source}")));
        }
        catalog.atomically(|catalog| Self::swap_table_steps(session, catalog, executor, source, shadows))
    }

    fn swap_table_steps<C, E>(
        session: &Session,
        catalog: &mut C,
        executor: &mut E,
        source: Oid,
        shadows: &ShadowMap,
    ) -> Result<()>
    where
        C: Catalog,
        E: StatementExecutor + ?Sized,
    {
        let source_rel = catalog.relation(source)?;
        let shadow_rel = catalog.relation(shadows.table)?;
        let toast = ToastLayout::capture(catalog, &source_rel, &shadow_rel)?;

        if source_rel.owner != shadow_rel.owner {
            catalog.change_owner(shadow_rel.oid, source_rel.owner)?;
        }

        Self::swap_relation_files(catalog, source, shadow_rel.oid)?;

        let mut swapped = 0;
        for index in catalog.indexes_of(source)?.into_iter().filter(|i| i.valid) {
            let shadow = shadows
                .shadow_of(index.index)
                .ok_or_else(|| MigrateError::ShadowNotFound(format!("index {}", index.index)))?;
            Self::swap_relation_files(catalog, index.index, shadow)?;
            swapped += 1;
        }

        toast.reconcile(catalog, &session.config, source, shadow_rel.oid, session.backend_pid)?;

        let drop_trigger = format!(
            "DROP TRIGGER IF EXISTS {} ON {} CASCADE",
            quote_identifier(&session.config.trigger_name),
            catalog.qualified_relation_name(source)?
        );
        executor.execute(&drop_trigger)?.expect(OutcomeKind::Utility, &drop_trigger)?;

        tracing::info!(
            session = %session.id,
            %source,
            shadow = %shadow_rel.oid,
            indexes = swapped,
            toast = ?toast,
            "swapped table with its shadow"
        );
        Ok(())
    }

    /// Swaps a single index with its rebuilt copy and returns the copy's oid
    ///
    /// Without a recorded mapping the copy is looked up by its name
    /// `index_<original>`, which must match exactly one index.
    pub fn swap_index<C: Catalog>(
        session: &Session,
        catalog: &mut C,
        shadows: &ShadowMap,
        original: Oid,
    ) -> Result<Oid> {
        session.must_be_superuser("migrate_index_swap")?;

        let shadow = match shadows.shadow_of(original) {
            Some(shadow) => shadow,
            None => {
                let name = session.config.shadow_index_name(original);
                unique_match(catalog, None, &name, RelKind::Index)?
                    .ok_or(MigrateError::AmbiguousShadow { name, found: 0 })?
            }
        };

        Self::swap_relation_files(catalog, original, shadow)?;
        tracing::info!(session = %session.id, %original, %shadow, "swapped index with its shadow");
        Ok(shadow)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::MemoryCatalog;
    use crate::core::DataType;

    const OWNER: Oid = Oid(10);

    #[test]
    fn test_swap_relation_files_exchanges_identity() {
        let mut catalog = MemoryCatalog::new();
        let a = catalog.create_table("public", "a", OWNER).unwrap();
        let b = catalog.create_table("public", "b", OWNER).unwrap();
        {
            let rel = catalog.relation_mut(a).unwrap();
            rel.frozen_xid = 100;
            rel.pages = 40;
            rel.tablespace = Oid(1663);
        }
        catalog.relation_mut(b).unwrap().frozen_xid = 900;

        SwapExecutor::swap_relation_files(&mut catalog, a, b).unwrap();

        let (ra, rb) = (catalog.relation(a).unwrap(), catalog.relation(b).unwrap());
        assert_eq!(ra.filenode, b);
        assert_eq!(rb.filenode, a);
        assert_eq!((ra.frozen_xid, rb.frozen_xid), (900, 100));
        assert_eq!((ra.pages, rb.pages), (0, 40));
        assert_eq!((ra.tablespace, rb.tablespace), (Oid::INVALID, Oid(1663)));
        // Logical identity stays
        assert_eq!((ra.name.as_str(), rb.name.as_str()), ("a", "b"));
        assert_eq!(catalog.invalidations(), &[a, b]);
    }

    #[test]
    fn test_index_keeps_horizons() {
        let mut catalog = MemoryCatalog::new();
        let t = catalog.create_table("public", "t", OWNER).unwrap();
        let i1 = catalog
            .create_index(t, "i1", "CREATE INDEX i1 ON public.t USING btree (a)", vec![DataType::Integer])
            .unwrap();
        let i2 = catalog
            .create_index(t, "i2", "CREATE INDEX i2 ON public.t USING btree (a)", vec![DataType::Integer])
            .unwrap();
        catalog.relation_mut(i1).unwrap().frozen_xid = 5;

        SwapExecutor::swap_relation_files(&mut catalog, i1, i2).unwrap();
        assert_eq!(catalog.relation(i1).unwrap().frozen_xid, 5);
        assert_eq!(catalog.relation(i1).unwrap().filenode, i2);
    }

    #[test]
    fn test_kind_mismatch() {
        let mut catalog = MemoryCatalog::new();
        let t = catalog.create_table("public", "t", OWNER).unwrap();
        let i = catalog
            .create_index(t, "i", "CREATE INDEX i ON public.t USING btree (a)", vec![DataType::Integer])
            .unwrap();
        assert!(matches!(
            SwapExecutor::swap_relation_files(&mut catalog, t, i),
            Err(MigrateError::KindMismatch { left_kind: RelKind::Table, right_kind: RelKind::Index, .. })
        ));
        assert_eq!(catalog.relation(t).unwrap().filenode, t);
    }

    #[test]
    fn test_toast_dependencies_follow_owner() {
        let mut catalog = MemoryCatalog::new();
        let a = catalog.create_table("public", "a", OWNER).unwrap();
        let b = catalog.create_table("public", "b", OWNER).unwrap();
        let (toast, _) = catalog.create_toast(b).unwrap();

        SwapExecutor::swap_relation_files(&mut catalog, a, b).unwrap();

        assert_eq!(catalog.relation(a).unwrap().toast_relid, toast);
        assert_eq!(catalog.relation(b).unwrap().toast_relid, Oid::INVALID);
        let deps = catalog.dependencies_of(toast);
        assert_eq!(deps.len(), 1);
        assert_eq!(deps[0].referenced, a);
        assert_eq!(deps[0].kind, DependencyKind::Internal);
    }

    #[test]
    fn test_extra_toast_dependency_is_fatal() {
        let mut catalog = MemoryCatalog::new();
        let a = catalog.create_table("public", "a", OWNER).unwrap();
        let b = catalog.create_table("public", "b", OWNER).unwrap();
        let (toast, _) = catalog.create_toast(a).unwrap();
        catalog
            .record_dependency(Dependency { dependent: toast, referenced: b, kind: DependencyKind::Normal })
            .unwrap();
        let before = (catalog.relation(a).unwrap(), catalog.relation(b).unwrap(), catalog.dependencies_of(toast));

        assert!(matches!(
            SwapExecutor::swap_relation_files(&mut catalog, a, b),
            Err(MigrateError::DependencyCount { found: 2, .. })
        ));
        let after = (catalog.relation(a).unwrap(), catalog.relation(b).unwrap(), catalog.dependencies_of(toast));
        assert_eq!(after, before);
        assert!(catalog.invalidations().is_empty());
    }

    #[test]
    fn test_orphan_toast_is_fatal() {
        let mut catalog = MemoryCatalog::new();
        let a = catalog.create_table("public", "a", OWNER).unwrap();
        let b = catalog.create_table("public", "b", OWNER).unwrap();
        let (toast, _) = catalog.create_toast(b).unwrap();
        catalog.delete_dependencies_for(toast).unwrap();

        assert!(matches!(
            SwapExecutor::swap_relation_files(&mut catalog, a, b),
            Err(MigrateError::DependencyCount { found: 0, .. })
        ));
        assert_eq!(catalog.relation(a).unwrap().toast_relid, Oid::INVALID);
        assert_eq!(catalog.relation(b).unwrap().toast_relid, toast);
        assert!(catalog.dependencies_of(toast).is_empty());
    }

    #[test]
    fn test_failed_index_swap_changes_nothing() {
        let session = Session::superuser("postgres");
        let mut catalog = MemoryCatalog::new();
        let t = catalog.create_table("public", "t", OWNER).unwrap();
        let (toast, _) = catalog.create_toast(t).unwrap();
        let original = catalog
            .create_index(t, "t_a", "CREATE INDEX t_a ON public.t USING btree (a)", vec![DataType::Integer])
            .unwrap();
        let copy = catalog
            .create_index(t, "t_a_copy", "CREATE INDEX t_a_copy ON public.t USING btree (a)", vec![DataType::Integer])
            .unwrap();
        // A second owner record on the toast relation the copy points at
        catalog.relation_mut(copy).unwrap().toast_relid = toast;
        catalog
            .record_dependency(Dependency { dependent: toast, referenced: copy, kind: DependencyKind::Normal })
            .unwrap();
        let mut map = ShadowMap::new(t, Oid::INVALID);
        map.record(original, copy);
        let before = (catalog.relation(original).unwrap(), catalog.relation(copy).unwrap());

        assert!(matches!(
            SwapExecutor::swap_index(&session, &mut catalog, &map, original),
            Err(MigrateError::DependencyCount { found: 2, .. })
        ));
        assert_eq!((catalog.relation(original).unwrap(), catalog.relation(copy).unwrap()), before);
        assert_eq!(catalog.dependencies_of(toast).len(), 2);
    }

    #[test]
    fn test_swap_index_by_name() {
        let session = Session::superuser("postgres");
        let mut catalog = MemoryCatalog::new();
        let t = catalog.create_table("public", "t", OWNER).unwrap();
        let original = catalog
            .create_index(t, "t_a", "CREATE INDEX t_a ON public.t USING btree (a)", vec![DataType::Integer])
            .unwrap();
        let empty = ShadowMap::new(t, Oid::INVALID);

        assert!(matches!(
            SwapExecutor::swap_index(&session, &mut catalog, &empty, original),
            Err(MigrateError::AmbiguousShadow { found: 0, .. })
        ));

        let name = format!("index_{original}");
        let copy = catalog
            .create_index(t, &name, &format!("CREATE INDEX {name} ON public.t USING btree (a)"), vec![DataType::Integer])
            .unwrap();
        assert_eq!(SwapExecutor::swap_index(&session, &mut catalog, &empty, original).unwrap(), copy);
        assert_eq!(catalog.relation(original).unwrap().filenode, copy);
    }

    #[test]
    fn test_swap_index_requires_superuser() {
        let session = Session::new("app", false, 1, crate::core::MigrateConfig::default());
        let mut catalog = MemoryCatalog::new();
        let map = ShadowMap::new(Oid(1), Oid(2));
        assert!(matches!(
            SwapExecutor::swap_index(&session, &mut catalog, &map, Oid(3)),
            Err(MigrateError::PermissionDenied(_))
        ));
    }
}
