//! Renaming of auxiliary large-object storage after a table swap
//!
//! Toast relations are named after the table owning them
//! (`pg_toast_<table oid>`, index `pg_toast_<table oid>_index`). Once the
//! tables have exchanged their storage, each toast relation carries the name
//! of its former owner and has to take the name of its new one.

use crate::catalog::{Catalog, RelationDescriptor};
use crate::core::{MigrateConfig, MigrateError, Oid, Result};

/// A toast relation and its index
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToastPair {
    pub toast: Oid,
    pub index: Oid,
}

/// Which of the two tables had auxiliary storage before the swap
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastLayout {
    Neither,
    SourceOnly(ToastPair),
    ShadowOnly(ToastPair),
    Both { source: ToastPair, shadow: ToastPair },
}

impl ToastLayout {
    /// Reads the layout of `source` and `shadow`; call before swapping them
    pub fn capture<C: Catalog + ?Sized>(
        catalog: &C,
        source: &RelationDescriptor,
        shadow: &RelationDescriptor,
    ) -> Result<Self> {
        let index_of = |toast: Oid| toast.valid().and_then(|t| catalog.toast_index(t)).unwrap_or(Oid::INVALID);
        Self::classify(
            source.toast_relid,
            index_of(source.toast_relid),
            shadow.toast_relid,
            index_of(shadow.toast_relid),
        )
    }

    /// Every toast relation must come with a valid index, and no index without one
    pub fn classify(toast1: Oid, index1: Oid, toast2: Oid, index2: Oid) -> Result<Self> {
        let unexpected = || MigrateError::UnexpectedToastTopology { toast1, index1, toast2, index2 };
        match (toast1.is_valid(), index1.is_valid(), toast2.is_valid(), index2.is_valid()) {
            (false, false, false, false) => Ok(Self::Neither),
            (true, true, false, false) => Ok(Self::SourceOnly(ToastPair { toast: toast1, index: index1 })),
            (false, false, true, true) => Ok(Self::ShadowOnly(ToastPair { toast: toast2, index: index2 })),
            (true, true, true, true) => Ok(Self::Both {
                source: ToastPair { toast: toast1, index: index1 },
                shadow: ToastPair { toast: toast2, index: index2 },
            }),
            _ => Err(unexpected()),
        }
    }

    /// Gives each toast relation the name of the table that owns it after the
    /// swap. `pid` makes the temporary name of the both-present case unique.
    pub fn reconcile<C: Catalog>(
        self,
        catalog: &mut C,
        config: &MigrateConfig,
        source: Oid,
        shadow: Oid,
        pid: u32,
    ) -> Result<()> {
        match self {
            Self::Neither => Ok(()),
            // The shadow's storage now belongs to the source
            Self::ShadowOnly(pair) => rename_pair(catalog, pair, &config.toast_name(&source.to_string())),
            Self::SourceOnly(pair) => rename_pair(catalog, pair, &config.toast_name(&shadow.to_string())),
            Self::Both { source: source_pair, shadow: shadow_pair } => {
                let mut rotation = ToastRotation::new(config, source, shadow, source_pair, shadow_pair, pid);
                while rotation.advance(catalog)? != RotationState::Final {}
                Ok(())
            }
        }
    }
}

/// Renames a toast relation and its index together, or neither of them
fn rename_pair<C: Catalog>(catalog: &mut C, pair: ToastPair, name: &str) -> Result<()> {
    catalog.atomically(|catalog| {
        catalog.rename_relation(pair.toast, name)?;
        catalog.rename_relation(pair.index, &format!("{name}_index"))
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotationState {
    /// Both final names are taken by the other relation
    BothOccupied,
    /// The source's former toast relation is parked under the temporary name
    TempHoldsSource,
    Final,
}

/// Three-step rename through a temporary name, used when both tables have
/// auxiliary storage and each target name is occupied by the other relation
#[derive(Debug)]
pub struct ToastRotation {
    state: RotationState,
    source_pair: ToastPair,
    shadow_pair: ToastPair,
    temp_name: String,
    source_name: String,
    shadow_name: String,
}

impl ToastRotation {
    #[must_use]
    pub fn new(
        config: &MigrateConfig,
        source: Oid,
        shadow: Oid,
        source_pair: ToastPair,
        shadow_pair: ToastPair,
        pid: u32,
    ) -> Self {
        Self {
            state: RotationState::BothOccupied,
            source_pair,
            shadow_pair,
            temp_name: config.toast_name(&format!("pid{pid}")),
            source_name: config.toast_name(&source.to_string()),
            shadow_name: config.toast_name(&shadow.to_string()),
        }
    }

    #[must_use]
    pub const fn state(&self) -> RotationState {
        self.state
    }

    #[must_use]
    pub fn temp_name(&self) -> &str {
        &self.temp_name
    }

    /// Performs the next transition and returns the state reached
    pub fn advance<C: Catalog>(&mut self, catalog: &mut C) -> Result<RotationState> {
        self.state = match self.state {
            RotationState::BothOccupied => {
                self.check(catalog, self.source_pair, &self.source_name)?;
                self.check(catalog, self.shadow_pair, &self.shadow_name)?;
                rename_pair(catalog, self.source_pair, &self.temp_name)?;
                RotationState::TempHoldsSource
            }
            RotationState::TempHoldsSource => {
                self.check(catalog, self.source_pair, &self.temp_name)?;
                rename_pair(catalog, self.shadow_pair, &self.source_name)?;
                rename_pair(catalog, self.source_pair, &self.shadow_name)?;
                RotationState::Final
            }
            RotationState::Final => RotationState::Final,
        };
        tracing::debug!(state = ?self.state, temp = %self.temp_name, "toast rotation step");
        Ok(self.state)
    }

    /// `pair` must still carry `name` (and `<name>_index`)
    fn check<C: Catalog + ?Sized>(&self, catalog: &C, pair: ToastPair, name: &str) -> Result<()> {
        let toast = catalog.relation(pair.toast)?;
        let index = catalog.relation(pair.index)?;
        if toast.name == name && index.name == format!("{name}_index") {
            return Ok(());
        }
        tracing::warn!(
            state = ?self.state,
            toast = %toast.name,
            index = %index.name,
            expected = name,
            "toast relation not named as expected"
        );
        Err(MigrateError::UnexpectedToastTopology {
            toast1: self.source_pair.toast,
            index1: self.source_pair.index,
            toast2: self.shadow_pair.toast,
            index2: self.shadow_pair.index,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::MemoryCatalog;

    fn pair(toast: u32, index: u32) -> ToastPair {
        ToastPair { toast: Oid(toast), index: Oid(index) }
    }

    #[test]
    fn test_classify() {
        assert_eq!(
            ToastLayout::classify(Oid::INVALID, Oid::INVALID, Oid::INVALID, Oid::INVALID).unwrap(),
            ToastLayout::Neither
        );
        assert_eq!(
            ToastLayout::classify(Oid(1), Oid(2), Oid::INVALID, Oid::INVALID).unwrap(),
            ToastLayout::SourceOnly(pair(1, 2))
        );
        assert_eq!(
            ToastLayout::classify(Oid::INVALID, Oid::INVALID, Oid(3), Oid(4)).unwrap(),
            ToastLayout::ShadowOnly(pair(3, 4))
        );
        assert!(matches!(
            ToastLayout::classify(Oid(1), Oid::INVALID, Oid::INVALID, Oid::INVALID),
            Err(MigrateError::UnexpectedToastTopology { .. })
        ));
        assert!(ToastLayout::classify(Oid::INVALID, Oid(2), Oid::INVALID, Oid::INVALID).is_err());
    }

    #[test]
    fn test_rotation_steps() {
        let config = MigrateConfig::default();
        let mut catalog = MemoryCatalog::new();
        let source = catalog.create_table("public", "t", Oid(10)).unwrap();
        let shadow = catalog.create_table("migrate", &format!("table_{source}"), Oid(10)).unwrap();
        let (t1, i1) = catalog.create_toast(source).unwrap();
        let (t2, i2) = catalog.create_toast(shadow).unwrap();

        let t1_pair = ToastPair { toast: t1, index: i1 };
        let t2_pair = ToastPair { toast: t2, index: i2 };

        // Owners given the wrong way round: names do not match
        let mut rotation = ToastRotation::new(&config, shadow, source, t1_pair, t2_pair, 99);
        assert!(rotation.advance(&mut catalog).is_err());
        assert_eq!(rotation.state(), RotationState::BothOccupied);

        let mut rotation = ToastRotation::new(&config, source, shadow, t1_pair, t2_pair, 99);
        assert_eq!(rotation.temp_name(), "pg_toast_pid99");
        assert_eq!(rotation.advance(&mut catalog).unwrap(), RotationState::TempHoldsSource);
        assert_eq!(catalog.relation(t1).unwrap().name, "pg_toast_pid99");
        assert_eq!(catalog.relation(i1).unwrap().name, "pg_toast_pid99_index");

        assert_eq!(rotation.advance(&mut catalog).unwrap(), RotationState::Final);
        assert_eq!(catalog.relation(t2).unwrap().name, format!("pg_toast_{source}"));
        assert_eq!(catalog.relation(i2).unwrap().name, format!("pg_toast_{source}_index"));
        assert_eq!(catalog.relation(t1).unwrap().name, format!("pg_toast_{shadow}"));
        assert_eq!(rotation.advance(&mut catalog).unwrap(), RotationState::Final);
    }

    #[test]
    fn test_temp_name_taken() {
        let config = MigrateConfig::default();
        let mut catalog = MemoryCatalog::new();
        let a = catalog.create_table("public", "a", Oid(10)).unwrap();
        let b = catalog.create_table("public", "b", Oid(10)).unwrap();
        let (t1, i1) = catalog.create_toast(a).unwrap();
        let (t2, i2) = catalog.create_toast(b).unwrap();
        let squatter = catalog.create_table("pg_toast", "pg_toast_pid5", Oid(10)).unwrap();

        let layout = ToastLayout::Both {
            source: ToastPair { toast: t1, index: i1 },
            shadow: ToastPair { toast: t2, index: i2 },
        };
        assert!(matches!(
            layout.reconcile(&mut catalog, &config, a, b, 5),
            Err(MigrateError::NameConflict(_))
        ));
        assert!(catalog.relation(squatter).is_ok());
    }

    #[test]
    fn test_pair_rename_is_all_or_nothing() {
        let config = MigrateConfig::default();
        let mut catalog = MemoryCatalog::new();
        let a = catalog.create_table("public", "a", Oid(10)).unwrap();
        let b = catalog.create_table("public", "b", Oid(10)).unwrap();
        let (toast, index) = catalog.create_toast(a).unwrap();
        // Only the index name is taken
        let squatter = catalog.create_table("pg_toast", &format!("pg_toast_{b}_index"), Oid(10)).unwrap();

        let layout = ToastLayout::SourceOnly(ToastPair { toast, index });
        assert!(matches!(
            layout.reconcile(&mut catalog, &config, a, b, 5),
            Err(MigrateError::NameConflict(_))
        ));
        assert_eq!(catalog.relation(toast).unwrap().name, format!("pg_toast_{a}"));
        assert_eq!(catalog.relation(index).unwrap().name, format!("pg_toast_{a}_index"));
        assert_eq!(catalog.relation(squatter).unwrap().name, format!("pg_toast_{b}_index"));
    }
}
