use crate::core::{Oid, Result};
use super::{PlanHandle, StatementExecutor};
use std::collections::HashMap;

/// Prepared statement cache entry
#[derive(Debug, Clone)]
pub struct CachedPlan {
    pub query: String,
    pub arg_types: Vec<Oid>,
    pub handle: PlanHandle,
    pub uses: u64,
}

/// Per-session cache of prepared statements keyed by statement text
///
/// Entries are created on first use and live until the session drops the
/// cache (or calls [`clear`](Self::clear)). Handles belong to the executor
/// that prepared them, so one cache must only ever be used with one executor.
#[derive(Debug, Default)]
pub struct PlanCache {
    plans: HashMap<String, CachedPlan>,
    prepared: u64,
}

impl PlanCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached plan for `sql`, preparing it on a miss.
    /// A cached plan prepared for different argument types is replaced.
    pub fn get_or_prepare<E: StatementExecutor + ?Sized>(
        &mut self,
        executor: &mut E,
        sql: &str,
        arg_types: &[Oid],
    ) -> Result<PlanHandle> {
        if let Some(plan) = self.plans.get_mut(sql)
            && plan.arg_types == arg_types
        {
            plan.uses += 1;
            return Ok(plan.handle);
        }

        let handle = executor.prepare(sql, arg_types)?;
        self.prepared += 1;
        self.plans.insert(
            sql.to_string(),
            CachedPlan {
                query: sql.to_string(),
                arg_types: arg_types.to_vec(),
                handle,
                uses: 1,
            },
        );
        Ok(handle)
    }

    #[must_use]
    pub fn get(&self, sql: &str) -> Option<&CachedPlan> {
        self.plans.get(sql)
    }

    pub fn remove(&mut self, sql: &str) -> bool {
        self.plans.remove(sql).is_some()
    }

    /// Number of prepare calls issued through this cache
    #[must_use]
    pub const fn prepared_count(&self) -> u64 {
        self.prepared
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.plans.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.plans.is_empty()
    }

    pub fn clear(&mut self) {
        self.plans.clear();
    }
}
