use crate::core::{MigrateConfig, MigrateError, Result};
use crate::executor::PlanCache;
use uuid::Uuid;

/// Backend session a migration function runs in
///
/// Owns the session's prepared statements; they are dropped with the session.
#[derive(Debug)]
pub struct Session {
    pub id: Uuid,
    pub user: String,
    pub is_superuser: bool,
    /// Process id of the backend, used for process-unique temporary names
    pub backend_pid: u32,
    pub plans: PlanCache,
    pub config: MigrateConfig,
}

impl Session {
    #[must_use]
    pub fn new(user: &str, is_superuser: bool, backend_pid: u32, config: MigrateConfig) -> Self {
        Self {
            id: Uuid::new_v4(),
            user: user.to_string(),
            is_superuser,
            backend_pid,
            plans: PlanCache::new(),
            config,
        }
    }

    /// Superuser session of the current process with default settings
    #[must_use]
    pub fn superuser(user: &str) -> Self {
        Self::new(user, true, std::process::id(), MigrateConfig::default())
    }

    pub fn must_be_superuser(&self, function: &str) -> Result<()> {
        if self.is_superuser {
            Ok(())
        } else {
            tracing::warn!(session = %self.id, user = %self.user, function, "permission denied");
            Err(MigrateError::PermissionDenied(function.to_string()))
        }
    }
}
