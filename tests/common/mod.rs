// Shared fixtures for the integration tests
#![allow(dead_code)]

use postgrust_migrate::core::{type_oid, MigrateConfig, Oid, Row, Value};
use postgrust_migrate::executor::{MemoryExecutor, Outcome, PlanHandle, StatementExecutor};
use postgrust_migrate::migrate::{MigrationStatements, Session};
use std::sync::Once;

static INIT: Once = Once::new();

/// Installs a tracing subscriber once per test binary (RUST_LOG selects the level)
pub fn init_tracing() {
    INIT.call_once(|| {
        use tracing_subscriber::filter::EnvFilter;
        use tracing_subscriber::fmt;
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
        let _ = fmt().with_env_filter(filter).with_test_writer().with_target(false).try_init();
    });
}

pub const SOURCE: Oid = Oid(16384);

pub fn config(batch_cap: usize) -> MigrateConfig {
    MigrateConfig { batch_cap, ..MigrateConfig::default() }
}

/// Migration of `(id bigint primary key, v text)`
pub fn migration(batch_cap: usize) -> (Session, MemoryExecutor) {
    init_tracing();
    let config = config(batch_cap);
    let statements = MigrationStatements::new(&config, SOURCE, &["id", "v"], &["id"]);
    let session = Session::new("postgres", true, 4242, config);
    (session, MemoryExecutor::new(statements, vec![0]).with_types(type_oid::RECORD, type_oid::RECORD))
}

pub fn row(id: i64, v: &str) -> Row {
    Row::new(vec![Value::Integer(id), Value::Text(v.to_string())])
}

pub fn key(id: i64) -> Value {
    Value::Record(vec![Value::Integer(id)])
}

/// Counts the statements run through `execute` (one bulk delete per replay round)
pub struct RoundCounter<'a> {
    pub inner: &'a mut MemoryExecutor,
    pub executed: usize,
}

impl StatementExecutor for RoundCounter<'_> {
    fn prepare(&mut self, sql: &str, arg_types: &[Oid]) -> postgrust_migrate::Result<PlanHandle> {
        self.inner.prepare(sql, arg_types)
    }

    fn execute_plan(&mut self, plan: PlanHandle, args: &[Value]) -> postgrust_migrate::Result<Outcome> {
        self.inner.execute_plan(plan, args)
    }

    fn execute(&mut self, sql: &str) -> postgrust_migrate::Result<Outcome> {
        self.executed += 1;
        self.inner.execute(sql)
    }
}
