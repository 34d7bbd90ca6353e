use crate::core::{type_oid, MigrateError, Oid, Result, Value};
use crate::executor::{OutcomeKind, StatementExecutor};
use super::session::Session;
use super::statements::ReplayStatements;

const FUNCTION_NAME: &str = "migrate_apply";

/// Drains the change log into the shadow table
pub struct ReplayExecutor;

impl ReplayExecutor {
    /// Applies up to `max_count` log entries (all of them when `max_count <= 0`)
    /// in rounds of at most `batch_cap` entries; returns how many were applied.
    ///
    /// Each round fetches the oldest entries, applies them in sequence order
    /// and removes exactly those entries with one bulk delete. Updates and
    /// deletes of keys the shadow table does not hold are no-ops.
    pub fn apply<E: StatementExecutor + ?Sized>(
        session: &mut Session,
        executor: &mut E,
        statements: &ReplayStatements,
        max_count: i32,
    ) -> Result<u64> {
        session.must_be_superuser(FUNCTION_NAME)?;

        let cap = session.config.batch_cap as u64;
        let budget = u64::try_from(max_count).ok().filter(|n| *n > 0);
        let mut applied: u64 = 0;
        let mut round: u32 = 0;

        loop {
            let limit = match budget {
                Some(budget) if budget <= applied => break,
                Some(budget) => (budget - applied).min(cap),
                None => cap,
            };

            let peek = session
                .plans
                .get_or_prepare(executor, &statements.peek, &[type_oid::INT4])?;
            let batch = executor
                .execute_plan(peek, &[Value::Integer(limit as i64)])?
                .expect(OutcomeKind::Select, &statements.peek)?;
            if batch.rows.is_empty() {
                break;
            }
            round += 1;

            // id, pk, row
            let key_type = batch.column_type(1, &statements.peek)?;
            let row_type = batch.column_type(2, &statements.peek)?;

            let mut pop = statements.pop_prefix.clone();
            let mut missed: u64 = 0;
            for (n, entry) in batch.rows.iter().enumerate() {
                let [id, key, row] = entry.as_slice() else {
                    return Err(MigrateError::UnexpectedResult {
                        sql: statements.peek.clone(),
                        expected: "3 result columns".to_string(),
                        actual: entry.len().to_string(),
                    });
                };
                let sequence = id
                    .as_int()
                    .ok_or_else(|| MigrateError::InvalidLogEntry { sequence: id.to_string() })?;

                let processed = match (key.is_null(), row.is_null()) {
                    (true, true) => {
                        return Err(MigrateError::InvalidLogEntry { sequence: sequence.to_string() });
                    }
                    // INSERT
                    (true, false) => Self::run(session, executor, &statements.insert, &[row_type], &[row.clone()])?,
                    // DELETE
                    (false, true) => Self::run(session, executor, &statements.delete, &[key_type], &[key.clone()])?,
                    // UPDATE
                    (false, false) => Self::run(
                        session,
                        executor,
                        &statements.update,
                        &[key_type, row_type],
                        &[key.clone(), row.clone()],
                    )?,
                };
                if processed == 0 {
                    missed += 1;
                }

                if n > 0 {
                    pop.push(',');
                }
                pop.push_str(&sequence.to_string());
                applied += 1;
            }

            pop.push_str(");");
            executor.execute(&pop)?.expect(OutcomeKind::Delete, &pop)?;

            if missed > 0 {
                tracing::warn!(round, missed, "change log entries matched no shadow row");
            }
            tracing::debug!(round, batch = batch.rows.len(), applied, "replayed change log batch");
        }

        Ok(applied)
    }

    fn run<E: StatementExecutor + ?Sized>(
        session: &mut Session,
        executor: &mut E,
        sql: &str,
        arg_types: &[Oid],
        args: &[Value],
    ) -> Result<u64> {
        let plan = session.plans.get_or_prepare(executor, sql, arg_types)?;
        Ok(executor.execute_plan(plan, args)?.processed)
    }
}
