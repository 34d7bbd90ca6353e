use crate::core::{MigrateError, Oid, Result, Row, Value};
use crate::executor::{OutcomeKind, StatementExecutor};
use super::session::Session;

const FUNCTION_NAME: &str = "migrate_trigger";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerTiming {
    Before,
    After,
    InsteadOf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerLevel {
    Row,
    Statement,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerOp {
    Insert,
    Update,
    Delete,
    Truncate,
}

/// Trigger invocation context, as handed to a trigger function by the host
#[derive(Debug, Clone)]
pub struct TriggerEvent {
    pub timing: TriggerTiming,
    pub level: TriggerLevel,
    pub op: TriggerOp,
    /// Composite row type of the table the trigger is installed on
    pub row_type: Oid,
    /// Trigger arguments; the capture trigger takes the log insert statement
    pub args: Vec<String>,
    pub old_row: Option<Row>,
    pub new_row: Option<Row>,
}

impl TriggerEvent {
    /// AFTER ROW event with the log insert statement as the only argument
    #[must_use]
    pub fn row_change(
        op: TriggerOp,
        row_type: Oid,
        log_insert: &str,
        old_row: Option<Row>,
        new_row: Option<Row>,
    ) -> Self {
        Self {
            timing: TriggerTiming::After,
            level: TriggerLevel::Row,
            op,
            row_type,
            args: vec![log_insert.to_string()],
            old_row,
            new_row,
        }
    }
}

/// Row-level capture hook appending one change log entry per write
pub struct CaptureTrigger;

impl CaptureTrigger {
    /// Logs the event and hands back the row the host should continue with
    pub fn fire<E: StatementExecutor + ?Sized>(
        session: &mut Session,
        executor: &mut E,
        event: &TriggerEvent,
    ) -> Result<Option<Row>> {
        session.must_be_superuser(FUNCTION_NAME)?;

        if event.timing != TriggerTiming::After || event.level != TriggerLevel::Row {
            return Err(invalid_call("must be fired after row events"));
        }
        let sql = match event.args.as_slice() {
            [sql] if !sql.trim().is_empty() => sql.as_str(),
            _ => return Err(invalid_call("wrong number of trigger arguments")),
        };

        // $1 = old image, $2 = new image
        let (old, new, returned) = match event.op {
            TriggerOp::Insert => {
                let new = required(event.new_row.as_ref(), "new row")?;
                (Value::Null, new.to_image(), new)
            }
            TriggerOp::Delete => {
                let old = required(event.old_row.as_ref(), "old row")?;
                (old.to_image(), Value::Null, old)
            }
            TriggerOp::Update => {
                let old = required(event.old_row.as_ref(), "old row")?;
                let new = required(event.new_row.as_ref(), "new row")?;
                (old.to_image(), new.to_image(), new)
            }
            TriggerOp::Truncate => return Err(invalid_call("unsupported event")),
        };

        let plan = session
            .plans
            .get_or_prepare(executor, sql, &[event.row_type, event.row_type])?;
        executor
            .execute_plan(plan, &[old, new])?
            .expect(OutcomeKind::Insert, sql)?;

        Ok(Some(returned.clone()))
    }
}

fn invalid_call(detail: &str) -> MigrateError {
    MigrateError::InvalidTriggerCall(format!("{FUNCTION_NAME}: {detail}"))
}

fn required<'r>(row: Option<&'r Row>, what: &str) -> Result<&'r Row> {
    row.ok_or_else(|| invalid_call(&format!("missing {what}")))
}
