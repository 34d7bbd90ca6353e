//! In-memory executor for one table migration
//!
//! Holds the change log table and the shadow table of a single migration and
//! understands exactly the statement texts of its [`MigrationStatements`]:
//! the capture insert, the replay templates and the bulk delete built from
//! the pop prefix. Anything else that looks like DDL is recorded and
//! acknowledged as a utility statement.

use crate::core::{type_oid, MigrateError, Oid, Result, Row, Value};
use crate::migrate::MigrationStatements;
use super::{ColumnMeta, Outcome, OutcomeKind, PlanHandle, StatementExecutor};
use nom::{
    bytes::complete::tag,
    character::complete::{char, digit1, multispace0},
    combinator::{eof, map_res, opt, recognize},
    multi::separated_list1,
    sequence::{delimited, pair, terminated, tuple},
    IResult,
};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Route {
    LogInsert,
    Peek,
    Insert,
    Delete,
    Update,
}

impl Route {
    const fn arg_count(self) -> usize {
        match self {
            Self::Peek | Self::Insert | Self::Delete => 1,
            Self::LogInsert | Self::Update => 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct LogRecord {
    key: Value,
    row: Value,
}

pub struct MemoryExecutor {
    statements: MigrationStatements,
    key_columns: Vec<usize>,
    row_type: Oid,
    key_type: Oid,
    log: BTreeMap<i64, LogRecord>,
    next_sequence: i64,
    shadow: Vec<Row>,
    plans: Vec<(Route, Vec<Oid>)>,
    utility: Vec<String>,
    failing: Option<String>,
}

impl MemoryExecutor {
    /// `key_columns` are the positions of the primary-key columns in a row
    #[must_use]
    pub fn new(statements: MigrationStatements, key_columns: Vec<usize>) -> Self {
        Self {
            statements,
            key_columns,
            row_type: type_oid::RECORD,
            key_type: type_oid::RECORD,
            log: BTreeMap::new(),
            next_sequence: 1,
            shadow: Vec::new(),
            plans: Vec::new(),
            utility: Vec::new(),
            failing: None,
        }
    }

    /// Composite type oids reported for the `row` and `pk` log columns
    #[must_use]
    pub fn with_types(mut self, row_type: Oid, key_type: Oid) -> Self {
        self.row_type = row_type;
        self.key_type = key_type;
        self
    }

    #[must_use]
    pub const fn statements(&self) -> &MigrationStatements {
        &self.statements
    }

    /// Initial bulk copy into the shadow table
    pub fn bulk_load(&mut self, rows: impl IntoIterator<Item = Row>) {
        self.shadow.extend(rows);
    }

    /// Appends a raw log entry, bypassing the capture trigger
    pub fn push_log(&mut self, key: Value, row: Value) -> i64 {
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        self.log.insert(sequence, LogRecord { key, row });
        sequence
    }

    #[must_use]
    pub fn log_len(&self) -> usize {
        self.log.len()
    }

    /// Sequence ids still in the log, oldest first
    #[must_use]
    pub fn log_sequences(&self) -> Vec<i64> {
        self.log.keys().copied().collect()
    }

    #[must_use]
    pub fn shadow_rows(&self) -> &[Row] {
        &self.shadow
    }

    /// Statements that went through `execute` as utility commands
    #[must_use]
    pub fn utility_statements(&self) -> &[String] {
        &self.utility
    }

    #[must_use]
    pub fn prepare_count(&self) -> usize {
        self.plans.len()
    }

    /// Makes every later execution of `sql` fail
    pub fn fail_on(&mut self, sql: &str) {
        self.failing = Some(sql.to_string());
    }

    fn route_of(&self, sql: &str) -> Option<Route> {
        let replay = &self.statements.replay;
        [
            (self.statements.log_insert.as_str(), Route::LogInsert),
            (replay.peek.as_str(), Route::Peek),
            (replay.insert.as_str(), Route::Insert),
            (replay.delete.as_str(), Route::Delete),
            (replay.update.as_str(), Route::Update),
        ]
        .into_iter()
        .find(|(text, _)| *text == sql)
        .map(|(_, route)| route)
    }

    fn sql_of(&self, route: Route) -> &str {
        let replay = &self.statements.replay;
        match route {
            Route::LogInsert => &self.statements.log_insert,
            Route::Peek => &replay.peek,
            Route::Insert => &replay.insert,
            Route::Delete => &replay.delete,
            Route::Update => &replay.update,
        }
    }

    fn check_failure(&self, sql: &str) -> Result<()> {
        if self.failing.as_deref() == Some(sql) {
            return Err(MigrateError::Execution {
                sql: sql.to_string(),
                message: "injected failure".to_string(),
            });
        }
        Ok(())
    }

    fn shadow_position(&self, key: &Value) -> Option<usize> {
        self.shadow.iter().position(|row| row.key(&self.key_columns) == *key)
    }

    fn image_to_row(sql: &str, image: &Value) -> Result<Row> {
        Row::from_image(image).ok_or_else(|| MigrateError::Execution {
            sql: sql.to_string(),
            message: format!("expected a row image, got {image}"),
        })
    }

    fn run(&mut self, route: Route, args: &[Value]) -> Result<Outcome> {
        let sql = self.sql_of(route).to_string();
        match route {
            Route::LogInsert => {
                let key = match &args[0] {
                    Value::Null => Value::Null,
                    old => Self::image_to_row(&sql, old)?.key(&self.key_columns),
                };
                self.push_log(key, args[1].clone());
                Ok(Outcome::affected(OutcomeKind::Insert, 1))
            }
            Route::Peek => {
                let limit = args[0].as_int().ok_or_else(|| MigrateError::Execution {
                    sql: sql.clone(),
                    message: format!("invalid LIMIT {}", args[0]),
                })?;
                let limit = usize::try_from(limit).unwrap_or(0);
                let rows = self
                    .log
                    .iter()
                    .take(limit)
                    .map(|(seq, rec)| vec![Value::Integer(*seq), rec.key.clone(), rec.row.clone()])
                    .collect();
                let columns = vec![
                    ColumnMeta::new("id", type_oid::INT8),
                    ColumnMeta::new("pk", self.key_type),
                    ColumnMeta::new("row", self.row_type),
                ];
                Ok(Outcome::rows(columns, rows))
            }
            Route::Insert => {
                let row = Self::image_to_row(&sql, &args[0])?;
                let key = row.key(&self.key_columns);
                if self.shadow_position(&key).is_some() {
                    return Err(MigrateError::Execution {
                        sql,
                        message: format!("duplicate key value {key}"),
                    });
                }
                self.shadow.push(row);
                Ok(Outcome::affected(OutcomeKind::Insert, 1))
            }
            Route::Delete => {
                let processed = match self.shadow_position(&args[0]) {
                    Some(pos) => {
                        self.shadow.remove(pos);
                        1
                    }
                    None => 0,
                };
                Ok(Outcome::affected(OutcomeKind::Delete, processed))
            }
            Route::Update => {
                let row = Self::image_to_row(&sql, &args[1])?;
                let processed = match self.shadow_position(&args[0]) {
                    Some(pos) => {
                        self.shadow[pos] = row;
                        1
                    }
                    None => 0,
                };
                Ok(Outcome::affected(OutcomeKind::Update, processed))
            }
        }
    }
}

/// `<id>,<id>,...);` closing a bulk delete
fn id_list(input: &str) -> IResult<&str, Vec<i64>> {
    terminated(
        separated_list1(
            delimited(multispace0, char(','), multispace0),
            map_res(recognize(pair(opt(char('-')), digit1)), str::parse::<i64>),
        ),
        tuple((multispace0, tag(");"), multispace0, eof)),
    )(input)
}

impl StatementExecutor for MemoryExecutor {
    fn prepare(&mut self, sql: &str, arg_types: &[Oid]) -> Result<PlanHandle> {
        let route = self.route_of(sql).ok_or_else(|| MigrateError::Execution {
            sql: sql.to_string(),
            message: "migrate_prepare failed: unsupported statement".to_string(),
        })?;
        if arg_types.len() != route.arg_count() {
            return Err(MigrateError::Execution {
                sql: sql.to_string(),
                message: format!("expected {} parameters, got {}", route.arg_count(), arg_types.len()),
            });
        }
        self.plans.push((route, arg_types.to_vec()));
        Ok(PlanHandle(self.plans.len() as u64 - 1))
    }

    fn execute_plan(&mut self, plan: PlanHandle, args: &[Value]) -> Result<Outcome> {
        let route = usize::try_from(plan.0)
            .ok()
            .and_then(|i| self.plans.get(i))
            .map(|(route, _)| *route)
            .ok_or_else(|| MigrateError::Execution {
                sql: format!("<plan {}>", plan.0),
                message: "unknown plan handle".to_string(),
            })?;
        let sql = self.sql_of(route).to_string();
        self.check_failure(&sql)?;
        if args.len() != route.arg_count() {
            return Err(MigrateError::Execution {
                sql,
                message: format!("expected {} arguments, got {}", route.arg_count(), args.len()),
            });
        }
        self.run(route, args)
    }

    fn execute(&mut self, sql: &str) -> Result<Outcome> {
        self.check_failure(sql)?;

        if let Some(rest) = sql.strip_prefix(self.statements.replay.pop_prefix.as_str()) {
            let (_, ids) = id_list(rest).map_err(|_| MigrateError::Execution {
                sql: sql.to_string(),
                message: "malformed id list".to_string(),
            })?;
            let removed = ids.iter().filter(|id| self.log.remove(id).is_some()).count();
            return Ok(Outcome::affected(OutcomeKind::Delete, removed as u64));
        }

        let upper = sql.trim_start().to_ascii_uppercase();
        if ["DROP ", "ALTER ", "LOCK ", "CREATE "].iter().any(|kw| upper.starts_with(kw)) {
            self.utility.push(sql.to_string());
            return Ok(Outcome::affected(OutcomeKind::Utility, 0));
        }

        Err(MigrateError::Execution {
            sql: sql.to_string(),
            message: "unsupported statement".to_string(),
        })
    }
}
