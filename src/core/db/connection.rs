/// Connection Contract Module
///
/// This module defines what the query layer needs from a database
/// connection (`DbConnection`, `DbCursor`) and provides a SQLite
/// implementation of that contract on top of rusqlite.

use crate::core::db::query::StatementType;
use crate::core::{Result, SqlFrameError};
use crate::frame::Value;
use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::types::{ToSqlOutput, ValueRef};
use rusqlite::{ErrorCode, ToSql};
use std::cell::Cell;
use std::path::Path;
use tracing::debug;

/// A result row
pub type Row = Vec<Value>;

/// Statement parameters
#[derive(Debug, Clone, PartialEq)]
pub enum Params {
    /// Bound in order to positional placeholders
    Positional(Vec<Value>),
    /// Bound by name to named placeholders
    Named(Vec<(String, Value)>),
}

impl Params {
    pub fn len(&self) -> usize {
        match self {
            Params::Positional(values) => values.len(),
            Params::Named(pairs) => pairs.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A handle executing one statement at a time and buffering its result set.
pub trait DbCursor {
    /// Executes `sql`, binding `params` when given
    fn execute(&mut self, sql: &str, params: Option<&Params>) -> Result<()>;

    /// Executes `sql` once per parameter set
    fn executemany(&mut self, sql: &str, rows: &[Params]) -> Result<()>;

    /// Returns every remaining row of the last result set
    fn fetchall(&mut self) -> Result<Vec<Row>>;

    /// Column names of the last result set, `None` when the statement
    /// produced no result set
    fn description(&self) -> Option<&[String]>;

    /// Rows affected by the last statement, `-1` when not applicable
    fn rowcount(&self) -> i64;

    fn close(&mut self) -> Result<()>;
}

/// An externally owned database connection.
///
/// The query layer never opens or closes connections; it only derives
/// cursors and ends transactions.
pub trait DbConnection {
    fn cursor(&self) -> Result<Box<dyn DbCursor + '_>>;

    fn commit(&self) -> Result<()>;

    fn rollback(&self) -> Result<()>;
}

/// Represents database transaction states
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum TransactionState {
    /// No active transaction (autocommit mode)
    #[default]
    Autocommit,
    /// Transaction in progress
    Transaction,
}

/// SQLite connection implementing the cursor contract.
///
/// Mirrors the usual DB-API driver behaviour: a transaction is opened
/// implicitly before the first data-modifying statement and stays open
/// until `commit` or `rollback`.
#[derive(Debug)]
pub struct SqliteConnection {
    conn: rusqlite::Connection,
    transaction_state: Cell<TransactionState>,
}

impl SqliteConnection {
    /// Opens a SQLite database at the specified path
    ///
    /// # Arguments
    ///
    /// * `db_path` - Path to the SQLite database file, or ":memory:" for in-memory database
    pub fn open<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let conn = rusqlite::Connection::open(db_path).map_err(classify)?;
        Ok(Self::from_connection(conn))
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = rusqlite::Connection::open_in_memory().map_err(classify)?;
        Ok(Self::from_connection(conn))
    }

    /// Wraps an already opened rusqlite connection
    pub fn from_connection(conn: rusqlite::Connection) -> Self {
        SqliteConnection {
            conn,
            transaction_state: Cell::new(TransactionState::Autocommit),
        }
    }

    /// Gets the current transaction state
    pub fn transaction_state(&self) -> TransactionState {
        self.transaction_state.get()
    }

    /// Access to the underlying rusqlite connection
    pub fn inner(&self) -> &rusqlite::Connection {
        &self.conn
    }

    /// Opens a transaction before data-modifying statements
    fn begin_if_needed(&self, sql: &str) -> Result<()> {
        let modifies = matches!(
            StatementType::from_sql(sql),
            StatementType::Insert | StatementType::Update | StatementType::Delete | StatementType::Replace
        );
        if modifies && self.transaction_state() == TransactionState::Autocommit {
            self.conn.execute_batch("BEGIN").map_err(classify)?;
            self.transaction_state.set(TransactionState::Transaction);
            debug!("Opened implicit transaction");
        }
        Ok(())
    }

    fn end_transaction(&self, command: &str) -> Result<()> {
        if self.transaction_state() == TransactionState::Transaction {
            // Autocommit is restored by SQLite even when the command fails.
            let result = self.conn.execute_batch(command).map_err(classify);
            if self.conn.is_autocommit() {
                self.transaction_state.set(TransactionState::Autocommit);
            }
            result?;
        }
        Ok(())
    }
}

impl DbConnection for SqliteConnection {
    fn cursor(&self) -> Result<Box<dyn DbCursor + '_>> {
        Ok(Box::new(SqliteCursor::new(self)))
    }

    fn commit(&self) -> Result<()> {
        self.end_transaction("COMMIT")
    }

    fn rollback(&self) -> Result<()> {
        self.end_transaction("ROLLBACK")
    }
}

/// Cursor over a `SqliteConnection`.
///
/// Result sets are drained eagerly when the statement runs.
pub struct SqliteCursor<'c> {
    connection: &'c SqliteConnection,
    description: Option<Vec<String>>,
    rows: Vec<Row>,
    rowcount: i64,
    closed: bool,
}

impl<'c> SqliteCursor<'c> {
    fn new(connection: &'c SqliteConnection) -> Self {
        SqliteCursor {
            connection,
            description: None,
            rows: Vec::new(),
            rowcount: -1,
            closed: false,
        }
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            return Err(SqlFrameError::Operational("cannot operate on a closed cursor".to_string()));
        }
        Ok(())
    }

    fn run(&mut self, sql: &str, params: Option<&Params>) -> Result<()> {
        self.connection.begin_if_needed(sql)?;

        let conn = &self.connection.conn;
        let mut stmt = conn.prepare(sql).map_err(classify)?;

        if stmt.column_count() == 0 {
            let changed = match params {
                None => stmt.execute([]),
                Some(Params::Positional(values)) => stmt.execute(rusqlite::params_from_iter(values.iter())),
                Some(Params::Named(pairs)) => {
                    let named = named_params(pairs);
                    let refs: Vec<(&str, &dyn ToSql)> =
                        named.iter().map(|(k, v)| (k.as_str(), *v as &dyn ToSql)).collect();
                    stmt.execute(refs.as_slice())
                }
            }
            .map_err(classify)?;
            self.description = None;
            self.rows = Vec::new();
            self.rowcount = changed as i64;
            return Ok(());
        }

        let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
        let decl_types: Vec<Option<String>> = stmt
            .columns()
            .iter()
            .map(|c| c.decl_type().map(|t| t.to_uppercase()))
            .collect();

        let mut result = match params {
            None => stmt.query([]),
            Some(Params::Positional(values)) => stmt.query(rusqlite::params_from_iter(values.iter())),
            Some(Params::Named(pairs)) => {
                let named = named_params(pairs);
                let refs: Vec<(&str, &dyn ToSql)> =
                    named.iter().map(|(k, v)| (k.as_str(), *v as &dyn ToSql)).collect();
                stmt.query(refs.as_slice())
            }
        }
        .map_err(classify)?;

        let mut rows = Vec::new();
        while let Some(row) = result.next().map_err(classify)? {
            let mut values = Vec::with_capacity(columns.len());
            for (i, decl_type) in decl_types.iter().enumerate() {
                let value_ref = row.get_ref(i).map_err(classify)?;
                values.push(read_value(value_ref, decl_type.as_deref()));
            }
            rows.push(values);
        }

        self.description = Some(columns);
        self.rows = rows;
        self.rowcount = -1;
        Ok(())
    }
}

impl DbCursor for SqliteCursor<'_> {
    fn execute(&mut self, sql: &str, params: Option<&Params>) -> Result<()> {
        self.ensure_open()?;
        self.run(sql, params)
    }

    fn executemany(&mut self, sql: &str, rows: &[Params]) -> Result<()> {
        self.ensure_open()?;
        let mut total = 0;
        for params in rows {
            self.run(sql, Some(params))?;
            total += self.rowcount.max(0);
        }
        self.description = None;
        self.rows = Vec::new();
        self.rowcount = total;
        Ok(())
    }

    fn fetchall(&mut self) -> Result<Vec<Row>> {
        self.ensure_open()?;
        Ok(std::mem::take(&mut self.rows))
    }

    fn description(&self) -> Option<&[String]> {
        self.description.as_deref()
    }

    fn rowcount(&self) -> i64 {
        self.rowcount
    }

    fn close(&mut self) -> Result<()> {
        self.closed = true;
        self.rows = Vec::new();
        Ok(())
    }
}

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        match self {
            Value::Null => Ok(ToSqlOutput::Borrowed(ValueRef::Null)),
            Value::Integer(i) => Ok(ToSqlOutput::Borrowed(ValueRef::Integer(*i))),
            Value::Float(f) => Ok(ToSqlOutput::Borrowed(ValueRef::Real(*f))),
            Value::Text(s) => Ok(ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes()))),
            Value::Blob(b) => Ok(ToSqlOutput::Borrowed(ValueRef::Blob(b))),
            Value::Date(d) => d.to_sql(),
            Value::DateTime(dt) => dt.to_sql(),
        }
    }
}

/// Prefixes bare keys with `:` so "1" binds to the `:1` placeholder
fn named_params(pairs: &[(String, Value)]) -> Vec<(String, &Value)> {
    pairs
        .iter()
        .map(|(key, value)| {
            let name = if key.starts_with([':', '@', '$']) {
                key.clone()
            } else {
                format!(":{}", key)
            };
            (name, value)
        })
        .collect()
}

/// Converts a SQLite value, parsing date/time text in columns declared with
/// a temporal type.
fn read_value(value: ValueRef, decl_type: Option<&str>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::Integer(i),
        ValueRef::Real(f) => Value::Float(f),
        ValueRef::Blob(b) => Value::Blob(b.to_vec()),
        ValueRef::Text(t) => {
            let text = String::from_utf8_lossy(t).to_string();
            match decl_type {
                Some("TIMESTAMP") | Some("DATETIME") => parse_datetime(&text)
                    .map(Value::DateTime)
                    .unwrap_or(Value::Text(text)),
                Some("DATE") => NaiveDate::parse_from_str(&text, "%Y-%m-%d")
                    .map(Value::Date)
                    .unwrap_or(Value::Text(text)),
                _ => Value::Text(text),
            }
        }
    }
}

fn parse_datetime(text: &str) -> Option<NaiveDateTime> {
    ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

/// Maps rusqlite errors onto the operational/non-operational split
pub(crate) fn classify(err: rusqlite::Error) -> SqlFrameError {
    match err.sqlite_error_code() {
        Some(ErrorCode::DatabaseBusy)
        | Some(ErrorCode::DatabaseLocked)
        | Some(ErrorCode::CannotOpen)
        | Some(ErrorCode::SystemIoFailure)
        | Some(ErrorCode::NotADatabase) => SqlFrameError::Operational(err.to_string()),
        _ => SqlFrameError::Database(err),
    }
}
