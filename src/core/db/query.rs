/// Query Execution Module
///
/// This module wraps statement execution on a `DbConnection`: running a
/// statement with rollback on failure, draining result sets, and the
/// row / row-count / frame shaped query helpers built on top of them.

use crate::core::db::connection::{DbConnection, DbCursor, Params, Row};
use crate::core::Result;
use crate::frame::{Frame, Value};
use tracing::{debug, error, warn};

/// Retries granted when a commit fails with an operational error
const MAX_COMMIT_RETRIES: usize = 1;

/// Rows returned by `tquery`
#[derive(Debug, Clone, PartialEq)]
pub enum QueryRows {
    /// Single-column result flattened to its values
    Scalars(Vec<Value>),
    /// One tuple per row
    Tuples(Vec<Row>),
}

impl QueryRows {
    /// Flattens single-field rows into scalars
    pub fn from_rows(rows: Vec<Row>) -> Self {
        if !rows.is_empty() && rows.iter().all(|row| row.len() == 1) {
            QueryRows::Scalars(rows.into_iter().flatten().collect())
        } else {
            QueryRows::Tuples(rows)
        }
    }

    pub fn len(&self) -> usize {
        match self {
            QueryRows::Scalars(values) => values.len(),
            QueryRows::Tuples(rows) => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Executes a statement and returns the cursor that ran it.
///
/// A cursor is taken from `con` unless one is supplied. On failure the
/// connection is rolled back (a failing rollback is ignored) and the
/// original error is returned.
///
/// # Arguments
///
/// * `sql` - The statement to execute
/// * `con` - Connection owning the transaction
/// * `cur` - Cursor to reuse instead of opening a new one
/// * `params` - Parameters to bind, if any
pub fn execute<'c, C>(
    sql: &str,
    con: &'c C,
    cur: Option<Box<dyn DbCursor + 'c>>,
    params: Option<&Params>,
) -> Result<Box<dyn DbCursor + 'c>>
where
    C: DbConnection + ?Sized,
{
    let attempt = cur.map(Ok).unwrap_or_else(|| con.cursor()).and_then(|mut cur| {
        cur.execute(sql, params)?;
        Ok(cur)
    });

    attempt.map_err(|e| {
        if let Err(rollback_err) = con.rollback() {
            debug!("Rollback after failed statement also failed: {}", rollback_err);
        }
        error!(sql = %sql, "Error on sql: {}", e);
        e
    })
}

/// Drains the cursor's result set.
///
/// Operational errors (typically a statement that produced no result set)
/// yield an empty result; any other error is returned.
pub fn safe_fetch(cur: &mut dyn DbCursor) -> Result<Vec<Row>> {
    match cur.fetchall() {
        Ok(rows) => Ok(rows),
        Err(e) if e.is_operational() => {
            debug!("No rows fetched: {}", e);
            Ok(Vec::new())
        }
        Err(e) => Err(e),
    }
}

/// Runs a query and returns its rows.
///
/// A single-column result is flattened into `QueryRows::Scalars`. After
/// fetching, the cursor is closed and the connection committed. When the
/// commit fails with an operational error and `retry` is set, the whole
/// query is executed once more on a fresh cursor. When that commit fails
/// too, the rows already fetched are returned.
///
/// # Arguments
///
/// * `sql` - SQL query to execute
/// * `con` - Connection to run it on
/// * `cur` - Cursor to use for the first attempt, when executing several
///   statements on one cursor
/// * `retry` - Whether an operational commit failure triggers a retry
pub fn tquery<'c, C>(
    sql: &str,
    con: &'c C,
    cur: Option<Box<dyn DbCursor + 'c>>,
    retry: bool,
) -> Result<QueryRows>
where
    C: DbConnection + ?Sized,
{
    let retries = if retry { MAX_COMMIT_RETRIES } else { 0 };
    let mut cur = cur;
    let mut attempt = 0;

    loop {
        let mut cursor = execute(sql, con, cur.take(), None)?;
        let rows = safe_fetch(cursor.as_mut())?;

        match close_and_commit(cursor, con) {
            Ok(()) => return Ok(QueryRows::from_rows(rows)),
            Err(e) if e.is_operational() => {
                warn!("Failed to commit, may need to reconnect: {}", e);
                if attempt < retries {
                    attempt += 1;
                    continue;
                }
                return Ok(QueryRows::from_rows(rows));
            }
            Err(e) => return Err(e),
        }
    }
}

/// Runs a statement and returns the number of affected rows.
///
/// Retries once on an operational commit failure like `tquery`, binding the
/// same parameters again.
pub fn uquery<'c, C>(
    sql: &str,
    con: &'c C,
    cur: Option<Box<dyn DbCursor + 'c>>,
    retry: bool,
    params: Option<&Params>,
) -> Result<i64>
where
    C: DbConnection + ?Sized,
{
    let retries = if retry { MAX_COMMIT_RETRIES } else { 0 };
    let mut cur = cur;
    let mut attempt = 0;

    loop {
        let cursor = execute(sql, con, cur.take(), params)?;
        let rowcount = cursor.rowcount();
        drop(cursor);

        match con.commit() {
            Ok(()) => return Ok(rowcount),
            Err(e) if e.is_operational() => {
                warn!("Failed to commit: {}", e);
                if attempt < retries {
                    warn!("Looks like your connection failed, reconnecting...");
                    attempt += 1;
                    continue;
                }
                return Ok(rowcount);
            }
            Err(e) => return Err(e),
        }
    }
}

/// Runs a query and materializes its result set as a `Frame`.
///
/// Column names come from the cursor description. With `index_col`, that
/// column becomes the frame's row identifier. With `coerce_float`,
/// numeric-looking text columns are converted to floats.
///
/// # Errors
///
/// Errors from execution, fetching and commit propagate without retry. An
/// unknown `index_col` yields `SqlFrameError::Frame`.
pub fn read_frame<C>(sql: &str, con: &C, index_col: Option<&str>, coerce_float: bool) -> Result<Frame>
where
    C: DbConnection + ?Sized,
{
    let mut cursor = execute(sql, con, None, None)?;
    let rows = safe_fetch(cursor.as_mut())?;
    let columns: Vec<String> = cursor.description().map(<[String]>::to_vec).unwrap_or_default();

    close_and_commit(cursor, con)?;

    let frame = Frame::from_records(rows, columns, coerce_float)?;
    match index_col {
        Some(name) => frame.set_index(name),
        None => Ok(frame),
    }
}

/// Alias of `read_frame`
pub fn frame_query<C>(sql: &str, con: &C, index_col: Option<&str>, coerce_float: bool) -> Result<Frame>
where
    C: DbConnection + ?Sized,
{
    read_frame(sql, con, index_col, coerce_float)
}

fn close_and_commit<C>(mut cursor: Box<dyn DbCursor + '_>, con: &C) -> Result<()>
where
    C: DbConnection + ?Sized,
{
    cursor.close()?;
    drop(cursor);
    con.commit()
}

/// Represents different SQL statement types for introspection
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StatementType {
    /// SELECT statement
    Select,
    /// INSERT statement
    Insert,
    /// UPDATE statement
    Update,
    /// DELETE statement
    Delete,
    /// REPLACE statement
    Replace,
    /// CREATE statement
    Create,
    /// DROP statement
    Drop,
    /// ALTER statement
    Alter,
    /// BEGIN/COMMIT/ROLLBACK transaction commands
    Transaction,
    /// Other statement types
    Other,
}

impl StatementType {
    /// Determines the statement type from a SQL string.
    ///
    /// Leading `--` and `/* */` comments are skipped. A `WITH` statement is
    /// classified by the data-modifying keyword it contains, if any.
    pub fn from_sql(sql: &str) -> Self {
        let sql_upper = strip_leading_comments(sql).to_uppercase();
        let mut words = sql_upper
            .split(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
            .filter(|w| !w.is_empty());

        match words.next().unwrap_or("") {
            "WITH" => words
                .map(Self::from_keyword)
                .find(|t| {
                    matches!(
                        t,
                        StatementType::Insert | StatementType::Update | StatementType::Delete | StatementType::Replace
                    )
                })
                .unwrap_or(StatementType::Select),
            keyword => Self::from_keyword(keyword),
        }
    }

    fn from_keyword(keyword: &str) -> Self {
        match keyword {
            "SELECT" => StatementType::Select,
            "INSERT" => StatementType::Insert,
            "UPDATE" => StatementType::Update,
            "DELETE" => StatementType::Delete,
            "REPLACE" => StatementType::Replace,
            "CREATE" => StatementType::Create,
            "DROP" => StatementType::Drop,
            "ALTER" => StatementType::Alter,
            "BEGIN" | "COMMIT" | "ROLLBACK" | "END" => StatementType::Transaction,
            _ => StatementType::Other,
        }
    }
}

fn strip_leading_comments(sql: &str) -> &str {
    let mut rest = sql.trim_start();
    loop {
        if let Some(line) = rest.strip_prefix("--") {
            rest = line.find('\n').map_or("", |end| &line[end + 1..]).trim_start();
        } else if let Some(block) = rest.strip_prefix("/*") {
            rest = block.find("*/").map_or("", |end| &block[end + 2..]).trim_start();
        } else {
            return rest;
        }
    }
}
