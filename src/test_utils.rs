/// # Test Utilities Module
///
/// A scripted `DbConnection` for unit tests. It records every call made
/// through the connection contract and replays canned result sets and
/// failures, so query and write paths can be checked without a database.

use crate::core::db::connection::{DbConnection, DbCursor, Params, Row};
use crate::core::db::query::StatementType;
use crate::core::{Result, SqlFrameError};
use std::cell::RefCell;
use std::collections::VecDeque;

/// A call observed by `ScriptedConnection`
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Cursor,
    Execute(String),
    /// Statement and number of parameter sets
    ExecuteMany(String, usize),
    Fetch,
    Close,
    Commit,
    Rollback,
}

#[derive(Default)]
struct Script {
    columns: Vec<String>,
    rows: Vec<Row>,
    rowcount: i64,
    execute_failures: VecDeque<SqlFrameError>,
    executemany_failures: VecDeque<SqlFrameError>,
    fetch_failures: VecDeque<SqlFrameError>,
    commit_failures: VecDeque<SqlFrameError>,
    rollback_fails: bool,
}

/// Connection double returning canned results
#[derive(Default)]
pub struct ScriptedConnection {
    script: RefCell<Script>,
    calls: RefCell<Vec<Call>>,
    bound: RefCell<Vec<Params>>,
}

impl ScriptedConnection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Result set returned by every query (SELECT, SHOW, ...)
    pub fn with_result(self, columns: Vec<&str>, rows: Vec<Row>) -> Self {
        {
            let mut script = self.script.borrow_mut();
            script.columns = columns.into_iter().map(String::from).collect();
            script.rows = rows;
        }
        self
    }

    /// Row count reported for data-modifying statements
    pub fn with_rowcount(self, rowcount: i64) -> Self {
        self.script.borrow_mut().rowcount = rowcount;
        self
    }

    pub fn fail_execute(self, err: SqlFrameError) -> Self {
        self.script.borrow_mut().execute_failures.push_back(err);
        self
    }

    pub fn fail_executemany(self, err: SqlFrameError) -> Self {
        self.script.borrow_mut().executemany_failures.push_back(err);
        self
    }

    pub fn fail_fetch(self, err: SqlFrameError) -> Self {
        self.script.borrow_mut().fetch_failures.push_back(err);
        self
    }

    /// Failures returned by successive commits
    pub fn fail_commits(self, errs: Vec<SqlFrameError>) -> Self {
        self.script.borrow_mut().commit_failures.extend(errs);
        self
    }

    pub fn fail_rollback(self) -> Self {
        self.script.borrow_mut().rollback_fails = true;
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    pub fn count(&self, call: &Call) -> usize {
        self.calls.borrow().iter().filter(|c| *c == call).count()
    }

    /// Parameter sets bound so far, in order
    pub fn bound(&self) -> Vec<Params> {
        self.bound.borrow().clone()
    }

    fn record(&self, call: Call) {
        self.calls.borrow_mut().push(call);
    }
}

impl DbConnection for ScriptedConnection {
    fn cursor(&self) -> Result<Box<dyn DbCursor + '_>> {
        self.record(Call::Cursor);
        Ok(Box::new(ScriptedCursor {
            con: self,
            description: None,
            rows: Vec::new(),
            rowcount: -1,
        }))
    }

    fn commit(&self) -> Result<()> {
        self.record(Call::Commit);
        match self.script.borrow_mut().commit_failures.pop_front() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn rollback(&self) -> Result<()> {
        self.record(Call::Rollback);
        if self.script.borrow().rollback_fails {
            return Err(SqlFrameError::Operational("rollback failed".to_string()));
        }
        Ok(())
    }
}

struct ScriptedCursor<'c> {
    con: &'c ScriptedConnection,
    description: Option<Vec<String>>,
    rows: Vec<Row>,
    rowcount: i64,
}

impl DbCursor for ScriptedCursor<'_> {
    fn execute(&mut self, sql: &str, params: Option<&Params>) -> Result<()> {
        self.con.record(Call::Execute(sql.to_string()));
        if let Some(params) = params {
            self.con.bound.borrow_mut().push(params.clone());
        }
        let mut script = self.con.script.borrow_mut();
        if let Some(err) = script.execute_failures.pop_front() {
            return Err(err);
        }

        match StatementType::from_sql(sql) {
            StatementType::Select | StatementType::Other => {
                self.description = Some(script.columns.clone());
                self.rows = script.rows.clone();
                self.rowcount = -1;
            }
            _ => {
                self.description = None;
                self.rows = Vec::new();
                self.rowcount = script.rowcount;
            }
        }
        Ok(())
    }

    fn executemany(&mut self, sql: &str, rows: &[Params]) -> Result<()> {
        self.con.record(Call::ExecuteMany(sql.to_string(), rows.len()));
        self.con.bound.borrow_mut().extend(rows.iter().cloned());
        if let Some(err) = self.con.script.borrow_mut().executemany_failures.pop_front() {
            return Err(err);
        }
        self.description = None;
        self.rowcount = rows.len() as i64;
        Ok(())
    }

    fn fetchall(&mut self) -> Result<Vec<Row>> {
        self.con.record(Call::Fetch);
        if let Some(err) = self.con.script.borrow_mut().fetch_failures.pop_front() {
            return Err(err);
        }
        Ok(std::mem::take(&mut self.rows))
    }

    fn description(&self) -> Option<&[String]> {
        self.description.as_deref()
    }

    fn rowcount(&self) -> i64 {
        self.rowcount
    }

    fn close(&mut self) -> Result<()> {
        self.con.record(Call::Close);
        Ok(())
    }
}
