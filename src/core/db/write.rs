/// Frame Writing Module
///
/// This module builds dialect-specific bulk INSERT statements and writes a
/// `Frame` into a table, creating or replacing the table according to an
/// `IfExists` policy.

use crate::core::db::connection::{DbConnection, Params};
use crate::core::db::query::execute;
use crate::core::db::schema::{get_schema, safe_column_name, table_exists};
use crate::core::{Result, SqlFrameError};
use crate::dialect::{BindStyle, Dialect};
use crate::frame::{Frame, Value};
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, error, info};

/// What `write_frame` does when the target table already exists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IfExists {
    /// Refuse to write into an existing table
    #[default]
    Fail,
    /// Drop and recreate the table, then insert
    Replace,
    /// Insert into the existing table; refuse when it is missing
    Append,
}

impl fmt::Display for IfExists {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            IfExists::Fail => "fail",
            IfExists::Replace => "replace",
            IfExists::Append => "append",
        };
        f.write_str(name)
    }
}

impl FromStr for IfExists {
    type Err = SqlFrameError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "fail" => Ok(IfExists::Fail),
            "replace" => Ok(IfExists::Replace),
            "append" => Ok(IfExists::Append),
            other => Err(SqlFrameError::Config(format!(
                "'{}' is not valid for if_exists (expected fail, replace or append)",
                other
            ))),
        }
    }
}

/// A bulk INSERT: statement text plus one parameter set per row
#[derive(Debug, Clone, PartialEq)]
pub struct InsertStatement {
    pub sql: String,
    pub rows: Vec<Params>,
}

/// Keys the values of a row by their 1-based position ("1", "2", ...)
pub fn sequence_to_named(row: Vec<Value>) -> Params {
    Params::Named(
        row.into_iter()
            .enumerate()
            .map(|(i, value)| ((i + 1).to_string(), value))
            .collect(),
    )
}

/// Builds the INSERT statement and bind rows for `frame` in `flavor`.
///
/// The index column, if any, is not written.
pub fn insert_statement(frame: &Frame, name: &str, flavor: Dialect) -> Result<InsertStatement> {
    let flavor = flavor.flavor()?;

    let col_names = frame
        .column_names()
        .iter()
        .map(|c| flavor.quote_identifier(&safe_column_name(c)))
        .collect::<Vec<_>>()
        .join(",");
    let wildcards = (1..=frame.width())
        .map(|i| flavor.placeholder(i))
        .collect::<Vec<_>>()
        .join(",");
    let sql = format!("INSERT INTO {} ({}) VALUES ({})", name, col_names, wildcards);

    let rows = match flavor.bind_style() {
        BindStyle::Positional => frame.rows().map(Params::Positional).collect(),
        BindStyle::Named => frame.rows().map(sequence_to_named).collect(),
    };

    Ok(InsertStatement { sql, rows })
}

/// Writes the rows of `frame` into table `name`.
///
/// The table is checked for existence first:
/// - `Fail`: error if it exists, otherwise create it
/// - `Append`: error if it is missing
/// - `Replace`: drop it if it exists, then create it
///
/// The rows are then inserted in one batch and the transaction committed.
///
/// # Errors
///
/// * `SqlFrameError::TableExists` / `SqlFrameError::TableMissing` on a policy
///   violation, before any DDL or DML runs
/// * `SqlFrameError::NotImplemented` for unsupported dialects
/// * `SqlFrameError::Frame` for a frame without columns
pub fn write_frame<C>(frame: &Frame, name: &str, con: &C, flavor: Dialect, if_exists: IfExists) -> Result<()>
where
    C: DbConnection + ?Sized,
{
    if frame.width() == 0 {
        return Err(SqlFrameError::Frame(format!("cannot write a frame without columns to '{}'", name)));
    }

    let exists = table_exists(name, con, flavor)?;
    match (if_exists, exists) {
        (IfExists::Fail, true) => return Err(SqlFrameError::TableExists(name.to_string())),
        (IfExists::Append, false) => return Err(SqlFrameError::TableMissing(name.to_string())),
        _ => {}
    }

    let insert = insert_statement(frame, name, flavor)?;

    if if_exists == IfExists::Replace && exists {
        info!("Dropping table {}", name);
        let mut cur = execute(&format!("DROP TABLE {}", name), con, None, None)?;
        cur.close()?;
    }
    if if_exists == IfExists::Replace || !exists {
        let create_table = get_schema(frame, name, flavor, None)?;
        info!("Creating table {}", name);
        let mut cur = execute(&create_table, con, None, None)?;
        cur.close()?;
    }

    debug!(rows = insert.rows.len(), "{}", insert.sql);
    let mut cur = con.cursor()?;
    if let Err(e) = cur.executemany(&insert.sql, &insert.rows) {
        if let Err(rollback_err) = con.rollback() {
            debug!("Rollback after failed insert also failed: {}", rollback_err);
        }
        error!(sql = %insert.sql, "Error on sql: {}", e);
        return Err(e);
    }
    cur.close()?;
    drop(cur);
    con.commit()
}
