//! SQL dialects supported by the statement generators.
//!
//! Each supported dialect has one `Flavor` implementation holding its column
//! type table, identifier quoting, placeholder style and catalog lookup.

use crate::core::{Result, SqlFrameError};
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

/// Target database backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    #[default]
    Sqlite,
    Mysql,
    Oracle,
    Postgresql,
    /// Recognized but without SQL generation support
    Odbc,
}

impl Dialect {
    pub fn name(self) -> &'static str {
        match self {
            Dialect::Sqlite => "sqlite",
            Dialect::Mysql => "mysql",
            Dialect::Oracle => "oracle",
            Dialect::Postgresql => "postgresql",
            Dialect::Odbc => "odbc",
        }
    }

    /// Returns the implementation for this dialect.
    ///
    /// `Odbc` yields `NotImplemented`.
    pub fn flavor(self) -> Result<&'static dyn Flavor> {
        match self {
            Dialect::Sqlite => Ok(&SqliteFlavor),
            Dialect::Mysql => Ok(&MysqlFlavor),
            Dialect::Oracle => Ok(&OracleFlavor),
            Dialect::Postgresql => Ok(&PostgresFlavor),
            Dialect::Odbc => Err(SqlFrameError::NotImplemented(format!(
                "dialect '{}' is not supported",
                self
            ))),
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Dialect {
    type Err = SqlFrameError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "sqlite" => Ok(Dialect::Sqlite),
            "mysql" => Ok(Dialect::Mysql),
            "oracle" => Ok(Dialect::Oracle),
            "postgresql" => Ok(Dialect::Postgresql),
            "odbc" => Ok(Dialect::Odbc),
            other => Err(SqlFrameError::NotImplemented(format!("unknown dialect '{}'", other))),
        }
    }
}

/// Column type keywords of one dialect, one per value category
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeTable {
    pub text: &'static str,
    pub float: &'static str,
    pub integer: &'static str,
    pub datetime: &'static str,
    pub date: &'static str,
}

/// How INSERT parameters are passed to the driver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindStyle {
    /// A plain sequence per row
    Positional,
    /// A mapping keyed by 1-based position ("1", "2", ...)
    Named,
}

/// Per-dialect SQL text conventions
pub trait Flavor: Sync {
    fn dialect(&self) -> Dialect;

    /// Column type keywords
    fn types(&self) -> &'static TypeTable;

    /// Quotes a column identifier
    fn quote_identifier(&self, name: &str) -> String;

    /// Placeholder for the 1-based parameter `position`
    fn placeholder(&self, position: usize) -> String;

    fn bind_style(&self) -> BindStyle {
        BindStyle::Positional
    }

    /// Catalog query returning at least one row when `table` exists
    fn table_exists_sql(&self, table: &str) -> String;

    /// Whether generated DDL keeps its `;` terminator
    fn keeps_terminator(&self) -> bool {
        true
    }
}

const SQLITE_TYPES: TypeTable = TypeTable {
    text: "TEXT",
    float: "REAL",
    integer: "INTEGER",
    datetime: "TIMESTAMP",
    date: "TIMESTAMP",
};

const MYSQL_TYPES: TypeTable = TypeTable {
    text: "VARCHAR(63)",
    float: "FLOAT",
    integer: "BIGINT",
    datetime: "DATETIME",
    date: "DATE",
};

const ORACLE_TYPES: TypeTable = TypeTable {
    text: "VARCHAR2(63)",
    float: "NUMBER",
    integer: "NUMBER(19)",
    datetime: "DATE",
    date: "DATE",
};

const POSTGRES_TYPES: TypeTable = TypeTable {
    text: "TEXT",
    float: "DOUBLE PRECISION",
    integer: "BIGINT",
    datetime: "TIMESTAMP",
    date: "DATE",
};

pub struct SqliteFlavor;

impl Flavor for SqliteFlavor {
    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }

    fn types(&self) -> &'static TypeTable {
        &SQLITE_TYPES
    }

    fn quote_identifier(&self, name: &str) -> String {
        format!("[{}]", name)
    }

    fn placeholder(&self, _position: usize) -> String {
        "?".to_string()
    }

    fn table_exists_sql(&self, table: &str) -> String {
        format!(
            "SELECT name FROM sqlite_master WHERE type='table' AND name='{}';",
            table
        )
    }
}

pub struct MysqlFlavor;

impl Flavor for MysqlFlavor {
    fn dialect(&self) -> Dialect {
        Dialect::Mysql
    }

    fn types(&self) -> &'static TypeTable {
        &MYSQL_TYPES
    }

    fn quote_identifier(&self, name: &str) -> String {
        format!("`{}`", name)
    }

    fn placeholder(&self, _position: usize) -> String {
        "%s".to_string()
    }

    fn table_exists_sql(&self, table: &str) -> String {
        format!("SHOW TABLES LIKE '{}'", table)
    }
}

pub struct OracleFlavor;

impl Flavor for OracleFlavor {
    fn dialect(&self) -> Dialect {
        Dialect::Oracle
    }

    fn types(&self) -> &'static TypeTable {
        &ORACLE_TYPES
    }

    fn quote_identifier(&self, name: &str) -> String {
        name.to_string()
    }

    fn placeholder(&self, position: usize) -> String {
        format!(":{}", position)
    }

    fn bind_style(&self) -> BindStyle {
        BindStyle::Named
    }

    // Unquoted identifiers are stored upper-case in the catalog.
    fn table_exists_sql(&self, table: &str) -> String {
        format!(
            "SELECT table_name FROM user_tables WHERE table_name='{}'",
            table.to_uppercase()
        )
    }

    fn keeps_terminator(&self) -> bool {
        false
    }
}

pub struct PostgresFlavor;

impl Flavor for PostgresFlavor {
    fn dialect(&self) -> Dialect {
        Dialect::Postgresql
    }

    fn types(&self) -> &'static TypeTable {
        &POSTGRES_TYPES
    }

    fn quote_identifier(&self, name: &str) -> String {
        name.to_string()
    }

    fn placeholder(&self, position: usize) -> String {
        format!("%({})s", position)
    }

    fn bind_style(&self) -> BindStyle {
        BindStyle::Named
    }

    fn table_exists_sql(&self, table: &str) -> String {
        format!("SELECT * FROM pg_tables WHERE tablename='{}';", table)
    }
}
