/// Schema Generation Module
///
/// This module maps column types to dialect-specific SQL types, generates
/// CREATE TABLE statements for a `Frame`, and checks whether a table exists.

use crate::core::db::connection::DbConnection;
use crate::core::db::query::tquery;
use crate::core::Result;
use crate::dialect::{Dialect, Flavor};
use crate::frame::{DType, Frame};
use tracing::debug;

/// Returns the SQL column type for `dtype` in `flavor`.
///
/// Later checks override earlier ones: text by default, then float for any
/// numeric type and integer for integer types, then timestamp for any
/// date/time type (the numeric datetime encoding included), then the
/// dialect's date type for pure calendar dates.
pub fn get_sqltype(dtype: DType, flavor: Dialect) -> Result<&'static str> {
    Ok(sqltype_for(dtype, flavor.flavor()?))
}

pub(crate) fn sqltype_for(dtype: DType, flavor: &dyn Flavor) -> &'static str {
    let types = flavor.types();
    let mut sqltype = types.text;
    if dtype.is_numeric() {
        sqltype = types.float;
        if dtype.is_integer() {
            sqltype = types.integer;
        }
    }
    if dtype.is_datetime() {
        sqltype = types.datetime;
    }
    if dtype.is_date() {
        sqltype = types.date;
    }
    sqltype
}

/// Replaces spaces with underscores and trims surrounding whitespace
pub fn safe_column_name(name: &str) -> String {
    name.replace(' ', "_").trim().to_string()
}

/// Returns a CREATE TABLE statement suiting the columns of `frame`.
///
/// # Arguments
///
/// * `frame` - Data whose column names and types define the table
/// * `name` - Table name, used as given
/// * `flavor` - Target dialect
/// * `keys` - Columns of an optional PRIMARY KEY clause
///
/// # Errors
///
/// Returns `SqlFrameError::NotImplemented` for unsupported dialects.
pub fn get_schema(frame: &Frame, name: &str, flavor: Dialect, keys: Option<&[&str]>) -> Result<String> {
    let flavor = flavor.flavor()?;

    let columns = frame
        .columns()
        .iter()
        .map(|c| {
            format!(
                "{} {}",
                flavor.quote_identifier(&safe_column_name(&c.name)),
                sqltype_for(c.dtype, flavor)
            )
        })
        .collect::<Vec<_>>()
        .join(",\n  ");

    let keystr = match keys {
        Some(keys) if !keys.is_empty() => {
            let keys: Vec<String> = keys
                .iter()
                .map(|k| flavor.quote_identifier(&safe_column_name(k)))
                .collect();
            format!(",\n  PRIMARY KEY ({})", keys.join(","))
        }
        _ => String::new(),
    };

    let terminator = if flavor.keeps_terminator() { ";" } else { "" };
    let statement = format!("CREATE TABLE {} (\n  {}{}\n){}", name, columns, keystr, terminator);
    debug!("Generated schema for {}: {}", name, statement);
    Ok(statement)
}

/// Checks whether `name` exists using the dialect's catalog.
///
/// # Errors
///
/// Returns `SqlFrameError::NotImplemented` for `odbc`; query errors propagate.
pub fn table_exists<C>(name: &str, con: &C, flavor: Dialect) -> Result<bool>
where
    C: DbConnection + ?Sized,
{
    let query = flavor.flavor()?.table_exists_sql(name);
    Ok(!tquery(&query, con, None, true)?.is_empty())
}
