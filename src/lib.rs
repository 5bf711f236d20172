// Core infrastructure modules
pub mod core;

pub mod config;
pub mod dialect;
pub mod frame;

#[cfg(test)]
pub(crate) mod test_utils;

pub use crate::core::db::{
    execute, frame_query, get_schema, get_sqltype, read_frame, safe_fetch, table_exists, tquery,
    uquery, write_frame, DbConnection, DbCursor, IfExists, Params, QueryRows, SqliteConnection,
};
pub use crate::core::{Result, SqlFrameError};
pub use crate::dialect::Dialect;
pub use crate::frame::{DType, Frame, Series, Value};
