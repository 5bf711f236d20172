/// Core Module for sqlframe
///
/// This module contains the database layer (connection contract, query
/// wrappers, statement generation) and the shared error type.

pub mod db;
pub mod error;

// Re-export commonly used types for convenience
pub use error::{Result, SqlFrameError};
