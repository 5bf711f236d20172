/// Database Module
///
/// This module provides the database helpers of sqlframe, organized into
/// focused submodules.
///
/// ## Architecture
///
/// - **Connection Contract** (`connection.rs`): cursor/connection traits and the SQLite adapter
/// - **Query Execution** (`query.rs`): statement execution, fetching, and the row/count/frame query helpers
/// - **Schema Generation** (`schema.rs`): SQL type mapping, CREATE TABLE generation, existence checks
/// - **Frame Writing** (`write.rs`): bulk INSERT generation and `write_frame`
///
/// ## Error Handling
///
/// All database operations use the standardized `SqlFrameError` type for consistent error propagation.
pub mod connection;
pub mod query;
pub mod schema;
pub mod write;

pub use connection::*;
pub use query::*;
pub use schema::*;
pub use write::*;
