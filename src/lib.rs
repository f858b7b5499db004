//! # driver-insight
//!
//! A transparent tracing shim that sits between a database client and the
//! real driver.
//!
//! Every call made through a traced connection, and through every statement,
//! result set, and metadata object reached from it, is forwarded unchanged
//! to the real driver and recorded as a `tracing` span. The spans form a tree
//! that mirrors the objects the client walked through:
//!
//! ```text
//! Driver::connect(&str, &Properties) -> Connection
//! └── create_statement() -> Statement
//!     └── SQL: [select 1]
//!         ├── next() -> bool
//!         ├── get_i64(usize) -> Option<i64>
//!         └── metadata() -> ResultSetMetadata
//!             └── column_type_name(usize) -> String
//! ```
//!
//! Parent links travel as OpenTelemetry contexts, so install a
//! `tracing_opentelemetry` layer to see the tree. A span ends when its call
//! returns, even while the wrappers built from its result are still in use.
//! Without the layer every call span is a root.
//!
//! ## Features
//!
//! - **Drop-in wrappers**: `TracedConnection` and friends implement the same
//!   capability traits as the objects they wrap
//! - **Span tree**: each wrapper's spans are children of the call that created it
//! - **Readable queries**: `execute_query` spans are labeled with the SQL text
//! - **Unchanged behavior**: results and errors come back exactly as the driver
//!   produced them; failures are additionally recorded on the span
//! - **Explicit driver override**: `jdbcpath`/`jdbcclass` select the real driver
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use driver_insight::prelude::*;
//!
//! let driver = InsightDriver::builder()
//!     .registry(DriverRegistry::new().with_driver(Arc::new(pg_driver)))
//!     .build();
//!
//! let conn = driver
//!     .connect("jdbc:insight:postgresql://localhost/app", &Properties::new())
//!     .await?;
//! let mut stmt = conn.create_statement().await?;
//! let mut rows = stmt.execute_query("select 1").await?;
//! while rows.next().await? {}
//! ```
//!
//! ## Span Attributes
//!
//! | Attribute | Description |
//! |-----------|-------------|
//! | `otel.name` | Operation signature, or `SQL: [...]` for queries |
//! | `arg0`..`arg7` | Rendered arguments (`null` when absent) |
//! | `args.count` | Number of arguments |
//! | `return` | Rendered result, or the capability type for wrapped results |
//! | `db.operation` | SQL operation (SELECT, INSERT, ...) for SQL-bearing calls |
//! | `db.sql.table` | Target table name (when detectable) |
//! | `db.statement` | Full SQL text (when enabled) |
//! | `db.rows_returned` | Rows seen by a result set, on the exhausting `next` |
//! | `db.duration_ms` | Call duration |
//! | `otel.status_code` | "OK" or "ERROR" |
//! | `error`, `error.message` | Set on failure, next to an `exception` event |

mod attributes;
mod capability;
mod config;
mod connection;
mod driver;
mod error;
mod interceptor;
mod metadata;
mod options;
mod parser;
mod passthrough;
mod registry;
mod result_set;
mod signature;
mod span;
mod statement;

pub use attributes::{render, Recordable, MAX_RECORDED_ARGS, NULL_MARKER, UNRENDERABLE};
pub use capability::{
    Capability, Connection, DatabaseMetadata, Reply, ResultSet, ResultSetMetadata, Statement,
    Value,
};
pub use config::TracingConfig;
pub use connection::{TracedConnection, TracingExt};
pub use driver::{Driver, InsightDriver, InsightDriverBuilder};
pub use error::{DriverError, DriverResult};
pub use metadata::TracedDatabaseMetadata;
pub use options::{
    accepts_prefix, strip_prefix, DriverOptions, Properties, DRIVER_CLASS, DRIVER_PATH,
    TARGET_PREFIX, URL_PREFIX,
};
pub use parser::{ParsedSql, SqlOperation};
pub use passthrough::TracedCapability;
pub use registry::{DriverLoader, DriverRegistry, StaticLoader};
pub use result_set::{TracedResultSet, TracedResultSetMetadata};
pub use signature::{signature, Operation};
pub use span::{CallSpan, SpanContext, Tracer};
pub use statement::TracedStatement;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        Capability, Connection, DatabaseMetadata, Driver, DriverRegistry, InsightDriver,
        Properties, ResultSet, ResultSetMetadata, Statement, TracedConnection, TracingConfig,
        TracingExt,
    };
}
