//! Capability traits implemented by drivers and by their traced wrappers.
//!
//! Each trait is one role a driver object can play. The traced wrappers
//! implement the same traits, so a wrapped object is a drop-in replacement
//! for the raw one and can itself be wrapped again.
//!
//! Column indexes are 1-based, following the usual driver convention.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::DriverResult;
use crate::signature::Operation;

/// A dynamically typed scalar crossing the passthrough capability.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Bool(v) => write!(f, "{v}"),
            Value::Int(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Text(v) => f.write_str(v),
            Value::Bytes(bytes) => {
                f.write_str("0x")?;
                for byte in bytes {
                    write!(f, "{byte:02x}")?;
                }
                Ok(())
            }
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_owned())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

/// What a passthrough operation produced.
pub enum Reply {
    /// A plain value, returned to the caller as is.
    Value(Value),
    /// A further capability; `None` is the driver saying "nothing here".
    Capability(Option<Box<dyn Capability>>),
}

impl fmt::Debug for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reply::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Reply::Capability(Some(cap)) => {
                f.debug_tuple("Capability").field(&cap.type_name()).finish()
            }
            Reply::Capability(None) => f.write_str("Capability(None)"),
        }
    }
}

/// A session with a database.
#[async_trait]
pub trait Connection: Send + Sync {
    async fn create_statement(&self) -> DriverResult<Box<dyn Statement>>;

    async fn metadata(&self) -> DriverResult<Box<dyn DatabaseMetadata>>;

    /// Vendor-specific capability looked up by name.
    async fn extension(&self, _name: &str) -> DriverResult<Option<Box<dyn Capability>>> {
        Ok(None)
    }

    async fn set_auto_commit(&self, enabled: bool) -> DriverResult<()>;

    async fn auto_commit(&self) -> DriverResult<bool>;

    async fn commit(&self) -> DriverResult<()>;

    async fn rollback(&self) -> DriverResult<()>;

    async fn is_valid(&self, timeout: Duration) -> DriverResult<bool>;

    async fn close(&self) -> DriverResult<()>;

    async fn is_closed(&self) -> DriverResult<bool>;
}

/// Executes SQL text against its connection.
#[async_trait]
pub trait Statement: Send + Sync {
    async fn execute_query(&mut self, sql: &str) -> DriverResult<Box<dyn ResultSet>>;

    /// Returns the number of affected rows.
    async fn execute_update(&mut self, sql: &str) -> DriverResult<u64>;

    /// Returns `true` when the statement produced a result set.
    async fn execute(&mut self, sql: &str) -> DriverResult<bool>;

    /// The result set of the last `execute`, if it produced one.
    async fn result_set(&mut self) -> DriverResult<Option<Box<dyn ResultSet>>>;

    /// The update count of the last `execute`, if it produced one.
    async fn update_count(&mut self) -> DriverResult<Option<u64>>;

    async fn set_max_rows(&mut self, max: u64) -> DriverResult<()>;

    async fn close(&mut self) -> DriverResult<()>;
}

/// Forward-only row cursor.
#[async_trait]
pub trait ResultSet: Send + Sync {
    /// Advance to the next row; `false` once the rows are exhausted.
    async fn next(&mut self) -> DriverResult<bool>;

    async fn get_value(&self, column: usize) -> DriverResult<Value>;

    async fn get_i64(&self, column: usize) -> DriverResult<Option<i64>>;

    async fn get_string(&self, column: usize) -> DriverResult<Option<String>>;

    async fn metadata(&self) -> DriverResult<Box<dyn ResultSetMetadata>>;

    async fn close(&mut self) -> DriverResult<()>;
}

/// Column descriptions of a result set.
#[async_trait]
pub trait ResultSetMetadata: Send + Sync {
    async fn column_count(&self) -> DriverResult<usize>;

    async fn column_name(&self, column: usize) -> DriverResult<String>;

    async fn column_label(&self, column: usize) -> DriverResult<String>;

    async fn column_type_name(&self, column: usize) -> DriverResult<String>;

    async fn is_nullable(&self, column: usize) -> DriverResult<bool>;
}

/// Information about the database behind a connection.
#[async_trait]
pub trait DatabaseMetadata: Send + Sync {
    async fn product_name(&self) -> DriverResult<String>;

    async fn product_version(&self) -> DriverResult<String>;

    async fn driver_name(&self) -> DriverResult<String>;

    async fn url(&self) -> DriverResult<String>;

    async fn catalogs(&self) -> DriverResult<Box<dyn ResultSet>>;

    async fn tables(
        &self,
        catalog: Option<&str>,
        schema_pattern: Option<&str>,
        table_pattern: &str,
    ) -> DriverResult<Box<dyn ResultSet>>;
}

/// Catch-all for objects outside the typed roles above.
///
/// The object describes its own operations, which lets the tracing layer
/// wrap shapes it has no dedicated support for.
#[async_trait]
pub trait Capability: Send + Sync {
    fn type_name(&self) -> &str;

    fn operations(&self) -> Vec<Operation>;

    async fn invoke(&self, operation: &str, args: Vec<Value>) -> DriverResult<Reply>;
}
