//! Traced connection wrapper.

use std::time::Duration;

use async_trait::async_trait;

use crate::capability::{Capability, Connection, DatabaseMetadata, Statement};
use crate::config::TracingConfig;
use crate::error::DriverResult;
use crate::interceptor::{Call, Interceptor, Scalar, Wrap, WrapOptional};
use crate::metadata::TracedDatabaseMetadata;
use crate::passthrough::TracedCapability;
use crate::signature::Operation;
use crate::span::{SpanContext, Tracer};
use crate::statement::TracedStatement;

const CREATE_STATEMENT: Operation = Operation::new("create_statement", &[], "Statement");
const METADATA: Operation = Operation::new("metadata", &[], "DatabaseMetadata");
const EXTENSION: Operation = Operation::new("extension", &["&str"], "Option<Capability>");
const SET_AUTO_COMMIT: Operation = Operation::new("set_auto_commit", &["bool"], "()");
const AUTO_COMMIT: Operation = Operation::new("auto_commit", &[], "bool");
const COMMIT: Operation = Operation::new("commit", &[], "()");
const ROLLBACK: Operation = Operation::new("rollback", &[], "()");
const IS_VALID: Operation = Operation::new("is_valid", &["Duration"], "bool");
const CLOSE: Operation = Operation::new("close", &[], "()");
const IS_CLOSED: Operation = Operation::new("is_closed", &[], "bool");

/// A traced wrapper around a driver [`Connection`].
///
/// Implements [`Connection`] itself, so it is a drop-in replacement for the
/// raw connection. Every call gets a span, and the statements and metadata
/// it hands out are traced wrappers whose spans nest under the call that
/// produced them.
///
/// # Span Nesting
///
/// The connection's own spans are children of the context it was built
/// with. [`TracedConnection::wrap`] captures the current span, so wrapping
/// inside a request handler nests database spans under the request span.
///
/// # Example
///
/// ```rust,ignore
/// use driver_insight::{Connection, TracedConnection};
///
/// let conn = my_driver.connect(url, &props).await?;
/// let traced = TracedConnection::wrap(conn);
///
/// let mut stmt = traced.create_statement().await?;
/// let mut rows = stmt.execute_query("select 1").await?;
/// while rows.next().await? {}
/// ```
pub struct TracedConnection {
    inner: Box<dyn Connection>,
    interceptor: Interceptor,
}

impl TracedConnection {
    /// Wrap `connection`, parenting its spans to `parent`.
    pub fn new(connection: Box<dyn Connection>, tracer: Tracer, parent: SpanContext) -> Self {
        Self::with_interceptor(connection, Interceptor::new(tracer, parent))
    }

    /// Wrap with default configuration under the current span.
    pub fn wrap(connection: Box<dyn Connection>) -> Self {
        Self::with_config(connection, TracingConfig::default())
    }

    /// Wrap with custom configuration under the current span.
    pub fn with_config(connection: Box<dyn Connection>, config: TracingConfig) -> Self {
        Self::new(connection, Tracer::new(config), SpanContext::current())
    }

    pub(crate) fn with_interceptor(inner: Box<dyn Connection>, interceptor: Interceptor) -> Self {
        Self { inner, interceptor }
    }

    /// Get a reference to the underlying connection.
    pub fn inner(&self) -> &dyn Connection {
        self.inner.as_ref()
    }

    /// Get the tracing configuration.
    pub fn config(&self) -> &TracingConfig {
        self.interceptor.tracer().config()
    }

    /// Context that parents this connection's spans.
    pub fn parent_context(&self) -> &SpanContext {
        self.interceptor.parent()
    }

    /// Consume the wrapper and return the underlying connection.
    pub fn into_inner(self) -> Box<dyn Connection> {
        self.inner
    }
}

impl std::fmt::Debug for TracedConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TracedConnection")
            .field("interceptor", &self.interceptor)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Connection for TracedConnection {
    async fn create_statement(&self) -> DriverResult<Box<dyn Statement>> {
        self.interceptor
            .intercept(
                Call::new(&CREATE_STATEMENT, &[]),
                self.inner.create_statement(),
                Wrap(TracedStatement::boxed),
            )
            .await
    }

    async fn metadata(&self) -> DriverResult<Box<dyn DatabaseMetadata>> {
        self.interceptor
            .intercept(
                Call::new(&METADATA, &[]),
                self.inner.metadata(),
                Wrap(TracedDatabaseMetadata::boxed),
            )
            .await
    }

    async fn extension(&self, name: &str) -> DriverResult<Option<Box<dyn Capability>>> {
        self.interceptor
            .intercept(
                Call::new(&EXTENSION, &[&name]),
                self.inner.extension(name),
                WrapOptional(TracedCapability::boxed),
            )
            .await
    }

    async fn set_auto_commit(&self, enabled: bool) -> DriverResult<()> {
        self.interceptor
            .intercept(
                Call::new(&SET_AUTO_COMMIT, &[&enabled]),
                self.inner.set_auto_commit(enabled),
                Scalar,
            )
            .await
    }

    async fn auto_commit(&self) -> DriverResult<bool> {
        self.interceptor
            .intercept(Call::new(&AUTO_COMMIT, &[]), self.inner.auto_commit(), Scalar)
            .await
    }

    async fn commit(&self) -> DriverResult<()> {
        self.interceptor
            .intercept(Call::new(&COMMIT, &[]), self.inner.commit(), Scalar)
            .await
    }

    async fn rollback(&self) -> DriverResult<()> {
        self.interceptor
            .intercept(Call::new(&ROLLBACK, &[]), self.inner.rollback(), Scalar)
            .await
    }

    async fn is_valid(&self, timeout: Duration) -> DriverResult<bool> {
        self.interceptor
            .intercept(
                Call::new(&IS_VALID, &[&timeout]),
                self.inner.is_valid(timeout),
                Scalar,
            )
            .await
    }

    async fn close(&self) -> DriverResult<()> {
        self.interceptor
            .intercept(Call::new(&CLOSE, &[]), self.inner.close(), Scalar)
            .await
    }

    async fn is_closed(&self) -> DriverResult<bool> {
        self.interceptor
            .intercept(Call::new(&IS_CLOSED, &[]), self.inner.is_closed(), Scalar)
            .await
    }
}

/// Extension trait for easy wrapping of driver connections.
pub trait TracingExt {
    /// Wrap this connection with tracing instrumentation.
    fn with_tracing(self) -> TracedConnection;

    /// Wrap this connection with custom tracing configuration.
    fn with_tracing_config(self, config: TracingConfig) -> TracedConnection;
}

impl TracingExt for Box<dyn Connection> {
    fn with_tracing(self) -> TracedConnection {
        TracedConnection::wrap(self)
    }

    fn with_tracing_config(self, config: TracingConfig) -> TracedConnection {
        TracedConnection::with_config(self, config)
    }
}
