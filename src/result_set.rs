//! Traced result set and result set metadata wrappers.

use async_trait::async_trait;

use crate::capability::{ResultSet, ResultSetMetadata, Value};
use crate::error::DriverResult;
use crate::interceptor::{Call, Inspect, Interceptor, Scalar, Wrap};
use crate::signature::Operation;
use crate::span::{CallSpan, SpanContext, Tracer};

const NEXT: Operation = Operation::new("next", &[], "bool");
const GET_VALUE: Operation = Operation::new("get_value", &["usize"], "Value");
const GET_I64: Operation = Operation::new("get_i64", &["usize"], "Option<i64>");
const GET_STRING: Operation = Operation::new("get_string", &["usize"], "Option<String>");
const METADATA: Operation = Operation::new("metadata", &[], "ResultSetMetadata");
const CLOSE: Operation = Operation::new("close", &[], "()");

const COLUMN_COUNT: Operation = Operation::new("column_count", &[], "usize");
const COLUMN_NAME: Operation = Operation::new("column_name", &["usize"], "String");
const COLUMN_LABEL: Operation = Operation::new("column_label", &["usize"], "String");
const COLUMN_TYPE_NAME: Operation = Operation::new("column_type_name", &["usize"], "String");
const IS_NULLABLE: Operation = Operation::new("is_nullable", &["usize"], "bool");

/// A traced wrapper around a driver [`ResultSet`].
///
/// Each `next` call gets its own span. With row counting enabled, the call
/// that reports exhaustion also records `db.rows_returned`.
pub struct TracedResultSet {
    inner: Box<dyn ResultSet>,
    interceptor: Interceptor,
    rows: u64,
}

impl TracedResultSet {
    pub fn new(result_set: Box<dyn ResultSet>, tracer: Tracer, parent: SpanContext) -> Self {
        Self {
            inner: result_set,
            interceptor: Interceptor::new(tracer, parent),
            rows: 0,
        }
    }

    pub(crate) fn boxed(inner: Box<dyn ResultSet>, interceptor: Interceptor) -> Box<dyn ResultSet> {
        Box::new(Self {
            inner,
            interceptor,
            rows: 0,
        })
    }

    /// Rows seen so far through `next`.
    pub fn rows_seen(&self) -> u64 {
        self.rows
    }

    pub fn inner(&self) -> &dyn ResultSet {
        self.inner.as_ref()
    }

    pub fn into_inner(self) -> Box<dyn ResultSet> {
        self.inner
    }
}

#[async_trait]
impl ResultSet for TracedResultSet {
    async fn next(&mut self) -> DriverResult<bool> {
        let count_rows = self.interceptor.tracer().config().record_row_counts;
        let rows = &mut self.rows;

        self.interceptor
            .intercept(
                Call::new(&NEXT, &[]),
                self.inner.next(),
                Inspect(|has_row: &bool, span: &CallSpan| {
                    if *has_row {
                        *rows += 1;
                    } else if count_rows {
                        span.set_u64("db.rows_returned", *rows);
                    }
                }),
            )
            .await
    }

    async fn get_value(&self, column: usize) -> DriverResult<Value> {
        self.interceptor
            .intercept(
                Call::new(&GET_VALUE, &[&column]),
                self.inner.get_value(column),
                Scalar,
            )
            .await
    }

    async fn get_i64(&self, column: usize) -> DriverResult<Option<i64>> {
        self.interceptor
            .intercept(
                Call::new(&GET_I64, &[&column]),
                self.inner.get_i64(column),
                Scalar,
            )
            .await
    }

    async fn get_string(&self, column: usize) -> DriverResult<Option<String>> {
        self.interceptor
            .intercept(
                Call::new(&GET_STRING, &[&column]),
                self.inner.get_string(column),
                Scalar,
            )
            .await
    }

    async fn metadata(&self) -> DriverResult<Box<dyn ResultSetMetadata>> {
        self.interceptor
            .intercept(
                Call::new(&METADATA, &[]),
                self.inner.metadata(),
                Wrap(TracedResultSetMetadata::boxed),
            )
            .await
    }

    async fn close(&mut self) -> DriverResult<()> {
        self.interceptor
            .intercept(Call::new(&CLOSE, &[]), self.inner.close(), Scalar)
            .await
    }
}

/// A traced wrapper around driver [`ResultSetMetadata`].
pub struct TracedResultSetMetadata {
    inner: Box<dyn ResultSetMetadata>,
    interceptor: Interceptor,
}

impl TracedResultSetMetadata {
    pub fn new(metadata: Box<dyn ResultSetMetadata>, tracer: Tracer, parent: SpanContext) -> Self {
        Self {
            inner: metadata,
            interceptor: Interceptor::new(tracer, parent),
        }
    }

    pub(crate) fn boxed(
        inner: Box<dyn ResultSetMetadata>,
        interceptor: Interceptor,
    ) -> Box<dyn ResultSetMetadata> {
        Box::new(Self { inner, interceptor })
    }

    pub fn into_inner(self) -> Box<dyn ResultSetMetadata> {
        self.inner
    }
}

#[async_trait]
impl ResultSetMetadata for TracedResultSetMetadata {
    async fn column_count(&self) -> DriverResult<usize> {
        self.interceptor
            .intercept(Call::new(&COLUMN_COUNT, &[]), self.inner.column_count(), Scalar)
            .await
    }

    async fn column_name(&self, column: usize) -> DriverResult<String> {
        self.interceptor
            .intercept(
                Call::new(&COLUMN_NAME, &[&column]),
                self.inner.column_name(column),
                Scalar,
            )
            .await
    }

    async fn column_label(&self, column: usize) -> DriverResult<String> {
        self.interceptor
            .intercept(
                Call::new(&COLUMN_LABEL, &[&column]),
                self.inner.column_label(column),
                Scalar,
            )
            .await
    }

    async fn column_type_name(&self, column: usize) -> DriverResult<String> {
        self.interceptor
            .intercept(
                Call::new(&COLUMN_TYPE_NAME, &[&column]),
                self.inner.column_type_name(column),
                Scalar,
            )
            .await
    }

    async fn is_nullable(&self, column: usize) -> DriverResult<bool> {
        self.interceptor
            .intercept(
                Call::new(&IS_NULLABLE, &[&column]),
                self.inner.is_nullable(column),
                Scalar,
            )
            .await
    }
}
