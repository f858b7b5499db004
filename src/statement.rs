//! Traced statement wrapper.

use async_trait::async_trait;

use crate::capability::{ResultSet, Statement};
use crate::error::DriverResult;
use crate::interceptor::{Call, Interceptor, Scalar, Wrap, WrapOptional};
use crate::result_set::TracedResultSet;
use crate::signature::Operation;
use crate::span::{SpanContext, Tracer};

const EXECUTE_QUERY: Operation = Operation::new("execute_query", &["&str"], "ResultSet");
const EXECUTE_UPDATE: Operation = Operation::new("execute_update", &["&str"], "u64");
const EXECUTE: Operation = Operation::new("execute", &["&str"], "bool");
const RESULT_SET: Operation = Operation::new("result_set", &[], "Option<ResultSet>");
const UPDATE_COUNT: Operation = Operation::new("update_count", &[], "Option<u64>");
const SET_MAX_ROWS: Operation = Operation::new("set_max_rows", &["u64"], "()");
const CLOSE: Operation = Operation::new("close", &[], "()");

/// A traced wrapper around a driver [`Statement`].
///
/// `execute_query` spans are labeled with the query text, e.g.
/// `SQL: [select 1]`, and the result set they return is traced under them.
pub struct TracedStatement {
    inner: Box<dyn Statement>,
    interceptor: Interceptor,
}

impl TracedStatement {
    pub fn new(statement: Box<dyn Statement>, tracer: Tracer, parent: SpanContext) -> Self {
        Self {
            inner: statement,
            interceptor: Interceptor::new(tracer, parent),
        }
    }

    pub(crate) fn boxed(inner: Box<dyn Statement>, interceptor: Interceptor) -> Box<dyn Statement> {
        Box::new(Self { inner, interceptor })
    }

    pub fn inner(&self) -> &dyn Statement {
        self.inner.as_ref()
    }

    pub fn into_inner(self) -> Box<dyn Statement> {
        self.inner
    }
}

#[async_trait]
impl Statement for TracedStatement {
    async fn execute_query(&mut self, sql: &str) -> DriverResult<Box<dyn ResultSet>> {
        self.interceptor
            .intercept(
                Call::query(&EXECUTE_QUERY, sql, &[&sql]),
                self.inner.execute_query(sql),
                Wrap(TracedResultSet::boxed),
            )
            .await
    }

    async fn execute_update(&mut self, sql: &str) -> DriverResult<u64> {
        self.interceptor
            .intercept(
                Call::new(&EXECUTE_UPDATE, &[&sql]).with_statement(sql),
                self.inner.execute_update(sql),
                Scalar,
            )
            .await
    }

    async fn execute(&mut self, sql: &str) -> DriverResult<bool> {
        self.interceptor
            .intercept(
                Call::new(&EXECUTE, &[&sql]).with_statement(sql),
                self.inner.execute(sql),
                Scalar,
            )
            .await
    }

    async fn result_set(&mut self) -> DriverResult<Option<Box<dyn ResultSet>>> {
        self.interceptor
            .intercept(
                Call::new(&RESULT_SET, &[]),
                self.inner.result_set(),
                WrapOptional(TracedResultSet::boxed),
            )
            .await
    }

    async fn update_count(&mut self) -> DriverResult<Option<u64>> {
        self.interceptor
            .intercept(Call::new(&UPDATE_COUNT, &[]), self.inner.update_count(), Scalar)
            .await
    }

    async fn set_max_rows(&mut self, max: u64) -> DriverResult<()> {
        self.interceptor
            .intercept(
                Call::new(&SET_MAX_ROWS, &[&max]),
                self.inner.set_max_rows(max),
                Scalar,
            )
            .await
    }

    async fn close(&mut self) -> DriverResult<()> {
        self.interceptor
            .intercept(Call::new(&CLOSE, &[]), self.inner.close(), Scalar)
            .await
    }
}
