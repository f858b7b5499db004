//! The per-call interception engine shared by every traced wrapper.
//!
//! A call moves through `OPENED -> INVOKED -> (SUCCEEDED | FAILED) -> CLOSED`:
//!
//! 1. a span is started under the wrapper's parent context,
//! 2. the delegate future runs instrumented with that span,
//! 3. the result is classified by an [`Outcome`]: scalars are recorded and
//!    returned as is, capabilities are wrapped in a new traced wrapper whose
//!    parent is this call's span, errors are recorded and returned unchanged,
//! 4. the span closes when the [`CallSpan`] drops, whichever way the call went.

use std::future::Future;
use std::pin::Pin;

use tracing::Instrument;

use crate::attributes::{self, Recordable, NULL_MARKER};
use crate::error::DriverResult;
use crate::parser::{self, ParsedSql};
use crate::signature::Operation;
use crate::span::{CallSpan, SpanContext, Tracer};

/// One intercepted call: the operation and its arguments.
pub struct Call<'a> {
    operation: &'a Operation,
    args: &'a [&'a dyn Recordable],
    statement: Option<&'a str>,
    label_by_query: bool,
}

impl<'a> Call<'a> {
    pub fn new(operation: &'a Operation, args: &'a [&'a dyn Recordable]) -> Self {
        Self {
            operation,
            args,
            statement: None,
            label_by_query: false,
        }
    }

    /// A call that executes `sql`; adds `db.operation`, `db.sql.table` and
    /// `db.statement` to its span.
    pub fn with_statement(mut self, sql: &'a str) -> Self {
        self.statement = Some(sql);
        self
    }

    /// A call that turns `sql` into a cursor. Its span is labeled with the
    /// query text so traces read against the executed SQL, whatever the
    /// `log_statements` setting.
    pub fn query(operation: &'a Operation, sql: &'a str, args: &'a [&'a dyn Recordable]) -> Self {
        let mut call = Self::new(operation, args).with_statement(sql);
        call.label_by_query = true;
        call
    }

    pub fn operation(&self) -> &Operation {
        self.operation
    }

    fn label(&self) -> String {
        match self.statement {
            Some(sql) if self.label_by_query => parser::query_label(sql),
            _ => self.operation.signature(),
        }
    }

    fn describe(&self, span: &CallSpan, tracer: &Tracer) {
        let Some(sql) = self.statement else {
            return;
        };

        let parsed = ParsedSql::parse(sql);
        span.set_attribute("db.operation", parsed.operation.as_str());
        if let Some(table) = &parsed.table {
            span.set_attribute("db.sql.table", table);
        }
        if tracer.config().log_statements {
            span.set_attribute("db.statement", sql);
        }
    }
}

/// How a successful delegate result is turned into what the caller gets.
pub trait Outcome<T> {
    type Output;

    fn complete(self, value: T, span: &CallSpan, call: &Call<'_>, engine: &Interceptor)
        -> Self::Output;
}

/// Return the value unchanged and record it as `return`.
pub struct Scalar;

impl<T: Recordable> Outcome<T> for Scalar {
    type Output = T;

    fn complete(self, value: T, span: &CallSpan, call: &Call<'_>, engine: &Interceptor) -> T {
        attributes::record_return(span, call.operation(), &value, engine.tracer.config());
        value
    }
}

/// Like [`Scalar`], then hand the value and span to a callback.
pub struct Inspect<F>(pub F);

impl<T, F> Outcome<T> for Inspect<F>
where
    T: Recordable,
    F: FnOnce(&T, &CallSpan),
{
    type Output = T;

    fn complete(self, value: T, span: &CallSpan, call: &Call<'_>, engine: &Interceptor) -> T {
        attributes::record_return(span, call.operation(), &value, engine.tracer.config());
        (self.0)(&value, span);
        value
    }
}

/// Wrap a capability result in a traced wrapper parented to this call.
pub struct Wrap<F>(pub F);

impl<T, W, F> Outcome<T> for Wrap<F>
where
    F: FnOnce(T, Interceptor) -> W,
{
    type Output = W;

    fn complete(self, value: T, span: &CallSpan, call: &Call<'_>, engine: &Interceptor) -> W {
        record_capability(span, call, engine);
        (self.0)(value, engine.child(span))
    }
}

/// [`Wrap`] for calls that may yield no capability; `None` passes through.
pub struct WrapOptional<F>(pub F);

impl<T, W, F> Outcome<Option<T>> for WrapOptional<F>
where
    F: FnOnce(T, Interceptor) -> W,
{
    type Output = Option<W>;

    fn complete(
        self,
        value: Option<T>,
        span: &CallSpan,
        call: &Call<'_>,
        engine: &Interceptor,
    ) -> Option<W> {
        match value {
            Some(value) => Some(Wrap(self.0).complete(value, span, call, engine)),
            None => {
                if engine.tracer.config().record_return_values {
                    span.set_attribute("return", NULL_MARKER);
                }
                None
            }
        }
    }
}

fn record_capability(span: &CallSpan, call: &Call<'_>, engine: &Interceptor) {
    if engine.tracer.config().record_return_values {
        span.set_attribute("return", call.operation().returns);
    }
}

/// Tracer plus the fixed parent context of one wrapper.
#[derive(Debug, Clone)]
pub struct Interceptor {
    tracer: Tracer,
    parent: SpanContext,
}

impl Interceptor {
    pub fn new(tracer: Tracer, parent: SpanContext) -> Self {
        Self { tracer, parent }
    }

    pub fn tracer(&self) -> &Tracer {
        &self.tracer
    }

    pub fn parent(&self) -> &SpanContext {
        &self.parent
    }

    /// Interceptor for a wrapper built from the result of the call owning `span`.
    pub fn child(&self, span: &CallSpan) -> Interceptor {
        Interceptor::new(self.tracer.clone(), span.context())
    }

    /// Run `invocation` as the traced call `call`.
    ///
    /// Errors from the delegate come back exactly as the delegate returned them.
    pub fn intercept<'s, T, F, O>(
        &'s self,
        call: Call<'s>,
        invocation: F,
        outcome: O,
    ) -> Pin<Box<dyn Future<Output = DriverResult<O::Output>> + Send + 's>>
    where
        F: Future<Output = DriverResult<T>> + Send + 's,
        O: Outcome<T> + Send + 's,
        T: Send + 's,
    {
        Box::pin(async move {
            let span = self.tracer.start_span(&call.label(), &self.parent);
            call.describe(&span, &self.tracer);
            attributes::record_arguments(&span, call.args, self.tracer.config());

            match invocation.instrument(span.span().clone()).await {
                Ok(value) => {
                    let output = outcome.complete(value, &span, &call, self);
                    span.set_ok();
                    Ok(output)
                }
                Err(error) => {
                    span.record_exception(&error);
                    span.set_error(&error);
                    Err(error)
                }
            }
        })
    }
}
