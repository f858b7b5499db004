//! Span backend: the tracer handle, parent contexts, and per-call spans.

use std::sync::Arc;
use std::time::{Duration, Instant};

use opentelemetry::trace::TraceContextExt;
use opentelemetry::Context;
use tracing::{field, Span};
use tracing_opentelemetry::OpenTelemetrySpanExt;

use crate::config::TracingConfig;
use crate::error::DriverError;

/// Parent handle for the spans a wrapper creates.
///
/// A context is fixed once built. Each intercepted call derives a fresh
/// context from its own span and hands it to any wrapper built from its
/// result. The context carries only the OpenTelemetry span identity, so the
/// span it came from still ends when its call returns.
#[derive(Debug, Clone, Default)]
pub struct SpanContext {
    cx: Context,
}

impl SpanContext {
    /// No parent: spans started from this context are trace roots.
    pub fn root() -> Self {
        Self::default()
    }

    /// Whatever span is active right now, e.g. an HTTP request span.
    pub fn current() -> Self {
        Self::from(&Span::current())
    }

    pub fn is_root(&self) -> bool {
        !self.cx.has_active_span()
    }

    /// The OpenTelemetry context backing this handle.
    pub fn otel_context(&self) -> &Context {
        &self.cx
    }
}

impl From<&Span> for SpanContext {
    fn from(span: &Span) -> Self {
        Self { cx: span.context() }
    }
}

impl From<Context> for SpanContext {
    fn from(cx: Context) -> Self {
        Self { cx }
    }
}

/// Explicit tracer handle threaded through every wrapper.
///
/// Spans are emitted through `tracing` and linked to their parents through
/// `tracing-opentelemetry`, which the application installs along with its
/// exporter.
#[derive(Debug, Clone, Default)]
pub struct Tracer {
    config: Arc<TracingConfig>,
}

impl Tracer {
    pub fn new(config: TracingConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &TracingConfig {
        &self.config
    }

    /// Start a span labeled `label` as a child of `parent`.
    pub fn start_span(&self, label: &str, parent: &SpanContext) -> CallSpan {
        let span = tracing::info_span!(
            parent: None,
            "db.call",
            otel.name = %label,
            otel.kind = "client",
            otel.status_code = field::Empty,
            db.name = field::Empty,
            db.operation = field::Empty,
            db.sql.table = field::Empty,
            db.statement = field::Empty,
            db.rows_returned = field::Empty,
            db.duration_ms = field::Empty,
            args.count = field::Empty,
            arg0 = field::Empty,
            arg1 = field::Empty,
            arg2 = field::Empty,
            arg3 = field::Empty,
            arg4 = field::Empty,
            arg5 = field::Empty,
            arg6 = field::Empty,
            arg7 = field::Empty,
            "return" = field::Empty,
            error = field::Empty,
            error.message = field::Empty,
            slow_call = field::Empty,
        );

        span.set_parent(parent.otel_context().clone());

        if let Some(db_name) = &self.config.database_name {
            span.record("db.name", db_name.as_str());
        }

        CallSpan {
            span,
            started: Instant::now(),
            slow_call_threshold: self.config.slow_call_threshold,
        }
    }
}

/// The span of one intercepted call.
///
/// Dropping it ends the span and records `db.duration_ms`, so every exit
/// path closes it, including an error return or a cancelled future. Nothing
/// else holds the span, so it closes when the call returns.
#[derive(Debug)]
pub struct CallSpan {
    span: Span,
    started: Instant,
    slow_call_threshold: Duration,
}

impl CallSpan {
    pub fn set_attribute(&self, key: &str, value: &str) {
        self.span.record(key, value);
    }

    pub fn set_u64(&self, key: &str, value: u64) {
        self.span.record(key, value);
    }

    /// Emit an `exception` event under this span.
    pub fn record_exception(&self, error: &DriverError) {
        tracing::error!(
            parent: &self.span,
            exception.type = error.kind(),
            exception.message = %error,
            exception.escaped = true,
            "exception"
        );
    }

    pub fn set_error(&self, error: &DriverError) {
        self.span.record("error", true);
        self.span.record("otel.status_code", "ERROR");
        self.span.record("error.message", error.to_string().as_str());
    }

    pub fn set_ok(&self) {
        self.span.record("otel.status_code", "OK");
    }

    /// Context that parents spans of wrappers built from this call's result.
    pub fn context(&self) -> SpanContext {
        SpanContext::from(&self.span)
    }

    pub fn span(&self) -> &Span {
        &self.span
    }

    pub fn end(self) {}
}

impl Drop for CallSpan {
    fn drop(&mut self) {
        let elapsed = self.started.elapsed();
        self.span.record("db.duration_ms", elapsed.as_millis() as u64);

        if elapsed > self.slow_call_threshold {
            self.span.record("slow_call", true);
            tracing::warn!(
                parent: &self.span,
                duration_ms = elapsed.as_millis() as u64,
                threshold_ms = self.slow_call_threshold.as_millis() as u64,
                "Slow call detected"
            );
        }
    }
}
