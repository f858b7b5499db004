//! Span capture for verifying the traced span tree.
//!
//! Spans go through `tracing-opentelemetry` into an in-memory exporter, so
//! the store sees exactly what an OpenTelemetry backend would: a span shows
//! up once it has ended, with its parent taken from the OpenTelemetry
//! context. Span ids come from a counter, so a span's index is its creation
//! order.
//!
//! Tests must run on a current-thread runtime (the `#[tokio::test]` default)
//! so the subscriber installed by `init_test_tracing` sees every span.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use opentelemetry::trace::{SpanId, Status, TraceId, TracerProvider as _};
use opentelemetry_sdk::export::trace::SpanData;
use opentelemetry_sdk::testing::trace::InMemorySpanExporter;
use opentelemetry_sdk::trace::{Config, IdGenerator, TracerProvider};
use tracing_subscriber::prelude::*;

/// A finished span with its attributes and exact parent.
#[derive(Debug, Clone)]
pub struct CapturedSpan {
    pub index: usize,
    pub name: String,
    pub fields: HashMap<String, String>,
    pub parent: Option<usize>,
    pub events: Vec<HashMap<String, String>>,
}

impl CapturedSpan {
    pub fn label(&self) -> &str {
        &self.name
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    pub fn is_failed(&self) -> bool {
        self.field("error") == Some("true")
    }

    pub fn exceptions(&self) -> Vec<&HashMap<String, String>> {
        self.events
            .iter()
            .filter(|event| event.get("message").map(String::as_str) == Some("exception"))
            .collect()
    }

    fn from_data(data: &SpanData) -> Self {
        let mut fields: HashMap<String, String> = data
            .attributes
            .iter()
            .map(|kv| (kv.key.as_str().to_owned(), kv.value.to_string()))
            .collect();
        match data.status {
            Status::Ok => {
                fields.insert("otel.status_code".into(), "OK".into());
            }
            Status::Error { .. } => {
                fields.insert("otel.status_code".into(), "ERROR".into());
            }
            Status::Unset => {}
        }

        let events = data
            .events
            .iter()
            .map(|event| {
                let mut fields: HashMap<String, String> = event
                    .attributes
                    .iter()
                    .map(|kv| (kv.key.as_str().to_owned(), kv.value.to_string()))
                    .collect();
                fields.insert("message".into(), event.name.to_string());
                fields
            })
            .collect();

        let parent = (data.parent_span_id != SpanId::INVALID).then(|| index_of(data.parent_span_id));

        Self {
            index: index_of(data.span_context.span_id()),
            name: data.name.to_string(),
            fields,
            parent,
            events,
        }
    }
}

fn index_of(id: SpanId) -> usize {
    u64::from_be_bytes(id.to_bytes()) as usize
}

/// Hands out trace and span ids in creation order.
#[derive(Debug, Default)]
struct SequentialIds {
    traces: AtomicU64,
    spans: AtomicU64,
}

impl IdGenerator for SequentialIds {
    fn new_trace_id(&self) -> TraceId {
        let next = self.traces.fetch_add(1, Ordering::Relaxed) + 1;
        TraceId::from_bytes(u128::from(next).to_be_bytes())
    }

    fn new_span_id(&self) -> SpanId {
        let next = self.spans.fetch_add(1, Ordering::Relaxed) + 1;
        SpanId::from_bytes(next.to_be_bytes())
    }
}

/// Finished spans, ordered by creation.
#[derive(Debug, Clone)]
pub struct SpanStore {
    exporter: InMemorySpanExporter,
}

impl SpanStore {
    pub fn spans(&self) -> Vec<CapturedSpan> {
        let mut spans: Vec<CapturedSpan> = self
            .exporter
            .get_finished_spans()
            .unwrap_or_default()
            .iter()
            .map(CapturedSpan::from_data)
            .collect();
        spans.sort_by_key(|span| span.index);
        spans
    }

    /// The first span whose label is `label`.
    pub fn find(&self, label: &str) -> CapturedSpan {
        self.find_all(label)
            .into_iter()
            .next()
            .unwrap_or_else(|| panic!("no span labeled {label:?} in {:#?}", self.labels()))
    }

    pub fn find_all(&self, label: &str) -> Vec<CapturedSpan> {
        self.spans()
            .into_iter()
            .filter(|span| span.label() == label)
            .collect()
    }

    pub fn get(&self, index: usize) -> Option<CapturedSpan> {
        self.spans().into_iter().find(|span| span.index == index)
    }

    pub fn children_of(&self, index: usize) -> Vec<CapturedSpan> {
        self.spans()
            .into_iter()
            .filter(|span| span.parent == Some(index))
            .collect()
    }

    /// Number of finished ancestors above `index`.
    pub fn depth(&self, index: usize) -> usize {
        let mut depth = 0;
        let mut current = self.get(index).and_then(|span| span.parent);
        while let Some(parent) = current.and_then(|index| self.get(index)) {
            depth += 1;
            current = parent.parent;
        }
        depth
    }

    pub fn failed(&self) -> Vec<CapturedSpan> {
        self.spans().into_iter().filter(CapturedSpan::is_failed).collect()
    }

    pub fn labels(&self) -> Vec<String> {
        self.spans().iter().map(|span| span.label().to_owned()).collect()
    }
}

/// Install an OpenTelemetry-backed subscriber for the current thread.
pub fn init_test_tracing() -> (SpanStore, tracing::subscriber::DefaultGuard) {
    let exporter = InMemorySpanExporter::default();
    let provider = TracerProvider::builder()
        .with_simple_exporter(exporter.clone())
        .with_config(Config::default().with_id_generator(SequentialIds::default()))
        .build();
    let layer = tracing_opentelemetry::layer().with_tracer(provider.tracer("driver-insight-tests"));
    let subscriber = tracing_subscriber::Registry::default().with(layer);
    let guard = tracing::subscriber::set_default(subscriber);
    (SpanStore { exporter }, guard)
}
