//! Driver trait and the tracing entry point.

use std::fmt;

use async_trait::async_trait;

use crate::attributes::Recordable;
use crate::capability::Connection;
use crate::config::TracingConfig;
use crate::connection::TracedConnection;
use crate::error::{DriverError, DriverResult};
use crate::interceptor::{Call, Interceptor, Wrap};
use crate::options::{self, DriverOptions, Properties};
use crate::registry::DriverRegistry;
use crate::signature::Operation;
use crate::span::{SpanContext, Tracer};

const CONNECT: Operation = Operation::new("Driver::connect", &["&str", "&Properties"], "Connection");

/// Something that opens connections for the connection strings it accepts.
#[async_trait]
pub trait Driver: Send + Sync {
    fn name(&self) -> &str;

    fn accepts_url(&self, url: &str) -> bool;

    async fn connect(&self, url: &str, properties: &Properties) -> DriverResult<Box<dyn Connection>>;
}

/// Property names only; values such as passwords stay out of traces.
struct PropertyNames<'a>(&'a Properties);

impl Recordable for PropertyNames<'_> {
    fn fmt_value(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.0.keys().map(String::as_str).collect();
        names.sort_unstable();
        write!(f, "{{{}}}", names.join(", "))
    }
}

/// Driver for `jdbc:insight:` connection strings.
///
/// Strips the prefix, resolves the real driver through its
/// [`DriverRegistry`], and returns the real connection wrapped in a
/// [`TracedConnection`]. The connect call itself is the root span of the
/// resulting trace tree; it nests under whatever span is current.
///
/// # Example
///
/// ```rust,ignore
/// use std::sync::Arc;
/// use driver_insight::{DriverRegistry, InsightDriver, Driver, Properties};
///
/// let driver = InsightDriver::builder()
///     .registry(DriverRegistry::new().with_driver(Arc::new(pg_driver)))
///     .build();
///
/// let conn = driver
///     .connect("jdbc:insight:postgresql://localhost/app", &Properties::new())
///     .await?;
/// ```
#[derive(Debug, Clone)]
pub struct InsightDriver {
    registry: DriverRegistry,
    tracer: Tracer,
}

impl InsightDriver {
    pub fn new(registry: DriverRegistry, tracer: Tracer) -> Self {
        Self { registry, tracer }
    }

    pub fn builder() -> InsightDriverBuilder {
        InsightDriverBuilder::default()
    }

    pub fn registry(&self) -> &DriverRegistry {
        &self.registry
    }

    pub fn tracer(&self) -> &Tracer {
        &self.tracer
    }

    /// Connect and return the concrete traced wrapper.
    pub async fn connect_traced(
        &self,
        url: &str,
        properties: &Properties,
    ) -> DriverResult<TracedConnection> {
        let target = options::strip_prefix(url).ok_or_else(|| DriverError::InvalidUrl {
            url: url.to_owned(),
            reason: format!("expected prefix {}", options::URL_PREFIX),
        })?;
        let driver_options = DriverOptions::parse(&target, properties)?;

        let root = Interceptor::new(self.tracer.clone(), SpanContext::current());
        let names = PropertyNames(properties);
        let args: [&dyn Recordable; 2] = [&target, &names];

        root.intercept(
            Call::new(&CONNECT, &args),
            self.open(&target, &driver_options, properties),
            Wrap(TracedConnection::with_interceptor),
        )
        .await
    }

    async fn open(
        &self,
        target: &str,
        driver_options: &DriverOptions,
        properties: &Properties,
    ) -> DriverResult<Box<dyn Connection>> {
        let driver = self.registry.resolve(target, driver_options)?;
        driver.connect(target, properties).await
    }
}

#[async_trait]
impl Driver for InsightDriver {
    fn name(&self) -> &str {
        "insight"
    }

    fn accepts_url(&self, url: &str) -> bool {
        let Some(target) = options::strip_prefix(url) else {
            return false;
        };
        DriverOptions::parse(&target, &Properties::new())
            .and_then(|driver_options| self.registry.resolve(&target, &driver_options))
            .is_ok()
    }

    async fn connect(&self, url: &str, properties: &Properties) -> DriverResult<Box<dyn Connection>> {
        let connection = self.connect_traced(url, properties).await?;
        Ok(Box::new(connection))
    }
}

/// Builder for [`InsightDriver`].
#[derive(Debug, Default)]
pub struct InsightDriverBuilder {
    registry: DriverRegistry,
    config: TracingConfig,
}

impl InsightDriverBuilder {
    pub fn registry(mut self, registry: DriverRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn config(mut self, config: TracingConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> InsightDriver {
        InsightDriver::new(self.registry, Tracer::new(self.config))
    }
}
