//! Traced database metadata wrapper.

use async_trait::async_trait;

use crate::capability::{DatabaseMetadata, ResultSet};
use crate::error::DriverResult;
use crate::interceptor::{Call, Interceptor, Scalar, Wrap};
use crate::result_set::TracedResultSet;
use crate::signature::Operation;
use crate::span::{SpanContext, Tracer};

const PRODUCT_NAME: Operation = Operation::new("product_name", &[], "String");
const PRODUCT_VERSION: Operation = Operation::new("product_version", &[], "String");
const DRIVER_NAME: Operation = Operation::new("driver_name", &[], "String");
const URL: Operation = Operation::new("url", &[], "String");
const CATALOGS: Operation = Operation::new("catalogs", &[], "ResultSet");
const TABLES: Operation = Operation::new(
    "tables",
    &["Option<&str>", "Option<&str>", "&str"],
    "ResultSet",
);

/// A traced wrapper around driver [`DatabaseMetadata`].
///
/// Catalog and table listings come back as traced result sets.
pub struct TracedDatabaseMetadata {
    inner: Box<dyn DatabaseMetadata>,
    interceptor: Interceptor,
}

impl TracedDatabaseMetadata {
    pub fn new(metadata: Box<dyn DatabaseMetadata>, tracer: Tracer, parent: SpanContext) -> Self {
        Self {
            inner: metadata,
            interceptor: Interceptor::new(tracer, parent),
        }
    }

    pub(crate) fn boxed(
        inner: Box<dyn DatabaseMetadata>,
        interceptor: Interceptor,
    ) -> Box<dyn DatabaseMetadata> {
        Box::new(Self { inner, interceptor })
    }

    pub fn into_inner(self) -> Box<dyn DatabaseMetadata> {
        self.inner
    }
}

#[async_trait]
impl DatabaseMetadata for TracedDatabaseMetadata {
    async fn product_name(&self) -> DriverResult<String> {
        self.interceptor
            .intercept(Call::new(&PRODUCT_NAME, &[]), self.inner.product_name(), Scalar)
            .await
    }

    async fn product_version(&self) -> DriverResult<String> {
        self.interceptor
            .intercept(
                Call::new(&PRODUCT_VERSION, &[]),
                self.inner.product_version(),
                Scalar,
            )
            .await
    }

    async fn driver_name(&self) -> DriverResult<String> {
        self.interceptor
            .intercept(Call::new(&DRIVER_NAME, &[]), self.inner.driver_name(), Scalar)
            .await
    }

    async fn url(&self) -> DriverResult<String> {
        self.interceptor
            .intercept(Call::new(&URL, &[]), self.inner.url(), Scalar)
            .await
    }

    async fn catalogs(&self) -> DriverResult<Box<dyn ResultSet>> {
        self.interceptor
            .intercept(
                Call::new(&CATALOGS, &[]),
                self.inner.catalogs(),
                Wrap(TracedResultSet::boxed),
            )
            .await
    }

    async fn tables(
        &self,
        catalog: Option<&str>,
        schema_pattern: Option<&str>,
        table_pattern: &str,
    ) -> DriverResult<Box<dyn ResultSet>> {
        self.interceptor
            .intercept(
                Call::new(&TABLES, &[&catalog, &schema_pattern, &table_pattern]),
                self.inner.tables(catalog, schema_pattern, table_pattern),
                Wrap(TracedResultSet::boxed),
            )
            .await
    }
}
