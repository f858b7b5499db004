//! Generic traced wrapper for capabilities without a dedicated wrapper.

use async_trait::async_trait;

use crate::attributes::{self, Recordable, NULL_MARKER};
use crate::capability::{Capability, Reply, Value};
use crate::error::{DriverError, DriverResult};
use crate::interceptor::{Call, Interceptor, Outcome};
use crate::signature::Operation;
use crate::span::{CallSpan, SpanContext, Tracer};

/// A traced wrapper around any [`Capability`].
///
/// The delegate's type name and operation set are captured when the wrapper
/// is built; only those operations can be invoked through it. Capabilities
/// returned from a call are wrapped again, to any depth.
pub struct TracedCapability {
    inner: Box<dyn Capability>,
    type_name: String,
    operations: Vec<Operation>,
    interceptor: Interceptor,
}

impl TracedCapability {
    pub fn new(capability: Box<dyn Capability>, tracer: Tracer, parent: SpanContext) -> Self {
        Self::with_interceptor(capability, Interceptor::new(tracer, parent))
    }

    fn with_interceptor(inner: Box<dyn Capability>, interceptor: Interceptor) -> Self {
        Self {
            type_name: inner.type_name().to_owned(),
            operations: inner.operations(),
            inner,
            interceptor,
        }
    }

    pub(crate) fn boxed(inner: Box<dyn Capability>, interceptor: Interceptor) -> Box<dyn Capability> {
        Box::new(Self::with_interceptor(inner, interceptor))
    }

    pub fn into_inner(self) -> Box<dyn Capability> {
        self.inner
    }

    /// Pick the declared operation for `name`, preferring a matching arity
    /// when the name is overloaded.
    fn resolve(&self, name: &str, arity: usize) -> Option<&Operation> {
        let mut candidates = self.operations.iter().filter(|op| op.name == name);
        let first = candidates.clone().next()?;
        Some(candidates.find(|op| op.params.len() == arity).unwrap_or(first))
    }
}

/// Values pass through; capabilities are wrapped in a child [`TracedCapability`].
struct Passthrough;

impl Outcome<Reply> for Passthrough {
    type Output = Reply;

    fn complete(self, reply: Reply, span: &CallSpan, call: &Call<'_>, engine: &Interceptor) -> Reply {
        let config = engine.tracer().config();
        match reply {
            Reply::Value(value) => {
                attributes::record_return(span, call.operation(), &value, config);
                Reply::Value(value)
            }
            Reply::Capability(Some(capability)) => {
                if config.record_return_values {
                    span.set_attribute("return", capability.type_name());
                }
                Reply::Capability(Some(TracedCapability::boxed(capability, engine.child(span))))
            }
            Reply::Capability(None) => {
                if config.record_return_values {
                    span.set_attribute("return", NULL_MARKER);
                }
                Reply::Capability(None)
            }
        }
    }
}

#[async_trait]
impl Capability for TracedCapability {
    fn type_name(&self) -> &str {
        &self.type_name
    }

    fn operations(&self) -> Vec<Operation> {
        self.operations.clone()
    }

    async fn invoke(&self, operation: &str, args: Vec<Value>) -> DriverResult<Reply> {
        let Some(op) = self.resolve(operation, args.len()) else {
            tracing::debug!(
                capability = %self.type_name,
                operation,
                "operation outside captured capability set"
            );
            return Err(DriverError::UnsupportedOperation {
                capability: self.type_name.clone(),
                operation: operation.to_owned(),
            });
        };

        let recorded: Vec<&dyn Recordable> = args.iter().map(|arg| arg as &dyn Recordable).collect();

        self.interceptor
            .intercept(
                Call::new(op, &recorded),
                self.inner.invoke(operation, args.clone()),
                Passthrough,
            )
            .await
    }
}
