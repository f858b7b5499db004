//! Rendering of call arguments and results into span attributes.
//!
//! Recording never fails: absent values become [`NULL_MARKER`] and values
//! whose rendering errors or panics become [`UNRENDERABLE`].

use std::fmt::{self, Write as _};
use std::panic::{self, AssertUnwindSafe};
use std::time::Duration;

use crate::capability::Value;
use crate::config::TracingConfig;
use crate::signature::Operation;
use crate::span::CallSpan;

/// Recorded in place of an absent argument or result.
pub const NULL_MARKER: &str = "null";

/// Recorded when a value could not be rendered.
pub const UNRENDERABLE: &str = "<unrenderable>";

/// Positional arguments beyond this many are counted but not recorded.
pub const MAX_RECORDED_ARGS: usize = 8;

const ARG_FIELDS: [&str; MAX_RECORDED_ARGS] = [
    "arg0", "arg1", "arg2", "arg3", "arg4", "arg5", "arg6", "arg7",
];

/// A value that can be written into a span attribute.
pub trait Recordable: Sync {
    /// Whether this value stands for "nothing".
    fn is_null(&self) -> bool {
        false
    }

    fn fmt_value(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result;
}

macro_rules! recordable_via_display {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Recordable for $ty {
                fn fmt_value(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    fmt::Display::fmt(self, f)
                }
            }
        )*
    };
}

recordable_via_display!(bool, i32, i64, u32, u64, usize, f64, str, String);

impl Recordable for () {
    fn is_null(&self) -> bool {
        true
    }

    fn fmt_value(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("()")
    }
}

impl Recordable for Duration {
    fn fmt_value(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ms", self.as_millis())
    }
}

impl Recordable for Value {
    fn is_null(&self) -> bool {
        Value::is_null(self)
    }

    fn fmt_value(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl<T: Recordable + ?Sized> Recordable for &T {
    fn is_null(&self) -> bool {
        (**self).is_null()
    }

    fn fmt_value(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        (**self).fmt_value(f)
    }
}

impl<T: Recordable> Recordable for Option<T> {
    fn is_null(&self) -> bool {
        self.as_ref().map_or(true, Recordable::is_null)
    }

    fn fmt_value(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Some(value) => value.fmt_value(f),
            None => f.write_str(NULL_MARKER),
        }
    }
}

struct Rendered<'a>(&'a dyn Recordable);

impl fmt::Display for Rendered<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt_value(f)
    }
}

/// Render a value for a span attribute, truncated to `max_len` bytes.
pub fn render(value: &dyn Recordable, max_len: usize) -> String {
    if value.is_null() {
        return NULL_MARKER.to_owned();
    }

    let rendered = panic::catch_unwind(AssertUnwindSafe(|| {
        let mut out = String::new();
        write!(out, "{}", Rendered(value)).map(|()| out)
    }));

    match rendered {
        Ok(Ok(out)) => truncate(out, max_len),
        _ => UNRENDERABLE.to_owned(),
    }
}

fn truncate(mut value: String, max_len: usize) -> String {
    if value.len() > max_len {
        let mut cut = max_len;
        while !value.is_char_boundary(cut) {
            cut -= 1;
        }
        value.truncate(cut);
        value.push('…');
    }
    value
}

/// Record positional arguments as `arg0..arg7` plus `args.count`.
pub fn record_arguments(span: &CallSpan, args: &[&dyn Recordable], config: &TracingConfig) {
    if !config.record_arguments || args.is_empty() {
        return;
    }

    span.set_u64("args.count", args.len() as u64);
    for (field, arg) in ARG_FIELDS.iter().zip(args) {
        span.set_attribute(field, &render(*arg, config.max_attribute_length));
    }
}

/// Record the `return` attribute unless the operation yields nothing.
pub fn record_return(
    span: &CallSpan,
    operation: &Operation,
    value: &dyn Recordable,
    config: &TracingConfig,
) {
    if operation.is_unit() || !config.record_return_values {
        return;
    }
    span.set_attribute("return", &render(value, config.max_attribute_length));
}
