//! Operation descriptors and their span labels.

use std::fmt;

/// Static description of one operation on a capability.
///
/// Every traced wrapper declares its operations as constants, which the
/// generic passthrough wrapper also accepts from delegates at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Operation {
    pub name: &'static str,
    pub params: &'static [&'static str],
    pub returns: &'static str,
}

impl Operation {
    pub const fn new(
        name: &'static str,
        params: &'static [&'static str],
        returns: &'static str,
    ) -> Self {
        Self {
            name,
            params,
            returns,
        }
    }

    /// Whether the operation produces no value.
    pub fn is_unit(&self) -> bool {
        self.returns.is_empty() || self.returns == "()"
    }

    /// Human-readable label, e.g. `column_name(usize) -> String`.
    pub fn signature(&self) -> String {
        signature(self.name, self.params, self.returns)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.signature())
    }
}

/// Build the label for `name` taking `params` and producing `returns`.
///
/// Unit results are omitted, so `close() -> ()` renders as `close()`.
pub fn signature(name: &str, params: &[&str], returns: &str) -> String {
    let mut label = format!("{name}({})", params.join(", "));
    if !(returns.is_empty() || returns == "()") {
        label.push_str(" -> ");
        label.push_str(returns);
    }
    label
}
