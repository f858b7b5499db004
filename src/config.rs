//! Configuration for tracing behavior.

use std::time::Duration;

/// Configuration options for call tracing.
///
/// # Example
///
/// ```rust
/// use driver_insight::TracingConfig;
/// use std::time::Duration;
///
/// let config = TracingConfig::default()
///     .with_return_value_recording(false)
///     .with_slow_call_threshold(Duration::from_millis(100));
/// ```
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// Whether to include the SQL text in `db.statement`.
    ///
    /// Query spans are labeled `SQL: [...]` either way.
    /// Default: `true`
    pub log_statements: bool,

    /// Whether to record call arguments as `argN` attributes.
    /// Default: `true`
    pub record_arguments: bool,

    /// Whether to record scalar results as the `return` attribute.
    /// Default: `true`
    pub record_return_values: bool,

    /// Rendered attribute values longer than this are truncated.
    /// Default: 1024 bytes
    pub max_attribute_length: usize,

    /// Calls exceeding this duration are flagged with `slow_call` and logged at WARN.
    /// Default: 500ms
    pub slow_call_threshold: Duration,

    /// Whether result sets count rows and record `db.rows_returned`.
    /// Default: `true`
    pub record_row_counts: bool,

    /// Custom database name to include in spans (useful for multi-database setups).
    /// Default: `None`
    pub database_name: Option<String>,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            log_statements: true,
            record_arguments: true,
            record_return_values: true,
            max_attribute_length: 1024,
            slow_call_threshold: Duration::from_millis(500),
            record_row_counts: true,
            database_name: None,
        }
    }
}

impl TracingConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable the `db.statement` attribute.
    pub fn with_statement_logging(mut self, enabled: bool) -> Self {
        self.log_statements = enabled;
        self
    }

    /// Enable or disable argument recording.
    ///
    /// **Security Warning**: arguments often carry user input. Disable this
    /// when traces leave a controlled environment.
    pub fn with_argument_recording(mut self, enabled: bool) -> Self {
        self.record_arguments = enabled;
        self
    }

    /// Enable or disable recording of scalar return values.
    pub fn with_return_value_recording(mut self, enabled: bool) -> Self {
        self.record_return_values = enabled;
        self
    }

    /// Cap the length of every rendered attribute value.
    pub fn with_max_attribute_length(mut self, max: usize) -> Self {
        self.max_attribute_length = max;
        self
    }

    /// Set the threshold for slow call warnings.
    pub fn with_slow_call_threshold(mut self, threshold: Duration) -> Self {
        self.slow_call_threshold = threshold;
        self
    }

    /// Enable or disable row count recording.
    pub fn with_row_count_recording(mut self, enabled: bool) -> Self {
        self.record_row_counts = enabled;
        self
    }

    /// Set a database name to include in spans.
    pub fn with_database_name(mut self, name: impl Into<String>) -> Self {
        self.database_name = Some(name.into());
        self
    }

    /// Full recording with a tight slow-call threshold.
    ///
    /// **Warning**: records every argument and return value.
    pub fn development() -> Self {
        Self {
            slow_call_threshold: Duration::from_millis(100),
            ..Self::default()
        }
    }

    /// Span tree and query labels only.
    ///
    /// Unlike the default, this preset records no `argN` or `return`
    /// attributes and leaves `db.statement` empty. Query spans keep their
    /// `SQL: [...]` label, so the query text still reaches the trace.
    pub fn production() -> Self {
        Self {
            log_statements: false,
            record_arguments: false,
            record_return_values: false,
            max_attribute_length: 256,
            slow_call_threshold: Duration::from_secs(1),
            record_row_counts: true,
            database_name: None,
        }
    }
}
