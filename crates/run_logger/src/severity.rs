//! Severity levels understood by Cloud Logging and the output stream each one is routed to.

use std::fmt;

use serde::Serialize;

/// Urgency attached to every log record, ordered from least to most urgent.
///
/// The serialized form is the upper-case name expected by the ingestion pipeline
/// (`"INFO"`, `"WARNING"`, ...).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    /// The log entry has no assigned severity level.
    Default,

    /// Debug or trace information.
    Debug,

    /// Routine information, such as ongoing status or performance.
    Info,

    /// Normal but significant events, such as start up, shut down, or a configuration change.
    Notice,

    /// Warning events might cause problems.
    Warning,

    /// Error events are likely to cause problems.
    Error,

    /// Critical events cause more severe problems or outages.
    Critical,

    /// A person must take an action immediately.
    Alert,

    /// One or more systems are unusable.
    Emergency,
}

impl Severity {
    /// All severities in ascending order of urgency.
    pub const ALL: [Self; 9] = [
        Self::Default,
        Self::Debug,
        Self::Info,
        Self::Notice,
        Self::Warning,
        Self::Error,
        Self::Critical,
        Self::Alert,
        Self::Emergency,
    ];

    /// The wire name of the severity.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Default => "DEFAULT",
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Notice => "NOTICE",
            Self::Warning => "WARNING",
            Self::Error => "ERROR",
            Self::Critical => "CRITICAL",
            Self::Alert => "ALERT",
            Self::Emergency => "EMERGENCY",
        }
    }

    /// Whether records of this severity should be reported as errors.
    pub const fn is_error(self) -> bool {
        matches!(
            self,
            Self::Error | Self::Critical | Self::Alert | Self::Emergency
        )
    }

    /// The stream records of this severity are written to.
    pub const fn stream(self) -> Stream {
        if self.is_error() {
            Stream::Stderr
        } else {
            Stream::Stdout
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<tracing::Level> for Severity {
    fn from(level: tracing::Level) -> Self {
        match level {
            tracing::Level::ERROR => Self::Error,
            tracing::Level::WARN => Self::Warning,
            tracing::Level::INFO => Self::Info,
            tracing::Level::DEBUG => Self::Debug,
            tracing::Level::TRACE => Self::Default,
        }
    }
}

/// Process output stream a record is written to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stream {
    /// Standard output.
    Stdout,

    /// Standard error.
    Stderr,
}
