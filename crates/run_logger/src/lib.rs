//! `run_logger` formats log records for Google Cloud Logging and writes them to stdout and
//! stderr, one line per call.
//!
//! It offers:
//! - A [`Logger`] choosing between a [`StructuredSink`] that writes single-line JSON documents
//!   understood by the logging agent, and a [`ConsoleSink`] that writes human-readable lines.
//! - The [`Emitter`] trait with one call shape per severity: space-joined values, formatted
//!   templates and explicit [`Field`]s.
//! - Macros ([`emit!`], [`emit_fmt!`], [`emit_with_fields!`]) which also record the enclosing
//!   function.
//! - A [`CloudLoggingLayer`] writing [`tracing`] events through a [`Logger`].
//!
//! Records of severity [`Severity::Error`] and above are written to stderr and marked for Error
//! Reporting; all others go to stdout. Structured records of [`MAX_ENTRY_SIZE`] bytes or more are
//! replaced by an error notice quoting their beginning.
//!
//! With the `resource` feature, [`Logger::structured_with_resource`] queries the metadata server
//! once and attaches the log name and monitored resource of the Cloud Run revision to every
//! record.
//!
//! # Example
//!
//! The macros record the full source location, including the enclosing function:
//!
//! ```
//! use run_logger::{emit, emit_fmt, emit_with_fields, Logger, Severity};
//!
//! // Structured on Cloud Run (`K_SERVICE` is set), plain everywhere else.
//! let logger = Logger::from_env();
//!
//! emit!(logger, Severity::Info, "Hello", "world");
//! emit_fmt!(logger, Severity::Info, "Hello {}", "world");
//! emit_with_fields!(logger, Severity::Error, "failed", { "code" => 500 });
//! ```
//!
//! The [`Emitter`] methods record only the file and line:
//!
//! ```
//! use run_logger::{field, Emitter, Logger, Severity};
//!
//! let logger = Logger::from_env();
//!
//! logger.info(&[&"Hello", &"world"]);
//! logger.info_fmt(format_args!("Hello {}", "world"));
//! logger.emit_with_fields(Severity::Error, "failed", [field("code", 500)]);
//! ```

mod config;
mod field;
mod formatter;
mod layer;
mod logger;
mod macros;
#[cfg(feature = "resource")]
mod metadata;
mod output;
mod record;
mod resource;
mod severity;

#[cfg(feature = "resource")]
pub use self::metadata::{MetadataClient, METADATA_BASE_URL};
pub use self::{
    config::{
        CloudRunEnvironment, LogFormat, LoggerConfig, ServiceContext, CONFIGURATION_ENV,
        REVISION_ENV, SERVICE_ENV,
    },
    field::{field, Field, Fields},
    formatter::ERROR_REPORT_TYPE,
    layer::CloudLoggingLayer,
    logger::{ConsoleSink, Emitter, Logger, StructuredSink},
    output::Output,
    record::{Record, SourceLocation, SourcePrefix},
    resource::{CloudResource, MonitoredResource, CLOUD_RUN_RESOURCE_TYPE},
    severity::{Severity, Stream},
};

/// Size in bytes at which a serialized structured record is replaced by an error notice.
pub const MAX_ENTRY_SIZE: usize = 102_400;

/// Maximum number of characters of an oversized record quoted in the error notice.
pub const MAX_EXCERPT_CHARS: usize = 100_000;

mod keys {
    pub(crate) const MESSAGE: &str = "message";
    pub(crate) const SHADOWED_MESSAGE: &str = "_message_";
    pub(crate) const JSON_PAYLOAD: &str = "jsonPayload";
    pub(crate) const SEVERITY: &str = "severity";
    pub(crate) const TIMESTAMP: &str = "timestamp";
    pub(crate) const SOURCE_LOCATION: &str = "logging.googleapis.com/sourceLocation";
    pub(crate) const ENTRY_SOURCE_LOCATION: &str = "sourceLocation";
    pub(crate) const TYPE: &str = "@type";
    pub(crate) const SERVICE_CONTEXT: &str = "serviceContext";
    pub(crate) const LOG_NAME: &str = "logName";
    pub(crate) const RESOURCE: &str = "resource";
}

/// Errors that can occur within the logger.
#[derive(Debug, thiserror::Error)]
pub enum LoggerError {
    /// Represents an error during JSON serialization.
    #[error("JSON serialization error: {0}")]
    JsonSerialization(#[from] serde_json::Error),

    /// Represents an error while formatting the record timestamp.
    #[error("Failed to format timestamp: {0}")]
    TimestampFormatting(#[from] time::error::Format),

    /// Represents an error while building the metadata server HTTP client.
    #[cfg(feature = "resource")]
    #[error("Failed to build metadata server client: {0}")]
    HttpClient(#[source] reqwest::Error),

    /// Represents a failed metadata server request.
    #[cfg(feature = "resource")]
    #[error("Failed to query metadata server for `{path}`: {source}")]
    MetadataRequest {
        /// The metadata path that was queried.
        path: String,

        /// The underlying HTTP error.
        source: reqwest::Error,
    },

    /// Represents an empty or malformed metadata value.
    #[cfg(feature = "resource")]
    #[error("Metadata server returned no usable value for `{0}`")]
    EmptyMetadataValue(String),
}
