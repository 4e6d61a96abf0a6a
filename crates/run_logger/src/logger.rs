//! Emitters: the structured and console sinks and the [`Logger`] choosing between them.

use std::fmt;

use crate::{
    formatter::{self, StructuredContext},
    CloudResource, Field, LogFormat, LoggerConfig, LoggerError, Output, Record, ServiceContext,
    Severity, SourceLocation, SourcePrefix, MAX_ENTRY_SIZE, MAX_EXCERPT_CHARS,
};

macro_rules! severity_methods {
    ($($severity:ident => $plain:ident, $formatted:ident, $with_fields:ident;)+) => {
        $(
            #[doc = concat!(
                "Emits a [`Severity::", stringify!($severity),
                "`] record whose message is `values` joined by spaces."
            )]
            ///
            /// # Panics
            ///
            /// See [`Emitter::write_record`].
            #[track_caller]
            fn $plain(&self, values: &[&dyn fmt::Display]) {
                self.emit(Severity::$severity, values);
            }

            #[doc = concat!(
                "Emits a [`Severity::", stringify!($severity),
                "`] record whose message is the formatted `args`."
            )]
            ///
            /// # Panics
            ///
            /// See [`Emitter::write_record`].
            #[track_caller]
            fn $formatted(&self, args: fmt::Arguments<'_>) {
                self.emit_fmt(Severity::$severity, args);
            }

            #[doc = concat!(
                "Emits a [`Severity::", stringify!($severity),
                "`] record with a structured payload."
            )]
            ///
            /// # Panics
            ///
            /// See [`Emitter::write_record`].
            #[track_caller]
            fn $with_fields<'a, I>(&self, message: impl Into<String>, fields: I)
            where
                I: IntoIterator<Item = Field<'a>>,
            {
                self.emit_with_fields(Severity::$severity, message, fields);
            }
        )+
    };
}

/// Formats and writes log records.
///
/// Implementors only provide [`Emitter::write_record`]; every call shape is built on top of it.
/// The provided methods capture the caller's file and line through `#[track_caller]`, which
/// cannot see the enclosing function, so their records carry no `function` in the source
/// location. Use [`emit!`](crate::emit), [`emit_fmt!`](crate::emit_fmt) and
/// [`emit_with_fields!`](crate::emit_with_fields) for records that name their function.
pub trait Emitter {
    /// Formats `record` and writes it synchronously to the stream its severity is routed to.
    ///
    /// # Panics
    ///
    /// Panics if the record cannot be serialized, for instance when a field value fails to
    /// serialize. This is treated as a programming error.
    fn write_record(&self, record: Record<'_>);

    /// Emits a record whose message is `values` joined by spaces.
    ///
    /// # Panics
    ///
    /// See [`Emitter::write_record`].
    #[track_caller]
    fn emit(&self, severity: Severity, values: &[&dyn fmt::Display]) {
        self.write_record(Record::from_values(
            severity,
            values,
            SourceLocation::caller(),
        ));
    }

    /// Emits a record whose message is the formatted `args`.
    ///
    /// Use with [`format_args!`]. Formatted calls carry no fields.
    ///
    /// # Panics
    ///
    /// See [`Emitter::write_record`].
    #[track_caller]
    fn emit_fmt(&self, severity: Severity, args: fmt::Arguments<'_>) {
        self.write_record(Record::new(
            severity,
            args.to_string(),
            SourceLocation::caller(),
        ));
    }

    /// Emits a record with an explicit structured payload.
    ///
    /// # Panics
    ///
    /// See [`Emitter::write_record`].
    #[track_caller]
    fn emit_with_fields<'a, I>(&self, severity: Severity, message: impl Into<String>, fields: I)
    where
        I: IntoIterator<Item = Field<'a>>,
    {
        self.write_record(
            Record::new(severity, message, SourceLocation::caller()).with_fields(fields),
        );
    }

    severity_methods! {
        Debug => debug, debug_fmt, debug_with_fields;
        Info => info, info_fmt, info_with_fields;
        Notice => notice, notice_fmt, notice_with_fields;
        Warning => warning, warning_fmt, warning_with_fields;
        Error => error, error_fmt, error_with_fields;
        Critical => critical, critical_fmt, critical_with_fields;
        Alert => alert, alert_fmt, alert_with_fields;
        Emergency => emergency, emergency_fmt, emergency_with_fields;
    }
}

#[cold]
#[allow(clippy::panic, reason = "serialization failures are programming errors")]
fn abort_on_error(error: &LoggerError) -> ! {
    panic!("could not log because of err: {error}")
}

/// Emits single-line JSON documents in the Cloud Logging structured format.
#[derive(Debug)]
pub struct StructuredSink {
    prefix: SourcePrefix,
    output: Output,
    service_context: Option<ServiceContext>,
    resource: Option<CloudResource>,
}

impl StructuredSink {
    /// Creates a sink writing to `output` and stripping `prefix` from source paths.
    pub fn new(prefix: SourcePrefix, output: Output) -> Self {
        Self {
            prefix,
            output,
            service_context: None,
            resource: None,
        }
    }

    /// Attaches a service context to every record.
    #[must_use]
    pub fn with_service_context(mut self, service_context: Option<ServiceContext>) -> Self {
        self.service_context = service_context;
        self
    }

    /// Attaches a log name and monitored resource to every record.
    #[must_use]
    pub fn with_resource(mut self, resource: Option<CloudResource>) -> Self {
        self.resource = resource;
        self
    }

    fn context(&self) -> StructuredContext<'_> {
        StructuredContext {
            prefix: &self.prefix,
            service_context: self.service_context.as_ref(),
            resource: self.resource.as_ref(),
        }
    }

    fn serialize(&self, record: &Record<'_>) -> Vec<u8> {
        formatter::structured(record, self.context()).unwrap_or_else(|error| abort_on_error(&error))
    }

    /// Replaces an oversized record by an error notice quoting the start of it.
    ///
    /// The excerpt is halved until the notice itself fits, since escaping can make the notice
    /// larger than the excerpt. A notice that does not fit even without an excerpt is written
    /// without the service context and resource.
    fn write_oversized(&self, record: &Record<'_>, serialized: &[u8]) {
        let payload = String::from_utf8_lossy(serialized);
        let mut max_chars = MAX_EXCERPT_CHARS;

        loop {
            let notice = Record::new(
                Severity::Error,
                format!(
                    "log entry exceeds max size of {MAX_ENTRY_SIZE} bytes: {}",
                    formatter::excerpt(&payload, max_chars)
                ),
                record.location().clone(),
            );
            let serialized_notice = self.serialize(&notice);

            if serialized_notice.len() < MAX_ENTRY_SIZE {
                let _ = self.output.write_line(Severity::Error.stream(), serialized_notice);
                return;
            }
            if max_chars == 0 {
                let bare = StructuredContext {
                    prefix: &self.prefix,
                    service_context: None,
                    resource: None,
                };
                let serialized_notice = formatter::structured(&notice, bare)
                    .unwrap_or_else(|error| abort_on_error(&error));
                let _ = self.output.write_line(Severity::Error.stream(), serialized_notice);
                return;
            }
            max_chars /= 2;
        }
    }
}

impl Emitter for StructuredSink {
    fn write_record(&self, record: Record<'_>) {
        let serialized = self.serialize(&record);

        if serialized.len() >= MAX_ENTRY_SIZE {
            self.write_oversized(&record, &serialized);
        } else {
            let _ = self
                .output
                .write_line(record.severity().stream(), serialized);
        }
    }
}

/// Emits human-readable lines, used when no structured log collector is available.
#[derive(Debug)]
pub struct ConsoleSink {
    prefix: SourcePrefix,
    output: Output,
}

impl ConsoleSink {
    /// Creates a sink writing to `output` and stripping `prefix` from source paths.
    pub fn new(prefix: SourcePrefix, output: Output) -> Self {
        Self { prefix, output }
    }
}

impl Emitter for ConsoleSink {
    fn write_record(&self, record: Record<'_>) {
        let rendered = formatter::plain(&record, &self.prefix)
            .unwrap_or_else(|error| abort_on_error(&error));
        let _ = self.output.write_line(record.severity().stream(), rendered);
    }
}

/// A logger writing either structured or plain records.
///
/// Every constructor captures the directory of its caller's source file once; source paths
/// under that directory are written relative to it.
///
/// # Example
///
/// ```
/// use run_logger::{emit, emit_fmt, emit_with_fields, Emitter, Logger, Severity};
///
/// let logger = Logger::plain();
///
/// logger.info(&[&"Hello", &"world"]);
/// logger.warning_fmt(format_args!("{} retries left", 2));
///
/// emit!(logger, Severity::Notice, "listening on", 8080);
/// emit_fmt!(logger, Severity::Debug, "cache hit ratio {:.2}", 0.93);
/// emit_with_fields!(logger, Severity::Error, "request failed", { "code" => 500 });
/// ```
#[derive(Debug)]
pub enum Logger {
    /// Writes JSON documents for Cloud Logging.
    Structured(StructuredSink),

    /// Writes human-readable lines.
    Console(ConsoleSink),
}

impl Logger {
    /// Builds a logger from an explicit configuration and output.
    #[track_caller]
    pub fn with_output(config: LoggerConfig, output: Output) -> Self {
        Self::build(config, output, SourcePrefix::caller())
    }

    /// A structured logger on stdout and stderr, with the service context taken from the
    /// environment.
    #[track_caller]
    pub fn structured() -> Self {
        let config = LoggerConfig {
            format: LogFormat::Structured,
            ..LoggerConfig::from_env()
        };
        Self::build(config, Output::standard(), SourcePrefix::caller())
    }

    /// A plain logger on stdout and stderr.
    #[track_caller]
    pub fn plain() -> Self {
        Self::build(
            LoggerConfig::default(),
            Output::standard(),
            SourcePrefix::caller(),
        )
    }

    /// A structured logger when running on Cloud Run, a plain logger otherwise.
    #[track_caller]
    pub fn from_env() -> Self {
        Self::build(
            LoggerConfig::from_env(),
            Output::standard(),
            SourcePrefix::caller(),
        )
    }

    /// A structured logger attaching the log name and monitored resource of the running Cloud Run
    /// revision to every record.
    ///
    /// Blocks while the project and region are fetched from the metadata server.
    ///
    /// # Errors
    ///
    /// Returns [`LoggerError`] if the metadata server cannot be queried. There is no retry.
    #[cfg(feature = "resource")]
    #[track_caller]
    pub fn structured_with_resource(log_id: &str) -> Result<Self, LoggerError> {
        let prefix = SourcePrefix::caller();
        let environment = crate::CloudRunEnvironment::from_env();
        let client = crate::MetadataClient::new()?;
        let resource = CloudResource::resolve(&client, &environment, log_id)?;

        let config = LoggerConfig {
            format: LogFormat::Structured,
            service_context: environment.service_context(),
            resource: Some(resource),
        };
        Ok(Self::build(config, Output::standard(), prefix))
    }

    fn build(config: LoggerConfig, output: Output, prefix: SourcePrefix) -> Self {
        tracing::debug!(
            format = ?config.format,
            prefix = prefix.as_str().unwrap_or_default(),
            "Constructing logger"
        );

        match config.format {
            LogFormat::Structured => Self::Structured(
                StructuredSink::new(prefix, output)
                    .with_service_context(config.service_context)
                    .with_resource(config.resource),
            ),
            LogFormat::Plain => Self::Console(ConsoleSink::new(prefix, output)),
        }
    }

    /// Whether records are written as JSON documents.
    pub fn is_structured(&self) -> bool {
        matches!(self, Self::Structured(_))
    }
}

impl Emitter for Logger {
    fn write_record(&self, record: Record<'_>) {
        match self {
            Self::Structured(sink) => sink.write_record(record),
            Self::Console(sink) => sink.write_record(record),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use serde_json::{json, Value};
    use time::macros::datetime;

    use super::*;
    use crate::{field, output::capture::Capture, Stream};

    fn structured(capture: &Capture) -> Logger {
        let config = LoggerConfig {
            format: LogFormat::Structured,
            ..LoggerConfig::default()
        };
        Logger::with_output(config, capture.output())
    }

    fn plain(capture: &Capture) -> Logger {
        Logger::with_output(LoggerConfig::default(), capture.output())
    }

    fn single_line(capture: &Capture, severity: Severity) -> Value {
        let mut lines = capture.json(severity.stream());
        assert_eq!(lines.len(), 1, "expected exactly one record");
        lines.remove(0)
    }

    #[test]
    fn every_severity_joins_values() {
        for severity in Severity::ALL {
            let capture = Capture::default();
            let logger = structured(&capture);

            logger.emit(severity, &[&"a", &"b"]);

            let line = single_line(&capture, severity);
            assert_eq!(line["message"], "a b");
            assert_eq!(line["severity"], severity.as_str());
        }
    }

    #[test]
    fn error_class_severities_are_routed_to_stderr() {
        for severity in Severity::ALL {
            let capture = Capture::default();
            let logger = structured(&capture);

            logger.emit(severity, &[&"routed"]);

            let (written, silent) = if severity.is_error() {
                (capture.stderr_lines(), capture.stdout_lines())
            } else {
                (capture.stdout_lines(), capture.stderr_lines())
            };
            assert_eq!(written.len(), 1, "{severity} must be written once");
            assert!(silent.is_empty(), "{severity} must use a single stream");
        }
    }

    #[test]
    fn plain_mode_follows_the_same_routing() {
        let capture = Capture::default();
        let logger = plain(&capture);

        logger.notice(&[&"up"]);
        logger.alert(&[&"down"]);

        assert_eq!(capture.stdout_lines().len(), 1);
        assert_eq!(capture.stderr_lines().len(), 1);
    }

    #[test]
    fn info_scenario() {
        let capture = Capture::default();
        let logger = structured(&capture);

        logger.info(&[&"Hello", &"world"]);

        let line = single_line(&capture, Severity::Info);
        assert_eq!(line["message"], "Hello world");
        assert_eq!(line["severity"], "INFO");
        assert!(line.get("@type").is_none());
        assert!(line.get("jsonPayload").is_none());
    }

    #[test]
    fn formatted_scenario() {
        let capture = Capture::default();
        let logger = structured(&capture);

        logger.info_fmt(format_args!("Hello {}", "world"));

        assert_eq!(single_line(&capture, Severity::Info)["message"], "Hello world");
    }

    #[test]
    fn fields_scenario() {
        let capture = Capture::default();
        let logger = structured(&capture);

        logger.error_with_fields("failed", [field("code", 500)]);

        assert!(capture.stdout().is_empty());
        let line = single_line(&capture, Severity::Error);
        assert_eq!(line["message"], "failed");
        assert_eq!(line["jsonPayload"], json!({"code": 500}));
        assert_eq!(line["@type"], formatter::ERROR_REPORT_TYPE);
    }

    #[test]
    fn message_field_does_not_overwrite_message() {
        let capture = Capture::default();
        let logger = structured(&capture);

        logger.emit_with_fields(
            Severity::Info,
            "own message",
            [field("message", "shadowed"), field("user", "ada"), field("user", "grace")],
        );

        let line = single_line(&capture, Severity::Info);
        assert_eq!(line["message"], "own message");
        assert_eq!(
            line["jsonPayload"],
            json!({"_message_": "shadowed", "user": "grace"})
        );
    }

    #[test]
    fn source_location_is_relative_to_constructor() {
        let capture = Capture::default();
        let logger = structured(&capture);

        let expected_line = line!() + 1;
        logger.debug(&[&"located"]);

        let line = single_line(&capture, Severity::Debug);
        let location = &line["logging.googleapis.com/sourceLocation"];
        assert_eq!(location["file"], "logger.rs");
        assert_eq!(location["line"], expected_line.to_string());
        assert!(location.get("function").is_none());
    }

    #[test]
    fn oversized_record_is_replaced_by_notice() {
        let capture = Capture::default();
        let logger = structured(&capture);
        let large = "x".repeat(MAX_ENTRY_SIZE);

        logger.info_with_fields("large", [field("blob", &large)]);

        assert!(capture.stdout().is_empty());
        let stderr = capture.stderr();
        assert!(stderr.len() < MAX_ENTRY_SIZE);

        let line = single_line(&capture, Severity::Error);
        let message = line["message"].as_str().expect("message must be a string");
        let prefix = format!("log entry exceeds max size of {MAX_ENTRY_SIZE} bytes: ");
        assert!(message.starts_with(&prefix));
        let excerpt = message.get(prefix.len()..).unwrap_or_default();
        assert_eq!(excerpt.chars().count(), MAX_EXCERPT_CHARS);
        assert!(excerpt.starts_with(r#"{"message":"large","jsonPayload":{"blob":"xxx"#));
        assert_eq!(line["severity"], "ERROR");
        assert!(line.get("jsonPayload").is_none());
    }

    #[test]
    fn record_just_below_limit_is_written_verbatim() {
        let capture = Capture::default();
        let logger = structured(&capture);

        logger.info_with_fields("fits", [field("blob", "x".repeat(MAX_ENTRY_SIZE / 2))]);

        let line = single_line(&capture, Severity::Info);
        assert_eq!(line["message"], "fits");
        assert!(capture.stderr().is_empty());
    }

    fn padded_record<'a>(location: &SourceLocation, blob: &'a str) -> Record<'a> {
        Record::new(Severity::Info, "boundary", location.clone())
            .with_fields([field("blob", blob)])
            .with_timestamp(datetime!(2024-05-01 12:30:45 UTC))
    }

    fn written_len(location: &SourceLocation, blob: &str) -> usize {
        let capture = Capture::default();
        structured(&capture).write_record(padded_record(location, blob));
        capture.stdout().trim_end_matches('\n').len()
    }

    #[test]
    fn size_limit_is_inclusive() {
        let location = SourceLocation::caller();
        let base = written_len(&location, "");

        let below = "x".repeat(MAX_ENTRY_SIZE - 1 - base);
        let capture = Capture::default();
        structured(&capture).write_record(padded_record(&location, &below));
        assert_eq!(
            capture.stdout_lines().iter().map(String::len).collect::<Vec<_>>(),
            [MAX_ENTRY_SIZE - 1]
        );
        assert!(capture.stderr().is_empty());

        let at_limit = "x".repeat(MAX_ENTRY_SIZE - base);
        let capture = Capture::default();
        structured(&capture).write_record(padded_record(&location, &at_limit));
        assert!(capture.stdout().is_empty());
        let notice = single_line(&capture, Severity::Error);
        assert!(notice["message"]
            .as_str()
            .is_some_and(|message| message.starts_with("log entry exceeds max size")));
    }

    #[test]
    fn notice_drops_metadata_that_cannot_fit() {
        let capture = Capture::default();
        let sink = StructuredSink::new(SourcePrefix::caller(), capture.output())
            .with_service_context(Some(ServiceContext {
                service: "s".repeat(MAX_ENTRY_SIZE),
            }));

        sink.info(&[&"ready"]);

        assert!(capture.stdout().is_empty());
        assert!(capture.stderr().len() < MAX_ENTRY_SIZE);
        let notice = single_line(&capture, Severity::Error);
        assert_eq!(notice["severity"], "ERROR");
        assert!(notice.get("serviceContext").is_none());
        assert_eq!(
            notice["logging.googleapis.com/sourceLocation"]["file"],
            "logger.rs"
        );
    }

    #[test]
    fn notice_of_escaped_payload_still_fits() {
        let capture = Capture::default();
        let logger = structured(&capture);
        let quotes: Vec<&str> = vec!["\"\\\""; MAX_ENTRY_SIZE / 4];

        logger.warning_with_fields("quotes", [field("quotes", quotes)]);

        let line = single_line(&capture, Severity::Error);
        assert!(line["message"]
            .as_str()
            .is_some_and(|message| message.starts_with("log entry exceeds max size")));
        assert!(capture.stderr().len() < MAX_ENTRY_SIZE);
    }

    #[test]
    fn plain_mode_never_writes_json_for_unstructured_calls() {
        let capture = Capture::default();
        let logger = plain(&capture);

        let expected_line = line!() + 1;
        logger.emit(Severity::Info, &[&"Hello", &"world"]);
        logger.emit_fmt(Severity::Warning, format_args!("{} left", 3));

        assert_eq!(
            capture.stdout_lines(),
            [
                format!("INFO in [logger.rs:{expected_line}]: Hello world"),
                format!("WARNING in [logger.rs:{}]: 3 left", expected_line + 1),
            ]
        );
        assert!(capture.stderr().is_empty());
    }

    #[test]
    fn plain_mode_writes_fields_on_second_line() {
        let capture = Capture::default();
        let logger = plain(&capture);

        logger.critical_with_fields("failed", [field("code", 500)]);

        let lines = capture.stderr_lines();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("CRITICAL in [logger.rs:"));
        assert!(lines[0].ends_with("]: failed"));
        assert_eq!(lines[1], r#"{"code":500}"#);
    }

    #[test]
    fn service_context_and_resource_are_attached() {
        let capture = Capture::default();
        let environment = crate::CloudRunEnvironment {
            service: Some("checkout".to_owned()),
            ..crate::CloudRunEnvironment::default()
        };
        let config = LoggerConfig {
            format: LogFormat::Structured,
            service_context: environment.service_context(),
            resource: Some(CloudResource::cloud_run(
                "acme-prod",
                "europe-west1",
                &environment,
                "app",
            )),
        };
        let logger = Logger::with_output(config, capture.output());

        logger.info(&[&"ready"]);

        let line = single_line(&capture, Severity::Info);
        assert_eq!(line["serviceContext"], json!({"service": "checkout"}));
        assert_eq!(line["logName"], "projects/acme-prod/logs/app");
        assert_eq!(line["sourceLocation"]["file"], "logger.rs");
    }

    #[test]
    fn configuration_selects_variant() {
        let capture = Capture::default();

        assert!(structured(&capture).is_structured());
        assert!(!plain(&capture).is_structured());
    }

    #[test]
    #[should_panic(expected = "could not log because of err")]
    fn serialization_failure_is_fatal() {
        let capture = Capture::default();
        let logger = structured(&capture);
        let invalid = HashMap::from([(vec![1_u8], 1)]);

        logger.info_with_fields("unserializable", [field("invalid", invalid)]);
    }

    #[test]
    #[should_panic(expected = "could not log because of err")]
    fn serialization_failure_is_fatal_in_plain_mode() {
        let capture = Capture::default();
        let logger = plain(&capture);
        let invalid = HashMap::from([(vec![1_u8], 1)]);

        logger.info_with_fields("unserializable", [field("invalid", invalid)]);
    }

    #[test]
    fn stream_matches_routing() {
        let capture = Capture::default();
        let logger = structured(&capture);

        logger.emergency(&[&"down"]);

        assert_eq!(capture.json(Stream::Stderr).len(), 1);
        assert!(capture.json(Stream::Stdout).is_empty());
    }
}
