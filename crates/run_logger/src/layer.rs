//! Provides a [`tracing_subscriber::Layer`] ([`CloudLoggingLayer`]) writing `tracing` events
//! through a [`Logger`].

use std::fmt;

use tracing::{
    field::{Field as TracingField, Visit},
    Event, Subscriber,
};
use tracing_subscriber::{layer::Context, registry::LookupSpan, Layer};

use crate::{field, keys, Emitter, Field, Logger, Record, Severity, SourceLocation};

/// A [`tracing_subscriber::Layer`] that turns every event into a log record.
///
/// The `message` field of the event becomes the record message; all other fields become the
/// structured payload. The source location is taken from the event metadata, with the module
/// path and the current span name as the function.
#[derive(Debug)]
pub struct CloudLoggingLayer {
    logger: Logger,
}

impl CloudLoggingLayer {
    /// Creates a layer writing through `logger`.
    pub fn new(logger: Logger) -> Self {
        Self { logger }
    }
}

/// Collects the message and fields of an event.
#[derive(Debug, Default)]
struct EventVisitor {
    message: Option<String>,
    fields: Vec<Field<'static>>,
}

impl EventVisitor {
    fn record_value(&mut self, key: &str, value: serde_json::Value) {
        // Fields added by the `log` compatibility layer duplicate the metadata
        if key.starts_with("log.") {
            return;
        }
        let key = key.strip_prefix("r#").unwrap_or(key);
        self.fields.push(field(key, value));
    }
}

impl Visit for EventVisitor {
    fn record_f64(&mut self, field: &TracingField, value: f64) {
        self.record_value(field.name(), serde_json::Value::from(value));
    }

    fn record_i64(&mut self, field: &TracingField, value: i64) {
        self.record_value(field.name(), serde_json::Value::from(value));
    }

    fn record_u64(&mut self, field: &TracingField, value: u64) {
        self.record_value(field.name(), serde_json::Value::from(value));
    }

    fn record_bool(&mut self, field: &TracingField, value: bool) {
        self.record_value(field.name(), serde_json::Value::from(value));
    }

    fn record_str(&mut self, field: &TracingField, value: &str) {
        if field.name() == keys::MESSAGE {
            self.message = Some(value.to_owned()); // `record_str()` is preferred for `message`
        } else {
            self.record_value(field.name(), serde_json::Value::from(value));
        }
    }

    fn record_debug(&mut self, field: &TracingField, value: &dyn fmt::Debug) {
        match field.name() {
            keys::MESSAGE => {
                if self.message.is_none() {
                    self.message = Some(format!("{value:?}"));
                }
            }
            name => self.record_value(name, serde_json::Value::from(format!("{value:?}"))),
        }
    }
}

impl<S> Layer<S> for CloudLoggingLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        let metadata = event.metadata();

        let mut visitor = EventVisitor::default();
        event.record(&mut visitor);

        let span_name = ctx.lookup_current().map(|span| span.name());
        let function = match (metadata.module_path(), span_name) {
            (Some(module), Some(span)) => Some(format!("{module}::{span}")),
            (Some(module), None) => Some(module.to_owned()),
            (None, Some(span)) => Some(span.to_owned()),
            (None, None) => None,
        };

        let mut location = SourceLocation::new(
            metadata.file().unwrap_or("<unknown>"),
            metadata.line().unwrap_or_default(),
        );
        if let Some(function) = function {
            location = location.with_function(function);
        }

        let message = visitor
            .message
            .unwrap_or_else(|| metadata.target().to_owned());
        let record = Record::new(Severity::from(*metadata.level()), message, location)
            .with_fields(visitor.fields);

        self.logger.write_record(record);
    }
}
