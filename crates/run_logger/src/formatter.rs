//! Renders records as single-line JSON documents or human-readable lines.

use serde::{
    ser::{SerializeMap, Serializer},
    Serialize,
};
use time::format_description::well_known::Rfc3339;

use crate::{keys, CloudResource, LoggerError, Record, ServiceContext, SourcePrefix};

/// Type marker that makes Error Reporting pick up a record.
pub const ERROR_REPORT_TYPE: &str =
    "type.googleapis.com/google.devtools.clouderrorreporting.v1beta1.ReportedErrorEvent";

#[derive(Serialize)]
struct SourceLocationEntry<'a> {
    file: &'a str,
    line: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    function: Option<&'a str>,
}

/// Context shared by every structured record of a logger.
#[derive(Debug, Clone, Copy)]
pub(crate) struct StructuredContext<'a> {
    pub(crate) prefix: &'a SourcePrefix,
    pub(crate) service_context: Option<&'a ServiceContext>,
    pub(crate) resource: Option<&'a CloudResource>,
}

/// Serializes a record into the Cloud Logging structured format, without a trailing newline.
pub(crate) fn structured(
    record: &Record<'_>,
    context: StructuredContext<'_>,
) -> Result<Vec<u8>, LoggerError> {
    let timestamp = record.timestamp().format(&Rfc3339)?;
    let location = record.location();

    let mut buffer = Vec::new();
    let mut serializer = serde_json::Serializer::new(&mut buffer);
    let mut map_serializer = serializer.serialize_map(None)?;

    map_serializer.serialize_entry(keys::MESSAGE, record.message())?;
    if !record.fields().is_empty() {
        map_serializer.serialize_entry(keys::JSON_PAYLOAD, record.fields())?;
    }
    map_serializer.serialize_entry(keys::SEVERITY, &record.severity())?;
    map_serializer.serialize_entry(keys::TIMESTAMP, &timestamp)?;

    // Records carrying a resource are full log entries, which name the location field plainly.
    let location_key = if context.resource.is_some() {
        keys::ENTRY_SOURCE_LOCATION
    } else {
        keys::SOURCE_LOCATION
    };
    map_serializer.serialize_entry(
        location_key,
        &SourceLocationEntry {
            file: context.prefix.relativize(location.file()),
            line: location.line().to_string(),
            function: location.function(),
        },
    )?;

    if record.severity().is_error() {
        map_serializer.serialize_entry(keys::TYPE, ERROR_REPORT_TYPE)?;
    }
    if let Some(service_context) = context.service_context {
        map_serializer.serialize_entry(keys::SERVICE_CONTEXT, service_context)?;
    }
    if let Some(resource) = context.resource {
        map_serializer.serialize_entry(keys::LOG_NAME, &resource.log_name)?;
        map_serializer.serialize_entry(keys::RESOURCE, &resource.resource)?;
    }

    map_serializer.end()?;
    Ok(buffer)
}

/// Renders a record as `SEVERITY in [file:line]: message`, followed by the fields as a JSON
/// object on a second line when there are any. No trailing newline.
pub(crate) fn plain(record: &Record<'_>, prefix: &SourcePrefix) -> Result<Vec<u8>, LoggerError> {
    let location = record.location();

    let mut buffer = format!(
        "{} in [{}:{}]: {}",
        record.severity(),
        prefix.relativize(location.file()),
        location.line(),
        record.message(),
    )
    .into_bytes();

    if !record.fields().is_empty() {
        buffer.push(b'\n');
        serde_json::to_writer(&mut buffer, record.fields())?;
    }

    Ok(buffer)
}

/// The first `max_chars` characters of `payload`.
pub(crate) fn excerpt(payload: &str, max_chars: usize) -> &str {
    payload
        .char_indices()
        .nth(max_chars)
        .and_then(|(index, _)| payload.get(..index))
        .unwrap_or(payload)
}
