//! The ephemeral record composed by every emission call.

use std::{borrow::Cow, fmt, panic::Location};

use time::OffsetDateTime;

use crate::{Field, Fields, Severity};

/// Where a record was emitted from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceLocation {
    file: &'static str,
    line: u32,
    function: Option<Cow<'static, str>>,
}

impl SourceLocation {
    /// Creates a location without a function name.
    pub const fn new(file: &'static str, line: u32) -> Self {
        Self {
            file,
            line,
            function: None,
        }
    }

    /// Captures the location of the caller.
    ///
    /// Through a chain of `#[track_caller]` functions this is the first call site outside the
    /// chain. The function name is not available this way; use [`source_location!`] for it.
    ///
    /// [`source_location!`]: crate::source_location
    #[track_caller]
    pub fn caller() -> Self {
        let location = Location::caller();
        Self::new(location.file(), location.line())
    }

    /// Attaches the name of the enclosing function.
    #[must_use]
    pub fn with_function(mut self, function: impl Into<Cow<'static, str>>) -> Self {
        self.function = Some(function.into());
        self
    }

    /// The source file, as recorded by the compiler.
    pub fn file(&self) -> &'static str {
        self.file
    }

    /// The line number.
    pub fn line(&self) -> u32 {
        self.line
    }

    /// The enclosing function, if known.
    pub fn function(&self) -> Option<&str> {
        self.function.as_deref()
    }
}

/// Directory prefix stripped from source file paths before they are written.
///
/// Captured once when a logger is constructed and never changed afterwards.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SourcePrefix(Option<String>);

impl SourcePrefix {
    /// A prefix that leaves every path unchanged.
    pub const fn none() -> Self {
        Self(None)
    }

    /// The directory of the caller's source file.
    #[track_caller]
    pub fn caller() -> Self {
        Self::from_file(Location::caller().file())
    }

    /// The directory of `file`, including the trailing separator.
    ///
    /// A file without a directory component yields a prefix that strips nothing.
    pub fn from_file(file: &str) -> Self {
        let prefix = file
            .rfind(['/', '\\'])
            .and_then(|index| file.get(..=index))
            .map(str::to_owned);
        Self(prefix)
    }

    /// The captured prefix, if any.
    pub fn as_str(&self) -> Option<&str> {
        self.0.as_deref()
    }

    /// Strips the prefix from `path` if present, otherwise returns `path` unchanged.
    pub fn relativize<'p>(&self, path: &'p str) -> &'p str {
        self.0
            .as_deref()
            .and_then(|prefix| path.strip_prefix(prefix))
            .unwrap_or(path)
    }
}

/// A single log record.
///
/// Built by an emission call, handed to exactly one [`Emitter`][crate::Emitter] and dropped.
#[derive(Debug)]
pub struct Record<'a> {
    severity: Severity,
    message: String,
    fields: Fields<'a>,
    location: SourceLocation,
    timestamp: OffsetDateTime,
}

impl<'a> Record<'a> {
    /// Creates a record timestamped with the current time.
    pub fn new(severity: Severity, message: impl Into<String>, location: SourceLocation) -> Self {
        Self {
            severity,
            message: message.into(),
            fields: Fields::new(),
            location,
            timestamp: OffsetDateTime::now_utc(),
        }
    }

    /// Creates a record whose message is `values` joined by single spaces.
    pub fn from_values(
        severity: Severity,
        values: &[&dyn fmt::Display],
        location: SourceLocation,
    ) -> Self {
        Self::new(severity, join_values(values), location)
    }

    /// Attaches fields to the record.
    #[must_use]
    pub fn with_fields(mut self, fields: impl IntoIterator<Item = Field<'a>>) -> Self {
        self.fields.extend(fields);
        self
    }

    /// Overrides the timestamp.
    #[must_use]
    pub fn with_timestamp(mut self, timestamp: OffsetDateTime) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// The severity.
    pub fn severity(&self) -> Severity {
        self.severity
    }

    /// The message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The attached fields.
    pub fn fields(&self) -> &Fields<'a> {
        &self.fields
    }

    /// The call site.
    pub fn location(&self) -> &SourceLocation {
        &self.location
    }

    /// The time the record was created.
    pub fn timestamp(&self) -> OffsetDateTime {
        self.timestamp
    }
}

/// Joins display values with single spaces and trims surrounding whitespace.
pub(crate) fn join_values(values: &[&dyn fmt::Display]) -> String {
    let joined = values
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" ");
    joined.trim().to_owned()
}
