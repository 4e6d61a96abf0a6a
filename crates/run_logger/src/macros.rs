//! Macros capturing the full source location, including the enclosing function.

/// Returns the path of the enclosing function, e.g. `my_service::handlers::checkout`.
///
/// Closures and async blocks are reported as the function they are defined in.
#[macro_export]
macro_rules! function_name {
    () => {{
        fn __run_logger_probe() {}
        fn __run_logger_type_name_of<T>(_: T) -> &'static str {
            ::std::any::type_name::<T>()
        }
        let name = __run_logger_type_name_of(__run_logger_probe);
        let mut name = name.strip_suffix("::__run_logger_probe").unwrap_or(name);
        while let Some(outer) = name.strip_suffix("::{{closure}}") {
            name = outer;
        }
        name
    }};
}

/// Returns the [`SourceLocation`][crate::SourceLocation] of the invocation, including the
/// enclosing function.
#[macro_export]
macro_rules! source_location {
    () => {
        $crate::SourceLocation::new(::std::file!(), ::std::line!())
            .with_function($crate::function_name!())
    };
}

/// Emits a record whose message is the given values joined by spaces.
///
/// ```
/// # let logger = run_logger::Logger::plain();
/// run_logger::emit!(logger, run_logger::Severity::Info, "Hello", "world");
/// ```
#[macro_export]
macro_rules! emit {
    ($emitter:expr, $severity:expr, $($value:expr),+ $(,)?) => {{
        use $crate::Emitter as _;
        let values: &[&dyn ::std::fmt::Display] = &[$(&$value),+];
        ($emitter).write_record($crate::Record::from_values(
            $severity,
            values,
            $crate::source_location!(),
        ));
    }};
}

/// Emits a record whose message is a formatted template.
///
/// ```
/// # let logger = run_logger::Logger::plain();
/// run_logger::emit_fmt!(logger, run_logger::Severity::Info, "Hello {}", "world");
/// ```
#[macro_export]
macro_rules! emit_fmt {
    ($emitter:expr, $severity:expr, $($arg:tt)+) => {{
        use $crate::Emitter as _;
        ($emitter).write_record($crate::Record::new(
            $severity,
            ::std::format!($($arg)+),
            $crate::source_location!(),
        ));
    }};
}

/// Emits a record with a structured payload.
///
/// ```
/// # let logger = run_logger::Logger::plain();
/// run_logger::emit_with_fields!(
///     logger,
///     run_logger::Severity::Error,
///     "request failed",
///     { "code" => 500, "path" => "/checkout" }
/// );
/// ```
#[macro_export]
macro_rules! emit_with_fields {
    ($emitter:expr, $severity:expr, $message:expr, { $($key:expr => $value:expr),* $(,)? }) => {{
        use $crate::Emitter as _;
        ($emitter).write_record(
            $crate::Record::new($severity, $message, $crate::source_location!())
                .with_fields([$($crate::Field::new($key, $value)),*]),
        );
    }};
}
