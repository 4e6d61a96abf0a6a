//! The pair of writers records are routed to.

use std::io::{self, Write};

use tracing_subscriber::fmt::{writer::BoxMakeWriter, MakeWriter};

use crate::Stream;

/// Destination for emitted lines, one writer per [`Stream`].
///
/// Each line is handed to the writer in a single `write_all` call so that concurrent emissions
/// do not interleave within a line.
#[derive(Debug)]
pub struct Output {
    stdout: BoxMakeWriter,
    stderr: BoxMakeWriter,
}

impl Output {
    /// Writes to the process' standard output and standard error.
    pub fn standard() -> Self {
        Self::new(io::stdout, io::stderr)
    }

    /// Writes to the provided writers.
    pub fn new<O, E>(stdout: O, stderr: E) -> Self
    where
        O: for<'a> MakeWriter<'a> + Send + Sync + 'static,
        E: for<'a> MakeWriter<'a> + Send + Sync + 'static,
    {
        Self {
            stdout: BoxMakeWriter::new(stdout),
            stderr: BoxMakeWriter::new(stderr),
        }
    }

    /// Appends a newline to `buffer` and writes it to the writer for `stream`.
    pub(crate) fn write_line(&self, stream: Stream, mut buffer: Vec<u8>) -> io::Result<()> {
        buffer.write_all(b"\n")?;
        match stream {
            Stream::Stdout => self.stdout.make_writer().write_all(&buffer),
            Stream::Stderr => self.stderr.make_writer().write_all(&buffer),
        }
    }
}

impl Default for Output {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
pub(crate) mod capture {
    use std::{
        io,
        sync::{Arc, Mutex},
    };

    use super::Output;

    #[derive(Clone, Debug, Default)]
    struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

    impl SharedBuffer {
        fn contents(&self) -> String {
            let buffer = self.0.lock().expect("capture buffer poisoned");
            String::from_utf8(buffer.clone()).expect("captured output must be UTF-8")
        }
    }

    impl io::Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0
                .lock()
                .expect("capture buffer poisoned")
                .extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    /// In-memory stand-in for stdout and stderr.
    #[derive(Clone, Debug, Default)]
    pub(crate) struct Capture {
        stdout: SharedBuffer,
        stderr: SharedBuffer,
    }

    impl Capture {
        pub(crate) fn output(&self) -> Output {
            let stdout = self.stdout.clone();
            let stderr = self.stderr.clone();
            Output::new(move || stdout.clone(), move || stderr.clone())
        }

        pub(crate) fn stdout(&self) -> String {
            self.stdout.contents()
        }

        pub(crate) fn stderr(&self) -> String {
            self.stderr.contents()
        }

        pub(crate) fn stdout_lines(&self) -> Vec<String> {
            self.stdout().lines().map(str::to_owned).collect()
        }

        pub(crate) fn stderr_lines(&self) -> Vec<String> {
            self.stderr().lines().map(str::to_owned).collect()
        }

        /// Parses every line written to `stream` as JSON.
        pub(crate) fn json(&self, stream: crate::Stream) -> Vec<serde_json::Value> {
            let lines = match stream {
                crate::Stream::Stdout => self.stdout_lines(),
                crate::Stream::Stderr => self.stderr_lines(),
            };
            lines
                .iter()
                .map(|line| serde_json::from_str(line).expect("line must be valid JSON"))
                .collect()
        }
    }
}
