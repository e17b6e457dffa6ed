// Licensed under the Apache-2.0 license

//! Crate-wide helpers shared by the driver modules.
//!
//! The drivers never format into a heap buffer; log records are passed down as
//! `core::fmt::Arguments` and rendered by whichever [`Logger`] the caller injects.

use core::fmt;

/// Sink for driver diagnostics.
///
/// Implementations must not block for long when used from interrupt context.
pub trait Logger {
    fn debug(&mut self, args: fmt::Arguments<'_>);
    fn error(&mut self, args: fmt::Arguments<'_>);
}

/// Logger that discards every record.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoOpLogger;

impl Logger for NoOpLogger {
    fn debug(&mut self, _args: fmt::Arguments<'_>) {}
    fn error(&mut self, _args: fmt::Arguments<'_>) {}
}

/// Logger writing one line per record to an `embedded-io` sink (usually a UART).
pub struct IoLogger<W: embedded_io::Write> {
    writer: W,
}

impl<W: embedded_io::Write> IoLogger<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    fn emit(&mut self, level: &str, args: fmt::Arguments<'_>) {
        let mut adapter = FmtAdapter {
            writer: &mut self.writer,
        };
        // A failing sink cannot be reported anywhere else.
        let _ = fmt::Write::write_fmt(&mut adapter, format_args!("[{level}] {args}\r\n"));
    }
}

impl<W: embedded_io::Write> Logger for IoLogger<W> {
    fn debug(&mut self, args: fmt::Arguments<'_>) {
        self.emit("debug", args);
    }

    fn error(&mut self, args: fmt::Arguments<'_>) {
        self.emit("error", args);
    }
}

struct FmtAdapter<'w, W: embedded_io::Write> {
    writer: &'w mut W,
}

impl<W: embedded_io::Write> fmt::Write for FmtAdapter<'_, W> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.writer.write_all(s.as_bytes()).map_err(|_| fmt::Error)
    }
}
