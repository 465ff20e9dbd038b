//! Tracing initialization and event formatting.

use std::io::IsTerminal;

use tracing_error::ErrorLayer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::event_bus::Event;

pub const SCOPE_COLOR: &str = "\x1b[32m"; // green
pub const LINE_COLOR: &str = "\x1b[35m"; // magenta
pub const RESET_COLOR: &str = "\x1b[0m";

/// Installs the process tracing subscriber: `RUST_LOG`-style env filter
/// (defaulting to `stageflow=info`), fmt layer, and an [`ErrorLayer`] for
/// span traces on errors. Idempotent — later calls are no-ops.
pub fn init() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("stageflow=info"));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(ErrorLayer::default())
        .try_init();
}

/// Color mode for formatted event output.
///
/// - [`FormatterMode::Auto`]: detect TTY capability via `stderr`
/// - [`FormatterMode::Colored`]: always emit ANSI codes
/// - [`FormatterMode::Plain`]: never emit ANSI codes (logs, files)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FormatterMode {
    #[default]
    Auto,
    Colored,
    Plain,
}

impl FormatterMode {
    pub fn auto_detect() -> Self {
        if std::io::stderr().is_terminal() {
            FormatterMode::Colored
        } else {
            FormatterMode::Plain
        }
    }

    pub fn is_colored(&self) -> bool {
        match self {
            FormatterMode::Auto => std::io::stderr().is_terminal(),
            FormatterMode::Colored => true,
            FormatterMode::Plain => false,
        }
    }
}

/// Renders events for text sinks.
pub trait TelemetryFormatter: Send + Sync {
    /// One rendered line (newline-terminated) per event.
    fn render_event(&self, event: &Event) -> String;
}

/// Plain text formatter with optional ANSI color.
pub struct PlainFormatter {
    mode: FormatterMode,
}

impl PlainFormatter {
    /// Formatter with auto-detected color mode.
    pub fn new() -> Self {
        Self {
            mode: FormatterMode::Auto,
        }
    }

    /// Formatter with an explicit color mode.
    pub fn with_mode(mode: FormatterMode) -> Self {
        Self { mode }
    }
}

impl Default for PlainFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl TelemetryFormatter for PlainFormatter {
    fn render_event(&self, event: &Event) -> String {
        if self.mode.is_colored() {
            format!("{LINE_COLOR}{event}{RESET_COLOR}\n")
        } else {
            format!("{event}\n")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_mode_renders_without_ansi() {
        let formatter = PlainFormatter::with_mode(FormatterMode::Plain);
        let rendered = formatter.render_event(&Event::diagnostic("scheduler", "started"));
        assert_eq!(rendered, "scheduler: started\n");
    }

    #[test]
    fn colored_mode_wraps_with_ansi() {
        let formatter = PlainFormatter::with_mode(FormatterMode::Colored);
        let rendered = formatter.render_event(&Event::diagnostic("scheduler", "started"));
        assert!(rendered.starts_with(LINE_COLOR));
        assert!(rendered.ends_with(&format!("{RESET_COLOR}\n")));
    }
}
