// SPDX-FileCopyrightText: 2025 Alexandre Gomes Gaigalas <alganet@gmail.com>
//
// SPDX-License-Identifier: ISC

//! Reporting sinks for validation outcomes.
//!
//! The reporter is injected at construction; internal components never reach
//! for a global logger. `Sinks` mirrors the configurable fallback chain:
//! per-level closure, then a shared `on_report`, then the tracing-backed
//! default.

use crate::result::ValidationResult;
use std::fmt;
use tracing::{error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Error,
    Warning,
    Success,
}

/// Destination for human-readable validation notices.
pub trait Reporter: Send + Sync {
    fn error(&self, message: &str);
    fn warning(&self, message: &str);
    fn success(&self, message: &str);
}

/// Default reporter, used only as the composition-root fallback.
pub struct LogReporter;

impl Reporter for LogReporter {
    fn error(&self, message: &str) {
        error!("{message}");
    }
    fn warning(&self, message: &str) {
        warn!("{message}");
    }
    fn success(&self, message: &str) {
        info!("{message}");
    }
}

type Sink = Box<dyn Fn(&str) + Send + Sync>;
type SharedSink = Box<dyn Fn(Level, &str) + Send + Sync>;

/// Closure-backed reporter. Each level falls back to `on_report`, then to
/// the default logger.
#[derive(Default)]
pub struct Sinks {
    on_error: Option<Sink>,
    on_warning: Option<Sink>,
    on_success: Option<Sink>,
    on_report: Option<SharedSink>,
}

impl Sinks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_error(mut self, f: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.on_error = Some(Box::new(f));
        self
    }

    pub fn on_warning(mut self, f: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.on_warning = Some(Box::new(f));
        self
    }

    pub fn on_success(mut self, f: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.on_success = Some(Box::new(f));
        self
    }

    pub fn on_report(mut self, f: impl Fn(Level, &str) + Send + Sync + 'static) -> Self {
        self.on_report = Some(Box::new(f));
        self
    }

    fn dispatch(&self, level: Level, own: &Option<Sink>, message: &str) {
        if let Some(f) = own {
            f(message);
        } else if let Some(f) = &self.on_report {
            f(level, message);
        } else {
            match level {
                Level::Error => LogReporter.error(message),
                Level::Warning => LogReporter.warning(message),
                Level::Success => LogReporter.success(message),
            }
        }
    }
}

impl Reporter for Sinks {
    fn error(&self, message: &str) {
        self.dispatch(Level::Error, &self.on_error, message);
    }
    fn warning(&self, message: &str) {
        self.dispatch(Level::Warning, &self.on_warning, message);
    }
    fn success(&self, message: &str) {
        self.dispatch(Level::Success, &self.on_success, message);
    }
}

#[derive(Debug, Clone, Copy)]
pub(crate) enum Side {
    Request,
    Response,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Request => f.write_str("Request"),
            Side::Response => f.write_str("Response"),
        }
    }
}

/// Report one completed validation result: each error through the error
/// sink, each warning through the warning sink, one success notice when the
/// result is valid.
pub(crate) fn report_result(
    reporter: &dyn Reporter,
    side: Side,
    method: &str,
    path: &str,
    result: &ValidationResult,
) {
    for (index, message) in result.errors.iter().enumerate() {
        reporter.error(&invalid_line(side, method, path, index, message));
    }
    for (index, message) in result.warnings.iter().enumerate() {
        reporter.warning(&invalid_line(side, method, path, index, message));
    }
    if result.valid {
        reporter.success(&format!("{side} for {method} {path} is valid"));
    }
}

// Second and later findings get an ordinal: "is invalid(2): ...".
fn invalid_line(side: Side, method: &str, path: &str, index: usize, message: &str) -> String {
    let ordinal = if index > 0 {
        format!("({})", index + 1)
    } else {
        String::new()
    };
    format!("{side} for {method} {path} is invalid{ordinal}: {message}")
}
