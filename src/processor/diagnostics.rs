//! Accumulated compiler diagnostics.
//!
//! Nothing here aborts compilation: the parser records what it finds and
//! carries on, and the driver decides afterwards whether code may be
//! generated.  Which pass is allowed to record what is decided here so the
//! parser can report unconditionally.

use serde::Serialize;
use std::collections::HashSet;
use std::fmt::{self, Write};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Pass {
    /// Collects declarations; silent apart from duplicates.
    First,
    /// Resolves everything and reports.
    Second,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Severity {
    Error,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => f.write_str("error"),
            Severity::Warning => f.write_str("warning"),
        }
    }
}

/// Where a diagnostic points.  End-of-compilation warnings carry only a line.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Location {
    pub line: usize,
    pub column: usize,
    pub source_line: Option<String>,
    pub pointer: Option<String>,
}

impl Location {
    pub fn line_only(line: usize) -> Self {
        Self {
            line,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub pass: Pass,
    pub location: Location,
    pub message: String,
}

#[derive(Debug, Default, Clone)]
pub struct Diagnostics {
    items: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Recorded on the second pass only.
    pub fn error(&mut self, pass: Pass, location: Location, message: impl Into<String>) {
        if pass == Pass::Second {
            self.push(Severity::Error, pass, location, message.into());
        }
    }

    /// Recorded on the first pass only; the second pass walks a different
    /// path for the same declaration and would otherwise report it twice.
    pub fn pass1_error(&mut self, pass: Pass, location: Location, message: impl Into<String>) {
        if pass == Pass::First {
            self.push(Severity::Error, pass, location, message.into());
        }
    }

    pub fn warning(&mut self, pass: Pass, location: Location, message: impl Into<String>) {
        if pass == Pass::Second {
            self.push(Severity::Warning, pass, location, message.into());
        }
    }

    fn push(&mut self, severity: Severity, pass: Pass, location: Location, message: String) {
        log::debug!("{severity} line {}: {message}", location.line);
        self.items.push(Diagnostic {
            severity,
            pass,
            location,
            message,
        });
    }

    pub fn error_count(&self) -> usize {
        self.count(Severity::Error)
    }

    pub fn warning_count(&self) -> usize {
        self.count(Severity::Warning)
    }

    fn count(&self, severity: Severity) -> usize {
        self.items.iter().filter(|d| d.severity == severity).count()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter()
    }

    pub fn has_errors(&self) -> bool {
        self.error_count() > 0
    }

    /// Human-readable report.  Each offending source line is echoed once,
    /// with a pointer under the token, however many diagnostics it caused.
    pub fn render(&self) -> String {
        let mut out = String::new();
        let mut echoed = HashSet::new();
        for d in &self.items {
            let loc = &d.location;
            if let (Some(text), Some(pointer)) = (&loc.source_line, &loc.pointer) {
                if echoed.insert(loc.line) {
                    let _ = writeln!(out, "{:>5} {}", loc.line, text);
                    let _ = writeln!(out, "{:>5} {}", "", pointer);
                }
            }
            let _ = writeln!(out, "{} (line {}): {}", d.severity, loc.line, d.message);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(line: usize) -> Location {
        Location {
            line,
            column: 4,
            source_line: Some("x = y z;".into()),
            pointer: Some("....^".into()),
        }
    }

    #[test]
    fn passes_filter_what_they_record() {
        let mut diags = Diagnostics::new();
        diags.error(Pass::First, at(1), "ignored");
        diags.warning(Pass::First, at(1), "ignored");
        diags.pass1_error(Pass::First, at(1), "duplicate");
        diags.pass1_error(Pass::Second, at(1), "duplicate again");
        diags.error(Pass::Second, at(2), "unknown identifier");
        diags.warning(Pass::Second, Location::line_only(3), "x not used");

        assert_eq!(diags.error_count(), 2);
        assert_eq!(diags.warning_count(), 1);
        let messages: Vec<_> = diags.iter().map(|d| d.message.as_str()).collect();
        assert_eq!(messages, vec!["duplicate", "unknown identifier", "x not used"]);
    }

    #[test]
    fn line_echoed_once() {
        let mut diags = Diagnostics::new();
        diags.error(Pass::Second, at(7), "first");
        diags.error(Pass::Second, at(7), "second");
        let report = diags.render();
        assert_eq!(report.matches("x = y z;").count(), 1);
        assert!(report.contains("error (line 7): first"));
        assert!(report.contains("error (line 7): second"));
        assert!(report.contains("....^"));
    }
}
