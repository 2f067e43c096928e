//! Diagnostic module - Error and warning reporting infrastructure.
//!
//! Semantic failures are recoverable: each pass records a [`Diagnostic`]
//! with a source position into a shared [`Handler`] and keeps walking.
//! The handler preserves emission order, which matches source order within
//! a pass.
//!
//! # Examples
//!
//! ```
//! use brioc_util::diagnostic::Handler;
//! use brioc_util::span::Span;
//!
//! let handler = Handler::new();
//! handler.error(Span::point(3, 7), "'x' no declarado");
//!
//! assert!(handler.has_errors());
//! assert_eq!(handler.error_count(), 1);
//! ```

use crate::span::Span;
use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use std::cell::RefCell;
use std::fmt;

/// Diagnostic severity level
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Level {
    /// An error that fails the compilation
    Error,
    /// A warning that does not fail the compilation
    Warning,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Level::Error => write!(f, "error"),
            Level::Warning => write!(f, "warning"),
        }
    }
}

/// A diagnostic message with severity and location
///
/// Displays as `[line L:C] message`, or the bare message when the span
/// carries no position (internal consistency failures).
#[derive(Clone, Debug, PartialEq)]
pub struct Diagnostic {
    /// Diagnostic severity level
    pub level: Level,
    /// Main diagnostic message
    pub message: String,
    /// Source location
    pub span: Span,
}

impl Diagnostic {
    /// Create a new diagnostic
    pub fn new(level: Level, message: impl Into<String>, span: Span) -> Self {
        Self {
            level,
            message: message.into(),
            span,
        }
    }

    /// Create an error diagnostic
    pub fn error(message: impl Into<String>, span: Span) -> Self {
        Self::new(Level::Error, message, span)
    }

    /// Create a warning diagnostic
    pub fn warning(message: impl Into<String>, span: Span) -> Self {
        Self::new(Level::Warning, message, span)
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.span.line == 0 {
            write!(f, "{}", self.message)
        } else {
            write!(
                f,
                "[line {}:{}] {}",
                self.span.line, self.span.column, self.message
            )
        }
    }
}

// Serialized shape is the external contract:
// { line?, column?, message, severity } with position omitted when unknown.
impl Serialize for Diagnostic {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let with_pos = self.span.line != 0;
        let fields = if with_pos { 4 } else { 2 };
        let mut s = serializer.serialize_struct("Diagnostic", fields)?;
        if with_pos {
            s.serialize_field("line", &self.span.line)?;
            s.serialize_field("column", &self.span.column)?;
        }
        s.serialize_field("message", &self.message)?;
        s.serialize_field("severity", &self.level.to_string())?;
        s.end()
    }
}

/// Handler for collecting and reporting diagnostics
///
/// Interior mutability lets the passes report through a shared reference
/// while the tree walk holds mutable state of its own.
pub struct Handler {
    diagnostics: RefCell<Vec<Diagnostic>>,
}

impl Handler {
    /// Create a new handler
    pub fn new() -> Self {
        Self {
            diagnostics: RefCell::new(Vec::new()),
        }
    }

    /// Report an error at the given location
    pub fn error(&self, span: Span, message: impl Into<String>) {
        self.emit(Diagnostic::error(message, span));
    }

    /// Report a warning at the given location
    pub fn warning(&self, span: Span, message: impl Into<String>) {
        self.emit(Diagnostic::warning(message, span));
    }

    /// Emit a pre-built diagnostic
    pub fn emit(&self, diagnostic: Diagnostic) {
        self.diagnostics.borrow_mut().push(diagnostic);
    }

    /// Check if any errors have been reported
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .borrow()
            .iter()
            .any(|d| d.level == Level::Error)
    }

    /// Get the number of errors
    pub fn error_count(&self) -> usize {
        self.diagnostics
            .borrow()
            .iter()
            .filter(|d| d.level == Level::Error)
            .count()
    }

    /// Get all diagnostics in emission order
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.diagnostics.borrow().clone()
    }

    /// Clear all diagnostics
    pub fn clear(&self) {
        self.diagnostics.borrow_mut().clear();
    }
}

impl Default for Handler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_display() {
        assert_eq!(format!("{}", Level::Error), "error");
        assert_eq!(format!("{}", Level::Warning), "warning");
    }

    #[test]
    fn test_diagnostic_display_with_position() {
        let diag = Diagnostic::error("'x' no declarado", Span::point(3, 7));
        assert_eq!(format!("{}", diag), "[line 3:7] 'x' no declarado");
    }

    #[test]
    fn test_diagnostic_display_without_position() {
        let diag = Diagnostic::error("Interno: tabla corrupta", Span::DUMMY);
        assert_eq!(format!("{}", diag), "Interno: tabla corrupta");
    }

    #[test]
    fn test_handler_collects_in_order() {
        let handler = Handler::new();
        handler.error(Span::point(1, 1), "primero");
        handler.error(Span::point(2, 1), "segundo");

        let diags = handler.diagnostics();
        assert_eq!(diags.len(), 2);
        assert_eq!(diags[0].message, "primero");
        assert_eq!(diags[1].message, "segundo");
    }

    #[test]
    fn test_handler_error_count() {
        let handler = Handler::new();
        assert!(!handler.has_errors());

        handler.warning(Span::DUMMY, "aviso");
        assert!(!handler.has_errors());

        handler.error(Span::DUMMY, "falla");
        assert!(handler.has_errors());
        assert_eq!(handler.error_count(), 1);
    }

    #[test]
    fn test_handler_clear() {
        let handler = Handler::new();
        handler.error(Span::DUMMY, "falla");
        handler.clear();
        assert!(!handler.has_errors());
        assert!(handler.diagnostics().is_empty());
    }

    #[test]
    fn test_diagnostic_serialization() {
        let diag = Diagnostic::error("'x' no declarado", Span::point(3, 7));
        let json = serde_json::to_value(&diag).unwrap();
        assert_eq!(json["line"], 3);
        assert_eq!(json["column"], 7);
        assert_eq!(json["message"], "'x' no declarado");
        assert_eq!(json["severity"], "error");
    }

    #[test]
    fn test_diagnostic_serialization_without_position() {
        let diag = Diagnostic::error("Interno: tabla corrupta", Span::DUMMY);
        let json = serde_json::to_value(&diag).unwrap();
        assert!(json.get("line").is_none());
        assert!(json.get("column").is_none());
        assert_eq!(json["severity"], "error");
    }
}
