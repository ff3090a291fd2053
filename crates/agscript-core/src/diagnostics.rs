//! The message handler a compilation reports its warnings to.

use std::collections::VecDeque;
use std::fmt;

/// A single diagnostic message from the compiler.
///
/// # Examples
///
/// ```rust
/// use agscript_core::{Diagnostic, DiagnosticKind};
///
/// let diagnostic = Diagnostic {
///     kind: DiagnosticKind::Warning,
///     message: "This hides the function 'Foo()'".to_string(),
///     section: "main.asc".to_string(),
///     line: 10,
/// };
///
/// assert_eq!(diagnostic.to_string(), "main.asc:10: warning: This hides the function 'Foo()'");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// The severity level of this diagnostic
    pub kind: DiagnosticKind,
    /// The diagnostic message text
    pub message: String,
    /// The section name where this diagnostic occurred
    pub section: String,
    /// The line number where this diagnostic occurred (1-based within the section)
    pub line: u32,
}

/// The severity level of a diagnostic message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticKind {
    /// The fatal error that stopped compilation.
    Error,
    /// Advisory: compilation continues.
    Warning,
    /// Informational message.
    Info,
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiagnosticKind::Error => write!(f, "error"),
            DiagnosticKind::Warning => write!(f, "warning"),
            DiagnosticKind::Info => write!(f, "info"),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}: {}: {}", self.section, self.line, self.kind, self.message)
    }
}

/// A collection of diagnostic messages from one compilation.
///
/// The compiler appends every warning as it is found and, when compilation
/// fails, the fatal error as the last entry.
///
/// # Examples
///
/// ```rust
/// use agscript_core::Diagnostics;
///
/// let mut diagnostics = Diagnostics::new();
/// diagnostics.add_warning("Code execution cannot reach this point", "main.asc", 4);
///
/// assert!(diagnostics.has_warnings());
/// assert!(!diagnostics.has_errors());
/// assert_eq!(diagnostics.count(), 1);
/// ```
#[derive(Debug, Default, Clone)]
pub struct Diagnostics {
    diagnostics: VecDeque<Diagnostic>,
    has_errors: bool,
}

impl Diagnostics {
    /// Creates a new, empty diagnostics collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a diagnostic to the collection.
    ///
    /// If the diagnostic is an error, this will set the internal error flag.
    pub fn add_diagnostic(&mut self, diagnostic: Diagnostic) {
        if diagnostic.kind == DiagnosticKind::Error {
            self.has_errors = true;
        }
        self.diagnostics.push_back(diagnostic);
    }

    pub fn add_warning(&mut self, message: impl Into<String>, section: impl Into<String>, line: u32) {
        self.add_diagnostic(Diagnostic {
            kind: DiagnosticKind::Warning,
            message: message.into(),
            section: section.into(),
            line,
        });
    }

    pub fn add_error(&mut self, message: impl Into<String>, section: impl Into<String>, line: u32) {
        self.add_diagnostic(Diagnostic {
            kind: DiagnosticKind::Error,
            message: message.into(),
            section: section.into(),
            line,
        });
    }

    /// Returns `true` if the collection contains any error diagnostics.
    ///
    /// The error state is tracked on insertion, so this does not iterate.
    pub fn has_errors(&self) -> bool {
        self.has_errors
    }

    /// Returns `true` if the collection contains any warning diagnostics.
    pub fn has_warnings(&self) -> bool {
        self.diagnostics.iter().any(|d| d.kind == DiagnosticKind::Warning)
    }

    /// Returns `true` if the collection contains no diagnostics.
    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    /// Removes all diagnostics and resets the error flag.
    pub fn clear(&mut self) {
        self.diagnostics.clear();
        self.has_errors = false;
    }

    /// Iterates over all diagnostics in the order they were reported.
    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter()
    }

    /// Iterates over error diagnostics only.
    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| d.kind == DiagnosticKind::Error)
    }

    /// Iterates over warning diagnostics only.
    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| d.kind == DiagnosticKind::Warning)
    }

    pub fn count(&self) -> usize {
        self.diagnostics.len()
    }

    pub fn error_count(&self) -> usize {
        self.errors().count()
    }

    pub fn warning_count(&self) -> usize {
        self.warnings().count()
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for diagnostic in &self.diagnostics {
            writeln!(f, "{}", diagnostic)?;
        }
        Ok(())
    }
}

impl<'a> IntoIterator for &'a Diagnostics {
    type Item = &'a Diagnostic;
    type IntoIter = std::collections::vec_deque::Iter<'a, Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.diagnostics.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_collection() {
        let diagnostics = Diagnostics::new();
        assert!(diagnostics.is_empty());
        assert!(!diagnostics.has_errors());
        assert!(!diagnostics.has_warnings());
        assert_eq!(diagnostics.count(), 0);
    }

    #[test]
    fn errors_and_warnings_are_separated() {
        let mut diagnostics = Diagnostics::new();
        diagnostics.add_warning("first", "a", 1);
        diagnostics.add_error("second", "a", 2);
        diagnostics.add_warning("third", "b", 3);

        assert!(diagnostics.has_errors());
        assert_eq!(diagnostics.warning_count(), 2);
        assert_eq!(diagnostics.error_count(), 1);

        let messages: Vec<_> = diagnostics.iter().map(|d| d.message.as_str()).collect();
        assert_eq!(messages, vec!["first", "second", "third"]);
    }

    #[test]
    fn clear_resets_error_flag() {
        let mut diagnostics = Diagnostics::new();
        diagnostics.add_error("oops", "", 1);
        diagnostics.clear();
        assert!(!diagnostics.has_errors());
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn display_lists_one_per_line() {
        let mut diagnostics = Diagnostics::new();
        diagnostics.add_warning("w", "s", 1);
        diagnostics.add_error("e", "s", 2);
        assert_eq!(diagnostics.to_string(), "s:1: warning: w\ns:2: error: e\n");
    }
}
