//! Error types for the AGS script compiler.
//!
//! ## Error Hierarchy
//!
//! ```text
//! CompileError (the single fatal error a compilation returns)
//! ├── kind: Lexical   - converted from a ScanError
//! ├── kind: Syntax    - unexpected token, missing punctuation
//! ├── kind: Semantic  - type mismatch, redefinition, access violation, ...
//! └── kind: Internal  - an invariant of the code generator was broken
//! ```
//!
//! Compilation stops at the first fatal error, so there is never more than
//! one [`CompileError`]. Messages quote the offending identifier or literal
//! verbatim so that tests and tooling can match on them.

use thiserror::Error;

use crate::Span;

// ============================================================================
// Scanner Errors
// ============================================================================

/// Errors that occur while scanning source text into tokens.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScanError {
    /// A character that cannot start any token.
    #[error("The character '{ch}' is not legal in this context")]
    IllegalChar { ch: char, span: Span },

    /// Input ended right after the opening apostrophe.
    #[error("Expected a character and an apostrophe, but input ended instead")]
    UnfinishedCharLiteral { span: Span },

    /// Input ended directly after a backslash.
    #[error("The input ended inmidst of an escape sequence")]
    UnfinishedEscape { span: Span },

    /// `'\['` denotes two characters and cannot be a char literal.
    #[error("\\[ not allowed in single quotes, use '[' instead")]
    BracketEscapeInCharLiteral { span: Span },

    /// Input ended before the closing apostrophe.
    #[error("Expected an apostrophe, but input ended instead")]
    MissingApostrophe { span: Span },

    /// Something other than an apostrophe follows the character.
    #[error("Expected apostrophe, but found '{found}' instead")]
    ExpectedApostrophe { found: char, span: Span },

    /// Unknown escape such as `\q`.
    #[error("Found unknown escape sequence '\\{ch}' in string.")]
    UnknownEscape { ch: char, span: Span },

    /// Input ended inside a string literal.
    #[error("End of input encountered in an unclosed string literal")]
    UnterminatedString { span: Span },

    /// A string literal spans a line break.
    #[error("String literal may not contain any line breaks (use '[' instead)")]
    LineBreakInString { span: Span },

    /// Input ended inside a block comment.
    #[error("The comment starting on line {} is never closed", .span.line)]
    UnterminatedComment { span: Span },

    /// `..` is neither `.` nor `...`.
    #[error("Must either use '.' or '...'")]
    BadDots { span: Span },

    /// Integer or float literal that does not fit the target representation.
    #[error("Numeric literal '{text}' is out of range")]
    NumberOutOfRange { text: String, span: Span },

    /// Malformed numeric literal such as `1e`.
    #[error("Cannot interpret '{text}' as a number")]
    MalformedNumber { text: String, span: Span },

    /// A closing bracket without any opener.
    #[error("There isn't any opening symbol that matches the closing '{closer}'")]
    UnmatchedCloser { closer: char, span: Span },

    /// A closing bracket of the wrong kind.
    #[error("Found '{closer}', this does not match the '{opener}' {location}")]
    MismatchedCloser {
        closer: char,
        opener: char,
        /// "on this line", "on line N" or "in SECTION, line N".
        location: String,
        span: Span,
    },

    /// Input ended while brackets were still open.
    #[error("The '{opener}' on line {} is never closed", .span.line)]
    UnclosedOpener { opener: char, span: Span },
}

impl ScanError {
    /// Get the span where this error occurred.
    pub fn span(&self) -> Span {
        match self {
            ScanError::IllegalChar { span, .. }
            | ScanError::UnfinishedCharLiteral { span }
            | ScanError::UnfinishedEscape { span }
            | ScanError::BracketEscapeInCharLiteral { span }
            | ScanError::MissingApostrophe { span }
            | ScanError::ExpectedApostrophe { span, .. }
            | ScanError::UnknownEscape { span, .. }
            | ScanError::UnterminatedString { span }
            | ScanError::LineBreakInString { span }
            | ScanError::UnterminatedComment { span }
            | ScanError::BadDots { span }
            | ScanError::NumberOutOfRange { span, .. }
            | ScanError::MalformedNumber { span, .. }
            | ScanError::UnmatchedCloser { span, .. }
            | ScanError::MismatchedCloser { span, .. }
            | ScanError::UnclosedOpener { span, .. } => *span,
        }
    }
}

// ============================================================================
// Compile Errors
// ============================================================================

/// Category of a fatal compile error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompileErrorKind {
    /// Malformed or overflowing literal, illegal character.
    Lexical,
    /// Unexpected token or missing punctuation.
    Syntax,
    /// Undeclared identifier, type mismatch, redefinition, access violation.
    Semantic,
    /// The compiler's own bookkeeping went wrong.
    Internal,
}

/// The fatal error that stops a compilation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{section}:{line}: {message}")]
pub struct CompileError {
    pub kind: CompileErrorKind,
    pub message: String,
    /// Name of the section the error occurred in (empty for unnamed input).
    pub section: String,
    pub line: u32,
}

impl CompileError {
    pub fn new(kind: CompileErrorKind, message: impl Into<String>, section: impl Into<String>, line: u32) -> Self {
        Self {
            kind,
            message: message.into(),
            section: section.into(),
            line,
        }
    }

    /// Convert a scanner failure, keeping its message text verbatim.
    pub fn from_scan(err: &ScanError, section: impl Into<String>) -> Self {
        Self::new(CompileErrorKind::Lexical, err.to_string(), section, err.span().line)
    }

    pub fn is_lexical(&self) -> bool {
        self.kind == CompileErrorKind::Lexical
    }

    pub fn is_syntax(&self) -> bool {
        self.kind == CompileErrorKind::Syntax
    }

    pub fn is_semantic(&self) -> bool {
        self.kind == CompileErrorKind::Semantic
    }

    pub fn is_internal(&self) -> bool {
        self.kind == CompileErrorKind::Internal
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scan_error_display() {
        let err = ScanError::IllegalChar {
            ch: '$',
            span: Span::new(1, 5, 1),
        };
        assert_eq!(err.to_string(), "The character '$' is not legal in this context");
        assert_eq!(err.span(), Span::new(1, 5, 1));
    }

    #[test]
    fn scan_error_quotes_literal_text() {
        let err = ScanError::NumberOutOfRange {
            text: "99999999999".to_string(),
            span: Span::new(2, 1, 11),
        };
        assert_eq!(err.to_string(), "Numeric literal '99999999999' is out of range");
    }

    #[test]
    fn unknown_escape_display() {
        let err = ScanError::UnknownEscape {
            ch: 'q',
            span: Span::new(1, 1, 2),
        };
        assert_eq!(err.to_string(), "Found unknown escape sequence '\\q' in string.");
    }

    #[test]
    fn mismatched_closer_display() {
        let err = ScanError::MismatchedCloser {
            closer: ')',
            opener: '[',
            location: "on line 3".to_string(),
            span: Span::new(5, 1, 1),
        };
        assert_eq!(err.to_string(), "Found ')', this does not match the '[' on line 3");
    }

    #[test]
    fn compile_error_display() {
        let err = CompileError::new(CompileErrorKind::Semantic, "Identifier 'x' is undeclared", "main.asc", 12);
        assert_eq!(err.to_string(), "main.asc:12: Identifier 'x' is undeclared");
        assert!(err.is_semantic());
        assert!(!err.is_syntax());
    }

    #[test]
    fn compile_error_from_scan() {
        let scan = ScanError::UnterminatedString { span: Span::new(7, 3, 4) };
        let err = CompileError::from_scan(&scan, "glob");
        assert!(err.is_lexical());
        assert_eq!(err.line, 7);
        assert_eq!(err.section, "glob");
        assert_eq!(err.message, "End of input encountered in an unclosed string literal");
    }
}
