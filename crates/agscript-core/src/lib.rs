//! Core types shared by the AGS script compiler crates.
//!
//! This crate provides:
//! - [`Span`] for source locations reported by the scanner
//! - [`ScanError`] and [`CompileError`] for the two phases that can fail
//! - [`Diagnostics`], the message handler that collects warnings
//! - [`CompileOptions`], the flags that steer a single compilation

pub mod diagnostics;
pub mod error;
pub mod options;
pub mod span;

pub use diagnostics::{Diagnostic, DiagnosticKind, Diagnostics};
pub use error::{CompileError, CompileErrorKind, ScanError};
pub use options::CompileOptions;
pub use span::Span;
