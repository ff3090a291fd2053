//! AGS script compiler.
//!
//! Compiles AGS script source into the bytecode, fixup table, imports and
//! exports that the AGS engine loads. The work is split over three crates
//! that this crate re-exports:
//!
//! - `agscript-core`: errors, diagnostics and [`CompileOptions`]
//! - `agscript-parser`: the scanner producing a [`TokenList`]
//! - `agscript-compiler`: the single-pass code generator and [`CompiledScript`]
//!
//! # Example
//!
//! ```
//! use agscript::{compile, CompileOptions, Diagnostics};
//!
//! let mut diagnostics = Diagnostics::new();
//! let script = compile(
//!     "int counter;\nint Next() { counter += 1; return counter; }",
//!     CompileOptions::LINE_NUMBERS,
//!     &mut diagnostics,
//! )
//! .unwrap();
//! assert_eq!(script.globaldata.len(), 4);
//! assert!(!diagnostics.has_warnings());
//! ```

pub use agscript_compiler::{bytecode, emit, script, types};
pub use agscript_compiler::{CompiledScript, Fixup, FixupKind, Opcode, Register, compile};
pub use agscript_core::{
    CompileError, CompileErrorKind, CompileOptions, Diagnostic, DiagnosticKind, Diagnostics, ScanError, Span,
};
pub use agscript_parser::{Scanner, Token, TokenKind, TokenList, TokenValue};

use agscript_parser::scanner::NEW_SECTION_PREFIX;

/// One named piece of source, such as a header or the room script.
#[derive(Debug, Clone, Copy)]
pub struct Section<'s> {
    pub name: &'s str,
    pub source: &'s str,
}

impl<'s> Section<'s> {
    pub fn new(name: &'s str, source: &'s str) -> Self {
        Self { name, source }
    }
}

/// Compile several sections as one script, in the order given.
///
/// Headers come first so the main script can use what they declare.
/// Diagnostics name the section they occur in, with lines counted from the
/// start of that section.
pub fn compile_sections(
    sections: &[Section<'_>],
    options: CompileOptions,
    diagnostics: &mut Diagnostics,
) -> Result<CompiledScript, CompileError> {
    let mut source = String::new();
    for section in sections {
        source.push('"');
        source.push_str(NEW_SECTION_PREFIX);
        source.push_str(section.name);
        source.push_str("\"\n");
        source.push_str(section.source);
        source.push('\n');
    }
    log::debug!("compiling {} section(s), {} bytes", sections.len(), source.len());
    compile(&source, options, diagnostics)
}
