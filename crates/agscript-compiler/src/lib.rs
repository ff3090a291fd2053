//! AGS Script Compiler
//!
//! A single-pass compiler from AGS script source to the bytecode of the AGS
//! virtual machine.
//!
//! ## Architecture
//!
//! The scanner in `agscript-parser` produces a token list. The [`compile`]
//! entry point walks that list once, updating the symbol table for each
//! declaration and generating code for each function body as it is read.
//! There is no syntax tree: the compiler jumps around in the token list
//! where the generated code needs a different order than the source.
//!
//! ## Modules
//!
//! - [`bytecode`]: Opcodes, registers and the constants of the binary format
//! - [`script`]: The compiled script object with its fixups, imports and exports
//! - [`emit`]: Forward and backward jump bookkeeping, restore points
//! - [`types`]: Variable types, struct and enum definitions, function signatures

pub mod bytecode;
mod callpoints;
mod compiler;
mod const_fold;
pub mod emit;
mod expr;
mod nesting;
mod operators;
mod scope;
pub mod script;
mod stmt;
mod symbols;
pub mod types;

pub use agscript_core::{CompileError, CompileErrorKind, CompileOptions, Diagnostics};
pub use bytecode::{Opcode, Register};
pub use script::{CompiledScript, Fixup, FixupKind};

use agscript_parser::Scanner;
use bumpalo::Bump;

use crate::compiler::Compiler;

/// Compile `source` into a script object.
///
/// Warnings are collected in `diagnostics`. The first fatal error stops the
/// compilation; it is returned and also recorded in `diagnostics`.
///
/// # Example
///
/// ```
/// use agscript_compiler::{compile, CompileOptions, Diagnostics};
///
/// let mut diagnostics = Diagnostics::new();
/// let script = compile("void Foo() { return; }", CompileOptions::empty(), &mut diagnostics).unwrap();
/// assert_eq!(script.code, vec![38, 0, 5]);
/// ```
#[cfg_attr(feature = "profiling", profiling::function)]
pub fn compile(
    source: &str,
    options: CompileOptions,
    diagnostics: &mut Diagnostics,
) -> Result<CompiledScript, CompileError> {
    let arena = Bump::new();
    let result = Scanner::new(source, &arena)
        .scan_all()
        .and_then(|tokens| Compiler::new(&tokens, options, &mut *diagnostics).compile());

    if let Err(err) = &result {
        log::debug!("compilation failed: {err}");
        diagnostics.add_error(err.message.clone(), err.section.clone(), err.line);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compile_ok(source: &str) -> CompiledScript {
        let _ = env_logger::builder().is_test(true).try_init();
        let mut diagnostics = Diagnostics::new();
        match compile(source, CompileOptions::empty(), &mut diagnostics) {
            Ok(script) => script,
            Err(err) => panic!("unexpected error: {err}"),
        }
    }

    #[test]
    fn empty_source_compiles_to_nothing() {
        let script = compile_ok("");
        assert!(script.code.is_empty());
        assert!(script.fixups.is_empty());
    }

    #[test]
    fn fatal_error_is_recorded() {
        let mut diagnostics = Diagnostics::new();
        let err = compile("int x = ;", CompileOptions::empty(), &mut diagnostics).unwrap_err();
        assert_eq!(err.line, 1);
        assert!(diagnostics.has_errors());
    }

    #[test]
    fn scanner_errors_are_lexical() {
        let mut diagnostics = Diagnostics::new();
        let err = compile("int x = 99999999999;", CompileOptions::empty(), &mut diagnostics).unwrap_err();
        assert!(err.is_lexical());
        assert!(err.message.contains("99999999999"));
    }
}
