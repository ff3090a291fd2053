//! Bytecode definitions shared by the code generator and the disassembler.
//!
//! This module contains:
//!
//! - [`Opcode`] - The instruction set of the AGS script VM
//! - [`Register`] - The VM registers instructions refer to
//! - Size constants for the built-in types

mod opcode;

pub use opcode::{Opcode, Register};

/// Size of one stack cell; every `PUSHREG` moves the stack pointer by this.
pub const STACK_CELL_SIZE: u32 = 4;

/// Size of a legacy fixed-buffer `string`.
pub const OLD_STRING_SIZE: u32 = 200;

/// Size of a pointer or dynamic array handle.
pub const POINTER_SIZE: u32 = 4;

/// Offsets in exports do not fit above this.
pub const EXPORT_OFFSET_LIMIT: u32 = 0x0100_0000;

/// Export tag for an address into the code segment.
pub const EXPORT_FUNCTION: u32 = 1;

/// Export tag for an address into global data.
pub const EXPORT_DATA: u32 = 2;
