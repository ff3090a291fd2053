//! Relocation records for code words the loader has to adjust.

use num_enum::{IntoPrimitive, TryFromPrimitive};

/// Which segment base the loader adds to a fixed-up word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum FixupKind {
    /// Offset into the global data segment.
    GlobalData = 1,
    /// Offset into the code segment, e.g. the address of a called function.
    Function = 2,
    /// Offset into the string pool.
    String = 3,
    /// Index into the import table.
    Import = 4,
    /// A word inside global data that points into global data.
    DataData = 5,
    /// Offset relative to the stack base.
    Stack = 6,
}

/// One relocation: the word at `offset` must be adjusted by the loader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fixup {
    pub offset: u32,
    pub kind: FixupKind,
}

impl Fixup {
    pub fn new(offset: u32, kind: FixupKind) -> Self {
        Self { offset, kind }
    }
}
