//! Stretches of code that are cut out of the buffer and re-emitted later.
//!
//! Case labels of a `switch` are compiled where they appear, but their
//! comparisons belong to the jump table after the switch body. The label
//! code is therefore yanked into a [`Chunk`] and written back once the table
//! is emitted. Jumps inside a chunk are relative, so they stay valid.

use super::fixups::FixupKind;

/// Code removed from the end of the buffer together with its fixups.
///
/// All offsets are relative to the chunk start.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Chunk {
    pub code: Vec<i32>,
    pub fixups: Vec<(u32, FixupKind)>,
    /// Source line the chunk was compiled on.
    pub line: u32,
}

impl Chunk {
    pub fn is_empty(&self) -> bool {
        self.code.is_empty()
    }

    pub fn len(&self) -> usize {
        self.code.len()
    }
}
