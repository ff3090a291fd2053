//! Code buffer helpers used while emitting.
//!
//! - [`PendingJump`], [`BackwardJumpDest`] and [`JumpList`] for control flow
//! - [`RestorePoint`] for speculative emission that may be taken back

mod jumps;

pub use jumps::{BackwardJumpDest, JumpList, PendingJump};

use crate::script::CompiledScript;

/// A snapshot of the code buffer and the string and import tables that
/// emission can be rolled back to.
///
/// Constant folding and dead ternary arms compile code first and only then
/// find out that it is not needed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RestorePoint {
    code_len: usize,
    last_cmd: Option<usize>,
    strings_len: usize,
    imports_len: usize,
}

impl RestorePoint {
    pub fn new(script: &CompiledScript) -> Self {
        Self {
            code_len: script.code_size(),
            last_cmd: script.last_cmd_raw(),
            strings_len: script.strings.len(),
            imports_len: script.imports.len(),
        }
    }

    pub fn code_len(&self) -> usize {
        self.code_len
    }

    /// Whether nothing has been emitted since the snapshot.
    pub fn is_empty(&self, script: &CompiledScript) -> bool {
        script.code_size() == self.code_len
    }

    /// Throw away everything emitted since the snapshot.
    pub fn restore(&self, script: &mut CompiledScript) {
        script.truncate(self.code_len, self.last_cmd);
        script.truncate_tables(self.strings_len, self.imports_len);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytecode::{Opcode, Register};
    use crate::script::FixupKind;

    #[test]
    fn restore_rolls_back_code_and_fixups() {
        let mut script = CompiledScript::new();
        script.write_cmd(Opcode::ThisBase, &[0]);
        let rp = RestorePoint::new(&script);
        assert!(rp.is_empty(&script));

        script.lit_to_reg(Register::Ax, 0);
        script.fixup_previous(FixupKind::String);
        assert!(!rp.is_empty(&script));

        rp.restore(&mut script);
        assert_eq!(script.code, vec![38, 0]);
        assert!(script.fixups.is_empty());
        assert_eq!(script.last_opcode(), Some(Opcode::ThisBase));
    }

    #[test]
    fn restore_forgets_new_imports_and_strings() {
        let mut script = CompiledScript::new();
        script.add_import("Display");
        let rp = RestorePoint::new(&script);
        script.add_import("Wait");
        script.add_string(b"gone");
        rp.restore(&mut script);
        assert_eq!(script.imports, vec!["Display".to_string()]);
        assert!(script.strings.is_empty());
    }
}
