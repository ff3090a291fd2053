//! Jump bookkeeping for control flow.
//!
//! All jumps are relative to the word following the jump's operand.
//! Forward jumps are written with a placeholder operand and recorded as a
//! [`PendingJump`] that is patched once the destination is known; backward
//! jumps go to a [`BackwardJumpDest`] noted before the code they return to.

use crate::bytecode::Opcode;
use crate::script::CompiledScript;

/// A forward jump whose operand still has to be filled in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingJump {
    /// Code offset of the jump's operand word.
    operand: usize,
}

impl PendingJump {
    /// Emit `op` with a placeholder destination.
    pub fn emit(script: &mut CompiledScript, op: Opcode) -> Self {
        script.write_cmd(op, &[0]);
        Self {
            operand: script.code_size() - 1,
        }
    }

    pub fn operand(&self) -> usize {
        self.operand
    }

    /// Make the jump land on `target`.
    pub fn patch(&self, script: &mut CompiledScript, target: usize) {
        script.code[self.operand] = target as i32 - (self.operand as i32 + 1);
    }

    /// Make the jump land on the next instruction to be emitted.
    pub fn patch_here(&self, script: &mut CompiledScript) {
        let target = script.code_size();
        self.patch(script, target);
    }
}

/// A code offset that later jumps go back to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackwardJumpDest {
    position: usize,
}

impl BackwardJumpDest {
    /// Note the current end of code as the destination.
    pub fn here(script: &CompiledScript) -> Self {
        Self {
            position: script.code_size(),
        }
    }

    pub fn at(position: usize) -> Self {
        Self { position }
    }

    pub fn position(&self) -> usize {
        self.position
    }

    /// Emit `op` jumping back to the destination.
    pub fn write_jump(&self, script: &mut CompiledScript, op: Opcode) {
        let after = script.code_size() as i32 + 2;
        script.write_cmd(op, &[self.position as i32 - after]);
    }
}

/// Forward jumps that all go to the same, not yet known, place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JumpList {
    jumps: Vec<PendingJump>,
}

impl JumpList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, jump: PendingJump) {
        self.jumps.push(jump);
    }

    pub fn is_empty(&self) -> bool {
        self.jumps.is_empty()
    }

    pub fn len(&self) -> usize {
        self.jumps.len()
    }

    /// Patch every jump to the next instruction and clear the list.
    pub fn patch_here(&mut self, script: &mut CompiledScript) {
        for jump in self.jumps.drain(..) {
            jump.patch_here(script);
        }
    }

    /// Drop jumps whose operand lies at or beyond `len` (the code was cut).
    pub fn forget_from(&mut self, len: usize) {
        self.jumps.retain(|j| j.operand < len);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytecode::Register;

    #[test]
    fn forward_jump_is_relative_to_next_word() {
        let mut script = CompiledScript::new();
        let jump = PendingJump::emit(&mut script, Opcode::Jz);
        script.lit_to_reg(Register::Ax, 1);
        jump.patch_here(&mut script);
        // JZ +3 skips the three words of LITTOREG.
        assert_eq!(script.code, vec![28, 3, 6, 3, 1]);
    }

    #[test]
    fn backward_jump() {
        let mut script = CompiledScript::new();
        script.lit_to_reg(Register::Ax, 0);
        let start = BackwardJumpDest::here(&script);
        script.write_cmd(Opcode::Add, &[Register::Ax.into(), 1]);
        start.write_jump(&mut script, Opcode::Jmp);
        // After the operand at 7 we are at 8; back to 3 is -5.
        assert_eq!(&script.code[6..], &[31, -5]);
        assert_eq!(start.position(), 3);
    }

    #[test]
    fn jump_to_itself_end() {
        let mut script = CompiledScript::new();
        let jump = PendingJump::emit(&mut script, Opcode::Jmp);
        jump.patch_here(&mut script);
        assert_eq!(script.code, vec![31, 0]);
    }

    #[test]
    fn jump_list_patches_all() {
        let mut script = CompiledScript::new();
        let mut list = JumpList::new();
        list.push(PendingJump::emit(&mut script, Opcode::Jmp));
        list.push(PendingJump::emit(&mut script, Opcode::Jmp));
        assert_eq!(list.len(), 2);
        list.patch_here(&mut script);
        assert!(list.is_empty());
        assert_eq!(script.code, vec![31, 2, 31, 0]);
    }

    #[test]
    fn forget_dropped_jumps() {
        let mut script = CompiledScript::new();
        let mut list = JumpList::new();
        list.push(PendingJump::emit(&mut script, Opcode::Jmp));
        list.push(PendingJump::emit(&mut script, Opcode::Jmp));
        list.forget_from(2);
        assert_eq!(list.len(), 1);
    }
}
