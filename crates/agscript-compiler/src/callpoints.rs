//! Calls to functions whose code address is not known yet.
//!
//! A function may be called after its prototype but before its body. The
//! call is emitted with a placeholder address; the operand position is
//! remembered here and patched when the body starts.

use crate::script::CompiledScript;
use crate::types::FuncId;

/// Code offsets of placeholder function addresses, by callee.
#[derive(Debug, Clone, Default)]
pub struct Callpoints {
    pending: Vec<(usize, FuncId)>,
}

impl Callpoints {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remember that the word at `position` must become `func`'s address.
    pub fn add(&mut self, position: usize, func: FuncId) {
        self.pending.push((position, func));
    }

    /// Write `address` into every placeholder for `func`.
    pub fn resolve(&mut self, func: FuncId, address: u32, script: &mut CompiledScript) -> usize {
        let mut patched = 0;
        self.pending.retain(|&(position, callee)| {
            if callee != func {
                return true;
            }
            script.code[position] = address as i32;
            patched += 1;
            false
        });
        patched
    }

    /// Drop placeholders at or past `len`; the code there was taken back.
    pub fn forget_from(&mut self, len: usize) {
        self.pending.retain(|&(position, _)| position < len);
    }

    /// Remove placeholders at or past `start` and return them relative to
    /// `start`, for code that is being yanked into a chunk.
    pub fn yank_from(&mut self, start: usize) -> Vec<(usize, FuncId)> {
        let mut yanked = Vec::new();
        self.pending.retain(|&(position, func)| {
            if position < start {
                return true;
            }
            yanked.push((position - start, func));
            false
        });
        yanked
    }

    /// Re-register yanked placeholders for a chunk written at `base`.
    pub fn restore_at(&mut self, base: usize, yanked: &[(usize, FuncId)]) {
        self.pending
            .extend(yanked.iter().map(|&(rel, func)| (base + rel, func)));
    }

    /// Callees that still have unpatched calls, in call order.
    pub fn unresolved(&self) -> impl Iterator<Item = FuncId> + '_ {
        self.pending.iter().map(|&(_, func)| func)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_patches_only_matching_calls() {
        let mut script = CompiledScript::new();
        script.code = vec![0; 10];
        let mut calls = Callpoints::new();
        calls.add(2, FuncId(0));
        calls.add(5, FuncId(1));
        calls.add(8, FuncId(0));

        assert_eq!(calls.resolve(FuncId(0), 40, &mut script), 2);
        assert_eq!(script.code[2], 40);
        assert_eq!(script.code[8], 40);
        assert_eq!(script.code[5], 0);
        assert_eq!(calls.unresolved().collect::<Vec<_>>(), vec![FuncId(1)]);
    }

    #[test]
    fn yank_and_restore() {
        let mut calls = Callpoints::new();
        calls.add(2, FuncId(0));
        calls.add(12, FuncId(1));
        let yanked = calls.yank_from(10);
        assert_eq!(yanked, vec![(2, FuncId(1))]);
        calls.restore_at(20, &yanked);
        let mut script = CompiledScript::new();
        script.code = vec![0; 30];
        calls.resolve(FuncId(1), 7, &mut script);
        assert_eq!(script.code[22], 7);
    }

    #[test]
    fn forget_drops_tail() {
        let mut calls = Callpoints::new();
        calls.add(2, FuncId(0));
        calls.add(12, FuncId(1));
        calls.forget_from(10);
        assert_eq!(calls.unresolved().collect::<Vec<_>>(), vec![FuncId(0)]);
    }
}
