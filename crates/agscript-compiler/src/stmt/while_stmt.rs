//! While loop compilation.
//!
//! Bytecode layout:
//! ```text
//! start:
//! [condition -> AX]   (omitted when the condition is a nonzero constant)
//! JZ end
//! [body]
//! JMP start
//! end:
//! ```
//!
//! `continue` jumps to `start`; `break` jumps to `end`.

use agscript_parser::TokenKind;

use crate::bytecode::Opcode;
use crate::compiler::{Compiler, Result};
use crate::emit::BackwardJumpDest;
use crate::nesting::{NestingFrame, NestingKind};

impl<'a, 'ast> Compiler<'a, 'ast> {
    pub(crate) fn compile_while(&mut self) -> Result<()> {
        self.advance();
        let start = BackwardJumpDest::here(&self.script);
        self.mark_jump_target();

        self.expect(TokenKind::LeftParen)?;
        let condition = self.compile_expression()?;
        let to_end = match condition.as_const() {
            Some(value) if value.is_true() => None,
            _ => {
                let vartype = self.load_to_ax(condition)?;
                self.check_condition(&vartype)?;
                Some(self.jump(Opcode::Jz))
            }
        };
        self.expect(TokenKind::RightParen)?;

        let mut frame = NestingFrame::new(NestingKind::While, self.scope.depth());
        frame.continue_target = Some(start);
        self.nesting.push(frame);
        self.compile_controlled_statement()?;
        start.write_jump(&mut self.script, Opcode::Jmp);

        let Some(mut frame) = self.nesting.pop() else {
            return Err(self.internal_error("Loop nesting out of balance"));
        };
        if let Some(jump) = to_end {
            self.patch_here(jump);
        }
        self.patch_list_here(&mut frame.breaks);
        Ok(())
    }
}
