//! Do-while loop compilation.
//!
//! Bytecode layout:
//! ```text
//! start:
//! [body]
//! continue:
//! [condition -> AX]
//! JNZ start        (JMP for a nonzero constant, nothing for zero)
//! end:
//! ```

use agscript_parser::TokenKind;

use crate::bytecode::Opcode;
use crate::compiler::{Compiler, Result};
use crate::emit::BackwardJumpDest;
use crate::nesting::{NestingFrame, NestingKind};

impl<'a, 'ast> Compiler<'a, 'ast> {
    pub(crate) fn compile_do_while(&mut self) -> Result<()> {
        self.advance();
        let start = BackwardJumpDest::here(&self.script);
        self.mark_jump_target();

        self.nesting.push(NestingFrame::new(NestingKind::Do, self.scope.depth()));
        self.compile_controlled_statement()?;
        let Some(mut frame) = self.nesting.pop() else {
            return Err(self.internal_error("Loop nesting out of balance"));
        };
        self.patch_list_here(&mut frame.continues);

        self.expect(TokenKind::While)?;
        self.expect(TokenKind::LeftParen)?;
        let condition = self.compile_expression()?;
        match condition.as_const() {
            Some(value) if value.is_true() => start.write_jump(&mut self.script, Opcode::Jmp),
            Some(_) => {}
            _ => {
                let vartype = self.load_to_ax(condition)?;
                self.check_condition(&vartype)?;
                start.write_jump(&mut self.script, Opcode::Jnz);
            }
        }
        self.expect(TokenKind::RightParen)?;
        self.expect(TokenKind::Semicolon)?;
        self.patch_list_here(&mut frame.breaks);
        Ok(())
    }
}
