//! For loop compilation.
//!
//! The iteration clause comes before the condition in the token stream's
//! natural order but must run after the body, so the compiler first skips
//! ahead to find the clause boundaries and then compiles them out of order:
//!
//! ```text
//! [init]
//! JMP cond          (only with an iteration clause)
//! iter:
//! [iteration]
//! cond:
//! [condition -> AX] (omitted when empty or a nonzero constant)
//! JZ end
//! [body]
//! JMP iter
//! end:
//! ```

use agscript_parser::TokenKind;

use crate::bytecode::Opcode;
use crate::compiler::{Compiler, Result};
use crate::emit::BackwardJumpDest;
use crate::nesting::{NestingFrame, NestingKind};

impl<'a, 'ast> Compiler<'a, 'ast> {
    pub(crate) fn compile_for(&mut self) -> Result<()> {
        self.advance();
        self.expect(TokenKind::LeftParen)?;

        // Variables declared in the init clause live until the loop ends.
        self.scope.push_scope();
        if !self.eat(TokenKind::Semicolon) {
            if self.at_declaration() {
                self.compile_local_declaration()?;
            } else {
                self.compile_simple_statement(TokenKind::Semicolon)?;
            }
        }

        let cond_start = self.pos();
        let cond_end = self.find_at_depth0(cond_start, |k| k == TokenKind::Semicolon);
        if self.token_at(cond_end).kind != TokenKind::Semicolon {
            self.set_pos(cond_end);
            return Err(self.syntax_error(format!(
                "Expected ';' after the loop condition, found '{}' instead",
                Self::describe(self.token_at(cond_end))
            )));
        }
        let iter_start = cond_end + 1;
        let iter_end = self.find_at_depth0(iter_start, |k| k == TokenKind::RightParen);

        let to_cond = (iter_start < iter_end).then(|| self.jump(Opcode::Jmp));
        let iter_dest = BackwardJumpDest::here(&self.script);
        self.mark_jump_target();
        if let Some(to_cond) = to_cond {
            self.set_pos(iter_start);
            self.forget_line();
            self.mark_line(self.token_at(iter_start).line());
            self.compile_simple_statement(TokenKind::RightParen)?;
            self.patch_here(to_cond);
        }

        self.set_pos(cond_start);
        let mut to_end = None;
        if cond_start < cond_end {
            self.forget_line();
            self.mark_line(self.token_at(cond_start).line());
            let condition = self.compile_expression()?;
            if !condition.as_const().is_some_and(|value| value.is_true()) {
                let vartype = self.load_to_ax(condition)?;
                self.check_condition(&vartype)?;
                to_end = Some(self.jump(Opcode::Jz));
            }
        }
        self.expect(TokenKind::Semicolon)?;
        self.set_pos(iter_end);
        self.expect(TokenKind::RightParen)?;

        let mut frame = NestingFrame::new(NestingKind::For, self.scope.depth());
        frame.continue_target = Some(iter_dest);
        self.nesting.push(frame);
        self.compile_controlled_statement()?;
        iter_dest.write_jump(&mut self.script, Opcode::Jmp);

        let Some(mut frame) = self.nesting.pop() else {
            return Err(self.internal_error("Loop nesting out of balance"));
        };
        if let Some(jump) = to_end {
            self.patch_here(jump);
        }
        self.patch_list_here(&mut frame.breaks);
        self.exit_block();
        Ok(())
    }
}
