//! If/else statement compilation.
//!
//! Bytecode layout:
//! ```text
//! [condition -> AX]
//! JZ else
//! [then branch]
//! JMP end          (with an else branch, unless the then branch cannot end)
//! else:
//! [else branch]
//! end:
//! ```

use agscript_parser::TokenKind;

use crate::bytecode::Opcode;
use crate::compiler::{Compiler, Result};

impl<'a, 'ast> Compiler<'a, 'ast> {
    pub(crate) fn compile_if(&mut self) -> Result<()> {
        self.advance();
        self.compile_condition()?;
        let to_else = self.jump(Opcode::Jz);
        self.compile_controlled_statement()?;

        if self.eat(TokenKind::Else) {
            let to_end = self.is_reachable().then(|| self.jump(Opcode::Jmp));
            self.patch_here(to_else);
            self.compile_controlled_statement()?;
            if let Some(to_end) = to_end {
                self.patch_here(to_end);
            }
        } else {
            self.patch_here(to_else);
        }
        Ok(())
    }

    /// `( expression )` evaluated into AX as a condition.
    pub(crate) fn compile_condition(&mut self) -> Result<()> {
        self.expect(TokenKind::LeftParen)?;
        let vartype = self.compile_expression_to_ax()?;
        self.check_condition(&vartype)?;
        self.expect(TokenKind::RightParen)?;
        Ok(())
    }
}
