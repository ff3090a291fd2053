//! Statements that leave their construct: `return`, `break`, `continue`
//! and `fallthrough`.
//!
//! All of them release the managed pointers of the locals they leave
//! behind and pop those locals off the stack, without changing the
//! compiler's own idea of the stack offset: the code after them is
//! compiled as if they had not happened.

use agscript_parser::TokenKind;

use crate::bytecode::{Opcode, Register, STACK_CELL_SIZE};
use crate::compiler::{Compiler, Result};
use crate::expr::ConversionContext;

impl<'a, 'ast> Compiler<'a, 'ast> {
    /// `return [expression];`
    ///
    /// A returned managed pointer is parked in a stack cell holding a
    /// reference while the locals are released, so that returning a local
    /// does not free the object:
    ///
    /// ```text
    /// PUSHREG AX; LOADSPOFFS 4; MEMINITPTR AX
    /// [release locals]
    /// LOADSPOFFS 4; MEMREADPTR AX; MEMZEROPTRND; POPREG BX
    /// ```
    pub(crate) fn compile_return(&mut self) -> Result<()> {
        self.advance();
        let Some(return_type) = self.current_function().map(|f| f.return_type.clone()) else {
            return Err(self.internal_error("'return' outside of a function"));
        };

        if self.eat(TokenKind::Semicolon) {
            if !return_type.is_void() {
                return Err(self.semantic_error(format!(
                    "Expected a return value of type '{}'",
                    return_type.display(&self.symbols.types)
                )));
            }
            self.free_dynpointers(1);
        } else {
            if return_type.is_void() {
                return Err(self.semantic_error("Cannot return a value from a 'void' function"));
            }
            let value_type = self.compile_expression_to_ax()?;
            self.convert_ax(&value_type, &return_type, ConversionContext::Assignment)?;
            self.expect(TokenKind::Semicolon)?;

            let rp = self.restore_point();
            self.push_reg(Register::Ax);
            if return_type.is_dyn() {
                self.emit(Opcode::LoadSpOffs, &[STACK_CELL_SIZE as i32]);
                self.emit_regs(Opcode::MemInitPtr, &[Register::Ax]);
            }
            if self.free_dynpointers(1) {
                if return_type.is_dyn() {
                    self.emit(Opcode::LoadSpOffs, &[STACK_CELL_SIZE as i32]);
                    self.emit_regs(Opcode::MemReadPtr, &[Register::Ax]);
                    self.emit(Opcode::MemZeroPtrNd, &[]);
                    self.pop_reg(Register::Bx);
                } else {
                    self.pop_reg(Register::Ax);
                }
            } else {
                self.restore(rp);
                self.scope.adjust(-(STACK_CELL_SIZE as i32));
            }
        }

        self.sub_sp_on_exit(self.scope.offset());
        self.emit(Opcode::Ret, &[]);
        Ok(())
    }

    /// `break;`
    pub(crate) fn compile_break(&mut self) -> Result<()> {
        self.advance();
        self.expect(TokenKind::Semicolon)?;
        let Some(depth) = self.nesting.innermost().map(|f| f.depth) else {
            return Err(self.semantic_error("'break' is only allowed inside a loop or a switch"));
        };
        self.leave_to_depth(depth);
        let jump = self.jump(Opcode::Jmp);
        if let Some(frame) = self.nesting.innermost_mut() {
            frame.breaks.push(jump);
        }
        Ok(())
    }

    /// `continue;`
    pub(crate) fn compile_continue(&mut self) -> Result<()> {
        self.advance();
        self.expect(TokenKind::Semicolon)?;
        let Some((depth, target)) = self.nesting.innermost_loop().map(|f| (f.depth, f.continue_target)) else {
            return Err(self.semantic_error("'continue' is only allowed inside a loop"));
        };
        self.leave_to_depth(depth);
        match target {
            Some(target) => target.write_jump(&mut self.script, Opcode::Jmp),
            None => {
                let jump = self.jump(Opcode::Jmp);
                if let Some(frame) = self.nesting.innermost_loop_mut() {
                    frame.continues.push(jump);
                }
            }
        }
        Ok(())
    }

    /// `fallthrough;` marks the end of a switch clause that intentionally
    /// runs into the next one.
    pub(crate) fn compile_fallthrough(&mut self) -> Result<()> {
        self.advance();
        self.expect(TokenKind::Semicolon)?;
        match self.nesting.current_switch_mut() {
            Some(switch) => {
                switch.fallthrough_marked = true;
                Ok(())
            }
            None => Err(self.semantic_error("'fallthrough' is only allowed directly inside a switch")),
        }
    }

    /// Release the locals declared deeper than `depth` on the way out of
    /// a construct.
    fn leave_to_depth(&mut self, depth: u32) {
        self.free_dynpointers(depth + 1);
        let size = self.scope.size_from_depth(depth + 1);
        self.sub_sp_on_exit(size);
    }
}
