//! Switch statement compilation.
//!
//! The switch value is kept in BX while the case bodies are compiled in
//! source order. The comparisons against the case values are a chain that
//! follows the bodies:
//!
//! ```text
//! [value -> AX]
//! REGTOREG AX BX
//! JMP compare
//! case1: [statements]
//! case2: [statements]
//! JMP end           (only when the last clause can run to its end)
//! compare:
//! LITTOREG AX v1     (or the case expression's code between PUSH/POP BX)
//! ISEQUAL AX BX      (STRINGSEQUAL for strings)
//! JNZ case1
//! ...
//! JMP default        (only with a default label)
//! end:
//! ```

use agscript_parser::{Token, TokenKind};

use crate::bytecode::{Opcode, Register, STACK_CELL_SIZE};
use crate::compiler::{Compiler, Result};
use crate::emit::BackwardJumpDest;
use crate::expr::ConversionContext;
use crate::nesting::{Case, CaseValue, NestingFrame, NestingKind, SwitchInfo};
use crate::types::VarType;

const FALLTHROUGH_WARNING: &str =
    "Code execution may fall through to the next case (did you forget a 'break;'?)";

impl<'a, 'ast> Compiler<'a, 'ast> {
    pub(crate) fn compile_switch(&mut self) -> Result<()> {
        let rp = self.restore_point();
        let depth = self.scope.depth();
        self.advance();

        self.expect(TokenKind::LeftParen)?;
        let value_type = self.compile_expression_to_ax()?;
        if !value_type.is_integer() && !value_type.is_any_string(&self.symbols.types) {
            return Err(self.semantic_error(format!(
                "Cannot switch on a value of type '{}'",
                value_type.display(&self.symbols.types)
            )));
        }
        self.expect(TokenKind::RightParen)?;
        self.emit_regs(Opcode::RegToReg, &[Register::Ax, Register::Bx]);
        let to_compare = self.jump(Opcode::Jmp);
        self.expect(TokenKind::LeftBrace)?;

        self.scope.push_scope();
        let mut info = SwitchInfo::new(value_type, self.scope.offset());
        info.to_compare = Some(to_compare);
        let mut frame = NestingFrame::new(NestingKind::Switch, depth);
        frame.switch = Some(info);
        self.nesting.push(frame);

        loop {
            match self.peek_kind() {
                TokenKind::Case => self.compile_case()?,
                TokenKind::Default => self.compile_default()?,
                TokenKind::RightBrace => break,
                TokenKind::Eof => {
                    return Err(self.syntax_error("Unexpected end of input; the switch is missing its '}'"));
                }
                _ => {
                    let has_clauses = self.nesting.current_switch_mut().is_some_and(|s| s.has_clauses());
                    if !has_clauses {
                        return Err(self.syntax_error(format!(
                            "Expected 'case' or 'default', found '{}' instead",
                            Self::describe(self.peek())
                        )));
                    }
                    // A case label can jump past the declaration's push.
                    if self.at_declaration() {
                        return Err(self.semantic_error(
                            "Cannot use declarations directly within a switch body (put the case into a '{ ... }' block)",
                        ));
                    }
                    self.compile_statement()?;
                }
            }
        }
        self.advance();
        self.exit_block();

        let Some(mut frame) = self.nesting.pop() else {
            return Err(self.internal_error("Switch nesting out of balance"));
        };
        let Some(info) = frame.switch.take() else {
            return Err(self.internal_error("Switch frame without switch information"));
        };
        if !info.has_clauses() {
            self.restore(rp);
            return Ok(());
        }
        if self.is_reachable() {
            let out = self.jump(Opcode::Jmp);
            frame.breaks.push(out);
        }

        self.write_case_comparisons(info)?;
        self.patch_list_here(&mut frame.breaks);
        Ok(())
    }

    fn write_case_comparisons(&mut self, info: SwitchInfo) -> Result<()> {
        let Some(to_compare) = info.to_compare else {
            return Err(self.internal_error("Switch without a jump to its comparisons"));
        };
        self.patch_here(to_compare);
        let compare = if info.value_type.is_any_string(&self.symbols.types) {
            Opcode::StringsEqual
        } else {
            Opcode::IsEqual
        };

        for case in info.cases {
            self.forget_line();
            self.mark_line(case.line);
            match case.value {
                CaseValue::Const(value) => self.lit_to_reg(Register::Ax, value.to_word()),
                CaseValue::Code { chunk, callpoints } => {
                    self.push_reg(Register::Bx);
                    let base = self.script.write_chunk(&chunk);
                    self.callpoints.restore_at(base, &callpoints);
                    self.pop_reg(Register::Bx);
                }
            }
            self.emit_regs(compare, &[Register::Ax, Register::Bx]);
            case.body.write_jump(&mut self.script, Opcode::Jnz);
        }
        if let Some(default) = info.default {
            default.write_jump(&mut self.script, Opcode::Jmp);
        }
        Ok(())
    }

    /// `case value:`
    fn compile_case(&mut self) -> Result<()> {
        let token = self.advance();
        self.warn_fall_through(token);
        let Some((stack_offset, value_type)) = self
            .nesting
            .current_switch_mut()
            .map(|s| (s.stack_offset, s.value_type.clone()))
        else {
            return Err(self.internal_error("'case' outside of a switch"));
        };
        if self.check(TokenKind::Colon) {
            return Err(self.syntax_error("Expected a value after 'case'"));
        }

        // The case value is evaluated in the comparison chain, with BX pushed.
        let saved_offset = self.scope.offset();
        self.scope.adjust(stack_offset + STACK_CELL_SIZE as i32 - saved_offset);
        let start = self.script.code_size();
        let value = self.compile_case_value(start, token.line(), &value_type);
        self.scope.adjust(saved_offset - self.scope.offset());
        let value = value?;

        if let CaseValue::Const(v) = &value {
            let duplicate = self.nesting.current_switch_mut().is_some_and(|s| {
                s.cases
                    .iter()
                    .any(|c| matches!(&c.value, CaseValue::Const(other) if other == v))
            });
            if duplicate {
                return Err(self.semantic_error(format!("Duplicate case value '{v}'")));
            }
        }
        self.expect(TokenKind::Colon)?;

        let body = self.begin_clause();
        if let Some(switch) = self.nesting.current_switch_mut() {
            switch.cases.push(Case {
                value,
                body,
                line: token.line(),
            });
        }
        Ok(())
    }

    fn compile_case_value(&mut self, start: usize, line: u32, value_type: &VarType) -> Result<CaseValue> {
        let operand = self.compile_expression()?;
        if let Some(value) = operand.as_const() {
            if !self.is_convertible(&operand.vartype, value_type) {
                return Err(self.semantic_error(format!(
                    "The case value '{value}' does not match the switch type '{}'",
                    value_type.display(&self.symbols.types)
                )));
            }
            return Ok(CaseValue::Const(value));
        }
        let vartype = self.load_to_ax(operand)?;
        self.convert_ax(&vartype, value_type, ConversionContext::Expression)?;
        let chunk = self
            .script
            .yank_chunk(start, line)
            .map_err(|e| self.internal_error(e.to_string()))?;
        let callpoints = self.callpoints.yank_from(start);
        Ok(CaseValue::Code { chunk, callpoints })
    }

    /// `default:`
    fn compile_default(&mut self) -> Result<()> {
        let token = self.advance();
        self.warn_fall_through(token);
        let has_default = self.nesting.current_switch_mut().is_some_and(|s| s.default.is_some());
        if has_default {
            return Err(self.semantic_error("This switch already has a 'default' label"));
        }
        self.expect(TokenKind::Colon)?;
        let body = self.begin_clause();
        if let Some(switch) = self.nesting.current_switch_mut() {
            switch.default = Some(body);
        }
        Ok(())
    }

    /// Note the start of a clause's statements.
    fn begin_clause(&mut self) -> BackwardJumpDest {
        let body = BackwardJumpDest::here(&self.script);
        self.mark_jump_target();
        let code_size = self.script.code_size();
        if let Some(switch) = self.nesting.current_switch_mut() {
            switch.clause_start = Some(code_size);
            switch.fallthrough_marked = false;
        }
        body
    }

    /// Warn at a label when the clause before it can run into it.
    fn warn_fall_through(&mut self, label: Token<'ast>) {
        let code_size = self.script.code_size();
        let reachable = self.is_reachable();
        let falls_through = self.nesting.current_switch_mut().is_some_and(|s| {
            s.clause_start.is_some_and(|start| code_size > start) && !s.fallthrough_marked
        });
        if reachable && falls_through {
            self.warn_at(label, FALLTHROUGH_WARNING);
        }
    }
}
