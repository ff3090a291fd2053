//! The conditional operator `a ? b : c` and its short form `a ?: b`.
//!
//! With a constant condition only the chosen arm produces code, so
//! `0 ? 10 : 20` compiles exactly like `20`. The other arm is still parsed
//! and checked, in a dry run.

use agscript_parser::TokenKind;

use super::{ConversionContext, Operand, Value};
use crate::bytecode::Opcode;
use crate::compiler::{Compiler, Result};
use crate::operators::TERNARY_PRIORITY;
use crate::types::VarType;

impl<'a, 'ast> Compiler<'a, 'ast> {
    /// Compile the rest of a ternary whose condition is `condition`; the
    /// cursor is at the `?`.
    pub(crate) fn compile_ternary(&mut self, condition: Operand) -> Result<Operand> {
        self.advance();
        if self.eat(TokenKind::Colon) {
            return self.compile_elvis(condition);
        }
        if self.at_expression_end() {
            return Err(self.syntax_error("The second expression of this ternary is empty"));
        }

        if let Value::Const(value) = condition.value {
            if value.is_true() {
                let chosen = self.compile_binary(TERNARY_PRIORITY)?;
                self.expect(TokenKind::Colon)?;
                self.skip_ternary_arm()?;
                return Ok(chosen);
            }
            self.skip_ternary_arm()?;
            self.expect(TokenKind::Colon)?;
            self.check_third_arm()?;
            return self.compile_binary(TERNARY_PRIORITY);
        }

        let ((second, third), _) = self.dry_run(|c| {
            let second = c.compile_binary(TERNARY_PRIORITY)?.vartype;
            c.expect(TokenKind::Colon)?;
            c.check_third_arm()?;
            let third = c.compile_binary(TERNARY_PRIORITY)?.vartype;
            Ok((second, third))
        })?;
        let result = self.common_type(&second, &third)?;

        let cond_type = self.load_to_ax(condition)?;
        self.check_condition(&cond_type)?;
        let to_else = self.jump(Opcode::Jz);

        let arm = self.compile_binary(TERNARY_PRIORITY)?;
        let arm_type = self.load_to_ax(arm)?;
        self.convert_ax(&arm_type, &result, ConversionContext::Expression)?;
        let to_end = self.jump(Opcode::Jmp);
        self.patch_here(to_else);

        self.expect(TokenKind::Colon)?;
        let arm = self.compile_binary(TERNARY_PRIORITY)?;
        let arm_type = self.load_to_ax(arm)?;
        self.convert_ax(&arm_type, &result, ConversionContext::Expression)?;
        self.patch_here(to_end);
        Ok(Operand::in_ax(result))
    }

    /// `a ?: b` yields `a` unless it is zero or null.
    fn compile_elvis(&mut self, condition: Operand) -> Result<Operand> {
        self.check_third_arm()?;
        if let Value::Const(value) = condition.value {
            if value.is_true() {
                self.skip_ternary_arm()?;
                return Ok(condition);
            }
            return self.compile_binary(TERNARY_PRIORITY);
        }

        let cond_type = self.load_to_ax(condition)?;
        self.check_condition(&cond_type)?;
        let to_end = self.jump(Opcode::Jnz);
        let arm = self.compile_binary(TERNARY_PRIORITY)?;
        let arm_type = self.load_to_ax(arm)?;
        self.convert_ax(&arm_type, &cond_type, ConversionContext::Expression)?;
        self.patch_here(to_end);
        Ok(Operand::in_ax(cond_type))
    }

    fn check_third_arm(&self) -> Result<()> {
        if self.at_expression_end() {
            return Err(self.syntax_error("The third expression of this ternary is empty"));
        }
        Ok(())
    }

    /// Parse an arm that is never executed, without emitting code.
    fn skip_ternary_arm(&mut self) -> Result<()> {
        let (_, end) = self.dry_run(|c| c.compile_binary(TERNARY_PRIORITY))?;
        self.set_pos(end);
        Ok(())
    }

    /// The type both arms convert to.
    fn common_type(&self, second: &VarType, third: &VarType) -> Result<VarType> {
        if second.is_integer() && third.is_integer() {
            return Ok(VarType::int());
        }
        if self.is_convertible(third, second) && !second.is_null() && !second.is_old_string() {
            return Ok(second.clone());
        }
        if self.is_convertible(second, third) {
            return Ok(third.clone());
        }
        if self.is_convertible(third, second) {
            return Ok(second.clone());
        }
        let types = &self.symbols.types;
        Err(self.semantic_error(format!(
            "Type mismatch: cannot convert '{}' to '{}'",
            third.display(types),
            second.display(types)
        )))
    }
}
