//! Prefix operators: `-`, `!` and `~`.

use agscript_parser::{TokenKind, TokenValue};

use super::Operand;
use crate::bytecode::{Opcode, Register};
use crate::compiler::{Compiler, Result};
use crate::const_fold::{ConstValue, fold_unary};
use crate::operators::UnaryOp;
use crate::types::VarType;

impl<'a, 'ast> Compiler<'a, 'ast> {
    pub(crate) fn compile_unary(&mut self) -> Result<Operand> {
        let token = self.peek();
        if matches!(token.kind, TokenKind::PlusPlus | TokenKind::MinusMinus) {
            return Err(self.syntax_error(format!(
                "'{}' is only allowed as a statement of its own",
                token.lexeme
            )));
        }
        let Some(op) = UnaryOp::from_token(token.kind) else {
            return self.compile_primary();
        };
        self.advance();

        // 2147483648 only fits as the operand of a minus.
        if op == UnaryOp::Neg
            && self.check(TokenKind::IntLiteral)
            && let TokenValue::Int(magnitude) = self.peek().value
            && magnitude == 1 << 31
        {
            self.advance();
            return Ok(Operand::constant(ConstValue::Int(i32::MIN), VarType::int()));
        }

        if self.at_expression_end() {
            return Err(self.syntax_error(format!(
                "Expected an expression after '{}'",
                op.symbol()
            )));
        }
        let operand = self.compile_unary()?;

        if let Some(value) = operand.as_const() {
            if !(operand.vartype.is_integer() || operand.vartype.is_float()) {
                return Err(self.type_error(op, &operand.vartype));
            }
            let folded = fold_unary(op, value).map_err(|msg| self.semantic_error(msg))?;
            let vartype = match op {
                UnaryOp::Not => VarType::int(),
                _ if operand.vartype.is_float() => VarType::float(),
                _ => VarType::int(),
            };
            return Ok(Operand::constant(folded, vartype));
        }

        let vartype = self.load_to_ax(operand)?;
        match op {
            UnaryOp::Neg if vartype.is_integer() || vartype.is_float() => {
                let sub = if vartype.is_float() { Opcode::FSubReg } else { Opcode::SubReg };
                self.lit_to_reg(Register::Bx, 0);
                self.emit_regs(sub, &[Register::Bx, Register::Ax]);
                self.emit_regs(Opcode::RegToReg, &[Register::Bx, Register::Ax]);
                let result = if vartype.is_float() { VarType::float() } else { VarType::int() };
                Ok(Operand::in_ax(result))
            }
            UnaryOp::Not if vartype.is_integer() || vartype.is_dyn() => {
                self.emit_regs(Opcode::NotReg, &[Register::Ax]);
                Ok(Operand::in_ax(VarType::int()))
            }
            UnaryOp::BitNot if vartype.is_integer() => {
                self.lit_to_reg(Register::Bx, -1);
                self.emit_regs(Opcode::SubReg, &[Register::Bx, Register::Ax]);
                self.emit_regs(Opcode::RegToReg, &[Register::Bx, Register::Ax]);
                Ok(Operand::in_ax(VarType::int()))
            }
            _ => Err(self.type_error(op, &vartype)),
        }
    }

    fn type_error(&self, op: UnaryOp, vartype: &VarType) -> agscript_core::CompileError {
        self.semantic_error(format!(
            "The operator '{}' cannot be applied to a value of type '{}'",
            op.symbol(),
            vartype.display(&self.symbols.types)
        ))
    }
}
