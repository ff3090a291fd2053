//! Binary operators by precedence climbing.
//!
//! A lower priority number binds tighter. Without `LEFT_TO_RIGHT` the right
//! hand side of an operator is parsed at the operator's own priority, which
//! makes `a - b - c` mean `a - (b - c)`; with it, one priority tighter.

use agscript_core::CompileOptions;
use agscript_parser::TokenKind;

use super::{Operand, Value};
use crate::bytecode::{Opcode, Register};
use crate::compiler::{Compiler, Result};
use crate::const_fold::fold_binary;
use crate::operators::{BinaryOp, TERNARY_PRIORITY};
use crate::types::VarType;

impl<'a, 'ast> Compiler<'a, 'ast> {
    /// Compile operators binding at least as tight as `max_priority`.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub(crate) fn compile_binary(&mut self, max_priority: u32) -> Result<Operand> {
        let mut lhs = self.compile_unary()?;
        loop {
            let token = self.peek();
            if token.kind == TokenKind::Question {
                if TERNARY_PRIORITY > max_priority {
                    break;
                }
                lhs = self.compile_ternary(lhs)?;
                continue;
            }
            let Some(op) = BinaryOp::from_token(token.kind) else {
                break;
            };
            let priority = op.priority();
            if priority > max_priority {
                break;
            }
            self.advance();
            if self.at_expression_end() {
                return Err(self.syntax_error(format!(
                    "Binary operator '{}' doesn't have a right hand side",
                    op.symbol()
                )));
            }
            let rhs_priority = if self.options.contains(CompileOptions::LEFT_TO_RIGHT) {
                priority - 1
            } else {
                priority
            };
            lhs = self.compile_binary_rhs(op, lhs, rhs_priority)?;
        }

        let next = self.peek();
        if matches!(
            next.kind,
            TokenKind::Identifier
                | TokenKind::IntLiteral
                | TokenKind::FloatLiteral
                | TokenKind::StringLiteral
                | TokenKind::This
                | TokenKind::Null
                | TokenKind::New
        ) {
            return Err(self.syntax_error(format!(
                "Expected an operator, found '{}' instead",
                Self::describe(next)
            )));
        }
        Ok(lhs)
    }

    fn compile_binary_rhs(&mut self, op: BinaryOp, lhs: Operand, rhs_priority: u32) -> Result<Operand> {
        if let Value::Const(a) = lhs.value {
            let (rhs, end) = self.dry_run(|c| c.compile_binary(rhs_priority))?;
            if let Value::Const(b) = rhs.value {
                self.set_pos(end);
                let vartype = self.folded_type(op, &lhs.vartype, &rhs.vartype)?;
                let value = fold_binary(op, a, b).map_err(|msg| self.semantic_error(msg))?;
                return Ok(Operand::constant(value, vartype));
            }
        }

        let lhs_type = self.load_to_ax(lhs)?;
        let skip = match op {
            BinaryOp::And => Some(self.jump(Opcode::Jz)),
            BinaryOp::Or => Some(self.jump(Opcode::Jnz)),
            _ => None,
        };
        self.push_reg(Register::Ax);
        let rhs = self.compile_binary(rhs_priority)?;
        let rhs_type = self.load_to_ax(rhs)?;
        self.pop_reg(Register::Bx);

        let (opcode, result) = self.binary_opcode(op, &lhs_type, &rhs_type)?;
        self.emit_regs(opcode, &[Register::Bx, Register::Ax]);
        self.emit_regs(Opcode::RegToReg, &[Register::Bx, Register::Ax]);
        if let Some(skip) = skip {
            self.patch_here(skip);
        }
        Ok(Operand::in_ax(result))
    }

    /// Result type of folding two constants.
    fn folded_type(&self, op: BinaryOp, lhs: &VarType, rhs: &VarType) -> Result<VarType> {
        let both_int = lhs.is_integer() && rhs.is_integer();
        let both_float = lhs.is_float() && rhs.is_float();
        if !both_int && !both_float && !(lhs.is_null() && rhs.is_null()) {
            return Err(self.mismatch(rhs, lhs));
        }
        Ok(if op.is_comparison() || both_int {
            VarType::int()
        } else {
            VarType::float()
        })
    }

    fn mismatch(&self, from: &VarType, to: &VarType) -> agscript_core::CompileError {
        let types = &self.symbols.types;
        self.semantic_error(format!(
            "Type mismatch: cannot convert '{}' to '{}'",
            from.display(types),
            to.display(types)
        ))
    }

    /// Instruction and result type of `lhs op rhs`, both in registers.
    pub(crate) fn binary_opcode(&self, op: BinaryOp, lhs: &VarType, rhs: &VarType) -> Result<(Opcode, VarType)> {
        let types = &self.symbols.types;
        if lhs.is_void() || rhs.is_void() {
            return Err(self.semantic_error("A 'void' value cannot be used in an expression"));
        }

        if lhs.is_any_string(types) && rhs.is_any_string(types) {
            return match op.string_opcode() {
                Some(opcode) => Ok((opcode, VarType::int())),
                None => Err(self.semantic_error(format!(
                    "The operator '{}' cannot be applied to strings",
                    op.symbol()
                ))),
            };
        }

        if matches!(op, BinaryOp::And | BinaryOp::Or) {
            let truthy = |t: &VarType| t.is_integer() || t.is_dyn() || t.is_null() || t.is_float();
            if truthy(lhs) && truthy(rhs) {
                return Ok((op.int_opcode(), VarType::int()));
            }
            return Err(self.mismatch(rhs, lhs));
        }

        if lhs.is_integer() && rhs.is_integer() {
            return Ok((op.int_opcode(), VarType::int()));
        }

        if lhs.is_float() && rhs.is_float() {
            let Some(opcode) = op.float_opcode() else {
                return Err(self.semantic_error(format!(
                    "The operator '{}' cannot be applied to float values",
                    op.symbol()
                )));
            };
            let result = if op.is_comparison() { VarType::int() } else { VarType::float() };
            return Ok((opcode, result));
        }

        let handle_like = |t: &VarType| t.is_dyn() || t.is_null();
        if handle_like(lhs) && handle_like(rhs) {
            if !op.is_equality() {
                return Err(self.semantic_error(format!(
                    "The operator '{}' cannot be applied to pointers",
                    op.symbol()
                )));
            }
            if self.is_convertible(rhs, lhs) || self.is_convertible(lhs, rhs) {
                return Ok((op.int_opcode(), VarType::int()));
            }
        }

        Err(self.mismatch(rhs, lhs))
    }
}
