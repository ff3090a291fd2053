//! Assignments, compound assignments, `++`/`--` and expression statements.
//!
//! The right hand side is compiled first, into AX. The left hand side is
//! then compiled as a location to write AX to. When computing that location
//! would itself overwrite AX (an index expression, a call returning an
//! object), AX is saved around it; a dry run of the left hand side tells.

use agscript_parser::TokenKind;

use super::{ConversionContext, Operand, Value};
use crate::bytecode::{OLD_STRING_SIZE, Opcode, Register};
use crate::compiler::{Compiler, Result};
use crate::emit::BackwardJumpDest;
use crate::operators::BinaryOp;
use crate::types::VarType;

impl<'a, 'ast> Compiler<'a, 'ast> {
    /// Compile an assignment or expression statement ending at
    /// `terminator`, and consume the terminator.
    pub(crate) fn compile_simple_statement(&mut self, terminator: TokenKind) -> Result<()> {
        let start = self.pos();
        let end = self.find_at_depth0(start, |k| k == terminator);
        let assignment = self.find_at_depth0(start, |k| k.is_assignment() || k == terminator);

        if assignment < end {
            let op_kind = self.token_at(assignment).kind;
            self.set_pos(assignment + 1);
            if self.at_expression_end() {
                return Err(self.syntax_error(format!(
                    "Expected an expression after '{}'",
                    op_kind.text()
                )));
            }
            match BinaryOp::from_compound_assignment(op_kind) {
                None => self.compile_assignment(start, assignment)?,
                Some(op) => self.compile_compound_assignment(start, assignment, op)?,
            }
        } else if matches!(self.peek_kind(), TokenKind::PlusPlus | TokenKind::MinusMinus) {
            let increment = self.advance().kind == TokenKind::PlusPlus;
            self.compile_increment(start + 1, end, increment)?;
            self.set_pos(end);
        } else if end > start
            && matches!(
                self.token_at(end - 1).kind,
                TokenKind::PlusPlus | TokenKind::MinusMinus
            )
        {
            let increment = self.token_at(end - 1).kind == TokenKind::PlusPlus;
            self.compile_increment(start, end - 1, increment)?;
            self.set_pos(end);
        } else {
            let operand = self.compile_expression()?;
            if matches!(operand.value, Value::Attribute(_)) {
                self.load_to_ax(operand)?;
            }
        }
        self.expect(terminator)?;
        Ok(())
    }

    /// `lhs = rhs`; the cursor is at the start of `rhs`.
    fn compile_assignment(&mut self, lhs_start: usize, lhs_end: usize) -> Result<()> {
        let rhs = self.compile_expression()?;
        let rhs_end = self.pos();
        let rhs_type = self.load_to_ax(rhs)?;
        self.store_ax(lhs_start, lhs_end, &rhs_type)?;
        self.set_pos(rhs_end);
        Ok(())
    }

    /// `lhs op= rhs`.
    fn compile_compound_assignment(&mut self, lhs_start: usize, lhs_end: usize, op: BinaryOp) -> Result<()> {
        let rhs = self.compile_expression()?;
        let rhs_end = self.pos();
        let rhs_type = self.load_to_ax(rhs)?;
        self.push_reg(Register::Ax);

        self.set_pos(lhs_start);
        let lhs = self.compile_lvalue(lhs_end)?;
        let lhs_type = lhs.vartype.clone();
        if !(lhs_type.is_integer() || lhs_type.is_float()) {
            return Err(self.semantic_error(format!(
                "The operator '{}=' cannot be applied to a value of type '{}'",
                op.symbol(),
                lhs_type.display(&self.symbols.types)
            )));
        }
        let (opcode, _) = self.binary_opcode(op, &lhs_type, &rhs_type)?;

        match lhs.value {
            Value::Memory(mut location) => {
                self.make_mar_current(&mut location);
                let read = self.read_opcode(&lhs_type);
                self.emit_regs(read, &[Register::Ax]);
                self.pop_reg(Register::Bx);
                self.emit_regs(opcode, &[Register::Ax, Register::Bx]);
                let write = self.write_opcode(&lhs_type);
                self.emit_regs(write, &[Register::Ax]);
            }
            Value::Attribute(access) => {
                self.emit_attribute_get(*access)?;
                self.pop_reg(Register::Bx);
                self.emit_regs(opcode, &[Register::Ax, Register::Bx]);
                self.store_ax(lhs_start, lhs_end, &lhs_type)?;
            }
            _ => return Err(self.internal_error("Unexpected assignment target")),
        }
        self.set_pos(rhs_end);
        Ok(())
    }

    /// `lhs++` or `lhs--` where `lhs` spans `start..end`.
    fn compile_increment(&mut self, start: usize, end: usize, increment: bool) -> Result<()> {
        let symbol = if increment { "++" } else { "--" };
        let op = if increment { Opcode::Add } else { Opcode::Sub };
        self.set_pos(start);
        let lhs = self.compile_lvalue(end)?;
        let vartype = lhs.vartype.clone();
        if !vartype.is_integer() {
            return Err(self.semantic_error(format!(
                "The operator '{symbol}' cannot be applied to a value of type '{}'",
                vartype.display(&self.symbols.types)
            )));
        }
        match lhs.value {
            Value::Memory(mut location) => {
                self.make_mar_current(&mut location);
                let read = self.read_opcode(&vartype);
                self.emit_regs(read, &[Register::Ax]);
                self.emit(op, &[Register::Ax.into(), 1]);
                let write = self.write_opcode(&vartype);
                self.emit_regs(write, &[Register::Ax]);
            }
            Value::Attribute(access) => {
                self.emit_attribute_get(*access)?;
                self.emit(op, &[Register::Ax.into(), 1]);
                self.store_ax(start, end, &vartype)?;
            }
            _ => return Err(self.internal_error("Unexpected increment target")),
        }
        Ok(())
    }

    /// Compile the tokens `lhs_start..lhs_end` as an assignable location and
    /// write AX, of type `value_type`, to it.
    pub(crate) fn store_ax(&mut self, lhs_start: usize, lhs_end: usize, value_type: &VarType) -> Result<()> {
        self.set_pos(lhs_start);
        let ((lhs_type, clobbers), _) = self.dry_run(|c| {
            c.ax_clobbered = false;
            let lhs = c.compile_lvalue(lhs_end)?;
            Ok((lhs.vartype, c.ax_clobbered))
        })?;
        self.convert_ax(value_type, &lhs_type, ConversionContext::Assignment)?;

        if clobbers {
            self.push_reg(Register::Ax);
        }
        self.set_pos(lhs_start);
        let lhs = self.compile_lvalue(lhs_end)?;
        if clobbers {
            self.pop_reg(Register::Ax);
        }
        self.write_ax_to(lhs)
    }

    /// Compile an assignable expression that must end at `end`.
    fn compile_lvalue(&mut self, end: usize) -> Result<Operand> {
        let operand = match self.peek_kind() {
            TokenKind::Identifier | TokenKind::This => self.compile_access()?,
            _ => {
                return Err(self.semantic_error(format!(
                    "Cannot assign to '{}'",
                    Self::describe(self.peek())
                )));
            }
        };
        if self.pos() != end {
            return Err(self.syntax_error(format!(
                "Expected an assignment operator, found '{}' instead",
                Self::describe(self.peek())
            )));
        }
        if !matches!(operand.value, Value::Memory(_) | Value::Attribute(_)) {
            return Err(self.semantic_error("Cannot assign to this expression"));
        }
        if let Some(message) = &operand.write_error {
            return Err(self.semantic_error(message.clone()));
        }
        if operand.vartype.is_static_array() {
            return Err(self.semantic_error(
                "Cannot access array as a whole (did you forget to add \"[0]\"?)",
            ));
        }
        if operand.vartype.is_struct_instance() {
            return Err(self.semantic_error("Cannot access non-managed struct as a whole"));
        }
        Ok(operand)
    }

    /// Write AX to the location of `lhs`.
    fn write_ax_to(&mut self, lhs: Operand) -> Result<()> {
        let vartype = lhs.vartype;
        match lhs.value {
            Value::Memory(mut location) => {
                self.make_mar_current(&mut location);
                if vartype.is_old_string() {
                    self.emit_string_copy();
                } else {
                    let write = self.write_opcode(&vartype);
                    self.emit_regs(write, &[Register::Ax]);
                }
                Ok(())
            }
            Value::Attribute(access) => self.emit_attribute_set(*access, vartype),
            _ => Err(self.internal_error("Unexpected assignment target")),
        }
    }

    /// Copy the NUL-terminated string at AX into the buffer at MAR,
    /// truncating to the size of a `string` buffer.
    pub(crate) fn emit_string_copy(&mut self) {
        use Register::{Ax, Bx, Cx, Dx, Mar};

        self.emit_regs(Opcode::RegToReg, &[Ax, Bx]);
        self.emit_regs(Opcode::RegToReg, &[Mar, Cx]);
        self.lit_to_reg(Dx, OLD_STRING_SIZE as i32 - 1);
        let copy = BackwardJumpDest::here(&self.script);
        self.emit_regs(Opcode::RegToReg, &[Bx, Mar]);
        self.emit_regs(Opcode::MemReadB, &[Ax]);
        self.emit_regs(Opcode::RegToReg, &[Cx, Mar]);
        self.emit_regs(Opcode::MemWriteB, &[Ax]);
        let done = self.jump(Opcode::Jz);
        self.emit(Opcode::Add, &[Bx.into(), 1]);
        self.emit(Opcode::Add, &[Cx.into(), 1]);
        self.emit(Opcode::Sub, &[Dx.into(), 1]);
        self.emit_regs(Opcode::RegToReg, &[Dx, Ax]);
        copy.write_jump(&mut self.script, Opcode::Jnz);
        // Buffer full: terminate it.
        self.emit_regs(Opcode::RegToReg, &[Cx, Mar]);
        self.emit_regs(Opcode::MemWriteB, &[Ax]);
        self.patch_here(done);
        self.ax_clobbered = true;
    }
}
