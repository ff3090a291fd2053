//! Expression compilation.
//!
//! Expressions are compiled into *operands*: a description of where a value
//! is rather than code that already fetched it. Constants stay constants
//! until an operator needs them in a register, so `2 * 3 + x` folds its
//! constant part; variables stay memory locations, so assignment and
//! `++` can write where a read would have read.
//!
//! ## Organization
//!
//! - `binary.rs` - precedence climbing and binary operators
//! - `unary.rs` - prefix operators
//! - `ternary.rs` - `a ? b : c` and `a ?: b`
//! - `literals.rs` - literals, parentheses and `new`
//! - `member.rs` - identifiers, `this`, `.member` and `[index]`
//! - `calls.rs` - function calls, attribute getters and setters
//! - `assignment.rs` - assignment statements and `++`/`--`

mod assignment;
mod binary;
mod calls;
mod literals;
mod member;
mod ternary;
mod unary;

pub(crate) use member::MemoryLocation;

use agscript_parser::TokenKind;

use crate::bytecode::{Opcode, Register};
use crate::compiler::{Compiler, Result};
use crate::const_fold::ConstValue;
use crate::operators::LOWEST_PRIORITY;
use crate::types::{Attribute, VarType};

/// An attribute read or write that has not happened yet.
#[derive(Debug, Clone)]
pub(crate) struct AttributeAccess {
    pub attr: Attribute,
    /// The object, for non-static attributes.
    pub object: Option<MemoryLocation>,
    /// Token range of the index expression of an indexed attribute.
    pub index: Option<(usize, usize)>,
}

#[derive(Debug, Clone)]
pub(crate) enum Value {
    Const(ConstValue),
    /// Already computed into AX.
    Ax,
    /// The object pointer of the running member function.
    ThisPointer,
    Memory(MemoryLocation),
    Attribute(Box<AttributeAccess>),
}

#[derive(Debug, Clone)]
pub(crate) struct Operand {
    pub value: Value,
    pub vartype: VarType,
    /// Set when the operand must not be assigned to; the message says why.
    pub write_error: Option<String>,
}

impl Operand {
    pub fn constant(value: ConstValue, vartype: VarType) -> Self {
        Self {
            value: Value::Const(value),
            vartype,
            write_error: None,
        }
    }

    pub fn in_ax(vartype: VarType) -> Self {
        Self {
            value: Value::Ax,
            vartype,
            write_error: None,
        }
    }

    pub fn memory(location: MemoryLocation, vartype: VarType) -> Self {
        Self {
            value: Value::Memory(location),
            vartype,
            write_error: None,
        }
    }

    pub fn as_const(&self) -> Option<ConstValue> {
        match self.value {
            Value::Const(value) => Some(value),
            _ => None,
        }
    }
}

/// How a conversion failure is reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ConversionContext {
    Expression,
    Assignment,
}

impl<'a, 'ast> Compiler<'a, 'ast> {
    /// Compile a complete expression.
    pub(crate) fn compile_expression(&mut self) -> Result<Operand> {
        self.compile_binary(LOWEST_PRIORITY)
    }

    /// Compile a complete expression into AX and return its type.
    pub(crate) fn compile_expression_to_ax(&mut self) -> Result<VarType> {
        let operand = self.compile_expression()?;
        self.load_to_ax(operand)
    }

    /// Evaluate the expression at the cursor if it is a compile-time
    /// constant. Otherwise the cursor does not move and no code is emitted.
    pub(crate) fn const_expression(&mut self) -> Result<Option<(ConstValue, VarType)>> {
        let (operand, end) = self.dry_run(|c| c.compile_expression())?;
        match operand.value {
            Value::Const(value) => {
                self.set_pos(end);
                Ok(Some((value, operand.vartype)))
            }
            _ => Ok(None),
        }
    }

    /// Whether the cursor is at a token that ends an expression.
    pub(crate) fn at_expression_end(&self) -> bool {
        let kind = self.peek_kind();
        kind.is_assignment()
            || matches!(
                kind,
                TokenKind::Semicolon
                    | TokenKind::Comma
                    | TokenKind::Colon
                    | TokenKind::RightParen
                    | TokenKind::RightBracket
                    | TokenKind::RightBrace
                    | TokenKind::Eof
            )
    }

    /// Emit the code that puts the operand's value into AX.
    pub(crate) fn load_to_ax(&mut self, operand: Operand) -> Result<VarType> {
        let mut vartype = operand.vartype;
        match operand.value {
            Value::Const(value) => self.lit_to_reg(Register::Ax, value.to_word()),
            Value::Ax => {}
            Value::ThisPointer => self.emit_regs(Opcode::RegToReg, &[Register::Op, Register::Ax]),
            Value::Memory(mut location) => {
                if vartype.is_static_array() {
                    return Err(self.semantic_error(
                        "Cannot access array as a whole (did you forget to add \"[0]\"?)",
                    ));
                }
                if vartype.is_struct_instance() {
                    let managed = vartype
                        .struct_id()
                        .and_then(|id| self.symbols.types.struct_def(id))
                        .is_some_and(|s| s.managed);
                    if !managed {
                        return Err(self.semantic_error("Cannot access non-managed struct as a whole"));
                    }
                    self.make_mar_current(&mut location);
                    self.emit_regs(Opcode::RegToReg, &[Register::Mar, Register::Ax]);
                    vartype.pointer = true;
                } else if vartype.is_old_string() {
                    self.make_mar_current(&mut location);
                    self.emit_regs(Opcode::RegToReg, &[Register::Mar, Register::Ax]);
                } else {
                    self.make_mar_current(&mut location);
                    let op = self.read_opcode(&vartype);
                    self.emit_regs(op, &[Register::Ax]);
                }
            }
            Value::Attribute(access) => {
                self.emit_attribute_get(*access)?;
            }
        }
        self.ax_clobbered = true;
        Ok(vartype)
    }

    /// Instruction that reads a value of `vartype` from MAR.
    pub(crate) fn read_opcode(&self, vartype: &VarType) -> Opcode {
        if vartype.is_dyn() {
            return Opcode::MemReadPtr;
        }
        match vartype.size(&self.symbols.types) {
            1 => Opcode::MemReadB,
            2 => Opcode::MemReadW,
            _ => Opcode::MemRead,
        }
    }

    /// Instruction that writes a value of `vartype` to MAR.
    pub(crate) fn write_opcode(&self, vartype: &VarType) -> Opcode {
        if vartype.is_dyn() {
            return Opcode::MemWritePtr;
        }
        match vartype.size(&self.symbols.types) {
            1 => Opcode::MemWriteB,
            2 => Opcode::MemWriteW,
            _ => Opcode::MemWrite,
        }
    }

    /// Whether a value of type `from` may be used where `to` is expected.
    pub(crate) fn is_convertible(&self, from: &VarType, to: &VarType) -> bool {
        let types = &self.symbols.types;
        if from.is_void() || to.is_void() {
            return false;
        }
        if from.is_const && !to.is_const && to.is_old_string() {
            return false;
        }
        if from.without_const() == to.without_const() {
            return true;
        }
        if from.is_null() {
            return to.is_dyn();
        }
        if from.is_old_string() && to.is_any_string(types) {
            return true;
        }
        if from.is_string_struct(types) && to.is_old_string() {
            return to.is_const;
        }
        if from.is_integer() && to.is_integer() {
            return true;
        }
        if from.is_pointer() && to.is_pointer() {
            return match (from.struct_id(), to.struct_id()) {
                (Some(derived), Some(base)) => types.is_same_or_derived(derived, base),
                _ => false,
            };
        }
        if from.is_dynarray() && to.is_dynarray() {
            return from.base == to.base && from.pointer == to.pointer;
        }
        false
    }

    /// Check that the value in AX, of type `from`, can be used as `to`, and
    /// emit the conversion if one is needed.
    pub(crate) fn convert_ax(&mut self, from: &VarType, to: &VarType, context: ConversionContext) -> Result<()> {
        if from.is_void() {
            return Err(self.semantic_error("A 'void' value cannot be used here"));
        }
        // Assigning to a string buffer copies, so the source may be const.
        let copy_target;
        let to = if context == ConversionContext::Assignment && to.is_old_string() {
            copy_target = VarType {
                is_const: true,
                ..to.clone()
            };
            &copy_target
        } else {
            to
        };
        if !self.is_convertible(from, to) {
            let types = &self.symbols.types;
            let (from, to) = (from.display(types), to.display(types));
            return Err(self.semantic_error(match context {
                ConversionContext::Expression => format!("Type mismatch: cannot convert '{from}' to '{to}'"),
                ConversionContext::Assignment => {
                    format!("Cannot assign a type '{from}' value to a type '{to}' variable")
                }
            }));
        }
        if from.is_old_string() && to.is_string_struct(&self.symbols.types) {
            self.emit_regs(Opcode::CreateString, &[Register::Ax]);
        }
        Ok(())
    }

    /// Conditions of `if`, loops and `?:` must be integers or pointers.
    pub(crate) fn check_condition(&self, vartype: &VarType) -> Result<()> {
        if vartype.is_integer() || vartype.is_dyn() {
            return Ok(());
        }
        Err(self.semantic_error(format!(
            "Expected an integer or pointer condition, found a value of type '{}' instead",
            vartype.display(&self.symbols.types)
        )))
    }
}
