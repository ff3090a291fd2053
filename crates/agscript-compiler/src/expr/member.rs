//! Identifiers and the access chains built on them.
//!
//! `a.b[i].c` is compiled left to right. Memory locations stay symbolic as
//! long as possible: a global's address is only loaded into MAR when the
//! value is finally read or written, so component offsets and constant
//! indices simply add up. Following a pointer or a dynamic array needs the
//! address in MAR and ends that.

use agscript_parser::TokenKind;

use super::{AttributeAccess, Operand, Value};
use crate::bytecode::{Opcode, Register};
use crate::compiler::{Compiler, Result};
use crate::const_fold::ConstValue;
use crate::script::FixupKind;
use crate::symbols::{GlobalId, GlobalSymbol};
use crate::types::{Access, ArrayShape, BaseType, Component, TypeId, VarType};

/// Where a storage location's address comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LocationBase {
    /// Offset into the global data.
    Global(u32),
    /// Offset in the local variable block (negative for parameters).
    Local(i32),
    /// An imported variable.
    Import(GlobalId),
    /// The object of the running member function.
    This,
    /// The address is in MAR.
    Mar,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct MemoryLocation {
    pub base: LocationBase,
    /// Bytes to add to the base address.
    pub component: u32,
}

impl MemoryLocation {
    pub fn new(base: LocationBase) -> Self {
        Self { base, component: 0 }
    }

    pub fn is_mar(&self) -> bool {
        self.base == LocationBase::Mar
    }
}

impl<'a, 'ast> Compiler<'a, 'ast> {
    /// Emit the code that loads the location's address into MAR.
    pub(crate) fn make_mar_current(&mut self, location: &mut MemoryLocation) {
        let component = location.component as i32;
        match location.base {
            LocationBase::Global(start) => {
                self.lit_to_reg(Register::Mar, start as i32 + component);
                self.script.fixup_previous(FixupKind::GlobalData);
            }
            LocationBase::Local(offset) => self.load_sp_offs(offset + component),
            LocationBase::Import(id) => {
                let name = self.symbols.global(id).name.clone();
                let index = self.script.add_import(&name);
                self.lit_to_reg(Register::Mar, index as i32);
                self.script.fixup_previous(FixupKind::Import);
                self.add_to_mar(component);
            }
            LocationBase::This => {
                self.emit_regs(Opcode::RegToReg, &[Register::Op, Register::Mar]);
                self.emit(Opcode::CheckNull, &[]);
                self.add_to_mar(component);
            }
            LocationBase::Mar => self.add_to_mar(component),
        }
        *location = MemoryLocation::new(LocationBase::Mar);
    }

    fn add_to_mar(&mut self, bytes: i32) {
        if bytes != 0 {
            self.emit(Opcode::Add, &[Register::Mar.into(), bytes]);
        }
    }

    /// Compile an identifier or `this` and everything chained onto it.
    pub(crate) fn compile_access(&mut self) -> Result<Operand> {
        let operand = if self.check(TokenKind::This) {
            self.advance();
            if !self.has_this() {
                return Err(self.semantic_error("'this' is only legal in non-static struct functions"));
            }
            let Some(struct_id) = self.current_struct() else {
                return Err(self.internal_error("Member function without a struct"));
            };
            Operand {
                value: Value::ThisPointer,
                vartype: VarType::pointer_to(struct_id),
                write_error: Some("Cannot assign to 'this'".to_string()),
            }
        } else {
            self.compile_identifier()?
        };
        self.compile_postfix(operand)
    }

    /// Apply `.member` and `[index]` suffixes.
    pub(crate) fn compile_postfix(&mut self, mut operand: Operand) -> Result<Operand> {
        let mut index_number = 0u32;
        loop {
            match self.peek_kind() {
                TokenKind::Dot => {
                    self.advance();
                    operand = self.compile_member(operand)?;
                    index_number = 0;
                }
                TokenKind::LeftBracket => {
                    index_number += 1;
                    operand = self.compile_index(operand, index_number)?;
                }
                _ => return Ok(operand),
            }
        }
    }

    fn compile_identifier(&mut self) -> Result<Operand> {
        let name = self.expect_identifier()?;
        let is_call = self.check(TokenKind::LeftParen);

        if !is_call && let Some(var) = self.scope.get(name).cloned() {
            let mut location = MemoryLocation::new(LocationBase::Local(var.offset));
            if var.is_param && var.vartype.is_old_string() {
                // The parameter slot holds the address of the string.
                self.make_mar_current(&mut location);
                self.emit_regs(Opcode::MemRead, &[Register::Mar]);
            }
            let mut operand = Operand::memory(location, var.vartype);
            if var.readonly {
                operand.write_error = Some(format!("Cannot write to readonly '{name}'"));
            }
            return Ok(operand);
        }

        if let Some(struct_id) = self.current_struct()
            && let Some((owner, component)) = self.symbols.types.find_component(struct_id, name)
        {
            let component = component.clone();
            let object = self
                .has_this()
                .then(|| MemoryLocation::new(LocationBase::This));
            return self.compile_component(owner, component, object, name);
        }

        match self.symbols.find(name) {
            Some(GlobalSymbol::Variable(id)) => {
                let var = self.symbols.global(id);
                if let Some(value) = var.const_value.filter(|_| var.readonly) {
                    return Ok(Operand::constant(value, var.vartype.clone()));
                }
                let base = if var.is_import {
                    LocationBase::Import(id)
                } else {
                    LocationBase::Global(var.offset)
                };
                let mut operand = Operand::memory(MemoryLocation::new(base), var.vartype.clone());
                if var.readonly {
                    operand.write_error = Some(format!("Cannot write to readonly '{name}'"));
                }
                Ok(operand)
            }
            Some(GlobalSymbol::Constant { value, enum_type }) => Ok(Operand::constant(
                ConstValue::Int(value),
                VarType::new(BaseType::Enum(enum_type)),
            )),
            Some(GlobalSymbol::Function(id)) => {
                if !is_call {
                    return Err(self.syntax_error(format!(
                        "Expected '(' after the function name '{name}'"
                    )));
                }
                self.compile_call(id, None)
            }
            Some(GlobalSymbol::Type(id)) => self.compile_static_access(id),
            None => Err(self.semantic_error(format!("Identifier '{name}' is undeclared"))),
        }
    }

    /// `Struct.member` for static functions and attributes.
    fn compile_static_access(&mut self, struct_id: TypeId) -> Result<Operand> {
        let type_name = self.symbols.types.name(struct_id).to_string();
        if !self.eat(TokenKind::Dot) {
            return Err(self.syntax_error(format!(
                "Expected '.' after the type name '{type_name}'"
            )));
        }
        let member = self.expect_identifier()?;
        let Some((owner, component)) = self.symbols.types.find_component(struct_id, member) else {
            return Err(self.semantic_error(format!(
                "'{member}' is not a component of the struct '{type_name}'"
            )));
        };
        let component = component.clone();
        self.compile_component(owner, component, None, member)
    }

    /// Whether code in the current function may see protected components
    /// of `owner`.
    fn inside_struct(&self, owner: TypeId) -> bool {
        self.current_struct()
            .is_some_and(|current| self.symbols.types.is_same_or_derived(current, owner))
    }

    fn compile_component(
        &mut self,
        owner: TypeId,
        component: Component,
        object: Option<MemoryLocation>,
        name: &str,
    ) -> Result<Operand> {
        match component {
            Component::Field(field) => {
                let Some(mut location) = object else {
                    return Err(self.semantic_error(format!(
                        "'{name}' is not static, so it can only be accessed through an object"
                    )));
                };
                let inside = self.inside_struct(owner);
                let write_error = match field.access {
                    Access::Public => None,
                    Access::Protected if !inside => {
                        return Err(self.semantic_error(format!(
                            "Protected component '{name}' must not be accessed from outside"
                        )));
                    }
                    Access::Protected => None,
                    Access::WriteProtected if !inside => Some(format!(
                        "Writeprotected component '{name}' must not be modified from outside"
                    )),
                    Access::WriteProtected => None,
                    Access::ReadOnly => Some(format!("Cannot write to readonly '{name}'")),
                };
                location.component += field.offset;
                let mut operand = Operand::memory(location, field.vartype);
                operand.write_error = write_error;
                Ok(operand)
            }
            Component::Attribute(attr) => {
                if !attr.is_static && object.is_none() {
                    return Err(self.semantic_error(format!(
                        "'{name}' is not static, so it can only be accessed through an object"
                    )));
                }
                let index = if attr.indexed {
                    self.expect(TokenKind::LeftBracket)?;
                    let start = self.pos();
                    let end = self.find_at_depth0(start, |k| k == TokenKind::RightBracket);
                    self.set_pos(end);
                    self.expect(TokenKind::RightBracket)?;
                    Some((start, end))
                } else {
                    None
                };
                let write_error = attr
                    .setter
                    .is_none()
                    .then(|| format!("Cannot write to readonly '{name}'"));
                let vartype = attr.vartype.clone();
                let object = if attr.is_static { None } else { object };
                Ok(Operand {
                    value: Value::Attribute(Box::new(AttributeAccess { attr, object, index })),
                    vartype,
                    write_error,
                })
            }
            Component::Function(id) => {
                if !self.check(TokenKind::LeftParen) {
                    return Err(self.syntax_error(format!(
                        "Expected '(' after the function name '{name}'"
                    )));
                }
                let def = self.symbols.function(id);
                if def.is_protected && !self.inside_struct(owner) {
                    return Err(self.semantic_error(format!(
                        "Protected component '{name}' must not be accessed from outside"
                    )));
                }
                let needs_object = def.needs_object();
                if needs_object && object.is_none() {
                    return Err(self.semantic_error(format!(
                        "'{name}' is not static, so it can only be called through an object"
                    )));
                }
                self.compile_call(id, if needs_object { object } else { None })
            }
        }
    }

    /// Get the object a `.` applies to, following a pointer if needed.
    fn compile_member(&mut self, object: Operand) -> Result<Operand> {
        let member = self.expect_identifier()?;
        let vartype = object.vartype.clone();
        let object_write_error = object.write_error.clone();
        let Some(struct_id) = vartype.struct_id().filter(|_| vartype.is_scalar()) else {
            return Err(self.semantic_error(format!(
                "Expected a struct before '.{member}', found a value of type '{}' instead",
                vartype.display(&self.symbols.types)
            )));
        };

        let location = if vartype.pointer {
            self.deref_to_mar(object)?
        } else {
            match object.value {
                Value::Memory(location) => location,
                _ => {
                    return Err(self.semantic_error(format!(
                        "Cannot access '{member}' of a struct value that isn't stored anywhere"
                    )));
                }
            }
        };

        let Some((owner, component)) = self.symbols.types.find_component(struct_id, member) else {
            return Err(self.semantic_error(format!(
                "'{member}' is not a component of the struct '{}'",
                self.symbols.types.name(struct_id)
            )));
        };
        let component = component.clone();
        let mut operand = self.compile_component(owner, component, Some(location), member)?;
        if operand.write_error.is_none() && !vartype.pointer {
            operand.write_error = object_write_error;
        }
        Ok(operand)
    }

    /// Put the address a pointer or dynamic array handle refers to into
    /// MAR, failing at runtime on null.
    fn deref_to_mar(&mut self, operand: Operand) -> Result<MemoryLocation> {
        match operand.value {
            Value::Memory(mut location) => {
                self.make_mar_current(&mut location);
                self.emit_regs(Opcode::MemReadPtr, &[Register::Mar]);
            }
            Value::ThisPointer => return Ok(MemoryLocation::new(LocationBase::This)),
            Value::Ax => self.emit_regs(Opcode::RegToReg, &[Register::Ax, Register::Mar]),
            Value::Attribute(_) => {
                self.load_to_ax(operand)?;
                self.emit_regs(Opcode::RegToReg, &[Register::Ax, Register::Mar]);
            }
            Value::Const(_) => return Err(self.semantic_error("Cannot dereference 'null'")),
        }
        self.emit(Opcode::CheckNull, &[]);
        Ok(MemoryLocation::new(LocationBase::Mar))
    }

    /// `operand[index]`; `number` counts consecutive indices from 1.
    fn compile_index(&mut self, operand: Operand, number: u32) -> Result<Operand> {
        let vartype = operand.vartype.clone();
        match &vartype.array {
            ArrayShape::Static(dims) => {
                let Value::Memory(mut location) = operand.value else {
                    return Err(self.internal_error("Static array that isn't stored anywhere"));
                };
                let dim = dims[0];
                let element = vartype.after_index();
                let factor = element.size(&self.symbols.types) as i32;
                self.advance();

                let saved_mar = location.is_mar().then(|| {
                    let rp = self.restore_point();
                    self.push_reg(Register::Mar);
                    rp
                });
                let index = self.compile_expression()?;
                self.expect(TokenKind::RightBracket)?;

                if let Some(ConstValue::Int(i)) = index.as_const() {
                    if i < 0 {
                        return Err(self.semantic_error(format!(
                            "Array index #{number} is {i}, thus too low (minimum is 0)"
                        )));
                    }
                    if i as u32 >= dim {
                        return Err(self.semantic_error(format!(
                            "Array index #{number} is {i}, thus too high (maximum is {})",
                            dim - 1
                        )));
                    }
                    if let Some(rp) = saved_mar {
                        self.restore(rp);
                        self.scope.adjust(-(crate::bytecode::STACK_CELL_SIZE as i32));
                    }
                    location.component += i as u32 * factor as u32;
                } else {
                    let index_type = self.load_to_ax(index)?;
                    self.check_index_type(&index_type)?;
                    if saved_mar.is_some() {
                        self.pop_reg(Register::Mar);
                    }
                    self.emit(Opcode::CheckBounds, &[Register::Ax.into(), dim as i32]);
                    if factor != 1 {
                        self.emit(Opcode::Mul, &[Register::Ax.into(), factor]);
                    }
                    self.make_mar_current(&mut location);
                    self.emit_regs(Opcode::AddReg, &[Register::Mar, Register::Ax]);
                }
                Ok(Operand {
                    value: Value::Memory(location),
                    vartype: element,
                    write_error: operand.write_error,
                })
            }
            ArrayShape::Dynamic => {
                let element = vartype.element();
                let factor = element.size(&self.symbols.types) as i32;
                self.deref_to_mar(operand)?;
                self.advance();

                let rp = self.restore_point();
                self.push_reg(Register::Mar);
                let index = self.compile_expression()?;
                self.expect(TokenKind::RightBracket)?;

                if let Some(ConstValue::Int(i)) = index.as_const() {
                    if i < 0 {
                        return Err(self.semantic_error(format!(
                            "Array index #{number} is {i}, thus too low (minimum is 0)"
                        )));
                    }
                    self.restore(rp);
                    self.scope.adjust(-(crate::bytecode::STACK_CELL_SIZE as i32));
                    self.lit_to_reg(Register::Ax, i.saturating_mul(factor));
                } else {
                    let index_type = self.load_to_ax(index)?;
                    self.check_index_type(&index_type)?;
                    self.pop_reg(Register::Mar);
                    if factor != 1 {
                        self.emit(Opcode::Mul, &[Register::Ax.into(), factor]);
                    }
                }
                self.emit_regs(Opcode::DynamicBounds, &[Register::Ax]);
                self.emit_regs(Opcode::AddReg, &[Register::Mar, Register::Ax]);
                Ok(Operand::memory(MemoryLocation::new(LocationBase::Mar), element))
            }
            ArrayShape::Scalar => Err(self.semantic_error(format!(
                "Cannot apply '[' to a value of type '{}'",
                vartype.display(&self.symbols.types)
            ))),
        }
    }

    fn check_index_type(&self, vartype: &VarType) -> Result<()> {
        if vartype.is_integer() {
            return Ok(());
        }
        Err(self.semantic_error(format!(
            "Array index must be an integer, found a value of type '{}' instead",
            vartype.display(&self.symbols.types)
        )))
    }
}
