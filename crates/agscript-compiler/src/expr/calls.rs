//! Function calls.
//!
//! Arguments are pushed last to first. The argument list is scanned once
//! for its comma positions, then each argument is compiled by jumping the
//! cursor to it. Imported functions receive their arguments on the real
//! stack (`PUSHREAL`), script functions on the script stack.
//!
//! Member functions get their object in MAR. MAR is saved on the stack
//! while the arguments are computed and reloaded right before `CALLOBJ`.

use agscript_parser::TokenKind;

use super::{AttributeAccess, ConversionContext, MemoryLocation, Operand};
use crate::bytecode::{Opcode, Register, STACK_CELL_SIZE};
use crate::compiler::{Compiler, Result};
use crate::script::FixupKind;
use crate::types::{FuncId, ParamDefault, VarType};

/// Where a call argument comes from.
#[derive(Debug, Clone)]
pub(crate) enum ArgSource {
    /// The expression between two token positions.
    Tokens(usize, usize),
    /// A value already in AX; only valid as the last argument.
    Ax(VarType),
}

impl<'a, 'ast> Compiler<'a, 'ast> {
    /// Scan `(a, b, ...)` at the cursor and return the argument ranges. The
    /// cursor ends after the `)`.
    fn scan_call_args(&mut self) -> Result<Vec<ArgSource>> {
        self.expect(TokenKind::LeftParen)?;
        let mut args = Vec::new();
        if self.eat(TokenKind::RightParen) {
            return Ok(args);
        }
        loop {
            let start = self.pos();
            let end = self.find_at_depth0(start, |k| k == TokenKind::Comma);
            if start == end {
                return Err(self.syntax_error(format!(
                    "Argument #{} of this call is empty",
                    args.len() + 1
                )));
            }
            args.push(ArgSource::Tokens(start, end));
            self.set_pos(end);
            if !self.eat(TokenKind::Comma) {
                self.expect(TokenKind::RightParen)?;
                return Ok(args);
            }
        }
    }

    /// Compile a call of `func` whose argument list is at the cursor.
    pub(crate) fn compile_call(&mut self, func: FuncId, object: Option<MemoryLocation>) -> Result<Operand> {
        let args = self.scan_call_args()?;
        self.emit_call(func, object, args)
    }

    pub(crate) fn emit_attribute_get(&mut self, access: AttributeAccess) -> Result<VarType> {
        let args = access
            .index
            .map(|(start, end)| vec![ArgSource::Tokens(start, end)])
            .unwrap_or_default();
        let result = self.emit_call(access.attr.getter, access.object, args)?;
        Ok(result.vartype)
    }

    /// Call the setter with the value in AX.
    pub(crate) fn emit_attribute_set(&mut self, access: AttributeAccess, value_type: VarType) -> Result<()> {
        let Some(setter) = access.attr.setter else {
            return Err(self.semantic_error(format!(
                "Cannot write to readonly '{}'",
                access.attr.name
            )));
        };
        let mut args: Vec<ArgSource> = access
            .index
            .map(|(start, end)| vec![ArgSource::Tokens(start, end)])
            .unwrap_or_default();
        args.push(ArgSource::Ax(value_type));
        self.emit_call(setter, access.object, args)?;
        Ok(())
    }

    /// Emit the complete call sequence. The value ends up in AX.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub(crate) fn emit_call(
        &mut self,
        func: FuncId,
        object: Option<MemoryLocation>,
        args: Vec<ArgSource>,
    ) -> Result<Operand> {
        let resume = self.pos();
        let def = self.symbols.function(func).clone();
        let given = args.len();
        let declared = def.params.len();
        if given > declared && !def.variadic {
            return Err(self.semantic_error(format!(
                "Expected just {declared} parameters but found {given}"
            )));
        }
        if let Some(missing) = (given..declared).find(|&k| def.params[k].default.is_none()) {
            return Err(self.semantic_error(format!(
                "Function call parameter #{} isn't provided and doesn't have any default value",
                missing + 1
            )));
        }
        let is_import = def.is_import && !def.has_body;
        let count = given.max(declared);

        let push_op = def.needs_object() && self.has_this();
        if push_op {
            self.push_reg(Register::Op);
        }
        let saved_mar = if def.needs_object() {
            let Some(mut location) = object else {
                return Err(self.internal_error(format!("Call of '{}' without an object", def.name)));
            };
            self.make_mar_current(&mut location);
            let rp = self.restore_point();
            self.push_reg(Register::Mar);
            Some(rp)
        } else {
            None
        };

        for k in (0..count).rev() {
            let vartype = match args.get(k) {
                Some(ArgSource::Tokens(start, end)) => {
                    self.set_pos(*start);
                    let operand = self.compile_expression()?;
                    if self.pos() != *end {
                        return Err(self.syntax_error(format!(
                            "Expected ',' or ')', found '{}' instead",
                            Self::describe(self.peek())
                        )));
                    }
                    self.load_to_ax(operand)?
                }
                Some(ArgSource::Ax(vartype)) => vartype.clone(),
                None => match &def.params[k].default {
                    Some(default) => self.load_default(default),
                    None => return Err(self.internal_error("Missing default value")),
                },
            };
            if let Some(param) = def.params.get(k) {
                self.convert_ax(&vartype, &param.vartype, ConversionContext::Expression)?;
            } else if vartype.is_void() {
                return Err(self.semantic_error("A 'void' value cannot be used as an argument"));
            }
            if is_import {
                self.emit_regs(Opcode::PushReal, &[Register::Ax]);
            } else {
                self.push_reg(Register::Ax);
            }
        }

        if let Some(rp) = saved_mar {
            if count == 0 {
                self.restore(rp);
                self.scope.adjust(-(STACK_CELL_SIZE as i32));
            } else {
                let pushed = if is_import { 0 } else { count as i32 };
                self.emit(Opcode::LoadSpOffs, &[(1 + pushed) * STACK_CELL_SIZE as i32]);
                self.emit_regs(Opcode::MemRead, &[Register::Mar]);
            }
            self.emit_regs(Opcode::CallObj, &[Register::Mar]);
        }

        if is_import {
            self.emit(Opcode::NumFuncArgs, &[count as i32]);
            let index = self.script.add_import(&def.import_symbol());
            self.lit_to_reg(Register::Ax, index as i32);
            self.script.fixup_previous(FixupKind::Import);
            self.emit_regs(Opcode::CallExt, &[Register::Ax]);
            if count > 0 {
                self.emit(Opcode::SubRealStack, &[count as i32]);
            }
        } else {
            self.lit_to_reg(Register::Ax, def.code_offset.unwrap_or(0) as i32);
            self.script.fixup_previous(FixupKind::Function);
            if def.code_offset.is_none() {
                let position = self.script.code_size() - 1;
                self.callpoints.add(position, func);
            }
            self.emit_regs(Opcode::Call, &[Register::Ax]);
            self.sub_sp(count as i32 * STACK_CELL_SIZE as i32);
        }

        if saved_mar.is_some() && count > 0 {
            self.pop_reg(Register::Mar);
        }
        if push_op {
            self.pop_reg(Register::Op);
        }
        self.ax_clobbered = true;
        self.set_pos(resume);
        Ok(Operand::in_ax(def.return_type))
    }

    /// Load a parameter's default value into AX.
    fn load_default(&mut self, default: &ParamDefault) -> VarType {
        match default {
            ParamDefault::Int(value) => {
                self.lit_to_reg(Register::Ax, *value);
                VarType::int()
            }
            ParamDefault::Float(value) => {
                self.lit_to_reg(Register::Ax, value.to_bits() as i32);
                VarType::float()
            }
            ParamDefault::Null => {
                self.lit_to_reg(Register::Ax, 0);
                VarType::null()
            }
            ParamDefault::Str(bytes) => {
                let offset = self.script.add_string(bytes);
                self.lit_to_reg(Register::Ax, offset as i32);
                self.script.fixup_previous(FixupKind::String);
                VarType::const_string()
            }
        }
    }
}
