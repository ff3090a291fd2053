//! Primary expressions: literals, `null`, parentheses and `new`.

use agscript_parser::{TokenKind, TokenValue};

use super::Operand;
use crate::bytecode::{Opcode, Register};
use crate::compiler::{Compiler, Result};
use crate::const_fold::ConstValue;
use crate::script::FixupKind;
use crate::types::{ArrayShape, VarType};

impl<'a, 'ast> Compiler<'a, 'ast> {
    pub(crate) fn compile_primary(&mut self) -> Result<Operand> {
        let token = self.peek();
        match token.kind {
            TokenKind::IntLiteral => {
                self.advance();
                let TokenValue::Int(value) = token.value else {
                    return Err(self.internal_error("Integer literal without a value"));
                };
                let value = i32::try_from(value).map_err(|_| {
                    self.error(
                        agscript_core::CompileErrorKind::Lexical,
                        format!("Numeric literal '{}' is out of range", token.lexeme),
                    )
                })?;
                Ok(Operand::constant(ConstValue::Int(value), VarType::int()))
            }
            TokenKind::FloatLiteral => {
                self.advance();
                let TokenValue::Float(value) = token.value else {
                    return Err(self.internal_error("Float literal without a value"));
                };
                Ok(Operand::constant(ConstValue::Float(value.into_inner()), VarType::float()))
            }
            TokenKind::StringLiteral => {
                self.advance();
                let TokenValue::Str(bytes) = token.value else {
                    return Err(self.internal_error("String literal without a value"));
                };
                let offset = self.script.add_string(bytes);
                self.lit_to_reg(Register::Ax, offset as i32);
                self.script.fixup_previous(FixupKind::String);
                Ok(Operand::in_ax(VarType::const_string()))
            }
            TokenKind::Null => {
                self.advance();
                Ok(Operand::constant(ConstValue::Int(0), VarType::null()))
            }
            TokenKind::LeftParen => {
                self.advance();
                let operand = self.compile_expression()?;
                self.expect(TokenKind::RightParen)?;
                self.compile_postfix(operand)
            }
            TokenKind::New => self.compile_new(),
            TokenKind::Identifier | TokenKind::This => self.compile_access(),
            _ => Err(self.syntax_error(format!(
                "Expected an expression, found '{}' instead",
                Self::describe(token)
            ))),
        }
    }

    /// `new Type` or `new Type[count]`.
    fn compile_new(&mut self) -> Result<Operand> {
        self.advance();
        let mut element = self.parse_type(false)?;
        let info = element
            .struct_id()
            .and_then(|id| self.symbols.types.struct_def(id))
            .map(|s| (s.managed, s.builtin, s.size, s.name.clone()));
        let managed = info.as_ref().is_some_and(|(managed, ..)| *managed);

        if self.eat(TokenKind::LeftBracket) {
            let allowed = element.is_scalar()
                && (element.is_integer() || element.is_float() || managed);
            if !allowed {
                return Err(self.semantic_error(
                    "Can only use integer types or 'float' or managed types with 'new'",
                ));
            }
            if managed {
                element.pointer = true;
            }
            let count = self.compile_expression_to_ax()?;
            if !count.is_integer() {
                return Err(self.semantic_error(format!(
                    "The size of a dynamic array must be an integer, found '{}' instead",
                    count.display(&self.symbols.types)
                )));
            }
            self.expect(TokenKind::RightBracket)?;
            let size = element.element_size(&self.symbols.types) as i32;
            self.emit(Opcode::NewArray, &[Register::Ax.into(), size, element.pointer as i32]);
            self.ax_clobbered = true;
            return Ok(Operand::in_ax(element.with_array(ArrayShape::Dynamic)));
        }

        let Some((_, builtin, size, name)) = info.filter(|(managed, ..)| *managed) else {
            return Err(self.semantic_error(
                "Can only use integer types or 'float' or managed types with 'new'",
            ));
        };
        if builtin {
            return Err(self.semantic_error(format!(
                "Cannot create an instance of the builtin type '{name}' with 'new'"
            )));
        }
        let size = size as i32;
        element.pointer = true;
        self.emit(Opcode::NewUserObject, &[Register::Ax.into(), size]);
        self.ax_clobbered = true;
        Ok(Operand::in_ax(element))
    }
}
