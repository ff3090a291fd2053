//! Parsing of type expressions: `const int`, `Character*`, `int[]`,
//! and the `[N]` or `[]` suffix after a variable name.

use agscript_core::CompileOptions;
use agscript_parser::TokenKind;

use super::{Compiler, Result};
use crate::const_fold::ConstValue;
use crate::symbols::GlobalSymbol;
use crate::types::{ArrayShape, BaseType, TypeDef, VarType};

impl<'a, 'ast> Compiler<'a, 'ast> {
    /// Whether the tokens at the cursor start a variable declaration.
    pub(crate) fn at_declaration(&self) -> bool {
        let token = self.peek();
        match token.kind {
            TokenKind::Const | TokenKind::Readonly => true,
            kind if kind.is_primitive_type() => true,
            TokenKind::Identifier => {
                self.symbols.find_type(token.lexeme).is_some()
                    && matches!(
                        self.peek_at(1).kind,
                        TokenKind::Identifier | TokenKind::Star | TokenKind::LeftBracket
                    )
            }
            _ => false,
        }
    }

    /// Parse a type up to, but not including, the declared name.
    pub(crate) fn parse_type(&mut self, is_const: bool) -> Result<VarType> {
        let token = self.advance();
        let base = match token.kind {
            TokenKind::Void => BaseType::Void,
            TokenKind::Char => BaseType::Char,
            TokenKind::Short => BaseType::Short,
            TokenKind::Int => BaseType::Int,
            TokenKind::Long => BaseType::Long,
            TokenKind::Float => BaseType::Float,
            TokenKind::String => {
                if !is_const && !self.options.contains(CompileOptions::OLD_STRINGS) {
                    return Err(
                        self.semantic_error("Type 'string' is no longer supported; use String instead")
                    );
                }
                BaseType::OldString
            }
            TokenKind::Identifier => match self.symbols.find(token.lexeme) {
                Some(GlobalSymbol::Type(id)) => match self.symbols.types.get(id) {
                    Some(TypeDef::Enum(_)) => BaseType::Enum(id),
                    _ => BaseType::Struct(id),
                },
                Some(_) => {
                    return Err(self.semantic_error(format!("'{}' is not a type", token.lexeme)));
                }
                None => {
                    return Err(
                        self.semantic_error(format!("Type '{}' is undeclared", token.lexeme))
                    );
                }
            },
            _ => {
                return Err(self.syntax_error(format!(
                    "Expected a type, found '{}' instead",
                    Self::describe(token)
                )));
            }
        };

        let mut vartype = VarType::new(base);
        vartype.is_const = is_const;
        if let BaseType::Struct(id) = base
            && self.symbols.types.struct_def(id).is_some_and(|s| s.autoptr)
        {
            vartype.pointer = true;
        }

        let brackets_follow = |c: &Self, at: usize| {
            c.peek_at(at).kind == TokenKind::LeftBracket && c.peek_at(at + 1).kind == TokenKind::RightBracket
        };
        if self.eat(TokenKind::Star) {
            let managed = vartype
                .struct_id()
                .and_then(|id| self.symbols.types.struct_def(id))
                .is_some_and(|s| s.managed);
            if !managed {
                let type_name = vartype.display(&self.symbols.types);
                let declared = self.declared_name(if brackets_follow(self, 0) { 2 } else { 0 });
                return Err(self.semantic_error(match declared {
                    Some(name) => format!(
                        "Cannot declare '{name}' as a pointer to the non-managed type '{type_name}'"
                    ),
                    None => format!("Cannot declare a pointer to the non-managed type '{type_name}'"),
                }));
            }
            vartype.pointer = true;
        }

        if brackets_follow(self, 0) {
            self.advance();
            self.advance();
            let declared = self.declared_name(0);
            vartype = self.make_dynarray(vartype, declared)?;
        }
        Ok(vartype)
    }

    /// The name being declared, `ahead` tokens past the cursor.
    fn declared_name(&self, ahead: usize) -> Option<&'ast str> {
        let token = self.peek_at(ahead);
        (token.kind == TokenKind::Identifier).then_some(token.lexeme)
    }

    fn make_dynarray(&self, vartype: VarType, declared: Option<&str>) -> Result<VarType> {
        if vartype.is_void() {
            return Err(self.semantic_error("Cannot declare an array of 'void'"));
        }
        if vartype.is_struct_instance() {
            let type_name = vartype.display(&self.symbols.types);
            return Err(self.semantic_error(match declared {
                Some(name) => format!(
                    "Cannot declare '{name}' as a dynamic array of the non-managed struct '{type_name}'"
                ),
                None => format!("Dynamic arrays of the non-managed struct '{type_name}' are not supported"),
            }));
        }
        Ok(vartype.with_array(ArrayShape::Dynamic))
    }

    /// Parse `[N][M]...` or `[]` after the variable `name`.
    pub(crate) fn parse_array_suffix(&mut self, vartype: VarType, name: Option<&str>) -> Result<VarType> {
        if !self.check(TokenKind::LeftBracket) {
            return Ok(vartype);
        }
        if vartype.is_dynarray() {
            return Err(self.semantic_error("Cannot declare an array of dynamic arrays"));
        }
        if self.peek_at(1).kind == TokenKind::RightBracket {
            self.advance();
            self.advance();
            return self.make_dynarray(vartype, name);
        }

        let mut dims = Vec::new();
        while self.eat(TokenKind::LeftBracket) {
            let size = match self.const_expression()? {
                Some((ConstValue::Int(n), _)) if n > 0 => n as u32,
                Some((ConstValue::Int(n), _)) => {
                    return Err(self.semantic_error(format!(
                        "Array size must be at least 1, found {n} instead"
                    )));
                }
                _ => {
                    return Err(self.semantic_error(
                        "Array size must be a constant integer expression",
                    ));
                }
            };
            dims.push(size);
            self.expect(TokenKind::RightBracket)?;
        }
        if vartype.is_void() {
            return Err(self.semantic_error("Cannot declare an array of 'void'"));
        }
        Ok(vartype.with_array(ArrayShape::Static(dims)))
    }

    /// Reject types a variable cannot have.
    pub(crate) fn check_variable_type(&self, vartype: &VarType, name: &str, imported: bool) -> Result<()> {
        if vartype.base == BaseType::Void {
            return Err(self.semantic_error(format!(
                "'{name}' cannot have the type 'void'"
            )));
        }
        if !vartype.pointer
            && let Some(def) = vartype.struct_id().and_then(|id| self.symbols.types.struct_def(id))
        {
            if def.managed && !imported {
                return Err(self.semantic_error(format!(
                    "Cannot declare '{name}' as an instance of the managed type '{}'; use a pointer instead",
                    def.name
                )));
            }
            if !def.defined {
                return Err(self.semantic_error(format!(
                    "The struct '{}' has only been forward-declared",
                    def.name
                )));
            }
        }
        Ok(())
    }
}
