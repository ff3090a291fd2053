//! Top level declarations: qualifiers, global variables, enums and the
//! `export` list. Structs and functions have their own modules.

use agscript_core::CompileOptions;
use agscript_parser::{TokenKind, TokenValue};

use super::{Compiler, ExportRequest, Result};
use crate::bytecode::OLD_STRING_SIZE;
use crate::const_fold::ConstValue;
use crate::symbols::{GlobalSymbol, GlobalVar};
use crate::types::{BaseType, EnumDef, TypeDef, TypeId, VarType};

/// Keywords that may precede a declaration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct Qualifiers {
    pub import: bool,
    pub try_import: bool,
    pub is_static: bool,
    pub protected: bool,
    pub writeprotected: bool,
    pub readonly: bool,
    pub is_const: bool,
    pub noloopcheck: bool,
    pub managed: bool,
    pub builtin: bool,
    pub autoptr: bool,
    pub internalstring: bool,
    pub attribute: bool,
}

impl Qualifiers {
    fn flag(&mut self, kind: TokenKind) -> Option<&mut bool> {
        Some(match kind {
            TokenKind::Import => &mut self.import,
            TokenKind::TryImport => &mut self.try_import,
            TokenKind::Static => &mut self.is_static,
            TokenKind::Protected => &mut self.protected,
            TokenKind::Writeprotected => &mut self.writeprotected,
            TokenKind::Readonly => &mut self.readonly,
            TokenKind::Const => &mut self.is_const,
            TokenKind::Noloopcheck => &mut self.noloopcheck,
            TokenKind::Managed => &mut self.managed,
            TokenKind::Builtin => &mut self.builtin,
            TokenKind::Autoptr => &mut self.autoptr,
            TokenKind::Internalstring => &mut self.internalstring,
            TokenKind::Attribute => &mut self.attribute,
            _ => return None,
        })
    }

    /// `import` or `_tryimport`.
    pub fn is_import(&self) -> bool {
        self.import || self.try_import
    }

    /// The qualifiers that only make sense on a struct, in source order
    /// of their keywords.
    pub fn struct_only(&self) -> Option<&'static str> {
        [
            (self.managed, "managed"),
            (self.builtin, "builtin"),
            (self.autoptr, "autoptr"),
            (self.internalstring, "internalstring"),
        ]
        .into_iter()
        .find_map(|(set, name)| set.then_some(name))
    }

    /// The qualifiers that only make sense on a struct member.
    pub fn member_only(&self) -> Option<&'static str> {
        [
            (self.protected, "protected"),
            (self.writeprotected, "writeprotected"),
            (self.attribute, "attribute"),
            (self.is_static, "static"),
        ]
        .into_iter()
        .find_map(|(set, name)| set.then_some(name))
    }
}

impl<'a, 'ast> Compiler<'a, 'ast> {
    pub(crate) fn parse_qualifiers(&mut self) -> Result<Qualifiers> {
        let mut qualifiers = Qualifiers::default();
        loop {
            let kind = self.peek_kind();
            let Some(flag) = qualifiers.flag(kind) else {
                return Ok(qualifiers);
            };
            if *flag {
                self.advance();
                return Err(self.syntax_error(format!("'{}' is given twice", kind.text())));
            }
            *flag = true;
            self.advance();
        }
    }

    /// Compile one declaration at global scope.
    pub(crate) fn compile_declaration(&mut self) -> Result<()> {
        if self.eat(TokenKind::Semicolon) {
            return Ok(());
        }
        let qualifiers = self.parse_qualifiers()?;
        match self.peek_kind() {
            TokenKind::Struct => self.compile_struct(qualifiers),
            kind => {
                if let Some(name) = qualifiers.struct_only() {
                    return Err(self.syntax_error(format!(
                        "'{name}' can only be used in a struct declaration"
                    )));
                }
                if let Some(name) = qualifiers.member_only() {
                    return Err(self.syntax_error(format!(
                        "'{name}' can only be used inside a struct"
                    )));
                }
                match kind {
                    TokenKind::Enum => self.compile_enum(qualifiers),
                    TokenKind::Export => self.compile_export_list(qualifiers),
                    _ => self.compile_global_or_function(qualifiers),
                }
            }
        }
    }

    /// `enum Name { A, B = 5, C };`. Members count up from 1.
    fn compile_enum(&mut self, qualifiers: Qualifiers) -> Result<()> {
        if qualifiers != Qualifiers::default() {
            return Err(self.syntax_error("An enum cannot have qualifiers"));
        }
        self.advance();
        let name = self.expect_identifier()?;
        let enum_type = self.declare_type_name(TypeDef::Enum(EnumDef { name: name.to_string() }))?;
        self.expect(TokenKind::LeftBrace)?;

        let mut next_value = 1i32;
        while !self.check(TokenKind::RightBrace) {
            let member = self.expect_identifier()?;
            if let Some(existing) = self.symbols.find(member) {
                return Err(self.semantic_error(format!(
                    "'{member}' is already defined as a {}",
                    existing.kind_name()
                )));
            }
            if self.eat(TokenKind::Equal) {
                next_value = match self.const_expression()? {
                    Some((ConstValue::Int(value), _)) => value,
                    _ => {
                        return Err(self.semantic_error(format!(
                            "Expected a constant integer value for the enum member '{member}'"
                        )));
                    }
                };
            }
            self.symbols.declare_constant(member, next_value, enum_type);
            next_value = next_value.wrapping_add(1);
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::RightBrace)?;
        self.expect(TokenKind::Semicolon)?;
        Ok(())
    }

    /// Register a new struct or enum name.
    pub(crate) fn declare_type_name(&mut self, def: TypeDef) -> Result<TypeId> {
        let name = def.name().to_string();
        self.symbols.declare_type(def).map_err(|existing| {
            self.semantic_error(format!("'{name}' is already defined as a {}", existing.kind_name()))
        })
    }

    /// `export a, b;`: the names are looked up once the whole script is
    /// compiled.
    fn compile_export_list(&mut self, qualifiers: Qualifiers) -> Result<()> {
        if qualifiers != Qualifiers::default() {
            return Err(self.syntax_error("'export' cannot have qualifiers"));
        }
        self.advance();
        loop {
            let token = self.peek();
            let name = self.expect_identifier()?;
            self.exports.push(ExportRequest {
                name: name.to_string(),
                section: token.section,
                line: token.line(),
            });
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::Semicolon)?;
        Ok(())
    }

    /// A declaration that starts with a type: global variables, or a
    /// function prototype or definition.
    fn compile_global_or_function(&mut self, qualifiers: Qualifiers) -> Result<()> {
        let base = self.parse_type(qualifiers.is_const)?;
        loop {
            let name = self.expect_identifier()?;
            if self.eat(TokenKind::ColonColon) {
                let member = self.expect_identifier()?;
                let Some(struct_id) = self
                    .symbols
                    .find_type(name)
                    .filter(|&id| self.symbols.types.struct_def(id).is_some())
                else {
                    return Err(self.semantic_error(format!("'{name}' is not a struct")));
                };
                return self.compile_function(qualifiers, base, member, Some(struct_id));
            }
            if self.check(TokenKind::LeftParen) {
                return self.compile_function(qualifiers, base, name, None);
            }
            if qualifiers.noloopcheck {
                return Err(self.syntax_error("'noloopcheck' can only be used with functions"));
            }

            let vartype = self.parse_array_suffix(base.clone(), Some(name))?;
            self.compile_global_variable(qualifiers, vartype, name)?;
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::Semicolon)?;
        Ok(())
    }

    fn compile_global_variable(&mut self, qualifiers: Qualifiers, vartype: VarType, name: &str) -> Result<()> {
        let imported = qualifiers.is_import();
        self.check_variable_type(&vartype, name, imported)?;
        let line = self.current_line();

        match self.symbols.find(name) {
            None => {}
            Some(GlobalSymbol::Variable(id)) => {
                let existing = self.symbols.global(id);
                // A definition may follow the import of the same variable.
                let overrides = existing.is_import && !imported && existing.vartype == vartype;
                if !overrides {
                    return Err(self.semantic_error(format!(
                        "'{name}' is already defined (on line {})",
                        existing.line
                    )));
                }
                if self.script.find_import(name).is_some() {
                    return Err(self.semantic_error(format!(
                        "'{name}' has already been used as an import; define it before using it"
                    )));
                }
                if self.options.contains(CompileOptions::NO_IMPORT_OVERRIDE) {
                    return Err(self.semantic_error(format!("'{name}' is imported, so it cannot be defined here")));
                }
            }
            Some(existing) => {
                return Err(self.semantic_error(format!(
                    "'{name}' is already defined as a {}",
                    existing.kind_name()
                )));
            }
        }

        let readonly = qualifiers.readonly || (qualifiers.is_const && !vartype.is_old_string());
        if imported {
            if self.check(TokenKind::Equal) {
                return Err(self.semantic_error("Imported variables cannot have any initial assignment"));
            }
            self.symbols.declare_global(GlobalVar {
                name: name.to_string(),
                vartype,
                offset: 0,
                is_import: true,
                readonly,
                const_value: None,
                line,
            });
            return Ok(());
        }

        let size = vartype.size(&self.symbols.types);
        let (init, const_value) = if self.eat(TokenKind::Equal) {
            self.global_initializer(&vartype, name)?
        } else {
            (Vec::new(), None)
        };
        let offset = self.script.add_global(size, &init);
        self.symbols.declare_global(GlobalVar {
            name: name.to_string(),
            vartype,
            offset,
            is_import: false,
            readonly,
            const_value: const_value.filter(|_| readonly),
            line,
        });
        log::trace!("global '{name}' at {offset}, {size} bytes");
        Ok(())
    }

    /// The bytes an initialised global starts with, and its value if it is
    /// a number.
    fn global_initializer(&mut self, vartype: &VarType, name: &str) -> Result<(Vec<u8>, Option<ConstValue>)> {
        if vartype.is_dyn() {
            return Err(self.semantic_error(format!(
                "Cannot assign an initial value to the global pointer '{name}'"
            )));
        }
        if !vartype.is_scalar() || vartype.is_struct_instance() {
            return Err(self.semantic_error(format!(
                "Cannot assign an initial value to '{name}'"
            )));
        }

        if vartype.is_old_string() {
            let token = self.peek();
            let TokenValue::Str(bytes) = token.value else {
                return Err(self.semantic_error(format!(
                    "Expected a string literal as the initial value of '{name}'"
                )));
            };
            self.advance();
            if bytes.len() >= OLD_STRING_SIZE as usize {
                return Err(self.semantic_error(format!(
                    "The initial value of '{name}' is longer than {} characters",
                    OLD_STRING_SIZE - 1
                )));
            }
            return Ok((bytes.to_vec(), None));
        }

        let value = match self.const_expression()? {
            Some((value, _)) => value,
            None => {
                return Err(self.semantic_error(format!(
                    "The initial value of the global variable '{name}' must be a constant"
                )));
            }
        };
        let size = vartype.size(&self.symbols.types) as usize;
        match (vartype.base, value) {
            (BaseType::Float, ConstValue::Float(f)) => Ok((f.to_le_bytes().to_vec(), Some(value))),
            (BaseType::Float, ConstValue::Int(i)) => Err(self.semantic_error(format!(
                "Expected a float value for '{name}', found the integer {i} instead"
            ))),
            (base, ConstValue::Int(i)) if base.is_integer() => {
                Ok((i.to_le_bytes()[..size].to_vec(), Some(value)))
            }
            _ => Err(self.semantic_error(format!(
                "Cannot assign a type '{}' value to a type '{}' variable",
                match value {
                    ConstValue::Int(_) => "int",
                    ConstValue::Float(_) => "float",
                },
                vartype.display(&self.symbols.types)
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn struct_only_names_first_qualifier() {
        let q = Qualifiers {
            managed: true,
            autoptr: true,
            ..Qualifiers::default()
        };
        assert_eq!(q.struct_only(), Some("managed"));
        assert_eq!(Qualifiers::default().struct_only(), None);
    }

    #[test]
    fn import_covers_tryimport() {
        let q = Qualifiers {
            try_import: true,
            ..Qualifiers::default()
        };
        assert!(q.is_import());
        assert_eq!(q.member_only(), None);
    }
}
