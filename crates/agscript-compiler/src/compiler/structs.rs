//! Struct declarations.
//!
//! ```text
//! managed struct Npc extends Character {
//!     int hp;
//!     protected int secret;
//!     import attribute int Mood;
//!     import static Npc* Create(int hp = 10);
//! };
//! ```
//!
//! Member functions are registered globally under `Struct::Name` as well
//! as in the struct. Attributes become getter and setter functions.

use agscript_parser::TokenKind;

use super::{Compiler, Qualifiers, Result};
use crate::symbols::GlobalSymbol;
use crate::types::{Access, Attribute, BaseType, FuncId, FunctionDef, Param, StructDef, TypeDef, TypeId, VarType};

impl<'a, 'ast> Compiler<'a, 'ast> {
    pub(crate) fn compile_struct(&mut self, qualifiers: Qualifiers) -> Result<()> {
        let misplaced = [
            (qualifiers.import || qualifiers.try_import, "import"),
            (qualifiers.readonly, "readonly"),
            (qualifiers.is_const, "const"),
            (qualifiers.noloopcheck, "noloopcheck"),
        ]
        .into_iter()
        .chain(qualifiers.member_only().map(|name| (true, name)))
        .find_map(|(set, name)| set.then_some(name));
        if let Some(name) = misplaced {
            return Err(self.syntax_error(format!("'{name}' cannot be used with a struct")));
        }
        if qualifiers.autoptr && !qualifiers.managed {
            return Err(self.semantic_error("'autoptr' can only be used with managed structs"));
        }
        self.advance();
        let name = self.expect_identifier()?;

        let struct_id = match self.symbols.find(name) {
            Some(GlobalSymbol::Type(id)) => {
                let Some(def) = self.symbols.types.struct_def(id) else {
                    return Err(self.semantic_error(format!("'{name}' is already defined as an enum")));
                };
                if def.defined {
                    return Err(self.semantic_error(format!("The struct '{name}' is already defined")));
                }
                if def.managed != qualifiers.managed {
                    return Err(self.semantic_error(format!(
                        "The struct '{name}' was forward-declared as {}managed",
                        if def.managed { "" } else { "not " }
                    )));
                }
                id
            }
            Some(existing) => {
                return Err(self.semantic_error(format!(
                    "'{name}' is already defined as a {}",
                    existing.kind_name()
                )));
            }
            None => {
                let mut def = StructDef::new(name, qualifiers.managed);
                def.builtin = qualifiers.builtin;
                def.autoptr = qualifiers.autoptr;
                def.internalstring = qualifiers.internalstring;
                self.declare_type_name(TypeDef::Struct(def))?
            }
        };

        if self.eat(TokenKind::Semicolon) {
            if !qualifiers.managed {
                return Err(self.semantic_error("Only managed structs can be forward-declared"));
            }
            return Ok(());
        }

        if self.eat(TokenKind::Extends) {
            self.compile_extends(struct_id, name)?;
        }
        self.expect(TokenKind::LeftBrace)?;
        while !self.eat(TokenKind::RightBrace) {
            if self.check(TokenKind::Eof) {
                return Err(self.syntax_error(format!(
                    "Unexpected end of input in the declaration of '{name}'"
                )));
            }
            self.compile_struct_member(struct_id)?;
        }
        self.expect(TokenKind::Semicolon)?;

        if let Some(def) = self.symbols.types.struct_def_mut(struct_id) {
            def.defined = true;
            log::trace!("struct '{name}': {} bytes", def.size);
        }
        Ok(())
    }

    fn compile_extends(&mut self, struct_id: TypeId, name: &str) -> Result<()> {
        let parent_name = self.expect_identifier()?;
        let types = &self.symbols.types;
        let Some((parent, def)) = self
            .symbols
            .find_type(parent_name)
            .and_then(|id| types.struct_def(id).map(|def| (id, def)))
        else {
            return Err(self.semantic_error(format!("'{parent_name}' is not a struct")));
        };
        if !def.defined {
            return Err(self.semantic_error(format!(
                "The struct '{parent_name}' has only been forward-declared"
            )));
        }
        let (parent_managed, parent_size) = (def.managed, def.size);
        let Some(child) = self.symbols.types.struct_def_mut(struct_id) else {
            return Err(self.internal_error("Extending a type that is not a struct"));
        };
        if child.managed != parent_managed {
            let managed = child.managed;
            return Err(self.semantic_error(format!(
                "The {}managed struct '{name}' cannot extend the {}managed struct '{parent_name}'",
                if managed { "" } else { "non-" },
                if parent_managed { "" } else { "non-" },
            )));
        }
        child.parent = Some(parent);
        child.size = parent_size;
        Ok(())
    }

    /// One member declaration, up to and including its `;`.
    fn compile_struct_member(&mut self, struct_id: TypeId) -> Result<()> {
        let qualifiers = self.parse_qualifiers()?;
        if let Some(name) = qualifiers.struct_only() {
            return Err(self.syntax_error(format!("'{name}' cannot be used inside a struct")));
        }
        if qualifiers.try_import || qualifiers.noloopcheck {
            return Err(self.syntax_error("Struct members cannot be '_tryimport' or 'noloopcheck'"));
        }
        let access_count = [qualifiers.protected, qualifiers.writeprotected, qualifiers.readonly && !qualifiers.attribute]
            .into_iter()
            .filter(|&set| set)
            .count();
        if access_count > 1 {
            return Err(self.syntax_error(
                "Can only use one of 'protected', 'writeprotected' and 'readonly'",
            ));
        }

        let base = self.parse_type(qualifiers.is_const)?;
        loop {
            let member = self.expect_identifier()?;
            self.check_new_component(struct_id, member)?;
            if self.check(TokenKind::LeftParen) {
                if qualifiers.attribute {
                    return Err(self.syntax_error("An attribute cannot have parameters"));
                }
                return self.compile_member_function_decl(struct_id, qualifiers, base, member);
            }
            if qualifiers.attribute {
                self.compile_attribute(struct_id, qualifiers, base.clone(), member)?;
            } else {
                self.compile_field(struct_id, qualifiers, base.clone(), member)?;
            }
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::Semicolon)?;
        Ok(())
    }

    fn check_new_component(&self, struct_id: TypeId, member: &str) -> Result<()> {
        let types = &self.symbols.types;
        if let Some((owner, component)) = types.find_component(struct_id, member) {
            return Err(self.semantic_error(format!(
                "'{}::{member}' is already declared as a {}",
                types.name(owner),
                component.kind_name()
            )));
        }
        Ok(())
    }

    fn compile_field(&mut self, struct_id: TypeId, qualifiers: Qualifiers, base: VarType, member: &str) -> Result<()> {
        if qualifiers.is_static {
            return Err(self.semantic_error(format!(
                "'{member}': static variables are not supported in structs"
            )));
        }
        if qualifiers.import {
            return Err(self.semantic_error(format!(
                "'{member}': only functions and attributes can be imported"
            )));
        }
        let vartype = self.parse_array_suffix(base, Some(member))?;
        let types = &self.symbols.types;
        if vartype.base == BaseType::Void {
            return Err(self.semantic_error(format!("'{member}' cannot have the type 'void'")));
        }
        if let Some(def) = vartype
            .struct_id()
            .filter(|_| !vartype.pointer)
            .and_then(|id| types.struct_def(id))
        {
            if def.managed {
                return Err(self.semantic_error(format!(
                    "'{member}' cannot be an instance of the managed type '{}'; use a pointer instead",
                    def.name
                )));
            }
            if !def.defined {
                return Err(self.semantic_error(format!(
                    "'{member}' cannot have the incomplete type '{}'",
                    def.name
                )));
            }
        }

        let access = if qualifiers.protected {
            Access::Protected
        } else if qualifiers.writeprotected {
            Access::WriteProtected
        } else if qualifiers.readonly {
            Access::ReadOnly
        } else {
            Access::Public
        };
        let size = vartype.size(types);
        let Some(def) = self.symbols.types.struct_def_mut(struct_id) else {
            return Err(self.internal_error("Adding a field to a type that is not a struct"));
        };
        def.add_field(member, vartype, size, access);
        Ok(())
    }

    /// `import int Run(int speed);` inside a struct. The body, if any, is
    /// defined later as `int Struct::Run(int speed) { ... }`.
    fn compile_member_function_decl(
        &mut self,
        struct_id: TypeId,
        qualifiers: Qualifiers,
        return_type: VarType,
        member: &str,
    ) -> Result<()> {
        if qualifiers.writeprotected || qualifiers.readonly {
            return Err(self.syntax_error(format!(
                "Member function '{member}' cannot be 'writeprotected' or 'readonly'"
            )));
        }
        let line = self.current_line();
        let list = self.parse_parameters(false)?;
        let struct_name = self.symbols.types.name(struct_id).to_string();
        let mut def = FunctionDef::new(format!("{struct_name}::{member}"), return_type);
        def.struct_of = Some(struct_id);
        def.is_static = qualifiers.is_static;
        def.is_protected = qualifiers.protected;
        def.is_import = qualifiers.import;
        def.params = list.params;
        def.variadic = list.variadic;
        def.line = line;
        def.section = self.current_section();
        self.add_member_function(struct_id, member, def)?;
        self.expect(TokenKind::Semicolon)?;
        Ok(())
    }

    /// `attribute int X;` creates `get_X` and, unless readonly, `set_X`.
    /// `attribute int X[];` creates `geti_X` and `seti_X` taking an index.
    fn compile_attribute(&mut self, struct_id: TypeId, qualifiers: Qualifiers, vartype: VarType, member: &str) -> Result<()> {
        if qualifiers.protected || qualifiers.writeprotected {
            return Err(self.syntax_error("Attributes cannot be 'protected' or 'writeprotected'"));
        }
        if vartype.is_struct_instance() {
            return Err(self.semantic_error(format!(
                "Attribute '{member}' cannot be a struct instance; use a pointer instead"
            )));
        }
        let indexed = self.check(TokenKind::LeftBracket) && self.peek_at(1).kind == TokenKind::RightBracket;
        if indexed {
            self.advance();
            self.advance();
        }
        let line = self.current_line();
        let section = self.current_section();
        let struct_name = self.symbols.types.name(struct_id).to_string();
        let (get, set) = if indexed { ("geti", "seti") } else { ("get", "set") };
        let index_param = || Param {
            name: None,
            vartype: VarType::int(),
            default: None,
        };

        let accessor = |prefix: &str, return_type: VarType| {
            let mut def = FunctionDef::new(format!("{struct_name}::{prefix}_{member}"), return_type);
            def.struct_of = Some(struct_id);
            def.is_static = qualifiers.is_static;
            def.is_import = true;
            def.line = line;
            def.section = section;
            if indexed {
                def.params.push(index_param());
            }
            def
        };

        let getter = accessor(get, vartype.clone());
        let getter = self.add_member_function(struct_id, &format!("{get}_{member}"), getter)?;
        let setter = if qualifiers.readonly {
            None
        } else {
            let mut setter = accessor(set, VarType::void());
            setter.params.push(Param {
                name: None,
                vartype: vartype.clone(),
                default: None,
            });
            Some(self.add_member_function(struct_id, &format!("{set}_{member}"), setter)?)
        };

        let Some(def) = self.symbols.types.struct_def_mut(struct_id) else {
            return Err(self.internal_error("Adding an attribute to a type that is not a struct"));
        };
        def.add_attribute(Attribute {
            name: member.to_string(),
            vartype,
            indexed,
            is_static: qualifiers.is_static,
            getter,
            setter,
        });
        Ok(())
    }

    fn add_member_function(&mut self, struct_id: TypeId, member: &str, def: FunctionDef) -> Result<FuncId> {
        // Attribute accessors have not been checked against the members yet.
        self.check_new_component(struct_id, member)?;
        if let Some(existing) = self.symbols.find(&def.name) {
            return Err(self.semantic_error(format!(
                "'{}' is already defined as a {}",
                def.name,
                existing.kind_name()
            )));
        }
        if member != def.short_name() {
            return Err(self.internal_error("Member name does not match its function"));
        }
        let id = self.symbols.declare_function(def);
        let Some(s) = self.symbols.types.struct_def_mut(struct_id) else {
            return Err(self.internal_error("Adding a function to a type that is not a struct"));
        };
        s.add_function(member, id);
        Ok(id)
    }
}
