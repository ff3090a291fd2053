//! Function declarations and bodies.
//!
//! A function may be declared several times (prototype, `import`, struct
//! member declaration) but all declarations must agree, and only one of
//! them may have a body. Calls made before the body is compiled are
//! patched by [`Callpoints`](crate::callpoints::Callpoints) when it is.

use agscript_core::CompileOptions;
use agscript_parser::{TokenKind, TokenValue};

use super::{Compiler, Qualifiers, Result};
use crate::bytecode::{Opcode, Register};
use crate::const_fold::ConstValue;
use crate::scope::LocalVar;
use crate::symbols::GlobalSymbol;
use crate::types::{ArrayShape, FuncId, FunctionDef, Param, ParamDefault, TypeId, VarType};

/// The parameter list of a declaration.
#[derive(Debug, Default)]
pub(crate) struct ParamList {
    pub params: Vec<Param>,
    pub variadic: bool,
    /// `this S *` or `static S` as the first parameter.
    pub extends: Option<(TypeId, bool)>,
}

impl<'a, 'ast> Compiler<'a, 'ast> {
    /// Parse `( ... )` of a function declaration.
    pub(crate) fn parse_parameters(&mut self, allow_extender: bool) -> Result<ParamList> {
        self.expect(TokenKind::LeftParen)?;
        let mut list = ParamList::default();

        if allow_extender && matches!(self.peek_kind(), TokenKind::This | TokenKind::Static) {
            let is_static = self.advance().kind == TokenKind::Static;
            let name = self.expect_identifier()?;
            let Some(struct_id) = self
                .symbols
                .find_type(name)
                .filter(|&id| self.symbols.types.struct_def(id).is_some())
            else {
                return Err(self.semantic_error(format!("'{name}' is not a struct")));
            };
            if !is_static {
                self.expect(TokenKind::Star)?;
            }
            list.extends = Some((struct_id, is_static));
            if !self.eat(TokenKind::Comma) {
                self.expect(TokenKind::RightParen)?;
                return Ok(list);
            }
        }

        if self.eat(TokenKind::RightParen) {
            return Ok(list);
        }
        loop {
            if self.eat(TokenKind::Ellipsis) {
                list.variadic = true;
                self.expect(TokenKind::RightParen)?;
                return Ok(list);
            }
            let param = self.parse_parameter(list.params.len() + 1)?;
            list.params.push(param);
            if !self.eat(TokenKind::Comma) {
                self.expect(TokenKind::RightParen)?;
                return Ok(list);
            }
        }
    }

    fn parse_parameter(&mut self, number: usize) -> Result<Param> {
        let is_const = self.eat(TokenKind::Const);
        let vartype = self.parse_type(is_const)?;
        let name = if self.check(TokenKind::Identifier) {
            Some(self.advance().lexeme.to_string())
        } else {
            None
        };
        let vartype = self.parse_array_suffix(vartype, name.as_deref())?;
        if matches!(vartype.array, ArrayShape::Static(_)) {
            return Err(self.semantic_error(format!(
                "Parameter #{number} cannot be a static array; use a dynamic array instead"
            )));
        }
        if vartype.is_void() {
            return Err(self.semantic_error(format!("Parameter #{number} cannot have the type 'void'")));
        }
        if vartype.is_struct_instance() {
            return Err(self.semantic_error(format!(
                "Parameter #{number} cannot be a struct instance; pass a pointer instead"
            )));
        }

        let default = if self.eat(TokenKind::Equal) {
            Some(self.parse_default(&vartype, number)?)
        } else {
            None
        };
        Ok(Param { name, vartype, default })
    }

    /// The literal after `=` in a parameter list.
    fn parse_default(&mut self, vartype: &VarType, number: usize) -> Result<ParamDefault> {
        let token = self.peek();
        let types = &self.symbols.types;
        if token.kind == TokenKind::Null {
            self.advance();
            if !vartype.is_dyn() {
                return Err(self.semantic_error(format!(
                    "Parameter #{number} is not a pointer, so its default cannot be 'null'"
                )));
            }
            return Ok(ParamDefault::Null);
        }
        if let TokenValue::Str(bytes) = token.value {
            if !vartype.is_any_string(types) {
                return Err(self.semantic_error(format!(
                    "Parameter #{number} is not a string, so its default cannot be a string"
                )));
            }
            self.advance();
            return Ok(ParamDefault::Str(bytes.to_vec()));
        }
        match self.const_expression()? {
            Some((ConstValue::Int(value), _)) if vartype.is_integer() => Ok(ParamDefault::Int(value)),
            Some((ConstValue::Int(0), _)) if vartype.is_dyn() => Ok(ParamDefault::Null),
            Some((ConstValue::Float(value), _)) if vartype.is_float() => Ok(ParamDefault::Float(value)),
            Some((ConstValue::Int(value), _)) if vartype.is_float() => Ok(ParamDefault::Float(value as f32)),
            _ => Err(self.semantic_error(format!(
                "The default of parameter #{number} must be a literal of type '{}'",
                vartype.display(&self.symbols.types)
            ))),
        }
    }

    /// Compile a function declaration whose name has just been read. The
    /// cursor is at `(`. `struct_of` is set for `int S::F(...)`.
    pub(crate) fn compile_function(
        &mut self,
        qualifiers: Qualifiers,
        return_type: VarType,
        name: &str,
        struct_of: Option<TypeId>,
    ) -> Result<()> {
        let line = self.current_line();
        self.check_return_type(&return_type, name)?;
        let list = self.parse_parameters(struct_of.is_none())?;

        let (struct_of, is_static, is_extender) = match (struct_of, list.extends) {
            (Some(id), _) => (Some(id), false, false),
            (None, Some((id, is_static))) => (Some(id), is_static, true),
            (None, None) => (None, false, false),
        };
        let full_name = match struct_of {
            Some(id) => format!("{}::{name}", self.symbols.types.name(id)),
            None => name.to_string(),
        };

        let mut def = FunctionDef::new(full_name.clone(), return_type);
        def.struct_of = struct_of;
        def.is_static = is_static;
        def.params = list.params;
        def.variadic = list.variadic;
        def.noloopcheck = qualifiers.noloopcheck;
        def.is_import = qualifiers.is_import();
        def.line = line;
        def.section = self.current_section();

        let has_body = self.check(TokenKind::LeftBrace);
        if has_body && def.is_import {
            return Err(self.semantic_error(format!(
                "Imported function '{full_name}' cannot have a body"
            )));
        }
        if has_body && qualifiers.readonly {
            return Err(self.syntax_error("'readonly' cannot be used with functions"));
        }

        let id = self.declare_function_def(def, has_body, struct_of.filter(|_| !is_extender), is_extender)?;
        if has_body {
            self.compile_function_body(id)
        } else {
            self.expect(TokenKind::Semicolon)?;
            Ok(())
        }
    }

    fn check_return_type(&self, vartype: &VarType, name: &str) -> Result<()> {
        if vartype.is_struct_instance() {
            return Err(self.semantic_error(format!(
                "'{name}' cannot return a struct instance; return a pointer instead"
            )));
        }
        if vartype.is_static_array() {
            return Err(self.semantic_error(format!("'{name}' cannot return a static array")));
        }
        Ok(())
    }

    /// Merge `def` with earlier declarations of the same function, or
    /// declare it.
    ///
    /// `member_of` is set for `S::F` definitions, which must have been
    /// declared inside the struct.
    fn declare_function_def(
        &mut self,
        mut def: FunctionDef,
        has_body: bool,
        member_of: Option<TypeId>,
        is_extender: bool,
    ) -> Result<FuncId> {
        let name = def.name.clone();
        let Some(existing) = self.symbols.find(&name) else {
            if let Some(struct_id) = member_of {
                return Err(self.semantic_error(format!(
                    "'{}' is not declared as a member function of the struct '{}'",
                    def.short_name(),
                    self.symbols.types.name(struct_id)
                )));
            }
            let short_name = def.short_name().to_string();
            let struct_of = def.struct_of;
            if let Some(struct_id) = struct_of.filter(|_| is_extender)
                && self.symbols.types.find_component(struct_id, &short_name).is_some()
            {
                return Err(self.semantic_error(format!(
                    "'{short_name}' is already a component of the struct '{}'",
                    self.symbols.types.name(struct_id)
                )));
            }
            let id = self.symbols.declare_function(def);
            if let Some(struct_id) = struct_of
                && let Some(s) = self.symbols.types.struct_def_mut(struct_id)
            {
                s.add_function(&short_name, id);
            }
            return Ok(id);
        };

        let GlobalSymbol::Function(id) = existing else {
            return Err(self.semantic_error(format!(
                "'{name}' is already defined as a {}",
                existing.kind_name()
            )));
        };
        let earlier = self.symbols.function(id).clone();
        if member_of.is_some() {
            // The definition outside the struct repeats neither of these.
            def.is_static = earlier.is_static;
            def.is_protected = earlier.is_protected;
        }
        // A definition need not repeat the defaults of its prototype.
        for (param, declared) in def.params.iter_mut().zip(&earlier.params) {
            if param.default.is_none() {
                param.default = declared.default.clone();
            }
        }
        earlier
            .check_same_signature(&def, &self.symbols.types)
            .map_err(|message| self.semantic_error(message))?;

        if has_body {
            if earlier.has_body {
                return Err(self.semantic_error(format!(
                    "Function '{name}' is already defined with a body on line {}",
                    earlier.line
                )));
            }
            if earlier.is_import && self.options.contains(CompileOptions::NO_IMPORT_OVERRIDE) {
                return Err(self.semantic_error(format!(
                    "Function '{name}' is imported, so it cannot be defined here"
                )));
            }
            if earlier.is_import && self.script.find_import(&earlier.import_symbol()).is_some() {
                return Err(self.semantic_error(format!(
                    "Function '{name}' has already been called as an import; define it before using it"
                )));
            }
        } else if def.is_import && earlier.has_body {
            return Err(self.semantic_error(format!(
                "Function '{name}' is defined on line {}, so it cannot be imported",
                earlier.line
            )));
        }

        let merged = self.symbols.function_mut(id);
        merged.noloopcheck |= def.noloopcheck;
        if has_body {
            // Parameter names come from the definition.
            merged.params = def.params;
        }
        if def.is_import {
            merged.is_import = true;
        }
        Ok(id)
    }

    /// Compile `{ ... }` as the body of `id`.
    #[cfg_attr(feature = "profiling", profiling::function)]
    fn compile_function_body(&mut self, id: FuncId) -> Result<()> {
        let start = self.script.code_size();
        {
            let def = self.symbols.function_mut(id);
            def.has_body = true;
            def.is_import = false;
            def.code_offset = Some(start as u32);
        }
        let patched = self.callpoints.resolve(id, start as u32, &mut self.script);
        let def = self.symbols.function(id).clone();
        self.current_func = Some(id);
        self.scope.reset();
        self.nesting.clear();

        self.emit(Opcode::ThisBase, &[start as i32]);
        if def.noloopcheck {
            self.emit(Opcode::LoopCheckOff, &[]);
        }

        // Parameters
        self.scope.push_scope();
        for (k, param) in def.params.iter().enumerate() {
            let offset = LocalVar::param_offset(k);
            if param.vartype.is_dyn() {
                // The caller does not count the reference it passes.
                self.load_sp_offs(offset);
                self.emit_regs(Opcode::MemRead, &[Register::Ax]);
                self.emit_regs(Opcode::MemInitPtr, &[Register::Ax]);
            }
            let Some(name) = &param.name else { continue };
            let declared = self.scope.declare(LocalVar {
                name: name.clone(),
                vartype: param.vartype.clone(),
                offset,
                depth: 0,
                readonly: false,
                is_param: true,
            });
            if declared.is_err() {
                return Err(self.semantic_error(format!("Parameter '{name}' is defined twice")));
            }
        }

        self.scope.push_scope();
        self.forget_line();
        self.expect(TokenKind::LeftBrace)?;
        while !self.check(TokenKind::RightBrace) {
            if self.check(TokenKind::Eof) {
                return Err(self.syntax_error(format!(
                    "Unexpected end of input in the body of '{}'",
                    def.name
                )));
            }
            self.compile_statement()?;
        }
        self.advance();

        if self.is_reachable() {
            if !def.return_type.is_void() {
                self.warn(format!(
                    "Code execution may reach the end of the non-void function '{}' without a 'return'",
                    def.name
                ));
            }
            self.emit_function_end(&def.return_type);
        }
        self.current_func = None;
        self.scope.reset();
        log::debug!(
            "function '{}' at {start}: {} words, {patched} earlier calls patched",
            def.name,
            self.script.code_size() - start
        );
        Ok(())
    }

    /// Code for falling off the end of a function.
    fn emit_function_end(&mut self, return_type: &VarType) {
        self.free_dynpointers(1);
        let locals = self.scope.offset();
        self.sub_sp(locals);
        if !return_type.is_void() {
            self.lit_to_reg(Register::Ax, 0);
        }
        self.emit(Opcode::Ret, &[]);
    }
}
