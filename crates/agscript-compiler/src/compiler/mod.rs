//! The single-pass parser and code generator.
//!
//! [`Compiler`] walks the token list once. Declarations update the symbol
//! table; function bodies are compiled statement by statement straight into
//! the [`CompiledScript`]. The statement and expression compilers in
//! [`crate::stmt`] and [`crate::expr`] are further `impl` blocks on the
//! same struct.
//!
//! The token list is indexed rather than consumed, so the compiler can jump
//! around in it: call arguments are compiled last to first, and the right
//! hand side of an assignment is compiled before its left hand side.

mod declarations;
mod functions;
mod structs;
mod type_parse;

use agscript_core::{CompileError, CompileErrorKind, CompileOptions, Diagnostics};
use agscript_parser::{Token, TokenKind, TokenList};

use crate::bytecode::{Opcode, Register};
use crate::callpoints::Callpoints;
use crate::emit::{JumpList, PendingJump, RestorePoint};
use crate::nesting::NestingStack;
use crate::scope::LocalScope;
use crate::script::CompiledScript;
use crate::symbols::SymbolTable;
use crate::types::{FuncId, FunctionDef, TypeId};

pub(crate) use declarations::Qualifiers;

pub(crate) type Result<T> = std::result::Result<T, CompileError>;

/// An export requested with `export name;`.
#[derive(Debug, Clone)]
struct ExportRequest {
    name: String,
    section: u16,
    line: u32,
}

pub struct Compiler<'a, 'ast> {
    tokens: &'a TokenList<'ast>,
    pos: usize,
    pub(crate) options: CompileOptions,
    diagnostics: &'a mut Diagnostics,
    pub(crate) script: CompiledScript,
    pub(crate) symbols: SymbolTable,
    pub(crate) scope: LocalScope,
    pub(crate) nesting: NestingStack,
    pub(crate) callpoints: Callpoints,
    /// Function whose body is being compiled.
    pub(crate) current_func: Option<FuncId>,
    /// Line of the last `LINENUM` emitted.
    last_line: u32,
    /// Warnings are dropped while this is non-zero (dry runs).
    muted: u32,
    /// Code offset the most recent forward jump was patched to.
    jump_target: Option<usize>,
    /// Set whenever code that overwrites AX is emitted.
    pub(crate) ax_clobbered: bool,
    section: Option<u16>,
    exports: Vec<ExportRequest>,
}

impl<'a, 'ast> Compiler<'a, 'ast> {
    pub fn new(tokens: &'a TokenList<'ast>, options: CompileOptions, diagnostics: &'a mut Diagnostics) -> Self {
        Self {
            tokens,
            pos: 0,
            options,
            diagnostics,
            script: CompiledScript::new(),
            symbols: SymbolTable::new(),
            scope: LocalScope::new(),
            nesting: NestingStack::new(),
            callpoints: Callpoints::new(),
            current_func: None,
            last_line: 0,
            muted: 0,
            jump_target: None,
            ax_clobbered: false,
            section: None,
            exports: Vec::new(),
        }
    }

    /// Compile the whole token list.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn compile(mut self) -> Result<CompiledScript> {
        while !self.check(TokenKind::Eof) {
            self.note_section();
            self.compile_declaration()?;
        }
        self.finish()?;
        log::debug!(
            "compiled {} code words, {} fixups, {} imports, {} exports",
            self.script.code_size(),
            self.script.fixups.len(),
            self.script.imports.len(),
            self.script.exports.len()
        );
        Ok(self.script)
    }

    /// Start a new section in the output when the tokens cross into one.
    fn note_section(&mut self) {
        let section = self.peek().section;
        if self.section != Some(section) {
            self.section = Some(section);
            let name = self.tokens.section_name(section).to_string();
            self.script.start_new_section(&name);
        }
    }

    /// Checks that need the whole script: unresolved calls and exports.
    fn finish(&mut self) -> Result<()> {
        if let Some(func) = self.callpoints.unresolved().next() {
            let def = self.symbols.function(func);
            return Err(CompileError::new(
                CompileErrorKind::Semantic,
                format!(
                    "The called function '{}()' isn't defined with body nor imported",
                    def.name
                ),
                self.tokens.section_name(def.section),
                def.line,
            ));
        }

        if self.options.contains(CompileOptions::EXPORT_ALL) {
            let bodies: Vec<(String, u32, u16, u32)> = self
                .symbols
                .functions()
                .filter(|(_, f)| f.has_body)
                .filter_map(|(_, f)| {
                    f.code_offset
                        .map(|offset| (f.export_symbol(), offset, f.section, f.line))
                })
                .collect();
            for (name, offset, section, line) in bodies {
                self.script
                    .add_export(&name, crate::bytecode::EXPORT_FUNCTION, offset)
                    .map_err(|e| {
                        CompileError::new(
                            CompileErrorKind::Semantic,
                            e.to_string(),
                            self.tokens.section_name(section),
                            line,
                        )
                    })?;
            }
        }

        let requests = std::mem::take(&mut self.exports);
        for request in requests {
            self.export_symbol(&request)?;
        }
        Ok(())
    }

    fn export_symbol(&mut self, request: &ExportRequest) -> Result<()> {
        use crate::bytecode::{EXPORT_DATA, EXPORT_FUNCTION};
        use crate::symbols::GlobalSymbol;

        let section = self.tokens.section_name(request.section).to_string();
        let fail = |message: String| {
            CompileError::new(CompileErrorKind::Semantic, message, section.clone(), request.line)
        };
        let name = &request.name;
        let (export_name, tag, offset) = match self.symbols.find(name) {
            Some(GlobalSymbol::Function(id)) => {
                let def = self.symbols.function(id);
                match (def.has_body, def.code_offset) {
                    (true, Some(offset)) => (def.export_symbol(), EXPORT_FUNCTION, offset),
                    _ => return Err(fail(format!("Cannot export '{name}' because it has no body"))),
                }
            }
            Some(GlobalSymbol::Variable(id)) => {
                let var = self.symbols.global(id);
                if var.is_import {
                    return Err(fail(format!("Cannot export the imported variable '{name}'")));
                }
                (name.clone(), EXPORT_DATA, var.offset)
            }
            Some(_) => {
                return Err(fail(format!(
                    "Can only export global variables and functions, not '{name}'"
                )));
            }
            None => return Err(fail(format!("Identifier '{name}' is undeclared"))),
        };
        self.script
            .add_export(&export_name, tag, offset)
            .map_err(|e| fail(e.to_string()))
    }

    // =========================================================================
    // Token cursor
    // =========================================================================

    #[inline]
    pub(crate) fn peek(&self) -> Token<'ast> {
        self.tokens.get(self.pos)
    }

    #[inline]
    pub(crate) fn peek_at(&self, ahead: usize) -> Token<'ast> {
        self.tokens.get(self.pos + ahead)
    }

    #[inline]
    pub(crate) fn peek_kind(&self) -> TokenKind {
        self.peek().kind
    }

    #[inline]
    pub(crate) fn check(&self, kind: TokenKind) -> bool {
        self.peek().kind == kind
    }

    pub(crate) fn advance(&mut self) -> Token<'ast> {
        let token = self.peek();
        if token.kind != TokenKind::Eof {
            self.pos += 1;
        }
        token
    }

    pub(crate) fn eat(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    pub(crate) fn pos(&self) -> usize {
        self.pos
    }

    pub(crate) fn set_pos(&mut self, pos: usize) {
        self.pos = pos;
    }

    pub(crate) fn token_at(&self, pos: usize) -> Token<'ast> {
        self.tokens.get(pos)
    }

    /// How a token is quoted in messages.
    pub(crate) fn describe(token: Token<'_>) -> String {
        match token.kind {
            TokenKind::Eof => "end of input".to_string(),
            _ => token.lexeme.to_string(),
        }
    }

    pub(crate) fn expect(&mut self, kind: TokenKind) -> Result<Token<'ast>> {
        if self.check(kind) {
            return Ok(self.advance());
        }
        Err(self.syntax_error(format!(
            "Expected '{}', found '{}' instead",
            kind.text(),
            Self::describe(self.peek())
        )))
    }

    pub(crate) fn expect_identifier(&mut self) -> Result<&'ast str> {
        let token = self.peek();
        if token.kind == TokenKind::Identifier {
            self.advance();
            return Ok(token.lexeme);
        }
        Err(self.syntax_error(format!(
            "Expected an identifier, found '{}' instead",
            Self::describe(token)
        )))
    }

    /// Index of the first token at or after `from`, at bracket depth zero,
    /// whose kind satisfies `stop`. Returns the index of EOF if none does.
    pub(crate) fn find_at_depth0(&self, from: usize, stop: impl Fn(TokenKind) -> bool) -> usize {
        let mut depth = 0usize;
        let mut idx = from;
        loop {
            let kind = self.tokens.get(idx).kind;
            if kind == TokenKind::Eof {
                return idx;
            }
            if depth == 0 && stop(kind) {
                return idx;
            }
            match kind {
                TokenKind::LeftParen | TokenKind::LeftBracket | TokenKind::LeftBrace => depth += 1,
                TokenKind::RightParen | TokenKind::RightBracket | TokenKind::RightBrace => {
                    if depth == 0 {
                        return idx;
                    }
                    depth -= 1;
                }
                _ => {}
            }
            idx += 1;
        }
    }

    // =========================================================================
    // Diagnostics
    // =========================================================================

    /// The token errors are reported at: the one consumed last.
    fn error_token(&self) -> Token<'ast> {
        self.tokens.get(self.pos.saturating_sub(1))
    }

    pub(crate) fn current_line(&self) -> u32 {
        self.error_token().line()
    }

    pub(crate) fn current_section(&self) -> u16 {
        self.error_token().section
    }

    pub(crate) fn section_name(&self) -> &str {
        self.tokens.section_name(self.error_token().section)
    }

    pub(crate) fn error(&self, kind: CompileErrorKind, message: impl Into<String>) -> CompileError {
        CompileError::new(kind, message, self.section_name(), self.current_line())
    }

    pub(crate) fn syntax_error(&self, message: impl Into<String>) -> CompileError {
        self.error(CompileErrorKind::Syntax, message)
    }

    pub(crate) fn semantic_error(&self, message: impl Into<String>) -> CompileError {
        self.error(CompileErrorKind::Semantic, message)
    }

    pub(crate) fn internal_error(&self, message: impl Into<String>) -> CompileError {
        self.error(CompileErrorKind::Internal, message)
    }

    pub(crate) fn warn(&mut self, message: impl Into<String>) {
        self.warn_at(self.error_token(), message);
    }

    /// Warn about the code starting at `token`.
    pub(crate) fn warn_at(&mut self, token: Token<'ast>, message: impl Into<String>) {
        if self.muted > 0 {
            return;
        }
        let message = message.into();
        let line = token.line();
        let section = self.tokens.section_name(token.section).to_string();
        if self.options.contains(CompileOptions::SHOW_WARNINGS) {
            log::warn!("{section}:{line}: {message}");
        }
        self.diagnostics.add_warning(message, section, line);
    }

    // =========================================================================
    // Emission
    // =========================================================================

    #[inline]
    pub(crate) fn emit(&mut self, op: Opcode, args: &[i32]) {
        self.script.write_cmd(op, args);
    }

    #[inline]
    pub(crate) fn emit_regs(&mut self, op: Opcode, regs: &[Register]) {
        self.script.write_reg_cmd(op, regs);
    }

    /// `reg = value`; notes when AX is overwritten.
    pub(crate) fn lit_to_reg(&mut self, reg: Register, value: i32) {
        if reg == Register::Ax {
            self.ax_clobbered = true;
        }
        self.script.lit_to_reg(reg, value);
    }

    pub(crate) fn push_reg(&mut self, reg: Register) {
        self.emit_regs(Opcode::PushReg, &[reg]);
        self.scope.adjust(crate::bytecode::STACK_CELL_SIZE as i32);
    }

    pub(crate) fn pop_reg(&mut self, reg: Register) {
        self.emit_regs(Opcode::PopReg, &[reg]);
        self.scope.adjust(-(crate::bytecode::STACK_CELL_SIZE as i32));
    }

    /// Allocate `bytes` on the stack.
    pub(crate) fn add_sp(&mut self, bytes: i32) {
        if bytes > 0 {
            self.emit(Opcode::Add, &[Register::Sp.into(), bytes]);
            self.scope.adjust(bytes);
        }
    }

    /// Release `bytes` of stack.
    pub(crate) fn sub_sp(&mut self, bytes: i32) {
        if bytes > 0 {
            self.emit(Opcode::Sub, &[Register::Sp.into(), bytes]);
            self.scope.adjust(-bytes);
        }
    }

    /// `SUB SP` on a path that leaves the current block (`return`,
    /// `break`); the block's own bookkeeping is unchanged.
    pub(crate) fn sub_sp_on_exit(&mut self, bytes: i32) {
        if bytes > 0 {
            self.emit(Opcode::Sub, &[Register::Sp.into(), bytes]);
        }
    }

    /// `MAR = SP - distance` for the storage at `offset` in the local block.
    pub(crate) fn load_sp_offs(&mut self, offset: i32) {
        let distance = self.scope.sp_distance(offset);
        self.emit(Opcode::LoadSpOffs, &[distance]);
    }

    /// Emit a forward jump to be patched later.
    pub(crate) fn jump(&mut self, op: Opcode) -> PendingJump {
        PendingJump::emit(&mut self.script, op)
    }

    pub(crate) fn patch_here(&mut self, jump: PendingJump) {
        jump.patch_here(&mut self.script);
        self.jump_target = Some(self.script.code_size());
    }

    pub(crate) fn patch_list_here(&mut self, list: &mut JumpList) {
        if !list.is_empty() {
            list.patch_here(&mut self.script);
            self.jump_target = Some(self.script.code_size());
        }
    }

    /// Note that control can arrive at the current end of code by a jump.
    pub(crate) fn mark_jump_target(&mut self) {
        self.jump_target = Some(self.script.code_size());
    }

    /// Whether control can reach the end of the code emitted so far.
    pub(crate) fn is_reachable(&self) -> bool {
        let ends_flow = self.script.last_opcode().is_some_and(Opcode::ends_flow)
            && self.script.last_cmd_position().is_some();
        !ends_flow || self.jump_target == Some(self.script.code_size())
    }

    pub(crate) fn restore_point(&self) -> RestorePoint {
        RestorePoint::new(&self.script)
    }

    /// Roll the code back to `rp`, forgetting calls made in the dropped code.
    pub(crate) fn restore(&mut self, rp: RestorePoint) {
        rp.restore(&mut self.script);
        self.callpoints.forget_from(rp.code_len());
        if self.jump_target.is_some_and(|t| t > rp.code_len()) {
            self.jump_target = None;
        }
    }

    /// Compile something only to learn about it: the code is thrown away,
    /// the token position is reset and warnings are suppressed.
    ///
    /// Returns the result and the token position the compilation ended at.
    pub(crate) fn dry_run<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<(T, usize)> {
        let start = self.pos;
        let rp = self.restore_point();
        let stack = self.scope.offset();
        let clobbered = self.ax_clobbered;
        let last_line = self.last_line;
        self.muted += 1;
        let result = f(self);
        self.muted -= 1;
        let end = self.pos;
        self.restore(rp);
        self.pos = start;
        self.scope.adjust(stack - self.scope.offset());
        self.ax_clobbered = clobbered;
        self.last_line = last_line;
        result.map(|value| (value, end))
    }

    // =========================================================================
    // Line numbers
    // =========================================================================

    /// Emit `LINENUM` for `line` unless it was the last one emitted.
    pub(crate) fn mark_line(&mut self, line: u32) {
        if self.options.contains(CompileOptions::LINE_NUMBERS) && line != self.last_line {
            self.script.write_line_number(line);
            self.last_line = line;
        }
    }

    /// Make the next [`mark_line`](Self::mark_line) emit unconditionally.
    pub(crate) fn forget_line(&mut self) {
        self.last_line = 0;
    }

    // =========================================================================
    // Function context
    // =========================================================================

    pub(crate) fn current_function(&self) -> Option<&FunctionDef> {
        self.current_func.map(|id| self.symbols.function(id))
    }

    /// Struct of the member function being compiled.
    pub(crate) fn current_struct(&self) -> Option<TypeId> {
        self.current_function().and_then(|f| f.struct_of)
    }

    /// Whether `this` is available.
    pub(crate) fn has_this(&self) -> bool {
        self.current_function().is_some_and(FunctionDef::needs_object)
    }
}
