//! Statement compilation.
//!
//! Statements are compiled straight from the token list by further `impl`
//! blocks on [`Compiler`]:
//! - Blocks with scoping and cleanup of local variables
//! - Local variable declarations with initialization
//! - `if`/`else`, `while`, `do`/`while`, `for` and `switch`
//! - `return`, `break`, `continue` and `fallthrough`
//!
//! Every statement that starts on a new source line is preceded by a
//! `LINENUM` when line numbers are enabled.

mod block;
mod do_while_stmt;
mod for_stmt;
mod if_stmt;
mod return_stmt;
mod switch_stmt;
mod var_decl;
mod while_stmt;

use agscript_parser::TokenKind;

use crate::compiler::{Compiler, Result};

impl<'a, 'ast> Compiler<'a, 'ast> {
    /// Compile the statement at the cursor.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub(crate) fn compile_statement(&mut self) -> Result<()> {
        let token = self.peek();
        if !self.is_reachable() {
            self.warn_at(token, "Code execution cannot reach this point");
        }
        log::trace!("statement '{}' on line {}", token.lexeme, token.line());

        match token.kind {
            TokenKind::LeftBrace => self.compile_block(),
            TokenKind::Semicolon => {
                self.advance();
                Ok(())
            }
            kind => {
                self.mark_line(token.line());
                match kind {
                    TokenKind::If => self.compile_if(),
                    TokenKind::While => self.compile_while(),
                    TokenKind::Do => self.compile_do_while(),
                    TokenKind::For => self.compile_for(),
                    TokenKind::Switch => self.compile_switch(),
                    TokenKind::Return => self.compile_return(),
                    TokenKind::Break => self.compile_break(),
                    TokenKind::Continue => self.compile_continue(),
                    TokenKind::Fallthrough => self.compile_fallthrough(),
                    TokenKind::Case | TokenKind::Default => Err(self.syntax_error(format!(
                        "'{}' is only allowed directly inside a switch",
                        kind.text()
                    ))),
                    TokenKind::Else => Err(self.syntax_error("'else' without a matching 'if'")),
                    _ if self.at_declaration() => self.compile_local_declaration(),
                    _ => self.compile_simple_statement(TokenKind::Semicolon),
                }
            }
        }
    }

    /// The body of `if`, `else` and the loops: a single statement with its
    /// own scope, so that `if (a) int x = 1;` cleans up after itself.
    pub(crate) fn compile_controlled_statement(&mut self) -> Result<()> {
        self.scope.push_scope();
        self.compile_statement()?;
        self.exit_block();
        Ok(())
    }
}
