//! Local variable declarations.
//!
//! A local lives at the top of the stack when it is declared. Word sized
//! variables are initialized by pushing AX; everything else is zeroed or
//! written through MAR and then allocated with `ADD SP`:
//!
//! ```text
//! int a = 5;       LITTOREG AX 5; PUSHREG AX
//! Obj *o;          LOADSPOFFS 0; MEMZEROPTR; ADD SP 4
//! int arr[3];      LOADSPOFFS 0; ZEROMEMORY 12; ADD SP 12
//! ```

use agscript_parser::TokenKind;

use crate::bytecode::{Opcode, Register, STACK_CELL_SIZE};
use crate::compiler::{Compiler, Result};
use crate::expr::ConversionContext;
use crate::scope::LocalVar;
use crate::symbols::GlobalSymbol;
use crate::types::VarType;

impl<'a, 'ast> Compiler<'a, 'ast> {
    /// `[readonly] type name [= value], ...;`
    pub(crate) fn compile_local_declaration(&mut self) -> Result<()> {
        let readonly = self.eat(TokenKind::Readonly);
        let is_const = self.eat(TokenKind::Const);
        let base = self.parse_type(is_const)?;
        loop {
            let name = self.expect_identifier()?;
            self.check_local_name(name)?;
            let vartype = self.parse_array_suffix(base.clone(), Some(name))?;
            self.check_variable_type(&vartype, name, false)?;
            let offset = self.scope.offset();

            if self.eat(TokenKind::Equal) {
                self.initialize_local(&vartype, name)?;
            } else {
                self.zero_local(&vartype);
            }

            // Declared only now: the initializer cannot see the variable.
            let declared = self.scope.declare(LocalVar {
                name: name.to_string(),
                vartype: vartype.clone(),
                offset,
                depth: 0,
                readonly: readonly || (is_const && !vartype.is_old_string()),
                is_param: false,
            });
            if declared.is_err() {
                return Err(self.internal_error(format!("'{name}' was declared twice")));
            }
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::Semicolon)?;
        Ok(())
    }

    fn check_local_name(&mut self, name: &str) -> Result<()> {
        if self.scope.is_declared_in_current_scope(name) {
            return Err(self.semantic_error(format!("'{name}' has already been defined in this scope")));
        }
        // Parameters live one level above the function body.
        if self.scope.depth() == 2 && self.scope.get(name).is_some_and(|v| v.is_param) {
            return Err(self.semantic_error(format!("'{name}' has already been defined as a parameter")));
        }
        match self.symbols.find(name) {
            Some(GlobalSymbol::Function(_)) => {
                self.warn(format!("This hides the function '{name}()'"));
                Ok(())
            }
            Some(GlobalSymbol::Constant { enum_type, .. }) => {
                let enum_name = self.symbols.types.name(enum_type).to_string();
                self.warn(format!("This hides the enum value '{name}' of '{enum_name}'"));
                Ok(())
            }
            Some(GlobalSymbol::Type(_)) => Err(self.semantic_error(format!(
                "'{name}' is the name of a type"
            ))),
            _ => Ok(()),
        }
    }

    /// Allocate a variable without an initializer.
    fn zero_local(&mut self, vartype: &VarType) {
        let size = vartype.size(&self.symbols.types) as i32;
        if size == STACK_CELL_SIZE as i32 && !vartype.is_dyn() {
            self.lit_to_reg(Register::Ax, 0);
            self.push_reg(Register::Ax);
            return;
        }
        self.emit(Opcode::LoadSpOffs, &[0]);
        if vartype.is_dyn() {
            self.emit(Opcode::MemZeroPtr, &[]);
        } else {
            self.emit(Opcode::ZeroMemory, &[size]);
        }
        self.add_sp(size);
    }

    /// Allocate a variable and give it the value after `=`.
    fn initialize_local(&mut self, vartype: &VarType, name: &str) -> Result<()> {
        if (!vartype.is_scalar() && !vartype.is_dynarray()) || vartype.is_struct_instance() {
            return Err(self.semantic_error(format!(
                "Cannot assign an initial value to '{name}'"
            )));
        }
        if self.at_expression_end() {
            return Err(self.syntax_error(format!(
                "Expected the initial value of '{name}', found '{}' instead",
                Self::describe(self.peek())
            )));
        }

        if vartype.is_old_string() {
            let offset = self.scope.offset();
            self.zero_local(vartype);
            let value_type = self.compile_expression_to_ax()?;
            self.convert_ax(&value_type, vartype, ConversionContext::Assignment)?;
            self.load_sp_offs(offset);
            self.emit_string_copy();
            return Ok(());
        }

        let value_type = self.compile_expression_to_ax()?;
        self.convert_ax(&value_type, vartype, ConversionContext::Assignment)?;
        let size = vartype.size(&self.symbols.types) as i32;
        if size == STACK_CELL_SIZE as i32 && !vartype.is_dyn() {
            self.push_reg(Register::Ax);
            return Ok(());
        }
        self.emit(Opcode::LoadSpOffs, &[0]);
        let write = if vartype.is_dyn() {
            Opcode::MemInitPtr
        } else {
            self.write_opcode(vartype)
        };
        self.emit_regs(write, &[Register::Ax]);
        self.add_sp(size);
        Ok(())
    }
}
