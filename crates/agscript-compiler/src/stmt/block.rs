//! Blocks and the release of local variables.

use agscript_parser::TokenKind;

use crate::bytecode::Opcode;
use crate::compiler::{Compiler, Result};
use crate::types::{ArrayShape, TypeId, VarType};

impl<'a, 'ast> Compiler<'a, 'ast> {
    /// Compile `{ ... }`.
    pub(crate) fn compile_block(&mut self) -> Result<()> {
        self.expect(TokenKind::LeftBrace)?;
        self.scope.push_scope();
        while !self.check(TokenKind::RightBrace) {
            if self.check(TokenKind::Eof) {
                return Err(self.syntax_error("Unexpected end of input; a '}' is missing"));
            }
            self.compile_statement()?;
        }
        self.advance();
        self.exit_block();
        Ok(())
    }

    /// Leave the innermost scope: release its managed pointers and give its
    /// stack space back. No code is emitted if control cannot get here.
    pub(crate) fn exit_block(&mut self) {
        let depth = self.scope.depth();
        let size = self.scope.size_from_depth(depth);
        if self.is_reachable() {
            self.free_dynpointers(depth);
            self.sub_sp(size);
        } else {
            self.scope.adjust(-size);
        }
        self.scope.pop_scope();
    }

    /// Emit code zeroing every managed pointer held by variables declared
    /// at `depth` or deeper. Returns whether any code was emitted.
    pub(crate) fn free_dynpointers(&mut self, depth: u32) -> bool {
        let vars: Vec<(i32, VarType)> = self
            .scope
            .vars_from_depth(depth)
            .filter(|v| v.vartype.contains_dyn(&self.symbols.types))
            .map(|v| (v.offset, v.vartype.clone()))
            .collect();
        let mut emitted = false;
        for (offset, vartype) in vars {
            emitted |= self.free_dynpointers_at(offset, &vartype);
        }
        emitted
    }

    fn free_dynpointers_at(&mut self, offset: i32, vartype: &VarType) -> bool {
        if vartype.is_dyn() {
            self.load_sp_offs(offset);
            self.emit(Opcode::MemZeroPtr, &[]);
            return true;
        }
        if let ArrayShape::Static(dims) = &vartype.array {
            let count: u32 = dims.iter().product();
            let element = VarType {
                array: ArrayShape::Scalar,
                ..vartype.clone()
            };
            let size = element.size(&self.symbols.types);
            let mut emitted = false;
            for k in 0..count {
                emitted |= self.free_dynpointers_at(offset + (k * size) as i32, &element);
            }
            return emitted;
        }
        let fields: Vec<(u32, VarType)> = vartype
            .struct_id()
            .filter(|_| !vartype.pointer)
            .map(|id| self.all_fields(id))
            .unwrap_or_default();
        let mut emitted = false;
        for (field_offset, field_type) in fields {
            if field_type.contains_dyn(&self.symbols.types) {
                emitted |= self.free_dynpointers_at(offset + field_offset as i32, &field_type);
            }
        }
        emitted
    }

    /// Fields of a struct and the structs it extends.
    fn all_fields(&self, id: TypeId) -> Vec<(u32, VarType)> {
        let types = &self.symbols.types;
        let mut fields = Vec::new();
        let mut current = Some(id);
        while let Some(sid) = current {
            let Some(def) = types.struct_def(sid) else { break };
            fields.extend(def.fields().map(|f| (f.offset, f.vartype.clone())));
            current = def.parent;
        }
        fields
    }
}
