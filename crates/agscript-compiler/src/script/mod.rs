//! The compiled script object.
//!
//! [`CompiledScript`] is what one compilation produces: the code words,
//! the relocation table, imports, exports, the string pool, the initial
//! global data and the section and line tables. It is grown monotonically
//! while the parser runs, except for the explicit operations that take code
//! back out again ([`CompiledScript::yank_chunk`] and
//! [`RestorePoint`](crate::emit::RestorePoint)).

mod chunk;
mod fixups;

pub use chunk::Chunk;
pub use fixups::{Fixup, FixupKind};

use std::fmt::Write as _;

use rustc_hash::FxHashMap;
use thiserror::Error;

use crate::bytecode::{EXPORT_OFFSET_LIMIT, Opcode, Register};

/// Failures of the script object's own bookkeeping.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScriptError {
    #[error("export offset too high; script data size too large?")]
    ExportOffsetTooHigh { name: String, offset: u32 },

    #[error("cannot yank code from offset {start}; the code is only {len} words long")]
    YankOutOfRange { start: usize, len: usize },
}

/// A published symbol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Export {
    pub name: String,
    /// `offset | (tag << 24)`, see [`EXPORT_FUNCTION`](crate::bytecode::EXPORT_FUNCTION).
    pub address: u32,
}

impl Export {
    pub fn offset(&self) -> u32 {
        self.address & (EXPORT_OFFSET_LIMIT - 1)
    }

    pub fn tag(&self) -> u32 {
        self.address >> 24
    }
}

/// Start of a source section within the code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub name: String,
    pub code_offset: u32,
}

/// One entry of the line table: code from `code_offset` on stems from `line`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineEntry {
    pub code_offset: u32,
    pub line: u32,
}

/// Output of a successful compilation.
#[derive(Debug, Clone, Default)]
pub struct CompiledScript {
    pub code: Vec<i32>,
    pub fixups: Vec<Fixup>,
    pub imports: Vec<String>,
    pub exports: Vec<Export>,
    pub strings: Vec<u8>,
    pub globaldata: Vec<u8>,
    pub sections: Vec<Section>,
    pub line_table: Vec<LineEntry>,
    /// Position of the most recent opcode word.
    last_cmd: Option<usize>,
    string_index: FxHashMap<Vec<u8>, u32>,
    import_index: FxHashMap<String, u32>,
}

impl CompiledScript {
    pub fn new() -> Self {
        Self::default()
    }

    // =========================================================================
    // Code
    // =========================================================================

    /// Number of words emitted so far.
    #[inline]
    pub fn code_size(&self) -> usize {
        self.code.len()
    }

    /// Append one raw word.
    #[inline]
    pub fn write_code(&mut self, word: i32) {
        self.code.push(word);
    }

    /// Append an instruction and its operands.
    pub fn write_cmd(&mut self, op: Opcode, args: &[i32]) {
        debug_assert_eq!(args.len(), op.operand_count(), "operand count of {op:?}");
        self.last_cmd = Some(self.code.len());
        self.code.push(op.into());
        self.code.extend_from_slice(args);
    }

    /// `reg = value`
    #[inline]
    pub fn lit_to_reg(&mut self, reg: Register, value: i32) {
        self.write_cmd(Opcode::LitToReg, &[reg.into(), value]);
    }

    /// Emit an instruction whose operands are all registers.
    pub fn write_reg_cmd(&mut self, op: Opcode, regs: &[Register]) {
        let words: Vec<i32> = regs.iter().map(|&r| r.into()).collect();
        self.write_cmd(op, &words);
    }

    /// The opcode of the most recently emitted instruction, if it is still
    /// part of the code.
    pub fn last_opcode(&self) -> Option<Opcode> {
        let pos = self.last_cmd?;
        let word = *self.code.get(pos)?;
        Opcode::try_from(word).ok()
    }

    /// Position of the most recently emitted instruction.
    pub fn last_cmd_position(&self) -> Option<usize> {
        self.last_cmd.filter(|&pos| pos < self.code.len())
    }

    /// Cut the code back to `len` words, dropping fixups and line entries
    /// that pointed into the removed part.
    pub fn truncate(&mut self, len: usize, last_cmd: Option<usize>) {
        self.code.truncate(len);
        let len = len as u32;
        while self.fixups.last().is_some_and(|f| f.offset >= len) {
            self.fixups.pop();
        }
        while self.line_table.last().is_some_and(|e| e.code_offset >= len) {
            self.line_table.pop();
        }
        self.last_cmd = last_cmd.filter(|&pos| (pos as u32) < len);
    }

    pub(crate) fn last_cmd_raw(&self) -> Option<usize> {
        self.last_cmd
    }

    /// Drop string pool entries and imports added after the tables had
    /// `strings_len` bytes and `imports_len` names.
    pub fn truncate_tables(&mut self, strings_len: usize, imports_len: usize) {
        if self.strings.len() > strings_len {
            self.strings.truncate(strings_len);
            self.string_index.retain(|_, offset| (*offset as usize) < strings_len);
        }
        if self.imports.len() > imports_len {
            self.imports.truncate(imports_len);
            self.import_index.retain(|_, idx| (*idx as usize) < imports_len);
        }
    }

    // =========================================================================
    // Fixups
    // =========================================================================

    /// Record that the word at `offset` needs relocating.
    ///
    /// Offsets are added in ascending order; code is only ever appended.
    pub fn add_fixup(&mut self, offset: u32, kind: FixupKind) {
        debug_assert!(self.fixups.last().is_none_or(|f| f.offset < offset));
        self.fixups.push(Fixup::new(offset, kind));
    }

    /// Record a fixup for the word written last.
    pub fn fixup_previous(&mut self, kind: FixupKind) {
        let offset = self.code.len().saturating_sub(1) as u32;
        self.add_fixup(offset, kind);
    }

    /// Code offsets of all fixups, in ascending order.
    pub fn fixup_offsets(&self) -> Vec<u32> {
        self.fixups.iter().map(|f| f.offset).collect()
    }

    /// Kind tags parallel to [`fixup_offsets`](Self::fixup_offsets).
    pub fn fixup_types(&self) -> Vec<u8> {
        self.fixups.iter().map(|f| f.kind.into()).collect()
    }

    // =========================================================================
    // Chunks
    // =========================================================================

    /// Remove `code[start..]` and the fixups inside it.
    pub fn yank_chunk(&mut self, start: usize, line: u32) -> Result<Chunk, ScriptError> {
        if start > self.code.len() {
            return Err(ScriptError::YankOutOfRange {
                start,
                len: self.code.len(),
            });
        }
        let code = self.code.split_off(start);
        let first_fixup = self.fixups.partition_point(|f| (f.offset as usize) < start);
        let fixups = self
            .fixups
            .split_off(first_fixup)
            .into_iter()
            .map(|f| (f.offset - start as u32, f.kind))
            .collect();
        while self.line_table.last().is_some_and(|e| e.code_offset as usize >= start) {
            self.line_table.pop();
        }
        self.last_cmd = self.last_cmd.filter(|&pos| pos < start);
        Ok(Chunk { code, fixups, line })
    }

    /// Append `chunk` at the current end of code, rebasing its fixups.
    ///
    /// Returns the offset the chunk now starts at.
    pub fn write_chunk(&mut self, chunk: &Chunk) -> usize {
        let base = self.code.len();
        self.code.extend_from_slice(&chunk.code);
        for &(offset, kind) in &chunk.fixups {
            self.add_fixup(base as u32 + offset, kind);
        }
        if !chunk.code.is_empty() {
            // The chunk came from complete instructions, so the last opcode
            // is unknown to us; treat the chunk start as the last command.
            self.last_cmd = Some(base);
        }
        base
    }

    // =========================================================================
    // Strings, globals, imports, exports
    // =========================================================================

    /// Add a NUL-terminated entry to the string pool, reusing an equal one.
    pub fn add_string(&mut self, text: &[u8]) -> u32 {
        if let Some(&offset) = self.string_index.get(text) {
            return offset;
        }
        let offset = self.strings.len() as u32;
        self.strings.extend_from_slice(text);
        self.strings.push(0);
        self.string_index.insert(text.to_vec(), offset);
        offset
    }

    /// Reserve `size` bytes of global data, copying in as much of `init` as
    /// fits and zeroing the rest.
    pub fn add_global(&mut self, size: u32, init: &[u8]) -> u32 {
        let offset = self.globaldata.len() as u32;
        let size = size as usize;
        let copied = init.len().min(size);
        self.globaldata.extend_from_slice(&init[..copied]);
        self.globaldata.resize(offset as usize + size, 0);
        offset
    }

    /// Index of `name` in the import table, adding it if needed.
    pub fn add_import(&mut self, name: &str) -> u32 {
        if let Some(&idx) = self.import_index.get(name) {
            return idx;
        }
        let idx = self.imports.len() as u32;
        self.imports.push(name.to_string());
        self.import_index.insert(name.to_string(), idx);
        idx
    }

    pub fn find_import(&self, name: &str) -> Option<u32> {
        self.import_index.get(name).copied()
    }

    /// The import table in loader form: an empty name terminates the list.
    pub fn imports_with_sentinel(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.imports.iter().map(String::as_str).collect();
        names.push("");
        names
    }

    /// Publish `name` at `offset`. Exporting the same name twice keeps the
    /// first entry.
    pub fn add_export(&mut self, name: &str, tag: u32, offset: u32) -> Result<(), ScriptError> {
        if offset >= EXPORT_OFFSET_LIMIT {
            return Err(ScriptError::ExportOffsetTooHigh {
                name: name.to_string(),
                offset,
            });
        }
        if self.exports.iter().any(|e| e.name == name) {
            return Ok(());
        }
        self.exports.push(Export {
            name: name.to_string(),
            address: offset | (tag << 24),
        });
        Ok(())
    }

    // =========================================================================
    // Sections and lines
    // =========================================================================

    pub fn start_new_section(&mut self, name: &str) {
        self.sections.push(Section {
            name: name.to_string(),
            code_offset: self.code.len() as u32,
        });
    }

    /// Emit `LINENUM line` and note it in the line table.
    pub fn write_line_number(&mut self, line: u32) {
        self.line_table.push(LineEntry {
            code_offset: self.code.len() as u32,
            line,
        });
        self.write_cmd(Opcode::LineNum, &[line as i32]);
    }

    /// Source line the instruction at `offset` stems from.
    pub fn line_at(&self, offset: u32) -> Option<u32> {
        let idx = self.line_table.partition_point(|e| e.code_offset <= offset);
        idx.checked_sub(1).map(|i| self.line_table[i].line)
    }

    // =========================================================================
    // Disassembly
    // =========================================================================

    /// Render the code as one instruction per line, for debugging and tests.
    pub fn disassemble(&self) -> String {
        let mut out = String::new();
        let mut pos = 0;
        let mut fixups = self.fixups.iter().peekable();
        while pos < self.code.len() {
            let word = self.code[pos];
            let Ok(op) = Opcode::try_from(word) else {
                let _ = writeln!(out, "{pos:6}: .word {word}");
                pos += 1;
                continue;
            };
            let _ = write!(out, "{pos:6}: {}", op.mnemonic());
            for i in 0..op.operand_count() {
                let at = pos + 1 + i;
                let Some(&arg) = self.code.get(at) else { break };
                let sep = if i == 0 { " " } else { ", " };
                let reg = op.operand_is_register(i).then(|| Register::try_from(arg).ok()).flatten();
                match reg {
                    Some(reg) => {
                        let _ = write!(out, "{sep}{}", reg.name());
                    }
                    None => {
                        let _ = write!(out, "{sep}{arg}");
                    }
                }
                while fixups.peek().is_some_and(|f| (f.offset as usize) < at) {
                    fixups.next();
                }
                if let Some(f) = fixups.peek().filter(|f| f.offset as usize == at) {
                    let _ = write!(out, " [{:?}]", f.kind);
                }
            }
            out.push('\n');
            pos += 1 + op.operand_count();
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytecode::{EXPORT_DATA, EXPORT_FUNCTION};

    #[test]
    fn write_cmd_tracks_last_opcode() {
        let mut script = CompiledScript::new();
        script.write_cmd(Opcode::ThisBase, &[0]);
        script.write_cmd(Opcode::Ret, &[]);
        assert_eq!(script.code, vec![38, 0, 5]);
        assert_eq!(script.last_opcode(), Some(Opcode::Ret));
        assert_eq!(script.last_cmd_position(), Some(2));
    }

    #[test]
    fn fixup_previous_marks_last_word() {
        let mut script = CompiledScript::new();
        script.lit_to_reg(Register::Mar, 8);
        script.fixup_previous(FixupKind::GlobalData);
        assert_eq!(script.fixups, vec![Fixup::new(2, FixupKind::GlobalData)]);
        assert_eq!(script.fixup_offsets(), vec![2]);
        assert_eq!(script.fixup_types(), vec![1]);
    }

    #[test]
    fn strings_are_deduplicated() {
        let mut script = CompiledScript::new();
        let a = script.add_string(b"abc");
        let b = script.add_string(b"de");
        let c = script.add_string(b"abc");
        assert_eq!(a, 0);
        assert_eq!(b, 4);
        assert_eq!(c, a);
        assert_eq!(script.strings, b"abc\0de\0");
    }

    #[test]
    fn globals_are_padded() {
        let mut script = CompiledScript::new();
        assert_eq!(script.add_global(4, &5i32.to_le_bytes()), 0);
        assert_eq!(script.add_global(8, b"hi"), 4);
        assert_eq!(script.globaldata.len(), 12);
        assert_eq!(&script.globaldata[4..8], b"hi\0\0");
    }

    #[test]
    fn imports_deduplicate_and_keep_indices() {
        let mut script = CompiledScript::new();
        assert_eq!(script.add_import("Display"), 0);
        assert_eq!(script.add_import("Wait"), 1);
        assert_eq!(script.add_import("Display"), 0);
        assert_eq!(script.find_import("Wait"), Some(1));
        assert_eq!(script.find_import("Say"), None);
        assert_eq!(script.imports_with_sentinel(), vec!["Display", "Wait", ""]);
    }

    #[test]
    fn exports_encode_tag() {
        let mut script = CompiledScript::new();
        script.add_export("main$0", EXPORT_FUNCTION, 12).unwrap();
        script.add_export("x", EXPORT_DATA, 4).unwrap();
        script.add_export("main$0", EXPORT_FUNCTION, 99).unwrap();
        assert_eq!(script.exports.len(), 2);
        assert_eq!(script.exports[0].address, 12 | (1 << 24));
        assert_eq!(script.exports[1].tag(), EXPORT_DATA);
        assert_eq!(script.exports[1].offset(), 4);

        let err = script.add_export("big", EXPORT_DATA, EXPORT_OFFSET_LIMIT).unwrap_err();
        assert_eq!(err.to_string(), "export offset too high; script data size too large?");
    }

    #[test]
    fn yank_and_rewrite_chunk_rebases_fixups() {
        let mut script = CompiledScript::new();
        script.write_cmd(Opcode::ThisBase, &[0]);
        let start = script.code_size();
        script.lit_to_reg(Register::Ax, 7);
        script.fixup_previous(FixupKind::String);

        let chunk = script.yank_chunk(start, 3).unwrap();
        assert_eq!(script.code_size(), 2);
        assert!(script.fixups.is_empty());
        assert_eq!(chunk.fixups, vec![(2, FixupKind::String)]);
        assert_eq!(chunk.line, 3);

        script.write_cmd(Opcode::PushReg, &[Register::Bx.into()]);
        let base = script.write_chunk(&chunk);
        assert_eq!(base, 4);
        assert_eq!(script.fixups, vec![Fixup::new(6, FixupKind::String)]);
        assert_eq!(&script.code[4..], &[6, 3, 7]);
    }

    #[test]
    fn yank_past_end_fails() {
        let mut script = CompiledScript::new();
        assert!(script.yank_chunk(1, 0).is_err());
        assert!(script.yank_chunk(0, 0).unwrap().is_empty());
    }

    #[test]
    fn truncate_drops_trailing_records() {
        let mut script = CompiledScript::new();
        script.write_line_number(1);
        let len = script.code_size();
        let last = script.last_cmd_raw();
        script.write_line_number(2);
        script.lit_to_reg(Register::Mar, 0);
        script.fixup_previous(FixupKind::GlobalData);
        script.truncate(len, last);
        assert_eq!(script.code, vec![36, 1]);
        assert!(script.fixups.is_empty());
        assert_eq!(script.line_table.len(), 1);
        assert_eq!(script.last_opcode(), Some(Opcode::LineNum));
    }

    #[test]
    fn truncate_tables_forgets_late_entries() {
        let mut script = CompiledScript::new();
        script.add_string(b"keep");
        script.add_import("Display");
        script.add_string(b"drop");
        script.add_import("Wait");
        script.truncate_tables(5, 1);
        assert_eq!(script.strings, b"keep\0");
        assert_eq!(script.imports, vec!["Display".to_string()]);
        assert_eq!(script.find_import("Wait"), None);
        assert_eq!(script.add_string(b"drop"), 5);
        assert_eq!(script.add_import("Wait"), 1);
    }

    #[test]
    fn line_lookup() {
        let mut script = CompiledScript::new();
        script.write_line_number(3);
        script.write_cmd(Opcode::Ret, &[]);
        script.write_line_number(9);
        assert_eq!(script.line_at(2), Some(3));
        assert_eq!(script.line_at(3), Some(9));
    }

    #[test]
    fn disassemble_names_registers_and_fixups() {
        let mut script = CompiledScript::new();
        script.write_cmd(Opcode::ThisBase, &[0]);
        script.lit_to_reg(Register::Mar, 4);
        script.fixup_previous(FixupKind::GlobalData);
        script.write_reg_cmd(Opcode::MemRead, &[Register::Ax]);
        script.write_cmd(Opcode::Ret, &[]);
        let text = script.disassemble();
        let lines: Vec<&str> = text.lines().map(str::trim).collect();
        assert_eq!(lines[0], "0: thisaddr 0");
        assert_eq!(lines[1], "2: mov mar, 4 [GlobalData]");
        assert_eq!(lines[2], "5: memread4 ax");
        assert_eq!(lines[3], "7: ret");
    }
}
