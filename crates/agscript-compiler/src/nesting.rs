//! Enclosing loops and switches of the statement being compiled.
//!
//! `break` and `continue` need to know where to go and which local
//! variables they leave behind. Each loop or switch pushes a
//! [`NestingFrame`] that collects its pending `break` jumps; the jumps are
//! patched when the construct closes.

use crate::const_fold::ConstValue;
use crate::emit::{BackwardJumpDest, JumpList, PendingJump};
use crate::script::Chunk;
use crate::types::{FuncId, VarType};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NestingKind {
    While,
    Do,
    For,
    Switch,
}

impl NestingKind {
    pub fn is_loop(self) -> bool {
        !matches!(self, NestingKind::Switch)
    }
}

/// What a `case` compares the switch value against.
#[derive(Debug, Clone)]
pub enum CaseValue {
    Const(ConstValue),
    /// Code computing the value into AX, to be replayed in the comparison chain.
    Code {
        chunk: Chunk,
        callpoints: Vec<(usize, FuncId)>,
    },
}

#[derive(Debug, Clone)]
pub struct Case {
    pub value: CaseValue,
    /// Where the case's statements start.
    pub body: BackwardJumpDest,
    pub line: u32,
}

/// State of a `switch` being compiled.
#[derive(Debug, Clone)]
pub struct SwitchInfo {
    pub value_type: VarType,
    pub cases: Vec<Case>,
    pub default: Option<BackwardJumpDest>,
    /// `offset_to_local_var_block` at the `switch` keyword; case values
    /// are compiled against it since they run in the comparison chain.
    pub stack_offset: i32,
    /// The initial jump over the case bodies to the comparisons.
    pub to_compare: Option<PendingJump>,
    /// Code size where the current clause's statements began.
    pub clause_start: Option<usize>,
    /// A `fallthrough;` ended the current clause.
    pub fallthrough_marked: bool,
}

impl SwitchInfo {
    pub fn new(value_type: VarType, stack_offset: i32) -> Self {
        Self {
            value_type,
            cases: Vec::new(),
            default: None,
            stack_offset,
            to_compare: None,
            clause_start: None,
            fallthrough_marked: false,
        }
    }

    pub fn has_clauses(&self) -> bool {
        !self.cases.is_empty() || self.default.is_some()
    }
}

#[derive(Debug, Clone)]
pub struct NestingFrame {
    pub kind: NestingKind,
    /// Scope depth of the construct; `break` and `continue` release
    /// everything declared deeper.
    pub depth: u32,
    pub breaks: JumpList,
    pub continue_target: Option<BackwardJumpDest>,
    /// `continue` jumps of a loop whose condition comes after the body.
    pub continues: JumpList,
    pub switch: Option<SwitchInfo>,
}

impl NestingFrame {
    pub fn new(kind: NestingKind, depth: u32) -> Self {
        Self {
            kind,
            depth,
            breaks: JumpList::new(),
            continue_target: None,
            continues: JumpList::new(),
            switch: None,
        }
    }
}

#[derive(Debug, Default)]
pub struct NestingStack {
    frames: Vec<NestingFrame>,
}

impl NestingStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, frame: NestingFrame) {
        self.frames.push(frame);
    }

    pub fn pop(&mut self) -> Option<NestingFrame> {
        self.frames.pop()
    }

    pub fn clear(&mut self) {
        self.frames.clear();
    }

    /// The frame a `break` leaves.
    pub fn innermost_mut(&mut self) -> Option<&mut NestingFrame> {
        self.frames.last_mut()
    }

    pub fn innermost(&self) -> Option<&NestingFrame> {
        self.frames.last()
    }

    /// The loop a `continue` restarts; switches are skipped.
    pub fn innermost_loop(&self) -> Option<&NestingFrame> {
        self.frames.iter().rev().find(|f| f.kind.is_loop())
    }

    pub fn innermost_loop_mut(&mut self) -> Option<&mut NestingFrame> {
        self.frames.iter_mut().rev().find(|f| f.kind.is_loop())
    }

    /// The switch directly enclosing the current statement, if any.
    pub fn current_switch_mut(&mut self) -> Option<&mut SwitchInfo> {
        self.frames.last_mut()?.switch.as_mut()
    }
}
