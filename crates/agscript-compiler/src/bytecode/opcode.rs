//! Operation codes and registers of the AGS script VM.
//!
//! Every instruction is one opcode word followed by a fixed number of
//! operand words. The numbering is the one the VM loader expects and must
//! not change.

use num_enum::{IntoPrimitive, TryFromPrimitive};

/// Bytecode operation codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IntoPrimitive, TryFromPrimitive)]
#[repr(i32)]
pub enum Opcode {
    // =========================================================================
    // Register arithmetic with a literal
    // =========================================================================
    /// `reg += lit`
    Add = 1,
    /// `reg -= lit`
    Sub = 2,
    /// `reg2 = reg1`
    RegToReg = 3,
    /// Write a literal of the given size to `m[MAR]`.
    WriteLit = 4,
    /// Return from the current function.
    Ret = 5,
    /// `reg = lit`
    LitToReg = 6,

    // =========================================================================
    // Memory access through MAR
    // =========================================================================
    /// `reg = m[MAR]` (4 bytes)
    MemRead = 7,
    /// `m[MAR] = reg` (4 bytes)
    MemWrite = 8,

    // =========================================================================
    // Register/register arithmetic and comparisons
    // =========================================================================
    MulReg = 9,
    DivReg = 10,
    AddReg = 11,
    SubReg = 12,
    BitAnd = 13,
    BitOr = 14,
    IsEqual = 15,
    NotEqual = 16,
    Greater = 17,
    LessThan = 18,
    Gte = 19,
    Lte = 20,
    And = 21,
    Or = 22,

    // =========================================================================
    // Calls and narrow memory access
    // =========================================================================
    /// Call the script function whose code address is in the register.
    Call = 23,
    MemReadB = 24,
    MemReadW = 25,
    MemWriteB = 26,
    MemWriteW = 27,

    // =========================================================================
    // Jumps and stack
    // =========================================================================
    /// Jump if AX is zero. The operand is relative to the next word.
    Jz = 28,
    PushReg = 29,
    PopReg = 30,
    /// Unconditional relative jump.
    Jmp = 31,
    /// `reg *= lit`
    Mul = 32,
    /// Call the imported function whose import slot is in the register.
    CallExt = 33,
    /// Push onto the host stack used by imported functions.
    PushReal = 34,
    /// Drop arguments from the host stack.
    SubRealStack = 35,
    /// Current source line, for runtime error reports.
    LineNum = 36,
    CallAs = 37,
    /// Function entry marker; the operand is the entry's own code offset.
    ThisBase = 38,
    NumFuncArgs = 39,
    ModReg = 40,
    XorReg = 41,
    NotReg = 42,
    ShiftLeft = 43,
    ShiftRight = 44,
    /// Set the object register OP for the next member call.
    CallObj = 45,
    /// Abort unless `0 <= reg < lit`.
    CheckBounds = 46,

    // =========================================================================
    // Managed pointers
    // =========================================================================
    MemWritePtr = 47,
    MemReadPtr = 48,
    /// Release the managed pointer at `m[MAR]` and zero it.
    MemZeroPtr = 49,
    /// Store a pointer at `m[MAR]` and add a reference.
    MemInitPtr = 50,
    /// `MAR = SP - lit`
    LoadSpOffs = 51,
    /// Abort if MAR is null.
    CheckNull = 52,

    // =========================================================================
    // Float arithmetic
    // =========================================================================
    FAdd = 53,
    FSub = 54,
    FMulReg = 55,
    FDivReg = 56,
    FAddReg = 57,
    FSubReg = 58,
    FGreater = 59,
    FLessThan = 60,
    FGte = 61,
    FLte = 62,

    // =========================================================================
    // Miscellaneous
    // =========================================================================
    /// Zero `lit` bytes at `m[MAR]`.
    ZeroMemory = 63,
    /// Turn the C string in the register into a managed `String`.
    CreateString = 64,
    StringsEqual = 65,
    StringsNotEq = 66,
    CheckNullReg = 67,
    /// Disable the infinite loop detector for the current function.
    LoopCheckOff = 68,
    /// Zero the pointer at `m[MAR]` without disposing the object.
    MemZeroPtrNd = 69,
    /// Jump if AX is not zero.
    Jnz = 70,
    /// Bounds check against the dynamic array MAR points into.
    DynamicBounds = 71,
    /// `reg = new array[reg]`; operands: register, element size, managed flag.
    NewArray = 72,
    /// `reg = new object`; operands: register, object size.
    NewUserObject = 73,
}

impl Opcode {
    /// Number of operand words following this opcode.
    pub fn operand_count(self) -> usize {
        use Opcode::*;
        match self {
            Ret | MemZeroPtr | CheckNull | LoopCheckOff | MemZeroPtrNd => 0,
            MemRead | MemWrite | Call | MemReadB | MemReadW | MemWriteB | MemWriteW | Jz | PushReg
            | PopReg | Jmp | CallExt | PushReal | SubRealStack | LineNum | CallAs | ThisBase
            | NumFuncArgs | NotReg | CallObj | MemWritePtr | MemReadPtr | MemInitPtr | LoadSpOffs
            | ZeroMemory | CreateString | CheckNullReg | Jnz | DynamicBounds => 1,
            NewArray => 3,
            _ => 2,
        }
    }

    /// Assembler spelling used by the disassembler.
    pub fn mnemonic(self) -> &'static str {
        use Opcode::*;
        match self {
            Add => "add",
            Sub => "sub",
            RegToReg => "mov",
            WriteLit => "memwritelit",
            Ret => "ret",
            LitToReg => "mov",
            MemRead => "memread4",
            MemWrite => "memwrite4",
            MulReg => "mul",
            DivReg => "div",
            AddReg => "add",
            SubReg => "sub",
            BitAnd => "and",
            BitOr => "or",
            IsEqual => "cmpeq",
            NotEqual => "cmpne",
            Greater => "gt",
            LessThan => "lt",
            Gte => "gte",
            Lte => "lte",
            And => "and",
            Or => "or",
            Call => "call",
            MemReadB => "memread1",
            MemReadW => "memread2",
            MemWriteB => "memwrite1",
            MemWriteW => "memwrite2",
            Jz => "jzi",
            PushReg => "push",
            PopReg => "pop",
            Jmp => "jmpi",
            Mul => "mul",
            CallExt => "farcall",
            PushReal => "farpush",
            SubRealStack => "farsubsp",
            LineNum => "sourceline",
            CallAs => "callscr",
            ThisBase => "thisaddr",
            NumFuncArgs => "setfuncargs",
            ModReg => "mod",
            XorReg => "xor",
            NotReg => "not",
            ShiftLeft => "shl",
            ShiftRight => "shr",
            CallObj => "callobj",
            CheckBounds => "checkbounds",
            MemWritePtr => "memwrite.ptr",
            MemReadPtr => "memread.ptr",
            MemZeroPtr => "memwrite.ptr.0",
            MemInitPtr => "meminit.ptr",
            LoadSpOffs => "load.sp.offs",
            CheckNull => "checknull.ptr",
            FAdd => "f.add",
            FSub => "f.sub",
            FMulReg => "f.mul",
            FDivReg => "f.div",
            FAddReg => "f.add",
            FSubReg => "f.sub",
            FGreater => "f.gt",
            FLessThan => "f.lt",
            FGte => "f.gte",
            FLte => "f.lte",
            ZeroMemory => "zeromem",
            CreateString => "newstring",
            StringsEqual => "strings.==",
            StringsNotEq => "strings.!=",
            CheckNullReg => "checknull",
            LoopCheckOff => "loopcheckoff",
            MemZeroPtrNd => "memwrite.ptr.0.nd",
            Jnz => "jnzi",
            DynamicBounds => "dynamicbounds",
            NewArray => "newarray",
            NewUserObject => "newusrobj",
        }
    }

    /// Whether the operand at `index` names a register.
    ///
    /// Used by the disassembler to print `ax` instead of `3`.
    pub fn operand_is_register(self, index: usize) -> bool {
        use Opcode::*;
        match self {
            RegToReg | MulReg | DivReg | AddReg | SubReg | BitAnd | BitOr | IsEqual | NotEqual
            | Greater | LessThan | Gte | Lte | And | Or | ModReg | XorReg | ShiftLeft | ShiftRight
            | FMulReg | FDivReg | FAddReg | FSubReg | FGreater | FLessThan | FGte | FLte
            | StringsEqual | StringsNotEq => true,
            Add | Sub | LitToReg | Mul | CheckBounds | FAdd | FSub | NewArray | NewUserObject => {
                index == 0
            }
            MemRead | MemWrite | Call | MemReadB | MemReadW | MemWriteB | MemWriteW | PushReg
            | PopReg | CallExt | PushReal | CallAs | CallObj | MemWritePtr | MemReadPtr
            | MemInitPtr | CreateString | CheckNullReg | DynamicBounds | NotReg => true,
            _ => false,
        }
    }

    /// Whether this instruction transfers control unconditionally.
    pub fn ends_flow(self) -> bool {
        matches!(self, Opcode::Jmp | Opcode::Ret)
    }
}

/// VM registers as they are encoded in operands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IntoPrimitive, TryFromPrimitive)]
#[repr(i32)]
pub enum Register {
    /// Stack pointer.
    Sp = 1,
    /// Memory address register.
    Mar = 2,
    Ax = 3,
    Bx = 4,
    Cx = 5,
    /// Object pointer of the running member function.
    Op = 6,
    Dx = 7,
}

impl Register {
    pub fn name(self) -> &'static str {
        match self {
            Register::Sp => "sp",
            Register::Mar => "mar",
            Register::Ax => "ax",
            Register::Bx => "bx",
            Register::Cx => "cx",
            Register::Op => "op",
            Register::Dx => "dx",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbering_matches_vm() {
        assert_eq!(i32::from(Opcode::Add), 1);
        assert_eq!(i32::from(Opcode::Ret), 5);
        assert_eq!(i32::from(Opcode::Jz), 28);
        assert_eq!(i32::from(Opcode::Jmp), 31);
        assert_eq!(i32::from(Opcode::LineNum), 36);
        assert_eq!(i32::from(Opcode::ThisBase), 38);
        assert_eq!(i32::from(Opcode::Jnz), 70);
        assert_eq!(i32::from(Opcode::NewUserObject), 73);
    }

    #[test]
    fn round_trip_from_word() {
        for word in 1..=73 {
            let op = Opcode::try_from(word).unwrap();
            assert_eq!(i32::from(op), word);
        }
        assert!(Opcode::try_from(0).is_err());
        assert!(Opcode::try_from(74).is_err());
    }

    #[test]
    fn operand_counts() {
        assert_eq!(Opcode::Ret.operand_count(), 0);
        assert_eq!(Opcode::MemZeroPtr.operand_count(), 0);
        assert_eq!(Opcode::ThisBase.operand_count(), 1);
        assert_eq!(Opcode::LitToReg.operand_count(), 2);
        assert_eq!(Opcode::CheckBounds.operand_count(), 2);
        assert_eq!(Opcode::NewArray.operand_count(), 3);
        assert_eq!(Opcode::NewUserObject.operand_count(), 2);
    }

    #[test]
    fn registers() {
        assert_eq!(i32::from(Register::Sp), 1);
        assert_eq!(i32::from(Register::Dx), 7);
        assert_eq!(Register::try_from(6).unwrap(), Register::Op);
        assert_eq!(Register::Mar.name(), "mar");
    }
}
