//! Binary operators: priorities and the opcodes that implement them.
//!
//! Lower priority numbers bind tighter. Assignment and the ternary share
//! the loosest level.

use agscript_parser::TokenKind;

use crate::bytecode::Opcode;

pub const TERNARY_PRIORITY: u32 = 120;
/// Loosest level an expression can start at.
pub const LOWEST_PRIORITY: u32 = TERNARY_PRIORITY;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Mul,
    Div,
    Mod,
    Add,
    Sub,
    Shl,
    Shr,
    BitAnd,
    BitOr,
    BitXor,
    Eq,
    Ne,
    Gt,
    Lt,
    Ge,
    Le,
    And,
    Or,
}

impl BinaryOp {
    pub fn from_token(kind: TokenKind) -> Option<Self> {
        use TokenKind as T;
        Some(match kind {
            T::Star => BinaryOp::Mul,
            T::Slash => BinaryOp::Div,
            T::Percent => BinaryOp::Mod,
            T::Plus => BinaryOp::Add,
            T::Minus => BinaryOp::Sub,
            T::LessLess => BinaryOp::Shl,
            T::GreaterGreater => BinaryOp::Shr,
            T::Amp => BinaryOp::BitAnd,
            T::Pipe => BinaryOp::BitOr,
            T::Caret => BinaryOp::BitXor,
            T::EqualEqual => BinaryOp::Eq,
            T::BangEqual => BinaryOp::Ne,
            T::Greater => BinaryOp::Gt,
            T::Less => BinaryOp::Lt,
            T::GreaterEqual => BinaryOp::Ge,
            T::LessEqual => BinaryOp::Le,
            T::AmpAmp => BinaryOp::And,
            T::PipePipe => BinaryOp::Or,
            _ => return None,
        })
    }

    /// The operator a compound assignment such as `+=` applies.
    pub fn from_compound_assignment(kind: TokenKind) -> Option<Self> {
        use TokenKind as T;
        Some(match kind {
            T::PlusEqual => BinaryOp::Add,
            T::MinusEqual => BinaryOp::Sub,
            T::StarEqual => BinaryOp::Mul,
            T::SlashEqual => BinaryOp::Div,
            T::PercentEqual => BinaryOp::Mod,
            T::AmpEqual => BinaryOp::BitAnd,
            T::PipeEqual => BinaryOp::BitOr,
            T::CaretEqual => BinaryOp::BitXor,
            T::LessLessEqual => BinaryOp::Shl,
            T::GreaterGreaterEqual => BinaryOp::Shr,
            _ => return None,
        })
    }

    pub fn priority(self) -> u32 {
        use BinaryOp::*;
        match self {
            Mul | Div | Mod => 103,
            Add | Sub => 105,
            Shl | Shr => 107,
            BitAnd => 109,
            BitOr | BitXor => 110,
            Eq | Ne | Gt | Lt | Ge | Le => 112,
            And => 118,
            Or => 119,
        }
    }

    pub fn symbol(self) -> &'static str {
        use BinaryOp::*;
        match self {
            Mul => "*",
            Div => "/",
            Mod => "%",
            Add => "+",
            Sub => "-",
            Shl => "<<",
            Shr => ">>",
            BitAnd => "&",
            BitOr => "|",
            BitXor => "^",
            Eq => "==",
            Ne => "!=",
            Gt => ">",
            Lt => "<",
            Ge => ">=",
            Le => "<=",
            And => "&&",
            Or => "||",
        }
    }

    /// Operators whose result is a truth value.
    pub fn is_comparison(self) -> bool {
        use BinaryOp::*;
        matches!(self, Eq | Ne | Gt | Lt | Ge | Le | And | Or)
    }

    pub fn is_equality(self) -> bool {
        matches!(self, BinaryOp::Eq | BinaryOp::Ne)
    }

    /// Register/register instruction for integer operands.
    pub fn int_opcode(self) -> Opcode {
        use BinaryOp::*;
        match self {
            Mul => Opcode::MulReg,
            Div => Opcode::DivReg,
            Mod => Opcode::ModReg,
            Add => Opcode::AddReg,
            Sub => Opcode::SubReg,
            Shl => Opcode::ShiftLeft,
            Shr => Opcode::ShiftRight,
            BitAnd => Opcode::BitAnd,
            BitOr => Opcode::BitOr,
            BitXor => Opcode::XorReg,
            Eq => Opcode::IsEqual,
            Ne => Opcode::NotEqual,
            Gt => Opcode::Greater,
            Lt => Opcode::LessThan,
            Ge => Opcode::Gte,
            Le => Opcode::Lte,
            And => Opcode::And,
            Or => Opcode::Or,
        }
    }

    /// Register/register instruction for float operands, if there is one.
    pub fn float_opcode(self) -> Option<Opcode> {
        use BinaryOp::*;
        Some(match self {
            Mul => Opcode::FMulReg,
            Div => Opcode::FDivReg,
            Add => Opcode::FAddReg,
            Sub => Opcode::FSubReg,
            Eq => Opcode::IsEqual,
            Ne => Opcode::NotEqual,
            Gt => Opcode::FGreater,
            Lt => Opcode::FLessThan,
            Ge => Opcode::FGte,
            Le => Opcode::FLte,
            And => Opcode::And,
            Or => Opcode::Or,
            Mod | Shl | Shr | BitAnd | BitOr | BitXor => return None,
        })
    }

    /// Comparison of two strings.
    pub fn string_opcode(self) -> Option<Opcode> {
        match self {
            BinaryOp::Eq => Some(Opcode::StringsEqual),
            BinaryOp::Ne => Some(Opcode::StringsNotEq),
            _ => None,
        }
    }
}

/// Prefix operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Neg,
    Not,
    BitNot,
}

impl UnaryOp {
    pub fn from_token(kind: TokenKind) -> Option<Self> {
        match kind {
            TokenKind::Minus => Some(UnaryOp::Neg),
            TokenKind::Bang => Some(UnaryOp::Not),
            TokenKind::Tilde => Some(UnaryOp::BitNot),
            _ => None,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            UnaryOp::Neg => "-",
            UnaryOp::Not => "!",
            UnaryOp::BitNot => "~",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn multiplication_binds_tighter_than_addition() {
        assert!(BinaryOp::Mul.priority() < BinaryOp::Add.priority());
        assert!(BinaryOp::Add.priority() < BinaryOp::Shl.priority());
        assert!(BinaryOp::BitAnd.priority() < BinaryOp::BitOr.priority());
        assert!(BinaryOp::Eq.priority() < BinaryOp::And.priority());
        assert!(BinaryOp::And.priority() < BinaryOp::Or.priority());
        assert!(BinaryOp::Or.priority() < TERNARY_PRIORITY);
    }

    #[test]
    fn token_mapping() {
        assert_eq!(BinaryOp::from_token(TokenKind::Percent), Some(BinaryOp::Mod));
        assert_eq!(BinaryOp::from_token(TokenKind::Equal), None);
        assert_eq!(
            BinaryOp::from_compound_assignment(TokenKind::LessLessEqual),
            Some(BinaryOp::Shl)
        );
        assert_eq!(UnaryOp::from_token(TokenKind::Tilde), Some(UnaryOp::BitNot));
    }

    #[test]
    fn opcodes() {
        assert_eq!(BinaryOp::Add.int_opcode(), Opcode::AddReg);
        assert_eq!(BinaryOp::Add.float_opcode(), Some(Opcode::FAddReg));
        assert_eq!(BinaryOp::Mod.float_opcode(), None);
        assert_eq!(BinaryOp::Eq.string_opcode(), Some(Opcode::StringsEqual));
        assert_eq!(BinaryOp::Lt.string_opcode(), None);
    }
}
