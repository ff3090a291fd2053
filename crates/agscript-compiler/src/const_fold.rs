//! Compile-time evaluation of operators on constant operands.

use std::fmt;

use crate::operators::{BinaryOp, UnaryOp};

/// A value known at compile time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConstValue {
    Int(i32),
    Float(f32),
}

impl ConstValue {
    /// The word the value is stored as in code or data.
    pub fn to_word(self) -> i32 {
        match self {
            ConstValue::Int(v) => v,
            ConstValue::Float(v) => v.to_bits() as i32,
        }
    }

    pub fn is_true(self) -> bool {
        match self {
            ConstValue::Int(v) => v != 0,
            ConstValue::Float(v) => v != 0.0,
        }
    }
}

impl fmt::Display for ConstValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstValue::Int(v) => write!(f, "{v}"),
            ConstValue::Float(v) => write!(f, "{v:?}"),
        }
    }
}

fn truth(b: bool) -> ConstValue {
    ConstValue::Int(b as i32)
}

/// Evaluate `lhs op rhs`.
///
/// Errors name both operands, e.g. "Overflow when calculating '2147483647 + 1'".
pub fn fold_binary(op: BinaryOp, lhs: ConstValue, rhs: ConstValue) -> Result<ConstValue, String> {
    let expr = || format!("'{lhs} {} {rhs}'", op.symbol());
    match (lhs, rhs) {
        (ConstValue::Int(a), ConstValue::Int(b)) => {
            let overflow = || format!("Overflow when calculating {}", expr());
            let value = match op {
                BinaryOp::Add => a.checked_add(b).ok_or_else(overflow)?,
                BinaryOp::Sub => a.checked_sub(b).ok_or_else(overflow)?,
                BinaryOp::Mul => a.checked_mul(b).ok_or_else(overflow)?,
                BinaryOp::Div | BinaryOp::Mod if b == 0 => {
                    return Err(format!("Division by zero when calculating {}", expr()));
                }
                BinaryOp::Div => a.checked_div(b).ok_or_else(overflow)?,
                BinaryOp::Mod => a.checked_rem(b).ok_or_else(overflow)?,
                BinaryOp::Shl | BinaryOp::Shr if b < 0 => {
                    return Err(format!("Negative shift count when calculating {}", expr()));
                }
                BinaryOp::Shl | BinaryOp::Shr if b >= 32 => {
                    return Err(format!("Shift count too large when calculating {}", expr()));
                }
                BinaryOp::Shl => {
                    let shifted = (a as i64) << b;
                    i32::try_from(shifted).map_err(|_| overflow())?
                }
                BinaryOp::Shr => a >> b,
                BinaryOp::BitAnd => a & b,
                BinaryOp::BitOr => a | b,
                BinaryOp::BitXor => a ^ b,
                BinaryOp::Eq => return Ok(truth(a == b)),
                BinaryOp::Ne => return Ok(truth(a != b)),
                BinaryOp::Gt => return Ok(truth(a > b)),
                BinaryOp::Lt => return Ok(truth(a < b)),
                BinaryOp::Ge => return Ok(truth(a >= b)),
                BinaryOp::Le => return Ok(truth(a <= b)),
                BinaryOp::And => return Ok(truth(a != 0 && b != 0)),
                BinaryOp::Or => return Ok(truth(a != 0 || b != 0)),
            };
            Ok(ConstValue::Int(value))
        }
        (ConstValue::Float(a), ConstValue::Float(b)) => {
            let value = match op {
                BinaryOp::Add => a + b,
                BinaryOp::Sub => a - b,
                BinaryOp::Mul => a * b,
                BinaryOp::Div if b == 0.0 => {
                    return Err(format!("Division by zero when calculating {}", expr()));
                }
                BinaryOp::Div => a / b,
                BinaryOp::Eq => return Ok(truth(a == b)),
                BinaryOp::Ne => return Ok(truth(a != b)),
                BinaryOp::Gt => return Ok(truth(a > b)),
                BinaryOp::Lt => return Ok(truth(a < b)),
                BinaryOp::Ge => return Ok(truth(a >= b)),
                BinaryOp::Le => return Ok(truth(a <= b)),
                BinaryOp::And => return Ok(truth(a != 0.0 && b != 0.0)),
                BinaryOp::Or => return Ok(truth(a != 0.0 || b != 0.0)),
                _ => {
                    return Err(format!(
                        "Operator '{}' cannot be applied to float values",
                        op.symbol()
                    ));
                }
            };
            if value.is_finite() {
                Ok(ConstValue::Float(value))
            } else {
                Err(format!("Overflow when calculating {}", expr()))
            }
        }
        _ => Err(format!(
            "Type mismatch: cannot combine int and float in {}",
            expr()
        )),
    }
}

/// Evaluate `op value`.
pub fn fold_unary(op: UnaryOp, value: ConstValue) -> Result<ConstValue, String> {
    match (op, value) {
        (UnaryOp::Neg, ConstValue::Int(v)) => v
            .checked_neg()
            .map(ConstValue::Int)
            .ok_or_else(|| format!("Overflow when calculating '-{v}'")),
        (UnaryOp::Neg, ConstValue::Float(v)) => Ok(ConstValue::Float(-v)),
        (UnaryOp::Not, v) => Ok(truth(!v.is_true())),
        (UnaryOp::BitNot, ConstValue::Int(v)) => Ok(ConstValue::Int(!v)),
        (UnaryOp::BitNot, ConstValue::Float(_)) => {
            Err("Operator '~' cannot be applied to float values".to_string())
        }
    }
}
