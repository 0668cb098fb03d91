//! Binary operator application over synchronized values.
//!
//! `apply` first synchronizes the operands, then dispatches on the shared
//! variant. The operator set is fixed; unknown symbols are rejected at
//! parse time by [`BinaryOp::from_symbol`].

use crate::errors::ValueError;
use crate::value::{synchronize, Value};

/// Binary operator of the expression language.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Lt,
    LtEq,
    Gt,
    GtEq,
    Eq,
    NotEq,
    And,
    Or,
    BitAnd,
    BitOr,
    BitXor,
}

impl BinaryOp {
    /// Resolve an operator symbol as written in an expression.
    ///
    /// The assignment symbol `=` is not a binary operator; the
    /// interpreter handles it before operand dispatch.
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        Some(match symbol {
            "+" => BinaryOp::Add,
            "-" => BinaryOp::Sub,
            "*" => BinaryOp::Mul,
            "/" => BinaryOp::Div,
            "%" => BinaryOp::Mod,
            "<" => BinaryOp::Lt,
            "<=" => BinaryOp::LtEq,
            ">" => BinaryOp::Gt,
            ">=" => BinaryOp::GtEq,
            "==" => BinaryOp::Eq,
            "!=" => BinaryOp::NotEq,
            "&&" => BinaryOp::And,
            "||" => BinaryOp::Or,
            "&" => BinaryOp::BitAnd,
            "|" => BinaryOp::BitOr,
            "^" => BinaryOp::BitXor,
            _ => return None,
        })
    }

    /// Operator symbol for error messages.
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::Lt => "<",
            BinaryOp::LtEq => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::GtEq => ">=",
            BinaryOp::Eq => "==",
            BinaryOp::NotEq => "!=",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
            BinaryOp::BitAnd => "&",
            BinaryOp::BitOr => "|",
            BinaryOp::BitXor => "^",
        }
    }
}

/// Apply a binary operator, synchronizing the operands first.
pub fn apply(op: BinaryOp, mut left: Value, mut right: Value) -> Result<Value, ValueError> {
    let mismatch = |left: &Value, right: &Value| ValueError::TypeMismatch {
        operator: op.symbol(),
        left: left.type_name(),
        right: right.type_name(),
    };

    if !synchronize(&mut left, &mut right) {
        return Err(mismatch(&left, &right));
    }

    match (&left, &right) {
        (Value::Int(a), Value::Int(b)) => eval_int(op, *a, *b),
        (Value::Float(a), Value::Float(b)) => eval_float(op, *a, *b).ok_or_else(|| mismatch(&left, &right)),
        (Value::Str(a), Value::Str(b)) => eval_string(op, a, b).ok_or_else(|| mismatch(&left, &right)),
        (Value::Bool(a), Value::Bool(b)) => eval_bool(op, *a, *b).ok_or_else(|| mismatch(&left, &right)),
        (Value::Null, Value::Null) => match op {
            // Two nulls compare unequal: null carries no identity.
            BinaryOp::Eq => Ok(Value::Bool(false)),
            BinaryOp::NotEq => Ok(Value::Bool(true)),
            _ => Err(mismatch(&left, &right)),
        },
        (Value::Ptr(a), Value::Ptr(b)) => match op {
            BinaryOp::Eq => Ok(Value::Bool(a == b)),
            BinaryOp::NotEq => Ok(Value::Bool(a != b)),
            _ => Err(mismatch(&left, &right)),
        },
        _ => Err(mismatch(&left, &right)),
    }
}

/// Integer operators: full arithmetic, comparison, bitwise, logical.
fn eval_int(op: BinaryOp, a: i64, b: i64) -> Result<Value, ValueError> {
    Ok(match op {
        BinaryOp::Add => Value::Int(a.wrapping_add(b)),
        BinaryOp::Sub => Value::Int(a.wrapping_sub(b)),
        BinaryOp::Mul => Value::Int(a.wrapping_mul(b)),
        BinaryOp::Div => {
            if b == 0 {
                return Err(ValueError::DivisionByZero);
            }
            Value::Int(a.wrapping_div(b))
        }
        BinaryOp::Mod => {
            if b == 0 {
                return Err(ValueError::DivisionByZero);
            }
            Value::Int(a.wrapping_rem(b))
        }
        BinaryOp::Lt => Value::Bool(a < b),
        BinaryOp::LtEq => Value::Bool(a <= b),
        BinaryOp::Gt => Value::Bool(a > b),
        BinaryOp::GtEq => Value::Bool(a >= b),
        BinaryOp::Eq => Value::Bool(a == b),
        BinaryOp::NotEq => Value::Bool(a != b),
        BinaryOp::And => Value::Bool(a != 0 && b != 0),
        BinaryOp::Or => Value::Bool(a != 0 || b != 0),
        BinaryOp::BitAnd => Value::Int(a & b),
        BinaryOp::BitOr => Value::Int(a | b),
        BinaryOp::BitXor => Value::Int(a ^ b),
    })
}

/// Float operators: arithmetic (IEEE division, no guard), comparison,
/// logical. Modulo and bitwise are integer-only.
fn eval_float(op: BinaryOp, a: f64, b: f64) -> Option<Value> {
    Some(match op {
        BinaryOp::Add => Value::Float(a + b),
        BinaryOp::Sub => Value::Float(a - b),
        BinaryOp::Mul => Value::Float(a * b),
        BinaryOp::Div => Value::Float(a / b),
        BinaryOp::Lt => Value::Bool(a < b),
        BinaryOp::LtEq => Value::Bool(a <= b),
        BinaryOp::Gt => Value::Bool(a > b),
        BinaryOp::GtEq => Value::Bool(a >= b),
        BinaryOp::Eq => Value::Bool(a == b),
        BinaryOp::NotEq => Value::Bool(a != b),
        BinaryOp::And => Value::Bool(a != 0.0 && b != 0.0),
        BinaryOp::Or => Value::Bool(a != 0.0 || b != 0.0),
        BinaryOp::Mod | BinaryOp::BitAnd | BinaryOp::BitOr | BinaryOp::BitXor => return None,
    })
}

/// String operators: concatenation, lexicographic comparison, logical
/// via emptiness.
fn eval_string(op: BinaryOp, a: &str, b: &str) -> Option<Value> {
    Some(match op {
        BinaryOp::Add => Value::Str(format!("{a}{b}")),
        BinaryOp::Lt => Value::Bool(a < b),
        BinaryOp::LtEq => Value::Bool(a <= b),
        BinaryOp::Gt => Value::Bool(a > b),
        BinaryOp::GtEq => Value::Bool(a >= b),
        BinaryOp::Eq => Value::Bool(a == b),
        BinaryOp::NotEq => Value::Bool(a != b),
        BinaryOp::And => Value::Bool(!a.is_empty() && !b.is_empty()),
        BinaryOp::Or => Value::Bool(!a.is_empty() || !b.is_empty()),
        _ => return None,
    })
}

/// Boolean operators: logical and equality only.
fn eval_bool(op: BinaryOp, a: bool, b: bool) -> Option<Value> {
    Some(match op {
        BinaryOp::And => Value::Bool(a && b),
        BinaryOp::Or => Value::Bool(a || b),
        BinaryOp::Eq => Value::Bool(a == b),
        BinaryOp::NotEq => Value::Bool(a != b),
        _ => return None,
    })
}
