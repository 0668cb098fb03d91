//! Errors produced by value coercion and operator application.

use thiserror::Error;

/// Failure while applying a binary operator to two values.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ValueError {
    /// The operands could not be brought to a common variant, or the
    /// operator is not defined for that variant.
    #[error("type mismatch: cannot apply `{operator}` to {left} and {right}")]
    TypeMismatch {
        /// Operator symbol as written in the expression.
        operator: &'static str,
        /// Variant name of the left operand.
        left: &'static str,
        /// Variant name of the right operand.
        right: &'static str,
    },

    /// Integer division or modulo with a zero divisor.
    #[error("division by zero")]
    DivisionByZero,

    /// The operator symbol is not part of the operator set.
    #[error("unknown operator `{0}`")]
    UnknownOperator(String),
}
