//! Expression failure kinds.
//!
//! Parse and compile failures abort the containing command; evaluation
//! failures abort the current row. Soft type mismatches inside operator
//! application do not raise — they record a message on the runtime and
//! yield a null value.

use thiserror::Error;

/// Failure in the expression pipeline.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ExprError {
    /// The tokenizer or compiler could not proceed.
    #[error("parse failed at byte {position}: {message}")]
    ParseFailed { position: usize, message: String },

    /// An operator token carries a symbol outside the operator set.
    #[error("unknown operator `{0}`")]
    UnknownOperator(String),

    /// An operand pop found the value stack empty.
    #[error("stack underflow at `{0}`")]
    StackUnderflow(String),

    /// `=` executed with no pending assignment target.
    #[error("assignment without a target variable")]
    AssignmentWithoutTarget,

    /// A function token has no method binding in the runtime.
    #[error("method not found: {0}")]
    MethodNotFound(String),

    /// A bound method reported failure.
    #[error("method call failed: {name} - {message}")]
    MethodCallFailed { name: String, message: String },

    /// Integer division or modulo by zero.
    #[error("division by zero")]
    DivisionByZero,
}
