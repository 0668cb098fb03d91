//! Embedded expression language for the sift analysis engine.
//!
//! Expressions are evaluated per row of a result table (filter
//! predicates, snippet transformations) or once per invocation. The
//! pipeline is the classic three-stage one:
//!
//! 1. [`tokenize`]: a table-driven lexer over two 256-byte character
//!    class tables (symbolic and keyword mode).
//! 2. [`compile`]: a shunting-yard pass producing a postfix program;
//!    [`compile_no_precedence`] preserves token order for input that is
//!    already in evaluation order, [`compile_with_precedence`] takes a
//!    caller-supplied precedence map.
//! 3. [`interpret`]: a stack machine over [`sift_value::Value`] with a
//!    [`Runtime`] holding variables, namespaced method groups, borrowed
//!    globals and an optional variable finder.
//!
//! # Usage
//!
//! ```
//! use sift_expr::evaluate_with_variables;
//! use sift_value::Value;
//!
//! let result = evaluate_with_variables("2 * 3 + 4", &[]);
//! assert_eq!(result, Ok(Value::Int(10)));
//! ```

mod compiler;
mod errors;
mod interpreter;
mod methods;
mod runtime;
mod token;
mod tokenizer;

pub use compiler::{compile, compile_no_precedence, compile_with_precedence, precedence, render};
pub use errors::ExprError;
pub use interpreter::{interpret, interpret_one};
pub use methods::{root_methods, string_methods};
pub use runtime::{MethodDescriptor, MethodFlags, MethodFn, Runtime};
pub use token::{Token, TokenKind, TokenType, ValueType};
pub use tokenizer::{tokenize, LexMode};

use sift_value::Value;

/// Tokenize, compile and run a formula-mode expression.
pub fn evaluate_expression(source: &str, runtime: &mut Runtime) -> Result<Value, ExprError> {
    let tokens = tokenize(source, LexMode::Formula)?;
    let program = compile(&tokens)?;
    interpret_one(&program, runtime)
}

/// Tokenize, compile and run a keyword-mode expression (`and`, `or`,
/// `not`, … accepted as operators; `=` reads as `==`).
pub fn evaluate_keyword_expression(source: &str, runtime: &mut Runtime) -> Result<Value, ExprError> {
    let tokens = tokenize(source, LexMode::Keyword)?;
    let program = compile(&tokens)?;
    interpret_one(&program, runtime)
}

/// One-shot evaluation with the standard method library and a variable
/// list.
pub fn evaluate_with_variables(
    source: &str,
    variables: &[(&str, Value)],
) -> Result<Value, ExprError> {
    let mut runtime = Runtime::with_standard_methods();
    for (name, value) in variables {
        runtime.set_variable(name, value.clone());
    }
    evaluate_expression(source, &mut runtime)
}
