//! Postfix stack machine.
//!
//! Executes a compiled program over a value stack. Soft failures (a
//! type mismatch inside an operator) record a message on the runtime
//! and push null; hard failures (missing method, stack underflow,
//! division by zero) abort the program.

use smallvec::SmallVec;
use tracing::trace;

use sift_value::{apply, BinaryOp, Value};

use crate::errors::ExprError;
use crate::runtime::{MethodFn, Runtime};
use crate::token::{Token, TokenType};

type ValueStack = SmallVec<[Value; 8]>;

/// Run a postfix program; the remaining stack is drained bottom to top.
pub fn interpret(program: &[Token], runtime: &mut Runtime) -> Result<Vec<Value>, ExprError> {
    trace!(tokens = program.len(), "interpret");
    let mut stack: ValueStack = SmallVec::new();
    // Name waiting for `=` when a variable lookup missed.
    let mut pending_assignment: Option<String> = None;

    for (at, token) in program.iter().enumerate() {
        match token.token_type() {
            TokenType::Value => stack.push(token.value()),
            TokenType::Variable | TokenType::Member => {
                lookup_variable(program, at, token, runtime, &mut stack, &mut pending_assignment);
            }
            TokenType::Operator => {
                run_operator(token.name(), runtime, &mut stack, &mut pending_assignment)?;
            }
            TokenType::Function => run_function(token, runtime, &mut stack)?,
            TokenType::Separator => match token.name() {
                ";" => stack.clear(),
                _ => {} // `,` frames arguments at compile time only
            },
            TokenType::Label | TokenType::End => {}
            _ => {
                return Err(ExprError::ParseFailed {
                    position: at,
                    message: format!("unexpected token `{}` in program", token.name()),
                })
            }
        }
    }

    Ok(stack.into_iter().collect())
}

/// Run a program and keep only the top of the stack.
pub fn interpret_one(program: &[Token], runtime: &mut Runtime) -> Result<Value, ExprError> {
    let mut values = interpret(program, runtime)?;
    Ok(values.pop().unwrap_or(Value::Null))
}

fn lookup_variable(
    program: &[Token],
    at: usize,
    token: &Token,
    runtime: &Runtime,
    stack: &mut ValueStack,
    pending_assignment: &mut Option<String>,
) {
    let name = token.name();
    if let Some(value) = runtime.variable(name) {
        stack.push(value.clone());
        return;
    }
    if let Some(value) = runtime.find_value(name) {
        stack.push(value);
        return;
    }
    // Unknown name: a following `=` makes this the assignment target,
    // anything else reads as null.
    let next_is_assign = program
        .get(at + 1)
        .is_some_and(|next| next.token_type() == TokenType::Operator && next.name() == "=");
    if next_is_assign {
        *pending_assignment = Some(name.to_string());
    } else {
        stack.push(Value::Null);
    }
}

fn run_operator(
    name: &str,
    runtime: &mut Runtime,
    stack: &mut ValueStack,
    pending_assignment: &mut Option<String>,
) -> Result<(), ExprError> {
    let underflow = || ExprError::StackUnderflow(name.to_string());

    match name {
        "=" => {
            let value = stack.pop().ok_or_else(underflow)?;
            let target = pending_assignment
                .take()
                .ok_or(ExprError::AssignmentWithoutTarget)?;
            runtime.set_variable(&target, value);
            Ok(())
        }
        "!" => {
            let operand = stack.pop().ok_or_else(underflow)?;
            stack.push(Value::Bool(!operand.as_bool()));
            Ok(())
        }
        "in" => {
            let right = stack.pop().ok_or_else(underflow)?;
            let left = stack.pop().ok_or_else(underflow)?;
            if left.is_null() || right.is_null() {
                runtime.add_error("`in` over null operand");
                stack.push(Value::Null);
            } else {
                stack.push(Value::Bool(right.as_string().contains(&left.as_string())));
            }
            Ok(())
        }
        _ => {
            let op = BinaryOp::from_symbol(name)
                .ok_or_else(|| ExprError::UnknownOperator(name.to_string()))?;
            let right = stack.pop().ok_or_else(underflow)?;
            let left = stack.pop().ok_or_else(underflow)?;
            match apply(op, left, right) {
                Ok(value) => stack.push(value),
                Err(sift_value::ValueError::DivisionByZero) => {
                    return Err(ExprError::DivisionByZero)
                }
                Err(error) => {
                    // Soft failure: record and yield an empty value.
                    runtime.add_error(error.to_string());
                    stack.push(Value::Null);
                }
            }
            Ok(())
        }
    }
}

fn run_function(
    token: &Token,
    runtime: &mut Runtime,
    stack: &mut ValueStack,
) -> Result<(), ExprError> {
    let name = token.name();
    let descriptor = if token.kind().is_namespaced() {
        runtime.find_method_namespaced(name)
    } else {
        runtime.find_method(name)
    }
    .ok_or_else(|| ExprError::MethodNotFound(name.to_string()))?;

    if stack.len() < descriptor.in_count {
        return Err(ExprError::StackUnderflow(name.to_string()));
    }
    // Pop in reverse so the arguments read left to right.
    let mut arguments: Vec<Value> = Vec::with_capacity(descriptor.in_count);
    for _ in 0..descriptor.in_count {
        arguments.push(stack.pop().ok_or_else(|| ExprError::StackUnderflow(name.to_string()))?);
    }
    arguments.reverse();

    let failed = |message: String| ExprError::MethodCallFailed {
        name: name.to_string(),
        message,
    };

    match descriptor.call {
        MethodFn::Plain0(call) => call(&arguments).map_err(failed)?,
        MethodFn::Plain1(call) => stack.push(call(&arguments).map_err(failed)?),
        MethodFn::PlainMany(call) => stack.extend(call(&arguments).map_err(failed)?),
        MethodFn::Runtime0(call) => call(runtime, &arguments).map_err(failed)?,
        MethodFn::Runtime1(call) => stack.push(call(runtime, &arguments).map_err(failed)?),
        MethodFn::RuntimeMany(call) => stack.extend(call(runtime, &arguments).map_err(failed)?),
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "tests assert on known-good inputs")]
mod tests {
    use super::{interpret, interpret_one};
    use crate::compiler::compile;
    use crate::errors::ExprError;
    use crate::runtime::Runtime;
    use crate::tokenizer::{tokenize, LexMode};
    use pretty_assertions::assert_eq;
    use sift_value::Value;

    fn run(source: &str, runtime: &mut Runtime) -> Result<Value, ExprError> {
        let tokens = tokenize(source, LexMode::Formula)?;
        let program = compile(&tokens)?;
        interpret_one(&program, runtime)
    }

    // === Values & operators ===

    #[test]
    fn precedence_is_respected() {
        let mut runtime = Runtime::with_standard_methods();
        assert_eq!(run("2 + 3 * 4", &mut runtime), Ok(Value::Int(14)));
    }

    #[test]
    fn string_literals_concatenate() {
        let mut runtime = Runtime::with_standard_methods();
        assert_eq!(
            run("\"ab\" + \"cd\"", &mut runtime),
            Ok(Value::Str("abcd".into()))
        );
    }

    #[test]
    fn division_by_zero_aborts() {
        let mut runtime = Runtime::with_standard_methods();
        assert_eq!(run("1 / 0", &mut runtime), Err(ExprError::DivisionByZero));
    }

    #[test]
    fn type_mismatch_is_soft() {
        let mut runtime = Runtime::with_standard_methods();
        // Null (unknown variable) compared to a number: recorded, null result.
        assert_eq!(run("ghost + 1", &mut runtime), Ok(Value::Null));
        assert!(runtime.has_errors());
    }

    // === Variables & assignment ===

    #[test]
    fn variable_reads_resolve() {
        let mut runtime = Runtime::with_standard_methods();
        runtime.set_variable("count", Value::Int(5));
        assert_eq!(run("count * 2", &mut runtime), Ok(Value::Int(10)));
    }

    #[test]
    fn unknown_variable_reads_null() {
        let mut runtime = Runtime::with_standard_methods();
        assert_eq!(run("ghost", &mut runtime), Ok(Value::Null));
    }

    #[test]
    fn assignment_binds_in_evaluation_order_programs() {
        // The pending-assignment peek works on programs already in
        // evaluation order: the target variable sits directly before `=`.
        let mut runtime = Runtime::with_standard_methods();
        #[allow(clippy::unwrap_used, reason = "postfix input compiles")]
        let program =
            crate::compiler::compile_no_precedence(&tokenize("5 x =", LexMode::Formula).unwrap())
                .unwrap();
        assert_eq!(interpret_one(&program, &mut runtime), Ok(Value::Null));
        assert_eq!(runtime.variable("x"), Some(&Value::Int(5)));
        // The bound variable is visible to later expressions.
        assert_eq!(run("x + 1", &mut runtime), Ok(Value::Int(6)));
    }

    #[test]
    fn assignment_without_target_is_an_error() {
        let mut runtime = Runtime::with_standard_methods();
        #[allow(clippy::unwrap_used, reason = "postfix input compiles")]
        let program =
            crate::compiler::compile_no_precedence(&tokenize("5 =", LexMode::Formula).unwrap())
                .unwrap();
        assert_eq!(
            interpret_one(&program, &mut runtime),
            Err(ExprError::AssignmentWithoutTarget)
        );
    }

    #[test]
    fn stack_underflow_is_reported() {
        let mut runtime = Runtime::with_standard_methods();
        #[allow(clippy::unwrap_used, reason = "single operator lexes and compiles")]
        let program = compile(&tokenize("1 +", LexMode::Formula).unwrap()).unwrap();
        let result = interpret(&program, &mut runtime);
        assert_eq!(result, Err(ExprError::StackUnderflow("+".to_string())));
    }

    // === Functions ===

    #[test]
    fn arguments_read_left_to_right() {
        let mut runtime = Runtime::with_standard_methods();
        assert_eq!(
            run("str::left(\"abcdef\", 2)", &mut runtime),
            Ok(Value::Str("ab".into()))
        );
        assert_eq!(
            run("str::substring(\"abcdef\", 1, 3)", &mut runtime),
            Ok(Value::Str("bcd".into()))
        );
    }

    #[test]
    fn missing_method_aborts() {
        let mut runtime = Runtime::with_standard_methods();
        assert_eq!(
            run("nope(1)", &mut runtime),
            Err(ExprError::MethodNotFound("nope".to_string()))
        );
    }

    #[test]
    fn nested_calls_evaluate_inside_out() {
        let mut runtime = Runtime::with_standard_methods();
        assert_eq!(run("max(min(8, 3), 5)", &mut runtime), Ok(Value::Int(5)));
    }

    // === Statements & vector results ===

    #[test]
    fn semicolon_clears_the_stack() {
        let mut runtime = Runtime::with_standard_methods();
        assert_eq!(run("1 + 1; 7", &mut runtime), Ok(Value::Int(7)));
    }

    #[test]
    fn vector_result_drains_bottom_to_top() {
        let mut runtime = Runtime::with_standard_methods();
        // `1 2 + 3` compiles to `1 2 3 +`: the leading 1 stays below the
        // sum, and the drained vector reads bottom-first.
        #[allow(clippy::unwrap_used, reason = "test input compiles")]
        let program = compile(&tokenize("1 2 + 3", LexMode::Formula).unwrap()).unwrap();
        #[allow(clippy::unwrap_used, reason = "program runs")]
        let values = interpret(&program, &mut runtime).unwrap();
        assert_eq!(values, vec![Value::Int(1), Value::Int(5)]);
    }
}
