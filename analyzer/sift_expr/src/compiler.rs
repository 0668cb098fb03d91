//! Shunting-yard postfix compiler.
//!
//! Three variants share one core:
//!
//! - [`compile`]: the built-in precedence table.
//! - [`compile_with_precedence`]: a caller-supplied per-operator map
//!   overriding the built-in table.
//! - [`compile_no_precedence`]: preserves the incoming operator order
//!   and only balances parentheses and function frames, for input that
//!   is already in evaluation order.
//!
//! Two deliberate departures from the textbook algorithm: a function is
//! popped *together with* its left parenthesis at `)`, and a comma pops
//! argument operators down to the open parenthesis without removing it,
//! so each function argument compiles to a standalone postfix slice.

use rustc_hash::FxHashMap;

use crate::errors::ExprError;
use crate::token::{Token, TokenType};

/// Built-in operator precedence; higher binds tighter.
pub fn precedence(operator: &str) -> u8 {
    match operator {
        "^" | "!" => 5,
        "*" | "/" | "%" => 4,
        "+" | "-" => 3,
        "<" | ">" | "=" | "<=" | ">=" | "==" | "!=" | "in" => 2,
        "&" | "|" | "&&" => 1,
        _ => 0, // `||` and anything unknown
    }
}

/// Compile infix tokens to a postfix program with the built-in table.
pub fn compile(tokens: &[Token]) -> Result<Vec<Token>, ExprError> {
    compile_inner(tokens, precedence)
}

/// Compile with a per-operator precedence override map.
pub fn compile_with_precedence(
    tokens: &[Token],
    overrides: &FxHashMap<String, u8>,
) -> Result<Vec<Token>, ExprError> {
    compile_inner(tokens, |operator| {
        overrides
            .get(operator)
            .copied()
            .unwrap_or_else(|| precedence(operator))
    })
}

fn compile_inner(
    tokens: &[Token],
    precedence_of: impl Fn(&str) -> u8,
) -> Result<Vec<Token>, ExprError> {
    let mut output: Vec<Token> = Vec::with_capacity(tokens.len());
    let mut stack: Vec<Token> = Vec::new();

    for token in tokens {
        match token.token_type() {
            TokenType::Value | TokenType::Variable | TokenType::Member | TokenType::Label => {
                output.push(token.clone());
            }
            TokenType::Function => stack.push(token.clone()),
            TokenType::Operator => {
                while let Some(top) = stack.last() {
                    if top.name() == "(" || top.token_type() == TokenType::Function {
                        break;
                    }
                    if precedence_of(token.name()) > precedence_of(top.name()) {
                        break;
                    }
                    output.push(stack.pop().ok_or_else(|| unbalanced(token))?);
                }
                stack.push(token.clone());
            }
            TokenType::Separator => match token.name() {
                "," => {
                    // Drain the argument sub-expression; the open paren
                    // (and the function below it) stay in place.
                    while let Some(top) = stack.last() {
                        if top.name() == "(" || top.token_type() == TokenType::Function {
                            break;
                        }
                        output.push(stack.pop().ok_or_else(|| unbalanced(token))?);
                    }
                }
                ";" => {
                    while let Some(top) = stack.pop() {
                        output.push(top);
                    }
                    output.push(token.clone());
                }
                other => {
                    return Err(ExprError::ParseFailed {
                        position: 0,
                        message: format!("unsupported separator `{other}`"),
                    })
                }
            },
            TokenType::SpecialChar => match token.name() {
                "(" => stack.push(token.clone()),
                ")" => {
                    while let Some(top) = stack.last() {
                        if top.name() == "(" {
                            break;
                        }
                        output.push(stack.pop().ok_or_else(|| unbalanced(token))?);
                    }
                    if stack.last().is_some_and(|top| top.name() == "(") {
                        stack.pop();
                    }
                    // A function owns its parenthesis frame: emit it now.
                    if stack
                        .last()
                        .is_some_and(|top| top.token_type() == TokenType::Function)
                    {
                        output.push(stack.pop().ok_or_else(|| unbalanced(token))?);
                    }
                }
                _ => output.push(token.clone()),
            },
            _ => {
                return Err(ExprError::ParseFailed {
                    position: 0,
                    message: format!("unexpected token `{}` in compile", token.name()),
                })
            }
        }
    }

    while let Some(top) = stack.pop() {
        output.push(top);
    }
    Ok(output)
}

/// Order-preserving variant: operators go straight to the output, only
/// parentheses and function frames are balanced.
pub fn compile_no_precedence(tokens: &[Token]) -> Result<Vec<Token>, ExprError> {
    let mut output: Vec<Token> = Vec::with_capacity(tokens.len());
    let mut stack: Vec<Token> = Vec::new();

    for token in tokens {
        match token.token_type() {
            TokenType::Operator
            | TokenType::Value
            | TokenType::Variable
            | TokenType::Member
            | TokenType::Label => output.push(token.clone()),
            TokenType::Function => stack.push(token.clone()),
            TokenType::Separator => match token.name() {
                "," => {}
                ";" => {
                    while let Some(top) = stack.pop() {
                        output.push(top);
                    }
                    output.push(token.clone());
                }
                other => {
                    return Err(ExprError::ParseFailed {
                        position: 0,
                        message: format!("unsupported separator `{other}`"),
                    })
                }
            },
            TokenType::SpecialChar => match token.name() {
                "(" => stack.push(token.clone()),
                ")" => {
                    while let Some(top) = stack.last() {
                        if top.name() == "(" {
                            break;
                        }
                        output.push(stack.pop().ok_or_else(|| unbalanced(token))?);
                    }
                    if stack.last().is_some_and(|top| top.name() == "(") {
                        stack.pop();
                    }
                    if stack
                        .last()
                        .is_some_and(|top| top.token_type() == TokenType::Function)
                    {
                        output.push(stack.pop().ok_or_else(|| unbalanced(token))?);
                    }
                }
                _ => output.push(token.clone()),
            },
            _ => {
                return Err(ExprError::ParseFailed {
                    position: 0,
                    message: format!("unexpected token `{}` in compile", token.name()),
                })
            }
        }
    }

    while let Some(top) = stack.pop() {
        output.push(top);
    }
    Ok(output)
}

fn unbalanced(token: &Token) -> ExprError {
    ExprError::ParseFailed {
        position: 0,
        message: format!("unbalanced expression near `{}`", token.name()),
    }
}

/// Render a postfix program back to text (token names joined by
/// spaces). Feeding the result through the tokenizer and
/// [`compile_no_precedence`] reproduces the program for operator
/// expressions.
pub fn render(program: &[Token]) -> String {
    program
        .iter()
        .map(Token::name)
        .collect::<Vec<_>>()
        .join(" ")
}
