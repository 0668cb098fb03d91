//! Standard method library.
//!
//! Two groups are pre-registered by the one-shot entry points: the root
//! namespace (arithmetic and general helpers) and `str::` (text
//! helpers). Position arguments are guaranteed by the interpreter to
//! match each descriptor's `in_count`; the accessors still default to
//! null rather than index out of bounds.
//!
//! Text positions and spans are measured in characters; `length` is the
//! byte length, matching the value model's string views.

use sift_value::{apply, BinaryOp, Value};

use crate::runtime::MethodDescriptor;

fn arg(args: &[Value], at: usize) -> Value {
    args.get(at).cloned().unwrap_or(Value::Null)
}

fn text(args: &[Value], at: usize) -> String {
    arg(args, at).as_string()
}

fn integer(args: &[Value], at: usize) -> i64 {
    arg(args, at).as_integer()
}

/// Character span `[start, start + count)` of `s`, clamped.
fn char_span(s: &str, start: i64, count: i64) -> String {
    let start = usize::try_from(start.max(0)).unwrap_or(0);
    let count = usize::try_from(count.max(0)).unwrap_or(0);
    s.chars().skip(start).take(count).collect()
}

// === root namespace ===

fn average_m(args: &[Value]) -> Result<Value, String> {
    Ok(Value::Float((arg(args, 0).as_double() + arg(args, 1).as_double()) / 2.0))
}

/// Larger of two values: lexicographic for two strings, numeric
/// otherwise.
fn max_m(args: &[Value]) -> Result<Value, String> {
    let (left, right) = (arg(args, 0), arg(args, 1));
    let right_wins = match (&left, &right) {
        (Value::Str(a), Value::Str(b)) => b > a,
        _ => right.as_double() > left.as_double(),
    };
    Ok(if right_wins { right } else { left })
}

fn min_m(args: &[Value]) -> Result<Value, String> {
    let (left, right) = (arg(args, 0), arg(args, 1));
    let right_wins = match (&left, &right) {
        (Value::Str(a), Value::Str(b)) => b < a,
        _ => right.as_double() < left.as_double(),
    };
    Ok(if right_wins { right } else { left })
}

fn sum_m(args: &[Value]) -> Result<Value, String> {
    apply(BinaryOp::Add, arg(args, 0), arg(args, 1)).map_err(|error| error.to_string())
}

fn abs_m(args: &[Value]) -> Result<Value, String> {
    Ok(match arg(args, 0) {
        Value::Int(v) => Value::Int(v.wrapping_abs()),
        other => Value::Float(other.as_double().abs()),
    })
}

fn round_m(args: &[Value]) -> Result<Value, String> {
    Ok(match arg(args, 0) {
        Value::Int(v) => Value::Int(v),
        other => Value::Float(other.as_double().round()),
    })
}

fn floor_m(args: &[Value]) -> Result<Value, String> {
    Ok(match arg(args, 0) {
        Value::Int(v) => Value::Int(v),
        other => Value::Float(other.as_double().floor()),
    })
}

fn ceil_m(args: &[Value]) -> Result<Value, String> {
    Ok(match arg(args, 0) {
        Value::Int(v) => Value::Int(v),
        other => Value::Float(other.as_double().ceil()),
    })
}

fn if_m(args: &[Value]) -> Result<Value, String> {
    Ok(if arg(args, 0).as_bool() { arg(args, 1) } else { arg(args, 2) })
}

fn is_null_m(args: &[Value]) -> Result<Value, String> {
    Ok(Value::Bool(arg(args, 0).is_null()))
}

fn is_not_null_m(args: &[Value]) -> Result<Value, String> {
    Ok(Value::Bool(!arg(args, 0).is_null()))
}

/// Root namespace descriptors.
pub fn root_methods() -> Vec<MethodDescriptor> {
    vec![
        MethodDescriptor::plain("average", 2, average_m),
        MethodDescriptor::plain("max", 2, max_m),
        MethodDescriptor::plain("min", 2, min_m),
        MethodDescriptor::plain("sum", 2, sum_m),
        MethodDescriptor::plain("abs", 1, abs_m),
        MethodDescriptor::plain("round", 1, round_m),
        MethodDescriptor::plain("floor", 1, floor_m),
        MethodDescriptor::plain("ceil", 1, ceil_m),
        MethodDescriptor::plain("if", 3, if_m),
        MethodDescriptor::plain("is_null", 1, is_null_m),
        MethodDescriptor::plain("is_not_null", 1, is_not_null_m),
    ]
}

// === str namespace ===

fn tolower_m(args: &[Value]) -> Result<Value, String> {
    Ok(Value::Str(text(args, 0).to_lowercase()))
}

fn toupper_m(args: &[Value]) -> Result<Value, String> {
    Ok(Value::Str(text(args, 0).to_uppercase()))
}

fn length_m(args: &[Value]) -> Result<Value, String> {
    #[allow(clippy::cast_possible_wrap, reason = "cell text stays far below i64::MAX")]
    Ok(Value::Int(text(args, 0).len() as i64))
}

fn count_m(args: &[Value]) -> Result<Value, String> {
    let (s, needle) = (text(args, 0), text(args, 1));
    if needle.is_empty() {
        return Ok(Value::Int(0));
    }
    #[allow(clippy::cast_possible_wrap, reason = "match counts stay far below i64::MAX")]
    Ok(Value::Int(s.matches(&needle).count() as i64))
}

fn find_m(args: &[Value]) -> Result<Value, String> {
    let (s, needle) = (text(args, 0), text(args, 1));
    let position = s.find(&needle).map_or(-1, |at| {
        #[allow(clippy::cast_possible_wrap, reason = "cell text stays far below i64::MAX")]
        {
            at as i64
        }
    });
    Ok(Value::Int(position))
}

fn has_m(args: &[Value]) -> Result<Value, String> {
    Ok(Value::Bool(text(args, 0).contains(&text(args, 1))))
}

fn collect_tags(s: &str) -> Vec<String> {
    let mut tags = Vec::new();
    let bytes = s.as_bytes();
    let mut at = 0usize;
    while at < bytes.len() {
        if bytes[at] == b'#' {
            let start = at + 1;
            let mut end = start;
            while end < bytes.len() && (bytes[end].is_ascii_alphanumeric() || bytes[end] == b'_') {
                end += 1;
            }
            if end > start {
                tags.push(String::from_utf8_lossy(&bytes[start..end]).into_owned());
            }
            at = end.max(at + 1);
        } else {
            at += 1;
        }
    }
    tags
}

fn has_tag_m(args: &[Value]) -> Result<Value, String> {
    let tag = text(args, 1);
    let tag = tag.strip_prefix('#').unwrap_or(&tag);
    Ok(Value::Bool(collect_tags(&text(args, 0)).iter().any(|found| found == tag)))
}

fn list_tags_m(args: &[Value]) -> Result<Value, String> {
    Ok(Value::Str(collect_tags(&text(args, 0)).join(",")))
}

fn missing_m(args: &[Value]) -> Result<Value, String> {
    Ok(Value::Bool(!text(args, 0).contains(&text(args, 1))))
}

fn starts_with_m(args: &[Value]) -> Result<Value, String> {
    Ok(Value::Bool(text(args, 0).starts_with(&text(args, 1))))
}

fn ends_with_m(args: &[Value]) -> Result<Value, String> {
    Ok(Value::Bool(text(args, 0).ends_with(&text(args, 1))))
}

fn trim_m(args: &[Value]) -> Result<Value, String> {
    Ok(Value::Str(text(args, 0).trim().to_string()))
}

fn ltrim_m(args: &[Value]) -> Result<Value, String> {
    Ok(Value::Str(text(args, 0).trim_start().to_string()))
}

fn rtrim_m(args: &[Value]) -> Result<Value, String> {
    Ok(Value::Str(text(args, 0).trim_end().to_string()))
}

fn substring_m(args: &[Value]) -> Result<Value, String> {
    Ok(Value::Str(char_span(&text(args, 0), integer(args, 1), integer(args, 2))))
}

fn replace_m(args: &[Value]) -> Result<Value, String> {
    let (s, from, to) = (text(args, 0), text(args, 1), text(args, 2));
    if from.is_empty() {
        return Ok(Value::Str(s));
    }
    Ok(Value::Str(s.replace(&from, &to)))
}

fn reverse_m(args: &[Value]) -> Result<Value, String> {
    Ok(Value::Str(text(args, 0).chars().rev().collect()))
}

fn repeat_m(args: &[Value]) -> Result<Value, String> {
    let times = usize::try_from(integer(args, 1).max(0)).unwrap_or(0);
    Ok(Value::Str(text(args, 0).repeat(times)))
}

fn is_numeric_m(args: &[Value]) -> Result<Value, String> {
    let s = text(args, 0);
    let trimmed = s.trim();
    Ok(Value::Bool(!trimmed.is_empty() && trimmed.parse::<f64>().is_ok()))
}

fn is_alpha_m(args: &[Value]) -> Result<Value, String> {
    let s = text(args, 0);
    Ok(Value::Bool(!s.is_empty() && s.chars().all(char::is_alphabetic)))
}

fn is_empty_m(args: &[Value]) -> Result<Value, String> {
    Ok(Value::Bool(text(args, 0).is_empty()))
}

fn char_at_m(args: &[Value]) -> Result<Value, String> {
    let s = text(args, 0);
    let at = usize::try_from(integer(args, 1).max(0)).unwrap_or(0);
    Ok(Value::Str(s.chars().nth(at).map(String::from).unwrap_or_default()))
}

fn left_m(args: &[Value]) -> Result<Value, String> {
    Ok(Value::Str(char_span(&text(args, 0), 0, integer(args, 1))))
}

fn right_m(args: &[Value]) -> Result<Value, String> {
    let s = text(args, 0);
    let count = usize::try_from(integer(args, 1).max(0)).unwrap_or(0);
    let total = s.chars().count();
    Ok(Value::Str(s.chars().skip(total.saturating_sub(count)).collect()))
}

fn mid_m(args: &[Value]) -> Result<Value, String> {
    substring_m(args)
}

/// `str::` namespace descriptors.
pub fn string_methods() -> Vec<MethodDescriptor> {
    vec![
        MethodDescriptor::plain("tolower", 1, tolower_m),
        MethodDescriptor::plain("toupper", 1, toupper_m),
        MethodDescriptor::plain("length", 1, length_m),
        MethodDescriptor::plain("count", 2, count_m),
        MethodDescriptor::plain("find", 2, find_m),
        MethodDescriptor::plain("has", 2, has_m),
        MethodDescriptor::plain("has_tag", 2, has_tag_m),
        MethodDescriptor::plain("list_tags", 1, list_tags_m),
        MethodDescriptor::plain("missing", 2, missing_m),
        MethodDescriptor::plain("starts_with", 2, starts_with_m),
        MethodDescriptor::plain("ends_with", 2, ends_with_m),
        MethodDescriptor::plain("trim", 1, trim_m),
        MethodDescriptor::plain("ltrim", 1, ltrim_m),
        MethodDescriptor::plain("rtrim", 1, rtrim_m),
        MethodDescriptor::plain("substring", 3, substring_m),
        MethodDescriptor::plain("replace", 3, replace_m),
        MethodDescriptor::plain("reverse", 1, reverse_m),
        MethodDescriptor::plain("repeat", 2, repeat_m),
        MethodDescriptor::plain("is_numeric", 1, is_numeric_m),
        MethodDescriptor::plain("is_alpha", 1, is_alpha_m),
        MethodDescriptor::plain("is_empty", 1, is_empty_m),
        MethodDescriptor::plain("char_at", 2, char_at_m),
        MethodDescriptor::plain("left", 2, left_m),
        MethodDescriptor::plain("right", 2, right_m),
        MethodDescriptor::plain("mid", 3, mid_m),
    ]
}
