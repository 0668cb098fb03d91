//! Table-driven expression lexer.
//!
//! Two 256-byte character class tables drive the lexer: the *symbolic*
//! table for formula mode, and a *keyword* table that is identical
//! except the letters able to begin a keyword operator (`a i m n o x`,
//! both cases) carry an extra bit. The tables are const data — the lexer
//! branches on one load per byte.
//!
//! Keyword mode accepts `not and or in is xor mod` as operators (with an
//! identifier boundary check) and normalises a bare `=` to `==`.

use crate::errors::ExprError;
use crate::token::{Token, TokenKind, TokenType, ValueType};

/// Lexer mode selecting the character class table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LexMode {
    /// Symbolic operators only.
    Formula,
    /// Symbolic plus keyword operators; `=` reads as `==`.
    Keyword,
}

// Character class bits.
const WHITESPACE: u8 = 0x01;
const DIGIT: u8 = 0x02;
const ALPHA: u8 = 0x04;
const OPERATOR: u8 = 0x08;
const SEPARATOR: u8 = 0x10;
const STRING_DELIM: u8 = 0x20;
const SPECIAL: u8 = 0x40;
const KEYWORD_START: u8 = 0x80;

const SYMBOLIC_CLASS: [u8; 256] = build_class_table(false);
const KEYWORD_CLASS: [u8; 256] = build_class_table(true);

const fn build_class_table(keyword: bool) -> [u8; 256] {
    let mut table = [0u8; 256];
    table[b' ' as usize] = WHITESPACE;
    table[b'\t' as usize] = WHITESPACE;
    table[b'\r' as usize] = WHITESPACE;
    table[b'\n' as usize] = WHITESPACE;

    let mut byte = b'0' as usize;
    while byte <= b'9' as usize {
        table[byte] = DIGIT;
        byte += 1;
    }
    byte = b'a' as usize;
    while byte <= b'z' as usize {
        table[byte] = ALPHA;
        byte += 1;
    }
    byte = b'A' as usize;
    while byte <= b'Z' as usize {
        table[byte] = ALPHA;
        byte += 1;
    }
    table[b'_' as usize] = ALPHA;

    let operators = [b'+', b'-', b'*', b'/', b'%', b'<', b'>', b'=', b'!', b'&', b'|', b'^'];
    let mut at = 0;
    while at < operators.len() {
        table[operators[at] as usize] = OPERATOR;
        at += 1;
    }

    table[b',' as usize] = SEPARATOR;
    table[b';' as usize] = SEPARATOR;
    table[b'\'' as usize] = STRING_DELIM;
    table[b'"' as usize] = STRING_DELIM;

    let specials = [b'(', b')', b'[', b']', b'{', b'}'];
    at = 0;
    while at < specials.len() {
        table[specials[at] as usize] = SPECIAL;
        at += 1;
    }

    if keyword {
        // First letters of `not and or in is xor mod`, both cases.
        let starts = [b'a', b'i', b'm', b'n', b'o', b'x', b'A', b'I', b'M', b'N', b'O', b'X'];
        at = 0;
        while at < starts.len() {
            table[starts[at] as usize] |= KEYWORD_START;
            at += 1;
        }
    }
    table
}

/// Keyword operators and their symbolic spellings.
const KEYWORD_OPERATORS: &[(&str, &str)] = &[
    ("and", "&&"),
    ("in", "in"),
    ("is", "=="),
    ("mod", "%"),
    ("not", "!"),
    ("or", "||"),
    ("xor", "^"),
];

/// Tokenize an expression under the given mode.
pub fn tokenize(source: &str, mode: LexMode) -> Result<Vec<Token>, ExprError> {
    let bytes = source.as_bytes();
    let table: &[u8; 256] = match mode {
        LexMode::Formula => &SYMBOLIC_CLASS,
        LexMode::Keyword => &KEYWORD_CLASS,
    };
    let mut tokens = Vec::new();
    let mut at = 0usize;

    while at < bytes.len() {
        let byte = bytes[at];
        let class = table[usize::from(byte)];

        if class & WHITESPACE != 0 {
            at += 1;
        } else if class & DIGIT != 0 {
            at = lex_number(bytes, at, false, &mut tokens);
        } else if class & ALPHA != 0 {
            at = lex_identifier(bytes, at, mode, class, &mut tokens);
        } else if class & OPERATOR != 0 {
            at = lex_operator(bytes, at, mode, &mut tokens);
        } else if class & STRING_DELIM != 0 {
            at = lex_string(bytes, at, &mut tokens)?;
        } else if class & SEPARATOR != 0 {
            tokens.push(Token::new(
                TokenKind::new(TokenType::Separator),
                char::from(byte).to_string(),
            ));
            at += 1;
        } else if class & SPECIAL != 0 {
            tokens.push(Token::new(
                TokenKind::new(TokenType::SpecialChar),
                char::from(byte).to_string(),
            ));
            at += 1;
        } else {
            return Err(ExprError::ParseFailed {
                position: at,
                message: format!("unexpected byte {byte:#04x}"),
            });
        }
    }
    Ok(tokens)
}

/// Read `[0-9.]*`; emits an integer or decimal value token depending on
/// whether a `.` was seen. `negative` prefixes the literal with `-`.
fn lex_number(bytes: &[u8], start: usize, negative: bool, tokens: &mut Vec<Token>) -> usize {
    let mut at = start;
    let mut decimal = false;
    while at < bytes.len() && (bytes[at].is_ascii_digit() || bytes[at] == b'.') {
        decimal |= bytes[at] == b'.';
        at += 1;
    }
    let digits = String::from_utf8_lossy(&bytes[start..at]);
    let name = if negative { format!("-{digits}") } else { digits.into_owned() };
    let vtype = if decimal { ValueType::Decimal } else { ValueType::Integer };
    tokens.push(Token::new(TokenKind::value(vtype), name));
    at
}

fn is_identifier_byte(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || byte == b'_'
}

/// Read an identifier (with `::` namespace separators) and classify it
/// by the byte that follows: `(` function, `:` label, `.` member,
/// otherwise variable. In keyword mode a keyword operator wins first.
fn lex_identifier(
    bytes: &[u8],
    start: usize,
    mode: LexMode,
    class: u8,
    tokens: &mut Vec<Token>,
) -> usize {
    let mut at = start;
    let mut namespaced = false;
    loop {
        while at < bytes.len() && is_identifier_byte(bytes[at]) {
            at += 1;
        }
        // Consume `::` pairs into the identifier; a single `:` stays
        // outside (it marks a label).
        if at + 1 < bytes.len() && bytes[at] == b':' && bytes[at + 1] == b':' {
            namespaced = true;
            at += 2;
        } else {
            break;
        }
    }
    let name = String::from_utf8_lossy(&bytes[start..at]).into_owned();

    if mode == LexMode::Keyword && class & KEYWORD_START != 0 && !namespaced {
        let lowered = name.to_ascii_lowercase();
        if let Some((_, symbol)) = KEYWORD_OPERATORS
            .iter()
            .find(|(keyword, _)| **keyword == lowered)
        {
            // The identifier scan guarantees the boundary: the bytes
            // before and after are not alphanumeric.
            tokens.push(Token::new(TokenKind::new(TokenType::Operator), *symbol));
            return at;
        }
    }

    match bytes.get(at) {
        Some(b'(') => {
            tokens.push(Token::new(TokenKind::function(namespaced), name));
            at
        }
        Some(b':') => {
            tokens.push(Token::new(TokenKind::new(TokenType::Label), name));
            at + 1
        }
        Some(b'.') => {
            tokens.push(Token::new(TokenKind::new(TokenType::Member), name));
            at + 1
        }
        _ => {
            tokens.push(Token::new(TokenKind::new(TokenType::Variable), name));
            at
        }
    }
}

/// `true` when a `-` at this point starts a negative literal rather
/// than a subtraction: at expression start, after an operator, after a
/// separator, or after `(`.
fn minus_starts_literal(tokens: &[Token]) -> bool {
    match tokens.last() {
        None => true,
        Some(previous) => matches!(
            previous.token_type(),
            TokenType::Operator | TokenType::Separator
        ) || (previous.token_type() == TokenType::SpecialChar && previous.name() == "("),
    }
}

fn lex_operator(bytes: &[u8], start: usize, mode: LexMode, tokens: &mut Vec<Token>) -> usize {
    let byte = bytes[start];

    // Unary minus: `-` in literal position followed by a digit.
    if byte == b'-'
        && start + 1 < bytes.len()
        && bytes[start + 1].is_ascii_digit()
        && minus_starts_literal(tokens)
    {
        return lex_number(bytes, start + 1, true, tokens);
    }

    // Two-byte operators.
    if let Some(&next) = bytes.get(start + 1) {
        let pair: [u8; 2] = [byte, next];
        let two = match &pair {
            b">=" | b"<=" | b"==" | b"!=" | b"&&" | b"||" => Some(String::from_utf8_lossy(&pair).into_owned()),
            _ => None,
        };
        if let Some(name) = two {
            tokens.push(Token::new(TokenKind::new(TokenType::Operator), name));
            return start + 2;
        }
    }

    // Keyword mode reads a bare `=` as equality.
    let name = if byte == b'=' && mode == LexMode::Keyword {
        "==".to_string()
    } else {
        char::from(byte).to_string()
    };
    tokens.push(Token::new(TokenKind::new(TokenType::Operator), name));
    start + 1
}

/// Read a string literal. The delimiter byte and its run length are
/// recorded (`'''…'''` and `"""…"""` are supported); the literal runs
/// until a run of equal length of the same delimiter.
fn lex_string(bytes: &[u8], start: usize, tokens: &mut Vec<Token>) -> Result<usize, ExprError> {
    let delimiter = bytes[start];
    let mut run = 0usize;
    while start + run < bytes.len() && bytes[start + run] == delimiter {
        run += 1;
    }
    let width = if run >= 3 { 3 } else { 1 };

    let content_start = start + width;
    let mut at = content_start;
    while at + width <= bytes.len() {
        if bytes[at] == delimiter && bytes[at..at + width].iter().all(|&b| b == delimiter) {
            let content = String::from_utf8_lossy(&bytes[content_start..at]).into_owned();
            tokens.push(Token::new(TokenKind::value(ValueType::String), content));
            return Ok(at + width);
        }
        at += 1;
    }
    Err(ExprError::ParseFailed {
        position: start,
        message: "unterminated string literal".to_string(),
    })
}
