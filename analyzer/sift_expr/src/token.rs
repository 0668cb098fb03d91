//! Expression tokens.
//!
//! A token's kind packs four bytes — type, info, part, group — into one
//! `u32`. The info byte carries the value type for `Value` tokens and
//! the namespace flag for `Function` tokens; part and group are carried
//! for the wire format but stay zero in the current pipeline.

use sift_value::Value;

/// Token type, the low byte of [`TokenKind`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum TokenType {
    None = 0,
    Keyword = 1,
    Operator = 2,
    Separator = 3,
    StringDelimiter = 4,
    SpecialChar = 5,
    Value = 6,
    Identifier = 7,
    Formula = 8,
    Function = 9,
    Variable = 10,
    Label = 11,
    Member = 12,
    End = 13,
}

impl TokenType {
    fn from_code(code: u8) -> TokenType {
        match code {
            1 => TokenType::Keyword,
            2 => TokenType::Operator,
            3 => TokenType::Separator,
            4 => TokenType::StringDelimiter,
            5 => TokenType::SpecialChar,
            6 => TokenType::Value,
            7 => TokenType::Identifier,
            8 => TokenType::Formula,
            9 => TokenType::Function,
            10 => TokenType::Variable,
            11 => TokenType::Label,
            12 => TokenType::Member,
            13 => TokenType::End,
            _ => TokenType::None,
        }
    }
}

/// Value type carried in the info byte of `Value` tokens.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum ValueType {
    Unknown = 0,
    Integer = 1,
    Decimal = 2,
    String = 3,
    Boolean = 4,
}

impl ValueType {
    fn from_code(code: u8) -> ValueType {
        match code {
            1 => ValueType::Integer,
            2 => ValueType::Decimal,
            3 => ValueType::String,
            4 => ValueType::Boolean,
            _ => ValueType::Unknown,
        }
    }
}

/// Namespace flag bit in the info byte of `Function` tokens.
const FUNCTION_NAMESPACE: u8 = 0x01;

/// Packed token kind: `type | info << 8 | part << 16 | group << 24`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TokenKind(u32);

impl TokenKind {
    pub fn new(ttype: TokenType) -> Self {
        Self(u32::from(ttype as u8))
    }

    pub fn value(vtype: ValueType) -> Self {
        Self(u32::from(TokenType::Value as u8) | (u32::from(vtype as u8) << 8))
    }

    pub fn function(namespaced: bool) -> Self {
        let info = if namespaced { FUNCTION_NAMESPACE } else { 0 };
        Self(u32::from(TokenType::Function as u8) | (u32::from(info) << 8))
    }

    #[inline]
    pub fn raw(self) -> u32 {
        self.0
    }

    #[inline]
    pub fn token_type(self) -> TokenType {
        #[allow(clippy::cast_possible_truncation, reason = "masked to the low byte")]
        TokenType::from_code((self.0 & 0xFF) as u8)
    }

    /// Info byte read as a value type.
    #[inline]
    pub fn value_type(self) -> ValueType {
        #[allow(clippy::cast_possible_truncation, reason = "masked to one byte")]
        ValueType::from_code(((self.0 >> 8) & 0xFF) as u8)
    }

    /// Namespace flag of a function token.
    #[inline]
    pub fn is_namespaced(self) -> bool {
        self.token_type() == TokenType::Function && (self.0 >> 8) & u32::from(FUNCTION_NAMESPACE) != 0
    }
}

/// One lexed token: packed kind plus the source text it names.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Token {
    kind: TokenKind,
    name: String,
}

impl Token {
    pub fn new(kind: TokenKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
        }
    }

    #[inline]
    pub fn kind(&self) -> TokenKind {
        self.kind
    }

    #[inline]
    pub fn token_type(&self) -> TokenType {
        self.kind.token_type()
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Typed literal of a `Value` token; numeric parse failures fall
    /// back to zero, matching the value model's coercions.
    pub fn value(&self) -> Value {
        match self.kind.value_type() {
            ValueType::Integer => Value::Int(self.name.parse::<i64>().unwrap_or(0)),
            ValueType::Decimal => Value::Float(self.name.parse::<f64>().unwrap_or(0.0)),
            ValueType::String => Value::Str(self.name.clone()),
            ValueType::Boolean => Value::Bool(self.name == "true"),
            ValueType::Unknown => Value::Null,
        }
    }
}
