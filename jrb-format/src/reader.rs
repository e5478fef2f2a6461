//! Token reader trait and the value-backed stream shim

use std::collections::VecDeque;

use serde_json::Value;

use crate::error::{BindError, Result};
use crate::token::{Token, TokenKind};

/// Peekable pull interface over a JSON token stream
///
/// This is the only view of the wire format the binding engines depend on;
/// they never see raw bytes.
pub trait TokenReader {
    /// Kind of the next token without consuming it
    fn peek(&mut self) -> Result<TokenKind>;
    /// Consume a null token
    fn read_null(&mut self) -> Result<()>;
    /// Consume a boolean token
    fn read_bool(&mut self) -> Result<bool>;
    /// Consume a string token
    fn read_string(&mut self) -> Result<String>;
    /// Consume a number token as a signed integer
    fn read_i64(&mut self) -> Result<i64>;
    /// Consume a number token as a float
    fn read_f64(&mut self) -> Result<f64>;
    /// Consume an object-start token
    fn begin_object(&mut self) -> Result<()>;
    /// Consume an object-end token
    fn end_object(&mut self) -> Result<()>;
    /// Consume an array-start token
    fn begin_array(&mut self) -> Result<()>;
    /// Consume an array-end token
    fn end_array(&mut self) -> Result<()>;
    /// Consume a member name token
    fn read_name(&mut self) -> Result<String>;
    /// Consume and discard one complete value of any shape and nesting depth
    fn skip_value(&mut self) -> Result<()>;
}

/// Token reader over a parsed `serde_json::Value` tree
///
/// The value is flattened into a token queue up front; all reads then
/// operate on the queue. Lexing stays in `serde_json`.
pub struct ValueReader {
    tokens: VecDeque<Token>,
}

impl ValueReader {
    /// Flatten a parsed value into a readable token stream
    pub fn new(value: &Value) -> Self {
        let mut tokens = VecDeque::new();
        flatten(value, &mut tokens);
        Self { tokens }
    }

    /// Parse JSON text and flatten it into a readable token stream
    pub fn parse(json: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(json)?;
        Ok(Self::new(&value))
    }

    /// Build a reader from raw tokens
    ///
    /// Token sequences are not validated here; malformed sequences surface
    /// as protocol errors during reading.
    pub fn from_tokens(tokens: impl IntoIterator<Item = Token>) -> Self {
        Self {
            tokens: tokens.into_iter().collect(),
        }
    }

    fn next_token(&mut self) -> Result<Token> {
        self.tokens.pop_front().ok_or(BindError::UnexpectedEof)
    }

    fn expect(&mut self, expected: TokenKind) -> Result<Token> {
        match self.tokens.front() {
            None => Err(BindError::UnexpectedEof),
            Some(token) if token.kind() != expected => Err(BindError::TypeMismatch {
                expected,
                found: token.kind(),
            }),
            Some(_) => self.next_token(),
        }
    }
}

impl TokenReader for ValueReader {
    fn peek(&mut self) -> Result<TokenKind> {
        Ok(self
            .tokens
            .front()
            .map(Token::kind)
            .unwrap_or(TokenKind::EndOfDocument))
    }

    fn read_null(&mut self) -> Result<()> {
        self.expect(TokenKind::Null)?;
        Ok(())
    }

    fn read_bool(&mut self) -> Result<bool> {
        match self.expect(TokenKind::Boolean)? {
            Token::Boolean(value) => Ok(value),
            _ => Err(BindError::Internal("token queue desynchronized".to_string())),
        }
    }

    fn read_string(&mut self) -> Result<String> {
        match self.expect(TokenKind::String)? {
            Token::String(value) => Ok(value),
            _ => Err(BindError::Internal("token queue desynchronized".to_string())),
        }
    }

    fn read_i64(&mut self) -> Result<i64> {
        match self.expect(TokenKind::Number)? {
            Token::Number(number) => number.as_i64().ok_or_else(|| BindError::NumberOutOfRange {
                value: number.to_string(),
                target: "i64",
            }),
            _ => Err(BindError::Internal("token queue desynchronized".to_string())),
        }
    }

    fn read_f64(&mut self) -> Result<f64> {
        match self.expect(TokenKind::Number)? {
            Token::Number(number) => number.as_f64().ok_or_else(|| BindError::NumberOutOfRange {
                value: number.to_string(),
                target: "f64",
            }),
            _ => Err(BindError::Internal("token queue desynchronized".to_string())),
        }
    }

    fn begin_object(&mut self) -> Result<()> {
        self.expect(TokenKind::BeginObject)?;
        Ok(())
    }

    fn end_object(&mut self) -> Result<()> {
        self.expect(TokenKind::EndObject)?;
        Ok(())
    }

    fn begin_array(&mut self) -> Result<()> {
        self.expect(TokenKind::BeginArray)?;
        Ok(())
    }

    fn end_array(&mut self) -> Result<()> {
        self.expect(TokenKind::EndArray)?;
        Ok(())
    }

    fn read_name(&mut self) -> Result<String> {
        match self.expect(TokenKind::Name)? {
            Token::Name(name) => Ok(name),
            _ => Err(BindError::Internal("token queue desynchronized".to_string())),
        }
    }

    fn skip_value(&mut self) -> Result<()> {
        let mut depth = 0usize;
        loop {
            match self.next_token()? {
                Token::BeginObject | Token::BeginArray => depth += 1,
                Token::EndObject | Token::EndArray => {
                    depth = depth.checked_sub(1).ok_or_else(|| {
                        BindError::Internal("skip_value outside a value position".to_string())
                    })?;
                }
                _ => {}
            }
            if depth == 0 {
                return Ok(());
            }
        }
    }
}

fn flatten(value: &Value, out: &mut VecDeque<Token>) {
    match value {
        Value::Null => out.push_back(Token::Null),
        Value::Bool(value) => out.push_back(Token::Boolean(*value)),
        Value::Number(number) => out.push_back(Token::Number(number.clone())),
        Value::String(value) => out.push_back(Token::String(value.clone())),
        Value::Array(items) => {
            out.push_back(Token::BeginArray);
            for item in items {
                flatten(item, out);
            }
            out.push_back(Token::EndArray);
        }
        Value::Object(members) => {
            out.push_back(Token::BeginObject);
            for (name, member) in members {
                out.push_back(Token::Name(name.clone()));
                flatten(member, out);
            }
            out.push_back(Token::EndObject);
        }
    }
}
