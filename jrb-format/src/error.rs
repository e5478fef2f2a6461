//! Error types for JSON record binding

use thiserror::Error;

use crate::token::TokenKind;

/// Binding error types
#[derive(Debug, Error)]
pub enum BindError {
    /// The next token's kind does not match what the protocol requires.
    #[error("expected {expected} but was {found}")]
    TypeMismatch {
        /// Token kind the protocol required next.
        expected: TokenKind,
        /// Token kind actually observed.
        found: TokenKind,
    },
    /// A wire number does not fit the declared numeric width.
    #[error("number {value} does not fit in {target}")]
    NumberOutOfRange {
        /// Textual rendering of the offending number.
        value: String,
        /// Name of the declared numeric width.
        target: &'static str,
    },
    /// NaN and infinities have no representation in the wire format.
    #[error("non-finite number {0} is not representable")]
    NonFiniteNumber(f64),
    /// A character field requires a single-character string on the wire.
    #[error("expected a single-character string but was \"{found}\"")]
    InvalidCharacter {
        /// The string actually observed.
        found: String,
    },
    /// A map was declared with a key shape other than string.
    #[error("unsupported map key shape: {found}")]
    UnsupportedKeyType {
        /// Rendering of the declared key shape.
        found: String,
    },
    /// Two fields of one record declared the same wire name.
    #[error("duplicate wire name '{wire_name}' in record {record}")]
    DuplicateWireName {
        /// The wire name declared more than once.
        wire_name: String,
        /// Type name of the offending record.
        record: &'static str,
    },
    /// A record type was referenced but never registered.
    #[error("no converter registered for record type {type_name}")]
    UnknownType {
        /// Type name of the unregistered record.
        type_name: &'static str,
    },
    /// Encountered unexpected end of the token stream.
    #[error("unexpected end of token stream")]
    UnexpectedEof,
    /// JSON parsing or printing failed in the underlying stream library.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    /// I/O operation failed while reading or writing a stream.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// Internal invariant was violated.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, BindError>;
