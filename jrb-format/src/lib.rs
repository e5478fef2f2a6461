//! JRB Format - Core primitives for JSON record binding
//!
//! This crate provides the building blocks the binding engines are written
//! against, with no conversion logic of its own. It includes:
//!
//! - Token kinds and owned tokens for the stream protocol
//! - The `TokenReader`/`TokenWriter` traits and their `serde_json`-backed shims
//! - The dynamic field value model exchanged between converters and accessors
//! - Structural type descriptors driving converter resolution
//! - Error types

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod descriptor;
pub mod error;
pub mod reader;
pub mod token;
pub mod value;
pub mod writer;

// Re-export commonly used types
pub use descriptor::{PrimitiveKind, RecordType, TypeDescriptor};
pub use error::{BindError, Result};
pub use reader::{TokenReader, ValueReader};
pub use token::{Token, TokenKind};
pub use value::{FieldValue, RecordBox};
pub use writer::{TokenWriter, ValueWriter};
