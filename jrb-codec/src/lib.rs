//! JRB Codec - Converter resolution and record mapping engines
//!
//! This crate provides the conversion engines for JSON record binding:
//!
//! - Declared shapes and record schema construction
//! - A memoizing converter registry with lazy record resolution
//! - Built-in converters for scalar and container shapes
//! - The record mapping engine implementing the object framing protocol
//! - A typed binder facade over text and value entry points

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod binder;
pub mod containers;
pub mod convert;
pub mod record;
pub mod registry;
pub mod schema;

// Re-export commonly used types
pub use jrb_format::{
    BindError, FieldValue, PrimitiveKind, RecordBox, RecordType, Result, Token, TokenKind,
    TokenReader, TokenWriter, TypeDescriptor, ValueReader, ValueWriter,
};

// Re-export our own types
pub use binder::{Binder, BinderBuilder};
pub use containers::{ListConverter, MapConverter};
pub use convert::{Converter, PrimitiveConverter, StringConverter};
pub use record::RecordConverter;
pub use registry::{ConverterFactory, ConverterRegistry, Resolver};
pub use schema::{FieldBinding, RecordSchema, RecordSchemaBuilder, Shape};
