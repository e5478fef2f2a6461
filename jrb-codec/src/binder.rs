//! High-level binder facade
//!
//! Schemas and factories are registered up front through the builder; the
//! built binder then exposes typed read/write entry points that drive the
//! record engine through the token shim. Parsing and printing of JSON text
//! stay in `serde_json`.

use std::any::Any;
use std::sync::Arc;

use serde_json::Value;

use jrb_format::{
    BindError, FieldValue, RecordBox, Result, TypeDescriptor, ValueReader, ValueWriter,
};

use crate::registry::{ConverterFactory, ConverterRegistry};
use crate::schema::RecordSchema;

/// Builder collecting record schemas and converter factories
#[derive(Default)]
pub struct BinderBuilder {
    schemas: Vec<RecordSchema>,
    factories: Vec<Arc<dyn ConverterFactory>>,
}

impl BinderBuilder {
    /// Empty builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a record schema
    pub fn register_record(mut self, schema: RecordSchema) -> Self {
        self.schemas.push(schema);
        self
    }

    /// Register a converter factory
    pub fn register_factory(mut self, factory: Arc<dyn ConverterFactory>) -> Self {
        self.factories.push(factory);
        self
    }

    /// Assemble the binder
    pub fn build(self) -> Binder {
        let registry = ConverterRegistry::new();
        for schema in self.schemas {
            registry.register_record(schema);
        }
        for factory in self.factories {
            registry.register_factory(factory);
        }
        Binder { registry }
    }
}

/// Typed facade over the converter registry
pub struct Binder {
    registry: ConverterRegistry,
}

impl Binder {
    /// Start building a binder
    pub fn builder() -> BinderBuilder {
        BinderBuilder::new()
    }

    /// The underlying registry
    pub fn registry(&self) -> &ConverterRegistry {
        &self.registry
    }

    /// Read a record of type `T` from a parsed JSON value
    ///
    /// A JSON null reads as `None`, never as an all-default record.
    pub fn read_value<T: Any>(&self, value: &Value) -> Result<Option<T>> {
        let converter = self.registry.resolve(&TypeDescriptor::record::<T>())?;
        let mut reader = ValueReader::new(value);
        match converter.read(&mut reader)? {
            FieldValue::Null => Ok(None),
            FieldValue::Record(record) => {
                let produced = record.type_name();
                match record.downcast::<T>() {
                    Ok(typed) => Ok(Some(typed)),
                    Err(_) => Err(BindError::Internal(format!(
                        "record converter produced {} where {} was requested",
                        produced,
                        std::any::type_name::<T>()
                    ))),
                }
            }
            other => Err(BindError::Internal(format!(
                "record converter produced a non-record value: {other:?}"
            ))),
        }
    }

    /// Read a record of type `T` from JSON text
    pub fn read_str<T: Any>(&self, json: &str) -> Result<Option<T>> {
        let value: Value = serde_json::from_str(json)?;
        self.read_value(&value)
    }

    /// Write a record of type `T` as a JSON value
    ///
    /// An absent record writes as JSON null.
    pub fn write_value<T: Any + Clone>(&self, record: Option<&T>) -> Result<Value> {
        let converter = self.registry.resolve(&TypeDescriptor::record::<T>())?;
        let value = match record {
            Some(record) => FieldValue::Record(RecordBox::new(record.clone())),
            None => FieldValue::Null,
        };
        let mut writer = ValueWriter::new();
        converter.write(&mut writer, &value)?;
        writer.into_value()
    }

    /// Write a record of type `T` as JSON text
    pub fn write_string<T: Any + Clone>(&self, record: Option<&T>) -> Result<String> {
        let value = self.write_value(record)?;
        Ok(serde_json::to_string(&value)?)
    }
}
