//! Record mapping engine
//!
//! Implements the object framing protocol for record-shaped values: null
//! short-circuit, member dispatch by wire name, unknown-member skipping,
//! and always-emit writing in declaration order.

use std::sync::Arc;

use jrb_format::{BindError, FieldValue, Result, TokenKind, TokenReader, TokenWriter};

use crate::convert::{value_shape_error, Converter};
use crate::schema::RecordSchema;

/// Converter for one registered record type
///
/// Field sub-converters are resolved once, in declaration order, when the
/// registry builds this converter.
pub struct RecordConverter {
    schema: Arc<RecordSchema>,
    converters: Vec<Arc<dyn Converter>>,
}

impl RecordConverter {
    pub(crate) fn new(schema: Arc<RecordSchema>, converters: Vec<Arc<dyn Converter>>) -> Self {
        debug_assert_eq!(schema.fields().len(), converters.len());
        Self { schema, converters }
    }
}

impl Converter for RecordConverter {
    fn read(&self, reader: &mut dyn TokenReader) -> Result<FieldValue> {
        match reader.peek()? {
            TokenKind::Null => {
                reader.read_null()?;
                return Ok(FieldValue::Null);
            }
            TokenKind::BeginObject => {}
            found => {
                return Err(BindError::TypeMismatch {
                    expected: TokenKind::BeginObject,
                    found,
                })
            }
        }

        reader.begin_object()?;
        let mut out = self.schema.new_instance();
        while reader.peek()? != TokenKind::EndObject {
            let name = reader.read_name()?;
            let index = match self.schema.field_index(&name) {
                Some(index) => index,
                None => {
                    // Unknown members are skipped, never an error
                    reader.skip_value()?;
                    continue;
                }
            };

            let field = &self.schema.fields()[index];
            if reader.peek()? == TokenKind::Null {
                // An explicit null leaves the field at its default; the
                // setter only runs for reference-shaped fields, where
                // setting absent is the same outcome
                reader.read_null()?;
                if !field.is_primitive() {
                    field.set(&mut out, FieldValue::Null)?;
                }
                continue;
            }

            // Repeated wire names overwrite: last value wins
            let value = self.converters[index].read(reader)?;
            field.set(&mut out, value)?;
        }
        reader.end_object()?;
        Ok(FieldValue::Record(out))
    }

    fn write(&self, writer: &mut dyn TokenWriter, value: &FieldValue) -> Result<()> {
        let record = match value {
            FieldValue::Null => return writer.write_null(),
            FieldValue::Record(record) => record,
            other => return Err(value_shape_error("record", other)),
        };

        writer.begin_object()?;
        for (field, converter) in self.schema.fields().iter().zip(&self.converters) {
            writer.write_name(field.wire_name())?;
            let value = field.get(record)?;
            converter.write(writer, &value)?;
        }
        writer.end_object()
    }
}
