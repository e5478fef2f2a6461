//! Converter trait and built-in scalar converters

use jrb_format::{
    BindError, FieldValue, PrimitiveKind, Result, TokenKind, TokenReader, TokenWriter,
};

/// Paired read/write capability for one descriptor shape
///
/// Converters are stateless with respect to any single conversion, are
/// constructed once per distinct descriptor, and are shared behind `Arc`
/// for the registry's lifetime.
pub trait Converter: Send + Sync {
    /// Read one value (or null) from the stream
    fn read(&self, reader: &mut dyn TokenReader) -> Result<FieldValue>;
    /// Write one value (or null) to the stream
    fn write(&self, writer: &mut dyn TokenWriter, value: &FieldValue) -> Result<()>;
}

/// Consume a leading null token if present
pub(crate) fn read_null_if_present(reader: &mut dyn TokenReader) -> Result<bool> {
    if reader.peek()? == TokenKind::Null {
        reader.read_null()?;
        return Ok(true);
    }
    Ok(false)
}

pub(crate) fn value_shape_error(expected: &str, found: &FieldValue) -> BindError {
    BindError::Internal(format!(
        "converter expected a {expected} value, found {found:?}"
    ))
}

fn narrowed<T: TryFrom<i64>>(value: i64, target: &'static str) -> Result<T> {
    T::try_from(value).map_err(|_| BindError::NumberOutOfRange {
        value: value.to_string(),
        target,
    })
}

fn single_char(value: String) -> Result<char> {
    let mut chars = value.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Ok(c),
        _ => Err(BindError::InvalidCharacter { found: value }),
    }
}

/// Converter for numeric, boolean, and character kinds
///
/// Boxed and unboxed declarations share this converter; null handling at
/// the field level is the record engine's concern, null handling inside
/// containers is handled here by the leading-null check.
pub struct PrimitiveConverter {
    kind: PrimitiveKind,
}

impl PrimitiveConverter {
    /// Converter for one primitive kind
    pub fn new(kind: PrimitiveKind) -> Self {
        Self { kind }
    }
}

impl Converter for PrimitiveConverter {
    fn read(&self, reader: &mut dyn TokenReader) -> Result<FieldValue> {
        if read_null_if_present(reader)? {
            return Ok(FieldValue::Null);
        }
        Ok(match self.kind {
            PrimitiveKind::I8 => FieldValue::I8(narrowed(reader.read_i64()?, "i8")?),
            PrimitiveKind::I16 => FieldValue::I16(narrowed(reader.read_i64()?, "i16")?),
            PrimitiveKind::I32 => FieldValue::I32(narrowed(reader.read_i64()?, "i32")?),
            PrimitiveKind::I64 => FieldValue::I64(reader.read_i64()?),
            PrimitiveKind::F32 => FieldValue::F32(reader.read_f64()? as f32),
            PrimitiveKind::F64 => FieldValue::F64(reader.read_f64()?),
            PrimitiveKind::Bool => FieldValue::Bool(reader.read_bool()?),
            PrimitiveKind::Char => FieldValue::Char(single_char(reader.read_string()?)?),
        })
    }

    fn write(&self, writer: &mut dyn TokenWriter, value: &FieldValue) -> Result<()> {
        match value {
            FieldValue::Null => writer.write_null(),
            FieldValue::I8(value) => writer.write_i64(i64::from(*value)),
            FieldValue::I16(value) => writer.write_i64(i64::from(*value)),
            FieldValue::I32(value) => writer.write_i64(i64::from(*value)),
            FieldValue::I64(value) => writer.write_i64(*value),
            FieldValue::F32(value) => writer.write_f64(f64::from(*value)),
            FieldValue::F64(value) => writer.write_f64(*value),
            FieldValue::Bool(value) => writer.write_bool(*value),
            FieldValue::Char(value) => writer.write_string(&value.to_string()),
            other => Err(value_shape_error("number, boolean, or character", other)),
        }
    }
}

/// Converter for string fields
pub struct StringConverter;

impl Converter for StringConverter {
    fn read(&self, reader: &mut dyn TokenReader) -> Result<FieldValue> {
        if read_null_if_present(reader)? {
            return Ok(FieldValue::Null);
        }
        Ok(FieldValue::Str(reader.read_string()?))
    }

    fn write(&self, writer: &mut dyn TokenWriter, value: &FieldValue) -> Result<()> {
        match value {
            FieldValue::Null => writer.write_null(),
            FieldValue::Str(value) => writer.write_string(value),
            other => Err(value_shape_error("string", other)),
        }
    }
}
