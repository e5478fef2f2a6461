//! Converters for the recursive container shapes
//!
//! Container converters capture their element converter once at
//! construction; nothing is re-resolved per call. Each read produces a
//! fresh accumulator.

use std::collections::BTreeMap;
use std::sync::Arc;

use jrb_format::{FieldValue, Result, TokenKind, TokenReader, TokenWriter};

use crate::convert::{read_null_if_present, value_shape_error, Converter};

/// Converter for list shapes
pub struct ListConverter {
    element: Arc<dyn Converter>,
}

impl ListConverter {
    /// List converter delegating elements to `element`
    pub fn new(element: Arc<dyn Converter>) -> Self {
        Self { element }
    }
}

impl Converter for ListConverter {
    fn read(&self, reader: &mut dyn TokenReader) -> Result<FieldValue> {
        if read_null_if_present(reader)? {
            return Ok(FieldValue::Null);
        }
        reader.begin_array()?;
        let mut items = Vec::new();
        while reader.peek()? != TokenKind::EndArray {
            items.push(self.element.read(reader)?);
        }
        reader.end_array()?;
        Ok(FieldValue::List(items))
    }

    fn write(&self, writer: &mut dyn TokenWriter, value: &FieldValue) -> Result<()> {
        match value {
            FieldValue::Null => writer.write_null(),
            FieldValue::List(items) => {
                writer.begin_array()?;
                for item in items {
                    self.element.write(writer, item)?;
                }
                writer.end_array()
            }
            other => Err(value_shape_error("list", other)),
        }
    }
}

/// Converter for string-keyed map shapes
pub struct MapConverter {
    value: Arc<dyn Converter>,
}

impl MapConverter {
    /// Map converter delegating member values to `value`
    pub fn new(value: Arc<dyn Converter>) -> Self {
        Self { value }
    }
}

impl Converter for MapConverter {
    fn read(&self, reader: &mut dyn TokenReader) -> Result<FieldValue> {
        if read_null_if_present(reader)? {
            return Ok(FieldValue::Null);
        }
        reader.begin_object()?;
        let mut members = BTreeMap::new();
        while reader.peek()? != TokenKind::EndObject {
            let key = reader.read_name()?;
            let value = self.value.read(reader)?;
            // Repeated wire keys overwrite: last value wins
            members.insert(key, value);
        }
        reader.end_object()?;
        Ok(FieldValue::Map(members))
    }

    fn write(&self, writer: &mut dyn TokenWriter, value: &FieldValue) -> Result<()> {
        match value {
            FieldValue::Null => writer.write_null(),
            FieldValue::Map(members) => {
                writer.begin_object()?;
                for (key, member) in members {
                    writer.write_name(key)?;
                    self.value.write(writer, member)?;
                }
                writer.end_object()
            }
            other => Err(value_shape_error("map", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::{PrimitiveConverter, StringConverter};
    use jrb_format::{BindError, PrimitiveKind, Token, ValueReader, ValueWriter};
    use proptest::prelude::*;
    use serde_json::json;

    fn int_list() -> ListConverter {
        ListConverter::new(Arc::new(PrimitiveConverter::new(PrimitiveKind::I32)))
    }

    fn string_map() -> MapConverter {
        MapConverter::new(Arc::new(StringConverter))
    }

    fn read_one(converter: &dyn Converter, value: serde_json::Value) -> Result<FieldValue> {
        let mut reader = ValueReader::new(&value);
        converter.read(&mut reader)
    }

    fn write_one(converter: &dyn Converter, value: &FieldValue) -> Result<serde_json::Value> {
        let mut writer = ValueWriter::new();
        converter.write(&mut writer, value)?;
        writer.into_value()
    }

    #[test]
    fn test_list_preserves_order_and_count() {
        let converter = int_list();
        let value = read_one(&converter, json!([1, 2, 3])).expect("read");
        assert_eq!(
            value,
            FieldValue::List(vec![
                FieldValue::I32(1),
                FieldValue::I32(2),
                FieldValue::I32(3),
            ])
        );
        assert_eq!(write_one(&converter, &value).expect("write"), json!([1, 2, 3]));
    }

    #[test]
    fn test_empty_list() {
        let converter = int_list();
        let value = read_one(&converter, json!([])).expect("read");
        assert_eq!(value, FieldValue::List(vec![]));
        assert_eq!(write_one(&converter, &value).expect("write"), json!([]));
    }

    #[test]
    fn test_list_null_elements_pass_through() {
        let converter = int_list();
        let value = read_one(&converter, json!([1, null, 3])).expect("read");
        assert_eq!(
            value,
            FieldValue::List(vec![
                FieldValue::I32(1),
                FieldValue::Null,
                FieldValue::I32(3),
            ])
        );
        assert_eq!(
            write_one(&converter, &value).expect("write"),
            json!([1, null, 3])
        );
    }

    #[test]
    fn test_list_requires_array_start() {
        let err = read_one(&int_list(), json!(7)).unwrap_err();
        assert_eq!(err.to_string(), "expected begin-array but was number");
    }

    #[test]
    fn test_map_roundtrip() {
        let converter = string_map();
        let value =
            read_one(&converter, json!({"key1": "value1", "key2": "value2"})).expect("read");
        let expected: BTreeMap<String, FieldValue> = [
            ("key1".to_string(), FieldValue::Str("value1".to_string())),
            ("key2".to_string(), FieldValue::Str("value2".to_string())),
        ]
        .into_iter()
        .collect();
        assert_eq!(value, FieldValue::Map(expected));
        assert_eq!(
            write_one(&converter, &value).expect("write"),
            json!({"key1": "value1", "key2": "value2"})
        );
    }

    #[test]
    fn test_map_of_map_roundtrip() {
        let converter = MapConverter::new(Arc::new(string_map()));
        let input = json!({
            "key1": {"key11": "value1", "key12": "value2"},
            "key2": {"key21": "value1", "key22": "value2"},
        });
        let value = read_one(&converter, input.clone()).expect("read");
        assert_eq!(write_one(&converter, &value).expect("write"), input);
    }

    #[test]
    fn test_map_duplicate_keys_last_wins() {
        let converter = string_map();
        let mut reader = ValueReader::from_tokens(vec![
            Token::BeginObject,
            Token::Name("k".to_string()),
            Token::String("first".to_string()),
            Token::Name("k".to_string()),
            Token::String("second".to_string()),
            Token::EndObject,
        ]);
        let value = converter.read(&mut reader).expect("read");
        let expected: BTreeMap<String, FieldValue> =
            [("k".to_string(), FieldValue::Str("second".to_string()))]
                .into_iter()
                .collect();
        assert_eq!(value, FieldValue::Map(expected));
    }

    #[test]
    fn test_map_requires_object_start() {
        let err = read_one(&string_map(), json!([])).unwrap_err();
        assert_eq!(err.to_string(), "expected begin-object but was begin-array");
    }

    #[test]
    fn test_truncated_container_surfaces_eof() {
        let converter = int_list();
        let mut reader = ValueReader::from_tokens(vec![Token::BeginArray, Token::Number(1.into())]);
        assert!(matches!(
            converter.read(&mut reader).unwrap_err(),
            BindError::UnexpectedEof
        ));
    }

    proptest! {
        #[test]
        fn prop_int_list_roundtrip(items in prop::collection::vec(any::<i32>(), 0..32)) {
            let converter = int_list();
            let input = serde_json::Value::Array(
                items.iter().copied().map(serde_json::Value::from).collect(),
            );
            let value = read_one(&converter, input.clone()).expect("read");
            prop_assert_eq!(write_one(&converter, &value).expect("write"), input);
        }

        #[test]
        fn prop_string_map_roundtrip(
            members in prop::collection::btree_map("[a-z]{1,8}", "[a-z0-9]{0,8}", 0..16)
        ) {
            let converter = string_map();
            let input = serde_json::Value::Object(
                members
                    .iter()
                    .map(|(k, v)| (k.clone(), serde_json::Value::from(v.clone())))
                    .collect(),
            );
            let value = read_one(&converter, input.clone()).expect("read");
            prop_assert_eq!(write_one(&converter, &value).expect("write"), input);
        }
    }
}
