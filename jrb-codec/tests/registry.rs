//! Registry dispatch, factory coexistence, and recursive record graphs

use std::sync::Arc;
use std::thread;

use jrb_codec::{
    BindError, Binder, Converter, ConverterFactory, FieldValue, PrimitiveKind, RecordBox,
    RecordSchema, RecordType, Resolver, Result, Shape, TokenKind, TokenReader, TokenWriter,
    TypeDescriptor,
};

#[derive(Debug, Default, Clone, PartialEq)]
struct Node {
    value: i32,
    next: Option<Box<Node>>,
}

fn node_schema() -> RecordSchema {
    RecordSchema::builder::<Node>()
        .field(
            "value",
            Shape::Primitive(PrimitiveKind::I32),
            |n| FieldValue::I32(n.value),
            |n, v| {
                if let Some(value) = v.into_i32() {
                    n.value = value;
                }
            },
        )
        .field(
            "next",
            Shape::record::<Node>(),
            |n| match &n.next {
                Some(next) => FieldValue::Record(RecordBox::new((**next).clone())),
                None => FieldValue::Null,
            },
            |n, v| {
                n.next = v
                    .into_record()
                    .and_then(|record| record.downcast::<Node>().ok())
                    .map(Box::new);
            },
        )
        .build()
        .expect("node schema")
}

#[test]
fn test_unregistered_type_is_fatal() {
    #[derive(Debug, Default)]
    struct Ghost;

    let binder = Binder::builder().build();
    let err = binder.read_str::<Ghost>("{}").unwrap_err();
    match err {
        BindError::UnknownType { type_name } => assert!(type_name.contains("Ghost")),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn test_self_referential_record_resolves() {
    let binder = Binder::builder().register_record(node_schema()).build();

    let node = binder
        .read_str::<Node>(r#"{"value": 1, "next": {"value": 2, "next": null}}"#)
        .expect("read")
        .expect("record");
    assert_eq!(
        node,
        Node {
            value: 1,
            next: Some(Box::new(Node {
                value: 2,
                next: None,
            })),
        }
    );

    let json = binder.write_string(Some(&node)).expect("write");
    assert_eq!(json, r#"{"value":1,"next":{"value":2,"next":null}}"#);
}

#[test]
fn test_deep_recursive_roundtrip() {
    let binder = Binder::builder().register_record(node_schema()).build();

    let mut node = Node {
        value: 0,
        next: None,
    };
    for value in 1..=16 {
        node = Node {
            value,
            next: Some(Box::new(node)),
        };
    }

    let json = binder.write_string(Some(&node)).expect("write");
    let back = binder.read_str::<Node>(&json).expect("read").expect("record");
    assert_eq!(back, node);
}

#[derive(Debug, Clone, PartialEq)]
struct Tag(String);

struct TagConverter;

impl Converter for TagConverter {
    fn read(&self, reader: &mut dyn TokenReader) -> Result<FieldValue> {
        if reader.peek()? == TokenKind::Null {
            reader.read_null()?;
            return Ok(FieldValue::Null);
        }
        Ok(FieldValue::Record(RecordBox::new(Tag(
            reader.read_string()?,
        ))))
    }

    fn write(&self, writer: &mut dyn TokenWriter, value: &FieldValue) -> Result<()> {
        match value {
            FieldValue::Null => writer.write_null(),
            FieldValue::Record(record) => match record.downcast_ref::<Tag>() {
                Some(tag) => writer.write_string(&tag.0),
                None => Err(BindError::Internal(
                    "tag converter applied to a foreign record".to_string(),
                )),
            },
            _ => Err(BindError::Internal("expected a record value".to_string())),
        }
    }
}

struct TagFactory;

impl ConverterFactory for TagFactory {
    fn create(
        &self,
        record: RecordType,
        _resolver: &mut dyn Resolver,
    ) -> Result<Option<Arc<dyn Converter>>> {
        if record == RecordType::of::<Tag>() {
            return Ok(Some(Arc::new(TagConverter)));
        }
        Ok(None)
    }
}

#[test]
fn test_factory_matches_by_exact_type() {
    let binder = Binder::builder()
        .register_factory(Arc::new(TagFactory))
        .build();

    let tag = binder
        .read_str::<Tag>(r#""alpha""#)
        .expect("read")
        .expect("record");
    assert_eq!(tag, Tag("alpha".to_string()));

    let json = binder.write_string(Some(&tag)).expect("write");
    assert_eq!(json, r#""alpha""#);
}

#[test]
fn test_factory_declines_other_types() {
    #[derive(Debug, Default, Clone)]
    struct Other;

    let binder = Binder::builder()
        .register_factory(Arc::new(TagFactory))
        .build();
    assert!(matches!(
        binder.read_str::<Other>("{}").unwrap_err(),
        BindError::UnknownType { .. }
    ));
}

#[test]
fn test_schemas_and_factories_coexist() {
    let binder = Binder::builder()
        .register_record(node_schema())
        .register_factory(Arc::new(TagFactory))
        .build();

    assert!(binder.read_str::<Node>(r#"{"value": 5}"#).is_ok());
    assert!(binder.read_str::<Tag>(r#""beta""#).is_ok());
}

#[test]
fn test_concurrent_first_use_resolves_one_converter() {
    let binder = Arc::new(Binder::builder().register_record(node_schema()).build());
    let descriptor = TypeDescriptor::record::<Node>();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let binder = Arc::clone(&binder);
            let descriptor = descriptor.clone();
            thread::spawn(move || binder.registry().resolve(&descriptor).expect("resolve"))
        })
        .collect();

    let converters: Vec<_> = handles
        .into_iter()
        .map(|handle| handle.join().expect("join"))
        .collect();
    for pair in converters.windows(2) {
        assert!(Arc::ptr_eq(&pair[0], &pair[1]));
    }
}

#[test]
fn test_shared_binder_converts_concurrently() {
    let binder = Arc::new(Binder::builder().register_record(node_schema()).build());

    let handles: Vec<_> = (0..4)
        .map(|i| {
            let binder = Arc::clone(&binder);
            thread::spawn(move || {
                for value in 0..50 {
                    let node = Node {
                        value: value + i,
                        next: Some(Box::new(Node {
                            value,
                            next: None,
                        })),
                    };
                    let json = binder.write_string(Some(&node)).expect("write");
                    let back = binder
                        .read_str::<Node>(&json)
                        .expect("read")
                        .expect("record");
                    assert_eq!(back, node);
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("join");
    }
}
