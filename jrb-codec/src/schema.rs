//! Declared shapes and record schema construction
//!
//! Schemas are supplied per record type as an ordered list of field
//! declarations: wire name, declared shape, and a statically bound
//! getter/setter pair. The builder validates the declarations and erases
//! the accessors so the engines can work without knowing the record type.

use std::any::{type_name, Any};
use std::fmt;
use std::marker::PhantomData;

use ahash::AHashMap;
use tracing::{debug, trace};

use jrb_format::{
    BindError, FieldValue, PrimitiveKind, RecordBox, RecordType, Result, TypeDescriptor,
};

/// Declared shape of a field
///
/// Richer than [`TypeDescriptor`]: map declarations carry an explicit key
/// shape, which is validated when the declaration is lowered. Shapes
/// outside the supported set are rejected at schema build time, before any
/// converter resolution happens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Shape {
    /// Unboxed numeric or boolean field
    Primitive(PrimitiveKind),
    /// Nullable (boxed) numeric or boolean field
    Boxed(PrimitiveKind),
    /// Nullable string field
    String,
    /// Ordered sequence of a nested shape
    List(Box<Shape>),
    /// Mapping with declared key and value shapes
    Map {
        /// Declared key shape; only `Shape::String` is supported
        key: Box<Shape>,
        /// Declared value shape
        value: Box<Shape>,
    },
    /// Reference to a record type
    Record(RecordType),
}

impl Shape {
    /// List shape over an element shape
    pub fn list(element: Shape) -> Self {
        Shape::List(Box::new(element))
    }

    /// Map shape over key and value shapes
    pub fn map(key: Shape, value: Shape) -> Self {
        Shape::Map {
            key: Box::new(key),
            value: Box::new(value),
        }
    }

    /// Record shape for the type `T`
    pub fn record<T: Any>() -> Self {
        Shape::Record(RecordType::of::<T>())
    }

    /// Lower the declared shape to a structural descriptor
    ///
    /// Fails with `UnsupportedKeyType` when a map declaration's key shape
    /// is not string.
    pub fn resolve(&self) -> Result<TypeDescriptor> {
        match self {
            Shape::Primitive(kind) => Ok(TypeDescriptor::Primitive(*kind)),
            Shape::Boxed(kind) => Ok(TypeDescriptor::Boxed(*kind)),
            Shape::String => Ok(TypeDescriptor::String),
            Shape::List(element) => Ok(TypeDescriptor::List(Box::new(element.resolve()?))),
            Shape::Map { key, value } => {
                if **key != Shape::String {
                    return Err(BindError::UnsupportedKeyType {
                        found: key.to_string(),
                    });
                }
                Ok(TypeDescriptor::Map(Box::new(value.resolve()?)))
            }
            Shape::Record(record) => Ok(TypeDescriptor::Record(*record)),
        }
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Shape::Primitive(kind) => write!(f, "{kind}"),
            Shape::Boxed(kind) => write!(f, "boxed {kind}"),
            Shape::String => f.write_str("string"),
            Shape::List(element) => write!(f, "list<{element}>"),
            Shape::Map { key, value } => write!(f, "map<{key}, {value}>"),
            Shape::Record(record) => write!(f, "record {record}"),
        }
    }
}

type GetFn = Box<dyn Fn(&RecordBox) -> Result<FieldValue> + Send + Sync>;
type SetFn = Box<dyn Fn(&mut RecordBox, FieldValue) -> Result<()> + Send + Sync>;
type NewFn = Box<dyn Fn() -> RecordBox + Send + Sync>;

/// One field of a record schema
///
/// Wire name, lowered descriptor, and the erased accessor pair. Raw field
/// access and custom accessor methods look identical here.
pub struct FieldBinding {
    wire_name: String,
    descriptor: TypeDescriptor,
    primitive: bool,
    get: GetFn,
    set: SetFn,
}

impl FieldBinding {
    /// External member name used in the serialized object
    pub fn wire_name(&self) -> &str {
        &self.wire_name
    }

    /// Structural descriptor of the field's shape
    pub fn descriptor(&self) -> &TypeDescriptor {
        &self.descriptor
    }

    /// Unboxed numeric or boolean field
    ///
    /// An explicit wire null leaves such a field at its scratch default
    /// instead of reaching the setter.
    pub fn is_primitive(&self) -> bool {
        self.primitive
    }

    /// Read the field's current value out of a record
    pub fn get(&self, record: &RecordBox) -> Result<FieldValue> {
        (self.get)(record)
    }

    /// Apply a new value to the field of a record
    pub fn set(&self, record: &mut RecordBox, value: FieldValue) -> Result<()> {
        (self.set)(record, value)
    }
}

impl fmt::Debug for FieldBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldBinding")
            .field("wire_name", &self.wire_name)
            .field("descriptor", &self.descriptor)
            .field("primitive", &self.primitive)
            .finish()
    }
}

/// Ordered field bindings plus identity and construction for one record type
pub struct RecordSchema {
    record: RecordType,
    new_instance: NewFn,
    fields: Vec<FieldBinding>,
    by_wire: AHashMap<String, usize>,
}

impl RecordSchema {
    /// Start a schema for the record type `T`
    pub fn builder<T: Any + Default>() -> RecordSchemaBuilder<T> {
        RecordSchemaBuilder::new()
    }

    /// Identity of the described record type
    pub fn record(&self) -> RecordType {
        self.record
    }

    /// Field bindings in declaration order
    pub fn fields(&self) -> &[FieldBinding] {
        &self.fields
    }

    /// Index of the field with the given wire name, exact match only
    pub fn field_index(&self, wire_name: &str) -> Option<usize> {
        self.by_wire.get(wire_name).copied()
    }

    /// Fresh scratch instance with every field at its type default
    pub fn new_instance(&self) -> RecordBox {
        (self.new_instance)()
    }
}

impl fmt::Debug for RecordSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordSchema")
            .field("record", &self.record)
            .field("fields", &self.fields)
            .finish()
    }
}

/// Typed builder binding statically known accessor functions for `T`
///
/// Accessors are plain function references, bound once per field at schema
/// definition time; no lookup happens during conversion.
pub struct RecordSchemaBuilder<T> {
    fields: Vec<(String, Shape, GetFn, SetFn)>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Any + Default> RecordSchemaBuilder<T> {
    /// Empty builder for `T`
    pub fn new() -> Self {
        Self {
            fields: Vec::new(),
            _marker: PhantomData,
        }
    }

    /// Declare the next field in wire order
    pub fn field(
        mut self,
        wire_name: &str,
        shape: Shape,
        get: fn(&T) -> FieldValue,
        set: fn(&mut T, FieldValue),
    ) -> Self {
        let erased_get: GetFn = Box::new(move |record| {
            let typed = record.downcast_ref::<T>().ok_or_else(|| accessor_error::<T>(record))?;
            Ok(get(typed))
        });
        let erased_set: SetFn = Box::new(move |record, value| {
            let typed = record.downcast_mut::<T>().ok_or_else(|| {
                BindError::Internal(format!(
                    "accessor for {} applied to a foreign record",
                    type_name::<T>()
                ))
            })?;
            set(typed, value);
            Ok(())
        });
        self.fields
            .push((wire_name.to_string(), shape, erased_get, erased_set));
        self
    }

    /// Validate the declarations and assemble the schema
    ///
    /// Fails on duplicate wire names and on declared shapes outside the
    /// supported set.
    pub fn build(self) -> Result<RecordSchema> {
        let record = RecordType::of::<T>();
        let mut fields = Vec::with_capacity(self.fields.len());
        let mut by_wire = AHashMap::with_capacity(self.fields.len());

        for (wire_name, shape, get, set) in self.fields {
            trace!(record = record.name(), field = %wire_name, shape = %shape, "binding field");
            let descriptor = shape.resolve()?;
            if by_wire.insert(wire_name.clone(), fields.len()).is_some() {
                return Err(BindError::DuplicateWireName {
                    wire_name,
                    record: record.name(),
                });
            }
            let primitive = matches!(descriptor, TypeDescriptor::Primitive(_));
            fields.push(FieldBinding {
                wire_name,
                descriptor,
                primitive,
                get,
                set,
            });
        }

        debug!(record = record.name(), fields = fields.len(), "record schema built");
        Ok(RecordSchema {
            record,
            new_instance: Box::new(|| RecordBox::new(T::default())),
            fields,
            by_wire,
        })
    }
}

impl<T: Any + Default> Default for RecordSchemaBuilder<T> {
    fn default() -> Self {
        Self::new()
    }
}

fn accessor_error<T>(record: &RecordBox) -> BindError {
    BindError::Internal(format!(
        "accessor for {} applied to {}",
        type_name::<T>(),
        record.type_name()
    ))
}
