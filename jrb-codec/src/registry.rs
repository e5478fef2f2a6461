//! Converter resolution and caching
//!
//! The registry memoizes one converter per distinct type descriptor.
//! Resolution of a previously unseen descriptor runs under a single
//! exclusive critical section covering check-cache, construct, and insert,
//! so concurrent first-use can never cache two divergent instances;
//! container converters capture their element converter at construction
//! and a divergent reference would only surface once resolution order
//! changed.
//!
//! Record descriptors resolve to an indirection cell that is inserted into
//! the cache before the underlying record converter is built, which is
//! what lets self-referential record graphs terminate.

use std::any::TypeId;
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use ahash::AHashMap;
use tracing::{debug, trace};

use jrb_format::{
    BindError, FieldValue, RecordType, Result, TokenReader, TokenWriter, TypeDescriptor,
};

use crate::containers::{ListConverter, MapConverter};
use crate::convert::{Converter, PrimitiveConverter, StringConverter};
use crate::record::RecordConverter;
use crate::schema::RecordSchema;

/// Resolution capability handed to converter factories
///
/// Factory-built converters resolve their sub-converters through this,
/// inside the same critical section as the enclosing resolution.
pub trait Resolver {
    /// Resolve the converter for a descriptor
    fn resolve(&mut self, descriptor: &TypeDescriptor) -> Result<Arc<dyn Converter>>;
}

/// Factory capability for record converters
///
/// Given a requested record type, a factory either returns a matching
/// converter or declines, so several independently generated mapping
/// engines can coexist behind one registry. Matching is by exact type
/// identity; subtype compatibility is deliberately not honored.
pub trait ConverterFactory: Send + Sync {
    /// Build a converter for `record`, or decline with `Ok(None)`
    fn create(
        &self,
        record: RecordType,
        resolver: &mut dyn Resolver,
    ) -> Result<Option<Arc<dyn Converter>>>;
}

struct Inner {
    cache: AHashMap<TypeDescriptor, Arc<dyn Converter>>,
    schemas: AHashMap<TypeId, Arc<RecordSchema>>,
    factories: Vec<Arc<dyn ConverterFactory>>,
}

/// Memoizing converter registry keyed by type descriptor
pub struct ConverterRegistry {
    inner: Mutex<Inner>,
}

impl ConverterRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                cache: AHashMap::new(),
                schemas: AHashMap::new(),
                factories: Vec::new(),
            }),
        }
    }

    /// Register a record schema
    ///
    /// Converters already resolved keep the schema they were built from;
    /// registration is expected to happen before first use.
    pub fn register_record(&self, schema: RecordSchema) {
        let mut inner = self.lock();
        debug!(record = schema.record().name(), "registering record schema");
        inner.schemas.insert(schema.record().id(), Arc::new(schema));
    }

    /// Append a converter factory, consulted after registered schemas in
    /// registration order
    pub fn register_factory(&self, factory: Arc<dyn ConverterFactory>) {
        self.lock().factories.push(factory);
    }

    /// Resolve the converter for a descriptor, building and caching it on
    /// first use
    pub fn resolve(&self, descriptor: &TypeDescriptor) -> Result<Arc<dyn Converter>> {
        resolve_in(&mut self.lock(), descriptor)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for ConverterRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn resolve_in(inner: &mut Inner, descriptor: &TypeDescriptor) -> Result<Arc<dyn Converter>> {
    if let Some(converter) = inner.cache.get(descriptor) {
        return Ok(Arc::clone(converter));
    }

    trace!(descriptor = ?descriptor, "constructing converter");
    let converter: Arc<dyn Converter> = match descriptor {
        TypeDescriptor::Primitive(kind) | TypeDescriptor::Boxed(kind) => {
            Arc::new(PrimitiveConverter::new(*kind))
        }
        TypeDescriptor::String => Arc::new(StringConverter),
        TypeDescriptor::List(element) => {
            Arc::new(ListConverter::new(resolve_in(inner, element)?))
        }
        TypeDescriptor::Map(value) => Arc::new(MapConverter::new(resolve_in(inner, value)?)),
        TypeDescriptor::Record(record) => return resolve_record(inner, descriptor, *record),
    };
    inner.cache.insert(descriptor.clone(), Arc::clone(&converter));
    Ok(converter)
}

fn resolve_record(
    inner: &mut Inner,
    descriptor: &TypeDescriptor,
    record: RecordType,
) -> Result<Arc<dyn Converter>> {
    // The unpopulated cell goes into the cache first so that a record
    // containing a field of its own type resolves to the cell instead of
    // recursing into construction again
    let cell = Arc::new(LazyRecordConverter::new(record));
    inner
        .cache
        .insert(descriptor.clone(), cell.clone() as Arc<dyn Converter>);

    match build_record(inner, record) {
        Ok(converter) => {
            cell.populate(converter)?;
            debug!(record = record.name(), "record converter resolved");
            Ok(cell)
        }
        Err(err) => {
            inner.cache.remove(descriptor);
            Err(err)
        }
    }
}

fn build_record(inner: &mut Inner, record: RecordType) -> Result<Arc<dyn Converter>> {
    if let Some(schema) = inner.schemas.get(&record.id()).cloned() {
        let mut converters = Vec::with_capacity(schema.fields().len());
        for field in schema.fields() {
            converters.push(resolve_in(inner, field.descriptor())?);
        }
        return Ok(Arc::new(RecordConverter::new(schema, converters)));
    }

    let factories: Vec<Arc<dyn ConverterFactory>> = inner.factories.clone();
    for factory in factories {
        let mut resolver = InnerResolver { inner: &mut *inner };
        if let Some(converter) = factory.create(record, &mut resolver)? {
            return Ok(converter);
        }
    }

    Err(BindError::UnknownType {
        type_name: record.name(),
    })
}

struct InnerResolver<'a> {
    inner: &'a mut Inner,
}

impl Resolver for InnerResolver<'_> {
    fn resolve(&mut self, descriptor: &TypeDescriptor) -> Result<Arc<dyn Converter>> {
        resolve_in(self.inner, descriptor)
    }
}

/// Indirection cell populated once the underlying record converter exists
struct LazyRecordConverter {
    record: RecordType,
    cell: OnceLock<Arc<dyn Converter>>,
}

impl LazyRecordConverter {
    fn new(record: RecordType) -> Self {
        Self {
            record,
            cell: OnceLock::new(),
        }
    }

    fn populate(&self, converter: Arc<dyn Converter>) -> Result<()> {
        self.cell.set(converter).map_err(|_| {
            BindError::Internal(format!(
                "record converter for {} populated twice",
                self.record.name()
            ))
        })
    }

    fn get(&self) -> Result<&Arc<dyn Converter>> {
        self.cell.get().ok_or_else(|| {
            BindError::Internal(format!(
                "record converter for {} used before its registration completed",
                self.record.name()
            ))
        })
    }
}

impl Converter for LazyRecordConverter {
    fn read(&self, reader: &mut dyn TokenReader) -> Result<FieldValue> {
        self.get()?.read(reader)
    }

    fn write(&self, writer: &mut dyn TokenWriter, value: &FieldValue) -> Result<()> {
        self.get()?.write(writer, value)
    }
}
