// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Object-graph values.
//!
//! Scalars and strings are plain values. Everything else lives behind an
//! [`ObjRef`]: a shared, interior-mutable handle whose address is its identity.
//! Two fields holding clones of one `ObjRef` alias the same object, and an
//! object may reach itself, so graphs can share and cycle.

use std::cell::{Ref, RefCell, RefMut};
use std::cmp::Ordering;
use std::collections::LinkedList;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;
use std::sync::Arc;

use rustc_hash::{FxHashMap, FxHashSet};

use crate::cons::ConsList;
use crate::error::ModelError;
use crate::name::TypeName;
use crate::types::{MemberKind, Primitive, TypeRef};

/// A node in an object graph.
///
/// Equality and hashing are by value for scalars and strings (floats compare
/// by bit pattern) and by identity for objects, so values can key maps and
/// sets. Use [`deep_eq`](crate::deep_eq) for structural comparison.
#[derive(Clone, Default)]
pub enum Value {
    /// Null reference.
    #[default]
    Null,
    /// `bool`
    Bool(bool),
    /// `i8`
    I8(i8),
    /// `i16`
    I16(i16),
    /// `i32`
    I32(i32),
    /// `i64`
    I64(i64),
    /// `u8`
    U8(u8),
    /// `u16`
    U16(u16),
    /// `u32`
    U32(u32),
    /// `u64`
    U64(u64),
    /// `f32`
    F32(f32),
    /// `f64`
    F64(f64),
    /// `char`
    Char(char),
    /// `string`
    Str(Rc<str>),
    /// Reference to an object.
    Object(ObjRef),
}

impl Value {
    /// Builds a string value.
    #[must_use]
    pub fn str(s: &str) -> Self {
        Self::Str(Rc::from(s))
    }

    /// Whether this is `Null`.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// The object handle, if this is an object reference.
    #[must_use]
    pub fn as_object(&self) -> Option<&ObjRef> {
        match self {
            Self::Object(obj) => Some(obj),
            _ => None,
        }
    }

    /// The string contents, if this is a string.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    /// The `i32` payload, if this is an `i32`.
    #[must_use]
    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Self::I32(v) => Some(*v),
            _ => None,
        }
    }

    /// The `i64` payload, if this is an `i64`.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::I64(v) => Some(*v),
            _ => None,
        }
    }

    /// The `bool` payload, if this is a `bool`.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Interprets any non-negative integer as a collection count.
    ///
    /// # Errors
    /// Returns [`ModelError::ValueMismatch`] for negative numbers and
    /// non-integers.
    pub fn as_count(&self) -> Result<usize, ModelError> {
        let count = match self {
            Self::I8(v) => usize::try_from(*v).ok(),
            Self::I16(v) => usize::try_from(*v).ok(),
            Self::I32(v) => usize::try_from(*v).ok(),
            Self::I64(v) => usize::try_from(*v).ok(),
            Self::U8(v) => Some(usize::from(*v)),
            Self::U16(v) => Some(usize::from(*v)),
            Self::U32(v) => usize::try_from(*v).ok(),
            Self::U64(v) => usize::try_from(*v).ok(),
            _ => None,
        };
        count.ok_or_else(|| ModelError::ValueMismatch {
            expected: "non-negative count",
            found: format!("{self:?}"),
        })
    }

    /// Primitive kind of a scalar or string value.
    #[must_use]
    pub fn primitive(&self) -> Option<Primitive> {
        Some(match self {
            Self::Bool(_) => Primitive::Bool,
            Self::I8(_) => Primitive::I8,
            Self::I16(_) => Primitive::I16,
            Self::I32(_) => Primitive::I32,
            Self::I64(_) => Primitive::I64,
            Self::U8(_) => Primitive::U8,
            Self::U16(_) => Primitive::U16,
            Self::U32(_) => Primitive::U32,
            Self::U64(_) => Primitive::U64,
            Self::F32(_) => Primitive::F32,
            Self::F64(_) => Primitive::F64,
            Self::Char(_) => Primitive::Char,
            Self::Str(_) => Primitive::String,
            Self::Null | Self::Object(_) => return None,
        })
    }

    /// Reference identity: both values are objects and share one allocation.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Object(a), Self::Object(b)) => a.ptr_eq(b),
            _ => false,
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Self::Null => 0,
            Self::Bool(_) => 1,
            Self::I8(_) => 2,
            Self::I16(_) => 3,
            Self::I32(_) => 4,
            Self::I64(_) => 5,
            Self::U8(_) => 6,
            Self::U16(_) => 7,
            Self::U32(_) => 8,
            Self::U64(_) => 9,
            Self::F32(_) => 10,
            Self::F64(_) => 11,
            Self::Char(_) => 12,
            Self::Str(_) => 13,
            Self::Object(_) => 14,
        }
    }

    /// Total order used by sorted collection families.
    ///
    /// Values of different kinds order by kind. Objects have no intrinsic
    /// order and compare equal, so a stable sort keeps them in the order
    /// they were supplied and a decoded copy enumerates like the original.
    #[must_use]
    pub fn total_cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Bool(a), Self::Bool(b)) => a.cmp(b),
            (Self::I8(a), Self::I8(b)) => a.cmp(b),
            (Self::I16(a), Self::I16(b)) => a.cmp(b),
            (Self::I32(a), Self::I32(b)) => a.cmp(b),
            (Self::I64(a), Self::I64(b)) => a.cmp(b),
            (Self::U8(a), Self::U8(b)) => a.cmp(b),
            (Self::U16(a), Self::U16(b)) => a.cmp(b),
            (Self::U32(a), Self::U32(b)) => a.cmp(b),
            (Self::U64(a), Self::U64(b)) => a.cmp(b),
            (Self::F32(a), Self::F32(b)) => a.total_cmp(b),
            (Self::F64(a), Self::F64(b)) => a.total_cmp(b),
            (Self::Char(a), Self::Char(b)) => a.cmp(b),
            (Self::Str(a), Self::Str(b)) => a.cmp(b),
            (Self::Object(_), Self::Object(_)) => Ordering::Equal,
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::F32(a), Self::F32(b)) => a.to_bits() == b.to_bits(),
            (Self::F64(a), Self::F64(b)) => a.to_bits() == b.to_bits(),
            (Self::Object(a), Self::Object(b)) => a.ptr_eq(b),
            _ => self.rank() == other.rank() && self.total_cmp(other) == Ordering::Equal,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.rank().hash(state);
        match self {
            Self::Null => {}
            Self::Bool(v) => v.hash(state),
            Self::I8(v) => v.hash(state),
            Self::I16(v) => v.hash(state),
            Self::I32(v) => v.hash(state),
            Self::I64(v) => v.hash(state),
            Self::U8(v) => v.hash(state),
            Self::U16(v) => v.hash(state),
            Self::U32(v) => v.hash(state),
            Self::U64(v) => v.hash(state),
            Self::F32(v) => v.to_bits().hash(state),
            Self::F64(v) => v.to_bits().hash(state),
            Self::Char(v) => v.hash(state),
            Self::Str(v) => v.hash(state),
            Self::Object(obj) => obj.identity().hash(state),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Bool(v) => write!(f, "{v}"),
            Self::I8(v) => write!(f, "{v}i8"),
            Self::I16(v) => write!(f, "{v}i16"),
            Self::I32(v) => write!(f, "{v}i32"),
            Self::I64(v) => write!(f, "{v}i64"),
            Self::U8(v) => write!(f, "{v}u8"),
            Self::U16(v) => write!(f, "{v}u16"),
            Self::U32(v) => write!(f, "{v}u32"),
            Self::U64(v) => write!(f, "{v}u64"),
            Self::F32(v) => write!(f, "{v}f32"),
            Self::F64(v) => write!(f, "{v}f64"),
            Self::Char(v) => write!(f, "{v:?}"),
            Self::Str(v) => write!(f, "{v:?}"),
            Self::Object(obj) => obj.fmt(f),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::I32(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::I64(v)
    }
}

impl From<u8> for Value {
    fn from(v: u8) -> Self {
        Self::U8(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::F64(v)
    }
}

impl From<char> for Value {
    fn from(v: char) -> Self {
        Self::Char(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::str(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Str(Rc::from(v))
    }
}

impl From<ObjRef> for Value {
    fn from(v: ObjRef) -> Self {
        Self::Object(v)
    }
}

impl<T: Into<Self>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}

struct Object {
    ty: TypeRef,
    data: RefCell<ObjectData>,
}

/// Shared handle to an object.
#[derive(Clone)]
pub struct ObjRef(Rc<Object>);

impl ObjRef {
    /// Allocates an object.
    #[must_use]
    pub fn new(ty: TypeRef, data: ObjectData) -> Self {
        Self(Rc::new(Object {
            ty,
            data: RefCell::new(data),
        }))
    }

    /// Runtime type.
    #[must_use]
    pub fn ty(&self) -> &TypeRef {
        &self.0.ty
    }

    /// Borrows the body.
    #[must_use]
    pub fn data(&self) -> Ref<'_, ObjectData> {
        self.0.data.borrow()
    }

    /// Mutably borrows the body.
    #[must_use]
    pub fn data_mut(&self) -> RefMut<'_, ObjectData> {
        self.0.data.borrow_mut()
    }

    /// Replaces the body, returning the previous one.
    pub fn replace(&self, data: ObjectData) -> ObjectData {
        self.0.data.replace(data)
    }

    /// Address-based identity, stable while the object is alive.
    #[must_use]
    pub fn identity(&self) -> usize {
        Rc::as_ptr(&self.0).cast::<()>().addr()
    }

    /// Whether two handles refer to the same object.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Reads a record field by name.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<Value> {
        let index = self.ty().field_index(name)?;
        match &*self.data() {
            ObjectData::Fields(values) => values.get(index).cloned(),
            _ => None,
        }
    }

    /// Writes a record field by name.
    ///
    /// # Errors
    /// Fails when the type has no such field or the object is not a record.
    pub fn set_field(&self, name: &str, value: Value) -> Result<(), ModelError> {
        let index = self
            .ty()
            .field_index(name)
            .ok_or_else(|| ModelError::UnknownField {
                ty: self.ty().name().clone(),
                field: name.to_owned(),
            })?;
        match &mut *self.data_mut() {
            ObjectData::Fields(values) if index < values.len() => {
                values[index] = value;
                Ok(())
            }
            _ => Err(ModelError::ShapeMismatch {
                ty: self.ty().name().clone(),
                expected: "record",
            }),
        }
    }

    /// Items of any sequence-shaped body, in enumeration order.
    ///
    /// Maps yield nothing; use [`ObjRef::entries`] for them.
    #[must_use]
    pub fn elements(&self) -> Vec<Value> {
        match &*self.data() {
            ObjectData::Items(items) => items.clone(),
            ObjectData::Linked(items) => items.iter().cloned().collect(),
            ObjectData::Set(items) => items.iter().cloned().collect(),
            ObjectData::Immutable(items) => items.to_vec(),
            ObjectData::Cons(list) => list.iter().cloned().collect(),
            _ => Vec::new(),
        }
    }

    /// Entries of any map-shaped body.
    #[must_use]
    pub fn entries(&self) -> Vec<(Value, Value)> {
        match &*self.data() {
            ObjectData::Map(map) => map.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
            ObjectData::ImmutableMap(entries) => entries.to_vec(),
            _ => Vec::new(),
        }
    }

    /// Runs `f` against the item vector of an `Items` body.
    ///
    /// Collection types described through member closures use this to reach
    /// their storage.
    ///
    /// # Errors
    /// Returns [`ModelError::ShapeMismatch`] for any other body.
    pub fn with_items<R>(&self, f: impl FnOnce(&mut Vec<Value>) -> R) -> Result<R, ModelError> {
        match &mut *self.data_mut() {
            ObjectData::Items(items) => Ok(f(items)),
            _ => Err(ModelError::ShapeMismatch {
                ty: self.ty().name().clone(),
                expected: "items",
            }),
        }
    }
}

impl fmt::Debug for ObjRef {
    // Never recurses into the body: graphs may be cyclic.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{:#x}", self.ty().name(), self.identity())
    }
}

/// Body of an object.
pub enum ObjectData {
    /// Allocated by a decoder but not filled yet.
    Pending,
    /// Record fields in flattened declaration order.
    Fields(Vec<Value>),
    /// Arrays, lists and item-backed custom collections.
    Items(Vec<Value>),
    /// Linked sequence.
    Linked(LinkedList<Value>),
    /// Hash set.
    Set(FxHashSet<Value>),
    /// Hash map.
    Map(FxHashMap<Value, Value>),
    /// Immutable or persistent sequence in enumeration order.
    Immutable(Rc<[Value]>),
    /// Immutable or persistent map in enumeration order.
    ImmutableMap(Rc<[(Value, Value)]>),
    /// Persistent cons list.
    Cons(ConsList),
    /// Exception state.
    Exception(ExceptionData),
    /// Symbolic reflection handle.
    Member(MemberRef),
    /// A type used as a value.
    TypeHandle(TypeName),
    /// Bound method reference.
    Delegate(DelegateData),
}

impl ObjectData {
    /// Short name of the body layout, for diagnostics.
    #[must_use]
    pub fn layout(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Fields(_) => "fields",
            Self::Items(_) => "items",
            Self::Linked(_) => "linked",
            Self::Set(_) => "set",
            Self::Map(_) => "map",
            Self::Immutable(_) => "immutable",
            Self::ImmutableMap(_) => "immutable-map",
            Self::Cons(_) => "cons",
            Self::Exception(_) => "exception",
            Self::Member(_) => "member",
            Self::TypeHandle(_) => "type",
            Self::Delegate(_) => "delegate",
        }
    }
}

/// Exception state exposed through public accessors only.
#[derive(Clone, Debug, Default)]
pub struct ExceptionData {
    message: Option<Rc<str>>,
    stack_trace: Option<Rc<str>>,
    inner: Value,
}

impl ExceptionData {
    /// Exception with a message.
    #[must_use]
    pub fn new(message: &str) -> Self {
        Self {
            message: Some(Rc::from(message)),
            ..Self::default()
        }
    }

    /// Builds exception state from its three parts.
    #[must_use]
    pub fn from_parts(message: Option<Rc<str>>, stack_trace: Option<Rc<str>>, inner: Value) -> Self {
        Self {
            message,
            stack_trace,
            inner,
        }
    }

    /// Sets the stack-trace text.
    #[must_use]
    pub fn with_stack_trace(mut self, stack_trace: &str) -> Self {
        self.stack_trace = Some(Rc::from(stack_trace));
        self
    }

    /// Sets the inner exception.
    #[must_use]
    pub fn with_inner(mut self, inner: Value) -> Self {
        self.inner = inner;
        self
    }

    /// Message text.
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// Stack-trace text.
    #[must_use]
    pub fn stack_trace(&self) -> Option<&str> {
        self.stack_trace.as_deref()
    }

    /// Inner exception, or `Null`.
    #[must_use]
    pub fn inner(&self) -> &Value {
        &self.inner
    }
}

/// Symbolic descriptor of a member: owner type, member name, and the
/// parameter signature used to pick an overload.
///
/// These are never live handles. They are re-resolved against a
/// [`TypeRegistry`](crate::TypeRegistry) wherever they are used.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct MemberRef {
    owner: TypeName,
    kind: MemberKind,
    name: Arc<str>,
    params: Vec<TypeName>,
}

impl MemberRef {
    /// Builds a descriptor of any kind.
    #[must_use]
    pub fn new(owner: TypeName, kind: MemberKind, name: &str, params: Vec<TypeName>) -> Self {
        Self {
            owner,
            kind,
            name: Arc::from(name),
            params,
        }
    }

    /// Method descriptor.
    #[must_use]
    pub fn method<P>(owner: impl Into<TypeName>, name: &str, params: P) -> Self
    where
        P: IntoIterator,
        P::Item: Into<TypeName>,
    {
        Self::new(
            owner.into(),
            MemberKind::Method,
            name,
            params.into_iter().map(Into::into).collect(),
        )
    }

    /// Property descriptor.
    #[must_use]
    pub fn property(owner: impl Into<TypeName>, name: &str) -> Self {
        Self::new(owner.into(), MemberKind::Property, name, Vec::new())
    }

    /// Field descriptor.
    #[must_use]
    pub fn field(owner: impl Into<TypeName>, name: &str) -> Self {
        Self::new(owner.into(), MemberKind::Field, name, Vec::new())
    }

    /// Constructor descriptor.
    #[must_use]
    pub fn constructor<P>(owner: impl Into<TypeName>, params: P) -> Self
    where
        P: IntoIterator,
        P::Item: Into<TypeName>,
    {
        Self::new(
            owner.into(),
            MemberKind::Constructor,
            "",
            params.into_iter().map(Into::into).collect(),
        )
    }

    /// Declaring type.
    #[must_use]
    pub fn owner(&self) -> &TypeName {
        &self.owner
    }

    /// Member kind.
    #[must_use]
    pub fn kind(&self) -> MemberKind {
        self.kind
    }

    /// Member name (empty for constructors).
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Parameter signature.
    #[must_use]
    pub fn params(&self) -> &[TypeName] {
        &self.params
    }
}

impl fmt::Display for MemberRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.owner, self.name)?;
        if matches!(self.kind, MemberKind::Method | MemberKind::Constructor) {
            f.write_str("(")?;
            for (i, p) in self.params.iter().enumerate() {
                if i > 0 {
                    f.write_str(",")?;
                }
                write!(f, "{p}")?;
            }
            f.write_str(")")?;
        }
        Ok(())
    }
}

/// A method bound to an optional target object.
#[derive(Clone, Debug)]
pub struct DelegateData {
    method: MemberRef,
    target: Value,
}

impl DelegateData {
    /// Binds `method` to `target` (`Null` for static methods).
    #[must_use]
    pub fn new(method: MemberRef, target: Value) -> Self {
        Self { method, target }
    }

    /// Method descriptor.
    #[must_use]
    pub fn method(&self) -> &MemberRef {
        &self.method
    }

    /// Bound target.
    #[must_use]
    pub fn target(&self) -> &Value {
        &self.target
    }
}
