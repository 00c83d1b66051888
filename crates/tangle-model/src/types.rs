// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Type descriptors.
//!
//! A [`TypeInfo`] is the runtime description of one type: its kind, where it
//! sits in the subtype lattice, its fields and its member table. Descriptors
//! refer to other types by [`TypeName`] so that self-referential and mutually
//! recursive records can be described; names are resolved through the
//! [`TypeRegistry`](crate::TypeRegistry).

use std::fmt;
use std::sync::Arc;

use crate::family::{ImmutableFamily, PersistentFamily};
use crate::members::{FieldInfo, Members};
use crate::name::TypeName;
use crate::value::Value;

/// Shared handle to a registered type descriptor.
pub type TypeRef = Arc<TypeInfo>;

/// Primitive (scalar) types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Primitive {
    /// `bool`
    Bool,
    /// `i8`
    I8,
    /// `i16`
    I16,
    /// `i32`
    I32,
    /// `i64`
    I64,
    /// `u8`
    U8,
    /// `u16`
    U16,
    /// `u32`
    U32,
    /// `u64`
    U64,
    /// `f32`
    F32,
    /// `f64`
    F64,
    /// `char` (Unicode scalar value)
    Char,
    /// UTF-8 string; nullable but never identity-tracked.
    String,
}

impl Primitive {
    /// Every primitive, in registration order.
    pub const ALL: [Self; 13] = [
        Self::Bool,
        Self::I8,
        Self::I16,
        Self::I32,
        Self::I64,
        Self::U8,
        Self::U16,
        Self::U32,
        Self::U64,
        Self::F32,
        Self::F64,
        Self::Char,
        Self::String,
    ];

    /// Stable type name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::I8 => "i8",
            Self::I16 => "i16",
            Self::I32 => "i32",
            Self::I64 => "i64",
            Self::U8 => "u8",
            Self::U16 => "u16",
            Self::U32 => "u32",
            Self::U64 => "u64",
            Self::F32 => "f32",
            Self::F64 => "f64",
            Self::Char => "char",
            Self::String => "string",
        }
    }

    /// Looks a primitive up by its stable name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.name() == name)
    }

    /// Value types are never null, never polymorphic and never tracked.
    #[must_use]
    pub const fn is_value_type(self) -> bool {
        !matches!(self, Self::String)
    }

    /// Zero value used for unset value-type fields.
    #[must_use]
    pub fn default_value(self) -> Value {
        match self {
            Self::Bool => Value::Bool(false),
            Self::I8 => Value::I8(0),
            Self::I16 => Value::I16(0),
            Self::I32 => Value::I32(0),
            Self::I64 => Value::I64(0),
            Self::U8 => Value::U8(0),
            Self::U16 => Value::U16(0),
            Self::U32 => Value::U32(0),
            Self::U64 => Value::U64(0),
            Self::F32 => Value::F32(0.0),
            Self::F64 => Value::F64(0.0),
            Self::Char => Value::Char('\0'),
            Self::String => Value::Null,
        }
    }

    pub(crate) const fn index(self) -> usize {
        self as usize
    }
}

/// Kinds of reflection metadata that can be carried as values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemberKind {
    /// Method handle.
    Method,
    /// Property handle.
    Property,
    /// Constructor handle.
    Constructor,
    /// Field handle.
    Field,
}

impl MemberKind {
    /// Name of the built-in type whose values carry this kind of handle.
    #[must_use]
    pub const fn type_name(self) -> &'static str {
        match self {
            Self::Method => "MethodInfo",
            Self::Property => "PropertyInfo",
            Self::Constructor => "ConstructorInfo",
            Self::Field => "FieldInfo",
        }
    }
}

/// Structural kind of a type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeKind {
    /// Scalar.
    Primitive(Primitive),
    /// The top type; every value is assignable to it.
    Object,
    /// Abstract contract; never instantiated directly.
    Interface,
    /// User-described record with named fields.
    Record,
    /// Fixed-length homogeneous array.
    Array(TypeName),
    /// Growable list, described through its member table.
    List(TypeName),
    /// Concrete hash map.
    Map(TypeName, TypeName),
    /// Hash set.
    Set(TypeName),
    /// Doubly linked sequence.
    LinkedList(TypeName),
    /// Immutable collection family with its type arguments.
    Immutable(ImmutableFamily, Vec<TypeName>),
    /// Persistent (F#-style) collection family with its type arguments.
    Persistent(PersistentFamily, Vec<TypeName>),
    /// Exception hierarchy.
    Exception,
    /// Symbolic reflection handle.
    Member(MemberKind),
    /// A type used as a value.
    TypeHandle,
    /// Bound method reference.
    Delegate,
}

/// Runtime description of a type.
#[derive(Clone)]
pub struct TypeInfo {
    pub(crate) name: TypeName,
    pub(crate) kind: TypeKind,
    pub(crate) base: Option<TypeName>,
    pub(crate) interfaces: Vec<TypeName>,
    pub(crate) sealed: bool,
    pub(crate) constructible: bool,
    pub(crate) fields: Vec<FieldInfo>,
    pub(crate) members: Members,
}

impl TypeInfo {
    pub(crate) fn builtin(name: impl Into<TypeName>, kind: TypeKind) -> Self {
        Self {
            name: name.into(),
            kind,
            base: None,
            interfaces: Vec::new(),
            sealed: true,
            constructible: true,
            fields: Vec::new(),
            members: Members::default(),
        }
    }

    /// Stable name.
    #[must_use]
    pub fn name(&self) -> &TypeName {
        &self.name
    }

    /// Structural kind.
    #[must_use]
    pub fn kind(&self) -> &TypeKind {
        &self.kind
    }

    /// Direct base type, if any.
    #[must_use]
    pub fn base(&self) -> Option<&TypeName> {
        self.base.as_ref()
    }

    /// Directly implemented interfaces.
    #[must_use]
    pub fn interfaces(&self) -> &[TypeName] {
        &self.interfaces
    }

    /// A sealed type has no subtypes, so a slot declared with it always holds
    /// exactly this type.
    #[must_use]
    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    /// Whether the engine may allocate instances of this type directly.
    #[must_use]
    pub fn is_constructible(&self) -> bool {
        self.constructible
    }

    /// Fields in flattened order (base fields first).
    #[must_use]
    pub fn fields(&self) -> &[FieldInfo] {
        &self.fields
    }

    /// Position of a field in the flattened field list.
    #[must_use]
    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name() == name)
    }

    /// Member table.
    #[must_use]
    pub fn members(&self) -> &Members {
        &self.members
    }

    /// Primitive kind, when this is a primitive type.
    #[must_use]
    pub fn primitive(&self) -> Option<Primitive> {
        match self.kind {
            TypeKind::Primitive(p) => Some(p),
            _ => None,
        }
    }

    /// Value-type primitives are never null and carry no framing token.
    #[must_use]
    pub fn is_value_type(&self) -> bool {
        self.primitive().is_some_and(Primitive::is_value_type)
    }

    /// `object` and interfaces cannot hold instances of themselves.
    #[must_use]
    pub fn is_abstract(&self) -> bool {
        matches!(self.kind, TypeKind::Object | TypeKind::Interface)
    }
}

impl fmt::Debug for TypeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeInfo")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("base", &self.base)
            .field("sealed", &self.sealed)
            .field("fields", &self.fields.len())
            .finish_non_exhaustive()
    }
}

impl PartialEq for TypeInfo {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for TypeInfo {}
