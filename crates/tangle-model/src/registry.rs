// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! The type registry: every type a graph may contain, by stable name.
//!
//! Non-generic types are registered up front. Generic instantiations
//! (`List<i32>`, `Map<string,Node>`, ...) are constructed the first time a
//! name is resolved and published lock-free, so concurrent resolution of the
//! same name converges on one descriptor.

use std::sync::Arc;

use rustc_hash::FxHashSet;
use tracing::trace;

use crate::builtins;
use crate::error::ModelError;
use crate::family::{ImmutableFamily, PersistentFamily};
use crate::members::{ConstructorInfo, FieldInfo, MethodInfo, PropertyInfo};
use crate::name::{TypeExpr, TypeName};
use crate::snapshot::SnapshotMap;
use crate::types::{MemberKind, Primitive, TypeInfo, TypeKind, TypeRef};
use crate::value::{DelegateData, ExceptionData, MemberRef, ObjRef, ObjectData, Value};

/// A member descriptor resolved against its owner type.
#[derive(Clone, Debug)]
pub enum ResolvedMember {
    /// Method.
    Method(MethodInfo),
    /// Property.
    Property(PropertyInfo),
    /// Constructor.
    Constructor(ConstructorInfo),
    /// Field.
    Field(FieldInfo),
}

/// Registry of type descriptors, shared across threads.
#[derive(Debug)]
pub struct TypeRegistry {
    types: SnapshotMap<TypeName, TypeRef>,
    object: TypeRef,
    exception: TypeRef,
    primitives: Vec<TypeRef>,
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeRegistry {
    /// Registry seeded with the built-in types.
    #[must_use]
    pub fn new() -> Self {
        let types = SnapshotMap::new();
        let mut roots = Vec::new();
        for info in builtins::roots() {
            let ty = Arc::new(info);
            types.publish(ty.name().clone(), Arc::clone(&ty));
            roots.push(ty);
        }
        let find = |name: &str| {
            roots
                .iter()
                .find(|t| t.name().as_str() == name)
                .cloned()
                .unwrap_or_else(|| Arc::new(TypeInfo::builtin(name, TypeKind::Object)))
        };
        Self {
            object: find(builtins::OBJECT),
            exception: find(builtins::EXCEPTION),
            primitives: Primitive::ALL.into_iter().map(|p| find(p.name())).collect(),
            types,
        }
    }

    /// The top type.
    #[must_use]
    pub fn object(&self) -> &TypeRef {
        &self.object
    }

    /// Root of the exception hierarchy.
    #[must_use]
    pub fn exception_root(&self) -> &TypeRef {
        &self.exception
    }

    /// Descriptor of a primitive.
    #[must_use]
    pub fn primitive(&self, p: Primitive) -> &TypeRef {
        &self.primitives[p.index()]
    }

    /// Number of descriptors published so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Always false: the registry is seeded with built-ins.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Registers a user type.
    ///
    /// # Errors
    /// Fails when the name is malformed or taken, when the base or an
    /// interface is unknown, when the base is sealed or of a different kind,
    /// or when flattening the base fields produces a duplicate field name.
    pub fn register(&self, mut info: TypeInfo) -> Result<TypeRef, ModelError> {
        TypeExpr::parse(info.name.as_str())?;
        if self.types.contains(info.name.as_str()) {
            return Err(ModelError::DuplicateType(info.name));
        }
        if let Some(base_name) = info.base.clone() {
            let base = self.resolve(base_name.as_str())?;
            if base.is_sealed() {
                return Err(ModelError::SealedBase {
                    ty: info.name,
                    base: base_name,
                });
            }
            let compatible = matches!(
                (&info.kind, &base.kind),
                (TypeKind::Record, TypeKind::Record) | (TypeKind::Exception, TypeKind::Exception)
            );
            if !compatible {
                return Err(ModelError::IncompatibleBase {
                    ty: info.name,
                    base: base_name,
                });
            }
            let mut fields = base.fields.clone();
            fields.append(&mut info.fields);
            info.fields = fields;
        }
        for interface in &info.interfaces {
            let iface = self.resolve(interface.as_str())?;
            if iface.kind != TypeKind::Interface {
                return Err(ModelError::NotAnInterface(interface.clone()));
            }
        }
        let mut seen = FxHashSet::default();
        for field in &info.fields {
            if !seen.insert(field.name()) {
                return Err(ModelError::DuplicateField {
                    ty: info.name.clone(),
                    field: field.name().to_owned(),
                });
            }
        }
        let name = info.name.clone();
        let published = self.types.publish(name.clone(), Arc::new(info));
        if published.was_inserted() {
            trace!(ty = %name, "registered type");
            Ok(published.into_inner())
        } else {
            Err(ModelError::DuplicateType(name))
        }
    }

    /// Looks up an already published descriptor.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<TypeRef> {
        self.types
            .get(name)
            .or_else(|| self.types.get(TypeName::from(name).as_str()))
    }

    /// Looks up a descriptor, constructing generic instantiations on demand.
    ///
    /// # Errors
    /// Returns [`ModelError::InvalidTypeName`] for malformed names,
    /// [`ModelError::UnknownType`] for names that are neither registered nor
    /// a known generic family, and [`ModelError::GenericArity`] for families
    /// given the wrong number of arguments.
    pub fn resolve(&self, name: &str) -> Result<TypeRef, ModelError> {
        if let Some(ty) = self.get(name) {
            return Ok(ty);
        }
        let expr = TypeExpr::parse(name)?;
        self.resolve_expr(&expr)
    }

    fn resolve_expr(&self, expr: &TypeExpr) -> Result<TypeRef, ModelError> {
        let name = expr.name();
        if let Some(ty) = self.types.get(name.as_str()) {
            return Ok(ty);
        }
        if expr.args.is_empty() {
            return Err(ModelError::UnknownType(name));
        }
        let args = expr
            .args
            .iter()
            .map(|arg| self.resolve_expr(arg).map(|ty| ty.name().clone()))
            .collect::<Result<Vec<_>, _>>()?;
        let info = builtins::generic(&expr.base, &args)?
            .ok_or_else(|| ModelError::UnknownType(name.clone()))?;
        for interface in &info.interfaces {
            self.resolve(interface.as_str())?;
        }
        let published = self.types.publish(name.clone(), Arc::new(info));
        if published.was_inserted() {
            trace!(ty = %name, "constructed generic type");
        }
        Ok(published.into_inner())
    }

    /// `Array<elem>`.
    pub fn array_of(&self, elem: &TypeName) -> Result<TypeRef, ModelError> {
        self.generic("Array", &[elem.clone()])
    }

    /// `List<elem>`.
    pub fn list_of(&self, elem: &TypeName) -> Result<TypeRef, ModelError> {
        self.generic("List", &[elem.clone()])
    }

    /// `Map<key,value>`.
    pub fn map_of(&self, key: &TypeName, value: &TypeName) -> Result<TypeRef, ModelError> {
        self.generic("Map", &[key.clone(), value.clone()])
    }

    /// `Set<elem>`.
    pub fn set_of(&self, elem: &TypeName) -> Result<TypeRef, ModelError> {
        self.generic("Set", &[elem.clone()])
    }

    /// `LinkedList<elem>`.
    pub fn linked_list_of(&self, elem: &TypeName) -> Result<TypeRef, ModelError> {
        self.generic("LinkedList", &[elem.clone()])
    }

    /// An immutable family instantiation.
    pub fn immutable_of(
        &self,
        family: ImmutableFamily,
        args: &[TypeName],
    ) -> Result<TypeRef, ModelError> {
        self.generic(family.generic_name(), args)
    }

    /// A persistent family instantiation.
    pub fn persistent_of(
        &self,
        family: PersistentFamily,
        args: &[TypeName],
    ) -> Result<TypeRef, ModelError> {
        self.generic(family.generic_name(), args)
    }

    /// `KeyValuePair<key,value>`.
    pub fn key_value_pair_of(
        &self,
        key: &TypeName,
        value: &TypeName,
    ) -> Result<TypeRef, ModelError> {
        self.generic("KeyValuePair", &[key.clone(), value.clone()])
    }

    /// `IDictionary<key,value>`.
    pub fn dictionary_interface_of(
        &self,
        key: &TypeName,
        value: &TypeName,
    ) -> Result<TypeRef, ModelError> {
        self.generic("IDictionary", &[key.clone(), value.clone()])
    }

    fn generic(&self, base: &str, args: &[TypeName]) -> Result<TypeRef, ModelError> {
        self.resolve(TypeName::generic(base, args).as_str())
    }

    /// Runtime type of a value; `None` for null.
    #[must_use]
    pub fn runtime_type(&self, value: &Value) -> Option<TypeRef> {
        match value {
            Value::Null => None,
            Value::Object(obj) => Some(Arc::clone(obj.ty())),
            other => other.primitive().map(|p| Arc::clone(self.primitive(p))),
        }
    }

    /// Whether a value of type `runtime` may occupy a slot declared `declared`.
    #[must_use]
    pub fn is_assignable(&self, runtime: &TypeInfo, declared: &TypeInfo) -> bool {
        if declared.kind == TypeKind::Object || runtime.name == declared.name {
            return true;
        }
        if declared.is_sealed() && declared.kind != TypeKind::Interface {
            return false;
        }
        let mut visited = FxHashSet::default();
        let mut pending: Vec<TypeName> = Vec::new();
        pending.extend(runtime.base.iter().cloned());
        pending.extend(runtime.interfaces.iter().cloned());
        while let Some(name) = pending.pop() {
            if name == declared.name {
                return true;
            }
            if !visited.insert(name.clone()) {
                continue;
            }
            if let Some(ty) = self.get(name.as_str()) {
                pending.extend(ty.base.iter().cloned());
                pending.extend(ty.interfaces.iter().cloned());
            }
        }
        false
    }

    /// Whether `value` may occupy a slot declared `declared`.
    #[must_use]
    pub fn is_instance(&self, value: &Value, declared: &TypeInfo) -> bool {
        self.runtime_type(value).map_or_else(
            || !declared.is_value_type(),
            |runtime| self.is_assignable(&runtime, declared),
        )
    }

    /// Initial value of a slot of the given declared type.
    #[must_use]
    pub fn default_value(&self, declared: &TypeName) -> Value {
        Primitive::from_name(declared.as_str()).map_or(Value::Null, Primitive::default_value)
    }

    /// Resolves a symbolic member descriptor against its owner type and the
    /// owner's base chain.
    ///
    /// # Errors
    /// Returns [`ModelError::MemberNotFound`] when nothing matches.
    pub fn find_member(&self, member: &MemberRef) -> Result<ResolvedMember, ModelError> {
        let owner = self.resolve(member.owner().as_str())?;
        let not_found = || ModelError::MemberNotFound(member.to_string());
        match member.kind() {
            MemberKind::Field => owner
                .fields()
                .iter()
                .find(|f| f.name() == member.name())
                .cloned()
                .map(ResolvedMember::Field)
                .ok_or_else(not_found),
            MemberKind::Constructor => owner
                .members()
                .constructor(member.params())
                .cloned()
                .map(ResolvedMember::Constructor)
                .ok_or_else(not_found),
            MemberKind::Method => self
                .base_chain(&owner)
                .find_map(|ty| ty.members().method(member.name(), member.params()).cloned())
                .map(ResolvedMember::Method)
                .ok_or_else(not_found),
            MemberKind::Property => self
                .base_chain(&owner)
                .find_map(|ty| ty.members().property(member.name()).cloned())
                .map(ResolvedMember::Property)
                .ok_or_else(not_found),
        }
    }

    /// Resolves a method descriptor.
    ///
    /// # Errors
    /// Returns [`ModelError::MemberNotFound`] when the descriptor does not
    /// name a method.
    pub fn find_method(&self, member: &MemberRef) -> Result<MethodInfo, ModelError> {
        match self.find_member(member)? {
            ResolvedMember::Method(method) => Ok(method),
            _ => Err(ModelError::MemberNotFound(member.to_string())),
        }
    }

    /// Looks a property up on a type or any of its bases.
    #[must_use]
    pub fn find_property(&self, ty: &TypeRef, name: &str) -> Option<PropertyInfo> {
        self.base_chain(ty)
            .find_map(|t| t.members().property(name).cloned())
    }

    /// Overloads of a method on a type or any of its bases, nearest first.
    #[must_use]
    pub fn find_methods(&self, ty: &TypeRef, name: &str) -> Vec<MethodInfo> {
        self.base_chain(ty)
            .flat_map(|t| t.members().methods_named(name).cloned().collect::<Vec<_>>())
            .collect()
    }

    /// The type followed by its bases, nearest first.
    pub fn base_chain(&self, ty: &TypeRef) -> impl Iterator<Item = TypeRef> + '_ {
        let mut next = Some(Arc::clone(ty));
        std::iter::from_fn(move || {
            let current = next.take()?;
            next = current.base().and_then(|b| self.get(b.as_str()));
            Some(current)
        })
    }

    /// Allocates an object of the named type with the given body.
    pub fn new_object(&self, name: &str, data: ObjectData) -> Result<ObjRef, ModelError> {
        Ok(ObjRef::new(self.resolve(name)?, data))
    }

    /// Allocates a record, setting the listed fields and defaulting the rest.
    ///
    /// # Errors
    /// Fails when the type is not a record or a field is unknown.
    pub fn new_record<'a>(
        &self,
        name: &str,
        values: impl IntoIterator<Item = (&'a str, Value)>,
    ) -> Result<ObjRef, ModelError> {
        let ty = self.resolve(name)?;
        if ty.kind != TypeKind::Record {
            return Err(ModelError::ShapeMismatch {
                ty: ty.name.clone(),
                expected: "record",
            });
        }
        let fields = ty
            .fields()
            .iter()
            .map(|f| self.default_value(f.ty()))
            .collect();
        let obj = ObjRef::new(ty, ObjectData::Fields(fields));
        for (field, value) in values {
            obj.set_field(field, value)?;
        }
        Ok(obj)
    }

    /// Allocates an exception of the named exception type.
    pub fn new_exception(&self, name: &str, data: ExceptionData) -> Result<ObjRef, ModelError> {
        let ty = self.resolve(name)?;
        if ty.kind != TypeKind::Exception {
            return Err(ModelError::ShapeMismatch {
                ty: ty.name.clone(),
                expected: "exception",
            });
        }
        Ok(ObjRef::new(ty, ObjectData::Exception(data)))
    }

    /// Wraps a member descriptor as a reflection value.
    pub fn member_value(&self, member: MemberRef) -> Result<Value, ModelError> {
        let ty = self.resolve(member.kind().type_name())?;
        Ok(Value::Object(ObjRef::new(ty, ObjectData::Member(member))))
    }

    /// Wraps a type name as a `Type` value.
    pub fn type_value(&self, name: &TypeName) -> Result<Value, ModelError> {
        self.resolve(name.as_str())?;
        let ty = self.resolve(builtins::TYPE)?;
        Ok(Value::Object(ObjRef::new(
            ty,
            ObjectData::TypeHandle(name.clone()),
        )))
    }

    /// Binds a method to a target as a delegate value.
    ///
    /// # Errors
    /// Fails when the method does not resolve, or when an instance method is
    /// bound to a null target.
    pub fn delegate(&self, method: MemberRef, target: Value) -> Result<Value, ModelError> {
        let info = self.find_method(&method)?;
        if !info.is_static() && target.is_null() {
            return Err(ModelError::NullReceiver(method.to_string()));
        }
        let ty = self.resolve(builtins::DELEGATE)?;
        Ok(Value::Object(ObjRef::new(
            ty,
            ObjectData::Delegate(DelegateData::new(method, target)),
        )))
    }

    /// Invokes a delegate value.
    ///
    /// # Errors
    /// Fails when `delegate` is not a delegate, its method no longer
    /// resolves, or the call itself fails.
    pub fn invoke_delegate(&self, delegate: &Value, args: &[Value]) -> Result<Value, ModelError> {
        let obj = delegate
            .as_object()
            .ok_or_else(|| ModelError::NullReceiver(builtins::DELEGATE.to_owned()))?;
        let data = match &*obj.data() {
            ObjectData::Delegate(data) => data.clone(),
            _ => {
                return Err(ModelError::ShapeMismatch {
                    ty: obj.ty().name().clone(),
                    expected: "delegate",
                })
            }
        };
        self.find_method(data.method())?
            .invoke(data.target(), args)
    }
}
