// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Fluent construction of user type descriptors.

use std::sync::Arc;

use crate::error::ModelError;
use crate::members::FieldInfo;
use crate::name::TypeName;
use crate::types::{TypeInfo, TypeKind, TypeRef};
use crate::value::Value;

/// Builds a record, interface or exception descriptor for
/// [`TypeRegistry::register`](crate::TypeRegistry::register).
///
/// Records are sealed and constructible unless told otherwise.
///
/// ```
/// use tangle_model::{TypeBuilder, TypeRegistry};
///
/// let types = TypeRegistry::new();
/// types.register(TypeBuilder::interface("Shape").build()).unwrap();
/// types
///     .register(
///         TypeBuilder::record("Circle")
///             .implements("Shape")
///             .field("radius", "f64")
///             .build(),
///     )
///     .unwrap();
/// ```
#[derive(Debug)]
pub struct TypeBuilder {
    info: TypeInfo,
}

impl TypeBuilder {
    fn new(name: impl Into<TypeName>, kind: TypeKind, sealed: bool, constructible: bool) -> Self {
        let mut info = TypeInfo::builtin(name, kind);
        info.sealed = sealed;
        info.constructible = constructible;
        Self { info }
    }

    /// Starts a sealed, constructible record.
    pub fn record(name: impl Into<TypeName>) -> Self {
        Self::new(name, TypeKind::Record, true, true)
    }

    /// Starts an interface.
    pub fn interface(name: impl Into<TypeName>) -> Self {
        Self::new(name, TypeKind::Interface, false, false)
    }

    /// Starts an open exception type deriving from `Exception`.
    pub fn exception(name: impl Into<TypeName>) -> Self {
        let mut builder = Self::new(name, TypeKind::Exception, false, true);
        builder.info.base = Some(TypeName::from("Exception"));
        builder
    }

    /// Appends a field. Fields are encoded in declaration order.
    #[must_use]
    pub fn field(mut self, name: &str, ty: impl Into<TypeName>) -> Self {
        self.info.fields.push(FieldInfo::new(name, ty.into()));
        self
    }

    /// Sets the base type. The base must be registered and open.
    #[must_use]
    pub fn extends(mut self, base: impl Into<TypeName>) -> Self {
        self.info.base = Some(base.into());
        self
    }

    /// Adds an implemented interface.
    #[must_use]
    pub fn implements(mut self, interface: impl Into<TypeName>) -> Self {
        self.info.interfaces.push(interface.into());
        self
    }

    /// Allows subtypes.
    #[must_use]
    pub fn open(mut self) -> Self {
        self.info.sealed = false;
        self
    }

    /// Forbids subtypes.
    #[must_use]
    pub fn sealed(mut self) -> Self {
        self.info.sealed = true;
        self
    }

    /// Marks the type as one the engine may not allocate on its own; only a
    /// surrogate can carry it.
    #[must_use]
    pub fn non_constructible(mut self) -> Self {
        self.info.constructible = false;
        self
    }

    /// Adds a read-only property.
    #[must_use]
    pub fn property<F>(mut self, name: &str, ty: impl Into<TypeName>, getter: F) -> Self
    where
        F: Fn(&Value) -> Result<Value, ModelError> + Send + Sync + 'static,
    {
        self.info
            .members
            .add_property(name, ty.into(), Arc::new(getter));
        self
    }

    /// Adds an instance method.
    #[must_use]
    pub fn method<P, F>(mut self, name: &str, params: P, body: F) -> Self
    where
        P: IntoIterator,
        P::Item: Into<TypeName>,
        F: Fn(&Value, &[Value]) -> Result<Value, ModelError> + Send + Sync + 'static,
    {
        let params = params.into_iter().map(Into::into).collect();
        self.info
            .members
            .add_method(name, params, false, Arc::new(body));
        self
    }

    /// Adds a static method.
    #[must_use]
    pub fn static_method<P, F>(mut self, name: &str, params: P, body: F) -> Self
    where
        P: IntoIterator,
        P::Item: Into<TypeName>,
        F: Fn(&[Value]) -> Result<Value, ModelError> + Send + Sync + 'static,
    {
        let params = params.into_iter().map(Into::into).collect();
        self.info.members.add_method(
            name,
            params,
            true,
            Arc::new(move |_: &Value, args: &[Value]| body(args)),
        );
        self
    }

    /// Adds a constructor.
    #[must_use]
    pub fn constructor<P, F>(mut self, params: P, body: F) -> Self
    where
        P: IntoIterator,
        P::Item: Into<TypeName>,
        F: Fn(&TypeRef, &[Value]) -> Result<Value, ModelError> + Send + Sync + 'static,
    {
        let params = params.into_iter().map(Into::into).collect();
        self.info.members.add_constructor(params, Arc::new(body));
        self
    }

    /// Declares how instances enumerate their items.
    #[must_use]
    pub fn enumerate<F>(mut self, f: F) -> Self
    where
        F: Fn(&Value) -> Result<Vec<Value>, ModelError> + Send + Sync + 'static,
    {
        self.info.members.enumerate = Some(Arc::new(f));
        self
    }

    /// Finishes the descriptor.
    #[must_use]
    pub fn build(self) -> TypeInfo {
        self.info
    }
}
