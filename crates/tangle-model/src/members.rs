// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Member tables: fields, properties, methods, constructors and enumeration.
//!
//! Member bodies are plain closures. They are `Send + Sync` because a type
//! descriptor is shared by every thread using the registry, even though the
//! values they operate on are single-threaded.

use std::fmt;
use std::sync::Arc;

use crate::error::ModelError;
use crate::name::TypeName;
use crate::types::TypeRef;
use crate::value::Value;

/// Reads a property from a receiver.
pub type Getter = Arc<dyn Fn(&Value) -> Result<Value, ModelError> + Send + Sync>;
/// Invokes a method on a receiver (`Value::Null` for static methods).
pub type MethodBody = Arc<dyn Fn(&Value, &[Value]) -> Result<Value, ModelError> + Send + Sync>;
/// Creates a new instance of the given type.
pub type ConstructorBody =
    Arc<dyn Fn(&TypeRef, &[Value]) -> Result<Value, ModelError> + Send + Sync>;
/// Lists the items of a collection in enumeration order.
pub type EnumerateFn = Arc<dyn Fn(&Value) -> Result<Vec<Value>, ModelError> + Send + Sync>;

/// Declared field of a record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldInfo {
    name: Arc<str>,
    ty: TypeName,
}

impl FieldInfo {
    /// Creates a field descriptor.
    #[must_use]
    pub fn new(name: &str, ty: TypeName) -> Self {
        Self {
            name: Arc::from(name),
            ty,
        }
    }

    /// Field name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared field type.
    #[must_use]
    pub fn ty(&self) -> &TypeName {
        &self.ty
    }
}

/// Read-only property.
#[derive(Clone)]
pub struct PropertyInfo {
    name: Arc<str>,
    ty: TypeName,
    getter: Getter,
}

impl PropertyInfo {
    /// Property name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Property type.
    #[must_use]
    pub fn ty(&self) -> &TypeName {
        &self.ty
    }

    /// Reads the property from `receiver`.
    pub fn get(&self, receiver: &Value) -> Result<Value, ModelError> {
        if receiver.is_null() {
            return Err(ModelError::NullReceiver(self.name.to_string()));
        }
        (self.getter)(receiver)
    }
}

/// Invocable method.
#[derive(Clone)]
pub struct MethodInfo {
    name: Arc<str>,
    params: Vec<TypeName>,
    is_static: bool,
    body: MethodBody,
}

impl MethodInfo {
    /// Method name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Parameter types, used for overload resolution.
    #[must_use]
    pub fn params(&self) -> &[TypeName] {
        &self.params
    }

    /// Static methods take no receiver.
    #[must_use]
    pub fn is_static(&self) -> bool {
        self.is_static
    }

    /// Calls the method.
    ///
    /// # Errors
    /// Fails on an arity mismatch, a missing receiver for an instance method,
    /// or whatever the body reports.
    pub fn invoke(&self, receiver: &Value, args: &[Value]) -> Result<Value, ModelError> {
        if args.len() != self.params.len() {
            return Err(ModelError::Arity {
                member: self.name.to_string(),
                expected: self.params.len(),
                found: args.len(),
            });
        }
        if !self.is_static && receiver.is_null() {
            return Err(ModelError::NullReceiver(self.name.to_string()));
        }
        (self.body)(receiver, args)
    }
}

/// Instance constructor.
#[derive(Clone)]
pub struct ConstructorInfo {
    params: Vec<TypeName>,
    body: ConstructorBody,
}

impl ConstructorInfo {
    /// Parameter types.
    #[must_use]
    pub fn params(&self) -> &[TypeName] {
        &self.params
    }

    /// Creates an instance of `ty`.
    pub fn invoke(&self, ty: &TypeRef, args: &[Value]) -> Result<Value, ModelError> {
        if args.len() != self.params.len() {
            return Err(ModelError::Arity {
                member: format!("{}::new", ty.name()),
                expected: self.params.len(),
                found: args.len(),
            });
        }
        (self.body)(ty, args)
    }
}

/// Member table of a type.
#[derive(Clone, Default)]
pub struct Members {
    pub(crate) properties: Vec<PropertyInfo>,
    pub(crate) methods: Vec<MethodInfo>,
    pub(crate) constructors: Vec<ConstructorInfo>,
    pub(crate) enumerate: Option<EnumerateFn>,
}

impl Members {
    /// Every property.
    #[must_use]
    pub fn properties(&self) -> &[PropertyInfo] {
        &self.properties
    }

    /// Every method, overloads included.
    #[must_use]
    pub fn methods(&self) -> &[MethodInfo] {
        &self.methods
    }

    /// Every constructor.
    #[must_use]
    pub fn constructors(&self) -> &[ConstructorInfo] {
        &self.constructors
    }

    /// Property by name.
    #[must_use]
    pub fn property(&self, name: &str) -> Option<&PropertyInfo> {
        self.properties.iter().find(|p| p.name() == name)
    }

    /// Overloads of a method.
    pub fn methods_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a MethodInfo> {
        self.methods.iter().filter(move |m| m.name() == name)
    }

    /// Method by name and exact parameter signature.
    #[must_use]
    pub fn method(&self, name: &str, params: &[TypeName]) -> Option<&MethodInfo> {
        self.methods
            .iter()
            .find(|m| m.name() == name && m.params == params)
    }

    /// Constructor by exact parameter signature.
    #[must_use]
    pub fn constructor(&self, params: &[TypeName]) -> Option<&ConstructorInfo> {
        self.constructors.iter().find(|c| c.params == params)
    }

    /// Parameterless constructor.
    #[must_use]
    pub fn default_constructor(&self) -> Option<&ConstructorInfo> {
        self.constructor(&[])
    }

    /// Enumeration capability, when the type is a collection.
    #[must_use]
    pub fn enumerator(&self) -> Option<&EnumerateFn> {
        self.enumerate.as_ref()
    }

    pub(crate) fn add_property(&mut self, name: &str, ty: TypeName, getter: Getter) {
        self.properties.push(PropertyInfo {
            name: Arc::from(name),
            ty,
            getter,
        });
    }

    pub(crate) fn add_method(
        &mut self,
        name: &str,
        params: Vec<TypeName>,
        is_static: bool,
        body: MethodBody,
    ) {
        self.methods.push(MethodInfo {
            name: Arc::from(name),
            params,
            is_static,
            body,
        });
    }

    pub(crate) fn add_constructor(&mut self, params: Vec<TypeName>, body: ConstructorBody) {
        self.constructors.push(ConstructorInfo { params, body });
    }
}

impl fmt::Debug for Members {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Members")
            .field(
                "properties",
                &self.properties.iter().map(PropertyInfo::name).collect::<Vec<_>>(),
            )
            .field(
                "methods",
                &self.methods.iter().map(MethodInfo::name).collect::<Vec<_>>(),
            )
            .field("constructors", &self.constructors.len())
            .field("enumerable", &self.enumerate.is_some())
            .finish()
    }
}

impl fmt::Debug for PropertyInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PropertyInfo({}: {})", self.name, self.ty)
    }
}

impl fmt::Debug for MethodInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MethodInfo({}/{})", self.name, self.params.len())
    }
}

impl fmt::Debug for ConstructorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ConstructorInfo/{}", self.params.len())
    }
}
