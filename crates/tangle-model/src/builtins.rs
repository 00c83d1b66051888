// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Descriptors of the built-in types and generic families.

use std::sync::Arc;

use crate::error::ModelError;
use crate::family::{ImmutableFamily, PersistentFamily};
use crate::members::FieldInfo;
use crate::name::TypeName;
use crate::types::{MemberKind, Primitive, TypeInfo, TypeKind, TypeRef};
use crate::value::{ObjRef, ObjectData, Value};

pub(crate) const OBJECT: &str = "object";
pub(crate) const EXCEPTION: &str = "Exception";
pub(crate) const MEMBER_INFO: &str = "MemberInfo";
pub(crate) const TYPE: &str = "Type";
pub(crate) const DELEGATE: &str = "Delegate";

/// Every non-generic built-in, in seeding order.
pub(crate) fn roots() -> Vec<TypeInfo> {
    let mut out = Vec::with_capacity(Primitive::ALL.len() + 8);

    let mut object = TypeInfo::builtin(OBJECT, TypeKind::Object);
    object.sealed = false;
    object.constructible = false;
    out.push(object);

    out.extend(
        Primitive::ALL
            .into_iter()
            .map(|p| TypeInfo::builtin(p.name(), TypeKind::Primitive(p))),
    );

    let mut exception = TypeInfo::builtin(EXCEPTION, TypeKind::Exception);
    exception.sealed = false;
    out.push(exception);

    let mut member_info = TypeInfo::builtin(MEMBER_INFO, TypeKind::Interface);
    member_info.sealed = false;
    member_info.constructible = false;
    out.push(member_info);

    for kind in [
        MemberKind::Method,
        MemberKind::Property,
        MemberKind::Constructor,
        MemberKind::Field,
    ] {
        let mut info = TypeInfo::builtin(kind.type_name(), TypeKind::Member(kind));
        info.interfaces.push(TypeName::from(MEMBER_INFO));
        out.push(info);
    }

    out.push(TypeInfo::builtin(TYPE, TypeKind::TypeHandle));
    out.push(TypeInfo::builtin(DELEGATE, TypeKind::Delegate));
    out
}

fn expect_arity(base: &str, args: &[TypeName], expected: usize) -> Result<(), ModelError> {
    if args.len() == expected {
        Ok(())
    } else {
        Err(ModelError::GenericArity {
            base: base.to_owned(),
            expected,
            found: args.len(),
        })
    }
}

/// Builds the descriptor of a generic instantiation, or `None` when `base`
/// names no generic family. Argument names must already be canonical.
pub(crate) fn generic(base: &str, args: &[TypeName]) -> Result<Option<TypeInfo>, ModelError> {
    let name = TypeName::generic(base, args);
    let info = match base {
        "Array" => {
            expect_arity(base, args, 1)?;
            TypeInfo::builtin(name, TypeKind::Array(args[0].clone()))
        }
        "List" => {
            expect_arity(base, args, 1)?;
            list(name, &args[0])
        }
        "Map" => {
            expect_arity(base, args, 2)?;
            let mut info = TypeInfo::builtin(name, TypeKind::Map(args[0].clone(), args[1].clone()));
            info.interfaces.push(TypeName::generic("IDictionary", args));
            info
        }
        "IDictionary" => {
            expect_arity(base, args, 2)?;
            let mut info = TypeInfo::builtin(name, TypeKind::Interface);
            info.sealed = false;
            info.constructible = false;
            info
        }
        "KeyValuePair" => {
            expect_arity(base, args, 2)?;
            let mut info = TypeInfo::builtin(name, TypeKind::Record);
            info.fields.push(FieldInfo::new("key", args[0].clone()));
            info.fields.push(FieldInfo::new("value", args[1].clone()));
            info
        }
        "Set" => {
            expect_arity(base, args, 1)?;
            TypeInfo::builtin(name, TypeKind::Set(args[0].clone()))
        }
        "LinkedList" => {
            expect_arity(base, args, 1)?;
            TypeInfo::builtin(name, TypeKind::LinkedList(args[0].clone()))
        }
        _ => {
            if let Some(family) = ImmutableFamily::from_generic_name(base) {
                expect_arity(base, args, family.arity())?;
                TypeInfo::builtin(name, TypeKind::Immutable(family, args.to_vec()))
            } else if let Some(family) = PersistentFamily::from_generic_name(base) {
                expect_arity(base, args, family.arity())?;
                TypeInfo::builtin(name, TypeKind::Persistent(family, args.to_vec()))
            } else {
                return Ok(None);
            }
        }
    };
    Ok(Some(info))
}

fn receiver(value: &Value) -> Result<&ObjRef, ModelError> {
    value
        .as_object()
        .ok_or_else(|| ModelError::NullReceiver("List".to_owned()))
}

// `List<T>` carries no structural kind of its own beyond the element type:
// it is a growable collection known only through its members.
fn list(name: TypeName, elem: &TypeName) -> TypeInfo {
    let array = TypeName::generic("Array", std::slice::from_ref(elem));
    let mut info = TypeInfo::builtin(name, TypeKind::List(elem.clone()));
    let members = &mut info.members;

    members.add_constructor(
        Vec::new(),
        Arc::new(|ty: &TypeRef, _: &[Value]| -> Result<Value, ModelError> {
            Ok(Value::Object(ObjRef::new(ty.clone(), ObjectData::Items(Vec::new()))))
        }),
    );
    members.add_property(
        "count",
        TypeName::from("i32"),
        Arc::new(|this: &Value| -> Result<Value, ModelError> {
            let len = receiver(this)?.with_items(|items| items.len())?;
            i32::try_from(len)
                .map(Value::I32)
                .map_err(|_| ModelError::ValueMismatch {
                    expected: "i32 count",
                    found: len.to_string(),
                })
        }),
    );
    members.add_method(
        "add",
        vec![elem.clone()],
        false,
        Arc::new(|this: &Value, args: &[Value]| -> Result<Value, ModelError> {
            let item = args[0].clone();
            receiver(this)?.with_items(|items| items.push(item))?;
            Ok(Value::Null)
        }),
    );
    members.add_method(
        "add_range",
        vec![array],
        false,
        Arc::new(|this: &Value, args: &[Value]| -> Result<Value, ModelError> {
            let source = args[0]
                .as_object()
                .ok_or_else(|| ModelError::NullReceiver("add_range".to_owned()))?
                .elements();
            receiver(this)?.with_items(|items| items.extend(source))?;
            Ok(Value::Null)
        }),
    );
    members.enumerate = Some(Arc::new(
        |this: &Value| -> Result<Vec<Value>, ModelError> { Ok(receiver(this)?.elements()) },
    ));
    info
}
