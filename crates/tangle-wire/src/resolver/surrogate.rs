// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Writes a surrogated value as its carrier, through the ordinary pipeline.

use tangle_model::{TypeRef, TypeRegistry, Value};

use super::{ShapeResolver, ValueCodec};
use crate::error::WireError;
use crate::framing::{Decoder, Encoder};
use crate::session::Slot;
use crate::surrogate::{Surrogate, SurrogateError};

/// One class of surrogates (exact or predicate). The first declared match
/// wins.
pub(crate) struct SurrogateResolver {
    name: &'static str,
    surrogates: Vec<Surrogate>,
}

impl SurrogateResolver {
    pub(crate) fn exact(surrogates: Vec<Surrogate>) -> Self {
        Self {
            name: "surrogate",
            surrogates,
        }
    }

    pub(crate) fn predicate(surrogates: Vec<Surrogate>) -> Self {
        Self {
            name: "surrogate-predicate",
            surrogates,
        }
    }

    fn find(&self, ty: &TypeRef) -> Option<&Surrogate> {
        self.surrogates.iter().find(|s| s.applies_to(ty))
    }
}

impl ShapeResolver for SurrogateResolver {
    fn name(&self) -> &'static str {
        self.name
    }

    fn can_write(&self, ty: &TypeRef, _types: &TypeRegistry) -> bool {
        self.find(ty).is_some()
    }

    fn build(&self, ty: &TypeRef, types: &TypeRegistry) -> Result<Box<dyn ValueCodec>, WireError> {
        let surrogate = self
            .find(ty)
            .ok_or_else(|| WireError::unsupported(ty.name(), "no surrogate applies"))?;
        if surrogate.carrier() == ty.name() {
            return Err(WireError::unsupported(ty.name(), "surrogate carrier is the type itself"));
        }
        let carrier = types.resolve(surrogate.carrier().as_str())?;
        Ok(Box::new(SurrogateCodec {
            ty: ty.clone(),
            carrier,
            surrogate: surrogate.clone(),
        }))
    }
}

struct SurrogateCodec {
    ty: TypeRef,
    carrier: TypeRef,
    surrogate: Surrogate,
}

impl SurrogateCodec {
    fn failed(&self, err: &SurrogateError) -> WireError {
        WireError::Surrogate {
            ty: self.ty.name().clone(),
            reason: err.to_string(),
        }
    }
}

impl ValueCodec for SurrogateCodec {
    fn write(&self, enc: &mut Encoder<'_>, value: &Value) -> Result<(), WireError> {
        let types = enc.types();
        let carrier = self
            .surrogate
            .to_carrier(value, types)
            .map_err(|err| self.failed(&err))?;
        if carrier.is_null() || !types.is_instance(&carrier, &self.carrier) {
            return Err(self.failed(&SurrogateError::new(format!(
                "to-surrogate did not produce a {}",
                self.carrier.name()
            ))));
        }
        enc.write_value(&carrier, &self.carrier)
    }

    fn read(&self, dec: &mut Decoder<'_>, _slot: Slot) -> Result<Value, WireError> {
        let carrier = dec.read_value(&self.carrier)?;
        let types = dec.types();
        let value = self
            .surrogate
            .from_carrier(&carrier, types)
            .map_err(|err| self.failed(&err))?;
        if value.is_null() || !types.is_instance(&value, &self.ty) {
            return Err(self.failed(&SurrogateError::new(format!(
                "from-surrogate did not produce a {}",
                self.ty.name()
            ))));
        }
        Ok(value)
    }
}
