// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Per-call identity and manifest tables.
//!
//! A session lives for exactly one `encode` or `decode` call. Object indices
//! and cached type indices are assigned in traversal order on both sides, so
//! the reader rebuilds the writer's tables without any extra framing.

use rustc_hash::{FxHashMap, FxHashSet};
use tangle_model::{ObjRef, TypeName, TypeRef, Value};
use tracing::trace;

use crate::error::WireError;

/// Outcome of looking an object up in a [`WriteSession`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Identity {
    /// Already written under this index.
    Seen(u32),
    /// First occurrence, now assigned this index.
    New(u32),
}

/// Where a cached manifest stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TypeSlot {
    /// Written before under this index.
    Cached(u32),
    /// First use; the name must be written in full.
    Fresh,
}

fn next_index(len: usize) -> Result<u32, WireError> {
    u32::try_from(len).map_err(|_| WireError::Codec(crate::codec::CodecError::LengthTooLarge))
}

#[derive(Debug, Default)]
pub(crate) struct WriteSession {
    // Tracked objects stay alive until the call ends so their addresses
    // cannot be reused by a temporary (e.g. a surrogate carrier).
    objects: Vec<ObjRef>,
    index: FxHashMap<usize, u32>,
    type_names: FxHashMap<TypeName, u32>,
    ancestors: FxHashSet<usize>,
}

impl WriteSession {
    /// Looks `obj` up, assigning the next index on first sight.
    pub(crate) fn identify(&mut self, obj: &ObjRef) -> Result<Identity, WireError> {
        if let Some(&index) = self.index.get(&obj.identity()) {
            return Ok(Identity::Seen(index));
        }
        let index = next_index(self.objects.len())?;
        self.index.insert(obj.identity(), index);
        self.objects.push(obj.clone());
        Ok(Identity::New(index))
    }

    /// Marks `obj` as being written. Fails if it is already on the path from
    /// the root, i.e. the graph cycles through it.
    pub(crate) fn enter(&mut self, obj: &ObjRef) -> Result<(), WireError> {
        if self.ancestors.insert(obj.identity()) {
            Ok(())
        } else {
            Err(WireError::CycleDetected(obj.ty().name().clone()))
        }
    }

    pub(crate) fn leave(&mut self, obj: &ObjRef) {
        self.ancestors.remove(&obj.identity());
    }

    /// Looks a manifest name up, caching it on first use.
    pub(crate) fn manifest(&mut self, name: &TypeName) -> Result<TypeSlot, WireError> {
        if let Some(&index) = self.type_names.get(name) {
            return Ok(TypeSlot::Cached(index));
        }
        let index = next_index(self.type_names.len())?;
        self.type_names.insert(name.clone(), index);
        trace!(ty = %name, index, "cached manifest");
        Ok(TypeSlot::Fresh)
    }
}

/// Reservation made for an object whose definition token was just read.
///
/// Codecs that allocate an object pass it to
/// [`Decoder::bind`](crate::Decoder::bind) before reading anything nested, so
/// references back to the object resolve while it is still being filled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot(Option<u32>);

impl Slot {
    /// No reservation: the value was framed inline.
    pub const NONE: Self = Self(None);

    /// Object index reserved for the value, if any.
    #[must_use]
    pub fn index(self) -> Option<u32> {
        self.0
    }
}

#[derive(Debug)]
enum Entry {
    Pending,
    Ready(Value),
}

#[derive(Debug, Default)]
pub(crate) struct ReadSession {
    objects: Vec<Entry>,
    types: Vec<TypeRef>,
}

impl ReadSession {
    /// Reserves `index`, which must be the next unassigned object index.
    pub(crate) fn reserve(&mut self, index: u32) -> Result<Slot, WireError> {
        let expected = next_index(self.objects.len())?;
        if index != expected {
            return Err(WireError::SessionOrder {
                expected,
                found: index,
            });
        }
        self.objects.push(Entry::Pending);
        Ok(Slot(Some(index)))
    }

    /// Fills a reserved slot. Binding an already bound slot replaces it with
    /// the same object, so codecs and framing may both bind.
    pub(crate) fn bind(&mut self, slot: Slot, value: Value) {
        if let Some(entry) = slot
            .0
            .and_then(|i| usize::try_from(i).ok())
            .and_then(|i| self.objects.get_mut(i))
        {
            *entry = Entry::Ready(value);
        }
    }

    /// Resolves a back-reference.
    pub(crate) fn resolve(&self, index: u32) -> Result<Value, WireError> {
        let entry = usize::try_from(index)
            .ok()
            .and_then(|i| self.objects.get(i))
            .ok_or(WireError::DanglingReference(index))?;
        match entry {
            Entry::Ready(value) => Ok(value.clone()),
            Entry::Pending => Err(WireError::PendingReference(index)),
        }
    }

    pub(crate) fn type_count(&self) -> usize {
        self.types.len()
    }

    pub(crate) fn push_type(&mut self, ty: TypeRef) {
        self.types.push(ty);
    }

    pub(crate) fn cached_type(&self, index: u32) -> Result<TypeRef, WireError> {
        usize::try_from(index)
            .ok()
            .and_then(|i| self.types.get(i))
            .cloned()
            .ok_or(WireError::UnknownTypeIndex(index))
    }
}
