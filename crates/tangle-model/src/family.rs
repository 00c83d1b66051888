// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Immutable and persistent collection families.
//!
//! Instances of these families cannot be filled item by item. Each family
//! exposes one bulk-construction entry point that takes every item at once,
//! and a decoder always goes through it.

use std::rc::Rc;

use rustc_hash::FxHashSet;

use crate::cons::ConsList;
use crate::error::ModelError;
use crate::value::{ObjectData, Value};

/// Immutable collection families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImmutableFamily {
    /// `ImmutableList<T>`
    List,
    /// `ImmutableArray<T>`
    Array,
    /// `ImmutableHashSet<T>`
    HashSet,
    /// `ImmutableSortedSet<T>`
    SortedSet,
    /// `ImmutableStack<T>`; enumerates top first.
    Stack,
    /// `ImmutableQueue<T>`; enumerates front first.
    Queue,
    /// `ImmutableDictionary<K,V>`
    Dictionary,
    /// `ImmutableSortedDictionary<K,V>`
    SortedDictionary,
}

impl ImmutableFamily {
    /// Every family.
    pub const ALL: [Self; 8] = [
        Self::List,
        Self::Array,
        Self::HashSet,
        Self::SortedSet,
        Self::Stack,
        Self::Queue,
        Self::Dictionary,
        Self::SortedDictionary,
    ];

    /// Base name of the generic family.
    #[must_use]
    pub const fn generic_name(self) -> &'static str {
        match self {
            Self::List => "ImmutableList",
            Self::Array => "ImmutableArray",
            Self::HashSet => "ImmutableHashSet",
            Self::SortedSet => "ImmutableSortedSet",
            Self::Stack => "ImmutableStack",
            Self::Queue => "ImmutableQueue",
            Self::Dictionary => "ImmutableDictionary",
            Self::SortedDictionary => "ImmutableSortedDictionary",
        }
    }

    /// Looks a family up by its base name.
    #[must_use]
    pub fn from_generic_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.generic_name() == name)
    }

    /// Keyed families hold key/value entries.
    #[must_use]
    pub const fn is_keyed(self) -> bool {
        matches!(self, Self::Dictionary | Self::SortedDictionary)
    }

    /// Number of type arguments.
    #[must_use]
    pub const fn arity(self) -> usize {
        if self.is_keyed() {
            2
        } else {
            1
        }
    }

    /// Bulk construction pushes items one after another, so a stack built
    /// from its own enumeration comes out upside down. Callers rebuilding a
    /// stack reverse the enumerated items first.
    #[must_use]
    pub const fn reverses_on_build(self) -> bool {
        matches!(self, Self::Stack)
    }

    /// Builds a sequence family from items in insertion order.
    ///
    /// # Errors
    /// Keyed families are rejected with [`ModelError::GenericArity`].
    pub fn create_range(self, items: Vec<Value>) -> Result<ObjectData, ModelError> {
        let items = match self {
            Self::List | Self::Array | Self::Queue => items,
            Self::HashSet => dedup(items),
            Self::SortedSet => sorted_unique(items),
            Self::Stack => items.into_iter().rev().collect(),
            Self::Dictionary | Self::SortedDictionary => {
                return Err(ModelError::GenericArity {
                    base: self.generic_name().to_owned(),
                    expected: 2,
                    found: 1,
                })
            }
        };
        Ok(ObjectData::Immutable(Rc::from(items)))
    }

    /// Builds a keyed family from entries in insertion order.
    ///
    /// # Errors
    /// Returns [`ModelError::DuplicateKey`] when a key repeats, and
    /// [`ModelError::GenericArity`] for sequence families.
    pub fn create_map(self, entries: Vec<(Value, Value)>) -> Result<ObjectData, ModelError> {
        match self {
            Self::Dictionary => {
                ensure_unique_keys(&entries)?;
                Ok(ObjectData::ImmutableMap(Rc::from(entries)))
            }
            Self::SortedDictionary => Ok(ObjectData::ImmutableMap(Rc::from(sorted_entries(
                entries,
            )?))),
            _ => Err(ModelError::GenericArity {
                base: self.generic_name().to_owned(),
                expected: 1,
                found: 2,
            }),
        }
    }
}

/// Persistent (functional-language style) collection families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PersistentFamily {
    /// `PersistentList<T>`, a cons list.
    List,
    /// `PersistentSet<T>`, ordered.
    Set,
    /// `PersistentMap<K,V>`, ordered by key.
    Map,
}

impl PersistentFamily {
    /// Every family.
    pub const ALL: [Self; 3] = [Self::List, Self::Set, Self::Map];

    /// Base name of the generic family.
    #[must_use]
    pub const fn generic_name(self) -> &'static str {
        match self {
            Self::List => "PersistentList",
            Self::Set => "PersistentSet",
            Self::Map => "PersistentMap",
        }
    }

    /// Looks a family up by its base name.
    #[must_use]
    pub fn from_generic_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.generic_name() == name)
    }

    /// Keyed families hold key/value entries.
    #[must_use]
    pub const fn is_keyed(self) -> bool {
        matches!(self, Self::Map)
    }

    /// Number of type arguments.
    #[must_use]
    pub const fn arity(self) -> usize {
        if self.is_keyed() {
            2
        } else {
            1
        }
    }

    /// `ofSeq`: builds a sequence family from items in enumeration order.
    pub fn of_seq(self, items: Vec<Value>) -> Result<ObjectData, ModelError> {
        match self {
            Self::List => Ok(ObjectData::Cons(ConsList::from_values(items))),
            Self::Set => Ok(ObjectData::Immutable(Rc::from(sorted_unique(items)))),
            Self::Map => Err(ModelError::GenericArity {
                base: self.generic_name().to_owned(),
                expected: 2,
                found: 1,
            }),
        }
    }

    /// `ofSeq` for maps: entries are ordered by key.
    ///
    /// # Errors
    /// Returns [`ModelError::DuplicateKey`] when a key repeats.
    pub fn of_map(self, entries: Vec<(Value, Value)>) -> Result<ObjectData, ModelError> {
        match self {
            Self::Map => Ok(ObjectData::ImmutableMap(Rc::from(sorted_entries(entries)?))),
            _ => Err(ModelError::GenericArity {
                base: self.generic_name().to_owned(),
                expected: 1,
                found: 2,
            }),
        }
    }
}

fn dedup(items: Vec<Value>) -> Vec<Value> {
    let mut seen = FxHashSet::default();
    items
        .into_iter()
        .filter(|item| seen.insert(item.clone()))
        .collect()
}

// `sort_by` is stable: objects, which all compare equal, keep their order.
fn sorted_unique(mut items: Vec<Value>) -> Vec<Value> {
    items.sort_by(Value::total_cmp);
    dedup(items)
}

fn ensure_unique_keys(entries: &[(Value, Value)]) -> Result<(), ModelError> {
    let mut seen = FxHashSet::default();
    for (key, _) in entries {
        if !seen.insert(key) {
            return Err(ModelError::DuplicateKey);
        }
    }
    Ok(())
}

fn sorted_entries(mut entries: Vec<(Value, Value)>) -> Result<Vec<(Value, Value)>, ModelError> {
    entries.sort_by(|a, b| a.0.total_cmp(&b.0));
    ensure_unique_keys(&entries)?;
    Ok(entries)
}
