// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Persistent cons list with structural sharing.

use std::fmt;
use std::rc::Rc;

use crate::value::Value;

struct Node {
    value: Value,
    next: Option<Rc<Node>>,
}

/// Immutable singly linked list. `cons` shares the existing tail.
#[derive(Clone, Default)]
pub struct ConsList {
    head: Option<Rc<Node>>,
    len: usize,
}

impl ConsList {
    /// Empty list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a list whose enumeration order matches `items`.
    #[must_use]
    pub fn from_values(items: Vec<Value>) -> Self {
        items
            .into_iter()
            .rev()
            .fold(Self::new(), |list, value| list.cons(value))
    }

    /// New list with `value` in front of this one.
    #[must_use]
    pub fn cons(&self, value: Value) -> Self {
        Self {
            head: Some(Rc::new(Node {
                value,
                next: self.head.clone(),
            })),
            len: self.len + 1,
        }
    }

    /// First item.
    #[must_use]
    pub fn head(&self) -> Option<&Value> {
        self.head.as_ref().map(|node| &node.value)
    }

    /// Everything after the first item, sharing storage with this list.
    #[must_use]
    pub fn tail(&self) -> Option<Self> {
        self.head.as_ref().map(|node| Self {
            head: node.next.clone(),
            len: self.len - 1,
        })
    }

    /// Number of items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the list is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Items front to back.
    pub fn iter(&self) -> impl Iterator<Item = &Value> {
        let mut cursor = self.head.as_deref();
        std::iter::from_fn(move || {
            let node = cursor?;
            cursor = node.next.as_deref();
            Some(&node.value)
        })
    }
}

// Unlinks uniquely owned nodes one at a time; the derived drop would recurse
// once per node.
impl Drop for ConsList {
    fn drop(&mut self) {
        let mut cursor = self.head.take();
        while let Some(node) = cursor {
            match Rc::try_unwrap(node) {
                Ok(mut node) => cursor = node.next.take(),
                Err(_) => break,
            }
        }
    }
}

impl fmt::Debug for ConsList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}
