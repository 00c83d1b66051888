// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Structural equality over object graphs.

use rustc_hash::FxHashSet;

use crate::value::{ObjRef, ObjectData, Value};

/// Compares two graphs structurally.
///
/// Objects are equal when their types match and their bodies are equal item
/// by item. A pair of objects already under comparison is assumed equal, so
/// cyclic graphs terminate. Aliasing is not compared: a graph that shares one
/// node and a graph holding two equal copies of it are deep-equal.
#[must_use]
pub fn deep_eq(a: &Value, b: &Value) -> bool {
    DeepEq::default().check(a, b)
}

#[derive(Default, Clone)]
struct DeepEq {
    assumed: FxHashSet<(usize, usize)>,
}

impl DeepEq {
    fn check(&mut self, a: &Value, b: &Value) -> bool {
        let mut work = vec![(a.clone(), b.clone())];
        while let Some((a, b)) = work.pop() {
            match (&a, &b) {
                (Value::Object(x), Value::Object(y)) => {
                    if !self.assumed.insert((x.identity(), y.identity())) {
                        continue;
                    }
                    if !self.objects(x, y, &mut work) {
                        return false;
                    }
                }
                _ => {
                    if a != b {
                        return false;
                    }
                }
            }
        }
        true
    }

    fn objects(&self, x: &ObjRef, y: &ObjRef, work: &mut Vec<(Value, Value)>) -> bool {
        if x.ty().name() != y.ty().name() {
            return false;
        }
        let (dx, dy) = (x.data(), y.data());
        match (&*dx, &*dy) {
            (ObjectData::Pending, ObjectData::Pending) => true,
            (ObjectData::Fields(a), ObjectData::Fields(b))
            | (ObjectData::Items(a), ObjectData::Items(b)) => pairwise(a, b, work),
            (ObjectData::Immutable(a), ObjectData::Immutable(b)) => pairwise(&**a, &**b, work),
            (ObjectData::Linked(a), ObjectData::Linked(b)) => pairwise(a, b, work),
            (ObjectData::Cons(a), ObjectData::Cons(b)) => pairwise(a.iter(), b.iter(), work),
            (ObjectData::ImmutableMap(a), ObjectData::ImmutableMap(b)) => {
                if a.len() != b.len() {
                    return false;
                }
                for ((ka, va), (kb, vb)) in a.iter().zip(b.iter()) {
                    work.push((ka.clone(), kb.clone()));
                    work.push((va.clone(), vb.clone()));
                }
                true
            }
            (ObjectData::Set(a), ObjectData::Set(b)) => {
                let left: Vec<_> = a.iter().map(|k| (k.clone(), Value::Null)).collect();
                let right: Vec<_> = b.iter().map(|k| (k.clone(), Value::Null)).collect();
                self.unordered(&left, &right)
            }
            (ObjectData::Map(a), ObjectData::Map(b)) => {
                let left: Vec<_> = a.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
                let right: Vec<_> = b.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
                self.unordered(&left, &right)
            }
            (ObjectData::Exception(a), ObjectData::Exception(b)) => {
                work.push((a.inner().clone(), b.inner().clone()));
                a.message() == b.message() && a.stack_trace() == b.stack_trace()
            }
            (ObjectData::Member(a), ObjectData::Member(b)) => a == b,
            (ObjectData::TypeHandle(a), ObjectData::TypeHandle(b)) => a == b,
            (ObjectData::Delegate(a), ObjectData::Delegate(b)) => {
                work.push((a.target().clone(), b.target().clone()));
                a.method() == b.method()
            }
            _ => false,
        }
    }

    // Hash containers have no shared order: each entry is matched against any
    // not-yet-matched entry on the other side, under the pairs assumed so far.
    fn unordered(&self, left: &[(Value, Value)], right: &[(Value, Value)]) -> bool {
        if left.len() != right.len() {
            return false;
        }
        let mut used = vec![false; right.len()];
        for (lk, lv) in left {
            let found = right.iter().enumerate().position(|(i, (rk, rv))| {
                !used[i] && self.clone().check(lk, rk) && self.clone().check(lv, rv)
            });
            match found {
                Some(i) => used[i] = true,
                None => return false,
            }
        }
        true
    }
}

fn pairwise<'a>(
    a: impl IntoIterator<Item = &'a Value>,
    b: impl IntoIterator<Item = &'a Value>,
    work: &mut Vec<(Value, Value)>,
) -> bool {
    let (mut a, mut b) = (a.into_iter(), b.into_iter());
    loop {
        match (a.next(), b.next()) {
            (Some(x), Some(y)) => work.push((x.clone(), y.clone())),
            (None, None) => return true,
            _ => return false,
        }
    }
}
