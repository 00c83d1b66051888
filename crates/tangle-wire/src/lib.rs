// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Identity-preserving, polymorphic binary codec for `tangle-model` graphs.
//!
//! An [`Engine`] turns a [`Value`](tangle_model::Value) graph into bytes and
//! back. Types need no serialization contract: a fixed, ordered chain of
//! shape resolvers recognizes arrays, maps, sets, linked lists, immutable
//! and persistent collections, exceptions, reflection handles, delegates,
//! duck-typed user collections and plain records, and builds a codec for
//! each type on first use. [`Surrogate`]s carry types none of them can
//! build.
//!
//! With [`WireConfig::preserve_references`] on, each object is written once
//! and later occurrences become back-references, so shared nodes stay shared
//! and cycles terminate. With it off, a cycle fails with
//! [`WireError::CycleDetected`].
//!
//! The format is private to engines built over the same registry: there is
//! no versioning, compression or schema negotiation.
#![forbid(unsafe_code)]

mod codec;
mod config;
mod engine;
mod error;
mod framing;
mod resolver;
mod session;
mod surrogate;

pub use codec::{CodecError, Reader, Writer};
pub use config::{ConfigError, ConfigService, ConfigStore, FileConfigStore, WireConfig};
pub use engine::{CodecUnit, Engine, EngineBuilder};
pub use error::{ErrorCategory, WireError};
pub use framing::{Decoder, Element, Encoder};
pub use resolver::{ShapeResolver, ValueCodec};
pub use session::Slot;
pub use surrogate::{Conversion, Surrogate, SurrogateError, TypePredicate};
