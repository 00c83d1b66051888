// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Stable type names and the generic-name grammar.
//!
//! Names are the only type identity that crosses the wire. A generic name is
//! canonical when it has no whitespace: `Map<string,List<i32>>`.

use std::borrow::Borrow;
use std::fmt;
use std::sync::Arc;

use crate::error::ModelError;

/// Stable, process-independent identifier for a type.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeName(Arc<str>);

impl TypeName {
    /// Builds the canonical name of a generic instantiation.
    #[must_use]
    pub fn generic(base: &str, args: &[TypeName]) -> Self {
        let mut out = String::with_capacity(base.len() + 2 + args.len() * 8);
        out.push_str(base);
        out.push('<');
        for (i, arg) in args.iter().enumerate() {
            if i > 0 {
                out.push(',');
            }
            out.push_str(arg.as_str());
        }
        out.push('>');
        Self(Arc::from(out))
    }

    /// Returns the name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Parses the name into its generic structure.
    pub fn parse(&self) -> Result<TypeExpr, ModelError> {
        TypeExpr::parse(&self.0)
    }
}

fn canonical(raw: &str) -> Arc<str> {
    if raw.chars().any(char::is_whitespace) {
        Arc::from(raw.chars().filter(|c| !c.is_whitespace()).collect::<String>())
    } else {
        Arc::from(raw)
    }
}

impl From<&str> for TypeName {
    fn from(raw: &str) -> Self {
        Self(canonical(raw))
    }
}

impl From<String> for TypeName {
    fn from(raw: String) -> Self {
        Self(canonical(&raw))
    }
}

impl From<&TypeName> for TypeName {
    fn from(name: &TypeName) -> Self {
        name.clone()
    }
}

impl From<&String> for TypeName {
    fn from(raw: &String) -> Self {
        Self(canonical(raw))
    }
}

impl Borrow<str> for TypeName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for TypeName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for TypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeName({})", self.0)
    }
}

/// Parsed type name: a base identifier plus generic arguments.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TypeExpr {
    /// Base identifier (`Map` in `Map<string,i32>`).
    pub base: String,
    /// Generic arguments, empty for non-generic names.
    pub args: Vec<TypeExpr>,
}

impl TypeExpr {
    /// Parses a type name. Whitespace between tokens is ignored.
    ///
    /// # Errors
    /// Returns [`ModelError::InvalidTypeName`] for empty identifiers, unbalanced
    /// angle brackets, empty argument lists, or trailing input.
    pub fn parse(input: &str) -> Result<Self, ModelError> {
        let mut parser = Parser { input, pos: 0 };
        let expr = parser.expr(0)?;
        parser.skip_ws();
        if parser.pos != input.len() {
            return Err(ModelError::InvalidTypeName(input.to_owned()));
        }
        Ok(expr)
    }

    /// Canonical name of this expression.
    #[must_use]
    pub fn name(&self) -> TypeName {
        if self.args.is_empty() {
            TypeName::from(self.base.as_str())
        } else {
            let args: Vec<TypeName> = self.args.iter().map(Self::name).collect();
            TypeName::generic(&self.base, &args)
        }
    }
}

// Nesting deeper than this is treated as malformed rather than recursed into.
const MAX_NESTING: usize = 64;

struct Parser<'a> {
    input: &'a str,
    pos: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
    }

    fn fail(&self) -> ModelError {
        ModelError::InvalidTypeName(self.input.to_owned())
    }

    fn expr(&mut self, depth: usize) -> Result<TypeExpr, ModelError> {
        if depth > MAX_NESTING {
            return Err(self.fail());
        }
        self.skip_ws();
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|c| c.is_alphanumeric() || matches!(c, '_' | '.' | ':' | '`'))
        {
            self.bump();
        }
        if self.pos == start {
            return Err(self.fail());
        }
        let base = self.input[start..self.pos].to_owned();
        self.skip_ws();
        let mut args = Vec::new();
        if self.peek() == Some('<') {
            self.bump();
            loop {
                args.push(self.expr(depth + 1)?);
                self.skip_ws();
                match self.bump() {
                    Some(',') => {}
                    Some('>') => break,
                    _ => return Err(self.fail()),
                }
            }
        }
        Ok(TypeExpr { base, args })
    }
}
