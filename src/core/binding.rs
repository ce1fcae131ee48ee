//! Purpose: Declarative key-to-destination bindings and the decode pass that drives them.
//! Exports: `BindingTable`, `Binding`, `Target`.
//! Role: Decodes one JSON object from a `TokenCursor` into caller-owned slots, no tree built.
//! Invariants: `decode` consumes exactly the object subtree at the cursor.
//! Invariants: Unbound keys are skipped structurally; absent keys leave slots untouched.
//! Invariants: A `null` value counts as absent for every binding kind.
//! Invariants: Flags are only ever raised during a pass, never cleared.
use std::cell::Cell;
use std::fmt;

use bitflags::Flags;

use crate::core::cursor::TokenCursor;
use crate::core::error::{Error, ErrorKind};
use crate::core::token::{Token, TokenKind};

pub type NestedHandler<'a> = Box<dyn FnMut(&mut TokenCursor<'_>) -> Result<(), Error> + 'a>;

pub enum Target<'a> {
    String(&'a mut Option<String>),
    Int(&'a mut i64),
    Flag(Box<dyn FnMut() + 'a>),
    Nested(NestedHandler<'a>),
}

pub struct Binding<'a> {
    name: &'a str,
    target: Target<'a>,
}

impl fmt::Debug for Binding<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.target {
            Target::String(_) => "String",
            Target::Int(_) => "Int",
            Target::Flag(_) => "Flag",
            Target::Nested(_) => "Nested",
        };
        f.debug_struct("Binding")
            .field("name", &self.name)
            .field("kind", &kind)
            .finish()
    }
}

impl<'a> Binding<'a> {
    pub fn new(name: &'a str, target: Target<'a>) -> Self {
        Self { name, target }
    }

    fn apply(&mut self, cursor: &mut TokenCursor<'_>) -> Result<(), Error> {
        let index = cursor.position();
        let token = cursor.peek()?;
        if is_null(cursor, index, &token) {
            return cursor.skip_value();
        }

        match &mut self.target {
            Target::String(slot) => {
                if token.kind.is_container() {
                    return Err(mismatch(self.name, "string", &token));
                }
                let value = cursor.stream().text(index)?;
                **slot = Some(value.into_owned());
                cursor.next_token()?;
            }
            Target::Int(slot) => {
                let raw = primitive_raw(cursor, index, &token)
                    .ok_or_else(|| mismatch(self.name, "integer", &token))?;
                **slot = raw
                    .parse::<i64>()
                    .map_err(|err| mismatch(self.name, "integer", &token).with_source(err))?;
                cursor.next_token()?;
            }
            Target::Flag(raise) => {
                let raw = primitive_raw(cursor, index, &token)
                    .ok_or_else(|| mismatch(self.name, "boolean", &token))?;
                if raw == "true" {
                    raise();
                }
                cursor.next_token()?;
            }
            Target::Nested(handler) => {
                if !token.kind.is_container() {
                    return Err(mismatch(self.name, "object or array", &token));
                }
                let end = cursor.skip(index)?;
                handler(cursor)?;
                if cursor.position() != end {
                    return Err(Error::new(ErrorKind::Internal)
                        .with_message(format!(
                            "handler for `{}` stopped at token {} instead of {end}",
                            self.name,
                            cursor.position()
                        ))
                        .with_offset(token.start));
                }
            }
        }
        Ok(())
    }
}

/// Ordered bindings describing the expected shape of one JSON object.
#[derive(Debug, Default)]
pub struct BindingTable<'a> {
    bindings: Vec<Binding<'a>>,
}

impl<'a> BindingTable<'a> {
    pub fn new() -> Self {
        Self {
            bindings: Vec::new(),
        }
    }

    pub fn bind(mut self, binding: Binding<'a>) -> Self {
        self.bindings.push(binding);
        self
    }

    pub fn string(self, name: &'a str, slot: &'a mut Option<String>) -> Self {
        self.bind(Binding::new(name, Target::String(slot)))
    }

    pub fn int(self, name: &'a str, slot: &'a mut i64) -> Self {
        self.bind(Binding::new(name, Target::Int(slot)))
    }

    /// Raise `flag` in `set` when the key's value is the literal `true`.
    pub fn flag<F>(self, name: &'a str, set: &'a Cell<F>, flag: F) -> Self
    where
        F: Flags + Copy + 'a,
    {
        let raise = move || set.set(set.get().union(flag));
        self.bind(Binding::new(name, Target::Flag(Box::new(raise))))
    }

    /// Hand the value to `handler` together with `context`. The handler must consume
    /// the whole value subtree.
    pub fn nested<C>(
        self,
        name: &'a str,
        context: &'a mut C,
        handler: fn(&mut TokenCursor<'_>, &mut C) -> Result<(), Error>,
    ) -> Self
    where
        C: ?Sized + 'a,
    {
        let call: NestedHandler<'a> = Box::new(move |cursor| handler(cursor, &mut *context));
        self.bind(Binding::new(name, Target::Nested(call)))
    }

    pub fn decode(&mut self, cursor: &mut TokenCursor<'_>) -> Result<(), Error> {
        let object = cursor.expect(TokenKind::Object)?;
        for _ in 0..object.size {
            let key_index = cursor.position();
            let key_token = cursor.next_token()?;
            if key_token.kind != TokenKind::String {
                return Err(Error::new(ErrorKind::MalformedResponse)
                    .with_message("object key is not a string")
                    .with_offset(key_token.start));
            }
            let key = cursor.stream().text(key_index)?;
            match self.bindings.iter_mut().find(|binding| binding.name == key) {
                Some(binding) => binding.apply(cursor)?,
                None => cursor.skip_value()?,
            }
        }
        Ok(())
    }
}

fn is_null(cursor: &TokenCursor<'_>, index: usize, token: &Token) -> bool {
    token.kind == TokenKind::Primitive && cursor.stream().raw(index) == Some("null")
}

fn primitive_raw<'s>(cursor: &TokenCursor<'s>, index: usize, token: &Token) -> Option<&'s str> {
    if token.kind != TokenKind::Primitive {
        return None;
    }
    cursor.stream().raw(index)
}

fn mismatch(name: &str, expected: &str, token: &Token) -> Error {
    Error::new(ErrorKind::DecodeTypeMismatch)
        .with_message(format!(
            "`{name}` expected {expected}, found {:?}",
            token.kind
        ))
        .with_offset(token.start)
}
