//! Purpose: Turn a response body into a flat, depth-first sequence of JSON tokens.
//! Exports: `TokenKind`, `Token`, `TokenStream`, `MAX_DEPTH`.
//! Role: Producer for the cursor and binding decoder; never builds a tree.
//! Invariants: Object `size` counts key/value pairs; array `size` counts elements.
//! Invariants: String spans exclude quotes; container spans include both brackets.
//! Invariants: Any syntax violation is `MalformedResponse` with a byte offset.
use std::borrow::Cow;

use crate::core::error::{Error, ErrorKind};

pub const MAX_DEPTH: usize = 512;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TokenKind {
    Object,
    Array,
    String,
    Primitive,
}

impl TokenKind {
    pub fn is_container(self) -> bool {
        matches!(self, TokenKind::Object | TokenKind::Array)
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub start: usize,
    pub end: usize,
    pub size: usize,
}

#[derive(Debug)]
pub struct TokenStream<'a> {
    body: &'a str,
    tokens: Vec<Token>,
}

impl<'a> TokenStream<'a> {
    pub fn parse(body: &'a str) -> Result<Self, Error> {
        let tokens = Tokenizer::new(body.as_bytes()).run()?;
        Ok(Self { body, tokens })
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Token> {
        self.tokens.get(index)
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn raw(&self, index: usize) -> Option<&'a str> {
        let token = self.tokens.get(index)?;
        self.body.get(token.start..token.end)
    }

    /// Unescaped contents of a string token, or the raw span of any other token.
    pub fn text(&self, index: usize) -> Result<Cow<'a, str>, Error> {
        let token = self.tokens.get(index).ok_or_else(|| out_of_range(index))?;
        let raw = self.raw(index).ok_or_else(|| out_of_range(index))?;
        if token.kind != TokenKind::String || !raw.contains('\\') {
            return Ok(Cow::Borrowed(raw));
        }
        let quoted = &self.body[token.start - 1..token.end + 1];
        serde_json::from_str::<String>(quoted)
            .map(Cow::Owned)
            .map_err(|err| {
                Error::new(ErrorKind::MalformedResponse)
                    .with_message("invalid string escape")
                    .with_offset(token.start)
                    .with_source(err)
            })
    }
}

fn out_of_range(index: usize) -> Error {
    Error::new(ErrorKind::MalformedResponse)
        .with_message(format!("token index {index} is past the end of the stream"))
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Expect {
    Value,
    ValueOrClose,
    Key,
    KeyOrClose,
    Colon,
    CommaOrClose,
    End,
}

struct Tokenizer<'b> {
    bytes: &'b [u8],
    pos: usize,
    tokens: Vec<Token>,
    open: Vec<usize>,
    expect: Expect,
}

impl<'b> Tokenizer<'b> {
    fn new(bytes: &'b [u8]) -> Self {
        Self {
            bytes,
            pos: 0,
            tokens: Vec::new(),
            open: Vec::new(),
            expect: Expect::Value,
        }
    }

    fn run(mut self) -> Result<Vec<Token>, Error> {
        loop {
            self.skip_whitespace();
            let Some(&byte) = self.bytes.get(self.pos) else {
                if self.expect == Expect::End {
                    return Ok(self.tokens);
                }
                return Err(self.fail("unexpected end of input"));
            };

            match (self.expect, byte) {
                (Expect::Value | Expect::ValueOrClose, b'{') => self.open_container(TokenKind::Object)?,
                (Expect::Value | Expect::ValueOrClose, b'[') => self.open_container(TokenKind::Array)?,
                (Expect::KeyOrClose | Expect::CommaOrClose, b'}') => {
                    self.close_container(TokenKind::Object)?
                }
                (Expect::ValueOrClose | Expect::CommaOrClose, b']') => {
                    self.close_container(TokenKind::Array)?
                }
                (Expect::Key | Expect::KeyOrClose, b'"') => {
                    self.bump_parent();
                    self.string()?;
                    self.expect = Expect::Colon;
                }
                (Expect::Value | Expect::ValueOrClose, b'"') => {
                    self.bump_array_parent();
                    self.string()?;
                    self.expect = self.after_value();
                }
                (Expect::Colon, b':') => {
                    self.pos += 1;
                    self.expect = Expect::Value;
                }
                (Expect::CommaOrClose, b',') => {
                    self.pos += 1;
                    self.expect = match self.top_kind() {
                        Some(TokenKind::Object) => Expect::Key,
                        _ => Expect::Value,
                    };
                }
                (Expect::Value | Expect::ValueOrClose, b'-' | b'0'..=b'9' | b't' | b'f' | b'n') => {
                    self.bump_array_parent();
                    self.primitive()?;
                    self.expect = self.after_value();
                }
                _ => return Err(self.fail(format!("unexpected byte {:?}", byte as char))),
            }
        }
    }

    fn skip_whitespace(&mut self) {
        while let Some(b' ' | b'\t' | b'\n' | b'\r') = self.bytes.get(self.pos) {
            self.pos += 1;
        }
    }

    fn top_kind(&self) -> Option<TokenKind> {
        self.open.last().map(|&index| self.tokens[index].kind)
    }

    fn after_value(&self) -> Expect {
        if self.open.is_empty() {
            Expect::End
        } else {
            Expect::CommaOrClose
        }
    }

    // Object pairs are counted at the key, array elements at the value.
    fn bump_parent(&mut self) {
        if let Some(&index) = self.open.last() {
            self.tokens[index].size += 1;
        }
    }

    fn bump_array_parent(&mut self) {
        if self.top_kind() == Some(TokenKind::Array) {
            self.bump_parent();
        }
    }

    fn open_container(&mut self, kind: TokenKind) -> Result<(), Error> {
        if self.open.len() >= MAX_DEPTH {
            return Err(self.fail(format!("nesting deeper than {MAX_DEPTH} levels")));
        }
        self.bump_array_parent();
        self.tokens.push(Token {
            kind,
            start: self.pos,
            end: self.pos,
            size: 0,
        });
        self.open.push(self.tokens.len() - 1);
        self.pos += 1;
        self.expect = match kind {
            TokenKind::Object => Expect::KeyOrClose,
            _ => Expect::ValueOrClose,
        };
        Ok(())
    }

    fn close_container(&mut self, kind: TokenKind) -> Result<(), Error> {
        if self.top_kind() != Some(kind) {
            return Err(self.fail("mismatched closing bracket"));
        }
        if let Some(index) = self.open.pop() {
            self.tokens[index].end = self.pos + 1;
        }
        self.pos += 1;
        self.expect = self.after_value();
        Ok(())
    }

    fn string(&mut self) -> Result<(), Error> {
        let start = self.pos + 1;
        let mut index = start;
        loop {
            let Some(&byte) = self.bytes.get(index) else {
                self.pos = index;
                return Err(self.fail("unterminated string"));
            };
            match byte {
                b'"' => break,
                b'\\' => {
                    index += 1;
                    match self.bytes.get(index) {
                        Some(b'"' | b'\\' | b'/' | b'b' | b'f' | b'n' | b'r' | b't') => index += 1,
                        Some(b'u') => {
                            let digits = self.bytes.get(index + 1..index + 5);
                            if !digits.is_some_and(|d| d.iter().all(u8::is_ascii_hexdigit)) {
                                self.pos = index;
                                return Err(self.fail("invalid unicode escape"));
                            }
                            index += 5;
                        }
                        _ => {
                            self.pos = index;
                            return Err(self.fail("invalid escape sequence"));
                        }
                    }
                }
                0x00..=0x1f => {
                    self.pos = index;
                    return Err(self.fail("control character in string"));
                }
                _ => index += 1,
            }
        }
        self.tokens.push(Token {
            kind: TokenKind::String,
            start,
            end: index,
            size: 0,
        });
        self.pos = index + 1;
        Ok(())
    }

    fn primitive(&mut self) -> Result<(), Error> {
        let start = self.pos;
        let mut end = start;
        while let Some(&byte) = self.bytes.get(end) {
            if matches!(byte, b' ' | b'\t' | b'\n' | b'\r' | b',' | b']' | b'}' | b':') {
                break;
            }
            end += 1;
        }
        let text = &self.bytes[start..end];
        if !matches!(text, b"true" | b"false" | b"null") && !is_number(text) {
            return Err(self.fail("invalid literal"));
        }
        self.tokens.push(Token {
            kind: TokenKind::Primitive,
            start,
            end,
            size: 0,
        });
        self.pos = end;
        Ok(())
    }

    fn fail(&self, message: impl Into<String>) -> Error {
        Error::new(ErrorKind::MalformedResponse)
            .with_message(message)
            .with_offset(self.pos)
    }
}

// -?(0|[1-9][0-9]*)(\.[0-9]+)?([eE][+-]?[0-9]+)?
fn is_number(text: &[u8]) -> bool {
    let mut index = 0;
    let digits_from = |mut i: usize| {
        while text.get(i).is_some_and(u8::is_ascii_digit) {
            i += 1;
        }
        i
    };

    if text.first() == Some(&b'-') {
        index += 1;
    }
    match text.get(index) {
        Some(b'0') => index += 1,
        Some(b'1'..=b'9') => index = digits_from(index + 1),
        _ => return false,
    }
    if text.get(index) == Some(&b'.') {
        let after = digits_from(index + 1);
        if after == index + 1 {
            return false;
        }
        index = after;
    }
    if let Some(b'e' | b'E') = text.get(index) {
        index += 1;
        if let Some(b'+' | b'-') = text.get(index) {
            index += 1;
        }
        let after = digits_from(index);
        if after == index {
            return false;
        }
        index = after;
    }
    index == text.len()
}
