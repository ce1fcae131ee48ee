// Single-owner position over a token stream, with exact structural skip of subtrees.
use crate::core::error::{Error, ErrorKind};
use crate::core::token::{Token, TokenKind, TokenStream};

#[derive(Debug)]
pub struct TokenCursor<'a> {
    stream: &'a TokenStream<'a>,
    pos: usize,
}

impl<'a> TokenCursor<'a> {
    pub fn new(stream: &'a TokenStream<'a>) -> Self {
        Self { stream, pos: 0 }
    }

    pub fn stream(&self) -> &'a TokenStream<'a> {
        self.stream
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn is_exhausted(&self) -> bool {
        self.pos >= self.stream.len()
    }

    pub fn peek(&self) -> Result<Token, Error> {
        self.stream
            .get(self.pos)
            .copied()
            .ok_or_else(|| past_end(self.pos))
    }

    pub fn next_token(&mut self) -> Result<Token, Error> {
        let token = self.peek()?;
        self.pos += 1;
        Ok(token)
    }

    /// Consume the start token of a container of `kind`, leaving the cursor on its first child.
    pub fn expect(&mut self, kind: TokenKind) -> Result<Token, Error> {
        let token = self.peek()?;
        if token.kind != kind {
            return Err(Error::new(ErrorKind::DecodeTypeMismatch)
                .with_message(format!("expected {kind:?}, found {:?}", token.kind))
                .with_offset(token.start));
        }
        self.pos += 1;
        Ok(token)
    }

    /// Index of the first token after the subtree rooted at `index`.
    pub fn skip(&self, index: usize) -> Result<usize, Error> {
        let mut next = index;
        let mut pending: usize = 1;
        while pending > 0 {
            let token = self.stream.get(next).ok_or_else(|| past_end(next))?;
            pending -= 1;
            pending = match token.kind {
                TokenKind::Object => token.size.checked_mul(2).and_then(|n| pending.checked_add(n)),
                TokenKind::Array => pending.checked_add(token.size),
                TokenKind::String | TokenKind::Primitive => Some(pending),
            }
            .ok_or_else(|| {
                Error::new(ErrorKind::MalformedResponse)
                    .with_message("token child count overflow")
                    .with_offset(token.start)
            })?;
            next += 1;
        }
        Ok(next)
    }

    pub fn skip_value(&mut self) -> Result<(), Error> {
        self.pos = self.skip(self.pos)?;
        Ok(())
    }

    /// Reposition to `index`, which may be one past the last token.
    pub fn seek(&mut self, index: usize) -> Result<(), Error> {
        if index > self.stream.len() {
            return Err(past_end(index));
        }
        self.pos = index;
        Ok(())
    }
}

fn past_end(index: usize) -> Error {
    Error::new(ErrorKind::MalformedResponse)
        .with_message(format!("token stream ended before token {index}"))
}

#[cfg(test)]
mod tests {
    use super::TokenCursor;
    use crate::core::error::ErrorKind;
    use crate::core::token::{TokenKind, TokenStream};

    #[test]
    fn skip_scalar_advances_one() {
        let stream = TokenStream::parse(r#"["a", 1, true]"#).expect("parse");
        let cursor = TokenCursor::new(&stream);
        assert_eq!(cursor.skip(1).expect("skip"), 2);
        assert_eq!(cursor.skip(3).expect("skip"), 4);
    }

    #[test]
    fn skip_whole_document_reaches_end() {
        let body = r#"{"a": {"b": [1, [2, {"c": []}], {}]}, "d": "e", "f": [[[]]]}"#;
        let stream = TokenStream::parse(body).expect("parse");
        let mut cursor = TokenCursor::new(&stream);
        cursor.skip_value().expect("skip");
        assert_eq!(cursor.position(), stream.len());
        assert!(cursor.is_exhausted());
    }

    #[test]
    fn skip_nested_value_lands_on_next_sibling_key() {
        let body = r#"{"decoy": {"x": [1, {"y": [[{}], "z"]}], "w": {}}, "next": 7}"#;
        let stream = TokenStream::parse(body).expect("parse");
        let mut cursor = TokenCursor::new(&stream);
        cursor.expect(TokenKind::Object).expect("object");
        cursor.next_token().expect("key");
        cursor.skip_value().expect("skip");
        let key = cursor.position();
        assert_eq!(stream.raw(key), Some("next"));
        assert_eq!(stream.raw(key + 1), Some("7"));
    }

    #[test]
    fn skip_past_end_is_malformed() {
        let stream = TokenStream::parse("[]").expect("parse");
        let cursor = TokenCursor::new(&stream);
        let err = cursor.skip(1).expect_err("past end");
        assert_eq!(err.kind(), ErrorKind::MalformedResponse);
    }

    #[test]
    fn seek_restores_recorded_subtree_end() {
        let stream = TokenStream::parse(r#"[{"a": [1, 2]}, "after"]"#).expect("parse");
        let mut cursor = TokenCursor::new(&stream);
        cursor.expect(TokenKind::Array).expect("array");
        let end = cursor.skip(cursor.position()).expect("skip");
        cursor.next_token().expect("object");
        cursor.next_token().expect("key");
        cursor.seek(end).expect("seek");
        assert_eq!(stream.raw(cursor.position()), Some("after"));

        cursor.seek(stream.len()).expect("seek to end");
        assert!(cursor.is_exhausted());
        let err = cursor.seek(stream.len() + 1).expect_err("past end");
        assert_eq!(err.kind(), ErrorKind::MalformedResponse);
    }

    #[test]
    fn expect_reports_kind_mismatch() {
        let stream = TokenStream::parse("[1]").expect("parse");
        let mut cursor = TokenCursor::new(&stream);
        let err = cursor.expect(TokenKind::Object).expect_err("mismatch");
        assert_eq!(err.kind(), ErrorKind::DecodeTypeMismatch);
        assert_eq!(cursor.position(), 0);
    }
}
