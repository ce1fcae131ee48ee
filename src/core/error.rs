use std::error::Error as StdError;
use std::fmt;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorKind {
    Internal,
    Usage,
    Transport,
    MalformedResponse,
    DecodeTypeMismatch,
    Response,
}

#[derive(Debug)]
pub struct Error {
    kind: ErrorKind,
    message: Option<String>,
    hint: Option<String>,
    offset: Option<usize>,
    source: Option<Box<dyn StdError + Send + Sync>>,
}

impl Error {
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            message: None,
            hint: None,
            offset: None,
            source: None,
        }
    }

    /// Collapse any failure into the single outcome reported by a listing fetch.
    /// The original error stays reachable through `source()` and `cause_kind()`.
    pub fn response(cause: Error) -> Self {
        if cause.kind == ErrorKind::Response {
            return cause;
        }
        let hint = cause.hint.clone();
        let mut err = Error::new(ErrorKind::Response)
            .with_message("listing request failed")
            .with_source(cause);
        err.hint = hint;
        err
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Kind of the wrapped error when this is a `Response` error.
    pub fn cause_kind(&self) -> Option<ErrorKind> {
        self.source
            .as_ref()
            .and_then(|source| source.downcast_ref::<Error>())
            .map(Error::kind)
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn hint(&self) -> Option<&str> {
        self.hint.as_deref()
    }

    pub fn offset(&self) -> Option<usize> {
        self.offset
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    pub fn with_offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn with_source(mut self, source: impl StdError + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.kind)?;
        if let Some(message) = &self.message {
            write!(f, ": {message}")?;
        }
        if let Some(offset) = self.offset {
            write!(f, " (offset: {offset})")?;
        }
        Ok(())
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|source| source.as_ref() as &(dyn StdError + 'static))
    }
}

pub fn to_exit_code(kind: ErrorKind) -> i32 {
    match kind {
        ErrorKind::Internal => 1,
        ErrorKind::Usage => 2,
        ErrorKind::Transport => 3,
        ErrorKind::MalformedResponse => 4,
        ErrorKind::DecodeTypeMismatch => 5,
        ErrorKind::Response => 6,
    }
}

#[cfg(test)]
mod tests {
    use super::{Error, ErrorKind, to_exit_code};
    use std::error::Error as _;

    #[test]
    fn exit_code_mapping_is_stable() {
        let cases = [
            (ErrorKind::Internal, 1),
            (ErrorKind::Usage, 2),
            (ErrorKind::Transport, 3),
            (ErrorKind::MalformedResponse, 4),
            (ErrorKind::DecodeTypeMismatch, 5),
            (ErrorKind::Response, 6),
        ];

        for (kind, code) in cases {
            assert_eq!(to_exit_code(kind), code);
        }
    }

    #[test]
    fn response_wraps_cause_and_keeps_kind() {
        let cause = Error::new(ErrorKind::DecodeTypeMismatch).with_message("expected integer");
        let err = Error::response(cause);
        assert_eq!(err.kind(), ErrorKind::Response);
        assert_eq!(err.cause_kind(), Some(ErrorKind::DecodeTypeMismatch));
        let source = err.source().expect("source");
        assert!(source.to_string().contains("expected integer"));
    }

    #[test]
    fn response_carries_cause_hint() {
        let cause = Error::new(ErrorKind::Transport).with_hint("retry later");
        assert_eq!(Error::response(cause).hint(), Some("retry later"));
    }

    #[test]
    fn response_does_not_double_wrap() {
        let inner = Error::response(Error::new(ErrorKind::Transport));
        let outer = Error::response(inner);
        assert_eq!(outer.cause_kind(), Some(ErrorKind::Transport));
    }

    #[test]
    fn display_includes_message_and_offset() {
        let err = Error::new(ErrorKind::MalformedResponse)
            .with_message("unexpected byte")
            .with_offset(12);
        assert_eq!(err.to_string(), "MalformedResponse: unexpected byte (offset: 12)");
    }
}
