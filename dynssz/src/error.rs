use crate::expr::ExprError;
use std::fmt;
use thiserror::Error as ThisError;

/// The failure classes reported by the codec.
///
/// Every failure surfaced to a caller is one of these kinds, wrapped in an
/// [`Error`] that carries the path of the value at which the failure was
/// detected and, for decoding failures, the byte offset.
#[derive(Debug, PartialEq, Clone, ThisError)]
pub enum ErrorKind {
    /// A spec identifier used in a `dynamic_size` expression is not registered.
    #[error("unknown spec value `{0}`")]
    UnknownSpec(String),
    /// A `dynamic_size` expression failed to parse or evaluate, or a size
    /// annotation is malformed.
    #[error("size expression error: {0}")]
    Expression(String),
    /// An encoded or declared length disagrees with the length found.
    #[error("size mismatch: expected {expected} but found {found}")]
    SizeMismatch { expected: usize, found: usize },
    /// An offset is out of range, points into the fixed portion, skips
    /// variable bytes, or decreases relative to the previous offset.
    #[error("invalid offset {offset}")]
    InvalidOffset { offset: usize },
    /// A decoded list holds more elements than its declared maximum.
    #[error("list of {len} elements exceeds maximum of {max}")]
    ListOverflow { len: usize, max: usize },
    /// A bitlist payload is missing its length-delimiting bit or carries
    /// non-zero padding.
    #[error("invalid bitlist: {0}")]
    InvalidBitlist(&'static str),
    /// A union selector is outside the declared variant range.
    #[error("invalid union selector {0}")]
    InvalidUnionSelector(u8),
    /// Trailing bytes remained after the top-level value was decoded.
    #[error("{len} bytes supplied but only {expected} consumed")]
    ExtraData { len: usize, expected: usize },
    /// The codec has no rule for this type.
    #[error("unsupported type: {0}")]
    UnsupportedType(&'static str),
    /// An internal size or offset exceeds its representable bound.
    #[error("size computation overflowed")]
    Overflow,
    /// The bytes were structurally sound but invalid for the target type.
    #[error("invalid bytes: {0}")]
    BytesInvalid(String),
}

/// A codec failure together with the path at which it was detected.
///
/// The path reads like an access expression, e.g. `Block.body.attestations[12].data`.
/// Decode failures additionally carry the byte offset within the top-level
/// input at which the error was detected.
#[derive(Debug, PartialEq, Clone)]
pub struct Error {
    kind: ErrorKind,
    path: String,
    byte_offset: Option<usize>,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            write!(f, "{}", self.kind)?;
        } else {
            write!(f, "{}: {}", self.path, self.kind)?;
        }
        if let Some(offset) = self.byte_offset {
            write!(f, " (at byte {})", offset)?;
        }
        Ok(())
    }
}

impl std::error::Error for Error {}

impl Error {
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            path: String::new(),
            byte_offset: None,
        }
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn byte_offset(&self) -> Option<usize> {
        self.byte_offset
    }

    /// Prepends a field name to the path as the error bubbles out of a
    /// container.
    pub fn with_field(mut self, name: &str) -> Self {
        if self.path.is_empty() || self.path.starts_with('[') {
            self.path = format!("{}{}", name, self.path);
        } else {
            self.path = format!("{}.{}", name, self.path);
        }
        self
    }

    /// Prepends an element index to the path as the error bubbles out of a
    /// vector, list or union payload.
    pub fn with_index(mut self, i: usize) -> Self {
        if self.path.is_empty() || self.path.starts_with('[') {
            self.path = format!("[{}]{}", i, self.path);
        } else {
            self.path = format!("[{}].{}", i, self.path);
        }
        self
    }

    /// Records the byte offset at which a decode failure was detected, or
    /// rebases an already-recorded offset into the parent slice.
    pub fn at_offset(mut self, base: usize) -> Self {
        self.byte_offset = Some(base + self.byte_offset.unwrap_or(0));
        self
    }

    pub(crate) fn size_mismatch(expected: usize, found: usize) -> Self {
        Self::new(ErrorKind::SizeMismatch { expected, found })
    }

    pub(crate) fn invalid_offset(offset: usize) -> Self {
        Self::new(ErrorKind::InvalidOffset { offset })
    }

    pub(crate) fn list_overflow(len: usize, max: usize) -> Self {
        Self::new(ErrorKind::ListOverflow { len, max })
    }

    pub(crate) fn overflow() -> Self {
        Self::new(ErrorKind::Overflow)
    }
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Self::new(kind)
    }
}

impl From<ExprError> for Error {
    fn from(e: ExprError) -> Self {
        match e {
            ExprError::UnknownSpec(name) => Self::new(ErrorKind::UnknownSpec(name)),
            other => Self::new(ErrorKind::Expression(other.to_string())),
        }
    }
}
