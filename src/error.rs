//! A single unified error type for the whole crate.
//!
//! There is no local recovery anywhere in this crate: the first fatal
//! condition propagates straight out of `inflate`/`decode_png` and whatever
//! was already written to the caller's output buffer is left undefined.

use std::fmt;

/// Categorical tag distinguishing why a decode failed. Carried purely for
/// diagnostics; callers should not need to match on it to decide what to do,
/// since every variant is equally fatal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    MalformedSignature,
    UnsupportedFormat,
    OversubscribedHuffman,
    InvalidSymbol,
    BackReferenceOutOfRange,
    OutputOverflow,
    InputTruncated,
    ChunkOrderViolation,
    CrcMismatch,
    FilterCodeInvalid,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            ErrorKind::MalformedSignature => "malformed PNG signature",
            ErrorKind::UnsupportedFormat => "unsupported bit depth, color type or interlace mode",
            ErrorKind::OversubscribedHuffman => "oversubscribed Huffman code",
            ErrorKind::InvalidSymbol => "decoded symbol out of range",
            ErrorKind::BackReferenceOutOfRange => "back-reference reads before output start",
            ErrorKind::OutputOverflow => "write would exceed output buffer",
            ErrorKind::InputTruncated => "input exhausted mid-symbol",
            ErrorKind::ChunkOrderViolation => "PNG chunks out of required order",
            ErrorKind::CrcMismatch => "chunk CRC-32 does not match stored value",
            ErrorKind::FilterCodeInvalid => "scanline filter byte out of range",
        };
        f.write_str(msg)
    }
}

/// The one error type every fallible operation in this crate returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fatal(pub ErrorKind);

impl fmt::Display for Fatal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for Fatal {}

impl From<ErrorKind> for Fatal {
    fn from(kind: ErrorKind) -> Self {
        Fatal(kind)
    }
}

/// Return `Fatal($kind)` unless `$cond` holds. Mirrors the teacher's
/// `safety_check!` macro, generalized to the unified error type.
#[macro_export]
macro_rules! safety_check {
    ($cond:expr, $kind:expr) => {
        if !($cond) {
            return Err($crate::error::Fatal($kind));
        }
    };
}

pub type Result<T> = std::result::Result<T, Fatal>;
