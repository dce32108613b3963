
//! Error type definitions.

use std::borrow::Cow;
use std::convert::TryFrom;
use std::error;
use std::fmt;
use std::io;
use std::io::ErrorKind;

/// A result that may contain an error.
/// Most functions of this crate return this type.
pub type Result<T> = std::result::Result<T, Error>;

/// A result that, if ok, contains nothing, and otherwise contains an error.
pub type UnitResult = Result<()>;


/// An error that may happen while reading or writing a file.
/// Distinguishes between different types of errors,
/// such as schema-authoring mistakes and unexpected file structure.
#[derive(Debug)]
pub enum Error {

    /// A tagged record description is malformed.
    /// Detected when the description is registered, never while parsing a file.
    Schema(Cow<'static, str>),

    /// The contents of the file are not supported by
    /// this specific implementation, even though
    /// the data may be valid in the underlying standard.
    NotSupported(Cow<'static, str>),

    /// The contents of the file or the arguments of an operation
    /// are contradicting, or a requested region lies outside the image.
    Invalid(Cow<'static, str>),

    /// The underlying byte stream could not be read or written successfully.
    Io(io::Error),
}


impl Error {

    /// Create an error of the variant `Invalid`.
    pub(crate) fn invalid(message: impl Into<Cow<'static, str>>) -> Self {
        Error::Invalid(message.into())
    }

    /// Create an error of the variant `NotSupported`.
    pub(crate) fn unsupported(message: impl Into<Cow<'static, str>>) -> Self {
        Error::NotSupported(message.into())
    }

    /// Create an error of the variant `Schema`.
    pub(crate) fn schema(message: impl Into<Cow<'static, str>>) -> Self {
        Error::Schema(message.into())
    }
}

/// Enable using the `?` operator on `io::Result`.
impl From<io::Error> for Error {
    fn from(error: io::Error) -> Self {
        if error.kind() == ErrorKind::UnexpectedEof {
            Error::invalid("reference to out-of-bounds bytes (truncated stream?)")
        }
        else {
            Error::Io(error)
        }
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            Error::Io(source) => Some(source),
            _ => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Schema(message) => write!(formatter, "invalid record description: {}", message),
            Error::NotSupported(message) => write!(formatter, "not supported: {}", message),
            Error::Invalid(message) => write!(formatter, "invalid: {}", message),
            Error::Io(error) => write!(formatter, "io error: {}", error),
        }
    }
}


/// A recoverable condition encountered while parsing.
/// Parsing continues with best-effort partial data; the warnings
/// are collected on the parsed object for the caller to inspect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Warning {

    /// Name of the field or tag this warning refers to.
    pub field: String,

    /// What was expected, and what was found instead.
    pub message: Cow<'static, str>,

    /// Byte position in the file where the condition was detected.
    pub byte_offset: u64,
}

impl Warning {
    pub(crate) fn new(field: impl Into<String>, message: impl Into<Cow<'static, str>>, byte_offset: u64) -> Self {
        Warning { field: field.into(), message: message.into(), byte_offset }
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{} (field `{}` at byte {})", self.message, self.field, self.byte_offset)
    }
}


/// Panics in debug mode on overflow, as that is a bug, not a file error.
pub(crate) fn u64_to_usize(value: u64) -> usize {
    usize::try_from(value).expect("(u64 as usize) overflowed")
}

/// Returns an `Error::Invalid` if the value is negative.
pub(crate) fn i64_to_u64(value: i64, error_message: &'static str) -> Result<u64> {
    u64::try_from(value).map_err(|_| Error::invalid(error_message))
}
