use std::fmt;
use std::io;

/// Coarse classification of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A malformed byte in a URL, header or cookie segment.
    Argument,
    /// An event or operation arrived in a state that cannot accept it.
    State,
    /// A buffer could not grow.
    Allocation,
    /// A lookup missed. Not fatal.
    NotFound,
    /// The transport failed while writing.
    Io,
}

/// Errors produced by the request/response layer.
///
/// Argument and State errors terminate parsing of the request they belong
/// to. They never affect other connections.
#[derive(Debug)]
pub enum Error {
    /// Malformed input, with a human-readable description.
    Argument(String),
    /// Contract violation: the component was in the wrong state.
    State(String),
    /// A growable buffer failed to reserve memory.
    Allocation,
    /// No entry for the given key.
    NotFound(String),
    /// The byte-level tokenizer rejected the stream.
    Parse(ParseError),
    /// Writing to the transport failed.
    Io(io::Error),
}

impl Error {
    pub(crate) fn argument(msg: impl Into<String>) -> Self {
        Self::Argument(msg.into())
    }

    pub(crate) fn state(msg: impl Into<String>) -> Self {
        Self::State(msg.into())
    }

    /// The taxonomy bucket this error belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Argument(_) | Self::Parse(_) => ErrorKind::Argument,
            Self::State(_) => ErrorKind::State,
            Self::Allocation => ErrorKind::Allocation,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Io(_) => ErrorKind::Io,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Argument(m) => write!(f, "invalid argument: {m}"),
            Self::State(m) => write!(f, "invalid state: {m}"),
            Self::Allocation => write!(f, "allocation failed"),
            Self::NotFound(k) => write!(f, "not found: '{k}'"),
            Self::Parse(e) => write!(f, "http parse error: {e}"),
            Self::Io(e) => write!(f, "transport error: {e}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Parse(e) => Some(e),
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ParseError> for Error {
    fn from(e: ParseError) -> Self {
        Self::Parse(e)
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

/// Errors raised by the byte-level [`Tokenizer`](crate::Tokenizer).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// The HTTP method token is too long.
    InvalidMethod(String),
    /// The HTTP version string is not `HTTP/1.0` or `HTTP/1.1`.
    InvalidVersion(String),
    /// The request URL is empty or too long.
    InvalidUrl(String),
    /// The `Content-Length` header value is not a valid integer.
    InvalidContentLength(String),
    /// A chunk size in chunked transfer encoding is not valid hexadecimal.
    InvalidChunkSize(String),
    /// An unexpected byte was encountered during parsing.
    UnexpectedByte {
        /// Human-readable description of what was expected.
        expected: &'static str,
        /// The actual byte value found.
        found: u8,
    },
    /// A header name or value exceeds the configured maximum size.
    HeaderTooLarge,
    /// The request body exceeds the configured maximum size.
    BodyTooLarge,
    /// The number of headers exceeds the configured maximum.
    TooManyHeaders,
    /// The request asks for a protocol upgrade, which is not supported.
    UpgradeNotSupported,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidMethod(m) => write!(f, "invalid HTTP method: '{m}'"),
            Self::InvalidVersion(v) => write!(f, "invalid HTTP version: '{v}'"),
            Self::InvalidUrl(u) => write!(f, "invalid request URL: '{u}'"),
            Self::InvalidContentLength(v) => write!(f, "invalid Content-Length: '{v}'"),
            Self::InvalidChunkSize(s) => write!(f, "invalid chunk size: '{s}'"),
            Self::UnexpectedByte { expected, found } => {
                write!(f, "unexpected byte 0x{found:02X} (expected {expected})")
            }
            Self::HeaderTooLarge => write!(f, "header exceeds maximum allowed size"),
            Self::BodyTooLarge => write!(f, "body exceeds maximum allowed size"),
            Self::TooManyHeaders => write!(f, "number of headers exceeds maximum"),
            Self::UpgradeNotSupported => write!(f, "HTTP upgrade is not supported"),
        }
    }
}

impl std::error::Error for ParseError {}

/// Extend `buf` with `chunk`, reporting allocation failure instead of
/// aborting.
pub(crate) fn try_extend(buf: &mut Vec<u8>, chunk: &[u8]) -> Result<(), Error> {
    buf.try_reserve(chunk.len()).map_err(|_| Error::Allocation)?;
    buf.extend_from_slice(chunk);
    Ok(())
}
