use std::fmt;
use std::io;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug)]
pub enum Error {
    /// Malformed framing, bad header, truncated input or a non-compound document.
    Format(String),
    /// A tag tree that cannot be written as-is, e.g. a list with mixed element kinds.
    Schema(String),
    /// Leading bytes that match no known compression envelope, or an unknown kind id.
    UnknownCompression(Vec<u8>),
    Allocation(String),
    InvalidCoordinate { x: u8, z: u8 },
    Io(io::Error),
}

impl Error {
    pub fn format(message: impl Into<String>) -> Self {
        Self::Format(message.into())
    }

    pub fn schema(message: impl Into<String>) -> Self {
        Self::Schema(message.into())
    }

    pub fn allocation(message: impl Into<String>) -> Self {
        Self::Allocation(message.into())
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Format(message) => write!(f, "format error: {message}"),
            Self::Schema(message) => write!(f, "schema error: {message}"),
            Self::UnknownCompression(magic) => {
                write!(f, "unknown compression, leading bytes {magic:02x?}")
            }
            Self::Allocation(message) => write!(f, "allocation error: {message}"),
            Self::InvalidCoordinate { x, z } => {
                write!(f, "cell coordinate ({x}, {z}) outside the 32x32 grid")
            }
            Self::Io(err) => write!(f, "io error: {err}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        // Running out of bytes mid-structure is a framing problem, not a device failure.
        if err.kind() == io::ErrorKind::UnexpectedEof {
            Self::Format(format!("unexpected end of input: {err}"))
        } else {
            Self::Io(err)
        }
    }
}
