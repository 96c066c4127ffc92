use std::{
    error::Error,
    fmt::Display,
    io::{self},
    num::ParseIntError,
    str::Utf8Error,
};

/// Errors that may occur when reading a message from a stream.
#[derive(Debug)]
pub enum ReadError {
    IoError(io::Error),
    /// The command token is not one of `getinfo`, `settck` or `shift`,
    /// or no `:` delimiter arrived within the longest token length.
    InvalidCommand(String),
    UnsupportedVersion(String),
    InvalidFormat(String),
    /// A shift vector is larger than the receiver accepts.
    TooManyBytes { max: usize, got: usize },
    /// The stream ended in the middle of a message.
    Truncated { buffered: usize },
}

impl ReadError {
    /// Whether this error means the peer went away rather than misbehaved.
    pub fn is_disconnect(&self) -> bool {
        match self {
            ReadError::IoError(err) => matches!(
                err.kind(),
                io::ErrorKind::UnexpectedEof
                    | io::ErrorKind::ConnectionAborted
                    | io::ErrorKind::ConnectionReset
                    | io::ErrorKind::BrokenPipe
            ),
            ReadError::Truncated { .. } => true,
            _ => false,
        }
    }
}

impl From<io::Error> for ReadError {
    fn from(value: io::Error) -> Self {
        ReadError::IoError(value)
    }
}

impl From<Utf8Error> for ReadError {
    fn from(value: Utf8Error) -> Self {
        ReadError::InvalidFormat(format!("Invalid UTF8: {}", value))
    }
}

impl From<ParseIntError> for ReadError {
    fn from(value: ParseIntError) -> Self {
        ReadError::InvalidFormat(format!("Invalid integer: {}", value))
    }
}

impl Display for ReadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReadError::IoError(error) => write!(f, "{}", error),
            ReadError::InvalidCommand(cmd) => write!(f, "Received invalid command {:?}", cmd),
            ReadError::UnsupportedVersion(version) => write!(f, "Unsupported version {}", version),
            ReadError::InvalidFormat(format) => write!(f, "{}", format),
            ReadError::TooManyBytes { max, got } => {
                write!(f, "Message too large! Maximum is {}, but got {}", max, got)
            }
            ReadError::Truncated { buffered } => {
                write!(f, "Stream ended with {} bytes of an incomplete message", buffered)
            }
        }
    }
}

impl Error for ReadError {}

#[test]
fn disconnect_classification() {
    let eof = ReadError::from(io::Error::from(io::ErrorKind::UnexpectedEof));
    assert!(eof.is_disconnect());
    assert!(ReadError::Truncated { buffered: 3 }.is_disconnect());
    assert!(!ReadError::InvalidCommand("foo".to_string()).is_disconnect());
}
