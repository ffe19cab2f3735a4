//! Unified error type for the gateway engine.
//!
//! Every fallible operation in this crate funnels into a single `Error`
//! enum so the top-level step loop's error handling stays uniform, the
//! same way the rest of this engine's subsystems never hand back a boxed
//! `dyn Error`.

use core::fmt;

/// Crate-wide error, one discriminant per failure kind in the wire/cloud
/// contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    InvalidArgument(String),
    NotConnected,
    AlreadyExists,
    NotPermitted,
    BufferTooSmall,
    MessageTooLong,
    /// CRC mismatch or malformed JSON body.
    BadMessage(String),
    /// SOF/version mismatch, or an unsupported URL scheme.
    ProtocolError(String),
    ConnectionRefused,
    HostUnreachable,
    TimedOut,
    /// Transient: claim status is not yet `claimed`/`active`.
    Retry,
    NoData,
    NotSupported,
    Io(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidArgument(msg) => write!(f, "invalid argument: {msg}"),
            Self::NotConnected => write!(f, "not connected"),
            Self::AlreadyExists => write!(f, "already exists"),
            Self::NotPermitted => write!(f, "not permitted"),
            Self::BufferTooSmall => write!(f, "buffer too small"),
            Self::MessageTooLong => write!(f, "message too long"),
            Self::BadMessage(msg) => write!(f, "bad message: {msg}"),
            Self::ProtocolError(msg) => write!(f, "protocol error: {msg}"),
            Self::ConnectionRefused => write!(f, "connection refused"),
            Self::HostUnreachable => write!(f, "host unreachable"),
            Self::TimedOut => write!(f, "timed out"),
            Self::Retry => write!(f, "retry"),
            Self::NoData => write!(f, "no data"),
            Self::NotSupported => write!(f, "not supported"),
            Self::Io(msg) => write!(f, "io: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

impl Error {
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    pub fn bad_message(msg: impl Into<String>) -> Self {
        Self::BadMessage(msg.into())
    }

    pub fn protocol(msg: impl Into<String>) -> Self {
        Self::ProtocolError(msg.into())
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        use std::io::ErrorKind;
        match e.kind() {
            ErrorKind::NotConnected | ErrorKind::BrokenPipe => Self::NotConnected,
            ErrorKind::TimedOut => Self::TimedOut,
            ErrorKind::ConnectionRefused => Self::ConnectionRefused,
            ErrorKind::WouldBlock => Self::Retry,
            _ => Self::Io(e.to_string()),
        }
    }
}

/// Crate-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
