//! Error and lifecycle types shared by the client and server backends

use crate::protocol::ProtocolError;

/// An error that can occur when using a protocol connection
#[derive(Debug)]
pub enum WaylandError {
    /// The connection encountered an IO error
    Io(std::io::Error),
    /// The connection encountered a protocol error
    Protocol(ProtocolError),
}

impl std::error::Error for WaylandError {
    fn cause(&self) -> Option<&dyn std::error::Error> {
        match self {
            Self::Io(e) => Some(e),
            Self::Protocol(e) => Some(e),
        }
    }
}

impl std::fmt::Display for WaylandError {
    fn fmt(&self, f: &mut ::std::fmt::Formatter) -> Result<(), ::std::fmt::Error> {
        match self {
            Self::Io(e) => write!(f, "Io error: {e}"),
            Self::Protocol(e) => std::fmt::Display::fmt(e, f),
        }
    }
}

impl Clone for WaylandError {
    fn clone(&self) -> Self {
        match self {
            Self::Protocol(e) => Self::Protocol(e.clone()),
            Self::Io(e) => {
                if let Some(code) = e.raw_os_error() {
                    Self::Io(std::io::Error::from_raw_os_error(code))
                } else {
                    Self::Io(std::io::Error::new(e.kind(), ""))
                }
            }
        }
    }
}

impl From<ProtocolError> for WaylandError {
    fn from(err: ProtocolError) -> Self {
        Self::Protocol(err)
    }
}

impl From<std::io::Error> for WaylandError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

/// An error generated when trying to act on an invalid `ObjectId`.
#[derive(Clone, Debug)]
pub struct InvalidId;

impl std::error::Error for InvalidId {}

impl std::fmt::Display for InvalidId {
    fn fmt(&self, f: &mut ::std::fmt::Formatter) -> Result<(), ::std::fmt::Error> {
        write!(f, "Invalid ObjectId")
    }
}

/// An error type representing the failure to initialize a backend
#[derive(Debug)]
pub enum InitError {
    /// Initialization failed due to an underlying I/O error
    Io(std::io::Error),
}

impl std::error::Error for InitError {
    fn cause(&self) -> Option<&dyn std::error::Error> {
        match self {
            Self::Io(ref err) => Some(err),
        }
    }
}

impl std::fmt::Display for InitError {
    fn fmt(&self, f: &mut ::std::fmt::Formatter) -> Result<(), ::std::fmt::Error> {
        match self {
            Self::Io(ref err) => std::fmt::Display::fmt(err, f),
        }
    }
}

/// Describes why a client has been disconnected from the server.
#[derive(Debug)]
pub enum DisconnectReason {
    /// The connection has been closed by the server or client.
    ConnectionClosed,
    /// The server has sent the client a protocol error, terminating the connection.
    ProtocolError(ProtocolError),
}

/// Holder of the client credentials
#[derive(Debug, Clone, Copy)]
pub struct Credentials {
    /// pid of the client
    pub pid: i32,
    /// uid of the client
    pub uid: u32,
    /// gid of the client
    pub gid: u32,
}

/// What a caller should do about an error
///
/// Most protocol failures are fatal to the affected connection; a few I/O
/// conditions are transient and worth retrying or reconnecting over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryStrategy {
    /// Retry the operation (possibly after waiting for readiness)
    Retry,
    /// Tear the session down and establish a new connection
    Reconnect,
    /// Give up on the affected connection
    Fatal,
}

/// Map an I/O error kind onto the recovery strategy for it.
pub fn recovery_strategy(err: &std::io::Error) -> RecoveryStrategy {
    use std::io::ErrorKind;
    match err.kind() {
        ErrorKind::WouldBlock | ErrorKind::TimedOut | ErrorKind::Interrupted => {
            RecoveryStrategy::Retry
        }
        ErrorKind::BrokenPipe | ErrorKind::ConnectionReset => RecoveryStrategy::Reconnect,
        _ => RecoveryStrategy::Fatal,
    }
}

impl WaylandError {
    /// The recovery strategy for this error
    ///
    /// Protocol errors are always fatal.
    pub fn recovery_strategy(&self) -> RecoveryStrategy {
        match self {
            Self::Io(e) => recovery_strategy(e),
            Self::Protocol(_) => RecoveryStrategy::Fatal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Error, ErrorKind};

    #[test]
    fn strategy_table() {
        assert_eq!(
            recovery_strategy(&Error::from(ErrorKind::WouldBlock)),
            RecoveryStrategy::Retry
        );
        assert_eq!(recovery_strategy(&Error::from(ErrorKind::TimedOut)), RecoveryStrategy::Retry);
        assert_eq!(
            recovery_strategy(&Error::from(ErrorKind::BrokenPipe)),
            RecoveryStrategy::Reconnect
        );
        assert_eq!(
            recovery_strategy(&Error::from(ErrorKind::ConnectionReset)),
            RecoveryStrategy::Reconnect
        );
        assert_eq!(
            recovery_strategy(&Error::from(ErrorKind::PermissionDenied)),
            RecoveryStrategy::Fatal
        );
    }
}
