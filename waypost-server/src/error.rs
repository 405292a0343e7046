//! Error taxonomy of the buffer and input domains

/// Errors of the buffer and shared-memory domain
#[derive(Debug, thiserror::Error)]
pub enum BufferError {
    /// A size was zero, negative or otherwise out of range
    #[error("invalid size: {0}")]
    InvalidSize(i32),
    /// The pixel format is not in the advertised set
    #[error("format {0:#x} is not supported")]
    InvalidFormat(u32),
    /// The stride does not cover a row of pixels, or the buffer window
    /// escapes its pool
    #[error("invalid stride or offset for the buffer dimensions")]
    InvalidStride,
    /// Mapping the pool file descriptor failed
    #[error("mmap failed: {0}")]
    MmapFailed(#[source] std::io::Error),
    /// The buffer is still held by the compositor
    #[error("the buffer is busy")]
    BufferBusy,
    /// A file descriptor argument was absent or a sentinel
    #[error("invalid file descriptor")]
    InvalidFd,
}

/// Errors of the input domain
#[derive(Debug, thiserror::Error)]
pub enum InputError {
    /// A keymap could not be loaded or transferred
    #[error("invalid keymap")]
    InvalidKeymap,
    /// The requested capability is not present on the seat
    #[error("the seat does not have this device")]
    InvalidDevice,
    /// An input grab could not be installed
    #[error("grab denied")]
    GrabDenied,
}

/// Errors raised when binding the listening socket
#[derive(Debug, thiserror::Error)]
pub enum BindError {
    /// The `XDG_RUNTIME_DIR` variable is not set
    #[error("environment variable XDG_RUNTIME_DIR is not set")]
    RuntimeDirNotSet,
    /// The runtime directory is not writable
    #[error("could not write to XDG_RUNTIME_DIR")]
    PermissionDenied,
    /// Another compositor owns the socket name
    #[error("requested socket name is already in use")]
    AlreadyInUse,
    /// Any other I/O failure
    #[error("I/O error: {0}")]
    Io(#[source] std::io::Error),
}
