//! Connection bootstrap and the blocking round-trip

use std::os::unix::io::{FromRawFd, OwnedFd, RawFd};
use std::os::unix::net::UnixStream;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rustix::event::{PollFd, PollFlags};

use waypost_backend::client::{Backend, ObjectData, ObjectId};
use waypost_backend::message;
use waypost_backend::protocol::{Argument, Message};
use waypost_backend::{WaylandError, WL_CALLBACK_INTERFACE};

/// An error when trying to establish a connection
#[derive(Debug)]
pub enum ConnectError {
    /// The environment does not describe a compositor to connect to
    /// (`XDG_RUNTIME_DIR` not set)
    NoCompositor,
    /// The `WAYLAND_SOCKET` fd is not a valid socket
    InvalidFd,
    /// An I/O error while connecting
    Io(std::io::Error),
}

impl std::error::Error for ConnectError {
    fn cause(&self) -> Option<&dyn std::error::Error> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl std::fmt::Display for ConnectError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::NoCompositor => {
                f.write_str("The environment does not describe a compositor to connect to.")
            }
            Self::InvalidFd => f.write_str("The WAYLAND_SOCKET fd is not a valid socket."),
            Self::Io(e) => write!(f, "I/O error while connecting: {e}"),
        }
    }
}

impl From<std::io::Error> for ConnectError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

/// A connection to a compositor
///
/// Thin wrapper around the client [`Backend`] adding the environment
/// bootstrap and the synchronous round-trip.
#[derive(Debug, Clone)]
pub struct Connection {
    backend: Backend,
}

impl Connection {
    /// Connect following the environment
    ///
    /// `WAYLAND_SOCKET` (an inherited, already-connected fd) wins over
    /// `$XDG_RUNTIME_DIR/$WAYLAND_DISPLAY`; the display name defaults to
    /// `wayland-0`.
    pub fn connect_to_env() -> Result<Self, ConnectError> {
        if let Ok(var) = std::env::var("WAYLAND_SOCKET") {
            let fd: RawFd = var.parse().map_err(|_| ConnectError::InvalidFd)?;
            // the fd was inherited from the parent; unset so children don't
            // try to use it too
            std::env::remove_var("WAYLAND_SOCKET");
            let stream = unsafe { UnixStream::from(OwnedFd::from_raw_fd(fd)) };
            stream.set_nonblocking(true).map_err(|_| ConnectError::InvalidFd)?;
            return Ok(Self::from_stream(stream));
        }

        let runtime_dir: PathBuf = std::env::var_os("XDG_RUNTIME_DIR")
            .ok_or(ConnectError::NoCompositor)?
            .into();
        let display =
            std::env::var_os("WAYLAND_DISPLAY").unwrap_or_else(|| "wayland-0".into());
        let path = runtime_dir.join(display);

        log::debug!("Connecting to {}", path.display());

        let stream = UnixStream::connect(path)?;
        stream.set_nonblocking(true)?;
        Ok(Self::from_stream(stream))
    }

    /// Wrap an already-connected stream
    pub fn from_stream(stream: UnixStream) -> Self {
        Self { backend: Backend::connect(stream) }
    }

    /// The underlying backend
    pub fn backend(&self) -> &Backend {
        &self.backend
    }

    /// The id of the `wl_display` singleton
    pub fn display(&self) -> ObjectId {
        self.backend.display_id()
    }

    /// Flush pending requests to the server
    pub fn flush(&self) -> Result<(), WaylandError> {
        self.backend.flush()
    }

    /// Flush, wait for the socket to become readable and dispatch
    ///
    /// Returns the number of dispatched events.
    pub fn blocking_dispatch(&self) -> Result<usize, WaylandError> {
        self.flush()?;
        loop {
            match self.backend.dispatch_events() {
                Ok(n) => return Ok(n),
                Err(WaylandError::Io(e)) if e.kind() == std::io::ErrorKind::WouldBlock => {
                    let fd = self.backend.poll_fd();
                    let mut fds = [PollFd::new(&fd, PollFlags::IN)];
                    rustix::event::poll(&mut fds, None).map_err(std::io::Error::from)?;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Block until every previous request has been processed by the server
    ///
    /// Issues `wl_display.sync` and dispatches until the `done` event
    /// arrives; its serial is returned. Events received in the meantime
    /// are delivered normally. Cancellation is safe: if the connection
    /// dies mid-wait, the callback is torn down with the object map and a
    /// late `done` has nowhere to land.
    pub fn roundtrip(&self) -> Result<u32, WaylandError> {
        let done = Arc::new(SyncData::default());
        self.backend
            .send_request(
                message!(self.display(), 0, [Argument::NewId(Backend::null_id())]),
                Some(done.clone()),
                Some((&WL_CALLBACK_INTERFACE, 1)),
            )
            .map_err(|_| {
                self.backend.last_error().unwrap_or_else(|| {
                    WaylandError::Io(std::io::Error::new(
                        std::io::ErrorKind::Other,
                        "sync request failed",
                    ))
                })
            })?;

        while !done.done.load(Ordering::Acquire) {
            self.blocking_dispatch()?;
        }
        Ok(done.serial.load(Ordering::Acquire))
    }
}

/// Object data of the `wl_callback` used by [`Connection::roundtrip`]
#[derive(Debug, Default)]
struct SyncData {
    done: AtomicBool,
    serial: std::sync::atomic::AtomicU32,
}

impl ObjectData for SyncData {
    fn event(
        self: Arc<Self>,
        _backend: &Backend,
        msg: Message<ObjectId, std::os::unix::io::OwnedFd>,
    ) -> Option<Arc<dyn ObjectData>> {
        // wl_callback.done(serial)
        if let [Argument::Uint(serial)] = msg.args[..] {
            self.serial.store(serial, Ordering::Release);
            self.done.store(true, Ordering::Release);
        }
        None
    }

    fn destroyed(&self, _object_id: ObjectId) {}
}
