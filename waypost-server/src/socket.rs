//! The listening socket clients connect to

use std::{
    env,
    ffi::OsStr,
    ops::Range,
    os::unix::{
        io::{AsFd, AsRawFd, BorrowedFd, OwnedFd, RawFd},
        net::{UnixListener, UnixStream},
    },
    path::PathBuf,
};

use rustix::fs::{flock, openat, unlinkat, AtFlags, FlockOperation, Mode, OFlags, CWD};

use crate::error::BindError;

/// A bound socket under `$XDG_RUNTIME_DIR`, guarded by a lock file
///
/// The lock file arbitrates the socket name between compositors: the
/// socket itself may be a stale leftover of a crashed process and is
/// reclaimed once the lock is held. Both files are removed on drop.
#[derive(Debug)]
pub struct ListeningSocket {
    listener: UnixListener,
    _lock: OwnedFd,
    socket_path: PathBuf,
    lock_path: PathBuf,
}

impl ListeningSocket {
    /// Bind a socket with the given name, e.g. `wayland-0`
    pub fn bind<S: AsRef<OsStr>>(socket_name: S) -> Result<Self, BindError> {
        let runtime_dir: PathBuf =
            env::var("XDG_RUNTIME_DIR").map_err(|_| BindError::RuntimeDirNotSet)?.into();
        let socket_path = runtime_dir.join(socket_name.as_ref());
        let lock_path = socket_path.with_extension("lock");

        let lock = openat(
            CWD,
            &lock_path,
            OFlags::CREATE | OFlags::CLOEXEC | OFlags::RDWR,
            Mode::RUSR | Mode::WUSR | Mode::RGRP | Mode::WGRP,
        )
        .map_err(|_| BindError::PermissionDenied)?;

        if flock(&lock, FlockOperation::NonBlockingLockExclusive).is_err() {
            return Err(BindError::AlreadyInUse);
        }

        // reclaim a stale socket left over by a dead compositor
        match rustix::fs::statat(CWD, &socket_path, AtFlags::SYMLINK_NOFOLLOW) {
            Err(rustix::io::Errno::NOENT) => {}
            Ok(_) => {
                unlinkat(CWD, &socket_path, AtFlags::empty())
                    .map_err(|_| BindError::AlreadyInUse)?;
            }
            Err(e) => return Err(BindError::Io(e.into())),
        }

        let listener = UnixListener::bind(&socket_path).map_err(BindError::Io)?;
        listener.set_nonblocking(true).map_err(BindError::Io)?;

        log::info!("Listening on {}", socket_path.display());

        Ok(Self { listener, _lock: lock, socket_path, lock_path })
    }

    /// Bind the first free name `basename-N` for N in `range`
    pub fn bind_auto(basename: &str, range: Range<usize>) -> Result<Self, BindError> {
        for i in range {
            match Self::bind(format!("{basename}-{i}")) {
                Ok(socket) => return Ok(socket),
                // only a name collision means "try the next one"
                Err(BindError::AlreadyInUse) => {}
                Err(e) => return Err(e),
            }
        }
        Err(BindError::AlreadyInUse)
    }

    /// Accept a pending connection, or `None` if there is none
    pub fn accept(&self) -> std::io::Result<Option<UnixStream>> {
        match self.listener.accept() {
            Ok((stream, _)) => Ok(Some(stream)),
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// The socket name clients should put in `WAYLAND_DISPLAY`
    pub fn socket_name(&self) -> Option<&OsStr> {
        self.socket_path.file_name()
    }
}

impl AsRawFd for ListeningSocket {
    fn as_raw_fd(&self) -> RawFd {
        self.listener.as_raw_fd()
    }
}

impl AsFd for ListeningSocket {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.listener.as_fd()
    }
}

impl Drop for ListeningSocket {
    fn drop(&mut self) {
        let _ = unlinkat(CWD, &self.socket_path, AtFlags::empty());
        let _ = unlinkat(CWD, &self.lock_path, AtFlags::empty());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bind_accept_and_cleanup() {
        let dir = std::env::temp_dir().join(format!("waypost-sock-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        env::set_var("XDG_RUNTIME_DIR", &dir);

        let socket = ListeningSocket::bind("waypost-test-0").unwrap();
        assert_eq!(socket.socket_name().unwrap(), "waypost-test-0");
        assert!(socket.accept().unwrap().is_none());

        // the name is locked while we hold it
        assert!(matches!(
            ListeningSocket::bind("waypost-test-0"),
            Err(BindError::AlreadyInUse)
        ));

        let path = dir.join("waypost-test-0");
        UnixStream::connect(&path).unwrap();
        assert!(socket.accept().unwrap().is_some());

        drop(socket);
        assert!(!path.exists());
    }
}
