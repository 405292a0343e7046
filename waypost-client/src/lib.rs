//! Client-side conveniences over the protocol backend
//!
//! [`Connection`] bootstraps a session from the environment
//! (`$XDG_RUNTIME_DIR` and `$WAYLAND_DISPLAY`), and implements the
//! blocking round-trip on top of `wl_display.sync`. [`GlobalList`]
//! enumerates the globals the server advertises and binds them by
//! interface.

#![warn(missing_docs, missing_debug_implementations)]

mod conn;
mod globals;

pub use conn::{ConnectError, Connection};
pub use globals::{GlobalDesc, GlobalList};

pub use waypost_backend::client::{Backend, DumbObjectData, ObjectData, ObjectId};
pub use waypost_backend::WaylandError;
