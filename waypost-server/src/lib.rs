//! Compositor scaffolding over the protocol backend
//!
//! This crate holds everything between the wire and the renderer: surface
//! double-buffered state and roles, the XDG shell machinery, SHM pools and
//! dmabuf import, seat focus and serials, output advertisement, and the
//! scene graph with its hit testing.
//!
//! The entry point is [`state::Compositor`], the state type the backend's
//! dispatch is parameterized over. [`globals::create_globals`] registers
//! the default set of globals; the handlers in [`handlers`] route every
//! client request to the state modules.
//!
//! ```no_run
//! use waypost_backend::server::Backend;
//! use waypost_server::output::Output;
//! use waypost_server::socket::ListeningSocket;
//! use waypost_server::state::Compositor;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut state = Compositor::new();
//! state.add_output(Output::new("HEADLESS-1", 1920, 1080, 60_000));
//!
//! let backend: Backend<Compositor> = Backend::new()?;
//! let _globals = waypost_server::globals::create_globals(&backend.handle(), 1);
//!
//! let socket = ListeningSocket::bind_auto("wayland", 0..32)?;
//! loop {
//!     if let Some(stream) = socket.accept()? {
//!         backend.handle().insert_client(stream, std::sync::Arc::new(()))?;
//!     }
//!     backend.dispatch_all_clients(&mut state)?;
//!     backend.flush(None)?;
//!     # break Ok(());
//! }
//! # }
//! ```

#![warn(missing_docs, missing_debug_implementations)]

pub mod buffer;
pub mod dmabuf;
pub mod error;
pub mod geometry;
pub mod gestures;
pub mod globals;
pub mod handlers;
pub mod output;
pub mod region;
pub mod renderer;
pub mod scene;
pub mod seat;
pub mod shm;
pub mod socket;
pub mod state;
pub mod surface;
pub mod xdg;
