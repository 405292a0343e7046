//! Low-level implementation of the Wayland wire protocol
//!
//! This crate provides the plumbing shared by every layer above it: the
//! wire codec, the buffered Unix socket with ancillary file-descriptor
//! passing, the per-connection object store, and the client-side and
//! server-side dispatch engines.
//!
//! Protocol state for a connection is owned by exactly one task; the
//! internal locks only exist so that handlers can call back into the
//! backend while a dispatch is in progress.

#![warn(missing_docs, missing_debug_implementations)]

pub extern crate smallvec;

/// Helper macro for quickly making a [`Message`](crate::protocol::Message)
#[macro_export]
macro_rules! message {
    ($sender_id: expr, $opcode: expr, [$($args: expr),* $(,)?] $(,)?) => {
        $crate::protocol::Message {
            sender_id: $sender_id,
            opcode: $opcode,
            args: $crate::smallvec::smallvec![$($args),*],
        }
    }
}

pub mod client;
mod core_interfaces;
pub mod debug;
pub mod map;
pub mod protocol;
pub mod server;
pub mod socket;
mod types;
pub mod wire;

pub use core_interfaces::{WL_CALLBACK_INTERFACE, WL_DISPLAY_INTERFACE, WL_REGISTRY_INTERFACE};
pub use types::{
    recovery_strategy, Credentials, DisconnectReason, InitError, InvalidId, RecoveryStrategy,
    WaylandError,
};
