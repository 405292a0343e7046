//! Server-side backend
//!
//! The server backend tracks any number of client connections, each with
//! its own object map and buffered socket. Incoming requests are decoded
//! against the static interface descriptors and routed to the
//! [`ObjectData`] handler installed on the target object; globals are
//! advertised and bound through [`GlobalHandler`]s.
//!
//! The backend is generic over `D`, the compositor-wide state type handed
//! to every handler invocation.

use std::os::unix::io::OwnedFd;
use std::{fmt, sync::Arc};

use crate::protocol::{same_interface, Interface, Message};

mod backend;
mod client;
mod handle;
mod registry;

pub use backend::Backend;
pub use handle::{Handle, WeakHandle};

pub use crate::types::{Credentials, DisconnectReason, InitError, InvalidId};

/// An ID representing a protocol object from the server's point of view
///
/// Ids are serial-tagged: a protocol id reused after destruction compares
/// unequal to the id of the dead object it replaces. An id also records
/// which client connection it belongs to.
#[derive(Clone)]
pub struct ObjectId {
    pub(crate) id: u32,
    pub(crate) serial: u32,
    pub(crate) client_id: ClientId,
    pub(crate) interface: &'static Interface,
}

impl ObjectId {
    /// Whether this is the null reference
    pub fn is_null(&self) -> bool {
        self.id == 0
    }

    /// The interface of this object
    pub fn interface(&self) -> &'static Interface {
        self.interface
    }

    /// Whether this object belongs to the same client connection as `other`
    pub fn same_client_as(&self, other: &Self) -> bool {
        self.client_id == other.client_id
    }

    /// The protocol-level numeric id
    pub fn protocol_id(&self) -> u32 {
        self.id
    }

    /// The client connection this object belongs to
    pub fn client_id(&self) -> ClientId {
        self.client_id.clone()
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}[{}]", self.interface.name, self.id, self.client_id.id)
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId({}, {})", self, self.serial)
    }
}

impl PartialEq for ObjectId {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.serial == other.serial
            && self.client_id == other.client_id
            && same_interface(self.interface, other.interface)
    }
}

impl std::cmp::Eq for ObjectId {}

impl std::hash::Hash for ObjectId {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
        self.serial.hash(state);
        self.client_id.hash(state);
    }
}

/// An id of a client connected to the server.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ClientId {
    pub(crate) id: u32,
    pub(crate) serial: u32,
}

impl ClientId {
    pub(crate) fn as_u64(&self) -> u64 {
        ((self.id as u64) << 32) + self.serial as u64
    }

    pub(crate) fn from_u64(t: u64) -> Self {
        Self { id: (t >> 32) as u32, serial: t as u32 }
    }
}

/// The ID of a global
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct GlobalId {
    pub(crate) id: u32,
    pub(crate) serial: u32,
}

#[derive(Debug)]
pub(crate) struct Data<D: 'static> {
    pub(crate) user_data: Arc<dyn ObjectData<D>>,
    pub(crate) serial: u32,
}

impl<D> Clone for Data<D> {
    fn clone(&self) -> Self {
        Self { user_data: self.user_data.clone(), serial: self.serial }
    }
}

/// A trait representing your data associated to an object
///
/// You will only be given access to it as a `&` reference, so you need to
/// handle interior mutability by yourself.
pub trait ObjectData<D>: downcast_rs::DowncastSync {
    /// Dispatch a request for the associated object
    ///
    /// If the request has a `NewId` argument, the callback must return the
    /// object data for the newly created object
    fn request(
        self: Arc<Self>,
        handle: &Handle<D>,
        data: &mut D,
        client_id: ClientId,
        msg: Message<ObjectId, OwnedFd>,
    ) -> Option<Arc<dyn ObjectData<D>>>;

    /// Notification that the object has been destroyed and is no longer active
    fn destroyed(
        self: Arc<Self>,
        handle: &Handle<D>,
        data: &mut D,
        client_id: ClientId,
        object_id: ObjectId,
    );

    /// Helper for forwarding a Debug implementation of your `ObjectData` type
    fn debug(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectData").finish_non_exhaustive()
    }
}

downcast_rs::impl_downcast!(sync ObjectData<D>);

impl<D: 'static> std::fmt::Debug for dyn ObjectData<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.debug(f)
    }
}

/// A trait representing the handling of new bound globals
pub trait GlobalHandler<D>: downcast_rs::DowncastSync {
    /// Check if given client is allowed to interact with given global
    ///
    /// If this function returns false, the client will not be notified of
    /// the existence of this global, and any attempt to bind it will result
    /// in a protocol error as if the global did not exist.
    fn can_view(
        &self,
        _client_id: ClientId,
        _client_data: &Arc<dyn ClientData>,
        _global_id: GlobalId,
    ) -> bool {
        true
    }

    /// A client bound this global, creating `object_id`
    ///
    /// The method must return the object data for the newly created object.
    fn bind(
        self: Arc<Self>,
        handle: &Handle<D>,
        data: &mut D,
        client_id: ClientId,
        global_id: GlobalId,
        object_id: ObjectId,
    ) -> Arc<dyn ObjectData<D>>;

    /// Helper for forwarding a Debug implementation of your `GlobalHandler` type
    fn debug(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GlobalHandler").finish_non_exhaustive()
    }
}

downcast_rs::impl_downcast!(sync GlobalHandler<D>);

impl<D: 'static> std::fmt::Debug for dyn GlobalHandler<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.debug(f)
    }
}

/// A trait representing your data associated to a client
pub trait ClientData: downcast_rs::DowncastSync {
    /// Notification that the client was initialized
    fn initialized(&self, _client_id: ClientId) {}
    /// Notification that the client is disconnected
    fn disconnected(&self, _client_id: ClientId, _reason: DisconnectReason) {}
    /// Helper for forwarding a Debug implementation of your `ClientData` type
    fn debug(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientData").finish_non_exhaustive()
    }
}

downcast_rs::impl_downcast!(sync ClientData);

impl std::fmt::Debug for dyn ClientData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.debug(f)
    }
}

impl ClientData for () {}

pub(crate) struct UninitObjectData;

impl<D> ObjectData<D> for UninitObjectData {
    fn request(
        self: Arc<Self>,
        _: &Handle<D>,
        _: &mut D,
        _: ClientId,
        msg: Message<ObjectId, OwnedFd>,
    ) -> Option<Arc<dyn ObjectData<D>>> {
        panic!("Received a message on an uninitialized object: {msg:?}");
    }

    fn destroyed(self: Arc<Self>, _: &Handle<D>, _: &mut D, _: ClientId, _: ObjectId) {}

    fn debug(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UninitObjectData").finish()
    }
}

/// An object data that ignores all messages
///
/// Used for objects whose messages are handled internally by the backend
/// (`wl_display`, `wl_registry`, `wl_callback`).
#[derive(Debug)]
pub struct DumbObjectData;

impl<D> ObjectData<D> for DumbObjectData {
    fn request(
        self: Arc<Self>,
        _: &Handle<D>,
        _: &mut D,
        _: ClientId,
        _msg: Message<ObjectId, OwnedFd>,
    ) -> Option<Arc<dyn ObjectData<D>>> {
        unreachable!()
    }

    fn destroyed(self: Arc<Self>, _: &Handle<D>, _: &mut D, _: ClientId, _: ObjectId) {}
}

/// Information about a global as advertised to clients
#[derive(Debug)]
pub struct GlobalInfo {
    /// The interface of the global.
    pub interface: &'static Interface,
    /// The version of the global that is advertised to clients.
    pub version: u32,
    /// Whether the global is currently disabled.
    pub disabled: bool,
}
