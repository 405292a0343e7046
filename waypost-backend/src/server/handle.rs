//! Server state and the handle given to request handlers

use std::{
    ffi::CString,
    os::unix::{
        io::{OwnedFd, RawFd},
        net::UnixStream,
    },
    sync::{Arc, Mutex, Weak},
};

use rustix::event::epoll;

use crate::{
    protocol::{Interface, Message, ObjectInfo, ANONYMOUS_INTERFACE},
    types::{Credentials, DisconnectReason, InvalidId},
};

use super::{
    client::ClientStore, registry::Registry, ClientData, ClientId, GlobalHandler, GlobalId,
    GlobalInfo, ObjectData, ObjectId,
};

pub(crate) type PendingDestructor<D> = (Arc<dyn ObjectData<D>>, ClientId, ObjectId);

#[derive(Debug)]
pub(crate) struct State<D: 'static> {
    pub(crate) clients: ClientStore<D>,
    pub(crate) registry: Registry<D>,
    pub(crate) pending_destructors: Vec<PendingDestructor<D>>,
    pub(crate) poll_fd: OwnedFd,
}

impl<D> State<D> {
    pub(crate) fn new(poll_fd: OwnedFd) -> Self {
        let debug = crate::debug::has_debug_server_env();
        Self {
            clients: ClientStore::new(debug),
            registry: Registry::new(),
            pending_destructors: Vec::new(),
            poll_fd,
        }
    }

    pub(crate) fn flush(&mut self, client: Option<ClientId>) -> std::io::Result<()> {
        if let Some(client_id) = client {
            match self.clients.get_client_mut(client_id) {
                Ok(client) => client.flush(),
                Err(InvalidId) => Ok(()),
            }
        } else {
            for client in self.clients.clients_mut() {
                let _ = client.flush();
            }
            Ok(())
        }
    }

    /// Reap killed clients, queueing their object destructors
    ///
    /// The returned destructors must be invoked after the state lock has
    /// been released, as they run arbitrary user code.
    pub(crate) fn cleanup(&mut self) -> Vec<PendingDestructor<D>> {
        let dead_clients = self.clients.cleanup(&mut self.pending_destructors);
        self.registry.cleanup(&dead_clients);
        std::mem::take(&mut self.pending_destructors)
    }
}

/// A handle to the server state, given to every handler invocation
///
/// All protocol-level operations go through this type: creating objects,
/// sending events, posting errors and managing globals. Cloning is
/// shallow.
#[derive(Debug)]
pub struct Handle<D: 'static> {
    pub(crate) state: Arc<Mutex<State<D>>>,
}

// not derived: cloning must not require `D: Clone`
impl<D> Clone for Handle<D> {
    fn clone(&self) -> Self {
        Self { state: self.state.clone() }
    }
}

/// A weak reference to a [`Handle`]
#[derive(Debug)]
pub struct WeakHandle<D: 'static> {
    state: Weak<Mutex<State<D>>>,
}

impl<D> Clone for WeakHandle<D> {
    fn clone(&self) -> Self {
        Self { state: self.state.clone() }
    }
}

impl<D> WeakHandle<D> {
    /// Try to upgrade to a full handle
    pub fn upgrade(&self) -> Option<Handle<D>> {
        Weak::upgrade(&self.state).map(|state| Handle { state })
    }
}

impl<D> Handle<D> {
    /// Get a weak reference to this handle
    pub fn downgrade(&self) -> WeakHandle<D> {
        WeakHandle { state: Arc::downgrade(&self.state) }
    }

    /// Returns information about some object.
    pub fn object_info(&self, id: ObjectId) -> Result<ObjectInfo, InvalidId> {
        self.state
            .lock()
            .unwrap()
            .clients
            .get_client(id.client_id.clone())?
            .object_info(id)
    }

    /// Initializes a connection with a client.
    ///
    /// The `data` must be a valid implementation of [`ClientData`].
    pub fn insert_client(
        &self,
        stream: UnixStream,
        data: Arc<dyn ClientData>,
    ) -> std::io::Result<ClientId> {
        let mut state = self.state.lock().unwrap();
        let id = state.clients.create_client(stream, data);
        let client = state.clients.get_client(id.clone()).unwrap();
        epoll::add(
            &state.poll_fd,
            client,
            epoll::EventData::new_u64(id.as_u64()),
            epoll::EventFlags::IN,
        )?;
        Ok(id)
    }

    /// Returns the id of the client which owns the object.
    pub fn get_client(&self, id: ObjectId) -> Result<ClientId, InvalidId> {
        if !id.is_null() {
            Ok(id.client_id)
        } else {
            Err(InvalidId)
        }
    }

    /// Returns the data associated with a client.
    pub fn get_client_data(&self, id: ClientId) -> Result<Arc<dyn ClientData>, InvalidId> {
        Ok(self.state.lock().unwrap().clients.get_client(id)?.data.clone())
    }

    /// Retrieve the [`Credentials`] of a client
    pub fn get_client_credentials(&self, id: ClientId) -> Result<Credentials, InvalidId> {
        Ok(self.state.lock().unwrap().clients.get_client(id)?.get_credentials())
    }

    /// Invokes a closure for all clients connected to this server
    pub fn with_all_clients(&self, mut f: impl FnMut(ClientId)) {
        for client in self.state.lock().unwrap().clients.all_clients_id() {
            f(client)
        }
    }

    /// Invokes a closure for all objects owned by a client
    pub fn with_all_objects_for(
        &self,
        client_id: ClientId,
        mut f: impl FnMut(ObjectId),
    ) -> Result<(), InvalidId> {
        let state = self.state.lock().unwrap();
        let client = state.clients.get_client(client_id)?;
        for object in client.all_objects() {
            f(object)
        }
        Ok(())
    }

    /// Retrieve the `ObjectId` for a protocol-level numeric id
    pub fn object_for_protocol_id(
        &self,
        client_id: ClientId,
        interface: &'static Interface,
        protocol_id: u32,
    ) -> Result<ObjectId, InvalidId> {
        let state = self.state.lock().unwrap();
        let client = state.clients.get_client(client_id)?;
        let id = client.object_for_protocol_id(protocol_id)?;
        if crate::protocol::same_interface(id.interface, interface) {
            Ok(id)
        } else {
            Err(InvalidId)
        }
    }

    /// Create a new object for given client
    ///
    /// The id is allocated from the server range; the client learns about
    /// the object through whichever event carries it.
    pub fn create_object(
        &self,
        client_id: ClientId,
        interface: &'static Interface,
        version: u32,
        data: Arc<dyn ObjectData<D>>,
    ) -> Result<ObjectId, InvalidId> {
        self.state
            .lock()
            .unwrap()
            .clients
            .get_client_mut(client_id)?
            .create_object(interface, version, data)
    }

    /// Returns an object id that represents the null object.
    pub fn null_id() -> ObjectId {
        ObjectId {
            id: 0,
            serial: 0,
            client_id: ClientId { id: 0, serial: 0 },
            interface: &ANONYMOUS_INTERFACE,
        }
    }

    /// Send an event to the client
    ///
    /// Returns an error if the sender id of the message is no longer valid.
    ///
    /// # Panics
    ///
    /// Panics if the message does not match the event signature declared by
    /// the sender's interface.
    pub fn send_event(&self, msg: Message<ObjectId, RawFd>) -> Result<(), InvalidId> {
        let mut state = self.state.lock().unwrap();
        let State { ref mut clients, ref mut pending_destructors, .. } = *state;
        clients
            .get_client_mut(msg.sender_id.client_id.clone())?
            .send_event(msg, Some(pending_destructors))
    }

    /// Returns the data associated with an object.
    pub fn get_object_data(&self, id: ObjectId) -> Result<Arc<dyn ObjectData<D>>, InvalidId> {
        self.state
            .lock()
            .unwrap()
            .clients
            .get_client(id.client_id.clone())?
            .get_object_data(id)
    }

    /// Sets the data associated with an object.
    pub fn set_object_data(
        &self,
        id: ObjectId,
        data: Arc<dyn ObjectData<D>>,
    ) -> Result<(), InvalidId> {
        self.state
            .lock()
            .unwrap()
            .clients
            .get_client_mut(id.client_id.clone())?
            .set_object_data(id, data)
    }

    /// Posts a protocol error on an object
    ///
    /// This terminates the connection of the client which owns the object.
    pub fn post_error(&self, object_id: ObjectId, error_code: u32, message: CString) {
        if let Ok(client) = self
            .state
            .lock()
            .unwrap()
            .clients
            .get_client_mut(object_id.client_id.clone())
        {
            client.post_error(object_id, error_code, message)
        }
    }

    /// Kills the connection to a client
    ///
    /// The disconnection reason is given to the client's [`ClientData`].
    pub fn kill_client(&self, client_id: ClientId, reason: DisconnectReason) {
        if let Ok(client) = self.state.lock().unwrap().clients.get_client_mut(client_id) {
            client.kill(reason)
        }
    }

    /// Creates a global of the specified interface and version, and then
    /// advertises it to clients.
    ///
    /// The clients which the global is advertised to is determined by the
    /// implementation of the [`GlobalHandler`].
    pub fn create_global(
        &self,
        interface: &'static Interface,
        version: u32,
        handler: Arc<dyn GlobalHandler<D>>,
    ) -> GlobalId {
        let mut state = self.state.lock().unwrap();
        let State { ref mut clients, ref mut registry, .. } = *state;
        registry.create_global(interface, version, handler, clients)
    }

    /// Mark the global as disabled: stop advertising it and send
    /// `global_remove` to every registry.
    ///
    /// Clients already bound to it keep their binds alive.
    pub fn disable_global(&self, id: GlobalId) {
        let mut state = self.state.lock().unwrap();
        let State { ref mut clients, ref mut registry, .. } = *state;
        registry.disable_global(id, clients)
    }

    /// Removes a global entirely, freeing its name for reuse.
    pub fn remove_global(&self, id: GlobalId) {
        let mut state = self.state.lock().unwrap();
        let State { ref mut clients, ref mut registry, .. } = *state;
        registry.remove_global(id, clients)
    }

    /// Returns information about a global.
    pub fn global_info(&self, id: GlobalId) -> Result<GlobalInfo, InvalidId> {
        self.state.lock().unwrap().registry.get_info(id)
    }

    /// Returns the handler which manages the visibility and notifies when a
    /// client has bound the global.
    pub fn get_global_handler(&self, id: GlobalId) -> Result<Arc<dyn GlobalHandler<D>>, InvalidId> {
        self.state.lock().unwrap().registry.get_handler(id)
    }

    /// Flush outgoing buffers to one client, or to all if `client` is `None`.
    pub fn flush(&self, client: Option<ClientId>) -> std::io::Result<()> {
        self.state.lock().unwrap().flush(client)
    }
}
