//! The epoll-driven server dispatch loop

use std::{
    os::unix::io::{AsFd, AsRawFd, BorrowedFd},
    sync::{Arc, Mutex},
};

use rustix::event::epoll;
use rustix::event::Timespec;

use crate::{
    core_interfaces::{WL_DISPLAY_INTERFACE, WL_REGISTRY_INTERFACE},
    map::Object,
    protocol::{same_interface, Argument, Message},
    types::InitError,
};

use smallvec::SmallVec;

use super::{handle::State, ClientId, Data, GlobalHandler, GlobalId, Handle, ObjectId};

/// A server backend
///
/// Tracks the state of all client connections and drives their dispatching.
/// Clients are registered on an internal epoll instance; callers poll
/// [`Backend::poll_fd`] for readiness and then invoke
/// [`Backend::dispatch_all_clients`].
#[derive(Debug)]
pub struct Backend<D: 'static> {
    state: Arc<Mutex<State<D>>>,
}

impl<D> Backend<D> {
    /// Initialize a new server backend
    pub fn new() -> Result<Self, InitError> {
        let poll_fd = epoll::create(epoll::CreateFlags::CLOEXEC)
            .map_err(Into::into)
            .map_err(InitError::Io)?;

        Ok(Self { state: Arc::new(Mutex::new(State::new(poll_fd))) })
    }

    /// Flush the outgoing buffers, of one client or of all
    pub fn flush(&self, client: Option<ClientId>) -> std::io::Result<()> {
        self.state.lock().unwrap().flush(client)
    }

    /// Get a [`Handle`] to the server state
    pub fn handle(&self) -> Handle<D> {
        Handle { state: self.state.clone() }
    }

    /// The FD to poll for client activity
    pub fn poll_fd(&self) -> BorrowedFd<'_> {
        let raw_fd = self.state.lock().unwrap().poll_fd.as_raw_fd();
        // ties the BorrowedFd lifetime to &self rather than the lock guard
        unsafe { BorrowedFd::borrow_raw(raw_fd) }
    }

    /// Dispatch the pending requests of a single client
    pub fn dispatch_client(&self, data: &mut D, client_id: ClientId) -> std::io::Result<usize> {
        let ret = self.dispatch_events_for(data, client_id);
        self.run_cleanup(data);
        ret
    }

    /// Dispatch the pending requests of all ready clients
    pub fn dispatch_all_clients(&self, data: &mut D) -> std::io::Result<usize> {
        let poll_fd = self.poll_fd();
        let mut dispatched = 0;
        let mut events = Vec::<epoll::Event>::with_capacity(32);
        loop {
            let buffer = rustix::buffer::spare_capacity(&mut events);
            epoll::wait(poll_fd.as_fd(), buffer, Some(&Timespec::default()))?;

            if events.is_empty() {
                break;
            }

            for event in events.drain(..) {
                let id = ClientId::from_u64(event.data.u64());
                if let Ok(count) = self.dispatch_events_for(data, id) {
                    dispatched += count;
                }
            }
            self.run_cleanup(data);
        }

        Ok(dispatched)
    }

    // invoke the destructors of reaped objects outside the state lock
    fn run_cleanup(&self, data: &mut D) {
        let pending = self.state.lock().unwrap().cleanup();
        let handle = self.handle();
        for (object_data, client_id, object_id) in pending {
            object_data.destroyed(&handle, data, client_id, object_id);
        }
    }

    fn dispatch_events_for(&self, data: &mut D, client_id: ClientId) -> std::io::Result<usize> {
        let mut dispatched = 0;
        let handle = self.handle();
        let mut state = self.state.lock().unwrap();
        loop {
            let action = {
                let state = &mut *state;
                if let Ok(client) = state.clients.get_client_mut(client_id.clone()) {
                    let (message, object) = match client.next_request() {
                        Ok(v) => v,
                        Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                            if dispatched > 0 {
                                break;
                            } else {
                                return Err(e);
                            }
                        }
                        Err(e) => {
                            let _ = epoll::delete(&state.poll_fd, client);
                            return Err(e);
                        }
                    };
                    dispatched += 1;
                    if same_interface(object.interface, &WL_DISPLAY_INTERFACE) {
                        client.handle_display_request(message, &mut state.registry);
                        continue;
                    } else if same_interface(object.interface, &WL_REGISTRY_INTERFACE) {
                        if let Some((client, global, object, handler)) =
                            client.handle_registry_request(message, &mut state.registry)
                        {
                            DispatchAction::Bind { client, global, object, handler }
                        } else {
                            continue;
                        }
                    } else {
                        let object_id = ObjectId {
                            id: message.sender_id,
                            serial: object.data.serial,
                            interface: object.interface,
                            client_id: client.id.clone(),
                        };
                        let opcode = message.opcode;
                        let (arguments, is_destructor, created_id) =
                            match client.process_request(&object, message) {
                                Some(args) => args,
                                None => continue,
                            };
                        // Hand the whole set out so the callback runs while
                        // the client is not borrowed
                        DispatchAction::Request {
                            object,
                            object_id,
                            opcode,
                            arguments,
                            is_destructor,
                            created_id,
                        }
                    }
                } else {
                    return Err(std::io::Error::new(
                        std::io::ErrorKind::InvalidInput,
                        "Invalid client ID",
                    ));
                }
            };
            match action {
                DispatchAction::Request {
                    object,
                    object_id,
                    opcode,
                    arguments,
                    is_destructor,
                    created_id,
                } => {
                    // unlock the state while the handler runs
                    std::mem::drop(state);
                    let ret = object.data.user_data.clone().request(
                        &handle,
                        data,
                        client_id.clone(),
                        Message { sender_id: object_id.clone(), opcode, args: arguments },
                    );
                    if is_destructor {
                        object.data.user_data.clone().destroyed(
                            &handle,
                            data,
                            client_id.clone(),
                            object_id.clone(),
                        );
                    }
                    state = self.state.lock().unwrap();
                    if is_destructor {
                        if let Ok(client) = state.clients.get_client_mut(client_id.clone()) {
                            client.send_delete_id(object_id);
                        }
                    }
                    match (created_id, ret) {
                        (Some(child_id), Some(child_data)) => {
                            if let Ok(client) = state.clients.get_client_mut(client_id.clone()) {
                                client
                                    .map
                                    .with(child_id.id, |obj| obj.data.user_data = child_data)
                                    .unwrap();
                            }
                        }
                        (None, None) => {}
                        (Some(child_id), None) => {
                            // Allow the callback to not return any data if the
                            // client is already dead (typically because the
                            // callback posted a protocol error)
                            if let Ok(client) = state.clients.get_client(client_id.clone()) {
                                if !client.killed {
                                    panic!(
                                        "Callback creating object {child_id} did not provide any object data."
                                    );
                                }
                            }
                        }
                        (None, Some(_)) => {
                            panic!("An object data was returned from a callback not creating any object");
                        }
                    }
                    // dropping the object can run user destructors that call
                    // back into the backend, release the lock around it
                    std::mem::drop(state);
                    std::mem::drop(object);
                    state = self.state.lock().unwrap();
                }
                DispatchAction::Bind { object, client, global, handler } => {
                    std::mem::drop(state);
                    let child_data =
                        handler.bind(&handle, data, client.clone(), global, object.clone());
                    state = self.state.lock().unwrap();
                    if let Ok(client) = state.clients.get_client_mut(client.clone()) {
                        client.map.with(object.id, |obj| obj.data.user_data = child_data).unwrap();
                    }
                }
            }
        }
        Ok(dispatched)
    }
}

enum DispatchAction<D: 'static> {
    Request {
        object: Object<Data<D>>,
        object_id: ObjectId,
        opcode: u16,
        arguments: SmallVec<[Argument<ObjectId, std::os::unix::io::OwnedFd>; 4]>,
        is_destructor: bool,
        created_id: Option<ObjectId>,
    },
    Bind {
        object: ObjectId,
        client: ClientId,
        global: GlobalId,
        handler: Arc<dyn GlobalHandler<D>>,
    },
}
