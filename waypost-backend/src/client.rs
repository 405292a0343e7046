//! Client-side backend
//!
//! Owns the connection state of a client: the buffered socket, the object
//! map and the last fatal error. All protocol state belongs to the
//! connection's owning task; the internal mutex only bridges reentrancy
//! (handlers calling back into the backend mid-dispatch), it is released
//! while user callbacks run.

use std::{
    fmt,
    os::unix::{
        io::{AsRawFd, BorrowedFd, OwnedFd, RawFd},
        net::UnixStream,
    },
    sync::{Arc, Mutex, MutexGuard, Weak},
};

use crate::{
    core_interfaces::WL_DISPLAY_INTERFACE,
    debug,
    map::{Object, ObjectMap, SERVER_ID_LIMIT},
    protocol::{
        same_interface, same_interface_or_anonymous, signature_matches, AllowNull, Argument,
        ArgumentType, Interface, Message, ObjectInfo, ProtocolError, ANONYMOUS_INTERFACE,
        INLINE_ARGS,
    },
    socket::{BufferedSocket, Socket},
    types::{InvalidId, WaylandError},
    wire::MessageParseError,
};

use smallvec::SmallVec;

/// A trait representing user data associated to a client-side object
///
/// Methods are only handed a `&` reference; interior mutability is the
/// implementor's concern.
pub trait ObjectData: downcast_rs::DowncastSync {
    /// An event was received for the associated object
    ///
    /// If the event has a `NewId` argument, the callback must return the
    /// object data for the newly created object.
    fn event(
        self: Arc<Self>,
        backend: &Backend,
        msg: Message<ObjectId, OwnedFd>,
    ) -> Option<Arc<dyn ObjectData>>;

    /// Notification that the object has been destroyed and is no longer active
    fn destroyed(&self, object_id: ObjectId);

    /// Helper for forwarding a Debug implementation of your `ObjectData` type
    fn debug(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectData").finish_non_exhaustive()
    }
}

downcast_rs::impl_downcast!(sync ObjectData);

impl std::fmt::Debug for dyn ObjectData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.debug(f)
    }
}

/// An object data that panics on any event
///
/// Used for objects that cannot receive events (`wl_display` itself) or
/// whose events are handled internally.
#[derive(Debug)]
pub struct DumbObjectData;

impl ObjectData for DumbObjectData {
    fn event(
        self: Arc<Self>,
        _backend: &Backend,
        _msg: Message<ObjectId, OwnedFd>,
    ) -> Option<Arc<dyn ObjectData>> {
        unreachable!()
    }

    fn destroyed(&self, _object_id: ObjectId) {}
}

struct UninitObjectData;

impl ObjectData for UninitObjectData {
    fn event(
        self: Arc<Self>,
        _backend: &Backend,
        msg: Message<ObjectId, OwnedFd>,
    ) -> Option<Arc<dyn ObjectData>> {
        panic!("Received a message on an uninitialized object: {msg:?}");
    }

    fn destroyed(&self, _object_id: ObjectId) {}

    fn debug(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UninitObjectData").finish()
    }
}

#[derive(Debug, Clone)]
struct Data {
    client_destroyed: bool,
    server_destroyed: bool,
    user_data: Arc<dyn ObjectData>,
    serial: u32,
}

/// An ID representing a protocol object
///
/// Ids are serial-tagged: a protocol id that has been reused after
/// destruction compares unequal to the id of the dead object it replaces.
#[derive(Clone)]
pub struct ObjectId {
    serial: u32,
    id: u32,
    interface: &'static Interface,
}

impl std::cmp::PartialEq for ObjectId {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.serial == other.serial
            && same_interface(self.interface, other.interface)
    }
}

impl std::cmp::Eq for ObjectId {}

impl std::hash::Hash for ObjectId {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.serial.hash(state);
        self.id.hash(state);
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.interface.name, self.id)
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId({}, {})", self, self.serial)
    }
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

    /// The protocol-level numeric id
    pub fn protocol_id(&self) -> u32 {
        self.id
    }
}

#[derive(Debug)]
struct ProtocolState {
    socket: BufferedSocket,
    map: ObjectMap<Data>,
    last_error: Option<WaylandError>,
    last_serial: u32,
    debug: bool,
}

/// A client-side backend
///
/// Cloning is shallow: all clones refer to the same connection.
#[derive(Clone, Debug)]
pub struct Backend {
    state: Arc<Mutex<ProtocolState>>,
}

/// A weak handle to a [`Backend`]
#[derive(Clone, Debug)]
pub struct WeakBackend {
    state: Weak<Mutex<ProtocolState>>,
}

impl WeakBackend {
    /// Try to upgrade to the backend, failing if the connection was dropped
    pub fn upgrade(&self) -> Option<Backend> {
        Weak::upgrade(&self.state).map(|state| Backend { state })
    }
}

impl PartialEq for Backend {
    fn eq(&self, rhs: &Self) -> bool {
        Arc::ptr_eq(&self.state, &rhs.state)
    }
}

impl Eq for Backend {}

impl Backend {
    /// Create a backend on top of a connected Unix stream
    ///
    /// Installs the `wl_display` singleton at id 1.
    pub fn connect(stream: UnixStream) -> Self {
        let socket = BufferedSocket::new(Socket::from(stream));
        let mut map = ObjectMap::new();
        map.insert_at(
            1,
            Object {
                interface: &WL_DISPLAY_INTERFACE,
                version: 1,
                data: Data {
                    client_destroyed: false,
                    server_destroyed: false,
                    user_data: Arc::new(DumbObjectData),
                    serial: 0,
                },
            },
        )
        .unwrap();

        let debug = debug::has_debug_client_env();

        Self {
            state: Arc::new(Mutex::new(ProtocolState {
                socket,
                map,
                last_error: None,
                last_serial: 0,
                debug,
            })),
        }
    }

    /// Get a weak handle to this backend
    pub fn downgrade(&self) -> WeakBackend {
        WeakBackend { state: Arc::downgrade(&self.state) }
    }

    fn lock_state(&self) -> MutexGuard<'_, ProtocolState> {
        self.state.lock().unwrap()
    }

    /// Flush all pending outgoing requests to the server
    pub fn flush(&self) -> Result<(), WaylandError> {
        let mut guard = self.lock_state();
        guard.no_last_error()?;
        if let Err(e) = guard.socket.flush() {
            return Err(guard.store_if_not_wouldblock_and_return_error(e));
        }
        Ok(())
    }

    /// Access the connection FD for polling
    pub fn poll_fd(&self) -> BorrowedFd<'_> {
        let raw_fd = self.lock_state().socket.as_raw_fd();
        // ties the BorrowedFd lifetime to &self rather than the guard
        unsafe { BorrowedFd::borrow_raw(raw_fd) }
    }

    /// The id of the `wl_display` singleton
    pub fn display_id(&self) -> ObjectId {
        ObjectId { serial: 0, id: 1, interface: &WL_DISPLAY_INTERFACE }
    }

    /// The last fatal error of this connection, if any
    pub fn last_error(&self) -> Option<WaylandError> {
        self.lock_state().last_error.clone()
    }

    /// Protocol information of a live object
    pub fn info(&self, id: ObjectId) -> Result<ObjectInfo, InvalidId> {
        let object = self.lock_state().get_object(id.clone())?;
        if object.data.client_destroyed {
            Err(InvalidId)
        } else {
            Ok(ObjectInfo { id: id.id, interface: object.interface, version: object.version })
        }
    }

    /// The null object id, usable as a nullable argument
    pub fn null_id() -> ObjectId {
        ObjectId { serial: 0, id: 0, interface: &ANONYMOUS_INTERFACE }
    }

    /// Get the data associated to an object
    pub fn get_data(&self, id: ObjectId) -> Result<Arc<dyn ObjectData>, InvalidId> {
        let object = self.lock_state().get_object(id)?;
        Ok(object.data.user_data)
    }

    /// Replace the data associated to an object
    pub fn set_data(&self, id: ObjectId, data: Arc<dyn ObjectData>) -> Result<(), InvalidId> {
        self.lock_state()
            .map
            .with(id.id, move |objdata| {
                if objdata.data.serial != id.serial {
                    Err(InvalidId)
                } else {
                    objdata.data.user_data = data;
                    Ok(())
                }
            })
            .unwrap_or(Err(InvalidId))
    }

    /// Send a request to the server
    ///
    /// If the request creates an object, `data` must be provided (unless
    /// `child_spec` points at an interface without events) and the new
    /// object's id is returned. If the request is a destructor, the sender
    /// is marked destroyed and further messages to it are discarded until
    /// the server acknowledges with `delete_id`.
    ///
    /// # Panics
    ///
    /// Panics on API misuse: wrong signature for the opcode, object
    /// arguments of the wrong interface, or a missing child spec for a
    /// generic constructor.
    pub fn send_request(
        &self,
        Message { sender_id: id, opcode, args }: Message<ObjectId, RawFd>,
        data: Option<Arc<dyn ObjectData>>,
        child_spec: Option<(&'static Interface, u32)>,
    ) -> Result<ObjectId, InvalidId> {
        let mut guard = self.lock_state();
        let object = guard.get_object(id.clone())?;

        let message_desc = match object.interface.requests.get(opcode as usize) {
            Some(msg) => msg,
            None => {
                panic!("Unknown opcode {} for object {}@{}.", opcode, object.interface.name, id.id);
            }
        };

        if object.data.client_destroyed {
            if guard.debug {
                debug::print_send_message(id.interface.name, id.id, message_desc.name, &args, true);
            }
            return Err(InvalidId);
        }

        if !signature_matches(message_desc.signature, &args) {
            panic!(
                "Unexpected signature for request {}@{}.{}: expected {:?}, got {:?}.",
                object.interface.name, id.id, message_desc.name, message_desc.signature, args
            );
        }

        // Prepare the child object if this request creates one
        let child_spec = if message_desc
            .signature
            .iter()
            .any(|arg| matches!(arg, ArgumentType::NewId))
        {
            if let Some((iface, version)) = child_spec {
                if let Some(child_interface) = message_desc.child_interface {
                    if !same_interface(child_interface, iface) {
                        panic!(
                            "Error when sending request {}@{}.{}: expected interface {} but got {}",
                            object.interface.name,
                            id.id,
                            message_desc.name,
                            child_interface.name,
                            iface.name
                        );
                    }
                }
                Some((iface, version))
            } else if let Some(child_interface) = message_desc.child_interface {
                Some((child_interface, object.version))
            } else {
                panic!(
                    "Error when sending request {}@{}.{}: target interface must be specified for a generic constructor.",
                    object.interface.name,
                    id.id,
                    message_desc.name
                );
            }
        } else {
            None
        };

        let child = if let Some((child_interface, child_version)) = child_spec {
            let child_serial = guard.next_serial();

            let child = Object {
                interface: child_interface,
                version: child_version,
                data: Data {
                    client_destroyed: false,
                    server_destroyed: false,
                    user_data: Arc::new(DumbObjectData),
                    serial: child_serial,
                },
            };

            let child_id = match guard.map.client_insert_new(child) {
                Ok(id) => id,
                Err(e) => {
                    let err = WaylandError::Io(std::io::Error::new(
                        std::io::ErrorKind::OutOfMemory,
                        e,
                    ));
                    guard.last_error = Some(err);
                    return Err(InvalidId);
                }
            };

            guard
                .map
                .with(child_id, |obj| {
                    obj.data.user_data = data.expect(
                        "Sending a request creating an object without providing an object data.",
                    );
                })
                .unwrap();
            Some((child_id, child_serial, child_interface))
        } else {
            None
        };

        // Substitute the placeholder new_id argument with the allocated id
        let args = args
            .into_iter()
            .map(|arg| {
                if let Argument::NewId(p) = arg {
                    if p.id != 0 {
                        panic!(
                            "The newid provided when sending request {}@{}.{} is not a placeholder.",
                            object.interface.name, id.id, message_desc.name
                        );
                    }
                    if let Some((child_id, child_serial, child_interface)) = child {
                        Argument::NewId(ObjectId {
                            id: child_id,
                            serial: child_serial,
                            interface: child_interface,
                        })
                    } else {
                        unreachable!();
                    }
                } else {
                    arg
                }
            })
            .collect::<SmallVec<[_; INLINE_ARGS]>>();

        if guard.debug {
            debug::print_send_message(object.interface.name, id.id, message_desc.name, &args, false);
        }
        log::debug!("Sending {}.{}", id, message_desc.name);

        // Flatten ids into the wire representation, checking object arguments
        let mut msg_args = SmallVec::with_capacity(args.len());
        let mut arg_interfaces = message_desc.arg_interfaces.iter();
        for (i, arg) in args.into_iter().enumerate() {
            msg_args.push(match arg {
                Argument::Array(a) => Argument::Array(a),
                Argument::Int(i) => Argument::Int(i),
                Argument::Uint(u) => Argument::Uint(u),
                Argument::Str(s) => Argument::Str(s),
                Argument::Fixed(f) => Argument::Fixed(f),
                Argument::NewId(nid) => Argument::NewId(nid.id),
                Argument::Fd(f) => Argument::Fd(f),
                Argument::Object(o) => {
                    let next_interface = arg_interfaces.next().unwrap();
                    if o.id != 0 {
                        let arg_object = guard.get_object(o.clone())?;
                        if !same_interface_or_anonymous(next_interface, arg_object.interface) {
                            panic!(
                                "Request {}@{}.{} expects an argument of interface {} but {} was provided instead.",
                                object.interface.name, id.id, message_desc.name,
                                next_interface.name, arg_object.interface.name
                            );
                        }
                    } else if !matches!(message_desc.signature[i], ArgumentType::Object(AllowNull::Yes)) {
                        panic!(
                            "Request {}@{}.{} expects a non-null object argument.",
                            object.interface.name, id.id, message_desc.name
                        );
                    }
                    Argument::Object(o.id)
                }
            });
        }

        let msg = Message { sender_id: id.id, opcode, args: msg_args };

        if let Err(err) = guard.socket.write_message(&msg) {
            guard.last_error = Some(WaylandError::Io(err));
        }

        // Handle destruction if relevant
        if message_desc.is_destructor {
            guard
                .map
                .with(id.id, |obj| {
                    obj.data.client_destroyed = true;
                })
                .unwrap();
            object.data.user_data.destroyed(id.clone());
        }
        if let Some((child_id, child_serial, child_interface)) = child {
            Ok(ObjectId { id: child_id, serial: child_serial, interface: child_interface })
        } else {
            Ok(Self::null_id())
        }
    }

    /// Read incoming events and dispatch them to their handlers
    ///
    /// Returns the number of dispatched events. If no events are available
    /// on the socket, errors with a `WouldBlock` IO error, which is a
    /// suspension signal rather than a failure.
    pub fn dispatch_events(&self) -> Result<usize, WaylandError> {
        let mut guard = self.lock_state();
        guard.no_last_error()?;
        let mut dispatched = 0;
        loop {
            // Attempt to read a message
            let ProtocolState { ref mut socket, ref map, .. } = *guard;
            let message = match socket.read_one_message(|id, opcode| {
                map.find(id)
                    .and_then(|o| o.interface.events.get(opcode as usize))
                    .map(|desc| desc.signature)
            }) {
                Ok(msg) => msg,
                Err(MessageParseError::MissingData) | Err(MessageParseError::MissingFD) => {
                    // need to read more data
                    if let Err(e) = guard.socket.fill_incoming_buffers() {
                        if e.kind() != std::io::ErrorKind::WouldBlock {
                            return Err(guard.store_and_return_error(e));
                        } else if dispatched == 0 {
                            return Err(e.into());
                        } else {
                            break;
                        }
                    }
                    continue;
                }
                Err(e) => {
                    // malformed message, protocol error
                    let err = WaylandError::Protocol(ProtocolError {
                        code: 0,
                        object_id: 0,
                        object_interface: "".into(),
                        message: format!("Corrupted message from the server: {e}"),
                    });
                    return Err(guard.store_and_return_error(err));
                }
            };

            // These lookups must succeed, otherwise the message could not have been parsed
            let receiver = guard.map.find(message.sender_id).unwrap();
            let message_desc = receiver.interface.events.get(message.opcode as usize).unwrap();

            // Short-circuit display-associated events
            if message.sender_id == 1 {
                guard.handle_display_event(message)?;
                continue;
            }

            let mut created_id = None;

            // Convert the arguments and create the new object if applicable
            let mut args = SmallVec::with_capacity(message.args.len());
            let mut arg_interfaces = message_desc.arg_interfaces.iter();
            for arg in message.args.into_iter() {
                args.push(match arg {
                    Argument::Array(a) => Argument::Array(a),
                    Argument::Int(i) => Argument::Int(i),
                    Argument::Uint(u) => Argument::Uint(u),
                    Argument::Str(s) => Argument::Str(s),
                    Argument::Fixed(f) => Argument::Fixed(f),
                    Argument::Fd(f) => Argument::Fd(f),
                    Argument::Object(o) => {
                        if o != 0 {
                            let obj = match guard.map.find(o) {
                                Some(o) => o,
                                None => {
                                    let err = WaylandError::Protocol(ProtocolError {
                                        code: 0,
                                        object_id: 0,
                                        object_interface: "".into(),
                                        message: format!("Unknown object {o}."),
                                    });
                                    return Err(guard.store_and_return_error(err));
                                }
                            };
                            if let Some(next_interface) = arg_interfaces.next() {
                                if !same_interface_or_anonymous(next_interface, obj.interface) {
                                    let err = WaylandError::Protocol(ProtocolError {
                                        code: 0,
                                        object_id: 0,
                                        object_interface: "".into(),
                                        message: format!(
                                            "Server sent object {} for interface {}, but it has interface {}.",
                                            o, next_interface.name, obj.interface.name
                                        ),
                                    });
                                    return Err(guard.store_and_return_error(err));
                                }
                            }
                            Argument::Object(ObjectId {
                                id: o,
                                serial: obj.data.serial,
                                interface: obj.interface,
                            })
                        } else {
                            Argument::Object(Self::null_id())
                        }
                    }
                    Argument::NewId(new_id) => {
                        let child_interface = match message_desc.child_interface {
                            Some(iface) => iface,
                            None => panic!(
                                "Received event {}@{}.{} which creates an object without specifying its interface, this is unsupported.",
                                receiver.interface.name, message.sender_id, message_desc.name
                            ),
                        };

                        // a destroyed server-range id can be reused directly
                        if new_id >= SERVER_ID_LIMIT
                            && guard
                                .map
                                .with(new_id, |obj| obj.data.client_destroyed)
                                .unwrap_or(false)
                        {
                            guard.map.remove(new_id);
                        }

                        let child_obj = Object {
                            interface: child_interface,
                            version: receiver.version,
                            data: Data {
                                client_destroyed: receiver.data.client_destroyed,
                                server_destroyed: false,
                                user_data: Arc::new(UninitObjectData),
                                serial: guard.next_serial(),
                            },
                        };

                        let child_id = ObjectId {
                            id: new_id,
                            serial: child_obj.data.serial,
                            interface: child_obj.interface,
                        };
                        created_id = Some(child_id.clone());

                        if let Err(()) = guard.map.insert_at(new_id, child_obj) {
                            // unrecoverable, the server is running wild
                            let err = WaylandError::Protocol(ProtocolError {
                                code: 0,
                                object_id: 0,
                                object_interface: "".into(),
                                message: format!(
                                    "Server tried to create an object \"{}\" with invalid id {}.",
                                    child_interface.name, new_id
                                ),
                            });
                            return Err(guard.store_and_return_error(err));
                        }

                        Argument::NewId(child_id)
                    }
                });
            }

            if guard.debug {
                debug::print_dispatched_message(
                    receiver.interface.name,
                    message.sender_id,
                    message_desc.name,
                    &args,
                );
            }

            // An event sent to an already locally-destroyed object is dropped silently
            if receiver.data.client_destroyed {
                continue;
            }

            let id = ObjectId {
                id: message.sender_id,
                serial: receiver.data.serial,
                interface: receiver.interface,
            };

            // unlock while the user callback runs
            std::mem::drop(guard);
            let ret = receiver
                .data
                .user_data
                .clone()
                .event(self, Message { sender_id: id.clone(), opcode: message.opcode, args });
            guard = self.lock_state();

            // a destructor event terminates the object on both sides
            if message_desc.is_destructor {
                guard
                    .map
                    .with(message.sender_id, |obj| {
                        obj.data.server_destroyed = true;
                        obj.data.client_destroyed = true;
                    })
                    .unwrap();
                receiver.data.user_data.destroyed(id);
            }

            match (created_id, ret) {
                (Some(child_id), Some(child_data)) => {
                    guard.map.with(child_id.id, |obj| obj.data.user_data = child_data).unwrap();
                }
                (None, None) => {}
                (Some(child_id), None) => {
                    panic!("Callback creating object {child_id} did not provide any object data.");
                }
                (None, Some(_)) => {
                    panic!("An object data was returned from a callback not creating any object");
                }
            }

            dispatched += 1;
        }
        Ok(dispatched)
    }
}

impl ProtocolState {
    fn next_serial(&mut self) -> u32 {
        self.last_serial = self.last_serial.wrapping_add(1);
        self.last_serial
    }

    #[inline]
    fn no_last_error(&self) -> Result<(), WaylandError> {
        if let Some(ref err) = self.last_error {
            Err(err.clone())
        } else {
            Ok(())
        }
    }

    #[inline]
    fn store_and_return_error(&mut self, err: impl Into<WaylandError>) -> WaylandError {
        let err = err.into();
        log::error!("{err}");
        self.last_error = Some(err.clone());
        err
    }

    #[inline]
    fn store_if_not_wouldblock_and_return_error(&mut self, e: std::io::Error) -> WaylandError {
        if e.kind() != std::io::ErrorKind::WouldBlock {
            self.store_and_return_error(e)
        } else {
            e.into()
        }
    }

    fn get_object(&self, id: ObjectId) -> Result<Object<Data>, InvalidId> {
        let object = self.map.find(id.id).ok_or(InvalidId)?;
        if object.data.serial != id.serial {
            return Err(InvalidId);
        }
        Ok(object)
    }

    fn handle_display_event(&mut self, message: Message<u32, OwnedFd>) -> Result<(), WaylandError> {
        if self.debug {
            debug::print_dispatched_message(
                "wl_display",
                message.sender_id,
                if message.opcode == 0 { "error" } else { "delete_id" },
                &message.args,
            );
        }
        match message.opcode {
            0 => {
                // wl_display.error
                if let [Argument::Object(obj), Argument::Uint(code), Argument::Str(Some(ref message))] =
                    message.args[..]
                {
                    let object = self.map.find(obj);
                    let err = WaylandError::Protocol(ProtocolError {
                        code,
                        object_id: obj,
                        object_interface: object
                            .map(|obj| obj.interface.name)
                            .unwrap_or("<unknown>")
                            .into(),
                        message: message.to_string_lossy().into(),
                    });
                    Err(self.store_and_return_error(err))
                } else {
                    unreachable!()
                }
            }
            1 => {
                // wl_display.delete_id: id reuse is now safe
                if let [Argument::Uint(id)] = message.args[..] {
                    let client_destroyed = self
                        .map
                        .with(id, |obj| {
                            obj.data.server_destroyed = true;
                            obj.data.client_destroyed
                        })
                        .unwrap_or(false);
                    if client_destroyed {
                        self.map.remove(id);
                    }
                    Ok(())
                } else {
                    unreachable!()
                }
            }
            _ => unreachable!(),
        }
    }
}
