//! Loopback tests of the client and server backends over a socketpair

use std::ffi::CString;
use std::os::unix::io::OwnedFd;
use std::os::unix::net::UnixStream;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

use waypost_backend::client as client_backend;
use waypost_backend::message;
use waypost_backend::protocol::{
    Argument, ArgumentType, Interface, Message, MessageDesc,
};
use waypost_backend::server::{
    self, Backend, ClientId, GlobalHandler, GlobalId, Handle, ObjectData, ObjectId,
};
use waypost_backend::{WaylandError, WL_CALLBACK_INTERFACE, WL_REGISTRY_INTERFACE};

static TEST_INTERFACE: Interface = Interface {
    name: "test_global",
    version: 3,
    requests: &[MessageDesc {
        name: "set_value",
        since: 1,
        is_destructor: false,
        signature: &[ArgumentType::Uint],
        child_interface: None,
        arg_interfaces: &[],
    }],
    events: &[MessageDesc {
        name: "value",
        since: 1,
        is_destructor: false,
        signature: &[ArgumentType::Uint],
        child_interface: None,
        arg_interfaces: &[],
    }],
};

#[derive(Default)]
struct ServerState {
    value: u32,
}

struct TestGlobal;

impl GlobalHandler<ServerState> for TestGlobal {
    fn bind(
        self: Arc<Self>,
        _handle: &Handle<ServerState>,
        _data: &mut ServerState,
        _client_id: ClientId,
        _global_id: GlobalId,
        _object_id: ObjectId,
    ) -> Arc<dyn ObjectData<ServerState>> {
        Arc::new(TestGlobalData)
    }
}

struct TestGlobalData;

impl ObjectData<ServerState> for TestGlobalData {
    fn request(
        self: Arc<Self>,
        handle: &Handle<ServerState>,
        data: &mut ServerState,
        _client_id: ClientId,
        msg: Message<ObjectId, OwnedFd>,
    ) -> Option<Arc<dyn ObjectData<ServerState>>> {
        // set_value(value): echo it back through the value event
        if let [Argument::Uint(value)] = msg.args[..] {
            data.value = value;
            handle.send_event(message!(msg.sender_id, 0, [Argument::Uint(value * 2)])).unwrap();
        }
        None
    }

    fn destroyed(
        self: Arc<Self>,
        _handle: &Handle<ServerState>,
        _data: &mut ServerState,
        _client_id: ClientId,
        _object_id: ObjectId,
    ) {
    }
}

// client-side data collecting the registry advertisement
#[derive(Default)]
struct RegistrySink {
    globals: std::sync::Mutex<Vec<(u32, String, u32)>>,
}

impl client_backend::ObjectData for RegistrySink {
    fn event(
        self: Arc<Self>,
        _backend: &client_backend::Backend,
        msg: Message<client_backend::ObjectId, OwnedFd>,
    ) -> Option<Arc<dyn client_backend::ObjectData>> {
        if msg.opcode == 0 {
            if let [Argument::Uint(name), Argument::Str(Some(ref interface)), Argument::Uint(version)] =
                msg.args[..]
            {
                self.globals.lock().unwrap().push((
                    name,
                    interface.to_string_lossy().into_owned(),
                    version,
                ));
            }
        }
        None
    }

    fn destroyed(&self, _object_id: client_backend::ObjectId) {}
}

#[derive(Default)]
struct SyncSink {
    done: AtomicBool,
}

impl client_backend::ObjectData for SyncSink {
    fn event(
        self: Arc<Self>,
        _backend: &client_backend::Backend,
        _msg: Message<client_backend::ObjectId, OwnedFd>,
    ) -> Option<Arc<dyn client_backend::ObjectData>> {
        self.done.store(true, Ordering::SeqCst);
        None
    }

    fn destroyed(&self, _object_id: client_backend::ObjectId) {}
}

#[derive(Default)]
struct ValueSink {
    value: AtomicU32,
}

impl client_backend::ObjectData for ValueSink {
    fn event(
        self: Arc<Self>,
        _backend: &client_backend::Backend,
        msg: Message<client_backend::ObjectId, OwnedFd>,
    ) -> Option<Arc<dyn client_backend::ObjectData>> {
        if let [Argument::Uint(value)] = msg.args[..] {
            self.value.store(value, Ordering::SeqCst);
        }
        None
    }

    fn destroyed(&self, _object_id: client_backend::ObjectId) {}
}

struct TestPair {
    server: Backend<ServerState>,
    state: ServerState,
    client: client_backend::Backend,
}

fn setup() -> TestPair {
    let (client_stream, server_stream) = UnixStream::pair().unwrap();
    client_stream.set_nonblocking(true).unwrap();
    server_stream.set_nonblocking(true).unwrap();

    let server: Backend<ServerState> = Backend::new().unwrap();
    server.handle().create_global(&TEST_INTERFACE, 3, Arc::new(TestGlobal));
    server.handle().insert_client(server_stream, Arc::new(())).unwrap();

    TestPair {
        server,
        state: ServerState::default(),
        client: client_backend::Backend::connect(client_stream),
    }
}

impl TestPair {
    // one cooperative scheduling round: requests over, events back;
    // errors park in the backends and are asserted on by the tests
    fn pump(&mut self) {
        let _ = self.client.flush();
        let _ = self.server.dispatch_all_clients(&mut self.state);
        let _ = self.server.flush(None);
        let _ = self.client.dispatch_events();
    }
}

fn get_registry(pair: &TestPair, sink: Arc<RegistrySink>) -> client_backend::ObjectId {
    pair.client
        .send_request(
            message!(
                pair.client.display_id(),
                1,
                [Argument::NewId(client_backend::Backend::null_id())]
            ),
            Some(sink),
            Some((&WL_REGISTRY_INTERFACE, 1)),
        )
        .unwrap()
}

#[test]
fn sync_roundtrip_destroys_callback() {
    let mut pair = setup();
    let sink = Arc::new(SyncSink::default());
    let callback = pair
        .client
        .send_request(
            message!(
                pair.client.display_id(),
                0,
                [Argument::NewId(client_backend::Backend::null_id())]
            ),
            Some(sink.clone()),
            Some((&WL_CALLBACK_INTERFACE, 1)),
        )
        .unwrap();
    assert!(pair.client.info(callback.clone()).is_ok());

    pair.pump();

    assert!(sink.done.load(Ordering::SeqCst));
    // done is a destructor event: the callback is gone afterwards
    assert!(pair.client.info(callback).is_err());
}

#[test]
fn registry_advertises_and_binds() {
    let mut pair = setup();
    let sink = Arc::new(RegistrySink::default());
    let registry = get_registry(&pair, sink.clone());

    pair.pump();

    let globals = sink.globals.lock().unwrap().clone();
    assert_eq!(globals.len(), 1);
    let (name, ref interface, version) = globals[0];
    assert_eq!(interface, "test_global");
    assert_eq!(version, 3);

    // bind at a lower version; the server must not upgrade
    let values = Arc::new(ValueSink::default());
    let bound = pair
        .client
        .send_request(
            message!(
                registry,
                0,
                [
                    Argument::Uint(name),
                    Argument::Str(Some(Box::new(CString::new("test_global").unwrap()))),
                    Argument::Uint(2),
                    Argument::NewId(client_backend::Backend::null_id()),
                ]
            ),
            Some(values.clone()),
            Some((&TEST_INTERFACE, 2)),
        )
        .unwrap();

    pair.client
        .send_request(message!(bound.clone(), 0, [Argument::Uint(21)]), None, None)
        .unwrap();

    pair.pump();

    assert_eq!(pair.state.value, 21);
    assert_eq!(values.value.load(Ordering::SeqCst), 42);
    assert_eq!(pair.client.info(bound).unwrap().version, 2);
}

#[test]
fn binding_a_stale_name_is_fatal() {
    let mut pair = setup();
    let sink = Arc::new(RegistrySink::default());
    let registry = get_registry(&pair, sink);

    pair.pump();

    // no global ever carried name 999
    let _ = pair.client.send_request(
        message!(
            registry,
            0,
            [
                Argument::Uint(999),
                Argument::Str(Some(Box::new(CString::new("test_global").unwrap()))),
                Argument::Uint(1),
                Argument::NewId(client_backend::Backend::null_id()),
            ]
        ),
        Some(Arc::new(ValueSink::default())),
        Some((&TEST_INTERFACE, 1)),
    );

    pair.pump();
    pair.pump();

    match pair.client.last_error() {
        Some(WaylandError::Protocol(err)) => {
            assert_eq!(err.object_interface, "wl_display");
        }
        other => panic!("expected a protocol error, got {other:?}"),
    }
}

#[test]
fn removed_global_is_withdrawn() {
    let mut pair = setup();
    let global_id = {
        // create a second global, then remove it once advertised
        pair.server.handle().create_global(&TEST_INTERFACE, 1, Arc::new(TestGlobal))
    };
    let sink = Arc::new(RegistrySink::default());
    get_registry(&pair, sink.clone());

    pair.pump();
    assert_eq!(sink.globals.lock().unwrap().len(), 2);

    pair.server.handle().remove_global(global_id);
    pair.pump();

    // a later registry sees a single global again
    let late = Arc::new(RegistrySink::default());
    get_registry(&pair, late.clone());
    pair.pump();
    assert_eq!(late.globals.lock().unwrap().len(), 1);
}

#[test]
fn server_ids_live_in_the_high_range() {
    let pair = setup();
    let handle = pair.server.handle();
    let mut client_id = None;
    handle.with_all_clients(|id| client_id = Some(id));
    let client_id = client_id.unwrap();

    let obj = handle
        .create_object(client_id, &TEST_INTERFACE, 1, Arc::new(TestGlobalData))
        .unwrap();
    assert!(obj.protocol_id() >= 0xFF00_0000);
}

// the ServerState type must be usable from the dispatch loop
fn _assert_backend_traits() {
    fn assert_send<T: Send>() {}
    assert_send::<Backend<ServerState>>();
    assert_send::<server::Handle<ServerState>>();
}
