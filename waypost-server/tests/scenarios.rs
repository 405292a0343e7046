//! End-to-end scenarios over a socketpair: a real client backend driving
//! the compositor scaffolding

use std::io::{Read, Write};
use std::os::unix::io::{AsRawFd, OwnedFd};
use std::os::unix::net::UnixStream;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use waypost_backend::client as wl_client;
use waypost_backend::message;
use waypost_backend::protocol::{Argument, Message};
use waypost_backend::server::Backend;
use waypost_backend::{WaylandError, WL_REGISTRY_INTERFACE};
use waypost_protocols::core::{
    WL_COMPOSITOR_INTERFACE, WL_SHM_INTERFACE,
};
use waypost_protocols::xdg_shell::XDG_WM_BASE_INTERFACE;
use waypost_server::geometry::Point;
use waypost_server::globals::create_globals;
use waypost_server::output::Output;
use waypost_server::state::Compositor;

use std::ffi::CString;

// ---- client-side event sinks ----

#[derive(Default)]
struct Ignore;

impl wl_client::ObjectData for Ignore {
    fn event(
        self: Arc<Self>,
        _backend: &wl_client::Backend,
        _msg: Message<wl_client::ObjectId, OwnedFd>,
    ) -> Option<Arc<dyn wl_client::ObjectData>> {
        None
    }

    fn destroyed(&self, _object_id: wl_client::ObjectId) {}
}

#[derive(Default)]
struct RegistrySink {
    globals: Mutex<Vec<(u32, String, u32)>>,
}

impl wl_client::ObjectData for RegistrySink {
    fn event(
        self: Arc<Self>,
        _backend: &wl_client::Backend,
        msg: Message<wl_client::ObjectId, OwnedFd>,
    ) -> Option<Arc<dyn wl_client::ObjectData>> {
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

    fn destroyed(&self, _object_id: wl_client::ObjectId) {}
}

/// Collects `wl_buffer.release`
#[derive(Default)]
struct ReleaseSink {
    released: AtomicBool,
}

impl wl_client::ObjectData for ReleaseSink {
    fn event(
        self: Arc<Self>,
        _backend: &wl_client::Backend,
        _msg: Message<wl_client::ObjectId, OwnedFd>,
    ) -> Option<Arc<dyn wl_client::ObjectData>> {
        self.released.store(true, Ordering::SeqCst);
        None
    }

    fn destroyed(&self, _object_id: wl_client::ObjectId) {}
}

/// Collects `wl_callback.done`
#[derive(Default)]
struct DoneSink {
    fired: AtomicU32,
}

impl wl_client::ObjectData for DoneSink {
    fn event(
        self: Arc<Self>,
        _backend: &wl_client::Backend,
        _msg: Message<wl_client::ObjectId, OwnedFd>,
    ) -> Option<Arc<dyn wl_client::ObjectData>> {
        self.fired.fetch_add(1, Ordering::SeqCst);
        None
    }

    fn destroyed(&self, _object_id: wl_client::ObjectId) {}
}

/// Collects `xdg_surface.configure` serials
#[derive(Default)]
struct ConfigureSink {
    serials: Mutex<Vec<u32>>,
}

impl wl_client::ObjectData for ConfigureSink {
    fn event(
        self: Arc<Self>,
        _backend: &wl_client::Backend,
        msg: Message<wl_client::ObjectId, OwnedFd>,
    ) -> Option<Arc<dyn wl_client::ObjectData>> {
        if let [Argument::Uint(serial)] = msg.args[..] {
            self.serials.lock().unwrap().push(serial);
        }
        None
    }

    fn destroyed(&self, _object_id: wl_client::ObjectId) {}
}

/// Collects `wl_pointer.enter`
#[derive(Default)]
struct PointerSink {
    enters: Mutex<Vec<(wl_client::ObjectId, i32, i32)>>,
}

impl wl_client::ObjectData for PointerSink {
    fn event(
        self: Arc<Self>,
        _backend: &wl_client::Backend,
        msg: Message<wl_client::ObjectId, OwnedFd>,
    ) -> Option<Arc<dyn wl_client::ObjectData>> {
        if msg.opcode == 0 {
            if let [Argument::Uint(_), Argument::Object(ref surface), Argument::Fixed(x), Argument::Fixed(y)] =
                msg.args[..]
            {
                self.enters.lock().unwrap().push((
                    surface.clone(),
                    waypost_backend::protocol::Fixed(x).to_int(),
                    waypost_backend::protocol::Fixed(y).to_int(),
                ));
            }
        }
        None
    }

    fn destroyed(&self, _object_id: wl_client::ObjectId) {}
}

// ---- fixture ----

struct Fixture {
    server: Backend<Compositor>,
    state: Compositor,
    client: wl_client::Backend,
}

fn setup() -> Fixture {
    let (client_stream, server_stream) = UnixStream::pair().unwrap();
    client_stream.set_nonblocking(true).unwrap();
    server_stream.set_nonblocking(true).unwrap();

    let mut state = Compositor::new();
    state.add_output(Output::new("TEST-1", 1920, 1080, 60_000));

    let server: Backend<Compositor> = Backend::new().unwrap();
    create_globals(&server.handle(), 1);
    server.handle().insert_client(server_stream, Arc::new(())).unwrap();

    Fixture { server, state, client: wl_client::Backend::connect(client_stream) }
}

impl Fixture {
    fn pump(&mut self) {
        for _ in 0..4 {
            let _ = self.client.flush();
            let _ = self.server.dispatch_all_clients(&mut self.state);
            let _ = self.server.flush(None);
            let _ = self.client.dispatch_events();
        }
    }

    fn bind(
        &mut self,
        interface: &'static waypost_backend::protocol::Interface,
        version: u32,
        data: Arc<dyn wl_client::ObjectData>,
    ) -> wl_client::ObjectId {
        let sink = Arc::new(RegistrySink::default());
        let registry = self
            .client
            .send_request(
                message!(
                    self.client.display_id(),
                    1,
                    [Argument::NewId(wl_client::Backend::null_id())]
                ),
                Some(sink.clone()),
                Some((&WL_REGISTRY_INTERFACE, 1)),
            )
            .unwrap();
        self.pump();
        let (name, _, advertised) = sink
            .globals
            .lock()
            .unwrap()
            .iter()
            .find(|(_, iface, _)| iface == interface.name)
            .cloned()
            .unwrap_or_else(|| panic!("global {} not advertised", interface.name));
        let version = version.min(advertised);
        self.client
            .send_request(
                message!(
                    registry,
                    0,
                    [
                        Argument::Uint(name),
                        Argument::Str(Some(Box::new(CString::new(interface.name).unwrap()))),
                        Argument::Uint(version),
                        Argument::NewId(wl_client::Backend::null_id()),
                    ]
                ),
                Some(data),
                Some((interface, version)),
            )
            .unwrap()
    }

    fn create_surface(&mut self, compositor: &wl_client::ObjectId) -> wl_client::ObjectId {
        self.client
            .send_request(
                message!(
                    compositor.clone(),
                    0,
                    [Argument::NewId(wl_client::Backend::null_id())]
                ),
                Some(Arc::new(Ignore)),
                None,
            )
            .unwrap()
    }

    fn commit(&mut self, surface: &wl_client::ObjectId) {
        self.client
            .send_request(message!(surface.clone(), 6, []), None, None)
            .unwrap();
    }

    fn server_surface(&self, protocol_id: u32) -> Option<&waypost_server::surface::Surface<waypost_backend::server::ObjectId>> {
        self.state
            .surfaces
            .iter()
            .find(|(id, _)| id.protocol_id() == protocol_id)
            .map(|(_, s)| s)
    }

    fn shm_buffer(
        &mut self,
        shm: &wl_client::ObjectId,
        data: Arc<dyn wl_client::ObjectData>,
    ) -> wl_client::ObjectId {
        let memfd =
            rustix::fs::memfd_create("scenario-pool", rustix::fs::MemfdFlags::CLOEXEC).unwrap();
        rustix::fs::ftruncate(&memfd, 4096).unwrap();
        let pool = self
            .client
            .send_request(
                message!(
                    shm.clone(),
                    0,
                    [
                        Argument::NewId(wl_client::Backend::null_id()),
                        Argument::Fd(memfd.as_raw_fd()),
                        Argument::Int(4096),
                    ]
                ),
                Some(Arc::new(Ignore)),
                None,
            )
            .unwrap();
        // 32x32, argb8888
        self.client
            .send_request(
                message!(
                    pool,
                    0,
                    [
                        Argument::NewId(wl_client::Backend::null_id()),
                        Argument::Int(0),
                        Argument::Int(32),
                        Argument::Int(32),
                        Argument::Int(128),
                        Argument::Uint(0),
                    ]
                ),
                Some(data),
                None,
            )
            .unwrap()
    }
}

// S1/S2: registry handshake, then an attach-nothing commit leaves the
// surface unmapped
#[test]
fn handshake_and_unmapped_commit() {
    let mut fx = setup();
    let compositor = fx.bind(&WL_COMPOSITOR_INTERFACE, 6, Arc::new(Ignore));
    assert_eq!(fx.client.info(compositor.clone()).unwrap().version, 6);

    let surface = fx.create_surface(&compositor);
    // attach(null, 0, 0)
    fx.client
        .send_request(
            message!(
                surface.clone(),
                1,
                [
                    Argument::Object(wl_client::Backend::null_id()),
                    Argument::Int(0),
                    Argument::Int(0),
                ]
            ),
            None,
            None,
        )
        .unwrap();
    fx.commit(&surface);
    fx.pump();

    assert!(fx.client.last_error().is_none());
    let server_surface = fx.server_surface(surface.protocol_id()).expect("surface exists");
    assert!(!server_surface.is_mapped());
}

// S3: SHM pool and buffer lifecycle, frame callbacks, release on replace
#[test]
fn shm_buffer_lifecycle() {
    let mut fx = setup();
    let compositor = fx.bind(&WL_COMPOSITOR_INTERFACE, 6, Arc::new(Ignore));
    let shm = fx.bind(&WL_SHM_INTERFACE, 1, Arc::new(Ignore));
    let surface = fx.create_surface(&compositor);

    let release = Arc::new(ReleaseSink::default());
    let buffer = fx.shm_buffer(&shm, release.clone());
    fx.pump();
    assert!(fx.client.last_error().is_none());

    // attach + frame + commit
    fx.client
        .send_request(
            message!(
                surface.clone(),
                1,
                [Argument::Object(buffer.clone()), Argument::Int(0), Argument::Int(0)]
            ),
            None,
            None,
        )
        .unwrap();
    let done = Arc::new(DoneSink::default());
    fx.client
        .send_request(
            message!(surface.clone(), 3, [Argument::NewId(wl_client::Backend::null_id())]),
            Some(done.clone()),
            None,
        )
        .unwrap();
    fx.commit(&surface);
    fx.pump();

    let server_surface = fx.server_surface(surface.protocol_id()).unwrap();
    assert!(server_surface.is_mapped());

    // the compositor presents a frame: the callback fires exactly once
    let handle = fx.server.handle();
    fx.state.frame_presented(&handle, 1000);
    fx.pump();
    assert_eq!(done.fired.load(Ordering::SeqCst), 1);
    fx.state.frame_presented(&handle, 2000);
    fx.pump();
    assert_eq!(done.fired.load(Ordering::SeqCst), 1);

    // replacing the buffer owes a release on the old one
    assert!(!release.released.load(Ordering::SeqCst));
    let second = fx.shm_buffer(&shm, Arc::new(ReleaseSink::default()));
    fx.pump();
    fx.client
        .send_request(
            message!(
                surface.clone(),
                1,
                [Argument::Object(second), Argument::Int(0), Argument::Int(0)]
            ),
            None,
            None,
        )
        .unwrap();
    fx.commit(&surface);
    fx.pump();
    assert!(release.released.load(Ordering::SeqCst));
}

// S4: configure/ack handshake
#[test]
fn xdg_configure_ack() {
    let mut fx = setup();
    let compositor = fx.bind(&WL_COMPOSITOR_INTERFACE, 6, Arc::new(Ignore));
    let shm = fx.bind(&WL_SHM_INTERFACE, 1, Arc::new(Ignore));
    let wm_base = fx.bind(&XDG_WM_BASE_INTERFACE, 6, Arc::new(Ignore));
    let surface = fx.create_surface(&compositor);

    let configures = Arc::new(ConfigureSink::default());
    let xdg_surface = fx
        .client
        .send_request(
            message!(
                wm_base,
                2,
                [
                    Argument::NewId(wl_client::Backend::null_id()),
                    Argument::Object(surface.clone()),
                ]
            ),
            Some(configures.clone()),
            None,
        )
        .unwrap();
    let _toplevel = fx
        .client
        .send_request(
            message!(
                xdg_surface.clone(),
                1,
                [Argument::NewId(wl_client::Backend::null_id())]
            ),
            Some(Arc::new(Ignore)),
            None,
        )
        .unwrap();

    // initial commit without a buffer triggers the first configure
    fx.commit(&surface);
    fx.pump();
    let serial = {
        let serials = configures.serials.lock().unwrap();
        assert_eq!(serials.len(), 1, "expected exactly one configure");
        serials[0]
    };

    // ack, then commit a buffer: the surface maps
    fx.client
        .send_request(
            message!(xdg_surface.clone(), 4, [Argument::Uint(serial)]),
            None,
            None,
        )
        .unwrap();
    let buffer = fx.shm_buffer(&shm, Arc::new(ReleaseSink::default()));
    fx.pump();
    fx.client
        .send_request(
            message!(
                surface.clone(),
                1,
                [Argument::Object(buffer), Argument::Int(0), Argument::Int(0)]
            ),
            None,
            None,
        )
        .unwrap();
    fx.commit(&surface);
    fx.pump();

    assert!(fx.client.last_error().is_none());
    assert!(fx.server_surface(surface.protocol_id()).unwrap().is_mapped());
}

// S4 (negative): committing a buffer before acking is a protocol error
#[test]
fn commit_before_ack_is_fatal() {
    let mut fx = setup();
    let compositor = fx.bind(&WL_COMPOSITOR_INTERFACE, 6, Arc::new(Ignore));
    let shm = fx.bind(&WL_SHM_INTERFACE, 1, Arc::new(Ignore));
    let wm_base = fx.bind(&XDG_WM_BASE_INTERFACE, 6, Arc::new(Ignore));
    let surface = fx.create_surface(&compositor);

    let xdg_surface = fx
        .client
        .send_request(
            message!(
                wm_base,
                2,
                [
                    Argument::NewId(wl_client::Backend::null_id()),
                    Argument::Object(surface.clone()),
                ]
            ),
            Some(Arc::new(ConfigureSink::default())),
            None,
        )
        .unwrap();
    let _toplevel = fx
        .client
        .send_request(
            message!(
                xdg_surface.clone(),
                1,
                [Argument::NewId(wl_client::Backend::null_id())]
            ),
            Some(Arc::new(Ignore)),
            None,
        )
        .unwrap();
    fx.commit(&surface);
    fx.pump();

    // no ack: attach a buffer and commit anyway
    let buffer = fx.shm_buffer(&shm, Arc::new(ReleaseSink::default()));
    fx.pump();
    fx.client
        .send_request(
            message!(
                surface.clone(),
                1,
                [Argument::Object(buffer), Argument::Int(0), Argument::Int(0)]
            ),
            None,
            None,
        )
        .unwrap();
    fx.commit(&surface);
    fx.pump();
    fx.pump();

    assert!(matches!(fx.client.last_error(), Some(WaylandError::Protocol(_))));
}

// S5: pointer focus goes to the topmost surface under the cursor
#[test]
fn pointer_focus_topmost() {
    let mut fx = setup();
    let compositor = fx.bind(&WL_COMPOSITOR_INTERFACE, 6, Arc::new(Ignore));
    let shm = fx.bind(&WL_SHM_INTERFACE, 1, Arc::new(Ignore));
    let seat = fx.bind(&waypost_protocols::core::WL_SEAT_INTERFACE, 9, Arc::new(Ignore));

    let enters = Arc::new(PointerSink::default());
    let _pointer = fx
        .client
        .send_request(
            message!(seat, 0, [Argument::NewId(wl_client::Backend::null_id())]),
            Some(enters.clone()),
            None,
        )
        .unwrap();

    // two mapped 32x32 surfaces; B is stacked above A and offset so the
    // two overlap
    let mut surfaces = Vec::new();
    for _ in 0..2 {
        let surface = fx.create_surface(&compositor);
        let buffer = fx.shm_buffer(&shm, Arc::new(ReleaseSink::default()));
        fx.pump();
        fx.client
            .send_request(
                message!(
                    surface.clone(),
                    1,
                    [Argument::Object(buffer), Argument::Int(0), Argument::Int(0)]
                ),
                None,
                None,
            )
            .unwrap();
        fx.commit(&surface);
        surfaces.push(surface);
    }
    fx.pump();

    // place them; the compositor's placement policy is not under test
    let a = surfaces[0].clone();
    let b = surfaces[1].clone();
    let view_b = {
        let sid = fx
            .state
            .surfaces
            .keys()
            .find(|id| id.protocol_id() == b.protocol_id())
            .cloned()
            .unwrap();
        fx.state.scene.view_for_surface(&sid).unwrap()
    };
    fx.state.scene.move_view(view_b, 16, 16);

    // (20, 20) lies inside both; B wins by stacking order
    let handle = fx.server.handle();
    fx.state.pointer_motion(&handle, 10, 20, 20);
    fx.pump();

    let enters = enters.enters.lock().unwrap();
    assert_eq!(enters.len(), 1);
    let (entered, x, y) = enters[0].clone();
    assert_eq!(entered.protocol_id(), b.protocol_id());
    assert_ne!(entered.protocol_id(), a.protocol_id());
    // coordinates are local to B
    assert_eq!((x, y), (4, 4));
}

// S6: an unknown opcode terminates the connection with display.error
#[test]
fn unknown_opcode_is_fatal() {
    let (mut client_stream, server_stream) = UnixStream::pair().unwrap();
    server_stream.set_nonblocking(true).unwrap();
    client_stream
        .set_read_timeout(Some(std::time::Duration::from_secs(5)))
        .unwrap();

    let mut state = Compositor::new();
    let server: Backend<Compositor> = Backend::new().unwrap();
    create_globals(&server.handle(), 0);
    server.handle().insert_client(server_stream, Arc::new(())).unwrap();

    // wl_display (id 1), opcode 99, no arguments
    let mut raw = Vec::new();
    raw.extend_from_slice(&1u32.to_le_bytes());
    raw.extend_from_slice(&((8u32 << 16) | 99).to_le_bytes());
    client_stream.write_all(&raw).unwrap();

    let _ = server.dispatch_all_clients(&mut state);
    let _ = server.flush(None);

    // expect wl_display.error(object_id=1, code=invalid_method, ...)
    let mut header = [0u8; 8];
    client_stream.read_exact(&mut header).unwrap();
    let sender = u32::from_le_bytes(header[0..4].try_into().unwrap());
    let word = u32::from_le_bytes(header[4..8].try_into().unwrap());
    assert_eq!(sender, 1);
    assert_eq!(word & 0xFFFF, 0, "expected the error event");

    let len = (word >> 16) as usize - 8;
    let mut body = vec![0u8; len];
    client_stream.read_exact(&mut body).unwrap();
    let object_id = u32::from_le_bytes(body[0..4].try_into().unwrap());
    let code = u32::from_le_bytes(body[4..8].try_into().unwrap());
    assert_eq!(object_id, 1);
    assert_eq!(code, 1); // invalid method

    // the connection is closed afterwards
    let mut rest = Vec::new();
    let _ = client_stream.read_to_end(&mut rest);
}

// Connection::roundtrip and GlobalList against a live dispatch loop
#[test]
fn client_roundtrip_and_global_list() {
    let (client_stream, server_stream) = UnixStream::pair().unwrap();
    client_stream.set_nonblocking(true).unwrap();
    server_stream.set_nonblocking(true).unwrap();

    let mut state = Compositor::new();
    state.add_output(Output::new("TEST-1", 1920, 1080, 60_000));
    let server: Backend<Compositor> = Backend::new().unwrap();
    create_globals(&server.handle(), 1);
    server.handle().insert_client(server_stream, Arc::new(())).unwrap();

    let done = Arc::new(AtomicBool::new(false));
    let thread_done = done.clone();
    let client = std::thread::spawn(move || {
        let conn = waypost_client::Connection::from_stream(client_stream);
        let globals = waypost_client::GlobalList::new(&conn).unwrap();
        let compositor = globals.find("wl_compositor").expect("wl_compositor advertised");
        assert_eq!(compositor.version, 6);
        assert!(globals.find("wl_shm").is_some());
        assert!(globals.find("xdg_wm_base").is_some());

        let bound = globals
            .bind(&conn, &WL_COMPOSITOR_INTERFACE, 6, Arc::new(Ignore))
            .unwrap();
        let first = conn.roundtrip().unwrap();
        let second = conn.roundtrip().unwrap();
        assert!(second > first, "serials must increase");
        assert_eq!(conn.backend().info(bound).unwrap().interface.name, "wl_compositor");
        thread_done.store(true, Ordering::SeqCst);
    });

    while !done.load(Ordering::SeqCst) {
        let _ = server.dispatch_all_clients(&mut state);
        let _ = server.flush(None);
        std::thread::sleep(std::time::Duration::from_millis(1));
    }
    client.join().unwrap();
}

// the hit test and focus plumbing agree on surface-local coordinates
#[test]
fn surface_under_respects_input_region() {
    let mut fx = setup();
    let compositor = fx.bind(&WL_COMPOSITOR_INTERFACE, 6, Arc::new(Ignore));
    let shm = fx.bind(&WL_SHM_INTERFACE, 1, Arc::new(Ignore));
    let surface = fx.create_surface(&compositor);
    let buffer = fx.shm_buffer(&shm, Arc::new(ReleaseSink::default()));
    fx.pump();

    // restrict input to the left half
    let region = fx
        .client
        .send_request(
            message!(
                compositor.clone(),
                1,
                [Argument::NewId(wl_client::Backend::null_id())]
            ),
            Some(Arc::new(Ignore)),
            None,
        )
        .unwrap();
    fx.client
        .send_request(
            message!(
                region.clone(),
                1,
                [
                    Argument::Int(0),
                    Argument::Int(0),
                    Argument::Int(16),
                    Argument::Int(32),
                ]
            ),
            None,
            None,
        )
        .unwrap();
    fx.client
        .send_request(
            message!(surface.clone(), 5, [Argument::Object(region)]),
            None,
            None,
        )
        .unwrap();
    fx.client
        .send_request(
            message!(
                surface.clone(),
                1,
                [Argument::Object(buffer), Argument::Int(0), Argument::Int(0)]
            ),
            None,
            None,
        )
        .unwrap();
    fx.commit(&surface);
    fx.pump();

    assert!(fx.state.surface_under(8, 8).is_some());
    assert!(fx.state.surface_under(24, 8).is_none());
    let (_, local) = fx.state.surface_under(8, 8).unwrap();
    assert_eq!(local, Point::new(8, 8));
}
