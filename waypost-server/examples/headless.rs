//! A headless compositor: accepts clients, dispatches their requests and
//! presents frames through the null renderer at a fixed cadence.

use std::sync::Arc;
use std::time::{Duration, Instant};

use waypost_backend::server::Backend;
use waypost_server::globals::create_globals;
use waypost_server::output::Output;
use waypost_server::renderer::{NullRenderer, Renderer};
use waypost_server::socket::ListeningSocket;
use waypost_server::state::Compositor;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let mut state = Compositor::new();
    state.add_output(Output::new("HEADLESS-1", 1920, 1080, 60_000));

    let backend: Backend<Compositor> = Backend::new()?;
    let handle = backend.handle();
    create_globals(&handle, 1);

    let socket = ListeningSocket::bind_auto("wayland", 1..33)?;
    println!(
        "Running on WAYLAND_DISPLAY={}",
        socket.socket_name().unwrap().to_string_lossy()
    );

    let mut renderer = NullRenderer;
    let started = Instant::now();
    let frame_interval = Duration::from_millis(16);
    let mut next_frame = Instant::now() + frame_interval;

    loop {
        if let Some(stream) = socket.accept()? {
            handle.insert_client(stream, Arc::new(()))?;
        }

        backend.dispatch_all_clients(&mut state)?;

        if Instant::now() >= next_frame {
            next_frame += frame_interval;
            let elements = state.render_elements();
            renderer.render_frame(&elements)?;
            drop(elements);
            let time = started.elapsed().as_millis() as u32;
            state.frame_presented(&handle, time);
        }

        backend.flush(None)?;
        std::thread::sleep(Duration::from_millis(1));
    }
}
