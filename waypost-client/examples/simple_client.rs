//! A minimal client: bind the compositor, create a surface, commit it
//! empty and round-trip once.

use std::sync::Arc;

use waypost_backend::message;
use waypost_backend::protocol::Argument;
use waypost_client::{Backend, Connection, DumbObjectData, GlobalList};
use waypost_protocols::core::WL_COMPOSITOR_INTERFACE;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let conn = Connection::connect_to_env()?;
    let globals = GlobalList::new(&conn)?;

    let compositor = globals.bind(&conn, &WL_COMPOSITOR_INTERFACE, 6, Arc::new(DumbObjectData))?;
    println!("Bound {compositor}");

    // wl_compositor.create_surface
    let surface = conn.backend().send_request(
        message!(compositor, 0, [Argument::NewId(Backend::null_id())]),
        Some(Arc::new(DumbObjectData)),
        None,
    )?;
    // an empty commit leaves the surface unmapped, but proves the plumbing
    conn.backend().send_request(message!(surface.clone(), 6, []), None, None)?;

    let serial = conn.roundtrip()?;
    println!("Created {surface}, server answered sync with serial {serial}");
    Ok(())
}
