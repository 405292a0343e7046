//! Connect to the compositor from the environment and print the globals it
//! advertises.

use waypost_client::{Connection, GlobalList};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let conn = Connection::connect_to_env()?;
    let globals = GlobalList::new(&conn)?;

    println!("Available globals:");
    for global in globals.contents() {
        println!("    [{}] {} (v{})", global.name, global.interface, global.version);
    }
    Ok(())
}
