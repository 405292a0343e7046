//! Wire tracing controlled by the `WAYLAND_DEBUG` env variable.

use std::{
    fmt::Display,
    os::unix::io::AsRawFd,
    time::{SystemTime, UNIX_EPOCH},
};

use crate::protocol::Argument;

/// Whether `WAYLAND_DEBUG` asks for client-side tracing.
pub fn has_debug_client_env() -> bool {
    matches!(std::env::var_os("WAYLAND_DEBUG"), Some(str) if str == "1" || str == "client")
}

/// Whether `WAYLAND_DEBUG` asks for server-side tracing.
pub fn has_debug_server_env() -> bool {
    matches!(std::env::var_os("WAYLAND_DEBUG"), Some(str) if str == "1" || str == "server")
}

/// Print an inbound message to stderr:
///
/// `[timestamp] <- interface@id.msg_name(args)`
pub fn print_dispatched_message<Id: Display, Fd: AsRawFd>(
    interface: &str,
    id: u32,
    msg_name: &str,
    args: &[Argument<Id, Fd>],
) {
    print_timestamp();
    eprintln!(" <- {}@{}.{}({})", interface, id, msg_name, DisplaySlice(args));
}

/// Print an outbound message to stderr:
///
/// `[timestamp] -> interface@id.msg_name(args)`
pub fn print_send_message<Id: Display, Fd: AsRawFd>(
    interface: &str,
    id: u32,
    msg_name: &str,
    args: &[Argument<Id, Fd>],
    discarded: bool,
) {
    print_timestamp();
    if discarded {
        eprint!("[discarded]");
    }
    eprintln!(" -> {}@{}.{}({})", interface, id, msg_name, DisplaySlice(args));
}

pub(crate) struct DisplaySlice<'a, D>(pub &'a [D]);

impl<D: Display> Display for DisplaySlice<'_, D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut it = self.0.iter();
        if let Some(val) = it.next() {
            write!(f, "{val}")?;
        }
        for val in it {
            write!(f, ", {val}")?;
        }
        Ok(())
    }
}

// seconds.microseconds, as the usual tracer format
fn print_timestamp() {
    if let Ok(timestamp) = SystemTime::now().duration_since(UNIX_EPOCH) {
        let time = (timestamp.as_secs() * 1000000 + timestamp.subsec_nanos() as u64 / 1000) as u32;
        eprint!("[{:7}.{:03}]", time / 1000, time % 1000);
    }
}
