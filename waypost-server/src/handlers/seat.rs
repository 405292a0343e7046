//! Handlers for `wl_seat` and its input devices

use std::ffi::CString;
use std::os::unix::io::{AsRawFd, OwnedFd};
use std::sync::Arc;

use waypost_backend::message;
use waypost_backend::protocol::{serial_is_newer_or_equal, Argument, Message};
use waypost_backend::server::{ClientId, ObjectData, ObjectId};
use waypost_protocols::enums::{Capability, KeymapFormat};

use crate::state::{Compositor, ServerHandle};
use crate::surface::Role;

// wl_seat.error.missing_capability
const SEAT_ERR_MISSING_CAPABILITY: u32 = 0;
// wl_pointer.error.role
const POINTER_ERR_ROLE: u32 = 0;

/// `wl_seat` requests
#[derive(Debug)]
pub struct SeatData;

impl ObjectData<Compositor> for SeatData {
    fn request(
        self: Arc<Self>,
        handle: &ServerHandle,
        data: &mut Compositor,
        _client_id: ClientId,
        msg: Message<ObjectId, OwnedFd>,
    ) -> Option<Arc<dyn ObjectData<Compositor>>> {
        let seat_id = msg.sender_id.clone();
        let require = |handle: &ServerHandle,
                       data: &Compositor,
                       capability: Capability,
                       name: &str|
         -> bool {
            if data.seat.has(capability) {
                true
            } else {
                handle.post_error(
                    seat_id.clone(),
                    SEAT_ERR_MISSING_CAPABILITY,
                    CString::new(format!("The seat has no {name} capability.")).unwrap(),
                );
                false
            }
        };
        match msg.opcode {
            // wl_seat.get_pointer(new id)
            0 => {
                if let [Argument::NewId(id)] = &msg.args[..] {
                    if !require(handle, data, Capability::POINTER, "pointer") {
                        return None;
                    }
                    data.pointers.push(id.clone());
                    Some(Arc::new(PointerData))
                } else {
                    unreachable!()
                }
            }
            // wl_seat.get_keyboard(new id)
            1 => {
                if let [Argument::NewId(id)] = &msg.args[..] {
                    if !require(handle, data, Capability::KEYBOARD, "keyboard") {
                        return None;
                    }
                    data.keyboards.push(id.clone());
                    send_keymap(handle, id.clone());
                    if let Ok(info) = handle.object_info(id.clone()) {
                        if info.version >= 4 {
                            // wl_keyboard.repeat_info
                            let _ = handle.send_event(message!(
                                id.clone(),
                                5,
                                [Argument::Int(25), Argument::Int(600)]
                            ));
                        }
                    }
                    Some(Arc::new(KeyboardData))
                } else {
                    unreachable!()
                }
            }
            // wl_seat.get_touch(new id)
            2 => {
                if let [Argument::NewId(id)] = &msg.args[..] {
                    if !require(handle, data, Capability::TOUCH, "touch") {
                        return None;
                    }
                    data.touches.push(id.clone());
                    Some(Arc::new(TouchData))
                } else {
                    unreachable!()
                }
            }
            // wl_seat.release
            3 => None,
            _ => unreachable!(),
        }
    }

    fn destroyed(
        self: Arc<Self>,
        _handle: &ServerHandle,
        data: &mut Compositor,
        _client_id: ClientId,
        object_id: ObjectId,
    ) {
        data.seat_resources.retain(|id| id != &object_id);
    }
}

// Transfer the keymap fd; with no xkb tables to offer, the format is
// no_keymap and the map is empty.
fn send_keymap(handle: &ServerHandle, keyboard: ObjectId) {
    let Ok(fd) = rustix::fs::memfd_create("waypost-keymap", rustix::fs::MemfdFlags::CLOEXEC)
    else {
        return;
    };
    // wl_keyboard.keymap
    let _ = handle.send_event(message!(
        keyboard,
        0,
        [
            Argument::Uint(KeymapFormat::NoKeymap.into()),
            Argument::Fd(fd.as_raw_fd()),
            Argument::Uint(0),
        ]
    ));
    // the backend dup-ed the fd into the send buffer; ours closes here
}

/// `wl_pointer` requests
#[derive(Debug)]
pub struct PointerData;

impl ObjectData<Compositor> for PointerData {
    fn request(
        self: Arc<Self>,
        handle: &ServerHandle,
        data: &mut Compositor,
        _client_id: ClientId,
        msg: Message<ObjectId, OwnedFd>,
    ) -> Option<Arc<dyn ObjectData<Compositor>>> {
        match msg.opcode {
            // wl_pointer.set_cursor(serial, surface, hotspot_x, hotspot_y)
            0 => {
                if let [Argument::Uint(serial), Argument::Object(surface), Argument::Int(_), Argument::Int(_)] =
                    &msg.args[..]
                {
                    if !serial_is_newer_or_equal(data.serials.last_serial(), *serial) {
                        log::debug!("Ignoring set_cursor with future serial {serial}");
                        return None;
                    }
                    if !surface.is_null() {
                        if let Some(state) = data.surfaces.get_mut(surface) {
                            let already_cursor = matches!(state.role(), Role::Cursor);
                            if !already_cursor && state.set_role(Role::Cursor).is_err() {
                                handle.post_error(
                                    msg.sender_id.clone(),
                                    POINTER_ERR_ROLE,
                                    CString::new(
                                        "The cursor surface already has another role.",
                                    )
                                    .unwrap(),
                                );
                            }
                        }
                    }
                    None
                } else {
                    unreachable!()
                }
            }
            // wl_pointer.release
            1 => None,
            _ => unreachable!(),
        }
    }

    fn destroyed(
        self: Arc<Self>,
        _handle: &ServerHandle,
        data: &mut Compositor,
        _client_id: ClientId,
        object_id: ObjectId,
    ) {
        data.pointers.retain(|id| id != &object_id);
    }
}

/// `wl_keyboard` requests
#[derive(Debug)]
pub struct KeyboardData;

impl ObjectData<Compositor> for KeyboardData {
    fn request(
        self: Arc<Self>,
        _handle: &ServerHandle,
        _data: &mut Compositor,
        _client_id: ClientId,
        msg: Message<ObjectId, OwnedFd>,
    ) -> Option<Arc<dyn ObjectData<Compositor>>> {
        match msg.opcode {
            // wl_keyboard.release
            0 => None,
            _ => unreachable!(),
        }
    }

    fn destroyed(
        self: Arc<Self>,
        _handle: &ServerHandle,
        data: &mut Compositor,
        _client_id: ClientId,
        object_id: ObjectId,
    ) {
        data.keyboards.retain(|id| id != &object_id);
    }
}

/// `wl_touch` requests
#[derive(Debug)]
pub struct TouchData;

impl ObjectData<Compositor> for TouchData {
    fn request(
        self: Arc<Self>,
        _handle: &ServerHandle,
        _data: &mut Compositor,
        _client_id: ClientId,
        msg: Message<ObjectId, OwnedFd>,
    ) -> Option<Arc<dyn ObjectData<Compositor>>> {
        match msg.opcode {
            // wl_touch.release
            0 => None,
            _ => unreachable!(),
        }
    }

    fn destroyed(
        self: Arc<Self>,
        _handle: &ServerHandle,
        data: &mut Compositor,
        _client_id: ClientId,
        object_id: ObjectId,
    ) {
        data.touches.retain(|id| id != &object_id);
    }
}
