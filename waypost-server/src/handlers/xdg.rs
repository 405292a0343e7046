//! Handlers for the XDG shell family

use std::ffi::CString;
use std::os::unix::io::OwnedFd;
use std::sync::Arc;

use waypost_backend::message;
use waypost_backend::protocol::{serial_is_newer_or_equal, Argument, Message};
use waypost_backend::server::{ClientId, ObjectData, ObjectId};
use waypost_protocols::enums::{ToplevelState, XdgWmBaseError};

use crate::geometry::{Rectangle, Size};
use crate::state::{Compositor, ServerHandle};
use crate::surface::Role;
use crate::xdg::{Anchor, Popup, Positioner, Toplevel, XdgSurface};

// xdg_positioner.error.invalid_input
const POSITIONER_ERR_INVALID_INPUT: u32 = 0;
// xdg_popup.error.invalid_grab
const POPUP_ERR_INVALID_GRAB: u32 = 0;
// xdg_toplevel.error.invalid_size
const TOPLEVEL_ERR_INVALID_SIZE: u32 = 2;

fn serial_is_current(data: &Compositor, serial: u32) -> bool {
    serial_is_newer_or_equal(data.serials.last_serial(), serial)
}

/// `xdg_wm_base` requests
#[derive(Debug)]
pub struct XdgWmBaseData;

impl ObjectData<Compositor> for XdgWmBaseData {
    fn request(
        self: Arc<Self>,
        handle: &ServerHandle,
        data: &mut Compositor,
        _client_id: ClientId,
        msg: Message<ObjectId, OwnedFd>,
    ) -> Option<Arc<dyn ObjectData<Compositor>>> {
        match msg.opcode {
            // xdg_wm_base.destroy
            0 => None,
            // xdg_wm_base.create_positioner(new id)
            1 => {
                if let [Argument::NewId(id)] = &msg.args[..] {
                    data.positioners.insert(id.clone(), Positioner::default());
                    Some(Arc::new(XdgPositionerData))
                } else {
                    unreachable!()
                }
            }
            // xdg_wm_base.get_xdg_surface(new id, wl_surface)
            2 => {
                if let [Argument::NewId(id), Argument::Object(surface)] = &msg.args[..] {
                    if data.xdg_surfaces.values().any(|x| &x.wl_surface == surface) {
                        handle.post_error(
                            msg.sender_id.clone(),
                            XdgWmBaseError::Role.into(),
                            CString::new("The surface already has an xdg_surface.").unwrap(),
                        );
                        return None;
                    }
                    data.xdg_surfaces.insert(id.clone(), XdgSurface::new(surface.clone()));
                    Some(Arc::new(XdgSurfaceData))
                } else {
                    unreachable!()
                }
            }
            // xdg_wm_base.pong(serial)
            3 => {
                if let [Argument::Uint(serial)] = msg.args[..] {
                    data.pings.retain(|&s| s != serial);
                    None
                } else {
                    unreachable!()
                }
            }
            _ => unreachable!(),
        }
    }

    fn destroyed(
        self: Arc<Self>,
        _handle: &ServerHandle,
        _data: &mut Compositor,
        _client_id: ClientId,
        _object_id: ObjectId,
    ) {
    }
}

/// `xdg_positioner` requests
#[derive(Debug)]
pub struct XdgPositionerData;

impl ObjectData<Compositor> for XdgPositionerData {
    fn request(
        self: Arc<Self>,
        handle: &ServerHandle,
        data: &mut Compositor,
        _client_id: ClientId,
        msg: Message<ObjectId, OwnedFd>,
    ) -> Option<Arc<dyn ObjectData<Compositor>>> {
        let id = msg.sender_id.clone();
        let invalid_input = |handle: &ServerHandle, what: &str| {
            handle.post_error(
                id.clone(),
                POSITIONER_ERR_INVALID_INPUT,
                CString::new(format!("Invalid {what}.")).unwrap(),
            );
        };
        match msg.opcode {
            // xdg_positioner.destroy
            0 => return None,
            // xdg_positioner.set_size(width, height)
            1 => {
                if let [Argument::Int(w), Argument::Int(h)] = msg.args[..] {
                    if w <= 0 || h <= 0 {
                        invalid_input(handle, "size");
                    } else if let Some(p) = data.positioners.get_mut(&id) {
                        p.size = Size::new(w, h);
                    }
                }
            }
            // xdg_positioner.set_anchor_rect(x, y, width, height)
            2 => {
                if let [Argument::Int(x), Argument::Int(y), Argument::Int(w), Argument::Int(h)] =
                    msg.args[..]
                {
                    if w < 0 || h < 0 {
                        invalid_input(handle, "anchor rect");
                    } else if let Some(p) = data.positioners.get_mut(&id) {
                        p.anchor_rect = Rectangle::new(x, y, w, h);
                    }
                }
            }
            // xdg_positioner.set_anchor(anchor)
            3 => {
                if let [Argument::Uint(anchor)] = msg.args[..] {
                    match Anchor::from_wire(anchor) {
                        Some(anchor) => {
                            if let Some(p) = data.positioners.get_mut(&id) {
                                p.anchor = anchor;
                            }
                        }
                        None => invalid_input(handle, "anchor"),
                    }
                }
            }
            // xdg_positioner.set_gravity(gravity)
            4 => {
                if let [Argument::Uint(gravity)] = msg.args[..] {
                    match Anchor::from_wire(gravity) {
                        Some(gravity) => {
                            if let Some(p) = data.positioners.get_mut(&id) {
                                p.gravity = gravity;
                            }
                        }
                        None => invalid_input(handle, "gravity"),
                    }
                }
            }
            // xdg_positioner.set_constraint_adjustment(adjustment)
            5 => {
                if let [Argument::Uint(adjustment)] = msg.args[..] {
                    if let Some(p) = data.positioners.get_mut(&id) {
                        p.constraint_adjustment = adjustment;
                    }
                }
            }
            // xdg_positioner.set_offset(x, y)
            6 => {
                if let [Argument::Int(x), Argument::Int(y)] = msg.args[..] {
                    if let Some(p) = data.positioners.get_mut(&id) {
                        p.offset = (x, y);
                    }
                }
            }
            // xdg_positioner.set_reactive
            7 => {
                if let Some(p) = data.positioners.get_mut(&id) {
                    p.reactive = true;
                }
            }
            // xdg_positioner.set_parent_size(width, height)
            8 => {
                if let [Argument::Int(w), Argument::Int(h)] = msg.args[..] {
                    if let Some(p) = data.positioners.get_mut(&id) {
                        p.parent_size = Some(Size::new(w, h));
                    }
                }
            }
            // xdg_positioner.set_parent_configure(serial)
            9 => {
                if let [Argument::Uint(serial)] = msg.args[..] {
                    if let Some(p) = data.positioners.get_mut(&id) {
                        p.parent_configure = Some(serial);
                    }
                }
            }
            _ => unreachable!(),
        }
        None
    }

    fn destroyed(
        self: Arc<Self>,
        _handle: &ServerHandle,
        data: &mut Compositor,
        _client_id: ClientId,
        object_id: ObjectId,
    ) {
        data.positioners.remove(&object_id);
    }
}

/// `xdg_surface` requests
#[derive(Debug)]
pub struct XdgSurfaceData;

impl ObjectData<Compositor> for XdgSurfaceData {
    fn request(
        self: Arc<Self>,
        handle: &ServerHandle,
        data: &mut Compositor,
        _client_id: ClientId,
        msg: Message<ObjectId, OwnedFd>,
    ) -> Option<Arc<dyn ObjectData<Compositor>>> {
        let xdg_id = msg.sender_id.clone();
        match msg.opcode {
            // xdg_surface.destroy
            0 => None,
            // xdg_surface.get_toplevel(new id)
            1 => {
                if let [Argument::NewId(toplevel_id)] = &msg.args[..] {
                    let wl_surface = data.xdg_surfaces.get(&xdg_id).map(|x| x.wl_surface.clone());
                    let Some(surface) =
                        wl_surface.and_then(|id| data.surfaces.get_mut(&id))
                    else {
                        handle.post_error(
                            xdg_id,
                            XdgWmBaseError::DefunctSurfaces.into(),
                            CString::new("The underlying wl_surface is gone.").unwrap(),
                        );
                        return None;
                    };
                    if surface
                        .set_role(Role::XdgToplevel { toplevel: toplevel_id.clone() })
                        .is_err()
                    {
                        handle.post_error(
                            xdg_id,
                            XdgWmBaseError::Role.into(),
                            CString::new("The surface already has a role.").unwrap(),
                        );
                        return None;
                    }
                    data.toplevels.insert(toplevel_id.clone(), Toplevel::new(xdg_id));
                    Some(Arc::new(XdgToplevelData))
                } else {
                    unreachable!()
                }
            }
            // xdg_surface.get_popup(new id, parent, positioner)
            2 => {
                if let [Argument::NewId(popup_id), Argument::Object(parent), Argument::Object(positioner)] =
                    &msg.args[..]
                {
                    let Some(rules) = data.positioners.get(positioner).copied() else {
                        handle.post_error(
                            positioner.clone(),
                            POSITIONER_ERR_INVALID_INPUT,
                            CString::new("Unknown positioner.").unwrap(),
                        );
                        return None;
                    };
                    if !rules.is_complete() {
                        handle.post_error(
                            positioner.clone(),
                            POSITIONER_ERR_INVALID_INPUT,
                            CString::new("The positioner is incomplete.").unwrap(),
                        );
                        return None;
                    }
                    let wl_surface = data.xdg_surfaces.get(&xdg_id).map(|x| x.wl_surface.clone());
                    let Some(surface) =
                        wl_surface.and_then(|id| data.surfaces.get_mut(&id))
                    else {
                        handle.post_error(
                            xdg_id,
                            XdgWmBaseError::DefunctSurfaces.into(),
                            CString::new("The underlying wl_surface is gone.").unwrap(),
                        );
                        return None;
                    };
                    if surface.set_role(Role::XdgPopup { popup: popup_id.clone() }).is_err() {
                        handle.post_error(
                            xdg_id,
                            XdgWmBaseError::Role.into(),
                            CString::new("The surface already has a role.").unwrap(),
                        );
                        return None;
                    }
                    let parent = (!parent.is_null()).then(|| parent.clone());
                    data.popups
                        .insert(popup_id.clone(), Popup::new(xdg_id, parent, rules));
                    Some(Arc::new(XdgPopupData))
                } else {
                    unreachable!()
                }
            }
            // xdg_surface.set_window_geometry(x, y, width, height)
            3 => {
                if let [Argument::Int(x), Argument::Int(y), Argument::Int(w), Argument::Int(h)] =
                    msg.args[..]
                {
                    if let Some(xdg) = data.xdg_surfaces.get_mut(&xdg_id) {
                        xdg.window_geometry = Some(Rectangle::new(x, y, w, h));
                    }
                    None
                } else {
                    unreachable!()
                }
            }
            // xdg_surface.ack_configure(serial)
            4 => {
                if let [Argument::Uint(serial)] = msg.args[..] {
                    super::compositor::ack_configure(handle, data, xdg_id, serial);
                    None
                } else {
                    unreachable!()
                }
            }
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
        data.xdg_surfaces.remove(&object_id);
    }
}

/// `xdg_toplevel` requests
#[derive(Debug)]
pub struct XdgToplevelData;

impl ObjectData<Compositor> for XdgToplevelData {
    fn request(
        self: Arc<Self>,
        handle: &ServerHandle,
        data: &mut Compositor,
        _client_id: ClientId,
        msg: Message<ObjectId, OwnedFd>,
    ) -> Option<Arc<dyn ObjectData<Compositor>>> {
        let id = msg.sender_id.clone();
        match msg.opcode {
            // xdg_toplevel.destroy
            0 => return None,
            // xdg_toplevel.set_parent(parent)
            1 => {
                if let [Argument::Object(parent)] = &msg.args[..] {
                    if let Some(toplevel) = data.toplevels.get_mut(&id) {
                        toplevel.parent = (!parent.is_null()).then(|| parent.clone());
                    }
                }
            }
            // xdg_toplevel.set_title(title)
            2 => {
                if let [Argument::Str(Some(title))] = &msg.args[..] {
                    if let Some(toplevel) = data.toplevels.get_mut(&id) {
                        toplevel.title = title.to_string_lossy().into_owned();
                    }
                }
            }
            // xdg_toplevel.set_app_id(app_id)
            3 => {
                if let [Argument::Str(Some(app_id))] = &msg.args[..] {
                    if let Some(toplevel) = data.toplevels.get_mut(&id) {
                        toplevel.app_id = app_id.to_string_lossy().into_owned();
                    }
                }
            }
            // xdg_toplevel.show_window_menu(seat, serial, x, y)
            4 => {
                if let [Argument::Object(_), Argument::Uint(serial), Argument::Int(_), Argument::Int(_)] =
                    msg.args[..]
                {
                    if !serial_is_current(data, serial) {
                        log::debug!("Ignoring show_window_menu with stale serial {serial}");
                    }
                }
            }
            // xdg_toplevel.move(seat, serial)
            5 => {
                if let [Argument::Object(_), Argument::Uint(serial)] = &msg.args[..] {
                    if serial_is_current(data, *serial) {
                        log::debug!("Interactive move requested on {id}");
                    }
                }
            }
            // xdg_toplevel.resize(seat, serial, edges)
            6 => {
                if let [Argument::Object(_), Argument::Uint(serial), Argument::Uint(_edges)] =
                    &msg.args[..]
                {
                    if serial_is_current(data, *serial) {
                        if let Some(toplevel) = data.toplevels.get_mut(&id) {
                            toplevel.states.insert(ToplevelState::Resizing);
                        }
                        data.send_toplevel_configure(handle, id.clone());
                    }
                }
            }
            // xdg_toplevel.set_max_size(width, height)
            7 => {
                if let [Argument::Int(w), Argument::Int(h)] = msg.args[..] {
                    if w < 0 || h < 0 {
                        handle.post_error(
                            id.clone(),
                            TOPLEVEL_ERR_INVALID_SIZE,
                            CString::new("Negative max size.").unwrap(),
                        );
                    } else if let Some(toplevel) = data.toplevels.get_mut(&id) {
                        toplevel.max_size = Size::new(w, h);
                    }
                }
            }
            // xdg_toplevel.set_min_size(width, height)
            8 => {
                if let [Argument::Int(w), Argument::Int(h)] = msg.args[..] {
                    if w < 0 || h < 0 {
                        handle.post_error(
                            id.clone(),
                            TOPLEVEL_ERR_INVALID_SIZE,
                            CString::new("Negative min size.").unwrap(),
                        );
                    } else if let Some(toplevel) = data.toplevels.get_mut(&id) {
                        toplevel.min_size = Size::new(w, h);
                    }
                }
            }
            // xdg_toplevel.set_maximized / unset_maximized
            9 | 10 => {
                if let Some(toplevel) = data.toplevels.get_mut(&id) {
                    if msg.opcode == 9 {
                        toplevel.states.insert(ToplevelState::Maximized);
                        toplevel.pending_size = data
                            .outputs
                            .first()
                            .map(|e| e.output.geometry())
                            .map(|g| Size::new(g.width, g.height));
                    } else {
                        toplevel.states.remove(&ToplevelState::Maximized);
                        toplevel.pending_size = None;
                    }
                }
                data.send_toplevel_configure(handle, id.clone());
            }
            // xdg_toplevel.set_fullscreen(output) / unset_fullscreen
            11 | 12 => {
                if let Some(toplevel) = data.toplevels.get_mut(&id) {
                    if msg.opcode == 11 {
                        toplevel.states.insert(ToplevelState::Fullscreen);
                        toplevel.pending_size = data
                            .outputs
                            .first()
                            .map(|e| e.output.geometry())
                            .map(|g| Size::new(g.width, g.height));
                    } else {
                        toplevel.states.remove(&ToplevelState::Fullscreen);
                        toplevel.pending_size = None;
                    }
                }
                data.send_toplevel_configure(handle, id.clone());
            }
            // xdg_toplevel.set_minimized
            13 => {
                if let Some(toplevel) = data.toplevels.get_mut(&id) {
                    toplevel.states.insert(ToplevelState::Suspended);
                }
                data.send_toplevel_configure(handle, id.clone());
            }
            _ => unreachable!(),
        }
        None
    }

    fn destroyed(
        self: Arc<Self>,
        _handle: &ServerHandle,
        data: &mut Compositor,
        _client_id: ClientId,
        object_id: ObjectId,
    ) {
        data.toplevels.remove(&object_id);
    }
}

/// `xdg_popup` requests
#[derive(Debug)]
pub struct XdgPopupData;

impl ObjectData<Compositor> for XdgPopupData {
    fn request(
        self: Arc<Self>,
        handle: &ServerHandle,
        data: &mut Compositor,
        _client_id: ClientId,
        msg: Message<ObjectId, OwnedFd>,
    ) -> Option<Arc<dyn ObjectData<Compositor>>> {
        let id = msg.sender_id.clone();
        match msg.opcode {
            // xdg_popup.destroy
            0 => None,
            // xdg_popup.grab(seat, serial)
            1 => {
                if let [Argument::Object(_), Argument::Uint(serial)] = &msg.args[..] {
                    if serial_is_current(data, *serial) {
                        if let Some(popup) = data.popups.get_mut(&id) {
                            popup.grabbed = true;
                        }
                    } else {
                        handle.post_error(
                            id,
                            POPUP_ERR_INVALID_GRAB,
                            CString::new("Grab requested with an invalid serial.").unwrap(),
                        );
                    }
                    None
                } else {
                    unreachable!()
                }
            }
            // xdg_popup.reposition(positioner, token)
            2 => {
                if let [Argument::Object(positioner), Argument::Uint(token)] = &msg.args[..] {
                    if let Some(rules) = data.positioners.get(positioner).copied() {
                        if let Some(popup) = data.popups.get_mut(&id) {
                            popup.positioner = rules;
                        }
                        // xdg_popup.repositioned, then the new configure
                        let _ = handle
                            .send_event(message!(id.clone(), 2, [Argument::Uint(*token)]));
                        data.send_popup_configure(handle, id);
                    }
                    None
                } else {
                    unreachable!()
                }
            }
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
        data.popups.remove(&object_id);
    }
}
