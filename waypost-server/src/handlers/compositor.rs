//! Handlers for `wl_compositor`, `wl_surface`, `wl_region` and `wl_callback`

use std::ffi::CString;
use std::os::unix::io::OwnedFd;
use std::sync::Arc;

use waypost_backend::protocol::{Argument, Message};
use waypost_backend::server::{ClientId, ObjectData, ObjectId};
use waypost_protocols::enums::Transform;

use crate::geometry::{Point, Rectangle};
use crate::region::Region;
use crate::state::{Compositor, ServerHandle};
use crate::surface::Surface;
use crate::xdg::AckResult;

// wl_surface protocol error codes
const SURFACE_ERR_INVALID_SCALE: u32 = 0;
const SURFACE_ERR_INVALID_TRANSFORM: u32 = 1;
// xdg_surface protocol error codes
const XDG_SURFACE_ERR_UNCONFIGURED_BUFFER: u32 = 3;
const XDG_SURFACE_ERR_INVALID_SERIAL: u32 = 4;

/// `wl_compositor` requests
#[derive(Debug)]
pub struct CompositorData;

impl ObjectData<Compositor> for CompositorData {
    fn request(
        self: Arc<Self>,
        _handle: &ServerHandle,
        data: &mut Compositor,
        _client_id: ClientId,
        msg: Message<ObjectId, OwnedFd>,
    ) -> Option<Arc<dyn ObjectData<Compositor>>> {
        match msg.opcode {
            // wl_compositor.create_surface(new id wl_surface)
            0 => {
                if let [Argument::NewId(id)] = &msg.args[..] {
                    data.surfaces.insert(id.clone(), Surface::new());
                    data.scene.create_view(id.clone());
                    Some(Arc::new(SurfaceData))
                } else {
                    unreachable!()
                }
            }
            // wl_compositor.create_region(new id wl_region)
            1 => {
                if let [Argument::NewId(id)] = &msg.args[..] {
                    data.regions.insert(id.clone(), Region::new());
                    Some(Arc::new(RegionData))
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

/// `wl_surface` requests
#[derive(Debug)]
pub struct SurfaceData;

impl ObjectData<Compositor> for SurfaceData {
    fn request(
        self: Arc<Self>,
        handle: &ServerHandle,
        data: &mut Compositor,
        _client_id: ClientId,
        msg: Message<ObjectId, OwnedFd>,
    ) -> Option<Arc<dyn ObjectData<Compositor>>> {
        let surface_id = msg.sender_id.clone();
        match msg.opcode {
            // wl_surface.destroy
            0 => None,
            // wl_surface.attach(buffer, x, y)
            1 => {
                if let [Argument::Object(buffer), Argument::Int(x), Argument::Int(y)] =
                    &msg.args[..]
                {
                    let buffer = (!buffer.is_null()).then(|| buffer.clone());
                    if let Some(surface) = data.surfaces.get_mut(&surface_id) {
                        surface.attach(buffer, *x, *y);
                    }
                    None
                } else {
                    unreachable!()
                }
            }
            // wl_surface.damage(x, y, width, height)
            2 => {
                if let [Argument::Int(x), Argument::Int(y), Argument::Int(w), Argument::Int(h)] =
                    msg.args[..]
                {
                    if let Some(surface) = data.surfaces.get_mut(&surface_id) {
                        surface.damage(Rectangle::new(x, y, w, h));
                    }
                    None
                } else {
                    unreachable!()
                }
            }
            // wl_surface.frame(new id wl_callback)
            3 => {
                if let [Argument::NewId(callback)] = &msg.args[..] {
                    if let Some(surface) = data.surfaces.get_mut(&surface_id) {
                        surface.frame(callback.clone());
                    }
                    Some(Arc::new(CallbackData))
                } else {
                    unreachable!()
                }
            }
            // wl_surface.set_opaque_region(region) / set_input_region(region)
            4 | 5 => {
                if let [Argument::Object(region)] = &msg.args[..] {
                    let region_state = (!region.is_null())
                        .then(|| data.regions.get(region).cloned())
                        .flatten();
                    if let Some(surface) = data.surfaces.get_mut(&surface_id) {
                        if msg.opcode == 4 {
                            surface.pending.opaque_region = region_state;
                        } else {
                            surface.pending.input_region = region_state;
                        }
                    }
                    None
                } else {
                    unreachable!()
                }
            }
            // wl_surface.commit
            6 => {
                commit(handle, data, surface_id);
                None
            }
            // wl_surface.set_buffer_transform(transform)
            7 => {
                if let [Argument::Int(transform)] = msg.args[..] {
                    match Transform::try_from(transform as u32) {
                        Ok(transform) => {
                            if let Some(surface) = data.surfaces.get_mut(&surface_id) {
                                surface.pending.transform = transform;
                            }
                        }
                        Err(()) => handle.post_error(
                            surface_id,
                            SURFACE_ERR_INVALID_TRANSFORM,
                            CString::new(format!("Invalid buffer transform {transform}."))
                                .unwrap(),
                        ),
                    }
                    None
                } else {
                    unreachable!()
                }
            }
            // wl_surface.set_buffer_scale(scale)
            8 => {
                if let [Argument::Int(scale)] = msg.args[..] {
                    if scale <= 0 {
                        handle.post_error(
                            surface_id,
                            SURFACE_ERR_INVALID_SCALE,
                            CString::new(format!("Invalid buffer scale {scale}.")).unwrap(),
                        );
                    } else if let Some(surface) = data.surfaces.get_mut(&surface_id) {
                        surface.pending.scale = scale;
                    }
                    None
                } else {
                    unreachable!()
                }
            }
            // wl_surface.damage_buffer(x, y, width, height)
            9 => {
                if let [Argument::Int(x), Argument::Int(y), Argument::Int(w), Argument::Int(h)] =
                    msg.args[..]
                {
                    if let Some(surface) = data.surfaces.get_mut(&surface_id) {
                        surface.damage_buffer(Rectangle::new(x, y, w, h));
                    }
                    None
                } else {
                    unreachable!()
                }
            }
            // wl_surface.offset(x, y)
            10 => {
                if let [Argument::Int(x), Argument::Int(y)] = msg.args[..] {
                    if let Some(surface) = data.surfaces.get_mut(&surface_id) {
                        if let Some(attachment) = surface.pending.attachment.as_mut() {
                            attachment.offset = Point::new(x, y);
                        }
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
        handle: &ServerHandle,
        data: &mut Compositor,
        _client_id: ClientId,
        object_id: ObjectId,
    ) {
        data.destroy_surface(handle, &object_id);
    }
}

// Commit with the XDG gating in front: a surface that got a configure must
// have acknowledged one before a commit carrying a buffer is accepted.
fn commit(handle: &ServerHandle, data: &mut Compositor, surface_id: ObjectId) {
    let xdg_id = data
        .xdg_surfaces
        .iter()
        .find(|(_, x)| x.wl_surface == surface_id)
        .map(|(id, _)| id.clone());

    if let Some(xdg_id) = xdg_id.clone() {
        let has_buffer = data
            .surfaces
            .get(&surface_id)
            .map(|s| s.pending.attachment.is_some())
            .unwrap_or(false);
        let xdg = data.xdg_surfaces.get(&xdg_id).unwrap();
        // the initial commit must be empty, and later buffers require an
        // acknowledged configure
        if has_buffer && (!xdg.initial_commit_done || !xdg.serials.commit_allowed()) {
            handle.post_error(
                xdg_id,
                XDG_SURFACE_ERR_UNCONFIGURED_BUFFER,
                CString::new("Buffer committed before the configure was acknowledged.").unwrap(),
            );
            return;
        }
    }

    data.commit_surface(handle, surface_id.clone());

    // the first commit after role assignment triggers the initial configure
    if let Some(xdg_id) = xdg_id {
        let xdg = data.xdg_surfaces.get_mut(&xdg_id).unwrap();
        if !xdg.initial_commit_done {
            xdg.initial_commit_done = true;
            let role = data.surfaces.get(&surface_id).map(|s| s.role().clone());
            match role {
                Some(crate::surface::Role::XdgToplevel { toplevel }) => {
                    data.send_toplevel_configure(handle, toplevel);
                }
                Some(crate::surface::Role::XdgPopup { popup }) => {
                    data.send_popup_configure(handle, popup);
                }
                _ => {}
            }
        }
    }
}

/// `ack_configure` processing, shared with the xdg_surface handler
pub(crate) fn ack_configure(
    handle: &ServerHandle,
    data: &mut Compositor,
    xdg_id: ObjectId,
    serial: u32,
) {
    let Some(xdg) = data.xdg_surfaces.get_mut(&xdg_id) else { return };
    match xdg.serials.ack(serial) {
        AckResult::Acked | AckResult::Stale => {}
        AckResult::Unknown => handle.post_error(
            xdg_id,
            XDG_SURFACE_ERR_INVALID_SERIAL,
            CString::new(format!("Serial {serial} was never sent on this surface.")).unwrap(),
        ),
    }
}

/// `wl_region` requests
#[derive(Debug)]
pub struct RegionData;

impl ObjectData<Compositor> for RegionData {
    fn request(
        self: Arc<Self>,
        _handle: &ServerHandle,
        data: &mut Compositor,
        _client_id: ClientId,
        msg: Message<ObjectId, OwnedFd>,
    ) -> Option<Arc<dyn ObjectData<Compositor>>> {
        match msg.opcode {
            // wl_region.destroy
            0 => None,
            // wl_region.add / wl_region.subtract
            1 | 2 => {
                if let [Argument::Int(x), Argument::Int(y), Argument::Int(w), Argument::Int(h)] =
                    msg.args[..]
                {
                    if let Some(region) = data.regions.get_mut(&msg.sender_id) {
                        let rect = Rectangle::new(x, y, w, h);
                        if msg.opcode == 1 {
                            region.add(rect);
                        } else {
                            region.subtract(rect);
                        }
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
        data.regions.remove(&object_id);
    }
}

/// `wl_callback` has no requests; its `done` event is sent by the
/// compositor when the frame it was registered for is presented.
#[derive(Debug)]
pub struct CallbackData;

impl ObjectData<Compositor> for CallbackData {
    fn request(
        self: Arc<Self>,
        _handle: &ServerHandle,
        _data: &mut Compositor,
        _client_id: ClientId,
        _msg: Message<ObjectId, OwnedFd>,
    ) -> Option<Arc<dyn ObjectData<Compositor>>> {
        unreachable!()
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
