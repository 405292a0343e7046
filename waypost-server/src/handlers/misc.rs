//! Handlers for viewporter, fractional scale, activation and tablets

use std::ffi::CString;
use std::os::unix::io::OwnedFd;
use std::sync::Arc;

use waypost_backend::protocol::{Argument, Fixed, Message};
use waypost_backend::server::{ClientId, ObjectData, ObjectId};
use waypost_protocols::enums::ViewportError;

use crate::geometry::Size;
use crate::state::{ActivationToken, Compositor, ServerHandle};

// wp_viewporter.error.viewport_exists
const VIEWPORTER_ERR_EXISTS: u32 = 0;
// wp_fractional_scale_manager_v1.error.fractional_scale_exists
const FRACTIONAL_ERR_EXISTS: u32 = 0;
// xdg_activation_token_v1.error.already_used
const TOKEN_ERR_ALREADY_USED: u32 = 0;

/// `wp_viewporter` requests
#[derive(Debug)]
pub struct ViewporterData;

impl ObjectData<Compositor> for ViewporterData {
    fn request(
        self: Arc<Self>,
        handle: &ServerHandle,
        data: &mut Compositor,
        _client_id: ClientId,
        msg: Message<ObjectId, OwnedFd>,
    ) -> Option<Arc<dyn ObjectData<Compositor>>> {
        match msg.opcode {
            // wp_viewporter.destroy
            0 => None,
            // wp_viewporter.get_viewport(new id, surface)
            1 => {
                if let [Argument::NewId(id), Argument::Object(surface)] = &msg.args[..] {
                    if data.viewports.values().any(|s| s == surface) {
                        handle.post_error(
                            msg.sender_id.clone(),
                            VIEWPORTER_ERR_EXISTS,
                            CString::new("The surface already has a viewport.").unwrap(),
                        );
                        return None;
                    }
                    data.viewports.insert(id.clone(), surface.clone());
                    Some(Arc::new(ViewportData))
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

/// `wp_viewport` requests
#[derive(Debug)]
pub struct ViewportData;

impl ObjectData<Compositor> for ViewportData {
    fn request(
        self: Arc<Self>,
        handle: &ServerHandle,
        data: &mut Compositor,
        _client_id: ClientId,
        msg: Message<ObjectId, OwnedFd>,
    ) -> Option<Arc<dyn ObjectData<Compositor>>> {
        let id = msg.sender_id.clone();
        let surface_id = data.viewports.get(&id).cloned();
        match msg.opcode {
            // wp_viewport.destroy
            0 => None,
            // wp_viewport.set_source(x, y, width, height)
            1 => {
                if let [Argument::Fixed(x), Argument::Fixed(y), Argument::Fixed(w), Argument::Fixed(h)] =
                    msg.args[..]
                {
                    let (x, y, w, h) =
                        (Fixed(x).to_f64(), Fixed(y).to_f64(), Fixed(w).to_f64(), Fixed(h).to_f64());
                    let unset = x == -1.0 && y == -1.0 && w == -1.0 && h == -1.0;
                    if !unset && (w <= 0.0 || h <= 0.0 || x < 0.0 || y < 0.0) {
                        handle.post_error(
                            id,
                            ViewportError::BadValue.into(),
                            CString::new("Invalid source rectangle.").unwrap(),
                        );
                        return None;
                    }
                    if let Some(surface) =
                        surface_id.and_then(|sid| data.surfaces.get_mut(&sid))
                    {
                        surface.pending.viewport.src =
                            (!unset).then_some((x, y, w, h));
                    }
                    None
                } else {
                    unreachable!()
                }
            }
            // wp_viewport.set_destination(width, height)
            2 => {
                if let [Argument::Int(w), Argument::Int(h)] = msg.args[..] {
                    let unset = w == -1 && h == -1;
                    if !unset && (w <= 0 || h <= 0) {
                        handle.post_error(
                            id,
                            ViewportError::BadValue.into(),
                            CString::new("Invalid destination size.").unwrap(),
                        );
                        return None;
                    }
                    if let Some(surface) =
                        surface_id.and_then(|sid| data.surfaces.get_mut(&sid))
                    {
                        surface.pending.viewport.dst = (!unset).then_some(Size::new(w, h));
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
        if let Some(surface_id) = data.viewports.remove(&object_id) {
            if let Some(surface) = data.surfaces.get_mut(&surface_id) {
                surface.pending.viewport = Default::default();
            }
        }
    }
}

/// `wp_fractional_scale_manager_v1` requests
#[derive(Debug)]
pub struct FractionalScaleManagerData;

impl ObjectData<Compositor> for FractionalScaleManagerData {
    fn request(
        self: Arc<Self>,
        handle: &ServerHandle,
        data: &mut Compositor,
        _client_id: ClientId,
        msg: Message<ObjectId, OwnedFd>,
    ) -> Option<Arc<dyn ObjectData<Compositor>>> {
        match msg.opcode {
            // wp_fractional_scale_manager_v1.destroy
            0 => None,
            // wp_fractional_scale_manager_v1.get_fractional_scale(new id, surface)
            1 => {
                if let [Argument::NewId(id), Argument::Object(surface)] = &msg.args[..] {
                    if data.fractional_scales.contains_key(surface) {
                        handle.post_error(
                            msg.sender_id.clone(),
                            FRACTIONAL_ERR_EXISTS,
                            CString::new("The surface already has a fractional scale object.")
                                .unwrap(),
                        );
                        return None;
                    }
                    data.fractional_scales.insert(surface.clone(), id.clone());
                    data.send_preferred_scale(handle, surface.clone());
                    Some(Arc::new(FractionalScaleData))
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

/// `wp_fractional_scale_v1` requests
#[derive(Debug)]
pub struct FractionalScaleData;

impl ObjectData<Compositor> for FractionalScaleData {
    fn request(
        self: Arc<Self>,
        _handle: &ServerHandle,
        _data: &mut Compositor,
        _client_id: ClientId,
        msg: Message<ObjectId, OwnedFd>,
    ) -> Option<Arc<dyn ObjectData<Compositor>>> {
        match msg.opcode {
            // wp_fractional_scale_v1.destroy
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
        data.fractional_scales.retain(|_, v| v != &object_id);
    }
}

/// `xdg_activation_v1` requests
#[derive(Debug)]
pub struct ActivationData;

impl ObjectData<Compositor> for ActivationData {
    fn request(
        self: Arc<Self>,
        handle: &ServerHandle,
        data: &mut Compositor,
        _client_id: ClientId,
        msg: Message<ObjectId, OwnedFd>,
    ) -> Option<Arc<dyn ObjectData<Compositor>>> {
        match msg.opcode {
            // xdg_activation_v1.destroy
            0 => None,
            // xdg_activation_v1.get_activation_token(new id)
            1 => {
                if let [Argument::NewId(id)] = &msg.args[..] {
                    data.pending_tokens.insert(id.clone(), ActivationToken::default());
                    Some(Arc::new(TokenData))
                } else {
                    unreachable!()
                }
            }
            // xdg_activation_v1.activate(token, surface)
            2 => {
                if let [Argument::Str(Some(token)), Argument::Object(surface)] = &msg.args[..] {
                    let token = token.to_string_lossy().into_owned();
                    data.activate(handle, &token, surface.clone());
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

/// `xdg_activation_token_v1` requests
#[derive(Debug)]
pub struct TokenData;

impl ObjectData<Compositor> for TokenData {
    fn request(
        self: Arc<Self>,
        handle: &ServerHandle,
        data: &mut Compositor,
        _client_id: ClientId,
        msg: Message<ObjectId, OwnedFd>,
    ) -> Option<Arc<dyn ObjectData<Compositor>>> {
        let id = msg.sender_id.clone();
        match msg.opcode {
            // xdg_activation_token_v1.set_serial(serial, seat)
            0 => {
                if let [Argument::Uint(serial), Argument::Object(_)] = &msg.args[..] {
                    if let Some(token) = data.pending_tokens.get_mut(&id) {
                        token.serial = Some(*serial);
                    }
                }
                None
            }
            // xdg_activation_token_v1.set_app_id(app_id)
            1 => {
                if let [Argument::Str(Some(app_id))] = &msg.args[..] {
                    if let Some(token) = data.pending_tokens.get_mut(&id) {
                        token.app_id = Some(app_id.to_string_lossy().into_owned());
                    }
                }
                None
            }
            // xdg_activation_token_v1.set_surface(surface)
            2 => {
                if let [Argument::Object(surface)] = &msg.args[..] {
                    if let Some(token) = data.pending_tokens.get_mut(&id) {
                        token.surface = Some(surface.clone());
                    }
                }
                None
            }
            // xdg_activation_token_v1.commit
            3 => {
                if data.commit_activation_token(handle, id.clone()).is_none() {
                    handle.post_error(
                        id,
                        TOKEN_ERR_ALREADY_USED,
                        CString::new("The token was already committed.").unwrap(),
                    );
                }
                None
            }
            // xdg_activation_token_v1.destroy
            4 => None,
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
        data.pending_tokens.remove(&object_id);
    }
}

/// `zwp_tablet_manager_v2` requests
#[derive(Debug)]
pub struct TabletManagerData;

impl ObjectData<Compositor> for TabletManagerData {
    fn request(
        self: Arc<Self>,
        _handle: &ServerHandle,
        data: &mut Compositor,
        _client_id: ClientId,
        msg: Message<ObjectId, OwnedFd>,
    ) -> Option<Arc<dyn ObjectData<Compositor>>> {
        match msg.opcode {
            // zwp_tablet_manager_v2.get_tablet_seat(new id, seat)
            0 => {
                if let [Argument::NewId(id), Argument::Object(_seat)] = &msg.args[..] {
                    data.tablet_seats.push(id.clone());
                    Some(Arc::new(TabletSeatData))
                } else {
                    unreachable!()
                }
            }
            // zwp_tablet_manager_v2.destroy
            1 => None,
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

/// `zwp_tablet_seat_v2` requests
#[derive(Debug)]
pub struct TabletSeatData;

impl ObjectData<Compositor> for TabletSeatData {
    fn request(
        self: Arc<Self>,
        _handle: &ServerHandle,
        _data: &mut Compositor,
        _client_id: ClientId,
        msg: Message<ObjectId, OwnedFd>,
    ) -> Option<Arc<dyn ObjectData<Compositor>>> {
        match msg.opcode {
            // zwp_tablet_seat_v2.destroy
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
        data.tablet_seats.retain(|id| id != &object_id);
    }
}

/// `zwp_tablet_v2` requests; the object is server-created when hardware
/// appears
#[derive(Debug)]
pub struct TabletData;

impl ObjectData<Compositor> for TabletData {
    fn request(
        self: Arc<Self>,
        _handle: &ServerHandle,
        _data: &mut Compositor,
        _client_id: ClientId,
        msg: Message<ObjectId, OwnedFd>,
    ) -> Option<Arc<dyn ObjectData<Compositor>>> {
        match msg.opcode {
            // zwp_tablet_v2.destroy
            0 => None,
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
