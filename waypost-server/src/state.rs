//! The compositor-wide state threaded through every handler
//!
//! All protocol objects are addressed by their backend id; the maps below
//! are the arenas their domain state lives in. Handlers receive `(handle,
//! &mut Compositor, client, message)` and look state up by id, so no
//! object holds a reference to another.

use std::collections::HashMap;
use std::ffi::CString;

use waypost_backend::message;
use waypost_backend::protocol::{Argument, Fixed};
use waypost_backend::server::{Handle, ObjectId};
use waypost_protocols::enums::{Capability, ShmFormat, ToplevelState};

use crate::buffer::{Buffer, BufferSource};
use crate::dmabuf::{DmabufParams, FormatModifier};
use crate::geometry::{Point, Rectangle, Size};
use crate::gestures::GestureRecognizer;
use crate::output::Output;
use crate::region::Region;
use crate::scene::Scene;
use crate::seat::{FocusChange, Seat, SerialCounter};
use crate::shm::ShmPool;
use crate::surface::{Role, Surface};
use crate::xdg::{Popup, Positioner, Toplevel, XdgSurface};

/// A handle to the server backend parameterized over this state
pub type ServerHandle = Handle<Compositor>;

/// An output together with the protocol objects bound to it
#[derive(Debug)]
pub struct OutputEntry {
    /// the output configuration
    pub output: Output,
    /// `wl_output` objects clients bound for it
    pub resources: Vec<ObjectId>,
}

/// An in-flight activation token
#[derive(Debug, Default)]
pub struct ActivationToken {
    /// serial/seat proof provided by the client
    pub serial: Option<u32>,
    /// app id hint
    pub app_id: Option<String>,
    /// surface requesting the token
    pub surface: Option<ObjectId>,
}

/// The drag-and-drop / selection state of the seat
#[derive(Debug, Default)]
pub struct DataDeviceState {
    /// `wl_data_device` objects, with the seat they were created for
    pub devices: Vec<ObjectId>,
    /// mime types offered per live data source
    pub sources: HashMap<ObjectId, Vec<String>>,
    /// the current selection source, if any
    pub selection: Option<ObjectId>,
    /// offer object → source it represents
    pub offers: HashMap<ObjectId, ObjectId>,
}

/// The compositor state
///
/// This is the `D` type of the server backend: every request handler and
/// global bind receives a `&mut` to it.
#[derive(Debug, Default)]
pub struct Compositor {
    /// issuer of input/configure serials
    pub serials: SerialCounter,
    /// all live surfaces
    pub surfaces: HashMap<ObjectId, Surface<ObjectId>>,
    /// all live regions
    pub regions: HashMap<ObjectId, Region>,
    /// all live SHM pools
    pub pools: HashMap<ObjectId, ShmPool>,
    /// all live buffers
    pub buffers: HashMap<ObjectId, Buffer<ObjectId>>,
    /// dmabuf params being collected
    pub dmabuf_params: HashMap<ObjectId, DmabufParams>,
    /// xdg_surface objects
    pub xdg_surfaces: HashMap<ObjectId, XdgSurface<ObjectId>>,
    /// xdg_toplevel objects
    pub toplevels: HashMap<ObjectId, Toplevel<ObjectId>>,
    /// xdg_popup objects
    pub popups: HashMap<ObjectId, Popup<ObjectId>>,
    /// xdg_positioner objects
    pub positioners: HashMap<ObjectId, Positioner>,
    /// outstanding xdg_wm_base pings
    pub pings: Vec<u32>,
    /// the seat (focus state keyed by `wl_surface` id)
    pub seat: Seat<ObjectId>,
    /// bound `wl_seat` objects
    pub seat_resources: Vec<ObjectId>,
    /// bound `wl_pointer` objects
    pub pointers: Vec<ObjectId>,
    /// bound `wl_keyboard` objects
    pub keyboards: Vec<ObjectId>,
    /// bound `wl_touch` objects
    pub touches: Vec<ObjectId>,
    /// bound `zwp_tablet_seat_v2` objects
    pub tablet_seats: Vec<ObjectId>,
    /// gesture recognition over the touch stream
    pub gestures: GestureRecognizer,
    /// outputs and their bound resources
    pub outputs: Vec<OutputEntry>,
    /// the scene graph, keyed by `wl_surface` id
    pub scene: Scene<ObjectId>,
    /// SHM formats advertised at bind time
    pub shm_formats: Vec<ShmFormat>,
    /// dmabuf format/modifier pairs advertised at bind time
    pub dmabuf_formats: Vec<FormatModifier>,
    /// `wp_viewport` object → the `wl_surface` it crops
    pub viewports: HashMap<ObjectId, ObjectId>,
    /// `wl_surface` → its `wp_fractional_scale_v1` object
    pub fractional_scales: HashMap<ObjectId, ObjectId>,
    /// activation tokens being assembled, by token object
    pub pending_tokens: HashMap<ObjectId, ActivationToken>,
    /// committed token strings still valid for activation
    pub issued_tokens: Vec<String>,
    /// data-device family state
    pub data_devices: DataDeviceState,
    /// wall-clock-ish timestamp source for frame callbacks, in ms
    pub frame_time: u32,
}

impl Compositor {
    /// A compositor with the baseline SHM formats and no outputs
    pub fn new() -> Self {
        Self {
            shm_formats: crate::shm::BASELINE_FORMATS.to_vec(),
            seat: Seat::new("seat0", Capability::POINTER | Capability::KEYBOARD),
            ..Self::default()
        }
    }

    /// Add an output; it is advertised when its global is created
    pub fn add_output(&mut self, output: Output) -> usize {
        self.outputs.push(OutputEntry { output, resources: Vec::new() });
        self.outputs.len() - 1
    }

    /// Look up which output entry index a resource belongs to
    pub fn output_for_resource(&self, id: &ObjectId) -> Option<usize> {
        self.outputs.iter().position(|entry| entry.resources.contains(id))
    }

    /// The size of a surface in surface coordinates, from its buffer
    pub fn surface_size(&self, surface_id: &ObjectId) -> Option<Size> {
        let surface = self.surfaces.get(surface_id)?;
        let buffer_size = surface
            .applied
            .attachment
            .as_ref()
            .and_then(|a| self.buffers.get(&a.buffer))
            .map(|b| b.size());
        surface.surface_size(buffer_size)
    }

    /// Apply a commit on `surface_id`, with every side effect it implies:
    /// buffer busy/release accounting, scene updates and output membership.
    pub fn commit_surface(&mut self, handle: &ServerHandle, surface_id: ObjectId) {
        let Some(surface) = self.surfaces.get_mut(&surface_id) else { return };
        let result = surface.commit();

        // buffer ownership bookkeeping
        if let Some(new) = &result.current_buffer {
            if let Some(buffer) = self.buffers.get_mut(new) {
                buffer.busy = true;
            }
        }
        if let Some(old) = result.replaced_buffer {
            self.release_buffer(handle, old);
        }

        // reflect the new content in the scene
        let size = self.surface_size(&surface_id).unwrap_or_default();
        if let Some(view) = self.scene.view_for_surface(&surface_id) {
            let surface = self.surfaces.get_mut(&surface_id).unwrap();
            if surface.is_mapped() {
                let position = self.scene.get(view).map(|v| v.position).unwrap_or_default();
                self.scene.map(view, position.x, position.y, size.w, size.h);
                let damage = surface.applied.damage.clone();
                for rect in damage {
                    self.scene.damage_view(view, rect);
                }
            } else {
                self.scene.unmap(view);
            }
        }

        self.update_output_membership(handle, surface_id);
    }

    /// Owe a `release` on a buffer
    ///
    /// Emits it immediately, except for a buffer its client already
    /// destroyed: that one is reaped instead, now that the compositor no
    /// longer samples from it.
    pub fn release_buffer(&mut self, handle: &ServerHandle, buffer_id: ObjectId) {
        let Some(buffer) = self.buffers.get_mut(&buffer_id) else { return };
        buffer.busy = false;
        if buffer.destroyed {
            self.destroy_buffer(&buffer_id);
        } else {
            // wl_buffer.release
            let _ = handle.send_event(message!(buffer_id, 0, []));
        }
    }

    /// Send `enter`/`leave` to match the outputs a surface now overlaps
    pub fn update_output_membership(&mut self, handle: &ServerHandle, surface_id: ObjectId) {
        let Some(view) = self.scene.view_for_surface(&surface_id) else { return };
        let bounds = match self.scene.get(view) {
            Some(v) if v.mapped => v.bounds(),
            _ => Rectangle::default(),
        };
        let client = surface_id.client_id();

        let mut entered: Vec<ObjectId> = Vec::new();
        for entry in &self.outputs {
            if entry.output.geometry().overlaps(&bounds) {
                // only resources of the surface's own client are relevant
                entered.extend(
                    entry
                        .resources
                        .iter()
                        .filter(|r| r.client_id() == client)
                        .cloned(),
                );
            }
        }

        let Some(surface) = self.surfaces.get_mut(&surface_id) else { return };
        let previous = std::mem::take(&mut surface.outputs);
        for output in &previous {
            if !entered.contains(output) {
                // wl_surface.leave
                let _ = handle
                    .send_event(message!(surface_id.clone(), 1, [Argument::Object(output.clone())]));
            }
        }
        for output in &entered {
            if !previous.contains(output) {
                // wl_surface.enter
                let _ = handle
                    .send_event(message!(surface_id.clone(), 0, [Argument::Object(output.clone())]));
            }
        }
        self.surfaces.get_mut(&surface_id).unwrap().outputs = entered;

        self.send_preferred_scale(handle, surface_id);
    }

    /// Advertise the scale the surface should render at, derived from the
    /// outputs it overlaps (the highest wins).
    pub fn send_preferred_scale(&mut self, handle: &ServerHandle, surface_id: ObjectId) {
        let Some(surface) = self.surfaces.get(&surface_id) else { return };
        let scale = crate::output::preferred_scale(
            self.outputs
                .iter()
                .filter(|e| e.resources.iter().any(|r| surface.outputs.contains(r)))
                .map(|e| &e.output),
        );
        if let Ok(info) = handle.object_info(surface_id.clone()) {
            if info.version >= 6 {
                // wl_surface.preferred_buffer_scale
                let _ = handle.send_event(message!(
                    surface_id.clone(),
                    2,
                    [Argument::Int(scale)]
                ));
            }
        }
        if let Some(fractional) = self.fractional_scales.get(&surface_id) {
            // wp_fractional_scale_v1.preferred_scale, in 120ths
            let _ = handle.send_event(message!(
                fractional.clone(),
                0,
                [Argument::Uint(scale as u32 * 120)]
            ));
        }
    }

    /// A frame finished presenting: fire the frame callbacks of every
    /// mapped surface registered before this presentation.
    pub fn frame_presented(&mut self, handle: &ServerHandle, time_ms: u32) {
        self.frame_time = time_ms;
        let surfaces: Vec<ObjectId> = self.surfaces.keys().cloned().collect();
        for surface_id in surfaces {
            let callbacks = {
                let Some(surface) = self.surfaces.get_mut(&surface_id) else { continue };
                if !surface.is_mapped() {
                    continue;
                }
                surface.take_presented_callbacks()
            };
            for callback in callbacks {
                // wl_callback.done is a destructor event; the backend also
                // queues the delete_id bookkeeping
                let _ = handle.send_event(message!(callback, 0, [Argument::Uint(time_ms)]));
            }
        }
        self.scene.clear_damage();
    }

    /// Build the renderer's view of the scene, in paint order
    pub fn render_elements(&self) -> Vec<crate::renderer::SceneElement<'_>> {
        let mut elements = Vec::new();
        for view_id in self.scene.paint_order() {
            let Some(view) = self.scene.get(view_id) else { continue };
            let Some(surface) = self.surfaces.get(&view.surface) else { continue };
            let Some(attachment) = surface.applied.attachment.as_ref() else { continue };
            let Some(buffer) = self.buffers.get(&attachment.buffer) else { continue };
            let payload = match &buffer.source {
                BufferSource::Shm { pool, spec } => {
                    let Some(pool) = self.pools.get(pool) else { continue };
                    crate::renderer::BufferPayload::Shm {
                        pool: pool.data(),
                        fd: pool.fd(),
                        offset: spec.offset,
                        stride: spec.stride,
                        format: spec.format,
                    }
                }
                BufferSource::Dmabuf(spec) => crate::renderer::BufferPayload::Dmabuf {
                    planes: &spec.planes,
                    format: spec.format,
                    modifier: spec.modifier,
                },
            };
            elements.push(crate::renderer::SceneElement {
                position: view.position,
                size: view.size,
                transform: surface.applied.transform,
                scale: surface.applied.scale,
                damage: &view.damage,
                buffer_size: buffer.size(),
                payload,
            });
        }
        elements
    }

    // ---- input routing ----

    fn pointer_resources_for(&self, surface: &ObjectId) -> Vec<ObjectId> {
        let client = surface.client_id();
        self.pointers.iter().filter(|p| p.client_id() == client).cloned().collect()
    }

    fn keyboard_resources_for(&self, surface: &ObjectId) -> Vec<ObjectId> {
        let client = surface.client_id();
        self.keyboards.iter().filter(|k| k.client_id() == client).cloned().collect()
    }

    fn touch_resources_for(&self, surface: &ObjectId) -> Vec<ObjectId> {
        let client = surface.client_id();
        self.touches.iter().filter(|t| t.client_id() == client).cloned().collect()
    }

    /// Hit-test the scene at a global position, honoring input regions,
    /// surface transforms and scales.
    pub fn surface_under(&self, x: i32, y: i32) -> Option<(ObjectId, Point)> {
        let view_id = self.scene.find_view_at(x, y)?;
        let view = self.scene.get(view_id)?;
        let surface_id = view.surface.clone();
        let surface = self.surfaces.get(&surface_id)?;
        let local = Point::new(x - view.position.x, y - view.position.y);
        let size = self.surface_size(&surface_id).unwrap_or(view.size);
        surface.accepts_input(local, size).then_some((surface_id, local))
    }

    /// Route an absolute pointer motion, updating focus as needed
    pub fn pointer_motion(&mut self, handle: &ServerHandle, time_ms: u32, x: i32, y: i32) {
        let hit = self.surface_under(x, y);
        let changes = self.seat.pointer.motion(hit);
        for change in changes {
            match change {
                FocusChange::Leave(surface) => {
                    let serial = self.serials.next_serial();
                    for pointer in self.pointer_resources_for(&surface) {
                        // wl_pointer.leave
                        let _ = handle.send_event(message!(
                            pointer,
                            1,
                            [Argument::Uint(serial), Argument::Object(surface.clone())]
                        ));
                    }
                }
                FocusChange::Enter(surface, position) => {
                    let serial = self.serials.next_serial();
                    for pointer in self.pointer_resources_for(&surface) {
                        // wl_pointer.enter
                        let _ = handle.send_event(message!(
                            pointer,
                            0,
                            [
                                Argument::Uint(serial),
                                Argument::Object(surface.clone()),
                                Argument::Fixed(Fixed::from_int(position.x).0),
                                Argument::Fixed(Fixed::from_int(position.y).0),
                            ]
                        ));
                    }
                }
                FocusChange::Motion(position) => {
                    if let Some(surface) = self.seat.pointer.focused().cloned() {
                        for pointer in self.pointer_resources_for(&surface) {
                            // wl_pointer.motion
                            let _ = handle.send_event(message!(
                                pointer,
                                2,
                                [
                                    Argument::Uint(time_ms),
                                    Argument::Fixed(Fixed::from_int(position.x).0),
                                    Argument::Fixed(Fixed::from_int(position.y).0),
                                ]
                            ));
                        }
                    }
                }
            }
        }
        self.pointer_frame(handle);
    }

    /// Route a pointer button; a press also applies the focus policy
    /// (click to focus, raise on click).
    pub fn pointer_button(
        &mut self,
        handle: &ServerHandle,
        time_ms: u32,
        button: u32,
        pressed: bool,
    ) {
        let Some(surface) = self.seat.pointer.focused().cloned() else { return };
        let serial = self.serials.next_serial();
        for pointer in self.pointer_resources_for(&surface) {
            // wl_pointer.button
            let _ = handle.send_event(message!(
                pointer,
                3,
                [
                    Argument::Uint(serial),
                    Argument::Uint(time_ms),
                    Argument::Uint(button),
                    Argument::Uint(u32::from(pressed)),
                ]
            ));
        }
        self.pointer_frame(handle);
        if pressed {
            if let Some(view) = self.scene.view_for_surface(&surface) {
                self.scene.raise(view);
            }
            self.set_keyboard_focus(handle, Some(surface));
        }
    }

    /// Route an axis (scroll) event to the focused surface
    ///
    /// `axis` is a `wl_pointer.axis` value, `value` the scroll amount in
    /// surface-coordinate space.
    pub fn pointer_axis(&mut self, handle: &ServerHandle, time_ms: u32, axis: u32, value: f64) {
        let Some(surface) = self.seat.pointer.focused().cloned() else { return };
        for pointer in self.pointer_resources_for(&surface) {
            // wl_pointer.axis
            let _ = handle.send_event(message!(
                pointer,
                4,
                [
                    Argument::Uint(time_ms),
                    Argument::Uint(axis),
                    Argument::Fixed(Fixed::from_f64(value).0),
                ]
            ));
        }
        self.pointer_frame(handle);
    }

    fn pointer_frame(&self, handle: &ServerHandle) {
        for pointer in &self.pointers {
            if let Ok(info) = handle.object_info(pointer.clone()) {
                if info.version >= 5 {
                    // wl_pointer.frame
                    let _ = handle.send_event(message!(pointer.clone(), 5, []));
                }
            }
        }
    }

    /// Transfer keyboard focus, bracketing with leave/enter
    pub fn set_keyboard_focus(&mut self, handle: &ServerHandle, surface: Option<ObjectId>) {
        let (left, entered) = self.seat.keyboard.set_focus(surface);
        if let Some(surface) = left {
            let serial = self.serials.next_serial();
            for keyboard in self.keyboard_resources_for(&surface) {
                // wl_keyboard.leave
                let _ = handle.send_event(message!(
                    keyboard,
                    2,
                    [Argument::Uint(serial), Argument::Object(surface.clone())]
                ));
            }
            self.set_activated(handle, &surface, false);
        }
        if let Some(surface) = entered {
            let serial = self.serials.next_serial();
            let pressed = self.seat.keyboard.pressed_array();
            for keyboard in self.keyboard_resources_for(&surface) {
                // wl_keyboard.enter
                let _ = handle.send_event(message!(
                    keyboard,
                    1,
                    [
                        Argument::Uint(serial),
                        Argument::Object(surface.clone()),
                        Argument::Array(Box::new(pressed.clone())),
                    ]
                ));
            }
            self.set_activated(handle, &surface, true);
        }
    }

    /// Route a key event to the focused surface
    pub fn keyboard_key(&mut self, handle: &ServerHandle, time_ms: u32, key: u32, pressed: bool) {
        self.seat.keyboard.key(key, pressed);
        let Some(surface) = self.seat.keyboard.focused().cloned() else { return };
        let serial = self.serials.next_serial();
        for keyboard in self.keyboard_resources_for(&surface) {
            // wl_keyboard.key
            let _ = handle.send_event(message!(
                keyboard,
                3,
                [
                    Argument::Uint(serial),
                    Argument::Uint(time_ms),
                    Argument::Uint(key),
                    Argument::Uint(u32::from(pressed)),
                ]
            ));
        }
    }

    /// Route a touch down; returns false if the id was already active
    pub fn touch_down(
        &mut self,
        handle: &ServerHandle,
        time_ms: u32,
        id: i32,
        x: i32,
        y: i32,
    ) -> bool {
        self.gestures.down(id, x as f64, y as f64);
        let Some((surface, local)) = self.surface_under(x, y) else { return true };
        if !self.seat.touch.down(id, surface.clone(), local) {
            return false;
        }
        let serial = self.serials.next_serial();
        for touch in self.touch_resources_for(&surface) {
            // wl_touch.down
            let _ = handle.send_event(message!(
                touch,
                0,
                [
                    Argument::Uint(serial),
                    Argument::Uint(time_ms),
                    Argument::Object(surface.clone()),
                    Argument::Int(id),
                    Argument::Fixed(Fixed::from_int(local.x).0),
                    Argument::Fixed(Fixed::from_int(local.y).0),
                ]
            ));
        }
        true
    }

    /// Route a touch motion
    pub fn touch_motion(&mut self, handle: &ServerHandle, time_ms: u32, id: i32, x: i32, y: i32) {
        self.gestures.motion(id, x as f64, y as f64);
        let Some(surface) = self.seat.touch.motion(id, Point::new(x, y)) else { return };
        for touch in self.touch_resources_for(&surface) {
            // wl_touch.motion
            let _ = handle.send_event(message!(
                touch,
                2,
                [
                    Argument::Uint(time_ms),
                    Argument::Int(id),
                    Argument::Fixed(Fixed::from_int(x).0),
                    Argument::Fixed(Fixed::from_int(y).0),
                ]
            ));
        }
    }

    /// Route a touch up
    pub fn touch_up(&mut self, handle: &ServerHandle, time_ms: u32, id: i32) {
        self.gestures.up(id);
        let Some(surface) = self.seat.touch.up(id) else { return };
        let serial = self.serials.next_serial();
        for touch in self.touch_resources_for(&surface) {
            // wl_touch.up
            let _ = handle.send_event(message!(
                touch,
                1,
                [Argument::Uint(serial), Argument::Uint(time_ms), Argument::Int(id)]
            ));
        }
    }

    /// Close a touch update group
    pub fn touch_frame(&self, handle: &ServerHandle) {
        for touch in &self.touches {
            // wl_touch.frame
            let _ = handle.send_event(message!(touch.clone(), 3, []));
        }
    }

    /// Invalidate all active touch points
    pub fn touch_cancel(&mut self, handle: &ServerHandle) {
        self.gestures.cancel();
        let surfaces = self.seat.touch.cancel();
        for surface in surfaces {
            for touch in self.touch_resources_for(&surface) {
                // wl_touch.cancel
                let _ = handle.send_event(message!(touch, 4, []));
            }
        }
    }

    /// Announce a tablet device on every bound tablet seat
    ///
    /// Creates a server-side `zwp_tablet_v2` per seat and sends the
    /// description batch.
    pub fn add_tablet(&mut self, handle: &ServerHandle, name: &str, vid: u32, pid: u32) {
        for seat in self.tablet_seats.clone() {
            let version = handle.object_info(seat.clone()).map(|i| i.version).unwrap_or(1);
            let Ok(tablet) = handle.create_object(
                seat.client_id(),
                &waypost_protocols::tablet::ZWP_TABLET_V2_INTERFACE,
                version,
                std::sync::Arc::new(crate::handlers::TabletData),
            ) else {
                continue;
            };
            // zwp_tablet_seat_v2.tablet_added
            let _ = handle.send_event(message!(seat, 0, [Argument::NewId(tablet.clone())]));
            // zwp_tablet_v2.name, .id, .done
            let _ = handle.send_event(message!(
                tablet.clone(),
                0,
                [Argument::Str(Some(Box::new(CString::new(name).unwrap())))]
            ));
            let _ = handle.send_event(message!(
                tablet.clone(),
                1,
                [Argument::Uint(vid), Argument::Uint(pid)]
            ));
            let _ = handle.send_event(message!(tablet, 3, []));
        }
    }

    // ---- xdg plumbing ----

    /// Send a configure sequence to a toplevel: the toplevel half carrying
    /// size and states, then the xdg_surface serial.
    pub fn send_toplevel_configure(&mut self, handle: &ServerHandle, toplevel_id: ObjectId) {
        let Some(toplevel) = self.toplevels.get(&toplevel_id) else { return };
        let xdg_surface_id = toplevel.xdg_surface.clone();
        let size = toplevel.pending_size.unwrap_or_default();
        let states = toplevel.states_array();
        // xdg_toplevel.configure
        let _ = handle.send_event(message!(
            toplevel_id,
            0,
            [
                Argument::Int(size.w),
                Argument::Int(size.h),
                Argument::Array(Box::new(states)),
            ]
        ));
        let serial = self.serials.next_serial();
        if let Some(xdg_surface) = self.xdg_surfaces.get_mut(&xdg_surface_id) {
            xdg_surface.serials.sent(serial);
        }
        // xdg_surface.configure
        let _ = handle.send_event(message!(xdg_surface_id, 0, [Argument::Uint(serial)]));
    }

    /// Send a configure sequence to a popup
    pub fn send_popup_configure(&mut self, handle: &ServerHandle, popup_id: ObjectId) {
        let Some(popup) = self.popups.get(&popup_id) else { return };
        let xdg_surface_id = popup.xdg_surface.clone();
        let rect = popup.placement();
        // xdg_popup.configure
        let _ = handle.send_event(message!(
            popup_id,
            0,
            [
                Argument::Int(rect.x),
                Argument::Int(rect.y),
                Argument::Int(rect.width),
                Argument::Int(rect.height),
            ]
        ));
        let serial = self.serials.next_serial();
        if let Some(xdg_surface) = self.xdg_surfaces.get_mut(&xdg_surface_id) {
            xdg_surface.serials.sent(serial);
        }
        // xdg_surface.configure
        let _ = handle.send_event(message!(xdg_surface_id, 0, [Argument::Uint(serial)]));
    }

    /// Toggle the `activated` state of the toplevel of a `wl_surface`
    fn set_activated(&mut self, handle: &ServerHandle, surface_id: &ObjectId, activated: bool) {
        let Some(surface) = self.surfaces.get(surface_id) else { return };
        let Role::XdgToplevel { toplevel } = surface.role().clone() else { return };
        let Some(state) = self.toplevels.get_mut(&toplevel) else { return };
        let changed = if activated {
            state.states.insert(ToplevelState::Activated)
        } else {
            state.states.remove(&ToplevelState::Activated)
        };
        if changed {
            self.send_toplevel_configure(handle, toplevel);
        }
    }

    /// Ask a toplevel to close; the only way the compositor requests it
    pub fn request_close(&self, handle: &ServerHandle, toplevel_id: ObjectId) {
        // xdg_toplevel.close
        let _ = handle.send_event(message!(toplevel_id, 1, []));
    }

    /// An activation token was committed; remember it and answer `done`
    pub fn commit_activation_token(
        &mut self,
        handle: &ServerHandle,
        token_obj: ObjectId,
    ) -> Option<String> {
        let _request = self.pending_tokens.remove(&token_obj)?;
        // tokens are opaque; derive one from the serial space
        let token = format!("waypost-{}-{}", self.serials.next_serial(), self.issued_tokens.len());
        self.issued_tokens.push(token.clone());
        // xdg_activation_token_v1.done
        let _ = handle.send_event(message!(
            token_obj,
            0,
            [Argument::Str(Some(Box::new(CString::new(token.clone()).unwrap())))]
        ));
        Some(token)
    }

    /// Activate a surface if the token is valid; invalid tokens are
    /// silently dropped.
    pub fn activate(&mut self, handle: &ServerHandle, token: &str, surface: ObjectId) {
        let Some(pos) = self.issued_tokens.iter().position(|t| t == token) else {
            log::debug!("Ignoring activation with unknown token");
            return;
        };
        self.issued_tokens.remove(pos);
        if let Some(view) = self.scene.view_for_surface(&surface) {
            self.scene.raise(view);
        }
        self.set_keyboard_focus(handle, Some(surface));
    }

    // ---- teardown ----

    /// A `wl_surface` went away: destroy its role objects' state, its view
    /// and every focus reference to it.
    pub fn destroy_surface(&mut self, handle: &ServerHandle, surface_id: &ObjectId) {
        if let Some(surface) = self.surfaces.remove(surface_id) {
            if let Some(ref attachment) = surface.applied.attachment {
                self.release_buffer(handle, attachment.buffer.clone());
            }
            // destroying a surface destroys the role state attached to it
            match surface.role() {
                Role::XdgToplevel { toplevel } => {
                    self.toplevels.remove(toplevel);
                }
                Role::XdgPopup { popup } => {
                    self.popups.remove(popup);
                }
                _ => {}
            }
        }
        if let Some(view) = self.scene.view_for_surface(surface_id) {
            self.scene.destroy_view(view);
        }
        self.seat.forget_surface(surface_id);
        self.xdg_surfaces.retain(|_, x| &x.wl_surface != surface_id);
        self.fractional_scales.remove(surface_id);
        self.viewports.retain(|_, s| s != surface_id);
    }

    /// A `wl_buffer` was destroyed by its client
    pub fn destroy_buffer(&mut self, buffer_id: &ObjectId) {
        let Some(buffer) = self.buffers.get_mut(buffer_id) else { return };
        if buffer.busy {
            // keep the record until the compositor stops sampling it
            buffer.destroyed = true;
            return;
        }
        let pool = match &self.buffers.get(buffer_id).unwrap().source {
            BufferSource::Shm { pool, .. } => Some(pool.clone()),
            BufferSource::Dmabuf(_) => None,
        };
        self.buffers.remove(buffer_id);
        if let Some(pool_id) = pool {
            if let Some(pool) = self.pools.get_mut(&pool_id) {
                if pool.buffer_destroyed() {
                    self.pools.remove(&pool_id);
                }
            }
        }
    }

    /// Everything a disconnected client owned is dropped
    pub fn forget_client(&mut self, handle: &ServerHandle, client: &waypost_backend::server::ClientId) {
        let surfaces: Vec<ObjectId> = self
            .surfaces
            .keys()
            .filter(|id| &id.client_id() == client)
            .cloned()
            .collect();
        for surface in surfaces {
            self.destroy_surface(handle, &surface);
        }
        self.buffers.retain(|id, _| &id.client_id() != client);
        self.pools.retain(|id, _| &id.client_id() != client);
        self.regions.retain(|id, _| &id.client_id() != client);
        self.dmabuf_params.retain(|id, _| &id.client_id() != client);
        self.positioners.retain(|id, _| &id.client_id() != client);
        self.pending_tokens.retain(|id, _| &id.client_id() != client);
        self.pointers.retain(|id| &id.client_id() != client);
        self.keyboards.retain(|id| &id.client_id() != client);
        self.touches.retain(|id| &id.client_id() != client);
        self.tablet_seats.retain(|id| &id.client_id() != client);
        self.seat_resources.retain(|id| &id.client_id() != client);
        for entry in &mut self.outputs {
            entry.resources.retain(|id| &id.client_id() != client);
        }
        self.data_devices.devices.retain(|id| &id.client_id() != client);
        self.data_devices.sources.retain(|id, _| &id.client_id() != client);
        self.data_devices.offers.retain(|id, _| &id.client_id() != client);
        if self
            .data_devices
            .selection
            .as_ref()
            .map(|s| &s.client_id() == client)
            .unwrap_or(false)
        {
            self.data_devices.selection = None;
        }
    }
}
