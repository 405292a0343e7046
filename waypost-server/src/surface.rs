//! Surfaces: double-buffered state, commits and roles
//!
//! A surface is a container of double-buffered state: every request between
//! two commits lands in the pending half, and `commit` applies it
//! atomically. Damage and frame callbacks are moved, not copied, into the
//! applied half; everything else is overwritten field by field.
//!
//! The module is generic over the id type used to reference other protocol
//! objects (buffers, callbacks, outputs), so the state machine can be
//! exercised without a connection.

use crate::geometry::{Point, Rectangle, Size};
use crate::region::Region;

use waypost_protocols::enums::Transform;

/// The role assigned to a surface
///
/// A role is assigned at most once in the lifetime of a surface and never
/// changes afterwards, even if the role object is destroyed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Role<Id> {
    /// no role yet
    None,
    /// the surface backs an XDG toplevel
    XdgToplevel {
        /// the xdg_toplevel object
        toplevel: Id,
    },
    /// the surface backs an XDG popup
    XdgPopup {
        /// the xdg_popup object
        popup: Id,
    },
    /// the surface is a cursor image
    Cursor,
    /// the surface is a drag icon
    DragIcon,
}

/// Error returned when assigning a role to a surface that has one
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("the surface already has a role")]
pub struct RoleTaken;

/// A buffer attachment in a surface state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment<Id> {
    /// the attached buffer
    pub buffer: Id,
    /// the attach offset
    pub offset: Point,
}

/// Cropping and scaling state installed by a viewport object
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Viewport {
    /// source rectangle in buffer coordinates, if cropping
    pub src: Option<(f64, f64, f64, f64)>,
    /// destination size in surface coordinates, if scaling
    pub dst: Option<Size>,
}

/// One half of the double-buffered state
#[derive(Debug, Clone)]
pub struct SurfaceState<Id> {
    /// attached buffer, or none (unmapped on commit)
    pub attachment: Option<Attachment<Id>>,
    /// accumulated damage in surface coordinates
    pub damage: Vec<Rectangle>,
    /// accumulated damage in buffer coordinates
    pub buffer_damage: Vec<Rectangle>,
    /// callbacks to fire at the next presentation
    pub frame_callbacks: Vec<Id>,
    /// opaque-region hint, if set
    pub opaque_region: Option<Region>,
    /// input region; `None` means the whole surface accepts input
    pub input_region: Option<Region>,
    /// buffer transform
    pub transform: Transform,
    /// buffer scale
    pub scale: i32,
    /// viewport state, if a viewport is attached
    pub viewport: Viewport,
}

impl<Id> Default for SurfaceState<Id> {
    fn default() -> Self {
        Self {
            attachment: None,
            damage: Vec::new(),
            buffer_damage: Vec::new(),
            frame_callbacks: Vec::new(),
            opaque_region: None,
            input_region: None,
            transform: Transform::Normal,
            scale: 1,
            viewport: Viewport::default(),
        }
    }
}

/// What a commit changed, for the caller to act on
#[derive(Debug)]
pub struct CommitResult<Id> {
    /// buffer that was in the applied state before and is no longer
    /// referenced; a `release` is owed on it
    pub replaced_buffer: Option<Id>,
    /// buffer now visible, if any
    pub current_buffer: Option<Id>,
    /// the surface changed between mapped and unmapped
    pub map_changed: bool,
    /// callbacks that became pending for the next presentation
    pub new_frame_callbacks: usize,
}

/// A surface with its double-buffered state and role
#[derive(Debug)]
pub struct Surface<Id> {
    /// state being assembled by the client
    pub pending: SurfaceState<Id>,
    /// state last applied by a commit
    pub applied: SurfaceState<Id>,
    role: Role<Id>,
    mapped: bool,
    /// outputs the surface currently overlaps
    pub outputs: Vec<Id>,
    /// frame callbacks from previous commits, waiting for a presentation
    pub pending_presentation: Vec<Id>,
}

impl<Id: Clone + PartialEq> Surface<Id> {
    /// A fresh surface with no role and nothing attached
    pub fn new() -> Self {
        Self {
            pending: SurfaceState::default(),
            applied: SurfaceState::default(),
            role: Role::None,
            mapped: false,
            outputs: Vec::new(),
            pending_presentation: Vec::new(),
        }
    }

    /// The current role of the surface
    pub fn role(&self) -> &Role<Id> {
        &self.role
    }

    /// Assign a role; fails if one was ever assigned
    pub fn set_role(&mut self, role: Role<Id>) -> Result<(), RoleTaken> {
        if !matches!(self.role, Role::None) {
            return Err(RoleTaken);
        }
        self.role = role;
        Ok(())
    }

    /// Whether the surface currently has content
    pub fn is_mapped(&self) -> bool {
        self.mapped
    }

    /// Record a buffer attach in the pending state
    pub fn attach(&mut self, buffer: Option<Id>, x: i32, y: i32) {
        self.pending.attachment =
            buffer.map(|buffer| Attachment { buffer, offset: Point::new(x, y) });
    }

    /// Accumulate pending damage in surface coordinates
    pub fn damage(&mut self, rect: Rectangle) {
        if !rect.is_empty() {
            self.pending.damage.push(rect);
        }
    }

    /// Accumulate pending damage in buffer coordinates
    pub fn damage_buffer(&mut self, rect: Rectangle) {
        if !rect.is_empty() {
            self.pending.buffer_damage.push(rect);
        }
    }

    /// Register a frame callback in the pending state
    pub fn frame(&mut self, callback: Id) {
        self.pending.frame_callbacks.push(callback);
    }

    /// Atomically apply the pending state
    pub fn commit(&mut self) -> CommitResult<Id> {
        let was_mapped = self.mapped;

        let replaced_buffer = match (&self.applied.attachment, &self.pending.attachment) {
            (Some(old), Some(new)) if old.buffer != new.buffer => Some(old.buffer.clone()),
            (Some(old), None) => Some(old.buffer.clone()),
            _ => None,
        };

        // damage and callbacks move; the rest overwrites
        let damage = std::mem::take(&mut self.pending.damage);
        let buffer_damage = std::mem::take(&mut self.pending.buffer_damage);
        let callbacks = std::mem::take(&mut self.pending.frame_callbacks);
        let new_frame_callbacks = callbacks.len();

        self.applied.attachment = self.pending.attachment.clone();
        self.applied.opaque_region = self.pending.opaque_region.clone();
        self.applied.input_region = self.pending.input_region.clone();
        self.applied.transform = self.pending.transform;
        self.applied.scale = self.pending.scale;
        self.applied.viewport = self.pending.viewport;
        self.applied.damage = damage;
        self.applied.buffer_damage = buffer_damage;
        self.pending_presentation.extend(callbacks);

        self.mapped = self.applied.attachment.is_some();

        CommitResult {
            replaced_buffer,
            current_buffer: self.applied.attachment.as_ref().map(|a| a.buffer.clone()),
            map_changed: was_mapped != self.mapped,
            new_frame_callbacks,
        }
    }

    /// Drain the callbacks owed a `done` at this presentation
    pub fn take_presented_callbacks(&mut self) -> Vec<Id> {
        std::mem::take(&mut self.pending_presentation)
    }

    /// Drain the applied damage after a frame was assembled
    pub fn clear_damage(&mut self) {
        self.applied.damage.clear();
        self.applied.buffer_damage.clear();
    }

    /// The size of the surface in surface coordinates
    ///
    /// Resolved from the viewport destination if set, else from the buffer
    /// size under the current scale and transform.
    pub fn surface_size(&self, buffer_size: Option<Size>) -> Option<Size> {
        if let Some(dst) = self.applied.viewport.dst {
            return Some(dst);
        }
        if let Some((_, _, w, h)) = self.applied.viewport.src {
            if w.fract() == 0.0 && h.fract() == 0.0 {
                return Some(Size::new(w as i32, h as i32));
            }
        }
        buffer_size.map(|size| {
            crate::geometry::buffer_to_surface_size(
                size,
                self.applied.transform,
                self.applied.scale,
            )
        })
    }

    /// Whether the point (in surface coordinates) is over the input region
    pub fn accepts_input(&self, p: Point, size: Size) -> bool {
        if !Rectangle::from_loc_and_size(Point::default(), size).contains(p) {
            return false;
        }
        match &self.applied.input_region {
            Some(region) => region.contains(p),
            None => true,
        }
    }
}

impl<Id: Clone + PartialEq> Default for Surface<Id> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_is_assigned_at_most_once() {
        let mut surface: Surface<u32> = Surface::new();
        surface.set_role(Role::XdgToplevel { toplevel: 21 }).unwrap();
        assert_eq!(surface.set_role(Role::Cursor), Err(RoleTaken));
        // the original role survives the failed attempt
        assert!(matches!(surface.role(), Role::XdgToplevel { toplevel: 21 }));
    }

    #[test]
    fn commit_swaps_pending_to_applied() {
        let mut surface: Surface<u32> = Surface::new();
        surface.attach(Some(7), 0, 0);
        surface.damage(Rectangle::new(0, 0, 10, 10));
        surface.pending.scale = 2;
        let result = surface.commit();
        assert!(surface.is_mapped());
        assert_eq!(result.current_buffer, Some(7));
        assert_eq!(result.replaced_buffer, None);
        assert!(result.map_changed);
        assert_eq!(surface.applied.scale, 2);
        assert_eq!(surface.applied.damage.len(), 1);
        // damage was moved out of pending
        assert!(surface.pending.damage.is_empty());
    }

    #[test]
    fn commit_without_buffer_unmaps() {
        let mut surface: Surface<u32> = Surface::new();
        surface.attach(Some(7), 0, 0);
        surface.commit();
        assert!(surface.is_mapped());
        surface.attach(None, 0, 0);
        let result = surface.commit();
        assert!(!surface.is_mapped());
        assert!(result.map_changed);
        assert_eq!(result.replaced_buffer, Some(7));
    }

    #[test]
    fn replacing_a_buffer_reports_the_old_one() {
        let mut surface: Surface<u32> = Surface::new();
        surface.attach(Some(7), 0, 0);
        surface.commit();
        surface.attach(Some(8), 0, 0);
        let result = surface.commit();
        assert_eq!(result.replaced_buffer, Some(7));
        assert_eq!(result.current_buffer, Some(8));
        // committing the same buffer again owes no release
        surface.attach(Some(8), 0, 0);
        let result = surface.commit();
        assert_eq!(result.replaced_buffer, None);
    }

    #[test]
    fn frame_callbacks_move_on_commit() {
        let mut surface: Surface<u32> = Surface::new();
        surface.frame(100);
        surface.attach(Some(7), 0, 0);
        let result = surface.commit();
        assert_eq!(result.new_frame_callbacks, 1);
        assert!(surface.pending.frame_callbacks.is_empty());
        // callbacks fire once, at the next presentation
        assert_eq!(surface.take_presented_callbacks(), vec![100]);
        assert!(surface.take_presented_callbacks().is_empty());
    }

    #[test]
    fn input_region_gates_hits() {
        let mut surface: Surface<u32> = Surface::new();
        let size = Size::new(100, 100);
        // default region is the whole surface
        assert!(surface.accepts_input(Point::new(50, 50), size));
        assert!(!surface.accepts_input(Point::new(150, 50), size));

        let mut region = Region::new();
        region.add(Rectangle::new(0, 0, 10, 10));
        surface.pending.input_region = Some(region);
        surface.attach(Some(1), 0, 0);
        surface.commit();
        assert!(surface.accepts_input(Point::new(5, 5), size));
        assert!(!surface.accepts_input(Point::new(50, 50), size));
    }
}
