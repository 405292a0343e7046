//! Seat state: capabilities, focus tracking and event serials
//!
//! The focus machines are generic over the surface key type so they can be
//! driven without a connection; the compositor instantiates them with
//! protocol object ids.

use std::collections::HashMap;

use waypost_protocols::enums::Capability;

use crate::geometry::Point;

/// Issues the monotonically increasing serials stamped on input and
/// configure events
///
/// Serials wrap; consumers compare them modularly.
#[derive(Debug, Default)]
pub struct SerialCounter {
    last: u32,
}

impl SerialCounter {
    /// A counter starting at zero
    pub fn new() -> Self {
        Self::default()
    }

    /// The next serial; strictly increasing under modular comparison
    pub fn next_serial(&mut self) -> u32 {
        self.last = self.last.wrapping_add(1);
        self.last
    }

    /// The most recently issued serial
    pub fn last_serial(&self) -> u32 {
        self.last
    }
}

/// A change of pointer focus that the caller must translate into events
#[derive(Debug, PartialEq, Eq)]
pub enum FocusChange<S> {
    /// send `leave` for this surface
    Leave(S),
    /// send `enter` for this surface at the given surface-local position
    Enter(S, Point),
    /// focus unchanged; deliver motion at the given position
    Motion(Point),
}

/// Pointer focus machine
///
/// Focus follows the hit surface; enter/leave events bracket every
/// transition and only the focused surface sees motion.
#[derive(Debug)]
pub struct PointerFocus<S> {
    focus: Option<S>,
    /// last known position in surface-local coordinates
    pub position: Point,
}

impl<S: Clone + PartialEq> Default for PointerFocus<S> {
    fn default() -> Self {
        Self { focus: None, position: Point::default() }
    }
}

impl<S: Clone + PartialEq> PointerFocus<S> {
    /// The surface currently holding pointer focus
    pub fn focused(&self) -> Option<&S> {
        self.focus.as_ref()
    }

    /// Process a motion to `hit`: the surface under the cursor (with the
    /// position in its coordinates), or `None` over no surface.
    ///
    /// Returns the ordered changes to deliver.
    pub fn motion(&mut self, hit: Option<(S, Point)>) -> Vec<FocusChange<S>> {
        let mut changes = Vec::new();
        match hit {
            Some((surface, position)) => {
                self.position = position;
                if self.focus.as_ref() == Some(&surface) {
                    changes.push(FocusChange::Motion(position));
                } else {
                    if let Some(old) = self.focus.take() {
                        changes.push(FocusChange::Leave(old));
                    }
                    self.focus = Some(surface.clone());
                    changes.push(FocusChange::Enter(surface, position));
                }
            }
            None => {
                if let Some(old) = self.focus.take() {
                    changes.push(FocusChange::Leave(old));
                }
            }
        }
        changes
    }

    /// Drop focus if it points at `surface` (it is going away)
    pub fn forget(&mut self, surface: &S) {
        if self.focus.as_ref() == Some(surface) {
            self.focus = None;
        }
    }
}

/// Keyboard focus machine
///
/// Focus is set by compositor policy, not by pointer position; the machine
/// only brackets the transitions.
#[derive(Debug)]
pub struct KeyboardFocus<S> {
    focus: Option<S>,
    /// keys currently pressed, as the wire array sent on `enter`
    pub pressed: Vec<u32>,
}

impl<S: Clone + PartialEq> Default for KeyboardFocus<S> {
    fn default() -> Self {
        Self { focus: None, pressed: Vec::new() }
    }
}

impl<S: Clone + PartialEq> KeyboardFocus<S> {
    /// The surface currently holding keyboard focus
    pub fn focused(&self) -> Option<&S> {
        self.focus.as_ref()
    }

    /// Transfer focus; returns (leave, enter) surfaces
    pub fn set_focus(&mut self, surface: Option<S>) -> (Option<S>, Option<S>) {
        if self.focus == surface {
            return (None, None);
        }
        let left = self.focus.take();
        self.focus = surface.clone();
        (left, surface)
    }

    /// Record a key press or release for the pressed-keys array
    pub fn key(&mut self, key: u32, pressed: bool) {
        if pressed {
            if !self.pressed.contains(&key) {
                self.pressed.push(key);
            }
        } else {
            self.pressed.retain(|&k| k != key);
        }
    }

    /// The pressed-keys array in wire encoding
    pub fn pressed_array(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.pressed.len() * 4);
        for key in &self.pressed {
            bytes.extend_from_slice(&key.to_le_bytes());
        }
        bytes
    }

    /// Drop focus if it points at `surface`
    pub fn forget(&mut self, surface: &S) {
        if self.focus.as_ref() == Some(surface) {
            self.focus = None;
        }
    }
}

/// An active touch point
#[derive(Debug, Clone)]
pub struct TouchPoint<S> {
    /// surface the touch started on
    pub surface: S,
    /// last position in surface-local coordinates
    pub position: Point,
}

/// Touch state: the set of active points keyed by their signed id
#[derive(Debug)]
pub struct TouchState<S> {
    points: HashMap<i32, TouchPoint<S>>,
}

impl<S: Clone + PartialEq> Default for TouchState<S> {
    fn default() -> Self {
        Self { points: HashMap::new() }
    }
}

impl<S: Clone + PartialEq> TouchState<S> {
    /// A touch went down on a surface; false if the id is already active
    pub fn down(&mut self, id: i32, surface: S, position: Point) -> bool {
        self.points.insert(id, TouchPoint { surface, position }).is_none()
    }

    /// A touch moved; returns the surface owning the point
    pub fn motion(&mut self, id: i32, position: Point) -> Option<S> {
        let point = self.points.get_mut(&id)?;
        point.position = position;
        Some(point.surface.clone())
    }

    /// A touch went up; returns the surface that owned the point
    pub fn up(&mut self, id: i32) -> Option<S> {
        self.points.remove(&id).map(|p| p.surface)
    }

    /// Invalidate every active point (a `cancel` was emitted)
    pub fn cancel(&mut self) -> Vec<S> {
        let surfaces = self.points.drain().map(|(_, p)| p.surface).collect();
        surfaces
    }

    /// The active points
    pub fn points(&self) -> impl Iterator<Item = (i32, &TouchPoint<S>)> {
        self.points.iter().map(|(id, p)| (*id, p))
    }

    /// Number of active points
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether no touch is active
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// A seat: its advertised capabilities and the per-device focus state
#[derive(Debug)]
pub struct Seat<S> {
    /// advertised capability set
    pub capabilities: Capability,
    /// seat name advertised to clients
    pub name: String,
    /// pointer focus machine
    pub pointer: PointerFocus<S>,
    /// keyboard focus machine
    pub keyboard: KeyboardFocus<S>,
    /// active touch points
    pub touch: TouchState<S>,
}

impl<S: Clone + PartialEq> Default for Seat<S> {
    fn default() -> Self {
        Self::new("", Capability::empty())
    }
}

impl<S: Clone + PartialEq> Seat<S> {
    /// A seat with the given name and capabilities
    pub fn new(name: impl Into<String>, capabilities: Capability) -> Self {
        Self {
            capabilities,
            name: name.into(),
            pointer: PointerFocus::default(),
            keyboard: KeyboardFocus::default(),
            touch: TouchState::default(),
        }
    }

    /// Whether the seat advertises a capability
    pub fn has(&self, capability: Capability) -> bool {
        self.capabilities.contains(capability)
    }

    /// A surface is going away; drop any focus pointing at it
    pub fn forget_surface(&mut self, surface: &S) {
        self.pointer.forget(surface);
        self.keyboard.forget(surface);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serials_strictly_increase() {
        let mut counter = SerialCounter::new();
        let a = counter.next_serial();
        let b = counter.next_serial();
        let c = counter.next_serial();
        assert!(a < b && b < c);
    }

    #[test]
    fn pointer_focus_brackets_transitions() {
        let mut focus: PointerFocus<u32> = PointerFocus::default();
        // entering surface 1
        let changes = focus.motion(Some((1, Point::new(5, 5))));
        assert_eq!(changes, vec![FocusChange::Enter(1, Point::new(5, 5))]);
        // motion within the same surface
        let changes = focus.motion(Some((1, Point::new(6, 5))));
        assert_eq!(changes, vec![FocusChange::Motion(Point::new(6, 5))]);
        // crossing to surface 2: leave before enter
        let changes = focus.motion(Some((2, Point::new(0, 0))));
        assert_eq!(
            changes,
            vec![FocusChange::Leave(1), FocusChange::Enter(2, Point::new(0, 0))]
        );
        // leaving all surfaces
        let changes = focus.motion(None);
        assert_eq!(changes, vec![FocusChange::Leave(2)]);
        assert!(focus.motion(None).is_empty());
    }

    #[test]
    fn keyboard_pressed_array() {
        let mut focus: KeyboardFocus<u32> = KeyboardFocus::default();
        focus.key(30, true);
        focus.key(31, true);
        focus.key(30, false);
        assert_eq!(focus.pressed, vec![31]);
        assert_eq!(focus.pressed_array(), vec![31, 0, 0, 0]);
    }

    #[test]
    fn keyboard_focus_transfer() {
        let mut focus: KeyboardFocus<u32> = KeyboardFocus::default();
        assert_eq!(focus.set_focus(Some(1)), (None, Some(1)));
        assert_eq!(focus.set_focus(Some(2)), (Some(1), Some(2)));
        // no-op transfer
        assert_eq!(focus.set_focus(Some(2)), (None, None));
        assert_eq!(focus.set_focus(None), (Some(2), None));
    }

    #[test]
    fn touch_point_set() {
        let mut touch: TouchState<u32> = TouchState::default();
        assert!(touch.down(0, 1, Point::new(1, 1)));
        assert!(touch.down(1, 1, Point::new(2, 2)));
        // duplicate id is rejected
        assert!(!touch.down(0, 2, Point::new(3, 3)));
        assert_eq!(touch.motion(0, Point::new(5, 5)), Some(1));
        assert_eq!(touch.up(0), Some(1));
        assert_eq!(touch.motion(0, Point::new(9, 9)), None);
        assert_eq!(touch.cancel(), vec![1]);
        assert!(touch.is_empty());
    }
}
