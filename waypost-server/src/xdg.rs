//! XDG shell role state and the configure/ack handshake

use std::collections::BTreeSet;

use waypost_backend::protocol::serial_is_newer_or_equal;
use waypost_protocols::enums::ToplevelState;

use crate::geometry::{Rectangle, Size};

/// Outcome of an `ack_configure`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckResult {
    /// the serial is now the latest acknowledged configuration
    Acked,
    /// the serial is older than one already acknowledged; dropped
    Stale,
    /// the serial was never sent; this is a protocol error
    Unknown,
}

/// The configure/ack serial machine of an `xdg_surface`
///
/// Serials strictly increase; the client must acknowledge a configure
/// before the commit that honors it. An ack for a serial older than the
/// latest acknowledged one is ignored, an ack for a serial that was never
/// issued is a protocol error.
#[derive(Debug, Default)]
pub struct ConfigureSerials {
    sent: Vec<u32>,
    last_sent: Option<u32>,
    last_acked: Option<u32>,
}

impl ConfigureSerials {
    /// Record a configure event that was just sent
    pub fn sent(&mut self, serial: u32) {
        self.sent.push(serial);
        self.last_sent = Some(serial);
    }

    /// Process an `ack_configure` from the client
    pub fn ack(&mut self, serial: u32) -> AckResult {
        if let Some(acked) = self.last_acked {
            // wrap-around aware: anything at or before the last ack is dropped
            if !serial_is_newer_or_equal(serial, acked) || serial == acked {
                return AckResult::Stale;
            }
        }
        let Some(pos) = self.sent.iter().position(|&s| s == serial) else {
            return AckResult::Unknown;
        };
        // everything up to and including this serial is now obsolete
        self.sent.drain(..=pos);
        self.last_acked = Some(serial);
        AckResult::Acked
    }

    /// The last serial the client acknowledged
    pub fn last_acked(&self) -> Option<u32> {
        self.last_acked
    }

    /// The last serial sent to the client
    pub fn last_sent(&self) -> Option<u32> {
        self.last_sent
    }

    /// Whether a commit is valid now: either no configure was ever sent, or
    /// at least one has been acknowledged
    pub fn commit_allowed(&self) -> bool {
        self.last_sent.is_none() || self.last_acked.is_some()
    }
}

/// State of an `xdg_surface` object
///
/// This is not a role by itself: it becomes one when `get_toplevel` or
/// `get_popup` is called.
#[derive(Debug)]
pub struct XdgSurface<Id> {
    /// the `wl_surface` this object extends
    pub wl_surface: Id,
    /// serial machine of the configure handshake
    pub serials: ConfigureSerials,
    /// window geometry set by the client, if any
    pub window_geometry: Option<Rectangle>,
    /// the surface committed at least once since role assignment
    pub initial_commit_done: bool,
}

impl<Id> XdgSurface<Id> {
    /// Wrap a `wl_surface`
    pub fn new(wl_surface: Id) -> Self {
        Self {
            wl_surface,
            serials: ConfigureSerials::default(),
            window_geometry: None,
            initial_commit_done: false,
        }
    }
}

/// State of an `xdg_toplevel`
#[derive(Debug)]
pub struct Toplevel<Id> {
    /// the xdg_surface this toplevel extends
    pub xdg_surface: Id,
    /// window title
    pub title: String,
    /// application id
    pub app_id: String,
    /// parent toplevel, if set
    pub parent: Option<Id>,
    /// minimum size constraint; 0 means unconstrained
    pub min_size: Size,
    /// maximum size constraint; 0 means unconstrained
    pub max_size: Size,
    /// states currently applying to the window
    pub states: BTreeSet<ToplevelState>,
    /// size of the next configure to send, if a resize is pending
    pub pending_size: Option<Size>,
}

impl<Id> Toplevel<Id> {
    /// A fresh toplevel over an xdg_surface
    pub fn new(xdg_surface: Id) -> Self {
        Self {
            xdg_surface,
            title: String::new(),
            app_id: String::new(),
            parent: None,
            min_size: Size::default(),
            max_size: Size::default(),
            states: BTreeSet::new(),
            pending_size: None,
        }
    }

    /// Serialize the state set as the wire array of u32 words
    pub fn states_array(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.states.len() * 4);
        for state in &self.states {
            bytes.extend_from_slice(&u32::from(*state).to_le_bytes());
        }
        bytes
    }
}

/// State of an `xdg_popup`
#[derive(Debug)]
pub struct Popup<Id> {
    /// the xdg_surface this popup extends
    pub xdg_surface: Id,
    /// the parent xdg_surface, if any
    pub parent: Option<Id>,
    /// placement rules captured from the positioner at creation
    pub positioner: Positioner,
    /// an explicit grab was requested
    pub grabbed: bool,
}

impl<Id> Popup<Id> {
    /// A fresh popup over an xdg_surface
    pub fn new(xdg_surface: Id, parent: Option<Id>, positioner: Positioner) -> Self {
        Self { xdg_surface, parent, positioner, grabbed: false }
    }

    /// Resolve the popup rectangle relative to the parent
    pub fn placement(&self) -> Rectangle {
        self.positioner.placement()
    }
}

/// Anchor point on the anchor rectangle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[allow(missing_docs)]
pub enum Anchor {
    #[default]
    None,
    Top,
    Bottom,
    Left,
    Right,
    TopLeft,
    BottomLeft,
    TopRight,
    BottomRight,
}

impl Anchor {
    /// Decode the wire value
    pub fn from_wire(value: u32) -> Option<Self> {
        Some(match value {
            0 => Self::None,
            1 => Self::Top,
            2 => Self::Bottom,
            3 => Self::Left,
            4 => Self::Right,
            5 => Self::TopLeft,
            6 => Self::BottomLeft,
            7 => Self::TopRight,
            8 => Self::BottomRight,
            _ => return None,
        })
    }
}

/// Direction a popup grows from its anchor point
pub type Gravity = Anchor;

/// Placement rules of an `xdg_positioner`
#[derive(Debug, Clone, Copy, Default)]
pub struct Positioner {
    /// size of the popup to place
    pub size: Size,
    /// the rectangle to anchor to, in parent window geometry
    pub anchor_rect: Rectangle,
    /// anchor point on the rectangle
    pub anchor: Anchor,
    /// growth direction
    pub gravity: Gravity,
    /// allowed adjustments when constrained
    pub constraint_adjustment: u32,
    /// extra offset from the anchor
    pub offset: (i32, i32),
    /// recompute placement on environment changes
    pub reactive: bool,
    /// size of the parent the placement was computed against
    pub parent_size: Option<Size>,
    /// parent configure this placement reacts to
    pub parent_configure: Option<u32>,
}

impl Positioner {
    /// Whether the positioner can place anything
    pub fn is_complete(&self) -> bool {
        !self.size.is_empty() && !self.anchor_rect.is_empty()
    }

    /// The popup rectangle relative to the parent window geometry
    pub fn placement(&self) -> Rectangle {
        let rect = self.anchor_rect;
        let (ax, ay) = match self.anchor {
            Anchor::None => (rect.x + rect.width / 2, rect.y + rect.height / 2),
            Anchor::Top => (rect.x + rect.width / 2, rect.y),
            Anchor::Bottom => (rect.x + rect.width / 2, rect.y + rect.height),
            Anchor::Left => (rect.x, rect.y + rect.height / 2),
            Anchor::Right => (rect.x + rect.width, rect.y + rect.height / 2),
            Anchor::TopLeft => (rect.x, rect.y),
            Anchor::BottomLeft => (rect.x, rect.y + rect.height),
            Anchor::TopRight => (rect.x + rect.width, rect.y),
            Anchor::BottomRight => (rect.x + rect.width, rect.y + rect.height),
        };
        let (w, h) = (self.size.w, self.size.h);
        let (x, y) = match self.gravity {
            Gravity::None => (ax - w / 2, ay - h / 2),
            Gravity::Top => (ax - w / 2, ay - h),
            Gravity::Bottom => (ax - w / 2, ay),
            Gravity::Left => (ax - w, ay - h / 2),
            Gravity::Right => (ax, ay - h / 2),
            Gravity::TopLeft => (ax - w, ay - h),
            Gravity::BottomLeft => (ax - w, ay),
            Gravity::TopRight => (ax, ay - h),
            Gravity::BottomRight => (ax, ay),
        };
        Rectangle::new(x + self.offset.0, y + self.offset.1, w, h)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ack_happy_path() {
        let mut serials = ConfigureSerials::default();
        assert!(serials.commit_allowed());
        serials.sent(10);
        assert!(!serials.commit_allowed());
        assert_eq!(serials.ack(10), AckResult::Acked);
        assert!(serials.commit_allowed());
        assert_eq!(serials.last_acked(), Some(10));
    }

    #[test]
    fn ack_skipping_intermediate_serials() {
        let mut serials = ConfigureSerials::default();
        serials.sent(10);
        serials.sent(11);
        serials.sent(12);
        // acking the newest drops the older ones
        assert_eq!(serials.ack(12), AckResult::Acked);
        assert_eq!(serials.ack(11), AckResult::Stale);
    }

    #[test]
    fn stale_and_unknown_acks() {
        let mut serials = ConfigureSerials::default();
        serials.sent(10);
        serials.sent(11);
        assert_eq!(serials.ack(10), AckResult::Acked);
        // same serial again is stale, not an error
        assert_eq!(serials.ack(10), AckResult::Stale);
        // never sent
        assert_eq!(serials.ack(99), AckResult::Unknown);
        assert_eq!(serials.ack(11), AckResult::Acked);
    }

    #[test]
    fn toplevel_states_wire_encoding() {
        let mut toplevel: Toplevel<u32> = Toplevel::new(20);
        toplevel.states.insert(ToplevelState::Activated);
        toplevel.states.insert(ToplevelState::Maximized);
        let bytes = toplevel.states_array();
        // BTreeSet iterates in numeric order: maximized (1), activated (4)
        assert_eq!(bytes, vec![1, 0, 0, 0, 4, 0, 0, 0]);
    }

    #[test]
    fn positioner_placement() {
        let positioner = Positioner {
            size: Size::new(100, 50),
            anchor_rect: Rectangle::new(10, 10, 20, 20),
            anchor: Anchor::BottomRight,
            gravity: Gravity::BottomRight,
            ..Positioner::default()
        };
        assert!(positioner.is_complete());
        assert_eq!(positioner.placement(), Rectangle::new(30, 30, 100, 50));

        let incomplete = Positioner::default();
        assert!(!incomplete.is_complete());
    }
}
