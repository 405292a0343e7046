//! Gesture recognition above the raw touch stream
//!
//! Consumes `down`/`motion`/`up` and emits high-level gesture events with a
//! center point and scale/rotation magnitudes. One-finger sequences become
//! swipes, two-or-more-finger sequences pinches (which carry rotation).

use std::collections::HashMap;

/// A recognized gesture event
#[derive(Debug, Clone, PartialEq)]
pub enum GestureEvent {
    /// A swipe began or a pinch gained its first finger
    Begin {
        /// number of fingers involved
        fingers: usize,
        /// centroid of the contact points
        center: (f64, f64),
    },
    /// The contact points moved in a mostly-parallel way
    Swipe {
        /// centroid of the contact points
        center: (f64, f64),
        /// centroid displacement since the last event
        dx: f64,
        /// centroid displacement since the last event
        dy: f64,
    },
    /// The contact points moved relative to each other
    Pinch {
        /// centroid of the contact points
        center: (f64, f64),
        /// spread relative to the gesture start; 1.0 means unchanged
        scale: f64,
        /// rotation relative to the gesture start, in degrees
        rotation: f64,
    },
    /// All fingers left the device
    End {
        /// the sequence was cancelled rather than finished
        cancelled: bool,
    },
}

#[derive(Debug, Clone, Copy)]
struct Contact {
    x: f64,
    y: f64,
}

/// Recognizes gestures from a raw touch point stream
#[derive(Debug, Default)]
pub struct GestureRecognizer {
    contacts: HashMap<i32, Contact>,
    start_spread: Option<f64>,
    start_angle: Option<f64>,
    last_center: Option<(f64, f64)>,
    active: bool,
}

impl GestureRecognizer {
    /// A recognizer with no active sequence
    pub fn new() -> Self {
        Self::default()
    }

    fn center(&self) -> (f64, f64) {
        let n = self.contacts.len().max(1) as f64;
        let (sx, sy) = self
            .contacts
            .values()
            .fold((0.0, 0.0), |(sx, sy), c| (sx + c.x, sy + c.y));
        (sx / n, sy / n)
    }

    // mean distance of the contacts from their centroid
    fn spread(&self) -> f64 {
        if self.contacts.len() < 2 {
            return 0.0;
        }
        let (cx, cy) = self.center();
        let n = self.contacts.len() as f64;
        self.contacts
            .values()
            .map(|c| ((c.x - cx).powi(2) + (c.y - cy).powi(2)).sqrt())
            .sum::<f64>()
            / n
    }

    // angle of the first two contacts, sorted by id for stability
    fn angle(&self) -> Option<f64> {
        if self.contacts.len() < 2 {
            return None;
        }
        let mut ids: Vec<_> = self.contacts.keys().copied().collect();
        ids.sort_unstable();
        let a = self.contacts[&ids[0]];
        let b = self.contacts[&ids[1]];
        Some((b.y - a.y).atan2(b.x - a.x).to_degrees())
    }

    /// A touch point went down
    pub fn down(&mut self, id: i32, x: f64, y: f64) -> Option<GestureEvent> {
        self.contacts.insert(id, Contact { x, y });
        let center = self.center();
        self.last_center = Some(center);
        // re-baseline the spread whenever the finger count changes
        self.start_spread = Some(self.spread());
        self.start_angle = self.angle();
        self.active = true;
        Some(GestureEvent::Begin { fingers: self.contacts.len(), center })
    }

    /// A touch point moved
    pub fn motion(&mut self, id: i32, x: f64, y: f64) -> Option<GestureEvent> {
        let contact = self.contacts.get_mut(&id)?;
        contact.x = x;
        contact.y = y;

        let center = self.center();
        if self.contacts.len() >= 2 {
            let spread = self.spread();
            let scale = match self.start_spread {
                Some(start) if start > f64::EPSILON => spread / start,
                _ => 1.0,
            };
            let rotation = match (self.start_angle, self.angle()) {
                (Some(start), Some(now)) => {
                    let mut delta = now - start;
                    if delta > 180.0 {
                        delta -= 360.0;
                    } else if delta < -180.0 {
                        delta += 360.0;
                    }
                    delta
                }
                _ => 0.0,
            };
            self.last_center = Some(center);
            Some(GestureEvent::Pinch { center, scale, rotation })
        } else {
            let (lx, ly) = self.last_center.unwrap_or(center);
            self.last_center = Some(center);
            Some(GestureEvent::Swipe { center, dx: center.0 - lx, dy: center.1 - ly })
        }
    }

    /// A touch point went up
    pub fn up(&mut self, id: i32) -> Option<GestureEvent> {
        self.contacts.remove(&id)?;
        if self.contacts.is_empty() {
            self.active = false;
            self.start_spread = None;
            self.start_angle = None;
            self.last_center = None;
            Some(GestureEvent::End { cancelled: false })
        } else {
            self.start_spread = Some(self.spread());
            self.start_angle = self.angle();
            self.last_center = Some(self.center());
            None
        }
    }

    /// The touch sequence was cancelled
    pub fn cancel(&mut self) -> Option<GestureEvent> {
        if !self.active {
            return None;
        }
        self.contacts.clear();
        self.active = false;
        self.start_spread = None;
        self.start_angle = None;
        self.last_center = None;
        Some(GestureEvent::End { cancelled: true })
    }

    /// Number of fingers currently on the device
    pub fn fingers(&self) -> usize {
        self.contacts.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-6, "{a} != {b}");
    }

    #[test]
    fn one_finger_swipe() {
        let mut rec = GestureRecognizer::new();
        assert!(matches!(
            rec.down(0, 10.0, 10.0),
            Some(GestureEvent::Begin { fingers: 1, .. })
        ));
        match rec.motion(0, 15.0, 10.0) {
            Some(GestureEvent::Swipe { dx, dy, .. }) => {
                assert_close(dx, 5.0);
                assert_close(dy, 0.0);
            }
            other => panic!("expected swipe, got {other:?}"),
        }
        assert_eq!(rec.up(0), Some(GestureEvent::End { cancelled: false }));
    }

    #[test]
    fn two_finger_pinch_scale() {
        let mut rec = GestureRecognizer::new();
        rec.down(0, 0.0, 0.0);
        rec.down(1, 10.0, 0.0);
        // move the fingers apart to twice the distance
        rec.motion(0, -5.0, 0.0);
        match rec.motion(1, 15.0, 0.0) {
            Some(GestureEvent::Pinch { scale, rotation, center }) => {
                assert_close(scale, 2.0);
                assert_close(rotation, 0.0);
                assert_close(center.0, 5.0);
            }
            other => panic!("expected pinch, got {other:?}"),
        }
    }

    #[test]
    fn two_finger_rotation() {
        let mut rec = GestureRecognizer::new();
        rec.down(0, 0.0, 0.0);
        rec.down(1, 10.0, 0.0);
        // rotate the second finger a quarter turn around the first
        match rec.motion(1, 0.0, 10.0) {
            Some(GestureEvent::Pinch { rotation, .. }) => assert_close(rotation, 90.0),
            other => panic!("expected pinch, got {other:?}"),
        }
    }

    #[test]
    fn cancel_ends_the_sequence() {
        let mut rec = GestureRecognizer::new();
        rec.down(0, 0.0, 0.0);
        assert_eq!(rec.cancel(), Some(GestureEvent::End { cancelled: true }));
        assert_eq!(rec.cancel(), None);
        assert_eq!(rec.fingers(), 0);
    }

    #[test]
    fn lifting_one_of_two_fingers_rebaselines() {
        let mut rec = GestureRecognizer::new();
        rec.down(0, 0.0, 0.0);
        rec.down(1, 10.0, 0.0);
        assert_eq!(rec.up(0), None);
        // back to a swipe
        assert!(matches!(rec.motion(1, 12.0, 0.0), Some(GestureEvent::Swipe { .. })));
        assert_eq!(rec.up(1), Some(GestureEvent::End { cancelled: false }));
    }
}
