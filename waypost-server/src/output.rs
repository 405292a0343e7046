//! Output advertisement and per-surface output membership

use waypost_protocols::enums::{ModeFlags, Subpixel, Transform};

use crate::geometry::{Point, Rectangle, Size};

/// One video mode of an output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mode {
    /// width in physical pixels
    pub width: i32,
    /// height in physical pixels
    pub height: i32,
    /// refresh rate in millihertz
    pub refresh: i32,
    /// current/preferred flags
    pub flags: ModeFlags,
}

/// Static and current configuration of an output
///
/// Everything here is advertised to clients in one atomic batch terminated
/// by a `done` event.
#[derive(Debug, Clone)]
pub struct Output {
    /// position in the global compositor space
    pub position: Point,
    /// physical dimensions in millimeters
    pub physical_size: Size,
    /// subpixel arrangement
    pub subpixel: Subpixel,
    /// manufacturer
    pub make: String,
    /// model name
    pub model: String,
    /// connector name, e.g. `DP-1`
    pub name: String,
    /// human-readable description
    pub description: String,
    /// output transform
    pub transform: Transform,
    /// integer scale factor
    pub scale: i32,
    /// available modes; exactly one should carry `CURRENT`
    pub modes: Vec<Mode>,
}

impl Output {
    /// A basic output with a single current+preferred mode
    pub fn new(name: impl Into<String>, width: i32, height: i32, refresh: i32) -> Self {
        Self {
            position: Point::default(),
            physical_size: Size::default(),
            subpixel: Subpixel::Unknown,
            make: String::new(),
            model: String::new(),
            name: name.into(),
            description: String::new(),
            transform: Transform::Normal,
            scale: 1,
            modes: vec![Mode {
                width,
                height,
                refresh,
                flags: ModeFlags::CURRENT | ModeFlags::PREFERRED,
            }],
        }
    }

    /// The mode currently driving the output
    pub fn current_mode(&self) -> Option<&Mode> {
        self.modes.iter().find(|m| m.flags.contains(ModeFlags::CURRENT))
    }

    /// The rectangle the output covers in the global space, in logical
    /// coordinates (mode size divided by scale, transform applied)
    pub fn geometry(&self) -> Rectangle {
        let Some(mode) = self.current_mode() else {
            return Rectangle::from_loc_and_size(self.position, Size::default());
        };
        let size = crate::geometry::buffer_to_surface_size(
            Size::new(mode.width, mode.height),
            self.transform,
            self.scale,
        );
        Rectangle::from_loc_and_size(self.position, size)
    }
}

/// The buffer scale a surface should use, given the outputs it overlaps
///
/// A surface on multiple outputs picks the highest scale.
pub fn preferred_scale<'a>(outputs: impl Iterator<Item = &'a Output>) -> i32 {
    outputs.map(|o| o.scale).max().unwrap_or(1).max(1)
}

/// Which outputs a rectangle overlaps, for enter/leave bookkeeping
pub fn outputs_for_rect<'a>(
    rect: Rectangle,
    outputs: impl Iterator<Item = (usize, &'a Output)>,
) -> Vec<usize> {
    outputs
        .filter(|(_, output)| output.geometry().overlaps(&rect))
        .map(|(idx, _)| idx)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn geometry_respects_scale_and_transform() {
        let mut output = Output::new("DP-1", 3840, 2160, 60_000);
        output.scale = 2;
        assert_eq!(output.geometry(), Rectangle::new(0, 0, 1920, 1080));
        output.transform = Transform::Rotate90;
        assert_eq!(output.geometry(), Rectangle::new(0, 0, 1080, 1920));
    }

    #[test]
    fn highest_scale_wins() {
        let a = Output::new("DP-1", 1920, 1080, 60_000);
        let mut b = Output::new("DP-2", 3840, 2160, 60_000);
        b.scale = 2;
        assert_eq!(preferred_scale([&a, &b].into_iter()), 2);
        assert_eq!(preferred_scale(std::iter::empty()), 1);
    }

    #[test]
    fn overlap_membership() {
        let a = Output::new("DP-1", 100, 100, 60_000);
        let mut b = Output::new("DP-2", 100, 100, 60_000);
        b.position = Point::new(100, 0);
        let outputs = [a, b];
        let hits = outputs_for_rect(
            Rectangle::new(90, 10, 20, 20),
            outputs.iter().enumerate(),
        );
        assert_eq!(hits, vec![0, 1]);
        let hits = outputs_for_rect(Rectangle::new(0, 0, 10, 10), outputs.iter().enumerate());
        assert_eq!(hits, vec![0]);
    }
}
