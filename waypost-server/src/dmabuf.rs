//! Import of GPU buffers shared by file descriptor

use std::os::unix::io::OwnedFd;

use waypost_protocols::enums::DmabufFlags;

/// Maximum number of planes a buffer may carry
pub const MAX_PLANES: usize = 4;

/// One plane of a dmabuf
#[derive(Debug)]
pub struct Plane {
    /// fd of the plane; always a real descriptor, sentinels are rejected at
    /// the protocol boundary
    pub fd: OwnedFd,
    /// byte offset of the plane in the fd
    pub offset: u32,
    /// bytes per row
    pub stride: u32,
}

/// Errors of the params collection phase
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ParamsError {
    /// the params object was already used to create a buffer
    #[error("the params object was already used")]
    AlreadyUsed,
    /// plane index out of bounds
    #[error("plane index {0} is out of bounds")]
    PlaneIdx(u32),
    /// the plane was already set
    #[error("plane {0} was already added")]
    PlaneSet(u32),
    /// missing planes, or the plane set does not start at 0
    #[error("the plane set is incomplete")]
    Incomplete,
    /// invalid width or height
    #[error("invalid dimensions")]
    InvalidDimensions,
    /// the modifier of a plane disagrees with the others
    #[error("planes carry inconsistent format modifiers")]
    InconsistentModifier,
}

/// In-construction state of a `zwp_linux_buffer_params_v1`
///
/// Collects planes one at a time, then converts into a [`DmabufSpec`] on
/// `create`. The object is single-use.
#[derive(Debug, Default)]
pub struct DmabufParams {
    planes: Vec<(u32, Plane)>,
    modifier: Option<u64>,
    used: bool,
}

impl DmabufParams {
    /// A fresh params object
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one plane
    pub fn add(
        &mut self,
        fd: OwnedFd,
        plane_idx: u32,
        offset: u32,
        stride: u32,
        modifier: u64,
    ) -> Result<(), ParamsError> {
        if self.used {
            return Err(ParamsError::AlreadyUsed);
        }
        if plane_idx as usize >= MAX_PLANES {
            return Err(ParamsError::PlaneIdx(plane_idx));
        }
        if self.planes.iter().any(|(idx, _)| *idx == plane_idx) {
            return Err(ParamsError::PlaneSet(plane_idx));
        }
        match self.modifier {
            Some(m) if m != modifier => return Err(ParamsError::InconsistentModifier),
            _ => self.modifier = Some(modifier),
        }
        self.planes.push((plane_idx, Plane { fd, offset, stride }));
        Ok(())
    }

    /// Finish the collection into a buffer description
    pub fn create(
        &mut self,
        width: i32,
        height: i32,
        format: u32,
        flags: DmabufFlags,
    ) -> Result<DmabufSpec, ParamsError> {
        if self.used {
            return Err(ParamsError::AlreadyUsed);
        }
        if width <= 0 || height <= 0 {
            return Err(ParamsError::InvalidDimensions);
        }
        if self.planes.is_empty() {
            return Err(ParamsError::Incomplete);
        }
        self.planes.sort_by_key(|(idx, _)| *idx);
        // the set must be exactly 0..n
        if self.planes.iter().enumerate().any(|(i, (idx, _))| i as u32 != *idx) {
            return Err(ParamsError::Incomplete);
        }
        self.used = true;
        Ok(DmabufSpec {
            planes: std::mem::take(&mut self.planes).into_iter().map(|(_, p)| p).collect(),
            width,
            height,
            format,
            modifier: self.modifier.unwrap_or(0),
            flags,
        })
    }
}

/// A complete imported dmabuf
#[derive(Debug)]
pub struct DmabufSpec {
    /// planes in index order
    pub planes: Vec<Plane>,
    /// width in pixels
    pub width: i32,
    /// height in pixels
    pub height: i32,
    /// DRM FourCC of the format
    pub format: u32,
    /// DRM format modifier shared by all planes
    pub modifier: u64,
    /// import flags
    pub flags: DmabufFlags,
}

/// A (format, modifier) pair advertised to clients
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatModifier {
    /// DRM FourCC of the format
    pub format: u32,
    /// DRM format modifier
    pub modifier: u64,
}

impl FormatModifier {
    /// Split the modifier into the (hi, lo) words of the wire encoding
    pub fn modifier_words(&self) -> (u32, u32) {
        ((self.modifier >> 32) as u32, self.modifier as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rustix::fs::{memfd_create, MemfdFlags};

    fn fake_fd() -> OwnedFd {
        memfd_create("waypost-test-dmabuf", MemfdFlags::CLOEXEC).unwrap()
    }

    #[test]
    fn collect_planes_in_any_order() {
        let mut params = DmabufParams::new();
        params.add(fake_fd(), 1, 4096, 256, 0).unwrap();
        params.add(fake_fd(), 0, 0, 512, 0).unwrap();
        let spec = params.create(128, 128, 0x3231564e, DmabufFlags::empty()).unwrap();
        assert_eq!(spec.planes.len(), 2);
        assert_eq!(spec.planes[0].stride, 512);
        assert_eq!(spec.planes[1].stride, 256);
    }

    #[test]
    fn rejects_duplicate_and_gap() {
        let mut params = DmabufParams::new();
        params.add(fake_fd(), 0, 0, 512, 0).unwrap();
        assert_eq!(
            params.add(fake_fd(), 0, 0, 512, 0).unwrap_err(),
            ParamsError::PlaneSet(0)
        );
        let mut gap = DmabufParams::new();
        gap.add(fake_fd(), 1, 0, 512, 0).unwrap();
        assert_eq!(
            gap.create(64, 64, 0, DmabufFlags::empty()).unwrap_err(),
            ParamsError::Incomplete
        );
    }

    #[test]
    fn single_use() {
        let mut params = DmabufParams::new();
        params.add(fake_fd(), 0, 0, 512, 0).unwrap();
        params.create(64, 64, 0, DmabufFlags::empty()).unwrap();
        assert_eq!(
            params.create(64, 64, 0, DmabufFlags::empty()).unwrap_err(),
            ParamsError::AlreadyUsed
        );
        assert_eq!(
            params.add(fake_fd(), 1, 0, 512, 0).unwrap_err(),
            ParamsError::AlreadyUsed
        );
    }

    #[test]
    fn inconsistent_modifiers() {
        let mut params = DmabufParams::new();
        params.add(fake_fd(), 0, 0, 512, 0x0100_0000_0000_0001).unwrap();
        assert_eq!(
            params.add(fake_fd(), 1, 0, 512, 0).unwrap_err(),
            ParamsError::InconsistentModifier
        );
    }

    #[test]
    fn modifier_words() {
        let fm = FormatModifier { format: 0, modifier: 0x0123_4567_89ab_cdef };
        assert_eq!(fm.modifier_words(), (0x0123_4567, 0x89ab_cdef));
    }
}
