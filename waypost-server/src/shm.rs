//! Shared-memory pools and the buffers carved from them

use std::os::unix::io::{AsFd, AsRawFd, BorrowedFd, OwnedFd};

use memmap2::{Mmap, MmapOptions};
use waypost_protocols::enums::ShmFormat;

use crate::error::BufferError;

/// The set of SHM formats every compositor must accept
pub const BASELINE_FORMATS: &[ShmFormat] = &[ShmFormat::Argb8888, ShmFormat::Xrgb8888];

/// Bytes per pixel of a format, if it is a packed single-plane format
pub fn bytes_per_pixel(format: ShmFormat) -> Option<u32> {
    use ShmFormat::*;
    match format {
        C8 | Rgb332 | Bgr233 => Some(1),
        Xrgb4444 | Xbgr4444 | Rgbx4444 | Bgrx4444 | Argb4444 | Abgr4444 | Rgba4444 | Bgra4444
        | Xrgb1555 | Xbgr1555 | Rgbx5551 | Bgrx5551 | Argb1555 | Abgr1555 | Rgba5551 | Bgra5551
        | Rgb565 | Bgr565 => Some(2),
        Rgb888 | Bgr888 => Some(3),
        Argb8888 | Xrgb8888 | Xbgr8888 | Rgbx8888 | Bgrx8888 | Abgr8888 | Rgba8888 | Bgra8888
        | Xrgb2101010 | Xbgr2101010 | Rgbx1010102 | Bgrx1010102 | Argb2101010 | Abgr2101010
        | Rgba1010102 | Bgra1010102 | Ayuv => Some(4),
        Xrgb16161616f | Xbgr16161616f | Argb16161616f | Abgr16161616f => Some(8),
        // planar and packed-YUV formats have no single meaningful bpp
        _ => None,
    }
}

/// A memory pool backed by a client-provided file descriptor
///
/// The pool owns its fd and keeps the mapping alive until it is destroyed.
/// Destruction is deferred while buffers carved from the pool are alive;
/// the map is dropped before the fd is closed.
#[derive(Debug)]
pub struct ShmPool {
    fd: OwnedFd,
    map: Mmap,
    size: usize,
    live_buffers: usize,
    marked_destroyed: bool,
}

impl ShmPool {
    /// Map a new pool from a client fd
    pub fn new(fd: OwnedFd, size: i32) -> Result<Self, BufferError> {
        if size <= 0 {
            return Err(BufferError::InvalidSize(size));
        }
        let map = unsafe { MmapOptions::new().len(size as usize).map(fd.as_raw_fd()) }
            .map_err(BufferError::MmapFailed)?;
        Ok(Self { fd, map, size: size as usize, live_buffers: 0, marked_destroyed: false })
    }

    /// The current size of the pool in bytes
    pub fn size(&self) -> usize {
        self.size
    }

    /// The fd backing this pool
    pub fn fd(&self) -> BorrowedFd<'_> {
        self.fd.as_fd()
    }

    /// Access the mapped memory
    pub fn data(&self) -> &[u8] {
        &self.map
    }

    /// Grow the pool; shrinking is a protocol violation
    pub fn resize(&mut self, new_size: i32) -> Result<(), BufferError> {
        if new_size <= 0 || (new_size as usize) < self.size {
            return Err(BufferError::InvalidSize(new_size));
        }
        let map = unsafe { MmapOptions::new().len(new_size as usize).map(self.fd.as_raw_fd()) }
            .map_err(BufferError::MmapFailed)?;
        self.map = map;
        self.size = new_size as usize;
        Ok(())
    }

    /// Validate a buffer window and account for it
    pub fn carve_buffer(
        &mut self,
        offset: i32,
        width: i32,
        height: i32,
        stride: i32,
        format: ShmFormat,
        supported: &[ShmFormat],
    ) -> Result<ShmBufferSpec, BufferError> {
        if !supported.contains(&format) {
            return Err(BufferError::InvalidFormat(format.into()));
        }
        if width <= 0 || height <= 0 {
            return Err(BufferError::InvalidSize(if width <= 0 { width } else { height }));
        }
        if offset < 0 || stride <= 0 {
            return Err(BufferError::InvalidStride);
        }
        if let Some(bpp) = bytes_per_pixel(format) {
            if (stride as u64) < width as u64 * bpp as u64 {
                return Err(BufferError::InvalidStride);
            }
        }
        let end = offset as u64 + stride as u64 * height as u64;
        if end > self.size as u64 {
            return Err(BufferError::InvalidStride);
        }
        self.live_buffers += 1;
        Ok(ShmBufferSpec { offset, width, height, stride, format })
    }

    /// A buffer carved from this pool was destroyed
    ///
    /// Returns true if the pool was waiting for this to be released.
    pub fn buffer_destroyed(&mut self) -> bool {
        self.live_buffers = self.live_buffers.saturating_sub(1);
        self.marked_destroyed && self.live_buffers == 0
    }

    /// The client destroyed the pool object
    ///
    /// Returns true if the pool can be released immediately.
    pub fn mark_destroyed(&mut self) -> bool {
        self.marked_destroyed = true;
        self.live_buffers == 0
    }
}

/// The window a buffer occupies in its pool
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShmBufferSpec {
    /// byte offset of the first pixel in the pool
    pub offset: i32,
    /// width in pixels
    pub width: i32,
    /// height in pixels
    pub height: i32,
    /// bytes per row
    pub stride: i32,
    /// pixel format
    pub format: ShmFormat,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rustix::fs::{memfd_create, MemfdFlags};

    fn test_pool(size: i32) -> ShmPool {
        let fd = memfd_create("waypost-test-pool", MemfdFlags::CLOEXEC).unwrap();
        rustix::fs::ftruncate(&fd, size as u64).unwrap();
        ShmPool::new(fd, size).unwrap()
    }

    #[test]
    fn carve_within_bounds() {
        let mut pool = test_pool(4096);
        let spec = pool
            .carve_buffer(0, 32, 32, 128, ShmFormat::Argb8888, BASELINE_FORMATS)
            .unwrap();
        assert_eq!(spec.stride, 128);
        // exactly filling the pool is fine
        pool.carve_buffer(0, 32, 32, 128, ShmFormat::Xrgb8888, BASELINE_FORMATS).unwrap();
    }

    #[test]
    fn carve_out_of_bounds() {
        let mut pool = test_pool(4096);
        // one row too many
        assert!(matches!(
            pool.carve_buffer(128, 32, 32, 128, ShmFormat::Argb8888, BASELINE_FORMATS),
            Err(BufferError::InvalidStride)
        ));
        // stride below a pixel row
        assert!(matches!(
            pool.carve_buffer(0, 32, 32, 64, ShmFormat::Argb8888, BASELINE_FORMATS),
            Err(BufferError::InvalidStride)
        ));
        // unknown format
        assert!(matches!(
            pool.carve_buffer(0, 32, 32, 128, ShmFormat::Nv12, BASELINE_FORMATS),
            Err(BufferError::InvalidFormat(_))
        ));
    }

    #[test]
    fn resize_grows_only() {
        let mut pool = test_pool(4096);
        rustix::fs::ftruncate(&pool.fd, 8192).unwrap();
        pool.resize(8192).unwrap();
        assert_eq!(pool.size(), 8192);
        assert!(matches!(pool.resize(4096), Err(BufferError::InvalidSize(_))));
    }

    #[test]
    fn deferred_destruction() {
        let mut pool = test_pool(4096);
        pool.carve_buffer(0, 16, 16, 64, ShmFormat::Argb8888, BASELINE_FORMATS).unwrap();
        // destroy request arrives while a buffer is alive
        assert!(!pool.mark_destroyed());
        // released once the last buffer goes away
        assert!(pool.buffer_destroyed());
    }
}
