//! The boundary between the protocol core and external renderers
//!
//! A renderer consumes a flat list of scene elements whose buffers resolve
//! to either an SHM pool window or a dmabuf plane set, and reports back a
//! frame completion per output. The completion is what drives per-surface
//! frame callbacks and buffer releases; the core does not care how (or
//! whether) pixels actually hit the screen.

use std::os::unix::io::BorrowedFd;

use waypost_protocols::enums::{ShmFormat, Transform};

use crate::dmabuf::Plane;
use crate::geometry::{Point, Rectangle, Size};

/// Pixel storage of one element, resolvable without protocol knowledge
#[derive(Debug)]
pub enum BufferPayload<'a> {
    /// A window into a mapped SHM pool
    Shm {
        /// the mapped bytes of the window's pool
        pool: &'a [u8],
        /// fd backing the pool, for renderers that import rather than copy
        fd: BorrowedFd<'a>,
        /// byte offset of the window in the pool
        offset: i32,
        /// bytes per row
        stride: i32,
        /// pixel format
        format: ShmFormat,
    },
    /// An imported dmabuf
    Dmabuf {
        /// planes in index order
        planes: &'a [Plane],
        /// DRM FourCC of the format
        format: u32,
        /// DRM format modifier
        modifier: u64,
    },
}

/// One view as handed to the renderer
#[derive(Debug)]
pub struct SceneElement<'a> {
    /// position in the global space
    pub position: Point,
    /// size in logical coordinates
    pub size: Size,
    /// buffer transform of the content
    pub transform: Transform,
    /// buffer scale of the content
    pub scale: i32,
    /// damage accumulated since the last frame, view-local
    pub damage: &'a [Rectangle],
    /// pixel size of the backing buffer
    pub buffer_size: Size,
    /// where the pixels live
    pub payload: BufferPayload<'a>,
}

/// An external renderer
///
/// Implementations draw the given elements however they see fit. Once the
/// resulting frame has been presented, the caller must feed the completion
/// back into the compositor so frame callbacks fire and buffers are
/// released.
pub trait Renderer {
    /// Draw one frame worth of elements, in paint order
    fn render_frame(&mut self, elements: &[SceneElement<'_>]) -> std::io::Result<()>;
}

/// A renderer that draws nothing
///
/// Useful for headless operation and tests; frame pacing still works since
/// completions are driven by the caller.
#[derive(Debug, Default)]
pub struct NullRenderer;

impl Renderer for NullRenderer {
    fn render_frame(&mut self, _elements: &[SceneElement<'_>]) -> std::io::Result<()> {
        Ok(())
    }
}
