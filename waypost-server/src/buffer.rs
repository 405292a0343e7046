//! Buffer records shared between the SHM, dmabuf and surface machinery

use crate::dmabuf::DmabufSpec;
use crate::geometry::Size;
use crate::shm::ShmBufferSpec;

/// Where the pixels of a buffer live
#[derive(Debug)]
pub enum BufferSource<Id> {
    /// A window into an SHM pool
    Shm {
        /// the pool the buffer was carved from
        pool: Id,
        /// the window inside the pool
        spec: ShmBufferSpec,
    },
    /// An imported dmabuf plane set
    Dmabuf(DmabufSpec),
}

/// A buffer known to the compositor
///
/// Ownership of the contents is shared with the client from the commit that
/// attaches the buffer until the `release` event; `busy` tracks that span.
#[derive(Debug)]
pub struct Buffer<Id> {
    /// backing storage
    pub source: BufferSource<Id>,
    /// the compositor may still sample from the buffer
    pub busy: bool,
    /// the client destroyed the buffer while it was busy
    pub destroyed: bool,
}

impl<Id> Buffer<Id> {
    /// Record a new buffer
    pub fn new(source: BufferSource<Id>) -> Self {
        Self { source, busy: false, destroyed: false }
    }

    /// The pixel size of the buffer
    pub fn size(&self) -> Size {
        match &self.source {
            BufferSource::Shm { spec, .. } => Size::new(spec.width, spec.height),
            BufferSource::Dmabuf(spec) => Size::new(spec.width, spec.height),
        }
    }
}
