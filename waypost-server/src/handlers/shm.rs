//! Handlers for `wl_shm`, `wl_shm_pool` and `wl_buffer`

use std::ffi::CString;
use std::os::unix::io::OwnedFd;
use std::sync::Arc;

use waypost_backend::protocol::{Argument, Message};
use waypost_backend::server::{ClientId, ObjectData, ObjectId};
use waypost_protocols::enums::{ShmError, ShmFormat};

use crate::buffer::{Buffer, BufferSource};
use crate::error::BufferError;
use crate::shm::ShmPool;
use crate::state::{Compositor, ServerHandle};

fn shm_error_code(err: &BufferError) -> ShmError {
    match err {
        BufferError::InvalidFormat(_) => ShmError::InvalidFormat,
        BufferError::MmapFailed(_) | BufferError::InvalidFd => ShmError::InvalidFd,
        _ => ShmError::InvalidStride,
    }
}

/// `wl_shm` requests
#[derive(Debug)]
pub struct ShmData;

impl ObjectData<Compositor> for ShmData {
    fn request(
        self: Arc<Self>,
        handle: &ServerHandle,
        data: &mut Compositor,
        _client_id: ClientId,
        msg: Message<ObjectId, OwnedFd>,
    ) -> Option<Arc<dyn ObjectData<Compositor>>> {
        match msg.opcode {
            // wl_shm.create_pool(new id wl_shm_pool, fd, size)
            0 => {
                let sender = msg.sender_id.clone();
                if let [Argument::NewId(pool_id), Argument::Fd(_), Argument::Int(size)] =
                    &msg.args[..]
                {
                    let pool_id = pool_id.clone();
                    let size = *size;
                    // take the fd out of the message by value
                    let Some(Argument::Fd(fd)) = msg.args.into_iter().nth(1) else {
                        unreachable!()
                    };
                    match ShmPool::new(fd, size) {
                        Ok(pool) => {
                            data.pools.insert(pool_id, pool);
                            Some(Arc::new(ShmPoolData))
                        }
                        Err(err) => {
                            handle.post_error(
                                sender,
                                shm_error_code(&err).into(),
                                CString::new(format!("Cannot create pool: {err}")).unwrap(),
                            );
                            None
                        }
                    }
                } else {
                    unreachable!()
                }
            }
            // wl_shm.release
            1 => None,
            _ => unreachable!(),
        }
    }

    fn destroyed(
        self: Arc<Self>,
        _handle: &ServerHandle,
        _data: &mut Compositor,
        _client_id: ClientId,
        _object_id: ObjectId,
    ) {
    }
}

/// `wl_shm_pool` requests
#[derive(Debug)]
pub struct ShmPoolData;

impl ObjectData<Compositor> for ShmPoolData {
    fn request(
        self: Arc<Self>,
        handle: &ServerHandle,
        data: &mut Compositor,
        _client_id: ClientId,
        msg: Message<ObjectId, OwnedFd>,
    ) -> Option<Arc<dyn ObjectData<Compositor>>> {
        let pool_id = msg.sender_id.clone();
        match msg.opcode {
            // wl_shm_pool.create_buffer(new id, offset, width, height, stride, format)
            0 => {
                if let [Argument::NewId(buffer_id), Argument::Int(offset), Argument::Int(width), Argument::Int(height), Argument::Int(stride), Argument::Uint(format)] =
                    &msg.args[..]
                {
                    let format = match ShmFormat::try_from(*format) {
                        Ok(format) => format,
                        Err(()) => {
                            handle.post_error(
                                pool_id,
                                ShmError::InvalidFormat.into(),
                                CString::new(format!("Unknown format {format:#x}.")).unwrap(),
                            );
                            return None;
                        }
                    };
                    let formats = data.shm_formats.clone();
                    let Some(pool) = data.pools.get_mut(&pool_id) else {
                        handle.post_error(
                            pool_id,
                            ShmError::InvalidFd.into(),
                            CString::new("The pool has no backing memory.").unwrap(),
                        );
                        return None;
                    };
                    match pool.carve_buffer(*offset, *width, *height, *stride, format, &formats) {
                        Ok(spec) => {
                            data.buffers.insert(
                                buffer_id.clone(),
                                Buffer::new(BufferSource::Shm { pool: pool_id, spec }),
                            );
                            Some(Arc::new(BufferData))
                        }
                        Err(err) => {
                            handle.post_error(
                                pool_id,
                                shm_error_code(&err).into(),
                                CString::new(format!("Cannot create buffer: {err}")).unwrap(),
                            );
                            None
                        }
                    }
                } else {
                    unreachable!()
                }
            }
            // wl_shm_pool.destroy
            1 => None,
            // wl_shm_pool.resize(size)
            2 => {
                if let [Argument::Int(size)] = msg.args[..] {
                    if let Some(pool) = data.pools.get_mut(&pool_id) {
                        if let Err(err) = pool.resize(size) {
                            handle.post_error(
                                pool_id,
                                shm_error_code(&err).into(),
                                CString::new(format!("Cannot resize pool: {err}")).unwrap(),
                            );
                        }
                    }
                    None
                } else {
                    unreachable!()
                }
            }
            _ => unreachable!(),
        }
    }

    fn destroyed(
        self: Arc<Self>,
        _handle: &ServerHandle,
        data: &mut Compositor,
        _client_id: ClientId,
        object_id: ObjectId,
    ) {
        // the pool object is gone, but the backing memory stays mapped
        // until the last buffer carved from it is destroyed
        if let Some(pool) = data.pools.get_mut(&object_id) {
            if pool.mark_destroyed() {
                data.pools.remove(&object_id);
            }
        }
    }
}

/// `wl_buffer` requests
#[derive(Debug)]
pub struct BufferData;

impl ObjectData<Compositor> for BufferData {
    fn request(
        self: Arc<Self>,
        _handle: &ServerHandle,
        _data: &mut Compositor,
        _client_id: ClientId,
        msg: Message<ObjectId, OwnedFd>,
    ) -> Option<Arc<dyn ObjectData<Compositor>>> {
        match msg.opcode {
            // wl_buffer.destroy
            0 => None,
            _ => unreachable!(),
        }
    }

    fn destroyed(
        self: Arc<Self>,
        _handle: &ServerHandle,
        data: &mut Compositor,
        _client_id: ClientId,
        object_id: ObjectId,
    ) {
        data.destroy_buffer(&object_id);
    }
}
