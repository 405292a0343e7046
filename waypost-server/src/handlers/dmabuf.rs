//! Handlers for the linux-dmabuf family

use std::ffi::CString;
use std::io::{Seek, Write};
use std::os::unix::io::{AsRawFd, OwnedFd};
use std::sync::Arc;

use waypost_backend::message;
use waypost_backend::protocol::{Argument, Message};
use waypost_backend::server::{ClientId, ObjectData, ObjectId};
use waypost_protocols::core::WL_BUFFER_INTERFACE;
use waypost_protocols::enums::{DmabufFlags, DmabufParamsError};

use crate::buffer::{Buffer, BufferSource};
use crate::dmabuf::{DmabufParams, ParamsError};
use crate::state::{Compositor, ServerHandle};

use super::shm::BufferData;

fn params_error_code(err: &ParamsError) -> DmabufParamsError {
    match err {
        ParamsError::AlreadyUsed => DmabufParamsError::AlreadyUsed,
        ParamsError::PlaneIdx(_) => DmabufParamsError::PlaneIdx,
        ParamsError::PlaneSet(_) => DmabufParamsError::PlaneSet,
        ParamsError::Incomplete => DmabufParamsError::Incomplete,
        ParamsError::InvalidDimensions => DmabufParamsError::InvalidDimensions,
        ParamsError::InconsistentModifier => DmabufParamsError::InvalidFormat,
    }
}

/// `zwp_linux_dmabuf_v1` requests
#[derive(Debug)]
pub struct DmabufData;

impl ObjectData<Compositor> for DmabufData {
    fn request(
        self: Arc<Self>,
        handle: &ServerHandle,
        data: &mut Compositor,
        _client_id: ClientId,
        msg: Message<ObjectId, OwnedFd>,
    ) -> Option<Arc<dyn ObjectData<Compositor>>> {
        match msg.opcode {
            // zwp_linux_dmabuf_v1.destroy
            0 => None,
            // zwp_linux_dmabuf_v1.create_params(new id)
            1 => {
                if let [Argument::NewId(id)] = &msg.args[..] {
                    data.dmabuf_params.insert(id.clone(), DmabufParams::new());
                    Some(Arc::new(ParamsData))
                } else {
                    unreachable!()
                }
            }
            // zwp_linux_dmabuf_v1.get_default_feedback(new id)
            // zwp_linux_dmabuf_v1.get_surface_feedback(new id, surface)
            2 | 3 => {
                if let Some(Argument::NewId(id)) = msg.args.first() {
                    send_feedback(handle, data, id.clone());
                    Some(Arc::new(FeedbackData))
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
        _data: &mut Compositor,
        _client_id: ClientId,
        _object_id: ObjectId,
    ) {
    }
}

// The feedback batch: main device, then one tranche listing every
// advertised format by table index, closed by `done`.
fn send_feedback(handle: &ServerHandle, data: &Compositor, feedback: ObjectId) {
    // format table: 16-byte entries of (format: u32, pad: u32, modifier: u64)
    let mut table = Vec::with_capacity(data.dmabuf_formats.len() * 16);
    for fm in &data.dmabuf_formats {
        table.extend_from_slice(&fm.format.to_le_bytes());
        table.extend_from_slice(&0u32.to_le_bytes());
        table.extend_from_slice(&fm.modifier.to_le_bytes());
    }
    if let Ok(fd) =
        rustix::fs::memfd_create("waypost-format-table", rustix::fs::MemfdFlags::CLOEXEC)
    {
        let mut file = std::fs::File::from(fd);
        if file.write_all(&table).and_then(|_| file.rewind()).is_ok() {
            // zwp_linux_dmabuf_feedback_v1.format_table
            let _ = handle.send_event(message!(
                feedback.clone(),
                1,
                [Argument::Fd(file.as_raw_fd()), Argument::Uint(table.len() as u32)]
            ));
        }
    }

    // no GPU is modeled here; the main device is a zeroed dev_t
    let device = vec![0u8; 8];
    // zwp_linux_dmabuf_feedback_v1.main_device
    let _ = handle
        .send_event(message!(feedback.clone(), 2, [Argument::Array(Box::new(device.clone()))]));
    // zwp_linux_dmabuf_feedback_v1.tranche_target_device
    let _ = handle.send_event(message!(feedback.clone(), 4, [Argument::Array(Box::new(device))]));

    // tranche_formats: u16 indices into the table
    let mut indices = Vec::with_capacity(data.dmabuf_formats.len() * 2);
    for i in 0..data.dmabuf_formats.len() as u16 {
        indices.extend_from_slice(&i.to_le_bytes());
    }
    let _ = handle.send_event(message!(
        feedback.clone(),
        5,
        [Argument::Array(Box::new(indices))]
    ));
    // zwp_linux_dmabuf_feedback_v1.tranche_flags
    let _ = handle.send_event(message!(feedback.clone(), 6, [Argument::Uint(0)]));
    // zwp_linux_dmabuf_feedback_v1.tranche_done, then done
    let _ = handle.send_event(message!(feedback.clone(), 3, []));
    let _ = handle.send_event(message!(feedback, 0, []));
}

/// `zwp_linux_buffer_params_v1` requests
#[derive(Debug)]
pub struct ParamsData;

impl ObjectData<Compositor> for ParamsData {
    fn request(
        self: Arc<Self>,
        handle: &ServerHandle,
        data: &mut Compositor,
        client_id: ClientId,
        msg: Message<ObjectId, OwnedFd>,
    ) -> Option<Arc<dyn ObjectData<Compositor>>> {
        let params_id = msg.sender_id.clone();
        match msg.opcode {
            // zwp_linux_buffer_params_v1.destroy
            0 => None,
            // zwp_linux_buffer_params_v1.add(fd, plane_idx, offset, stride,
            //                                modifier_hi, modifier_lo)
            1 => {
                if let [Argument::Fd(_), Argument::Uint(plane_idx), Argument::Uint(offset), Argument::Uint(stride), Argument::Uint(hi), Argument::Uint(lo)] =
                    &msg.args[..]
                {
                    let (plane_idx, offset, stride) = (*plane_idx, *offset, *stride);
                    let modifier = ((*hi as u64) << 32) | *lo as u64;
                    let Some(Argument::Fd(fd)) = msg.args.into_iter().next() else {
                        unreachable!()
                    };
                    if let Some(params) = data.dmabuf_params.get_mut(&params_id) {
                        if let Err(err) = params.add(fd, plane_idx, offset, stride, modifier) {
                            handle.post_error(
                                params_id,
                                params_error_code(&err).into(),
                                CString::new(format!("Cannot add plane: {err}")).unwrap(),
                            );
                        }
                    }
                    None
                } else {
                    unreachable!()
                }
            }
            // zwp_linux_buffer_params_v1.create(width, height, format, flags)
            2 => {
                if let [Argument::Int(width), Argument::Int(height), Argument::Uint(format), Argument::Uint(flags)] =
                    msg.args[..]
                {
                    let Some(flags) = DmabufFlags::from_bits(flags) else {
                        handle.post_error(
                            params_id,
                            DmabufParamsError::InvalidFormat.into(),
                            CString::new(format!("Unknown import flags {flags:#x}.")).unwrap(),
                        );
                        return None;
                    };
                    let Some(params) = data.dmabuf_params.get_mut(&params_id) else {
                        return None;
                    };
                    match params.create(width, height, format, flags) {
                        Ok(spec) => {
                            let Ok(buffer_id) = handle.create_object(
                                client_id,
                                &WL_BUFFER_INTERFACE,
                                1,
                                Arc::new(BufferData),
                            ) else {
                                return None;
                            };
                            data.buffers
                                .insert(buffer_id.clone(), Buffer::new(BufferSource::Dmabuf(spec)));
                            // zwp_linux_buffer_params_v1.created
                            let _ = handle.send_event(message!(
                                params_id,
                                0,
                                [Argument::NewId(buffer_id)]
                            ));
                        }
                        Err(err) => {
                            log::debug!("dmabuf import failed: {err}");
                            // zwp_linux_buffer_params_v1.failed
                            let _ = handle.send_event(message!(params_id, 1, []));
                        }
                    }
                    None
                } else {
                    unreachable!()
                }
            }
            // zwp_linux_buffer_params_v1.create_immed(new id, width, height,
            //                                         format, flags)
            3 => {
                if let [Argument::NewId(buffer_id), Argument::Int(width), Argument::Int(height), Argument::Uint(format), Argument::Uint(flags)] =
                    &msg.args[..]
                {
                    let Some(flags) = DmabufFlags::from_bits(*flags) else {
                        handle.post_error(
                            params_id,
                            DmabufParamsError::InvalidFormat.into(),
                            CString::new(format!("Unknown import flags {flags:#x}.")).unwrap(),
                        );
                        return None;
                    };
                    let Some(params) = data.dmabuf_params.get_mut(&params_id) else {
                        handle.post_error(
                            params_id,
                            DmabufParamsError::AlreadyUsed.into(),
                            CString::new("The params object has no state.").unwrap(),
                        );
                        return None;
                    };
                    match params.create(*width, *height, *format, flags) {
                        Ok(spec) => {
                            data.buffers
                                .insert(buffer_id.clone(), Buffer::new(BufferSource::Dmabuf(spec)));
                            Some(Arc::new(BufferData))
                        }
                        Err(err) => {
                            // with create_immed there is no failure event
                            handle.post_error(
                                params_id,
                                DmabufParamsError::InvalidWlBuffer.into(),
                                CString::new(format!("Cannot import buffer: {err}")).unwrap(),
                            );
                            None
                        }
                    }
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
        data.dmabuf_params.remove(&object_id);
    }
}

/// `zwp_linux_dmabuf_feedback_v1` requests
#[derive(Debug)]
pub struct FeedbackData;

impl ObjectData<Compositor> for FeedbackData {
    fn request(
        self: Arc<Self>,
        _handle: &ServerHandle,
        _data: &mut Compositor,
        _client_id: ClientId,
        msg: Message<ObjectId, OwnedFd>,
    ) -> Option<Arc<dyn ObjectData<Compositor>>> {
        match msg.opcode {
            // zwp_linux_dmabuf_feedback_v1.destroy
            0 => None,
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
