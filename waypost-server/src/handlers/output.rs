//! Handler for bound `wl_output` resources

use std::os::unix::io::OwnedFd;
use std::sync::Arc;

use waypost_backend::protocol::Message;
use waypost_backend::server::{ClientId, ObjectData, ObjectId};

use crate::state::{Compositor, ServerHandle};

/// `wl_output` requests
///
/// The whole configuration is event-driven; the only request is `release`.
#[derive(Debug)]
pub struct OutputData;

impl ObjectData<Compositor> for OutputData {
    fn request(
        self: Arc<Self>,
        _handle: &ServerHandle,
        _data: &mut Compositor,
        _client_id: ClientId,
        msg: Message<ObjectId, OwnedFd>,
    ) -> Option<Arc<dyn ObjectData<Compositor>>> {
        match msg.opcode {
            // wl_output.release
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
        for entry in &mut data.outputs {
            entry.resources.retain(|id| id != &object_id);
        }
    }
}
