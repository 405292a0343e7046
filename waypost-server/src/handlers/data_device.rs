//! Handlers for the data-device (selection and drag-and-drop) family

use std::ffi::CString;
use std::os::unix::io::{AsRawFd, OwnedFd};
use std::sync::Arc;

use waypost_backend::message;
use waypost_backend::protocol::{serial_is_newer_or_equal, Argument, Message};
use waypost_backend::server::{ClientId, Handle, ObjectData, ObjectId};
use waypost_protocols::core::WL_DATA_OFFER_INTERFACE;

use crate::state::{Compositor, ServerHandle};
use crate::surface::Role;

// wl_data_device.error.role
const DATA_DEVICE_ERR_ROLE: u32 = 0;

/// `wl_data_device_manager` requests
#[derive(Debug)]
pub struct DataDeviceManagerData;

impl ObjectData<Compositor> for DataDeviceManagerData {
    fn request(
        self: Arc<Self>,
        _handle: &ServerHandle,
        data: &mut Compositor,
        _client_id: ClientId,
        msg: Message<ObjectId, OwnedFd>,
    ) -> Option<Arc<dyn ObjectData<Compositor>>> {
        match msg.opcode {
            // wl_data_device_manager.create_data_source(new id)
            0 => {
                if let [Argument::NewId(id)] = &msg.args[..] {
                    data.data_devices.sources.insert(id.clone(), Vec::new());
                    Some(Arc::new(DataSourceData))
                } else {
                    unreachable!()
                }
            }
            // wl_data_device_manager.get_data_device(new id, seat)
            1 => {
                if let [Argument::NewId(id), Argument::Object(_seat)] = &msg.args[..] {
                    data.data_devices.devices.push(id.clone());
                    Some(Arc::new(DataDeviceData))
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

/// `wl_data_source` requests
#[derive(Debug)]
pub struct DataSourceData;

impl ObjectData<Compositor> for DataSourceData {
    fn request(
        self: Arc<Self>,
        _handle: &ServerHandle,
        data: &mut Compositor,
        _client_id: ClientId,
        msg: Message<ObjectId, OwnedFd>,
    ) -> Option<Arc<dyn ObjectData<Compositor>>> {
        match msg.opcode {
            // wl_data_source.offer(mime_type)
            0 => {
                if let [Argument::Str(Some(mime))] = &msg.args[..] {
                    if let Some(mimes) = data.data_devices.sources.get_mut(&msg.sender_id) {
                        mimes.push(mime.to_string_lossy().into_owned());
                    }
                    None
                } else {
                    unreachable!()
                }
            }
            // wl_data_source.destroy
            1 => None,
            // wl_data_source.set_actions(dnd_actions)
            2 => None,
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
        data.data_devices.sources.remove(&object_id);
        if data.data_devices.selection.as_ref() == Some(&object_id) {
            data.data_devices.selection = None;
        }
        data.data_devices.offers.retain(|_, source| source != &object_id);
    }
}

/// `wl_data_device` requests
#[derive(Debug)]
pub struct DataDeviceData;

impl ObjectData<Compositor> for DataDeviceData {
    fn request(
        self: Arc<Self>,
        handle: &ServerHandle,
        data: &mut Compositor,
        _client_id: ClientId,
        msg: Message<ObjectId, OwnedFd>,
    ) -> Option<Arc<dyn ObjectData<Compositor>>> {
        match msg.opcode {
            // wl_data_device.start_drag(source, origin, icon, serial)
            0 => {
                if let [Argument::Object(_source), Argument::Object(_origin), Argument::Object(icon), Argument::Uint(serial)] =
                    &msg.args[..]
                {
                    if !serial_is_newer_or_equal(data.serials.last_serial(), *serial) {
                        log::debug!("Ignoring start_drag with future serial {serial}");
                        return None;
                    }
                    if !icon.is_null() {
                        if let Some(surface) = data.surfaces.get_mut(icon) {
                            if surface.set_role(Role::DragIcon).is_err() {
                                handle.post_error(
                                    msg.sender_id.clone(),
                                    DATA_DEVICE_ERR_ROLE,
                                    CString::new("The drag icon surface already has a role.")
                                        .unwrap(),
                                );
                            }
                        }
                    }
                    None
                } else {
                    unreachable!()
                }
            }
            // wl_data_device.set_selection(source, serial)
            1 => {
                if let [Argument::Object(source), Argument::Uint(serial)] = &msg.args[..] {
                    if !serial_is_newer_or_equal(data.serials.last_serial(), *serial) {
                        log::debug!("Ignoring set_selection with future serial {serial}");
                        return None;
                    }
                    data.data_devices.selection = (!source.is_null()).then(|| source.clone());
                    offer_selection_to_focused(handle, data);
                    None
                } else {
                    unreachable!()
                }
            }
            // wl_data_device.release
            2 => None,
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
        data.data_devices.devices.retain(|id| id != &object_id);
    }
}

// Announce the current selection to the data devices of the keyboard-focus
// client: a fresh wl_data_offer carrying the source's mime list, then
// `selection`.
fn offer_selection_to_focused(handle: &ServerHandle, data: &mut Compositor) {
    let Some(focus) = data.seat.keyboard.focused().cloned() else { return };
    let client = focus.client_id();
    let devices: Vec<ObjectId> = data
        .data_devices
        .devices
        .iter()
        .filter(|d| d.client_id() == client)
        .cloned()
        .collect();
    for device in devices {
        let Some(source) = data.data_devices.selection.clone() else {
            // wl_data_device.selection(null)
            let _ = handle.send_event(message!(
                device,
                5,
                [Argument::Object(Handle::<Compositor>::null_id())]
            ));
            continue;
        };
        let version = handle.object_info(device.clone()).map(|i| i.version).unwrap_or(1);
        let Ok(offer) = handle.create_object(
            client.clone(),
            &WL_DATA_OFFER_INTERFACE,
            version,
            Arc::new(DataOfferData),
        ) else {
            continue;
        };
        data.data_devices.offers.insert(offer.clone(), source.clone());
        // wl_data_device.data_offer introduces the new object
        let _ = handle.send_event(message!(device.clone(), 0, [Argument::NewId(offer.clone())]));
        if let Some(mimes) = data.data_devices.sources.get(&source) {
            for mime in mimes {
                // wl_data_offer.offer
                let _ = handle.send_event(message!(
                    offer.clone(),
                    0,
                    [Argument::Str(Some(Box::new(CString::new(mime.clone()).unwrap())))]
                ));
            }
        }
        // wl_data_device.selection
        let _ = handle.send_event(message!(device, 5, [Argument::Object(offer)]));
    }
}

/// `wl_data_offer` requests
#[derive(Debug)]
pub struct DataOfferData;

impl ObjectData<Compositor> for DataOfferData {
    fn request(
        self: Arc<Self>,
        handle: &ServerHandle,
        data: &mut Compositor,
        _client_id: ClientId,
        msg: Message<ObjectId, OwnedFd>,
    ) -> Option<Arc<dyn ObjectData<Compositor>>> {
        let offer_id = msg.sender_id.clone();
        let source = data.data_devices.offers.get(&offer_id).cloned();
        match msg.opcode {
            // wl_data_offer.accept(serial, mime_type)
            0 => {
                if let [Argument::Uint(_), Argument::Str(mime)] = &msg.args[..] {
                    if let Some(source) = source {
                        // wl_data_source.target
                        let _ = handle.send_event(message!(
                            source,
                            0,
                            [Argument::Str(mime.clone())]
                        ));
                    }
                    None
                } else {
                    unreachable!()
                }
            }
            // wl_data_offer.receive(mime_type, fd)
            1 => {
                if let [Argument::Str(Some(mime)), Argument::Fd(fd)] = &msg.args[..] {
                    if let Some(source) = source {
                        // forward the write end to the source owner; the
                        // backend dups it into the outgoing queue
                        let _ = handle.send_event(message!(
                            source,
                            1,
                            [
                                Argument::Str(Some(mime.clone())),
                                Argument::Fd(fd.as_raw_fd()),
                            ]
                        ));
                    }
                    None
                } else {
                    unreachable!()
                }
            }
            // wl_data_offer.destroy
            2 => None,
            // wl_data_offer.finish
            3 => {
                if let Some(source) = source {
                    // wl_data_source.dnd_finished
                    let _ = handle.send_event(message!(source, 4, []));
                }
                None
            }
            // wl_data_offer.set_actions(dnd_actions, preferred_action)
            4 => {
                if let [Argument::Uint(_actions), Argument::Uint(preferred)] = msg.args[..] {
                    if let Some(source) = source {
                        // wl_data_source.action
                        let _ = handle
                            .send_event(message!(source, 5, [Argument::Uint(preferred)]));
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
        data.data_devices.offers.remove(&object_id);
    }
}
