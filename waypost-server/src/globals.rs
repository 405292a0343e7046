//! Global advertisement: one handler per global the compositor offers

use std::ffi::CString;
use std::sync::Arc;

use waypost_backend::message;
use waypost_backend::protocol::Argument;
use waypost_backend::server::{ClientId, GlobalHandler, GlobalId, ObjectData, ObjectId};
use waypost_protocols::{
    core as proto, fractional_scale, linux_dmabuf, tablet, viewporter, xdg_activation, xdg_shell,
};

use crate::handlers;
use crate::state::{Compositor, ServerHandle};

/// Ids of the globals a default compositor advertises
#[derive(Debug)]
pub struct Globals {
    /// `wl_compositor`
    pub compositor: GlobalId,
    /// `wl_shm`
    pub shm: GlobalId,
    /// `wl_seat`
    pub seat: GlobalId,
    /// `wl_output`, one per output
    pub outputs: Vec<GlobalId>,
    /// `xdg_wm_base`
    pub wm_base: GlobalId,
    /// `zwp_linux_dmabuf_v1`
    pub dmabuf: GlobalId,
    /// `wl_data_device_manager`
    pub data_device_manager: GlobalId,
    /// `wp_viewporter`
    pub viewporter: GlobalId,
    /// `wp_fractional_scale_manager_v1`
    pub fractional_scale: GlobalId,
    /// `xdg_activation_v1`
    pub activation: GlobalId,
    /// `zwp_tablet_manager_v2`
    pub tablet_manager: GlobalId,
}

/// Create every global of the default compositor
///
/// Outputs must already be registered on the state; one `wl_output` global
/// is created per entry.
pub fn create_globals(handle: &ServerHandle, output_count: usize) -> Globals {
    Globals {
        compositor: handle.create_global(
            &proto::WL_COMPOSITOR_INTERFACE,
            6,
            Arc::new(CompositorGlobal),
        ),
        shm: handle.create_global(&proto::WL_SHM_INTERFACE, 2, Arc::new(ShmGlobal)),
        seat: handle.create_global(&proto::WL_SEAT_INTERFACE, 9, Arc::new(SeatGlobal)),
        outputs: (0..output_count)
            .map(|index| {
                handle.create_global(
                    &proto::WL_OUTPUT_INTERFACE,
                    4,
                    Arc::new(OutputGlobal { index }),
                )
            })
            .collect(),
        wm_base: handle.create_global(
            &xdg_shell::XDG_WM_BASE_INTERFACE,
            6,
            Arc::new(XdgWmBaseGlobal),
        ),
        dmabuf: handle.create_global(
            &linux_dmabuf::ZWP_LINUX_DMABUF_V1_INTERFACE,
            5,
            Arc::new(DmabufGlobal),
        ),
        data_device_manager: handle.create_global(
            &proto::WL_DATA_DEVICE_MANAGER_INTERFACE,
            3,
            Arc::new(DataDeviceManagerGlobal),
        ),
        viewporter: handle.create_global(
            &viewporter::WP_VIEWPORTER_INTERFACE,
            1,
            Arc::new(ViewporterGlobal),
        ),
        fractional_scale: handle.create_global(
            &fractional_scale::WP_FRACTIONAL_SCALE_MANAGER_V1_INTERFACE,
            1,
            Arc::new(FractionalScaleManagerGlobal),
        ),
        activation: handle.create_global(
            &xdg_activation::XDG_ACTIVATION_V1_INTERFACE,
            1,
            Arc::new(ActivationGlobal),
        ),
        tablet_manager: handle.create_global(
            &tablet::ZWP_TABLET_MANAGER_V2_INTERFACE,
            2,
            Arc::new(TabletManagerGlobal),
        ),
    }
}

/// `wl_compositor`
#[derive(Debug)]
pub struct CompositorGlobal;

impl GlobalHandler<Compositor> for CompositorGlobal {
    fn bind(
        self: Arc<Self>,
        _handle: &ServerHandle,
        _data: &mut Compositor,
        _client_id: ClientId,
        _global_id: GlobalId,
        _object_id: ObjectId,
    ) -> Arc<dyn ObjectData<Compositor>> {
        Arc::new(handlers::CompositorData)
    }
}

/// `wl_shm`: announces the supported formats at bind time
#[derive(Debug)]
pub struct ShmGlobal;

impl GlobalHandler<Compositor> for ShmGlobal {
    fn bind(
        self: Arc<Self>,
        handle: &ServerHandle,
        data: &mut Compositor,
        _client_id: ClientId,
        _global_id: GlobalId,
        object_id: ObjectId,
    ) -> Arc<dyn ObjectData<Compositor>> {
        for format in &data.shm_formats {
            // wl_shm.format
            let _ = handle
                .send_event(message!(object_id.clone(), 0, [Argument::Uint((*format).into())]));
        }
        Arc::new(handlers::ShmData)
    }
}

/// `wl_seat`: announces capabilities and name at bind time
#[derive(Debug)]
pub struct SeatGlobal;

impl GlobalHandler<Compositor> for SeatGlobal {
    fn bind(
        self: Arc<Self>,
        handle: &ServerHandle,
        data: &mut Compositor,
        _client_id: ClientId,
        _global_id: GlobalId,
        object_id: ObjectId,
    ) -> Arc<dyn ObjectData<Compositor>> {
        data.seat_resources.push(object_id.clone());
        // wl_seat.capabilities
        let _ = handle.send_event(message!(
            object_id.clone(),
            0,
            [Argument::Uint(data.seat.capabilities.bits())]
        ));
        if let Ok(info) = handle.object_info(object_id.clone()) {
            if info.version >= 2 {
                // wl_seat.name
                let _ = handle.send_event(message!(
                    object_id,
                    1,
                    [Argument::Str(Some(Box::new(
                        CString::new(data.seat.name.clone()).unwrap()
                    )))]
                ));
            }
        }
        Arc::new(handlers::SeatData)
    }
}

/// `wl_output`: announces the full configuration batch at bind time
#[derive(Debug)]
pub struct OutputGlobal {
    /// index into the state's output list
    pub index: usize,
}

impl GlobalHandler<Compositor> for OutputGlobal {
    fn bind(
        self: Arc<Self>,
        handle: &ServerHandle,
        data: &mut Compositor,
        _client_id: ClientId,
        _global_id: GlobalId,
        object_id: ObjectId,
    ) -> Arc<dyn ObjectData<Compositor>> {
        let version = handle.object_info(object_id.clone()).map(|i| i.version).unwrap_or(1);
        if let Some(entry) = data.outputs.get_mut(self.index) {
            entry.resources.push(object_id.clone());
            let output = &entry.output;
            // wl_output.geometry
            let _ = handle.send_event(message!(
                object_id.clone(),
                0,
                [
                    Argument::Int(output.position.x),
                    Argument::Int(output.position.y),
                    Argument::Int(output.physical_size.w),
                    Argument::Int(output.physical_size.h),
                    Argument::Int(u32::from(output.subpixel) as i32),
                    Argument::Str(Some(Box::new(CString::new(output.make.clone()).unwrap()))),
                    Argument::Str(Some(Box::new(CString::new(output.model.clone()).unwrap()))),
                    Argument::Int(u32::from(output.transform) as i32),
                ]
            ));
            for mode in &output.modes {
                // wl_output.mode
                let _ = handle.send_event(message!(
                    object_id.clone(),
                    1,
                    [
                        Argument::Uint(mode.flags.bits()),
                        Argument::Int(mode.width),
                        Argument::Int(mode.height),
                        Argument::Int(mode.refresh),
                    ]
                ));
            }
            if version >= 2 {
                // wl_output.scale
                let _ = handle.send_event(message!(
                    object_id.clone(),
                    3,
                    [Argument::Int(output.scale)]
                ));
            }
            if version >= 4 {
                // wl_output.name and .description
                let _ = handle.send_event(message!(
                    object_id.clone(),
                    4,
                    [Argument::Str(Some(Box::new(CString::new(output.name.clone()).unwrap())))]
                ));
                let _ = handle.send_event(message!(
                    object_id.clone(),
                    5,
                    [Argument::Str(Some(Box::new(
                        CString::new(output.description.clone()).unwrap()
                    )))]
                ));
            }
            if version >= 2 {
                // wl_output.done closes the batch
                let _ = handle.send_event(message!(object_id.clone(), 2, []));
            }
        }
        Arc::new(handlers::OutputData)
    }
}

/// `xdg_wm_base`
#[derive(Debug)]
pub struct XdgWmBaseGlobal;

impl GlobalHandler<Compositor> for XdgWmBaseGlobal {
    fn bind(
        self: Arc<Self>,
        _handle: &ServerHandle,
        _data: &mut Compositor,
        _client_id: ClientId,
        _global_id: GlobalId,
        _object_id: ObjectId,
    ) -> Arc<dyn ObjectData<Compositor>> {
        Arc::new(handlers::XdgWmBaseData)
    }
}

/// `zwp_linux_dmabuf_v1`: pre-v4 clients get the format/modifier events
#[derive(Debug)]
pub struct DmabufGlobal;

impl GlobalHandler<Compositor> for DmabufGlobal {
    fn bind(
        self: Arc<Self>,
        handle: &ServerHandle,
        data: &mut Compositor,
        _client_id: ClientId,
        _global_id: GlobalId,
        object_id: ObjectId,
    ) -> Arc<dyn ObjectData<Compositor>> {
        let version = handle.object_info(object_id.clone()).map(|i| i.version).unwrap_or(1);
        if version < 4 {
            for fm in &data.dmabuf_formats {
                // zwp_linux_dmabuf_v1.format (deprecated but expected pre-v4)
                let _ = handle
                    .send_event(message!(object_id.clone(), 0, [Argument::Uint(fm.format)]));
                if version >= 3 {
                    let (hi, lo) = fm.modifier_words();
                    // zwp_linux_dmabuf_v1.modifier
                    let _ = handle.send_event(message!(
                        object_id.clone(),
                        1,
                        [Argument::Uint(fm.format), Argument::Uint(hi), Argument::Uint(lo)]
                    ));
                }
            }
        }
        Arc::new(handlers::DmabufData)
    }
}

/// `wl_data_device_manager`
#[derive(Debug)]
pub struct DataDeviceManagerGlobal;

impl GlobalHandler<Compositor> for DataDeviceManagerGlobal {
    fn bind(
        self: Arc<Self>,
        _handle: &ServerHandle,
        _data: &mut Compositor,
        _client_id: ClientId,
        _global_id: GlobalId,
        _object_id: ObjectId,
    ) -> Arc<dyn ObjectData<Compositor>> {
        Arc::new(handlers::DataDeviceManagerData)
    }
}

/// `wp_viewporter`
#[derive(Debug)]
pub struct ViewporterGlobal;

impl GlobalHandler<Compositor> for ViewporterGlobal {
    fn bind(
        self: Arc<Self>,
        _handle: &ServerHandle,
        _data: &mut Compositor,
        _client_id: ClientId,
        _global_id: GlobalId,
        _object_id: ObjectId,
    ) -> Arc<dyn ObjectData<Compositor>> {
        Arc::new(handlers::ViewporterData)
    }
}

/// `wp_fractional_scale_manager_v1`
#[derive(Debug)]
pub struct FractionalScaleManagerGlobal;

impl GlobalHandler<Compositor> for FractionalScaleManagerGlobal {
    fn bind(
        self: Arc<Self>,
        _handle: &ServerHandle,
        _data: &mut Compositor,
        _client_id: ClientId,
        _global_id: GlobalId,
        _object_id: ObjectId,
    ) -> Arc<dyn ObjectData<Compositor>> {
        Arc::new(handlers::FractionalScaleManagerData)
    }
}

/// `xdg_activation_v1`
#[derive(Debug)]
pub struct ActivationGlobal;

impl GlobalHandler<Compositor> for ActivationGlobal {
    fn bind(
        self: Arc<Self>,
        _handle: &ServerHandle,
        _data: &mut Compositor,
        _client_id: ClientId,
        _global_id: GlobalId,
        _object_id: ObjectId,
    ) -> Arc<dyn ObjectData<Compositor>> {
        Arc::new(handlers::ActivationData)
    }
}

/// `zwp_tablet_manager_v2`
#[derive(Debug)]
pub struct TabletManagerGlobal;

impl GlobalHandler<Compositor> for TabletManagerGlobal {
    fn bind(
        self: Arc<Self>,
        _handle: &ServerHandle,
        _data: &mut Compositor,
        _client_id: ClientId,
        _global_id: GlobalId,
        _object_id: ObjectId,
    ) -> Arc<dyn ObjectData<Compositor>> {
        Arc::new(handlers::TabletManagerData)
    }
}
