//! Per-interface request handlers
//!
//! One `ObjectData` implementation per interface, in the backend's
//! dispatch style: match on the opcode, destructure the decoded arguments,
//! mutate the state arenas. Handlers hold no state of their own; everything
//! lives in [`Compositor`](crate::state::Compositor), addressed by object
//! id.

mod compositor;
mod data_device;
mod dmabuf;
mod misc;
mod output;
mod seat;
mod shm;
mod xdg;

pub use compositor::{CallbackData, CompositorData, RegionData, SurfaceData};
pub use data_device::{DataDeviceData, DataDeviceManagerData, DataOfferData, DataSourceData};
pub use dmabuf::{DmabufData, FeedbackData, ParamsData};
pub use misc::{
    ActivationData, FractionalScaleData, FractionalScaleManagerData, TabletData,
    TabletManagerData, TabletSeatData, TokenData, ViewportData, ViewporterData,
};
pub use output::OutputData;
pub use seat::{KeyboardData, PointerData, SeatData, TouchData};
pub use shm::{BufferData, ShmData, ShmPoolData};
pub use xdg::{XdgPopupData, XdgPositionerData, XdgSurfaceData, XdgToplevelData, XdgWmBaseData};
