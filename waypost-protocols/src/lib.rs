//! Static interface descriptors for the supported protocols
//!
//! Every interface is an immutable process-wide [`Interface`] constant with
//! its requests and events listed in opcode order. These tables are the
//! single source of truth for message signatures: the codec and both
//! dispatchers resolve `(interface, opcode)` pairs against them. The
//! `since` annotations gate messages on the version an object was bound at.
//!
//! [`Interface`]: waypost_backend::protocol::Interface

#![warn(missing_debug_implementations)]

pub mod core;
pub mod enums;
pub mod fractional_scale;
pub mod linux_dmabuf;
pub mod tablet;
pub mod viewporter;
pub mod xdg_activation;
pub mod xdg_shell;

pub use waypost_backend::{WL_CALLBACK_INTERFACE, WL_DISPLAY_INTERFACE, WL_REGISTRY_INTERFACE};

use waypost_backend::protocol::Interface;

/// All interfaces known to this crate, plus the three core ones
///
/// Useful for name-based lookups when handling `wl_registry.bind`.
pub static ALL_INTERFACES: &[&Interface] = &[
    &WL_DISPLAY_INTERFACE,
    &WL_REGISTRY_INTERFACE,
    &WL_CALLBACK_INTERFACE,
    &core::WL_COMPOSITOR_INTERFACE,
    &core::WL_SURFACE_INTERFACE,
    &core::WL_REGION_INTERFACE,
    &core::WL_BUFFER_INTERFACE,
    &core::WL_SHM_INTERFACE,
    &core::WL_SHM_POOL_INTERFACE,
    &core::WL_OUTPUT_INTERFACE,
    &core::WL_SEAT_INTERFACE,
    &core::WL_POINTER_INTERFACE,
    &core::WL_KEYBOARD_INTERFACE,
    &core::WL_TOUCH_INTERFACE,
    &core::WL_DATA_DEVICE_MANAGER_INTERFACE,
    &core::WL_DATA_DEVICE_INTERFACE,
    &core::WL_DATA_SOURCE_INTERFACE,
    &core::WL_DATA_OFFER_INTERFACE,
    &xdg_shell::XDG_WM_BASE_INTERFACE,
    &xdg_shell::XDG_POSITIONER_INTERFACE,
    &xdg_shell::XDG_SURFACE_INTERFACE,
    &xdg_shell::XDG_TOPLEVEL_INTERFACE,
    &xdg_shell::XDG_POPUP_INTERFACE,
    &xdg_activation::XDG_ACTIVATION_V1_INTERFACE,
    &xdg_activation::XDG_ACTIVATION_TOKEN_V1_INTERFACE,
    &linux_dmabuf::ZWP_LINUX_DMABUF_V1_INTERFACE,
    &linux_dmabuf::ZWP_LINUX_BUFFER_PARAMS_V1_INTERFACE,
    &linux_dmabuf::ZWP_LINUX_DMABUF_FEEDBACK_V1_INTERFACE,
    &tablet::ZWP_TABLET_MANAGER_V2_INTERFACE,
    &tablet::ZWP_TABLET_SEAT_V2_INTERFACE,
    &tablet::ZWP_TABLET_V2_INTERFACE,
    &tablet::ZWP_TABLET_TOOL_V2_INTERFACE,
    &fractional_scale::WP_FRACTIONAL_SCALE_MANAGER_V1_INTERFACE,
    &fractional_scale::WP_FRACTIONAL_SCALE_V1_INTERFACE,
    &viewporter::WP_VIEWPORTER_INTERFACE,
    &viewporter::WP_VIEWPORT_INTERFACE,
];

/// Find an interface by protocol name.
pub fn interface_by_name(name: &str) -> Option<&'static Interface> {
    ALL_INTERFACES.iter().copied().find(|iface| iface.name == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_lookup() {
        assert!(interface_by_name("wl_compositor").is_some());
        assert!(interface_by_name("xdg_wm_base").is_some());
        assert!(interface_by_name("wl_does_not_exist").is_none());
    }

    #[test]
    fn since_annotations_within_version() {
        for iface in ALL_INTERFACES {
            for msg in iface.requests.iter().chain(iface.events) {
                assert!(
                    msg.since <= iface.version.max(1),
                    "{}.{} has since {} above version {}",
                    iface.name,
                    msg.name,
                    msg.since,
                    iface.version
                );
            }
        }
    }

    #[test]
    fn object_args_have_interfaces() {
        use waypost_backend::protocol::ArgumentType;
        // every Object argument must have a corresponding arg_interfaces entry
        for iface in ALL_INTERFACES {
            for msg in iface.requests.iter().chain(iface.events) {
                let object_args = msg
                    .signature
                    .iter()
                    .filter(|a| matches!(a, ArgumentType::Object(_)))
                    .count();
                assert_eq!(
                    object_args,
                    msg.arg_interfaces.len(),
                    "{}.{} declares {} object args but {} arg interfaces",
                    iface.name,
                    msg.name,
                    object_args,
                    msg.arg_interfaces.len()
                );
            }
        }
    }
}
