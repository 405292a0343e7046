//! Interfaces of the viewporter protocol

use waypost_backend::protocol::{AllowNull, ArgumentType, Interface, MessageDesc};

use crate::core::WL_SURFACE_INTERFACE;

/// Interface `wp_viewporter`
pub static WP_VIEWPORTER_INTERFACE: Interface = Interface {
    name: "wp_viewporter",
    version: 1,
    requests: &[
        MessageDesc {
            name: "destroy",
            since: 1,
            is_destructor: true,
            signature: &[],
            child_interface: None,
            arg_interfaces: &[],
        },
        MessageDesc {
            name: "get_viewport",
            since: 1,
            is_destructor: false,
            signature: &[ArgumentType::NewId, ArgumentType::Object(AllowNull::No)],
            child_interface: Some(&WP_VIEWPORT_INTERFACE),
            arg_interfaces: &[&WL_SURFACE_INTERFACE],
        },
    ],
    events: &[],
};

/// Interface `wp_viewport`
pub static WP_VIEWPORT_INTERFACE: Interface = Interface {
    name: "wp_viewport",
    version: 1,
    requests: &[
        MessageDesc {
            name: "destroy",
            since: 1,
            is_destructor: true,
            signature: &[],
            child_interface: None,
            arg_interfaces: &[],
        },
        MessageDesc {
            name: "set_source",
            since: 1,
            is_destructor: false,
            signature: &[
                ArgumentType::Fixed,
                ArgumentType::Fixed,
                ArgumentType::Fixed,
                ArgumentType::Fixed,
            ],
            child_interface: None,
            arg_interfaces: &[],
        },
        MessageDesc {
            name: "set_destination",
            since: 1,
            is_destructor: false,
            signature: &[ArgumentType::Int, ArgumentType::Int],
            child_interface: None,
            arg_interfaces: &[],
        },
    ],
    events: &[],
};
