//! Interfaces of the fractional-scale protocol

use waypost_backend::protocol::{AllowNull, ArgumentType, Interface, MessageDesc};

use crate::core::WL_SURFACE_INTERFACE;

/// Interface `wp_fractional_scale_manager_v1`
pub static WP_FRACTIONAL_SCALE_MANAGER_V1_INTERFACE: Interface = Interface {
    name: "wp_fractional_scale_manager_v1",
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
            name: "get_fractional_scale",
            since: 1,
            is_destructor: false,
            signature: &[ArgumentType::NewId, ArgumentType::Object(AllowNull::No)],
            child_interface: Some(&WP_FRACTIONAL_SCALE_V1_INTERFACE),
            arg_interfaces: &[&WL_SURFACE_INTERFACE],
        },
    ],
    events: &[],
};

/// Interface `wp_fractional_scale_v1`
pub static WP_FRACTIONAL_SCALE_V1_INTERFACE: Interface = Interface {
    name: "wp_fractional_scale_v1",
    version: 1,
    requests: &[MessageDesc {
        name: "destroy",
        since: 1,
        is_destructor: true,
        signature: &[],
        child_interface: None,
        arg_interfaces: &[],
    }],
    events: &[MessageDesc {
        name: "preferred_scale",
        since: 1,
        is_destructor: false,
        signature: &[ArgumentType::Uint],
        child_interface: None,
        arg_interfaces: &[],
    }],
};
