//! Interfaces of the XDG activation protocol

use waypost_backend::protocol::{AllowNull, ArgumentType, Interface, MessageDesc};

use crate::core::{WL_SEAT_INTERFACE, WL_SURFACE_INTERFACE};

/// Interface `xdg_activation_v1`
pub static XDG_ACTIVATION_V1_INTERFACE: Interface = Interface {
    name: "xdg_activation_v1",
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
            name: "get_activation_token",
            since: 1,
            is_destructor: false,
            signature: &[ArgumentType::NewId],
            child_interface: Some(&XDG_ACTIVATION_TOKEN_V1_INTERFACE),
            arg_interfaces: &[],
        },
        MessageDesc {
            name: "activate",
            since: 1,
            is_destructor: false,
            signature: &[ArgumentType::Str(AllowNull::No), ArgumentType::Object(AllowNull::No)],
            child_interface: None,
            arg_interfaces: &[&WL_SURFACE_INTERFACE],
        },
    ],
    events: &[],
};

/// Interface `xdg_activation_token_v1`
pub static XDG_ACTIVATION_TOKEN_V1_INTERFACE: Interface = Interface {
    name: "xdg_activation_token_v1",
    version: 1,
    requests: &[
        MessageDesc {
            name: "set_serial",
            since: 1,
            is_destructor: false,
            signature: &[ArgumentType::Uint, ArgumentType::Object(AllowNull::No)],
            child_interface: None,
            arg_interfaces: &[&WL_SEAT_INTERFACE],
        },
        MessageDesc {
            name: "set_app_id",
            since: 1,
            is_destructor: false,
            signature: &[ArgumentType::Str(AllowNull::No)],
            child_interface: None,
            arg_interfaces: &[],
        },
        MessageDesc {
            name: "set_surface",
            since: 1,
            is_destructor: false,
            signature: &[ArgumentType::Object(AllowNull::No)],
            child_interface: None,
            arg_interfaces: &[&WL_SURFACE_INTERFACE],
        },
        MessageDesc {
            name: "commit",
            since: 1,
            is_destructor: false,
            signature: &[],
            child_interface: None,
            arg_interfaces: &[],
        },
        MessageDesc {
            name: "destroy",
            since: 1,
            is_destructor: true,
            signature: &[],
            child_interface: None,
            arg_interfaces: &[],
        },
    ],
    events: &[MessageDesc {
        name: "done",
        since: 1,
        is_destructor: false,
        signature: &[ArgumentType::Str(AllowNull::No)],
        child_interface: None,
        arg_interfaces: &[],
    }],
};
