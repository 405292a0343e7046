//! Interfaces of the XDG shell protocol

use waypost_backend::protocol::{AllowNull, ArgumentType, Interface, MessageDesc};

use crate::core::{WL_OUTPUT_INTERFACE, WL_SEAT_INTERFACE, WL_SURFACE_INTERFACE};

/// Interface `xdg_wm_base`
pub static XDG_WM_BASE_INTERFACE: Interface = Interface {
    name: "xdg_wm_base",
    version: 6,
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
            name: "create_positioner",
            since: 1,
            is_destructor: false,
            signature: &[ArgumentType::NewId],
            child_interface: Some(&XDG_POSITIONER_INTERFACE),
            arg_interfaces: &[],
        },
        MessageDesc {
            name: "get_xdg_surface",
            since: 1,
            is_destructor: false,
            signature: &[ArgumentType::NewId, ArgumentType::Object(AllowNull::No)],
            child_interface: Some(&XDG_SURFACE_INTERFACE),
            arg_interfaces: &[&WL_SURFACE_INTERFACE],
        },
        MessageDesc {
            name: "pong",
            since: 1,
            is_destructor: false,
            signature: &[ArgumentType::Uint],
            child_interface: None,
            arg_interfaces: &[],
        },
    ],
    events: &[MessageDesc {
        name: "ping",
        since: 1,
        is_destructor: false,
        signature: &[ArgumentType::Uint],
        child_interface: None,
        arg_interfaces: &[],
    }],
};

/// Interface `xdg_positioner`
pub static XDG_POSITIONER_INTERFACE: Interface = Interface {
    name: "xdg_positioner",
    version: 6,
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
            name: "set_size",
            since: 1,
            is_destructor: false,
            signature: &[ArgumentType::Int, ArgumentType::Int],
            child_interface: None,
            arg_interfaces: &[],
        },
        MessageDesc {
            name: "set_anchor_rect",
            since: 1,
            is_destructor: false,
            signature: &[
                ArgumentType::Int,
                ArgumentType::Int,
                ArgumentType::Int,
                ArgumentType::Int,
            ],
            child_interface: None,
            arg_interfaces: &[],
        },
        MessageDesc {
            name: "set_anchor",
            since: 1,
            is_destructor: false,
            signature: &[ArgumentType::Uint],
            child_interface: None,
            arg_interfaces: &[],
        },
        MessageDesc {
            name: "set_gravity",
            since: 1,
            is_destructor: false,
            signature: &[ArgumentType::Uint],
            child_interface: None,
            arg_interfaces: &[],
        },
        MessageDesc {
            name: "set_constraint_adjustment",
            since: 1,
            is_destructor: false,
            signature: &[ArgumentType::Uint],
            child_interface: None,
            arg_interfaces: &[],
        },
        MessageDesc {
            name: "set_offset",
            since: 1,
            is_destructor: false,
            signature: &[ArgumentType::Int, ArgumentType::Int],
            child_interface: None,
            arg_interfaces: &[],
        },
        MessageDesc {
            name: "set_reactive",
            since: 3,
            is_destructor: false,
            signature: &[],
            child_interface: None,
            arg_interfaces: &[],
        },
        MessageDesc {
            name: "set_parent_size",
            since: 3,
            is_destructor: false,
            signature: &[ArgumentType::Int, ArgumentType::Int],
            child_interface: None,
            arg_interfaces: &[],
        },
        MessageDesc {
            name: "set_parent_configure",
            since: 3,
            is_destructor: false,
            signature: &[ArgumentType::Uint],
            child_interface: None,
            arg_interfaces: &[],
        },
    ],
    events: &[],
};

/// Interface `xdg_surface`
pub static XDG_SURFACE_INTERFACE: Interface = Interface {
    name: "xdg_surface",
    version: 6,
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
            name: "get_toplevel",
            since: 1,
            is_destructor: false,
            signature: &[ArgumentType::NewId],
            child_interface: Some(&XDG_TOPLEVEL_INTERFACE),
            arg_interfaces: &[],
        },
        MessageDesc {
            name: "get_popup",
            since: 1,
            is_destructor: false,
            signature: &[
                ArgumentType::NewId,
                ArgumentType::Object(AllowNull::Yes),
                ArgumentType::Object(AllowNull::No),
            ],
            child_interface: Some(&XDG_POPUP_INTERFACE),
            arg_interfaces: &[&XDG_SURFACE_INTERFACE, &XDG_POSITIONER_INTERFACE],
        },
        MessageDesc {
            name: "set_window_geometry",
            since: 1,
            is_destructor: false,
            signature: &[
                ArgumentType::Int,
                ArgumentType::Int,
                ArgumentType::Int,
                ArgumentType::Int,
            ],
            child_interface: None,
            arg_interfaces: &[],
        },
        MessageDesc {
            name: "ack_configure",
            since: 1,
            is_destructor: false,
            signature: &[ArgumentType::Uint],
            child_interface: None,
            arg_interfaces: &[],
        },
    ],
    events: &[MessageDesc {
        name: "configure",
        since: 1,
        is_destructor: false,
        signature: &[ArgumentType::Uint],
        child_interface: None,
        arg_interfaces: &[],
    }],
};

/// Interface `xdg_toplevel`
pub static XDG_TOPLEVEL_INTERFACE: Interface = Interface {
    name: "xdg_toplevel",
    version: 6,
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
            name: "set_parent",
            since: 1,
            is_destructor: false,
            signature: &[ArgumentType::Object(AllowNull::Yes)],
            child_interface: None,
            arg_interfaces: &[&XDG_TOPLEVEL_INTERFACE],
        },
        MessageDesc {
            name: "set_title",
            since: 1,
            is_destructor: false,
            signature: &[ArgumentType::Str(AllowNull::No)],
            child_interface: None,
            arg_interfaces: &[],
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
            name: "show_window_menu",
            since: 1,
            is_destructor: false,
            signature: &[
                ArgumentType::Object(AllowNull::No),
                ArgumentType::Uint,
                ArgumentType::Int,
                ArgumentType::Int,
            ],
            child_interface: None,
            arg_interfaces: &[&WL_SEAT_INTERFACE],
        },
        MessageDesc {
            name: "move",
            since: 1,
            is_destructor: false,
            signature: &[ArgumentType::Object(AllowNull::No), ArgumentType::Uint],
            child_interface: None,
            arg_interfaces: &[&WL_SEAT_INTERFACE],
        },
        MessageDesc {
            name: "resize",
            since: 1,
            is_destructor: false,
            signature: &[
                ArgumentType::Object(AllowNull::No),
                ArgumentType::Uint,
                ArgumentType::Uint,
            ],
            child_interface: None,
            arg_interfaces: &[&WL_SEAT_INTERFACE],
        },
        MessageDesc {
            name: "set_max_size",
            since: 1,
            is_destructor: false,
            signature: &[ArgumentType::Int, ArgumentType::Int],
            child_interface: None,
            arg_interfaces: &[],
        },
        MessageDesc {
            name: "set_min_size",
            since: 1,
            is_destructor: false,
            signature: &[ArgumentType::Int, ArgumentType::Int],
            child_interface: None,
            arg_interfaces: &[],
        },
        MessageDesc {
            name: "set_maximized",
            since: 1,
            is_destructor: false,
            signature: &[],
            child_interface: None,
            arg_interfaces: &[],
        },
        MessageDesc {
            name: "unset_maximized",
            since: 1,
            is_destructor: false,
            signature: &[],
            child_interface: None,
            arg_interfaces: &[],
        },
        MessageDesc {
            name: "set_fullscreen",
            since: 1,
            is_destructor: false,
            signature: &[ArgumentType::Object(AllowNull::Yes)],
            child_interface: None,
            arg_interfaces: &[&WL_OUTPUT_INTERFACE],
        },
        MessageDesc {
            name: "unset_fullscreen",
            since: 1,
            is_destructor: false,
            signature: &[],
            child_interface: None,
            arg_interfaces: &[],
        },
        MessageDesc {
            name: "set_minimized",
            since: 1,
            is_destructor: false,
            signature: &[],
            child_interface: None,
            arg_interfaces: &[],
        },
    ],
    events: &[
        MessageDesc {
            name: "configure",
            since: 1,
            is_destructor: false,
            signature: &[ArgumentType::Int, ArgumentType::Int, ArgumentType::Array],
            child_interface: None,
            arg_interfaces: &[],
        },
        MessageDesc {
            name: "close",
            since: 1,
            is_destructor: false,
            signature: &[],
            child_interface: None,
            arg_interfaces: &[],
        },
        MessageDesc {
            name: "configure_bounds",
            since: 4,
            is_destructor: false,
            signature: &[ArgumentType::Int, ArgumentType::Int],
            child_interface: None,
            arg_interfaces: &[],
        },
        MessageDesc {
            name: "wm_capabilities",
            since: 5,
            is_destructor: false,
            signature: &[ArgumentType::Array],
            child_interface: None,
            arg_interfaces: &[],
        },
    ],
};

/// Interface `xdg_popup`
pub static XDG_POPUP_INTERFACE: Interface = Interface {
    name: "xdg_popup",
    version: 6,
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
            name: "grab",
            since: 1,
            is_destructor: false,
            signature: &[ArgumentType::Object(AllowNull::No), ArgumentType::Uint],
            child_interface: None,
            arg_interfaces: &[&WL_SEAT_INTERFACE],
        },
        MessageDesc {
            name: "reposition",
            since: 3,
            is_destructor: false,
            signature: &[ArgumentType::Object(AllowNull::No), ArgumentType::Uint],
            child_interface: None,
            arg_interfaces: &[&XDG_POSITIONER_INTERFACE],
        },
    ],
    events: &[
        MessageDesc {
            name: "configure",
            since: 1,
            is_destructor: false,
            signature: &[
                ArgumentType::Int,
                ArgumentType::Int,
                ArgumentType::Int,
                ArgumentType::Int,
            ],
            child_interface: None,
            arg_interfaces: &[],
        },
        MessageDesc {
            name: "popup_done",
            since: 1,
            is_destructor: false,
            signature: &[],
            child_interface: None,
            arg_interfaces: &[],
        },
        MessageDesc {
            name: "repositioned",
            since: 3,
            is_destructor: false,
            signature: &[ArgumentType::Uint],
            child_interface: None,
            arg_interfaces: &[],
        },
    ],
};
