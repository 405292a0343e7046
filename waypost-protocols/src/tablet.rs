//! Interfaces of the tablet protocol, version 2

use waypost_backend::protocol::{AllowNull, ArgumentType, Interface, MessageDesc};

use crate::core::{WL_SEAT_INTERFACE, WL_SURFACE_INTERFACE};

/// Interface `zwp_tablet_manager_v2`
pub static ZWP_TABLET_MANAGER_V2_INTERFACE: Interface = Interface {
    name: "zwp_tablet_manager_v2",
    version: 2,
    requests: &[
        MessageDesc {
            name: "get_tablet_seat",
            since: 1,
            is_destructor: false,
            signature: &[ArgumentType::NewId, ArgumentType::Object(AllowNull::No)],
            child_interface: Some(&ZWP_TABLET_SEAT_V2_INTERFACE),
            arg_interfaces: &[&WL_SEAT_INTERFACE],
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
    events: &[],
};

/// Interface `zwp_tablet_seat_v2`
pub static ZWP_TABLET_SEAT_V2_INTERFACE: Interface = Interface {
    name: "zwp_tablet_seat_v2",
    version: 2,
    requests: &[MessageDesc {
        name: "destroy",
        since: 1,
        is_destructor: true,
        signature: &[],
        child_interface: None,
        arg_interfaces: &[],
    }],
    events: &[
        MessageDesc {
            name: "tablet_added",
            since: 1,
            is_destructor: false,
            signature: &[ArgumentType::NewId],
            child_interface: Some(&ZWP_TABLET_V2_INTERFACE),
            arg_interfaces: &[],
        },
        MessageDesc {
            name: "tool_added",
            since: 1,
            is_destructor: false,
            signature: &[ArgumentType::NewId],
            child_interface: Some(&ZWP_TABLET_TOOL_V2_INTERFACE),
            arg_interfaces: &[],
        },
    ],
};

/// Interface `zwp_tablet_v2`
pub static ZWP_TABLET_V2_INTERFACE: Interface = Interface {
    name: "zwp_tablet_v2",
    version: 2,
    requests: &[MessageDesc {
        name: "destroy",
        since: 1,
        is_destructor: true,
        signature: &[],
        child_interface: None,
        arg_interfaces: &[],
    }],
    events: &[
        MessageDesc {
            name: "name",
            since: 1,
            is_destructor: false,
            signature: &[ArgumentType::Str(AllowNull::No)],
            child_interface: None,
            arg_interfaces: &[],
        },
        MessageDesc {
            name: "id",
            since: 1,
            is_destructor: false,
            signature: &[ArgumentType::Uint, ArgumentType::Uint],
            child_interface: None,
            arg_interfaces: &[],
        },
        MessageDesc {
            name: "path",
            since: 1,
            is_destructor: false,
            signature: &[ArgumentType::Str(AllowNull::No)],
            child_interface: None,
            arg_interfaces: &[],
        },
        MessageDesc {
            name: "done",
            since: 1,
            is_destructor: false,
            signature: &[],
            child_interface: None,
            arg_interfaces: &[],
        },
        MessageDesc {
            name: "removed",
            since: 1,
            is_destructor: false,
            signature: &[],
            child_interface: None,
            arg_interfaces: &[],
        },
    ],
};

/// Interface `zwp_tablet_tool_v2`
pub static ZWP_TABLET_TOOL_V2_INTERFACE: Interface = Interface {
    name: "zwp_tablet_tool_v2",
    version: 2,
    requests: &[
        MessageDesc {
            name: "set_cursor",
            since: 1,
            is_destructor: false,
            signature: &[
                ArgumentType::Uint,
                ArgumentType::Object(AllowNull::Yes),
                ArgumentType::Int,
                ArgumentType::Int,
            ],
            child_interface: None,
            arg_interfaces: &[&WL_SURFACE_INTERFACE],
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
    events: &[
        MessageDesc {
            name: "type",
            since: 1,
            is_destructor: false,
            signature: &[ArgumentType::Uint],
            child_interface: None,
            arg_interfaces: &[],
        },
        MessageDesc {
            name: "hardware_serial",
            since: 1,
            is_destructor: false,
            signature: &[ArgumentType::Uint, ArgumentType::Uint],
            child_interface: None,
            arg_interfaces: &[],
        },
        MessageDesc {
            name: "hardware_id_wacom",
            since: 1,
            is_destructor: false,
            signature: &[ArgumentType::Uint, ArgumentType::Uint],
            child_interface: None,
            arg_interfaces: &[],
        },
        MessageDesc {
            name: "capability",
            since: 1,
            is_destructor: false,
            signature: &[ArgumentType::Uint],
            child_interface: None,
            arg_interfaces: &[],
        },
        MessageDesc {
            name: "done",
            since: 1,
            is_destructor: false,
            signature: &[],
            child_interface: None,
            arg_interfaces: &[],
        },
        MessageDesc {
            name: "removed",
            since: 1,
            is_destructor: false,
            signature: &[],
            child_interface: None,
            arg_interfaces: &[],
        },
        MessageDesc {
            name: "proximity_in",
            since: 1,
            is_destructor: false,
            signature: &[
                ArgumentType::Uint,
                ArgumentType::Object(AllowNull::No),
                ArgumentType::Object(AllowNull::No),
            ],
            child_interface: None,
            arg_interfaces: &[&ZWP_TABLET_V2_INTERFACE, &WL_SURFACE_INTERFACE],
        },
        MessageDesc {
            name: "proximity_out",
            since: 1,
            is_destructor: false,
            signature: &[],
            child_interface: None,
            arg_interfaces: &[],
        },
        MessageDesc {
            name: "down",
            since: 1,
            is_destructor: false,
            signature: &[ArgumentType::Uint],
            child_interface: None,
            arg_interfaces: &[],
        },
        MessageDesc {
            name: "up",
            since: 1,
            is_destructor: false,
            signature: &[],
            child_interface: None,
            arg_interfaces: &[],
        },
        MessageDesc {
            name: "motion",
            since: 1,
            is_destructor: false,
            signature: &[ArgumentType::Fixed, ArgumentType::Fixed],
            child_interface: None,
            arg_interfaces: &[],
        },
        MessageDesc {
            name: "pressure",
            since: 1,
            is_destructor: false,
            signature: &[ArgumentType::Uint],
            child_interface: None,
            arg_interfaces: &[],
        },
        MessageDesc {
            name: "distance",
            since: 1,
            is_destructor: false,
            signature: &[ArgumentType::Uint],
            child_interface: None,
            arg_interfaces: &[],
        },
        MessageDesc {
            name: "tilt",
            since: 1,
            is_destructor: false,
            signature: &[ArgumentType::Fixed, ArgumentType::Fixed],
            child_interface: None,
            arg_interfaces: &[],
        },
        MessageDesc {
            name: "rotation",
            since: 1,
            is_destructor: false,
            signature: &[ArgumentType::Fixed],
            child_interface: None,
            arg_interfaces: &[],
        },
        MessageDesc {
            name: "slider",
            since: 1,
            is_destructor: false,
            signature: &[ArgumentType::Int],
            child_interface: None,
            arg_interfaces: &[],
        },
        MessageDesc {
            name: "wheel",
            since: 1,
            is_destructor: false,
            signature: &[ArgumentType::Fixed, ArgumentType::Int],
            child_interface: None,
            arg_interfaces: &[],
        },
        MessageDesc {
            name: "button",
            since: 1,
            is_destructor: false,
            signature: &[ArgumentType::Uint, ArgumentType::Uint, ArgumentType::Uint],
            child_interface: None,
            arg_interfaces: &[],
        },
        MessageDesc {
            name: "frame",
            since: 1,
            is_destructor: false,
            signature: &[ArgumentType::Uint],
            child_interface: None,
            arg_interfaces: &[],
        },
    ],
};
