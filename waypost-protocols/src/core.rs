//! Interfaces of the core protocol
//!
//! Signatures and versions follow the public protocol definitions. The
//! `wl_display`, `wl_registry` and `wl_callback` interfaces live in the
//! backend, as the dispatch engines special-case them.

use waypost_backend::protocol::{AllowNull, ArgumentType, Interface, MessageDesc};
use waypost_backend::WL_CALLBACK_INTERFACE;

/// Interface `wl_compositor`
pub static WL_COMPOSITOR_INTERFACE: Interface = Interface {
    name: "wl_compositor",
    version: 6,
    requests: &[
        MessageDesc {
            name: "create_surface",
            since: 1,
            is_destructor: false,
            signature: &[ArgumentType::NewId],
            child_interface: Some(&WL_SURFACE_INTERFACE),
            arg_interfaces: &[],
        },
        MessageDesc {
            name: "create_region",
            since: 1,
            is_destructor: false,
            signature: &[ArgumentType::NewId],
            child_interface: Some(&WL_REGION_INTERFACE),
            arg_interfaces: &[],
        },
    ],
    events: &[],
};

/// Interface `wl_surface`
pub static WL_SURFACE_INTERFACE: Interface = Interface {
    name: "wl_surface",
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
            name: "attach",
            since: 1,
            is_destructor: false,
            signature: &[
                ArgumentType::Object(AllowNull::Yes),
                ArgumentType::Int,
                ArgumentType::Int,
            ],
            child_interface: None,
            arg_interfaces: &[&WL_BUFFER_INTERFACE],
        },
        MessageDesc {
            name: "damage",
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
            name: "frame",
            since: 1,
            is_destructor: false,
            signature: &[ArgumentType::NewId],
            child_interface: Some(&WL_CALLBACK_INTERFACE),
            arg_interfaces: &[],
        },
        MessageDesc {
            name: "set_opaque_region",
            since: 1,
            is_destructor: false,
            signature: &[ArgumentType::Object(AllowNull::Yes)],
            child_interface: None,
            arg_interfaces: &[&WL_REGION_INTERFACE],
        },
        MessageDesc {
            name: "set_input_region",
            since: 1,
            is_destructor: false,
            signature: &[ArgumentType::Object(AllowNull::Yes)],
            child_interface: None,
            arg_interfaces: &[&WL_REGION_INTERFACE],
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
            name: "set_buffer_transform",
            since: 2,
            is_destructor: false,
            signature: &[ArgumentType::Int],
            child_interface: None,
            arg_interfaces: &[],
        },
        MessageDesc {
            name: "set_buffer_scale",
            since: 3,
            is_destructor: false,
            signature: &[ArgumentType::Int],
            child_interface: None,
            arg_interfaces: &[],
        },
        MessageDesc {
            name: "damage_buffer",
            since: 4,
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
            name: "offset",
            since: 5,
            is_destructor: false,
            signature: &[ArgumentType::Int, ArgumentType::Int],
            child_interface: None,
            arg_interfaces: &[],
        },
    ],
    events: &[
        MessageDesc {
            name: "enter",
            since: 1,
            is_destructor: false,
            signature: &[ArgumentType::Object(AllowNull::No)],
            child_interface: None,
            arg_interfaces: &[&WL_OUTPUT_INTERFACE],
        },
        MessageDesc {
            name: "leave",
            since: 1,
            is_destructor: false,
            signature: &[ArgumentType::Object(AllowNull::No)],
            child_interface: None,
            arg_interfaces: &[&WL_OUTPUT_INTERFACE],
        },
        MessageDesc {
            name: "preferred_buffer_scale",
            since: 6,
            is_destructor: false,
            signature: &[ArgumentType::Int],
            child_interface: None,
            arg_interfaces: &[],
        },
        MessageDesc {
            name: "preferred_buffer_transform",
            since: 6,
            is_destructor: false,
            signature: &[ArgumentType::Uint],
            child_interface: None,
            arg_interfaces: &[],
        },
    ],
};

/// Interface `wl_region`
pub static WL_REGION_INTERFACE: Interface = Interface {
    name: "wl_region",
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
            name: "add",
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
            name: "subtract",
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
    ],
    events: &[],
};

/// Interface `wl_buffer`
pub static WL_BUFFER_INTERFACE: Interface = Interface {
    name: "wl_buffer",
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
        name: "release",
        since: 1,
        is_destructor: false,
        signature: &[],
        child_interface: None,
        arg_interfaces: &[],
    }],
};

/// Interface `wl_shm`
pub static WL_SHM_INTERFACE: Interface = Interface {
    name: "wl_shm",
    version: 2,
    requests: &[
        MessageDesc {
            name: "create_pool",
            since: 1,
            is_destructor: false,
            signature: &[ArgumentType::NewId, ArgumentType::Fd, ArgumentType::Int],
            child_interface: Some(&WL_SHM_POOL_INTERFACE),
            arg_interfaces: &[],
        },
        MessageDesc {
            name: "release",
            since: 2,
            is_destructor: true,
            signature: &[],
            child_interface: None,
            arg_interfaces: &[],
        },
    ],
    events: &[MessageDesc {
        name: "format",
        since: 1,
        is_destructor: false,
        signature: &[ArgumentType::Uint],
        child_interface: None,
        arg_interfaces: &[],
    }],
};

/// Interface `wl_shm_pool`
pub static WL_SHM_POOL_INTERFACE: Interface = Interface {
    name: "wl_shm_pool",
    version: 2,
    requests: &[
        MessageDesc {
            name: "create_buffer",
            since: 1,
            is_destructor: false,
            signature: &[
                ArgumentType::NewId,
                ArgumentType::Int,
                ArgumentType::Int,
                ArgumentType::Int,
                ArgumentType::Int,
                ArgumentType::Uint,
            ],
            child_interface: Some(&WL_BUFFER_INTERFACE),
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
        MessageDesc {
            name: "resize",
            since: 1,
            is_destructor: false,
            signature: &[ArgumentType::Int],
            child_interface: None,
            arg_interfaces: &[],
        },
    ],
    events: &[],
};

/// Interface `wl_output`
pub static WL_OUTPUT_INTERFACE: Interface = Interface {
    name: "wl_output",
    version: 4,
    requests: &[MessageDesc {
        name: "release",
        since: 3,
        is_destructor: true,
        signature: &[],
        child_interface: None,
        arg_interfaces: &[],
    }],
    events: &[
        MessageDesc {
            name: "geometry",
            since: 1,
            is_destructor: false,
            signature: &[
                ArgumentType::Int,
                ArgumentType::Int,
                ArgumentType::Int,
                ArgumentType::Int,
                ArgumentType::Int,
                ArgumentType::Str(AllowNull::No),
                ArgumentType::Str(AllowNull::No),
                ArgumentType::Int,
            ],
            child_interface: None,
            arg_interfaces: &[],
        },
        MessageDesc {
            name: "mode",
            since: 1,
            is_destructor: false,
            signature: &[
                ArgumentType::Uint,
                ArgumentType::Int,
                ArgumentType::Int,
                ArgumentType::Int,
            ],
            child_interface: None,
            arg_interfaces: &[],
        },
        MessageDesc {
            name: "done",
            since: 2,
            is_destructor: false,
            signature: &[],
            child_interface: None,
            arg_interfaces: &[],
        },
        MessageDesc {
            name: "scale",
            since: 2,
            is_destructor: false,
            signature: &[ArgumentType::Int],
            child_interface: None,
            arg_interfaces: &[],
        },
        MessageDesc {
            name: "name",
            since: 4,
            is_destructor: false,
            signature: &[ArgumentType::Str(AllowNull::No)],
            child_interface: None,
            arg_interfaces: &[],
        },
        MessageDesc {
            name: "description",
            since: 4,
            is_destructor: false,
            signature: &[ArgumentType::Str(AllowNull::No)],
            child_interface: None,
            arg_interfaces: &[],
        },
    ],
};

/// Interface `wl_seat`
pub static WL_SEAT_INTERFACE: Interface = Interface {
    name: "wl_seat",
    version: 9,
    requests: &[
        MessageDesc {
            name: "get_pointer",
            since: 1,
            is_destructor: false,
            signature: &[ArgumentType::NewId],
            child_interface: Some(&WL_POINTER_INTERFACE),
            arg_interfaces: &[],
        },
        MessageDesc {
            name: "get_keyboard",
            since: 1,
            is_destructor: false,
            signature: &[ArgumentType::NewId],
            child_interface: Some(&WL_KEYBOARD_INTERFACE),
            arg_interfaces: &[],
        },
        MessageDesc {
            name: "get_touch",
            since: 1,
            is_destructor: false,
            signature: &[ArgumentType::NewId],
            child_interface: Some(&WL_TOUCH_INTERFACE),
            arg_interfaces: &[],
        },
        MessageDesc {
            name: "release",
            since: 5,
            is_destructor: true,
            signature: &[],
            child_interface: None,
            arg_interfaces: &[],
        },
    ],
    events: &[
        MessageDesc {
            name: "capabilities",
            since: 1,
            is_destructor: false,
            signature: &[ArgumentType::Uint],
            child_interface: None,
            arg_interfaces: &[],
        },
        MessageDesc {
            name: "name",
            since: 2,
            is_destructor: false,
            signature: &[ArgumentType::Str(AllowNull::No)],
            child_interface: None,
            arg_interfaces: &[],
        },
    ],
};

/// Interface `wl_pointer`
pub static WL_POINTER_INTERFACE: Interface = Interface {
    name: "wl_pointer",
    version: 9,
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
            name: "release",
            since: 3,
            is_destructor: true,
            signature: &[],
            child_interface: None,
            arg_interfaces: &[],
        },
    ],
    events: &[
        MessageDesc {
            name: "enter",
            since: 1,
            is_destructor: false,
            signature: &[
                ArgumentType::Uint,
                ArgumentType::Object(AllowNull::No),
                ArgumentType::Fixed,
                ArgumentType::Fixed,
            ],
            child_interface: None,
            arg_interfaces: &[&WL_SURFACE_INTERFACE],
        },
        MessageDesc {
            name: "leave",
            since: 1,
            is_destructor: false,
            signature: &[ArgumentType::Uint, ArgumentType::Object(AllowNull::No)],
            child_interface: None,
            arg_interfaces: &[&WL_SURFACE_INTERFACE],
        },
        MessageDesc {
            name: "motion",
            since: 1,
            is_destructor: false,
            signature: &[ArgumentType::Uint, ArgumentType::Fixed, ArgumentType::Fixed],
            child_interface: None,
            arg_interfaces: &[],
        },
        MessageDesc {
            name: "button",
            since: 1,
            is_destructor: false,
            signature: &[
                ArgumentType::Uint,
                ArgumentType::Uint,
                ArgumentType::Uint,
                ArgumentType::Uint,
            ],
            child_interface: None,
            arg_interfaces: &[],
        },
        MessageDesc {
            name: "axis",
            since: 1,
            is_destructor: false,
            signature: &[ArgumentType::Uint, ArgumentType::Uint, ArgumentType::Fixed],
            child_interface: None,
            arg_interfaces: &[],
        },
        MessageDesc {
            name: "frame",
            since: 5,
            is_destructor: false,
            signature: &[],
            child_interface: None,
            arg_interfaces: &[],
        },
        MessageDesc {
            name: "axis_source",
            since: 5,
            is_destructor: false,
            signature: &[ArgumentType::Uint],
            child_interface: None,
            arg_interfaces: &[],
        },
        MessageDesc {
            name: "axis_stop",
            since: 5,
            is_destructor: false,
            signature: &[ArgumentType::Uint, ArgumentType::Uint],
            child_interface: None,
            arg_interfaces: &[],
        },
        MessageDesc {
            name: "axis_discrete",
            since: 5,
            is_destructor: false,
            signature: &[ArgumentType::Uint, ArgumentType::Int],
            child_interface: None,
            arg_interfaces: &[],
        },
        MessageDesc {
            name: "axis_value120",
            since: 8,
            is_destructor: false,
            signature: &[ArgumentType::Uint, ArgumentType::Int],
            child_interface: None,
            arg_interfaces: &[],
        },
        MessageDesc {
            name: "axis_relative_direction",
            since: 9,
            is_destructor: false,
            signature: &[ArgumentType::Uint, ArgumentType::Uint],
            child_interface: None,
            arg_interfaces: &[],
        },
    ],
};

/// Interface `wl_keyboard`
pub static WL_KEYBOARD_INTERFACE: Interface = Interface {
    name: "wl_keyboard",
    version: 9,
    requests: &[MessageDesc {
        name: "release",
        since: 3,
        is_destructor: true,
        signature: &[],
        child_interface: None,
        arg_interfaces: &[],
    }],
    events: &[
        MessageDesc {
            name: "keymap",
            since: 1,
            is_destructor: false,
            signature: &[ArgumentType::Uint, ArgumentType::Fd, ArgumentType::Uint],
            child_interface: None,
            arg_interfaces: &[],
        },
        MessageDesc {
            name: "enter",
            since: 1,
            is_destructor: false,
            signature: &[
                ArgumentType::Uint,
                ArgumentType::Object(AllowNull::No),
                ArgumentType::Array,
            ],
            child_interface: None,
            arg_interfaces: &[&WL_SURFACE_INTERFACE],
        },
        MessageDesc {
            name: "leave",
            since: 1,
            is_destructor: false,
            signature: &[ArgumentType::Uint, ArgumentType::Object(AllowNull::No)],
            child_interface: None,
            arg_interfaces: &[&WL_SURFACE_INTERFACE],
        },
        MessageDesc {
            name: "key",
            since: 1,
            is_destructor: false,
            signature: &[
                ArgumentType::Uint,
                ArgumentType::Uint,
                ArgumentType::Uint,
                ArgumentType::Uint,
            ],
            child_interface: None,
            arg_interfaces: &[],
        },
        MessageDesc {
            name: "modifiers",
            since: 1,
            is_destructor: false,
            signature: &[
                ArgumentType::Uint,
                ArgumentType::Uint,
                ArgumentType::Uint,
                ArgumentType::Uint,
                ArgumentType::Uint,
            ],
            child_interface: None,
            arg_interfaces: &[],
        },
        MessageDesc {
            name: "repeat_info",
            since: 4,
            is_destructor: false,
            signature: &[ArgumentType::Int, ArgumentType::Int],
            child_interface: None,
            arg_interfaces: &[],
        },
    ],
};

/// Interface `wl_touch`
pub static WL_TOUCH_INTERFACE: Interface = Interface {
    name: "wl_touch",
    version: 9,
    requests: &[MessageDesc {
        name: "release",
        since: 3,
        is_destructor: true,
        signature: &[],
        child_interface: None,
        arg_interfaces: &[],
    }],
    events: &[
        MessageDesc {
            name: "down",
            since: 1,
            is_destructor: false,
            signature: &[
                ArgumentType::Uint,
                ArgumentType::Uint,
                ArgumentType::Object(AllowNull::No),
                ArgumentType::Int,
                ArgumentType::Fixed,
                ArgumentType::Fixed,
            ],
            child_interface: None,
            arg_interfaces: &[&WL_SURFACE_INTERFACE],
        },
        MessageDesc {
            name: "up",
            since: 1,
            is_destructor: false,
            signature: &[ArgumentType::Uint, ArgumentType::Uint, ArgumentType::Int],
            child_interface: None,
            arg_interfaces: &[],
        },
        MessageDesc {
            name: "motion",
            since: 1,
            is_destructor: false,
            signature: &[
                ArgumentType::Uint,
                ArgumentType::Int,
                ArgumentType::Fixed,
                ArgumentType::Fixed,
            ],
            child_interface: None,
            arg_interfaces: &[],
        },
        MessageDesc {
            name: "frame",
            since: 1,
            is_destructor: false,
            signature: &[],
            child_interface: None,
            arg_interfaces: &[],
        },
        MessageDesc {
            name: "cancel",
            since: 1,
            is_destructor: false,
            signature: &[],
            child_interface: None,
            arg_interfaces: &[],
        },
        MessageDesc {
            name: "shape",
            since: 6,
            is_destructor: false,
            signature: &[ArgumentType::Int, ArgumentType::Fixed, ArgumentType::Fixed],
            child_interface: None,
            arg_interfaces: &[],
        },
        MessageDesc {
            name: "orientation",
            since: 6,
            is_destructor: false,
            signature: &[ArgumentType::Int, ArgumentType::Fixed],
            child_interface: None,
            arg_interfaces: &[],
        },
    ],
};

/// Interface `wl_data_device_manager`
pub static WL_DATA_DEVICE_MANAGER_INTERFACE: Interface = Interface {
    name: "wl_data_device_manager",
    version: 3,
    requests: &[
        MessageDesc {
            name: "create_data_source",
            since: 1,
            is_destructor: false,
            signature: &[ArgumentType::NewId],
            child_interface: Some(&WL_DATA_SOURCE_INTERFACE),
            arg_interfaces: &[],
        },
        MessageDesc {
            name: "get_data_device",
            since: 1,
            is_destructor: false,
            signature: &[ArgumentType::NewId, ArgumentType::Object(AllowNull::No)],
            child_interface: Some(&WL_DATA_DEVICE_INTERFACE),
            arg_interfaces: &[&WL_SEAT_INTERFACE],
        },
    ],
    events: &[],
};

/// Interface `wl_data_source`
pub static WL_DATA_SOURCE_INTERFACE: Interface = Interface {
    name: "wl_data_source",
    version: 3,
    requests: &[
        MessageDesc {
            name: "offer",
            since: 1,
            is_destructor: false,
            signature: &[ArgumentType::Str(AllowNull::No)],
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
        MessageDesc {
            name: "set_actions",
            since: 3,
            is_destructor: false,
            signature: &[ArgumentType::Uint],
            child_interface: None,
            arg_interfaces: &[],
        },
    ],
    events: &[
        MessageDesc {
            name: "target",
            since: 1,
            is_destructor: false,
            signature: &[ArgumentType::Str(AllowNull::Yes)],
            child_interface: None,
            arg_interfaces: &[],
        },
        MessageDesc {
            name: "send",
            since: 1,
            is_destructor: false,
            signature: &[ArgumentType::Str(AllowNull::No), ArgumentType::Fd],
            child_interface: None,
            arg_interfaces: &[],
        },
        MessageDesc {
            name: "cancelled",
            since: 1,
            is_destructor: false,
            signature: &[],
            child_interface: None,
            arg_interfaces: &[],
        },
        MessageDesc {
            name: "dnd_drop_performed",
            since: 3,
            is_destructor: false,
            signature: &[],
            child_interface: None,
            arg_interfaces: &[],
        },
        MessageDesc {
            name: "dnd_finished",
            since: 3,
            is_destructor: false,
            signature: &[],
            child_interface: None,
            arg_interfaces: &[],
        },
        MessageDesc {
            name: "action",
            since: 3,
            is_destructor: false,
            signature: &[ArgumentType::Uint],
            child_interface: None,
            arg_interfaces: &[],
        },
    ],
};

/// Interface `wl_data_device`
pub static WL_DATA_DEVICE_INTERFACE: Interface = Interface {
    name: "wl_data_device",
    version: 3,
    requests: &[
        MessageDesc {
            name: "start_drag",
            since: 1,
            is_destructor: false,
            signature: &[
                ArgumentType::Object(AllowNull::Yes),
                ArgumentType::Object(AllowNull::No),
                ArgumentType::Object(AllowNull::Yes),
                ArgumentType::Uint,
            ],
            child_interface: None,
            arg_interfaces: &[
                &WL_DATA_SOURCE_INTERFACE,
                &WL_SURFACE_INTERFACE,
                &WL_SURFACE_INTERFACE,
            ],
        },
        MessageDesc {
            name: "set_selection",
            since: 1,
            is_destructor: false,
            signature: &[ArgumentType::Object(AllowNull::Yes), ArgumentType::Uint],
            child_interface: None,
            arg_interfaces: &[&WL_DATA_SOURCE_INTERFACE],
        },
        MessageDesc {
            name: "release",
            since: 2,
            is_destructor: true,
            signature: &[],
            child_interface: None,
            arg_interfaces: &[],
        },
    ],
    events: &[
        MessageDesc {
            name: "data_offer",
            since: 1,
            is_destructor: false,
            signature: &[ArgumentType::NewId],
            child_interface: Some(&WL_DATA_OFFER_INTERFACE),
            arg_interfaces: &[],
        },
        MessageDesc {
            name: "enter",
            since: 1,
            is_destructor: false,
            signature: &[
                ArgumentType::Uint,
                ArgumentType::Object(AllowNull::No),
                ArgumentType::Fixed,
                ArgumentType::Fixed,
                ArgumentType::Object(AllowNull::Yes),
            ],
            child_interface: None,
            arg_interfaces: &[&WL_SURFACE_INTERFACE, &WL_DATA_OFFER_INTERFACE],
        },
        MessageDesc {
            name: "leave",
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
            signature: &[ArgumentType::Uint, ArgumentType::Fixed, ArgumentType::Fixed],
            child_interface: None,
            arg_interfaces: &[],
        },
        MessageDesc {
            name: "drop",
            since: 1,
            is_destructor: false,
            signature: &[],
            child_interface: None,
            arg_interfaces: &[],
        },
        MessageDesc {
            name: "selection",
            since: 1,
            is_destructor: false,
            signature: &[ArgumentType::Object(AllowNull::Yes)],
            child_interface: None,
            arg_interfaces: &[&WL_DATA_OFFER_INTERFACE],
        },
    ],
};

/// Interface `wl_data_offer`
pub static WL_DATA_OFFER_INTERFACE: Interface = Interface {
    name: "wl_data_offer",
    version: 3,
    requests: &[
        MessageDesc {
            name: "accept",
            since: 1,
            is_destructor: false,
            signature: &[ArgumentType::Uint, ArgumentType::Str(AllowNull::Yes)],
            child_interface: None,
            arg_interfaces: &[],
        },
        MessageDesc {
            name: "receive",
            since: 1,
            is_destructor: false,
            signature: &[ArgumentType::Str(AllowNull::No), ArgumentType::Fd],
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
        MessageDesc {
            name: "finish",
            since: 3,
            is_destructor: false,
            signature: &[],
            child_interface: None,
            arg_interfaces: &[],
        },
        MessageDesc {
            name: "set_actions",
            since: 3,
            is_destructor: false,
            signature: &[ArgumentType::Uint, ArgumentType::Uint],
            child_interface: None,
            arg_interfaces: &[],
        },
    ],
    events: &[
        MessageDesc {
            name: "offer",
            since: 1,
            is_destructor: false,
            signature: &[ArgumentType::Str(AllowNull::No)],
            child_interface: None,
            arg_interfaces: &[],
        },
        MessageDesc {
            name: "source_actions",
            since: 3,
            is_destructor: false,
            signature: &[ArgumentType::Uint],
            child_interface: None,
            arg_interfaces: &[],
        },
        MessageDesc {
            name: "action",
            since: 3,
            is_destructor: false,
            signature: &[ArgumentType::Uint],
            child_interface: None,
            arg_interfaces: &[],
        },
    ],
};
