//! Interfaces of the linux-dmabuf protocol

use waypost_backend::protocol::{AllowNull, ArgumentType, Interface, MessageDesc};

use crate::core::{WL_BUFFER_INTERFACE, WL_SURFACE_INTERFACE};

/// Interface `zwp_linux_dmabuf_v1`
pub static ZWP_LINUX_DMABUF_V1_INTERFACE: Interface = Interface {
    name: "zwp_linux_dmabuf_v1",
    version: 5,
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
            name: "create_params",
            since: 1,
            is_destructor: false,
            signature: &[ArgumentType::NewId],
            child_interface: Some(&ZWP_LINUX_BUFFER_PARAMS_V1_INTERFACE),
            arg_interfaces: &[],
        },
        MessageDesc {
            name: "get_default_feedback",
            since: 4,
            is_destructor: false,
            signature: &[ArgumentType::NewId],
            child_interface: Some(&ZWP_LINUX_DMABUF_FEEDBACK_V1_INTERFACE),
            arg_interfaces: &[],
        },
        MessageDesc {
            name: "get_surface_feedback",
            since: 4,
            is_destructor: false,
            signature: &[ArgumentType::NewId, ArgumentType::Object(AllowNull::No)],
            child_interface: Some(&ZWP_LINUX_DMABUF_FEEDBACK_V1_INTERFACE),
            arg_interfaces: &[&WL_SURFACE_INTERFACE],
        },
    ],
    events: &[
        MessageDesc {
            name: "format",
            since: 1,
            is_destructor: false,
            signature: &[ArgumentType::Uint],
            child_interface: None,
            arg_interfaces: &[],
        },
        MessageDesc {
            name: "modifier",
            since: 3,
            is_destructor: false,
            signature: &[ArgumentType::Uint, ArgumentType::Uint, ArgumentType::Uint],
            child_interface: None,
            arg_interfaces: &[],
        },
    ],
};

/// Interface `zwp_linux_buffer_params_v1`
pub static ZWP_LINUX_BUFFER_PARAMS_V1_INTERFACE: Interface = Interface {
    name: "zwp_linux_buffer_params_v1",
    version: 5,
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
                ArgumentType::Fd,
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
            name: "create",
            since: 1,
            is_destructor: false,
            signature: &[
                ArgumentType::Int,
                ArgumentType::Int,
                ArgumentType::Uint,
                ArgumentType::Uint,
            ],
            child_interface: None,
            arg_interfaces: &[],
        },
        MessageDesc {
            name: "create_immed",
            since: 2,
            is_destructor: false,
            signature: &[
                ArgumentType::NewId,
                ArgumentType::Int,
                ArgumentType::Int,
                ArgumentType::Uint,
                ArgumentType::Uint,
            ],
            child_interface: Some(&WL_BUFFER_INTERFACE),
            arg_interfaces: &[],
        },
    ],
    events: &[
        MessageDesc {
            name: "created",
            since: 1,
            is_destructor: false,
            signature: &[ArgumentType::NewId],
            child_interface: Some(&WL_BUFFER_INTERFACE),
            arg_interfaces: &[],
        },
        MessageDesc {
            name: "failed",
            since: 1,
            is_destructor: false,
            signature: &[],
            child_interface: None,
            arg_interfaces: &[],
        },
    ],
};

/// Interface `zwp_linux_dmabuf_feedback_v1`
pub static ZWP_LINUX_DMABUF_FEEDBACK_V1_INTERFACE: Interface = Interface {
    name: "zwp_linux_dmabuf_feedback_v1",
    version: 5,
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
            name: "done",
            since: 1,
            is_destructor: false,
            signature: &[],
            child_interface: None,
            arg_interfaces: &[],
        },
        MessageDesc {
            name: "format_table",
            since: 1,
            is_destructor: false,
            signature: &[ArgumentType::Fd, ArgumentType::Uint],
            child_interface: None,
            arg_interfaces: &[],
        },
        MessageDesc {
            name: "main_device",
            since: 1,
            is_destructor: false,
            signature: &[ArgumentType::Array],
            child_interface: None,
            arg_interfaces: &[],
        },
        MessageDesc {
            name: "tranche_done",
            since: 1,
            is_destructor: false,
            signature: &[],
            child_interface: None,
            arg_interfaces: &[],
        },
        MessageDesc {
            name: "tranche_target_device",
            since: 1,
            is_destructor: false,
            signature: &[ArgumentType::Array],
            child_interface: None,
            arg_interfaces: &[],
        },
        MessageDesc {
            name: "tranche_formats",
            since: 1,
            is_destructor: false,
            signature: &[ArgumentType::Array],
            child_interface: None,
            arg_interfaces: &[],
        },
        MessageDesc {
            name: "tranche_flags",
            since: 1,
            is_destructor: false,
            signature: &[ArgumentType::Uint],
            child_interface: None,
            arg_interfaces: &[],
        },
    ],
};
