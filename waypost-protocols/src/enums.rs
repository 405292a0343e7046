//! Protocol enums and bitsets
//!
//! Numeric values match the public protocol definitions. All enums convert
//! to and from `u32` so they compose with
//! [`WEnum`](waypost_backend::protocol::WEnum).

use bitflags::bitflags;

macro_rules! protocol_enum {
    ($(#[$attr:meta])* $name:ident { $($(#[$vattr:meta])* $variant:ident = $value:expr),+ $(,)? }) => {
        $(#[$attr])*
        #[repr(u32)]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub enum $name {
            $($(#[$vattr])* $variant = $value),+
        }

        impl TryFrom<u32> for $name {
            type Error = ();
            fn try_from(value: u32) -> Result<Self, ()> {
                match value {
                    $($value => Ok(Self::$variant),)+
                    _ => Err(()),
                }
            }
        }

        impl From<$name> for u32 {
            fn from(value: $name) -> u32 {
                value as u32
            }
        }
    };
}

protocol_enum! {
    /// Pixel formats of `wl_shm`
    ///
    /// The first two formats are special-cased as 0 and 1; every other code
    /// is the FourCC of the format.
    ShmFormat {
        /// 32-bit ARGB, alpha first byte in little-endian order
        Argb8888 = 0,
        /// 32-bit RGB, same layout with the alpha byte ignored
        Xrgb8888 = 1,
        /// 8-bit color index
        C8 = 0x20203843,
        /// 8-bit RGB 3-3-2
        Rgb332 = 0x38424752,
        /// 8-bit BGR 2-3-3
        Bgr233 = 0x38524742,
        /// 16-bit xRGB 4-4-4-4
        Xrgb4444 = 0x32315258,
        /// 16-bit xBGR 4-4-4-4
        Xbgr4444 = 0x32314258,
        /// 16-bit RGBx 4-4-4-4
        Rgbx4444 = 0x32315852,
        /// 16-bit BGRx 4-4-4-4
        Bgrx4444 = 0x32315842,
        /// 16-bit ARGB 4-4-4-4
        Argb4444 = 0x32315241,
        /// 16-bit ABGR 4-4-4-4
        Abgr4444 = 0x32314241,
        /// 16-bit RGBA 4-4-4-4
        Rgba4444 = 0x32314152,
        /// 16-bit BGRA 4-4-4-4
        Bgra4444 = 0x32314142,
        /// 16-bit xRGB 1-5-5-5
        Xrgb1555 = 0x35315258,
        /// 16-bit xBGR 1-5-5-5
        Xbgr1555 = 0x35314258,
        /// 16-bit RGBx 5-5-5-1
        Rgbx5551 = 0x35315852,
        /// 16-bit BGRx 5-5-5-1
        Bgrx5551 = 0x35315842,
        /// 16-bit ARGB 1-5-5-5
        Argb1555 = 0x35315241,
        /// 16-bit ABGR 1-5-5-5
        Abgr1555 = 0x35314241,
        /// 16-bit RGBA 5-5-5-1
        Rgba5551 = 0x35314152,
        /// 16-bit BGRA 5-5-5-1
        Bgra5551 = 0x35314142,
        /// 16-bit RGB 5-6-5
        Rgb565 = 0x36314752,
        /// 16-bit BGR 5-6-5
        Bgr565 = 0x36314742,
        /// 24-bit RGB
        Rgb888 = 0x34324752,
        /// 24-bit BGR
        Bgr888 = 0x34324742,
        /// 32-bit xBGR
        Xbgr8888 = 0x34324258,
        /// 32-bit RGBx
        Rgbx8888 = 0x34325852,
        /// 32-bit BGRx
        Bgrx8888 = 0x34325842,
        /// 32-bit ABGR
        Abgr8888 = 0x34324241,
        /// 32-bit RGBA
        Rgba8888 = 0x34324152,
        /// 32-bit BGRA
        Bgra8888 = 0x34324142,
        /// 32-bit xRGB 2-10-10-10
        Xrgb2101010 = 0x30335258,
        /// 32-bit xBGR 2-10-10-10
        Xbgr2101010 = 0x30334258,
        /// 32-bit RGBx 10-10-10-2
        Rgbx1010102 = 0x30335852,
        /// 32-bit BGRx 10-10-10-2
        Bgrx1010102 = 0x30335842,
        /// 32-bit ARGB 2-10-10-10
        Argb2101010 = 0x30335241,
        /// 32-bit ABGR 2-10-10-10
        Abgr2101010 = 0x30334241,
        /// 32-bit RGBA 10-10-10-2
        Rgba1010102 = 0x30334152,
        /// 32-bit BGRA 10-10-10-2
        Bgra1010102 = 0x30334142,
        /// 64-bit half-float xRGB
        Xrgb16161616f = 0x48345258,
        /// 64-bit half-float xBGR
        Xbgr16161616f = 0x48344258,
        /// 64-bit half-float ARGB
        Argb16161616f = 0x48345241,
        /// 64-bit half-float ABGR
        Abgr16161616f = 0x48344241,
        /// packed YCbCr, Cr0 Y0 Cb0 Y1
        Yuyv = 0x56595559,
        /// packed YCbCr, Cb0 Y0 Cr0 Y1
        Yvyu = 0x55595659,
        /// packed YCbCr, Y0 Cr0 Y1 Cb0
        Uyvy = 0x59565955,
        /// packed YCbCr, Y0 Cb0 Y1 Cr0
        Vyuy = 0x59555956,
        /// packed AYCbCr
        Ayuv = 0x56555941,
        /// 2-plane YCbCr, 2x2 subsampled Cb:Cr
        Nv12 = 0x3231564e,
        /// 2-plane YCbCr, 2x2 subsampled Cr:Cb
        Nv21 = 0x3132564e,
        /// 2-plane YCbCr, 2x1 subsampled Cb:Cr
        Nv16 = 0x3631564e,
        /// 2-plane YCbCr, 2x1 subsampled Cr:Cb
        Nv61 = 0x3136564e,
        /// 3-plane YCbCr, 4x4 subsampled
        Yuv410 = 0x39565559,
        /// 3-plane YCrCb, 4x4 subsampled
        Yvu410 = 0x39555659,
        /// 3-plane YCbCr, 4x1 subsampled
        Yuv411 = 0x31315559,
        /// 3-plane YCrCb, 4x1 subsampled
        Yvu411 = 0x31315659,
        /// 3-plane YCbCr, 2x2 subsampled
        Yuv420 = 0x32315559,
        /// 3-plane YCrCb, 2x2 subsampled
        Yvu420 = 0x32315659,
        /// 3-plane YCbCr, 2x1 subsampled
        Yuv422 = 0x36315559,
        /// 3-plane YCrCb, 2x1 subsampled
        Yvu422 = 0x36315659,
        /// 3-plane YCbCr, no subsampling
        Yuv444 = 0x34325559,
        /// 3-plane YCrCb, no subsampling
        Yvu444 = 0x34325659,
    }
}

protocol_enum! {
    /// Errors of `wl_shm`
    ShmError {
        /// buffer format is not known
        InvalidFormat = 0,
        /// invalid size or stride during pool or buffer creation
        InvalidStride = 1,
        /// mmapping the file descriptor failed
        InvalidFd = 2,
    }
}

protocol_enum! {
    /// Transforms of a surface or output
    ///
    /// The flipped variants mirror along a vertical axis before rotating.
    Transform {
        /// no transform
        Normal = 0,
        /// 90 degrees counter-clockwise
        Rotate90 = 1,
        /// 180 degrees counter-clockwise
        Rotate180 = 2,
        /// 270 degrees counter-clockwise
        Rotate270 = 3,
        /// mirrored
        Flipped = 4,
        /// mirrored, then 90 degrees
        Flipped90 = 5,
        /// mirrored, then 180 degrees
        Flipped180 = 6,
        /// mirrored, then 270 degrees
        Flipped270 = 7,
    }
}

protocol_enum! {
    /// Subpixel geometry of an output
    Subpixel {
        /// unknown geometry
        Unknown = 0,
        /// no geometry
        None = 1,
        /// horizontal RGB
        HorizontalRgb = 2,
        /// horizontal BGR
        HorizontalBgr = 3,
        /// vertical RGB
        VerticalRgb = 4,
        /// vertical BGR
        VerticalBgr = 5,
    }
}

protocol_enum! {
    /// Physical button state
    ButtonState {
        /// the button is not pressed
        Released = 0,
        /// the button is pressed
        Pressed = 1,
    }
}

protocol_enum! {
    /// Axis of a scroll event
    Axis {
        /// vertical axis
        VerticalScroll = 0,
        /// horizontal axis
        HorizontalScroll = 1,
    }
}

protocol_enum! {
    /// Source of an axis event
    AxisSource {
        /// a physical wheel rotation
        Wheel = 0,
        /// finger on a touch surface
        Finger = 1,
        /// continuous coasting
        Continuous = 2,
        /// a dedicated wheel tilt
        WheelTilt = 3,
    }
}

protocol_enum! {
    /// Keymap formats of `wl_keyboard`
    KeymapFormat {
        /// no keymap, interpretation is client-defined
        NoKeymap = 0,
        /// libxkbcommon-compatible text keymap
        XkbV1 = 1,
    }
}

protocol_enum! {
    /// Physical key state
    KeyState {
        /// the key is not pressed
        Released = 0,
        /// the key is pressed
        Pressed = 1,
    }
}

protocol_enum! {
    /// States of an XDG toplevel
    ToplevelState {
        /// the surface is maximized
        Maximized = 1,
        /// the surface is fullscreen
        Fullscreen = 2,
        /// the surface is being resized
        Resizing = 3,
        /// the surface is now activated
        Activated = 4,
        /// the left edge is tiled
        TiledLeft = 5,
        /// the right edge is tiled
        TiledRight = 6,
        /// the top edge is tiled
        TiledTop = 7,
        /// the bottom edge is tiled
        TiledBottom = 8,
        /// the surface is not visible
        Suspended = 9,
    }
}

protocol_enum! {
    /// Edges used in an interactive resize
    ResizeEdge {
        /// no edge
        None = 0,
        /// top edge
        Top = 1,
        /// bottom edge
        Bottom = 2,
        /// left edge
        Left = 4,
        /// top-left corner
        TopLeft = 5,
        /// bottom-left corner
        BottomLeft = 6,
        /// right edge
        Right = 8,
        /// top-right corner
        TopRight = 9,
        /// bottom-right corner
        BottomRight = 10,
    }
}

protocol_enum! {
    /// Errors of `xdg_wm_base`
    XdgWmBaseError {
        /// given wl_surface has another role
        Role = 0,
        /// xdg_wm_base was destroyed before children
        DefunctSurfaces = 1,
        /// the client did not respond to a ping in time
        Unresponsive = 6,
    }
}

protocol_enum! {
    /// Errors of `xdg_surface`
    XdgSurfaceError {
        /// surface was not fully constructed
        NotConstructed = 1,
        /// surface was already constructed
        AlreadyConstructed = 2,
        /// attaching a buffer failed precondition checks
        UnconfiguredBuffer = 3,
        /// invalid serial number when acking a configure event
        InvalidSerial = 4,
    }
}

protocol_enum! {
    /// Errors of `zwp_linux_buffer_params_v1`
    DmabufParamsError {
        /// the params object was already used to create a buffer
        AlreadyUsed = 0,
        /// plane index out of bounds
        PlaneIdx = 1,
        /// the plane index was already set
        PlaneSet = 2,
        /// missing or too many planes to create a buffer
        Incomplete = 3,
        /// format not supported
        InvalidFormat = 4,
        /// invalid width or height
        InvalidDimensions = 5,
        /// offset + stride * height goes out of dmabuf bounds
        OutOfBounds = 6,
        /// invalid wl_buffer resulted from importing dmabufs
        InvalidWlBuffer = 7,
    }
}

protocol_enum! {
    /// Errors of `wp_viewport`
    ViewportError {
        /// negative or zero values in width or height
        BadValue = 0,
        /// destination size is not integer
        BadSize = 1,
        /// source rectangle extends outside of the content area
        OutOfBuffer = 2,
        /// the wl_surface was destroyed
        NoSurface = 3,
    }
}

bitflags! {
    /// Capabilities of a `wl_seat`
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Capability: u32 {
        /// the seat has pointer devices
        const POINTER = 1;
        /// the seat has one or more keyboards
        const KEYBOARD = 2;
        /// the seat has touch devices
        const TOUCH = 4;
    }
}

bitflags! {
    /// Flags of a `wl_output` mode
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ModeFlags: u32 {
        /// indicates this is the current mode
        const CURRENT = 1;
        /// indicates this is the preferred mode
        const PREFERRED = 2;
    }
}

bitflags! {
    /// Drag-and-drop actions of the data-device family
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct DndAction: u32 {
        /// copy action
        const COPY = 1;
        /// move action
        const MOVE = 2;
        /// ask action
        const ASK = 4;
    }
}

bitflags! {
    /// Import flags of `zwp_linux_buffer_params_v1`
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct DmabufFlags: u32 {
        /// contents are y-inverted
        const Y_INVERT = 1;
        /// content is interlaced
        const INTERLACED = 2;
        /// bottom field first
        const BOTTOM_FIRST = 4;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fourcc_values() {
        // the two legacy codes are special-cased
        assert_eq!(u32::from(ShmFormat::Argb8888), 0);
        assert_eq!(u32::from(ShmFormat::Xrgb8888), 1);
        // everything else is a FourCC
        fn fourcc(code: &[u8; 4]) -> u32 {
            (code[0] as u32)
                | (code[1] as u32) << 8
                | (code[2] as u32) << 16
                | (code[3] as u32) << 24
        }
        assert_eq!(u32::from(ShmFormat::Rgb565), fourcc(b"RG16"));
        assert_eq!(u32::from(ShmFormat::Nv12), fourcc(b"NV12"));
        assert_eq!(u32::from(ShmFormat::Yuv420), fourcc(b"YU12"));
        assert_eq!(u32::from(ShmFormat::Xrgb2101010), fourcc(b"XR30"));
    }

    #[test]
    fn enum_roundtrip() {
        assert_eq!(Transform::try_from(5), Ok(Transform::Flipped90));
        assert!(Transform::try_from(8).is_err());
        assert_eq!(ToplevelState::try_from(4), Ok(ToplevelState::Activated));
        assert_eq!(ShmFormat::try_from(0x36314752), Ok(ShmFormat::Rgb565));
    }

    #[test]
    fn capability_bits() {
        let caps = Capability::POINTER | Capability::KEYBOARD;
        assert!(caps.contains(Capability::POINTER));
        assert!(!caps.contains(Capability::TOUCH));
        assert_eq!(caps.bits(), 3);
    }
}
