//! The protocol data model
//!
//! Everything here mirrors a wire-level concept: interface descriptors are
//! the static tables dispatch runs against, [`Message`] is one framed
//! request or event, and [`Argument`] is one typed value inside it. The
//! shapes are dictated by the wire format; the descriptors are immutable
//! process-wide statics and need no synchronization.

use std::{ffi::CString, os::unix::io::AsRawFd};

/// Description of one protocol interface
///
/// Lists the requests and events an object of this interface understands,
/// indexed by opcode. These tables are the single source of truth for
/// signatures: the codec and both dispatchers resolve every
/// `(interface, opcode)` pair against them.
#[derive(Debug)]
pub struct Interface {
    /// The protocol name of the interface.
    pub name: &'static str,
    /// The highest version this implementation knows.
    pub version: u32,
    /// Requests (client to server), in opcode order.
    pub requests: &'static [MessageDesc],
    /// Events (server to client), in opcode order.
    pub events: &'static [MessageDesc],
}

impl std::fmt::Display for Interface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name)
    }
}

/// Static description of one request or event
#[derive(Copy, Clone, Debug)]
pub struct MessageDesc {
    /// Protocol name of the message
    pub name: &'static str,
    /// Argument types, in declaration order
    pub signature: &'static [ArgumentType],
    /// Interface version that introduced the message
    ///
    /// An object bound at a lower version must never see it.
    pub since: u32,
    /// Whether the message destroys its object
    pub is_destructor: bool,
    /// Interface of the object a `new_id` argument creates, if any
    pub child_interface: Option<&'static Interface>,
    /// Expected interfaces of the `object` arguments, in order
    pub arg_interfaces: &'static [&'static Interface],
}

/// Stand-in interface for object references whose type is not statically
/// known (null references, `wl_display.error` culprits, ...)
pub static ANONYMOUS_INTERFACE: Interface =
    Interface { name: "<anonymous>", version: 0, requests: &[], events: &[] };

/// Protocol-level facts about one live object
#[derive(Copy, Clone, Debug)]
pub struct ObjectInfo {
    /// The numeric protocol id
    pub id: u32,
    /// The interface of the object
    pub interface: &'static Interface,
    /// The version the object was bound at
    pub version: u32,
}

/// Whether two descriptors describe the same interface
///
/// Descriptors are statics, so pointer identity settles almost every call.
#[inline]
pub fn same_interface(a: &'static Interface, b: &'static Interface) -> bool {
    std::ptr::eq(a, b) || a.name == b.name
}

// anonymous expectations accept anything
#[inline]
pub(crate) fn same_interface_or_anonymous(expected: &'static Interface, actual: &'static Interface) -> bool {
    same_interface(expected, actual) || same_interface(expected, &ANONYMOUS_INTERFACE)
}

/// Whether an argument slot may carry the null reference
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum AllowNull {
    /// Null is a legal value here.
    Yes,
    /// Null is a protocol violation here.
    No,
}

/// The eight argument types of the wire format
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum ArgumentType {
    /// 32-bit signed integer
    Int,
    /// 32-bit unsigned integer
    Uint,
    /// signed 24.8 fixed-point number
    Fixed,
    /// length-prefixed NUL-terminated string
    Str(AllowNull),
    /// reference to an existing object
    Object(AllowNull),
    /// id reserved for an object created by this message
    NewId,
    /// length-prefixed byte array
    Array,
    /// file descriptor, carried out of band
    Fd,
}

impl ArgumentType {
    /// Whether `arg` is a value of this wire type
    ///
    /// Nullability is a value property and is not checked here.
    pub fn accepts<Id, Fd>(self, arg: &Argument<Id, Fd>) -> bool {
        matches!(
            (self, arg),
            (Self::Int, Argument::Int(_))
                | (Self::Uint, Argument::Uint(_))
                | (Self::Fixed, Argument::Fixed(_))
                | (Self::Str(_), Argument::Str(_))
                | (Self::Object(_), Argument::Object(_))
                | (Self::NewId, Argument::NewId(_))
                | (Self::Array, Argument::Array(_))
                | (Self::Fd, Argument::Fd(_))
        )
    }
}

// argument lists are checked against the descriptor before anything is
// written to the wire
pub(crate) fn signature_matches<Id, Fd>(
    signature: &[ArgumentType],
    args: &[Argument<Id, Fd>],
) -> bool {
    signature.len() == args.len()
        && signature.iter().zip(args).all(|(ty, arg)| ty.accepts(arg))
}

/// A signed 24.8 fixed point number
///
/// The wire representation is the raw two's-complement integer; the codec
/// is a bit-level passthrough and neither saturates nor rounds.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Fixed(pub i32);

impl Fixed {
    /// Build a fixed-point value from an integer
    pub fn from_int(value: i32) -> Self {
        Self(value << 8)
    }

    /// The integer part, truncated towards negative infinity
    pub fn to_int(self) -> i32 {
        self.0 >> 8
    }

    /// Build a fixed-point value from a floating point one
    pub fn from_f64(value: f64) -> Self {
        Self((value * 256.0) as i32)
    }

    /// The floating point value of this fixed-point number
    pub fn to_f64(self) -> f64 {
        self.0 as f64 / 256.0
    }
}

impl std::fmt::Debug for Fixed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Fixed({})", self.to_f64())
    }
}

impl std::fmt::Display for Fixed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.4}", self.to_f64())
    }
}

/// One decoded argument value
///
/// Generic over how objects and file descriptors are represented: the
/// codec works with raw `u32` ids and owned fds, the dispatchers with
/// their richer id types.
#[derive(Debug, Clone)]
#[allow(clippy::box_collection)]
pub enum Argument<Id, Fd> {
    /// 32-bit signed integer
    Int(i32),
    /// 32-bit unsigned integer
    Uint(u32),
    /// signed 24.8 fixed-point number, as its raw bits
    Fixed(i32),
    /// string, or the null string
    ///
    /// Boxed to keep the variant (and with it every message) small; string
    /// arguments are rare on the hot paths.
    Str(Option<Box<CString>>),
    /// reference to an object
    Object(Id),
    /// id of the object this message creates
    NewId(Id),
    /// byte array
    ///
    /// Boxed for the same size reason as `Str`.
    Array(Box<Vec<u8>>),
    /// file descriptor
    Fd(Fd),
}

impl<Id: PartialEq, Fd: AsRawFd> PartialEq for Argument<Id, Fd> {
    fn eq(&self, other: &Self) -> bool {
        use Argument::*;
        match (self, other) {
            (Int(a), Int(b)) => a == b,
            (Uint(a), Uint(b)) => a == b,
            (Fixed(a), Fixed(b)) => a == b,
            (Str(a), Str(b)) => a == b,
            (Object(a), Object(b)) => a == b,
            (NewId(a), NewId(b)) => a == b,
            (Array(a), Array(b)) => a == b,
            // descriptors compare by number; use `same_file`-style checks in
            // tests when identity of the file matters
            (Fd(a), Fd(b)) => a.as_raw_fd() == b.as_raw_fd(),
            _ => false,
        }
    }
}

impl<Id: Eq, Fd: AsRawFd> Eq for Argument<Id, Fd> {}

// the format the wire tracer prints arguments in
impl<Id: std::fmt::Display, Fd: AsRawFd> std::fmt::Display for Argument<Id, Fd> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::Uint(v) => write!(f, "{v}"),
            Self::Fixed(v) => write!(f, "{}", Fixed(*v)),
            Self::Str(Some(s)) => write!(f, "{:?}", s.to_string_lossy()),
            Self::Str(None) => f.write_str("(nil)"),
            Self::Object(id) => write!(f, "{id}"),
            Self::NewId(id) => write!(f, "new id {id}"),
            Self::Array(a) => write!(f, "array[{}]", a.len()),
            Self::Fd(fd) => write!(f, "fd {}", fd.as_raw_fd()),
        }
    }
}

/// Number of arguments stored inline in a [`Message`] before spilling to
/// the heap
///
/// Nearly every message of the core protocol fits; the long-tailed ones
/// (`wl_touch.down`, `create_buffer`, dmabuf `add`) pay one allocation.
pub const INLINE_ARGS: usize = 4;

/// One framed message: its sender, opcode and decoded arguments
#[derive(Clone, Debug)]
pub struct Message<Id, Fd> {
    /// Object the message was sent on.
    pub sender_id: Id,
    /// Opcode within the sender's interface.
    pub opcode: u16,
    /// Arguments, in declaration order.
    pub args: smallvec::SmallVec<[Argument<Id, Fd>; INLINE_ARGS]>,
}

impl<Id, Fd> Message<Id, Fd> {
    /// Rewrap every fd in the message, changing the `Fd` parameter
    ///
    /// Used at the ownership boundaries: decoded messages carry `OwnedFd`,
    /// messages under construction borrow as `RawFd`.
    pub fn map_fd<T>(self, mut f: impl FnMut(Fd) -> T) -> Message<Id, T> {
        let args = self
            .args
            .into_iter()
            .map(|arg| match arg {
                Argument::Int(v) => Argument::Int(v),
                Argument::Uint(v) => Argument::Uint(v),
                Argument::Fixed(v) => Argument::Fixed(v),
                Argument::Str(s) => Argument::Str(s),
                Argument::Object(id) => Argument::Object(id),
                Argument::NewId(id) => Argument::NewId(id),
                Argument::Array(a) => Argument::Array(a),
                Argument::Fd(fd) => Argument::Fd(f(fd)),
            })
            .collect();
        Message { sender_id: self.sender_id, opcode: self.opcode, args }
    }
}

impl<Id: PartialEq, Fd: AsRawFd> PartialEq for Message<Id, Fd> {
    fn eq(&self, other: &Self) -> bool {
        self.sender_id == other.sender_id && self.opcode == other.opcode && self.args == other.args
    }
}

impl<Id: Eq, Fd: AsRawFd> Eq for Message<Id, Fd> {}

/// A fatal protocol violation reported through `wl_display.error`
///
/// The server kills the offending connection right after sending one.
#[derive(Clone, Debug)]
pub struct ProtocolError {
    /// Error code, scoped to the culprit's interface
    pub code: u32,
    /// Numeric id of the culprit object
    pub object_id: u32,
    /// Interface name of the culprit object
    pub object_interface: String,
    /// Human-readable description from the server
    pub message: String,
}

impl std::error::Error for ProtocolError {}

impl std::fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Protocol error on {}@{}: {} (code {})",
            self.object_interface, self.object_id, self.message, self.code
        )
    }
}

/// A protocol enum value, which may postdate this implementation
///
/// Servers are free to send values newer than the enums compiled in here,
/// so decoding must preserve the unknown ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WEnum<T> {
    /// A value this implementation knows
    Value(T),
    /// A raw value with no matching variant
    Unknown(u32),
}

impl<T> WEnum<T> {
    /// The known value, or an error naming the unknown raw one
    #[inline]
    pub fn into_result(self) -> Result<T, WEnumError> {
        match self {
            Self::Value(v) => Ok(v),
            Self::Unknown(value) => Err(WEnumError { typ: std::any::type_name::<T>(), value }),
        }
    }
}

impl<T> From<WEnum<T>> for Result<T, WEnumError> {
    fn from(e: WEnum<T>) -> Self {
        e.into_result()
    }
}

impl<T: TryFrom<u32>> From<u32> for WEnum<T> {
    fn from(raw: u32) -> Self {
        T::try_from(raw).map(Self::Value).unwrap_or(Self::Unknown(raw))
    }
}

impl<T: Into<u32>> From<WEnum<T>> for u32 {
    fn from(e: WEnum<T>) -> u32 {
        match e {
            WEnum::Value(v) => v.into(),
            WEnum::Unknown(raw) => raw,
        }
    }
}

/// Error for a [`WEnum`] holding a value unknown to its enum
#[derive(Debug, Copy, Clone)]
pub struct WEnumError {
    typ: &'static str,
    value: u32,
}

impl std::error::Error for WEnumError {}

impl std::fmt::Display for WEnumError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Unknown numeric value {} for enum {}", self.value, self.typ)
    }
}

/// Compare two serials, accounting for wrap-around.
///
/// Returns true if `a` was issued no later than `b` under modular
/// comparison, i.e. the signed distance from `a` to `b` is non-negative.
#[inline]
pub fn serial_is_newer_or_equal(b: u32, a: u32) -> bool {
    b.wrapping_sub(a) < (1 << 31)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_conversions() {
        assert_eq!(Fixed::from_int(7).0, 7 * 256);
        assert_eq!(Fixed::from_int(-3).to_int(), -3);
        assert_eq!(Fixed::from_f64(1.5).0, 384);
        assert_eq!(Fixed(384).to_f64(), 1.5);
        // bit-level passthrough, no rounding on the raw value
        assert_eq!(Fixed(-89).to_f64(), -89.0 / 256.0);
    }

    #[test]
    fn serial_wraparound() {
        assert!(serial_is_newer_or_equal(5, 3));
        assert!(serial_is_newer_or_equal(5, 5));
        assert!(!serial_is_newer_or_equal(3, 5));
        // across the wrap point
        assert!(serial_is_newer_or_equal(2, u32::MAX - 1));
        assert!(!serial_is_newer_or_equal(u32::MAX - 1, 2));
    }

    #[test]
    fn signatures_check_type_not_nullability() {
        let args: Vec<Argument<u32, std::os::unix::io::RawFd>> =
            vec![Argument::Uint(1), Argument::Str(None)];
        assert!(signature_matches(
            &[ArgumentType::Uint, ArgumentType::Str(AllowNull::No)],
            &args
        ));
        // wrong arity
        assert!(!signature_matches(&[ArgumentType::Uint], &args));
        // wrong type
        assert!(!signature_matches(
            &[ArgumentType::Int, ArgumentType::Str(AllowNull::Yes)],
            &args
        ));
    }

    #[test]
    fn wenum_roundtrip() {
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        enum Three {
            A,
        }
        impl TryFrom<u32> for Three {
            type Error = ();
            fn try_from(v: u32) -> Result<Self, ()> {
                if v == 3 {
                    Ok(Self::A)
                } else {
                    Err(())
                }
            }
        }
        assert_eq!(WEnum::<Three>::from(3), WEnum::Value(Three::A));
        assert_eq!(WEnum::<Three>::from(4), WEnum::Unknown(4));
        assert!(WEnum::<Three>::from(4).into_result().is_err());
    }
}
