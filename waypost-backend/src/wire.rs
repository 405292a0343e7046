//! Serialization and deserialization of messages against the wire format
//!
//! The wire layout is: an 8-byte header (object id: u32, then one u32 word
//! packing the total size in its upper 16 bits and the opcode in its lower
//! 16 bits), followed by the arguments in declaration order. All integers
//! are little-endian, and every message is padded to a multiple of 4 bytes.

use std::collections::VecDeque;
use std::ffi::CStr;
use std::os::unix::io::{BorrowedFd, OwnedFd, RawFd};

use crate::protocol::{AllowNull, Argument, ArgumentType, Message};

use smallvec::SmallVec;

/// Maximum byte length of a string argument, trailing NUL included
pub const MAX_STRING_LEN: usize = 4096;
/// Maximum byte length of an array argument
pub const MAX_ARRAY_LEN: usize = 65536;

const HEADER_LEN: usize = 8;

/// Error generated when trying to serialize a message into buffers
#[derive(Debug)]
pub enum MessageWriteError {
    /// The buffer is too small to hold the message contents
    BufferTooSmall,
    /// The message would overflow the 16-bit size field of the header
    MessageTooLong,
    /// An argument exceeds its protocol-level size limit
    InvalidArgument,
    /// The message contains a FD that could not be dup-ed
    DupFdFailed(std::io::Error),
}

impl std::error::Error for MessageWriteError {}

impl std::fmt::Display for MessageWriteError {
    fn fmt(&self, f: &mut ::std::fmt::Formatter) -> Result<(), ::std::fmt::Error> {
        match self {
            Self::BufferTooSmall => {
                f.write_str("The provided buffer is too small to hold message content.")
            }
            Self::MessageTooLong => {
                f.write_str("The message content overflows the 16-bit size field.")
            }
            Self::InvalidArgument => {
                f.write_str("An argument exceeds its protocol-level size limit.")
            }
            Self::DupFdFailed(e) => {
                write!(
                    f,
                    "The message contains a file descriptor that could not be dup()-ed ({e})."
                )
            }
        }
    }
}

/// Error generated when trying to deserialize a message from buffers
#[derive(Debug, Clone)]
pub enum MessageParseError {
    /// The message references a FD but the ancillary FD queue is empty
    MissingFD,
    /// More data is needed to deserialize the message
    MissingData,
    /// The message is malformed and cannot be parsed
    Malformed,
    /// The header names object 0 as the sender
    NullSender,
    /// An argument value violates the protocol (zero-length non-null string,
    /// length running past the message end)
    InvalidArgument,
    /// No signature is known for the (object, opcode) pair in the header
    ///
    /// Either the opcode is out of range for the object's interface, or no
    /// live object carries this id. The header is reported so a dispatcher
    /// can name the culprit in its error path.
    UnknownMessage {
        /// the object id from the header
        sender_id: u32,
        /// the opcode from the header
        opcode: u16,
    },
}

impl std::error::Error for MessageParseError {}

impl std::fmt::Display for MessageParseError {
    fn fmt(&self, f: &mut ::std::fmt::Formatter) -> Result<(), ::std::fmt::Error> {
        match *self {
            Self::MissingFD => {
                f.write_str("The message references a FD but the ancillary FD queue is empty.")
            }
            Self::MissingData => f.write_str("More data is needed to deserialize the message."),
            Self::Malformed => f.write_str("The message is malformed and cannot be parsed."),
            Self::NullSender => f.write_str("The message header names the null object."),
            Self::InvalidArgument => f.write_str("A message argument violates the protocol."),
            Self::UnknownMessage { sender_id, opcode } => {
                write!(f, "No known message for object {sender_id} opcode {opcode}.")
            }
        }
    }
}

fn pad_to_word(len: usize) -> usize {
    match len % 4 {
        0 => len,
        r => len + (4 - r),
    }
}

/// Serialize the contents of a message into the provided buffer
///
/// Returns the number of bytes written. Any serialized Fd is `dup()`-ed
/// into `fds`; the caller keeps ownership of the original descriptors. On
/// failure nothing is left in `fds`, so a retry after flushing cannot send
/// duplicates.
pub fn write_to_buffers(
    msg: &Message<u32, RawFd>,
    payload: &mut [u8],
    fds: &mut Vec<OwnedFd>,
) -> Result<usize, MessageWriteError> {
    let fds_before = fds.len();
    write_message_inner(msg, payload, fds).map_err(|err| {
        fds.truncate(fds_before);
        err
    })
}

fn write_message_inner(
    msg: &Message<u32, RawFd>,
    payload: &mut [u8],
    fds: &mut Vec<OwnedFd>,
) -> Result<usize, MessageWriteError> {
    fn write_word(word: u32, payload: &mut [u8]) -> Result<&mut [u8], MessageWriteError> {
        if payload.len() >= 4 {
            let (head, tail) = payload.split_at_mut(4);
            head.copy_from_slice(&word.to_le_bytes());
            Ok(tail)
        } else {
            Err(MessageWriteError::BufferTooSmall)
        }
    }

    fn write_bytes<'a>(
        bytes: &[u8],
        payload: &'a mut [u8],
    ) -> Result<&'a mut [u8], MessageWriteError> {
        let payload = write_word(bytes.len() as u32, payload)?;
        let padded = pad_to_word(bytes.len());
        if payload.len() < padded {
            return Err(MessageWriteError::BufferTooSmall);
        }
        let (dest, rest) = payload.split_at_mut(padded);
        dest[..bytes.len()].copy_from_slice(bytes);
        for b in &mut dest[bytes.len()..] {
            *b = 0;
        }
        Ok(rest)
    }

    let free_size = payload.len();
    if free_size < HEADER_LEN {
        return Err(MessageWriteError::BufferTooSmall);
    }

    let (header, mut tail) = payload.split_at_mut(HEADER_LEN);

    for arg in &msg.args {
        tail = match *arg {
            Argument::Int(i) => write_word(i as u32, tail)?,
            Argument::Uint(u) => write_word(u, tail)?,
            Argument::Fixed(f) => write_word(f as u32, tail)?,
            Argument::Str(Some(ref s)) => {
                let bytes = s.as_bytes_with_nul();
                if bytes.len() > MAX_STRING_LEN {
                    return Err(MessageWriteError::InvalidArgument);
                }
                write_bytes(bytes, tail)?
            }
            Argument::Str(None) => write_word(0, tail)?,
            Argument::Object(o) => write_word(o, tail)?,
            Argument::NewId(n) => write_word(n, tail)?,
            Argument::Array(ref a) => {
                if a.len() > MAX_ARRAY_LEN {
                    return Err(MessageWriteError::InvalidArgument);
                }
                write_bytes(a, tail)?
            }
            Argument::Fd(fd) => {
                let dup_fd = unsafe { BorrowedFd::borrow_raw(fd) }
                    .try_clone_to_owned()
                    .map_err(MessageWriteError::DupFdFailed)?;
                fds.push(dup_fd);
                tail
            }
        };
    }

    let written = free_size - tail.len();
    if written > u16::MAX as usize {
        return Err(MessageWriteError::MessageTooLong);
    }
    header[..4].copy_from_slice(&msg.sender_id.to_le_bytes());
    header[4..].copy_from_slice(&(((written as u32) << 16) | u32::from(msg.opcode)).to_le_bytes());
    Ok(written)
}

/// Attempts to parse a single message with the given signature.
///
/// If the buffer contains several messages, only the first one is parsed
/// and the unused tail of the buffer is returned.
///
/// Strings and arrays are copied out of the buffer; nothing in the returned
/// message borrows `raw`. File descriptors are popped from `fds` at the
/// position their argument occupies in the signature.
#[allow(clippy::type_complexity)]
pub fn parse_message<'a>(
    raw: &'a [u8],
    signature: &[ArgumentType],
    fds: &mut VecDeque<OwnedFd>,
) -> Result<(Message<u32, OwnedFd>, &'a [u8]), MessageParseError> {
    fn split_array(array_len: usize, payload: &[u8]) -> Result<(&[u8], &[u8]), MessageParseError> {
        let padded = pad_to_word(array_len);
        if padded > payload.len() {
            return Err(MessageParseError::InvalidArgument);
        }
        Ok((&payload[..array_len], &payload[padded..]))
    }

    if raw.len() < HEADER_LEN {
        return Err(MessageParseError::MissingData);
    }

    let sender_id = u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]);
    let word_2 = u32::from_le_bytes([raw[4], raw[5], raw[6], raw[7]]);
    let opcode = (word_2 & 0x0000_FFFF) as u16;
    let len = (word_2 >> 16) as usize;

    if sender_id == 0 {
        return Err(MessageParseError::NullSender);
    }
    if len < HEADER_LEN {
        return Err(MessageParseError::Malformed);
    } else if len > raw.len() {
        return Err(MessageParseError::MissingData);
    }

    let fd_len = signature.iter().filter(|x| matches!(x, ArgumentType::Fd)).count();
    if fd_len > fds.len() {
        return Err(MessageParseError::MissingFD);
    }

    let (mut payload, rest) = raw.split_at(len);
    payload = &payload[HEADER_LEN..];

    let arguments = signature
        .iter()
        .map(|argtype| {
            if let ArgumentType::Fd = *argtype {
                // consumes an fd, not payload bytes
                if let Some(front) = fds.pop_front() {
                    Ok(Argument::Fd(front))
                } else {
                    Err(MessageParseError::MissingFD)
                }
            } else if payload.len() >= 4 {
                let (front, mut tail) = payload.split_at(4);
                let front = u32::from_le_bytes(front.try_into().unwrap());
                let arg = match *argtype {
                    ArgumentType::Int => Ok(Argument::Int(front as i32)),
                    ArgumentType::Uint => Ok(Argument::Uint(front)),
                    ArgumentType::Fixed => Ok(Argument::Fixed(front as i32)),
                    ArgumentType::Str(allow_null) => {
                        if front == 0 {
                            if allow_null == AllowNull::No {
                                Err(MessageParseError::InvalidArgument)
                            } else {
                                Ok(Argument::Str(None))
                            }
                        } else {
                            split_array(front as usize, tail).and_then(|(bytes, rest)| {
                                tail = rest;
                                match CStr::from_bytes_with_nul(bytes) {
                                    Ok(s) => Ok(Argument::Str(Some(Box::new(s.into())))),
                                    Err(_) => Err(MessageParseError::Malformed),
                                }
                            })
                        }
                    }
                    ArgumentType::Object(_) => Ok(Argument::Object(front)),
                    ArgumentType::NewId => Ok(Argument::NewId(front)),
                    ArgumentType::Array => {
                        split_array(front as usize, tail).map(|(bytes, rest)| {
                            tail = rest;
                            Argument::Array(Box::new(bytes.into()))
                        })
                    }
                    ArgumentType::Fd => unreachable!(),
                };
                payload = tail;
                arg
            } else {
                Err(MessageParseError::MissingData)
            }
        })
        .collect::<Result<SmallVec<_>, MessageParseError>>()?;

    let msg = Message { sender_id, opcode, args: arguments };
    Ok((msg, rest))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::AllowNull;
    use smallvec::smallvec;
    use std::{ffi::CString, os::unix::io::IntoRawFd};

    #[test]
    fn encode_decode_is_identity() {
        let mut payload = vec![0; 512];
        let mut fds = Vec::new();

        // one argument of every in-band type, including a server-range
        // object reference and a null string
        let msg = Message {
            sender_id: 0x0000_0C0A,
            opcode: 11,
            args: smallvec![
                Argument::Int(-640),
                Argument::Object(0xFF00_0002),
                Argument::Str(Some(Box::new(CString::new(&b"seat-hotplug"[..]).unwrap()))),
                Argument::Str(None),
                Argument::Fixed(crate::protocol::Fixed::from_f64(480.5).0),
                Argument::NewId(0x41),
                Argument::Array(Box::new(b"\x01\x00\x7f\xfe".to_vec())),
                Argument::Uint(u32::MAX),
            ],
        };
        static SIGNATURE: &[ArgumentType] = &[
            ArgumentType::Int,
            ArgumentType::Object(AllowNull::No),
            ArgumentType::Str(AllowNull::No),
            ArgumentType::Str(AllowNull::Yes),
            ArgumentType::Fixed,
            ArgumentType::NewId,
            ArgumentType::Array,
            ArgumentType::Uint,
        ];

        let written = write_to_buffers(&msg, &mut payload[..], &mut fds).unwrap();
        assert_eq!(written % 4, 0);

        let mut fds = VecDeque::from(fds);
        let (rebuilt, rest) = parse_message(&payload[..written], SIGNATURE, &mut fds).unwrap();
        assert!(rest.is_empty());
        assert_eq!(rebuilt.map_fd(IntoRawFd::into_raw_fd), msg);
    }

    #[test]
    fn header_is_little_endian_and_word_padded() {
        let mut buffer = vec![0; 256];
        let mut fds = Vec::new();
        let msg = Message::<u32, RawFd> {
            sender_id: 0x0102_0304,
            opcode: 2,
            args: smallvec![Argument::Str(Some(Box::new(
                CString::new(&b"ab"[..]).unwrap()
            )))],
        };
        let written = write_to_buffers(&msg, &mut buffer[..], &mut fds).unwrap();
        // id, little-endian
        assert_eq!(&buffer[..4], &[0x04, 0x03, 0x02, 0x01]);
        // size << 16 | opcode: header + length word + "ab\0" padded to 4
        assert_eq!(written, 8 + 4 + 4);
        assert_eq!(&buffer[4..8], &[0x02, 0x00, 0x10, 0x00]);
        assert_eq!(written % 4, 0);
        // declared string length includes the NUL
        assert_eq!(&buffer[8..12], &[3, 0, 0, 0]);
        assert_eq!(&buffer[12..16], &[b'a', b'b', 0, 0]);
    }

    #[test]
    fn oversized_arguments_rejected() {
        let mut buffer = vec![0; 2 * MAX_ARRAY_LEN];
        let mut fds = Vec::new();

        let long_string = CString::new(vec![b'x'; MAX_STRING_LEN]).unwrap();
        let msg = Message::<u32, RawFd> {
            sender_id: 3,
            opcode: 0,
            args: smallvec![Argument::Str(Some(Box::new(long_string)))],
        };
        assert!(matches!(
            write_to_buffers(&msg, &mut buffer[..], &mut fds),
            Err(MessageWriteError::InvalidArgument)
        ));

        let msg = Message::<u32, RawFd> {
            sender_id: 3,
            opcode: 0,
            args: smallvec![Argument::Array(Box::new(vec![0u8; MAX_ARRAY_LEN + 1]))],
        };
        assert!(matches!(
            write_to_buffers(&msg, &mut buffer[..], &mut fds),
            Err(MessageWriteError::InvalidArgument)
        ));
    }

    #[test]
    fn overlong_message_rejected() {
        // several max-size arrays overflow the u16 size field together
        let mut buffer = vec![0; 4 * MAX_ARRAY_LEN];
        let mut fds = Vec::new();
        let msg = Message::<u32, RawFd> {
            sender_id: 3,
            opcode: 0,
            args: smallvec![
                Argument::Array(Box::new(vec![0u8; MAX_ARRAY_LEN])),
                Argument::Array(Box::new(vec![0u8; MAX_ARRAY_LEN])),
            ],
        };
        assert!(matches!(
            write_to_buffers(&msg, &mut buffer[..], &mut fds),
            Err(MessageWriteError::MessageTooLong)
        ));
    }

    #[test]
    fn malformed_headers() {
        let mut fds = VecDeque::new();
        // null sender
        let mut raw = Vec::new();
        raw.extend_from_slice(&0u32.to_le_bytes());
        raw.extend_from_slice(&((8u32 << 16) | 0).to_le_bytes());
        assert!(matches!(
            parse_message(&raw, &[], &mut fds),
            Err(MessageParseError::NullSender)
        ));
        // declared size below the header length
        let mut raw = Vec::new();
        raw.extend_from_slice(&1u32.to_le_bytes());
        raw.extend_from_slice(&((4u32 << 16) | 0).to_le_bytes());
        assert!(matches!(
            parse_message(&raw, &[], &mut fds),
            Err(MessageParseError::Malformed)
        ));
        // declared size past the buffer end
        let mut raw = Vec::new();
        raw.extend_from_slice(&1u32.to_le_bytes());
        raw.extend_from_slice(&((64u32 << 16) | 0).to_le_bytes());
        assert!(matches!(
            parse_message(&raw, &[], &mut fds),
            Err(MessageParseError::MissingData)
        ));
    }

    #[test]
    fn zero_length_string_needs_allow_null() {
        let mut fds = VecDeque::new();
        let mut raw = Vec::new();
        raw.extend_from_slice(&1u32.to_le_bytes());
        raw.extend_from_slice(&((12u32 << 16) | 0).to_le_bytes());
        raw.extend_from_slice(&0u32.to_le_bytes());

        let (msg, _) =
            parse_message(&raw, &[ArgumentType::Str(AllowNull::Yes)], &mut fds).unwrap();
        assert!(matches!(msg.args[0], Argument::Str(None)));

        assert!(matches!(
            parse_message(&raw, &[ArgumentType::Str(AllowNull::No)], &mut fds),
            Err(MessageParseError::InvalidArgument)
        ));
    }

    #[test]
    fn string_length_past_message_end() {
        let mut fds = VecDeque::new();
        let mut raw = Vec::new();
        raw.extend_from_slice(&1u32.to_le_bytes());
        raw.extend_from_slice(&((16u32 << 16) | 0).to_le_bytes());
        raw.extend_from_slice(&100u32.to_le_bytes());
        raw.extend_from_slice(&[0u8; 4]);
        assert!(matches!(
            parse_message(&raw, &[ArgumentType::Str(AllowNull::No)], &mut fds),
            Err(MessageParseError::InvalidArgument)
        ));
    }

    #[test]
    fn fixed_is_bit_passthrough() {
        let mut buffer = vec![0; 64];
        let mut fds = Vec::new();
        let msg = Message::<u32, RawFd> {
            sender_id: 9,
            opcode: 1,
            args: smallvec![Argument::Fixed(i32::MIN), Argument::Fixed(-1)],
        };
        write_to_buffers(&msg, &mut buffer[..], &mut fds).unwrap();
        let mut fds = VecDeque::new();
        let (rebuilt, _) = parse_message(
            &buffer,
            &[ArgumentType::Fixed, ArgumentType::Fixed],
            &mut fds,
        )
        .unwrap();
        assert!(matches!(rebuilt.args[0], Argument::Fixed(v) if v == i32::MIN));
        assert!(matches!(rebuilt.args[1], Argument::Fixed(-1)));
    }
}
