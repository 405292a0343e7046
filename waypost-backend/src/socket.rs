//! Unix stream socket plumbing and message buffering
//!
//! [`Socket`] wraps the raw stream and the `SCM_RIGHTS` ancillary-data
//! handling. [`BufferedSocket`] queues whole frames on top of it: encoded
//! messages accumulate in an elastic outbox (paired with the outgoing fd
//! queue) and are shipped in transfer-unit chunks on flush; inbound bytes
//! accumulate in an inbox the parser consumes frame by frame. The two fd
//! queues preserve send order, which is what lets the codec pair each `h`
//! argument with the right descriptor.

use std::collections::VecDeque;
use std::io::{IoSlice, IoSliceMut, Result as IoResult};
use std::mem::MaybeUninit;
use std::os::unix::io::{AsFd, AsRawFd, BorrowedFd, OwnedFd, RawFd};
use std::os::unix::net::UnixStream;

use rustix::io::retry_on_intr;
use rustix::net::{
    recvmsg, send, sendmsg, RecvAncillaryBuffer, RecvAncillaryMessage, RecvFlags,
    SendAncillaryBuffer, SendAncillaryMessage, SendFlags,
};

use crate::protocol::{ArgumentType, Message};
use crate::wire::{parse_message, write_to_buffers, MessageParseError, MessageWriteError};

/// Maximum number of FDs that can travel with a single socket message
pub const MAX_FDS_OUT: usize = 28;
/// Maximum number of bytes sent in a single socket message
pub const MAX_BYTES_OUT: usize = 4096;

// the 16-bit size field bounds any single frame
const MAX_FRAME_BYTES: usize = u16::MAX as usize + 1;

/// A connection endpoint
///
/// Wraps a Unix stream socket and attaches/drains `SCM_RIGHTS` ancillary
/// file descriptors on send/receive.
#[derive(Debug)]
pub struct Socket {
    stream: UnixStream,
}

impl Socket {
    /// Send a block of bytes with its associated FDs
    ///
    /// The FDs ride as ancillary data on the first byte of the block.
    /// `fds` must not exceed `MAX_FDS_OUT` and `bytes` must not exceed
    /// `MAX_BYTES_OUT`, or the receiving end may lose data.
    pub fn send_msg(&self, bytes: &[u8], fds: &[OwnedFd]) -> IoResult<usize> {
        let flags = SendFlags::DONTWAIT | SendFlags::NOSIGNAL;

        if fds.is_empty() {
            return Ok(retry_on_intr(|| send(self, bytes, flags))?);
        }

        let rights: Vec<BorrowedFd> = fds.iter().map(AsFd::as_fd).collect();
        let mut space = vec![MaybeUninit::uninit(); rustix::cmsg_space!(ScmRights(rights.len()))];
        let mut ancillary = SendAncillaryBuffer::new(&mut space);
        ancillary.push(SendAncillaryMessage::ScmRights(&rights));
        let iov = [IoSlice::new(bytes)];
        Ok(retry_on_intr(|| sendmsg(self, &iov, &mut ancillary, flags))?)
    }

    /// Receive a block of bytes, draining ancillary FDs into `fds`
    ///
    /// Returns the number of bytes received; errors with `WouldBlock` if
    /// no data is available. Received FDs are marked close-on-exec and
    /// appended to `fds` in the order the peer sent them.
    pub fn rcv_msg(&self, buffer: &mut [u8], fds: &mut VecDeque<OwnedFd>) -> IoResult<usize> {
        let flags = RecvFlags::DONTWAIT | RecvFlags::CMSG_CLOEXEC;

        let mut space = [MaybeUninit::uninit(); rustix::cmsg_space!(ScmRights(MAX_FDS_OUT))];
        let mut ancillary = RecvAncillaryBuffer::new(&mut space);
        let mut iov = [IoSliceMut::new(buffer)];
        let msg = retry_on_intr(|| recvmsg(&self.stream, &mut iov[..], &mut ancillary, flags))?;

        for cmsg in ancillary.drain() {
            if let RecvAncillaryMessage::ScmRights(received) = cmsg {
                fds.extend(received);
            }
        }
        Ok(msg.bytes)
    }
}

impl From<UnixStream> for Socket {
    fn from(stream: UnixStream) -> Self {
        Self { stream }
    }
}

impl AsFd for Socket {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.stream.as_fd()
    }
}

impl AsRawFd for Socket {
    fn as_raw_fd(&self) -> RawFd {
        self.stream.as_raw_fd()
    }
}

/// A [`Socket`] with whole-frame queueing in both directions
#[derive(Debug)]
pub struct BufferedSocket {
    socket: Socket,
    /// inbound bytes not yet parsed into messages
    inbox: Vec<u8>,
    fds_in: VecDeque<OwnedFd>,
    /// encoded frames not yet on the wire
    outbox: Vec<u8>,
    fds_out: Vec<OwnedFd>,
    /// encode target for a single frame; grows on demand up to the frame
    /// size limit
    scratch: Vec<u8>,
}

impl BufferedSocket {
    /// Wrap a socket into a buffered socket
    pub fn new(socket: Socket) -> Self {
        Self {
            socket,
            inbox: Vec::with_capacity(MAX_BYTES_OUT),
            fds_in: VecDeque::new(),
            outbox: Vec::with_capacity(MAX_BYTES_OUT),
            fds_out: Vec::new(),
            scratch: vec![0; MAX_BYTES_OUT],
        }
    }

    /// Encode a message onto the outgoing queue
    ///
    /// Sending is left to [`flush`](Self::flush); queueing itself never
    /// blocks. A message that cannot fit a single frame errors with
    /// `E2BIG`.
    pub fn write_message(&mut self, msg: &Message<u32, RawFd>) -> IoResult<()> {
        loop {
            match write_to_buffers(msg, &mut self.scratch, &mut self.fds_out) {
                Ok(len) => {
                    self.outbox.extend_from_slice(&self.scratch[..len]);
                    return Ok(());
                }
                Err(MessageWriteError::BufferTooSmall) => {
                    if self.scratch.len() >= MAX_FRAME_BYTES {
                        return Err(rustix::io::Errno::TOOBIG.into());
                    }
                    let grown = (self.scratch.len() * 2).min(MAX_FRAME_BYTES);
                    self.scratch.resize(grown, 0);
                }
                Err(MessageWriteError::MessageTooLong)
                | Err(MessageWriteError::InvalidArgument) => {
                    return Err(rustix::io::Errno::TOOBIG.into());
                }
                Err(MessageWriteError::DupFdFailed(e)) => return Err(e),
            }
        }
    }

    /// Push the outgoing queue onto the wire
    ///
    /// Bytes go out in chunks of at most `MAX_BYTES_OUT`. Descriptors are
    /// consumed by the receiver in stream order, so they must never get
    /// ahead of the bytes they belong to: while more than `MAX_FDS_OUT`
    /// descriptors are pending, each surplus batch is pinned to a single
    /// byte of payload. A `WouldBlock` from the socket surfaces as-is;
    /// whatever was already shipped stays consumed and a later flush
    /// resumes cleanly.
    pub fn flush(&mut self) -> IoResult<()> {
        while !self.outbox.is_empty() {
            let (byte_budget, fd_budget) = if self.fds_out.len() > MAX_FDS_OUT {
                (1, MAX_FDS_OUT)
            } else {
                (self.outbox.len().min(MAX_BYTES_OUT), self.fds_out.len())
            };
            let sent = self
                .socket
                .send_msg(&self.outbox[..byte_budget], &self.fds_out[..fd_budget])?;
            if sent == 0 {
                // a non-empty send never legitimately reports zero
                break;
            }
            self.outbox.drain(..sent);
            self.fds_out.drain(..fd_budget);
        }
        Ok(())
    }

    /// Pull whatever the socket has into the inbox
    ///
    /// Errors with `WouldBlock` if nothing is pending and with `EPIPE`
    /// once the peer has hung up.
    pub fn fill_incoming_buffers(&mut self) -> IoResult<()> {
        let mut chunk = [0u8; MAX_BYTES_OUT];
        let read = self.socket.rcv_msg(&mut chunk, &mut self.fds_in)?;
        if read == 0 {
            return Err(rustix::io::Errno::PIPE.into());
        }
        self.inbox.extend_from_slice(&chunk[..read]);
        Ok(())
    }

    /// Parse one message off the front of the inbox
    ///
    /// `signature` resolves an `(object id, opcode)` pair to the argument
    /// types of the associated message, or `None` if the pair names no
    /// known message.
    pub fn read_one_message<F>(
        &mut self,
        mut signature: F,
    ) -> Result<Message<u32, OwnedFd>, MessageParseError>
    where
        F: FnMut(u32, u16) -> Option<&'static [ArgumentType]>,
    {
        if self.inbox.len() < 8 {
            return Err(MessageParseError::MissingData);
        }
        let sender_id = u32::from_le_bytes(self.inbox[0..4].try_into().unwrap());
        let header_word = u32::from_le_bytes(self.inbox[4..8].try_into().unwrap());
        let opcode = (header_word & 0x0000_FFFF) as u16;
        if sender_id == 0 {
            return Err(MessageParseError::NullSender);
        }
        let Some(sig) = signature(sender_id, opcode) else {
            return Err(MessageParseError::UnknownMessage { sender_id, opcode });
        };

        let (msg, remainder) = parse_message(&self.inbox, sig, &mut self.fds_in)?;
        let consumed = self.inbox.len() - remainder.len();
        self.inbox.drain(..consumed);
        Ok(msg)
    }
}

impl AsRawFd for BufferedSocket {
    fn as_raw_fd(&self) -> RawFd {
        self.socket.as_raw_fd()
    }
}

impl AsFd for BufferedSocket {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.socket.as_fd()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{AllowNull, Argument, ArgumentType, Message};

    use std::ffi::CString;
    use std::os::unix::io::IntoRawFd;

    use smallvec::smallvec;

    fn pair() -> (BufferedSocket, BufferedSocket) {
        let (a, b) = UnixStream::pair().unwrap();
        (BufferedSocket::new(Socket::from(a)), BufferedSocket::new(Socket::from(b)))
    }

    fn cstr(text: &str) -> Option<Box<CString>> {
        Some(Box::new(CString::new(text).unwrap()))
    }

    // fds point at the same file, even though the numbers differ after the
    // dup/transfer
    fn same_file(a: BorrowedFd, b: BorrowedFd) -> bool {
        let stat_a = rustix::fs::fstat(a).unwrap();
        let stat_b = rustix::fs::fstat(b).unwrap();
        stat_a.st_dev == stat_b.st_dev && stat_a.st_ino == stat_b.st_ino
    }

    fn assert_eq_msgs<Fd: AsRawFd + std::fmt::Debug>(
        sent: &Message<u32, Fd>,
        received: &Message<u32, Fd>,
    ) {
        assert_eq!(sent.sender_id, received.sender_id);
        assert_eq!(sent.opcode, received.opcode);
        assert_eq!(sent.args.len(), received.args.len());
        for (a, b) in sent.args.iter().zip(received.args.iter()) {
            if let (Argument::Fd(a), Argument::Fd(b)) = (a, b) {
                let a = unsafe { BorrowedFd::borrow_raw(a.as_raw_fd()) };
                let b = unsafe { BorrowedFd::borrow_raw(b.as_raw_fd()) };
                assert!(same_file(a, b));
            } else {
                assert_eq!(a, b);
            }
        }
    }

    #[test]
    fn frame_crosses_the_socket_intact() {
        static SIGNATURE: &[ArgumentType] = &[
            ArgumentType::NewId,
            ArgumentType::Str(AllowNull::No),
            ArgumentType::Uint,
            ArgumentType::Array,
            ArgumentType::Fixed,
        ];
        let msg = Message {
            sender_id: 3,
            opcode: 2,
            args: smallvec![
                Argument::NewId(17),
                Argument::Str(cstr("pool-a")),
                Argument::Uint(0x0806_0604),
                Argument::Array(Box::new((0u8..13).collect())),
                Argument::Fixed(crate::protocol::Fixed::from_f64(-3.25).0),
            ],
        };

        let (mut tx, mut rx) = pair();
        tx.write_message(&msg).unwrap();
        tx.flush().unwrap();

        rx.fill_incoming_buffers().unwrap();
        let received = rx
            .read_one_message(|id, op| (id == 3 && op == 2).then_some(SIGNATURE))
            .unwrap();

        assert_eq_msgs(&msg.map_fd(|fd| fd.as_raw_fd()), &received.map_fd(IntoRawFd::into_raw_fd));
    }

    #[test]
    fn fd_queue_preserves_send_order() {
        // two frames, three descriptors between them; the receiver must
        // pop them in exactly the order the signatures reference them
        static SIGNATURES: &[&[ArgumentType]] = &[
            &[ArgumentType::Fd, ArgumentType::Uint, ArgumentType::Fd],
            &[ArgumentType::Fd],
        ];
        let first = Message {
            sender_id: 9,
            opcode: 0,
            args: smallvec![
                Argument::Fd(0), // stdin
                Argument::Uint(44),
                Argument::Fd(2), // stderr
            ],
        };
        let second = Message {
            sender_id: 9,
            opcode: 1,
            args: smallvec![Argument::Fd(1)], // stdout
        };

        let (mut tx, mut rx) = pair();
        tx.write_message(&first).unwrap();
        tx.write_message(&second).unwrap();
        tx.flush().unwrap();

        rx.fill_incoming_buffers().unwrap();
        let lookup = |id: u32, op: u16| (id == 9).then(|| SIGNATURES[op as usize]);
        let rx_first = rx.read_one_message(lookup).unwrap();
        let rx_second = rx.read_one_message(lookup).unwrap();

        assert_eq_msgs(&first.map_fd(|fd| fd.as_raw_fd()), &rx_first.map_fd(IntoRawFd::into_raw_fd));
        assert_eq_msgs(
            &second.map_fd(|fd| fd.as_raw_fd()),
            &rx_second.map_fd(IntoRawFd::into_raw_fd),
        );
    }

    #[test]
    fn queued_frames_arrive_in_order() {
        static SIGNATURE: &[ArgumentType] = &[ArgumentType::Uint];
        let (mut tx, mut rx) = pair();
        for value in 0..40u32 {
            tx.write_message(&Message::<u32, RawFd> {
                sender_id: 6,
                opcode: 4,
                args: smallvec![Argument::Uint(value)],
            })
            .unwrap();
        }
        tx.flush().unwrap();

        let mut seen = Vec::new();
        loop {
            match rx.read_one_message(|id, op| (id == 6 && op == 4).then_some(SIGNATURE)) {
                Ok(msg) => {
                    if let [Argument::Uint(value)] = msg.args[..] {
                        seen.push(value);
                    }
                }
                Err(MessageParseError::MissingData) => {
                    if rx.fill_incoming_buffers().is_err() {
                        break;
                    }
                }
                Err(e) => panic!("unexpected parse failure: {e}"),
            }
            if seen.len() == 40 {
                break;
            }
        }
        assert_eq!(seen, (0..40).collect::<Vec<u32>>());
    }

    #[test]
    fn word_sized_string_keeps_following_args_aligned() {
        // "aligned" + NUL is exactly two words; the trailing uint must not
        // be swallowed by padding
        static SIGNATURE: &[ArgumentType] =
            &[ArgumentType::Str(AllowNull::No), ArgumentType::Uint];
        let msg = Message::<u32, RawFd> {
            sender_id: 12,
            opcode: 1,
            args: smallvec![Argument::Str(cstr("aligned")), Argument::Uint(77)],
        };

        let (mut tx, mut rx) = pair();
        tx.write_message(&msg).unwrap();
        tx.flush().unwrap();

        rx.fill_incoming_buffers().unwrap();
        let received = rx
            .read_one_message(|id, op| (id == 12 && op == 1).then_some(SIGNATURE))
            .unwrap();
        assert!(matches!(received.args[1], Argument::Uint(77)));
    }

    #[test]
    fn scratch_growth_is_capped_at_the_frame_limit() {
        let (mut tx, _rx) = pair();
        // two arrays that together overflow the 16-bit size field; the
        // scratch buffer grows to the cap, then the frame is refused
        let msg = Message::<u32, RawFd> {
            sender_id: 2,
            opcode: 0,
            args: smallvec![
                Argument::Array(Box::new(vec![0x55; 40_000])),
                Argument::Array(Box::new(vec![0xAA; 40_000])),
            ],
        };
        let err = tx.write_message(&msg).unwrap_err();
        assert_eq!(err.raw_os_error(), Some(rustix::io::Errno::TOOBIG.raw_os_error()));
        // nothing of the refused frame may linger in the queues
        assert!(tx.outbox.is_empty());
        assert!(tx.fds_out.is_empty());
    }
}
