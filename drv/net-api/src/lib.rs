// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! A driver-agnostic TCP socket API: a [`NetworkStack`] trait any Ethernet
//! controller driver implements, plus a typestate [`TcpSocket`] wrapper
//! that only exposes `listen`/`accept`/`read`/`write`/`close` in the state
//! each is valid for.
//!
//! The reference carries the socket type directly against a concrete
//! W5100-style driver struct; this crate abstracts that into a trait so
//! the SCPI and logger server tasks (and their tests) don't need a real
//! controller to drive the accept/read/write loop.

#![cfg_attr(not(test), no_std)]

use core::marker::PhantomData;

use ringbuf::{ringbuf, ringbuf_entry};
use userlib::hl;

pub mod w5100;
pub use w5100::{RegisterBus, W5100Stack};

/// A driver-assigned socket slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SocketHandle(pub u8);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SocketStatus {
    Closed,
    Init,
    Listen,
    Established,
    CloseWait,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TcpError {
    OpenFailed,
    ListenFailed,
    BadSocketState(SocketStatus),
    PeerClosed,
    Transport,
}

/// What a concrete Ethernet controller driver (W5100-style SPI part,
/// lwIP-backed MAC, or a test fake) provides. One socket slot per
/// `SocketHandle`; everything above this trait is transport-agnostic.
pub trait NetworkStack {
    fn open(&mut self, source_port: u16) -> Result<SocketHandle, TcpError>;
    fn listen(&mut self, handle: SocketHandle) -> Result<(), TcpError>;
    fn status(&mut self, handle: SocketHandle) -> Result<SocketStatus, TcpError>;
    fn read(&mut self, handle: SocketHandle, out: &mut [u8]) -> Result<usize, TcpError>;
    fn write(&mut self, handle: SocketHandle, buf: &[u8]) -> Result<usize, TcpError>;
    fn close(&mut self, handle: SocketHandle) -> Result<(), TcpError>;
}

#[derive(Clone, Copy, PartialEq)]
enum Trace {
    Opened(u8),
    Listening(u8),
    Accepted(u8),
    Disconnect(u8),
    PeerClosed(u8),
    StartRead(u8, usize),
    Read(u8, usize),
    StartWrite(u8, usize),
    Write(u8, usize),
    Close(u8),
    Error(u8),
    None,
}

ringbuf!(Trace, 64, Trace::None);

pub enum Init {}
pub enum Listening {}
pub enum Established {}

pub struct TcpSocket<'a, S: NetworkStack, State> {
    stack: &'a mut S,
    handle: SocketHandle,
    marker: PhantomData<State>,
}

impl<'a, S: NetworkStack> TcpSocket<'a, S, Init> {
    pub fn open(stack: &'a mut S, source_port: u16) -> Result<Self, TcpError> {
        let handle = stack.open(source_port)?;
        match stack.status(handle)? {
            SocketStatus::Init => {
                ringbuf_entry!(Trace::Opened(handle.0));
                Ok(Self {
                    stack,
                    handle,
                    marker: PhantomData,
                })
            }
            _ => Err(TcpError::OpenFailed),
        }
    }

    pub fn listen(self) -> Result<TcpSocket<'a, S, Listening>, TcpError> {
        let Self { stack, handle, .. } = self;
        stack.listen(handle)?;
        match stack.status(handle)? {
            SocketStatus::Listen => {
                ringbuf_entry!(Trace::Listening(handle.0));
                Ok(TcpSocket {
                    stack,
                    handle,
                    marker: PhantomData,
                })
            }
            other => {
                ringbuf_entry!(Trace::Error(handle.0));
                fail(stack, handle, TcpError::ListenFailed, other)
            }
        }
    }
}

impl<'a, S: NetworkStack> TcpSocket<'a, S, Listening> {
    /// Busy-waits until a client connects. A session task calling this in
    /// a loop suspends on its tick delay between polls, never blocking the
    /// rest of the system.
    pub fn accept(self) -> Result<TcpSocket<'a, S, Established>, TcpError> {
        let Self { stack, handle, .. } = self;
        loop {
            match stack.status(handle)? {
                SocketStatus::Listen => {
                    hl::sleep_for(100);
                }
                SocketStatus::Established => {
                    ringbuf_entry!(Trace::Accepted(handle.0));
                    return Ok(TcpSocket {
                        stack,
                        handle,
                        marker: PhantomData,
                    });
                }
                other => {
                    ringbuf_entry!(Trace::Error(handle.0));
                    return fail(stack, handle, TcpError::BadSocketState(other), other);
                }
            }
        }
    }
}

impl<'a, S: NetworkStack> TcpSocket<'a, S, Established> {
    pub fn close(self) -> Result<(), TcpError> {
        ringbuf_entry!(Trace::Disconnect(self.handle.0));
        let Self { stack, handle, .. } = self;
        stack.close(handle).map_err(|_| TcpError::Transport)?;
        ringbuf_entry!(Trace::Close(handle.0));
        Ok(())
    }

    /// Returns the number of bytes written.
    pub fn write(&mut self, buf: &[u8]) -> Result<usize, TcpError> {
        match self.stack.status(self.handle)? {
            SocketStatus::Established => {}
            SocketStatus::CloseWait => {
                ringbuf_entry!(Trace::PeerClosed(self.handle.0));
                return self.fail(TcpError::PeerClosed);
            }
            other => return self.fail(TcpError::BadSocketState(other)),
        }

        ringbuf_entry!(Trace::StartWrite(self.handle.0, buf.len()));
        match self.stack.write(self.handle, buf) {
            Ok(n) => {
                ringbuf_entry!(Trace::Write(self.handle.0, n));
                Ok(n)
            }
            Err(err) => self.fail(err),
        }
    }

    /// Returns the number of bytes read; `0` if the peer has closed the
    /// connection.
    pub fn read(&mut self, out: &mut [u8]) -> Result<usize, TcpError> {
        ringbuf_entry!(Trace::StartRead(self.handle.0, out.len()));
        loop {
            match self.stack.status(self.handle)? {
                SocketStatus::Established => {}
                SocketStatus::CloseWait => {
                    ringbuf_entry!(Trace::PeerClosed(self.handle.0));
                    return Ok(0);
                }
                other => return self.fail(TcpError::BadSocketState(other)),
            }

            match self.stack.read(self.handle, out) {
                Ok(0) => {
                    hl::sleep_for(10);
                    continue;
                }
                Ok(n) => {
                    ringbuf_entry!(Trace::Read(self.handle.0, n));
                    return Ok(n);
                }
                Err(err) => return self.fail(err),
            }
        }
    }

    fn fail<T>(&mut self, error: TcpError) -> Result<T, TcpError> {
        ringbuf_entry!(Trace::Error(self.handle.0));
        let _ = self.stack.close(self.handle);
        Err(error)
    }
}

fn fail<S: NetworkStack, T>(
    stack: &mut S,
    handle: SocketHandle,
    error: TcpError,
    _observed: SocketStatus,
) -> Result<T, TcpError> {
    let _ = stack.close(handle);
    Err(error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use heapless::FnvIndexMap;

    #[derive(Clone, Copy)]
    struct FakeSocket {
        status: SocketStatus,
        inbox: [u8; 64],
        inbox_len: usize,
    }

    struct FakeStack {
        sockets: FnvIndexMap<u8, FakeSocket, 4>,
        next: u8,
        auto_establish: bool,
    }

    impl FakeStack {
        fn new() -> Self {
            Self {
                sockets: FnvIndexMap::new(),
                next: 0,
                auto_establish: false,
            }
        }

        fn deliver(&mut self, handle: SocketHandle, data: &[u8]) {
            let socket = self.sockets.get_mut(&handle.0).unwrap();
            socket.inbox[..data.len()].copy_from_slice(data);
            socket.inbox_len = data.len();
        }
    }

    impl NetworkStack for FakeStack {
        fn open(&mut self, _source_port: u16) -> Result<SocketHandle, TcpError> {
            let handle = SocketHandle(self.next);
            self.next += 1;
            let _ = self.sockets.insert(
                handle.0,
                FakeSocket {
                    status: SocketStatus::Init,
                    inbox: [0; 64],
                    inbox_len: 0,
                },
            );
            Ok(handle)
        }

        fn listen(&mut self, handle: SocketHandle) -> Result<(), TcpError> {
            let socket = self.sockets.get_mut(&handle.0).unwrap();
            socket.status = SocketStatus::Listen;
            if self.auto_establish {
                socket.status = SocketStatus::Established;
            }
            Ok(())
        }

        fn status(&mut self, handle: SocketHandle) -> Result<SocketStatus, TcpError> {
            Ok(self.sockets.get(&handle.0).unwrap().status)
        }

        fn read(&mut self, handle: SocketHandle, out: &mut [u8]) -> Result<usize, TcpError> {
            let socket = self.sockets.get_mut(&handle.0).unwrap();
            let n = socket.inbox_len;
            out[..n].copy_from_slice(&socket.inbox[..n]);
            socket.inbox_len = 0;
            Ok(n)
        }

        fn write(&mut self, handle: SocketHandle, buf: &[u8]) -> Result<usize, TcpError> {
            let _ = self.sockets.get(&handle.0).unwrap();
            Ok(buf.len())
        }

        fn close(&mut self, handle: SocketHandle) -> Result<(), TcpError> {
            if let Some(socket) = self.sockets.get_mut(&handle.0) {
                socket.status = SocketStatus::Closed;
            }
            Ok(())
        }
    }

    #[test]
    fn open_listen_accept_reaches_established() {
        let mut stack = FakeStack::new();
        stack.auto_establish = true;
        let socket = TcpSocket::open(&mut stack, 5025).unwrap();
        let socket = socket.listen().unwrap();
        let _established = socket.accept().unwrap();
    }

    #[test]
    fn read_returns_delivered_bytes() {
        let mut stack = FakeStack::new();
        stack.auto_establish = true;
        let socket = TcpSocket::open(&mut stack, 5025).unwrap();
        let socket = socket.listen().unwrap();
        let handle = socket.handle;
        let mut established = socket.accept().unwrap();
        established.stack.deliver(handle, b"*IDN?\n");
        let mut buf = [0u8; 64];
        let n = established.read(&mut buf).unwrap();
        assert_eq!(&buf[..n], b"*IDN?\n");
    }

    #[test]
    fn write_after_peer_close_wait_fails_and_closes_socket() {
        let mut stack = FakeStack::new();
        stack.auto_establish = true;
        let socket = TcpSocket::open(&mut stack, 5025).unwrap();
        let socket = socket.listen().unwrap();
        let handle = socket.handle;
        let mut established = socket.accept().unwrap();
        established.stack.sockets.get_mut(&handle.0).unwrap().status = SocketStatus::CloseWait;
        let err = established.write(b"hello").unwrap_err();
        assert_eq!(err, TcpError::PeerClosed);
        assert_eq!(
            established.stack.sockets.get(&handle.0).unwrap().status,
            SocketStatus::Closed
        );
    }
}
