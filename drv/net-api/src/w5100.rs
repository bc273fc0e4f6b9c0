// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! A [`NetworkStack`] implementation for the single-socket W5100
//! configuration, built on a generic [`RegisterBus`] rather than a
//! pointer-carrying SPI device handle.
//!
//! Only socket 0 in the `OneSocket8Kib` buffer layout is supported; the
//! chip's 4- and 2-socket configurations and its UDP/IP-raw/MAC-raw modes
//! are out of scope here.

use bitflags::bitflags;
use raptor_bus::BusError;

use crate::{NetworkStack, SocketHandle, SocketStatus, TcpError};

const SOCKET0: u8 = 0;

const REG_MR: u16 = 0x0400;
const REG_CR: u16 = 0x0401;
const REG_SR: u16 = 0x0403;
const REG_PORT: u16 = 0x0404;
const REG_TX_FSR: u16 = 0x0420;
const REG_TX_WR: u16 = 0x0424;
const REG_RX_RSR: u16 = 0x0426;
const REG_RX_RD: u16 = 0x0428;

const TX_BASE: u16 = 0x4000;
const RX_BASE: u16 = 0x6000;
const BUF_SIZE: u16 = 8192;

bitflags! {
    struct SocketMode: u8 {
        const PROTO_TCP = 0x01;
    }
}

#[repr(u8)]
enum SocketCommand {
    Open = 0x01,
    Listen = 0x02,
    Close = 0x10,
    Send = 0x20,
    Recv = 0x40,
}

const RAW_CLOSED: u8 = 0x00;
const RAW_INIT: u8 = 0x13;
const RAW_LISTEN: u8 = 0x14;
const RAW_ESTABLISHED: u8 = 0x17;
const RAW_CLOSE_WAIT: u8 = 0x1c;

/// The register-level transport a [`W5100Stack`] is built on: byte and
/// word register access plus bulk buffer reads/writes, addressed the way
/// the W5100's internal memory map addresses them (registers and buffer
/// RAM share one 16-bit address space).
pub trait RegisterBus {
    fn read_u8(&mut self, addr: u16) -> Result<u8, BusError>;
    fn write_u8(&mut self, addr: u16, value: u8) -> Result<(), BusError>;
    fn read_u16(&mut self, addr: u16) -> Result<u16, BusError>;
    fn write_u16(&mut self, addr: u16, value: u16) -> Result<(), BusError>;
    fn read_buf(&mut self, addr: u16, out: &mut [u8]) -> Result<(), BusError>;
    fn write_buf(&mut self, addr: u16, buf: &[u8]) -> Result<(), BusError>;
}

impl From<BusError> for TcpError {
    fn from(_: BusError) -> Self {
        TcpError::Transport
    }
}

/// A [`NetworkStack`] over a single W5100 TCP socket in its 8KiB-buffer
/// one-socket configuration.
pub struct W5100Stack<B: RegisterBus> {
    bus: B,
}

impl<B: RegisterBus> W5100Stack<B> {
    pub fn new(bus: B) -> Self {
        Self { bus }
    }

    fn raw_status(&mut self) -> Result<u8, TcpError> {
        Ok(self.bus.read_u8(REG_SR)?)
    }

    fn require_socket0(&self, handle: SocketHandle) -> Result<(), TcpError> {
        if handle.0 == SOCKET0 {
            Ok(())
        } else {
            Err(TcpError::BadSocketState(SocketStatus::Closed))
        }
    }
}

impl<B: RegisterBus> NetworkStack for W5100Stack<B> {
    fn open(&mut self, source_port: u16) -> Result<SocketHandle, TcpError> {
        self.bus.write_u8(REG_MR, SocketMode::PROTO_TCP.bits())?;
        self.bus.write_u16(REG_PORT, source_port)?;
        self.bus.write_u8(REG_CR, SocketCommand::Open as u8)?;
        match self.raw_status()? {
            RAW_INIT => Ok(SocketHandle(SOCKET0)),
            _ => Err(TcpError::OpenFailed),
        }
    }

    fn listen(&mut self, handle: SocketHandle) -> Result<(), TcpError> {
        self.require_socket0(handle)?;
        self.bus.write_u8(REG_CR, SocketCommand::Listen as u8)?;
        Ok(())
    }

    fn status(&mut self, handle: SocketHandle) -> Result<SocketStatus, TcpError> {
        self.require_socket0(handle)?;
        match self.raw_status()? {
            RAW_CLOSED => Ok(SocketStatus::Closed),
            RAW_INIT => Ok(SocketStatus::Init),
            RAW_LISTEN => Ok(SocketStatus::Listen),
            RAW_ESTABLISHED => Ok(SocketStatus::Established),
            RAW_CLOSE_WAIT => Ok(SocketStatus::CloseWait),
            // An ephemeral state (SYN_SENT, FIN_WAIT, ...) is transient
            // and not one of ours to act on directly.
            _ => Ok(SocketStatus::Closed),
        }
    }

    fn read(&mut self, handle: SocketHandle, out: &mut [u8]) -> Result<usize, TcpError> {
        self.require_socket0(handle)?;
        let nready = self.bus.read_u16(REG_RX_RSR)?;
        let nready = out.len().min(usize::from(nready)) as u16;
        if nready == 0 {
            return Ok(0);
        }

        let rd_pointer = self.bus.read_u16(REG_RX_RD)?;
        let offset = rd_pointer & (BUF_SIZE - 1);
        if offset + nready > BUF_SIZE {
            let to_end = BUF_SIZE - offset;
            self.bus.read_buf(RX_BASE + offset, &mut out[..usize::from(to_end)])?;
            self.bus
                .read_buf(RX_BASE, &mut out[usize::from(to_end)..usize::from(nready)])?;
        } else {
            self.bus
                .read_buf(RX_BASE + offset, &mut out[..usize::from(nready)])?;
        }

        self.bus.write_u16(REG_RX_RD, rd_pointer.wrapping_add(nready))?;
        self.bus.write_u8(REG_CR, SocketCommand::Recv as u8)?;
        Ok(usize::from(nready))
    }

    fn write(&mut self, handle: SocketHandle, buf: &[u8]) -> Result<usize, TcpError> {
        self.require_socket0(handle)?;
        let free = self.bus.read_u16(REG_TX_FSR)?;
        let free = buf.len().min(usize::from(free)) as u16;
        if free == 0 {
            return Ok(0);
        }

        let wr_pointer = self.bus.read_u16(REG_TX_WR)?;
        let offset = wr_pointer & (BUF_SIZE - 1);
        if offset + free > BUF_SIZE {
            let to_end = BUF_SIZE - offset;
            self.bus.write_buf(TX_BASE + offset, &buf[..usize::from(to_end)])?;
            self.bus
                .write_buf(TX_BASE, &buf[usize::from(to_end)..usize::from(free)])?;
        } else {
            self.bus
                .write_buf(TX_BASE + offset, &buf[..usize::from(free)])?;
        }

        self.bus.write_u16(REG_TX_WR, wr_pointer.wrapping_add(free))?;
        self.bus.write_u8(REG_CR, SocketCommand::Send as u8)?;
        Ok(usize::from(free))
    }

    fn close(&mut self, handle: SocketHandle) -> Result<(), TcpError> {
        self.require_socket0(handle)?;
        self.bus.write_u8(REG_CR, SocketCommand::Close as u8)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakeBus {
        mem: [u8; 0x10000],
    }

    impl FakeBus {
        fn new() -> Self {
            Self { mem: [0; 0x10000] }
        }

        fn set_status(&mut self, raw: u8) {
            self.mem[usize::from(REG_SR)] = raw;
        }
    }

    impl RegisterBus for FakeBus {
        fn read_u8(&mut self, addr: u16) -> Result<u8, BusError> {
            Ok(self.mem[usize::from(addr)])
        }

        fn write_u8(&mut self, addr: u16, value: u8) -> Result<(), BusError> {
            self.mem[usize::from(addr)] = value;
            if addr == REG_CR && value == SocketCommand::Open as u8 {
                self.set_status(RAW_INIT);
            } else if addr == REG_CR && value == SocketCommand::Listen as u8 {
                self.set_status(RAW_LISTEN);
            } else if addr == REG_CR && value == SocketCommand::Close as u8 {
                self.set_status(RAW_CLOSED);
            }
            Ok(())
        }

        fn read_u16(&mut self, addr: u16) -> Result<u16, BusError> {
            let hi = self.mem[usize::from(addr)] as u16;
            let lo = self.mem[usize::from(addr) + 1] as u16;
            Ok((hi << 8) | lo)
        }

        fn write_u16(&mut self, addr: u16, value: u16) -> Result<(), BusError> {
            self.mem[usize::from(addr)] = (value >> 8) as u8;
            self.mem[usize::from(addr) + 1] = value as u8;
            Ok(())
        }

        fn read_buf(&mut self, addr: u16, out: &mut [u8]) -> Result<(), BusError> {
            let start = usize::from(addr);
            out.copy_from_slice(&self.mem[start..start + out.len()]);
            Ok(())
        }

        fn write_buf(&mut self, addr: u16, buf: &[u8]) -> Result<(), BusError> {
            let start = usize::from(addr);
            self.mem[start..start + buf.len()].copy_from_slice(buf);
            Ok(())
        }
    }

    #[test]
    fn open_transitions_to_init_status() {
        let mut stack = W5100Stack::new(FakeBus::new());
        let handle = stack.open(5025).unwrap();
        assert_eq!(stack.status(handle).unwrap(), SocketStatus::Init);
    }

    #[test]
    fn listen_transitions_to_listen_status() {
        let mut stack = W5100Stack::new(FakeBus::new());
        let handle = stack.open(5025).unwrap();
        stack.listen(handle).unwrap();
        assert_eq!(stack.status(handle).unwrap(), SocketStatus::Listen);
    }

    #[test]
    fn write_then_read_round_trips_through_ring_buffers() {
        let mut stack = W5100Stack::new(FakeBus::new());
        let handle = stack.open(5025).unwrap();
        stack.bus.set_status(RAW_ESTABLISHED);
        stack.bus.write_u16(REG_TX_FSR, BUF_SIZE).unwrap();

        // Fake bus has no notion of a peer consuming the TX ring or
        // producing into the RX ring, so exercise them independently:
        // write into TX free space, then simulate received bytes by
        // writing directly into the RX ring and bumping RSR.
        let n = stack.write(handle, b"hello").unwrap();
        assert_eq!(n, 5);
        assert_eq!(&stack.bus.mem[usize::from(TX_BASE)..usize::from(TX_BASE) + 5], b"hello");

        stack.bus.write_buf(RX_BASE, b"world").unwrap();
        stack.bus.write_u16(REG_RX_RSR, 5).unwrap();
        let mut out = [0u8; 5];
        let n = stack.read(handle, &mut out).unwrap();
        assert_eq!(n, 5);
        assert_eq!(&out, b"world");
    }

    #[test]
    fn unrecognized_socket_handle_is_rejected() {
        let mut stack = W5100Stack::new(FakeBus::new());
        let err = stack.status(SocketHandle(1)).unwrap_err();
        assert_eq!(err, TcpError::BadSocketState(SocketStatus::Closed));
    }
}
