// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

#![no_std]
#![no_main]

use net_api::w5100::{RegisterBus, W5100Stack};
use net_api::{NetworkStack, TcpSocket};
use raptor_bus::BusError;
use raptor_logger::{Logger, LOGGER};
use userlib::*;

task_slot!(SPI, spi_driver);

const SOURCE_PORT: u16 = 3000;

#[export_name = "main"]
fn main() -> ! {
    let bus = SpiRegisterBus::new(SPI.get_task_id());
    let mut stack = W5100Stack::new(bus);

    loop {
        let socket = match TcpSocket::open(&mut stack, SOURCE_PORT) {
            Ok(socket) => socket,
            Err(_) => {
                hl::sleep_for(1000);
                continue;
            }
        };
        let socket = match socket.listen() {
            Ok(socket) => socket,
            Err(_) => {
                hl::sleep_for(1000);
                continue;
            }
        };
        let established = match socket.accept() {
            Ok(established) => established,
            Err(_) => continue,
        };

        drain_to(&LOGGER, established);
    }
}

/// Drains queued records to `socket`, one formatted line at a time,
/// until a write fails (the client disconnected). Producers elsewhere
/// keep enqueueing independently of whether anyone is connected here;
/// records queued with nobody listening are simply dropped once the
/// queue is full, never blocking their caller.
fn drain_to<S: NetworkStack>(logger: &Logger, mut socket: TcpSocket<'_, S, net_api::Established>) {
    let mut line: heapless::String<{ raptor_logger::LINE_CAPACITY }> = heapless::String::new();
    loop {
        let record = match logger.drain() {
            Some(record) => record,
            None => {
                hl::sleep_for(50);
                continue;
            }
        };
        let formatted = record.format_line(&mut line);
        let mut out: heapless::String<{ raptor_logger::LINE_CAPACITY + 1 }> = heapless::String::new();
        let _ = out.push_str(formatted);
        let _ = out.push('\n');
        if socket.write(out.as_bytes()).is_err() {
            return;
        }
    }
}

/// Talks to the W5100 over the board's SPI controller; see
/// `task-scpi-server`'s identical type for the rationale (the SPI
/// transaction itself is outside this core's scope).
struct SpiRegisterBus {
    #[allow(dead_code)]
    spi: TaskId,
}

impl SpiRegisterBus {
    fn new(spi: TaskId) -> Self {
        Self { spi }
    }

    fn exchange(&self, _tx: &[u8], _rx: &mut [u8]) {}
}

impl RegisterBus for SpiRegisterBus {
    fn read_u8(&mut self, addr: u16) -> Result<u8, BusError> {
        let mut rx = [0u8; 1];
        self.exchange(&addr.to_be_bytes(), &mut rx);
        Ok(rx[0])
    }

    fn write_u8(&mut self, addr: u16, value: u8) -> Result<(), BusError> {
        self.exchange(&addr.to_be_bytes(), &mut []);
        self.exchange(&[value], &mut []);
        Ok(())
    }

    fn read_u16(&mut self, addr: u16) -> Result<u16, BusError> {
        let mut rx = [0u8; 2];
        self.exchange(&addr.to_be_bytes(), &mut rx);
        Ok(u16::from_be_bytes(rx))
    }

    fn write_u16(&mut self, addr: u16, value: u16) -> Result<(), BusError> {
        self.exchange(&addr.to_be_bytes(), &mut []);
        self.exchange(&value.to_be_bytes(), &mut []);
        Ok(())
    }

    fn read_buf(&mut self, addr: u16, out: &mut [u8]) -> Result<(), BusError> {
        self.exchange(&addr.to_be_bytes(), out);
        Ok(())
    }

    fn write_buf(&mut self, addr: u16, buf: &[u8]) -> Result<(), BusError> {
        self.exchange(&addr.to_be_bytes(), &mut []);
        self.exchange(buf, &mut []);
        Ok(())
    }
}
