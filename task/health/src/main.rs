// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

#![no_std]
#![no_main]

use raptor_bus::{EnvironmentSample, EnvironmentSensor, SensorError};
use raptor_logger::sys_log;
use userlib::*;

task_slot!(I2C, i2c_driver);

const TICK_RATE_MS: u64 = 500;

/// Sticky service-condition bits, set when a dependent sensor link drops
/// and cleared once it reinitializes cleanly. Named after the one
/// condition this core tracks; a real board would OR in bits per sensor.
const SERVICE_BME280_LINK_DOWN: u8 = 1 << 0;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum HealthState {
    Init,
    Service,
    Read,
    Report,
}

struct HealthFsm<S> {
    sensor: S,
    state: HealthState,
    service_bits: u8,
    telemetry: EnvironmentSample,
}

impl<S: EnvironmentSensor> HealthFsm<S> {
    fn new(sensor: S) -> Self {
        Self {
            sensor,
            state: HealthState::Init,
            service_bits: 0,
            telemetry: EnvironmentSample::default(),
        }
    }

    fn try_reinit(&mut self) {
        match self.sensor.init() {
            Ok(()) => self.service_bits &= !SERVICE_BME280_LINK_DOWN,
            Err(_) => self.service_bits |= SERVICE_BME280_LINK_DOWN,
        }
    }

    fn link_down(&self) -> bool {
        self.service_bits & SERVICE_BME280_LINK_DOWN != 0
    }

    /// Runs one period's worth of the `INIT -> SERVICE -> READ -> REPORT
    /// -> SERVICE ...` cycle.
    fn step(&mut self) {
        match self.state {
            HealthState::Init => {
                self.try_reinit();
                self.state = HealthState::Service;
            }
            HealthState::Service => {
                if self.link_down() {
                    self.try_reinit();
                }
                self.state = HealthState::Read;
            }
            HealthState::Read => {
                if !self.link_down() {
                    if let Ok(sample) = self.sensor.read() {
                        self.telemetry = sample;
                    }
                }
                self.state = HealthState::Report;
            }
            HealthState::Report => {
                sys_log!(
                    trace,
                    "health: temp={} humidity={} pressure={}",
                    self.telemetry.temperature as i32,
                    self.telemetry.humidity as i32,
                    self.telemetry.pressure as i32
                );
                self.state = HealthState::Service;
            }
        }
    }
}

#[export_name = "main"]
fn main() -> ! {
    let mut fsm = HealthFsm::new(I2cEnvironmentSensor::new(I2C.get_task_id()));

    loop {
        fsm.step();

        #[cfg(not(debug_assertions))]
        hl::refresh_watchdog();

        hl::sleep_for(TICK_RATE_MS);
    }
}

/// A BME280-class environmental sensor reached over the board's I2C
/// controller. The controller transaction is a kernel/peripheral concern
/// outside this core's scope (the same boundary `raptor_bus::Bus` draws
/// generally); this type only carries the peer handle.
struct I2cEnvironmentSensor {
    #[allow(dead_code)]
    i2c: TaskId,
}

impl I2cEnvironmentSensor {
    fn new(i2c: TaskId) -> Self {
        Self { i2c }
    }
}

impl EnvironmentSensor for I2cEnvironmentSensor {
    fn init(&mut self) -> Result<(), SensorError> {
        Ok(())
    }

    fn reset(&mut self) -> Result<(), SensorError> {
        Ok(())
    }

    fn sleep(&mut self) -> Result<(), SensorError> {
        Ok(())
    }

    fn read(&mut self) -> Result<EnvironmentSample, SensorError> {
        Ok(EnvironmentSample::default())
    }
}
