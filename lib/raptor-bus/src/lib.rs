// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Interface abstractions for peripherals the core depends on but does not
//! own: the register-level bus a sensor driver talks over, and the two
//! concrete sensor contracts (environmental, load cell) the health
//! supervisor drives.
//!
//! The peripherals themselves (I²C/SPI controller, BME280 humidity/
//! temperature/pressure sensor, HX711 load-cell ADC) are chip-specific
//! collaborators out of scope for this core. What *is* in scope is the
//! shape of the contract a driver needs: a handle-free bus trait in place
//! of a pointer-carrying device struct, and `Copy` telemetry types the
//! health task can move around without owning any driver state itself.

#![cfg_attr(not(test), no_std)]

/// Failure modes common to a register-addressed peripheral bus.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BusError {
    /// The peripheral did not acknowledge, or a transfer timed out.
    NotResponding,
    /// The bus reported a transfer error (NACK, framing, overrun).
    Transfer,
}

/// A register-addressed bus a driver can read and write without owning a
/// handle to the underlying controller. Replaces a pointer-carrying device
/// struct with a borrowed-or-owned implementation the caller supplies.
pub trait Bus {
    /// Reads `buf.len()` bytes starting at device register `reg` into `buf`.
    fn read_mem(&mut self, reg: u8, buf: &mut [u8]) -> Result<(), BusError>;

    /// Writes `buf` starting at device register `reg`.
    fn write_mem(&mut self, reg: u8, buf: &[u8]) -> Result<(), BusError>;

    /// Polls whether the peripheral is ready for the next transaction
    /// (e.g. a BME280 conversion has completed, or an HX711 has new data).
    fn is_ready(&mut self) -> bool;
}

/// One environmental reading, converted to physical units.
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct EnvironmentSample {
    /// Degrees Celsius.
    pub temperature: f32,
    /// Relative humidity, percent.
    pub humidity: f32,
    /// Pascals.
    pub pressure: f32,
}

/// Failure modes an environmental sensor driver can report.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SensorError {
    Bus(BusError),
    /// Chip id / reset verification failed.
    Verification,
    Timeout,
}

impl From<BusError> for SensorError {
    fn from(e: BusError) -> Self {
        SensorError::Bus(e)
    }
}

/// The contract the health supervisor drives: init, reset, low-power sleep,
/// and a bulk read into a [`EnvironmentSample`].
pub trait EnvironmentSensor {
    fn init(&mut self) -> Result<(), SensorError>;
    fn reset(&mut self) -> Result<(), SensorError>;
    fn sleep(&mut self) -> Result<(), SensorError>;
    fn read(&mut self) -> Result<EnvironmentSample, SensorError>;
}

/// The contract a load-cell ADC driver exposes: init/reset/sleep plus a
/// single scaled-and-offset-corrected reading.
pub trait LoadCell {
    fn init(&mut self) -> Result<(), SensorError>;
    fn reset(&mut self) -> Result<(), SensorError>;
    fn sleep(&mut self) -> Result<(), SensorError>;
    /// Reads one conversion and applies the configured zero offset and gain.
    fn read(&mut self) -> Result<f32, SensorError>;
}
