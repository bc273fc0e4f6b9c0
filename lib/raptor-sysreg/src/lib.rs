// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The system register file: a fixed, statically-described set of typed,
//! access-controlled device configuration and status fields, process-wide
//! and constructed once at boot.
//!
//! Every field is declared in [`CONFIG`] with a stable [`Offset`] identity,
//! a semantic type, a reset/min/max triple, and an initial access bitfield.
//! `init` checks `min <= reset <= max` for every field up front (a table
//! with an inconsistent field is a build defect, not a runtime condition)
//! and the clamp-on-write invariant is then enforced on every subsequent
//! `set_*` for the life of the process.

#![cfg_attr(not(test), no_std)]

use bitflags::bitflags;
use raptor_fault::raptor_assert;
use userlib::Guarded;

bitflags! {
    /// Per-field access bitfield. `LOCKED`, once set, can never be cleared
    /// through [`RegisterFile::set_access`].
    pub struct Access: u8 {
        const READABLE = 1 << 0;
        const WRITABLE = 1 << 1;
        const LOCKED   = 1 << 7;
    }
}

/// The bit of the status byte ([`Offset::Stb`]) this core assigns meaning
/// to: set while the SCPI error queue is non-empty. All other bits are
/// reserved for the protocol layer above this core.
pub const STB_ERROR_QUEUE_BIT: u8 = 1 << 2;

/// Stable identity of a register field. Discriminants are an internal
/// indexing detail, not a wire format; they are never renumbered once
/// assigned, so a future added field appends rather than reorders.
#[repr(u16)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Offset {
    SysStat = 0,
    Stb = 1,
    Uuid = 2,
    HwVersion = 3,
    FwVersion = 4,
    Setpoint = 5,
    GpU8 = 6,
    GpU8Unlocked = 7,
    GpU16 = 8,
    GpU16Unlocked = 9,
    GpU32 = 10,
    GpU32Unlocked = 11,
    GpF32 = 12,
    GpF32Unlocked = 13,
}

const NUM_REGISTERS: usize = 14;
const ALL_OFFSETS: [Offset; NUM_REGISTERS] = [
    Offset::SysStat,
    Offset::Stb,
    Offset::Uuid,
    Offset::HwVersion,
    Offset::FwVersion,
    Offset::Setpoint,
    Offset::GpU8,
    Offset::GpU8Unlocked,
    Offset::GpU16,
    Offset::GpU16Unlocked,
    Offset::GpU32,
    Offset::GpU32Unlocked,
    Offset::GpF32,
    Offset::GpF32Unlocked,
];

fn index_of(offset: Offset) -> usize {
    offset as u16 as usize
}

/// A register's runtime value, tagged by its declared type.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Value {
    U8(u8),
    U16(u16),
    U32(u32),
    F32(f32),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Dtype {
    U8,
    U16,
    U32,
    F32,
}

impl Value {
    fn dtype(self) -> Dtype {
        match self {
            Value::U8(_) => Dtype::U8,
            Value::U16(_) => Dtype::U16,
            Value::U32(_) => Dtype::U32,
            Value::F32(_) => Dtype::F32,
        }
    }

    fn clamp(self, min: Value, max: Value) -> Value {
        match (self, min, max) {
            (Value::U8(v), Value::U8(lo), Value::U8(hi)) => Value::U8(v.clamp(lo, hi)),
            (Value::U16(v), Value::U16(lo), Value::U16(hi)) => Value::U16(v.clamp(lo, hi)),
            (Value::U32(v), Value::U32(lo), Value::U32(hi)) => Value::U32(v.clamp(lo, hi)),
            (Value::F32(v), Value::F32(lo), Value::F32(hi)) => {
                Value::F32(v.max(lo).min(hi))
            }
            _ => self,
        }
    }
}

/// A field's static declaration: identity, type, access at boot, and the
/// reset/min/max triple checked at [`RegisterFile::init`].
#[derive(Clone, Copy, Debug)]
struct RegisterConfig {
    offset: Offset,
    initial_access: Access,
    reset: Value,
    min: Value,
    max: Value,
}

static CONFIG: [RegisterConfig; NUM_REGISTERS] = [
    RegisterConfig {
        offset: Offset::SysStat,
        initial_access: Access { bits: Access::READABLE.bits | Access::WRITABLE.bits },
        reset: Value::U8(0),
        min: Value::U8(0),
        max: Value::U8(100),
    },
    RegisterConfig {
        offset: Offset::Stb,
        initial_access: Access { bits: Access::READABLE.bits | Access::WRITABLE.bits },
        reset: Value::U8(0),
        min: Value::U8(0),
        max: Value::U8(0xff),
    },
    RegisterConfig {
        offset: Offset::Uuid,
        initial_access: Access { bits: Access::WRITABLE.bits },
        reset: Value::U32(0xdecafbad),
        min: Value::U32(0),
        max: Value::U32(u32::MAX),
    },
    RegisterConfig {
        offset: Offset::HwVersion,
        initial_access: Access { bits: Access::READABLE.bits | Access::WRITABLE.bits },
        reset: Value::U32(0x0001_0000),
        min: Value::U32(0),
        max: Value::U32(u32::MAX),
    },
    RegisterConfig {
        offset: Offset::FwVersion,
        initial_access: Access { bits: Access::READABLE.bits | Access::WRITABLE.bits },
        reset: Value::U32(0x0001_0000),
        min: Value::U32(0),
        max: Value::U32(u32::MAX),
    },
    RegisterConfig {
        offset: Offset::Setpoint,
        initial_access: Access { bits: Access::LOCKED.bits | Access::READABLE.bits | Access::WRITABLE.bits },
        reset: Value::F32(0.0),
        min: Value::F32(-4.0),
        max: Value::F32(500.0),
    },
    RegisterConfig {
        offset: Offset::GpU8,
        initial_access: Access { bits: Access::LOCKED.bits | Access::READABLE.bits | Access::WRITABLE.bits },
        reset: Value::U8(0),
        min: Value::U8(0),
        max: Value::U8(u8::MAX),
    },
    RegisterConfig {
        offset: Offset::GpU8Unlocked,
        initial_access: Access { bits: Access::READABLE.bits | Access::WRITABLE.bits },
        reset: Value::U8(0),
        min: Value::U8(0),
        max: Value::U8(u8::MAX),
    },
    RegisterConfig {
        offset: Offset::GpU16,
        initial_access: Access { bits: Access::LOCKED.bits | Access::READABLE.bits | Access::WRITABLE.bits },
        reset: Value::U16(0),
        min: Value::U16(0),
        max: Value::U16(u16::MAX),
    },
    RegisterConfig {
        offset: Offset::GpU16Unlocked,
        initial_access: Access { bits: Access::READABLE.bits | Access::WRITABLE.bits },
        reset: Value::U16(0),
        min: Value::U16(0),
        max: Value::U16(u16::MAX),
    },
    RegisterConfig {
        offset: Offset::GpU32,
        initial_access: Access { bits: Access::LOCKED.bits | Access::READABLE.bits | Access::WRITABLE.bits },
        reset: Value::U32(0),
        min: Value::U32(0),
        max: Value::U32(u32::MAX),
    },
    RegisterConfig {
        offset: Offset::GpU32Unlocked,
        initial_access: Access { bits: Access::READABLE.bits | Access::WRITABLE.bits },
        reset: Value::U32(0),
        min: Value::U32(0),
        max: Value::U32(u32::MAX),
    },
    RegisterConfig {
        offset: Offset::GpF32,
        initial_access: Access { bits: Access::LOCKED.bits | Access::READABLE.bits | Access::WRITABLE.bits },
        reset: Value::F32(0.0),
        min: Value::F32(f32::MIN),
        max: Value::F32(f32::MAX),
    },
    RegisterConfig {
        offset: Offset::GpF32Unlocked,
        initial_access: Access { bits: Access::READABLE.bits | Access::WRITABLE.bits },
        reset: Value::F32(0.0),
        min: Value::F32(f32::MIN),
        max: Value::F32(f32::MAX),
    },
];

/// A register file operation failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Error {
    NotFound,
    TypeMismatch,
    AccessDenied,
    /// `set_access` attempted to clear a set lock bit, or to set it.
    OpError,
}

struct State {
    values: [Value; NUM_REGISTERS],
    access: [Access; NUM_REGISTERS],
}

/// The process-wide register file singleton.
pub struct RegisterFile {
    state: Guarded<State>,
}

impl RegisterFile {
    pub const fn new() -> Self {
        Self {
            state: Guarded::new(State {
                values: [Value::U8(0); NUM_REGISTERS],
                access: [Access { bits: 0 }; NUM_REGISTERS],
            }),
        }
    }

    /// Validates every field's `min <= reset <= max` and resets the file.
    /// A violation here means the static table itself is wrong, not a
    /// recoverable runtime condition.
    pub fn init(&self) {
        for config in CONFIG.iter() {
            match (config.reset, config.min, config.max) {
                (Value::U8(r), Value::U8(lo), Value::U8(hi)) => {
                    raptor_assert!(lo <= r && r <= hi)
                }
                (Value::U16(r), Value::U16(lo), Value::U16(hi)) => {
                    raptor_assert!(lo <= r && r <= hi)
                }
                (Value::U32(r), Value::U32(lo), Value::U32(hi)) => {
                    raptor_assert!(lo <= r && r <= hi)
                }
                (Value::F32(r), Value::F32(lo), Value::F32(hi)) => {
                    raptor_assert!(lo <= r && r <= hi)
                }
                _ => raptor_assert!(false),
            }
        }
        self.reset();
    }

    /// Restores every field to its declared reset value and access bits.
    pub fn reset(&self) {
        self.state.lock(|state| {
            for config in CONFIG.iter() {
                let i = index_of(config.offset);
                state.values[i] = config.reset;
                state.access[i] = config.initial_access;
            }
        });
    }

    fn config_for(offset: Offset) -> &'static RegisterConfig {
        &CONFIG[index_of(offset)]
    }

    /// Replaces a field's access bits. Rejected if the field is currently
    /// locked, or if `access` attempts to set the lock bit (locking can
    /// only happen through the static table at boot).
    pub fn set_access(&self, offset: Offset, access: Access) -> Result<(), Error> {
        let i = index_of(offset);
        self.state.lock(|state| {
            if state.access[i].contains(Access::LOCKED) {
                return Err(Error::AccessDenied);
            }
            if access.contains(Access::LOCKED) {
                return Err(Error::OpError);
            }
            state.access[i] = access;
            Ok(())
        })
    }

    fn get(&self, offset: Offset, dtype: Dtype) -> Result<Value, Error> {
        let config = Self::config_for(offset);
        if config.reset.dtype() != dtype {
            return Err(Error::TypeMismatch);
        }
        let i = index_of(offset);
        self.state.lock(|state| {
            if !state.access[i].contains(Access::READABLE) {
                return Err(Error::AccessDenied);
            }
            Ok(state.values[i])
        })
    }

    fn set(&self, offset: Offset, value: Value) -> Result<(), Error> {
        let config = Self::config_for(offset);
        if config.reset.dtype() != value.dtype() {
            return Err(Error::TypeMismatch);
        }
        let i = index_of(offset);
        self.state.lock(|state| {
            if !state.access[i].contains(Access::WRITABLE) {
                return Err(Error::AccessDenied);
            }
            state.values[i] = value.clamp(config.min, config.max);
            Ok(())
        })
    }

    pub fn get_u8(&self, offset: Offset) -> Result<u8, Error> {
        match self.get(offset, Dtype::U8)? {
            Value::U8(v) => Ok(v),
            _ => unreachable!(),
        }
    }

    pub fn set_u8(&self, offset: Offset, value: u8) -> Result<(), Error> {
        self.set(offset, Value::U8(value))
    }

    pub fn get_u16(&self, offset: Offset) -> Result<u16, Error> {
        match self.get(offset, Dtype::U16)? {
            Value::U16(v) => Ok(v),
            _ => unreachable!(),
        }
    }

    pub fn set_u16(&self, offset: Offset, value: u16) -> Result<(), Error> {
        self.set(offset, Value::U16(value))
    }

    pub fn get_u32(&self, offset: Offset) -> Result<u32, Error> {
        match self.get(offset, Dtype::U32)? {
            Value::U32(v) => Ok(v),
            _ => unreachable!(),
        }
    }

    pub fn set_u32(&self, offset: Offset, value: u32) -> Result<(), Error> {
        self.set(offset, Value::U32(value))
    }

    pub fn get_f32(&self, offset: Offset) -> Result<f32, Error> {
        match self.get(offset, Dtype::F32)? {
            Value::F32(v) => Ok(v),
            _ => unreachable!(),
        }
    }

    pub fn set_f32(&self, offset: Offset, value: f32) -> Result<(), Error> {
        self.set(offset, Value::F32(value))
    }
}

impl Default for RegisterFile {
    fn default() -> Self {
        Self::new()
    }
}

/// The process-wide register file. Tasks reach the same instance; there is
/// exactly one per image.
pub static REGISTERS: RegisterFile = RegisterFile::new();

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn init_then_reset_restores_defaults() {
        REGISTERS.init();
        assert_eq!(REGISTERS.get_f32(Offset::Setpoint).unwrap(), 0.0);
        REGISTERS.set_u8(Offset::GpU8Unlocked, 200).unwrap();
        REGISTERS.reset();
        assert_eq!(REGISTERS.get_u8(Offset::GpU8Unlocked).unwrap(), 0);
    }

    #[test]
    fn write_clamps_to_bounds() {
        REGISTERS.init();
        REGISTERS.set_f32(Offset::Setpoint, 10_000.0).unwrap();
        assert_eq!(REGISTERS.get_f32(Offset::Setpoint).unwrap(), 500.0);
        REGISTERS.set_f32(Offset::Setpoint, -10_000.0).unwrap();
        assert_eq!(REGISTERS.get_f32(Offset::Setpoint).unwrap(), -4.0);
    }

    #[test]
    fn type_mismatch_is_rejected() {
        REGISTERS.init();
        assert_eq!(REGISTERS.get_u8(Offset::Setpoint), Err(Error::TypeMismatch));
    }

    #[test]
    fn write_only_field_rejects_read() {
        REGISTERS.init();
        assert_eq!(REGISTERS.get_u32(Offset::Uuid), Err(Error::AccessDenied));
        REGISTERS.set_u32(Offset::Uuid, 42).unwrap();
    }

    #[test]
    fn locked_field_rejects_access_change() {
        REGISTERS.init();
        let result = REGISTERS.set_access(
            Offset::Setpoint,
            Access::READABLE | Access::WRITABLE,
        );
        assert_eq!(result, Err(Error::AccessDenied));
    }

    #[test]
    fn cannot_set_lock_bit_through_set_access() {
        REGISTERS.init();
        let result = REGISTERS.set_access(Offset::GpU8Unlocked, Access::LOCKED);
        assert_eq!(result, Err(Error::OpError));
    }

    #[test]
    fn unlocked_field_access_can_be_narrowed() {
        REGISTERS.init();
        REGISTERS
            .set_access(Offset::GpU8Unlocked, Access::READABLE)
            .unwrap();
        assert_eq!(
            REGISTERS.set_u8(Offset::GpU8Unlocked, 1),
            Err(Error::AccessDenied)
        );
        REGISTERS.reset();
    }

    proptest::proptest! {
        #[test]
        fn u8_writes_are_always_clamped(raw in any::<u8>()) {
            REGISTERS.init();
            REGISTERS.set_u8(Offset::SysStat, raw).unwrap();
            let stored = REGISTERS.get_u8(Offset::SysStat).unwrap();
            prop_assert!(stored <= 100);
        }

        #[test]
        fn f32_writes_stay_within_declared_bounds(raw in -10000.0f32..10000.0f32) {
            REGISTERS.init();
            REGISTERS.set_f32(Offset::Setpoint, raw).unwrap();
            let stored = REGISTERS.get_f32(Offset::Setpoint).unwrap();
            prop_assert!(stored >= -4.0 && stored <= 500.0);
        }
    }
}
