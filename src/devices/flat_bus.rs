//! `FlatBus`: a minimal reference [`Bus`] implementation.
//!
//! This is the ambient scaffolding the CPU executor is tested against. It
//! models the CPU-visible memory map closely enough to drive real
//! instruction streams (RAM mirroring, a flat PRG-like region for program
//! and vectors) without pulling in the out-of-scope PPU/cartridge/mapper
//! machinery. A host with a real PPU and cartridge provides its own `Bus`
//! impl instead of using this one.

use crate::devices::bus::{Bus, BusDevice, BusPeekResult, Range};
use crate::error::BusError;

/// Plain RAM, mounted behind a [`Range`] mapping. Reads past the end of the
/// backing buffer report as unmapped rather than panicking.
#[derive(Debug, PartialEq)]
pub struct Ram {
    buf: Vec<u8>,
}

impl BusDevice for Ram {
    fn read(&mut self, addr: u16, last_bus_value: u8) -> u8 {
        self.peek(addr).unwrap(last_bus_value)
    }

    fn peek(&self, addr: u16) -> BusPeekResult {
        match self.buf.get(addr as usize) {
            Some(byte) => BusPeekResult::Result(*byte),
            None => BusPeekResult::Unmapped,
        }
    }

    fn write(&mut self, addr: u16, value: u8) {
        if let Some(slot) = self.buf.get_mut(addr as usize) {
            *slot = value;
        }
    }
}

impl Ram {
    pub fn new(size: usize) -> Ram {
        Ram {
            buf: vec![0u8; size],
        }
    }
}

/// $0000-$1FFF: 2KiB of work RAM, mirrored every 2KiB.
const RAM_RANGE: Range = Range::new(0x0000, 0x1FFF, 0x07FF);
/// $4020-$FFFF: flat backing for program data and interrupt vectors.
const PRG_RANGE: Range = Range::new_unmasked(0x4020, 0xFFFF);

/// A minimal flat-memory `Bus`: work RAM with standard mirroring, plus a
/// flat backing region for program bytes and the reset/NMI/IRQ vectors.
/// Anything else (PPU registers, APU/IO) reads as open bus — the last value
/// driven onto the bus — since those devices are out of this core's scope.
#[derive(Debug, PartialEq)]
pub struct FlatBus {
    ram: Ram,
    prg: Vec<u8>,
    last_bus_value: u8,
}

impl FlatBus {
    /// A `FlatBus` with the standard 2KiB of work RAM.
    pub fn new() -> FlatBus {
        FlatBus {
            ram: Ram::new(2048),
            prg: vec![0u8; (PRG_RANGE_LEN) as usize],
            last_bus_value: 0,
        }
    }

    /// A `FlatBus` whose work RAM is a non-standard size.
    ///
    /// `size` must be a power of two no greater than 2048 (the real NES
    /// wires only 11 address lines to work RAM); anything else can't be
    /// expressed as a mirroring mask and is rejected rather than silently
    /// truncated or panicking later on a read.
    pub fn try_with_ram_size(size: usize) -> Result<FlatBus, BusError> {
        if size == 0 || size > 2048 || !size.is_power_of_two() {
            return Err(BusError::InvalidRamSize(size));
        }
        Ok(FlatBus {
            ram: Ram::new(size),
            prg: vec![0u8; (PRG_RANGE_LEN) as usize],
            last_bus_value: 0,
        })
    }

    /// A `FlatBus` with `program` copied into the flat PRG region starting
    /// at `$4020 + offset`. Convenience for tests and minimal hosts; not a
    /// substitute for real iNES loading, which this core doesn't attempt.
    pub fn with_program(offset: u16, program: &[u8]) -> FlatBus {
        let mut bus = FlatBus::new();
        let start = offset as usize;
        bus.prg[start..start + program.len()].copy_from_slice(program);
        bus
    }

    /// Write a little-endian 16-bit vector (reset/NMI/IRQ) directly.
    pub fn set_vector(&mut self, addr: u16, value: u16) {
        let bytes = value.to_le_bytes();
        self.write8(addr, bytes[0]);
        self.write8(addr.wrapping_add(1), bytes[1]);
    }
}

const PRG_RANGE_LEN: u16 = 0xFFFF - 0x4020 + 1;

impl Default for FlatBus {
    fn default() -> Self {
        FlatBus::new()
    }
}

impl Bus for FlatBus {
    fn read8(&mut self, addr: u16) -> u8 {
        let value = if let Some(local) = RAM_RANGE.map(addr) {
            self.ram.read(local, self.last_bus_value)
        } else if let Some(local) = PRG_RANGE.map(addr) {
            self.prg[local as usize]
        } else {
            self.last_bus_value
        };
        self.last_bus_value = value;
        value
    }

    fn write8(&mut self, addr: u16, value: u8) {
        if let Some(local) = RAM_RANGE.map(addr) {
            self.ram.write(local, value);
        } else if let Some(local) = PRG_RANGE.map(addr) {
            self.prg[local as usize] = value;
        }
        self.last_bus_value = value;
    }

    fn peek8(&self, addr: u16) -> Option<u8> {
        if let Some(local) = RAM_RANGE.map(addr) {
            self.ram.peek(local).to_optional()
        } else if let Some(local) = PRG_RANGE.map(addr) {
            Some(self.prg[local as usize])
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mirrors_ram_every_2kib() {
        let mut bus = FlatBus::new();
        bus.write8(0x0010, 0x42);
        assert_eq!(bus.read8(0x0810), 0x42);
        assert_eq!(bus.read8(0x1810), 0x42);
    }

    #[test]
    fn prg_region_is_flat() {
        let mut bus = FlatBus::with_program(0, &[0xA9, 0x00]);
        assert_eq!(bus.read8(0x4020), 0xA9);
        assert_eq!(bus.read8(0x4021), 0x00);
    }

    #[test]
    fn set_vector_round_trips_through_read16() {
        let mut bus = FlatBus::new();
        bus.set_vector(0xFFFC, 0x8000);
        assert_eq!(bus.read16(0xFFFC), 0x8000);
    }

    #[test]
    fn rejects_non_power_of_two_ram_size() {
        assert_eq!(
            FlatBus::try_with_ram_size(100),
            Err(BusError::InvalidRamSize(100))
        );
    }

    #[test]
    fn jmp_indirect_page_bug_wraps_within_page() {
        let mut bus = FlatBus::new();
        bus.write8(0x50FF, 0x80);
        bus.write8(0x5000, 0x40);
        bus.write8(0x5100, 0x99); // must NOT be read
        assert_eq!(bus.read16_bug(0x50FF), 0x4080);
    }
}
