//! A cycle-accurate 6502-family CPU core for an NES emulator: the register
//! file, the 256-entry opcode table, the 13 addressing modes, and the
//! `Bus` contract the CPU executes against.

#[macro_use]
extern crate bitflags;

pub mod devices;
pub mod error;

pub use devices::cpu::Cpu;
pub use error::BusError;
