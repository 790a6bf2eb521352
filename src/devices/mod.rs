//! Bus contract, reference bus implementation, and the CPU that sits on top
//! of both.

pub mod bus;
pub mod cpu;
pub mod flat_bus;
