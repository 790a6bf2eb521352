//! The only fallible surface in this crate.
//!
//! The CPU executor itself is total: `step` never fails. The one place a
//! `Result` is worth having is at construction time for the ambient
//! reference bus, where a caller can hand in a nonsensical configuration.

use std::fmt;

#[derive(Debug, Eq, PartialEq)]
pub enum BusError {
    /// The requested RAM size for `FlatBus` isn't a power of two, or
    /// exceeds the real NES's 2KiB of work RAM.
    InvalidRamSize(usize),
}

impl fmt::Display for BusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BusError::InvalidRamSize(size) => write!(
                f,
                "invalid RAM size {size}: must be a power of two no greater than 2048"
            ),
        }
    }
}

impl std::error::Error for BusError {}
