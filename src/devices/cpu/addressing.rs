//! Effective-address resolution for the 13 addressing modes.
//!
//! Operand-byte assembly and indexing is pulled out into its own step, apart
//! from the opcode handlers, so the page-cross signal can be threaded back
//! to the cycle-accounting code in `cpu.rs`.

use super::structs::AddressingMode;
use crate::devices::bus::Bus;

/// What an addressing mode resolved to: either a value ready to use
/// (`Immediate`, and `Accumulator`/`Implied` which carry no operand at all)
/// or a 16-bit location a handler must read/write itself.
#[derive(Debug, Clone, Copy)]
pub enum Operand {
    /// No operand; the opcode's meaning is self-contained.
    Implied,
    /// Operate on the accumulator register directly.
    Accumulator,
    /// The operand byte itself, already resolved.
    Immediate(u8),
    /// A memory location a handler reads and/or writes through the bus.
    Memory(u16),
}

/// The result of resolving one instruction's operand.
pub struct Resolved {
    pub operand: Operand,
    /// Set when an indexed addressing mode's effective address landed on a
    /// different page than its un-indexed base. Branch and page-cross
    /// bonuses are computed from this by the caller, not here.
    pub page_crossed: bool,
}

fn same_page(a: u16, b: u16) -> bool {
    (a & 0xFF00) == (b & 0xFF00)
}

/// Resolve the operand for one instruction.
///
/// `operand_addr` is the address of the first operand byte (i.e. `PC + 1`);
/// callers read `b1`/`b2` from there as needed. `Relative`'s target is
/// computed here too, even though branch handlers decide separately whether
/// to actually take the branch.
pub fn resolve<B: Bus + ?Sized>(
    bus: &mut B,
    mode: AddressingMode,
    operand_addr: u16,
    x: u8,
    y: u8,
) -> Resolved {
    use AddressingMode::*;

    match mode {
        Implied => Resolved {
            operand: Operand::Implied,
            page_crossed: false,
        },
        Accumulator => Resolved {
            operand: Operand::Accumulator,
            page_crossed: false,
        },
        Immediate => {
            let b1 = bus.read8(operand_addr);
            Resolved {
                operand: Operand::Immediate(b1),
                page_crossed: false,
            }
        }
        ZeroPage => {
            let b1 = bus.read8(operand_addr);
            Resolved {
                operand: Operand::Memory(u16::from(b1)),
                page_crossed: false,
            }
        }
        ZeroPageX => {
            let b1 = bus.read8(operand_addr);
            let addr = u16::from(b1.wrapping_add(x));
            Resolved {
                operand: Operand::Memory(addr),
                page_crossed: false,
            }
        }
        ZeroPageY => {
            let b1 = bus.read8(operand_addr);
            let addr = u16::from(b1.wrapping_add(y));
            Resolved {
                operand: Operand::Memory(addr),
                page_crossed: false,
            }
        }
        Absolute => {
            let addr = bus.read16(operand_addr);
            Resolved {
                operand: Operand::Memory(addr),
                page_crossed: false,
            }
        }
        AbsoluteX => {
            let base = bus.read16(operand_addr);
            let addr = base.wrapping_add(u16::from(x));
            Resolved {
                operand: Operand::Memory(addr),
                page_crossed: !same_page(base, addr),
            }
        }
        AbsoluteY => {
            let base = bus.read16(operand_addr);
            let addr = base.wrapping_add(u16::from(y));
            Resolved {
                operand: Operand::Memory(addr),
                page_crossed: !same_page(base, addr),
            }
        }
        Indirect => {
            let ptr = bus.read16(operand_addr);
            let addr = bus.read16_bug(ptr);
            Resolved {
                operand: Operand::Memory(addr),
                page_crossed: false,
            }
        }
        IndirectX => {
            let b1 = bus.read8(operand_addr);
            let ptr = b1.wrapping_add(x);
            let lo = bus.read8(u16::from(ptr));
            let hi = bus.read8(u16::from(ptr.wrapping_add(1)));
            let addr = (u16::from(hi) << 8) | u16::from(lo);
            Resolved {
                operand: Operand::Memory(addr),
                page_crossed: false,
            }
        }
        IndirectY => {
            let ptr = bus.read8(operand_addr);
            let lo = bus.read8(u16::from(ptr));
            let hi = bus.read8(u16::from(ptr.wrapping_add(1)));
            let base = (u16::from(hi) << 8) | u16::from(lo);
            let addr = base.wrapping_add(u16::from(y));
            Resolved {
                operand: Operand::Memory(addr),
                page_crossed: !same_page(base, addr),
            }
        }
        Relative => {
            let opcode_addr = operand_addr.wrapping_sub(1);
            let offset = bus.read8(operand_addr) as i8;
            let pc_after = operand_addr.wrapping_add(1);
            let target = pc_after.wrapping_add(offset as u16);
            // The extra cycle is bus-timing trivia, not arithmetic: the 6502
            // computes the branch target by adding the offset to PCL alone
            // and only ripples into PCH on a second cycle, so the "crossing"
            // that costs a cycle is relative to the page the opcode itself
            // lives on, not the page the following instruction would start
            // on. `opcode_addr`'s page is what actually changes the timing.
            Resolved {
                operand: Operand::Memory(target),
                page_crossed: !same_page(opcode_addr, target),
            }
        }
    }
}
