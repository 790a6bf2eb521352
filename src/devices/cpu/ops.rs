//! Per-mnemonic execution semantics.
//!
//! One function per mnemonic, matching a descriptor-based cycle-accounting
//! model: a handler here only ever reports *whether* it took a branch or
//! moved the program counter; the cycle total is assembled by the caller
//! from the static table plus those signals.

use super::addressing::Operand;
use super::structs::{Registers, Status};
use crate::devices::bus::Bus;

/// What a handler did to control flow, reported back to the step loop.
#[derive(Debug, Default, Clone, Copy)]
pub struct ExecOutcome {
    /// Set when the handler moved the program counter itself (branches
    /// taken, JMP, JSR, RTS, RTI, BRK). The step loop must not also apply
    /// the opcode's `size`.
    pub new_pc: Option<u16>,
    /// Set for branch instructions that were taken, so the step loop can
    /// add the +1 (and +1 more on a page cross) cycle bonus.
    pub branch_taken: bool,
}

impl ExecOutcome {
    fn none() -> ExecOutcome {
        ExecOutcome::default()
    }

    fn jump(pc: u16) -> ExecOutcome {
        ExecOutcome {
            new_pc: Some(pc),
            branch_taken: false,
        }
    }
}

/// Everything a handler needs besides its resolved operand.
pub struct Context {
    /// Address of the opcode byte itself.
    pub pc_at_opcode: u16,
    /// Address of the instruction following this one, i.e.
    /// `pc_at_opcode + descriptor.size`.
    pub next_pc: u16,
}

fn read_operand<B: Bus + ?Sized>(bus: &mut B, regs: &Registers, operand: Operand) -> u8 {
    match operand {
        Operand::Accumulator => regs.a,
        Operand::Immediate(v) => v,
        Operand::Memory(addr) => bus.read8(addr),
        Operand::Implied => unreachable!("read_operand called on an Implied operand"),
    }
}

fn write_operand<B: Bus + ?Sized>(bus: &mut B, regs: &mut Registers, operand: Operand, value: u8) {
    match operand {
        Operand::Accumulator => regs.a = value,
        Operand::Memory(addr) => bus.write8(addr, value),
        Operand::Immediate(_) | Operand::Implied => {
            unreachable!("write_operand called on a non-writable operand")
        }
    }
}

fn memory_addr(operand: Operand) -> u16 {
    match operand {
        Operand::Memory(addr) => addr,
        _ => unreachable!("expected a Memory operand"),
    }
}

fn set_zs(status: &mut Status, value: u8) {
    status.set(Status::ZERO, value == 0);
    status.set(Status::NEGATIVE, value & 0x80 != 0);
}

fn push8<B: Bus + ?Sized>(bus: &mut B, regs: &mut Registers, value: u8) {
    bus.write8(0x0100 + u16::from(regs.sp), value);
    regs.sp = regs.sp.wrapping_sub(1);
}

fn pop8<B: Bus + ?Sized>(bus: &mut B, regs: &mut Registers) -> u8 {
    regs.sp = regs.sp.wrapping_add(1);
    bus.read8(0x0100 + u16::from(regs.sp))
}

fn push16<B: Bus + ?Sized>(bus: &mut B, regs: &mut Registers, value: u16) {
    push8(bus, regs, (value >> 8) as u8);
    push8(bus, regs, (value & 0xFF) as u8);
}

fn pop16<B: Bus + ?Sized>(bus: &mut B, regs: &mut Registers) -> u16 {
    let lo = pop8(bus, regs);
    let hi = pop8(bus, regs);
    (u16::from(hi) << 8) | u16::from(lo)
}

//region Load/Store

pub fn lda<B: Bus + ?Sized>(bus: &mut B, regs: &mut Registers, operand: Operand) -> ExecOutcome {
    regs.a = read_operand(bus, regs, operand);
    set_zs(&mut regs.status, regs.a);
    ExecOutcome::none()
}

pub fn ldx<B: Bus + ?Sized>(bus: &mut B, regs: &mut Registers, operand: Operand) -> ExecOutcome {
    regs.x = read_operand(bus, regs, operand);
    set_zs(&mut regs.status, regs.x);
    ExecOutcome::none()
}

pub fn ldy<B: Bus + ?Sized>(bus: &mut B, regs: &mut Registers, operand: Operand) -> ExecOutcome {
    regs.y = read_operand(bus, regs, operand);
    set_zs(&mut regs.status, regs.y);
    ExecOutcome::none()
}

pub fn sta<B: Bus + ?Sized>(bus: &mut B, regs: &mut Registers, operand: Operand) -> ExecOutcome {
    bus.write8(memory_addr(operand), regs.a);
    ExecOutcome::none()
}

pub fn stx<B: Bus + ?Sized>(bus: &mut B, regs: &mut Registers, operand: Operand) -> ExecOutcome {
    bus.write8(memory_addr(operand), regs.x);
    ExecOutcome::none()
}

pub fn sty<B: Bus + ?Sized>(bus: &mut B, regs: &mut Registers, operand: Operand) -> ExecOutcome {
    bus.write8(memory_addr(operand), regs.y);
    ExecOutcome::none()
}

//endregion

//region Register transfers

pub fn tax(regs: &mut Registers) -> ExecOutcome {
    regs.x = regs.a;
    set_zs(&mut regs.status, regs.x);
    ExecOutcome::none()
}

pub fn tay(regs: &mut Registers) -> ExecOutcome {
    regs.y = regs.a;
    set_zs(&mut regs.status, regs.y);
    ExecOutcome::none()
}

pub fn txa(regs: &mut Registers) -> ExecOutcome {
    regs.a = regs.x;
    set_zs(&mut regs.status, regs.a);
    ExecOutcome::none()
}

pub fn tya(regs: &mut Registers) -> ExecOutcome {
    regs.a = regs.y;
    set_zs(&mut regs.status, regs.a);
    ExecOutcome::none()
}

pub fn tsx(regs: &mut Registers) -> ExecOutcome {
    regs.x = regs.sp;
    set_zs(&mut regs.status, regs.x);
    ExecOutcome::none()
}

pub fn txs(regs: &mut Registers) -> ExecOutcome {
    regs.sp = regs.x;
    ExecOutcome::none()
}

pub fn dex(regs: &mut Registers) -> ExecOutcome {
    regs.x = regs.x.wrapping_sub(1);
    set_zs(&mut regs.status, regs.x);
    ExecOutcome::none()
}

pub fn dey(regs: &mut Registers) -> ExecOutcome {
    regs.y = regs.y.wrapping_sub(1);
    set_zs(&mut regs.status, regs.y);
    ExecOutcome::none()
}

pub fn inx(regs: &mut Registers) -> ExecOutcome {
    regs.x = regs.x.wrapping_add(1);
    set_zs(&mut regs.status, regs.x);
    ExecOutcome::none()
}

pub fn iny(regs: &mut Registers) -> ExecOutcome {
    regs.y = regs.y.wrapping_add(1);
    set_zs(&mut regs.status, regs.y);
    ExecOutcome::none()
}

//endregion

//region Stack

pub fn pha<B: Bus + ?Sized>(bus: &mut B, regs: &mut Registers) -> ExecOutcome {
    push8(bus, regs, regs.a);
    ExecOutcome::none()
}

pub fn pla<B: Bus + ?Sized>(bus: &mut B, regs: &mut Registers) -> ExecOutcome {
    regs.a = pop8(bus, regs);
    set_zs(&mut regs.status, regs.a);
    ExecOutcome::none()
}

pub fn php<B: Bus + ?Sized>(bus: &mut B, regs: &mut Registers) -> ExecOutcome {
    push8(bus, regs, regs.status.bits() | 0x30);
    ExecOutcome::none()
}

pub fn plp<B: Bus + ?Sized>(bus: &mut B, regs: &mut Registers) -> ExecOutcome {
    let popped = pop8(bus, regs);
    regs.status = Status::from_bits_truncate((popped & !0x10) | 0x20);
    ExecOutcome::none()
}

//endregion

//region Logic

pub fn and<B: Bus + ?Sized>(bus: &mut B, regs: &mut Registers, operand: Operand) -> ExecOutcome {
    regs.a &= read_operand(bus, regs, operand);
    set_zs(&mut regs.status, regs.a);
    ExecOutcome::none()
}

pub fn ora<B: Bus + ?Sized>(bus: &mut B, regs: &mut Registers, operand: Operand) -> ExecOutcome {
    regs.a |= read_operand(bus, regs, operand);
    set_zs(&mut regs.status, regs.a);
    ExecOutcome::none()
}

pub fn eor<B: Bus + ?Sized>(bus: &mut B, regs: &mut Registers, operand: Operand) -> ExecOutcome {
    regs.a ^= read_operand(bus, regs, operand);
    set_zs(&mut regs.status, regs.a);
    ExecOutcome::none()
}

//endregion

//region Shift/Rotate

pub fn asl<B: Bus + ?Sized>(bus: &mut B, regs: &mut Registers, operand: Operand) -> ExecOutcome {
    let value = read_operand(bus, regs, operand);
    let result = value << 1;
    regs.status.set(Status::CARRY, value & 0x80 != 0);
    set_zs(&mut regs.status, result);
    write_operand(bus, regs, operand, result);
    ExecOutcome::none()
}

pub fn lsr<B: Bus + ?Sized>(bus: &mut B, regs: &mut Registers, operand: Operand) -> ExecOutcome {
    let value = read_operand(bus, regs, operand);
    let result = value >> 1;
    regs.status.set(Status::CARRY, value & 0x01 != 0);
    set_zs(&mut regs.status, result);
    write_operand(bus, regs, operand, result);
    ExecOutcome::none()
}

pub fn rol<B: Bus + ?Sized>(bus: &mut B, regs: &mut Registers, operand: Operand) -> ExecOutcome {
    let value = read_operand(bus, regs, operand);
    let carry_in = u8::from(regs.status.contains(Status::CARRY));
    let result = (value << 1) | carry_in;
    regs.status.set(Status::CARRY, value & 0x80 != 0);
    set_zs(&mut regs.status, result);
    write_operand(bus, regs, operand, result);
    ExecOutcome::none()
}

pub fn ror<B: Bus + ?Sized>(bus: &mut B, regs: &mut Registers, operand: Operand) -> ExecOutcome {
    let value = read_operand(bus, regs, operand);
    let carry_in = u8::from(regs.status.contains(Status::CARRY));
    let result = (value >> 1) | (carry_in << 7);
    regs.status.set(Status::CARRY, value & 0x01 != 0);
    set_zs(&mut regs.status, result);
    write_operand(bus, regs, operand, result);
    ExecOutcome::none()
}

//endregion

//region Arithmetic

pub fn adc<B: Bus + ?Sized>(bus: &mut B, regs: &mut Registers, operand: Operand) -> ExecOutcome {
    let m = read_operand(bus, regs, operand);
    add_with_carry(regs, m);
    ExecOutcome::none()
}

pub fn sbc<B: Bus + ?Sized>(bus: &mut B, regs: &mut Registers, operand: Operand) -> ExecOutcome {
    let m = read_operand(bus, regs, operand);
    add_with_carry(regs, m ^ 0xFF);
    ExecOutcome::none()
}

/// `ADC` and `SBC` share this: `SBC(M)` is exactly `ADC(M XOR 0xFF)` with
/// the same initial carry, so there is only one addition to get right.
fn add_with_carry(regs: &mut Registers, m: u8) {
    let a = regs.a;
    let carry_in = u16::from(regs.status.contains(Status::CARRY));
    let sum = u16::from(a) + u16::from(m) + carry_in;
    let result = sum as u8;

    regs.status.set(Status::CARRY, sum > 0xFF);
    regs
        .status
        .set(Status::OVERFLOW, (a ^ m) & 0x80 == 0 && (a ^ result) & 0x80 != 0);
    set_zs(&mut regs.status, result);
    regs.a = result;
}

//endregion

//region Compare

fn compare(regs: &mut Registers, reg_value: u8, m: u8) {
    let diff = reg_value.wrapping_sub(m);
    regs.status.set(Status::CARRY, reg_value >= m);
    regs.status.set(Status::ZERO, reg_value == m);
    regs.status.set(Status::NEGATIVE, diff & 0x80 != 0);
}

pub fn cmp<B: Bus + ?Sized>(bus: &mut B, regs: &mut Registers, operand: Operand) -> ExecOutcome {
    let m = read_operand(bus, regs, operand);
    compare(regs, regs.a, m);
    ExecOutcome::none()
}

pub fn cpx<B: Bus + ?Sized>(bus: &mut B, regs: &mut Registers, operand: Operand) -> ExecOutcome {
    let m = read_operand(bus, regs, operand);
    compare(regs, regs.x, m);
    ExecOutcome::none()
}

pub fn cpy<B: Bus + ?Sized>(bus: &mut B, regs: &mut Registers, operand: Operand) -> ExecOutcome {
    let m = read_operand(bus, regs, operand);
    compare(regs, regs.y, m);
    ExecOutcome::none()
}

//endregion

//region Increment/Decrement memory

pub fn inc<B: Bus + ?Sized>(bus: &mut B, regs: &mut Registers, operand: Operand) -> ExecOutcome {
    let addr = memory_addr(operand);
    let result = bus.read8(addr).wrapping_add(1);
    bus.write8(addr, result);
    set_zs(&mut regs.status, result);
    ExecOutcome::none()
}

pub fn dec<B: Bus + ?Sized>(bus: &mut B, regs: &mut Registers, operand: Operand) -> ExecOutcome {
    let addr = memory_addr(operand);
    let result = bus.read8(addr).wrapping_sub(1);
    bus.write8(addr, result);
    set_zs(&mut regs.status, result);
    ExecOutcome::none()
}

//endregion

//region Bit test

pub fn bit<B: Bus + ?Sized>(bus: &mut B, regs: &mut Registers, operand: Operand) -> ExecOutcome {
    let m = read_operand(bus, regs, operand);
    let result = regs.a & m;
    regs.status.set(Status::ZERO, result == 0);
    regs.status.set(Status::OVERFLOW, m & 0x40 != 0);
    regs.status.set(Status::NEGATIVE, m & 0x80 != 0);
    ExecOutcome::none()
}

//endregion

//region Branches

fn branch(operand: Operand, condition: bool) -> ExecOutcome {
    if condition {
        ExecOutcome {
            new_pc: Some(memory_addr(operand)),
            branch_taken: true,
        }
    } else {
        ExecOutcome::none()
    }
}

pub fn bpl(regs: &Registers, operand: Operand) -> ExecOutcome {
    branch(operand, !regs.status.contains(Status::NEGATIVE))
}

pub fn bmi(regs: &Registers, operand: Operand) -> ExecOutcome {
    branch(operand, regs.status.contains(Status::NEGATIVE))
}

pub fn bvc(regs: &Registers, operand: Operand) -> ExecOutcome {
    branch(operand, !regs.status.contains(Status::OVERFLOW))
}

pub fn bvs(regs: &Registers, operand: Operand) -> ExecOutcome {
    branch(operand, regs.status.contains(Status::OVERFLOW))
}

pub fn bcc(regs: &Registers, operand: Operand) -> ExecOutcome {
    branch(operand, !regs.status.contains(Status::CARRY))
}

pub fn bcs(regs: &Registers, operand: Operand) -> ExecOutcome {
    branch(operand, regs.status.contains(Status::CARRY))
}

pub fn bne(regs: &Registers, operand: Operand) -> ExecOutcome {
    branch(operand, !regs.status.contains(Status::ZERO))
}

pub fn beq(regs: &Registers, operand: Operand) -> ExecOutcome {
    branch(operand, regs.status.contains(Status::ZERO))
}

//endregion

//region Jumps and subroutines

pub fn jmp(operand: Operand) -> ExecOutcome {
    ExecOutcome::jump(memory_addr(operand))
}

pub fn jsr<B: Bus + ?Sized>(
    bus: &mut B,
    regs: &mut Registers,
    operand: Operand,
    ctx: &Context,
) -> ExecOutcome {
    push16(bus, regs, ctx.next_pc.wrapping_sub(1));
    ExecOutcome::jump(memory_addr(operand))
}

pub fn rts<B: Bus + ?Sized>(bus: &mut B, regs: &mut Registers) -> ExecOutcome {
    let addr = pop16(bus, regs);
    ExecOutcome::jump(addr.wrapping_add(1))
}

//endregion

//region Interrupts

pub fn rti<B: Bus + ?Sized>(bus: &mut B, regs: &mut Registers) -> ExecOutcome {
    let popped = pop8(bus, regs);
    regs.status = Status::from_bits_truncate((popped & !0x10) | 0x20);
    let pc = pop16(bus, regs);
    ExecOutcome::jump(pc)
}

pub fn brk<B: Bus + ?Sized>(bus: &mut B, regs: &mut Registers, ctx: &Context) -> ExecOutcome {
    let return_addr = ctx.pc_at_opcode.wrapping_add(2);
    push16(bus, regs, return_addr);
    push8(bus, regs, regs.status.bits() | 0x30);
    regs.status.insert(Status::IRQ_DISABLE);
    let vector = bus.read16(0xFFFE);
    ExecOutcome::jump(vector)
}

//endregion

//region Flag instructions

pub fn clc(regs: &mut Registers) -> ExecOutcome {
    regs.status.remove(Status::CARRY);
    ExecOutcome::none()
}

pub fn sec(regs: &mut Registers) -> ExecOutcome {
    regs.status.insert(Status::CARRY);
    ExecOutcome::none()
}

pub fn cli(regs: &mut Registers) -> ExecOutcome {
    regs.status.remove(Status::IRQ_DISABLE);
    ExecOutcome::none()
}

pub fn sei(regs: &mut Registers) -> ExecOutcome {
    regs.status.insert(Status::IRQ_DISABLE);
    ExecOutcome::none()
}

pub fn clv(regs: &mut Registers) -> ExecOutcome {
    regs.status.remove(Status::OVERFLOW);
    ExecOutcome::none()
}

pub fn cld(regs: &mut Registers) -> ExecOutcome {
    regs.status.remove(Status::DECIMAL);
    ExecOutcome::none()
}

pub fn sed(regs: &mut Registers) -> ExecOutcome {
    regs.status.insert(Status::DECIMAL);
    ExecOutcome::none()
}

//endregion

pub fn nop() -> ExecOutcome {
    ExecOutcome::none()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::devices::flat_bus::FlatBus;

    fn regs() -> Registers {
        Registers {
            a: 0,
            x: 0,
            y: 0,
            sp: 0xFF,
            pc: 0,
            status: Status::from_bits_truncate(0x24),
        }
    }

    #[test]
    fn adc_sets_overflow_on_signed_wrap() {
        let mut bus = FlatBus::new();
        let mut r = regs();
        r.a = 0x50;
        adc(&mut bus, &mut r, Operand::Immediate(0x50));
        assert_eq!(r.a, 0xA0);
        assert!(!r.status.contains(Status::CARRY));
        assert!(r.status.contains(Status::OVERFLOW));
        assert!(r.status.contains(Status::NEGATIVE));
        assert!(!r.status.contains(Status::ZERO));
    }

    #[test]
    fn sbc_matches_adc_of_inverted_operand() {
        let mut bus = FlatBus::new();
        let mut direct = regs();
        direct.a = 0x40;
        direct.status.insert(Status::CARRY);
        sbc(&mut bus, &mut direct, Operand::Immediate(0x10));

        let mut via_adc = regs();
        via_adc.a = 0x40;
        via_adc.status.insert(Status::CARRY);
        adc(&mut bus, &mut via_adc, Operand::Immediate(0x10 ^ 0xFF));

        assert_eq!(direct.a, via_adc.a);
        assert_eq!(direct.status, via_adc.status);
    }

    #[test]
    fn php_then_plp_round_trips_except_break_and_unused() {
        let mut bus = FlatBus::new();
        let mut r = regs();
        r.status = Status::from_bits_truncate(0b1010_1001);
        php(&mut bus, &mut r);
        r.status = Status::empty();
        plp(&mut bus, &mut r);
        assert_eq!(r.status.bits(), 0b1010_1101);
    }

    #[test]
    fn jsr_then_rts_returns_to_instruction_after_jsr() {
        let mut bus = FlatBus::new();
        let mut r = regs();
        r.pc = 0x8000;
        let ctx = Context {
            pc_at_opcode: 0x8000,
            next_pc: 0x8003,
        };
        let outcome = jsr(&mut bus, &mut r, Operand::Memory(0x9000), &ctx);
        assert_eq!(outcome.new_pc, Some(0x9000));
        let back = rts(&mut bus, &mut r);
        assert_eq!(back.new_pc, Some(0x8003));
    }

    #[test]
    fn compare_sets_carry_when_register_greater_or_equal() {
        let mut bus = FlatBus::new();
        let mut r = regs();
        r.a = 0x10;
        cmp(&mut bus, &mut r, Operand::Immediate(0x10));
        assert!(r.status.contains(Status::CARRY));
        assert!(r.status.contains(Status::ZERO));
    }
}
