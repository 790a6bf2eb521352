//! The CPU executor: registers, stack, stall counter, NMI latch, and the
//! `step()` loop that ties decode, addressing and execution together.
//!
//! `step()` runs one whole instruction (or one stall tick, or one serviced
//! NMI) per call and reports the cycles it consumed, rather than ticking a
//! state machine one clock at a time.

use super::addressing::{self, Operand};
use super::ops::{self, Context};
use super::structs::{Instruction, Registers, Status, RESET_REGISTERS};
use super::table;
use crate::devices::bus::Bus;

/// A 6502-family CPU bound to some [`Bus`] implementation.
pub struct Cpu<B: Bus> {
    pub regs: Registers,
    bus: B,
    stall: u16,
    nmi_latch: bool,
    total_cycles: u64,
}

impl<B: Bus> Cpu<B> {
    /// Construct a CPU and immediately run the reset sequence.
    pub fn new(bus: B) -> Cpu<B> {
        let mut cpu = Cpu {
            regs: RESET_REGISTERS,
            bus,
            stall: 0,
            nmi_latch: false,
            total_cycles: 0,
        };
        cpu.reset();
        cpu
    }

    /// Gives back the bus, consuming the CPU. Mostly useful in tests that
    /// want to inspect bus state after a run.
    pub fn into_bus(self) -> B {
        self.bus
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }

    pub fn bus_mut(&mut self) -> &mut B {
        &mut self.bus
    }

    /// Reset registers and load `PC` from the reset vector (`$FFFC/D`).
    pub fn reset(&mut self) {
        self.regs = RESET_REGISTERS;
        self.regs.pc = self.bus.read16(0xFFFC);
        self.stall = 0;
        self.nmi_latch = false;
    }

    /// Latch a non-maskable interrupt; serviced at the start of the next
    /// `step()`.
    pub fn trigger_nmi(&mut self) {
        self.nmi_latch = true;
    }

    /// Add to the stall counter, as driven by the host's OAM-DMA emulation
    /// (513 cycles normally, 514 if the current CPU cycle is odd).
    pub fn add_stall(&mut self, n: u16) {
        self.stall = self.stall.saturating_add(n);
    }

    /// Advance the CPU by exactly one instruction, one stall tick, or one
    /// serviced NMI. Returns the number of cycles consumed.
    pub fn step(&mut self) -> u8 {
        if self.stall > 0 {
            self.stall -= 1;
            self.total_cycles += 1;
            return 1;
        }

        if self.nmi_latch {
            self.nmi_latch = false;
            self.service_nmi();
            self.total_cycles += 7;
            return 7;
        }

        let pc_at_opcode = self.regs.pc;
        let opcode = self.bus.read8(pc_at_opcode);
        let descriptor = table::decode(opcode);
        let operand_addr = pc_at_opcode.wrapping_add(1);
        let next_pc = pc_at_opcode.wrapping_add(u16::from(descriptor.size));

        let resolved = addressing::resolve(
            &mut self.bus,
            descriptor.mode,
            operand_addr,
            self.regs.x,
            self.regs.y,
        );

        let ctx = Context {
            pc_at_opcode,
            next_pc,
        };
        let outcome = self.execute(descriptor.mnemonic, resolved.operand, &ctx);

        self.regs.pc = outcome.new_pc.unwrap_or(next_pc);

        let mut cycles = descriptor.base_cycles;
        if is_branch(descriptor.mnemonic) {
            if outcome.branch_taken {
                cycles += 1;
                if resolved.page_crossed {
                    cycles += 1;
                }
            }
        } else if descriptor.page_cross_adds_cycle && resolved.page_crossed {
            cycles += 1;
        }

        self.total_cycles += u64::from(cycles);
        cycles
    }

    fn service_nmi(&mut self) {
        eprintln!(" [INFO] Servicing NMI at PC=${:04X}", self.regs.pc);
        let pc = self.regs.pc;
        self.bus
            .write8(0x0100 + u16::from(self.regs.sp), (pc >> 8) as u8);
        self.regs.sp = self.regs.sp.wrapping_sub(1);
        self.bus
            .write8(0x0100 + u16::from(self.regs.sp), (pc & 0xFF) as u8);
        self.regs.sp = self.regs.sp.wrapping_sub(1);
        let pushed_status = (self.regs.status.bits() & !0x10) | 0x20;
        self.bus
            .write8(0x0100 + u16::from(self.regs.sp), pushed_status);
        self.regs.sp = self.regs.sp.wrapping_sub(1);
        self.regs.status.insert(Status::IRQ_DISABLE);
        self.regs.pc = self.bus.read16(0xFFFA);
    }

    fn execute(
        &mut self,
        mnemonic: Instruction,
        operand: Operand,
        ctx: &Context,
    ) -> ops::ExecOutcome {
        use Instruction::*;

        let bus = &mut self.bus;
        let regs = &mut self.regs;

        match mnemonic {
            ADC => ops::adc(bus, regs, operand),
            AND => ops::and(bus, regs, operand),
            ASL => ops::asl(bus, regs, operand),
            BIT => ops::bit(bus, regs, operand),

            BPL => ops::bpl(regs, operand),
            BMI => ops::bmi(regs, operand),
            BVC => ops::bvc(regs, operand),
            BVS => ops::bvs(regs, operand),
            BCC => ops::bcc(regs, operand),
            BCS => ops::bcs(regs, operand),
            BNE => ops::bne(regs, operand),
            BEQ => ops::beq(regs, operand),

            BRK => {
                eprintln!(" [INFO] BRK executed at PC=${:04X}", ctx.pc_at_opcode);
                ops::brk(bus, regs, ctx)
            }

            CMP => ops::cmp(bus, regs, operand),
            CPX => ops::cpx(bus, regs, operand),
            CPY => ops::cpy(bus, regs, operand),
            DEC => ops::dec(bus, regs, operand),
            EOR => ops::eor(bus, regs, operand),

            CLC => ops::clc(regs),
            SEC => ops::sec(regs),
            CLI => ops::cli(regs),
            SEI => ops::sei(regs),
            CLV => ops::clv(regs),
            CLD => ops::cld(regs),
            SED => ops::sed(regs),

            INC => ops::inc(bus, regs, operand),
            JMP => ops::jmp(operand),
            JSR => ops::jsr(bus, regs, operand, ctx),
            LDA => ops::lda(bus, regs, operand),
            LDX => ops::ldx(bus, regs, operand),
            LDY => ops::ldy(bus, regs, operand),
            LSR => ops::lsr(bus, regs, operand),
            NOP => ops::nop(),
            ORA => ops::ora(bus, regs, operand),

            TAX => ops::tax(regs),
            TXA => ops::txa(regs),
            DEX => ops::dex(regs),
            INX => ops::inx(regs),
            TAY => ops::tay(regs),
            TYA => ops::tya(regs),
            DEY => ops::dey(regs),
            INY => ops::iny(regs),

            ROL => ops::rol(bus, regs, operand),
            ROR => ops::ror(bus, regs, operand),

            RTI => ops::rti(bus, regs),
            RTS => ops::rts(bus, regs),
            SBC => ops::sbc(bus, regs, operand),

            STA => ops::sta(bus, regs, operand),
            STX => ops::stx(bus, regs, operand),
            STY => ops::sty(bus, regs, operand),

            TXS => ops::txs(regs),
            TSX => ops::tsx(regs),
            PHA => ops::pha(bus, regs),
            PLA => ops::pla(bus, regs),
            PHP => ops::php(bus, regs),
            PLP => ops::plp(bus, regs),
        }
    }

    /// Render the current instruction and register state as a single
    /// fixed-width trace line, in the conventional disassembler-trace
    /// format (`nestest`-compatible). Never mutates CPU state: operand
    /// bytes are fetched with `peek8`, falling back to `??` for addresses
    /// a `Bus` can't read without side effects.
    pub fn trace(&self) -> String {
        let pc = self.regs.pc;
        let opcode = self.bus.peek8(pc);
        let descriptor = opcode.map(table::decode);
        let size = descriptor.map(|d| d.size).unwrap_or(1);

        let mut bytes = String::new();
        for offset in 0..3u16 {
            if offset < u16::from(size) {
                match self.bus.peek8(pc.wrapping_add(offset)) {
                    Some(b) => bytes.push_str(&format!("{b:02X} ")),
                    None => bytes.push_str("?? "),
                }
            } else {
                bytes.push_str("   ");
            }
        }

        let mnemonic = descriptor
            .map(|d| format!("{:?}", d.mnemonic))
            .unwrap_or_else(|| "???".to_string());

        format!(
            "{pc:04X}  {bytes} {mnemonic:<32}A:{a:02X} X:{x:02X} Y:{y:02X} P:{p:02X} SP:{sp:02X} CYC:{cyc}",
            pc = pc,
            bytes = bytes,
            mnemonic = mnemonic,
            a = self.regs.a,
            x = self.regs.x,
            y = self.regs.y,
            p = self.regs.status.bits(),
            sp = self.regs.sp,
            cyc = self.total_cycles,
        )
    }
}

fn is_branch(mnemonic: Instruction) -> bool {
    matches!(
        mnemonic,
        Instruction::BPL
            | Instruction::BMI
            | Instruction::BVC
            | Instruction::BVS
            | Instruction::BCC
            | Instruction::BCS
            | Instruction::BNE
            | Instruction::BEQ
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::devices::flat_bus::FlatBus;

    fn cpu_with_program(program: &[u8]) -> Cpu<FlatBus> {
        let mut bus = FlatBus::with_program(0, program);
        bus.set_vector(0xFFFC, 0x4020);
        Cpu::new(bus)
    }

    #[test]
    fn reset_loads_vector_and_poweron_state() {
        let mut bus = FlatBus::new();
        bus.set_vector(0xFFFC, 0x8000);
        let cpu = Cpu::new(bus);
        assert_eq!(cpu.regs.pc, 0x8000);
        assert_eq!(cpu.regs.sp, 0xFF);
        assert_eq!(cpu.regs.status.bits(), 0x24);
        assert_eq!(cpu.regs.a, 0);
        assert_eq!(cpu.regs.x, 0);
        assert_eq!(cpu.regs.y, 0);
    }

    #[test]
    fn lda_immediate_zero_sets_zero_flag() {
        let mut cpu = cpu_with_program(&[0xA9, 0x00]);
        let cycles = cpu.step();
        assert_eq!(cpu.regs.a, 0);
        assert!(cpu.regs.status.contains(Status::ZERO));
        assert!(!cpu.regs.status.contains(Status::NEGATIVE));
        assert_eq!(cpu.regs.pc, 0x4022);
        assert_eq!(cycles, 2);
    }

    #[test]
    fn adc_overflow_scenario() {
        let mut cpu = cpu_with_program(&[0x69, 0x50]);
        cpu.regs.a = 0x50;
        cpu.regs.status.remove(Status::CARRY);
        let cycles = cpu.step();
        assert_eq!(cpu.regs.a, 0xA0);
        assert!(!cpu.regs.status.contains(Status::CARRY));
        assert!(cpu.regs.status.contains(Status::OVERFLOW));
        assert!(cpu.regs.status.contains(Status::NEGATIVE));
        assert!(!cpu.regs.status.contains(Status::ZERO));
        assert_eq!(cycles, 2);
    }

    #[test]
    fn branch_taken_crossing_page_costs_four_cycles() {
        let mut bus = FlatBus::new();
        bus.write8(0x80FE, 0xF0); // BEQ
        bus.write8(0x80FF, 0x04);
        bus.set_vector(0xFFFC, 0x80FE);
        let mut cpu = Cpu::new(bus);
        cpu.regs.status.insert(Status::ZERO);
        let cycles = cpu.step();
        assert_eq!(cpu.regs.pc, 0x8104);
        assert_eq!(cycles, 4);
    }

    #[test]
    fn jmp_indirect_honors_page_boundary_bug() {
        let mut bus = FlatBus::new();
        bus.write8(0x1000, 0x6C);
        bus.write8(0x1001, 0xFF);
        bus.write8(0x1002, 0x50);
        bus.write8(0x50FF, 0x80);
        bus.write8(0x5000, 0x40);
        bus.write8(0x5100, 0x99); // must NOT be read
        bus.set_vector(0xFFFC, 0x1000);
        let mut cpu = Cpu::new(bus);
        let cycles = cpu.step();
        assert_eq!(cpu.regs.pc, 0x4080);
        assert_eq!(cycles, 5);
    }

    #[test]
    fn nmi_service_pushes_state_and_jumps_to_vector() {
        let mut bus = FlatBus::new();
        bus.set_vector(0xFFFC, 0x1234);
        bus.set_vector(0xFFFA, 0x9000);
        let mut cpu = Cpu::new(bus);
        cpu.regs.status = Status::from_bits_truncate(0x24);
        cpu.trigger_nmi();
        let cycles = cpu.step();

        assert_eq!(cpu.regs.pc, 0x9000);
        assert_eq!(cycles, 7);
        assert!(cpu.regs.status.contains(Status::IRQ_DISABLE));
        assert_eq!(cpu.regs.sp, 0xFC);

        let bus = cpu.into_bus();
        assert_eq!(bus.peek8(0x01FF), Some(0x12));
        assert_eq!(bus.peek8(0x01FE), Some(0x34));
        assert_eq!(bus.peek8(0x01FD), Some(0x24));
    }

    #[test]
    fn jsr_rts_round_trip() {
        let mut bus = FlatBus::with_program(0, &[0x20, 0x00, 0x50]); // JSR $5000
        bus.write8(0x5000, 0x60); // RTS
        bus.set_vector(0xFFFC, 0x4020);
        let mut cpu = Cpu::new(bus);
        cpu.step(); // JSR
        assert_eq!(cpu.regs.pc, 0x5000);
        cpu.step(); // RTS
        assert_eq!(cpu.regs.pc, 0x4023);
    }

    #[test]
    fn stall_counter_consumes_one_cycle_per_step() {
        let mut cpu = cpu_with_program(&[0xEA]);
        cpu.add_stall(2);
        assert_eq!(cpu.step(), 1);
        assert_eq!(cpu.step(), 1);
        assert_eq!(cpu.step(), 2); // NOP finally runs
    }

    #[test]
    fn trace_does_not_mutate_state() {
        let cpu = cpu_with_program(&[0xA9, 0x42]);
        let before = cpu.regs;
        let line = cpu.trace();
        assert!(line.contains("LDA"));
        assert_eq!(cpu.regs, before);
    }
}
