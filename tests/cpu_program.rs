//! Integration-level coverage: whole tiny programs run through `Cpu::step`
//! against `FlatBus`, rather than single-instruction unit checks.

use nes_cpu_core::devices::bus::Bus;
use nes_cpu_core::devices::cpu::Cpu;
use nes_cpu_core::devices::flat_bus::FlatBus;

fn run(program: &[u8], steps: usize) -> Cpu<FlatBus> {
    let mut bus = FlatBus::with_program(0, program);
    bus.set_vector(0xFFFC, 0x4020);
    let mut cpu = Cpu::new(bus);
    for _ in 0..steps {
        cpu.step();
    }
    cpu
}

#[test]
fn counts_down_a_loop_with_branch_and_decrement() {
    // LDX #$05
    // loop: DEX
    //       BNE loop
    //       BRK
    let program = [0xA2, 0x05, 0xCA, 0xD0, 0xFD, 0x00];
    let cpu = run(&program, 1 + 5 * 2); // LDX, then 5x (DEX;BNE)
    assert_eq!(cpu.regs.x, 0);
}

#[test]
fn accumulates_a_running_sum_through_memory() {
    // LDA #$00; STA $10; LDA #$07; ADC $10; STA $11
    let program = [0xA9, 0x00, 0x85, 0x10, 0xA9, 0x07, 0x65, 0x10, 0x85, 0x11];
    let cpu = run(&program, 5);
    assert_eq!(cpu.bus().peek8(0x0011), Some(0x07));
}

#[test]
fn php_plp_round_trips_all_but_break_and_unused() {
    let program = [0x08, 0x28]; // PHP; PLP
    let mut bus = FlatBus::with_program(0, &program);
    bus.set_vector(0xFFFC, 0x4020);
    let mut cpu = Cpu::new(bus);
    cpu.regs.status = nes_cpu_core::devices::cpu::Status::from_bits_truncate(0b1010_1001);
    let before = cpu.regs.status.bits();
    cpu.step(); // PHP
    cpu.regs.status = nes_cpu_core::devices::cpu::Status::empty();
    cpu.step(); // PLP
    // bit 4 (break) forced to 0, bit 5 (unused) forced to 1, rest preserved.
    assert_eq!(cpu.regs.status.bits(), (before & !0x10) | 0x20);
}

#[test]
fn jsr_rts_returns_past_the_call_site() {
    // JSR sub ($4025); BRK; <pad>; sub: RTS
    let program = [0x20, 0x25, 0x40, 0x00, 0x00, 0x60];
    let mut cpu = run(&program, 1);
    assert_eq!(cpu.regs.pc, 0x4025);
    cpu.step(); // RTS
    assert_eq!(cpu.regs.pc, 0x4023);
}

#[test]
fn trace_reports_every_instruction_in_a_short_program() {
    let program = [0xA9, 0x10, 0xAA, 0xE8, 0x00];
    let mut bus = FlatBus::with_program(0, &program);
    bus.set_vector(0xFFFC, 0x4020);
    let mut cpu = Cpu::new(bus);

    let mnemonics: Vec<String> = (0..4)
        .map(|_| {
            let line = cpu.trace();
            cpu.step();
            line
        })
        .collect();

    assert!(mnemonics[0].contains("LDA"));
    assert!(mnemonics[1].contains("TAX"));
    assert!(mnemonics[2].contains("INX"));
    assert!(mnemonics[3].contains("BRK"));
}
