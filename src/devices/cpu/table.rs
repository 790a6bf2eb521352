//! The dense 256-entry opcode decode table.
//!
//! A `match` over the opcode byte, which the compiler lowers to a jump
//! table, carrying mnemonic, addressing mode, instruction size, base cycle
//! count, and whether an indexed read gets a page-cross bonus. Illegal and
//! unofficial opcodes are not given individual identities: every one of
//! them decodes to a plain NOP entry, since this core does not implement
//! unofficial-opcode side effects.

use super::structs::{AddressingMode, Instruction};

/// An immutable, per-opcode decode result.
#[derive(Debug, Clone, Copy)]
pub struct OpcodeEntry {
    pub mnemonic: Instruction,
    pub mode: AddressingMode,
    /// Total bytes consumed by this instruction (opcode + operand).
    pub size: u8,
    /// Cycles reported when no branch is taken and no page is crossed.
    pub base_cycles: u8,
    /// Whether an indexed addressing-mode page cross adds one cycle.
    /// Only meaningful (and only ever true) for read-class instructions
    /// using `AbsoluteX`/`AbsoluteY`/`IndirectY`.
    pub page_cross_adds_cycle: bool,
}

const fn entry(
    mnemonic: Instruction,
    mode: AddressingMode,
    size: u8,
    base_cycles: u8,
    page_cross_adds_cycle: bool,
) -> OpcodeEntry {
    OpcodeEntry {
        mnemonic,
        mode,
        size,
        base_cycles,
        page_cross_adds_cycle,
    }
}

/// Illegal opcodes are NOPs with no operand and no cycle or flag effects.
const fn illegal() -> OpcodeEntry {
    entry(Instruction::NOP, AddressingMode::Implied, 1, 2, false)
}

/// Decode a single opcode byte into its descriptor.
///
/// All 256 byte values resolve to an entry; bytes with no official meaning
/// fall through to [`illegal`] and are logged via `eprintln!` rather than
/// silently swallowed.
#[rustfmt::skip]
pub fn decode(opcode: u8) -> OpcodeEntry {
    use AddressingMode::*;
    use Instruction::*;

    match opcode {
        // ADC
        0x69 => entry(ADC, Immediate, 2, 2, false),
        0x65 => entry(ADC, ZeroPage, 2, 3, false),
        0x75 => entry(ADC, ZeroPageX, 2, 4, false),
        0x6D => entry(ADC, Absolute, 3, 4, false),
        0x7D => entry(ADC, AbsoluteX, 3, 4, true),
        0x79 => entry(ADC, AbsoluteY, 3, 4, true),
        0x61 => entry(ADC, IndirectX, 2, 6, false),
        0x71 => entry(ADC, IndirectY, 2, 5, true),

        // AND
        0x29 => entry(AND, Immediate, 2, 2, false),
        0x25 => entry(AND, ZeroPage, 2, 3, false),
        0x35 => entry(AND, ZeroPageX, 2, 4, false),
        0x2D => entry(AND, Absolute, 3, 4, false),
        0x3D => entry(AND, AbsoluteX, 3, 4, true),
        0x39 => entry(AND, AbsoluteY, 3, 4, true),
        0x21 => entry(AND, IndirectX, 2, 6, false),
        0x31 => entry(AND, IndirectY, 2, 5, true),

        // ASL
        0x0A => entry(ASL, Accumulator, 1, 2, false),
        0x06 => entry(ASL, ZeroPage, 2, 5, false),
        0x16 => entry(ASL, ZeroPageX, 2, 6, false),
        0x0E => entry(ASL, Absolute, 3, 6, false),
        0x1E => entry(ASL, AbsoluteX, 3, 7, false),

        // BIT
        0x24 => entry(BIT, ZeroPage, 2, 3, false),
        0x2C => entry(BIT, Absolute, 3, 4, false),

        // Branches
        0x10 => entry(BPL, Relative, 2, 2, false),
        0x30 => entry(BMI, Relative, 2, 2, false),
        0x50 => entry(BVC, Relative, 2, 2, false),
        0x70 => entry(BVS, Relative, 2, 2, false),
        0x90 => entry(BCC, Relative, 2, 2, false),
        0xB0 => entry(BCS, Relative, 2, 2, false),
        0xD0 => entry(BNE, Relative, 2, 2, false),
        0xF0 => entry(BEQ, Relative, 2, 2, false),

        // BRK
        0x00 => entry(BRK, Implied, 1, 7, false),

        // CMP
        0xC9 => entry(CMP, Immediate, 2, 2, false),
        0xC5 => entry(CMP, ZeroPage, 2, 3, false),
        0xD5 => entry(CMP, ZeroPageX, 2, 4, false),
        0xCD => entry(CMP, Absolute, 3, 4, false),
        0xDD => entry(CMP, AbsoluteX, 3, 4, true),
        0xD9 => entry(CMP, AbsoluteY, 3, 4, true),
        0xC1 => entry(CMP, IndirectX, 2, 6, false),
        0xD1 => entry(CMP, IndirectY, 2, 5, true),

        // CPX / CPY
        0xE0 => entry(CPX, Immediate, 2, 2, false),
        0xE4 => entry(CPX, ZeroPage, 2, 3, false),
        0xEC => entry(CPX, Absolute, 3, 4, false),
        0xC0 => entry(CPY, Immediate, 2, 2, false),
        0xC4 => entry(CPY, ZeroPage, 2, 3, false),
        0xCC => entry(CPY, Absolute, 3, 4, false),

        // DEC
        0xC6 => entry(DEC, ZeroPage, 2, 5, false),
        0xD6 => entry(DEC, ZeroPageX, 2, 6, false),
        0xCE => entry(DEC, Absolute, 3, 6, false),
        0xDE => entry(DEC, AbsoluteX, 3, 7, false),

        // EOR
        0x49 => entry(EOR, Immediate, 2, 2, false),
        0x45 => entry(EOR, ZeroPage, 2, 3, false),
        0x55 => entry(EOR, ZeroPageX, 2, 4, false),
        0x4D => entry(EOR, Absolute, 3, 4, false),
        0x5D => entry(EOR, AbsoluteX, 3, 4, true),
        0x59 => entry(EOR, AbsoluteY, 3, 4, true),
        0x41 => entry(EOR, IndirectX, 2, 6, false),
        0x51 => entry(EOR, IndirectY, 2, 5, true),

        // Flag ops
        0x18 => entry(CLC, Implied, 1, 2, false),
        0x38 => entry(SEC, Implied, 1, 2, false),
        0x58 => entry(CLI, Implied, 1, 2, false),
        0x78 => entry(SEI, Implied, 1, 2, false),
        0xB8 => entry(CLV, Implied, 1, 2, false),
        0xD8 => entry(CLD, Implied, 1, 2, false),
        0xF8 => entry(SED, Implied, 1, 2, false),

        // INC
        0xE6 => entry(INC, ZeroPage, 2, 5, false),
        0xF6 => entry(INC, ZeroPageX, 2, 6, false),
        0xEE => entry(INC, Absolute, 3, 6, false),
        0xFE => entry(INC, AbsoluteX, 3, 7, false),

        // JMP / JSR
        0x4C => entry(JMP, Absolute, 3, 3, false),
        0x6C => entry(JMP, Indirect, 3, 5, false),
        0x20 => entry(JSR, Absolute, 3, 6, false),

        // LDA
        0xA9 => entry(LDA, Immediate, 2, 2, false),
        0xA5 => entry(LDA, ZeroPage, 2, 3, false),
        0xB5 => entry(LDA, ZeroPageX, 2, 4, false),
        0xAD => entry(LDA, Absolute, 3, 4, false),
        0xBD => entry(LDA, AbsoluteX, 3, 4, true),
        0xB9 => entry(LDA, AbsoluteY, 3, 4, true),
        0xA1 => entry(LDA, IndirectX, 2, 6, false),
        0xB1 => entry(LDA, IndirectY, 2, 5, true),

        // LDX
        0xA2 => entry(LDX, Immediate, 2, 2, false),
        0xA6 => entry(LDX, ZeroPage, 2, 3, false),
        0xB6 => entry(LDX, ZeroPageY, 2, 4, false),
        0xAE => entry(LDX, Absolute, 3, 4, false),
        0xBE => entry(LDX, AbsoluteY, 3, 4, true),

        // LDY
        0xA0 => entry(LDY, Immediate, 2, 2, false),
        0xA4 => entry(LDY, ZeroPage, 2, 3, false),
        0xB4 => entry(LDY, ZeroPageX, 2, 4, false),
        0xAC => entry(LDY, Absolute, 3, 4, false),
        0xBC => entry(LDY, AbsoluteX, 3, 4, true),

        // LSR
        0x4A => entry(LSR, Accumulator, 1, 2, false),
        0x46 => entry(LSR, ZeroPage, 2, 5, false),
        0x56 => entry(LSR, ZeroPageX, 2, 6, false),
        0x4E => entry(LSR, Absolute, 3, 6, false),
        0x5E => entry(LSR, AbsoluteX, 3, 7, false),

        // NOP
        0xEA => entry(NOP, Implied, 1, 2, false),

        // ORA
        0x09 => entry(ORA, Immediate, 2, 2, false),
        0x05 => entry(ORA, ZeroPage, 2, 3, false),
        0x15 => entry(ORA, ZeroPageX, 2, 4, false),
        0x0D => entry(ORA, Absolute, 3, 4, false),
        0x1D => entry(ORA, AbsoluteX, 3, 4, true),
        0x19 => entry(ORA, AbsoluteY, 3, 4, true),
        0x01 => entry(ORA, IndirectX, 2, 6, false),
        0x11 => entry(ORA, IndirectY, 2, 5, true),

        // Register instructions
        0xAA => entry(TAX, Implied, 1, 2, false),
        0x8A => entry(TXA, Implied, 1, 2, false),
        0xCA => entry(DEX, Implied, 1, 2, false),
        0xE8 => entry(INX, Implied, 1, 2, false),
        0xA8 => entry(TAY, Implied, 1, 2, false),
        0x98 => entry(TYA, Implied, 1, 2, false),
        0x88 => entry(DEY, Implied, 1, 2, false),
        0xC8 => entry(INY, Implied, 1, 2, false),

        // ROL / ROR
        0x2A => entry(ROL, Accumulator, 1, 2, false),
        0x26 => entry(ROL, ZeroPage, 2, 5, false),
        0x36 => entry(ROL, ZeroPageX, 2, 6, false),
        0x2E => entry(ROL, Absolute, 3, 6, false),
        0x3E => entry(ROL, AbsoluteX, 3, 7, false),
        0x6A => entry(ROR, Accumulator, 1, 2, false),
        0x66 => entry(ROR, ZeroPage, 2, 5, false),
        0x76 => entry(ROR, ZeroPageX, 2, 6, false),
        0x6E => entry(ROR, Absolute, 3, 6, false),
        0x7E => entry(ROR, AbsoluteX, 3, 7, false),

        // Returns
        0x40 => entry(RTI, Implied, 1, 6, false),
        0x60 => entry(RTS, Implied, 1, 6, false),

        // SBC
        0xE9 => entry(SBC, Immediate, 2, 2, false),
        0xE5 => entry(SBC, ZeroPage, 2, 3, false),
        0xF5 => entry(SBC, ZeroPageX, 2, 4, false),
        0xED => entry(SBC, Absolute, 3, 4, false),
        0xFD => entry(SBC, AbsoluteX, 3, 4, true),
        0xF9 => entry(SBC, AbsoluteY, 3, 4, true),
        0xE1 => entry(SBC, IndirectX, 2, 6, false),
        0xF1 => entry(SBC, IndirectY, 2, 5, true),

        // STA / STX / STY (write-class: no page-cross bonus)
        0x85 => entry(STA, ZeroPage, 2, 3, false),
        0x95 => entry(STA, ZeroPageX, 2, 4, false),
        0x8D => entry(STA, Absolute, 3, 4, false),
        0x9D => entry(STA, AbsoluteX, 3, 5, false),
        0x99 => entry(STA, AbsoluteY, 3, 5, false),
        0x81 => entry(STA, IndirectX, 2, 6, false),
        0x91 => entry(STA, IndirectY, 2, 6, false),
        0x86 => entry(STX, ZeroPage, 2, 3, false),
        0x96 => entry(STX, ZeroPageY, 2, 4, false),
        0x8E => entry(STX, Absolute, 3, 4, false),
        0x84 => entry(STY, ZeroPage, 2, 3, false),
        0x94 => entry(STY, ZeroPageX, 2, 4, false),
        0x8C => entry(STY, Absolute, 3, 4, false),

        // Stack instructions
        0x9A => entry(TXS, Implied, 1, 2, false),
        0xBA => entry(TSX, Implied, 1, 2, false),
        0x48 => entry(PHA, Implied, 1, 3, false),
        0x68 => entry(PLA, Implied, 1, 4, false),
        0x08 => entry(PHP, Implied, 1, 3, false),
        0x28 => entry(PLP, Implied, 1, 4, false),

        _ => {
            eprintln!(" [WARN] Illegal/unofficial opcode ${opcode:02X}, treating as NOP");
            illegal()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_official_opcode() {
        let e = decode(0xA9);
        assert_eq!(e.mnemonic, Instruction::LDA);
        assert_eq!(e.mode, AddressingMode::Immediate);
        assert_eq!(e.size, 2);
        assert_eq!(e.base_cycles, 2);
    }

    #[test]
    fn decodes_illegal_opcode_as_nop() {
        let e = decode(0x02); // no official meaning
        assert_eq!(e.mnemonic, Instruction::NOP);
        assert_eq!(e.mode, AddressingMode::Implied);
        assert_eq!(e.size, 1);
        assert_eq!(e.base_cycles, 2);
        assert!(!e.page_cross_adds_cycle);
    }

    #[test]
    fn every_opcode_byte_decodes() {
        for opcode in 0u8..=255 {
            let _ = decode(opcode);
        }
    }

    #[test]
    fn read_class_indexed_modes_flag_page_cross() {
        assert!(decode(0xBD).page_cross_adds_cycle); // LDA AbsoluteX
        assert!(!decode(0x9D).page_cross_adds_cycle); // STA AbsoluteX (write-class)
    }
}
