//! Instruction set of the simulated device.
//!
//! Opcodes follow the 6 bit instruction register of the 7 series devices (UG470).
use std::fmt::Display;

use xvc_protocol::bits;

/// Length of the instruction register in bits
pub const IR_LEN: usize = 6;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Instruction {
    Extest,
    Sample,
    User1,
    User2,
    User3,
    User4,
    CfgIn,
    CfgOut,
    Idcode,
    Jprogram,
    Jstart,
    Jshutdown,
    IscEnable,
    IscProgram,
    IscNoop,
    IscDisable,
    Bypass,
}

impl Instruction {
    pub const ALL: [Instruction; 17] = [
        Instruction::Extest,
        Instruction::Sample,
        Instruction::User1,
        Instruction::User2,
        Instruction::User3,
        Instruction::User4,
        Instruction::CfgIn,
        Instruction::CfgOut,
        Instruction::Idcode,
        Instruction::Jprogram,
        Instruction::Jstart,
        Instruction::Jshutdown,
        Instruction::IscEnable,
        Instruction::IscProgram,
        Instruction::IscNoop,
        Instruction::IscDisable,
        Instruction::Bypass,
    ];

    pub const fn opcode(self) -> u8 {
        match self {
            Instruction::Extest => 0b10_0110,
            Instruction::Sample => 0b00_0001,
            Instruction::User1 => 0b00_0010,
            Instruction::User2 => 0b00_0011,
            Instruction::User3 => 0b10_0010,
            Instruction::User4 => 0b10_0011,
            Instruction::CfgIn => 0b00_0101,
            Instruction::CfgOut => 0b00_0100,
            Instruction::Idcode => 0b00_1001,
            Instruction::Jprogram => 0b00_1011,
            Instruction::Jstart => 0b00_1100,
            Instruction::Jshutdown => 0b00_1101,
            Instruction::IscEnable => 0b01_0000,
            Instruction::IscProgram => 0b01_0001,
            Instruction::IscNoop => 0b01_0100,
            Instruction::IscDisable => 0b01_0110,
            Instruction::Bypass => 0b11_1111,
        }
    }

    /// The opcode as it sits in the instruction register, MSB first.
    pub const fn bits(self) -> [bool; IR_LEN] {
        let opcode = self.opcode();
        let mut bits = [false; IR_LEN];
        let mut i = 0;
        while i < IR_LEN {
            bits[i] = opcode & (1 << (IR_LEN - 1 - i)) != 0;
            i += 1;
        }
        bits
    }

    pub fn from_opcode(opcode: u8) -> Option<Instruction> {
        Instruction::ALL
            .into_iter()
            .find(|instruction| instruction.opcode() == opcode)
    }

    /// Decodes the content of the instruction register.
    /// Unknown opcodes select [Instruction::Bypass].
    pub fn decode(ir: &[bool]) -> Instruction {
        let known = if ir.len() == IR_LEN {
            Instruction::from_opcode(bits::to_value(ir) as u8)
        } else {
            None
        };
        known.unwrap_or_else(|| {
            log::warn!("Unknown instruction {:?}, selecting BYPASS", ir);
            Instruction::Bypass
        })
    }
}

impl Display for Instruction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Instruction::Extest => "EXTEST",
            Instruction::Sample => "SAMPLE",
            Instruction::User1 => "USER1",
            Instruction::User2 => "USER2",
            Instruction::User3 => "USER3",
            Instruction::User4 => "USER4",
            Instruction::CfgIn => "CFG_IN",
            Instruction::CfgOut => "CFG_OUT",
            Instruction::Idcode => "IDCODE",
            Instruction::Jprogram => "JPROGRAM",
            Instruction::Jstart => "JSTART",
            Instruction::Jshutdown => "JSHUTDOWN",
            Instruction::IscEnable => "ISC_ENABLE",
            Instruction::IscProgram => "ISC_PROGRAM",
            Instruction::IscNoop => "ISC_NOOP",
            Instruction::IscDisable => "ISC_DISABLE",
            Instruction::Bypass => "BYPASS",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn opcodes_are_distinct_and_fit() {
        for (i, a) in Instruction::ALL.iter().enumerate() {
            assert!(a.opcode() < 1 << IR_LEN, "{} is too wide", a);
            for b in &Instruction::ALL[i + 1..] {
                assert_ne!(a.opcode(), b.opcode(), "{} and {} collide", a, b);
            }
        }
    }

    #[test]
    fn bits_are_msb_first() {
        assert_eq!(
            Instruction::Idcode.bits().to_vec(),
            bits::from_literal("00 1001").unwrap()
        );
        assert_eq!(
            Instruction::Extest.bits().to_vec(),
            bits::from_literal("10 0110").unwrap()
        );
    }

    #[test]
    fn decodes_every_instruction() {
        for instruction in Instruction::ALL {
            assert_eq!(Instruction::decode(&instruction.bits()), instruction);
        }
    }

    #[test]
    fn unknown_patterns_decode_to_bypass() {
        let mut unknown = 0;
        for opcode in 0..1u8 << IR_LEN {
            if Instruction::from_opcode(opcode).is_none() {
                let ir = bits::from_value(u64::from(opcode), IR_LEN);
                assert_eq!(Instruction::decode(&ir), Instruction::Bypass);
                unknown += 1;
            }
        }
        assert_eq!(unknown, 64 - Instruction::ALL.len());
        assert_eq!(Instruction::decode(&[true, false]), Instruction::Bypass);
    }
}
