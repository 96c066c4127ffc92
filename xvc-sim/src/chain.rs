//! A single simulated device on the JTAG chain.
//!
//! The device mimics the probing behaviour host tools expect from a 7 series FPGA:
//! it answers IDCODE after reset, captures a plausible status into the
//! instruction register and exposes the configuration and user registers.
//!
//! ```
//! use xvc_sim::{chain::Chain, tap::TapState};
//!
//! let mut chain = Chain::new();
//! // Test-Logic-Reset -> Run-Test/Idle -> Select-DR -> Capture-DR -> Shift-DR
//! for tms in [false, true, false, false] {
//!     chain.shift(tms, false);
//! }
//! assert_eq!(chain.state(), TapState::ShiftDr);
//!
//! let idcode = (0..32).fold(0u32, |acc, i| acc | (chain.shift(false, false) as u32) << i);
//! assert_eq!(idcode, 0x0364_c093);
//! ```
use std::collections::HashMap;

use xvc_protocol::bits;
use xvc_server::XvcBackend;

use crate::{
    instruction::{IR_LEN, Instruction},
    tap::TapState,
};

/// Identifier of an XC7K160T
pub const DEFAULT_IDCODE: u32 = 0x0364_c093;

/// Loaded into the instruction register on Capture-IR.
/// The low bits read `01` like on 7 series devices, which some host tools insist on.
pub const IR_CAPTURE: [bool; IR_LEN] = [false, true, false, false, false, true];

/// What happens to the data register on Update-DR.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum UpdatePolicy {
    /// Shifted data is discarded, the next Capture-DR reads the original content.
    #[default]
    Volatile,
    /// Shifted data replaces the register content.
    Persistent,
}

#[derive(Debug, Clone)]
pub struct ChainBuilder {
    idcode: u32,
    update_policy: UpdatePolicy,
}

impl Default for ChainBuilder {
    fn default() -> Self {
        ChainBuilder {
            idcode: DEFAULT_IDCODE,
            update_policy: UpdatePolicy::default(),
        }
    }
}

impl ChainBuilder {
    /// Set the value of the IDCODE register
    pub fn idcode(mut self, idcode: u32) -> Self {
        self.idcode = idcode;
        self
    }

    pub fn update_policy(mut self, policy: UpdatePolicy) -> Self {
        self.update_policy = policy;
        self
    }

    pub fn build(self) -> Chain {
        let registers = HashMap::from([
            (Instruction::Bypass, vec![true]),
            (Instruction::Idcode, bits::from_value(self.idcode.into(), 32)),
            (Instruction::CfgIn, vec![false; 16]),
            (Instruction::CfgOut, vec![false; 16]),
            // hw_server interrogates the user registers
            (Instruction::User1, vec![true]),
            (Instruction::User2, vec![true]),
            (Instruction::User3, vec![true]),
            (Instruction::User4, vec![true]),
        ]);
        let dr = registers[&Instruction::Idcode].clone();
        Chain {
            state: TapState::Reset,
            instruction: Instruction::Idcode,
            ir: IR_CAPTURE,
            dr,
            registers,
            update_policy: self.update_policy,
        }
    }
}

/// TAP controller, instruction register and data registers of the simulated device.
#[derive(Debug, Clone)]
pub struct Chain {
    state: TapState,
    instruction: Instruction,
    ir: [bool; IR_LEN],
    /// The data register selected by `instruction` as of the last Capture-DR
    dr: Vec<bool>,
    registers: HashMap<Instruction, Vec<bool>>,
    update_policy: UpdatePolicy,
}

impl Default for Chain {
    fn default() -> Self {
        Chain::new()
    }
}

impl Chain {
    pub fn new() -> Chain {
        ChainBuilder::default().build()
    }

    pub fn builder() -> ChainBuilder {
        ChainBuilder::default()
    }

    pub fn state(&self) -> TapState {
        self.state
    }

    pub fn instruction(&self) -> Instruction {
        self.instruction
    }

    /// The instruction register, MSB first
    pub fn ir(&self) -> &[bool] {
        &self.ir
    }

    /// The data register being shifted, MSB first
    pub fn dr(&self) -> &[bool] {
        &self.dr
    }

    /// Content that Capture-DR loads for `instruction`.
    /// Instructions without a register of their own select the bypass register.
    pub fn register(&self, instruction: Instruction) -> &[bool] {
        &self.registers[&self.register_for(instruction)]
    }

    fn register_for(&self, instruction: Instruction) -> Instruction {
        if self.registers.contains_key(&instruction) {
            instruction
        } else {
            Instruction::Bypass
        }
    }

    /// Clocks the device once and returns TDO.
    ///
    /// The action of the current state takes effect before the transition selected
    /// by `tms`. TDO reads high unless a register is being shifted.
    pub fn shift(&mut self, tms: bool, tdi: bool) -> bool {
        let mut tdo = true;
        match self.state {
            TapState::Reset => {
                self.instruction = Instruction::Idcode;
            }
            TapState::CaptureIr => {
                self.ir = IR_CAPTURE;
                log::trace!("Captured IR {:?}", self.ir);
            }
            TapState::CaptureDr => {
                self.dr = self.register(self.instruction).to_vec();
                log::debug!("Captured DR for {}: {:?}", self.instruction, self.dr);
            }
            TapState::ShiftIr => tdo = shift_register(&mut self.ir, tdi),
            TapState::ShiftDr => tdo = shift_register(&mut self.dr, tdi),
            TapState::UpdateIr => {
                self.instruction = Instruction::decode(&self.ir);
                log::info!("Instruction {}", self.instruction);
            }
            TapState::UpdateDr => {
                log::debug!("Update DR for {}: {:?}", self.instruction, self.dr);
                if self.update_policy == UpdatePolicy::Persistent {
                    let key = self.register_for(self.instruction);
                    self.registers.insert(key, self.dr.clone());
                }
            }
            _ => {}
        }
        self.state = self.state.next(tms);
        tdo
    }
}

/// Shifts `tdi` in at index 0 and returns the bit falling out of the last index.
fn shift_register(register: &mut [bool], tdi: bool) -> bool {
    let Some(&tdo) = register.last() else {
        return true;
    };
    register.rotate_right(1);
    register[0] = tdi;
    tdo
}

impl XvcBackend for Chain {
    fn set_tck(&mut self, period_ns: u32) -> u32 {
        log::info!("TCK period set to {} ns", period_ns);
        period_ns
    }

    fn shift(&mut self, num_bits: u32, tms: &[u8], tdi: &[u8]) -> Box<[u8]> {
        let num_bits = num_bits as usize;
        let mut tdo = vec![0u8; bits::byte_len(num_bits)].into_boxed_slice();
        log::debug!("Shifting {} bits from {}", num_bits, self.state);
        for i in 0..num_bits {
            if Chain::shift(self, bits::get(tms, i), bits::get(tdi, i)) {
                bits::set(&mut tdo, i);
            }
        }
        log::debug!("Shift ended in {}", self.state);
        tdo
    }
}
