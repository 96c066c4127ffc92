//! The IEEE 1149.1 TAP controller state machine.
//!
//! Transitions happen on every rising TCK edge and depend only on the current
//! state and the sampled TMS value.
use std::fmt::Display;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum TapState {
    /// Test-Logic-Reset
    Reset,
    /// Run-Test/Idle
    Idle,
    SelectDr,
    SelectIr,
    CaptureDr,
    CaptureIr,
    ShiftDr,
    ShiftIr,
    Exit1Dr,
    Exit1Ir,
    PauseDr,
    PauseIr,
    Exit2Dr,
    Exit2Ir,
    UpdateDr,
    UpdateIr,
}

impl TapState {
    pub const ALL: [TapState; 16] = [
        TapState::Reset,
        TapState::Idle,
        TapState::SelectDr,
        TapState::SelectIr,
        TapState::CaptureDr,
        TapState::CaptureIr,
        TapState::ShiftDr,
        TapState::ShiftIr,
        TapState::Exit1Dr,
        TapState::Exit1Ir,
        TapState::PauseDr,
        TapState::PauseIr,
        TapState::Exit2Dr,
        TapState::Exit2Ir,
        TapState::UpdateDr,
        TapState::UpdateIr,
    ];

    /// The states following `self` for TMS low (index 0) and TMS high (index 1).
    pub const fn successors(self) -> [TapState; 2] {
        use TapState::*;
        match self {
            Reset => [Idle, Reset],
            Idle => [Idle, SelectDr],
            SelectDr => [CaptureDr, SelectIr],
            SelectIr => [CaptureIr, Reset],
            CaptureDr => [ShiftDr, Exit1Dr],
            CaptureIr => [ShiftIr, Exit1Ir],
            ShiftDr => [ShiftDr, Exit1Dr],
            ShiftIr => [ShiftIr, Exit1Ir],
            Exit1Dr => [PauseDr, UpdateDr],
            Exit1Ir => [PauseIr, UpdateIr],
            PauseDr => [PauseDr, Exit2Dr],
            PauseIr => [PauseIr, Exit2Ir],
            Exit2Dr => [ShiftDr, UpdateDr],
            Exit2Ir => [ShiftIr, UpdateIr],
            UpdateDr => [Idle, SelectDr],
            UpdateIr => [Idle, SelectDr],
        }
    }

    /// The state after one TCK edge with the given TMS value.
    pub const fn next(self, tms: bool) -> TapState {
        self.successors()[tms as usize]
    }
}

impl Display for TapState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            TapState::Reset => "Test-Logic-Reset",
            TapState::Idle => "Run-Test/Idle",
            TapState::SelectDr => "Select-DR-Scan",
            TapState::SelectIr => "Select-IR-Scan",
            TapState::CaptureDr => "Capture-DR",
            TapState::CaptureIr => "Capture-IR",
            TapState::ShiftDr => "Shift-DR",
            TapState::ShiftIr => "Shift-IR",
            TapState::Exit1Dr => "Exit1-DR",
            TapState::Exit1Ir => "Exit1-IR",
            TapState::PauseDr => "Pause-DR",
            TapState::PauseIr => "Pause-IR",
            TapState::Exit2Dr => "Exit2-DR",
            TapState::Exit2Ir => "Exit2-IR",
            TapState::UpdateDr => "Update-DR",
            TapState::UpdateIr => "Update-IR",
        };
        f.write_str(name)
    }
}
