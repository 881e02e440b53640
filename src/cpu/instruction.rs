use crate::cpu::op::{Op, RepeatMode};
use crate::cpu::parameter::ParameterSet;
use crate::cpu::register::Segment;

/// A fully decoded instruction, ready for `Cpu::execute`. The decoder
/// fetches everything the handler needs (ModR/M, displacement,
/// immediate) up front; handlers never touch `IP` themselves.
#[derive(Clone, Debug, PartialEq)]
pub struct Instruction {
    pub op: Op,
    pub params: ParameterSet,
    /// total length in bytes, prefixes included — used only for
    /// diagnostics; IP advancement is driven by the decoder consuming
    /// bytes as it goes, not by re-deriving it from this field.
    pub length: u8,
    pub segment_override: Option<Segment>,
    pub repeat: RepeatMode,
}

impl Instruction {
    pub fn new(op: Op, params: ParameterSet, length: u8) -> Self {
        Instruction { op, params, length, segment_override: None, repeat: RepeatMode::None }
    }
}
