//! Typed names for the encodings the ISA bakes into opcode and ModR/M
//! bytes. These are thin wrappers over the indices `Bus` already accepts —
//! their only job is to make decoder and handler code read like the
//! instruction set instead of a pile of raw integers.

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum R8 {
    AL, CL, DL, BL, AH, CH, DH, BH,
}

impl Into<R8> for u8 {
    fn into(self) -> R8 {
        match self & 7 {
            0 => R8::AL,
            1 => R8::CL,
            2 => R8::DL,
            3 => R8::BL,
            4 => R8::AH,
            5 => R8::CH,
            6 => R8::DH,
            7 => R8::BH,
            _ => unreachable!(),
        }
    }
}

impl R8 {
    pub fn index(self) -> usize {
        match self {
            R8::AL => 0, R8::CL => 1, R8::DL => 2, R8::BL => 3,
            R8::AH => 4, R8::CH => 5, R8::DH => 6, R8::BH => 7,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum R16 {
    AX, CX, DX, BX, SP, BP, SI, DI,
}

impl Into<R16> for u8 {
    fn into(self) -> R16 {
        match self & 7 {
            0 => R16::AX,
            1 => R16::CX,
            2 => R16::DX,
            3 => R16::BX,
            4 => R16::SP,
            5 => R16::BP,
            6 => R16::SI,
            7 => R16::DI,
            _ => unreachable!(),
        }
    }
}

impl R16 {
    pub fn index(self) -> usize {
        match self {
            R16::AX => 0, R16::CX => 1, R16::DX => 2, R16::BX => 3,
            R16::SP => 4, R16::BP => 5, R16::SI => 6, R16::DI => 7,
        }
    }
}

/// The four real-mode segment registers. FS/GS do not exist on the 8086.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Segment {
    ES, CS, SS, DS,
}

impl Into<Segment> for u8 {
    fn into(self) -> Segment {
        match self & 3 {
            0 => Segment::ES,
            1 => Segment::CS,
            2 => Segment::SS,
            3 => Segment::DS,
            _ => unreachable!(),
        }
    }
}

impl Segment {
    pub fn index(self) -> usize {
        match self {
            Segment::ES => 0, Segment::CS => 1, Segment::SS => 2, Segment::DS => 3,
        }
    }
}

/// rm base-expression, mod != 11 (spec section 4.4). The mod=00/rm=6
/// "direct address" special case is handled by the addressing unit, not
/// folded into this table.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum AMode {
    BxSi, BxDi, BpSi, BpDi, Si, Di, Bp, Bx,
}

impl Into<AMode> for u8 {
    fn into(self) -> AMode {
        match self & 7 {
            0 => AMode::BxSi,
            1 => AMode::BxDi,
            2 => AMode::BpSi,
            3 => AMode::BpDi,
            4 => AMode::Si,
            5 => AMode::Di,
            6 => AMode::Bp,
            7 => AMode::Bx,
            _ => unreachable!(),
        }
    }
}

impl AMode {
    /// true if this rm form defaults to the SS segment rather than DS.
    pub fn defaults_to_ss(self) -> bool {
        matches!(self, AMode::BpSi | AMode::BpDi | AMode::Bp)
    }
}
