//! Tagged operations. One variant per architectural instruction, except
//! the eight-way arithmetic/logic group, which shares a single
//! [`AluOp`] tag and a single flag-computation kernel (`flags::alu8`/
//! `flags::alu16`) rather than one handler per mnemonic per width — the
//! copy-paste explosion a literal opcode-per-handler port would produce.

/// The eight ops selectable by a Group-1 ModR/M `reg` field (0x80-0x83),
/// and also the eight primary two-operand arithmetic opcodes 0x00-0x3D.
/// Encoding order is the standard one: the `reg` field value *is* this
/// enum's discriminant.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum AluOp {
    Add, Or, Adc, Sbb, And, Sub, Xor, Cmp,
}

impl Into<AluOp> for u8 {
    fn into(self) -> AluOp {
        match self & 7 {
            0 => AluOp::Add,
            1 => AluOp::Or,
            2 => AluOp::Adc,
            3 => AluOp::Sbb,
            4 => AluOp::And,
            5 => AluOp::Sub,
            6 => AluOp::Xor,
            7 => AluOp::Cmp,
            _ => unreachable!(),
        }
    }
}

/// The standard 8086 Jcc condition table (spec section 4.6). Encoding
/// order is `0x70 + discriminant`.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Cond {
    O, No, B, Nb, Z, Nz, Be, A, S, Ns, Pe, Po, L, Ge, Le, G,
}

impl Into<Cond> for u8 {
    fn into(self) -> Cond {
        match self & 0xF {
            0x0 => Cond::O,
            0x1 => Cond::No,
            0x2 => Cond::B,
            0x3 => Cond::Nb,
            0x4 => Cond::Z,
            0x5 => Cond::Nz,
            0x6 => Cond::Be,
            0x7 => Cond::A,
            0x8 => Cond::S,
            0x9 => Cond::Ns,
            0xA => Cond::Pe,
            0xB => Cond::Po,
            0xC => Cond::L,
            0xD => Cond::Ge,
            0xE => Cond::Le,
            0xF => Cond::G,
            _ => unreachable!(),
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum RepeatMode {
    None,
    /// 0xF3 — REP on MOVS/STOS/LODS, REPE on CMPS/SCAS.
    Repe,
    /// 0xF2 — REPNE, only meaningful on CMPS/SCAS.
    Repne,
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Op {
    Alu(AluOp),
    Test,
    Mov,
    Push,
    Pop,
    Xchg,
    Lea,
    Lds,
    Les,
    Lahf,
    Sahf,
    Xlat,
    Cbw,
    Cwd,
    Inc,
    Dec,
    Daa,
    Das,
    Aaa,
    Aas,
    Aam,
    Aad,
    Movsb,
    Movsw,
    Lodsb,
    Lodsw,
    Stosb,
    Stosw,
    Cmpsb,
    Cmpsw,
    Scasb,
    Scasw,
    JmpShort,
    JmpNear,
    CallNear,
    RetNear,
    RetNearImm,
    Jcc(Cond),
    Loop,
    Loope,
    Loopne,
    Jcxz,
    Clc,
    Stc,
    Cmc,
    Cli,
    Sti,
    Cld,
    Std,
    Pushf,
    Popf,
    Nop,
    Hlt,
    /// decode fell through to an opcode this core does not implement —
    /// executes as the no-op spec section 4.6 mandates.
    Undefined,
}
