//! The addressing unit (spec section 4.4) and the logical read/write
//! layer (spec section 4.5): ModR/M parsing, effective-address
//! computation under the segment-override regime, and the `mod == 3`
//! register-vs-memory dispatch that every rm operand goes through.

use crate::cpu::flags::Width;
use crate::cpu::parameter::Parameter;
use crate::cpu::register::{AMode, Segment, R16};
use crate::cpu::Cpu;

/// Decoded ModR/M byte: the three fields spec section 4.4 names.
#[derive(Copy, Clone, Debug)]
pub(crate) struct ModRm {
    pub md: u8,
    pub reg: u8,
    pub rm: u8,
}

impl Cpu {
    pub(crate) fn fetch_modrm(&mut self) -> ModRm {
        let b = self.fetch_u8();
        ModRm { md: (b >> 6) & 3, reg: (b >> 3) & 7, rm: b & 7 }
    }

    /// base register expression value for a non-direct rm memory form.
    fn amode_offset(&self, amode: AMode) -> u16 {
        let bx = self.bus.gen16_get(R16::BX.index());
        let si = self.bus.gen16_get(R16::SI.index());
        let di = self.bus.gen16_get(R16::DI.index());
        let bp = self.bus.gen16_get(R16::BP.index());
        match amode {
            AMode::BxSi => bx.wrapping_add(si),
            AMode::BxDi => bx.wrapping_add(di),
            AMode::BpSi => bp.wrapping_add(si),
            AMode::BpDi => bp.wrapping_add(di),
            AMode::Si => si,
            AMode::Di => di,
            AMode::Bp => bp,
            AMode::Bx => bx,
        }
    }

    /// the default segment for an rm memory form, with the one-instruction
    /// segment-override prefix taking priority (spec section 4.4).
    fn mem_default_segment(&self, amode: AMode) -> Segment {
        self.segment_override.unwrap_or(if amode.defaults_to_ss() { Segment::SS } else { Segment::DS })
    }

    fn direct_segment(&self) -> Segment {
        self.segment_override.unwrap_or(Segment::DS)
    }

    /// rm8 operand: register when `md == 3`, otherwise a memory form,
    /// fetching whatever displacement bytes the `md`/`rm` pair implies.
    pub(crate) fn rm8(&mut self, m: ModRm) -> Parameter {
        if m.md == 3 {
            return Parameter::Reg8(m.rm.into());
        }
        if m.md == 0 && m.rm == 6 {
            let off = self.fetch_u16();
            return Parameter::Ptr8(self.direct_segment(), off);
        }
        let amode: AMode = m.rm.into();
        let seg = self.mem_default_segment(amode);
        match m.md {
            0 => Parameter::Ptr8Amode(seg, amode),
            1 => {
                let d = self.fetch_s8();
                Parameter::Ptr8AmodeS8(seg, amode, d)
            }
            2 => {
                let d = self.fetch_s16();
                Parameter::Ptr8AmodeS16(seg, amode, d)
            }
            _ => unreachable!(),
        }
    }

    /// rm16 operand: the 16-bit counterpart of [`Cpu::rm8`].
    pub(crate) fn rm16(&mut self, m: ModRm) -> Parameter {
        if m.md == 3 {
            return Parameter::Reg16(m.rm.into());
        }
        if m.md == 0 && m.rm == 6 {
            let off = self.fetch_u16();
            return Parameter::Ptr16(self.direct_segment(), off);
        }
        let amode: AMode = m.rm.into();
        let seg = self.mem_default_segment(amode);
        match m.md {
            0 => Parameter::Ptr16Amode(seg, amode),
            1 => {
                let d = self.fetch_s8();
                Parameter::Ptr16AmodeS8(seg, amode, d)
            }
            2 => {
                let d = self.fetch_s16();
                Parameter::Ptr16AmodeS16(seg, amode, d)
            }
            _ => unreachable!(),
        }
    }

    /// resolves any memory-form [`Parameter`] to (segment, offset); the
    /// amode forms re-derive the offset from current register values,
    /// which is safe because nothing a handler reads can change the base
    /// registers before the read happens (spec section 5: "within an
    /// instruction, all reads happen before all writes").
    fn effective_offset(&self, p: Parameter) -> (Segment, u16) {
        match p {
            Parameter::Ptr8(seg, off) | Parameter::Ptr16(seg, off) => (seg, off),
            Parameter::Ptr8Amode(seg, a) | Parameter::Ptr16Amode(seg, a) => (seg, self.amode_offset(a)),
            Parameter::Ptr8AmodeS8(seg, a, d) | Parameter::Ptr16AmodeS8(seg, a, d) => {
                (seg, self.amode_offset(a).wrapping_add(d as i16 as u16))
            }
            Parameter::Ptr8AmodeS16(seg, a, d) | Parameter::Ptr16AmodeS16(seg, a, d) => {
                (seg, self.amode_offset(a).wrapping_add(d as u16))
            }
            _ => unreachable!("not a memory operand: {:?}", p),
        }
    }

    /// the offset component only, used by LEA which never touches memory.
    pub(crate) fn effective_offset_only(&self, p: Parameter) -> u16 {
        self.effective_offset(p).1
    }

    pub(crate) fn read8(&self, p: Parameter) -> u8 {
        match p {
            Parameter::Reg8(r) => self.bus.gen8_get(r.index()),
            Parameter::Imm8(v) => v,
            Parameter::ImmS8(v) => v as u8,
            _ => {
                let (seg, off) = self.effective_offset(p);
                self.bus.mem_read8(self.bus.seg_get(seg.index()), off)
            }
        }
    }

    pub(crate) fn write8(&mut self, p: Parameter, v: u8) {
        match p {
            Parameter::Reg8(r) => self.bus.gen8_set(r.index(), v),
            _ => {
                let (seg, off) = self.effective_offset(p);
                let segv = self.bus.seg_get(seg.index());
                self.bus.mem_write8(segv, off, v);
            }
        }
    }

    pub(crate) fn read16(&self, p: Parameter) -> u16 {
        match p {
            Parameter::Reg16(r) => self.bus.gen16_get(r.index()),
            Parameter::SReg(s) => self.bus.seg_get(s.index()),
            Parameter::Imm16(v) => v,
            Parameter::ImmS8(v) => v as i16 as u16,
            _ => {
                let (seg, off) = self.effective_offset(p);
                self.bus.mem_read16(self.bus.seg_get(seg.index()), off)
            }
        }
    }

    pub(crate) fn write16(&mut self, p: Parameter, v: u16) {
        match p {
            Parameter::Reg16(r) => self.bus.gen16_set(r.index(), v),
            Parameter::SReg(s) => self.bus.seg_set(s.index(), v),
            _ => {
                let (seg, off) = self.effective_offset(p);
                let segv = self.bus.seg_get(seg.index());
                self.bus.mem_write16(segv, off, v);
            }
        }
    }

    /// width of an ALU/MOV/XCHG operation, read off its destination
    /// operand (the only place it is unambiguous).
    pub(crate) fn width_of(p: Parameter) -> Width {
        match p {
            Parameter::Reg8(_) | Parameter::Ptr8(_, _) | Parameter::Ptr8Amode(_, _)
            | Parameter::Ptr8AmodeS8(_, _, _) | Parameter::Ptr8AmodeS16(_, _, _) => Width::W8,
            _ => Width::W16,
        }
    }
}
