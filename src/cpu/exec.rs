//! Execute half of the dispatch core plus the opcode handlers (spec
//! sections 4.6/4.7): one short composition of the register file,
//! memory bus, ALU flag engine and logical read/write layer per
//! architectural instruction.

use crate::cpu::flags::{self, Width};
use crate::cpu::op::{AluOp, Cond, Op, RepeatMode};
use crate::cpu::parameter::Parameter;
use crate::cpu::register::{Segment, R16, R8};
use crate::cpu::{Cpu, Instruction};

impl Cpu {
    pub(crate) fn exec(&mut self, instr: &Instruction) {
        match instr.op {
            Op::Alu(op) => self.exec_alu(op, instr.params.dst, instr.params.src),
            Op::Test => self.exec_test(instr.params.dst, instr.params.src),
            Op::Mov => {
                let width = Cpu::width_of(instr.params.dst);
                match width {
                    Width::W8 => {
                        let v = self.read8(instr.params.src);
                        self.write8(instr.params.dst, v);
                    }
                    Width::W16 => {
                        let v = self.read16(instr.params.src);
                        self.write16(instr.params.dst, v);
                    }
                }
            }
            Op::Push => {
                let v = self.read16(instr.params.dst);
                self.push16(v);
            }
            Op::Pop => {
                let v = self.pop16();
                self.write16(instr.params.dst, v);
            }
            Op::Xchg => self.exec_xchg(instr.params.dst, instr.params.src),
            Op::Lea => {
                if !instr.params.src.is_none() {
                    let off = self.effective_offset_only(instr.params.src);
                    self.write16(instr.params.dst, off);
                }
            }
            Op::Lds => self.exec_load_far_ptr(instr.params.dst, instr.params.src, Segment::DS),
            Op::Les => self.exec_load_far_ptr(instr.params.dst, instr.params.src, Segment::ES),
            Op::Lahf => {
                let lo = (self.bus.flags_u16() & 0xFF) as u8;
                self.bus.gen8_set(R8::AH.index(), lo);
            }
            Op::Sahf => {
                let ah = self.bus.gen8_get(R8::AH.index());
                let cur = self.bus.flags_u16();
                self.bus.set_flags_u16((cur & 0xFF00) | u16::from(ah));
            }
            Op::Xlat => {
                let bx = self.bus.gen16_get(R16::BX.index());
                let al = self.bus.gen8_get(R8::AL.index());
                let seg = instr.segment_override.unwrap_or(Segment::DS);
                let off = bx.wrapping_add(u16::from(al));
                let v = self.bus.mem_read8(self.bus.seg_get(seg.index()), off);
                self.bus.gen8_set(R8::AL.index(), v);
            }
            Op::Cbw => {
                let al = self.bus.gen8_get(R8::AL.index()) as i8;
                self.bus.gen16_set(R16::AX.index(), al as i16 as u16);
            }
            Op::Cwd => {
                let ax = self.bus.gen16_get(R16::AX.index()) as i16;
                let dx = if ax < 0 { 0xFFFF } else { 0x0000 };
                self.bus.gen16_set(R16::DX.index(), dx);
            }
            Op::Inc => self.exec_inc_dec(instr.params.dst, false),
            Op::Dec => self.exec_inc_dec(instr.params.dst, true),
            Op::Daa => self.exec_daa(),
            Op::Das => self.exec_das(),
            Op::Aaa => self.exec_aaa(),
            Op::Aas => self.exec_aas(),
            Op::Aam => self.exec_aam(instr.params.dst),
            Op::Aad => self.exec_aad(instr.params.dst),
            Op::Movsb => self.exec_movs(Width::W8, instr.repeat, instr.segment_override),
            Op::Movsw => self.exec_movs(Width::W16, instr.repeat, instr.segment_override),
            Op::Lodsb => self.exec_lods(Width::W8, instr.repeat, instr.segment_override),
            Op::Lodsw => self.exec_lods(Width::W16, instr.repeat, instr.segment_override),
            Op::Stosb => self.exec_stos(Width::W8, instr.repeat),
            Op::Stosw => self.exec_stos(Width::W16, instr.repeat),
            Op::Cmpsb => self.exec_cmps(Width::W8, instr.repeat, instr.segment_override),
            Op::Cmpsw => self.exec_cmps(Width::W16, instr.repeat, instr.segment_override),
            Op::Scasb => self.exec_scas(Width::W8, instr.repeat),
            Op::Scasw => self.exec_scas(Width::W16, instr.repeat),
            Op::JmpShort | Op::JmpNear => {
                self.ip = self.jump_target(instr.params.dst);
            }
            Op::CallNear => {
                let ret = self.ip;
                self.ip = self.jump_target(instr.params.dst);
                self.push16(ret);
            }
            Op::RetNear => {
                self.ip = self.pop16();
            }
            Op::RetNearImm => {
                let ip = self.pop16();
                self.ip = ip;
                let imm = self.read16(instr.params.dst);
                let sp_idx = R16::SP.index();
                let sp = self.bus.gen16_get(sp_idx).wrapping_add(imm);
                self.bus.gen16_set(sp_idx, sp);
            }
            Op::Jcc(cond) => {
                if self.cond_holds(cond) {
                    self.ip = self.jump_target(instr.params.dst);
                }
            }
            Op::Loop => self.exec_loop(instr.params.dst, |_| true),
            Op::Loope => self.exec_loop(instr.params.dst, |cpu| cpu.bus.flag_get(6)),
            Op::Loopne => self.exec_loop(instr.params.dst, |cpu| !cpu.bus.flag_get(6)),
            Op::Jcxz => {
                if self.bus.gen16_get(R16::CX.index()) == 0 {
                    self.ip = self.jump_target(instr.params.dst);
                }
            }
            Op::Clc => self.bus.flag_set(0, false),
            Op::Stc => self.bus.flag_set(0, true),
            Op::Cmc => {
                let cf = self.bus.flag_get(0);
                self.bus.flag_set(0, !cf);
            }
            Op::Cli => self.bus.flag_set(9, false),
            Op::Sti => self.bus.flag_set(9, true),
            Op::Cld => self.bus.flag_set(10, false),
            Op::Std => self.bus.flag_set(10, true),
            Op::Pushf => {
                let v = self.bus.flags_u16();
                self.push16(v);
            }
            Op::Popf => {
                let v = self.pop16();
                self.bus.set_flags_u16(v);
            }
            Op::Nop | Op::Undefined => {}
            Op::Hlt => self.halted = true,
        }
    }

    fn jump_target(&self, p: Parameter) -> u16 {
        match p {
            Parameter::ImmS8(d) => self.ip.wrapping_add(d as i16 as u16),
            Parameter::Imm16(d) => self.ip.wrapping_add(d),
            _ => unreachable!("jump target must be an immediate displacement"),
        }
    }

    fn exec_alu(&mut self, op: AluOp, dst: Parameter, src: Parameter) {
        let width = Cpu::width_of(dst);
        let (d, s) = match width {
            Width::W8 => (u32::from(self.read8(dst)), u32::from(self.read8(src))),
            Width::W16 => (u32::from(self.read16(dst)), u32::from(self.read16(src))),
        };
        let r = flags::compute(&mut self.bus, width, op, d, s);
        if op != AluOp::Cmp {
            match width {
                Width::W8 => self.write8(dst, r as u8),
                Width::W16 => self.write16(dst, r as u16),
            }
        }
    }

    fn exec_test(&mut self, dst: Parameter, src: Parameter) {
        let width = Cpu::width_of(dst);
        let (d, s) = match width {
            Width::W8 => (u32::from(self.read8(dst)), u32::from(self.read8(src))),
            Width::W16 => (u32::from(self.read16(dst)), u32::from(self.read16(src))),
        };
        flags::compute(&mut self.bus, width, AluOp::And, d, s);
    }

    fn exec_xchg(&mut self, dst: Parameter, src: Parameter) {
        let width = Cpu::width_of(dst);
        match width {
            Width::W8 => {
                let d = self.read8(dst);
                let s = self.read8(src);
                self.write8(dst, s);
                self.write8(src, d);
            }
            Width::W16 => {
                let d = self.read16(dst);
                let s = self.read16(src);
                self.write16(dst, s);
                self.write16(src, d);
            }
        }
    }

    fn exec_inc_dec(&mut self, dst: Parameter, is_dec: bool) {
        let d = u32::from(self.read16(dst));
        let r = flags::inc_dec(&mut self.bus, Width::W16, is_dec, d);
        self.write16(dst, r as u16);
    }

    /// LDS/LES: loads a 16-bit offset and a segment selector from a
    /// 32-bit memory pointer; a `mod == 3` encoding has no memory form
    /// to read from and is a benign no-op (spec section 4.7).
    fn exec_load_far_ptr(&mut self, dst: Parameter, src: Parameter, seg_reg: Segment) {
        if src.is_none() {
            return;
        }
        let seg = self.src_segment(src);
        let off = self.effective_offset_only(src);
        let base = self.bus.seg_get(seg.index());
        let offset_val = self.bus.mem_read16(base, off);
        let selector = self.bus.mem_read16(base, off.wrapping_add(2));
        self.write16(dst, offset_val);
        self.bus.seg_set(seg_reg.index(), selector);
    }

    fn src_segment(&self, p: Parameter) -> Segment {
        match p {
            Parameter::Ptr8(seg, _)
            | Parameter::Ptr16(seg, _)
            | Parameter::Ptr8Amode(seg, _)
            | Parameter::Ptr16Amode(seg, _)
            | Parameter::Ptr8AmodeS8(seg, _, _)
            | Parameter::Ptr16AmodeS8(seg, _, _)
            | Parameter::Ptr8AmodeS16(seg, _, _)
            | Parameter::Ptr16AmodeS16(seg, _, _) => seg,
            _ => Segment::DS,
        }
    }

    fn cond_holds(&self, cond: Cond) -> bool {
        let cf = self.bus.flag_get(0);
        let pf = self.bus.flag_get(2);
        let zf = self.bus.flag_get(6);
        let sf = self.bus.flag_get(7);
        let of = self.bus.flag_get(11);
        match cond {
            Cond::O => of,
            Cond::No => !of,
            Cond::B => cf,
            Cond::Nb => !cf,
            Cond::Z => zf,
            Cond::Nz => !zf,
            Cond::Be => cf || zf,
            Cond::A => !cf && !zf,
            Cond::S => sf,
            Cond::Ns => !sf,
            Cond::Pe => pf,
            Cond::Po => !pf,
            Cond::L => sf != of,
            Cond::Ge => sf == of,
            Cond::Le => zf || (sf != of),
            Cond::G => !zf && (sf == of),
        }
    }

    fn exec_loop(&mut self, dst: Parameter, cond: impl Fn(&Cpu) -> bool) {
        let cx_idx = R16::CX.index();
        let cx = self.bus.gen16_get(cx_idx).wrapping_sub(1);
        self.bus.gen16_set(cx_idx, cx);
        if cx != 0 && cond(self) {
            self.ip = self.jump_target(dst);
        }
    }

    // ---- BCD adjust family (spec section 4.6) ----

    fn exec_daa(&mut self) {
        let mut al = self.bus.gen8_get(R8::AL.index());
        let mut cf = self.bus.flag_get(0);
        let af = self.bus.flag_get(4);
        if (al & 0x0F) > 9 || af {
            al = al.wrapping_add(6);
            self.bus.flag_set(4, true);
        } else {
            self.bus.flag_set(4, false);
        }
        if al > 0x9F || cf {
            al = al.wrapping_add(0x60);
            cf = true;
        }
        self.bus.flag_set(0, cf);
        self.bus.gen8_set(R8::AL.index(), al);
        flags::set_szp(&mut self.bus, Width::W8, u32::from(al));
    }

    fn exec_das(&mut self) {
        let mut al = self.bus.gen8_get(R8::AL.index());
        let mut cf = self.bus.flag_get(0);
        let af = self.bus.flag_get(4);
        if (al & 0x0F) > 9 || af {
            al = al.wrapping_sub(6);
            self.bus.flag_set(4, true);
        } else {
            self.bus.flag_set(4, false);
        }
        if al > 0x9F || cf {
            al = al.wrapping_sub(0x60);
            cf = true;
        }
        self.bus.flag_set(0, cf);
        self.bus.gen8_set(R8::AL.index(), al);
        flags::set_szp(&mut self.bus, Width::W8, u32::from(al));
    }

    fn exec_aaa(&mut self) {
        let al = self.bus.gen8_get(R8::AL.index());
        let af = self.bus.flag_get(4);
        if (al & 0x0F) > 9 || af {
            let ah = self.bus.gen8_get(R8::AH.index());
            self.bus.gen8_set(R8::AH.index(), ah.wrapping_add(1));
            self.bus.gen8_set(R8::AL.index(), al.wrapping_add(6) & 0x0F);
            self.bus.flag_set(4, true);
            self.bus.flag_set(0, true);
        } else {
            self.bus.gen8_set(R8::AL.index(), al & 0x0F);
            self.bus.flag_set(4, false);
            self.bus.flag_set(0, false);
        }
    }

    fn exec_aas(&mut self) {
        let al = self.bus.gen8_get(R8::AL.index());
        let af = self.bus.flag_get(4);
        if (al & 0x0F) > 9 || af {
            let ah = self.bus.gen8_get(R8::AH.index());
            self.bus.gen8_set(R8::AH.index(), ah.wrapping_sub(1));
            self.bus.gen8_set(R8::AL.index(), al.wrapping_sub(6) & 0x0F);
            self.bus.flag_set(4, true);
            self.bus.flag_set(0, true);
        } else {
            self.bus.gen8_set(R8::AL.index(), al & 0x0F);
            self.bus.flag_set(4, false);
            self.bus.flag_set(0, false);
        }
    }

    fn exec_aam(&mut self, base_param: Parameter) {
        let base = self.read8(base_param);
        if base == 0 {
            // real hardware raises #DE; divide-by-zero trapping is out
            // of this core's scope (spec section 1), so this is a no-op.
            return;
        }
        let al = self.bus.gen8_get(R8::AL.index());
        let ah = al / base;
        let al = al % base;
        self.bus.gen8_set(R8::AH.index(), ah);
        self.bus.gen8_set(R8::AL.index(), al);
        flags::set_szp(&mut self.bus, Width::W8, u32::from(al));
    }

    fn exec_aad(&mut self, base_param: Parameter) {
        let base = self.read8(base_param);
        let al = self.bus.gen8_get(R8::AL.index());
        let ah = self.bus.gen8_get(R8::AH.index());
        let al = al.wrapping_add(ah.wrapping_mul(base));
        self.bus.gen8_set(R8::AL.index(), al);
        self.bus.gen8_set(R8::AH.index(), 0);
        flags::set_szp(&mut self.bus, Width::W8, u32::from(al));
    }

    // ---- string operations (spec section 4.7 of SPEC_FULL.md) ----

    fn si_di_step(&self, width: Width) -> u16 {
        let step: u16 = match width {
            Width::W8 => 1,
            Width::W16 => 2,
        };
        if self.bus.flag_get(10) {
            step.wrapping_neg()
        } else {
            step
        }
    }

    fn exec_movs(&mut self, width: Width, repeat: RepeatMode, segment_override: Option<Segment>) {
        let step = self.si_di_step(width);
        let src_seg = segment_override.unwrap_or(Segment::DS);
        loop {
            if repeat != RepeatMode::None && self.bus.gen16_get(R16::CX.index()) == 0 {
                break;
            }
            let si = self.bus.gen16_get(R16::SI.index());
            let di = self.bus.gen16_get(R16::DI.index());
            let src_base = self.bus.seg_get(src_seg.index());
            let dst_base = self.bus.seg_get(Segment::ES.index());
            match width {
                Width::W8 => {
                    let v = self.bus.mem_read8(src_base, si);
                    self.bus.mem_write8(dst_base, di, v);
                }
                Width::W16 => {
                    let v = self.bus.mem_read16(src_base, si);
                    self.bus.mem_write16(dst_base, di, v);
                }
            }
            self.bus.gen16_set(R16::SI.index(), si.wrapping_add(step));
            self.bus.gen16_set(R16::DI.index(), di.wrapping_add(step));
            if repeat == RepeatMode::None {
                break;
            }
            let cx = self.bus.gen16_get(R16::CX.index()).wrapping_sub(1);
            self.bus.gen16_set(R16::CX.index(), cx);
            if cx == 0 {
                break;
            }
        }
    }

    fn exec_lods(&mut self, width: Width, repeat: RepeatMode, segment_override: Option<Segment>) {
        let step = self.si_di_step(width);
        let src_seg = segment_override.unwrap_or(Segment::DS);
        loop {
            if repeat != RepeatMode::None && self.bus.gen16_get(R16::CX.index()) == 0 {
                break;
            }
            let si = self.bus.gen16_get(R16::SI.index());
            let src_base = self.bus.seg_get(src_seg.index());
            match width {
                Width::W8 => {
                    let v = self.bus.mem_read8(src_base, si);
                    self.bus.gen8_set(R8::AL.index(), v);
                }
                Width::W16 => {
                    let v = self.bus.mem_read16(src_base, si);
                    self.bus.gen16_set(R16::AX.index(), v);
                }
            }
            self.bus.gen16_set(R16::SI.index(), si.wrapping_add(step));
            if repeat == RepeatMode::None {
                break;
            }
            let cx = self.bus.gen16_get(R16::CX.index()).wrapping_sub(1);
            self.bus.gen16_set(R16::CX.index(), cx);
            if cx == 0 {
                break;
            }
        }
    }

    fn exec_stos(&mut self, width: Width, repeat: RepeatMode) {
        let step = self.si_di_step(width);
        loop {
            if repeat != RepeatMode::None && self.bus.gen16_get(R16::CX.index()) == 0 {
                break;
            }
            let di = self.bus.gen16_get(R16::DI.index());
            let dst_base = self.bus.seg_get(Segment::ES.index());
            match width {
                Width::W8 => {
                    let v = self.bus.gen8_get(R8::AL.index());
                    self.bus.mem_write8(dst_base, di, v);
                }
                Width::W16 => {
                    let v = self.bus.gen16_get(R16::AX.index());
                    self.bus.mem_write16(dst_base, di, v);
                }
            }
            self.bus.gen16_set(R16::DI.index(), di.wrapping_add(step));
            if repeat == RepeatMode::None {
                break;
            }
            let cx = self.bus.gen16_get(R16::CX.index()).wrapping_sub(1);
            self.bus.gen16_set(R16::CX.index(), cx);
            if cx == 0 {
                break;
            }
        }
    }

    /// CMPS: like MOVS but compares instead of copying, and REPE/REPNE
    /// additionally break early on the ZF test (spec section 4.7).
    fn exec_cmps(&mut self, width: Width, repeat: RepeatMode, segment_override: Option<Segment>) {
        let step = self.si_di_step(width);
        let src_seg = segment_override.unwrap_or(Segment::DS);
        loop {
            if repeat != RepeatMode::None && self.bus.gen16_get(R16::CX.index()) == 0 {
                break;
            }
            let si = self.bus.gen16_get(R16::SI.index());
            let di = self.bus.gen16_get(R16::DI.index());
            let src_base = self.bus.seg_get(src_seg.index());
            let dst_base = self.bus.seg_get(Segment::ES.index());
            match width {
                Width::W8 => {
                    let d = self.bus.mem_read8(src_base, si);
                    let s = self.bus.mem_read8(dst_base, di);
                    flags::compute(&mut self.bus, Width::W8, AluOp::Cmp, u32::from(d), u32::from(s));
                }
                Width::W16 => {
                    let d = self.bus.mem_read16(src_base, si);
                    let s = self.bus.mem_read16(dst_base, di);
                    flags::compute(&mut self.bus, Width::W16, AluOp::Cmp, u32::from(d), u32::from(s));
                }
            }
            self.bus.gen16_set(R16::SI.index(), si.wrapping_add(step));
            self.bus.gen16_set(R16::DI.index(), di.wrapping_add(step));
            if repeat == RepeatMode::None {
                break;
            }
            let cx = self.bus.gen16_get(R16::CX.index()).wrapping_sub(1);
            self.bus.gen16_set(R16::CX.index(), cx);
            let zf = self.bus.flag_get(6);
            let stop = cx == 0 || (repeat == RepeatMode::Repe && !zf) || (repeat == RepeatMode::Repne && zf);
            if stop {
                break;
            }
        }
    }

    fn exec_scas(&mut self, width: Width, repeat: RepeatMode) {
        let step = self.si_di_step(width);
        loop {
            if repeat != RepeatMode::None && self.bus.gen16_get(R16::CX.index()) == 0 {
                break;
            }
            let di = self.bus.gen16_get(R16::DI.index());
            let dst_base = self.bus.seg_get(Segment::ES.index());
            match width {
                Width::W8 => {
                    let d = self.bus.gen8_get(R8::AL.index());
                    let s = self.bus.mem_read8(dst_base, di);
                    flags::compute(&mut self.bus, Width::W8, AluOp::Cmp, u32::from(d), u32::from(s));
                }
                Width::W16 => {
                    let d = self.bus.gen16_get(R16::AX.index());
                    let s = self.bus.mem_read16(dst_base, di);
                    flags::compute(&mut self.bus, Width::W16, AluOp::Cmp, u32::from(d), u32::from(s));
                }
            }
            self.bus.gen16_set(R16::DI.index(), di.wrapping_add(step));
            if repeat == RepeatMode::None {
                break;
            }
            let cx = self.bus.gen16_get(R16::CX.index()).wrapping_sub(1);
            self.bus.gen16_set(R16::CX.index(), cx);
            let zf = self.bus.flag_get(6);
            let stop = cx == 0 || (repeat == RepeatMode::Repe && !zf) || (repeat == RepeatMode::Repne && zf);
            if stop {
                break;
            }
        }
    }
}
