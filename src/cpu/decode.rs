//! Decode half of the dispatch core (spec section 4.6). `decode()` folds
//! segment-override and repeat prefixes into the instruction they
//! precede — they set transient state and loop for another byte rather
//! than producing an `Instruction` of their own, so they never consume a
//! budget quantum (spec section 4.6, point 4).

use crate::cpu::op::{Cond, Op, RepeatMode};
use crate::cpu::parameter::{Parameter, ParameterSet};
use crate::cpu::register::{R16, R8, Segment};
use crate::cpu::{Cpu, Instruction};

impl Cpu {
    pub(crate) fn decode(&mut self) -> Instruction {
        self.segment_override = None;
        let mut repeat = RepeatMode::None;
        let start_ip = self.ip;
        loop {
            let b = self.fetch_u8();
            match b {
                0x26 => {
                    self.segment_override = Some(Segment::ES);
                    continue;
                }
                0x2E => {
                    self.segment_override = Some(Segment::CS);
                    continue;
                }
                0x36 => {
                    self.segment_override = Some(Segment::SS);
                    continue;
                }
                0x3E => {
                    self.segment_override = Some(Segment::DS);
                    continue;
                }
                0xF2 => {
                    repeat = RepeatMode::Repne;
                    continue;
                }
                0xF3 => {
                    repeat = RepeatMode::Repe;
                    continue;
                }
                _ => {
                    let segment_override = self.segment_override;
                    let mut instr = self.decode_opcode(b);
                    instr.repeat = repeat;
                    instr.segment_override = segment_override;
                    instr.length = self.ip.wrapping_sub(start_ip) as u8;
                    self.segment_override = None;
                    return instr;
                }
            }
        }
    }

    fn decode_opcode(&mut self, b: u8) -> Instruction {
        match b {
            // ---- ALU primary forms 0x00-0x3D, low 3 bits 0..5 ----
            // (0x06/0x07/0x0E/0x16/0x17/0x1E/0x1F/0x26.../0x27/0x2E.../0x2F/
            // 0x36.../0x37/0x3E.../0x3F all have low-3-bits 6 or 7, so the
            // guard below never shadows the arms that handle them.)
            _ if b <= 0x3D && (b & 7) < 6 => {
                let aluop = ((b >> 3) & 7).into();
                match b & 7 {
                    0 => {
                        let m = self.fetch_modrm();
                        let dst = self.rm8(m);
                        let src = Parameter::Reg8(m.reg.into());
                        Instruction::new(Op::Alu(aluop), ParameterSet::two(dst, src), 0)
                    }
                    1 => {
                        let m = self.fetch_modrm();
                        let dst = self.rm16(m);
                        let src = Parameter::Reg16(m.reg.into());
                        Instruction::new(Op::Alu(aluop), ParameterSet::two(dst, src), 0)
                    }
                    2 => {
                        let m = self.fetch_modrm();
                        let src = self.rm8(m);
                        let dst = Parameter::Reg8(m.reg.into());
                        Instruction::new(Op::Alu(aluop), ParameterSet::two(dst, src), 0)
                    }
                    3 => {
                        let m = self.fetch_modrm();
                        let src = self.rm16(m);
                        let dst = Parameter::Reg16(m.reg.into());
                        Instruction::new(Op::Alu(aluop), ParameterSet::two(dst, src), 0)
                    }
                    4 => {
                        let imm = self.fetch_u8();
                        Instruction::new(
                            Op::Alu(aluop),
                            ParameterSet::two(Parameter::Reg8(R8::AL), Parameter::Imm8(imm)),
                            0,
                        )
                    }
                    5 => {
                        let imm = self.fetch_u16();
                        Instruction::new(
                            Op::Alu(aluop),
                            ParameterSet::two(Parameter::Reg16(R16::AX), Parameter::Imm16(imm)),
                            0,
                        )
                    }
                    _ => unreachable!(),
                }
            }

            0x06 => Instruction::new(Op::Push, ParameterSet::one(Parameter::SReg(Segment::ES)), 0),
            0x07 => Instruction::new(Op::Pop, ParameterSet::one(Parameter::SReg(Segment::ES)), 0),
            0x0E => Instruction::new(Op::Push, ParameterSet::one(Parameter::SReg(Segment::CS)), 0),
            0x0F => Instruction::new(Op::Undefined, ParameterSet::none(), 0),
            0x16 => Instruction::new(Op::Push, ParameterSet::one(Parameter::SReg(Segment::SS)), 0),
            0x17 => Instruction::new(Op::Pop, ParameterSet::one(Parameter::SReg(Segment::SS)), 0),
            0x1E => Instruction::new(Op::Push, ParameterSet::one(Parameter::SReg(Segment::DS)), 0),
            0x1F => Instruction::new(Op::Pop, ParameterSet::one(Parameter::SReg(Segment::DS)), 0),
            0x27 => Instruction::new(Op::Daa, ParameterSet::none(), 0),
            0x2F => Instruction::new(Op::Das, ParameterSet::none(), 0),
            0x37 => Instruction::new(Op::Aaa, ParameterSet::none(), 0),
            0x3F => Instruction::new(Op::Aas, ParameterSet::none(), 0),

            0x40..=0x47 => Instruction::new(Op::Inc, ParameterSet::one(Parameter::Reg16((b & 7).into())), 0),
            0x48..=0x4F => Instruction::new(Op::Dec, ParameterSet::one(Parameter::Reg16((b & 7).into())), 0),
            0x50..=0x57 => Instruction::new(Op::Push, ParameterSet::one(Parameter::Reg16((b & 7).into())), 0),
            0x58..=0x5F => Instruction::new(Op::Pop, ParameterSet::one(Parameter::Reg16((b & 7).into())), 0),

            // 0x60-0x6F: 80186+ PUSHA/POPA/BOUND/ARPL — out of scope.
            0x60..=0x6F => Instruction::new(Op::Undefined, ParameterSet::none(), 0),

            0x70..=0x7F => {
                let disp = self.fetch_s8();
                let cond: Cond = (b & 0xF).into();
                Instruction::new(Op::Jcc(cond), ParameterSet::one(Parameter::ImmS8(disp)), 0)
            }

            0x80 => {
                let m = self.fetch_modrm();
                let aluop = m.reg.into();
                let dst = self.rm8(m);
                let imm = self.fetch_u8();
                Instruction::new(Op::Alu(aluop), ParameterSet::two(dst, Parameter::Imm8(imm)), 0)
            }
            0x81 => {
                let m = self.fetch_modrm();
                let aluop = m.reg.into();
                let dst = self.rm16(m);
                let imm = self.fetch_u16();
                Instruction::new(Op::Alu(aluop), ParameterSet::two(dst, Parameter::Imm16(imm)), 0)
            }
            0x82 => {
                // alias of 0x80 (spec section 4.6)
                let m = self.fetch_modrm();
                let aluop = m.reg.into();
                let dst = self.rm8(m);
                let imm = self.fetch_u8();
                Instruction::new(Op::Alu(aluop), ParameterSet::two(dst, Parameter::Imm8(imm)), 0)
            }
            0x83 => {
                let m = self.fetch_modrm();
                let aluop = m.reg.into();
                let dst = self.rm16(m);
                let imm = self.fetch_s8();
                Instruction::new(Op::Alu(aluop), ParameterSet::two(dst, Parameter::ImmS8(imm)), 0)
            }

            0x84 => {
                let m = self.fetch_modrm();
                let dst = self.rm8(m);
                let src = Parameter::Reg8(m.reg.into());
                Instruction::new(Op::Test, ParameterSet::two(dst, src), 0)
            }
            0x85 => {
                let m = self.fetch_modrm();
                let dst = self.rm16(m);
                let src = Parameter::Reg16(m.reg.into());
                Instruction::new(Op::Test, ParameterSet::two(dst, src), 0)
            }
            0x86 => {
                let m = self.fetch_modrm();
                let dst = self.rm8(m);
                let src = Parameter::Reg8(m.reg.into());
                Instruction::new(Op::Xchg, ParameterSet::two(dst, src), 0)
            }
            0x87 => {
                let m = self.fetch_modrm();
                let dst = self.rm16(m);
                let src = Parameter::Reg16(m.reg.into());
                Instruction::new(Op::Xchg, ParameterSet::two(dst, src), 0)
            }
            0x88 => {
                let m = self.fetch_modrm();
                let dst = self.rm8(m);
                let src = Parameter::Reg8(m.reg.into());
                Instruction::new(Op::Mov, ParameterSet::two(dst, src), 0)
            }
            0x89 => {
                let m = self.fetch_modrm();
                let dst = self.rm16(m);
                let src = Parameter::Reg16(m.reg.into());
                Instruction::new(Op::Mov, ParameterSet::two(dst, src), 0)
            }
            0x8A => {
                let m = self.fetch_modrm();
                let src = self.rm8(m);
                let dst = Parameter::Reg8(m.reg.into());
                Instruction::new(Op::Mov, ParameterSet::two(dst, src), 0)
            }
            0x8B => {
                let m = self.fetch_modrm();
                let src = self.rm16(m);
                let dst = Parameter::Reg16(m.reg.into());
                Instruction::new(Op::Mov, ParameterSet::two(dst, src), 0)
            }
            0x8C => {
                let m = self.fetch_modrm();
                let dst = self.rm16(m);
                let src = Parameter::SReg((m.reg & 3).into());
                Instruction::new(Op::Mov, ParameterSet::two(dst, src), 0)
            }
            0x8D => {
                let m = self.fetch_modrm();
                let src = if m.md == 3 { Parameter::None } else { self.rm16(m) };
                let dst = Parameter::Reg16(m.reg.into());
                Instruction::new(Op::Lea, ParameterSet::two(dst, src), 0)
            }
            0x8E => {
                let m = self.fetch_modrm();
                let src = self.rm16(m);
                let dst = Parameter::SReg((m.reg & 3).into());
                Instruction::new(Op::Mov, ParameterSet::two(dst, src), 0)
            }
            0x8F => {
                let m = self.fetch_modrm();
                let dst = self.rm16(m);
                Instruction::new(Op::Pop, ParameterSet::one(dst), 0)
            }

            0x90 => Instruction::new(Op::Nop, ParameterSet::none(), 0),
            0x91..=0x97 => {
                let dst = Parameter::Reg16(R16::AX);
                let src = Parameter::Reg16((b & 7).into());
                Instruction::new(Op::Xchg, ParameterSet::two(dst, src), 0)
            }
            0x98 => Instruction::new(Op::Cbw, ParameterSet::none(), 0),
            0x99 => Instruction::new(Op::Cwd, ParameterSet::none(), 0),
            // 0x9A far CALL, 0x9B WAIT: no far-code or co-processor model.
            0x9A | 0x9B => Instruction::new(Op::Undefined, ParameterSet::none(), 0),
            0x9C => Instruction::new(Op::Pushf, ParameterSet::none(), 0),
            0x9D => Instruction::new(Op::Popf, ParameterSet::none(), 0),
            0x9E => Instruction::new(Op::Sahf, ParameterSet::none(), 0),
            0x9F => Instruction::new(Op::Lahf, ParameterSet::none(), 0),

            0xA0 => {
                let off = self.fetch_u16();
                let src = Parameter::Ptr8(self.segment_override.unwrap_or(Segment::DS), off);
                Instruction::new(Op::Mov, ParameterSet::two(Parameter::Reg8(R8::AL), src), 0)
            }
            0xA1 => {
                let off = self.fetch_u16();
                let src = Parameter::Ptr16(self.segment_override.unwrap_or(Segment::DS), off);
                Instruction::new(Op::Mov, ParameterSet::two(Parameter::Reg16(R16::AX), src), 0)
            }
            0xA2 => {
                let off = self.fetch_u16();
                let dst = Parameter::Ptr8(self.segment_override.unwrap_or(Segment::DS), off);
                Instruction::new(Op::Mov, ParameterSet::two(dst, Parameter::Reg8(R8::AL)), 0)
            }
            0xA3 => {
                let off = self.fetch_u16();
                let dst = Parameter::Ptr16(self.segment_override.unwrap_or(Segment::DS), off);
                Instruction::new(Op::Mov, ParameterSet::two(dst, Parameter::Reg16(R16::AX)), 0)
            }
            0xA4 => Instruction::new(Op::Movsb, ParameterSet::none(), 0),
            0xA5 => Instruction::new(Op::Movsw, ParameterSet::none(), 0),
            0xA6 => Instruction::new(Op::Cmpsb, ParameterSet::none(), 0),
            0xA7 => Instruction::new(Op::Cmpsw, ParameterSet::none(), 0),
            0xA8 => {
                let imm = self.fetch_u8();
                Instruction::new(
                    Op::Test,
                    ParameterSet::two(Parameter::Reg8(R8::AL), Parameter::Imm8(imm)),
                    0,
                )
            }
            0xA9 => {
                let imm = self.fetch_u16();
                Instruction::new(
                    Op::Test,
                    ParameterSet::two(Parameter::Reg16(R16::AX), Parameter::Imm16(imm)),
                    0,
                )
            }
            0xAA => Instruction::new(Op::Stosb, ParameterSet::none(), 0),
            0xAB => Instruction::new(Op::Stosw, ParameterSet::none(), 0),
            0xAC => Instruction::new(Op::Lodsb, ParameterSet::none(), 0),
            0xAD => Instruction::new(Op::Lodsw, ParameterSet::none(), 0),
            0xAE => Instruction::new(Op::Scasb, ParameterSet::none(), 0),
            0xAF => Instruction::new(Op::Scasw, ParameterSet::none(), 0),

            0xB0..=0xB7 => {
                let imm = self.fetch_u8();
                Instruction::new(
                    Op::Mov,
                    ParameterSet::two(Parameter::Reg8((b & 7).into()), Parameter::Imm8(imm)),
                    0,
                )
            }
            0xB8..=0xBF => {
                let imm = self.fetch_u16();
                Instruction::new(
                    Op::Mov,
                    ParameterSet::two(Parameter::Reg16((b & 7).into()), Parameter::Imm16(imm)),
                    0,
                )
            }

            // 0xC0/0xC1: 80186+ shift-by-immediate — out of scope.
            0xC0 | 0xC1 => Instruction::new(Op::Undefined, ParameterSet::none(), 0),
            0xC2 => {
                let imm = self.fetch_u16();
                Instruction::new(Op::RetNearImm, ParameterSet::one(Parameter::Imm16(imm)), 0)
            }
            0xC3 => Instruction::new(Op::RetNear, ParameterSet::none(), 0),
            0xC4 => {
                let m = self.fetch_modrm();
                let src = if m.md == 3 { Parameter::None } else { self.rm16(m) };
                let dst = Parameter::Reg16(m.reg.into());
                Instruction::new(Op::Les, ParameterSet::two(dst, src), 0)
            }
            0xC5 => {
                let m = self.fetch_modrm();
                let src = if m.md == 3 { Parameter::None } else { self.rm16(m) };
                let dst = Parameter::Reg16(m.reg.into());
                Instruction::new(Op::Lds, ParameterSet::two(dst, src), 0)
            }
            0xC6 => {
                let m = self.fetch_modrm();
                let dst = self.rm8(m);
                let imm = self.fetch_u8();
                Instruction::new(Op::Mov, ParameterSet::two(dst, Parameter::Imm8(imm)), 0)
            }
            0xC7 => {
                let m = self.fetch_modrm();
                let dst = self.rm16(m);
                let imm = self.fetch_u16();
                Instruction::new(Op::Mov, ParameterSet::two(dst, Parameter::Imm16(imm)), 0)
            }
            // 0xC8/0xC9: 80186+ ENTER/LEAVE — out of scope.
            0xC8 | 0xC9 => Instruction::new(Op::Undefined, ParameterSet::none(), 0),
            // 0xCA-0xCF: far RET, INT/INTO/IRET — interrupt vectoring is
            // the BIOS/interrupt-controller's job, not the core's.
            0xCA..=0xCF => Instruction::new(Op::Undefined, ParameterSet::none(), 0),

            // 0xD0-0xD3: shift/rotate group — deliberately not covered.
            0xD0..=0xD3 => Instruction::new(Op::Undefined, ParameterSet::none(), 0),
            0xD4 => {
                let base = self.fetch_u8();
                Instruction::new(Op::Aam, ParameterSet::one(Parameter::Imm8(base)), 0)
            }
            0xD5 => {
                let base = self.fetch_u8();
                Instruction::new(Op::Aad, ParameterSet::one(Parameter::Imm8(base)), 0)
            }
            // 0xD6: undocumented SALC — out of scope.
            0xD6 => Instruction::new(Op::Undefined, ParameterSet::none(), 0),
            0xD7 => Instruction::new(Op::Xlat, ParameterSet::none(), 0),
            // 0xD8-0xDF: x87 escapes — co-processor opcodes are invalid
            // without x87 present, treated as undefined here.
            0xD8..=0xDF => Instruction::new(Op::Undefined, ParameterSet::none(), 0),

            0xE0 => {
                let disp = self.fetch_s8();
                Instruction::new(Op::Loopne, ParameterSet::one(Parameter::ImmS8(disp)), 0)
            }
            0xE1 => {
                let disp = self.fetch_s8();
                Instruction::new(Op::Loope, ParameterSet::one(Parameter::ImmS8(disp)), 0)
            }
            0xE2 => {
                let disp = self.fetch_s8();
                Instruction::new(Op::Loop, ParameterSet::one(Parameter::ImmS8(disp)), 0)
            }
            0xE3 => {
                let disp = self.fetch_s8();
                Instruction::new(Op::Jcxz, ParameterSet::one(Parameter::ImmS8(disp)), 0)
            }
            // 0xE4-0xE7: port I/O IN — no peripheral/IO-port model.
            0xE4..=0xE7 => Instruction::new(Op::Undefined, ParameterSet::none(), 0),
            0xE8 => {
                let disp = self.fetch_u16();
                Instruction::new(Op::CallNear, ParameterSet::one(Parameter::Imm16(disp)), 0)
            }
            0xE9 => {
                let disp = self.fetch_u16();
                Instruction::new(Op::JmpNear, ParameterSet::one(Parameter::Imm16(disp)), 0)
            }
            // 0xEA: far JMP — no far-code model without a loader.
            0xEA => Instruction::new(Op::Undefined, ParameterSet::none(), 0),
            0xEB => {
                let disp = self.fetch_s8();
                Instruction::new(Op::JmpShort, ParameterSet::one(Parameter::ImmS8(disp)), 0)
            }
            // 0xEC-0xEF: port I/O OUT — no peripheral/IO-port model.
            0xEC..=0xEF => Instruction::new(Op::Undefined, ParameterSet::none(), 0),

            // 0xF0: LOCK — meaningless in a single-threaded model.
            0xF0 | 0xF1 => Instruction::new(Op::Undefined, ParameterSet::none(), 0),
            0xF4 => Instruction::new(Op::Hlt, ParameterSet::none(), 0),
            0xF5 => Instruction::new(Op::Cmc, ParameterSet::none(), 0),
            // 0xF6/0xF7: Group-3 TEST/NOT/NEG/MUL/IMUL/DIV/IDIV — flagged
            // in spec section 9 as "not covered here."
            0xF6 | 0xF7 => Instruction::new(Op::Undefined, ParameterSet::none(), 0),
            0xF8 => Instruction::new(Op::Clc, ParameterSet::none(), 0),
            0xF9 => Instruction::new(Op::Stc, ParameterSet::none(), 0),
            0xFA => Instruction::new(Op::Cli, ParameterSet::none(), 0),
            0xFB => Instruction::new(Op::Sti, ParameterSet::none(), 0),
            0xFC => Instruction::new(Op::Cld, ParameterSet::none(), 0),
            0xFD => Instruction::new(Op::Std, ParameterSet::none(), 0),
            // 0xFE/0xFF: Group-4/5 INC/DEC Eb and INC/DEC/CALL/JMP/PUSH Ev
            // — flagged in spec section 9 as "not covered here."
            0xFE | 0xFF => Instruction::new(Op::Undefined, ParameterSet::none(), 0),

            _ => Instruction::new(Op::Undefined, ParameterSet::none(), 0),
        }
    }
}
