//! The ALU flag engine (spec section 4.3): one kernel computing
//! Zero/Sign/Parity from a result, and Adjust/Carry/Overflow from an
//! (operation, width, destination, source) tuple, shared by every
//! arithmetic and logical opcode instead of being re-derived per
//! mnemonic per width.

use crate::cpu::op::AluOp;
use crate::memory::Bus;

// true where the low 8 bits of the index have even parity (PF semantics).
static PARITY_LOOKUP: [bool; 256] = [
    true, false, false, true, false, true, true, false, false, true, true, false, true, false, false, true,
    false, true, true, false, true, false, false, true, true, false, false, true, false, true, true, false,
    false, true, true, false, true, false, false, true, true, false, false, true, false, true, true, false,
    true, false, false, true, false, true, true, false, false, true, true, false, true, false, false, true,
    false, true, true, false, true, false, false, true, true, false, false, true, false, true, true, false,
    true, false, false, true, false, true, true, false, false, true, true, false, true, false, false, true,
    true, false, false, true, false, true, true, false, false, true, true, false, true, false, false, true,
    false, true, true, false, true, false, false, true, true, false, false, true, false, true, true, false,
    false, true, true, false, true, false, false, true, true, false, false, true, false, true, true, false,
    true, false, false, true, false, true, true, false, false, true, true, false, true, false, false, true,
    true, false, false, true, false, true, true, false, false, true, true, false, true, false, false, true,
    false, true, true, false, true, false, false, true, true, false, false, true, false, true, true, false,
    true, false, false, true, false, true, true, false, false, true, true, false, true, false, false, true,
    false, true, true, false, true, false, false, true, true, false, false, true, false, true, true, false,
    false, true, true, false, true, false, false, true, true, false, false, true, false, true, true, false,
    true, false, false, true, false, true, true, false, false, true, true, false, true, false, false, true,
];

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Width {
    W8,
    W16,
}

impl Width {
    fn bits(self) -> u32 {
        match self {
            Width::W8 => 8,
            Width::W16 => 16,
        }
    }
    fn mask(self) -> u32 {
        match self {
            Width::W8 => 0xFF,
            Width::W16 => 0xFFFF,
        }
    }
    fn msb(self) -> u32 {
        match self {
            Width::W8 => 0x80,
            Width::W16 => 0x8000,
        }
    }
}

pub(crate) fn set_szp(bus: &mut Bus, width: Width, r: u32) {
    bus.flag_set(6, r & width.mask() == 0); // ZF
    bus.flag_set(7, r & width.msb() != 0); // SF
    bus.flag_set(2, PARITY_LOOKUP[(r & 0xFF) as usize]); // PF
}

/// ADD/ADC/SUB/SBB/CMP, and the INC/DEC variant that must not touch CF
/// (spec section 9 redesign note). `cin` is the incoming carry/borrow
/// used by ADC/SBB; pass `false` for ADD/SUB/CMP/INC/DEC.
fn add_sub(bus: &mut Bus, width: Width, is_sub: bool, cin: bool, d: u32, s: u32, touch_cf: bool) -> u32 {
    let mask = width.mask();
    let msb = width.msb();
    let d = (d & mask) as i64;
    let s_m = (s & mask) as i64;
    let s_eff = if is_sub { -s_m } else { s_m };
    let cin_term = if cin {
        if is_sub { -1 } else { 1 }
    } else {
        0
    };
    let r_full = d + s_eff + cin_term;
    let r_trunc = (r_full & mask as i64) as u32;

    set_szp(bus, width, r_trunc);

    // nibble carry/borrow uses the raw magnitude s_m, not the
    // two's-complemented s_eff -- s_eff is only right for CF/OF/result.
    let af = ((d as u32) ^ (s_m as u32) ^ r_trunc) & 0x10 != 0;
    bus.flag_set(4, af); // AF

    if touch_cf {
        let cf = if is_sub { r_full < 0 } else { r_full >= i64::from(mask) + 1 };
        bus.flag_set(0, cf); // CF
    }

    let of = if is_sub {
        ((d as u32) ^ (s_m as u32)) & ((d as u32) ^ r_trunc) & msb != 0
    } else {
        ((d as u32) ^ r_trunc) & ((s_m as u32) ^ r_trunc) & msb != 0
    };
    bus.flag_set(11, of); // OF

    r_trunc
}

/// AND/OR/XOR: OF=0, CF=0, ZF/SF/PF from the result, AF left at 0 (spec:
/// "the core may set it to 0" — undefined on real hardware).
fn logical(bus: &mut Bus, width: Width, r: u32) -> u32 {
    let r = r & width.mask();
    set_szp(bus, width, r);
    bus.flag_set(0, false);
    bus.flag_set(11, false);
    bus.flag_set(4, false);
    r
}

/// Computes `op(d, s)` at the given width, updating flags, and returns
/// the (possibly to-be-discarded, for CMP/TEST) result.
pub fn compute(bus: &mut Bus, width: Width, op: AluOp, d: u32, s: u32) -> u32 {
    match op {
        AluOp::Add => add_sub(bus, width, false, false, d, s, true),
        AluOp::Adc => add_sub(bus, width, false, bus.flag_get(0), d, s, true),
        AluOp::Sub | AluOp::Cmp => add_sub(bus, width, true, false, d, s, true),
        AluOp::Sbb => add_sub(bus, width, true, bus.flag_get(0), d, s, true),
        AluOp::And => logical(bus, width, d & s),
        AluOp::Or => logical(bus, width, d | s),
        AluOp::Xor => logical(bus, width, d ^ s),
    }
}

/// INC/DEC: identical flag computation to ADD/SUB-by-1 except CF is left
/// untouched (spec section 9 redesign note).
pub fn inc_dec(bus: &mut Bus, width: Width, is_dec: bool, d: u32) -> u32 {
    add_sub(bus, width, is_dec, false, d, 1, false)
}
