//! End-to-end scenarios (spec section 8): a handful of concrete
//! instruction streams, each checked against the exact register/flag
//! state the spec documents.

use pretty_assertions::assert_eq;

use iapx86::cpu::{Segment, R16, R8};
use iapx86::memory::Bus;
use iapx86::Cpu;

fn cpu_with(code: &[u8]) -> Cpu {
    let mut cpu = Cpu::new(Bus::new());
    for (i, &b) in code.iter().enumerate() {
        cpu.bus.mem_write8(0, i as u16, b);
    }
    cpu
}

#[test]
fn s1_mov_ax_imm16() {
    let mut cpu = cpu_with(&[0xB8, 0x34, 0x12]);
    cpu.execute(1);
    assert_eq!(cpu.bus.gen16_get(R16::AX.index()), 0x1234);
    assert_eq!(cpu.ip, 3);
}

#[test]
fn s2_add_al_wraps_and_sets_flags() {
    let mut cpu = cpu_with(&[0x04, 0xFF, 0x04, 0x01]);
    cpu.execute(1);
    assert_eq!(cpu.bus.gen8_get(R8::AL.index()), 0xFF);
    assert!(cpu.bus.flag_get(7)); // SF
    assert!(!cpu.bus.flag_get(6)); // ZF
    assert!(!cpu.bus.flag_get(0)); // CF
    assert!(!cpu.bus.flag_get(11)); // OF
    assert!(cpu.bus.flag_get(2)); // PF

    cpu.execute(1);
    assert_eq!(cpu.bus.gen8_get(R8::AL.index()), 0x00);
    assert!(cpu.bus.flag_get(6)); // ZF
    assert!(cpu.bus.flag_get(0)); // CF
    assert!(cpu.bus.flag_get(4)); // AF
    assert!(cpu.bus.flag_get(2)); // PF
    assert!(!cpu.bus.flag_get(7)); // SF
}

#[test]
fn s3_add_al_signed_overflow() {
    let mut cpu = cpu_with(&[0xB0, 0x7F, 0x04, 0x01]);
    cpu.execute(2);
    assert_eq!(cpu.bus.gen8_get(R8::AL.index()), 0x80);
    assert!(cpu.bus.flag_get(7)); // SF
    assert!(cpu.bus.flag_get(11)); // OF
    assert!(!cpu.bus.flag_get(0)); // CF
    assert!(!cpu.bus.flag_get(6)); // ZF
}

#[test]
fn s4_sub_al_no_borrow() {
    let mut cpu = cpu_with(&[0xB0, 0x05, 0x2C, 0x03]);
    cpu.execute(2);
    assert_eq!(cpu.bus.gen8_get(R8::AL.index()), 2);
    assert!(!cpu.bus.flag_get(0)); // CF
    assert!(!cpu.bus.flag_get(6)); // ZF
    assert!(!cpu.bus.flag_get(7)); // SF
    assert!(!cpu.bus.flag_get(11)); // OF
}

#[test]
fn s5_sub_al_borrow() {
    let mut cpu = cpu_with(&[0xB0, 0x03, 0x2C, 0x05]);
    cpu.execute(2);
    assert_eq!(cpu.bus.gen8_get(R8::AL.index()), 0xFE);
    assert!(cpu.bus.flag_get(0)); // CF
    assert!(cpu.bus.flag_get(7)); // SF
    assert!(!cpu.bus.flag_get(11)); // OF
    assert!(cpu.bus.flag_get(4)); // AF
}

#[test]
fn s6_segment_override_is_consumed_after_one_instruction() {
    let mut cpu = cpu_with(&[0x26, 0xA1, 0x00, 0x00]);
    cpu.bus.seg_set(Segment::ES.index(), 0x1000);
    cpu.bus.mem_write16(0x1000, 0x0000, 0xCAFE);
    cpu.execute(1);
    assert_eq!(cpu.bus.gen16_get(R16::AX.index()), 0xCAFE);

    // a following instruction must not see a stale override: DS is
    // still segment 0 here, not ES.
    cpu.bus.mem_write8(0, cpu.ip, 0xA0); // mov al, [0x0000] -- re-use the tail as an offset
    cpu.bus.mem_write8(0, cpu.ip + 1, 0x00);
    cpu.bus.mem_write8(0, cpu.ip + 2, 0x00);
    cpu.bus.mem_write8(0, 0x0000, 0x42);
    cpu.execute(1);
    assert_eq!(cpu.bus.gen8_get(R8::AL.index()), 0x42);
}

#[test]
fn s7_conditional_jump_skips_the_next_instruction() {
    // xor ax,ax ; jz +2 ; eb fe (jmp $, never reached) ; nop
    let mut cpu = cpu_with(&[0x33, 0xC0, 0x74, 0x02, 0xEB, 0xFE, 0x90]);
    cpu.execute(2);
    assert_eq!(cpu.ip, 6);
    cpu.execute(1);
    assert_eq!(cpu.ip, 7);
}

#[test]
fn push_pop_round_trips_general_register() {
    let mut cpu = cpu_with(&[
        0xBB, 0xEF, 0xBE, // mov bx,0xbeef
        0x53, // push bx
        0x5B, // pop bx
    ]);
    cpu.execute(3);
    assert_eq!(cpu.bus.gen16_get(R16::BX.index()), 0xBEEF);
}

#[test]
fn pop_sp_bp_routes_through_general_register_setter() {
    // push bp ; pop sp -- must land in SP via the general-register path,
    // never the segment setter (spec section 9 redesign note).
    let mut cpu = cpu_with(&[0x55, 0x5C]);
    cpu.bus.gen16_set(R16::BP.index(), 0x2000);
    cpu.bus.gen16_set(R16::SP.index(), 0xFFFE);
    cpu.execute(2);
    assert_eq!(cpu.bus.gen16_get(R16::SP.index()), 0x2000);
}

#[test]
fn xchg_swaps_and_is_involutive() {
    let mut cpu = cpu_with(&[
        0xB8, 0x11, 0x11, // mov ax,0x1111
        0xBB, 0x22, 0x22, // mov bx,0x2222
        0x93, // xchg ax,bx
    ]);
    cpu.execute(2);
    cpu.execute(1);
    assert_eq!(cpu.bus.gen16_get(R16::AX.index()), 0x2222);
    assert_eq!(cpu.bus.gen16_get(R16::BX.index()), 0x1111);
    cpu.bus.mem_write8(0, cpu.ip, 0x93);
    cpu.execute(1);
    assert_eq!(cpu.bus.gen16_get(R16::AX.index()), 0x1111);
    assert_eq!(cpu.bus.gen16_get(R16::BX.index()), 0x2222);
}

#[test]
fn cmp_discards_its_result() {
    let mut cpu = cpu_with(&[
        0xB8, 0x05, 0x00, // mov ax,5
        0xBB, 0x03, 0x00, // mov bx,3
        0x39, 0xD8, // cmp ax,bx  (Ev,Gv form)
    ]);
    cpu.execute(3);
    assert_eq!(cpu.bus.gen16_get(R16::AX.index()), 5, "CMP must not write back its result");
    assert!(!cpu.bus.flag_get(0)); // CF clear, 5 >= 3
    assert!(!cpu.bus.flag_get(6)); // ZF clear, not equal
}

#[test]
fn movsb_with_rep_prefix_copies_whole_block() {
    let mut cpu = cpu_with(&[0xF3, 0xA4]); // rep movsb
    cpu.bus.gen16_set(R16::SI.index(), 0x0100);
    cpu.bus.gen16_set(R16::DI.index(), 0x0200);
    cpu.bus.gen16_set(R16::CX.index(), 4);
    for (i, &b) in [1u8, 2, 3, 4].iter().enumerate() {
        cpu.bus.mem_write8(0, 0x0100 + i as u16, b);
    }
    cpu.execute(1);
    for i in 0..4 {
        assert_eq!(cpu.bus.mem_read8(0, 0x0200 + i), i as u8 + 1);
    }
    assert_eq!(cpu.bus.gen16_get(R16::CX.index()), 0);
    assert_eq!(cpu.bus.gen16_get(R16::SI.index()), 0x0104);
    assert_eq!(cpu.bus.gen16_get(R16::DI.index()), 0x0204);
}

#[test]
fn repe_cmpsb_stops_at_first_mismatch() {
    let mut cpu = cpu_with(&[0xF3, 0xA6]); // repe cmpsb
    cpu.bus.gen16_set(R16::SI.index(), 0x0000);
    cpu.bus.gen16_set(R16::DI.index(), 0x0100);
    cpu.bus.gen16_set(R16::CX.index(), 5);
    for (i, &b) in [1u8, 2, 3, 9, 5].iter().enumerate() {
        cpu.bus.mem_write8(0, i as u16, b);
    }
    for (i, &b) in [1u8, 2, 3, 4, 5].iter().enumerate() {
        cpu.bus.mem_write8(0, 0x0100 + i as u16, b);
    }
    cpu.execute(1);
    // stops after comparing the 4th byte pair (3 vs 9 mismatch)
    assert_eq!(cpu.bus.gen16_get(R16::CX.index()), 1);
    assert_eq!(cpu.bus.gen16_get(R16::SI.index()), 4);
}

#[test]
fn loop_decrements_cx_and_branches_until_zero() {
    // mov cx,3 ; loop -2 (branches back twice, falls through on the third)
    let mut cpu = cpu_with(&[0xB9, 0x03, 0x00, 0xE2, 0xFE]);
    cpu.execute(1); // mov
    cpu.execute(3); // loop x3, CX: 3->2->1->0
    assert_eq!(cpu.bus.gen16_get(R16::CX.index()), 0);
    assert_eq!(cpu.ip, 5);
}

#[test]
fn group1_0x83_sign_extends_8bit_immediate() {
    // add di, byte -6 (0x83 /0 with imm8 0xFA)
    let mut cpu = cpu_with(&[0xBF, 0x10, 0x00, 0x83, 0xC7, 0xFA]);
    cpu.execute(1);
    cpu.execute(1);
    assert_eq!(cpu.bus.gen16_get(R16::DI.index()), 0x000A);
}

#[test]
fn inc_dec_do_not_touch_carry_flag() {
    let mut cpu = cpu_with(&[0x40]); // inc ax
    cpu.bus.flag_set(0, true);
    cpu.bus.gen16_set(R16::AX.index(), 0xFFFF);
    cpu.execute(1);
    assert_eq!(cpu.bus.gen16_get(R16::AX.index()), 0);
    assert!(cpu.bus.flag_get(0), "CF must survive INC untouched");
    assert!(cpu.bus.flag_get(6)); // ZF
}

#[test]
fn halt_stops_the_execute_loop_early() {
    let mut cpu = cpu_with(&[0xF4, 0xB0, 0x01]); // hlt ; mov al,1
    cpu.execute(5);
    assert!(cpu.halted);
    assert_eq!(cpu.bus.gen8_get(R8::AL.index()), 0, "instructions after HLT must not run");
}

#[test]
fn undefined_opcode_is_a_benign_no_op() {
    let mut cpu = cpu_with(&[0x0F, 0x90]); // undefined 0x0F, then NOP
    let ip_before = cpu.ip;
    cpu.execute(1);
    assert_eq!(cpu.ip, ip_before + 1);
    cpu.execute(1);
    assert_eq!(cpu.ip, ip_before + 2);
}

#[test]
fn daa_adjusts_after_bcd_add() {
    // mov al,0x15 ; add al,0x26 ; daa -- BCD 15+26=41
    let mut cpu = cpu_with(&[0xB0, 0x15, 0x04, 0x26, 0x27]);
    cpu.execute(3);
    assert_eq!(cpu.bus.gen8_get(R8::AL.index()), 0x41);
    assert!(cpu.bus.flag_get(4)); // AF
    assert!(!cpu.bus.flag_get(0)); // CF
}

#[test]
fn das_adjusts_after_bcd_sub() {
    // mov al,0x32 ; sub al,0x15 ; das -- BCD 32-15=17
    let mut cpu = cpu_with(&[0xB0, 0x32, 0x2C, 0x15, 0x2F]);
    cpu.execute(3);
    assert_eq!(cpu.bus.gen8_get(R8::AL.index()), 0x17);
    assert!(cpu.bus.flag_get(4)); // AF
    assert!(!cpu.bus.flag_get(0)); // CF
}

#[test]
fn aaa_adjusts_al_and_nudges_ah() {
    let mut cpu = cpu_with(&[0xB0, 0x0F, 0x37]); // mov al,0x0f ; aaa
    cpu.execute(2);
    assert_eq!(cpu.bus.gen8_get(R8::AL.index()), 0x05);
    assert_eq!(cpu.bus.gen8_get(R8::AH.index()), 0x01);
    assert!(cpu.bus.flag_get(0)); // CF
    assert!(cpu.bus.flag_get(4)); // AF
}

#[test]
fn aas_adjusts_al_and_nudges_ah() {
    let mut cpu = cpu_with(&[0xB0, 0x0F, 0x3F]); // mov al,0x0f ; aas
    cpu.execute(2);
    assert_eq!(cpu.bus.gen8_get(R8::AL.index()), 0x09);
    assert_eq!(cpu.bus.gen8_get(R8::AH.index()), 0xFF);
    assert!(cpu.bus.flag_get(0)); // CF
    assert!(cpu.bus.flag_get(4)); // AF
}

#[test]
fn aam_splits_al_into_ah_quotient_and_al_remainder() {
    let mut cpu = cpu_with(&[0xB0, 0x1F, 0xD4, 0x0A]); // mov al,31 ; aam 10
    cpu.execute(2);
    assert_eq!(cpu.bus.gen8_get(R8::AH.index()), 3);
    assert_eq!(cpu.bus.gen8_get(R8::AL.index()), 1);
}

#[test]
fn aam_by_zero_is_a_benign_no_op() {
    let mut cpu = cpu_with(&[0xB0, 0x1F, 0xD4, 0x00]); // mov al,31 ; aam 0
    cpu.execute(2);
    assert_eq!(cpu.bus.gen8_get(R8::AL.index()), 0x1F, "no #DE model, must no-op");
}

#[test]
fn aad_combines_ah_al_before_division() {
    let mut cpu = cpu_with(&[0xB8, 0x03, 0x02, 0xD5, 0x0A]); // mov ax,0x0203 ; aad 10
    cpu.execute(2);
    assert_eq!(cpu.bus.gen8_get(R8::AL.index()), 0x17);
    assert_eq!(cpu.bus.gen8_get(R8::AH.index()), 0);
}

#[test]
fn lds_loads_offset_and_segment_from_far_pointer() {
    // lds ax, [0x0050]  (modrm 00_000_110, direct address)
    let mut cpu = cpu_with(&[0xC5, 0x06, 0x50, 0x00]);
    cpu.bus.mem_write16(0, 0x0050, 0x1234);
    cpu.bus.mem_write16(0, 0x0052, 0x2000);
    cpu.execute(1);
    assert_eq!(cpu.bus.gen16_get(R16::AX.index()), 0x1234);
    assert_eq!(cpu.bus.seg_get(Segment::DS.index()), 0x2000);
}

#[test]
fn les_loads_offset_and_segment_from_far_pointer() {
    let mut cpu = cpu_with(&[0xC4, 0x06, 0x50, 0x00]);
    cpu.bus.mem_write16(0, 0x0050, 0xBEEF);
    cpu.bus.mem_write16(0, 0x0052, 0x3000);
    cpu.execute(1);
    assert_eq!(cpu.bus.gen16_get(R16::AX.index()), 0xBEEF);
    assert_eq!(cpu.bus.seg_get(Segment::ES.index()), 0x3000);
}

#[test]
fn lahf_sahf_round_trip_the_low_flag_byte() {
    let mut cpu = cpu_with(&[0x9F, 0x9E]); // lahf ; sahf
    cpu.bus.flag_set(0, true); // CF
    cpu.bus.flag_set(6, true); // ZF
    cpu.bus.flag_set(7, false); // SF
    cpu.execute(1); // lahf
    let expected_ah = (cpu.bus.flags_u16() & 0xFF) as u8;
    assert_eq!(cpu.bus.gen8_get(R8::AH.index()), expected_ah);

    cpu.bus.flag_set(0, false);
    cpu.bus.flag_set(6, false);
    cpu.execute(1); // sahf
    assert!(cpu.bus.flag_get(0));
    assert!(cpu.bus.flag_get(6));
    assert!(!cpu.bus.flag_get(7));
}

#[test]
fn cbw_sign_extends_al_into_ax() {
    let mut cpu = cpu_with(&[0xB0, 0xFF, 0x98]); // mov al,0xff ; cbw
    cpu.execute(2);
    assert_eq!(cpu.bus.gen16_get(R16::AX.index()), 0xFFFF);
}

#[test]
fn cwd_sign_extends_ax_into_dx() {
    let mut cpu = cpu_with(&[0xB8, 0x00, 0x80, 0x99]); // mov ax,0x8000 ; cwd
    cpu.execute(2);
    assert_eq!(cpu.bus.gen16_get(R16::DX.index()), 0xFFFF);
}

#[test]
fn pushf_popf_round_trips_flags_and_preserves_reserved_bits() {
    let mut cpu = cpu_with(&[0x9C, 0xB0, 0x00, 0x9D]); // pushf ; mov al,0 (filler) ; popf
    cpu.bus.flag_set(0, true);
    cpu.bus.flag_set(11, true);
    let before = cpu.bus.flags_u16();
    cpu.execute(1); // pushf
    cpu.bus.flag_set(0, false);
    cpu.bus.flag_set(11, false);
    cpu.execute(1); // mov al,0 -- just advances past the filler byte
    cpu.execute(1); // popf
    assert_eq!(cpu.bus.flags_u16(), before);
}

#[test]
fn flag_control_group_sets_and_toggles_bits() {
    let mut cpu = cpu_with(&[0xF9, 0xFB, 0xFD, 0xF5]); // stc ; sti ; std ; cmc
    cpu.execute(3);
    assert!(cpu.bus.flag_get(0)); // CF via stc
    assert!(cpu.bus.flag_get(9)); // IF via sti
    assert!(cpu.bus.flag_get(10)); // DF via std
    cpu.execute(1); // cmc flips CF
    assert!(!cpu.bus.flag_get(0));
}

#[test]
fn call_near_pushes_return_address_and_ret_restores_it() {
    // call +0 (lands back on the byte after itself) ; the call target
    // itself is `ret`, landing on `nop`.
    let mut cpu = cpu_with(&[0xE8, 0x00, 0x00, 0x90]); // call near rel16=0 ; nop
    cpu.bus.gen16_set(R16::SP.index(), 0x1000);
    cpu.execute(1);
    assert_eq!(cpu.ip, 3, "call falls through to the instruction after the displacement");
    let ret_addr = cpu.bus.mem_read16(0, 0x0FFE);
    assert_eq!(ret_addr, 3);
}

#[test]
fn jmp_near_adds_signed_16bit_displacement() {
    let mut cpu = cpu_with(&[0xE9, 0x02, 0x00, 0x90, 0x90, 0x90]); // jmp near +2 ; nop nop nop
    cpu.execute(1);
    assert_eq!(cpu.ip, 5);
}

#[test]
fn jcxz_branches_only_when_cx_is_zero() {
    let mut cpu = cpu_with(&[0xE3, 0x02, 0xEB, 0xFE, 0x90]); // jcxz +2 ; jmp $ ; nop
    cpu.bus.gen16_set(R16::CX.index(), 0);
    cpu.execute(1);
    assert_eq!(cpu.ip, 4);
}

#[test]
fn lodsb_and_stosb_without_repeat_move_a_single_byte() {
    let mut cpu = cpu_with(&[0xAC, 0xAA]); // lodsb ; stosb
    cpu.bus.gen16_set(R16::SI.index(), 0x0100);
    cpu.bus.gen16_set(R16::DI.index(), 0x0200);
    cpu.bus.mem_write8(0, 0x0100, 0x77);
    cpu.execute(1); // lodsb
    assert_eq!(cpu.bus.gen8_get(R8::AL.index()), 0x77);
    assert_eq!(cpu.bus.gen16_get(R16::SI.index()), 0x0101);
    cpu.execute(1); // stosb
    assert_eq!(cpu.bus.mem_read8(0, 0x0200), 0x77);
    assert_eq!(cpu.bus.gen16_get(R16::DI.index()), 0x0201);
}

#[test]
fn scasb_without_repeat_compares_al_against_es_di() {
    let mut cpu = cpu_with(&[0xAE]); // scasb
    cpu.bus.gen16_set(R16::DI.index(), 0x0200);
    cpu.bus.gen8_set(R8::AL.index(), 5);
    cpu.bus.mem_write8(0, 0x0200, 5);
    cpu.execute(1);
    assert!(cpu.bus.flag_get(6)); // ZF set, equal
    assert_eq!(cpu.bus.gen16_get(R16::DI.index()), 0x0201);
}

#[test]
fn segment_register_push_pop_round_trips() {
    let mut cpu = cpu_with(&[0x06, 0x07]); // push es ; pop es
    cpu.bus.seg_set(Segment::ES.index(), 0x4000);
    cpu.bus.gen16_set(R16::SP.index(), 0x1000);
    cpu.execute(1);
    cpu.bus.seg_set(Segment::ES.index(), 0);
    cpu.execute(1);
    assert_eq!(cpu.bus.seg_get(Segment::ES.index()), 0x4000);
}

#[test]
fn segment_override_applies_to_movsb_source() {
    // es: movsb -- the source must come from ES:SI, not DS:SI, even
    // though MOVS's destination is always ES:DI regardless.
    let mut cpu = cpu_with(&[0x26, 0xA4]); // es: movsb
    cpu.bus.seg_set(Segment::ES.index(), 0x1000);
    cpu.bus.gen16_set(R16::SI.index(), 0x0000);
    cpu.bus.gen16_set(R16::DI.index(), 0x0010);
    cpu.bus.mem_write8(0x1000, 0x0000, 0xAA); // ES:0000 -- the real source
    cpu.bus.mem_write8(0, 0x0000, 0xBB); // DS:0000 -- must not be read
    cpu.execute(1);
    assert_eq!(cpu.bus.mem_read8(0x1000, 0x0010), 0xAA, "source must be read from ES:SI, not DS:SI");
}

#[test]
fn segment_override_applies_to_xlat() {
    // es: xlat -- the translate table must be read via ES:BX+AL, not
    // the default DS:BX+AL, once a segment-override prefix sets it.
    // (ES rather than CS, so the override doesn't disturb where the
    // test program itself is fetched from.)
    let mut cpu = cpu_with(&[0x26, 0xD7]); // es: xlat
    cpu.bus.seg_set(Segment::ES.index(), 0x4000);
    cpu.bus.gen16_set(R16::BX.index(), 0x0010);
    cpu.bus.gen8_set(R8::AL.index(), 0x02);
    cpu.bus.mem_write8(0x4000, 0x0012, 0x5A); // ES:0x0012 -- the real entry
    cpu.bus.mem_write8(0, 0x0012, 0xFF); // DS:0x0012 -- must not be read
    cpu.execute(1);
    assert_eq!(cpu.bus.gen8_get(R8::AL.index()), 0x5A, "xlat must honor the segment override");
}

#[test]
fn pop_rm16_0x8f_writes_to_memory() {
    // push ax ; pop word [0x0300] via 0x8f /0, mod=00 rm=110 direct addr
    let mut cpu = cpu_with(&[0xB8, 0xEF, 0xBE, 0x50, 0x8F, 0x06, 0x00, 0x03]);
    cpu.bus.gen16_set(R16::SP.index(), 0x1000);
    cpu.execute(2); // mov ax,0xbeef ; push ax
    cpu.execute(1); // pop word [0x0300]
    assert_eq!(cpu.bus.mem_read16(0, 0x0300), 0xBEEF);
}
