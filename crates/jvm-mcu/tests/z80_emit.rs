//! Emission tests for the 8-bit backend. Its operand window is empty, so
//! every virtual value is memory-resident and the shared tracker exercises
//! the pure-overflow paths.

use jvm_mcu::test_harness::*;
use jvm_mcu::{Cond, Error, Generator, Z80};

fn fresh() -> Z80 {
    let mut g = Z80::new();
    g.method_start(0, "main").expect("method_start");
    g
}

fn tail<'a>(g: &'a Z80, before: &str) -> &'a str {
    &g.output()[before.len()..]
}

#[test]
fn test_every_push_goes_to_the_native_stack() {
    let mut g = fresh();
    g.push_integer(0x1234).unwrap();
    g.push_integer(1).unwrap();
    assert_emitted_in_order(g.output(), &["ld bc, 0x1234", "push bc"]);
    assert_eq!(g.operands().regs(), 0);
    assert_eq!(g.operands().mem(), 2);
}

#[test]
fn test_push_integer_range() {
    let mut g = fresh();
    assert!(matches!(
        g.push_integer(65536),
        Err(Error::LiteralOutOfRange { .. })
    ));
    g.push_byte(-1).unwrap();
    assert_emitted(g.output(), "ld bc, 0xffff");
}

#[test]
fn test_method_framing_reserves_wide_local_slots() {
    let mut g = Z80::new();
    g.method_start(2, "f").unwrap();
    assert_emitted_in_order(
        g.output(),
        &["ld iy, 0", "add iy, sp", "ld hl, -8", "add hl, sp", "ld sp, hl"],
    );
}

#[test]
fn test_local_load_store() {
    let mut g = Z80::new();
    g.method_start(2, "f").unwrap();

    g.push_integer_local(1).unwrap();
    assert_emitted_in_order(g.output(), &["ld c, (iy-8)", "ld b, (iy-7)", "push bc"]);
    assert_eq!(g.operands().mem(), 1);

    g.pop_integer_local(0).unwrap();
    assert_emitted_in_order(g.output(), &["pop bc", "ld (iy-4), c", "ld (iy-3), b"]);
    assert_eq!(g.operands().mem(), 0);
}

#[test]
fn test_add_pops_both_and_pushes_result() {
    let mut g = fresh();
    g.push_integer(2).unwrap();
    g.push_integer(3).unwrap();
    let before = g.output().to_string();
    g.add_integer().unwrap();
    assert_eq!(
        ops(tail(&g, &before)),
        vec!["pop bc", "pop hl", "and a   ; clear carry", "adc hl, bc", "push hl"]
    );
    assert_eq!(g.operands().mem(), 1);
}

#[test]
fn test_sub_keeps_operand_order() {
    let mut g = fresh();
    g.push_integer(10).unwrap();
    g.push_integer(3).unwrap();
    g.sub_integer().unwrap();
    // hl holds the lower (second) operand: 10 - 3.
    assert_emitted(g.output(), "sbc hl, bc");
}

#[test]
fn test_logic_ops_combine_byte_wise() {
    let mut g = fresh();
    g.push_integer(0x0ff0).unwrap();
    g.push_integer(0x00ff).unwrap();
    let before = g.output().to_string();
    g.xor_integer().unwrap();
    assert_emitted_in_order(
        tail(&g, &before),
        &["pop hl", "pop bc", "ld a, b", "xor h", "ld h, a", "ld a, c", "xor l", "ld l, a", "push hl"],
    );
    assert_eq!(g.operands().mem(), 1);
}

#[test]
fn test_alu_const_folding() {
    let mut g = fresh();
    g.push_integer(5).unwrap();

    let before = g.output().to_string();
    g.add_integer_const(0).unwrap();
    assert_eq!(tail(&g, &before), "");

    let before = g.output().to_string();
    g.add_integer_const(1).unwrap();
    assert_eq!(ops(tail(&g, &before)), vec!["pop de", "inc de", "push de"]);

    let before = g.output().to_string();
    g.sub_integer_const(1).unwrap();
    assert_eq!(ops(tail(&g, &before)), vec!["pop de", "dec de", "push de"]);

    let before = g.output().to_string();
    g.and_integer_const(0x0f33).unwrap();
    assert_emitted_in_order(tail(&g, &before), &["and 0x0f", "and 0x33"]);

    assert_eq!(g.operands().mem(), 1);
}

#[test]
fn test_neg_is_full_twos_complement() {
    let mut g = fresh();
    g.push_integer(1).unwrap();
    let before = g.output().to_string();
    g.neg_integer().unwrap();
    assert_emitted_in_order(
        tail(&g, &before),
        &["pop hl", "ld a, l", "cpl", "ld l, a", "ld a, h", "cpl", "ld h, a", "inc hl", "push hl"],
    );
    assert_eq!(g.operands().mem(), 1);
}

#[test]
fn test_literal_shift_unrolls_register_pair_steps() {
    let mut g = fresh();
    g.push_integer(1).unwrap();
    let before = g.output().to_string();
    g.shift_left_integer_const(2).unwrap();
    assert_eq!(
        ops(tail(&g, &before)),
        vec!["pop de", "sla e", "rl d", "sla e", "rl d", "push de"]
    );

    let before = g.output().to_string();
    g.shift_right_uinteger_const(1).unwrap();
    assert_emitted_in_order(tail(&g, &before), &["srl d", "rr e"]);

    let before = g.output().to_string();
    g.shift_right_integer_const(0).unwrap();
    assert_eq!(tail(&g, &before), "");
}

#[test]
fn test_runtime_shift_guards_zero_count() {
    let mut g = fresh();
    g.push_integer(1).unwrap(); // value
    g.push_integer(3).unwrap(); // count
    g.shift_right_integer().unwrap();
    assert_emitted_in_order(
        g.output(),
        &[
            "pop bc",
            "pop de",
            "ld a, c",
            "or a",
            "jr z, label_1",
            "ld b, c",
            "sra d",
            "rr e",
            "djnz label_0",
            "push de",
        ],
    );
    assert_eq!(labels(g.output()), vec!["main", "label_0", "label_1"]);
    assert_eq!(g.operands().mem(), 1);
}

#[test]
fn test_stack_shuffles() {
    let mut g = fresh();
    g.push_integer(1).unwrap();
    let before = g.output().to_string();
    g.dup().unwrap();
    assert_eq!(
        ops(tail(&g, &before)),
        vec!["pop bc", "push bc", "push bc"]
    );
    assert_eq!(g.operands().mem(), 2);

    let before = g.output().to_string();
    g.swap().unwrap();
    assert_eq!(
        ops(tail(&g, &before)),
        vec!["pop bc", "pop de", "push bc", "push de"]
    );
    assert_eq!(g.operands().mem(), 2);

    let before = g.output().to_string();
    g.dup2().unwrap();
    assert_eq!(
        ops(tail(&g, &before)),
        vec!["pop bc", "pop de", "push de", "push bc", "push de", "push bc"]
    );
    assert_eq!(g.operands().mem(), 4);
}

#[test]
fn test_jump_cond_supports_equality_only() {
    let mut g = fresh();
    g.push_integer(1).unwrap();
    g.jump_cond("out", Cond::Equal).unwrap();
    assert_emitted_in_order(g.output(), &["pop hl", "ld a, h", "or l", "jp z, out"]);
    assert_eq!(g.operands().mem(), 0);

    g.push_integer(1).unwrap();
    assert!(matches!(
        g.jump_cond("out", Cond::Less),
        Err(Error::Unsupported(_))
    ));
}

#[test]
fn test_jump_cond_integer_compares_by_subtraction() {
    let mut g = fresh();
    g.push_integer(1).unwrap();
    g.push_integer(2).unwrap();
    g.jump_cond_integer("same", Cond::NotEqual).unwrap();
    assert_emitted_in_order(
        g.output(),
        &["pop de", "pop hl", "sbc hl, de", "jp nz, same"],
    );
    assert_eq!(g.operands().mem(), 0);
}

#[test]
fn test_returns_tear_down_the_frame() {
    let mut g = Z80::new();
    g.method_start(1, "f").unwrap();
    g.push_integer(9).unwrap();
    g.return_integer(1).unwrap();
    assert_emitted_in_order(g.output(), &["pop de", "ld sp, iy", "ret"]);

    let mut g = Z80::new();
    g.method_start(2, "g").unwrap();
    g.return_local(0, 2).unwrap();
    assert_emitted_in_order(g.output(), &["ld e, (iy-4)", "ld d, (iy-3)", "ld sp, iy", "ret"]);
}

#[test]
fn test_unsupported_surface() {
    let mut g = fresh();
    assert!(matches!(g.mul_integer(), Err(Error::Unsupported(_))));
    assert!(matches!(g.push_long(0), Err(Error::Unsupported(_))));
    assert!(matches!(g.spi_init(0), Err(Error::Unsupported(_))));
    assert!(matches!(g.uart_send(0), Err(Error::Unsupported(_))));
    assert!(matches!(g.memory_read8(), Err(Error::Unsupported(_))));
    assert!(matches!(g.cpu_set_clock16(), Err(Error::Unsupported(_))));
}

#[test]
fn test_method_start_resets_counters() {
    let mut g = fresh();
    g.push_integer(1).unwrap();
    g.push_integer(2).unwrap();
    g.method_start(0, "next").unwrap();
    assert_eq!(g.operands().mem(), 0);
}
