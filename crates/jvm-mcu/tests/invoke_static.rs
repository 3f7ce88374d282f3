//! Calling-convention tests: caller-saved window spill/restore, parameter
//! marshaling into the callee frame, stack reclamation, and return-value
//! reseating — with the tracker's counters audited at every step.

use jvm_mcu::test_harness::*;
use jvm_mcu::{Error, Generator, Msp430, Msp430Chip, Z80};

fn msp430() -> Msp430 {
    let mut g = Msp430::new(Msp430Chip::G2231);
    g.method_start(0, "caller").expect("method_start");
    g
}

#[test]
fn test_call_round_trip_preserves_live_value() {
    let mut g = msp430();
    g.push_integer(100).unwrap(); // survives the call
    g.push_integer(1).unwrap(); // parameter 0
    g.push_integer(2).unwrap(); // parameter 1
    let depth_before = g.operands().depth();

    g.invoke_static_method("helper", 2, false).unwrap();

    assert_emitted_in_order(
        g.output(),
        &[
            // Whole window saved, bottom first.
            "push r4",
            "push r5",
            "push r6",
            // Parameters land in the callee's local slots 0 and 1.
            "mov.w r5, -4(SP)",
            "mov.w r6, -6(SP)",
            "call #helper",
            // Window restored in reverse order; the survivor is back in r4.
            "pop r6",
            "pop r5",
            "pop r4",
            // Return value pushed through the normal path.
            "mov.w r15, r5",
        ],
    );

    // Two parameters consumed, one return value produced.
    assert_eq!(g.operands().depth(), depth_before - 2 + 1);
    assert_eq!(g.operands().regs(), 2);
    assert_eq!(g.operands().mem(), 0);
}

#[test]
fn test_void_call_pushes_no_return_value() {
    let mut g = msp430();
    g.push_integer(1).unwrap();
    g.invoke_static_method("helper", 1, true).unwrap();
    assert_eq!(g.operands().depth(), 0);
    assert!(!ops(g.output()).contains(&"mov.w r15, r4"));
}

#[test]
fn test_call_with_no_parameters() {
    let mut g = msp430();
    g.invoke_static_method("ticker", 0, false).unwrap();
    assert_emitted_in_order(g.output(), &["call #ticker", "mov.w r15, r4"]);
    assert_eq!(g.operands().depth(), 1);
}

#[test]
fn test_call_with_spilled_parameter_reclaims_stack() {
    let mut g = msp430();
    // Saturate the window, then one more: the top parameter is
    // memory-resident, the other comes from the window.
    for n in 0..7 {
        g.push_integer(n).unwrap();
    }
    assert_eq!(g.operands().mem(), 1);

    g.invoke_static_method("helper", 2, true).unwrap();

    assert_emitted_in_order(
        g.output(),
        &[
            "push r4",
            "push r9",
            // Parameter 0 from the window top, parameter 1 from the
            // memory stack (now buried under the six saved registers).
            "mov.w r9, -4(SP)",
            "mov.w 12(SP), -6(SP)",
            "call #helper",
            "pop r9",
            "pop r4",
            // One memory-resident parameter slot reclaimed.
            "add.w #2, SP",
        ],
    );

    assert_eq!(g.operands().regs(), 5);
    assert_eq!(g.operands().mem(), 0);
}

#[test]
fn test_call_return_value_spills_when_window_stays_full() {
    let mut g = msp430();
    // Window full after the call restores it, so the return value spills.
    for n in 0..8 {
        g.push_integer(n).unwrap();
    }
    g.invoke_static_method("helper", 2, false).unwrap();
    assert_emitted(g.output(), "push r15");
    assert_eq!(g.operands().regs(), 6);
    assert_eq!(g.operands().mem(), 1);
}

#[test]
fn test_call_with_too_few_live_values_is_internal_error() {
    let mut g = msp430();
    g.push_integer(1).unwrap();
    assert!(matches!(
        g.invoke_static_method("helper", 2, false),
        Err(Error::Internal(_))
    ));
}

#[test]
fn test_z80_call_marshals_through_index_register() {
    let mut g = Z80::new();
    g.method_start(0, "caller").unwrap();
    g.push_integer(1).unwrap(); // parameter 0
    g.push_integer(2).unwrap(); // parameter 1

    g.invoke_static_method("helper", 2, false).unwrap();

    assert_emitted_in_order(
        g.output(),
        &[
            "ld ix, 0",
            "add ix, sp",
            // Parameter 0 is the deeper value, two bytes up the stack.
            "ld c, (ix+2)",
            "ld b, (ix+3)",
            "ld (ix-6), c",
            "ld (ix-5), b",
            // Parameter 1 is the top of stack.
            "ld c, (ix+0)",
            "ld b, (ix+1)",
            "ld (ix-10), c",
            "ld (ix-9), b",
            "call helper",
            // Both parameter slots reclaimed.
            "ld hl, 4",
            "add hl, sp",
            "ld sp, hl",
            // Return value arrives in de.
            "push de",
        ],
    );

    assert_eq!(g.operands().mem(), 1);
}

#[test]
fn test_z80_void_call_without_parameters_is_bare() {
    let mut g = Z80::new();
    g.method_start(0, "caller").unwrap();
    let before = g.output().to_string();
    g.invoke_static_method("tick", 0, true).unwrap();
    assert_eq!(ops(&g.output()[before.len()..]), vec!["call tick"]);
    assert_eq!(g.operands().depth(), 0);
}
