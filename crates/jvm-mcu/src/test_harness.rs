//! Test harness for backend unit tests.
//!
//! Helpers for asserting on emitted assembly text: splitting it into
//! instruction lines and counting mnemonics, so tests can reconcile the
//! tracker's counters against the push/pop instructions actually emitted.
//!
//! Only available when running tests or when the `test-harness` feature is
//! enabled.

#![allow(clippy::must_use_candidate, clippy::missing_panics_doc)]

/// Instruction lines only: indented, non-blank, non-comment text with
/// labels and directives skipped. Leading whitespace is trimmed.
pub fn ops(asm: &str) -> Vec<&str> {
    asm.lines()
        .filter(|line| line.starts_with(' '))
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with(';'))
        .collect()
}

/// Label definitions, without the trailing colon.
pub fn labels(asm: &str) -> Vec<&str> {
    asm.lines()
        .filter_map(|line| {
            let line = line.trim_end();
            if line.starts_with(' ') || line.starts_with('.') || line.starts_with(';') {
                return None;
            }
            line.strip_suffix(':')
        })
        .collect()
}

/// Count instruction lines whose mnemonic (first token) equals `mnemonic`.
pub fn mnemonic_count(asm: &str, mnemonic: &str) -> usize {
    ops(asm)
        .iter()
        .filter(|line| line.split_whitespace().next() == Some(mnemonic))
        .count()
}

/// Assert an exact instruction line was emitted.
pub fn assert_emitted(asm: &str, expected: &str) {
    assert!(
        ops(asm).contains(&expected),
        "expected instruction {expected:?} in:\n{asm}"
    );
}

/// Assert `expected` instruction lines appear in order (other instructions
/// may be interleaved).
pub fn assert_emitted_in_order(asm: &str, expected: &[&str]) {
    let emitted = ops(asm);
    let mut cursor = 0;
    for want in expected {
        match emitted[cursor..].iter().position(|line| line == want) {
            Some(found) => cursor += found + 1,
            None => panic!("expected instruction {want:?} (in order) in:\n{asm}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = ".msp430\nmain:\n  mov.w SP, r12\n  push r4\n\n  push r5\nlabel_0:\n  ; comment only\n  pop r5\n";

    #[test]
    fn test_ops_skips_labels_directives_and_comments() {
        assert_eq!(
            ops(SAMPLE),
            vec!["mov.w SP, r12", "push r4", "push r5", "pop r5"]
        );
    }

    #[test]
    fn test_labels() {
        assert_eq!(labels(SAMPLE), vec!["main", "label_0"]);
    }

    #[test]
    fn test_mnemonic_count() {
        assert_eq!(mnemonic_count(SAMPLE, "push"), 2);
        assert_eq!(mnemonic_count(SAMPLE, "pop"), 1);
        assert_eq!(mnemonic_count(SAMPLE, "mov.w"), 1);
    }

    #[test]
    fn test_in_order_assertion() {
        assert_emitted_in_order(SAMPLE, &["push r4", "push r5", "pop r5"]);
    }
}
