#![allow(
    clippy::cast_possible_truncation, // intentional: literals are masked to the target's native word
    clippy::cast_sign_loss, // intentional: emitted literals are formatted as unsigned words
    clippy::cast_possible_wrap, // intentional: frame offsets are small and signed by construction
    clippy::missing_errors_doc // every operation fails the same three ways, documented on Error
)]

//! Code-generation backend of a JVM-bytecode to native-assembly
//! cross-compiler for small microcontrollers.
//!
//! The front-end (class-file reader, not part of this crate) drives a
//! [`Generator`] with one call per virtual instruction; the backend tracks
//! where every live operand of the virtual stack resides — a small window
//! of hardware registers overflowing into the native stack — and appends
//! the matching assembly text to its output buffer.

pub mod asm;
pub mod error;
pub mod target;

/// Test harness module for writing unit and integration tests.
///
/// This module is only available when running tests or when the
/// `test-harness` feature is enabled.
#[cfg(any(test, feature = "test-harness"))]
pub mod test_harness;

pub use error::{Error, Result};
pub use target::{AluOp, Cond, Generator, Msp430, Msp430Chip, OperandWindow, ShiftOp, Slot, Z80};
