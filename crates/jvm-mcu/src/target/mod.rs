//! Target backends and the contract they share.
//!
//! The front-end (bytecode reader, out of scope here) drives one
//! [`Generator`] per compilation unit, calling one method per virtual
//! instruction in program order. Each backend owns an [`OperandWindow`]
//! tracking where live virtual-stack values sit, and every emitter keeps
//! that tracker in step with the instructions it appends to the output.

mod msp430;
mod window;
mod z80;

pub use msp430::{Msp430, Msp430Chip};
pub use window::{OperandWindow, Slot};
pub use z80::Z80;

use crate::{Error, Result};

/// Comparison kind for compare-and-branch operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cond {
    Equal,
    NotEqual,
    Less,
    LessOrEqual,
    Greater,
    GreaterOrEqual,
}

/// Two-operand ALU operation realized by `stack_alu`-style emitters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AluOp {
    Add,
    Sub,
    And,
    Or,
    Xor,
}

/// Single-bit shift direction for the unrolled and loop realizations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShiftOp {
    Left,
    RightArithmetic,
    RightLogical,
}

fn unsupported(op: &str) -> Error {
    Error::Unsupported(op.to_string())
}

/// One method per virtual instruction. Methods with a default body report
/// "unsupported" — a hard failure the driver must surface, never a silent
/// no-op — and targets override the ones they can realize.
pub trait Generator {
    /// Emit the target preamble: origin and segment directives, startup
    /// stub.
    fn open(&mut self) -> Result<()>;

    /// Emit trailing boilerplate: reset vectors and any helper routines
    /// that earlier emission deferred.
    fn finish(&mut self) -> Result<()>;

    /// Assembly text emitted so far. Only meaningful after a fully
    /// successful unit; on error the driver discards it.
    fn output(&self) -> &str;

    fn method_start(&mut self, local_count: usize, name: &str) -> Result<()>;
    fn method_end(&mut self, local_count: usize) -> Result<()>;

    fn push_integer(&mut self, n: i32) -> Result<()>;
    fn push_byte(&mut self, b: i8) -> Result<()>;
    fn push_short(&mut self, s: i16) -> Result<()>;
    fn push_integer_local(&mut self, index: usize) -> Result<()>;
    fn pop_integer_local(&mut self, index: usize) -> Result<()>;

    fn push_long(&mut self, _n: i64) -> Result<()> {
        Err(unsupported("push_long"))
    }
    fn push_float(&mut self, _f: f32) -> Result<()> {
        Err(unsupported("push_float"))
    }
    fn push_double(&mut self, _d: f64) -> Result<()> {
        Err(unsupported("push_double"))
    }

    fn pop(&mut self) -> Result<()>;
    fn dup(&mut self) -> Result<()>;
    fn dup2(&mut self) -> Result<()>;
    fn swap(&mut self) -> Result<()>;

    fn add_integer(&mut self) -> Result<()>;
    fn add_integer_const(&mut self, num: i32) -> Result<()>;
    fn sub_integer(&mut self) -> Result<()>;
    fn sub_integer_const(&mut self, num: i32) -> Result<()>;
    fn and_integer(&mut self) -> Result<()>;
    fn and_integer_const(&mut self, num: i32) -> Result<()>;
    fn or_integer(&mut self) -> Result<()>;
    fn or_integer_const(&mut self, num: i32) -> Result<()>;
    fn xor_integer(&mut self) -> Result<()>;
    fn xor_integer_const(&mut self, num: i32) -> Result<()>;

    fn mul_integer(&mut self) -> Result<()> {
        Err(unsupported("mul_integer"))
    }
    fn div_integer(&mut self) -> Result<()> {
        Err(unsupported("div_integer"))
    }
    fn mod_integer(&mut self) -> Result<()> {
        Err(unsupported("mod_integer"))
    }

    fn neg_integer(&mut self) -> Result<()>;

    fn shift_left_integer(&mut self) -> Result<()>;
    fn shift_left_integer_const(&mut self, count: i32) -> Result<()>;
    fn shift_right_integer(&mut self) -> Result<()>;
    fn shift_right_integer_const(&mut self, count: i32) -> Result<()>;
    fn shift_right_uinteger(&mut self) -> Result<()>;
    fn shift_right_uinteger_const(&mut self, count: i32) -> Result<()>;

    /// Add `num` to local `index` in place, without touching the operand
    /// stack.
    fn inc_integer(&mut self, index: usize, num: i32) -> Result<()>;

    fn jump(&mut self, label: &str) -> Result<()>;
    fn call(&mut self, label: &str) -> Result<()>;
    fn jump_cond(&mut self, label: &str, cond: Cond) -> Result<()>;
    fn jump_cond_integer(&mut self, label: &str, cond: Cond) -> Result<()>;

    fn invoke_static_method(&mut self, name: &str, params: usize, is_void: bool) -> Result<()>;

    fn return_integer(&mut self, local_count: usize) -> Result<()>;
    fn return_local(&mut self, index: usize, local_count: usize) -> Result<()>;
    fn return_void(&mut self, local_count: usize) -> Result<()>;

    // Raw memory access.
    fn memory_read8(&mut self) -> Result<()> {
        Err(unsupported("memory_read8"))
    }
    fn memory_write8(&mut self) -> Result<()> {
        Err(unsupported("memory_write8"))
    }
    fn memory_read16(&mut self) -> Result<()> {
        Err(unsupported("memory_read16"))
    }
    fn memory_write16(&mut self) -> Result<()> {
        Err(unsupported("memory_write16"))
    }

    // Digital I/O.
    fn ioport_set_pins_as_input(&mut self, _port: usize) -> Result<()> {
        Err(unsupported("ioport_set_pins_as_input"))
    }
    fn ioport_set_pins_as_output(&mut self, _port: usize) -> Result<()> {
        Err(unsupported("ioport_set_pins_as_output"))
    }
    fn ioport_set_port_output_value(&mut self, _port: usize) -> Result<()> {
        Err(unsupported("ioport_set_port_output_value"))
    }
    fn ioport_get_port_input_value(&mut self, _port: usize) -> Result<()> {
        Err(unsupported("ioport_get_port_input_value"))
    }

    // Serial.
    fn uart_init(&mut self, _port: usize) -> Result<()> {
        Err(unsupported("uart_init"))
    }
    fn uart_send(&mut self, _port: usize) -> Result<()> {
        Err(unsupported("uart_send"))
    }
    fn uart_read(&mut self, _port: usize) -> Result<()> {
        Err(unsupported("uart_read"))
    }
    fn uart_is_data_available(&mut self, _port: usize) -> Result<()> {
        Err(unsupported("uart_is_data_available"))
    }
    fn uart_is_send_ready(&mut self, _port: usize) -> Result<()> {
        Err(unsupported("uart_is_send_ready"))
    }

    // Synchronous serial.
    fn spi_init(&mut self, _port: usize) -> Result<()> {
        Err(unsupported("spi_init"))
    }
    fn spi_send(&mut self, _port: usize) -> Result<()> {
        Err(unsupported("spi_send"))
    }
    fn spi_read(&mut self, _port: usize) -> Result<()> {
        Err(unsupported("spi_read"))
    }
    fn spi_is_data_available(&mut self, _port: usize) -> Result<()> {
        Err(unsupported("spi_is_data_available"))
    }
    fn spi_is_busy(&mut self, _port: usize) -> Result<()> {
        Err(unsupported("spi_is_busy"))
    }

    // Clocking.
    fn cpu_set_clock16(&mut self) -> Result<()> {
        Err(unsupported("cpu_set_clock16"))
    }
}
