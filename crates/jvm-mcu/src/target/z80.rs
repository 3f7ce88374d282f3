//! Z80-family backend: 8-bit CPU holding 16-bit values in register pairs.
//!
//! The register file is spoken for (hl/bc/de are working pairs, a is the
//! only ALU accumulator), so the operand window is empty and every
//! virtual-stack value lives on the native stack. The shared tracker still
//! runs the show; it just always answers "memory".
//!
//! ABI:
//!   iy   frame base, points at the current method's locals
//!   ix   scratch pointer for parameter marshaling
//!   de   return-value register
//!
//! Locals use a four-byte slot stride; a 16-bit value occupies the low two
//! bytes of its slot.

use crate::asm::{AsmBuf, LabelAlloc};
use crate::target::{AluOp, Cond, Generator, OperandWindow, ShiftOp};
use crate::{Error, Result};

const SLOT_STRIDE: usize = 4;

fn local_offset(index: usize) -> usize {
    // Low byte of the value; the high byte is one closer to the frame base.
    index * SLOT_STRIDE + 4
}

fn word16(n: i32) -> Result<u16> {
    if !(-32768..=65535).contains(&n) {
        return Err(Error::LiteralOutOfRange {
            value: i64::from(n),
            bits: 16,
        });
    }
    Ok((n & 0xffff) as u16)
}

pub struct Z80 {
    out: AsmBuf,
    win: OperandWindow,
    labels: LabelAlloc,
}

impl Default for Z80 {
    fn default() -> Self {
        Self::new()
    }
}

impl Z80 {
    #[must_use]
    pub fn new() -> Self {
        Self {
            out: AsmBuf::new(),
            win: OperandWindow::new(0),
            labels: LabelAlloc::new(),
        }
    }

    #[must_use]
    pub fn into_output(self) -> String {
        self.out.into_string()
    }

    /// Operand placement tracker, exposed for drivers and tests auditing
    /// counter consistency against the emitted text.
    #[must_use]
    pub fn operands(&self) -> &OperandWindow {
        &self.win
    }

    fn stack_alu(&mut self, op: AluOp) -> Result<()> {
        match op {
            AluOp::Add | AluOp::Sub => {
                self.win.pop()?;
                self.out.op("pop bc");
                self.win.pop()?;
                self.out.op("pop hl");
                self.out.op("and a   ; clear carry");
                let mnemonic = if op == AluOp::Add { "adc" } else { "sbc" };
                self.out.op(&format!("{mnemonic} hl, bc"));
                self.win.push();
                self.out.op("push hl");
            }
            AluOp::And | AluOp::Or | AluOp::Xor => {
                // No 16-bit logic on this core; combine byte-wise through a.
                let mnemonic = logic_mnemonic(op);
                self.win.pop()?;
                self.out.op("pop hl");
                self.win.pop()?;
                self.out.op("pop bc");
                self.out.op("ld a, b");
                self.out.op(&format!("{mnemonic} h"));
                self.out.op("ld h, a");
                self.out.op("ld a, c");
                self.out.op(&format!("{mnemonic} l"));
                self.out.op("ld l, a");
                self.win.push();
                self.out.op("push hl");
            }
        }
        Ok(())
    }

    fn stack_alu_const(&mut self, op: AluOp, num: i32) -> Result<()> {
        let value = word16(num)?;

        if matches!(op, AluOp::Add | AluOp::Sub) {
            if num == 0 {
                return Ok(());
            }
            let unit = match (op, num) {
                (AluOp::Add, 1) | (AluOp::Sub, -1) => Some("inc de"),
                (AluOp::Add, -1) | (AluOp::Sub, 1) => Some("dec de"),
                _ => None,
            };
            if let Some(step) = unit {
                self.win.pop()?;
                self.out.op("pop de");
                self.out.op(step);
                self.win.push();
                self.out.op("push de");
                return Ok(());
            }

            self.win.pop()?;
            self.out.op("pop hl");
            self.out.op(&format!("ld bc, 0x{value:04x}"));
            self.out.op("and a   ; clear carry");
            let mnemonic = if op == AluOp::Add { "adc" } else { "sbc" };
            self.out.op(&format!("{mnemonic} hl, bc"));
            self.win.push();
            self.out.op("push hl");
            return Ok(());
        }

        let mnemonic = logic_mnemonic(op);
        self.win.pop()?;
        self.out.op("pop hl");
        self.out.op("ld a, h");
        self.out.op(&format!("{mnemonic} 0x{:02x}", value >> 8));
        self.out.op("ld h, a");
        self.out.op("ld a, l");
        self.out.op(&format!("{mnemonic} 0x{:02x}", value & 0xff));
        self.out.op("ld l, a");
        self.win.push();
        self.out.op("push hl");
        Ok(())
    }

    fn emit_one_shift(&mut self, op: ShiftOp) {
        // The value sits in de; shift the pair one bit through the carry.
        match op {
            ShiftOp::Left => {
                self.out.op("sla e");
                self.out.op("rl d");
            }
            ShiftOp::RightArithmetic => {
                self.out.op("sra d");
                self.out.op("rr e");
            }
            ShiftOp::RightLogical => {
                self.out.op("srl d");
                self.out.op("rr e");
            }
        }
    }

    fn shift_loop(&mut self, op: ShiftOp) -> Result<()> {
        self.win.pop()?;
        self.out.op("pop bc");
        self.win.pop()?;
        self.out.op("pop de");

        let head = self.labels.alloc();
        let done = self.labels.alloc();
        self.out.op("ld a, c");
        self.out.op("or a");
        self.out.op(&format!("jr z, {done}"));
        self.out.op("ld b, c");
        self.out.label(&head);
        self.emit_one_shift(op);
        self.out.op(&format!("djnz {head}"));
        self.out.label(&done);

        self.win.push();
        self.out.op("push de");
        Ok(())
    }

    fn shift_const(&mut self, op: ShiftOp, count: i32) -> Result<()> {
        if !(0..16).contains(&count) {
            return Err(Error::LiteralOutOfRange {
                value: i64::from(count),
                bits: 16,
            });
        }
        if count == 0 {
            return Ok(());
        }
        self.win.pop()?;
        self.out.op("pop de");
        for _ in 0..count {
            self.emit_one_shift(op);
        }
        self.win.push();
        self.out.op("push de");
        Ok(())
    }

    fn load_local(&mut self, index: usize) {
        let off = local_offset(index);
        self.out.op(&format!("ld c, (iy-{off})"));
        self.out.op(&format!("ld b, (iy-{})", off - 1));
    }

    fn frame_teardown(&mut self) {
        self.out.op("ld sp, iy");
        self.out.op("ret");
    }
}

/// Total mapping from ALU kind to the accumulator mnemonic. Add and Sub
/// never reach it through the byte-wise path (they go through 16-bit
/// adc/sbc), but the mapping stays total so a new kind cannot mis-index.
const fn logic_mnemonic(op: AluOp) -> &'static str {
    match op {
        AluOp::Add => "add",
        AluOp::Sub => "sub",
        AluOp::And => "and",
        AluOp::Or => "or",
        AluOp::Xor => "xor",
    }
}

impl Generator for Z80 {
    fn open(&mut self) -> Result<()> {
        self.out.raw(".z80");
        self.out.blank();
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        Ok(())
    }

    fn output(&self) -> &str {
        self.out.as_str()
    }

    fn method_start(&mut self, local_count: usize, name: &str) -> Result<()> {
        self.win.reset();

        self.out.label(name);
        self.out.op("ld iy, 0");
        self.out.op("add iy, sp");
        if local_count > 0 {
            self.out
                .op(&format!("ld hl, -{}", local_count * SLOT_STRIDE));
            self.out.op("add hl, sp");
            self.out.op("ld sp, hl");
        }
        Ok(())
    }

    fn method_end(&mut self, _local_count: usize) -> Result<()> {
        self.out.blank();
        Ok(())
    }

    fn push_integer(&mut self, n: i32) -> Result<()> {
        let value = word16(n)?;
        self.out.op(&format!("ld bc, 0x{value:04x}"));
        self.win.push();
        self.out.op("push bc");
        Ok(())
    }

    fn push_byte(&mut self, b: i8) -> Result<()> {
        self.out
            .op(&format!("ld bc, 0x{:04x}", i16::from(b) as u16));
        self.win.push();
        self.out.op("push bc");
        Ok(())
    }

    fn push_short(&mut self, s: i16) -> Result<()> {
        self.out.op(&format!("ld bc, 0x{:04x}", s as u16));
        self.win.push();
        self.out.op("push bc");
        Ok(())
    }

    fn push_integer_local(&mut self, index: usize) -> Result<()> {
        self.load_local(index);
        self.win.push();
        self.out.op("push bc");
        Ok(())
    }

    fn pop_integer_local(&mut self, index: usize) -> Result<()> {
        let off = local_offset(index);
        self.win.pop()?;
        self.out.op("pop bc");
        self.out.op(&format!("ld (iy-{off}), c"));
        self.out.op(&format!("ld (iy-{}), b", off - 1));
        Ok(())
    }

    fn pop(&mut self) -> Result<()> {
        self.win.pop()?;
        self.out.op("pop bc");
        Ok(())
    }

    fn dup(&mut self) -> Result<()> {
        self.win.pop()?;
        self.out.op("pop bc");
        self.win.push();
        self.out.op("push bc");
        self.win.push();
        self.out.op("push bc");
        Ok(())
    }

    fn dup2(&mut self) -> Result<()> {
        self.win.pop()?;
        self.out.op("pop bc");
        self.win.pop()?;
        self.out.op("pop de");
        self.win.push();
        self.out.op("push de");
        self.win.push();
        self.out.op("push bc");
        self.win.push();
        self.out.op("push de");
        self.win.push();
        self.out.op("push bc");
        Ok(())
    }

    fn swap(&mut self) -> Result<()> {
        self.win.pop()?;
        self.out.op("pop bc");
        self.win.pop()?;
        self.out.op("pop de");
        self.win.push();
        self.out.op("push bc");
        self.win.push();
        self.out.op("push de");
        Ok(())
    }

    fn add_integer(&mut self) -> Result<()> {
        self.stack_alu(AluOp::Add)
    }

    fn add_integer_const(&mut self, num: i32) -> Result<()> {
        self.stack_alu_const(AluOp::Add, num)
    }

    fn sub_integer(&mut self) -> Result<()> {
        self.stack_alu(AluOp::Sub)
    }

    fn sub_integer_const(&mut self, num: i32) -> Result<()> {
        self.stack_alu_const(AluOp::Sub, num)
    }

    fn and_integer(&mut self) -> Result<()> {
        self.stack_alu(AluOp::And)
    }

    fn and_integer_const(&mut self, num: i32) -> Result<()> {
        self.stack_alu_const(AluOp::And, num)
    }

    fn or_integer(&mut self) -> Result<()> {
        self.stack_alu(AluOp::Or)
    }

    fn or_integer_const(&mut self, num: i32) -> Result<()> {
        self.stack_alu_const(AluOp::Or, num)
    }

    fn xor_integer(&mut self) -> Result<()> {
        self.stack_alu(AluOp::Xor)
    }

    fn xor_integer_const(&mut self, num: i32) -> Result<()> {
        self.stack_alu_const(AluOp::Xor, num)
    }

    fn neg_integer(&mut self) -> Result<()> {
        self.win.pop()?;
        self.out.op("pop hl");
        self.out.op("ld a, l");
        self.out.op("cpl");
        self.out.op("ld l, a");
        self.out.op("ld a, h");
        self.out.op("cpl");
        self.out.op("ld h, a");
        self.out.op("inc hl");
        self.win.push();
        self.out.op("push hl");
        Ok(())
    }

    fn shift_left_integer(&mut self) -> Result<()> {
        self.shift_loop(ShiftOp::Left)
    }

    fn shift_left_integer_const(&mut self, count: i32) -> Result<()> {
        self.shift_const(ShiftOp::Left, count)
    }

    fn shift_right_integer(&mut self) -> Result<()> {
        self.shift_loop(ShiftOp::RightArithmetic)
    }

    fn shift_right_integer_const(&mut self, count: i32) -> Result<()> {
        self.shift_const(ShiftOp::RightArithmetic, count)
    }

    fn shift_right_uinteger(&mut self) -> Result<()> {
        self.shift_loop(ShiftOp::RightLogical)
    }

    fn shift_right_uinteger_const(&mut self, count: i32) -> Result<()> {
        self.shift_const(ShiftOp::RightLogical, count)
    }

    fn inc_integer(&mut self, index: usize, num: i32) -> Result<()> {
        let value = word16(num)?;
        if num == 0 {
            return Ok(());
        }
        let off = local_offset(index);
        self.out.op(&format!("ld l, (iy-{off})"));
        self.out.op(&format!("ld h, (iy-{})", off - 1));
        match num {
            1 => self.out.op("inc hl"),
            -1 => self.out.op("dec hl"),
            _ => {
                self.out.op(&format!("ld bc, 0x{value:04x}"));
                self.out.op("add hl, bc");
            }
        }
        self.out.op(&format!("ld (iy-{off}), l"));
        self.out.op(&format!("ld (iy-{}), h", off - 1));
        Ok(())
    }

    fn jump(&mut self, label: &str) -> Result<()> {
        self.out.op(&format!("jp {label}"));
        Ok(())
    }

    fn call(&mut self, label: &str) -> Result<()> {
        self.out.op(&format!("call {label}"));
        Ok(())
    }

    fn jump_cond(&mut self, label: &str, cond: Cond) -> Result<()> {
        let branch = match cond {
            Cond::Equal => "jp z",
            Cond::NotEqual => "jp nz",
            _ => {
                return Err(Error::Unsupported(format!(
                    "ordered compare-and-branch ({cond:?}) on this target"
                )));
            }
        };
        self.win.pop()?;
        self.out.op("pop hl");
        self.out.op("ld a, h");
        self.out.op("or l");
        self.out.op(&format!("{branch}, {label}"));
        Ok(())
    }

    fn jump_cond_integer(&mut self, label: &str, cond: Cond) -> Result<()> {
        let branch = match cond {
            Cond::Equal => "jp z",
            Cond::NotEqual => "jp nz",
            _ => {
                return Err(Error::Unsupported(format!(
                    "ordered compare-and-branch ({cond:?}) on this target"
                )));
            }
        };
        self.win.pop()?;
        self.out.op("pop de");
        self.win.pop()?;
        self.out.op("pop hl");
        self.out.op("and a   ; clear carry");
        self.out.op("sbc hl, de");
        self.out.op(&format!("{branch}, {label}"));
        Ok(())
    }

    fn invoke_static_method(&mut self, name: &str, params: usize, is_void: bool) -> Result<()> {
        tracing::debug!(name, params, is_void, "invoke_static_method");

        if params > self.win.depth() {
            return Err(Error::Internal(format!(
                "call to {name} needs {params} parameters but only {} values are live",
                self.win.depth()
            )));
        }

        // Every parameter is already stack-resident (empty window), newest
        // on top. Copy parameter j into the callee's local slot j, below
        // the return address the call is about to push; ix stands in for
        // the missing SP-relative addressing.
        if params > 0 {
            self.out.op("ld ix, 0");
            self.out.op("add ix, sp");
            for j in 0..params {
                let src = 2 * (params - 1 - j);
                let dst = j * SLOT_STRIDE + 6;
                self.out.op(&format!("ld c, (ix+{src})"));
                self.out.op(&format!("ld b, (ix+{})", src + 1));
                self.out.op(&format!("ld (ix-{dst}), c"));
                self.out.op(&format!("ld (ix-{}), b", dst - 1));
            }
        }

        self.out.op(&format!("call {name}"));

        // Reclaim the parameter slots and drop them from the tracker.
        if params > 0 {
            self.out.op(&format!("ld hl, {}", 2 * params));
            self.out.op("add hl, sp");
            self.out.op("ld sp, hl");
        }
        for _ in 0..params {
            self.win.pop()?;
        }

        if !is_void {
            self.win.push();
            self.out.op("push de");
        }
        Ok(())
    }

    fn return_integer(&mut self, _local_count: usize) -> Result<()> {
        self.win.pop()?;
        self.out.op("pop de");
        self.frame_teardown();
        Ok(())
    }

    fn return_local(&mut self, index: usize, _local_count: usize) -> Result<()> {
        let off = local_offset(index);
        self.out.op(&format!("ld e, (iy-{off})"));
        self.out.op(&format!("ld d, (iy-{})", off - 1));
        self.frame_teardown();
        Ok(())
    }

    fn return_void(&mut self, _local_count: usize) -> Result<()> {
        self.frame_teardown();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_offsets_use_wide_stride() {
        assert_eq!(local_offset(0), 4);
        assert_eq!(local_offset(2), 12);
    }

    #[test]
    fn test_word16_matches_native_width() {
        assert_eq!(word16(0x1234).unwrap(), 0x1234);
        assert!(word16(70000).is_err());
    }
}
