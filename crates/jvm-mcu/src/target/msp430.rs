//! MSP430-family backend: 16-bit words, six-register operand window.
//!
//! ABI:
//!   r4..r9   operand window, r4 is the bottom, highest active is the top
//!   r12      frame base, points at the current method's locals
//!   r14,r15  scratch, r15 doubles as the return-value register
//!
//! Outgoing call parameters are copied below the stack pointer so they line
//! up with the callee's local slots once the return address is pushed.

use crate::asm::{AsmBuf, LabelAlloc};
use crate::target::{AluOp, Cond, Generator, OperandWindow, ShiftOp, Slot};
use crate::{Error, Result};

const WINDOW: usize = 6;
const SLOT_STRIDE: usize = 2;

/// Supported chip variants; they differ only in memory origins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Msp430Chip {
    G2231,
    G2553,
}

impl Msp430Chip {
    const fn flash_start(self) -> u16 {
        match self {
            Self::G2231 => 0xf800,
            Self::G2553 => 0xc000,
        }
    }

    const fn stack_start(self) -> u16 {
        match self {
            Self::G2231 => 0x0280,
            Self::G2553 => 0x0400,
        }
    }
}

fn reg_name(index: usize) -> String {
    format!("r{}", index + 4)
}

fn local_offset(index: usize) -> usize {
    index * SLOT_STRIDE + 2
}

/// Range-check a literal against the native word and mask it.
fn word16(n: i32) -> Result<u16> {
    if !(-32768..=65535).contains(&n) {
        return Err(Error::LiteralOutOfRange {
            value: i64::from(n),
            bits: 16,
        });
    }
    Ok((n & 0xffff) as u16)
}

fn expect_reg(slot: Slot) -> Result<usize> {
    match slot {
        Slot::Reg(index) => Ok(index),
        Slot::Mem => Err(Error::Internal(
            "memory operand where placement rules require a register".to_string(),
        )),
    }
}

const fn alu_mnemonic(op: AluOp) -> &'static str {
    match op {
        AluOp::Add => "add",
        AluOp::Sub => "sub",
        AluOp::And => "and",
        AluOp::Or => "or",
        AluOp::Xor => "xor",
    }
}

pub struct Msp430 {
    out: AsmBuf,
    win: OperandWindow,
    labels: LabelAlloc,
    chip: Msp430Chip,
    need_read_spi: bool,
}

impl Msp430 {
    #[must_use]
    pub fn new(chip: Msp430Chip) -> Self {
        Self {
            out: AsmBuf::new(),
            win: OperandWindow::new(WINDOW),
            labels: LabelAlloc::new(),
            chip,
            need_read_spi: false,
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

    /// Load `src` onto the virtual stack, register window first.
    fn push_value(&mut self, src: &str) {
        match self.win.push() {
            Slot::Reg(i) => self.out.op(&format!("mov.w {src}, {}", reg_name(i))),
            Slot::Mem => self.out.op(&format!("push {src}")),
        }
    }

    /// Pop the virtual top into a directly addressable register. Window
    /// values are referenced in place at zero cost; memory values cost one
    /// pop into r15.
    fn pop_value(&mut self) -> Result<String> {
        match self.win.pop()? {
            Slot::Reg(i) => Ok(reg_name(i)),
            Slot::Mem => {
                self.out.op("pop r15");
                Ok("r15".to_string())
            }
        }
    }

    /// Addressable form of the current top without consuming it.
    fn top_operand(&self) -> Result<String> {
        Ok(match self.win.top()? {
            Slot::Reg(i) => reg_name(i),
            Slot::Mem => "0(SP)".to_string(),
        })
    }

    fn push_literal(&mut self, value: u16) {
        match self.win.push() {
            Slot::Reg(i) => self
                .out
                .op(&format!("mov.w #0x{value:04x}, {}", reg_name(i))),
            Slot::Mem => self.out.op(&format!("push #0x{value:04x}")),
        }
    }

    /// Binary ALU with both operands on the virtual stack. Consumes one
    /// slot; the result lands where the lower operand sat.
    fn stack_alu(&mut self, op: AluOp) -> Result<()> {
        let mnemonic = alu_mnemonic(op);
        match self.win.pop()? {
            Slot::Reg(top) => {
                let second = expect_reg(self.win.top()?)?;
                self.out.op(&format!(
                    "{mnemonic}.w {}, {}",
                    reg_name(top),
                    reg_name(second)
                ));
            }
            Slot::Mem => {
                self.out.op("pop r15");
                match self.win.top()? {
                    Slot::Reg(second) => self
                        .out
                        .op(&format!("{mnemonic}.w r15, {}", reg_name(second))),
                    Slot::Mem => self.out.op(&format!("{mnemonic}.w r15, 0(SP)")),
                }
            }
        }
        Ok(())
    }

    /// Binary ALU with a compile-time right operand, folded in place on the
    /// top slot. Identity and unit operands lower to cheaper forms.
    fn stack_alu_const(&mut self, op: AluOp, num: i32) -> Result<()> {
        let value = word16(num)?;

        if matches!(op, AluOp::Add | AluOp::Sub) {
            if num == 0 {
                return Ok(());
            }
            let unit = match (op, num) {
                (AluOp::Add, 1) | (AluOp::Sub, -1) => Some("inc.w"),
                (AluOp::Add, -1) | (AluOp::Sub, 1) => Some("dec.w"),
                _ => None,
            };
            if let Some(mnemonic) = unit {
                let dst = self.top_operand()?;
                self.out.op(&format!("{mnemonic} {dst}"));
                return Ok(());
            }
        }

        let mnemonic = alu_mnemonic(op);
        let dst = self.top_operand()?;
        self.out.op(&format!("{mnemonic}.w #0x{value:04x}, {dst}"));
        Ok(())
    }

    const fn shift_mnemonic(op: ShiftOp) -> &'static str {
        match op {
            ShiftOp::Left => "rla.w",
            ShiftOp::RightArithmetic => "rra.w",
            // rrc with a cleared carry shifts a zero into the sign bit
            ShiftOp::RightLogical => "rrc.w",
        }
    }

    fn emit_one_shift(&mut self, op: ShiftOp, dst: &str) {
        if op == ShiftOp::RightLogical {
            self.out.op("clrc");
        }
        self.out.op(&format!("{} {dst}", Self::shift_mnemonic(op)));
    }

    /// Runtime shift count: pop it into r15 and loop one single-bit shift
    /// per iteration. A zero count must shift nothing, hence the guard
    /// around the decrement-and-branch loop.
    fn shift_loop(&mut self, op: ShiftOp) -> Result<()> {
        match self.win.pop()? {
            Slot::Mem => self.out.op("pop r15"),
            Slot::Reg(i) => self.out.op(&format!("mov.w {}, r15", reg_name(i))),
        }

        let head = self.labels.alloc();
        let done = self.labels.alloc();
        let dst = self.top_operand()?;

        self.out.op("tst.w r15");
        self.out.op(&format!("jz {done}"));
        self.out.label(&head);
        self.emit_one_shift(op, &dst);
        self.out.op("dec.w r15");
        self.out.op(&format!("jnz {head}"));
        self.out.label(&done);
        Ok(())
    }

    /// Compile-time shift count: unroll into `count` single-bit shifts.
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
        let dst = self.top_operand()?;
        for _ in 0..count {
            self.emit_one_shift(op, &dst);
        }
        Ok(())
    }

    /// Emit the branch(es) for a comparison whose flags are already set by
    /// `cmp.w src, dst` computing `dst - src`. The core only has jz, jnz,
    /// jl and jge; the remaining kinds are built from those.
    fn emit_cond_branch(&mut self, cond: Cond, label: &str) {
        match cond {
            Cond::Equal => self.out.op(&format!("jz {label}")),
            Cond::NotEqual => self.out.op(&format!("jnz {label}")),
            Cond::Less => self.out.op(&format!("jl {label}")),
            Cond::GreaterOrEqual => self.out.op(&format!("jge {label}")),
            Cond::LessOrEqual => {
                self.out.op(&format!("jz {label}"));
                self.out.op(&format!("jl {label}"));
            }
            Cond::Greater => {
                let skip = self.labels.alloc();
                self.out.op(&format!("jz {skip}"));
                self.out.op(&format!("jge {label}"));
                self.out.label(&skip);
            }
        }
    }

    fn memory_read(&mut self, suffix: char) -> Result<()> {
        // Address on top is replaced by the loaded value in place.
        match self.win.top()? {
            Slot::Mem => self.out.op(&format!("mov.{suffix} @SP, 0(SP)")),
            Slot::Reg(i) => {
                let reg = reg_name(i);
                self.out.op(&format!("mov.{suffix} @{reg}, {reg}"));
            }
        }
        Ok(())
    }

    fn memory_write(&mut self, suffix: char) -> Result<()> {
        // Top is the value, second is the address; both are consumed.
        if self.win.mem() >= 2 {
            self.win.pop()?;
            self.win.pop()?;
            self.out.op("mov.w 2(SP), r15");
            self.out.op(&format!("mov.{suffix} @SP, 0(r15)"));
            self.out.op("add.w #4, SP");
        } else if self.win.mem() == 1 {
            self.win.pop()?;
            let addr = expect_reg(self.win.pop()?)?;
            if suffix == 'b' {
                self.out.op(&format!("mov.b @SP, 0({})", reg_name(addr)));
                self.out.op("add.w #2, SP");
            } else {
                self.out.op(&format!("pop 0({})", reg_name(addr)));
            }
        } else {
            let value = expect_reg(self.win.pop()?)?;
            let addr = expect_reg(self.win.pop()?)?;
            self.out.op(&format!(
                "mov.{suffix} {}, 0({})",
                reg_name(value),
                reg_name(addr)
            ));
        }
        Ok(())
    }

    fn frame_teardown(&mut self) {
        self.out.op("mov.w r12, SP");
        self.out.op("ret");
    }
}

impl Generator for Msp430 {
    fn open(&mut self) -> Result<()> {
        self.out.raw(".msp430");
        self.out.raw(".include \"msp430x2xx.inc\"");
        self.out.blank();

        self.out
            .raw(&format!(".org 0x{:04x}", self.chip.flash_start()));
        self.out.label("start");
        self.out.op("mov.w #(WDTPW|WDTHOLD), &WDTCTL");
        self.out
            .op(&format!("mov.w #0x{:04x}, SP", self.chip.stack_start()));
        self.out.op("jmp main");
        self.out.blank();
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        if self.need_read_spi {
            self.out.raw("; _read_spi(r15)");
            self.out.label("_read_spi");
            self.out.op("mov.b r15, &USISRL");
            self.out.op("mov.b #8, &USICNT");
            self.out.label("_read_spi_wait");
            self.out.op("bit.b #USIIFG, &USICTL1");
            self.out.op("jz _read_spi_wait");
            self.out.op("mov.b &USISRL, r15");
            self.out.op("ret");
            self.out.blank();
        }

        self.out.raw(".org 0xfffe");
        self.out.op("dw start");
        Ok(())
    }

    fn output(&self) -> &str {
        self.out.as_str()
    }

    fn method_start(&mut self, local_count: usize, name: &str) -> Result<()> {
        self.win.reset();

        self.out.label(name);
        self.out.op("mov.w SP, r12");
        if local_count > 0 {
            self.out
                .op(&format!("sub.w #0x{:x}, SP", local_count * SLOT_STRIDE));
        }
        Ok(())
    }

    fn method_end(&mut self, _local_count: usize) -> Result<()> {
        self.out.blank();
        Ok(())
    }

    fn push_integer(&mut self, n: i32) -> Result<()> {
        let value = word16(n)?;
        self.push_literal(value);
        Ok(())
    }

    fn push_byte(&mut self, b: i8) -> Result<()> {
        // Sign-extended to the native word; masking is the documented
        // behavior for sub-word literals.
        self.push_literal(i16::from(b) as u16);
        Ok(())
    }

    fn push_short(&mut self, s: i16) -> Result<()> {
        self.push_literal(s as u16);
        Ok(())
    }

    fn push_integer_local(&mut self, index: usize) -> Result<()> {
        let off = local_offset(index);
        match self.win.push() {
            Slot::Reg(i) => self
                .out
                .op(&format!("mov.w -{off}(r12), {}", reg_name(i))),
            Slot::Mem => self.out.op(&format!("push -{off}(r12)")),
        }
        Ok(())
    }

    fn pop_integer_local(&mut self, index: usize) -> Result<()> {
        let off = local_offset(index);
        match self.win.pop()? {
            Slot::Mem => self.out.op(&format!("pop -{off}(r12)")),
            Slot::Reg(i) => self
                .out
                .op(&format!("mov.w {}, -{off}(r12)", reg_name(i))),
        }
        Ok(())
    }

    fn pop(&mut self) -> Result<()> {
        // Register pops are free; only a memory-resident top costs an
        // instruction, discarded into the constant generator.
        if self.win.pop()? == Slot::Mem {
            self.out.op("pop cg");
        }
        Ok(())
    }

    fn dup(&mut self) -> Result<()> {
        let top = self.win.top()?;
        match (top, self.win.push()) {
            (Slot::Mem, Slot::Mem) => self.out.op("push @SP"),
            // Saturated window: the copy spills.
            (Slot::Reg(i), Slot::Mem) => self.out.op(&format!("push {}", reg_name(i))),
            (Slot::Reg(i), Slot::Reg(j)) => self
                .out
                .op(&format!("mov.w {}, {}", reg_name(i), reg_name(j))),
            (Slot::Mem, Slot::Reg(_)) => {
                return Err(Error::Internal(
                    "window gained room while values overflow the stack".to_string(),
                ));
            }
        }
        Ok(())
    }

    fn dup2(&mut self) -> Result<()> {
        let second = self.win.second()?;
        let top = self.win.top()?;
        match (second, top) {
            (Slot::Reg(s), Slot::Reg(t)) => {
                match self.win.push() {
                    Slot::Reg(i) => self
                        .out
                        .op(&format!("mov.w {}, {}", reg_name(s), reg_name(i))),
                    Slot::Mem => self.out.op(&format!("push {}", reg_name(s))),
                }
                match self.win.push() {
                    Slot::Reg(i) => self
                        .out
                        .op(&format!("mov.w {}, {}", reg_name(t), reg_name(i))),
                    Slot::Mem => self.out.op(&format!("push {}", reg_name(t))),
                }
            }
            (Slot::Reg(s), Slot::Mem) => {
                // Top already spilled, so both copies spill too.
                self.win.push();
                self.out.op(&format!("push {}", reg_name(s)));
                self.win.push();
                self.out.op("push 2(SP)");
            }
            (Slot::Mem, Slot::Mem) => {
                self.win.push();
                self.out.op("push 2(SP)");
                self.win.push();
                self.out.op("push 2(SP)");
            }
            (Slot::Mem, Slot::Reg(_)) => {
                return Err(Error::Internal(
                    "memory operand below a register operand".to_string(),
                ));
            }
        }
        Ok(())
    }

    fn swap(&mut self) -> Result<()> {
        let top = self.win.top()?;
        let second = self.win.second()?;
        match (second, top) {
            (Slot::Reg(s), Slot::Reg(t)) => {
                let (s, t) = (reg_name(s), reg_name(t));
                self.out.op(&format!("mov.w {t}, r15"));
                self.out.op(&format!("mov.w {s}, {t}"));
                self.out.op(&format!("mov.w r15, {s}"));
            }
            (Slot::Reg(s), Slot::Mem) => {
                let s = reg_name(s);
                self.out.op(&format!("mov.w {s}, r15"));
                self.out.op(&format!("mov.w @SP, {s}"));
                self.out.op("mov.w r15, 0(SP)");
            }
            (Slot::Mem, Slot::Mem) => {
                self.out.op("mov.w 2(SP), r15");
                self.out.op("mov.w @SP, 2(SP)");
                self.out.op("mov.w r15, 0(SP)");
            }
            (Slot::Mem, Slot::Reg(_)) => {
                return Err(Error::Internal(
                    "memory operand below a register operand".to_string(),
                ));
            }
        }
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
        let dst = self.top_operand()?;
        self.out.op(&format!("neg.w {dst}"));
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
        let off = local_offset(index);
        match num {
            0 => {}
            1 => self.out.op(&format!("inc.w -{off}(r12)")),
            -1 => self.out.op(&format!("dec.w -{off}(r12)")),
            _ => self
                .out
                .op(&format!("add.w #0x{value:04x}, -{off}(r12)")),
        }
        Ok(())
    }

    fn jump(&mut self, label: &str) -> Result<()> {
        self.out.op(&format!("jmp {label}"));
        Ok(())
    }

    fn call(&mut self, label: &str) -> Result<()> {
        self.out.op(&format!("call #{label}"));
        Ok(())
    }

    fn jump_cond(&mut self, label: &str, cond: Cond) -> Result<()> {
        // Compare the consumed top against zero; tst leaves dst - 0 flags.
        match self.win.pop()? {
            Slot::Mem => {
                self.out.op("pop r15");
                self.out.op("tst.w r15");
            }
            Slot::Reg(i) => self.out.op(&format!("tst.w {}", reg_name(i))),
        }
        self.emit_cond_branch(cond, label);
        Ok(())
    }

    fn jump_cond_integer(&mut self, label: &str, cond: Cond) -> Result<()> {
        let top = match self.win.pop()? {
            Slot::Mem => {
                self.out.op("pop r15");
                "r15".to_string()
            }
            Slot::Reg(i) => reg_name(i),
        };
        let second = match self.win.pop()? {
            Slot::Mem => {
                self.out.op("pop r14");
                "r14".to_string()
            }
            Slot::Reg(i) => reg_name(i),
        };

        // cmp.w src, dst sets flags for dst - src. The kinds the core has
        // no mnemonic for are realized by swapping the operands.
        match cond {
            Cond::Equal | Cond::NotEqual | Cond::Less | Cond::GreaterOrEqual => {
                self.out.op(&format!("cmp.w {top}, {second}"));
                self.emit_cond_branch(cond, label);
            }
            Cond::LessOrEqual => {
                self.out.op(&format!("cmp.w {second}, {top}"));
                self.emit_cond_branch(Cond::GreaterOrEqual, label);
            }
            Cond::Greater => {
                self.out.op(&format!("cmp.w {second}, {top}"));
                self.emit_cond_branch(Cond::Less, label);
            }
        }
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

        let saved = self.win.regs();
        let stack_params = params.min(self.win.mem());
        let reg_params = params - stack_params;

        // Caller-saved convention: spill the whole window, bottom first.
        for n in 0..saved {
            self.out.op(&format!("push {}", reg_name(n)));
        }

        // Copy parameter j into the callee's local slot j, which sits just
        // below the return address the call is about to push. The deepest
        // parameter is local 0.
        for j in 0..params {
            let dst = -((j * SLOT_STRIDE + 4) as i32);
            if j < reg_params {
                let k = saved - reg_params + j;
                self.out
                    .op(&format!("mov.w {}, {dst}(SP)", reg_name(k)));
            } else {
                let src = (saved + (params - 1 - j)) * SLOT_STRIDE;
                self.out.op(&format!("mov.w {src}(SP), {dst}(SP)"));
            }
        }

        self.out.op(&format!("call #{name}"));

        // Restore the window in reverse order.
        for n in (0..saved).rev() {
            self.out.op(&format!("pop {}", reg_name(n)));
        }

        // Reclaim the memory the stack-resident parameters occupied, then
        // drop all consumed parameters from the tracker (memory side
        // drains first, matching stack_params + reg_params exactly).
        if stack_params > 0 {
            self.out
                .op(&format!("add.w #{}, SP", stack_params * SLOT_STRIDE));
        }
        for _ in 0..params {
            self.win.pop()?;
        }

        if !is_void {
            self.push_value("r15");
        }
        Ok(())
    }

    fn return_integer(&mut self, _local_count: usize) -> Result<()> {
        match self.win.pop()? {
            Slot::Mem => self.out.op("pop r15"),
            Slot::Reg(i) => self.out.op(&format!("mov.w {}, r15", reg_name(i))),
        }
        self.frame_teardown();
        Ok(())
    }

    fn return_local(&mut self, index: usize, _local_count: usize) -> Result<()> {
        let off = local_offset(index);
        self.out.op(&format!("mov.w -{off}(r12), r15"));
        self.frame_teardown();
        Ok(())
    }

    fn return_void(&mut self, _local_count: usize) -> Result<()> {
        self.frame_teardown();
        Ok(())
    }

    fn memory_read8(&mut self) -> Result<()> {
        self.memory_read('b')
    }

    fn memory_write8(&mut self) -> Result<()> {
        self.memory_write('b')
    }

    fn memory_read16(&mut self) -> Result<()> {
        self.memory_read('w')
    }

    fn memory_write16(&mut self) -> Result<()> {
        self.memory_write('w')
    }

    fn ioport_set_pins_as_input(&mut self, port: usize) -> Result<()> {
        let src = self.pop_value()?;
        self.out
            .op(&format!("bic.b {src}, &P{}DIR", port + 1));
        Ok(())
    }

    fn ioport_set_pins_as_output(&mut self, port: usize) -> Result<()> {
        let src = self.pop_value()?;
        self.out
            .op(&format!("bis.b {src}, &P{}DIR", port + 1));
        Ok(())
    }

    fn ioport_set_port_output_value(&mut self, port: usize) -> Result<()> {
        let src = self.pop_value()?;
        self.out
            .op(&format!("mov.b {src}, &P{}OUT", port + 1));
        Ok(())
    }

    fn spi_init(&mut self, _port: usize) -> Result<()> {
        // Two operands: clock configuration on top of the SPI mode.
        self.out.raw("  ;; Set up SPI");
        self.out
            .op("mov.b #(USIPE7|USIPE6|USIPE5|USIMST|USIOE|USISWRST), &USICTL0");
        let mode = self.pop_value()?;
        self.out.op(&format!("mov.b {mode}, r14"));
        self.out.op("rrc.b r14");
        self.out.op("rrc.b r14");
        self.out.op("and.b #0x80, r14 ; CPHA/USICKPH");
        self.out.op("mov.b r14, &USICTL1");
        self.out.op(&format!("mov.b {mode}, r14"));
        self.out.op("and.b #0x02, r14");
        let clock = self.pop_value()?;
        self.out.op(&format!("rrc.b {clock}"));
        self.out.op(&format!("rrc.b {clock}"));
        self.out.op(&format!("rrc.b {clock}"));
        self.out.op(&format!("rrc.b {clock}"));
        self.out.op(&format!("and.b #0xe0, {clock}"));
        self.out.op(&format!("or.b {clock}, r14"));
        self.out.op("mov.b r14, &USICKCTL ; DIV and CPOL/USICKPL");
        self.out.op("bic.b #USISWRST, &USICTL0      ; clear reset");
        self.out.blank();
        Ok(())
    }

    fn spi_send(&mut self, _port: usize) -> Result<()> {
        let src = self.pop_value()?;
        if src != "r15" {
            self.out.op(&format!("mov.b {src}, r15"));
        }
        self.out.op("call #_read_spi");
        self.push_value("r15");
        self.need_read_spi = true;
        Ok(())
    }

    fn spi_read(&mut self, _port: usize) -> Result<()> {
        self.out.op("call #_read_spi");
        self.push_value("r15");
        self.need_read_spi = true;
        Ok(())
    }

    fn spi_is_data_available(&mut self, _port: usize) -> Result<()> {
        self.out.op("mov.b &USICTL1, r15");
        self.out.op("and.b #USIIFG, r15");
        self.push_value("r15");
        Ok(())
    }

    fn cpu_set_clock16(&mut self) -> Result<()> {
        self.out.op(";; Set MCLK to 16 MHz with DCO");
        self.out.op("mov.b #DCO_4, &DCOCTL");
        self.out.op("mov.b #RSEL_15, &BCSCTL1");
        self.out.op("mov.b #0, &BCSCTL2");
        self.out.blank();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_word16_range() {
        assert_eq!(word16(-1).unwrap(), 0xffff);
        assert_eq!(word16(65535).unwrap(), 0xffff);
        assert_eq!(word16(-32768).unwrap(), 0x8000);
        assert!(matches!(
            word16(65536),
            Err(Error::LiteralOutOfRange { value: 65536, bits: 16 })
        ));
        assert!(matches!(
            word16(-32769),
            Err(Error::LiteralOutOfRange { .. })
        ));
    }

    #[test]
    fn test_window_registers_start_at_r4() {
        assert_eq!(reg_name(0), "r4");
        assert_eq!(reg_name(5), "r9");
    }

    #[test]
    fn test_local_offsets_use_word_stride() {
        assert_eq!(local_offset(0), 2);
        assert_eq!(local_offset(3), 8);
    }
}
