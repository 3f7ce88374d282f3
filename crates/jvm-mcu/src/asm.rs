//! Textual assembly output sink and branch-label allocation.

/// Append-only buffer of assembly text owned by one backend instance.
///
/// A failing operation leaves the buffer in whatever state it reached; the
/// driver is expected to discard the whole unit on the first error, so no
/// rollback is attempted here.
#[derive(Debug, Default)]
pub struct AsmBuf {
    text: String,
}

impl AsmBuf {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Emit one instruction line, indented.
    pub fn op(&mut self, line: &str) {
        self.text.push_str("  ");
        self.text.push_str(line);
        self.text.push('\n');
    }

    /// Emit a label definition in column zero.
    pub fn label(&mut self, name: &str) {
        self.text.push_str(name);
        self.text.push_str(":\n");
    }

    /// Emit an unindented line (directives, comments).
    pub fn raw(&mut self, line: &str) {
        self.text.push_str(line);
        self.text.push('\n');
    }

    pub fn blank(&mut self) {
        self.text.push('\n');
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn into_string(self) -> String {
        self.text
    }
}

/// Monotonic counter producing unique branch-target names.
///
/// One allocator per backend instance, created at construction and never
/// reset mid-compilation, so generated labels are unique across the whole
/// output file.
#[derive(Debug, Default)]
pub struct LabelAlloc {
    next: usize,
}

impl LabelAlloc {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc(&mut self) -> String {
        let id = self.next;
        self.next += 1;
        format!("label_{id}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels_are_unique_and_monotonic() {
        let mut labels = LabelAlloc::new();
        assert_eq!(labels.alloc(), "label_0");
        assert_eq!(labels.alloc(), "label_1");
        assert_eq!(labels.alloc(), "label_2");
    }

    #[test]
    fn test_buffer_layout() {
        let mut out = AsmBuf::new();
        out.raw(".target");
        out.label("main");
        out.op("nop");
        assert_eq!(out.as_str(), ".target\nmain:\n  nop\n");
    }
}
