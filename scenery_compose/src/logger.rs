// Copyright 2025 the Scenery Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Optional per-instruction log of a linearization pass.
//!
//! [`Recorder::finish`](crate::Recorder::finish) reports each instruction it consumes to a
//! [`Logger`]. Annotations are passed as [`fmt::Arguments`], so nothing is formatted unless a
//! logger is installed; without one every call is a single `Option` branch.

use alloc::string::String;
use core::fmt::{self, Write as _};

/// Receiver of instruction events. All methods default to no-ops.
pub trait Logger {
    /// Instruction `index` with `operand_count` operands starts.
    fn begin_instruction(&mut self, index: usize, opcode: &'static str, operand_count: usize) {
        _ = (index, opcode, operand_count);
    }

    /// Free-form note about the current instruction.
    fn add_annotation(&mut self, content: fmt::Arguments<'_>) {
        _ = content;
    }

    /// The current instruction is done.
    fn end_instruction(&mut self) {}
}

/// Thin wrapper around an optional [`Logger`].
pub(crate) struct InstructionLog<'a> {
    sink: Option<&'a mut dyn Logger>,
}

impl fmt::Debug for InstructionLog<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstructionLog")
            .field("enabled", &self.sink.is_some())
            .finish()
    }
}

impl<'a> InstructionLog<'a> {
    #[inline]
    pub(crate) fn new(sink: Option<&'a mut dyn Logger>) -> Self {
        Self { sink }
    }

    #[inline]
    pub(crate) fn begin(&mut self, index: usize, opcode: &'static str, operand_count: usize) {
        if let Some(sink) = &mut self.sink {
            sink.begin_instruction(index, opcode, operand_count);
        }
    }

    #[inline]
    pub(crate) fn annotate(&mut self, content: fmt::Arguments<'_>) {
        if let Some(sink) = &mut self.sink {
            sink.add_annotation(content);
        }
    }

    #[inline]
    pub(crate) fn end(&mut self) {
        if let Some(sink) = &mut self.sink {
            sink.end_instruction();
        }
    }
}

/// [`Logger`] writing one line per instruction.
///
/// ```
/// use scenery_compose::{Logger, TextLogger};
///
/// let mut log = TextLogger::new();
/// log.begin_instruction(0, "PushOpacity", 1);
/// log.add_annotation(format_args!("alpha={}", 0.5));
/// log.end_instruction();
/// assert_eq!(log.as_str(), "#0 PushOpacity(1) alpha=0.5\n");
/// ```
#[derive(Clone, Debug, Default)]
pub struct TextLogger {
    out: String,
}

impl TextLogger {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Text written so far.
    pub fn as_str(&self) -> &str {
        &self.out
    }

    /// Take the text, leaving the log empty.
    pub fn take(&mut self) -> String {
        core::mem::take(&mut self.out)
    }
}

impl Logger for TextLogger {
    fn begin_instruction(&mut self, index: usize, opcode: &'static str, operand_count: usize) {
        // Writing into a `String` cannot fail.
        _ = write!(self.out, "#{index} {opcode}({operand_count})");
    }

    fn add_annotation(&mut self, content: fmt::Arguments<'_>) {
        _ = write!(self.out, " {content}");
    }

    fn end_instruction(&mut self) {
        self.out.push('\n');
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Counting {
        begins: usize,
        annotations: usize,
    }

    impl Logger for Counting {
        fn begin_instruction(&mut self, _: usize, _: &'static str, _: usize) {
            self.begins += 1;
        }

        fn add_annotation(&mut self, _: fmt::Arguments<'_>) {
            self.annotations += 1;
        }
    }

    #[test]
    fn forwards_only_when_installed() {
        let mut none = InstructionLog::new(None);
        none.begin(0, "Pop", 0);
        none.annotate(format_args!("ignored"));
        none.end();

        let mut counting = Counting::default();
        let mut log = InstructionLog::new(Some(&mut counting));
        log.begin(0, "Pop", 0);
        log.annotate(format_args!("a"));
        log.annotate(format_args!("b"));
        log.end();
        assert_eq!((counting.begins, counting.annotations), (1, 2));
    }

    #[test]
    fn text_logger_take_resets() {
        let mut log = TextLogger::new();
        log.begin_instruction(3, "Pop", 0);
        log.end_instruction();
        assert_eq!(log.take(), "#3 Pop(0)\n");
        assert!(log.as_str().is_empty());
    }
}
