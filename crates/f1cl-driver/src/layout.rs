//! Register layout handed to the protocol
//!
//! Plain addressing metadata. The default is the hardware map from
//! `f1cl_chip::regs`; a different CL revision supplies its own constants.

use f1cl_chip::regs::{self, INPUT_WORDS, OUTPUT_WORDS};

/// Fixed register offsets used by one invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterLayout {
    /// Input bank, indexed by word number; loaded from the last entry down
    pub input_bank: [usize; INPUT_WORDS],

    /// Output bank in read order
    pub output_bank: [usize; OUTPUT_WORDS],

    /// Register polled for a non-zero completion value
    pub status: usize,

    /// Scratch register written by the self-test
    pub scratch: usize,

    /// Register sampled while the self-test stages
    pub probe: usize,

    /// Self-test diagnostic words in write order
    pub selftest_words: [(usize, u32); 7],

    /// Self-test commit write
    pub selftest_commit: (usize, u32),

    /// Registers read after the self-test, result register last
    pub selftest_readback: [usize; OUTPUT_WORDS],
}

impl RegisterLayout {
    /// Input-bank offsets in the order they are written
    pub fn load_order(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.input_bank.iter().copied().enumerate().rev()
    }

    /// Offset whose write commits the operand
    #[must_use]
    pub const fn trigger(&self) -> usize {
        self.input_bank[0]
    }
}

impl Default for RegisterLayout {
    fn default() -> Self {
        Self {
            input_bank: regs::INPUT_BANK,
            output_bank: regs::OUTPUT_BANK,
            status: regs::STATUS,
            scratch: regs::HELLO_WORLD,
            probe: regs::SELFTEST_PROBE,
            selftest_words: regs::SELFTEST_WORDS,
            selftest_commit: regs::SELFTEST_COMMIT,
            selftest_readback: regs::SELFTEST_READBACK,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_order_descends_to_trigger() {
        let layout = RegisterLayout::default();
        let offsets: Vec<usize> = layout.load_order().map(|(_, off)| off).collect();
        assert_eq!(
            offsets,
            vec![0x524, 0x520, 0x51C, 0x518, 0x514, 0x510, 0x50C, 0x508]
        );
        assert_eq!(offsets.last().copied(), Some(layout.trigger()));
    }

    #[test]
    fn load_order_pairs_word_index() {
        let layout = RegisterLayout::default();
        let first = layout.load_order().next();
        assert_eq!(first, Some((7, 0x524)));
    }
}
