//! OCL register map for the proof-of-work CL.
//!
//! Every offset is relative to application PF BAR0 and must match
//! `cl_common_defines.vh` on the hardware side. The CL is a shift-register
//! design: the host stages the operand from the top of the input bank
//! downwards, and the write to the lowest input register commits the job.
//!
//! ```text
//! 0x500  scratch ("hello world")      out word 1 (digest lo)
//! 0x504  virtual LED / status         out word 0 (digest hi)
//! 0x508  input word 0  ← trigger      out word 3 (work lo)
//! 0x50C  input word 1                 out word 2 (work hi)
//! 0x510  input word 2                 out word 4 (elapsed ticks, polled)
//! 0x514  input word 3                 self-test probe
//! 0x518  input word 4
//! 0x51C  input word 5
//! 0x520  input word 6
//! 0x524  input word 7  ← loaded first
//! ```
//!
//! The completion register is `0x510`, not the trigger, and the output bank
//! is read hi/lo per 64-bit value (`0x504, 0x500, 0x50C, 0x508`, then
//! `0x510`). Both match what the CL actually drives; do not reorder them
//! into ascending offsets.

// ── Scalar registers ─────────────────────────────────────────────────────────

/// General-purpose scratch register. Reads back byte-swapped on the
/// reference hello-world image.
pub const HELLO_WORLD: usize = 0x500;

/// Virtual LED / status register.
pub const VLED: usize = 0x504;

/// Completion register. Reads zero while the CL is busy, then the elapsed
/// tick count of the finished job.
pub const STATUS: usize = 0x510;

/// Probe register sampled by the self-test while staging.
pub const SELFTEST_PROBE: usize = 0x514;

// ── Input bank ───────────────────────────────────────────────────────────────

/// Number of 32-bit words in the input bank.
pub const INPUT_WORDS: usize = 8;

/// Input bank offsets, indexed by word number (word `i` carries bytes
/// `4i..4i+4` of the operand).
pub const INPUT_BANK: [usize; INPUT_WORDS] =
    [0x508, 0x50C, 0x510, 0x514, 0x518, 0x51C, 0x520, 0x524];

/// The lowest input register. Writing it commits the staged operand.
pub const TRIGGER: usize = INPUT_BANK[0];

// ── Output bank ──────────────────────────────────────────────────────────────

/// Number of 32-bit words in the output bank.
pub const OUTPUT_WORDS: usize = 5;

/// Output bank offsets in the order the host reads them.
///
/// High word before low word for each 64-bit quantity, then the tick
/// counter.
pub const OUTPUT_BANK: [usize; OUTPUT_WORDS] = [0x504, 0x500, 0x50C, 0x508, 0x510];

// ── Register window ──────────────────────────────────────────────────────────

/// First register the CL decodes.
pub const WINDOW_BASE: usize = 0x500;

/// One past the last register the CL decodes.
pub const WINDOW_END: usize = 0x528;

// ── Self-test sequence ───────────────────────────────────────────────────────

/// Diagnostic words staged by the self-test, in write order.
pub const SELFTEST_WORDS: [(usize, u32); 7] = [
    (0x520, 0x9bc5_2c8b),
    (0x51C, 0x43ca_3735),
    (0x518, 0x280b_91a9),
    (0x514, 0x6ac5_ab76),
    (0x510, 0x7265_255b),
    (0x50C, 0x4402_8777),
    (0x508, 0x75b8_e5c8),
];

/// Final self-test write. Commits the diagnostic job.
pub const SELFTEST_COMMIT: (usize, u32) = (0x524, 0x1237_f90c);

/// Registers read back after the self-test completes, in read order. The
/// last one carries the byte-swapped scratch value.
pub const SELFTEST_READBACK: [usize; OUTPUT_WORDS] = [0x500, 0x504, 0x508, 0x50C, 0x510];

/// Value written to the scratch register when none is given.
pub const SELFTEST_DEFAULT_VALUE: u32 = 0xefbe_adde;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_bank_is_contiguous() {
        for pair in INPUT_BANK.windows(2) {
            assert_eq!(pair[1] - pair[0], 4);
        }
        assert_eq!(TRIGGER, 0x508);
        assert_eq!(INPUT_BANK[INPUT_WORDS - 1], 0x524);
    }

    #[test]
    fn output_bank_within_window() {
        for offset in OUTPUT_BANK {
            assert!((WINDOW_BASE..WINDOW_END).contains(&offset));
            assert_eq!(offset % 4, 0);
        }
        assert_eq!(OUTPUT_BANK[OUTPUT_WORDS - 1], STATUS);
    }

    #[test]
    fn output_order_pairs_hi_before_lo() {
        assert_eq!(OUTPUT_BANK, [0x504, 0x500, 0x50C, 0x508, 0x510]);
        assert_eq!(STATUS, 0x510);
        assert_ne!(STATUS, TRIGGER);
    }

    #[test]
    fn selftest_commit_is_top_of_bank() {
        assert_eq!(SELFTEST_COMMIT.0, INPUT_BANK[INPUT_WORDS - 1]);
        assert!(SELFTEST_WORDS.iter().all(|(off, _)| *off != SELFTEST_COMMIT.0));
        assert_eq!(SELFTEST_READBACK[OUTPUT_WORDS - 1], STATUS);
    }
}
