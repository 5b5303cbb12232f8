//! Fixed-size operand and result blocks

use crate::codec::{self, INPUT_LEN, OUTPUT_LEN};
use crate::error::{ClError, Result};
use f1cl_chip::pcie::ticks_to_ns;
use f1cl_chip::regs::{INPUT_WORDS, OUTPUT_WORDS};
use std::fmt;
use std::time::Duration;

/// The 32-byte operand handed to the CL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InputBlock([u8; INPUT_LEN]);

impl InputBlock {
    /// Wrap an operand.
    #[must_use]
    pub const fn new(bytes: [u8; INPUT_LEN]) -> Self {
        Self(bytes)
    }

    /// Operand bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; INPUT_LEN] {
        &self.0
    }

    /// Input-bank words, indexed by word number.
    #[must_use]
    pub fn words(&self) -> [u32; INPUT_WORDS] {
        codec::encode_input(&self.0)
    }
}

impl TryFrom<&[u8]> for InputBlock {
    type Error = ClError;

    fn try_from(bytes: &[u8]) -> Result<Self> {
        let array: [u8; INPUT_LEN] = bytes.try_into().map_err(|_| ClError::InvalidInputLength {
            expected: INPUT_LEN,
            actual: bytes.len(),
        })?;
        Ok(Self(array))
    }
}

impl From<[u8; INPUT_LEN]> for InputBlock {
    fn from(bytes: [u8; INPUT_LEN]) -> Self {
        Self(bytes)
    }
}

/// The 20-byte result read back from the CL.
///
/// ```text
/// [ 0.. 8]  digest        (0x504 hi, 0x500 lo)
/// [ 8..16]  work          (0x50C hi, 0x508 lo)
/// [16..20]  elapsed ticks (0x510)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OutputBlock([u8; OUTPUT_LEN]);

impl OutputBlock {
    /// Decode output-bank words given in read order.
    #[must_use]
    pub fn from_words(words: &[u32; OUTPUT_WORDS]) -> Self {
        Self(codec::decode_output(words))
    }

    /// Result bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; OUTPUT_LEN] {
        &self.0
    }

    /// Consume into the raw bytes.
    #[must_use]
    pub const fn into_bytes(self) -> [u8; OUTPUT_LEN] {
        self.0
    }

    /// Digest of the winning work, big-endian.
    #[must_use]
    pub fn digest(&self) -> [u8; 8] {
        let mut out = [0u8; 8];
        out.copy_from_slice(&self.0[0..8]);
        out
    }

    /// Work value, big-endian.
    #[must_use]
    pub fn work(&self) -> [u8; 8] {
        let mut out = [0u8; 8];
        out.copy_from_slice(&self.0[8..16]);
        out
    }

    /// Raw tick counter of the finished job.
    #[must_use]
    pub fn elapsed_ticks(&self) -> u32 {
        u32::from_be_bytes([self.0[16], self.0[17], self.0[18], self.0[19]])
    }

    /// Time the CL spent on the job.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        Duration::from_nanos(ticks_to_ns(self.elapsed_ticks()))
    }
}

impl AsRef<[u8]> for OutputBlock {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for OutputBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_short_and_long_input() {
        for len in [0, 31, 33, 64] {
            let bytes = vec![0u8; len];
            match InputBlock::try_from(bytes.as_slice()) {
                Err(ClError::InvalidInputLength { expected, actual }) => {
                    assert_eq!(expected, 32);
                    assert_eq!(actual, len);
                }
                other => panic!("expected length error, got {other:?}"),
            }
        }
    }

    #[test]
    fn output_fields() {
        let out = OutputBlock::from_words(&[
            0x1111_2222,
            0x3333_4444,
            0xaabb_ccdd,
            0xeeff_0011,
            125,
        ]);
        assert_eq!(out.digest(), [0x11, 0x11, 0x22, 0x22, 0x33, 0x33, 0x44, 0x44]);
        assert_eq!(out.work(), [0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0xff, 0x00, 0x11]);
        assert_eq!(out.elapsed_ticks(), 125);
        assert_eq!(out.elapsed(), Duration::from_nanos(1000));
        assert_eq!(out.to_string().len(), 40);
        assert!(out.to_string().starts_with("11112222"));
    }
}
