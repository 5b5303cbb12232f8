//! Host ↔ register byte-order conversion
//!
//! The CL takes its operand as little-endian words (byte 0 in bits 0–7)
//! and presents its result most-significant byte first. The two directions
//! are deliberately asymmetric; both are fixed by the hardware.

use bytes::{Buf, BufMut, BytesMut};
use f1cl_chip::regs::{INPUT_WORDS, OUTPUT_WORDS};

/// Operand size in bytes.
pub const INPUT_LEN: usize = INPUT_WORDS * 4;

/// Result size in bytes.
pub const OUTPUT_LEN: usize = OUTPUT_WORDS * 4;

/// Assemble one register word from four bytes, least-significant first.
#[must_use]
pub const fn assemble_le(bytes: [u8; 4]) -> u32 {
    u32::from_le_bytes(bytes)
}

/// Split one register word into four bytes, most-significant first.
#[must_use]
pub const fn decompose_be(word: u32) -> [u8; 4] {
    word.to_be_bytes()
}

/// Reverse all four bytes of a word.
#[must_use]
pub const fn byte_swap(word: u32) -> u32 {
    word.swap_bytes()
}

/// Encode an operand into input-bank words, index `i` from bytes `4i..4i+4`.
#[must_use]
pub fn encode_input(input: &[u8; INPUT_LEN]) -> [u32; INPUT_WORDS] {
    let mut buf = &input[..];
    let mut words = [0u32; INPUT_WORDS];
    for word in &mut words {
        *word = buf.get_u32_le();
    }
    words
}

/// Recover the operand from input-bank words. Inverse of [`encode_input`].
#[must_use]
pub fn decode_input(words: &[u32; INPUT_WORDS]) -> [u8; INPUT_LEN] {
    let mut buf = BytesMut::with_capacity(INPUT_LEN);
    for &word in words {
        buf.put_u32_le(word);
    }
    let mut bytes = [0u8; INPUT_LEN];
    bytes.copy_from_slice(&buf);
    bytes
}

/// Decode output-bank words, in read order, into result bytes.
#[must_use]
pub fn decode_output(words: &[u32; OUTPUT_WORDS]) -> [u8; OUTPUT_LEN] {
    let mut buf = BytesMut::with_capacity(OUTPUT_LEN);
    for &word in words {
        buf.put_u32(word);
    }
    let mut bytes = [0u8; OUTPUT_LEN];
    bytes.copy_from_slice(&buf);
    bytes
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const GOLDEN_INPUT: [u8; INPUT_LEN] = [
        0xC8, 0xE5, 0xB8, 0x75, 0x77, 0x87, 0x02, 0x44, 0x5B, 0x25, 0x65, 0x72, 0x76, 0xAB, 0xC5,
        0x6A, 0xA9, 0x91, 0x0B, 0x28, 0x35, 0x37, 0xCA, 0x43, 0x8B, 0x2C, 0xC5, 0x9B, 0x0C, 0xF9,
        0x37, 0x12,
    ];

    #[test]
    fn golden_input_words() {
        assert_eq!(
            encode_input(&GOLDEN_INPUT),
            [
                0x75b8_e5c8,
                0x4402_8777,
                0x7265_255b,
                0x6ac5_ab76,
                0x280b_91a9,
                0x43ca_3735,
                0x9bc5_2c8b,
                0x1237_f90c,
            ]
        );
    }

    #[test]
    fn input_codec_inverts() {
        assert_eq!(decode_input(&encode_input(&GOLDEN_INPUT)), GOLDEN_INPUT);
    }

    #[test]
    fn output_is_msb_first() {
        let out = decode_output(&[0x0102_0304, 0x0506_0708, 0x090A_0B0C, 0x0D0E_0F10, 0x1112_1314]);
        let expected: Vec<u8> = (1..=20).collect();
        assert_eq!(&out[..], &expected[..]);
    }

    #[test]
    fn decode_is_repeatable() {
        let words = [0xdead_beef, 0, u32::MAX, 0x1234_5678, 7];
        assert_eq!(decode_output(&words), decode_output(&words));
    }

    #[test]
    fn byte_swap_reference_value() {
        assert_eq!(byte_swap(0xefbe_adde), 0xdead_beef);
    }

    proptest! {
        #[test]
        fn le_assembly_then_be_split_reverses(bytes in any::<[u8; 4]>()) {
            let mut reversed = bytes;
            reversed.reverse();
            prop_assert_eq!(decompose_be(assemble_le(bytes)), reversed);
            prop_assert_eq!(assemble_le(bytes), byte_swap(u32::from_be_bytes(bytes)));
        }
    }
}
