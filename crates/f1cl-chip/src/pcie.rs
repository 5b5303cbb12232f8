//! PCIe identifiers and clock constants.
//!
//! Source: F1 shell defaults; the identity is what the AFI reports on
//! the application PF once loaded.

/// Amazon PCI vendor ID.
pub const AMAZON_VENDOR_ID: u16 = 0x1D0F;

/// Device ID preassigned for F1 application PFs (`lspci: 1d0f:f000`).
pub const F1_APP_DEVICE_ID: u16 = 0xF000;

/// CL clock period in nanoseconds (clk_main_a0 at 125 MHz).
///
/// The elapsed-tick register counts in this unit.
pub const TICK_NS: u64 = 8;

/// Convert a tick count from the CL into nanoseconds.
#[must_use]
pub const fn ticks_to_ns(ticks: u32) -> u64 {
    ticks as u64 * TICK_NS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ticks_are_eight_ns() {
        assert_eq!(ticks_to_ns(125_000), 1_000_000);
    }
}
