//! Physical functions and BARs exposed by the F1 shell.
//!
//! ```text
//! PF   BAR  Bus              Purpose
//! ──── ──── ──────────────── ──────────────────────────────────────────
//!  0    0   sh_cl_ocl_       AXI-Lite to the CL register file (MMIO)
//!  0    1   sh_cl_sda_       AXI-Lite to CL management registers
//!  0    4   sh_cl_dma_pcis   512-bit DMA window into CL memory
//!  1    0   mgmt             Shell management (not used by the CL)
//! ```
//!
//! All registers in [`crate::regs`] live behind application PF BAR0.

/// BAR index on the application PF.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum Bar {
    /// BAR0: OCL AXI-Lite, the CL register file.
    Ocl = 0,
    /// BAR1: SDA AXI-Lite.
    Sda = 1,
    /// BAR4: PCIS DMA window.
    Pcis = 4,
}

impl Bar {
    /// sysfs `resourceN` index for this BAR.
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }
}

/// BAR holding the CL register file.
pub const APP_PF_BAR0: Bar = Bar::Ocl;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ocl_is_bar_zero() {
        assert_eq!(APP_PF_BAR0.index(), 0);
        assert_eq!(Bar::Sda.index(), 1);
        assert_eq!(Bar::Pcis.index(), 4);
    }
}
