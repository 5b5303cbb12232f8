//! Register access port abstraction
//!
//! Unified interface for the hardware BAR mapping and the software model.
//! The protocol only needs word-granular peek/poke plus attach/detach.

use crate::config::DriverConfig;
use crate::error::Result;
use f1cl_chip::bar::{Bar, APP_PF_BAR0};
use std::fmt::Debug;

/// Register access port - word-granular access to the CL register file
///
/// No concurrency guarantee is expected from implementations; callers hold
/// the port exclusively for the duration of an invocation.
pub trait RegisterPort: Debug {
    /// Bind to the register window of the selected device
    ///
    /// # Errors
    ///
    /// Returns `ClError::Attach` if the window is unavailable or access is denied.
    fn attach(&mut self, selector: &DeviceSelector) -> Result<()>;

    /// Write one 32-bit word at a byte offset
    ///
    /// # Errors
    ///
    /// Returns `ClError::Io` on a transport fault or if not attached.
    fn poke(&mut self, offset: usize, value: u32) -> Result<()>;

    /// Read one 32-bit word at a byte offset
    ///
    /// # Errors
    ///
    /// Returns `ClError::Io` on a transport fault or if not attached.
    fn peek(&mut self, offset: usize) -> Result<u32>;

    /// Release the register window
    ///
    /// Idempotent: detaching an unattached port succeeds.
    ///
    /// # Errors
    ///
    /// Returns `ClError::Detach` if the window cannot be released.
    fn detach(&mut self) -> Result<()>;

    /// Port type for debugging
    fn port_type(&self) -> PortType;
}

impl<P: RegisterPort + ?Sized> RegisterPort for &mut P {
    fn attach(&mut self, selector: &DeviceSelector) -> Result<()> {
        (**self).attach(selector)
    }

    fn poke(&mut self, offset: usize, value: u32) -> Result<()> {
        (**self).poke(offset, value)
    }

    fn peek(&mut self, offset: usize) -> Result<u32> {
        (**self).peek(offset)
    }

    fn detach(&mut self) -> Result<()> {
        (**self).detach()
    }

    fn port_type(&self) -> PortType {
        (**self).port_type()
    }
}

impl<P: RegisterPort + ?Sized> RegisterPort for Box<P> {
    fn attach(&mut self, selector: &DeviceSelector) -> Result<()> {
        (**self).attach(selector)
    }

    fn poke(&mut self, offset: usize, value: u32) -> Result<()> {
        (**self).poke(offset, value)
    }

    fn peek(&mut self, offset: usize) -> Result<u32> {
        (**self).peek(offset)
    }

    fn detach(&mut self) -> Result<()> {
        (**self).detach()
    }

    fn port_type(&self) -> PortType {
        (**self).port_type()
    }
}

/// Which device and BAR a port binds to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceSelector {
    /// Slot index among matching devices (0, 1, ...)
    pub slot: usize,

    /// BAR holding the register file
    pub bar: Bar,

    /// Explicit PCIe address (0000:00:1d.0, etc.), bypasses discovery
    pub pcie_address: Option<String>,
}

impl DeviceSelector {
    /// Select a slot on the application PF BAR0
    #[must_use]
    pub const fn slot(slot: usize) -> Self {
        Self {
            slot,
            bar: APP_PF_BAR0,
            pcie_address: None,
        }
    }

    /// Select an explicit PCIe address on the application PF BAR0
    #[must_use]
    pub fn address(pcie_address: impl Into<String>) -> Self {
        Self {
            slot: 0,
            bar: APP_PF_BAR0,
            pcie_address: Some(pcie_address.into()),
        }
    }
}

impl Default for DeviceSelector {
    fn default() -> Self {
        Self::slot(0)
    }
}

/// Port type identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortType {
    /// sysfs BAR resource, memory-mapped
    Mmap,

    /// Software model of the CL, no hardware required
    Simulated,

    /// Test double
    Mock,
}

impl std::fmt::Display for PortType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Mmap => write!(f, "Mmap"),
            Self::Simulated => write!(f, "Simulated"),
            Self::Mock => write!(f, "Mock"),
        }
    }
}

/// Port selection strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortSelection {
    /// Memory-map the BAR of a real device
    Hardware,

    /// Software model, for CI and demos
    Simulated,
}

/// Build a port for the given harness
///
/// The port is returned unattached; the protocol attaches it per invocation.
pub fn select_port(selection: PortSelection, config: &DriverConfig) -> Box<dyn RegisterPort> {
    use crate::backends::mmap::MmapPort;
    use crate::backends::simulated::SimulatedAccelerator;

    match selection {
        PortSelection::Hardware => {
            tracing::debug!("Using mmap port (sysfs root {})", config.sysfs_root.display());
            Box::new(MmapPort::new(config))
        }
        PortSelection::Simulated => {
            tracing::debug!("Using simulated accelerator");
            Box::new(SimulatedAccelerator::new())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_selector_is_slot_zero_bar_zero() {
        let selector = DeviceSelector::default();
        assert_eq!(selector.slot, 0);
        assert_eq!(selector.bar, Bar::Ocl);
        assert!(selector.pcie_address.is_none());
    }

    #[test]
    fn select_simulated_port() {
        let port = select_port(PortSelection::Simulated, &DriverConfig::default());
        assert_eq!(port.port_type(), PortType::Simulated);
        assert_eq!(port.port_type().to_string(), "Simulated");
    }
}
