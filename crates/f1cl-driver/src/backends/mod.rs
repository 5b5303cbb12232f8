//! Register port implementations
//!
//! Two ports available:
//! - **Mmap**: sysfs PCIe BAR resource, memory-mapped (real hardware)
//! - **Simulated**: in-memory model of the CL (CI, demos, fault injection)

pub mod mmap;
pub mod simulated;

pub use mmap::MmapPort;
pub use simulated::{FaultPlan, SimulatedAccelerator};
