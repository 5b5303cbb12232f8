//! Register-level offload driver for the F1 proof-of-work custom logic.
//!
//! The CL takes a 32-byte block hash through eight input registers and
//! returns a 20-byte result (digest, work, elapsed ticks) through five
//! output registers. One invocation loads, triggers, polls, and unloads
//! synchronously over a [`RegisterPort`].
//!
//! # Port hierarchy
//!
//! ```text
//! Hardware:
//!   MmapPort             : sysfs BAR resource, volatile MMIO
//!
//! Development:
//!   SimulatedAccelerator : in-memory CL model with a real nonce search
//! ```
//!
//! # Quick start
//!
//! ```no_run
//! use f1cl_driver::{Accelerator, DriverConfig, MmapPort};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = DriverConfig::from_env()?;
//! f1cl_driver::ensure_ready(&config)?;
//!
//! let mut acc = Accelerator::from_config(MmapPort::new(&config), &config);
//! let out = acc.invoke(&[0u8; 32])?;
//! println!("work {:02x?} in {:?}", out.work(), out.elapsed());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::doc_markdown)]

pub mod backends;
mod block;
pub mod clock;
pub mod codec;
mod config;
mod discovery;
mod error;
mod identity;
mod layout;
mod port;
mod protocol;
pub mod work;

/// Register map re-exported from f1cl-chip.
pub mod regs {
    pub use f1cl_chip::regs::*;
}

pub use backends::{FaultPlan, MmapPort, SimulatedAccelerator};
pub use block::{InputBlock, OutputBlock};
pub use clock::{Clock, ManualClock, SystemClock};
pub use codec::{INPUT_LEN, OUTPUT_LEN};
pub use config::{DriverConfig, ImageIdentity, PollConfig};
pub use discovery::{discover, read_identity, resolve_address, DeviceInfo};
pub use error::{ClError, Result};
pub use identity::{check_image_ready, ensure_ready};
pub use layout::RegisterLayout;
pub use port::{select_port, DeviceSelector, PortSelection, PortType, RegisterPort};
pub use protocol::{invoke, verify_register, Accelerator, Phase};

/// Commonly used types.
pub mod prelude {
    pub use crate::{
        Accelerator, ClError, DeviceSelector, DriverConfig, InputBlock, MmapPort, OutputBlock,
        PollConfig, RegisterPort, Result, SimulatedAccelerator,
    };
}
