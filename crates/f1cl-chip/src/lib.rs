//! Silicon model for the F1 proof-of-work custom logic (CL).
//!
//! This crate has **no dependencies** and **no hardware access**. It is a
//! pure model of the CL as seen from the host: register offsets and banks,
//! BAR layout of the application PF, and PCI identity constants.
//!
//! # Crate organisation
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`pcie`] | Vendor/device IDs of the application PF, CL clock |
//! | [`bar`] | Physical functions and BARs exposed by the shell |
//! | [`regs`] | OCL register map: input/output banks, status, self-test words |

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod bar;
pub mod pcie;
pub mod regs;
