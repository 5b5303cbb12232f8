//! Image readiness check
//!
//! Before its registers mean anything, the application PF must report the
//! identity of the proof-of-work image. A freshly loaded image can still
//! show the previous identity until the bus is rescanned, so a mismatch
//! triggers exactly one rescan before giving up.

use crate::config::DriverConfig;
use crate::discovery::{discover, read_identity};
use crate::error::{ClError, Result};
use std::path::Path;
use tracing::{info, warn};

/// Verify the device at `pcie_address` reports the configured identity
///
/// # Errors
///
/// Returns `ClError::ImageNotReady` if the device cannot be inspected or
/// rescanned, and `ClError::IdentityMismatch` if the identity is still
/// wrong after one rescan.
pub fn check_image_ready(config: &DriverConfig, pcie_address: &str) -> Result<()> {
    let device_dir = config.sysfs_root.join("bus/pci/devices").join(pcie_address);
    if !device_dir.exists() {
        return Err(ClError::image_not_ready(format!(
            "No PCI device at {pcie_address}"
        )));
    }

    let found = read_identity(&device_dir)?;
    info!("{pcie_address}: PCI vendor/device {found}");
    if found == config.identity {
        return Ok(());
    }

    warn!(
        "{pcie_address} reports {found}, expected {}; rescanning",
        config.identity
    );
    rescan(&config.sysfs_root)?;

    let found = read_identity(&device_dir)?;
    info!("{pcie_address}: PCI vendor/device {found} after rescan");
    if found == config.identity {
        Ok(())
    } else {
        Err(ClError::IdentityMismatch {
            expected: config.identity.to_string(),
            found: found.to_string(),
        })
    }
}

/// Resolve the configured device and verify its identity
///
/// With an explicit address the address is checked directly. Otherwise the
/// slot is looked up among matching devices, rescanning once if it is empty.
///
/// # Errors
///
/// As [`check_image_ready`], plus `ClError::DeviceNotFound` when the slot
/// stays empty after a rescan.
pub fn ensure_ready(config: &DriverConfig) -> Result<String> {
    if let Some(addr) = &config.selector.pcie_address {
        check_image_ready(config, addr)?;
        return Ok(addr.clone());
    }

    let slot = config.selector.slot;
    if let Some(info) = discover(&config.sysfs_root, &config.identity)?.into_iter().nth(slot) {
        return Ok(info.pcie_address);
    }

    warn!("No device with identity {} in slot {slot}; rescanning", config.identity);
    rescan(&config.sysfs_root)?;

    discover(&config.sysfs_root, &config.identity)?
        .into_iter()
        .nth(slot)
        .map(|info| info.pcie_address)
        .ok_or(ClError::DeviceNotFound { slot })
}

fn rescan(sysfs_root: &Path) -> Result<()> {
    let path = sysfs_root.join("bus/pci/rescan");
    std::fs::write(&path, "1").map_err(|e| {
        ClError::image_not_ready(format!("Unable to rescan via {}: {e}", path.display()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::testing::FakeSysfs;
    use crate::port::DeviceSelector;

    fn config_for(sysfs: &FakeSysfs, selector: DeviceSelector) -> DriverConfig {
        DriverConfig {
            selector,
            sysfs_root: sysfs.path().to_path_buf(),
            ..DriverConfig::default()
        }
    }

    #[test]
    fn matching_identity_needs_no_rescan() {
        let sysfs = FakeSysfs::new();
        sysfs.add_device("0000:00:1d.0", 0x1d0f, 0xf000);
        let config = config_for(&sysfs, DeviceSelector::address("0000:00:1d.0"));

        check_image_ready(&config, "0000:00:1d.0").unwrap();
        assert!(!sysfs.path().join("bus/pci/rescan").exists());
    }

    #[test]
    fn mismatch_rescans_once_then_fails() {
        let sysfs = FakeSysfs::new();
        sysfs.add_device("0000:00:1d.0", 0x1d0f, 0x1042);
        let config = config_for(&sysfs, DeviceSelector::address("0000:00:1d.0"));

        match check_image_ready(&config, "0000:00:1d.0") {
            Err(ClError::IdentityMismatch { expected, found }) => {
                assert_eq!(expected, "1d0f:f000");
                assert_eq!(found, "1d0f:1042");
            }
            other => panic!("expected mismatch, got {other:?}"),
        }
        let rescan = std::fs::read_to_string(sysfs.path().join("bus/pci/rescan")).unwrap();
        assert_eq!(rescan, "1");
    }

    #[test]
    fn missing_device_not_ready() {
        let sysfs = FakeSysfs::new();
        let config = config_for(&sysfs, DeviceSelector::default());
        let err = check_image_ready(&config, "0000:00:1d.0").unwrap_err();
        assert!(matches!(err, ClError::ImageNotReady { .. }));
    }

    #[test]
    fn ensure_ready_by_slot() {
        let sysfs = FakeSysfs::new();
        sysfs.add_device("0000:00:1d.0", 0x1d0f, 0xf000);
        assert_eq!(
            ensure_ready(&config_for(&sysfs, DeviceSelector::slot(0))).unwrap(),
            "0000:00:1d.0"
        );

        let err = ensure_ready(&config_for(&sysfs, DeviceSelector::slot(2))).unwrap_err();
        assert!(matches!(err, ClError::DeviceNotFound { slot: 2 }));
        assert!(sysfs.path().join("bus/pci/rescan").exists());
    }
}
