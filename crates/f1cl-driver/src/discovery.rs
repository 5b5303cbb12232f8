//! Runtime device discovery
//!
//! Finds application PFs carrying the configured image identity by
//! scanning `{sysfs_root}/bus/pci/devices`. Slots are assigned in PCIe
//! address order.

use crate::config::{parse_hex_u16, ImageIdentity};
use crate::error::{ClError, Result};
use crate::port::DeviceSelector;
use std::path::Path;

/// A discovered device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    /// Slot index (0, 1, 2, ...)
    pub slot: usize,

    /// PCIe bus address (0000:00:1d.0, etc.)
    pub pcie_address: String,

    /// Identity reported by sysfs
    pub identity: ImageIdentity,
}

/// List devices reporting `identity`
///
/// # Errors
///
/// Returns `ClError::ImageNotReady` if the PCI device directory cannot be read.
pub fn discover(sysfs_root: &Path, identity: &ImageIdentity) -> Result<Vec<DeviceInfo>> {
    let devices_dir = sysfs_root.join("bus/pci/devices");
    tracing::debug!("Scanning {} for {identity}", devices_dir.display());

    let entries = std::fs::read_dir(&devices_dir).map_err(|e| {
        ClError::image_not_ready(format!("Cannot scan {}: {e}", devices_dir.display()))
    })?;

    let mut addresses: Vec<String> = entries
        .flatten()
        .filter_map(|entry| {
            let found = read_identity(&entry.path()).ok()?;
            (found == *identity).then(|| entry.file_name().to_string_lossy().into_owned())
        })
        .collect();
    addresses.sort();

    let devices: Vec<DeviceInfo> = addresses
        .into_iter()
        .enumerate()
        .map(|(slot, pcie_address)| DeviceInfo {
            slot,
            pcie_address,
            identity: *identity,
        })
        .collect();

    tracing::info!("Found {} device(s) with identity {identity}", devices.len());
    Ok(devices)
}

/// PCIe address a selector refers to
///
/// An explicit address wins; otherwise the selector's slot is looked up.
///
/// # Errors
///
/// Returns `ClError::DeviceNotFound` if no device occupies the slot.
pub fn resolve_address(
    sysfs_root: &Path,
    identity: &ImageIdentity,
    selector: &DeviceSelector,
) -> Result<String> {
    if let Some(addr) = &selector.pcie_address {
        return Ok(addr.clone());
    }

    discover(sysfs_root, identity)?
        .into_iter()
        .nth(selector.slot)
        .map(|info| info.pcie_address)
        .ok_or(ClError::DeviceNotFound {
            slot: selector.slot,
        })
}

/// Read `vendor` and `device` from a sysfs PCI device directory
///
/// # Errors
///
/// Returns `ClError::ImageNotReady` if either file is missing or malformed.
pub fn read_identity(device_dir: &Path) -> Result<ImageIdentity> {
    let read = |name: &str| -> Result<u16> {
        let path = device_dir.join(name);
        let text = std::fs::read_to_string(&path).map_err(|e| {
            ClError::image_not_ready(format!("Cannot read {}: {e}", path.display()))
        })?;
        parse_hex_u16(name, &text).map_err(|e| ClError::image_not_ready(e.to_string()))
    };

    Ok(ImageIdentity {
        vendor_id: read("vendor")?,
        device_id: read("device")?,
    })
}


#[cfg(test)]
mod tests {
    use super::testing::FakeSysfs;
    use super::*;

    #[test]
    fn discovers_matching_devices_in_address_order() {
        let sysfs = FakeSysfs::new();
        sysfs.add_device("0000:00:1f.0", 0x1d0f, 0xf000);
        sysfs.add_device("0000:00:1d.0", 0x1d0f, 0xf000);
        sysfs.add_device("0000:00:1e.0", 0x1d0f, 0x1041);
        sysfs.add_device("0000:00:03.0", 0x8086, 0x1237);

        let devices = discover(sysfs.path(), &ImageIdentity::default()).unwrap();
        let addrs: Vec<&str> = devices.iter().map(|d| d.pcie_address.as_str()).collect();
        assert_eq!(addrs, vec!["0000:00:1d.0", "0000:00:1f.0"]);
        assert_eq!(devices[1].slot, 1);
    }

    #[test]
    fn resolve_prefers_explicit_address() {
        let sysfs = FakeSysfs::new();
        sysfs.add_device("0000:00:1d.0", 0x1d0f, 0xf000);
        let identity = ImageIdentity::default();

        let addr = resolve_address(sysfs.path(), &identity, &DeviceSelector::slot(0)).unwrap();
        assert_eq!(addr, "0000:00:1d.0");

        let addr =
            resolve_address(sysfs.path(), &identity, &DeviceSelector::address("0000:00:1f.0"))
                .unwrap();
        assert_eq!(addr, "0000:00:1f.0");

        let err = resolve_address(sysfs.path(), &identity, &DeviceSelector::slot(1)).unwrap_err();
        assert!(matches!(err, ClError::DeviceNotFound { slot: 1 }));
    }

    #[test]
    fn missing_sysfs_is_not_ready() {
        let err = discover(Path::new("/nonexistent/f1cl"), &ImageIdentity::default()).unwrap_err();
        assert!(matches!(err, ClError::ImageNotReady { .. }));
    }
}
