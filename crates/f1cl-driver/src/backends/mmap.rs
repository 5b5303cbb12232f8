//! Memory-mapped BAR port
//!
//! Maps `/sys/bus/pci/devices/{addr}/resourceN` of the application PF and
//! performs volatile 32-bit accesses on it. Attach maps, detach unmaps.
//!
//! Writes are followed by a sequentially consistent fence so the CL sees
//! pokes in program order; the protocol relies on that for the trigger.

use crate::config::{DriverConfig, ImageIdentity};
use crate::discovery::resolve_address;
use crate::error::{ClError, Result};
use crate::port::{DeviceSelector, PortType, RegisterPort};
use rustix::mm::{mmap, munmap, MapFlags, ProtFlags};
use std::fs::{File, OpenOptions};
use std::os::unix::io::AsFd;
use std::path::{Path, PathBuf};
use std::ptr::NonNull;
use std::sync::atomic::{fence, Ordering};

/// Register port over a memory-mapped PCIe BAR
#[derive(Debug)]
pub struct MmapPort {
    sysfs_root: PathBuf,
    identity: ImageIdentity,
    region: Option<MmapRegion>,
}

impl MmapPort {
    /// Unattached port resolving devices under `config.sysfs_root`
    #[must_use]
    pub fn new(config: &DriverConfig) -> Self {
        Self {
            sysfs_root: config.sysfs_root.clone(),
            identity: config.identity,
            region: None,
        }
    }

    /// Whether a BAR is currently mapped
    #[must_use]
    pub const fn is_attached(&self) -> bool {
        self.region.is_some()
    }

    /// PCIe address of the mapped device
    #[must_use]
    pub fn pcie_address(&self) -> Option<&str> {
        self.region.as_ref().map(|r| r.pcie_address.as_str())
    }

    fn region(&self, offset: usize) -> Result<&MmapRegion> {
        self.region
            .as_ref()
            .ok_or_else(|| ClError::io(offset, "port not attached"))
    }
}

impl RegisterPort for MmapPort {
    fn attach(&mut self, selector: &DeviceSelector) -> Result<()> {
        if let Some(region) = &self.region {
            return Err(ClError::attach(format!(
                "already attached to {} BAR{}",
                region.pcie_address, region.bar_index
            )));
        }

        let pcie_address = resolve_address(&self.sysfs_root, &self.identity, selector)
            .map_err(|e| ClError::attach(e.to_string()))?;
        let path = self
            .sysfs_root
            .join("bus/pci/devices")
            .join(&pcie_address)
            .join(format!("resource{}", selector.bar.index()));

        self.region = Some(MmapRegion::map(&path, &pcie_address, selector.bar.index())?);
        Ok(())
    }

    fn poke(&mut self, offset: usize, value: u32) -> Result<()> {
        self.region(offset)?.write_u32(offset, value)
    }

    fn peek(&mut self, offset: usize) -> Result<u32> {
        self.region(offset)?.read_u32(offset)
    }

    fn detach(&mut self) -> Result<()> {
        match self.region.take() {
            Some(region) => region.unmap(),
            None => Ok(()),
        }
    }

    fn port_type(&self) -> PortType {
        PortType::Mmap
    }
}

/// One mapped BAR
#[derive(Debug)]
struct MmapRegion {
    ptr: NonNull<u8>,
    size: usize,
    mapped: bool,
    _file: File,
    pcie_address: String,
    bar_index: usize,
}

impl MmapRegion {
    fn map(path: &Path, pcie_address: &str, bar_index: usize) -> Result<Self> {
        tracing::debug!("Mapping PCIe BAR: {}", path.display());

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .map_err(|e| {
                ClError::attach(format!(
                    "Cannot open {}: {e}. Are you running as root?",
                    path.display()
                ))
            })?;

        // Truncation acceptable: BAR sizes fit in usize on 64-bit (our only target)
        #[allow(clippy::cast_possible_truncation)]
        let size = file
            .metadata()
            .map_err(|e| ClError::attach(format!("Cannot stat BAR: {e}")))?
            .len() as usize;

        if size == 0 {
            return Err(ClError::attach("BAR size is 0 (device not enabled?)"));
        }

        // SAFETY: mmap of a sysfs PCI resource file.
        // - fd is valid (just opened, kept alive in `_file` for the mapping's lifetime)
        // - size is non-zero and equals the resource length
        // - PROT_READ|PROT_WRITE + MAP_SHARED is what the resource file supports
        // - offset 0 is page aligned
        // - the mapping is released exactly once, in unmap() or Drop
        let addr = unsafe {
            mmap(
                std::ptr::null_mut(),
                size,
                ProtFlags::READ | ProtFlags::WRITE,
                MapFlags::SHARED,
                file.as_fd(),
                0,
            )
        }
        .map_err(|e| ClError::attach(format!("mmap failed: {e}")))?;

        let ptr = NonNull::new(addr.cast::<u8>())
            .ok_or_else(|| ClError::attach("mmap returned a null mapping"))?;

        tracing::info!(
            "Mapped BAR{bar_index} for {pcie_address} ({} KB at {ptr:p})",
            size / 1024,
        );

        Ok(Self {
            ptr,
            size,
            mapped: true,
            _file: file,
            pcie_address: pcie_address.to_string(),
            bar_index,
        })
    }

    fn check(&self, offset: usize) -> Result<()> {
        if offset % 4 != 0 {
            return Err(ClError::io(offset, "unaligned register offset"));
        }
        if offset.checked_add(4).map_or(true, |end| end > self.size) {
            return Err(ClError::io(
                offset,
                format!("out of bounds (limit {:#x})", self.size),
            ));
        }
        Ok(())
    }

    fn read_u32(&self, offset: usize) -> Result<u32> {
        self.check(offset)?;

        // SAFETY: volatile read from a mapped hardware register.
        // - offset is 4-byte aligned and offset + 4 <= size without overflow (checked above)
        // - ptr is the live mapping from map(); unmap() consumes self
        // - volatile keeps the compiler from caching or eliding the access
        #[allow(clippy::cast_ptr_alignment)]
        let value = unsafe { self.ptr.as_ptr().add(offset).cast::<u32>().read_volatile() };

        tracing::trace!("Read u32 @ {offset:#x} = {value:#x}");
        Ok(value)
    }

    fn write_u32(&self, offset: usize, value: u32) -> Result<()> {
        self.check(offset)?;
        tracing::trace!("Write u32 @ {offset:#x} = {value:#x}");

        // SAFETY: volatile write to a mapped hardware register.
        // - offset is 4-byte aligned and offset + 4 <= size without overflow (checked above)
        // - ptr is the live mapping from map(); unmap() consumes self
        // - volatile writes are never merged or reordered with each other
        #[allow(clippy::cast_ptr_alignment)]
        unsafe {
            self.ptr.as_ptr().add(offset).cast::<u32>().write_volatile(value);
        }
        fence(Ordering::SeqCst);

        Ok(())
    }

    fn unmap(mut self) -> Result<()> {
        self.mapped = false;
        tracing::debug!("Unmapping BAR{} for {}", self.bar_index, self.pcie_address);

        // SAFETY: ptr/size are exactly what mmap returned in map(); `mapped`
        // is cleared first so Drop will not unmap a second time.
        unsafe { munmap(self.ptr.as_ptr().cast(), self.size) }
            .map_err(|e| ClError::detach(format!("munmap failed: {e}")))
    }
}

impl Drop for MmapRegion {
    fn drop(&mut self) {
        if !self.mapped {
            return;
        }
        // SAFETY: the mapping is still live (unmap() was not called) and
        // ptr/size are the values returned by mmap.
        unsafe {
            if let Err(e) = munmap(self.ptr.as_ptr().cast(), self.size) {
                tracing::error!("munmap failed during drop: {e}");
            }
        }
    }
}

// SAFETY: MmapRegion owns its mapping exclusively; moving it between threads
// does not invalidate process-wide mmap'd memory.
unsafe impl Send for MmapRegion {}
