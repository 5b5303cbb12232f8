//! Driver configuration
//!
//! PCI identity, slot and poll budget are explicit values handed to the
//! operations that need them. Defaults describe an F1 instance with the
//! image in slot 0.

use crate::error::{ClError, Result};
use crate::port::DeviceSelector;
use f1cl_chip::bar::Bar;
use f1cl_chip::pcie::{AMAZON_VENDOR_ID, F1_APP_DEVICE_ID};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;

/// Poll budget for the completion handshake
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    /// Pause between status reads (zero = spin)
    pub interval: Duration,

    /// Give up after this many status reads
    pub max_attempts: Option<u64>,

    /// Give up once this much time has passed since the first read
    pub timeout: Option<Duration>,
}

impl PollConfig {
    /// Spin until the CL answers, however long that takes
    #[must_use]
    pub const fn unbounded() -> Self {
        Self {
            interval: Duration::ZERO,
            max_attempts: None,
            timeout: None,
        }
    }

    /// Spin with a deadline
    #[must_use]
    pub const fn with_timeout(timeout: Duration) -> Self {
        Self {
            interval: Duration::ZERO,
            max_attempts: None,
            timeout: Some(timeout),
        }
    }

    /// Whether no bound applies
    #[must_use]
    pub const fn is_unbounded(&self) -> bool {
        self.max_attempts.is_none() && self.timeout.is_none()
    }
}

/// Unbounded spin. Job latency depends on the difficulty threshold, so a
/// deadline is opt-in (`F1CL_POLL_TIMEOUT_MS`, `--timeout-ms`).
impl Default for PollConfig {
    fn default() -> Self {
        Self::unbounded()
    }
}

/// PCI identity the loaded image must report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ImageIdentity {
    /// PCI vendor ID
    pub vendor_id: u16,

    /// PCI device ID
    pub device_id: u16,
}

impl Default for ImageIdentity {
    fn default() -> Self {
        Self {
            vendor_id: AMAZON_VENDOR_ID,
            device_id: F1_APP_DEVICE_ID,
        }
    }
}

impl fmt::Display for ImageIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04x}:{:04x}", self.vendor_id, self.device_id)
    }
}

/// Complete driver configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverConfig {
    /// Device and BAR to bind
    pub selector: DeviceSelector,

    /// Expected image identity
    pub identity: ImageIdentity,

    /// Completion poll budget
    pub poll: PollConfig,

    /// Root of the sysfs tree (normally `/sys`)
    pub sysfs_root: PathBuf,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            selector: DeviceSelector::default(),
            identity: ImageIdentity::default(),
            poll: PollConfig::default(),
            sysfs_root: PathBuf::from("/sys"),
        }
    }
}

impl DriverConfig {
    /// Build configuration from `F1CL_*` environment variables
    ///
    /// # Errors
    ///
    /// Returns `ClError::InvalidConfig` if a variable is set but malformed.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup
    ///
    /// # Errors
    ///
    /// Returns `ClError::InvalidConfig` if a value is present but malformed.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(slot) = lookup("F1CL_SLOT") {
            config.selector.slot = parse_decimal("F1CL_SLOT", &slot)?;
        }
        if let Some(addr) = lookup("F1CL_PCIE_ADDR") {
            let addr = addr.trim();
            if !addr.is_empty() {
                config.selector.pcie_address = Some(addr.to_string());
            }
        }
        if let Some(bar) = lookup("F1CL_BAR") {
            config.selector.bar = match parse_decimal::<u64>("F1CL_BAR", &bar)? {
                0 => Bar::Ocl,
                1 => Bar::Sda,
                4 => Bar::Pcis,
                other => {
                    return Err(ClError::invalid_config(format!(
                        "F1CL_BAR={other} is not a BAR of the application PF"
                    )))
                }
            };
        }
        if let Some(vendor) = lookup("F1CL_VENDOR_ID") {
            config.identity.vendor_id = parse_hex_u16("F1CL_VENDOR_ID", &vendor)?;
        }
        if let Some(device) = lookup("F1CL_DEVICE_ID") {
            config.identity.device_id = parse_hex_u16("F1CL_DEVICE_ID", &device)?;
        }
        if let Some(ms) = lookup("F1CL_POLL_TIMEOUT_MS") {
            let ms: u64 = parse_decimal("F1CL_POLL_TIMEOUT_MS", &ms)?;
            config.poll.timeout = (ms > 0).then(|| Duration::from_millis(ms));
        }
        if let Some(us) = lookup("F1CL_POLL_INTERVAL_US") {
            let us: u64 = parse_decimal("F1CL_POLL_INTERVAL_US", &us)?;
            config.poll.interval = Duration::from_micros(us);
        }
        if let Some(root) = lookup("F1CL_SYSFS_ROOT") {
            config.sysfs_root = PathBuf::from(root);
        }

        debug!(
            "Driver config: slot {}, identity {}, poll {:?}",
            config.selector.slot, config.identity, config.poll
        );
        Ok(config)
    }
}

fn parse_decimal<T: std::str::FromStr>(key: &str, value: &str) -> Result<T>
where
    T::Err: fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| ClError::invalid_config(format!("{key}={value:?}: {e}")))
}

/// Parse a hex `u16`, with or without a `0x` prefix.
pub(crate) fn parse_hex_u16(key: &str, value: &str) -> Result<u16> {
    let trimmed = value.trim();
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    u16::from_str_radix(digits, 16)
        .map_err(|e| ClError::invalid_config(format!("{key}={value:?}: {e}")))
}
