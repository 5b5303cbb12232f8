//! `f1cl`: command-line interface for the F1 proof-of-work custom logic.
//!
//! ```text
//! USAGE:
//!   f1cl invoke <hex32>        Offload one 32-byte block hash
//!   f1cl self-test [value]     Register self-test (default 0xefbeadde)
//!   f1cl check-image           Verify the loaded image identity
//!   f1cl devices               List application PFs with the image
//! ```
//!
//! Settings come from `F1CL_*` environment variables; flags override them.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use f1cl_driver::backends::simulated::SIM_THRESHOLD;
use f1cl_driver::regs::SELFTEST_DEFAULT_VALUE;
use f1cl_driver::work::{validate_work, work_value, BlockHash, SEND_THRESHOLD};
use f1cl_driver::{
    discover, ensure_ready, select_port, Accelerator, DriverConfig, OutputBlock, PortSelection,
    RegisterPort, SimulatedAccelerator,
};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "f1cl", about = "F1 proof-of-work CL driver", version)]
struct Cli {
    /// Use the in-memory CL model instead of hardware.
    #[arg(long, global = true)]
    simulate: bool,

    /// Device slot among PFs carrying the image.
    #[arg(long, global = true)]
    slot: Option<usize>,

    /// Explicit PCIe address (e.g. 0000:00:1d.0); skips slot lookup.
    #[arg(long, global = true)]
    pcie_addr: Option<String>,

    /// Poll deadline in milliseconds (0 waits forever).
    #[arg(long, global = true)]
    timeout_ms: Option<u64>,

    /// Difficulty threshold in hex for work validation.
    #[arg(long, global = true, value_parser = parse_hex_u64)]
    threshold: Option<u64>,

    #[command(subcommand)]
    command: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Offload one block hash and validate the returned work.
    Invoke {
        /// 32-byte block hash as 64 hex digits.
        hash: String,
    },
    /// Run the register self-test.
    SelfTest {
        /// 32-bit test value in hex.
        #[arg(value_parser = parse_hex_u32)]
        value: Option<u32>,
    },
    /// Check that the configured device reports the expected image.
    CheckImage,
    /// List devices carrying the expected image.
    Devices,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .init();

    let cli = Cli::parse();
    let config = build_config(&cli)?;

    match &cli.command {
        Cmd::Invoke { hash } => cmd_invoke(&cli, config, hash)?,
        Cmd::SelfTest { value } => {
            cmd_self_test(&cli, config, value.unwrap_or(SELFTEST_DEFAULT_VALUE))?;
        }
        Cmd::CheckImage => cmd_check_image(&cli, &config)?,
        Cmd::Devices => cmd_devices(&cli, &config)?,
    }

    Ok(())
}

fn build_config(cli: &Cli) -> Result<DriverConfig> {
    let mut config = DriverConfig::from_env().context("Invalid F1CL_* environment")?;

    if let Some(slot) = cli.slot {
        config.selector.slot = slot;
    }
    if let Some(addr) = &cli.pcie_addr {
        config.selector.pcie_address = Some(addr.clone());
    }
    if let Some(ms) = cli.timeout_ms {
        config.poll.timeout = (ms > 0).then(|| Duration::from_millis(ms));
    }

    Ok(config)
}

fn threshold(cli: &Cli) -> u64 {
    cli.threshold
        .unwrap_or(if cli.simulate { SIM_THRESHOLD } else { SEND_THRESHOLD })
}

/// Port for the command, resolving and checking the hardware device first
fn open_port(cli: &Cli, config: &mut DriverConfig) -> Result<Box<dyn RegisterPort>> {
    if cli.simulate {
        return Ok(Box::new(
            SimulatedAccelerator::new().with_threshold(threshold(cli)),
        ));
    }

    let addr = ensure_ready(config).context("Image not ready")?;
    config.selector.pcie_address = Some(addr);
    Ok(select_port(PortSelection::Hardware, config))
}

fn cmd_invoke(cli: &Cli, mut config: DriverConfig, hash: &str) -> Result<()> {
    let bytes = hex::decode(hash.trim_start_matches("0x")).context("Block hash is not hex")?;
    let port = open_port(cli, &mut config)?;

    let mut acc = Accelerator::from_config(port, &config);
    let out = acc.invoke(&bytes)?;
    if let Some(e) = acc.last_detach_error() {
        eprintln!("warning: {e}");
    }

    print_output(&out);

    // Length was checked by invoke
    let block: BlockHash = bytes
        .as_slice()
        .try_into()
        .context("Block hash must be 32 bytes")?;
    let threshold = threshold(cli);
    let value = work_value(&out.work(), &block);
    println!("Work value   : {value:#018x}");
    println!("Threshold    : {threshold:#018x}");
    println!(
        "Valid        : {}",
        if validate_work(&out.work(), &block, threshold) {
            "yes"
        } else {
            "no"
        }
    );

    Ok(())
}

fn print_output(out: &OutputBlock) {
    println!("Output       : {out}");
    for (i, word) in out.as_bytes().chunks_exact(4).enumerate() {
        println!("  word[{i}]    : {}", hex::encode(word));
    }
    println!("Digest       : {}", hex::encode(out.digest()));
    println!("Work         : {}", hex::encode(out.work()));
    println!(
        "Elapsed      : {} ticks ({:?})",
        out.elapsed_ticks(),
        out.elapsed()
    );
}

fn cmd_self_test(cli: &Cli, mut config: DriverConfig, value: u32) -> Result<()> {
    let port = open_port(cli, &mut config)?;
    let mut acc = Accelerator::from_config(port, &config);

    println!("Self-test value {value:#010x}");
    if acc.verify_register(value)? {
        println!("Test PASSED");
        Ok(())
    } else {
        bail!("Test FAILED: result register did not match {value:#010x} byte-swapped")
    }
}

fn cmd_check_image(cli: &Cli, config: &DriverConfig) -> Result<()> {
    if cli.simulate {
        println!("Simulated CL: image {} (always ready)", config.identity);
        return Ok(());
    }

    let addr = ensure_ready(config)?;
    println!("{addr}: image {} ready", config.identity);
    Ok(())
}

fn cmd_devices(cli: &Cli, config: &DriverConfig) -> Result<()> {
    if cli.simulate {
        println!("[0] simulated  {}", config.identity);
        return Ok(());
    }

    let devices = discover(&config.sysfs_root, &config.identity)?;
    println!("Devices with image {}: {}", config.identity, devices.len());
    for info in devices {
        println!("[{}] {}", info.slot, info.pcie_address);
    }
    Ok(())
}

fn parse_hex_u64(s: &str) -> Result<u64, String> {
    u64::from_str_radix(s.trim_start_matches("0x"), 16).map_err(|e| format!("{s}: {e}"))
}

fn parse_hex_u32(s: &str) -> Result<u32, String> {
    u32::from_str_radix(s.trim_start_matches("0x"), 16).map_err(|e| format!("{s}: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_flags_parse_with_or_without_prefix() {
        assert_eq!(parse_hex_u64("0xffffffc000000000"), Ok(SEND_THRESHOLD));
        assert_eq!(parse_hex_u32("efbeadde"), Ok(0xefbe_adde));
        assert!(parse_hex_u32("xyz").is_err());
    }

    #[test]
    fn flags_override_config() {
        let cli = Cli::parse_from([
            "f1cl",
            "--simulate",
            "--slot",
            "2",
            "--timeout-ms",
            "0",
            "self-test",
        ]);
        let config = build_config(&cli).unwrap();
        assert_eq!(config.selector.slot, 2);
        assert!(config.poll.timeout.is_none());
        assert_eq!(threshold(&cli), SIM_THRESHOLD);
    }

    #[test]
    fn simulated_invoke_and_self_test() {
        let hash = "c8e5b875778702445b25657276abc56aa9910b283537ca438b2cc59b0cf93712";
        let cli = Cli::parse_from(["f1cl", "--simulate", "invoke", hash]);
        let config = build_config(&cli).unwrap();
        cmd_invoke(&cli, config.clone(), hash).unwrap();
        cmd_self_test(&cli, config, SELFTEST_DEFAULT_VALUE).unwrap();
    }
}
