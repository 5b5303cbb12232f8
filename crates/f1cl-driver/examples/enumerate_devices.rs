//! Enumerate application PFs carrying the proof-of-work image
//!
//! This example demonstrates runtime device discovery and the identity check.

use f1cl_driver::{check_image_ready, discover, DriverConfig, Result};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter("f1cl_driver=debug")
        .init();

    println!("F1 CL Device Enumeration\n");

    let config = DriverConfig::from_env()?;
    let devices = discover(&config.sysfs_root, &config.identity)?;

    println!("Found {} device(s):\n", devices.len());

    for device in &devices {
        println!("Slot {}:", device.slot);
        println!("   PCIe:       {}", device.pcie_address);
        println!("   Identity:   {}", device.identity);
        match check_image_ready(&config, &device.pcie_address) {
            Ok(()) => println!("   Image:      ready"),
            Err(e) => println!("   Image:      {e}"),
        }
        println!();
    }

    println!("Discovery complete");

    Ok(())
}
