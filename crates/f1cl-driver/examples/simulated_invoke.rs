//! Offload a block hash to the simulated CL
//!
//! Runs the full load/poll/unload protocol without hardware and checks the
//! returned work against the simulator's difficulty.

use f1cl_driver::backends::simulated::SIM_THRESHOLD;
use f1cl_driver::work::validate_work;
use f1cl_driver::{Accelerator, DeviceSelector, Result, SimulatedAccelerator};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter("f1cl_driver=debug")
        .init();

    println!("F1 CL simulated invocation\n");

    let hash: [u8; 32] = core::array::from_fn(|i| (i as u8).wrapping_mul(37));
    let mut acc = Accelerator::new(SimulatedAccelerator::new(), DeviceSelector::default());

    let out = acc.invoke(&hash)?;
    println!("Output:   {out}");
    println!("Work:     {:02x?}", out.work());
    println!("Elapsed:  {} ticks ({:?})", out.elapsed_ticks(), out.elapsed());
    println!(
        "Valid:    {}",
        validate_work(&out.work(), &hash, SIM_THRESHOLD)
    );

    println!("\nSelf-test: {}", acc.verify_register(0xefbe_adde)?);

    Ok(())
}
