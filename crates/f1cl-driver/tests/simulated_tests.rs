//! End-to-end tests against the simulated CL
//!
//! Runs the full driver stack without hardware: port selection, invocation,
//! work validation, self-test, and injected faults.

use f1cl_driver::work::{validate_work, work_value};
use f1cl_driver::{
    select_port, Accelerator, ClError, DeviceSelector, DriverConfig, FaultPlan, Phase,
    PortSelection, PortType, RegisterPort, SimulatedAccelerator,
};

const HASH: [u8; 32] = [
    0x3a, 0x1f, 0x90, 0x02, 0x6e, 0xb4, 0x7c, 0x11, 0xd8, 0x25, 0x4f, 0x63, 0x0b, 0x99, 0xe7, 0x48,
    0x52, 0xaa, 0x1c, 0x36, 0xf0, 0x84, 0x5d, 0x27, 0xc3, 0x6a, 0x0e, 0xbb, 0x71, 0x95, 0x2d, 0x4c,
];

#[test]
fn selected_simulated_port_round_trip() {
    let port = select_port(PortSelection::Simulated, &DriverConfig::default());
    assert_eq!(port.port_type(), PortType::Simulated);

    let mut acc = Accelerator::new(port, DeviceSelector::default());
    let out = acc.invoke(&HASH).unwrap();

    assert_eq!(acc.phase(), Phase::Done);
    assert!(validate_work(&out.work(), &HASH, f1cl_driver::backends::simulated::SIM_THRESHOLD));
    assert_eq!(u64::from_be_bytes(out.digest()), work_value(&out.work(), &HASH));
}

#[test]
fn consecutive_invocations_reuse_port() {
    let mut acc = Accelerator::new(SimulatedAccelerator::new(), DeviceSelector::slot(1));
    let first = acc.invoke(&HASH).unwrap();
    let second = acc.invoke(&HASH).unwrap();

    assert_eq!(first.work(), second.work());
    assert_eq!(acc.port().attach_count(), 2);
    assert_eq!(acc.port().detach_count(), 2);
    assert!(!acc.port().is_attached());
}

#[test]
fn self_test_then_invoke() {
    let mut acc = Accelerator::new(SimulatedAccelerator::new(), DeviceSelector::default());
    assert!(acc.verify_register(0xefbe_adde).unwrap());

    // Diagnostic mode must not leak into the next job
    let out = acc.invoke(&HASH).unwrap();
    assert!(validate_work(&out.work(), &HASH, f1cl_driver::backends::simulated::SIM_THRESHOLD));
}

#[test]
fn read_fault_fails_and_detaches() {
    // 3rd read lands in the poll loop (latency 2 makes reads 1 and 2 busy)
    let sim = SimulatedAccelerator::new().with_faults(FaultPlan {
        fail_read: Some(3),
        ..FaultPlan::default()
    });
    let mut acc = Accelerator::new(sim, DeviceSelector::default());

    let err = acc.invoke(&HASH).unwrap_err();
    assert!(matches!(err, ClError::Io { offset: 0x510, .. }));
    assert_eq!(acc.phase(), Phase::Failed);
    assert_eq!(acc.port().detach_count(), 1);
    assert!(!acc.port().is_attached());
}

#[test]
fn refused_attach_never_detaches() {
    let sim = SimulatedAccelerator::new().with_faults(FaultPlan {
        fail_attach: true,
        ..FaultPlan::default()
    });
    let mut acc = Accelerator::new(sim, DeviceSelector::default());

    let err = acc.invoke(&HASH).unwrap_err();
    assert!(matches!(err, ClError::Attach { .. }));
    assert_eq!(acc.port().writes(), 0);
    assert_eq!(acc.port().detach_count(), 0);
}

#[test]
fn failed_detach_keeps_result() {
    let sim = SimulatedAccelerator::new().with_faults(FaultPlan {
        fail_detach: true,
        ..FaultPlan::default()
    });
    let mut acc = Accelerator::new(sim, DeviceSelector::default());

    let out = acc.invoke(&HASH).unwrap();
    assert!(out.elapsed_ticks() >= 1);
    assert!(matches!(acc.last_detach_error(), Some(ClError::Detach { .. })));
    assert_eq!(acc.port().detach_count(), 1);
}

#[test]
fn detach_error_is_cleared_by_next_invocation() {
    let sim = SimulatedAccelerator::new().with_faults(FaultPlan {
        fail_detach: true,
        ..FaultPlan::default()
    });
    let mut acc = Accelerator::new(sim, DeviceSelector::default());
    acc.invoke(&HASH).unwrap();
    assert!(acc.last_detach_error().is_some());

    // Length errors stop before attach and leave it in place
    assert!(acc.invoke(&HASH[..31]).is_err());
    assert!(acc.last_detach_error().is_some());

    acc.port_mut().set_faults(FaultPlan::default());
    acc.invoke(&HASH).unwrap();
    assert!(acc.last_detach_error().is_none());
}

#[test]
fn boxed_port_through_free_function() {
    let mut port = select_port(PortSelection::Simulated, &DriverConfig::default());
    let out = f1cl_driver::invoke(&mut port, &DeviceSelector::default(), &HASH).unwrap();
    assert_eq!(out.as_bytes().len(), 20);
    assert!(f1cl_driver::verify_register(&mut port, &DeviceSelector::default(), 1).unwrap());
}
