//! Accelerator invocation protocol
//!
//! One invocation is a fixed sequence over the register port:
//!
//! ```text
//! Idle ──attach──▶ Loading ──trigger write──▶ Polling ──status≠0──▶ Unloading ──▶ Done
//!   │                 │                          │                      │
//!   └─────────────────┴──────── any error ───────┴──────────────────────┴──▶ Failed
//! ```
//!
//! The port is detached exactly once on every path that attached it. A
//! detach failure is logged and kept in [`Accelerator::last_detach_error`];
//! it never replaces the primary result.

use crate::block::{InputBlock, OutputBlock};
use crate::clock::{Clock, SystemClock};
use crate::codec::byte_swap;
use crate::config::{DriverConfig, PollConfig};
use crate::error::{ClError, Result};
use crate::layout::RegisterLayout;
use crate::port::{DeviceSelector, RegisterPort};
use f1cl_chip::regs::OUTPUT_WORDS;
use tracing::{debug, info, trace, warn};

/// Protocol phase of the most recent invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Nothing in flight
    Idle,
    /// Staging the operand
    Loading,
    /// Waiting for the completion register
    Polling,
    /// Reading the output bank
    Unloading,
    /// Last invocation returned a result
    Done,
    /// Last invocation returned an error
    Failed,
}

/// Synchronous, single-shot driver for one CL
///
/// Holds the port exclusively; `&mut self` on every operation rules out
/// overlapping invocations.
#[derive(Debug)]
pub struct Accelerator<P: RegisterPort, C: Clock = SystemClock> {
    port: P,
    selector: DeviceSelector,
    layout: RegisterLayout,
    poll: PollConfig,
    clock: C,
    phase: Phase,
    last_detach_error: Option<ClError>,
}

impl<P: RegisterPort> Accelerator<P> {
    /// Driver with the hardware layout, default poll budget and system clock
    pub fn new(port: P, selector: DeviceSelector) -> Self {
        Self {
            port,
            selector,
            layout: RegisterLayout::default(),
            poll: PollConfig::default(),
            clock: SystemClock::new(),
            phase: Phase::Idle,
            last_detach_error: None,
        }
    }

    /// Driver using the selector and poll budget from `config`
    pub fn from_config(port: P, config: &DriverConfig) -> Self {
        Self::new(port, config.selector.clone()).with_poll_config(config.poll)
    }
}

impl<P: RegisterPort, C: Clock> Accelerator<P, C> {
    /// Replace the time source
    pub fn with_clock<C2: Clock>(self, clock: C2) -> Accelerator<P, C2> {
        Accelerator {
            port: self.port,
            selector: self.selector,
            layout: self.layout,
            poll: self.poll,
            clock,
            phase: self.phase,
            last_detach_error: self.last_detach_error,
        }
    }

    /// Replace the register layout
    #[must_use]
    pub fn with_layout(mut self, layout: RegisterLayout) -> Self {
        self.layout = layout;
        self
    }

    /// Replace the poll budget
    #[must_use]
    pub fn with_poll_config(mut self, poll: PollConfig) -> Self {
        self.poll = poll;
        self
    }

    /// Phase reached by the most recent invocation
    pub const fn phase(&self) -> Phase {
        self.phase
    }

    /// Detach failure from the most recent attached invocation, if any
    pub const fn last_detach_error(&self) -> Option<&ClError> {
        self.last_detach_error.as_ref()
    }

    /// Borrow the port
    pub const fn port(&self) -> &P {
        &self.port
    }

    /// Mutably borrow the port
    pub fn port_mut(&mut self) -> &mut P {
        &mut self.port
    }

    /// Give the port back
    pub fn into_port(self) -> P {
        self.port
    }

    /// Offload one operand and return the CL's result
    ///
    /// The operand must be exactly 32 bytes; anything else is rejected
    /// before the port is touched and leaves the phase at `Failed`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInputLength`, `Attach`, `Io`, or `Timeout`. A detach
    /// failure is never returned from here.
    pub fn invoke(&mut self, input: &[u8]) -> Result<OutputBlock> {
        let block = InputBlock::try_from(input).map_err(|e| {
            self.phase = Phase::Failed;
            e
        })?;
        self.invoke_block(&block)
    }

    /// Offload one operand already known to be well-sized
    ///
    /// # Errors
    ///
    /// Returns `Attach`, `Io`, or `Timeout`.
    pub fn invoke_block(&mut self, input: &InputBlock) -> Result<OutputBlock> {
        let output = self.with_attached(|acc| {
            acc.load(input)?;
            let ticks = acc.wait_for_completion()?;
            debug!("CL finished after {ticks} ticks");
            acc.unload()
        })?;

        info!(
            "Invocation complete: work {:02x?}, {:?} on device",
            output.work(),
            output.elapsed()
        );
        Ok(output)
    }

    /// Register self-test
    ///
    /// Writes `value` to the scratch register, stages the fixed diagnostic
    /// words, commits, waits, and checks the completion register against
    /// `value` with its bytes reversed.
    ///
    /// # Errors
    ///
    /// Returns `Attach`, `Io`, or `Timeout`. A mismatch is `Ok(false)`.
    pub fn verify_register(&mut self, value: u32) -> Result<bool> {
        let expected = byte_swap(value);

        self.with_attached(|acc| {
            let layout = acc.layout;
            acc.phase = Phase::Loading;

            debug!("Writing {value:#010x} to scratch register {:#x}", layout.scratch);
            acc.port.poke(layout.scratch, value)?;

            let probe = acc.port.peek(layout.probe)?;
            debug!("Probe {:#x} before staging: {probe:#x}", layout.probe);

            for (offset, word) in layout.selftest_words {
                acc.port.poke(offset, word)?;
            }

            let probe = acc.port.peek(layout.probe)?;
            debug!("Probe {:#x} after staging: {probe:#x}", layout.probe);

            let (commit_offset, commit_word) = layout.selftest_commit;
            acc.port.poke(commit_offset, commit_word)?;

            acc.wait_for_completion()?;
            let words = acc.read_words(layout.selftest_readback)?;
            debug!("Result: {:08x}{:08x}", words[1], words[0]);
            debug!("Result: {:08x}{:08x}", words[3], words[2]);

            let observed = words[OUTPUT_WORDS - 1];
            if observed == expected {
                info!("Self-test passed: {observed:#x} matches {expected:#x}");
                Ok(true)
            } else {
                warn!("Self-test failed: read {observed:#x}, expected {expected:#x}");
                Ok(false)
            }
        })
    }

    /// Attach, run `body`, detach once
    fn with_attached<T>(&mut self, body: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        self.phase = Phase::Idle;
        self.last_detach_error = None;

        if let Err(e) = self.port.attach(&self.selector) {
            warn!("Attach to {:?} failed: {e}", self.selector);
            self.phase = Phase::Failed;
            return Err(e);
        }
        debug!("Attached {} port", self.port.port_type());

        let result = body(self);

        match self.port.detach() {
            Ok(()) => debug!("Detached {} port", self.port.port_type()),
            Err(e) => {
                warn!("Failure while detaching: {e}");
                self.last_detach_error = Some(e);
            }
        }

        self.phase = if result.is_ok() {
            Phase::Done
        } else {
            Phase::Failed
        };
        result
    }

    /// Stage the operand from the top of the input bank down to the trigger
    fn load(&mut self, input: &InputBlock) -> Result<()> {
        self.phase = Phase::Loading;
        let words = input.words();

        for (index, offset) in self.layout.load_order() {
            trace!("Load word {index} = {:#010x} @ {offset:#x}", words[index]);
            self.port.poke(offset, words[index])?;
        }
        Ok(())
    }

    /// Poll the status register until it reads non-zero
    fn wait_for_completion(&mut self) -> Result<u32> {
        self.phase = Phase::Polling;
        let start = self.clock.now();
        let mut attempts: u64 = 0;

        loop {
            let status = self.port.peek(self.layout.status)?;
            attempts += 1;

            if status != 0 {
                trace!("Status {status:#x} after {attempts} polls");
                return Ok(status);
            }

            let elapsed = self.clock.now().saturating_sub(start);
            let out_of_attempts = self.poll.max_attempts.is_some_and(|max| attempts >= max);
            let out_of_time = self.poll.timeout.is_some_and(|limit| elapsed >= limit);
            if out_of_attempts || out_of_time {
                #[allow(clippy::cast_possible_truncation)]
                let elapsed_ms = elapsed.as_millis() as u64;
                return Err(ClError::Timeout {
                    attempts,
                    elapsed_ms,
                });
            }

            if self.poll.interval.is_zero() {
                std::hint::spin_loop();
            } else {
                self.clock.sleep(self.poll.interval);
            }
        }
    }

    /// Read the output bank and decode it
    fn unload(&mut self) -> Result<OutputBlock> {
        let words = self.read_words(self.layout.output_bank)?;
        Ok(OutputBlock::from_words(&words))
    }

    fn read_words(&mut self, offsets: [usize; OUTPUT_WORDS]) -> Result<[u32; OUTPUT_WORDS]> {
        self.phase = Phase::Unloading;
        let mut words = [0u32; OUTPUT_WORDS];
        for (word, offset) in words.iter_mut().zip(offsets) {
            *word = self.port.peek(offset)?;
        }
        Ok(words)
    }
}

/// One-shot invocation with the hardware layout and default poll budget
///
/// # Errors
///
/// See [`Accelerator::invoke`].
pub fn invoke<P: RegisterPort>(
    port: P,
    selector: &DeviceSelector,
    input: &[u8],
) -> Result<OutputBlock> {
    Accelerator::new(port, selector.clone()).invoke(input)
}

/// One-shot register self-test
///
/// # Errors
///
/// See [`Accelerator::verify_register`].
pub fn verify_register<P: RegisterPort>(
    port: P,
    selector: &DeviceSelector,
    value: u32,
) -> Result<bool> {
    Accelerator::new(port, selector.clone()).verify_register(value)
}
