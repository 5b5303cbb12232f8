//! Software (virtual CL) port
//!
//! Implements `RegisterPort` over an in-memory register file that behaves
//! like the proof-of-work image as seen through BAR0. This enables:
//!
//! 1. **CI without hardware**: the full load/poll/unload protocol runs
//!    against a register file with the same offsets and commit rules.
//!
//! 2. **Fault injection**: refuse attach, fail the N-th read, fail detach.
//!
//! 3. **Real results**: committed operands run an actual nonce search, so
//!    the returned work validates with [`crate::work::validate_work`].
//!
//! ## Register behaviour
//!
//! ```text
//! write 0x500             arm diagnostic mode, latch scratch value
//! write 0x508..0x524      stage input word (readable back)
//! write 0x508  (normal)   commit: search, publish after `latency` busy polls
//! write 0x524  (diag)     commit: 0x510 := byte_swap(scratch)
//! read  0x510  (busy)     0
//! ```

use crate::codec::{byte_swap, decode_input};
use crate::error::{ClError, Result};
use crate::port::{DeviceSelector, PortType, RegisterPort};
use crate::work;
use f1cl_chip::regs::{
    HELLO_WORLD, INPUT_BANK, INPUT_WORDS, SELFTEST_COMMIT, STATUS, TRIGGER, VLED, WINDOW_BASE,
    WINDOW_END,
};
use tracing::{debug, trace};

const REG_COUNT: usize = (WINDOW_END - WINDOW_BASE) / 4;

/// Default difficulty for simulated jobs (about 1 in 256 nonces wins).
pub const SIM_THRESHOLD: u64 = 0xFF00_0000_0000_0000;

/// Default cap on simulated nonce search.
pub const SIM_MAX_ITERATIONS: u64 = 1 << 20;

/// Faults to inject
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FaultPlan {
    /// Refuse every attach
    pub fail_attach: bool,
    /// Fail every detach
    pub fail_detach: bool,
    /// Fail the N-th read (1-based, counted across the port's lifetime)
    pub fail_read: Option<u64>,
}

/// Software model of the proof-of-work CL
#[derive(Debug)]
pub struct SimulatedAccelerator {
    regs: [u32; REG_COUNT],
    attached: bool,
    diagnostic: bool,
    scratch: u32,
    /// Register values to publish once the busy window closes
    pending: Option<[(usize, u32); 5]>,
    busy_reads_left: u32,
    latency: u32,
    threshold: u64,
    start_nonce: u64,
    max_iterations: u64,
    faults: FaultPlan,
    reads: u64,
    writes: u64,
    attach_count: u64,
    detach_count: u64,
}

impl SimulatedAccelerator {
    /// Model with default difficulty and two busy polls per job
    #[must_use]
    pub fn new() -> Self {
        Self {
            regs: [0; REG_COUNT],
            attached: false,
            diagnostic: false,
            scratch: 0,
            pending: None,
            busy_reads_left: 0,
            latency: 2,
            threshold: SIM_THRESHOLD,
            start_nonce: 0,
            max_iterations: SIM_MAX_ITERATIONS,
            faults: FaultPlan::default(),
            reads: 0,
            writes: 0,
            attach_count: 0,
            detach_count: 0,
        }
    }

    /// Number of status reads that return busy after each commit
    #[must_use]
    pub const fn with_latency(mut self, busy_reads: u32) -> Self {
        self.latency = busy_reads;
        self
    }

    /// Difficulty threshold for the nonce search
    #[must_use]
    pub const fn with_threshold(mut self, threshold: u64) -> Self {
        self.threshold = threshold;
        self
    }

    /// First nonce tried and search cap
    #[must_use]
    pub const fn with_search(mut self, start_nonce: u64, max_iterations: u64) -> Self {
        self.start_nonce = start_nonce;
        self.max_iterations = max_iterations;
        self
    }

    /// Faults to inject
    #[must_use]
    pub const fn with_faults(mut self, faults: FaultPlan) -> Self {
        self.faults = faults;
        self
    }

    /// Replace the fault plan on a live model
    pub fn set_faults(&mut self, faults: FaultPlan) {
        self.faults = faults;
    }

    /// Whether the port is currently attached
    pub const fn is_attached(&self) -> bool {
        self.attached
    }

    /// Total reads served
    pub const fn reads(&self) -> u64 {
        self.reads
    }

    /// Total writes accepted
    pub const fn writes(&self) -> u64 {
        self.writes
    }

    /// Successful attaches
    pub const fn attach_count(&self) -> u64 {
        self.attach_count
    }

    /// Detach attempts on an attached port
    pub const fn detach_count(&self) -> u64 {
        self.detach_count
    }

    fn index(offset: usize) -> Result<usize> {
        if offset % 4 != 0 || !(WINDOW_BASE..WINDOW_END).contains(&offset) {
            return Err(ClError::io(offset, "outside CL register window"));
        }
        Ok((offset - WINDOW_BASE) / 4)
    }

    fn ensure_attached(&self, offset: usize) -> Result<()> {
        if self.attached {
            Ok(())
        } else {
            Err(ClError::io(offset, "port not attached"))
        }
    }

    fn reg(&self, offset: usize) -> u32 {
        self.regs[(offset - WINDOW_BASE) / 4]
    }

    fn set_reg(&mut self, offset: usize, value: u32) {
        self.regs[(offset - WINDOW_BASE) / 4] = value;
    }

    fn commit(&mut self, results: [(usize, u32); 5]) {
        self.set_reg(STATUS, 0);
        self.pending = Some(results);
        self.busy_reads_left = self.latency;
    }

    /// Run the nonce search over the staged operand
    fn commit_job(&mut self) {
        let mut words = [0u32; INPUT_WORDS];
        for (word, &offset) in words.iter_mut().zip(&INPUT_BANK) {
            *word = self.reg(offset);
        }
        let hash = decode_input(&words);

        let solution = work::search(&hash, self.threshold, self.start_nonce, self.max_iterations);
        debug!(
            "Simulated job: nonce {:#018x}, value {:#018x}, {} iterations, found={}",
            solution.nonce, solution.value, solution.iterations, solution.found
        );

        let ticks = u32::try_from(solution.iterations).unwrap_or(u32::MAX).max(1);
        #[allow(clippy::cast_possible_truncation)]
        let results = [
            (VLED, (solution.value >> 32) as u32),
            (HELLO_WORLD, solution.value as u32),
            (INPUT_BANK[1], (solution.nonce >> 32) as u32),
            (INPUT_BANK[0], solution.nonce as u32),
            (STATUS, ticks),
        ];
        self.commit(results);
    }

    /// Diagnostic commit: completion register carries the swapped scratch
    fn commit_diagnostic(&mut self) {
        let swapped = byte_swap(self.scratch);
        debug!("Simulated self-test: scratch {:#x} -> {swapped:#x}", self.scratch);
        self.diagnostic = false;
        let results = [
            (HELLO_WORLD, self.reg(HELLO_WORLD)),
            (VLED, self.reg(VLED)),
            (INPUT_BANK[0], self.reg(INPUT_BANK[0])),
            (INPUT_BANK[1], self.reg(INPUT_BANK[1])),
            (STATUS, swapped),
        ];
        self.commit(results);
    }
}

impl Default for SimulatedAccelerator {
    fn default() -> Self {
        Self::new()
    }
}

impl RegisterPort for SimulatedAccelerator {
    fn attach(&mut self, selector: &DeviceSelector) -> Result<()> {
        if self.faults.fail_attach {
            return Err(ClError::attach(format!(
                "simulated attach refused for slot {}",
                selector.slot
            )));
        }
        self.attached = true;
        self.attach_count += 1;
        trace!("Simulated attach (slot {})", selector.slot);
        Ok(())
    }

    fn poke(&mut self, offset: usize, value: u32) -> Result<()> {
        self.ensure_attached(offset)?;
        Self::index(offset)?;
        self.writes += 1;
        trace!("Write u32 @ {offset:#x} = {value:#x}");

        self.set_reg(offset, value);
        if offset == HELLO_WORLD {
            self.scratch = value;
            self.diagnostic = true;
        } else if self.diagnostic && offset == SELFTEST_COMMIT.0 {
            self.commit_diagnostic();
        } else if !self.diagnostic && offset == TRIGGER {
            self.commit_job();
        }
        Ok(())
    }

    fn peek(&mut self, offset: usize) -> Result<u32> {
        self.ensure_attached(offset)?;
        Self::index(offset)?;
        self.reads += 1;

        if self.faults.fail_read == Some(self.reads) {
            return Err(ClError::io(offset, "simulated bus fault"));
        }

        if offset == STATUS {
            if let Some(results) = self.pending {
                if self.busy_reads_left > 0 {
                    self.busy_reads_left -= 1;
                    return Ok(0);
                }
                for (reg, value) in results {
                    self.set_reg(reg, value);
                }
                self.pending = None;
            }
        }

        let value = self.reg(offset);
        trace!("Read u32 @ {offset:#x} = {value:#x}");
        Ok(value)
    }

    fn detach(&mut self) -> Result<()> {
        if !self.attached {
            return Ok(());
        }
        self.attached = false;
        self.detach_count += 1;
        if self.faults.fail_detach {
            return Err(ClError::detach("simulated detach failure"));
        }
        Ok(())
    }

    fn port_type(&self) -> PortType {
        PortType::Simulated
    }
}
