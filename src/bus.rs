//! Split-transaction write bus.
//!
//! The bus has three independent channels:
//!
//! - **address phase**: one request per burst (`addr`, `len_minus_one`,
//!   burst type), handshaked;
//! - **data phase**: `len_minus_one + 1` beats per accepted request, each with
//!   a 4-bit byte strobe and a `last` marker on the final beat, handshaked;
//! - **response**: one write acknowledgement per completed burst, which the
//!   engine accepts unconditionally without inspecting status.
//!
//! [`WritePort`] is the seam the engine drives. Handshakes are
//! level-sensitive: a `false` return means "not ready this cycle" and the
//! caller re-presents the identical request next cycle.
//!
//! [`BusModel`] is the memory-backed implementation used by the simulation
//! harness and tests. It applies strobed writes to a [`Memory`], enforces the
//! fixed-burst-length contract (counting violations rather than failing, so a
//! broken master is observable), and supports programmable back-pressure on
//! both channels.

use crate::memory::Memory;

/// Burst addressing mode. Only incrementing bursts are produced here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BurstType {
    /// Address increments by one word per beat.
    Incr,
}

/// Address-phase request for one burst.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BurstRequest {
    /// First beat's destination address.
    pub addr: u64,
    /// Burst length minus one (0 = single beat).
    pub len_minus_one: u8,
    pub burst: BurstType,
}

/// All four byte lanes enabled.
pub const STROBE_ALL: u8 = 0b1111;

/// One data-phase beat.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteBeat {
    pub value: u32,
    /// Byte lane enables; padding beats carry 0.
    pub strobe: u8,
    /// Asserted on the final beat of the burst.
    pub last: bool,
}

/// Master-side view of the write bus.
///
/// Both methods present a request for the current cycle and report whether
/// the slave accepted it. Callers must re-present an unaccepted request
/// unchanged on following cycles.
pub trait WritePort {
    /// Present an address-phase request. Returns true when accepted.
    fn address(&mut self, req: &BurstRequest) -> bool;

    /// Present a data-phase beat. Returns true when accepted.
    fn data(&mut self, beat: &WriteBeat) -> bool;
}

/// Burst currently in its data phase.
#[derive(Debug, Clone, Copy)]
struct OpenBurst {
    next_addr: u64,
    len_minus_one: u8,
    beat_index: u8,
}

/// Memory-backed bus slave with programmable back-pressure.
pub struct BusModel {
    memory: Memory,

    /// Not-ready cycles inserted between address-phase accepts.
    address_stall: u32,
    address_wait: u32,

    /// Not-ready cycles inserted between data-phase accepts.
    data_stall: u32,
    data_wait: u32,

    open: Option<OpenBurst>,

    bursts_accepted: u64,
    beats_accepted: u64,
    responses: u64,
    violations: u64,
}

impl BusModel {
    /// Create an always-ready bus over the given memory.
    pub fn new(memory: Memory) -> Self {
        Self {
            memory,
            address_stall: 0,
            address_wait: 0,
            data_stall: 0,
            data_wait: 0,
            open: None,
            bursts_accepted: 0,
            beats_accepted: 0,
            responses: 0,
            violations: 0,
        }
    }

    /// Insert `cycles` not-ready cycles before each address-phase accept.
    pub fn with_address_stall(mut self, cycles: u32) -> Self {
        self.address_stall = cycles;
        self
    }

    /// Insert `cycles` not-ready cycles before each data-phase accept.
    pub fn with_data_stall(mut self, cycles: u32) -> Self {
        self.data_stall = cycles;
        self
    }

    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    pub fn memory_mut(&mut self) -> &mut Memory {
        &mut self.memory
    }

    /// Bursts whose address phase has been accepted.
    pub fn bursts_accepted(&self) -> u64 {
        self.bursts_accepted
    }

    /// Data beats accepted (real and padding).
    pub fn beats_accepted(&self) -> u64 {
        self.beats_accepted
    }

    /// Burst-contract violations observed so far.
    pub fn violations(&self) -> u64 {
        self.violations
    }

    /// A burst is mid data phase.
    pub fn burst_open(&self) -> bool {
        self.open.is_some()
    }

    /// Drain the response channel, returning the number of pending write
    /// acknowledgements. The engine never inspects these.
    pub fn take_responses(&mut self) -> u64 {
        std::mem::take(&mut self.responses)
    }
}

impl WritePort for BusModel {
    fn address(&mut self, req: &BurstRequest) -> bool {
        if self.open.is_some() {
            // One outstanding burst at a time in this model.
            log::warn!(
                "bus: address phase at {:#x} while a burst is still open",
                req.addr
            );
            self.violations += 1;
            return false;
        }

        if self.address_wait < self.address_stall {
            self.address_wait += 1;
            return false;
        }
        self.address_wait = 0;

        log::debug!(
            "bus: accepted burst addr={:#x} beats={} ({:?})",
            req.addr,
            req.len_minus_one as u32 + 1,
            req.burst
        );
        self.open = Some(OpenBurst {
            next_addr: req.addr,
            len_minus_one: req.len_minus_one,
            beat_index: 0,
        });
        self.bursts_accepted += 1;
        true
    }

    fn data(&mut self, beat: &WriteBeat) -> bool {
        let open = match self.open {
            Some(open) => open,
            None => {
                log::warn!("bus: data beat with no open burst");
                self.violations += 1;
                return false;
            }
        };

        if self.data_wait < self.data_stall {
            self.data_wait += 1;
            return false;
        }
        self.data_wait = 0;

        let final_beat = open.beat_index == open.len_minus_one;
        if beat.last != final_beat {
            log::warn!(
                "bus: last={} on beat {} of {}-beat burst",
                beat.last,
                open.beat_index as u32 + 1,
                open.len_minus_one as u32 + 1
            );
            self.violations += 1;
        }

        self.memory
            .write_word_masked(open.next_addr, beat.value, beat.strobe);
        self.beats_accepted += 1;

        if final_beat {
            self.open = None;
            self.responses += 1;
        } else {
            self.open = Some(OpenBurst {
                next_addr: open.next_addr + 4,
                beat_index: open.beat_index + 1,
                ..open
            });
        }
        true
    }
}
