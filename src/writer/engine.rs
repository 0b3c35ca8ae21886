//! The burst write engine state machine.
//!
//! One [`tick`](BurstWriteEngine::tick) call is one clock cycle. Per cycle
//! the engine presents at most one address-phase request and one data-phase
//! beat; an unaccepted presentation is held unchanged across cycles
//! (level-sensitive stalling). The cycle ends by applying the accumulated
//! [`AddressCtrl`] to the address generator exactly once, which is how the
//! two state objects stay in lock-step without sharing any other state.
//!
//! Once a burst is committed it always runs to its agreed length: a frame
//! ending mid-burst switches to FLUSH, which pads the remainder with
//! strobe-0 beats. The final beat of a burst re-enters IDLE within the same
//! cycle (the IDLE logic is a shared transition function, tail-called from
//! the terminating states) so back-to-back bursts lose no throughput beyond
//! the generator's one-cycle address recompute.

use crate::bus::{BurstRequest, BurstType, WriteBeat, WritePort, STROBE_ALL};
use crate::stream::{StreamFifo, StreamWord};

use super::address::{AddressCtrl, AddressGenerator, RingLayout};
use super::DATA_WIDTH_BYTES;

/// Engine state. The discriminants are the externally observable state
/// ordinals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u32)]
pub enum EngineState {
    /// Waiting for a valid address and a first queued word.
    #[default]
    Idle = 0,
    /// Driving the address phase until the bus accepts it.
    Address = 1,
    /// Streaming real payload beats.
    TransferData = 2,
    /// Completing a committed burst with padding after the frame ended.
    Flush = 3,
}

impl EngineState {
    /// Observable state ordinal.
    pub fn code(self) -> u32 {
        self as u32
    }
}

/// Read-only status surface for external monitors.
///
/// Counters wrap on overflow and are cleared only by [`reset`]
/// (`BurstWriteEngine::reset`), never by the engine itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriterStatus {
    pub state: u32,
    /// Sticky data-availability fault flag.
    pub error: bool,
    pub burst_position: u32,
    /// Accepted data beats, padding included.
    pub words_written: u32,
    /// Completed frames / buffer rotations.
    pub buffers_written: u32,
}

/// Synchronous state machine bursting FIFO words onto the write bus.
#[derive(Debug)]
pub struct BurstWriteEngine {
    addr_gen: AddressGenerator,
    max_burst_length: usize,

    state: EngineState,
    /// `burst_length - 1` recorded at commit.
    len_minus_one: u8,
    /// Data register: the word currently presented on the data phase.
    held: StreamWord,

    burst_position: u32,
    words_written: u32,
    buffers_written: u32,
    error: bool,
}

impl BurstWriteEngine {
    /// Engine over a fixed ring layout. `max_burst_length` is in words and
    /// bounds every commit; the generator's safety margin is derived from it.
    pub fn new(layout: RingLayout, max_burst_length: usize) -> Self {
        let max_burst_bytes = (max_burst_length * DATA_WIDTH_BYTES) as u64;
        Self {
            addr_gen: AddressGenerator::new(layout, max_burst_bytes),
            max_burst_length,
            state: EngineState::Idle,
            len_minus_one: 0,
            held: StreamWord::new(0),
            burst_position: 0,
            words_written: 0,
            buffers_written: 0,
            error: false,
        }
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    /// Sticky fault: a word was promised mid-burst but the FIFO had none.
    pub fn error(&self) -> bool {
        self.error
    }

    pub fn words_written(&self) -> u32 {
        self.words_written
    }

    pub fn buffers_written(&self) -> u32 {
        self.buffers_written
    }

    pub fn burst_position(&self) -> u32 {
        self.burst_position
    }

    pub fn addr_gen(&self) -> &AddressGenerator {
        &self.addr_gen
    }

    /// Snapshot of the observable status surface.
    pub fn status(&self) -> WriterStatus {
        WriterStatus {
            state: self.state.code(),
            error: self.error,
            burst_position: self.burst_position,
            words_written: self.words_written,
            buffers_written: self.buffers_written,
        }
    }

    /// Advance one clock cycle.
    pub fn tick(&mut self, fifo: &mut StreamFifo, bus: &mut impl WritePort) {
        let mut ctrl = AddressCtrl::default();

        match self.state {
            EngineState::Idle => self.idle_cycle(fifo, &mut ctrl),

            EngineState::Address => {
                let req = BurstRequest {
                    addr: self.addr_gen.addr(),
                    len_minus_one: self.len_minus_one,
                    burst: BurstType::Incr,
                };
                if bus.address(&req) {
                    ctrl.done = true;
                    self.fetch_word(fifo);
                    self.state = EngineState::TransferData;
                }
            }

            EngineState::TransferData => {
                let final_beat = self.burst_position == self.len_minus_one as u32;
                let beat = WriteBeat {
                    value: self.held.value,
                    strobe: STROBE_ALL,
                    last: final_beat,
                };
                if bus.data(&beat) {
                    self.words_written = self.words_written.wrapping_add(1);
                    self.burst_position += 1;

                    let frame_end = self.held.last;
                    if frame_end {
                        // Rotate now, so the generator has the next buffer's
                        // base before IDLE is re-entered.
                        self.buffers_written = self.buffers_written.wrapping_add(1);
                        ctrl.change_buffer = true;
                        log::debug!(
                            "engine: frame complete at beat {}/{}, buffers_written={}",
                            self.burst_position,
                            self.len_minus_one as u32 + 1,
                            self.buffers_written
                        );
                    }

                    if final_beat {
                        self.state = EngineState::Idle;
                        self.idle_cycle(fifo, &mut ctrl);
                    } else if frame_end {
                        self.state = EngineState::Flush;
                    } else {
                        self.fetch_word(fifo);
                    }
                }
            }

            EngineState::Flush => {
                let final_beat = self.burst_position == self.len_minus_one as u32;
                let beat = WriteBeat {
                    value: 0,
                    strobe: 0,
                    last: final_beat,
                };
                if bus.data(&beat) {
                    self.words_written = self.words_written.wrapping_add(1);
                    self.burst_position += 1;
                    if final_beat {
                        self.state = EngineState::Idle;
                        self.idle_cycle(fifo, &mut ctrl);
                    }
                }
            }
        }

        self.addr_gen.tick(&ctrl);
    }

    /// IDLE logic, also tail-called from the final beat of
    /// TRANSFER_DATA/FLUSH so a new burst can be committed the same cycle.
    fn idle_cycle(&mut self, fifo: &StreamFifo, ctrl: &mut AddressCtrl) {
        self.burst_position = 0;
        ctrl.request = true;

        if self.addr_gen.valid() && !fifo.is_empty() {
            // Occupancy was checked, so this burst can be fed to completion.
            let burst_len = fifo.level().min(self.max_burst_length);
            self.len_minus_one = (burst_len - 1) as u8;
            ctrl.increment = Some((burst_len * DATA_WIDTH_BYTES) as u64);
            self.state = EngineState::Address;
            log::debug!(
                "engine: committed {}-beat burst at {:#x}",
                burst_len,
                self.addr_gen.addr()
            );
        }
    }

    /// Pull the next word into the data register. The engine only commits
    /// to lengths it saw queued, so a miss here is an upstream protocol
    /// violation: flag it and keep streaming the stale register.
    fn fetch_word(&mut self, fifo: &mut StreamFifo) {
        match fifo.pop() {
            Some(word) => self.held = word,
            None => {
                if !self.error {
                    log::warn!(
                        "engine: fifo empty at beat {} of committed burst",
                        self.burst_position
                    );
                }
                self.error = true;
            }
        }
    }

    /// External system reset: state, counters and the sticky error clear,
    /// the generator returns to buffer 0.
    pub fn reset(&mut self) {
        self.state = EngineState::Idle;
        self.len_minus_one = 0;
        self.held = StreamWord::new(0);
        self.burst_position = 0;
        self.words_written = 0;
        self.buffers_written = 0;
        self.error = false;
        self.addr_gen.reset();
    }
}
