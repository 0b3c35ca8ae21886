//! Burst write engine subsystem.
//!
//! Two coupled state objects drain the input stream into the ring buffers:
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │                    BurstWriteEngine                         │
//! │                                                             │
//! │   IDLE ──► ADDRESS ──► TRANSFER_DATA ──► FLUSH ──► IDLE     │
//! │    ▲                        │               │        │      │
//! │    └────────────────────────┴───────────────┴────────┘      │
//! │          (final beat re-enters IDLE the same cycle)         │
//! └───────────────┬────────────────────────────────────────────┘
//!                 │ AddressCtrl { request, change_buffer,
//!                 │               done, increment }
//!                 ▼
//!        ┌─────────────────┐
//!        │ AddressGenerator │──► buffer 0 │ buffer 1 │ ... │ wrap
//!        └─────────────────┘
//! ```
//!
//! The engine sizes each burst from the FIFO occupancy at commit time
//! (`min(level, max_burst_length)`), so the whole burst's data is queued
//! before the address phase is issued. A frame boundary landing mid-burst
//! switches the engine to FLUSH, which completes the committed length with
//! strobe-0 padding beats; the bus's fixed-burst-length contract is never
//! broken by truncation.
//!
//! The only shared mutable state between the two objects is the generator's
//! address cursor, and it is touched exclusively through [`AddressCtrl`],
//! applied once per cycle.

pub mod address;
pub mod engine;

pub use address::{AddressCtrl, AddressGenerator, RingLayout};
pub use engine::{BurstWriteEngine, EngineState, WriterStatus};

/// Bus data width: one 32-bit word per beat.
pub const DATA_WIDTH_BYTES: usize = 4;

/// Largest burst length the address phase can encode (`len_minus_one` is 8
/// bits).
pub const MAX_BURST_LIMIT: usize = 256;
