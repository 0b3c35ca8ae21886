//! ringburst: cycle-level model of a stream-to-ring-buffer burst write engine.
//!
//! A word stream with end-of-frame markers is drained through a bounded FIFO
//! into a round-robin set of fixed-size memory buffers, using a
//! split-transaction write bus (separate address and data phases, both
//! flow-controlled). The two core state objects are the
//! [`writer::AddressGenerator`], which owns the write address and buffer
//! rotation, and the [`writer::BurstWriteEngine`], which sizes bursts from
//! FIFO occupancy and drives both bus phases one cycle at a time.
//!
//! ```text
//! producer ──► StreamFifo ──► BurstWriteEngine ──► WritePort ──► Memory
//!                                   │ request/done/change_buffer
//!                                   ▼
//!                            AddressGenerator ──► ring buffers
//! ```

pub mod bus;
pub mod config;
pub mod memory;
pub mod sim;
pub mod stream;
pub mod writer;
