//! Burst destination address generation over a ring of buffers.
//!
//! The generator holds one address at a time. The engine asks for the next
//! one with `request`, sized by the byte span of the burst it just committed
//! (`increment`), acknowledges capture with `done`, and forces a rotation to
//! the next buffer's base with `change_buffer` when a frame ends. Within a
//! buffer the address only ever grows; rotation is the only way it moves
//! back down (to a fresh base).
//!
//! Each buffer has a bounded usable range: addresses past
//! `base + size − 2 × max_burst_bytes` are refused and the generator simply
//! stops producing until the next rotation. That margin is pessimistic on
//! purpose; a burst committed from the last accepted address can never reach
//! past the buffer's end.

/// Fixed set of same-sized buffers written in round-robin order.
#[derive(Debug, Clone)]
pub struct RingLayout {
    bases: Vec<u64>,
    size: u64,
}

impl RingLayout {
    /// Layout from explicit base addresses and a shared buffer size.
    pub fn new(bases: Vec<u64>, size: u64) -> Self {
        Self { bases, size }
    }

    /// `count` back-to-back buffers of `size` bytes starting at `base`.
    pub fn contiguous(base: u64, count: usize, size: u64) -> Self {
        let bases = (0..count as u64).map(|i| base + i * size).collect();
        Self { bases, size }
    }

    pub fn count(&self) -> usize {
        self.bases.len()
    }

    pub fn base(&self, index: usize) -> u64 {
        self.bases[index]
    }

    pub fn size(&self) -> u64 {
        self.size
    }
}

/// Per-cycle control inputs to the generator, driven by the engine.
///
/// This handshake is the only way the address cursor is mutated.
#[derive(Debug, Clone, Copy, Default)]
pub struct AddressCtrl {
    /// Consume the held address: compute the following one.
    pub request: bool,
    /// This was the frame's last burst: rotate buffers instead of
    /// incrementing. Takes priority over `request`.
    pub change_buffer: bool,
    /// The currently valid address has been captured; invalidate it.
    pub done: bool,
    /// Byte span of the burst just committed; latched for the next
    /// address computation.
    pub increment: Option<u64>,
}

/// Owns the write address cursor and the current buffer index.
#[derive(Debug)]
pub struct AddressGenerator {
    layout: RingLayout,
    max_burst_bytes: u64,

    addr: u64,
    current_buffer: usize,
    valid: bool,
    increment: u64,
}

impl AddressGenerator {
    /// Out of reset the generator already holds buffer 0's base.
    pub fn new(layout: RingLayout, max_burst_bytes: u64) -> Self {
        let addr = layout.base(0);
        Self {
            layout,
            max_burst_bytes,
            addr,
            current_buffer: 0,
            valid: true,
            increment: 0,
        }
    }

    /// The held address. Meaningful while [`valid`](Self::valid) is true.
    pub fn addr(&self) -> u64 {
        self.addr
    }

    /// A fresh address is ready to be consumed by a new burst request.
    pub fn valid(&self) -> bool {
        self.valid
    }

    pub fn current_buffer(&self) -> usize {
        self.current_buffer
    }

    pub fn layout(&self) -> &RingLayout {
        &self.layout
    }

    /// Highest address a burst may start from in the current buffer.
    pub fn max_addr(&self) -> u64 {
        self.layout.base(self.current_buffer) + self.layout.size() - 2 * self.max_burst_bytes
    }

    /// Advance one clock cycle, evaluated against pre-tick state.
    ///
    /// `change_buffer` outranks `request`; a `request` whose target would
    /// pass [`max_addr`](Self::max_addr) produces nothing, stalling the
    /// consumer until the next rotation.
    pub fn tick(&mut self, ctrl: &AddressCtrl) {
        if let Some(increment) = ctrl.increment {
            self.increment = increment;
        }

        if !self.valid {
            if ctrl.change_buffer {
                self.current_buffer = (self.current_buffer + 1) % self.layout.count();
                self.addr = self.layout.base(self.current_buffer);
                self.valid = true;
                log::debug!(
                    "address: rotated to buffer {} at {:#x}",
                    self.current_buffer,
                    self.addr
                );
            } else if ctrl.request && self.addr <= self.max_addr() {
                self.addr += self.increment;
                self.valid = true;
            }
        }

        if ctrl.done {
            self.valid = false;
        }
    }

    /// External system reset: back to buffer 0's base.
    pub fn reset(&mut self) {
        self.addr = self.layout.base(0);
        self.current_buffer = 0;
        self.valid = true;
        self.increment = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn generator() -> AddressGenerator {
        // 3 buffers of 4096 bytes, 16-word bursts (64 byte max span)
        AddressGenerator::new(RingLayout::contiguous(0x1000, 3, 4096), 64)
    }

    #[test]
    fn test_holds_first_base_out_of_reset() {
        let gen = generator();
        assert!(gen.valid());
        assert_eq!(gen.addr(), 0x1000);
        assert_eq!(gen.current_buffer(), 0);
    }

    #[test]
    fn test_request_advances_by_latched_increment() {
        let mut gen = generator();
        gen.tick(&AddressCtrl {
            done: true,
            increment: Some(64),
            ..Default::default()
        });
        assert!(!gen.valid());

        gen.tick(&AddressCtrl {
            request: true,
            ..Default::default()
        });
        assert!(gen.valid());
        assert_eq!(gen.addr(), 0x1000 + 64);
    }

    #[test]
    fn test_done_with_request_same_cycle_invalidates() {
        let mut gen = generator();
        // Old state is valid, so request is ignored and done wins.
        gen.tick(&AddressCtrl {
            request: true,
            done: true,
            ..Default::default()
        });
        assert!(!gen.valid());
        assert_eq!(gen.addr(), 0x1000);
    }

    #[test]
    fn test_change_buffer_outranks_request() {
        let mut gen = generator();
        gen.tick(&AddressCtrl {
            done: true,
            increment: Some(64),
            ..Default::default()
        });
        gen.tick(&AddressCtrl {
            request: true,
            change_buffer: true,
            ..Default::default()
        });
        assert!(gen.valid());
        assert_eq!(gen.current_buffer(), 1);
        assert_eq!(gen.addr(), 0x1000 + 4096);
    }

    #[test]
    fn test_rotation_wraps_to_buffer_zero() {
        let mut gen = generator();
        for expected in [1, 2, 0, 1] {
            gen.tick(&AddressCtrl {
                done: true,
                ..Default::default()
            });
            gen.tick(&AddressCtrl {
                change_buffer: true,
                ..Default::default()
            });
            assert_eq!(gen.current_buffer(), expected);
            assert_eq!(gen.addr(), gen.layout().base(expected));
        }
    }

    #[test]
    fn test_stalls_past_safety_margin() {
        // One buffer of 256 bytes with a 64-byte max burst: requests are
        // honored while the held address is <= base + 256 - 128, so the
        // last address produced is 192 (a burst from there ends at 256).
        let mut gen = AddressGenerator::new(RingLayout::contiguous(0x0, 1, 256), 64);
        assert_eq!(gen.max_addr(), 128);

        gen.tick(&AddressCtrl {
            done: true,
            increment: Some(64),
            ..Default::default()
        });
        gen.tick(&AddressCtrl {
            request: true,
            ..Default::default()
        });
        assert_eq!(gen.addr(), 64);

        gen.tick(&AddressCtrl {
            done: true,
            ..Default::default()
        });
        gen.tick(&AddressCtrl {
            request: true,
            ..Default::default()
        });
        assert_eq!(gen.addr(), 128);

        // 128 <= max_addr still holds, one more is produced, then the
        // generator refuses until a rotation.
        gen.tick(&AddressCtrl {
            done: true,
            ..Default::default()
        });
        gen.tick(&AddressCtrl {
            request: true,
            ..Default::default()
        });
        assert_eq!(gen.addr(), 192);

        gen.tick(&AddressCtrl {
            done: true,
            ..Default::default()
        });
        for _ in 0..4 {
            gen.tick(&AddressCtrl {
                request: true,
                ..Default::default()
            });
            assert!(!gen.valid());
        }

        // A rotation (single buffer: back to its own base) unblocks it.
        gen.tick(&AddressCtrl {
            change_buffer: true,
            ..Default::default()
        });
        assert!(gen.valid());
        assert_eq!(gen.addr(), 0);
    }

    #[test]
    fn test_reset_returns_to_buffer_zero() {
        let mut gen = generator();
        gen.tick(&AddressCtrl {
            done: true,
            increment: Some(64),
            ..Default::default()
        });
        gen.tick(&AddressCtrl {
            change_buffer: true,
            ..Default::default()
        });
        assert_eq!(gen.current_buffer(), 1);

        gen.reset();
        assert!(gen.valid());
        assert_eq!(gen.current_buffer(), 0);
        assert_eq!(gen.addr(), 0x1000);
    }
}
