//! Simulated destination memory for the write bus.
//!
//! Backs the bus model with a sparse byte store so ring buffers can live at
//! arbitrary bases (e.g. 0x1000_0000) without allocating the whole address
//! space. Storage is allocated in 4 KiB pages on first touch.
//!
//! The data phase of the bus carries per-byte strobes; padding beats arrive
//! with all strobes deasserted and must leave memory untouched, so the word
//! write path is strobe-masked rather than a plain store.

use std::collections::BTreeMap;

/// Sparse, page-allocated byte-addressable memory.
pub struct Memory {
    /// page base address -> page bytes
    pages: BTreeMap<u64, Box<[u8; Self::PAGE_SIZE]>>,

    /// Bytes actually stored through strobed writes (padding excluded).
    bytes_written: u64,
}

impl Memory {
    /// Page size for sparse storage.
    pub const PAGE_SIZE: usize = 4096;

    const PAGE_MASK: u64 = !(Self::PAGE_SIZE as u64 - 1);

    /// Create an empty memory.
    pub fn new() -> Self {
        Self {
            pages: BTreeMap::new(),
            bytes_written: 0,
        }
    }

    /// Total bytes stored through strobed word writes.
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    fn page_mut(&mut self, addr: u64) -> &mut [u8; Self::PAGE_SIZE] {
        let base = addr & Self::PAGE_MASK;
        self.pages
            .entry(base)
            .or_insert_with(|| Box::new([0u8; Self::PAGE_SIZE]))
    }

    /// Read a single byte (unallocated memory reads as zero).
    pub fn read_u8(&self, addr: u64) -> u8 {
        let base = addr & Self::PAGE_MASK;
        match self.pages.get(&base) {
            Some(page) => page[(addr - base) as usize],
            None => 0,
        }
    }

    fn write_u8(&mut self, addr: u64, value: u8) {
        let offset = (addr & !Self::PAGE_MASK) as usize;
        self.page_mut(addr)[offset] = value;
    }

    /// Read a little-endian 32-bit word.
    pub fn read_u32(&self, addr: u64) -> u32 {
        u32::from_le_bytes([
            self.read_u8(addr),
            self.read_u8(addr + 1),
            self.read_u8(addr + 2),
            self.read_u8(addr + 3),
        ])
    }

    /// Write a little-endian 32-bit word, honoring a 4-bit byte strobe.
    ///
    /// Strobe bit `i` enables byte lane `i` (`value` byte `i` at `addr + i`).
    /// A fully deasserted strobe writes nothing, which is exactly how the
    /// engine's flush padding is expected to behave.
    pub fn write_word_masked(&mut self, addr: u64, value: u32, strobe: u8) {
        let bytes = value.to_le_bytes();
        for (lane, byte) in bytes.iter().enumerate() {
            if strobe & (1 << lane) != 0 {
                self.write_u8(addr + lane as u64, *byte);
                self.bytes_written += 1;
            }
        }
    }

    /// Bulk byte write (test setup, sentinel prefill).
    pub fn write_bytes(&mut self, addr: u64, data: &[u8]) {
        for (i, byte) in data.iter().enumerate() {
            self.write_u8(addr + i as u64, *byte);
        }
    }

    /// Bulk byte read.
    pub fn read_bytes(&self, addr: u64, len: usize) -> Vec<u8> {
        (0..len).map(|i| self.read_u8(addr + i as u64)).collect()
    }

    /// Read `count` consecutive little-endian words.
    pub fn read_words(&self, addr: u64, count: usize) -> Vec<u32> {
        (0..count)
            .map(|i| self.read_u32(addr + (i as u64) * 4))
            .collect()
    }
}

impl Default for Memory {
    fn default() -> Self {
        Self::new()
    }
}
