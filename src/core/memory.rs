// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 itsakeyfut

//! Core memory
//!
//! The emulator does not allow for non-contiguous memory fields and does
//! no memory addressing-error checking, so all addressable memory must be
//! available. The store is therefore a flat array of 12-bit words whose
//! size depends on whether the memory-extension option (KM8E) is present:
//! one 4096-word field without it, eight fields (32768 words) with it.
//! The size is fixed when the machine is configured and never changes
//! mid-run.

use super::registers::WORD_MASK;

/// Words in one memory field
pub const FIELD_WORDS: usize = 4096;

/// Number of fields with the memory-extension option installed
pub const MAX_FIELDS: usize = 8;

/// Flat core store of 12-bit words
///
/// # Example
/// ```
/// use pdp8e::core::memory::Memory;
///
/// let mut mem = Memory::new(false);
/// assert_eq!(mem.len(), 4096);
/// mem.write(0o200, 0o17777); // masked to 12 bits
/// assert_eq!(mem.read(0o200), 0o7777);
/// ```
#[derive(Debug, Clone)]
pub struct Memory {
    words: Vec<u16>,
}

impl Memory {
    /// Create a zeroed core store, sized by the extended-memory option
    pub fn new(extended: bool) -> Self {
        let size = if extended {
            FIELD_WORDS * MAX_FIELDS
        } else {
            FIELD_WORDS
        };
        Self {
            words: vec![0; size],
        }
    }

    /// Read the word at `addr`
    ///
    /// `addr` must be within the configured store; the decode stage and
    /// field registers can only produce in-range addresses.
    #[inline(always)]
    pub fn read(&self, addr: usize) -> u16 {
        self.words[addr]
    }

    /// Write the word at `addr`, masked to 12 bits
    #[inline(always)]
    pub fn write(&mut self, addr: usize, value: u16) {
        self.words[addr] = value & WORD_MASK;
    }

    /// Total addressable words (4096 or 32768)
    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Zero the whole store
    pub fn clear(&mut self) {
        self.words.fill(0);
    }

    /// Whole store as a slice, for core-image capture
    pub fn words(&self) -> &[u16] {
        &self.words
    }

    /// Replace the whole store from a core image
    ///
    /// The caller has already checked that `words.len()` matches the
    /// configured size.
    pub(crate) fn load_words(&mut self, words: &[u16]) {
        self.words.copy_from_slice(words);
    }
}
