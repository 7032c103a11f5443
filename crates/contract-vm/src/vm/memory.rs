//! # Execution Memory
//!
//! Byte-addressable memory for contract execution.
//! Memory grows in 32-byte words, never shrinks during a run, and reads
//! past the allocated end observe zeros.

use crate::errors::VmError;

/// Maximum memory size (16 MiB).
pub const MAX_MEMORY_SIZE: usize = 16 * 1024 * 1024;

/// Word size in bytes (32 bytes = 256 bits).
pub const WORD_SIZE: usize = 32;

/// Contract execution memory.
///
/// A byte-addressable array that expands on demand. Expansion is always
/// rounded up to a word boundary and new bytes are zero-initialized.
#[derive(Clone, Debug, Default)]
pub struct Memory {
    data: Vec<u8>,
}

impl Memory {
    /// Creates a new empty memory.
    #[must_use]
    pub fn new() -> Self {
        Self { data: Vec::new() }
    }

    /// Returns the current memory size in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns true if memory is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns the memory size in 32-byte words (rounded up).
    #[must_use]
    pub fn word_size(&self) -> usize {
        self.data.len().div_ceil(WORD_SIZE)
    }

    /// Ensures memory spans at least `words` 32-byte words.
    /// Shrinking requests are ignored; memory only grows.
    ///
    /// # Errors
    ///
    /// Returns `MemoryLimitExceeded` if the requested span exceeds the
    /// maximum memory size.
    pub fn resize_words(&mut self, words: u64) -> Result<(), VmError> {
        let Some(bytes) = words.checked_mul(WORD_SIZE as u64) else {
            return Err(VmError::MemoryLimitExceeded {
                requested: u64::MAX,
                max: MAX_MEMORY_SIZE as u64,
            });
        };
        if bytes > MAX_MEMORY_SIZE as u64 {
            return Err(VmError::MemoryLimitExceeded {
                requested: bytes,
                max: MAX_MEMORY_SIZE as u64,
            });
        }
        self.expand(bytes as usize)?;
        Ok(())
    }

    /// Ensures memory is at least `size` bytes, expanding if necessary.
    /// Returns the number of new words added.
    ///
    /// # Errors
    ///
    /// Returns `MemoryLimitExceeded` if size exceeds maximum.
    pub fn expand(&mut self, size: usize) -> Result<usize, VmError> {
        if size <= self.data.len() {
            return Ok(0);
        }

        if size > MAX_MEMORY_SIZE {
            return Err(VmError::MemoryLimitExceeded {
                requested: size as u64,
                max: MAX_MEMORY_SIZE as u64,
            });
        }

        // Calculate new size (round up to word boundary)
        let new_word_size = size.div_ceil(WORD_SIZE);
        let new_byte_size = new_word_size * WORD_SIZE;
        let old_word_size = self.word_size();

        // Expand with zeros
        self.data.resize(new_byte_size, 0);

        Ok(new_word_size.saturating_sub(old_word_size))
    }

    /// Read a 32-byte word from memory.
    /// Returns zero-padded if reading past end of allocated memory.
    #[must_use]
    pub fn read_word(&self, offset: usize) -> [u8; 32] {
        let mut result = [0u8; 32];
        let len = self.data.len();

        for (i, byte) in result.iter_mut().enumerate() {
            let pos = offset.saturating_add(i);
            if pos < len {
                *byte = self.data[pos];
            }
            // Else remains 0
        }

        result
    }

    /// Read bytes from memory into a fresh buffer.
    /// Returns zero-padded if reading past end of allocated memory.
    #[must_use]
    pub fn read_bytes(&self, offset: usize, size: usize) -> Vec<u8> {
        let mut result = Vec::new();
        self.read_into(offset, size, &mut result);
        result
    }

    /// Read bytes from memory into a caller-supplied buffer, zero-padded
    /// past the allocated end. The buffer is cleared first.
    pub fn read_into(&self, offset: usize, size: usize, buf: &mut Vec<u8>) {
        buf.clear();
        buf.resize(size, 0);
        let len = self.data.len();

        for (i, byte) in buf.iter_mut().enumerate() {
            let pos = offset.saturating_add(i);
            if pos < len {
                *byte = self.data[pos];
            }
        }
    }

    /// Write a single byte to memory.
    /// Expands memory if necessary.
    ///
    /// # Errors
    ///
    /// Returns error if expansion fails.
    pub fn write_byte(&mut self, offset: usize, value: u8) -> Result<usize, VmError> {
        let words_added = self.expand(offset + 1)?;
        self.data[offset] = value;
        Ok(words_added)
    }

    /// Write a 32-byte word to memory.
    /// Expands memory if necessary.
    ///
    /// # Errors
    ///
    /// Returns error if expansion fails.
    pub fn write_word(&mut self, offset: usize, value: &[u8; 32]) -> Result<usize, VmError> {
        let words_added = self.expand(offset + 32)?;
        self.data[offset..offset + 32].copy_from_slice(value);
        Ok(words_added)
    }

    /// Write bytes to memory.
    /// Expands memory if necessary.
    ///
    /// # Errors
    ///
    /// Returns error if expansion fails.
    pub fn write_bytes(&mut self, offset: usize, data: &[u8]) -> Result<usize, VmError> {
        if data.is_empty() {
            return Ok(0);
        }
        let words_added = self.expand(offset + data.len())?;
        self.data[offset..offset + data.len()].copy_from_slice(data);
        Ok(words_added)
    }

    /// Get a reference to the underlying data.
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Clear memory.
    pub fn clear(&mut self) {
        self.data.clear();
    }
}

// =============================================================================
// TESTS
// =============================================================================
