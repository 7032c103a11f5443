//! # Domain Services
//!
//! Pure functions for bytecode execution: hashing and contract-address
//! derivation. Deterministic, no side effects, no I/O.

use crate::domain::value_objects::{Address, Hash};
use sha3::{Digest, Keccak256};

// =============================================================================
// KECCAK256 UTILITY
// =============================================================================

/// Computes keccak256 hash of data.
///
/// This is also how code bodies are hashed into program-cache keys.
#[must_use]
pub fn keccak256(data: &[u8]) -> Hash {
    let hash = Keccak256::digest(data);
    Hash::new(hash.into())
}

/// Computes keccak256 of empty bytes (used for empty code hash).
#[must_use]
pub fn empty_code_hash() -> Hash {
    keccak256(&[])
}

// =============================================================================
// CONTRACT ADDRESS COMPUTATION
// =============================================================================

/// Computes the contract address for CREATE.
///
/// Address = keccak256(rlp(\[sender, nonce\]))\[12:\]
#[must_use]
pub fn compute_contract_address(sender: Address, nonce: u64) -> Address {
    let mut content = Vec::with_capacity(32);

    // RLP encode address (20 bytes, 0x80 + 20 = 0x94)
    content.push(0x94);
    content.extend_from_slice(sender.as_bytes());

    // RLP encode nonce
    if nonce == 0 {
        content.push(0x80); // Empty byte string
    } else if nonce < 128 {
        content.push(nonce as u8);
    } else {
        let nonce_bytes = encode_nonce(nonce);
        content.push(0x80 + nonce_bytes.len() as u8);
        content.extend_from_slice(&nonce_bytes);
    }

    // RLP list header; payload here is always well under 56 bytes
    let mut rlp_data = Vec::with_capacity(64);
    rlp_data.push(0xc0 + content.len() as u8);
    rlp_data.extend_from_slice(&content);

    // Hash and take last 20 bytes
    let hash = Keccak256::digest(&rlp_data);
    let mut addr = [0u8; 20];
    addr.copy_from_slice(&hash[12..32]);
    Address::new(addr)
}

/// Helper to encode nonce as big-endian bytes without leading zeros.
fn encode_nonce(nonce: u64) -> Vec<u8> {
    let bytes = nonce.to_be_bytes();
    let start = bytes.iter().position(|&b| b != 0).unwrap_or(7);
    bytes[start..].to_vec()
}

// =============================================================================
// TESTS
// =============================================================================
