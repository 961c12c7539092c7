//! Counter-mode expansion of a seed into an open-ended byte stream.
//!
//! Block `i` is HMAC-SHA256 keyed with the seed over the encoded counter.
//! Counters below 256 are a single byte; larger counters use four
//! big-endian bytes, so no two blocks share a message.

use crate::error::{Error, Result};
use crate::seed::Seed;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use zeroize::Zeroizing;

type HmacSha256 = Hmac<Sha256>;

pub const BLOCK_LEN: usize = 32;

fn keyed_mac(seed: &Seed) -> Result<HmacSha256> {
    HmacSha256::new_from_slice(seed.as_bytes())
        .map_err(|e| Error::InvalidSeed(format!("HMAC key init failed: {}", e)))
}

fn compute_block(mac: &HmacSha256, index: u32) -> Zeroizing<[u8; BLOCK_LEN]> {
    let mut mac = mac.clone();
    match u8::try_from(index) {
        Ok(short) => mac.update(&[short]),
        Err(_) => mac.update(&index.to_be_bytes()),
    }

    let mut block = Zeroizing::new([0u8; BLOCK_LEN]);
    block.copy_from_slice(&mac.finalize().into_bytes());
    block
}

/// Computes block `index` of the stream for `seed`.
pub fn block(seed: &Seed, index: u32) -> Result<Zeroizing<[u8; BLOCK_LEN]>> {
    let mac = keyed_mac(seed)?;
    Ok(compute_block(&mac, index))
}

/// Returns the first `len` bytes of the stream for `seed`.
pub fn expand(seed: &Seed, len: usize) -> Result<Zeroizing<Vec<u8>>> {
    let mut expander = Expander::new(seed)?;
    let mut output = Zeroizing::new(vec![0u8; len]);
    expander.fill(&mut output)?;
    Ok(output)
}

/// Streaming reader over the expanded bytes, computing blocks lazily.
pub struct Expander {
    mac: HmacSha256,
    block: Zeroizing<[u8; BLOCK_LEN]>,
    pos: usize,
    next_index: Option<u32>,
    consumed: u64,
}

impl Expander {
    pub fn new(seed: &Seed) -> Result<Self> {
        Ok(Self {
            mac: keyed_mac(seed)?,
            block: Zeroizing::new([0u8; BLOCK_LEN]),
            pos: BLOCK_LEN,
            next_index: Some(0),
            consumed: 0,
        })
    }

    fn refill(&mut self) -> Result<()> {
        let index = self.next_index.ok_or(Error::ExpanderExhausted)?;
        self.block = compute_block(&self.mac, index);
        self.next_index = index.checked_add(1);
        self.pos = 0;
        Ok(())
    }

    pub fn next_byte(&mut self) -> Result<u8> {
        if self.pos >= BLOCK_LEN {
            self.refill()?;
        }
        let byte = self.block[self.pos];
        self.pos += 1;
        self.consumed += 1;
        Ok(byte)
    }

    pub fn next_u16(&mut self) -> Result<u16> {
        let lo = self.next_byte()?;
        let hi = self.next_byte()?;
        Ok(u16::from_le_bytes([lo, hi]))
    }

    pub fn fill(&mut self, output: &mut [u8]) -> Result<()> {
        for byte in output.iter_mut() {
            *byte = self.next_byte()?;
        }
        Ok(())
    }

    pub fn bytes_consumed(&self) -> u64 {
        self.consumed
    }

    pub fn blocks_generated(&self) -> u64 {
        match self.next_index {
            Some(index) => u64::from(index),
            None => u64::from(u32::MAX) + 1,
        }
    }
}
