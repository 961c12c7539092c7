//! Reduction of pointer-motion samples into a 256-bit seed.
//!
//! Samples are serialized as fixed-precision decimal text in collection
//! order and hashed once with SHA-256. The digest is the seed. A
//! [`Collector`] owns the sample buffer for a single collection session.

use crate::error::{Error, Result};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use sha2::{Digest, Sha256};
use std::fmt;
use zeroize::{Zeroize, Zeroizing};

pub const SEED_LEN: usize = 32;

pub const MIN_REQUIRED_MOVES: usize = 50;
pub const MAX_REQUIRED_MOVES: usize = 1000;
pub const DEFAULT_REQUIRED_MOVES: usize = 100;

/// Cursor position and monotonic timestamp of one pointer movement.
#[derive(Debug, Clone, Copy, PartialEq, Zeroize)]
pub struct MotionSample {
    pub x: f64,
    pub y: f64,
    pub t: f64,
}

impl MotionSample {
    pub fn new(x: f64, y: f64, t: f64) -> Self {
        Self { x, y, t }
    }

    fn check(&self, index: usize) -> Result<()> {
        for (name, value) in [("x", self.x), ("y", self.y), ("t", self.t)] {
            if !value.is_finite() {
                return Err(Error::MalformedSample {
                    index,
                    reason: format!("{} is not a finite number", name),
                });
            }
        }
        Ok(())
    }
}

/// A 256-bit derivation seed. Treated as key material.
#[derive(Clone)]
pub struct Seed(Zeroizing<[u8; SEED_LEN]>);

impl Seed {
    pub fn from_bytes(bytes: [u8; SEED_LEN]) -> Self {
        Self(Zeroizing::new(bytes))
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let array: [u8; SEED_LEN] = bytes.try_into().map_err(|_| {
            Error::InvalidSeed(format!(
                "expected {} bytes, got {}",
                SEED_LEN,
                bytes.len()
            ))
        })?;
        Ok(Self::from_bytes(array))
    }

    /// Decodes a standard-alphabet base64 string that must carry exactly 32 bytes.
    pub fn from_base64(encoded: &str) -> Result<Self> {
        let decoded = Zeroizing::new(
            STANDARD
                .decode(encoded.trim())
                .map_err(|e| Error::InvalidSeed(format!("not valid base64: {}", e)))?,
        );
        Self::from_slice(&decoded)
    }

    /// Encoding used to carry the seed across the network boundary.
    pub fn to_base64(&self) -> Zeroizing<String> {
        Zeroizing::new(STANDARD.encode(&self.0[..]))
    }

    pub fn as_bytes(&self) -> &[u8; SEED_LEN] {
        &self.0
    }
}

impl fmt::Debug for Seed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Seed([REDACTED])")
    }
}

fn serialize_samples(samples: &[MotionSample]) -> Result<Zeroizing<String>> {
    let mut text = Zeroizing::new(String::with_capacity(samples.len() * 24));

    for (index, sample) in samples.iter().enumerate() {
        sample.check(index)?;
        if index > 0 {
            text.push(';');
        }
        text.push_str(&format!("{:.2},{:.2},{:.2}", sample.x, sample.y, sample.t));
    }

    Ok(text)
}

/// Hashes an ordered, non-empty sample sequence into a seed without
/// checking it against a collection threshold.
pub fn digest_samples(samples: &[MotionSample]) -> Result<Seed> {
    if samples.is_empty() {
        return Err(Error::SampleCount {
            expected: 1,
            actual: 0,
        });
    }

    let text = serialize_samples(samples)?;

    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    let digest = hasher.finalize();

    let mut seed = [0u8; SEED_LEN];
    seed.copy_from_slice(&digest);
    Ok(Seed::from_bytes(seed))
}

pub fn check_required_moves(required_moves: usize) -> Result<()> {
    if !(MIN_REQUIRED_MOVES..=MAX_REQUIRED_MOVES).contains(&required_moves) {
        return Err(Error::InvalidSettings(format!(
            "required moves must be between {} and {}, got {}",
            MIN_REQUIRED_MOVES, MAX_REQUIRED_MOVES, required_moves
        )));
    }
    Ok(())
}

/// Reduces exactly `required_moves` samples into a seed.
pub fn reduce_samples(samples: &[MotionSample], required_moves: usize) -> Result<Seed> {
    check_required_moves(required_moves)?;

    if samples.len() != required_moves {
        return Err(Error::SampleCount {
            expected: required_moves,
            actual: samples.len(),
        });
    }

    digest_samples(samples)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Collecting,
    SeedReady,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    Collecting { collected: usize, required: usize },
    SeedReady,
}

enum State {
    Idle,
    Collecting {
        samples: Zeroizing<Vec<MotionSample>>,
    },
    SeedReady(Seed),
}

/// One-session motion collector: `Idle -> Collecting -> SeedReady -> Idle`.
///
/// The sample buffer is owned by the session and wiped once the seed is
/// computed. The transition to `SeedReady` happens exactly once per session.
pub struct Collector {
    required_moves: usize,
    state: State,
}

impl Collector {
    pub fn new(required_moves: usize) -> Result<Self> {
        check_required_moves(required_moves)?;
        Ok(Self {
            required_moves,
            state: State::Idle,
        })
    }

    pub fn required_moves(&self) -> usize {
        self.required_moves
    }

    pub fn phase(&self) -> Phase {
        match self.state {
            State::Idle => Phase::Idle,
            State::Collecting { .. } => Phase::Collecting,
            State::SeedReady(_) => Phase::SeedReady,
        }
    }

    pub fn collected(&self) -> usize {
        match &self.state {
            State::Idle => 0,
            State::Collecting { samples } => samples.len(),
            State::SeedReady(_) => self.required_moves,
        }
    }

    /// Begins a fresh session, discarding any samples or seed from a previous one.
    pub fn start(&mut self) {
        self.state = State::Collecting {
            samples: Zeroizing::new(Vec::with_capacity(self.required_moves)),
        };
    }

    pub fn record(&mut self, sample: MotionSample) -> Result<Progress> {
        let State::Collecting { samples } = &mut self.state else {
            return Err(Error::NotCollecting);
        };

        if let Err(e) = sample.check(samples.len()) {
            self.state = State::Idle;
            return Err(e);
        }

        samples.push(sample);
        let collected = samples.len();
        if collected < self.required_moves {
            return Ok(Progress::Collecting {
                collected,
                required: self.required_moves,
            });
        }

        let reduced = reduce_samples(samples.as_slice(), self.required_moves);
        match reduced {
            Ok(seed) => {
                self.state = State::SeedReady(seed);
                Ok(Progress::SeedReady)
            }
            Err(e) => {
                self.state = State::Idle;
                Err(e)
            }
        }
    }

    pub fn take_seed(&mut self) -> Option<Seed> {
        match std::mem::replace(&mut self.state, State::Idle) {
            State::SeedReady(seed) => Some(seed),
            other => {
                self.state = other;
                None
            }
        }
    }

    pub fn reset(&mut self) {
        self.state = State::Idle;
    }
}
