//! Full-period linear congruential permutation over the identifier space.
//!
//! Identifiers of length `L` over an alphabet of size `N` are exactly the
//! integers in `[N^(L-1), N^L)`. The generator walks that interval with
//! `state' = (a * state + c) mod range`, choosing `a` and `c` per the
//! Hull–Dobell theorem so that every value is visited once per period.

use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::error::{Result, SketchpadError};
use crate::id::{Alphabet, RoomId};

/// Default identifier length
pub const DEFAULT_ID_LENGTH: u32 = 6;

pub struct RoomIdGenerator {
    alphabet: Alphabet,
    min: u64,
    range: u64,
    multiplier: u64,
    increment: u64,
    state: u64,
}

impl RoomIdGenerator {
    /// Build a generator seeded from the thread-local entropy source
    pub fn new(length: u32, alphabet: Alphabet) -> Result<Self> {
        Self::from_rng(length, alphabet, &mut rand::thread_rng())
    }

    /// Build a generator with a fixed seed (deterministic sequence)
    pub fn seeded(length: u32, alphabet: Alphabet, seed: u64) -> Result<Self> {
        Self::from_rng(length, alphabet, &mut StdRng::seed_from_u64(seed))
    }

    pub fn from_rng<R: Rng>(length: u32, alphabet: Alphabet, rng: &mut R) -> Result<Self> {
        if length == 0 {
            return Err(SketchpadError::Config(
                "Identifier length must be at least 1".into(),
            ));
        }

        let base = alphabet.len() as u64;
        let (min, max) = match (base.checked_pow(length - 1), base.checked_pow(length)) {
            (Some(min), Some(max)) => (min, max),
            _ => {
                return Err(SketchpadError::Config(format!(
                    "Identifier space {}^{} exceeds 64-bit arithmetic",
                    base, length
                )))
            }
        };

        let range = max - min;
        let multiplier = find_multiplier(range).ok_or_else(|| {
            SketchpadError::Config(format!("No full-period multiplier for range {}", range))
        })?;
        let increment = find_increment(range);

        let offset = rng.gen_range(1..=range);
        let state = (min + 1 + offset) % range;

        Ok(Self {
            alphabet,
            min,
            range,
            multiplier,
            increment,
            state,
        })
    }

    /// Advance the permutation and return the next integer in `[min, max)`
    pub fn next_value(&mut self) -> u64 {
        let next = (self.multiplier as u128 * self.state as u128 + self.increment as u128)
            % self.range as u128;
        // range < 2^64, so the residue fits
        self.state = next as u64;
        self.state + self.min
    }

    pub fn next_id(&mut self) -> RoomId {
        let value = self.next_value();
        RoomId::from(self.alphabet.encode(value))
    }

    pub fn to_alphabet(&self, n: u64) -> String {
        self.alphabet.encode(n)
    }

    pub fn from_alphabet(&self, s: &str) -> Option<u64> {
        self.alphabet.decode(s)
    }

    /// Lower bound (inclusive) of generated values
    pub fn min(&self) -> u64 {
        self.min
    }

    /// Number of distinct values per period
    pub fn range(&self) -> u64 {
        self.range
    }

    pub fn multiplier(&self) -> u64 {
        self.multiplier
    }

    pub fn increment(&self) -> u64 {
        self.increment
    }
}

impl std::fmt::Debug for RoomIdGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // state stays out of logs: it predicts every future id
        f.debug_struct("RoomIdGenerator")
            .field("min", &self.min)
            .field("range", &self.range)
            .field("multiplier", &self.multiplier)
            .field("increment", &self.increment)
            .finish_non_exhaustive()
    }
}

/// Distinct prime factors of `n` in ascending order
fn prime_factors(mut n: u64) -> Vec<u64> {
    let mut factors = Vec::new();
    let mut p = 2u64;

    while p.saturating_mul(p) <= n {
        if n % p == 0 {
            factors.push(p);
            while n % p == 0 {
                n /= p;
            }
        }
        p += 1;
    }

    if n > 1 {
        factors.push(n);
    }

    factors
}

fn gcd(a: u64, b: u64) -> u64 {
    if b == 0 {
        a
    } else {
        gcd(b, a % b)
    }
}

/// Largest `a <= range`, `a > 1`, such that `a - 1` is divisible by every
/// prime factor of `range`, and by 4 when 4 divides `range`.
fn find_multiplier(range: u64) -> Option<u64> {
    if range < 2 {
        return None;
    }

    let mut step = prime_factors(range).into_iter().product::<u64>();
    if range % 4 == 0 && step % 4 != 0 {
        step *= 2;
    }

    let a = (range - 1) / step * step + 1;
    (a > 1).then_some(a)
}

/// Smallest value `>= 2` coprime to `range`, falling back to 1
fn find_increment(range: u64) -> u64 {
    (2..range).find(|&c| gcd(range, c) == 1).unwrap_or(1)
}
