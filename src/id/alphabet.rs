use crate::error::{Result, SketchpadError};

/// Alphanumeric alphabet used for room identifiers
pub const DEFAULT_ALPHABET: &str =
    "ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789abcdefghijklmnopqrstuvwxyz";

/// Positional digit set for base-N encoding of identifiers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alphabet {
    symbols: Vec<char>,
}

impl Alphabet {
    pub fn new(symbols: &str) -> Result<Self> {
        let symbols: Vec<char> = symbols.chars().collect();

        if symbols.len() < 2 {
            return Err(SketchpadError::Config(format!(
                "Alphabet needs at least 2 symbols, got {}",
                symbols.len()
            )));
        }

        for (i, ch) in symbols.iter().enumerate() {
            if symbols[..i].contains(ch) {
                return Err(SketchpadError::Config(format!(
                    "Duplicate alphabet symbol '{}'",
                    ch
                )));
            }
        }

        Ok(Self { symbols })
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Encode `n` as base-N digits, most significant first
    pub fn encode(&self, mut n: u64) -> String {
        let base = self.symbols.len() as u64;
        let mut digits = Vec::new();

        while n != 0 {
            digits.push(self.symbols[(n % base) as usize]);
            n /= base;
        }

        digits.iter().rev().collect()
    }

    /// Inverse of [`Alphabet::encode`]; `None` on a foreign symbol or overflow
    pub fn decode(&self, s: &str) -> Option<u64> {
        let base = self.symbols.len() as u64;

        s.chars().try_fold(0u64, |acc, ch| {
            let digit = self.symbols.iter().position(|&c| c == ch)? as u64;
            acc.checked_mul(base)?.checked_add(digit)
        })
    }
}

impl Default for Alphabet {
    fn default() -> Self {
        Self {
            symbols: DEFAULT_ALPHABET.chars().collect(),
        }
    }
}
