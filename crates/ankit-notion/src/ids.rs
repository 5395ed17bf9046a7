//! Numeric identifiers for decks.

use std::collections::HashSet;

use rand::Rng;

const LOWEST: i64 = 1_000_000_000_000_000;
const HIGHEST: i64 = 9_999_999_999_999_999;

/// Issues random 16-digit ids, never the same one twice.
#[derive(Debug, Default)]
pub struct IdGenerator {
    issued: HashSet<i64>,
}

impl IdGenerator {
    /// Create a generator with no ids issued.
    pub fn new() -> Self {
        Self::default()
    }

    /// A fresh id.
    pub fn next_id(&mut self) -> i64 {
        let mut rng = rand::rng();
        loop {
            let id = rng.random_range(LOWEST..=HIGHEST);
            if self.issued.insert(id) {
                return id;
            }
        }
    }
}
