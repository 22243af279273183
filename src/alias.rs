//! Table alias allocation.
//!
//! Aliases run `a`..`z`, then `za`..`zz`, then `zza`.. and so on: alias `i`
//! is `i / 26` copies of `z` followed by letter `i % 26`.

use std::collections::HashMap;

/// Number of aliases available unless configured otherwise (`a`..`zz`).
pub const DEFAULT_ALIAS_CAPACITY: usize = 52;

const LETTERS: usize = 26;

/// Deterministic alias generator with a fixed capacity.
#[derive(Debug, Clone)]
pub struct AliasAllocator {
    issued: usize,
    capacity: usize,
}

impl Default for AliasAllocator {
    fn default() -> Self {
        Self::new(DEFAULT_ALIAS_CAPACITY)
    }
}

impl AliasAllocator {
    pub fn new(capacity: usize) -> Self {
        Self {
            issued: 0,
            capacity,
        }
    }

    pub fn has_next(&self) -> bool {
        self.issued < self.capacity
    }

    /// Next alias in the sequence.
    ///
    /// # Panics
    ///
    /// Panics once `capacity` aliases have been issued. Running out means the
    /// configured capacity is too small for the views being built.
    pub fn next(&mut self) -> String {
        assert!(
            self.has_next(),
            "alias pool exhausted after {} aliases",
            self.capacity
        );
        let alias = alias_at(self.issued);
        self.issued += 1;
        alias
    }

    pub fn reset(&mut self) {
        self.issued = 0;
    }
}

fn alias_at(index: usize) -> String {
    let mut alias = "z".repeat(index / LETTERS);
    alias.push((b'a' + (index % LETTERS) as u8) as char);
    alias
}

/// Table name to alias, first come first served. Keys are case-insensitive.
#[derive(Debug, Clone, Default)]
pub struct AliasMap {
    aliases: HashMap<String, String>,
}

impl AliasMap {
    pub fn get(&self, table: &str) -> Option<&str> {
        self.aliases.get(&table.to_lowercase()).map(String::as_str)
    }

    /// Alias of `table`, allocating one if the table has none yet.
    pub fn get_or_assign(&mut self, table: &str, allocator: &mut AliasAllocator) -> String {
        self.aliases
            .entry(table.to_lowercase())
            .or_insert_with(|| allocator.next())
            .clone()
    }

    /// Alias of `table`, or the table name itself when none was assigned.
    pub fn resolve<'a>(&'a self, table: &'a str) -> &'a str {
        self.get(table).unwrap_or(table)
    }

    pub fn len(&self) -> usize {
        self.aliases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty()
    }
}
