//! Alias and table-key generation.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Identity of a `SqlTable` within one compile. Table references in the IR
/// point at tables through this key rather than through their alias, which
/// is only known after resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TableKey(pub usize);

/// Hands out unique aliases (`t0`, `t1`, `q0`, ...) and table keys.
///
/// One generator is created per top-level compile and threaded explicitly
/// through preparation and resolution.
#[derive(Debug, Default)]
pub struct UniqueIdentifierGenerator {
    counters: HashMap<String, usize>,
    next_table_key: usize,
}

impl UniqueIdentifierGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next identifier for `prefix`: `t0`, `t1`, ... counted per prefix.
    pub fn unique_identifier(&mut self, prefix: &str) -> String {
        let counter = self.counters.entry(prefix.to_string()).or_insert(0);
        let id = format!("{}{}", prefix, counter);
        *counter += 1;
        id
    }

    pub fn table_key(&mut self) -> TableKey {
        let key = TableKey(self.next_table_key);
        self.next_table_key += 1;
        key
    }
}
