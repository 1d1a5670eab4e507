use std::{
    collections::HashMap,
    hash::Hash,
};

/// Cache for a pure function, keyed by its full input.
///
/// Entries are never invalidated since a key fully determines its value.
/// Memory is bounded by [`Memo::next_pass`]: whatever was not requested
/// during the previous pass is evicted.
#[derive(Debug, Clone)]
pub struct Memo<K, V> {
    entries: HashMap<K, (V, u64)>,
    pass: u64,
}

impl<K, V> Default for Memo<K, V> {
    fn default() -> Self {
        Memo {
            entries: HashMap::new(),
            pass: 0,
        }
    }
}

impl<K: Eq + Hash, V: Clone> Memo<K, V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_try_insert_with<E, F>(&mut self, key: K, f: F) -> Result<V, E>
    where
        F: FnOnce(&K) -> Result<V, E>,
    {
        if let Some((value, pass)) = self.entries.get_mut(&key) {
            *pass = self.pass;
            return Ok(value.clone())
        }
        let value = f(&key)?;
        self.entries.insert(key, (value.clone(), self.pass));
        Ok(value)
    }

    /// Starts a new pass, evicting entries unused since the previous one.
    pub fn next_pass(&mut self) {
        let current = self.pass;
        self.entries.retain(|_, (_, pass)| *pass == current);
        self.pass += 1;
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
