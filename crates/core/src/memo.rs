/// A single-slot cache: keeps the last computed value together with the key
/// it was computed for.
///
/// Keys are cheap version stamps (profile generation, thread index, range,
/// flags) rather than the inputs themselves, so comparing them is O(1).
#[derive(Debug, Clone)]
pub struct Memo<K, V> {
    slot: Option<(K, V)>,
}

impl<K, V> Default for Memo<K, V> {
    fn default() -> Self {
        Self { slot: None }
    }
}

impl<K: PartialEq, V> Memo<K, V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// The cached value if it was computed for `key`.
    pub fn get(&self, key: &K) -> Option<&V> {
        match &self.slot {
            Some((cached, value)) if cached == key => Some(value),
            _ => None,
        }
    }

    pub fn get_or_insert_with(&mut self, key: K, compute: impl FnOnce() -> V) -> &V {
        let entry = match self.slot.take() {
            Some(entry) if entry.0 == key => entry,
            _ => (key, compute()),
        };
        &self.slot.insert(entry).1
    }

    /// Like [`Memo::get_or_insert_with`] for fallible computations. A failed
    /// computation leaves the previous entry in place.
    pub fn try_get_or_insert_with<E>(
        &mut self,
        key: K,
        compute: impl FnOnce() -> Result<V, E>,
    ) -> Result<&V, E> {
        let entry = match self.slot.take() {
            Some(entry) if entry.0 == key => entry,
            previous => match compute() {
                Ok(value) => (key, value),
                Err(error) => {
                    self.slot = previous;
                    return Err(error);
                }
            },
        };
        Ok(&self.slot.insert(entry).1)
    }

    pub fn invalidate(&mut self) {
        self.slot = None;
    }
}
