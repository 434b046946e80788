use std::collections::HashMap;

use quanta::Instant;

/// Decay state of a single client.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct DecayState {
    /// Estimated seconds between successive requests.
    pub(crate) estimated_interval: f64,
    pub(crate) last_seen: Instant,
}

/// Two generation tables held in fixed slots.
///
/// `slots[current]` is written, the other slot is the read-only fallback.
/// Rotating flips the index and empties the new current slot, so a client
/// survives exactly one rotation without being seen.
#[derive(Debug, Default)]
pub(crate) struct Generations {
    slots: [HashMap<String, DecayState>; 2],
    current: usize,
}

impl Generations {
    pub(crate) fn lookup(&self, key: &str) -> Option<DecayState> {
        self.slots[self.current]
            .get(key)
            .or_else(|| self.slots[self.previous()].get(key))
            .copied()
    }

    pub(crate) fn record(&mut self, key: &str, state: DecayState) {
        let slot = &mut self.slots[self.current];
        match slot.get_mut(key) {
            Some(existing) => *existing = state,
            None => {
                slot.insert(key.to_owned(), state);
            }
        }
    }

    pub(crate) fn rotate(&mut self) {
        self.current = self.previous();
        self.slots[self.current].clear();
    }

    /// Number of distinct clients held across both generations.
    pub(crate) fn len(&self) -> usize {
        let current = &self.slots[self.current];
        let previous = &self.slots[self.previous()];
        current.len() + previous.keys().filter(|k| !current.contains_key(*k)).count()
    }

    fn previous(&self) -> usize {
        self.current ^ 1
    }
}
