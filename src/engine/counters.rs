use parking_lot::Mutex;
use std::collections::HashMap;

/// Per-channel message counts since the bot last responded there.
///
/// Entries are created lazily on first traffic and live for the process
/// lifetime; a channel that goes quiet simply keeps its stale count.
/// Guarded by a mutex because dispatch tasks run concurrently with the
/// counting loop.
#[derive(Default)]
pub struct CounterStore {
    counts: Mutex<HashMap<String, u32>>,
}

impl CounterStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one to the channel's count, creating the entry at 1 if absent.
    /// Returns the count after the increment.
    pub fn increment(&self, channel_id: &str) -> u32 {
        let mut counts = self.counts.lock();
        let count = counts.entry(channel_id.to_string()).or_insert(0);
        *count += 1;
        *count
    }

    /// Set the channel's count to 0, creating the entry if absent.
    pub fn reset(&self, channel_id: &str) {
        self.counts.lock().insert(channel_id.to_string(), 0);
    }

    #[cfg(test)]
    pub fn get(&self, channel_id: &str) -> u32 {
        self.counts.lock().get(channel_id).copied().unwrap_or(0)
    }
}
