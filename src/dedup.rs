//! Structural-equality de-duplication shared by the trackers.
//!
//! Session snapshots arrive both pushed over the socket and from the backup
//! poll, so the same value is routinely seen twice in a row.

/// Remembers the last value passed through and rejects exact repeats.
#[derive(Debug, Clone)]
pub struct LastValue<T> {
    last: Option<T>,
}

impl<T> Default for LastValue<T> {
    fn default() -> Self {
        Self { last: None }
    }
}

impl<T: PartialEq + Clone> LastValue<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` (and remembers `value`) when it differs from the last one.
    pub fn update(&mut self, value: &T) -> bool {
        if self.last.as_ref() == Some(value) {
            return false;
        }
        self.last = Some(value.clone());
        true
    }

    pub fn get(&self) -> Option<&T> {
        self.last.as_ref()
    }

    pub fn clear(&mut self) {
        self.last = None;
    }
}
