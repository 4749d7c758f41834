//! Numeric user id generation.

use serde::{Deserialize, Serialize};

/// Hands out increasing `uidNumber` values.
///
/// Seeded from the configured minimum, raised by every id observed in the
/// directory, and bounded by an optional ceiling. Exceeding the ceiling is an
/// error; ids never wrap around.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdAllocator {
    latest: u32,
    max: Option<u32>,
}

impl IdAllocator {
    /// Creates an allocator. The first id handed out is `min` (or 1) unless a
    /// higher id is observed first.
    #[must_use]
    pub fn new(min: Option<u32>, max: Option<u32>) -> Self {
        Self {
            latest: min.map_or(0, |m| m.saturating_sub(1)),
            max,
        }
    }

    /// Records an id already in use.
    pub fn observe(&mut self, id: u32) {
        if id > self.latest {
            self.latest = id;
        }
    }

    /// Highest id seen or handed out so far.
    #[must_use]
    pub fn latest(&self) -> u32 {
        self.latest
    }

    /// Configured ceiling, if any.
    #[must_use]
    pub fn max(&self) -> Option<u32> {
        self.max
    }

    /// Reserves and returns the next id.
    pub fn next_id(&mut self) -> crate::Result<u32> {
        let candidate = self
            .latest
            .checked_add(1)
            .ok_or(crate::Error::IdLimitExceeded { max: u32::MAX })?;
        if let Some(max) = self.max
            && candidate > max
        {
            return Err(crate::Error::IdLimitExceeded { max });
        }
        self.latest = candidate;
        Ok(candidate)
    }
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self::new(None, None)
    }
}
