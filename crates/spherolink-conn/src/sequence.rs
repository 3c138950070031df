use std::sync::{Mutex, PoisonError};

/// Per-dispatcher command sequence number.
///
/// Starts at 0 and wraps after 255. The value is stamped into outbound
/// commands only; replies are not matched against it.
#[derive(Debug, Default)]
pub struct SequenceCounter {
    next: Mutex<u8>,
}

impl SequenceCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from `value` instead of 0.
    pub fn starting_at(value: u8) -> Self {
        Self {
            next: Mutex::new(value),
        }
    }

    /// The number the next successful [`stamp`](Self::stamp) will use.
    pub fn peek(&self) -> u8 {
        *self.next.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run `f` with the next sequence number, advancing the counter only if
    /// `f` succeeds.
    ///
    /// Concurrent stampers are serialized, so two successful calls never see
    /// the same number (until the counter wraps).
    pub fn stamp<T, E>(&self, f: impl FnOnce(u8) -> Result<T, E>) -> Result<T, E> {
        let mut next = self.next.lock().unwrap_or_else(PoisonError::into_inner);
        let value = f(*next)?;
        *next = next.wrapping_add(1);
        Ok(value)
    }
}
