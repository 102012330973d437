//! Debounced search input: raw keystrokes in, one committed term per pause out.

use std::time::Duration;

use tokio::time::Instant;

#[derive(Debug, Clone)]
pub struct Debouncer {
    delay: Duration,
    raw: String,
    committed: String,
    deadline: Option<Instant>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            raw: String::new(),
            committed: String::new(),
            deadline: None,
        }
    }

    /// Text as typed, for echoing back immediately.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Last value handed to the query state.
    pub fn committed(&self) -> &str {
        &self.committed
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Record a keystroke. Clearing the input commits at once; anything else
    /// (re)arms the timer.
    pub fn input(&mut self, raw: impl Into<String>, now: Instant) -> Option<String> {
        self.raw = raw.into();
        if self.raw.trim().is_empty() {
            self.deadline = None;
            return self.commit();
        }
        self.deadline = Some(now + self.delay);
        None
    }

    /// Commit the pending value if the timer has expired.
    pub fn fire(&mut self, now: Instant) -> Option<String> {
        match self.deadline {
            Some(deadline) if deadline <= now => {
                self.deadline = None;
                self.commit()
            }
            _ => None,
        }
    }

    fn commit(&mut self) -> Option<String> {
        let value = self.raw.trim().to_string();
        if value == self.committed {
            return None;
        }
        self.committed.clone_from(&value);
        Some(value)
    }
}
