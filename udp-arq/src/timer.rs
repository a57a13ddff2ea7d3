//! Retransmission timer.
//!
//! The Go-Back-N engine keeps one timer covering its oldest unacknowledged
//! packet.  Rather than an asynchronous interrupt, [`RetransmitTimer`] is a
//! monotonic deadline that the engine's own loop checks on every iteration,
//! so the timer and the main control flow never run concurrently.

use std::time::Duration;

use tokio::time::Instant;

#[derive(Debug)]
pub struct RetransmitTimer {
    interval: Duration,
    deadline: Option<Instant>,
    /// Expiries since the timer was last armed by progress.
    fired: u32,
}

impl RetransmitTimer {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            deadline: None,
            fired: 0,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    /// (Re)start the timer one interval from now and clear the expiry count.
    pub fn arm(&mut self) {
        self.deadline = Some(Instant::now() + self.interval);
        self.fired = 0;
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
        self.fired = 0;
    }

    /// If armed and past its deadline, restart it and return `true`.
    ///
    /// A restart after expiry keeps counting expiries; see [`fired`](Self::fired).
    pub fn poll_expired(&mut self) -> bool {
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => {
                self.deadline = Some(Instant::now() + self.interval);
                self.fired += 1;
                true
            }
            _ => false,
        }
    }

    /// Consecutive expiries since the last [`arm`](Self::arm).
    pub fn fired(&self) -> u32 {
        self.fired
    }

    /// Time left before expiry, or one full interval when disarmed.
    pub fn remaining(&self) -> Duration {
        match self.deadline {
            Some(deadline) => deadline.saturating_duration_since(Instant::now()),
            None => self.interval,
        }
    }
}
