//! Request-generation fencing.
//!
//! The effect boundary cannot abort a task once it has started. A feature
//! that can issue overlapping requests keeps a [`Generation`] in its model,
//! bumps it for every new request, tags the request with the returned
//! [`Ticket`], and drops any response whose ticket is no longer current.
//!
//! Ticket numbers come from one process-wide counter, so a model rebuilt by
//! `Store::init` never accepts a response issued before the rebuild.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

static ISSUED: AtomicU64 = AtomicU64::new(0);

/// Monotonic counter stored in a model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Generation(u64);

/// Identifies one request issued under a [`Generation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Ticket(u64);

impl Generation {
    /// Start a new request. Every earlier ticket becomes stale.
    pub fn next(self) -> (Self, Ticket) {
        let next = ISSUED.fetch_add(1, Ordering::Relaxed) + 1;
        (Generation(next), Ticket(next))
    }

    pub fn is_current(&self, ticket: Ticket) -> bool {
        self.0 == ticket.0
    }

    pub fn current(&self) -> Ticket {
        Ticket(self.0)
    }
}
