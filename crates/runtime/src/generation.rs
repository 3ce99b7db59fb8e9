use std::sync::atomic::{AtomicU64, Ordering};

/// Snapshot of a [`Generation`] taken when a request was issued.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Ticket(u64);

impl Ticket {
    pub fn value(self) -> u64 {
        self.0
    }
}

/// Monotonic request counter used to discard stale async completions.
///
/// Every new request calls [`Generation::advance`] and keeps the returned
/// [`Ticket`]. When its work completes it may only commit effects if
/// [`Generation::is_current`] still holds for that ticket; any later
/// `advance` invalidates all earlier tickets.
#[derive(Debug, Default)]
pub struct Generation {
    current: AtomicU64,
}

impl Generation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a new generation, invalidating every previously issued ticket.
    pub fn advance(&self) -> Ticket {
        Ticket(self.current.fetch_add(1, Ordering::AcqRel) + 1)
    }

    pub fn current(&self) -> Ticket {
        Ticket(self.current.load(Ordering::Acquire))
    }

    pub fn is_current(&self, ticket: Ticket) -> bool {
        self.current() == ticket
    }
}
