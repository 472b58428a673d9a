use crate::core::error::{MapError, Result};
use std::collections::BTreeSet;
use std::num::NonZeroUsize;

/// How many invocations a batch may have outstanding at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Concurrency {
    #[default]
    Unbounded,
    Bounded(NonZeroUsize),
}

impl Concurrency {
    /// The effective bound for a batch of `total` items.
    pub fn limit(&self, total: usize) -> usize {
        match self {
            Concurrency::Unbounded => total.max(1),
            Concurrency::Bounded(n) => n.get(),
        }
    }
}

/// Zero means unbounded.
impl From<usize> for Concurrency {
    fn from(par: usize) -> Self {
        match NonZeroUsize::new(par) {
            Some(n) => Concurrency::Bounded(n),
            None => Concurrency::Unbounded,
        }
    }
}

/// Decides which positions may start. Positions are admitted strictly in
/// input order and each one at most once.
#[derive(Debug)]
pub struct Launcher {
    total: usize,
    next: usize,
    bound: usize,
    in_flight: BTreeSet<usize>,
}

impl Launcher {
    pub fn new(total: usize, concurrency: Concurrency) -> Self {
        Launcher {
            total,
            next: 0,
            bound: concurrency.limit(total),
            in_flight: BTreeSet::new(),
        }
    }

    /// Every position that may be dispatched right now, lowest first.
    pub fn admit(&mut self) -> Vec<usize> {
        let mut admitted = Vec::new();
        while self.next < self.total && self.in_flight.len() < self.bound {
            self.in_flight.insert(self.next);
            admitted.push(self.next);
            self.next += 1;
        }
        if !admitted.is_empty() {
            log::debug!(
                "admitted positions {:?} ({} in flight, bound {})",
                admitted,
                self.in_flight.len(),
                self.bound
            );
        }
        admitted
    }

    /// Frees the slot held by `position`.
    pub fn complete(&mut self, position: usize) -> Result<()> {
        if self.in_flight.remove(&position) {
            Ok(())
        } else {
            Err(MapError::NotInFlight(position))
        }
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    pub fn dispatched(&self) -> usize {
        self.next
    }

    pub fn bound(&self) -> usize {
        self.bound
    }

    /// Nothing queued and nothing outstanding.
    pub fn is_drained(&self) -> bool {
        self.next == self.total && self.in_flight.is_empty()
    }
}
