//! Mutation queue
//!
//! A ticket lock: mutations take a ticket on arrival and run strictly in
//! ticket order, one at a time.

use parking_lot::{Condvar, Mutex};

#[derive(Debug, Default)]
struct Tickets {
    /// Next ticket to hand out
    next: u64,

    /// Ticket currently allowed to run
    serving: u64,
}

/// FIFO exclusive section for store mutations
#[derive(Debug, Default)]
pub struct MutationQueue {
    tickets: Mutex<Tickets>,
    turn: Condvar,
}

impl MutationQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Block until every earlier arrival has finished, then take the turn
    pub fn enter(&self) -> MutationTurn<'_> {
        let mut tickets = self.tickets.lock();
        let ticket = tickets.next;
        tickets.next += 1;
        while tickets.serving != ticket {
            self.turn.wait(&mut tickets);
        }
        MutationTurn { queue: self }
    }

    /// Mutations running or waiting
    pub fn pending(&self) -> u64 {
        let tickets = self.tickets.lock();
        tickets.next - tickets.serving
    }
}

/// Exclusive turn; the next ticket is released on drop (also on panic)
#[must_use = "the turn ends as soon as it is dropped"]
pub struct MutationTurn<'a> {
    queue: &'a MutationQueue,
}

impl Drop for MutationTurn<'_> {
    fn drop(&mut self) {
        self.queue.tickets.lock().serving += 1;
        self.queue.turn.notify_all();
    }
}
