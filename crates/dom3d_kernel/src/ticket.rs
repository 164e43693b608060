//! Mutation tickets
//!
//! A ticket is the caller's handle on one mutation. It settles exactly once:
//! with the graft's answer, or with a local rejection, deactivation or
//! channel closure. Settling happens while the kernel is pumped; the ticket
//! itself never drives the kernel.

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TryRecvError};
use dom3d_ir::{MutationError, RequestId};
use std::cell::OnceCell;
use std::time::Duration;

/// Outcome of a mutation
pub type MutationResult = Result<(), MutationError>;

/// Settling half of a ticket, held by the kernel
#[derive(Debug)]
pub(crate) struct Resolver(Sender<MutationResult>);

impl Resolver {
    pub(crate) fn settle(self, result: MutationResult) {
        // The ticket may already be gone; nobody is waiting then
        let _ = self.0.send(result);
    }
}

/// Handle on an in-flight mutation
#[derive(Debug)]
pub struct MutationTicket {
    request_id: Option<RequestId>,
    receiver: Receiver<MutationResult>,
    outcome: OnceCell<MutationResult>,
}

impl MutationTicket {
    pub(crate) fn pending(request_id: RequestId) -> (Self, Resolver) {
        let (tx, rx) = crossbeam_channel::bounded(1);
        let ticket = Self {
            request_id: Some(request_id),
            receiver: rx,
            outcome: OnceCell::new(),
        };
        (ticket, Resolver(tx))
    }

    /// A ticket that never reached the wire
    pub(crate) fn settled(result: MutationResult) -> Self {
        let (_, rx) = crossbeam_channel::bounded(1);
        let outcome = OnceCell::new();
        let _ = outcome.set(result);
        Self {
            request_id: None,
            receiver: rx,
            outcome,
        }
    }

    /// Request ID, `None` when the mutation was rejected before sending
    pub fn request_id(&self) -> Option<RequestId> {
        self.request_id
    }

    /// The outcome if the ticket has settled
    pub fn try_result(&self) -> Option<MutationResult> {
        if let Some(outcome) = self.outcome.get() {
            return Some(*outcome);
        }
        match self.receiver.try_recv() {
            Ok(result) => Some(self.record(result)),
            Err(TryRecvError::Empty) => None,
            // Kernel dropped without settling
            Err(TryRecvError::Disconnected) => Some(self.record(Err(MutationError::Deactivated))),
        }
    }

    /// Whether the ticket has settled
    pub fn is_settled(&self) -> bool {
        self.try_result().is_some()
    }

    /// Block up to `timeout` for the outcome
    ///
    /// Only useful when another thread pumps the kernel.
    pub fn wait_timeout(&self, timeout: Duration) -> Option<MutationResult> {
        if let Some(outcome) = self.outcome.get() {
            return Some(*outcome);
        }
        match self.receiver.recv_timeout(timeout) {
            Ok(result) => Some(self.record(result)),
            Err(RecvTimeoutError::Timeout) => None,
            Err(RecvTimeoutError::Disconnected) => Some(self.record(Err(MutationError::Deactivated))),
        }
    }

    fn record(&self, result: MutationResult) -> MutationResult {
        *self.outcome.get_or_init(|| result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ticket_settles_once() {
        let (ticket, resolver) = MutationTicket::pending(RequestId::new(3));
        assert_eq!(ticket.request_id(), Some(RequestId::new(3)));
        assert!(!ticket.is_settled());

        resolver.settle(Err(MutationError::UnknownElement));
        assert_eq!(ticket.try_result(), Some(Err(MutationError::UnknownElement)));
        assert_eq!(ticket.try_result(), Some(Err(MutationError::UnknownElement)));
    }

    #[test]
    fn test_settled_ticket() {
        let ticket = MutationTicket::settled(Err(MutationError::UnsupportedMutation));
        assert_eq!(ticket.request_id(), None);
        assert_eq!(ticket.wait_timeout(Duration::from_millis(1)), Some(Err(MutationError::UnsupportedMutation)));
    }

    #[test]
    fn test_dropped_resolver_reads_as_deactivated() {
        let (ticket, resolver) = MutationTicket::pending(RequestId::new(1));
        drop(resolver);
        assert_eq!(ticket.try_result(), Some(Err(MutationError::Deactivated)));
    }

    #[test]
    fn test_wait_sees_settlement_from_another_thread() {
        let (ticket, resolver) = MutationTicket::pending(RequestId::new(1));
        let handle = std::thread::spawn(move || resolver.settle(Ok(())));
        assert_eq!(ticket.wait_timeout(Duration::from_secs(5)), Some(Ok(())));
        handle.join().unwrap();
    }
}
