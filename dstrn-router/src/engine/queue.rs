//! FIFO run queue
//!
//! At most one navigation runs at a time. A request arriving while another
//! is in flight waits for a oneshot "turn" signal. When a run finishes, its
//! turn passes to the oldest waiter still listening; waiters whose receiver
//! is gone are skipped.

use std::collections::VecDeque;
use tokio::sync::oneshot;

use super::types::{NavigationId, NavigationRequest, RouterStatus};

struct Waiting {
    request: NavigationRequest,
    turn: oneshot::Sender<()>,
}

/// Whether a request may run now or must wait.
pub(crate) enum Admission {
    Run,
    Wait {
        turn: oneshot::Receiver<()>,
        position: usize,
    },
}

#[derive(Default)]
pub(crate) struct RunQueue {
    in_flight: Option<NavigationId>,
    waiting: VecDeque<Waiting>,
}

impl RunQueue {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn admit(&mut self, request: &NavigationRequest) -> Admission {
        if self.in_flight.is_none() {
            self.in_flight = Some(request.id);
            return Admission::Run;
        }
        let (tx, rx) = oneshot::channel();
        self.waiting.push_back(Waiting {
            request: request.clone(),
            turn: tx,
        });
        Admission::Wait {
            turn: rx,
            position: self.waiting.len(),
        }
    }

    /// Give up the turn or the queue slot held by `id`.
    pub(crate) fn release(&mut self, id: NavigationId) {
        if self.in_flight != Some(id) {
            self.waiting.retain(|w| w.request.id != id);
            return;
        }
        self.in_flight = None;
        while let Some(next) = self.waiting.pop_front() {
            let next_id = next.request.id;
            if next.turn.send(()).is_ok() {
                self.in_flight = Some(next_id);
                return;
            }
        }
    }

    /// Drop a waiting request. Its caller observes a dropped outcome.
    pub(crate) fn cancel(&mut self, id: NavigationId) -> bool {
        let len = self.waiting.len();
        self.waiting.retain(|w| w.request.id != id);
        self.waiting.len() != len
    }

    /// Drop every waiting request.
    pub(crate) fn drain(&mut self) -> usize {
        let dropped = self.waiting.len();
        self.waiting.clear();
        dropped
    }

    pub(crate) fn pending(&self) -> Vec<NavigationRequest> {
        self.waiting.iter().map(|w| w.request.clone()).collect()
    }

    pub(crate) fn in_flight(&self) -> Option<NavigationId> {
        self.in_flight
    }

    pub(crate) fn status(&self) -> RouterStatus {
        match (self.in_flight, self.waiting.is_empty()) {
            (None, _) => RouterStatus::Idle,
            (Some(_), true) => RouterStatus::Resolving,
            (Some(_), false) => RouterStatus::Queued,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::types::RequestKind;
    use crate::options::NavigateOptions;

    fn request() -> NavigationRequest {
        NavigationRequest::new(RequestKind::Navigate, Some("/a".into()), NavigateOptions::default())
    }

    #[test]
    fn test_first_request_runs_immediately() {
        let mut queue = RunQueue::new();
        let first = request();
        assert!(matches!(queue.admit(&first), Admission::Run));
        assert_eq!(queue.status(), RouterStatus::Resolving);
        queue.release(first.id);
        assert_eq!(queue.status(), RouterStatus::Idle);
    }

    #[test]
    fn test_turn_passes_in_fifo_order() {
        let mut queue = RunQueue::new();
        let first = request();
        let second = request();
        let third = request();
        queue.admit(&first);
        let Admission::Wait { turn: mut second_turn, position } = queue.admit(&second) else {
            panic!("second request should wait");
        };
        assert_eq!(position, 1);
        let Admission::Wait { turn: mut third_turn, .. } = queue.admit(&third) else {
            panic!("third request should wait");
        };
        assert_eq!(queue.status(), RouterStatus::Queued);

        queue.release(first.id);
        assert!(second_turn.try_recv().is_ok());
        assert!(third_turn.try_recv().is_err());
        assert_eq!(queue.in_flight(), Some(second.id));
    }

    #[test]
    fn test_abandoned_waiter_is_skipped() {
        let mut queue = RunQueue::new();
        let first = request();
        let second = request();
        let third = request();
        queue.admit(&first);
        let Admission::Wait { turn, .. } = queue.admit(&second) else {
            panic!("second request should wait");
        };
        drop(turn);
        let Admission::Wait { turn: mut third_turn, .. } = queue.admit(&third) else {
            panic!("third request should wait");
        };

        queue.release(first.id);
        assert!(third_turn.try_recv().is_ok());
        assert_eq!(queue.in_flight(), Some(third.id));
    }

    #[test]
    fn test_cancel_and_drain_close_turns() {
        let mut queue = RunQueue::new();
        let first = request();
        let second = request();
        let third = request();
        queue.admit(&first);
        let Admission::Wait { turn: mut second_turn, .. } = queue.admit(&second) else {
            panic!("second request should wait");
        };
        let Admission::Wait { turn: mut third_turn, .. } = queue.admit(&third) else {
            panic!("third request should wait");
        };

        assert!(queue.cancel(second.id));
        assert!(!queue.cancel(second.id));
        assert!(second_turn.try_recv().is_err());
        assert_eq!(queue.pending().len(), 1);

        assert_eq!(queue.drain(), 1);
        assert!(third_turn.try_recv().is_err());
        assert!(queue.pending().is_empty());
    }

    #[test]
    fn test_release_of_waiter_removes_its_slot() {
        let mut queue = RunQueue::new();
        let first = request();
        let second = request();
        queue.admit(&first);
        let _turn = queue.admit(&second);
        queue.release(second.id);
        assert!(queue.pending().is_empty());
        assert_eq!(queue.in_flight(), Some(first.id));
    }
}
