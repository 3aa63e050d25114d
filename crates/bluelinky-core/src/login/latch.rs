// ── Re-armable login latch ──
//
// A single-resolution "logged in" signal that can be replaced by a fresh
// one. Each arming creates a new generation backed by its own `watch`
// channel; waiters subscribe to the generation that is current when they
// start waiting, so replacing a generation never strands them: a pending
// generation is always settled (with `Aborted`) before it is dropped.

use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::watch;
use tracing::debug;

use crate::error::LoginError;

/// Outcome of one login generation.
pub type LoginOutcome = Result<(), LoginError>;

type Generation = watch::Sender<Option<LoginOutcome>>;

/// Observable state of the current generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LatchState {
    /// Waiting for a `ready` / `error` event.
    Pending,
    /// Logged in.
    Ready,
    /// The current generation rejected.
    Failed(LoginError),
}

/// The login state machine shared by every node of one account.
pub struct LoginLatch {
    current: Mutex<Generation>,
}

impl Default for LoginLatch {
    fn default() -> Self {
        Self::new()
    }
}

impl LoginLatch {
    /// A latch whose first generation is already pending.
    pub fn new() -> Self {
        let (tx, _) = watch::channel(None);
        Self {
            current: Mutex::new(tx),
        }
    }

    fn generation(&self) -> MutexGuard<'_, Generation> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Install a fresh pending generation.
    ///
    /// A still-pending generation is rejected with [`LoginError::Aborted`]
    /// first so its waiters wake up. Returns `true` when that happened.
    pub fn arm(&self) -> bool {
        let mut current = self.generation();
        let aborted = settle_generation(&current, Err(LoginError::Aborted));
        if aborted {
            debug!("aborted pending login generation");
        }
        let (tx, _) = watch::channel(None);
        *current = tx;
        aborted
    }

    /// Settle the current generation if it is still pending.
    ///
    /// Returns `false` (and changes nothing) when it had already settled.
    pub fn settle(&self, outcome: LoginOutcome) -> bool {
        settle_generation(&self.generation(), outcome)
    }

    /// Settle with `outcome`, starting a new generation first when the
    /// current one has already settled.
    ///
    /// This is how unsolicited client events are absorbed: a `ready` that
    /// arrives after an earlier `ready` or `error` becomes a new generation
    /// instead of being ignored. Returns `true` when a new generation was
    /// installed.
    pub fn settle_or_rearm(&self, outcome: LoginOutcome) -> bool {
        let mut current = self.generation();
        let rearmed = current.borrow().is_some();
        if rearmed {
            let (tx, _) = watch::channel(None);
            *current = tx;
        }
        settle_generation(&current, outcome);
        rearmed
    }

    pub fn is_settled(&self) -> bool {
        self.generation().borrow().is_some()
    }

    pub fn state(&self) -> LatchState {
        match &*self.generation().borrow() {
            None => LatchState::Pending,
            Some(Ok(())) => LatchState::Ready,
            Some(Err(err)) => LatchState::Failed(err.clone()),
        }
    }

    /// Wait for the current generation to settle.
    ///
    /// The returned future is bound to the generation current *now*; a
    /// later [`arm`](Self::arm) rejects it with `Aborted` rather than
    /// moving it to the new generation.
    pub fn wait(&self) -> impl Future<Output = LoginOutcome> + Send + 'static {
        let mut rx = self.generation().subscribe();
        async move {
            match rx.wait_for(Option::is_some).await {
                Ok(outcome) => outcome.clone().unwrap_or(Err(LoginError::Aborted)),
                // Sender gone without settling: the latch itself was dropped.
                Err(_) => Err(LoginError::Closed),
            }
        }
    }
}

fn settle_generation(generation: &Generation, outcome: LoginOutcome) -> bool {
    generation.send_if_modified(|slot| {
        if slot.is_some() {
            return false;
        }
        *slot = Some(outcome);
        true
    })
}

#[cfg(test)]
mod tests {
    use tokio_test::{assert_pending, assert_ready_eq, task};

    use super::*;

    #[test]
    fn starts_pending() {
        let latch = LoginLatch::new();
        assert_eq!(latch.state(), LatchState::Pending);
        assert!(!latch.is_settled());

        let mut waiter = task::spawn(latch.wait());
        assert_pending!(waiter.poll());
    }

    #[test]
    fn settles_exactly_once() {
        let latch = LoginLatch::new();
        let mut waiter = task::spawn(latch.wait());

        assert!(latch.settle(Ok(())));
        assert!(!latch.settle(Err(LoginError::ConnectionFailed("late".into()))));

        assert!(waiter.is_woken());
        assert_ready_eq!(waiter.poll(), Ok(()));
        assert_eq!(latch.state(), LatchState::Ready);
    }

    #[test]
    fn arming_aborts_pending_waiters() {
        let latch = LoginLatch::new();
        let mut old = task::spawn(latch.wait());

        assert!(latch.arm());

        assert_ready_eq!(old.poll(), Err(LoginError::Aborted));
        assert_eq!(latch.state(), LatchState::Pending);

        let mut fresh = task::spawn(latch.wait());
        assert_pending!(fresh.poll());
        latch.settle(Ok(()));
        assert_ready_eq!(fresh.poll(), Ok(()));
    }

    #[test]
    fn arming_a_settled_latch_aborts_nothing() {
        let latch = LoginLatch::new();
        latch.settle(Ok(()));

        assert!(!latch.arm());
        assert_eq!(latch.state(), LatchState::Pending);
    }

    #[test]
    fn waiters_after_settlement_see_the_outcome() {
        let latch = LoginLatch::new();
        latch.settle(Err(LoginError::ConnectionFailed("bad pin".into())));

        let mut late = task::spawn(latch.wait());
        assert_ready_eq!(
            late.poll(),
            Err(LoginError::ConnectionFailed("bad pin".into()))
        );
    }

    #[test]
    fn rearm_only_when_already_settled() {
        let latch = LoginLatch::new();
        let mut first = task::spawn(latch.wait());

        assert!(!latch.settle_or_rearm(Ok(())));
        assert_ready_eq!(first.poll(), Ok(()));

        // An error after success starts a new generation.
        assert!(latch.settle_or_rearm(Err(LoginError::ConnectionFailed("expired".into()))));
        assert_eq!(
            latch.state(),
            LatchState::Failed(LoginError::ConnectionFailed("expired".into()))
        );

        // The earlier waiter kept its own generation's outcome.
        let mut again = task::spawn(latch.wait());
        assert_ready_eq!(
            again.poll(),
            Err(LoginError::ConnectionFailed("expired".into()))
        );
    }

    #[test]
    fn dropping_the_latch_closes_waiters() {
        let latch = LoginLatch::new();
        let mut orphan = task::spawn(latch.wait());
        drop(latch);
        assert_ready_eq!(orphan.poll(), Err(LoginError::Closed));
    }
}
