use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

const PENDING: u8 = 0;
const COMMITTING: u8 = 1;
const ABANDONED: u8 = 2;

/// Shared between a blocking store call and the caller waiting on it.
///
/// Exactly one side wins: either the call claims the commit before the
/// deadline, or the caller abandons it and the call must roll back.
#[derive(Debug, Clone)]
pub struct CallGuard {
    deadline: Option<Instant>,
    state: Arc<AtomicU8>,
}

impl CallGuard {
    pub fn new(timeout: Duration) -> Self {
        Self {
            deadline: Some(Instant::now() + timeout),
            state: Arc::new(AtomicU8::new(PENDING)),
        }
    }

    /// No deadline; only an explicit abandon stops the call.
    pub fn unbounded() -> Self {
        Self {
            deadline: None,
            state: Arc::new(AtomicU8::new(PENDING)),
        }
    }

    fn past_deadline(&self) -> bool {
        self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// True once the caller gave up or the deadline passed.
    pub fn expired(&self) -> bool {
        self.state.load(Ordering::SeqCst) == ABANDONED || self.past_deadline()
    }

    /// Claim the right to commit. False means roll back.
    pub fn begin_commit(&self) -> bool {
        if self.past_deadline() {
            let _ = self.state.compare_exchange(PENDING, ABANDONED, Ordering::SeqCst, Ordering::SeqCst);
            return self.state.load(Ordering::SeqCst) == COMMITTING;
        }
        match self.state.compare_exchange(PENDING, COMMITTING, Ordering::SeqCst, Ordering::SeqCst) {
            Ok(_) => true,
            Err(current) => current == COMMITTING,
        }
    }

    /// Give up on the call. False when a commit was already claimed, in
    /// which case the call's own result is authoritative.
    pub fn abandon(&self) -> bool {
        match self.state.compare_exchange(PENDING, ABANDONED, Ordering::SeqCst, Ordering::SeqCst) {
            Ok(_) => true,
            Err(current) => current == ABANDONED,
        }
    }
}
