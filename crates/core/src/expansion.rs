use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

use crate::node::NodeResult;

/// Expansion state of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NodeStatus {
    Disabled = -1,
    #[default]
    NotExpanded = 0,
    InProgress = 1,
    Complete = 2,
}

/// One-shot expansion gate. The first caller runs the expansion while every
/// concurrent caller blocks on a condition variable until it finishes.
#[derive(Debug, Default)]
pub struct Expansion {
    status: Mutex<NodeStatus>,
    done: Condvar,
}

impl Expansion {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, NodeStatus> {
        self.status.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn status(&self) -> NodeStatus {
        *self.lock()
    }

    pub fn is_complete(&self) -> bool {
        self.status() == NodeStatus::Complete
    }

    /// Runs `expand` unless another caller already did or is doing so.
    /// Waiters return `Ok` once the expansion completes. A failed expansion
    /// puts the gate back to `NotExpanded` so a waiter can retry.
    pub fn expand<F>(&self, expand: F) -> NodeResult
    where
        F: FnOnce() -> NodeResult,
    {
        let mut status = self.lock();
        loop {
            match *status {
                NodeStatus::Complete | NodeStatus::Disabled => return Ok(()),
                NodeStatus::InProgress => {
                    status = self
                        .done
                        .wait(status)
                        .unwrap_or_else(PoisonError::into_inner);
                }
                NodeStatus::NotExpanded => {
                    *status = NodeStatus::InProgress;
                    drop(status);

                    let mut guard = InProgressGuard {
                        gate: self,
                        finished: None,
                    };
                    let result = expand();
                    guard.finished = Some(if result.is_ok() {
                        NodeStatus::Complete
                    } else {
                        NodeStatus::NotExpanded
                    });
                    drop(guard);
                    return result;
                }
            }
        }
    }

    /// Back to `NotExpanded`. A disabled gate stays disabled.
    pub fn reset(&self) {
        let mut status = self.lock();
        if *status != NodeStatus::Disabled {
            *status = NodeStatus::NotExpanded;
        }
        drop(status);
        self.done.notify_all();
    }

    pub fn disable(&self) {
        self.set(NodeStatus::Disabled);
    }

    fn set(&self, value: NodeStatus) {
        *self.lock() = value;
        self.done.notify_all();
    }
}

/// Publishes the expansion outcome and wakes waiters, also on unwind.
struct InProgressGuard<'a> {
    gate: &'a Expansion,
    finished: Option<NodeStatus>,
}

impl Drop for InProgressGuard<'_> {
    fn drop(&mut self) {
        let status = self.finished.unwrap_or(NodeStatus::NotExpanded);
        self.gate.set(status);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::NodeError;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[test]
    fn concurrent_callers_expand_once() {
        let gate = Expansion::new();
        let runs = AtomicUsize::new(0);
        std::thread::scope(|scope| {
            for _ in 0..8 {
                scope.spawn(|| {
                    let result = gate.expand(|| {
                        runs.fetch_add(1, Ordering::SeqCst);
                        std::thread::sleep(Duration::from_millis(20));
                        Ok(())
                    });
                    assert!(result.is_ok());
                    assert!(gate.is_complete());
                });
            }
        });
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn failure_allows_retry() {
        let gate = Expansion::new();
        let result = gate.expand(|| Err(NodeError::Aborted));
        assert_eq!(result, Err(NodeError::Aborted));
        assert_eq!(gate.status(), NodeStatus::NotExpanded);
        assert!(gate.expand(|| Ok(())).is_ok());
        assert_eq!(gate.status(), NodeStatus::Complete);
    }

    #[test]
    fn disabled_gate_skips_expansion() {
        let gate = Expansion::new();
        gate.disable();
        let mut ran = false;
        assert!(gate.expand(|| {
            ran = true;
            Ok(())
        })
        .is_ok());
        assert!(!ran);
        assert_eq!(gate.status(), NodeStatus::Disabled);
    }

    #[test]
    fn reset_keeps_disabled() {
        let gate = Expansion::new();
        assert!(gate.expand(|| Ok(())).is_ok());
        gate.reset();
        assert_eq!(gate.status(), NodeStatus::NotExpanded);
        gate.disable();
        gate.reset();
        assert_eq!(gate.status(), NodeStatus::Disabled);
    }
}
