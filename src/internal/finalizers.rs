//! Internal finalizer queue for managing teardown hooks.

use tracing::{debug, error};

use crate::error::DiResult;
use crate::internal::BoxFuture;

/// Teardown action produced alongside an instance.
pub(crate) type Finalizer = Box<dyn FnOnce() -> BoxFuture<'static, DiResult<()>> + Send>;

/// Pending teardown actions with LIFO execution order.
///
/// Entries are appended as instances are built and drained last-created,
/// first-torn-down, so a service is finalized before the services it uses.
#[derive(Default)]
pub(crate) struct FinalizerQueue {
    entries: Vec<(String, Finalizer)>,
}

impl FinalizerQueue {
    pub(crate) fn push(&mut self, service: String, finalizer: Finalizer) {
        self.entries.push((service, finalizer));
    }

    /// Moves every pending entry out, leaving this queue empty.
    pub(crate) fn take(&mut self) -> FinalizerQueue {
        std::mem::take(self)
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Execute all hooks in reverse order (LIFO).
    ///
    /// A failing finalizer is logged and the drain continues.
    pub(crate) async fn run_reverse(mut self) {
        while let Some((service, finalizer)) = self.entries.pop() {
            debug!(service = %service, "running finalizer");
            if let Err(err) = finalizer().await {
                error!(service = %service, error = %err, "finalizer failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DiError;
    use parking_lot::Mutex;
    use std::sync::Arc;

    fn recording(log: &Arc<Mutex<Vec<&'static str>>>, label: &'static str, fail: bool) -> Finalizer {
        let log = log.clone();
        Box::new(move || {
            Box::pin(async move {
                log.lock().push(label);
                if fail {
                    Err(DiError::msg("boom"))
                } else {
                    Ok(())
                }
            })
        })
    }

    #[tokio::test]
    async fn drains_in_reverse_and_survives_failures() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut queue = FinalizerQueue::default();
        queue.push("a".into(), recording(&log, "a", false));
        queue.push("b".into(), recording(&log, "b", true));
        queue.push("c".into(), recording(&log, "c", false));

        let pending = queue.take();
        assert!(queue.is_empty());
        assert_eq!(pending.len(), 3);

        pending.run_reverse().await;
        assert_eq!(*log.lock(), vec!["c", "b", "a"]);
    }
}
