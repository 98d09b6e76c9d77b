//! Dependency loop detection for in-flight resolutions.
//!
//! Resolutions suspend at every factory `.await` and may hop threads, so the
//! stack travels with the resolution itself instead of living in thread-local
//! state. Entering a slot yields a new stack; the caller's copy is untouched, so
//! there is nothing to pop when a branch finishes or fails.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::{Chain, DiError, DiResult};
use crate::key::ServiceKey;

/// Identity of one root resolution, shared by every stack derived from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct ResolutionId(u64);

static NEXT_RESOLUTION: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone)]
struct Entry {
    slot: ServiceKey,
    label: String,
}

/// Registered slots currently under construction, outermost first.
#[derive(Debug, Clone)]
pub(crate) struct CallStack {
    resolution: ResolutionId,
    entries: Vec<Entry>,
}

impl CallStack {
    /// Empty stack of a new root resolution.
    pub(crate) fn root() -> Self {
        Self {
            resolution: ResolutionId(NEXT_RESOLUTION.fetch_add(1, Ordering::Relaxed)),
            entries: Vec::new(),
        }
    }

    pub(crate) fn resolution(&self) -> ResolutionId {
        self.resolution
    }

    /// Pushes `slot`, failing if it is already being constructed on this path.
    pub(crate) fn enter(&self, slot: &ServiceKey, max_depth: usize) -> DiResult<CallStack> {
        // Circular detection BEFORE pushing the new slot
        if self.entries.iter().any(|e| &e.slot == slot) {
            return Err(DiError::DependencyLoop(self.chain_to(slot.to_string())));
        }

        // Depth guard
        if self.entries.len() >= max_depth {
            return Err(DiError::DepthExceeded(self.entries.len()));
        }

        let mut entries = self.entries.clone();
        entries.push(Entry {
            slot: slot.clone(),
            label: slot.to_string(),
        });
        Ok(CallStack {
            resolution: self.resolution,
            entries,
        })
    }

    /// The current path extended by `last`, which becomes the highlighted link.
    pub(crate) fn chain_to(&self, last: String) -> Chain {
        let mut links = self.labels();
        links.push(last);
        Chain::new(links)
    }

    pub(crate) fn labels(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.label.clone()).collect()
    }

    pub(crate) fn depth(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct A;
    struct B;

    #[test]
    fn revisiting_a_slot_reports_the_whole_path() {
        let a = ServiceKey::of::<A>();
        let b = ServiceKey::of::<B>();

        let stack = CallStack::root().enter(&a, 16).unwrap().enter(&b, 16).unwrap();
        assert_eq!(stack.depth(), 2);

        match stack.enter(&a, 16) {
            Err(DiError::DependencyLoop(chain)) => {
                assert_eq!(chain.len(), 3);
                assert!(chain.to_string().ends_with(&format!("[{}]", a)));
            }
            other => panic!("expected loop, got {:?}", other.map(|s| s.depth())),
        }
    }

    #[test]
    fn named_slots_of_one_type_are_distinct() {
        let x = ServiceKey::named::<A>("x");
        let y = ServiceKey::named::<A>("y");
        let stack = CallStack::root().enter(&x, 16).unwrap();
        assert!(stack.enter(&y, 16).is_ok());
    }

    #[test]
    fn entered_stacks_keep_their_resolution() {
        let root = CallStack::root();
        let child = root.enter(&ServiceKey::of::<A>(), 16).unwrap();
        assert_eq!(child.resolution(), root.resolution());
        assert_ne!(CallStack::root().resolution(), root.resolution());
    }

    #[test]
    fn depth_is_bounded() {
        let stack = CallStack::root().enter(&ServiceKey::of::<A>(), 1).unwrap();
        assert!(matches!(
            stack.enter(&ServiceKey::of::<B>(), 1),
            Err(DiError::DepthExceeded(1))
        ));
    }
}
