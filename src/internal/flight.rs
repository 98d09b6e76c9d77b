//! Per-slot construction locks for concurrent first requests.
//!
//! A resolution holds the lock of every cacheable slot it is building until the
//! instance is stored, dependencies included. Two resolutions walking a cyclic
//! graph from different ends would each hold one slot and wait on the other's,
//! so every wait is first checked against the wait-for graph: if the holder of
//! the wanted slot is, transitively, waiting on the requester, the wait is
//! refused with `DependencyLoop`.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::OwnedMutexGuard;
use tracing::debug;

use super::call_stack::{CallStack, ResolutionId};
use crate::error::{Chain, DiError, DiResult};
use crate::key::ServiceKey;

/// The construction lock of one slot, and who holds it.
#[derive(Default)]
pub(crate) struct Flight {
    lock: Arc<tokio::sync::Mutex<()>>,
    holder: Mutex<Option<ResolutionId>>,
}

/// Held while the slot is being built; releases the slot on drop.
pub(crate) struct FlightGuard {
    flight: Arc<Flight>,
    _lock: OwnedMutexGuard<()>,
}

impl Drop for FlightGuard {
    fn drop(&mut self) {
        // Cleared before the lock itself is released.
        *self.flight.holder.lock() = None;
    }
}

/// Which slot each blocked resolution is waiting for.
#[derive(Default)]
pub(crate) struct FlightTable {
    waiting: Mutex<HashMap<ResolutionId, (Arc<Flight>, String)>>,
}

// Removes a wait entry even when the waiting future is dropped.
struct WaitEntry<'a> {
    table: &'a FlightTable,
    resolution: ResolutionId,
}

impl Drop for WaitEntry<'_> {
    fn drop(&mut self) {
        self.table.waiting.lock().remove(&self.resolution);
    }
}

impl FlightTable {
    /// Takes the lock of `slot` for the resolution owning `stack`, which must
    /// already contain `slot`.
    pub(crate) async fn acquire(
        &self,
        flight: Arc<Flight>,
        slot: &ServiceKey,
        stack: &CallStack,
    ) -> DiResult<FlightGuard> {
        let me = stack.resolution();
        let entry = {
            let mut waiting = self.waiting.lock();
            if let Ok(lock) = flight.lock.clone().try_lock_owned() {
                *flight.holder.lock() = Some(me);
                return Ok(FlightGuard { flight, _lock: lock });
            }
            if let Some(chain) = wait_cycle(&waiting, &flight, me, stack) {
                debug!(service = %slot, chain = %chain, "refusing to wait on a slot held across a loop");
                return Err(DiError::DependencyLoop(chain));
            }
            waiting.insert(me, (flight.clone(), slot.to_string()));
            WaitEntry {
                table: self,
                resolution: me,
            }
        };

        let lock = flight.lock.clone().lock_owned().await;
        {
            let _waiting = self.waiting.lock();
            *flight.holder.lock() = Some(me);
        }
        drop(entry);
        Ok(FlightGuard { flight, _lock: lock })
    }
}

// Follows holder -> awaited slot -> holder until it returns to `me` or ends.
fn wait_cycle(
    waiting: &HashMap<ResolutionId, (Arc<Flight>, String)>,
    wanted: &Arc<Flight>,
    me: ResolutionId,
    stack: &CallStack,
) -> Option<Chain> {
    let mut links = stack.labels();
    let mut seen = HashSet::new();
    let mut current = wanted.clone();
    loop {
        let holder = (*current.holder.lock())?;
        if holder == me {
            return Some(Chain::new(links));
        }
        if !seen.insert(holder) {
            return None;
        }
        let (next, label) = waiting.get(&holder)?;
        links.push(label.clone());
        current = next.clone();
    }
}
