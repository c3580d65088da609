//! Synchronous notification channel.
//!
//! Models, proxies and bindings talk through [`Signal`]s. Emitting runs every
//! connected slot on the caller's stack before `emit` returns, so a slot that
//! reads the model back sees the state the mutation left behind.
//!
//! Slots are snapshotted before the first one runs. A slot may connect,
//! disconnect or emit on its own signal; such changes apply from the next
//! emission on.
//!
//! ```
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use tabula_core::Signal;
//!
//! let rows_inserted = Signal::<(usize, usize)>::new();
//! let total = Arc::new(AtomicUsize::new(0));
//!
//! let sink = total.clone();
//! let guard = rows_inserted.connect_scoped(move |&(first, last)| {
//!     sink.fetch_add(last - first + 1, Ordering::Relaxed);
//! });
//! rows_inserted.emit((0, 4));
//! drop(guard);
//! rows_inserted.emit((5, 5));
//!
//! assert_eq!(total.load(Ordering::Relaxed), 5);
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use slotmap::{SlotMap, new_key_type};

use crate::logging::targets;

new_key_type! {
    /// Handle to one connected slot, accepted by [`Signal::disconnect`].
    pub struct ConnectionId;
}

type Slot<Args> = Arc<dyn Fn(&Args) + Send + Sync>;
type SlotTable<Args> = Mutex<Slots<Args>>;

/// Connected slots, each tagged with its connection sequence number.
///
/// `SlotMap` reuses freed slots, so iteration order alone would let a newer
/// connection run ahead of an older one.
struct Slots<Args> {
    map: SlotMap<ConnectionId, (u64, Slot<Args>)>,
    next_seq: u64,
}

impl<Args> Slots<Args> {
    fn new() -> Self {
        Self {
            map: SlotMap::with_key(),
            next_seq: 0,
        }
    }

    fn insert(&mut self, slot: Slot<Args>) -> ConnectionId {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.map.insert((seq, slot))
    }

    fn ordered(&self) -> Vec<Slot<Args>> {
        let mut tagged: Vec<&(u64, Slot<Args>)> = self.map.values().collect();
        tagged.sort_unstable_by_key(|(seq, _)| *seq);
        tagged.into_iter().map(|(_, slot)| slot.clone()).collect()
    }
}

/// A list of slots invoked, in connection order, with a shared reference to
/// each emitted value.
///
/// Multi-value notifications use a tuple, e.g. `Signal<(usize, usize)>` for
/// an inclusive row range.
pub struct Signal<Args> {
    slots: Arc<SlotTable<Args>>,
    blocked: AtomicBool,
}

impl<Args: Clone + Send + 'static> Default for Signal<Args> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Args: Clone + Send + 'static> Signal<Args> {
    pub fn new() -> Self {
        Self {
            slots: Arc::new(Mutex::new(Slots::new())),
            blocked: AtomicBool::new(false),
        }
    }

    /// Connects `slot` until [`disconnect`](Self::disconnect) is called with
    /// the returned id.
    pub fn connect<F>(&self, slot: F) -> ConnectionId
    where
        F: Fn(&Args) + Send + Sync + 'static,
    {
        self.slots.lock().insert(Arc::new(slot))
    }

    /// Connects `slot` for as long as the returned guard lives.
    ///
    /// Observers that hold a guard per signal disconnect everything at once
    /// by dropping themselves.
    pub fn connect_scoped<F>(&self, slot: F) -> ConnectionGuard<Args>
    where
        F: Fn(&Args) + Send + Sync + 'static,
    {
        ConnectionGuard {
            id: self.connect(slot),
            slots: Arc::downgrade(&self.slots),
        }
    }

    /// Removes a slot. Returns `false` if it was already gone.
    pub fn disconnect(&self, id: ConnectionId) -> bool {
        self.slots.lock().map.remove(id).is_some()
    }

    pub fn disconnect_all(&self) {
        self.slots.lock().map.clear();
    }

    pub fn connection_count(&self) -> usize {
        self.slots.lock().map.len()
    }

    /// While blocked, `emit` drops its value without running any slot.
    pub fn set_blocked(&self, blocked: bool) {
        self.blocked.store(blocked, Ordering::Release);
    }

    pub fn is_blocked(&self) -> bool {
        self.blocked.load(Ordering::Acquire)
    }

    /// Runs every slot connected at the time of the call.
    pub fn emit(&self, args: Args) {
        if self.is_blocked() {
            return;
        }
        let snapshot = self.slots.lock().ordered();
        if snapshot.is_empty() {
            return;
        }
        tracing::trace!(target: targets::SIGNAL, slots = snapshot.len(), "emit");
        for slot in &snapshot {
            slot(&args);
        }
    }
}

/// Disconnects its slot when dropped.
///
/// Dropping a guard after its signal is harmless.
pub struct ConnectionGuard<Args> {
    id: ConnectionId,
    slots: Weak<SlotTable<Args>>,
}

impl<Args> ConnectionGuard<Args> {
    pub fn id(&self) -> ConnectionId {
        self.id
    }
}

impl<Args> Drop for ConnectionGuard<Args> {
    fn drop(&mut self) {
        if let Some(slots) = self.slots.upgrade() {
            slots.lock().map.remove(self.id);
        }
    }
}
