//! Handler slots: one optional callback per event kind.
//!
//! Registration replaces whatever was in the slot. Firing clones the `Arc`
//! out of the lock and calls it after the lock is released, so a handler
//! may re-register itself (or any other handler) without deadlocking.

use std::sync::{Arc, RwLock};

use clawlink_protocol::Envelope;

use crate::ClientError;
use crate::events::{CloseEvent, EnterRoomResult, GameResult};

type Callback<T> = Arc<dyn Fn(&T) + Send + Sync>;

pub(crate) struct Slot<T: ?Sized> {
    callback: RwLock<Option<Callback<T>>>,
}

impl<T: ?Sized> Default for Slot<T> {
    fn default() -> Self {
        Self {
            callback: RwLock::new(None),
        }
    }
}

impl<T: ?Sized> Slot<T> {
    pub(crate) fn set(&self, callback: Callback<T>) {
        // A poisoned lock only means a previous *registration* panicked;
        // the Option inside is still valid.
        let mut slot = self.callback.write().unwrap_or_else(|e| e.into_inner());
        *slot = Some(callback);
    }

    /// Calls the handler if one is registered. Returns whether it did.
    pub(crate) fn fire(&self, value: &T) -> bool {
        let callback = {
            let slot = self.callback.read().unwrap_or_else(|e| e.into_inner());
            slot.clone()
        };
        match callback {
            Some(callback) => {
                callback(value);
                true
            }
            None => false,
        }
    }
}

/// Every handler the client can call.
#[derive(Default)]
pub(crate) struct HandlerSlots {
    pub(crate) open: Slot<()>,
    pub(crate) close: Slot<CloseEvent>,
    pub(crate) error: Slot<ClientError>,
    pub(crate) message: Slot<Envelope>,
    pub(crate) player_count: Slot<u32>,
    pub(crate) game_result: Slot<GameResult>,
    pub(crate) enter_room_result: Slot<EnterRoomResult>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_fire_without_handler_is_noop() {
        let slot: Slot<u32> = Slot::default();
        assert!(!slot.fire(&1));
    }

    #[test]
    fn test_fire_calls_latest_registration() {
        let slot: Slot<u32> = Slot::default();
        let seen = Arc::new(AtomicU32::new(0));

        let first = Arc::clone(&seen);
        slot.set(Arc::new(move |v: &u32| {
            first.store(*v, Ordering::SeqCst);
        }));
        let second = Arc::clone(&seen);
        slot.set(Arc::new(move |v: &u32| {
            second.store(*v * 10, Ordering::SeqCst);
        }));

        assert!(slot.fire(&4));
        assert_eq!(seen.load(Ordering::SeqCst), 40);
    }

    #[test]
    fn test_handler_can_reregister_itself() {
        let slots = Arc::new(HandlerSlots::default());
        let inner = Arc::clone(&slots);
        slots.player_count.set(Arc::new(move |_: &u32| {
            inner.player_count.set(Arc::new(|_: &u32| {}));
        }));
        // Would deadlock if the read lock were held during the call.
        assert!(slots.player_count.fire(&2));
        assert!(slots.player_count.fire(&3));
    }
}
