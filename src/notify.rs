//! Queueing and delivering stale consumers.
//!
//! A mutation queues every affected consumer into an ordered set, so however
//! many mutations hit a consumer before the flush it is delivered once. The
//! flush hands each still-registered consumer to every `on_store_changed`
//! listener.

use std::{cell::RefCell, rc::Rc};

use pathstore_reactive::ConsumerId;
use slotmap::{SlotMap, new_key_type};
use smallvec::SmallVec;

use crate::container::FxIndexSet;

new_key_type! {
    /// Handle returned by [`Store::on_store_changed`](crate::Store::on_store_changed),
    /// used to remove the listener again.
    pub struct ListenerKey;
}

type Listener = Rc<dyn Fn(ConsumerId)>;

#[derive(Default)]
pub(crate) struct Notifier {
    pending: RefCell<FxIndexSet<ConsumerId>>,
    listeners: RefCell<SlotMap<ListenerKey, Listener>>,
}

impl Notifier {
    /// Queue consumers for the next flush. Returns how many were not already
    /// queued.
    pub(crate) fn queue(&self, consumers: impl IntoIterator<Item = ConsumerId>) -> usize {
        let mut pending = self.pending.borrow_mut();
        consumers
            .into_iter()
            .filter(|consumer| pending.insert(*consumer))
            .count()
    }

    pub(crate) fn unqueue(&self, consumer: ConsumerId) {
        self.pending.borrow_mut().shift_remove(&consumer);
    }

    pub(crate) fn has_pending(&self) -> bool {
        !self.pending.borrow().is_empty()
    }

    pub(crate) fn is_queued(&self, consumer: ConsumerId) -> bool {
        self.pending.borrow().contains(&consumer)
    }

    pub(crate) fn add_listener(&self, listener: Listener) -> ListenerKey {
        self.listeners.borrow_mut().insert(listener)
    }

    pub(crate) fn remove_listener(&self, key: ListenerKey) -> bool {
        self.listeners.borrow_mut().remove(key).is_some()
    }

    /// Deliver every queued consumer for which `is_registered` still holds.
    ///
    /// Neither the queue nor the listener table is borrowed while a listener
    /// runs, so listeners may re-evaluate consumers, mutate the store (which
    /// queues for a later flush), or tear consumers down. A consumer torn down
    /// before its turn is skipped.
    pub(crate) fn flush(&self, is_registered: impl Fn(ConsumerId) -> bool) -> usize {
        let pending = self.pending.take();
        if pending.is_empty() {
            return 0;
        }
        let listeners: SmallVec<[Listener; 2]> =
            self.listeners.borrow().values().cloned().collect();

        let mut delivered = 0;
        for consumer in pending {
            if !is_registered(consumer) {
                continue;
            }
            for listener in &listeners {
                listener(consumer);
            }
            delivered += 1;
        }
        delivered
    }

    pub(crate) fn clear(&self) {
        self.pending.borrow_mut().clear();
        self.listeners.borrow_mut().clear();
    }
}
