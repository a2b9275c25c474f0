//! Observer list used to announce refresh attempts.

use std::{
    fmt,
    sync::{Arc, Weak},
};

use parking_lot::Mutex;

pub type Listener = Arc<dyn Fn() + Send + Sync>;

#[derive(Default)]
struct Slots {
    next_id: u64,
    listeners: Vec<(u64, Listener)>,
}

/// Zero-argument callbacks invoked in registration order.
#[derive(Default, Clone)]
pub struct ListenerRegistry {
    slots: Arc<Mutex<Slots>>,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn() + Send + Sync + 'static,
    {
        let mut slots = self.slots.lock();
        let id = slots.next_id;
        slots.next_id += 1;
        slots.listeners.push((id, Arc::new(listener)));

        Subscription {
            id,
            slots: Arc::downgrade(&self.slots),
        }
    }

    /// Call every listener synchronously.
    ///
    /// The list is snapshotted first, so a listener may subscribe or
    /// unsubscribe without deadlocking; such changes apply from the next call.
    pub fn notify(&self) {
        let snapshot: Vec<Listener> = self
            .slots
            .lock()
            .listeners
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();

        for listener in snapshot {
            listener();
        }
    }

    pub fn len(&self) -> usize {
        self.slots.lock().listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for ListenerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerRegistry")
            .field("listeners", &self.len())
            .finish()
    }
}

/// Handle returned by [`ListenerRegistry::subscribe`].
///
/// Dropping it leaves the listener registered.
#[derive(Debug)]
pub struct Subscription {
    id: u64,
    slots: Weak<Mutex<Slots>>,
}

impl Subscription {
    /// Remove the listener. Later calls are no-ops.
    pub fn unsubscribe(&self) {
        if let Some(slots) = self.slots.upgrade() {
            slots.lock().listeners.retain(|(id, _)| *id != self.id);
        }
    }
}
