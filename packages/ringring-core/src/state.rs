//! Authoritative in-process state store with change notification.
//!
//! One explicitly constructed instance is shared (via `Arc`) between all
//! workers at startup; there is no process-wide singleton. A single mutex
//! guards both the field map and the dialed-command queue, held only for
//! the duration of one call. Listeners are invoked after the lock is
//! released, so a listener may call back into the store.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use crate::{Field, FIELD_COUNT, FIELD_ORDER};

/// Handle returned by [`StateStore::add_listener`], used to unregister.
pub type ListenerId = u64;

type Listener = Arc<dyn Fn(Field, Option<bool>, bool) + Send + Sync>;

pub struct StateStore {
    inner: Mutex<Inner>,
}

struct Inner {
    fields: HashMap<Field, bool>,
    listeners: Vec<(ListenerId, Listener)>,
    next_listener_id: ListenerId,
    commands: VecDeque<String>,
}

impl StateStore {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                fields: HashMap::new(),
                listeners: Vec::new(),
                next_listener_id: 0,
                commands: VecDeque::new(),
            }),
        }
    }

    /// Set a field. No-op when the value is unchanged; otherwise every
    /// registered listener is notified with `(field, old, new)`.
    pub fn set(&self, field: Field, value: bool) {
        let (old, listeners) = {
            let mut inner = self.inner.lock().unwrap();
            let old = inner.fields.get(&field).copied();
            if old == Some(value) {
                return;
            }
            inner.fields.insert(field, value);
            let listeners: Vec<Listener> =
                inner.listeners.iter().map(|(_, l)| l.clone()).collect();
            (old, listeners)
        };

        for listener in listeners {
            listener(field, old, value);
        }
    }

    /// Current value of a field, or `None` if it was never set.
    pub fn get(&self, field: Field) -> Option<bool> {
        self.inner.lock().unwrap().fields.get(&field).copied()
    }

    /// One atomic snapshot of all fields in segment order. Fields that were
    /// never set read as `false`, matching the zero-filled segment.
    pub fn snapshot(&self) -> [bool; FIELD_COUNT] {
        let inner = self.inner.lock().unwrap();
        let mut values = [false; FIELD_COUNT];
        for (value, field) in values.iter_mut().zip(FIELD_ORDER.iter()) {
            *value = inner.fields.get(field).copied().unwrap_or(false);
        }
        values
    }

    /// Register a change listener. Returns an id for [`remove_listener`].
    ///
    /// [`remove_listener`]: StateStore::remove_listener
    pub fn add_listener<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(Field, Option<bool>, bool) + Send + Sync + 'static,
    {
        let mut inner = self.inner.lock().unwrap();
        let id = inner.next_listener_id;
        inner.next_listener_id += 1;
        inner.listeners.push((id, Arc::new(listener)));
        id
    }

    /// Unregister a listener. Unknown ids are ignored.
    pub fn remove_listener(&self, id: ListenerId) {
        let mut inner = self.inner.lock().unwrap();
        inner.listeners.retain(|(listener_id, _)| *listener_id != id);
    }

    /// Append a completed dial sequence to the command queue.
    pub fn enqueue_command(&self, command: String) {
        self.inner.lock().unwrap().commands.push_back(command);
    }

    /// Pop the oldest dial sequence. Non-blocking; `None` when empty.
    pub fn dequeue_command(&self) -> Option<String> {
        self.inner.lock().unwrap().commands.pop_front()
    }
}

impl Default for StateStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_set_then_get() {
        let store = StateStore::new();
        assert_eq!(store.get(Field::Ringing), None);

        store.set(Field::Ringing, true);
        assert_eq!(store.get(Field::Ringing), Some(true));

        store.set(Field::Ringing, false);
        assert_eq!(store.get(Field::Ringing), Some(false));
    }

    #[test]
    fn test_repeated_set_notifies_once() {
        let store = StateStore::new();
        let count = Arc::new(AtomicUsize::new(0));
        let seen = count.clone();
        store.add_listener(move |field, old, new| {
            assert_eq!(field, Field::Busy);
            assert_eq!(old, None);
            assert!(new);
            seen.fetch_add(1, Ordering::SeqCst);
        });

        store.set(Field::Busy, true);
        store.set(Field::Busy, true);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_listener_receives_old_and_new() {
        let store = StateStore::new();
        let changes: Arc<Mutex<Vec<(Option<bool>, bool)>>> = Arc::new(Mutex::new(Vec::new()));
        let seen = changes.clone();
        store.add_listener(move |_, old, new| {
            seen.lock().unwrap().push((old, new));
        });

        store.set(Field::CallActive, true);
        store.set(Field::CallActive, false);

        let changes = changes.lock().unwrap();
        assert_eq!(changes.as_slice(), &[(None, true), (Some(true), false)]);
    }

    #[test]
    fn test_remove_listener_is_idempotent() {
        let store = StateStore::new();
        let count = Arc::new(AtomicUsize::new(0));
        let seen = count.clone();
        let id = store.add_listener(move |_, _, _| {
            seen.fetch_add(1, Ordering::SeqCst);
        });

        store.set(Field::Ringing, true);
        store.remove_listener(id);
        store.remove_listener(id);
        store.set(Field::Ringing, false);

        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_listener_may_call_back_into_store() {
        let store = Arc::new(StateStore::new());
        let inner = store.clone();
        store.add_listener(move |field, _, new| {
            if field == Field::Ringing && new {
                inner.set(Field::CallActive, false);
            }
        });

        store.set(Field::Ringing, true);
        assert_eq!(store.get(Field::CallActive), Some(false));
    }

    #[test]
    fn test_command_queue_is_fifo() {
        let store = StateStore::new();
        assert_eq!(store.dequeue_command(), None);

        store.enqueue_command("1234".to_string());
        store.enqueue_command("5678".to_string());

        assert_eq!(store.dequeue_command().as_deref(), Some("1234"));
        assert_eq!(store.dequeue_command().as_deref(), Some("5678"));
        assert_eq!(store.dequeue_command(), None);
    }

    #[test]
    fn test_snapshot_follows_field_order() {
        let store = StateStore::new();
        store.set(Field::OnTheHook, true);
        store.set(Field::Busy, true);

        assert_eq!(store.snapshot(), [false, true, false, false, true]);
    }

    #[test]
    fn test_concurrent_access() {
        let store = Arc::new(StateStore::new());
        let mut handles = Vec::new();

        for i in 0..8 {
            let store = store.clone();
            handles.push(std::thread::spawn(move || {
                for n in 0..100 {
                    store.set(Field::Ringing, n % 2 == 0);
                    store.enqueue_command(format!("{}{}", i, n));
                    store.dequeue_command();
                    store.snapshot();
                }
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }
        assert!(store.get(Field::Ringing).is_some());
    }
}
