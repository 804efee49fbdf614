/// Shared value cell with old/new change notification.
///
/// `ObservableCell<T>` wraps a value in single-threaded shared storage
/// (`Rc<RefCell<..>>`). Every write that changes the value (by `PartialEq`)
/// notifies live subscribers with both the superseded and the new value,
/// after the new value is visible to readers.
///
/// Writes issued from inside a subscriber callback are queued and delivered
/// after the current notification finishes, so subscribers always observe
/// changes in the order the writes happened.
///
/// Write hooks (`on_write`) are the exception: they run synchronously inside
/// every write, before anything is queued. State kept by a hook therefore
/// never lags behind the cell, even while queued changes are pending.
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::{Rc, Weak};

type CallbackRc<T> = Rc<dyn Fn(&T, &T)>;
type CallbackWeak<T> = Weak<dyn Fn(&T, &T)>;

/// A value change waiting to be delivered.
struct Change<T> {
    old: T,
    new: T,
    /// Subscriber id that must not receive this change.
    skip: Option<u64>,
}

struct CellInner<T> {
    value: T,
    version: u64,
    /// Subscribers in registration order. Dead entries are pruned on notify.
    subscribers: Vec<(u64, CallbackWeak<T>)>,
    /// Called inside each write. Dead entries are pruned on write.
    hooks: Vec<(u64, CallbackWeak<T>)>,
    next_subscriber_id: u64,
    /// Whether a notification loop is currently running.
    notifying: bool,
    pending: VecDeque<Change<T>>,
}

/// A shared, version-tracked value with change notification.
///
/// Cloning an `ObservableCell` creates a new handle to the same value and
/// the same subscriber list.
pub struct ObservableCell<T> {
    inner: Rc<RefCell<CellInner<T>>>,
}

impl<T> Clone for ObservableCell<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for ObservableCell<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("ObservableCell")
            .field("value", &inner.value)
            .field("version", &inner.version)
            .field("subscriber_count", &inner.subscribers.len())
            .field("hook_count", &inner.hooks.len())
            .finish()
    }
}

impl<T: Clone + PartialEq + 'static> ObservableCell<T> {
    /// Creates a new cell holding `value`, at version 0, with no subscribers.
    pub fn new(value: T) -> Self {
        Self {
            inner: Rc::new(RefCell::new(CellInner {
                value,
                version: 0,
                subscribers: Vec::new(),
                hooks: Vec::new(),
                next_subscriber_id: 0,
                notifying: false,
                pending: VecDeque::new(),
            })),
        }
    }

    /// Returns a clone of the current value.
    pub fn get(&self) -> T {
        self.inner.borrow().value.clone()
    }

    /// Gives `f` a reference to the current value without cloning it.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.inner.borrow().value)
    }

    /// Number of value-changing writes so far.
    pub fn version(&self) -> u64 {
        self.inner.borrow().version
    }

    /// Replaces the value and notifies subscribers with `(old, new)`.
    ///
    /// Writing a value equal to the current one is a no-op.
    pub fn set(&self, value: T) {
        self.write(value, None, true);
    }

    /// Replaces the value without notifying any subscriber.
    ///
    /// The version still advances.
    pub fn set_silently(&self, value: T) {
        self.write(value, None, false);
    }

    /// Replaces the value and notifies every subscriber and write hook except
    /// the owner of `skip`.
    ///
    /// Used by a subscriber that writes back into the cell it observes and
    /// must not hear about its own write.
    pub fn set_skipping(&self, value: T, skip: &Subscription) {
        self.write(value, Some(skip.id), true);
    }

    /// Mutates the value in place. Subscribers are notified if the result
    /// differs from the value before `f` ran.
    pub fn update(&self, f: impl FnOnce(&mut T)) {
        let mut value = self.get();
        f(&mut value);
        self.set(value);
    }

    /// Registers `callback`, called with `(old, new)` after each change.
    ///
    /// Dropping the returned [`Subscription`] unsubscribes.
    pub fn subscribe(&self, callback: impl Fn(&T, &T) + 'static) -> Subscription {
        self.register(callback, false)
    }

    /// Registers `callback` as a write hook, called with `(old, new)` inside
    /// every notifying write, before queued subscribers hear about it.
    ///
    /// Hooks must not write to the cell. Dropping the returned
    /// [`Subscription`] unregisters the hook.
    pub fn on_write(&self, callback: impl Fn(&T, &T) + 'static) -> Subscription {
        self.register(callback, true)
    }

    /// Number of registered subscribers and write hooks, including dropped
    /// ones that have not been pruned yet.
    pub fn subscriber_count(&self) -> usize {
        let inner = self.inner.borrow();
        inner.subscribers.len() + inner.hooks.len()
    }

    fn register(&self, callback: impl Fn(&T, &T) + 'static, hook: bool) -> Subscription {
        let strong: CallbackRc<T> = Rc::new(callback);
        let mut inner = self.inner.borrow_mut();
        let id = inner.next_subscriber_id;
        inner.next_subscriber_id += 1;
        let entry = (id, Rc::downgrade(&strong));
        if hook {
            inner.hooks.push(entry);
        } else {
            inner.subscribers.push(entry);
        }
        Subscription {
            id,
            _guard: Box::new(strong),
        }
    }

    fn write(&self, value: T, skip: Option<u64>, notify: bool) {
        let old = {
            let mut inner = self.inner.borrow_mut();
            if inner.value == value {
                return;
            }
            inner.version += 1;
            std::mem::replace(&mut inner.value, value)
        };
        if notify {
            let new = self.get();
            self.run_hooks(&old, &new, skip);
            self.dispatch(Change { old, new, skip });
        }
    }

    fn run_hooks(&self, old: &T, new: &T, skip: Option<u64>) {
        let hooks: Vec<CallbackRc<T>> = {
            let mut inner = self.inner.borrow_mut();
            inner.hooks.retain(|(_, w)| w.strong_count() > 0);
            inner
                .hooks
                .iter()
                .filter(|(id, _)| Some(*id) != skip)
                .filter_map(|(_, w)| w.upgrade())
                .collect()
        };
        for hook in &hooks {
            hook(old, new);
        }
    }

    /// Queues `change` and, unless a notification loop is already running
    /// further up the stack, drains the queue.
    fn dispatch(&self, change: Change<T>) {
        {
            let mut inner = self.inner.borrow_mut();
            inner.pending.push_back(change);
            if inner.notifying {
                return;
            }
            inner.notifying = true;
        }

        loop {
            let (change, callbacks) = {
                let mut inner = self.inner.borrow_mut();
                let Some(change) = inner.pending.pop_front() else {
                    inner.notifying = false;
                    return;
                };
                inner.subscribers.retain(|(_, w)| w.strong_count() > 0);
                let callbacks: Vec<CallbackRc<T>> = inner
                    .subscribers
                    .iter()
                    .filter(|(id, _)| Some(*id) != change.skip)
                    .filter_map(|(_, w)| w.upgrade())
                    .collect();
                (change, callbacks)
            };

            // No borrow is held here, so callbacks may read or write the cell.
            for cb in &callbacks {
                cb(&change.old, &change.new);
            }
        }
    }
}

/// RAII guard for a subscriber callback.
///
/// Dropping it releases the only strong reference to the callback, so the
/// cell stops calling it.
pub struct Subscription {
    id: u64,
    _guard: Box<dyn std::any::Any>,
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}
