use crate::runtime::{ReactiveRuntime, RuntimeInner};
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, Weak};

/// A reactive cell that holds a value and notifies its observers when written.
///
/// Cloning a signal yields another handle to the same cell.
pub struct Signal<T> {
    value: Arc<RwLock<T>>,
    id: usize,
    runtime: Weak<RuntimeInner>,
}

impl<T> Clone for Signal<T> {
    fn clone(&self) -> Self {
        Self {
            value: Arc::clone(&self.value),
            id: self.id,
            runtime: Weak::clone(&self.runtime),
        }
    }
}

impl<T: Clone + Send + Sync + 'static> Signal<T> {
    /// Create a new signal in the current runtime.
    pub fn new(initial: T) -> Self {
        let runtime = ReactiveRuntime::current();
        let id = runtime.inner().next_id();

        Self {
            value: Arc::new(RwLock::new(initial)),
            id,
            runtime: runtime.downgrade(),
        }
    }

    /// Get the current value of the signal.
    ///
    /// Inside an effect this records the signal as a dependency.
    pub fn get(&self) -> T {
        self.track();
        self.get_untracked()
    }

    /// Get the current value without recording a dependency.
    pub fn get_untracked(&self) -> T {
        self.value
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Set a new value for the signal.
    ///
    /// Every write notifies, even if the value is unchanged.
    pub fn set(&self, new_value: T) {
        *self.value.write().unwrap_or_else(PoisonError::into_inner) = new_value;
        self.notify();
    }

    /// Update the value using a function.
    pub fn update(&self, f: impl FnOnce(&mut T)) {
        let mut value = self.value.write().unwrap_or_else(PoisonError::into_inner);
        f(&mut *value);
        drop(value); // Release the write lock before notifying
        self.notify();
    }

    /// Read the value with a function without cloning.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.track();
        let value = self.value.read().unwrap_or_else(PoisonError::into_inner);
        f(&*value)
    }

    /// Whether both handles point at the same cell.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.value, &other.value)
    }

    /// Watch this signal for changes.
    ///
    /// The callback is called immediately with the current value, then after
    /// every write. Signals read inside the callback are not tracked, so the
    /// watcher only ever fires for this signal. Dropping the returned guard
    /// stops the callback.
    pub fn watch<F>(&self, callback: F) -> WatchGuard
    where
        F: Fn(T) + Send + Sync + 'static,
    {
        let callback = Arc::new(callback);

        if let Some(runtime) = self.runtime.upgrade() {
            let observer_id = runtime.next_id();
            let value = Arc::clone(&self.value);
            let callback_clone = Arc::clone(&callback);

            runtime.create_watcher(observer_id, move || {
                let val = value.read().unwrap_or_else(PoisonError::into_inner).clone();
                callback_clone(val);
            });
            runtime.subscribe(self.id, observer_id);

            let val = self.get_untracked();
            runtime.untracked(|| callback(val));

            return WatchGuard {
                observer_id: Some(observer_id),
                runtime: Arc::downgrade(&runtime),
            };
        }

        callback(self.get_untracked());
        WatchGuard {
            observer_id: None,
            runtime: Weak::new(),
        }
    }

    fn track(&self) {
        if let Some(runtime) = self.runtime.upgrade() {
            runtime.track_read(self.id);
        }
    }

    fn notify(&self) {
        if let Some(runtime) = self.runtime.upgrade() {
            runtime.notify_observers(self.id);
        }
    }
}

impl<T: Default + Clone + Send + Sync + 'static> Default for Signal<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: fmt::Debug> fmt::Debug for Signal<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = self.value.read().unwrap_or_else(PoisonError::into_inner);
        f.debug_struct("Signal")
            .field("id", &self.id)
            .field("value", &*value)
            .finish()
    }
}

/// RAII guard for signal watchers.
#[must_use = "dropping a WatchGuard stops the watcher"]
pub struct WatchGuard {
    observer_id: Option<usize>,
    runtime: Weak<RuntimeInner>,
}

impl Drop for WatchGuard {
    fn drop(&mut self) {
        if let (Some(observer_id), Some(runtime)) = (self.observer_id, self.runtime.upgrade()) {
            runtime.remove_observer(observer_id);
        }
    }
}
