use crate::error::{Result, StoreError};
use crate::runtime::{ReactiveRuntime, RuntimeInner};
use std::any::{type_name, Any};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

/// A store definition: a registration key and a way to build the store.
///
/// # Examples
///
/// ```
/// use session_signals::{use_store, runtime::ReactiveRuntime, Signal, Store};
///
/// struct Theme {
///     dark: Signal<bool>,
/// }
///
/// impl Store for Theme {
///     const ID: &'static str = "theme";
///
///     fn setup() -> Self {
///         Self { dark: Signal::new(false) }
///     }
/// }
///
/// ReactiveRuntime::scope(|| {
///     use_store::<Theme>().unwrap().dark.set(true);
///     assert!(use_store::<Theme>().unwrap().dark.get());
/// });
/// ```
pub trait Store: Send + Sync + 'static {
    /// Key the store is registered under. Consumers resolve it by this key.
    const ID: &'static str;

    /// Build the store with its initial state. Called once per registry.
    fn setup() -> Self;
}

#[derive(Clone)]
struct Entry {
    type_name: &'static str,
    store: Arc<dyn Any + Send + Sync>,
}

/// Registry mapping store keys to lazily built singleton instances.
///
/// Every [`ReactiveRuntime`] owns one, reachable through
/// [`ReactiveRuntime::registry`]. Stores are built inside that runtime and
/// live as long as it does unless disposed earlier.
pub struct StoreRegistry {
    owner: Weak<RuntimeInner>,
    stores: Mutex<HashMap<&'static str, Entry>>,
}

impl StoreRegistry {
    pub(crate) fn new(owner: Weak<RuntimeInner>) -> Self {
        Self {
            owner,
            stores: Mutex::new(HashMap::new()),
        }
    }

    fn stores(&self) -> MutexGuard<'_, HashMap<&'static str, Entry>> {
        self.stores.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Resolve the store registered under `S::ID`, building it on first use.
    ///
    /// Every call for the same key returns the same instance. Fails only if
    /// the key is already bound to a different store type.
    pub fn resolve<S: Store>(&self) -> Result<Arc<S>> {
        let existing = self.stores().get(S::ID).cloned();
        if let Some(entry) = existing {
            tracing::trace!(store = S::ID, "store resolved");
            return Self::downcast(entry);
        }

        // Built without the lock held so `setup` may resolve other stores,
        // and inside the owning runtime so its signals belong there.
        let store = match self.owner.upgrade() {
            Some(owner) => {
                ReactiveRuntime::with_runtime(ReactiveRuntime::from_inner(owner), S::setup)
            }
            None => S::setup(),
        };
        let store: Arc<dyn Any + Send + Sync> = Arc::new(store);
        let entry = self
            .stores()
            .entry(S::ID)
            .or_insert_with(|| {
                tracing::debug!(store = S::ID, kind = type_name::<S>(), "store created");
                Entry {
                    type_name: type_name::<S>(),
                    store,
                }
            })
            .clone();

        Self::downcast(entry)
    }

    fn downcast<S: Store>(entry: Entry) -> Result<Arc<S>> {
        let registered = entry.type_name;
        entry.store.downcast::<S>().map_err(|_| {
            tracing::warn!(store = S::ID, registered, requested = type_name::<S>(), "store key conflict");
            StoreError::KeyConflict {
                id: S::ID,
                registered,
                requested: type_name::<S>(),
            }
        })
    }

    /// Whether a store has been built under `id`.
    pub fn contains(&self, id: &str) -> bool {
        self.stores().contains_key(id)
    }

    /// Number of stores built so far.
    pub fn len(&self) -> usize {
        self.stores().len()
    }

    pub fn is_empty(&self) -> bool {
        self.stores().is_empty()
    }

    /// Drop the store registered under `id`.
    ///
    /// Handles already held keep working; the next resolution builds a new
    /// instance. Returns whether a store was registered.
    pub fn dispose(&self, id: &str) -> bool {
        let removed = self.stores().remove(id);
        if removed.is_some() {
            tracing::debug!(store = id, "store disposed");
        }
        removed.is_some()
    }

    /// Drop every registered store.
    pub fn clear(&self) {
        let stores = std::mem::take(&mut *self.stores());
        if !stores.is_empty() {
            tracing::debug!(count = stores.len(), "store registry cleared");
        }
    }
}

impl fmt::Debug for StoreRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stores = self.stores();
        f.debug_set().entries(stores.keys()).finish()
    }
}

/// Resolve a store from the current runtime's registry.
pub fn use_store<S: Store>() -> Result<Arc<S>> {
    ReactiveRuntime::current().registry().resolve::<S>()
}
