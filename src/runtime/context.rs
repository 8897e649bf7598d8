use crate::store::StoreRegistry;
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

/// Registered observer.
///
/// Tracked observers (effects) re-record their reads on every run; watchers
/// keep the subscriptions they were given and run with tracking off.
#[derive(Clone)]
struct Observer {
    run: Arc<dyn Fn() + Send + Sync>,
    tracked: bool,
}

/// Dependency graph for one runtime.
#[derive(Default)]
struct ReactiveContext {
    current_observer: Option<usize>,
    // Map from signal ID to set of observer IDs that depend on it
    dependencies: HashMap<usize, HashSet<usize>>,
    // Map from observer ID to set of signal IDs it depends on
    observer_deps: HashMap<usize, HashSet<usize>>,
    observers: HashMap<usize, Observer>,
}

impl ReactiveContext {
    fn clear(&mut self) {
        self.current_observer = None;
        self.dependencies.clear();
        self.observer_deps.clear();
        self.observers.clear();
    }

    fn unlink(&mut self, observer_id: usize) {
        if let Some(old_deps) = self.observer_deps.remove(&observer_id) {
            for signal_id in old_deps {
                if let Some(deps) = self.dependencies.get_mut(&signal_id) {
                    deps.remove(&observer_id);
                    if deps.is_empty() {
                        self.dependencies.remove(&signal_id);
                    }
                }
            }
        }
    }
}

/// Shared runtime state.
///
/// Signals and guards hold a `Weak` to this so that a runtime torn down
/// by its owner takes its observers and stores with it.
pub struct RuntimeInner {
    next_id: AtomicUsize,
    context: Mutex<ReactiveContext>,
    stores: StoreRegistry,
}

impl RuntimeInner {
    fn new() -> Arc<Self> {
        Arc::new_cyclic(|owner| Self {
            next_id: AtomicUsize::new(0),
            context: Mutex::new(ReactiveContext::default()),
            stores: StoreRegistry::new(Weak::clone(owner)),
        })
    }

    fn context(&self) -> MutexGuard<'_, ReactiveContext> {
        self.context.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Generate the next unique ID for a reactive primitive.
    pub(crate) fn next_id(&self) -> usize {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }

    /// Track a read of a signal by the current observer.
    pub(crate) fn track_read(&self, signal_id: usize) {
        let mut ctx = self.context();
        if let Some(current_observer) = ctx.current_observer {
            Self::link(&mut ctx, signal_id, current_observer);
        }
    }

    /// Subscribe an observer to a signal without running anything.
    pub(crate) fn subscribe(&self, signal_id: usize, observer_id: usize) {
        let mut ctx = self.context();
        Self::link(&mut ctx, signal_id, observer_id);
    }

    fn link(ctx: &mut ReactiveContext, signal_id: usize, observer_id: usize) {
        ctx.dependencies
            .entry(signal_id)
            .or_default()
            .insert(observer_id);
        ctx.observer_deps
            .entry(observer_id)
            .or_default()
            .insert(signal_id);
    }

    /// Run every observer that depends on a signal.
    ///
    /// Observers run synchronously, in the writer's call, with no lock held.
    pub(crate) fn notify_observers(&self, signal_id: usize) {
        let observers = {
            let ctx = self.context();
            ctx.dependencies
                .get(&signal_id)
                .map(|obs| obs.iter().copied().collect::<Vec<_>>())
                .unwrap_or_default()
        };

        tracing::trace!(signal_id, observers = observers.len(), "notifying observers");

        for observer_id in observers {
            self.run_observer(observer_id);
        }
    }

    fn run_observer(&self, observer_id: usize) {
        let observer = {
            let mut ctx = self.context();
            // Removed while an earlier observer in the same fan-out ran.
            let observer = ctx.observers.get(&observer_id).cloned();
            if observer.as_ref().is_some_and(|o| o.tracked) {
                ctx.unlink(observer_id);
            }
            observer
        };

        match observer {
            Some(observer) if observer.tracked => {
                self.with_observer(observer_id, || (observer.run)());
            }
            Some(observer) => self.untracked(|| (observer.run)()),
            None => {}
        }
    }

    /// Register an effect: re-run as an observer whenever a signal it read
    /// changes, dropping and re-recording its dependencies each time.
    ///
    /// Any dependencies previously recorded for `observer_id` are dropped.
    pub(crate) fn create_observer<F>(&self, observer_id: usize, f: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.insert_observer(observer_id, Arc::new(f), true);
    }

    /// Register a watcher: subscriptions come from [`Self::subscribe`] only
    /// and reads made while it runs are not tracked.
    pub(crate) fn create_watcher<F>(&self, observer_id: usize, f: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.insert_observer(observer_id, Arc::new(f), false);
    }

    fn insert_observer(&self, observer_id: usize, run: Arc<dyn Fn() + Send + Sync>, tracked: bool) {
        let mut ctx = self.context();
        ctx.unlink(observer_id);
        ctx.observers.insert(observer_id, Observer { run, tracked });
    }

    /// Run a function with a specific observer as the current context.
    pub(crate) fn with_observer<F, R>(&self, observer_id: usize, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        self.with_current(Some(observer_id), f)
    }

    /// Run a function with no current observer, so its reads subscribe nothing.
    pub(crate) fn untracked<F, R>(&self, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        self.with_current(None, f)
    }

    fn with_current<F, R>(&self, observer: Option<usize>, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        let prev = std::mem::replace(&mut self.context().current_observer, observer);

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(f));

        self.context().current_observer = prev;

        match result {
            Ok(r) => r,
            Err(e) => std::panic::resume_unwind(e),
        }
    }

    pub(crate) fn remove_observer(&self, observer_id: usize) {
        let mut ctx = self.context();
        ctx.observers.remove(&observer_id);
        ctx.unlink(observer_id);
    }

    #[cfg(test)]
    pub(crate) fn observer_count(&self) -> usize {
        self.context().observers.len()
    }

    #[cfg(test)]
    pub(crate) fn dependency_count(&self, observer_id: usize) -> usize {
        self.context()
            .observer_deps
            .get(&observer_id)
            .map_or(0, HashSet::len)
    }

    pub(crate) fn stores(&self) -> &StoreRegistry {
        &self.stores
    }
}

/// Hybrid reactive runtime for signals, effects and stores.
///
/// Supports both a global runtime (default) and scoped runtimes for
/// isolation. Each runtime tracks dependencies between signals and their
/// observers and owns a [`StoreRegistry`], so a store's lifetime is the
/// lifetime of the runtime it was resolved in.
///
/// # Examples
///
/// Using the default global runtime:
///
/// ```
/// use session_signals::Signal;
///
/// let signal = Signal::new(42);
/// assert_eq!(signal.get(), 42);
/// ```
///
/// Using scoped runtimes for isolation:
///
/// ```
/// use session_signals::runtime::ReactiveRuntime;
/// use session_signals::UserStore;
///
/// ReactiveRuntime::scope(|| {
///     let store = UserStore::get().unwrap();
///     store.username.set("alice".to_string());
/// });
///
/// // A fresh scope gets a fresh store.
/// ReactiveRuntime::scope(|| {
///     assert_eq!(UserStore::get().unwrap().username.get(), "");
/// });
/// ```
pub struct ReactiveRuntime {
    inner: Arc<RuntimeInner>,
}

// Thread-local stack for scoped runtimes
thread_local! {
    static RUNTIME_STACK: RefCell<Vec<Arc<ReactiveRuntime>>> = const { RefCell::new(Vec::new()) };
}

impl ReactiveRuntime {
    /// Create a new isolated runtime with its own dependency graph and
    /// store registry.
    pub fn new() -> Arc<Self> {
        Self::from_inner(RuntimeInner::new())
    }

    pub(crate) fn from_inner(inner: Arc<RuntimeInner>) -> Arc<Self> {
        Arc::new(ReactiveRuntime { inner })
    }

    /// Run a function with a fresh isolated runtime.
    ///
    /// The runtime, its observers and every store resolved inside `f` are
    /// dropped when the function returns.
    pub fn scope<F, R>(f: F) -> R
    where
        F: FnOnce() -> R,
    {
        Self::with_runtime(Self::new(), f)
    }

    /// Get or create the global runtime (fallback).
    ///
    /// This is used as the default runtime when no scoped runtime is active.
    pub fn global() -> Arc<Self> {
        use std::sync::OnceLock;
        static RUNTIME: OnceLock<Arc<ReactiveRuntime>> = OnceLock::new();
        Arc::clone(RUNTIME.get_or_init(Self::new))
    }

    /// Get the current reactive runtime (scoped or global fallback).
    pub fn current() -> Arc<Self> {
        RUNTIME_STACK
            .with(|stack| stack.borrow().last().cloned())
            .unwrap_or_else(Self::global)
    }

    /// Run a function with a specific runtime as the current context.
    ///
    /// This pushes the runtime onto the thread-local stack for the duration
    /// of the function execution. The stack is restored even if `f` panics.
    ///
    /// # Examples
    ///
    /// ```
    /// use session_signals::runtime::ReactiveRuntime;
    /// use session_signals::UserStore;
    ///
    /// let runtime = ReactiveRuntime::new();
    /// ReactiveRuntime::with_runtime(runtime.clone(), || {
    ///     UserStore::get().unwrap().email.set("a@x.com".to_string());
    /// });
    ///
    /// // Same runtime, same store.
    /// ReactiveRuntime::with_runtime(runtime, || {
    ///     assert_eq!(UserStore::get().unwrap().email.get(), "a@x.com");
    /// });
    /// ```
    pub fn with_runtime<F, R>(runtime: Arc<Self>, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        RUNTIME_STACK.with(|stack| {
            stack.borrow_mut().push(runtime);
        });

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(f));

        RUNTIME_STACK.with(|stack| {
            stack.borrow_mut().pop();
        });

        match result {
            Ok(r) => r,
            Err(e) => std::panic::resume_unwind(e),
        }
    }

    /// Clear all observers, dependencies and registered stores.
    ///
    /// IDs keep counting up, so signals that are still alive never share
    /// an ID with ones created afterwards.
    pub fn clear(&self) {
        self.inner.context().clear();
        self.inner.stores.clear();
        tracing::debug!("reactive runtime cleared");
    }

    /// The store registry owned by this runtime.
    pub fn registry(&self) -> &StoreRegistry {
        self.inner.stores()
    }

    pub(crate) fn inner(&self) -> &Arc<RuntimeInner> {
        &self.inner
    }

    pub(crate) fn downgrade(&self) -> Weak<RuntimeInner> {
        Arc::downgrade(&self.inner)
    }
}
