use crate::runtime::{ReactiveRuntime, RuntimeInner};
use std::sync::{Arc, Weak};

/// A side effect that runs when its dependencies change.
///
/// Effects track the signals they read and re-run when any of those signals
/// is written. The effect runs immediately on creation to establish its
/// initial dependencies, and re-tracks reads on every run.
///
/// # Examples
///
/// ```
/// use session_signals::{Effect, Signal};
/// use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
///
/// let count = Signal::new(0);
/// let counter = Arc::new(AtomicUsize::new(0));
/// let counter_clone = counter.clone();
///
/// let _effect = Effect::new({
///     let count = count.clone();
///     move || {
///         let _ = count.get();
///         counter_clone.fetch_add(1, Ordering::SeqCst);
///     }
/// });
///
/// // Effect runs immediately
/// assert_eq!(counter.load(Ordering::SeqCst), 1);
///
/// count.set(1);
/// assert_eq!(counter.load(Ordering::SeqCst), 2);
/// ```
#[must_use = "dropping an Effect unsubscribes it"]
pub struct Effect {
    id: usize,
    runtime: Weak<RuntimeInner>,
}

impl Effect {
    /// Create a new effect in the current runtime.
    pub fn new<F>(effect: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        let runtime = ReactiveRuntime::current();
        let inner = runtime.inner();
        let id = inner.next_id();
        let effect = Arc::new(effect);
        let effect_clone = Arc::clone(&effect);

        inner.create_observer(id, move || effect_clone());
        inner.with_observer(id, || effect());

        Self {
            id,
            runtime: runtime.downgrade(),
        }
    }
}

impl Drop for Effect {
    fn drop(&mut self) {
        if let Some(runtime) = self.runtime.upgrade() {
            runtime.remove_observer(self.id);
        }
    }
}

/// Create a new effect that runs when dependencies change.
///
/// # Example
///
/// ```
/// use session_signals::{create_effect, runtime::ReactiveRuntime, Signal};
/// use std::sync::{Arc, Mutex};
///
/// ReactiveRuntime::scope(|| {
///     let name = Signal::new(String::new());
///     let greetings = Arc::new(Mutex::new(Vec::new()));
///
///     let _effect = create_effect({
///         let name = name.clone();
///         let greetings = Arc::clone(&greetings);
///         move || greetings.lock().unwrap().push(format!("Hello, {}", name.get()))
///     });
///
///     name.set("alice".to_string());
///     assert_eq!(*greetings.lock().unwrap(), vec!["Hello, ", "Hello, alice"]);
/// });
/// ```
pub fn create_effect<F>(effect: F) -> Effect
where
    F: Fn() + Send + Sync + 'static,
{
    Effect::new(effect)
}
