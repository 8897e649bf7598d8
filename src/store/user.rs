use super::registry::{use_store, Store};
use crate::error::Result;
use crate::runtime::ReactiveRuntime;
use crate::signal::{Effect, Signal};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Key the session store is registered under.
pub const USER_STORE_ID: &str = "user";

/// Session-scoped user attributes.
///
/// Each field is its own signal, so observers of `username` are not woken by
/// writes to `email` or `credits`. `credits` is opaque text; nothing here
/// parses it.
///
/// # Examples
///
/// ```
/// use session_signals::runtime::ReactiveRuntime;
/// use session_signals::UserStore;
/// use std::sync::Arc;
///
/// ReactiveRuntime::scope(|| {
///     let header = UserStore::get().unwrap();
///     let profile = UserStore::get().unwrap();
///     assert!(Arc::ptr_eq(&header, &profile));
///
///     header.email.set("a@x.com".to_string());
///     assert_eq!(profile.email.get(), "a@x.com");
/// });
/// ```
#[derive(Debug)]
pub struct UserStore {
    pub username: Signal<String>,
    pub email: Signal<String>,
    pub credits: Signal<String>,
}

impl Store for UserStore {
    const ID: &'static str = USER_STORE_ID;

    fn setup() -> Self {
        Self {
            username: Signal::new(String::new()),
            email: Signal::new(String::new()),
            credits: Signal::new(String::new()),
        }
    }
}

impl UserStore {
    /// Resolve the session store from the current runtime.
    pub fn get() -> Result<Arc<Self>> {
        use_store::<Self>()
    }

    /// Read all three fields at once.
    ///
    /// Reads are tracked, so calling this inside an effect subscribes the
    /// effect to every field.
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            username: self.username.get(),
            email: self.email.get(),
            credits: self.credits.get(),
        }
    }

    /// Write every field from a snapshot, e.g. a profile fetched from an API.
    ///
    /// Fields are written one by one; observers see three separate changes.
    pub fn apply(&self, snapshot: SessionSnapshot) {
        let SessionSnapshot {
            username,
            email,
            credits,
        } = snapshot;
        self.username.set(username);
        self.email.set(email);
        self.credits.set(credits);
    }

    /// Clear the session back to empty fields, as on logout.
    ///
    /// Watchers and effects stay subscribed and are notified of each field.
    pub fn reset(&self) {
        tracing::debug!("resetting user session");
        self.apply(SessionSnapshot::default());
    }

    /// Call `callback` with the whole session after any field is written.
    ///
    /// Unlike [`Signal::watch`] the callback is not called on registration.
    /// Signals the callback reads are not tracked; only the three session
    /// fields trigger it.
    pub fn subscribe<F>(&self, callback: F) -> Effect
    where
        F: Fn(&SessionSnapshot) + Send + Sync + 'static,
    {
        let username = self.username.clone();
        let email = self.email.clone();
        let credits = self.credits.clone();
        let primed = AtomicBool::new(false);
        let runtime = ReactiveRuntime::current().downgrade();

        Effect::new(move || {
            let snapshot = SessionSnapshot {
                username: username.get(),
                email: email.get(),
                credits: credits.get(),
            };
            if primed.swap(true, Ordering::SeqCst) {
                match runtime.upgrade() {
                    Some(runtime) => runtime.untracked(|| callback(&snapshot)),
                    None => callback(&snapshot),
                }
            }
        })
    }
}

/// Plain copy of the session fields.
///
/// Missing fields deserialize to empty strings, matching the store defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSnapshot {
    pub username: String,
    pub email: String,
    pub credits: String,
}
