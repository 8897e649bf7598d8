//! # Session Signals
//!
//! A keyed, singleton session store built on fine-grained reactive signals.
//!
//! ## Signals (Low-level primitives)
//!
//! - `Signal<T>` - Observable cells that notify their observers when written
//! - `Effect` - Side effects that re-run when the signals they read change
//!
//! ## Stores (Keyed singletons)
//!
//! - `Store` - A store definition: registration key plus setup
//! - `StoreRegistry` - Builds each store on first use and hands out the same
//!   instance afterwards
//! - `UserStore` - The `"user"` session store with `username`, `email` and
//!   `credits` fields
//!
//! Every runtime owns its own registry, so [`runtime::ReactiveRuntime::scope`]
//! gives tests a fresh set of stores.

pub mod error;
pub mod runtime;
pub mod signal;
pub mod store;

// Re-export main types for convenience
pub use error::StoreError;
pub use signal::{create_effect, Effect, Signal, WatchGuard};
pub use store::{use_store, SessionSnapshot, Store, StoreRegistry, UserStore, USER_STORE_ID};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_works() {
        // Basic smoke test
        runtime::ReactiveRuntime::scope(|| {
            let store = UserStore::get().unwrap();
            assert_eq!(store.username.get(), "");
            store.username.set("alice".to_string());
            assert_eq!(store.username.get(), "alice");
        });
    }
}
