//! Keyed singleton stores.
//!
//! A store is defined once with the [`Store`] trait and resolved by key
//! through the runtime's [`StoreRegistry`]. The first resolution builds it;
//! later ones return the same instance.

mod registry;
mod user;

pub use registry::{use_store, Store, StoreRegistry};
pub use user::{SessionSnapshot, UserStore, USER_STORE_ID};
