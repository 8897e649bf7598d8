//! Runtime support for reactive primitives.
//!
//! This module provides the infrastructure for dependency tracking,
//! the observer graph, and the store registry each runtime owns.

mod context;

pub use context::ReactiveRuntime;
pub(crate) use context::RuntimeInner;
