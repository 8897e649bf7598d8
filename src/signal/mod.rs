//! Fine-grained reactive primitives.
//!
//! - Signals: observable cells
//! - Effects: side effects that react to the signals they read

mod effect;
#[allow(clippy::module_inception)]
mod signal;

pub use effect::{create_effect, Effect};
pub use signal::{Signal, WatchGuard};
