use thiserror::Error;

/// Errors raised by the store registry.
///
/// Reading and writing store fields cannot fail; only resolving a store
/// whose key is already taken by a different type can.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum StoreError {
    #[error("store `{id}` is registered as `{registered}`, not `{requested}`")]
    KeyConflict {
        id: &'static str,
        registered: &'static str,
        requested: &'static str,
    },
}

pub type Result<T, E = StoreError> = std::result::Result<T, E>;
