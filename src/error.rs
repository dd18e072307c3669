//! Error types for the cache.

use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by cache construction and cache operations.
///
/// The display strings are stable API: callers match on them across
/// language bindings.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    // =========================================================================
    // Construction Errors
    // =========================================================================
    /// Shard count outside the supported range
    #[error("invalid count of shards")]
    InvalidShardCount,

    /// Non-positive entry limit
    #[error("invalid size")]
    InvalidMaxSize,

    /// Negative default time-to-live
    #[error("invalid cache time to live")]
    InvalidTtl,

    /// No eviction policy was selected
    #[error("invalid kind of cache")]
    InvalidKind,

    // =========================================================================
    // Routing Errors
    // =========================================================================
    /// The key carries no value to hash (e.g. an `Option` key of `None`)
    #[error("key is nil")]
    KeyIsNil,

    /// The key type cannot produce a dispersion hash
    #[error("invalid key type for hash function")]
    InvalidKeyTypeForHash,

    // =========================================================================
    // Operation Errors
    // =========================================================================
    /// Lookup miss with no loader configured
    #[error("not found")]
    NotFound,

    /// A configured loader failed; its message is passed through verbatim
    #[error("{0}")]
    Loader(String),
}
