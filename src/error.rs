use thiserror::Error;

/// Configuration rejected at construction time. Runtime tactical errors
/// ("target died", "no route") are not errors at all; they are handled by
/// re-acquisition on the next tick.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{field} must be at least {minimum}, got {value}")]
    BelowMinimum {
        field: &'static str,
        minimum: i64,
        value: i64,
    },
}

/// Failure to decode a diagnostic snapshot produced by `memory::encode`.
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("snapshot is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("snapshot decompression failed: {0}")]
    Decompress(#[from] std::io::Error),
    #[error("snapshot payload corrupt: {0}")]
    Codec(#[from] bincode::Error),
}
