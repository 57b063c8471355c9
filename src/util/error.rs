//! Error types for the baker.

use thiserror::Error;

/// Main error type for baking operations.
#[derive(Error, Debug)]
pub enum Error {
    /// A parameter is out of range or inconsistent with the map size
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Two maps that must share a resolution do not
    #[error("Dimension mismatch: {what} is {actual_w}x{actual_h}, expected {expected_w}x{expected_h}")]
    DimensionMismatch {
        what: &'static str,
        expected_w: u32,
        expected_h: u32,
        actual_w: u32,
        actual_h: u32,
    },

    /// Mesh attribute arrays or faces are inconsistent
    #[error("Invalid mesh: {0}")]
    InvalidMesh(String),

    /// Pixel buffer length does not match its dimensions
    #[error("Invalid image: {0}")]
    InvalidImage(String),

    /// Intersection service was queried before a successful commit
    #[error("Geometry has not been committed")]
    NotCommitted,

    /// Acceleration structure build failed
    #[error("Geometry commit failed: {0}")]
    CommitFailed(String),

    /// Unknown geometry id passed to the intersection service
    #[error("Geometry not found: {0}")]
    GeometryNotFound(u32),

    /// A worker panicked; the partially written map is discarded
    #[error("Worker panicked: {0}")]
    WorkerPanicked(String),

    /// The pool shut down before a task reported back
    #[error("Worker pool closed before the task completed")]
    PoolClosed,

    /// Unknown procedural scene name
    #[error("Unknown scene: {0}")]
    UnknownScene(String),

    /// Image encoding failed
    #[error("Image codec error: {0}")]
    Codec(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration file could not be parsed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create a configuration error from a string.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Create an invalid mesh error.
    pub fn mesh(msg: impl Into<String>) -> Self {
        Self::InvalidMesh(msg.into())
    }

    /// Extract a readable message from a panic payload.
    pub fn from_panic(payload: Box<dyn std::any::Any + Send>) -> Self {
        let msg = payload
            .downcast_ref::<String>()
            .map(|s| s.as_str())
            .or_else(|| payload.downcast_ref::<&str>().copied())
            .unwrap_or("unknown panic")
            .to_string();
        Self::WorkerPanicked(msg)
    }
}

/// Result type alias for baking operations.
pub type Result<T> = std::result::Result<T, Error>;
