//! Error types for the platform layer and the acoustics binding.

use thiserror::Error;

/// Failures reported by a [`Platform`](crate::platform::Platform) backend.
///
/// Every variant implies that the failing call left the backend exactly as it
/// found it.
#[derive(Error, Debug)]
pub enum PlatformError {
    #[error("failed to initialize the windowing library: {0}")]
    Windowing(String),

    #[error("failed to create window: {0}")]
    WindowCreation(String),

    #[error("JNI call failed: {0}")]
    Jni(String),

    #[error("virtual memory operation failed: {0}")]
    VirtualMemory(String),

    #[error("clipboard error: {0}")]
    Clipboard(String),
}

/// Failures reported by the acoustics engine binding.
#[derive(Error, Debug)]
pub enum AcousticsError {
    #[error("failed to load acoustics library {path}: {reason}")]
    LibraryLoad { path: String, reason: String },

    #[error("acoustics library is missing symbol {0}")]
    MissingSymbol(&'static str),

    #[error("{call} failed with status {status}")]
    Engine { call: &'static str, status: i32 },

    #[error("failed to allocate {0}")]
    Allocation(&'static str),

    #[error("invalid geometry: {0}")]
    InvalidGeometry(String),

    #[error("source index {index} exceeds capacity {capacity}")]
    SourceIndex { index: usize, capacity: usize },

    #[error("spatializer is not initialized")]
    NotInitialized,
}

pub type PlatformResult<T> = std::result::Result<T, PlatformError>;
pub type AcousticsResult<T> = std::result::Result<T, AcousticsError>;
