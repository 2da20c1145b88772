//! Bridge error taxonomy
//!
//! Three failure families share one enum: usage errors the bridge raises
//! before touching native code (buffer sizing, missing RNG, bad data files),
//! resource errors from loading and construction, and evaluation errors
//! reported by the model library through the out-of-band message channel.

use std::ffi::NulError;
use std::path::PathBuf;
use std::str::Utf8Error;
use thiserror::Error;

/// Bridge errors
#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Failed to open model library {path}: {source}")]
    LibraryOpen {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to load model library: {0}")]
    Load(#[from] libloading::Error),

    #[error("Failed to read data file {path}: {source}")]
    DataFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Data payload contains a nul byte: {0}")]
    InvalidData(#[from] NulError),

    #[error("Construction failed: {0}")]
    Construct(String),

    #[error("{operation} failed: {message}")]
    Evaluation {
        operation: &'static str,
        message: String,
    },

    #[error("Buffer '{name}' has length {got} but {want} is required")]
    BufferLength {
        name: &'static str,
        got: usize,
        want: usize,
    },

    #[error("Generated quantities requested but no RNG was provided")]
    MissingRng,

    #[error("RNG belongs to a different loaded library than the model")]
    LibraryMismatch,

    #[error("Model '{0}' does not report a thread-safe build")]
    SingleThreadedBuild(String),

    #[error("Native string is not valid UTF-8: {0}")]
    InvalidString(#[from] Utf8Error),
}

/// Result type for bridge operations
pub type Result<T> = std::result::Result<T, BridgeError>;
