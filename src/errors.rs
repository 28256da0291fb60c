//! Error Types
//!
//! This module defines the error types used throughout the library.
//!
//! # Overview
//!
//! The main error type [`ImportError`] covers all failure modes including:
//! - Missing input files and probe failures
//! - Loader decode errors
//! - Post-processing stage failures
//! - Scene validation errors
//!
//! # Usage
//!
//! Internal APIs return [`Result<T>`], an alias for
//! `std::result::Result<T, ImportError>`. The public [`Importer`] surface
//! never propagates these out of a call: a failed import returns no scene and
//! stores the message for retrieval via `Importer::error_string`.
//!
//! [`Importer`]: crate::importer::Importer

use thiserror::Error;

/// The main error type for the import library.
#[derive(Error, Debug)]
pub enum ImportError {
    // ========================================================================
    // Probe & Dispatch Errors
    // ========================================================================
    /// The input path does not exist on the active IO system.
    #[error("Unable to open file {0}")]
    MissingFile(String),

    /// Neither the extension pass nor the signature pass selected a loader.
    #[error("No suitable reader found for the file format of {0}")]
    NoLoader(String),

    /// A loader was looked up by name but is not registered.
    #[error("Loader not found: {0}")]
    LoaderNotFound(String),

    // ========================================================================
    // Decode Errors
    // ========================================================================
    /// A loader rejected or failed to decode the input.
    #[error("{0}")]
    Decode(String),

    /// A loader or stage panicked; caught at the dispatcher boundary.
    ///
    /// The dispatcher remains usable for further imports, but a loader that
    /// has panicked mid-decode may have left its own internal state
    /// unreliable.
    #[error("Import of {path} crashed unexpectedly: {message}")]
    CrashedUnexpectedly {
        /// Path of the file being imported when the panic occurred
        path: String,
        /// Stringified panic payload, or a generic tag
        message: String,
    },

    // ========================================================================
    // I/O Errors
    // ========================================================================
    /// File I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // ========================================================================
    // Post-Processing Errors
    // ========================================================================
    /// The data-structure validation stage detected an invariant violation.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// A pipeline stage failed fatally.
    #[error("Post-processing stage {stage} failed: {message}")]
    StageFailed {
        /// Name of the failing stage
        stage: &'static str,
        /// Human-readable reason
        message: String,
    },

    /// Shared pass state was observed in a configuration that can only be
    /// produced by a broken stage ordering.
    #[error("Pipeline ordering broken: {0}")]
    OrderingBroken(String),
}

/// Alias for `Result<T, ImportError>`.
pub type Result<T> = std::result::Result<T, ImportError>;
