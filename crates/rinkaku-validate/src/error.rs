//! Error types for validation.

use thiserror::Error;

/// Errors surfaced by the validation layer.
///
/// Divergence is normally collected into result objects, never thrown; the
/// `Mismatch` variant exists for the guard's strict mode only.
#[derive(Error, Debug)]
pub enum ValidateError {
    /// Strict-mode guard detected divergence between the representations.
    #[error("data validation failed after {operation}: {details}")]
    Mismatch { operation: String, details: String },
}
