//! Error types for the overlay resolver.
//!
//! - [`OverlayError`]: top-level errors for loading, resolving and emitting overlays.
//!
//! Findings about the overlay content itself are reported as
//! [`Diagnostic`](crate::dsl::Diagnostic)s; a failed pipeline wraps them in
//! [`OverlayError::ValidationFailed`].

pub mod overlay_error;

pub use overlay_error::OverlayError;

/// Convenience alias for overlay-level results.
pub type OverlayResult<T> = Result<T, OverlayError>;
