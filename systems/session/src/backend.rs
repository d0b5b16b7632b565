//! Transport seam to the world-generation service.

use prompt_world_core::snapshot::{GenerateRequest, ModifyRequest};
use thiserror::Error;

/// Errors raised while talking to the world-generation service.
#[derive(Debug, Error)]
pub enum BackendError {
    /// The request never produced a response.
    #[error("world service request failed: {0}")]
    Transport(String),
    /// The service answered with a non-success status.
    #[error("world service answered {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, kept for diagnostics.
        body: String,
    },
}

/// Source of world snapshots.
///
/// Implementations return the raw response body; parsing and validation
/// happen in the session so that every transport shares them.
pub trait WorldBackend {
    /// Sends `POST /generate-world`.
    fn generate_world(&mut self, request: &GenerateRequest) -> Result<String, BackendError>;

    /// Sends `PATCH /modify-world`.
    fn modify_world(&mut self, request: &ModifyRequest) -> Result<String, BackendError>;
}

impl<B: WorldBackend + ?Sized> WorldBackend for &mut B {
    fn generate_world(&mut self, request: &GenerateRequest) -> Result<String, BackendError> {
        (**self).generate_world(request)
    }

    fn modify_world(&mut self, request: &ModifyRequest) -> Result<String, BackendError> {
        (**self).modify_world(request)
    }
}
