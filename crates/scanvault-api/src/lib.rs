//! Scanvault API Library
//!
//! HTTP handlers, error rendering and application setup on top of
//! [`scanvault_services::DocumentService`].

mod api_doc;
pub mod constants;
mod handlers;
pub mod setup;
mod telemetry;

pub mod error;
pub mod state;

pub use error::{ErrorResponse, HttpAppError};
pub use state::{AppState, UploadLimits};
