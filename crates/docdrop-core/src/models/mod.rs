//! Data models for the upload workflow
//!
//! Each sub-module holds one entity of the workflow: the session observed from
//! the identity provider, the pending file selection, the signed upload
//! authorization, the persisted upload record and the workflow status.

mod authorization;
mod record;
mod selection;
mod session;
mod status;

// Re-export all models for convenient imports
pub use authorization::*;
pub use record::*;
pub use selection::*;
pub use session::*;
pub use status::*;
