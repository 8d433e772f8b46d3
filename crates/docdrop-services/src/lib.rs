//! Docdrop Services Layer
//!
//! Hosts the signed-upload workflow controller and the two thin observers it
//! depends on: the session observer (identity provider) and the record feed
//! observer (metadata store). Collaborators are injected as capability
//! handles from `docdrop-core`, so the controller runs unchanged against the
//! HTTP clients, the Postgres store or test doubles.

pub mod feed;
pub mod session;
pub mod workflow;

pub use feed::RecordFeedObserver;
pub use session::{SessionHub, SessionObserver};
pub use workflow::{UploadWorkflow, WorkflowCollaborators, WorkflowOptions};
