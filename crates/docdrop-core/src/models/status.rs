use serde::Serialize;
use std::fmt::{Display, Formatter, Result as FmtResult};

/// Current phase or result of the most recent upload attempt.
///
/// Only one value is observable at a time; each write replaces the previous one.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "phase", rename_all = "kebab-case")]
pub enum WorkflowStatus {
    #[default]
    Idle,
    Validating,
    RequestingAuthorization,
    Uploading,
    Success {
        file_name: String,
    },
    Failed {
        reason: String,
    },
}

impl WorkflowStatus {
    pub fn failed(reason: impl Into<String>) -> Self {
        WorkflowStatus::Failed {
            reason: reason.into(),
        }
    }

    pub fn success(file_name: impl Into<String>) -> Self {
        WorkflowStatus::Success {
            file_name: file_name.into(),
        }
    }

    /// True once an attempt has finished, successfully or not
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            WorkflowStatus::Success { .. } | WorkflowStatus::Failed { .. }
        )
    }

    pub fn is_success(&self) -> bool {
        matches!(self, WorkflowStatus::Success { .. })
    }

    /// Failure reason, if this status is a failure
    pub fn failure_reason(&self) -> Option<&str> {
        match self {
            WorkflowStatus::Failed { reason } => Some(reason),
            _ => None,
        }
    }
}

impl Display for WorkflowStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            WorkflowStatus::Idle => Ok(()),
            WorkflowStatus::Validating => write!(f, "Checking selection..."),
            WorkflowStatus::RequestingAuthorization => write!(f, "Requesting upload URL..."),
            WorkflowStatus::Uploading => write!(f, "Uploading..."),
            WorkflowStatus::Success { file_name } => {
                write!(f, "File \"{}\" uploaded successfully.", file_name)
            }
            WorkflowStatus::Failed { reason } => write!(f, "An error occurred: {}", reason),
        }
    }
}
