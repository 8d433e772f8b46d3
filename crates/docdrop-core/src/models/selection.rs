use bytes::Bytes;
use std::fmt;

/// File chosen by the user for upload. Held in memory only, never persisted.
#[derive(Clone, PartialEq, Eq)]
pub struct PendingSelection {
    pub name: String,
    pub content_type: String,
    pub payload: Bytes,
}

impl PendingSelection {
    pub fn new(
        name: impl Into<String>,
        content_type: impl Into<String>,
        payload: impl Into<Bytes>,
    ) -> Self {
        Self {
            name: name.into(),
            content_type: content_type.into(),
            payload: payload.into(),
        }
    }

    /// Payload size in bytes
    pub fn size(&self) -> usize {
        self.payload.len()
    }
}

impl fmt::Debug for PendingSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingSelection")
            .field("name", &self.name)
            .field("content_type", &self.content_type)
            .field("size", &self.size())
            .finish()
    }
}
