use serde::Deserialize;
use std::fmt;

/// Short-lived, single-use permission to write one object to storage.
///
/// Not `Clone`: the workflow hands it to the object writer by value so it
/// cannot be reused for a second write.
#[derive(PartialEq, Eq, Deserialize)]
pub struct UploadAuthorization {
    pub signed_url: String,
    /// Object name echoed back by the signing backend
    #[serde(default)]
    pub file_name: Option<String>,
}

impl UploadAuthorization {
    pub fn new(signed_url: impl Into<String>) -> Self {
        Self {
            signed_url: signed_url.into(),
            file_name: None,
        }
    }

    /// Signed URL without its query string. The query carries the signature
    /// and must stay out of logs.
    pub fn redacted_url(&self) -> &str {
        self.signed_url
            .split_once('?')
            .map(|(base, _)| base)
            .unwrap_or(&self.signed_url)
    }
}

impl fmt::Debug for UploadAuthorization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadAuthorization")
            .field("signed_url", &self.redacted_url())
            .field("file_name", &self.file_name)
            .finish()
    }
}
