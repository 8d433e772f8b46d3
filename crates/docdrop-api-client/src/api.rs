//! Signing backend methods for the docdrop API client.

use async_trait::async_trait;
use docdrop_core::{Auth, UploadAuthorization, UploadError, UploadSigner};
use reqwest::StatusCode;
use serde::Deserialize;

use crate::ApiClient;

/// Error body returned by the signing backend (`{"detail": ...}`).
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    detail: Option<serde_json::Value>,
}

/// Human-readable reason for a rejected signing request.
///
/// Uses the body's `detail` field when present: a string verbatim, any other
/// JSON value as JSON text. Falls back to the status reason phrase when the
/// body is not JSON or has no usable detail.
pub(crate) fn rejection_detail(status: StatusCode, body: &str) -> String {
    let fallback = status
        .canonical_reason()
        .map(str::to_string)
        .unwrap_or_else(|| status.as_str().to_string());

    match serde_json::from_str::<ErrorBody>(body) {
        Ok(ErrorBody {
            detail: Some(serde_json::Value::String(detail)),
        }) if !detail.is_empty() => detail,
        Ok(ErrorBody {
            detail: Some(detail),
        }) if !detail.is_null() && !detail.is_string() => detail.to_string(),
        _ => fallback,
    }
}

impl ApiClient {
    /// Ask the backend for a signed URL allowing one PUT of `file_name`.
    pub async fn request_signed_url(
        &self,
        file_name: &str,
        content_type: &str,
        auth: &Auth,
    ) -> Result<UploadAuthorization, UploadError> {
        let request = self
            .client()
            .post(self.signing_url())
            .query(&[("file_name", file_name), ("content_type", content_type)]);
        let request = Self::apply_auth(request, auth);

        let response = request
            .send()
            .await
            .map_err(|e| UploadError::AuthorizationTransport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            let detail = rejection_detail(status, &error_text);
            tracing::warn!(
                status = status.as_u16(),
                file_name = %file_name,
                detail = %detail,
                "Signing backend rejected upload authorization"
            );
            return Err(UploadError::AuthorizationRejected {
                status: status.as_u16(),
                detail,
            });
        }

        let authorization: UploadAuthorization = response
            .json()
            .await
            .map_err(|e| UploadError::InvalidAuthorization(e.to_string()))?;

        if authorization.signed_url.is_empty() {
            return Err(UploadError::InvalidAuthorization(
                "signed_url is empty".to_string(),
            ));
        }

        tracing::debug!(
            file_name = %file_name,
            url = %authorization.redacted_url(),
            "Received upload authorization"
        );

        Ok(authorization)
    }
}

#[async_trait]
impl UploadSigner for ApiClient {
    async fn request_authorization(
        &self,
        file_name: &str,
        content_type: &str,
        credential: &Auth,
    ) -> Result<UploadAuthorization, UploadError> {
        self.request_signed_url(file_name, content_type, credential)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn signing_query(file_name: &str, content_type: &str) -> Matcher {
        Matcher::AllOf(vec![
            Matcher::UrlEncoded("file_name".into(), file_name.into()),
            Matcher::UrlEncoded("content_type".into(), content_type.into()),
        ])
    }

    #[test]
    fn rejection_detail_prefers_detail_string() {
        assert_eq!(
            rejection_detail(StatusCode::FORBIDDEN, r#"{"detail":"quota exceeded"}"#),
            "quota exceeded"
        );
    }

    #[test]
    fn rejection_detail_falls_back_to_status_text() {
        assert_eq!(
            rejection_detail(StatusCode::BAD_GATEWAY, "<html>bad gateway</html>"),
            "Bad Gateway"
        );
        assert_eq!(
            rejection_detail(StatusCode::UNAUTHORIZED, r#"{"message":"nope"}"#),
            "Unauthorized"
        );
        assert_eq!(
            rejection_detail(StatusCode::FORBIDDEN, r#"{"detail":""}"#),
            "Forbidden"
        );
    }

    #[test]
    fn rejection_detail_renders_structured_detail() {
        let detail = rejection_detail(
            StatusCode::UNPROCESSABLE_ENTITY,
            r#"{"detail":[{"loc":["query","file_name"],"msg":"field required"}]}"#,
        );
        assert!(detail.contains("field required"));
    }

    #[tokio::test]
    async fn request_signed_url_with_api_key() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/generate-signed-url/")
            .match_query(signing_query("invoice.pdf", "application/pdf"))
            .match_header("x-api-key", "secret")
            .match_header("authorization", Matcher::Missing)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"signed_url":"https://storage.example/u1/invoice.pdf?sig=abc","file_name":"invoice.pdf"}"#,
            )
            .create_async()
            .await;

        let client = ApiClient::with_base_url(server.url()).unwrap();
        let authorization = client
            .request_signed_url(
                "invoice.pdf",
                "application/pdf",
                &Auth::XApiKey("secret".to_string()),
            )
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(
            authorization.signed_url,
            "https://storage.example/u1/invoice.pdf?sig=abc"
        );
        assert_eq!(authorization.file_name.as_deref(), Some("invoice.pdf"));
    }

    #[tokio::test]
    async fn request_signed_url_with_bearer_token() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/generate-signed-url/")
            .match_query(signing_query("photo.png", "image/png"))
            .match_header("authorization", "Bearer tok-123")
            .match_header("x-api-key", Matcher::Missing)
            .with_status(200)
            .with_body(r#"{"signed_url":"https://storage.example/photo.png?sig=1"}"#)
            .create_async()
            .await;

        let client = ApiClient::with_base_url(server.url()).unwrap();
        let authorization = client
            .request_signed_url("photo.png", "image/png", &Auth::Bearer("tok-123".to_string()))
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(authorization.file_name, None);
    }

    #[tokio::test]
    async fn request_signed_url_forbidden_uses_detail() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/generate-signed-url/")
            .match_query(Matcher::Any)
            .with_status(403)
            .with_body(r#"{"detail":"quota exceeded"}"#)
            .create_async()
            .await;

        let client = ApiClient::with_base_url(server.url()).unwrap();
        let err = client
            .request_signed_url("invoice.pdf", "application/pdf", &Auth::XApiKey("k".into()))
            .await
            .unwrap_err();

        match err {
            UploadError::AuthorizationRejected { status, detail } => {
                assert_eq!(status, 403);
                assert_eq!(detail, "quota exceeded");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn request_signed_url_without_json_body_uses_status_text() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/generate-signed-url/")
            .match_query(Matcher::Any)
            .with_status(500)
            .with_body("upstream exploded")
            .create_async()
            .await;

        let client = ApiClient::with_base_url(server.url()).unwrap();
        let err = client
            .request_signed_url("a.pdf", "application/pdf", &Auth::XApiKey("k".into()))
            .await
            .unwrap_err();

        assert!(err.is_authorization_failure());
        assert!(matches!(
            err,
            UploadError::AuthorizationRejected { status: 500, ref detail } if detail == "Internal Server Error"
        ));
    }

    #[tokio::test]
    async fn request_signed_url_with_malformed_success_body() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/generate-signed-url/")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"url":"missing-field"}"#)
            .create_async()
            .await;

        let client = ApiClient::with_base_url(server.url()).unwrap();
        let err = client
            .request_signed_url("a.pdf", "application/pdf", &Auth::XApiKey("k".into()))
            .await
            .unwrap_err();

        assert!(matches!(err, UploadError::InvalidAuthorization(_)));
    }

    #[tokio::test]
    async fn request_signed_url_unreachable_backend() {
        // Port 9 (discard) is not expected to accept HTTP connections.
        let client = ApiClient::with_base_url("http://127.0.0.1:9").unwrap();
        let err = client
            .request_signed_url("a.pdf", "application/pdf", &Auth::XApiKey("k".into()))
            .await
            .unwrap_err();

        assert!(matches!(err, UploadError::AuthorizationTransport(_)));
    }
}
