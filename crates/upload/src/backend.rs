//! Metadata backend: negotiate a destination, then confirm the upload.
//!
//! [`UploadBackend`] is the seam the pipeline talks through. [`HttpBackend`]
//! is the reqwest implementation; tests substitute their own.

use std::future::Future;
use std::pin::Pin;

use reqwest::StatusCode;
use tracing::{debug, info};
use vidingest_protocol::{
    ApiError, ConfirmUploadRequest, ConfirmUploadResponse, NegotiateUploadRequest,
    NegotiateUploadResponse, parse_api_payload,
};

use crate::config::UploaderConfig;
use crate::error::UploadError;

/// Backend calls made around the transfer.
///
/// Implementations return [`UploadError::Negotiation`] from `negotiate` and
/// [`UploadError::Verification`] from `confirm`, carrying the server message
/// when one was supplied.
pub trait UploadBackend: Send + Sync {
    /// Exchanges file metadata (and optional digest) for a destination.
    fn negotiate<'a>(
        &'a self,
        request: &'a NegotiateUploadRequest,
    ) -> Pin<Box<dyn Future<Output = Result<NegotiateUploadResponse, UploadError>> + Send + 'a>>;

    /// Finalizes the asset record after the bytes have landed.
    fn confirm<'a>(
        &'a self,
        request: &'a ConfirmUploadRequest,
    ) -> Pin<Box<dyn Future<Output = Result<(), UploadError>> + Send + 'a>>;
}

/// [`UploadBackend`] over HTTP with bearer authentication.
pub struct HttpBackend {
    client: reqwest::Client,
    negotiate_url: String,
    confirm_url: String,
    auth_token: Option<String>,
}

impl HttpBackend {
    /// Creates a backend client. The token, if any, is sent as
    /// `Authorization: Bearer <token>` on every call.
    pub fn new(client: reqwest::Client, config: &UploaderConfig, auth_token: Option<String>) -> Self {
        Self {
            client,
            negotiate_url: config.negotiate_url(),
            confirm_url: config.confirm_url(),
            auth_token: auth_token.filter(|t| !t.is_empty()),
        }
    }

    fn post<T: serde::Serialize>(&self, url: &str, body: &T) -> reqwest::RequestBuilder {
        let builder = self.client.post(url).json(body);
        match &self.auth_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn do_negotiate(
        &self,
        request: &NegotiateUploadRequest,
    ) -> Result<NegotiateUploadResponse, UploadError> {
        debug!(
            url = %self.negotiate_url,
            filename = %request.filename,
            size = request.file_size,
            with_digest = request.sha256hex.is_some(),
            "negotiating upload"
        );

        let response = self
            .post(&self.negotiate_url, request)
            .send()
            .await
            .map_err(|e| UploadError::Negotiation(format!("request failed: {e}")))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| UploadError::Negotiation(format!("failed to read response: {e}")))?;

        if !status.is_success() {
            return Err(UploadError::Negotiation(server_message(
                &body,
                format!("server error {}", status.as_u16()),
            )));
        }

        let negotiated: NegotiateUploadResponse = parse_api_payload(&body)
            .map_err(|e| UploadError::Negotiation(format!("invalid response: {e}")))?;
        info!(
            asset_id = %negotiated.video_id,
            object_key = %negotiated.object_key,
            "upload destination issued"
        );
        Ok(negotiated)
    }

    async fn do_confirm(&self, request: &ConfirmUploadRequest) -> Result<(), UploadError> {
        debug!(url = %self.confirm_url, asset_id = %request.video_id, "confirming upload");

        let response = self
            .post(&self.confirm_url, request)
            .send()
            .await
            .map_err(|e| UploadError::Verification(format!("request failed: {e}")))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| UploadError::Verification(format!("failed to read response: {e}")))?;

        if !status.is_success() {
            return Err(UploadError::Verification(server_message(
                &body,
                format!("verification failed (status {})", status.as_u16()),
            )));
        }

        // An empty 2xx (e.g. 204) is an acknowledgement.
        if status == StatusCode::NO_CONTENT || body.iter().all(u8::is_ascii_whitespace) {
            return Ok(());
        }
        let ack: ConfirmUploadResponse = serde_json::from_slice(&body).unwrap_or_default();
        if !ack.is_acknowledged() {
            return Err(UploadError::Verification(server_message(
                &body,
                "backend rejected the upload".into(),
            )));
        }
        Ok(())
    }
}

impl UploadBackend for HttpBackend {
    fn negotiate<'a>(
        &'a self,
        request: &'a NegotiateUploadRequest,
    ) -> Pin<Box<dyn Future<Output = Result<NegotiateUploadResponse, UploadError>> + Send + 'a>>
    {
        Box::pin(self.do_negotiate(request))
    }

    fn confirm<'a>(
        &'a self,
        request: &'a ConfirmUploadRequest,
    ) -> Pin<Box<dyn Future<Output = Result<(), UploadError>> + Send + 'a>> {
        Box::pin(self.do_confirm(request))
    }
}

fn server_message(body: &[u8], fallback: String) -> String {
    ApiError::message_from_body(body).unwrap_or(fallback)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use serde_json::json;

    fn backend(server: &mockito::Server, token: Option<&str>) -> HttpBackend {
        let config = UploaderConfig::with_base_url(server.url());
        HttpBackend::new(reqwest::Client::new(), &config, token.map(String::from))
    }

    fn negotiate_request(digest: Option<&str>) -> NegotiateUploadRequest {
        NegotiateUploadRequest {
            filename: "clip.mp4".into(),
            content_type: "video/mp4".into(),
            file_size: 1024,
            sha256hex: digest.map(String::from),
        }
    }

    #[tokio::test]
    async fn negotiate_sends_metadata_and_token() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/v2/admin/videos/upload-url")
            .match_header("authorization", "Bearer secret")
            .match_body(Matcher::Json(json!({
                "filename": "clip.mp4",
                "contentType": "video/mp4",
                "fileSize": 1024,
                "sha256hex": null,
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"success":true,"data":{"videoId":"v1","uploadUrl":"https://store/put","objectKey":"videos/v1.mp4","expiresAt":"2026-01-01T00:00:00Z","mode":"B"}}"#,
            )
            .create_async()
            .await;

        let negotiated = backend(&server, Some("secret"))
            .negotiate(&negotiate_request(None))
            .await
            .unwrap();
        assert_eq!(negotiated.video_id, "v1");
        assert_eq!(negotiated.object_key, "videos/v1.mp4");
        assert!(negotiated.expires_at.is_some());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn negotiate_without_token_sends_no_auth() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/v2/admin/videos/upload-url")
            .match_header("authorization", Matcher::Missing)
            .with_status(200)
            .with_body(r#"{"videoId":"v1","uploadUrl":"https://store/put","objectKey":"k"}"#)
            .create_async()
            .await;

        backend(&server, None)
            .negotiate(&negotiate_request(Some(&"ab".repeat(32))))
            .await
            .unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn negotiate_passes_server_message_through() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/api/v2/admin/videos/upload-url")
            .with_status(500)
            .with_body(r#"{"error":"quota exceeded"}"#)
            .create_async()
            .await;

        let err = backend(&server, None)
            .negotiate(&negotiate_request(None))
            .await
            .unwrap_err();
        assert!(matches!(err, UploadError::Negotiation(ref m) if m == "quota exceeded"));
    }

    #[tokio::test]
    async fn negotiate_falls_back_to_status() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/api/v2/admin/videos/upload-url")
            .with_status(502)
            .with_body("<html>bad gateway</html>")
            .create_async()
            .await;

        let err = backend(&server, None)
            .negotiate(&negotiate_request(None))
            .await
            .unwrap_err();
        assert_eq!(err.detail(), "server error 502");
    }

    #[tokio::test]
    async fn negotiate_rejects_incomplete_payload() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/api/v2/admin/videos/upload-url")
            .with_status(200)
            .with_body(r#"{"success":true,"data":{"videoId":"v1"}}"#)
            .create_async()
            .await;

        let err = backend(&server, None)
            .negotiate(&negotiate_request(None))
            .await
            .unwrap_err();
        assert!(matches!(err, UploadError::Negotiation(_)));
    }

    #[tokio::test]
    async fn confirm_accepts_success_and_empty_bodies() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/v2/admin/videos/upload-complete")
            .match_body(Matcher::Json(json!({"videoId": "v1", "objectKey": "k"})))
            .with_status(200)
            .with_body(r#"{"success":true,"data":{"id":"v1"}}"#)
            .create_async()
            .await;

        let request = ConfirmUploadRequest {
            video_id: "v1".into(),
            object_key: "k".into(),
        };
        backend(&server, None).confirm(&request).await.unwrap();
        mock.assert_async().await;

        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/api/v2/admin/videos/upload-complete")
            .with_status(204)
            .create_async()
            .await;
        backend(&server, None).confirm(&request).await.unwrap();
    }

    #[tokio::test]
    async fn confirm_failure_messages() {
        let request = ConfirmUploadRequest {
            video_id: "v1".into(),
            object_key: "k".into(),
        };

        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/api/v2/admin/videos/upload-complete")
            .with_status(409)
            .with_body(r#"{"success":false,"error":"object missing"}"#)
            .create_async()
            .await;
        let err = backend(&server, None).confirm(&request).await.unwrap_err();
        assert!(matches!(err, UploadError::Verification(ref m) if m == "object missing"));

        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/api/v2/admin/videos/upload-complete")
            .with_status(500)
            .create_async()
            .await;
        let err = backend(&server, None).confirm(&request).await.unwrap_err();
        assert_eq!(err.detail(), "verification failed (status 500)");

        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/api/v2/admin/videos/upload-complete")
            .with_status(200)
            .with_body(r#"{"success":false,"error":"checksum mismatch"}"#)
            .create_async()
            .await;
        let err = backend(&server, None).confirm(&request).await.unwrap_err();
        assert_eq!(err.detail(), "checksum mismatch");
    }
}
