use std::time::Duration;

use reqwest::{header, Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::time::sleep;
use tracing::{debug, error, warn};

use crate::constants::{THROTTLE_BACKOFF_SECS, THROTTLE_RETRIES};
use crate::error::AppError;

/// HTTP client for a single Mastodon instance, optionally authenticated.
///
/// Throttling responses (429) are paced: the request is retried after the
/// server-provided `Retry-After` window, a bounded number of times, before
/// `RateLimitExceeded` surfaces to the caller.
#[derive(Debug)]
pub struct MastodonHttpClient {
    client: Client,
    base_url: String,
    access_token: Option<String>,
}

impl MastodonHttpClient {
    pub fn new(base_url: &str, access_token: Option<&str>) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            access_token: access_token.map(str::to_string),
        })
    }

    pub async fn get<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T, AppError> {
        let url = format!("{}{}", self.base_url, endpoint);
        debug!("GET {}", url);

        let response = self
            .send_with_pacing(|| self.apply_auth(self.client.get(&url)))
            .await?;
        Self::handle_response(response).await
    }

    /// Sends a form-encoded POST, as the OAuth token endpoint expects.
    pub async fn post_form<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        endpoint: &str,
        form: &B,
    ) -> Result<T, AppError> {
        let url = format!("{}{}", self.base_url, endpoint);
        debug!("POST {}", url);

        let response = self
            .send_with_pacing(|| self.apply_auth(self.client.post(&url).form(form)))
            .await?;
        Self::handle_response(response).await
    }

    pub async fn delete<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T, AppError> {
        let url = format!("{}{}", self.base_url, endpoint);
        debug!("DELETE {}", url);

        let response = self
            .send_with_pacing(|| self.apply_auth(self.client.delete(&url)))
            .await?;
        Self::handle_response(response).await
    }

    fn apply_auth(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.access_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send_with_pacing<F>(&self, build: F) -> Result<Response, AppError>
    where
        F: Fn() -> RequestBuilder,
    {
        let mut attempts = 0;
        loop {
            let response = build().send().await?;
            if response.status() != StatusCode::TOO_MANY_REQUESTS {
                return Ok(response);
            }
            if attempts >= THROTTLE_RETRIES {
                return Err(AppError::RateLimitExceeded);
            }
            attempts += 1;

            let wait = Self::retry_after(&response);
            warn!(
                "Rate limited, retrying in {}s (attempt {}/{})",
                wait.as_secs(),
                attempts,
                THROTTLE_RETRIES
            );
            sleep(wait).await;
        }
    }

    fn retry_after(response: &Response) -> Duration {
        response
            .headers()
            .get(header::RETRY_AFTER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(THROTTLE_BACKOFF_SECS))
    }

    async fn handle_response<T: DeserializeOwned>(response: Response) -> Result<T, AppError> {
        let status = response.status();
        let body = response.text().await?;
        debug!("Response status: {}", status);

        if status.is_success() {
            return Ok(serde_json::from_str(&body)?);
        }

        match status {
            StatusCode::UNAUTHORIZED => Err(AppError::Unauthorized),
            StatusCode::NOT_FOUND => Err(AppError::NotFound),
            _ => {
                error!("API request failed. Status: {}, Body: {}", status, body);
                Err(AppError::Unexpected(status))
            }
        }
    }
}

#[cfg(test)]
mod tests_http_client {
    use super::*;
    use crate::utils::logger::setup_logger;
    use mockito::{Matcher, Server};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[tokio::test]
    async fn test_get_request() {
        setup_logger();
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/test")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"message": "success"}"#)
            .create_async()
            .await;

        let client = MastodonHttpClient::new(&server.url(), None).unwrap();
        let result: serde_json::Value = client.get("/test").await.unwrap();

        assert_eq!(result["message"], "success");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_bearer_token_attached() {
        setup_logger();
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/test")
            .match_header("authorization", "Bearer tok-123")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body("{}")
            .create_async()
            .await;

        let client = MastodonHttpClient::new(&server.url(), Some("tok-123")).unwrap();
        let _: serde_json::Value = client.get("/test").await.unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_post_form_request() {
        setup_logger();
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/oauth/token")
            .match_header("content-type", "application/x-www-form-urlencoded")
            .match_body(Matcher::AllOf(vec![
                Matcher::UrlEncoded("grant_type".into(), "password".into()),
                Matcher::UrlEncoded("username".into(), "bob@example.com".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"access_token": "tok"}"#)
            .create_async()
            .await;

        let client = MastodonHttpClient::new(&server.url(), None).unwrap();
        let form = json!({"grant_type": "password", "username": "bob@example.com"});
        let result: serde_json::Value = client.post_form("/oauth/token", &form).await.unwrap();

        assert_eq!(result["access_token"], "tok");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_delete_request() {
        setup_logger();
        let mut server = Server::new_async().await;
        let mock = server
            .mock("DELETE", "/test")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"message": "deleted"}"#)
            .create_async()
            .await;

        let client = MastodonHttpClient::new(&server.url(), None).unwrap();
        let result: serde_json::Value = client.delete("/test").await.unwrap();

        assert_eq!(result["message"], "deleted");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_unauthorized_mapping() {
        setup_logger();
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/test")
            .with_status(401)
            .with_body("Unauthorized")
            .create_async()
            .await;

        let client = MastodonHttpClient::new(&server.url(), None).unwrap();
        let result: Result<serde_json::Value, AppError> = client.get("/test").await;

        assert!(matches!(result, Err(AppError::Unauthorized)));
    }

    #[tokio::test]
    async fn test_not_found_mapping() {
        setup_logger();
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/missing")
            .with_status(404)
            .with_body("Not Found")
            .create_async()
            .await;

        let client = MastodonHttpClient::new(&server.url(), None).unwrap();
        let result: Result<serde_json::Value, AppError> = client.get("/missing").await;

        assert!(matches!(result, Err(AppError::NotFound)));
    }

    #[tokio::test]
    async fn test_unexpected_status_mapping() {
        setup_logger();
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/boom")
            .with_status(500)
            .with_body("Internal Server Error")
            .create_async()
            .await;

        let client = MastodonHttpClient::new(&server.url(), None).unwrap();
        let result: Result<serde_json::Value, AppError> = client.get("/boom").await;

        assert!(matches!(
            result,
            Err(AppError::Unexpected(StatusCode::INTERNAL_SERVER_ERROR))
        ));
    }

    #[tokio::test]
    async fn test_rate_limit_pacing_exhausts() {
        setup_logger();
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/test")
            .with_status(429)
            .with_header("Retry-After", "0")
            .with_body(r#"{"error": "Too many requests"}"#)
            .expect(1 + THROTTLE_RETRIES as usize)
            .create_async()
            .await;

        let client = MastodonHttpClient::new(&server.url(), None).unwrap();
        let result: Result<serde_json::Value, AppError> = client.get("/test").await;

        assert!(matches!(result, Err(AppError::RateLimitExceeded)));
        mock.assert_async().await;
    }
}
