//! reqwest implementation of the backend API

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::{Client, Response, Url};
use serde::de::DeserializeOwned;

use super::error::error_detail;
use super::types::{
    AuthStatus, FlagsResponse, HistoryResponse, RevertResponse, SaveFlagsRequest, SessionDetails,
    SortSession, SortStatus, StartSortRequest,
};
use super::{ApiError, ApiResult, Backend};
use crate::flags::Flag;

/// HTTP client for the flagging backend.
///
/// The cookie store carries the backend session between requests.
#[derive(Clone)]
pub struct HttpBackend {
    client: Client,
    base_url: Url,
}

impl HttpBackend {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .with_context(|| format!("Invalid backend URL: {}", base_url))?;
        if base_url.cannot_be_a_base() {
            anyhow::bail!("Backend URL cannot have paths appended: {}", base_url);
        }

        let client = Client::builder()
            .cookie_store(true)
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Build an endpoint URL; every segment is percent-encoded
    fn endpoint(&self, segments: &[&str]) -> ApiResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::Decode(format!("bad base URL {}", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(&self, segments: &[&str]) -> ApiResult<T> {
        let url = self.endpoint(segments)?;
        tracing::debug!("GET {}", url);
        let response = self.client.get(url).send().await?;
        Ok(check(response).await?.json().await?)
    }

    async fn post_empty(&self, segments: &[&str]) -> ApiResult<Response> {
        let url = self.endpoint(segments)?;
        tracing::debug!("POST {}", url);
        let response = self.client.post(url).send().await?;
        check(response).await
    }
}

/// Turn non-2xx responses into `ApiError::Status` with the backend's detail
async fn check(response: Response) -> ApiResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let detail = error_detail(&body);
    tracing::warn!("Backend error {}: {}", status, detail);
    Err(ApiError::status(status.as_u16(), detail))
}

impl Backend for HttpBackend {
    fn login_url(&self) -> String {
        self.endpoint(&["auth", "login"])
            .map(|u| u.to_string())
            .unwrap_or_else(|_| format!("{}/auth/login", self.base_url))
    }

    async fn auth_status(&self) -> ApiResult<AuthStatus> {
        self.get_json(&["auth", "status"]).await
    }

    async fn logout(&self) -> ApiResult<()> {
        self.post_empty(&["auth", "logout"]).await?;
        Ok(())
    }

    async fn load_flags(&self, email: &str) -> ApiResult<Vec<Flag>> {
        let response: FlagsResponse = self.get_json(&["flags", "load", email]).await?;
        Ok(response.flags)
    }

    async fn save_flags(&self, email: &str, flags: &[Flag]) -> ApiResult<()> {
        let url = self.endpoint(&["flags", "save"])?;
        tracing::debug!("POST {} ({} flags)", url, flags.len());
        let response = self
            .client
            .post(url)
            .json(&SaveFlagsRequest { email, flags })
            .send()
            .await?;
        check(response).await?;
        Ok(())
    }

    async fn start_sort(&self, email: &str, active_flags: &[String]) -> ApiResult<()> {
        let url = self.endpoint(&["sorting", "start"])?;
        tracing::debug!("POST {} flags={:?}", url, active_flags);
        let response = self
            .client
            .post(url)
            .json(&StartSortRequest {
                email,
                active_flags,
            })
            .send()
            .await?;
        check(response).await?;
        Ok(())
    }

    async fn sort_status(&self, email: &str) -> ApiResult<SortStatus> {
        self.get_json(&["sorting", "status", email]).await
    }

    async fn revert(&self, email: &str) -> ApiResult<RevertResponse> {
        let response = self.post_empty(&["sorting", "revert", email]).await?;
        Ok(response.json().await?)
    }

    async fn sort_history(&self, email: &str) -> ApiResult<Vec<SortSession>> {
        let response: HistoryResponse = self.get_json(&["sorting", "history", email]).await?;
        Ok(response.history)
    }

    async fn session_details(&self, session_id: &str) -> ApiResult<SessionDetails> {
        self.get_json(&["sorting", "session", session_id, "details"])
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend(base: &str) -> HttpBackend {
        HttpBackend::new(base, Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_endpoint_encodes_segments() {
        let api = backend("http://localhost:8000");
        let url = api.endpoint(&["flags", "load", "a b@example.com"]).unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:8000/flags/load/a%20b@example.com"
        );
    }

    #[test]
    fn test_endpoint_keeps_base_path() {
        let api = backend("https://example.com/api/");
        let url = api.endpoint(&["sorting", "status", "me@example.com"]).unwrap();
        assert_eq!(
            url.as_str(),
            "https://example.com/api/sorting/status/me@example.com"
        );
    }

    #[test]
    fn test_login_url() {
        let api = backend("http://localhost:8000");
        assert_eq!(api.login_url(), "http://localhost:8000/auth/login");
    }

    #[test]
    fn test_rejects_invalid_base() {
        assert!(HttpBackend::new("not a url", Duration::from_secs(1)).is_err());
        assert!(HttpBackend::new("mailto:me@example.com", Duration::from_secs(1)).is_err());
    }
}
