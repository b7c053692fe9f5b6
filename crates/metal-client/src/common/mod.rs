//! Common utilities for the provider API client
//!
//! Provides the authenticated HTTP wrapper shared by all API modules.

use crate::error::MetalError;
use reqwest::Client;
use serde::de::DeserializeOwned;
use tracing::debug;

/// One page of a list response.
///
/// The provider wraps list results in a named envelope (`{"devices": [...],
/// "meta": {...}}`), so pagination is generic over the envelope type rather
/// than a single wrapper struct.
pub trait Page {
    /// Element type of the page
    type Item;

    /// Consume the page, yielding its items
    fn into_items(self) -> Vec<Self::Item>;

    /// Link to the next page, when there is one
    fn next_href(&self) -> Option<String>;
}

/// HTTP client wrapper with authentication
pub struct HttpClient {
    client: Client,
    base_url: String,
    token: String,
}

impl HttpClient {
    /// Create a new HTTP client wrapper
    pub fn new(client: Client, base_url: String, token: String) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        }
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build a full URL from a path
    pub fn build_url(&self, path: &str) -> String {
        if path.starts_with("http") {
            path.to_string()
        } else {
            format!("{}{}", self.base_url, path)
        }
    }

    fn check_auth(status: reqwest::StatusCode, body: &str) -> Result<(), MetalError> {
        if status == 401 || status == 403 {
            return Err(MetalError::Authentication(format!("{} - {}", status, body)));
        }
        Ok(())
    }

    /// Fetch all pages of a list endpoint, following `meta.next` links
    pub async fn fetch_all_pages<P>(&self, mut url: String) -> Result<Vec<P::Item>, MetalError>
    where
        P: Page + DeserializeOwned,
    {
        let mut all_items = Vec::new();

        loop {
            debug!("Fetching page: {}", url);

            let response = self
                .client
                .get(&url)
                .header("X-Auth-Token", &self.token)
                .header("Accept", "application/json")
                .send()
                .await
                .map_err(MetalError::Http)?;

            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                Self::check_auth(status, &body)?;
                return Err(MetalError::Api(format!(
                    "Failed to fetch page: {} - {}",
                    status, body
                )));
            }

            let response_text = response.text().await?;
            let page: P = serde_json::from_str(&response_text).map_err(|e| {
                MetalError::Api(format!(
                    "error decoding response body: {} - Response (first 500 chars): {}",
                    e,
                    response_text.chars().take(500).collect::<String>()
                ))
            })?;

            let next = page.next_href();
            all_items.extend(page.into_items());

            match next {
                Some(next_url) => url = self.build_url(&next_url),
                None => break,
            }
        }

        Ok(all_items)
    }

    /// Make a GET request
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, MetalError> {
        let url = self.build_url(path);
        debug!("GET {}", url);

        let response = self
            .client
            .get(&url)
            .header("X-Auth-Token", &self.token)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(MetalError::Http)?;

        let status = response.status();
        if status == 404 {
            let body = response.text().await.unwrap_or_default();
            return Err(MetalError::NotFound(format!(
                "Resource not found: {} - {}",
                path, body
            )));
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            Self::check_auth(status, &body)?;
            return Err(MetalError::Api(format!(
                "GET {} failed: {} - {}",
                path, status, body
            )));
        }

        response.json().await.map_err(MetalError::Http)
    }

    /// Make a POST request
    pub async fn post<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<T, MetalError> {
        let url = self.build_url(path);
        debug!("POST {}", url);

        let response = self
            .client
            .post(&url)
            .header("X-Auth-Token", &self.token)
            .header("Accept", "application/json")
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await
            .map_err(MetalError::Http)?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            Self::check_auth(status, &body_text)?;
            return Err(MetalError::Api(format!(
                "POST {} failed: {} - {}",
                path, status, body_text
            )));
        }

        response.json().await.map_err(MetalError::Http)
    }

    /// Make a PUT request
    pub async fn put<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<T, MetalError> {
        let url = self.build_url(path);
        debug!("PUT {}", url);

        let response = self
            .client
            .put(&url)
            .header("X-Auth-Token", &self.token)
            .header("Accept", "application/json")
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await
            .map_err(MetalError::Http)?;

        let status = response.status();
        if status == 404 {
            let body_text = response.text().await.unwrap_or_default();
            return Err(MetalError::NotFound(format!(
                "Resource not found: {} - {}",
                path, body_text
            )));
        }

        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            Self::check_auth(status, &body_text)?;
            return Err(MetalError::Api(format!(
                "PUT {} failed: {} - {}",
                path, status, body_text
            )));
        }

        response.json().await.map_err(MetalError::Http)
    }

    /// Make a DELETE request
    pub async fn delete(&self, path: &str) -> Result<(), MetalError> {
        let url = self.build_url(path);
        debug!("DELETE {}", url);

        let response = self
            .client
            .delete(&url)
            .header("X-Auth-Token", &self.token)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(MetalError::Http)?;

        let status = response.status();
        if status == 404 {
            let body = response.text().await.unwrap_or_default();
            return Err(MetalError::NotFound(format!(
                "Resource not found: {} - {}",
                path, body
            )));
        }

        if !status.is_success() && status != 204 {
            let body = response.text().await.unwrap_or_default();
            Self::check_auth(status, &body)?;
            return Err(MetalError::Api(format!(
                "DELETE {} failed: {} - {}",
                path, status, body
            )));
        }

        Ok(())
    }

    /// Build query string from filters
    pub fn build_query_string(&self, filters: &[(&str, &str)]) -> String {
        if filters.is_empty() {
            String::new()
        } else {
            filters
                .iter()
                .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
                .collect::<Vec<_>>()
                .join("&")
        }
    }
}
