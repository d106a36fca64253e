//! Table API client.
//!
//! Uses `reqwest` with JSON bodies. Every request carries the `apikey` header
//! plus a bearer token chosen by [`Auth`].

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Method, RequestBuilder, StatusCode};
use secrecy::SecretString;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::instrument;
use url::Url;

use crate::config::{BackendConfig, expose};
use crate::error::{BackendError, extract_message};
use crate::query::Query;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Credential a request runs under.
#[derive(Debug, Clone, Copy)]
pub enum Auth<'a> {
    /// Public key only; row-level security applies as an anonymous visitor.
    Anon,
    /// A signed-in user's access token.
    User(&'a str),
    /// Service key; bypasses row-level security.
    Service,
}

/// Client for the hosted backend.
///
/// Cheaply cloneable; all clones share one connection pool.
#[derive(Clone)]
pub struct BackendClient {
    inner: Arc<BackendClientInner>,
}

struct BackendClientInner {
    http: reqwest::Client,
    base_url: Url,
    anon_key: SecretString,
    service_key: Option<SecretString>,
}

impl BackendClient {
    /// Create a new backend client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(config: &BackendConfig) -> Result<Self, BackendError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        // `Url::join` replaces the last path segment unless the base ends in '/'
        let mut base_url = config.url.clone();
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        Ok(Self {
            inner: Arc::new(BackendClientInner {
                http,
                base_url,
                anon_key: config.anon_key.clone(),
                service_key: config.service_role_key.clone(),
            }),
        })
    }

    /// Whether a service key is configured.
    #[must_use]
    pub fn has_service_key(&self) -> bool {
        self.inner.service_key.is_some()
    }

    /// Build a URL relative to the project base.
    pub(crate) fn endpoint(&self, path: &str) -> Result<Url, BackendError> {
        self.inner
            .base_url
            .join(path)
            .map_err(|e| BackendError::Misconfigured(format!("invalid endpoint {path}: {e}")))
    }

    fn table_url(&self, table: &str, query: &Query) -> Result<Url, BackendError> {
        let mut url = self.endpoint(&format!("rest/v1/{table}"))?;
        if !query.pairs().is_empty() {
            url.query_pairs_mut().extend_pairs(query.pairs());
        }
        Ok(url)
    }

    /// Start a request with credentials applied.
    pub(crate) fn request(
        &self,
        method: Method,
        url: Url,
        auth: Auth<'_>,
    ) -> Result<RequestBuilder, BackendError> {
        let anon = expose(&self.inner.anon_key);
        let (api_key, bearer) = match auth {
            Auth::Anon => (anon, anon),
            Auth::User(token) => (anon, token),
            Auth::Service => {
                let key = self.inner.service_key.as_ref().ok_or_else(|| {
                    BackendError::Misconfigured("service role key is not configured".to_string())
                })?;
                (expose(key), expose(key))
            }
        };

        Ok(self
            .inner
            .http
            .request(method, url)
            .header("apikey", api_key)
            .bearer_auth(bearer))
    }

    /// Send a request and return the body of a successful response.
    pub(crate) async fn send(&self, request: RequestBuilder) -> Result<String, BackendError> {
        let response = request.send().await?;
        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(1);
            return Err(BackendError::RateLimited(retry_after));
        }

        let body = response.text().await?;

        if status.is_success() {
            return Ok(body);
        }

        let message = extract_message(&body);
        tracing::warn!(status = %status, message = %message, "Backend returned non-success status");

        Err(match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => BackendError::Unauthorized(message),
            StatusCode::NOT_FOUND => BackendError::NotFound(message),
            _ => BackendError::Api {
                status: status.as_u16(),
                message,
            },
        })
    }

    /// Send a request and parse the JSON body.
    pub(crate) async fn send_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<T, BackendError> {
        let body = self.send(request).await?;
        serde_json::from_str(&body).map_err(|e| {
            tracing::error!(
                error = %e,
                body = %body.chars().take(500).collect::<String>(),
                "Failed to parse backend response"
            );
            BackendError::Parse(e)
        })
    }

    // =========================================================================
    // Table operations
    // =========================================================================

    /// Select rows from `table`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or rows do not parse as `T`.
    #[instrument(skip(self, query), fields(table = %table))]
    pub async fn select<T: DeserializeOwned>(
        &self,
        table: &str,
        query: &Query,
        auth: Auth<'_>,
    ) -> Result<Vec<T>, BackendError> {
        let url = self.table_url(table, query)?;
        let request = self.request(Method::GET, url, auth)?;
        self.send_json(request).await
    }

    /// Select at most one row from `table`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the row does not parse as `T`.
    pub async fn select_one<T: DeserializeOwned>(
        &self,
        table: &str,
        query: &Query,
        auth: Auth<'_>,
    ) -> Result<Option<T>, BackendError> {
        let rows = self
            .select::<T>(table, &query.clone().limit(1), auth)
            .await?;
        Ok(rows.into_iter().next())
    }

    /// Insert one row (or an array of rows) and return what was stored.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or is rejected.
    #[instrument(skip(self, body), fields(table = %table))]
    pub async fn insert<B, T>(
        &self,
        table: &str,
        body: &B,
        auth: Auth<'_>,
    ) -> Result<Vec<T>, BackendError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.table_url(table, &Query::new())?;
        let request = self
            .request(Method::POST, url, auth)?
            .header("Prefer", "return=representation")
            .json(body);
        self.send_json(request).await
    }

    /// Insert a single row and return it.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the backend returns no row.
    pub async fn insert_one<B, T>(
        &self,
        table: &str,
        body: &B,
        auth: Auth<'_>,
    ) -> Result<T, BackendError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.insert::<B, T>(table, body, auth)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| BackendError::Api {
                status: 500,
                message: format!("insert into {table} returned no rows"),
            })
    }

    /// Insert or merge on the `on_conflict` column.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or is rejected.
    #[instrument(skip(self, body), fields(table = %table))]
    pub async fn upsert<B, T>(
        &self,
        table: &str,
        body: &B,
        on_conflict: &str,
        auth: Auth<'_>,
    ) -> Result<Vec<T>, BackendError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let mut url = self.table_url(table, &Query::new())?;
        url.query_pairs_mut().append_pair("on_conflict", on_conflict);
        let request = self
            .request(Method::POST, url, auth)?
            .header("Prefer", "resolution=merge-duplicates,return=representation")
            .json(body);
        self.send_json(request).await
    }

    /// Patch rows matching `query` and return the updated rows.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or is rejected.
    #[instrument(skip(self, query, body), fields(table = %table))]
    pub async fn update<B, T>(
        &self,
        table: &str,
        query: &Query,
        body: &B,
        auth: Auth<'_>,
    ) -> Result<Vec<T>, BackendError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.table_url(table, query)?;
        let request = self
            .request(Method::PATCH, url, auth)?
            .header("Prefer", "return=representation")
            .json(body);
        self.send_json(request).await
    }

    /// Delete rows matching `query`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or is rejected.
    #[instrument(skip(self, query), fields(table = %table))]
    pub async fn delete(
        &self,
        table: &str,
        query: &Query,
        auth: Auth<'_>,
    ) -> Result<(), BackendError> {
        let url = self.table_url(table, query)?;
        let request = self
            .request(Method::DELETE, url, auth)?
            .header("Prefer", "return=minimal");
        self.send(request).await.map(|_| ())
    }

    /// Readiness check: the table API answers with the public key.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend is unreachable or rejects the key.
    pub async fn health(&self) -> Result<(), BackendError> {
        let url = self.endpoint("rest/v1/")?;
        let request = self.request(Method::GET, url, Auth::Anon)?;
        self.send(request).await.map(|_| ())
    }
}
