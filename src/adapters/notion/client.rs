//! Low-level Notion API client.
//!
//! Thin, rate-limited wrapper over an [`ApiConnectionPool`]; the page and
//! query payloads stay as raw JSON here, and [`super::store`] maps them to
//! domain types.

use std::sync::Arc;
use std::time::{Duration, Instant};

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::Method;
use serde_json::{json, Value};
use tokio::sync::Mutex;

use crate::domain::models::{CircuitConfig, HttpConfig, NotionConfig};
use crate::infrastructure::http::{ApiConnectionPool, PoolRegistry, ServiceError};

pub const NOTION_BASE_URL: &str = "https://api.notion.com/v1";
const NOTION_VERSION: &str = "2022-06-28";

/// Token-bucket rate limiter.
///
/// Allows up to `capacity` requests per `window`. When the bucket is
/// exhausted, [`acquire`](RateLimiter::acquire) sleeps until a token
/// becomes available.
#[derive(Debug)]
struct RateLimiter {
    capacity: u32,
    tokens: u32,
    window: Duration,
    window_start: Instant,
}

impl RateLimiter {
    fn new(capacity: u32, window: Duration) -> Self {
        Self {
            capacity,
            tokens: capacity,
            window,
            window_start: Instant::now(),
        }
    }

    /// Take a token, refilling when the window has elapsed and sleeping
    /// when the bucket is empty.
    async fn acquire(&mut self) {
        let elapsed = self.window_start.elapsed();
        if elapsed >= self.window {
            self.tokens = self.capacity;
            self.window_start = Instant::now();
        }

        if self.tokens > 0 {
            self.tokens -= 1;
        } else {
            let remaining = self.window.saturating_sub(elapsed);
            tokio::time::sleep(remaining).await;
            self.tokens = self.capacity.saturating_sub(1);
            self.window_start = Instant::now();
        }
    }
}

/// Notion API client shared by the workflow store and the contact monitor.
#[derive(Debug)]
pub struct NotionClient {
    pool: Arc<ApiConnectionPool>,
    rate_limiter: Mutex<RateLimiter>,
}

impl NotionClient {
    /// Build a client whose pool is obtained from (and shared through) the
    /// registry.
    pub async fn connect(
        registry: &PoolRegistry,
        notion: &NotionConfig,
        http: &HttpConfig,
        circuit: &CircuitConfig,
    ) -> Result<Self, ServiceError> {
        if notion.api_key.is_empty() {
            return Err(ServiceError::InvalidConfig(
                "notion.api_key is not set".to_string(),
            ));
        }

        let mut headers = HeaderMap::new();
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", notion.api_key))
            .map_err(|e| ServiceError::InvalidConfig(format!("notion api key: {e}")))?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);
        headers.insert("Notion-Version", HeaderValue::from_static(NOTION_VERSION));

        let pool = registry
            .get_or_create("notion", NOTION_BASE_URL, headers, http, circuit)
            .await?;

        Ok(Self::with_pool(pool, notion.requests_per_second))
    }

    /// Build a client over an existing pool. Tests point the pool at a mock
    /// server.
    pub fn with_pool(pool: Arc<ApiConnectionPool>, requests_per_second: u32) -> Self {
        Self {
            pool,
            rate_limiter: Mutex::new(RateLimiter::new(
                requests_per_second.max(1),
                Duration::from_secs(1),
            )),
        }
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Value, ServiceError> {
        self.rate_limiter.lock().await.acquire().await;
        let response = self.pool.request(method, path, body).await?;
        response.json()
    }

    /// Create a page in a database. Returns the new page id.
    pub async fn create_page(
        &self,
        database_id: &str,
        properties: Value,
    ) -> Result<String, ServiceError> {
        let body = json!({
            "parent": { "database_id": database_id },
            "properties": properties,
        });
        let page = self.send(Method::POST, "/pages", Some(&body)).await?;
        Ok(page["id"].as_str().unwrap_or_default().to_string())
    }

    /// Patch a page's properties.
    pub async fn update_page(&self, page_id: &str, properties: Value) -> Result<(), ServiceError> {
        let body = json!({ "properties": properties });
        self.send(Method::PATCH, &format!("/pages/{page_id}"), Some(&body))
            .await?;
        Ok(())
    }

    /// Archive a page (Notion's soft delete; the record stays recoverable).
    pub async fn archive_page(&self, page_id: &str) -> Result<(), ServiceError> {
        let body = json!({ "archived": true });
        self.send(Method::PATCH, &format!("/pages/{page_id}"), Some(&body))
            .await?;
        Ok(())
    }

    /// Query a database, following pagination cursors until exhausted.
    pub async fn query_database(
        &self,
        database_id: &str,
        filter: Option<Value>,
        sorts: Option<Value>,
    ) -> Result<Vec<Value>, ServiceError> {
        let mut pages = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let mut body = json!({ "page_size": 100 });
            if let Some(f) = &filter {
                body["filter"] = f.clone();
            }
            if let Some(s) = &sorts {
                body["sorts"] = s.clone();
            }
            if let Some(c) = &cursor {
                body["start_cursor"] = json!(c);
            }

            let response = self
                .send(
                    Method::POST,
                    &format!("/databases/{database_id}/query"),
                    Some(&body),
                )
                .await?;

            if let Some(results) = response["results"].as_array() {
                pages.extend(results.iter().cloned());
            }

            if response["has_more"].as_bool() == Some(true) {
                cursor = response["next_cursor"].as_str().map(ToString::to_string);
                if cursor.is_none() {
                    break;
                }
            } else {
                break;
            }
        }

        Ok(pages)
    }

    /// Find the first page matching `filter`, if any.
    pub async fn find_page(
        &self,
        database_id: &str,
        filter: Value,
    ) -> Result<Option<Value>, ServiceError> {
        let pages = self.query_database(database_id, Some(filter), None).await?;
        Ok(pages.into_iter().next())
    }

    /// Health probe against the `users/me` endpoint.
    pub async fn check_health(&self) -> bool {
        self.rate_limiter.lock().await.acquire().await;
        self.pool
            .request(Method::GET, "/users/me", None)
            .await
            .is_ok()
    }

    pub fn pool(&self) -> &Arc<ApiConnectionPool> {
        &self.pool
    }
}
