use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::retry::{is_retryable_status, with_retry, RetryConfig};

/// How long we wait on the hosted backend before giving up on a request.
/// A timeout is treated like any other backend failure upstream.
const REQUEST_TIMEOUT_SECS: u64 = 10;

#[derive(Error, Debug)]
pub enum RestError {
    #[error("API request failed: {0}")]
    RequestFailed(String),

    #[error("API request failed with status {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Authentication rejected by backend")]
    AuthRejected,

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("JSON parsing failed: {0}")]
    ParseError(#[from] serde_json::Error),
}

impl RestError {
    /// Whether another attempt could plausibly succeed. Transport trouble
    /// and rate limiting are transient; a rejected key or a missing record
    /// is not, and retrying those only delays the caller's fallback.
    pub fn is_retryable(&self) -> bool {
        match self {
            RestError::NetworkError(_) | RestError::RateLimitExceeded => true,
            RestError::Status { status, .. } => is_retryable_status(*status),
            RestError::RequestFailed(_)
            | RestError::NotFound(_)
            | RestError::AuthRejected
            | RestError::ParseError(_) => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, RestError>;

/// Product record as the backend serves it
///
/// Enums travel as plain strings on the wire so an unknown value coming from
/// a newer backend doesn't fail deserialization; the core maps them into its
/// closed enums with a defined fallback.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductRow {
    pub id: String,
    pub title: String,
    pub description: String,
    pub price: f64,
    pub currency: String,
    pub category: String,
    #[serde(default)]
    pub subcategory: Option<String>,
    #[serde(default)]
    pub images: Vec<String>,
    pub condition: String,
    #[serde(default)]
    pub shipping_included: bool,
    #[serde(default)]
    pub shipping_cost: f64,
    #[serde(default)]
    pub tags: Vec<String>,
    pub status: String,
    pub seller_id: String,
    #[serde(default)]
    pub views_count: u64,
    #[serde(default)]
    pub favorites_count: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Payload for inserting a product; the backend assigns id, counters and
/// timestamps
#[derive(Debug, Clone, Serialize)]
pub struct NewProductRow {
    pub title: String,
    pub description: String,
    pub price: f64,
    pub currency: String,
    pub category: String,
    pub subcategory: Option<String>,
    pub images: Vec<String>,
    pub condition: String,
    pub shipping_included: bool,
    pub shipping_cost: f64,
    pub tags: Vec<String>,
    pub status: String,
    pub seller_id: String,
}

/// Notification record as the backend serves it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationRow {
    pub id: String,
    pub user_id: String,
    pub kind: String,
    pub priority: String,
    pub title: String,
    #[serde(default)]
    pub body: String,
    pub read: bool,
    #[serde(default)]
    pub read_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub related_type: Option<String>,
    #[serde(default)]
    pub related_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewNotificationRow {
    pub user_id: String,
    pub kind: String,
    pub priority: String,
    pub title: String,
    pub body: String,
    pub related_type: Option<String>,
    pub related_id: Option<String>,
}

/// Product listing parameters as sent to the backend
#[derive(Debug, Clone, Default)]
pub struct ListProductsParams {
    pub category: Option<String>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub search: Option<String>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

/// Client for the hosted PostgREST-style marketplace backend
///
/// One reqwest client, default auth headers, request timeout baked in.
/// Reads and idempotent updates are retried; inserts are not, so a flaky
/// network can't duplicate a listing.
pub struct RestClient {
    client: reqwest::Client,
    base_url: String,
    retry_config: RetryConfig,
}

impl RestClient {
    pub fn new(base_url: &str, api_key: &str) -> Self {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::USER_AGENT,
            reqwest::header::HeaderValue::from_static("Maison/0.1.0"),
        );
        if let Ok(value) = reqwest::header::HeaderValue::from_str(api_key) {
            headers.insert("apikey", value);
        }
        if let Ok(value) = reqwest::header::HeaderValue::from_str(&format!("Bearer {}", api_key)) {
            headers.insert(reqwest::header::AUTHORIZATION, value);
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            retry_config: RetryConfig::default(),
        }
    }

    pub fn with_retry_config(mut self, retry_config: RetryConfig) -> Self {
        self.retry_config = retry_config;
        self
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    /// List products, newest first, active-only unless the caller filtered
    /// otherwise upstream
    pub async fn list_products(&self, params: &ListProductsParams) -> Result<Vec<ProductRow>> {
        let url = self.table_url("products");
        let query = build_product_query(params);

        with_retry(&self.retry_config, RestError::is_retryable, || async {
            let response = self.client.get(&url).query(&query).send().await?;
            let rows: Vec<ProductRow> = check(response).await?.json().await?;
            debug!("Backend returned {} products", rows.len());
            Ok(rows)
        })
        .await
    }

    /// Insert a product and get the stored record back
    pub async fn insert_product(&self, row: &NewProductRow) -> Result<ProductRow> {
        let url = self.table_url("products");

        let response = self
            .client
            .post(&url)
            .header("Prefer", "return=representation")
            .json(row)
            .send()
            .await?;

        let mut rows: Vec<ProductRow> = check(response).await?.json().await?;
        rows.pop()
            .ok_or_else(|| RestError::RequestFailed("insert returned no representation".into()))
    }

    pub async fn list_notifications(
        &self,
        user_id: &str,
        unread_only: bool,
        limit: Option<usize>,
        offset: Option<usize>,
    ) -> Result<Vec<NotificationRow>> {
        let url = self.table_url("notifications");
        let mut query = vec![
            ("select".to_string(), "*".to_string()),
            ("user_id".to_string(), format!("eq.{}", user_id)),
            ("order".to_string(), "created_at.desc".to_string()),
        ];
        if unread_only {
            query.push(("read".to_string(), "eq.false".to_string()));
        }
        if let Some(limit) = limit {
            query.push(("limit".to_string(), limit.to_string()));
        }
        if let Some(offset) = offset {
            query.push(("offset".to_string(), offset.to_string()));
        }

        with_retry(&self.retry_config, RestError::is_retryable, || async {
            let response = self.client.get(&url).query(&query).send().await?;
            let rows: Vec<NotificationRow> = check(response).await?.json().await?;
            Ok(rows)
        })
        .await
    }

    /// Unread count via a projection fetch - cheap enough at our volumes
    pub async fn count_unread(&self, user_id: &str) -> Result<usize> {
        let url = self.table_url("notifications");
        let query = vec![
            ("select".to_string(), "id".to_string()),
            ("user_id".to_string(), format!("eq.{}", user_id)),
            ("read".to_string(), "eq.false".to_string()),
        ];

        #[derive(Deserialize)]
        struct IdOnly {
            #[allow(dead_code)]
            id: String,
        }

        with_retry(&self.retry_config, RestError::is_retryable, || async {
            let response = self.client.get(&url).query(&query).send().await?;
            let rows: Vec<IdOnly> = check(response).await?.json().await?;
            Ok(rows.len())
        })
        .await
    }

    /// Flip one notification to read. The `read=eq.false` filter makes the
    /// PATCH a no-op for already-read rows, so `read_at` is written at most
    /// once server-side.
    pub async fn mark_read(&self, notification_id: &str) -> Result<()> {
        let url = self.table_url("notifications");
        let query = vec![
            ("id".to_string(), format!("eq.{}", notification_id)),
            ("read".to_string(), "eq.false".to_string()),
        ];

        with_retry(&self.retry_config, RestError::is_retryable, || async {
            let body = serde_json::json!({ "read": true, "read_at": Utc::now() });
            let response = self.client.patch(&url).query(&query).json(&body).send().await?;
            check(response).await?;
            Ok(())
        })
        .await
    }

    /// Flip every unread notification for a user in one backend statement
    pub async fn mark_all_read(&self, user_id: &str) -> Result<()> {
        let url = self.table_url("notifications");
        let query = vec![
            ("user_id".to_string(), format!("eq.{}", user_id)),
            ("read".to_string(), "eq.false".to_string()),
        ];

        with_retry(&self.retry_config, RestError::is_retryable, || async {
            let body = serde_json::json!({ "read": true, "read_at": Utc::now() });
            let response = self.client.patch(&url).query(&query).json(&body).send().await?;
            check(response).await?;
            Ok(())
        })
        .await
    }

    pub async fn insert_notification(&self, row: &NewNotificationRow) -> Result<NotificationRow> {
        let url = self.table_url("notifications");

        let response = self
            .client
            .post(&url)
            .header("Prefer", "return=representation")
            .json(row)
            .send()
            .await?;

        let mut rows: Vec<NotificationRow> = check(response).await?.json().await?;
        rows.pop()
            .ok_or_else(|| RestError::RequestFailed("insert returned no representation".into()))
    }
}

/// Map non-success statuses to errors, pass the response through otherwise
async fn check(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();

    if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
        return Err(RestError::AuthRejected);
    }
    if status == reqwest::StatusCode::NOT_FOUND {
        return Err(RestError::NotFound("resource".into()));
    }
    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        return Err(RestError::RateLimitExceeded);
    }
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(RestError::Status { status, body });
    }

    Ok(response)
}

fn build_product_query(params: &ListProductsParams) -> Vec<(String, String)> {
    let mut query = vec![
        ("select".to_string(), "*".to_string()),
        ("status".to_string(), "eq.active".to_string()),
        ("order".to_string(), "created_at.desc".to_string()),
    ];
    if let Some(category) = &params.category {
        query.push(("category".to_string(), format!("eq.{}", category)));
    }
    if let Some(min) = params.min_price {
        query.push(("price".to_string(), format!("gte.{}", min)));
    }
    if let Some(max) = params.max_price {
        query.push(("price".to_string(), format!("lte.{}", max)));
    }
    if let Some(q) = &params.search {
        // Substring match on title/description; tags only match whole values
        // because the backend stores them as an array
        query.push((
            "or".to_string(),
            format!(
                "(title.ilike.*{q}*,description.ilike.*{q}*,tags.cs.{{{q}}})",
                q = q
            ),
        ));
    }
    if let Some(limit) = params.limit {
        query.push(("limit".to_string(), limit.to_string()));
    }
    if let Some(offset) = params.offset {
        query.push(("offset".to_string(), offset.to_string()));
    }
    query
}
