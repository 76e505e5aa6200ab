// Direct-connection backend: talks straight to Postgres when the operator
// hands us a connection string instead of a hosted API URL.

use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("insert returned no row")]
    EmptyInsert,
}

pub type Result<T> = std::result::Result<T, DbError>;

/// Product as read from the products table
#[derive(Debug, Clone)]
pub struct ProductRecord {
    pub id: String,
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
    pub views_count: i64,
    pub favorites_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Notification as read from the notifications table
#[derive(Debug, Clone)]
pub struct NotificationRecord {
    pub id: String,
    pub user_id: String,
    pub kind: String,
    pub priority: String,
    pub title: String,
    pub body: String,
    pub read: bool,
    pub read_at: Option<DateTime<Utc>>,
    pub related_type: Option<String>,
    pub related_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Fields the caller supplies when inserting a product
#[derive(Debug, Clone)]
pub struct NewProduct {
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

/// Fields the caller supplies when inserting a notification
#[derive(Debug, Clone)]
pub struct NewNotification {
    pub user_id: String,
    pub kind: String,
    pub priority: String,
    pub title: String,
    pub body: String,
    pub related_type: Option<String>,
    pub related_id: Option<String>,
}

/// Query window for product listings
#[derive(Debug, Clone, Default)]
pub struct ProductQuery {
    pub category: Option<String>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub search: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Postgres-backed marketplace store
///
/// The pool is built lazily: constructing the backend never touches the
/// network, so provider classification at startup stays infallible. The
/// first actual query pays for the connection, and a failure there rides
/// the service's fallback path like any other backend error.
pub struct PgBackend {
    pool: PgPool,
}

impl PgBackend {
    pub fn connect_lazy(connection_string: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(4)
            .connect_lazy(connection_string)?;
        Ok(Self { pool })
    }

    /// Active products, newest first, optional category/price/search window
    pub async fn list_products(&self, query: &ProductQuery) -> Result<Vec<ProductRecord>> {
        let rows = sqlx::query(
            "SELECT id, title, description, price, currency, category, subcategory,
                    images, condition, shipping_included, shipping_cost, tags,
                    status, seller_id, views_count, favorites_count,
                    created_at, updated_at
             FROM products
             WHERE status = 'active'
               AND ($1::text IS NULL OR category = $1)
               AND ($2::float8 IS NULL OR price >= $2)
               AND ($3::float8 IS NULL OR price <= $3)
               AND ($4::text IS NULL
                    OR title ILIKE '%' || $4 || '%'
                    OR description ILIKE '%' || $4 || '%'
                    OR $4 = ANY(tags))
             ORDER BY created_at DESC
             LIMIT $5 OFFSET $6",
        )
        .bind(&query.category)
        .bind(query.min_price)
        .bind(query.max_price)
        .bind(&query.search)
        .bind(query.limit)
        .bind(query.offset.unwrap_or(0))
        .fetch_all(&self.pool)
        .await?;

        debug!("Database returned {} products", rows.len());
        rows.iter().map(product_from_row).collect()
    }

    pub async fn insert_product(&self, new: &NewProduct) -> Result<ProductRecord> {
        let id = fresh_id("prod");
        let row = sqlx::query(
            "INSERT INTO products
                (id, title, description, price, currency, category, subcategory,
                 images, condition, shipping_included, shipping_cost, tags,
                 status, seller_id, views_count, favorites_count,
                 created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14,
                     0, 0, NOW(), NOW())
             RETURNING id, title, description, price, currency, category, subcategory,
                       images, condition, shipping_included, shipping_cost, tags,
                       status, seller_id, views_count, favorites_count,
                       created_at, updated_at",
        )
        .bind(&id)
        .bind(&new.title)
        .bind(&new.description)
        .bind(new.price)
        .bind(&new.currency)
        .bind(&new.category)
        .bind(&new.subcategory)
        .bind(&new.images)
        .bind(&new.condition)
        .bind(new.shipping_included)
        .bind(new.shipping_cost)
        .bind(&new.tags)
        .bind(&new.status)
        .bind(&new.seller_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(DbError::EmptyInsert)?;

        product_from_row(&row)
    }

    pub async fn list_notifications(
        &self,
        user_id: &str,
        unread_only: bool,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> Result<Vec<NotificationRecord>> {
        let rows = sqlx::query(
            "SELECT id, user_id, kind, priority, title, body, read, read_at,
                    related_type, related_id, created_at
             FROM notifications
             WHERE user_id = $1
               AND (NOT $2 OR read = FALSE)
             ORDER BY created_at DESC
             LIMIT $3 OFFSET $4",
        )
        .bind(user_id)
        .bind(unread_only)
        .bind(limit)
        .bind(offset.unwrap_or(0))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(notification_from_row).collect()
    }

    pub async fn count_unread(&self, user_id: &str) -> Result<i64> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS unread
             FROM notifications
             WHERE user_id = $1 AND read = FALSE",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.try_get("unread")?)
    }

    /// `read = FALSE` guard keeps the update idempotent; `read_at` is only
    /// ever written on the unread-to-read transition
    pub async fn mark_read(&self, notification_id: &str) -> Result<()> {
        sqlx::query(
            "UPDATE notifications
             SET read = TRUE, read_at = NOW()
             WHERE id = $1 AND read = FALSE",
        )
        .bind(notification_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn mark_all_read(&self, user_id: &str) -> Result<()> {
        sqlx::query(
            "UPDATE notifications
             SET read = TRUE, read_at = NOW()
             WHERE user_id = $1 AND read = FALSE",
        )
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn insert_notification(&self, new: &NewNotification) -> Result<NotificationRecord> {
        let id = fresh_id("ntf");
        let row = sqlx::query(
            "INSERT INTO notifications
                (id, user_id, kind, priority, title, body, read, read_at,
                 related_type, related_id, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, FALSE, NULL, $7, $8, NOW())
             RETURNING id, user_id, kind, priority, title, body, read, read_at,
                       related_type, related_id, created_at",
        )
        .bind(&id)
        .bind(&new.user_id)
        .bind(&new.kind)
        .bind(&new.priority)
        .bind(&new.title)
        .bind(&new.body)
        .bind(&new.related_type)
        .bind(&new.related_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(DbError::EmptyInsert)?;

        notification_from_row(&row)
    }
}

fn fresh_id(prefix: &str) -> String {
    let frag = uuid::Uuid::new_v4().simple().to_string();
    format!("{}-{}-{}", prefix, Utc::now().timestamp_millis(), &frag[..8])
}

fn product_from_row(row: &PgRow) -> Result<ProductRecord> {
    Ok(ProductRecord {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        price: row.try_get("price")?,
        currency: row.try_get("currency")?,
        category: row.try_get("category")?,
        subcategory: row.try_get("subcategory")?,
        images: row.try_get("images")?,
        condition: row.try_get("condition")?,
        shipping_included: row.try_get("shipping_included")?,
        shipping_cost: row.try_get("shipping_cost")?,
        tags: row.try_get("tags")?,
        status: row.try_get("status")?,
        seller_id: row.try_get("seller_id")?,
        views_count: row.try_get("views_count")?,
        favorites_count: row.try_get("favorites_count")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn notification_from_row(row: &PgRow) -> Result<NotificationRecord> {
    Ok(NotificationRecord {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        kind: row.try_get("kind")?,
        priority: row.try_get("priority")?,
        title: row.try_get("title")?,
        body: row.try_get("body")?,
        read: row.try_get("read")?,
        read_at: row.try_get("read_at")?,
        related_type: row.try_get("related_type")?,
        related_id: row.try_get("related_id")?,
        created_at: row.try_get("created_at")?,
    })
}
