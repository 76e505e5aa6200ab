use crate::catalog::{self, CatalogManager};
use crate::config::Config;
use crate::mock;
use crate::models::{
    Condition, Notification, NotificationDraft, NotificationKind, NotificationQuery, Priority,
    Product, ProductDraft, ProductFilters, ProductStatus, RelatedEntity, ShippingTerms,
};
use crate::notifications::NotificationManager;
use crate::provider::{self, ProviderKind};
use crate::Result;
use maison_api::rest::{ListProductsParams, NewNotificationRow, NewProductRow};
use maison_api::{NotificationRow, ProductRow, RestClient};
use maison_db::{
    NewNotification, NewProduct, NotificationRecord, PgBackend, ProductQuery, ProductRecord,
};
use maison_store::BlobStore;
use std::sync::Arc;
use tracing::{info, warn};

/// The three backend kinds as a closed sum type - one handler per operation
/// per variant, fallback policy in one place instead of scattered branching
enum Backend {
    Rest(RestClient),
    Direct(PgBackend),
    Mock,
}

/// Provider-agnostic facade over whichever backend configuration selected
///
/// Constructed once at application start with an injected store; the
/// provider classification happens here and never changes afterwards.
///
/// The contract towards callers: fetch, count and mark operations never
/// fail. Any backend error is logged with its context and absorbed by
/// serving the local catalog or built-in data - a degraded page beats a
/// broken one. Create operations can only fail on caller-side validation
/// (or a genuinely broken local store), never on backend unavailability.
pub struct DataService {
    provider: ProviderKind,
    backend: Backend,
    catalog: CatalogManager,
    notifications: NotificationManager,
}

impl DataService {
    pub fn new(config: &Config, store: Arc<dyn BlobStore>) -> Result<Self> {
        let mut provider = provider::classify(&config.backend);

        let backend = match provider {
            ProviderKind::HostedRest => {
                // Classification guarantees both values are present and usable
                let url = config.backend.url.clone().unwrap_or_default();
                let key = config.backend.api_key.clone().unwrap_or_default();
                Backend::Rest(RestClient::new(&url, &key))
            }
            ProviderKind::Direct => {
                match config
                    .backend
                    .connection_string
                    .as_deref()
                    .map(PgBackend::connect_lazy)
                {
                    Some(Ok(pg)) => Backend::Direct(pg),
                    Some(Err(e)) => {
                        warn!("Direct connection string rejected ({}), using mock data", e);
                        provider = ProviderKind::Mock;
                        Backend::Mock
                    }
                    None => {
                        provider = ProviderKind::Mock;
                        Backend::Mock
                    }
                }
            }
            ProviderKind::Mock => Backend::Mock,
        };

        let catalog = CatalogManager::new(store)?;

        info!("Data service ready on {} provider", provider);
        Ok(Self {
            provider,
            backend,
            catalog,
            notifications: NotificationManager::new(),
        })
    }

    pub fn provider(&self) -> ProviderKind {
        self.provider
    }

    /// The local product manager - favorites, view counts, sales and stats
    /// live here regardless of which remote backend serves the listings
    pub fn catalog(&self) -> &CatalogManager {
        &self.catalog
    }

    fn fallback(&self, operation: &str, entity: &str, err: &dyn std::fmt::Display) {
        warn!(
            "{} failed for {} on {} backend: {}. Serving local data instead",
            operation, entity, self.provider, err
        );
    }

    /// List products, newest first. `status == active` is the implicit
    /// default - there is no way to fetch paused or sold listings here.
    pub async fn fetch_products(&self, filters: &ProductFilters) -> Vec<Product> {
        match &self.backend {
            Backend::Rest(client) => match client.list_products(&rest_params(filters)).await {
                Ok(rows) => return rows.into_iter().map(product_from_rest).collect(),
                Err(e) => self.fallback("fetch_products", "catalog", &e),
            },
            Backend::Direct(db) => match db.list_products(&db_query(filters)).await {
                Ok(rows) => return rows.into_iter().map(product_from_db).collect(),
                Err(e) => self.fallback("fetch_products", "catalog", &e),
            },
            Backend::Mock => {}
        }
        self.local_products(filters)
    }

    pub async fn create_product(&self, draft: ProductDraft) -> Result<Product> {
        draft.validate()?;

        match &self.backend {
            Backend::Rest(client) => match client.insert_product(&rest_new_product(&draft)).await {
                Ok(row) => return Ok(product_from_rest(row)),
                Err(e) => self.fallback("create_product", &draft.seller_id, &e),
            },
            Backend::Direct(db) => match db.insert_product(&db_new_product(&draft)).await {
                Ok(rec) => return Ok(product_from_db(rec)),
                Err(e) => self.fallback("create_product", &draft.seller_id, &e),
            },
            Backend::Mock => {}
        }
        self.catalog.create_product(draft)
    }

    /// Notifications for a user, newest first; unread filter applies before
    /// the limit/offset window
    pub async fn fetch_notifications(
        &self,
        user_id: &str,
        query: &NotificationQuery,
    ) -> Vec<Notification> {
        match &self.backend {
            Backend::Rest(client) => {
                match client
                    .list_notifications(
                        user_id,
                        query.unread_only,
                        query.limit,
                        query.offset,
                    )
                    .await
                {
                    Ok(rows) => return rows.into_iter().map(notification_from_rest).collect(),
                    Err(e) => self.fallback("fetch_notifications", user_id, &e),
                }
            }
            Backend::Direct(db) => {
                match db
                    .list_notifications(
                        user_id,
                        query.unread_only,
                        query.limit.map(|l| l as i64),
                        query.offset.map(|o| o as i64),
                    )
                    .await
                {
                    Ok(rows) => return rows.into_iter().map(notification_from_db).collect(),
                    Err(e) => self.fallback("fetch_notifications", user_id, &e),
                }
            }
            Backend::Mock => {}
        }
        self.local_notifications(user_id, query)
    }

    /// Always equals the length of the unread-only fetch at call time
    pub async fn count_unread(&self, user_id: &str) -> usize {
        match &self.backend {
            Backend::Rest(client) => match client.count_unread(user_id).await {
                Ok(count) => return count,
                Err(e) => self.fallback("count_unread", user_id, &e),
            },
            Backend::Direct(db) => match db.count_unread(user_id).await {
                Ok(count) => return count.max(0) as usize,
                Err(e) => self.fallback("count_unread", user_id, &e),
            },
            Backend::Mock => {}
        }
        match self.notifications.count_unread(user_id) {
            Ok(count) => count,
            Err(e) => {
                warn!("Local notification state unavailable ({}), serving built-in data", e);
                mock::mock_notifications(user_id)
                    .iter()
                    .filter(|n| !n.read)
                    .count()
            }
        }
    }

    /// Idempotent: marking an already-read notification changes nothing
    pub async fn mark_read(&self, notification_id: &str) {
        match &self.backend {
            Backend::Rest(client) => match client.mark_read(notification_id).await {
                Ok(()) => return,
                Err(e) => self.fallback("mark_read", notification_id, &e),
            },
            Backend::Direct(db) => match db.mark_read(notification_id).await {
                Ok(()) => return,
                Err(e) => self.fallback("mark_read", notification_id, &e),
            },
            Backend::Mock => {}
        }
        if let Err(e) = self.notifications.mark_read(notification_id) {
            warn!("mark_read had nothing to do for {}: {}", notification_id, e);
        }
    }

    /// After this returns, `count_unread` for the user is zero
    pub async fn mark_all_read(&self, user_id: &str) {
        match &self.backend {
            Backend::Rest(client) => match client.mark_all_read(user_id).await {
                Ok(()) => return,
                Err(e) => self.fallback("mark_all_read", user_id, &e),
            },
            Backend::Direct(db) => match db.mark_all_read(user_id).await {
                Ok(()) => return,
                Err(e) => self.fallback("mark_all_read", user_id, &e),
            },
            Backend::Mock => {}
        }
        if let Err(e) = self.notifications.mark_all_read(user_id) {
            warn!("mark_all_read failed locally for {}: {}", user_id, e);
        }
    }

    pub async fn create_notification(&self, draft: NotificationDraft) -> Result<Notification> {
        draft.validate()?;

        match &self.backend {
            Backend::Rest(client) => {
                match client
                    .insert_notification(&rest_new_notification(&draft))
                    .await
                {
                    Ok(row) => return Ok(notification_from_rest(row)),
                    Err(e) => self.fallback("create_notification", &draft.user_id, &e),
                }
            }
            Backend::Direct(db) => {
                match db.insert_notification(&db_new_notification(&draft)).await {
                    Ok(rec) => return Ok(notification_from_db(rec)),
                    Err(e) => self.fallback("create_notification", &draft.user_id, &e),
                }
            }
            Backend::Mock => {}
        }
        self.notifications.create(draft)
    }

    fn local_products(&self, filters: &ProductFilters) -> Vec<Product> {
        match self.catalog.get_all_products(filters) {
            Ok(products) => products,
            Err(e) => {
                warn!("Local catalog unavailable ({}), serving built-in data", e);
                catalog::apply_filters(&mock::mock_products(), filters)
            }
        }
    }

    fn local_notifications(&self, user_id: &str, query: &NotificationQuery) -> Vec<Notification> {
        match self.notifications.list(user_id, query) {
            Ok(list) => list,
            Err(e) => {
                warn!("Local notification state unavailable ({}), serving built-in data", e);
                let mut out: Vec<Notification> = mock::mock_notifications(user_id)
                    .into_iter()
                    .filter(|n| !query.unread_only || !n.read)
                    .collect();
                if let Some(offset) = query.offset {
                    out = out.into_iter().skip(offset).collect();
                }
                if let Some(limit) = query.limit {
                    out.truncate(limit);
                }
                out
            }
        }
    }
}

fn rest_params(filters: &ProductFilters) -> ListProductsParams {
    ListProductsParams {
        category: filters.category.clone(),
        min_price: filters.min_price,
        max_price: filters.max_price,
        search: filters.search_query.clone(),
        limit: filters.limit,
        offset: filters.offset,
    }
}

fn db_query(filters: &ProductFilters) -> ProductQuery {
    ProductQuery {
        category: filters.category.clone(),
        min_price: filters.min_price,
        max_price: filters.max_price,
        search: filters.search_query.clone(),
        limit: filters.limit.map(|l| l as i64),
        offset: filters.offset.map(|o| o as i64),
    }
}

fn rest_new_product(draft: &ProductDraft) -> NewProductRow {
    NewProductRow {
        title: draft.title.clone(),
        description: draft.description.clone(),
        price: draft.price,
        currency: draft.currency.clone(),
        category: draft.category.clone(),
        subcategory: draft.subcategory.clone(),
        images: draft.images.clone(),
        condition: draft.condition.as_str().to_string(),
        shipping_included: draft.shipping.included,
        shipping_cost: draft.shipping.cost,
        tags: draft.tags.clone(),
        status: draft.status.unwrap_or(ProductStatus::Active).as_str().to_string(),
        seller_id: draft.seller_id.clone(),
    }
}

fn db_new_product(draft: &ProductDraft) -> NewProduct {
    NewProduct {
        title: draft.title.clone(),
        description: draft.description.clone(),
        price: draft.price,
        currency: draft.currency.clone(),
        category: draft.category.clone(),
        subcategory: draft.subcategory.clone(),
        images: draft.images.clone(),
        condition: draft.condition.as_str().to_string(),
        shipping_included: draft.shipping.included,
        shipping_cost: draft.shipping.cost,
        tags: draft.tags.clone(),
        status: draft.status.unwrap_or(ProductStatus::Active).as_str().to_string(),
        seller_id: draft.seller_id.clone(),
    }
}

/// Convert a REST row into our model; enum strings parse with defined
/// fallbacks so a newer backend can't break the page
fn product_from_rest(row: ProductRow) -> Product {
    Product {
        id: row.id,
        title: row.title,
        description: row.description,
        price: row.price,
        currency: row.currency,
        category: row.category,
        subcategory: row.subcategory,
        images: row.images,
        condition: Condition::parse(&row.condition),
        shipping: ShippingTerms {
            included: row.shipping_included,
            cost: row.shipping_cost,
        },
        tags: row.tags,
        status: ProductStatus::parse(&row.status),
        seller_id: row.seller_id,
        views_count: row.views_count,
        favorites_count: row.favorites_count,
        created_at: row.created_at,
        updated_at: row.updated_at,
    }
}

fn product_from_db(rec: ProductRecord) -> Product {
    Product {
        id: rec.id,
        title: rec.title,
        description: rec.description,
        price: rec.price,
        currency: rec.currency,
        category: rec.category,
        subcategory: rec.subcategory,
        images: rec.images,
        condition: Condition::parse(&rec.condition),
        shipping: ShippingTerms {
            included: rec.shipping_included,
            cost: rec.shipping_cost,
        },
        tags: rec.tags,
        status: ProductStatus::parse(&rec.status),
        seller_id: rec.seller_id,
        views_count: rec.views_count.max(0) as u64,
        favorites_count: rec.favorites_count.max(0) as u64,
        created_at: rec.created_at,
        updated_at: rec.updated_at,
    }
}

fn notification_from_rest(row: NotificationRow) -> Notification {
    Notification {
        id: row.id,
        user_id: row.user_id,
        kind: NotificationKind::parse(&row.kind),
        priority: Priority::parse(&row.priority),
        title: row.title,
        body: row.body,
        read: row.read,
        read_at: row.read_at,
        related: related_from_parts(row.related_type, row.related_id),
        created_at: row.created_at,
    }
}

fn notification_from_db(rec: NotificationRecord) -> Notification {
    Notification {
        id: rec.id,
        user_id: rec.user_id,
        kind: NotificationKind::parse(&rec.kind),
        priority: Priority::parse(&rec.priority),
        title: rec.title,
        body: rec.body,
        read: rec.read,
        read_at: rec.read_at,
        related: related_from_parts(rec.related_type, rec.related_id),
        created_at: rec.created_at,
    }
}

fn related_from_parts(kind: Option<String>, id: Option<String>) -> Option<RelatedEntity> {
    match (kind, id) {
        (Some(kind), Some(id)) => Some(RelatedEntity { kind, id }),
        _ => None,
    }
}

fn rest_new_notification(draft: &NotificationDraft) -> NewNotificationRow {
    NewNotificationRow {
        user_id: draft.user_id.clone(),
        kind: draft.kind.as_str().to_string(),
        priority: draft.priority.as_str().to_string(),
        title: draft.title.clone(),
        body: draft.body.clone(),
        related_type: draft.related.as_ref().map(|r| r.kind.clone()),
        related_id: draft.related.as_ref().map(|r| r.id.clone()),
    }
}

fn db_new_notification(draft: &NotificationDraft) -> NewNotification {
    NewNotification {
        user_id: draft.user_id.clone(),
        kind: draft.kind.as_str().to_string(),
        priority: draft.priority.as_str().to_string(),
        title: draft.title.clone(),
        body: draft.body.clone(),
        related_type: draft.related.as_ref().map(|r| r.kind.clone()),
        related_id: draft.related.as_ref().map(|r| r.id.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BackendConfig;
    use maison_store::MemoryStore;

    fn mock_service() -> DataService {
        DataService::new(&Config::default(), Arc::new(MemoryStore::new())).unwrap()
    }

    fn unreachable_rest_service() -> DataService {
        // A real-looking key and a URL nothing listens on: classification
        // picks hosted-rest, every call fails, every call falls back
        let config = Config {
            backend: BackendConfig {
                url: Some("http://127.0.0.1:9".into()),
                api_key: Some("sk-live-4f2a9c".into()),
                connection_string: None,
            },
            store: Default::default(),
        };
        DataService::new(&config, Arc::new(MemoryStore::new())).unwrap()
    }

    #[tokio::test]
    async fn unconfigured_service_serves_the_builtin_catalog() {
        let service = mock_service();
        assert_eq!(service.provider(), ProviderKind::Mock);

        let products = service.fetch_products(&ProductFilters::new()).await;
        assert!(!products.is_empty());
        assert!(products.iter().all(|p| p.status == ProductStatus::Active));
    }

    #[tokio::test]
    async fn created_product_lists_first_with_zeroed_counters() {
        let service = mock_service();
        let created = service
            .create_product(ProductDraft::new("Watch", 100.0, "watches", "u1"))
            .await
            .unwrap();

        assert_eq!(created.views_count, 0);
        assert_eq!(created.favorites_count, 0);
        assert_eq!(created.status, ProductStatus::Active);

        let products = service.fetch_products(&ProductFilters::new()).await;
        assert_eq!(products[0].id, created.id);
    }

    #[tokio::test]
    async fn invalid_draft_is_rejected_up_front() {
        let service = mock_service();
        let result = service
            .create_product(ProductDraft::new("", 100.0, "watches", "u1"))
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn unread_count_tracks_the_unread_list() {
        let service = mock_service();

        let unread = service
            .fetch_notifications("u1", &NotificationQuery::new().unread_only())
            .await;
        assert_eq!(service.count_unread("u1").await, unread.len());
        assert_eq!(unread.len(), 3);

        service.mark_read(&unread[0].id).await;
        assert_eq!(service.count_unread("u1").await, 2);

        // Idempotent: same id again changes nothing
        service.mark_read(&unread[0].id).await;
        assert_eq!(service.count_unread("u1").await, 2);

        service.mark_all_read("u1").await;
        assert_eq!(service.count_unread("u1").await, 0);
        let unread = service
            .fetch_notifications("u1", &NotificationQuery::new().unread_only())
            .await;
        assert!(unread.is_empty());
    }

    #[tokio::test]
    async fn created_notification_shows_up_unread() {
        let service = mock_service();
        let before = service.count_unread("u9").await;

        let created = service
            .create_notification(NotificationDraft {
                user_id: "u9".into(),
                kind: NotificationKind::Payment,
                priority: Priority::High,
                title: "Payout sent".into(),
                body: String::new(),
                related: None,
            })
            .await
            .unwrap();

        assert!(!created.read);
        assert_eq!(service.count_unread("u9").await, before + 1);

        let list = service.fetch_notifications("u9", &NotificationQuery::new()).await;
        assert_eq!(list[0].id, created.id);
    }

    #[tokio::test]
    async fn every_operation_survives_an_unreachable_backend() {
        let service = unreachable_rest_service();
        assert_eq!(service.provider(), ProviderKind::HostedRest);

        // Each public operation must degrade, not fail
        let products = service.fetch_products(&ProductFilters::new()).await;
        assert!(!products.is_empty());

        let created = service
            .create_product(ProductDraft::new("Ring", 50.0, "jewelry", "u1"))
            .await
            .unwrap();
        assert_eq!(created.status, ProductStatus::Active);

        let notifications = service
            .fetch_notifications("u1", &NotificationQuery::new())
            .await;
        assert!(!notifications.is_empty());

        let count = service.count_unread("u1").await;
        service.mark_all_read("u1").await;
        assert!(count >= 1);
        assert_eq!(service.count_unread("u1").await, 0);
    }

    #[tokio::test]
    async fn bad_connection_string_degrades_to_mock_at_construction() {
        let config = Config {
            backend: BackendConfig {
                url: None,
                api_key: None,
                // postgres-looking enough to classify as direct
                connection_string: Some("postgres://\u{0}bad".into()),
            },
            store: Default::default(),
        };
        let service = DataService::new(&config, Arc::new(MemoryStore::new()));
        // Construction never fails on configuration trouble
        let service = service.unwrap();
        let products = service.fetch_products(&ProductFilters::new()).await;
        assert!(!products.is_empty());
    }
}
