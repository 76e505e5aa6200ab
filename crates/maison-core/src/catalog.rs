use crate::mock;
use crate::models::{
    ActiveDeal, DealStatus, Product, ProductDraft, ProductFilters, ProductStatus, UserActivity,
};
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use maison_store::{get_json, BlobStore};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info};

/// Blob holding the full product list as a JSON array
pub const PRODUCTS_KEY: &str = "products";
/// Blob holding the user-id -> UserActivity map
pub const ACTIVITY_KEY: &str = "user_activity";

/// One blob per user for their favorite product ids
pub fn favorites_key(user_id: &str) -> String {
    format!("favorites:{}", user_id)
}

/// Aggregates derived from the current catalog state
///
/// Recomputed on every call; nothing here is cached between invocations.
#[derive(Debug, Clone, Serialize)]
pub struct MarketplaceStats {
    pub active_products: usize,
    pub total_views: u64,
    pub distinct_sellers: usize,
    pub mean_price: f64,
}

/// Manager for locally persisted listings and per-user activity
///
/// Holds the catalog in memory (newest first) and writes the whole list back
/// on every mutation. Mutations that touch two blobs go through the store's
/// atomic multi-key write, and in-memory state is only committed after the
/// write succeeds - a failed write means the call did not happen.
///
/// Not safe across processes sharing one store file; last writer wins there.
pub struct CatalogManager {
    store: Arc<dyn BlobStore>,
    products: Mutex<Vec<Product>>,
}

impl CatalogManager {
    /// Load the catalog from the store, seeding it with the built-in data on
    /// first run so the marketplace never renders empty
    pub fn new(store: Arc<dyn BlobStore>) -> Result<Self> {
        let products = match get_json::<Vec<Product>, _>(store.as_ref(), PRODUCTS_KEY)? {
            Some(list) => list,
            None => {
                let seed = mock::mock_products();
                store.put(PRODUCTS_KEY, &serde_json::to_string(&seed)?)?;
                info!("Seeded local catalog with {} built-in products", seed.len());
                seed
            }
        };

        Ok(Self {
            store,
            products: Mutex::new(products),
        })
    }

    fn lock_products(&self) -> Result<MutexGuard<'_, Vec<Product>>> {
        self.products
            .lock()
            .map_err(|_| Error::Store("catalog mutex poisoned".into()))
    }

    fn load_activity(&self) -> Result<HashMap<String, UserActivity>> {
        Ok(get_json(self.store.as_ref(), ACTIVITY_KEY)?.unwrap_or_default())
    }

    /// Create a listing: fresh id, head insertion, one atomic write of the
    /// product list and the creator's activity rollup
    pub fn create_product(&self, draft: ProductDraft) -> Result<Product> {
        draft.validate()?;

        let now = Utc::now();
        let product = Product {
            id: product_id(now),
            title: draft.title.trim().to_string(),
            description: draft.description,
            price: draft.price,
            currency: draft.currency,
            category: draft.category,
            subcategory: draft.subcategory,
            images: draft.images,
            condition: draft.condition,
            shipping: draft.shipping,
            tags: draft.tags,
            status: draft.status.unwrap_or(ProductStatus::Active),
            seller_id: draft.seller_id,
            views_count: 0,
            favorites_count: 0,
            created_at: now,
            updated_at: now,
        };

        let mut products = self.lock_products()?;

        // Listing, not selling: the sold set only changes on a completed sale
        let mut activity = self.load_activity()?;
        let entry = activity
            .entry(product.seller_id.clone())
            .or_insert_with(|| UserActivity::new(&product.seller_id));
        if !entry.products_listed.contains(&product.id) {
            entry.products_listed.push(product.id.clone());
        }
        entry.recount();

        let mut next = products.clone();
        next.insert(0, product.clone());

        self.store.put_many(&[
            (PRODUCTS_KEY, serde_json::to_string(&next)?),
            (ACTIVITY_KEY, serde_json::to_string(&activity)?),
        ])?;
        *products = next;

        info!(
            "Created product {} ({}) for seller {}",
            product.id, product.title, product.seller_id
        );
        Ok(product)
    }

    /// Active listings only, filtered and windowed
    pub fn get_all_products(&self, filters: &ProductFilters) -> Result<Vec<Product>> {
        let products = self.lock_products()?;
        Ok(apply_filters(&products, filters))
    }

    pub fn get_product(&self, product_id: &str) -> Result<Option<Product>> {
        let products = self.lock_products()?;
        Ok(products.iter().find(|p| p.id == product_id).cloned())
    }

    /// Bump the view counter. Monotonic - there is no way back down.
    pub fn increment_views(&self, product_id: &str) -> Result<u64> {
        let mut products = self.lock_products()?;

        let mut next = products.clone();
        let product = next
            .iter_mut()
            .find(|p| p.id == product_id)
            .ok_or_else(|| Error::NotFound(format!("product {}", product_id)))?;
        product.views_count += 1;
        product.updated_at = Utc::now();
        let views = product.views_count;

        self.store.put(PRODUCTS_KEY, &serde_json::to_string(&next)?)?;
        *products = next;
        Ok(views)
    }

    /// Flip a product in and out of a user's favorites
    ///
    /// Two pieces of state move together here - the user's favorite set and
    /// the product's counter - so both go down in a single atomic store
    /// write. Returns the new membership state.
    pub fn toggle_favorite(&self, product_id: &str, user_id: &str) -> Result<bool> {
        let mut products = self.lock_products()?;

        let key = favorites_key(user_id);
        let mut favorites: Vec<String> =
            get_json(self.store.as_ref(), &key)?.unwrap_or_default();

        let mut next = products.clone();
        let product = next
            .iter_mut()
            .find(|p| p.id == product_id)
            .ok_or_else(|| Error::NotFound(format!("product {}", product_id)))?;

        let favorited = if let Some(pos) = favorites.iter().position(|f| f == product_id) {
            favorites.remove(pos);
            product.favorites_count = product.favorites_count.saturating_sub(1);
            false
        } else {
            favorites.push(product_id.to_string());
            product.favorites_count += 1;
            true
        };
        product.updated_at = Utc::now();

        self.store.put_many(&[
            (PRODUCTS_KEY, serde_json::to_string(&next)?),
            (key.as_str(), serde_json::to_string(&favorites)?),
        ])?;
        *products = next;

        debug!(
            "User {} {} product {}",
            user_id,
            if favorited { "favorited" } else { "unfavorited" },
            product_id
        );
        Ok(favorited)
    }

    /// A user's favorite product ids
    pub fn favorites(&self, user_id: &str) -> Result<Vec<String>> {
        Ok(get_json(self.store.as_ref(), &favorites_key(user_id))?.unwrap_or_default())
    }

    /// Explicit owner action: pause, reactivate or remove a listing
    pub fn set_status(&self, product_id: &str, status: ProductStatus) -> Result<Product> {
        let mut products = self.lock_products()?;

        let mut next = products.clone();
        let product = next
            .iter_mut()
            .find(|p| p.id == product_id)
            .ok_or_else(|| Error::NotFound(format!("product {}", product_id)))?;

        if !product.status.can_transition_to(status) {
            return Err(Error::Validation(format!(
                "cannot move product {} from {} to {}",
                product_id, product.status, status
            )));
        }
        product.status = status;
        product.updated_at = Utc::now();
        let updated = product.clone();

        self.store.put(PRODUCTS_KEY, &serde_json::to_string(&next)?)?;
        *products = next;
        Ok(updated)
    }

    /// Record a deal opening on both parties' activity
    pub fn open_deal(&self, product_id: &str, buyer_id: &str) -> Result<()> {
        let products = self.lock_products()?;
        let seller_id = products
            .iter()
            .find(|p| p.id == product_id)
            .map(|p| p.seller_id.clone())
            .ok_or_else(|| Error::NotFound(format!("product {}", product_id)))?;
        drop(products);

        let mut activity = self.load_activity()?;
        let now = Utc::now();
        let pairs = [
            (seller_id.clone(), buyer_id.to_string()),
            (buyer_id.to_string(), seller_id),
        ];
        for (user, counterparty) in &pairs {
            let entry = activity
                .entry(user.clone())
                .or_insert_with(|| UserActivity::new(user));
            if !entry
                .active_deals
                .iter()
                .any(|d| d.product_id == product_id && d.counterparty_id == counterparty.as_str())
            {
                entry.active_deals.push(ActiveDeal {
                    product_id: product_id.to_string(),
                    counterparty_id: counterparty.to_string(),
                    status: DealStatus::Negotiating,
                    opened_at: now,
                });
            }
            entry.recount();
        }

        self.store
            .put(ACTIVITY_KEY, &serde_json::to_string(&activity)?)?;
        Ok(())
    }

    /// Complete a sale: the listing goes to Sold and only now do the
    /// seller's sold set and the buyer's bought set change
    pub fn mark_sold(&self, product_id: &str, buyer_id: &str) -> Result<Product> {
        let mut products = self.lock_products()?;

        let mut next = products.clone();
        let product = next
            .iter_mut()
            .find(|p| p.id == product_id)
            .ok_or_else(|| Error::NotFound(format!("product {}", product_id)))?;

        if !product.status.can_transition_to(ProductStatus::Sold) {
            return Err(Error::Validation(format!(
                "cannot sell product {} in state {}",
                product_id, product.status
            )));
        }
        product.status = ProductStatus::Sold;
        product.updated_at = Utc::now();
        let seller_id = product.seller_id.clone();
        let updated = product.clone();

        let mut activity = self.load_activity()?;

        let seller = activity
            .entry(seller_id.clone())
            .or_insert_with(|| UserActivity::new(&seller_id));
        if !seller.products_sold.contains(&updated.id) {
            seller.products_sold.push(updated.id.clone());
        }
        close_deal(seller, product_id);
        seller.recount();

        let buyer = activity
            .entry(buyer_id.to_string())
            .or_insert_with(|| UserActivity::new(buyer_id));
        if !buyer.products_bought.contains(&updated.id) {
            buyer.products_bought.push(updated.id.clone());
        }
        close_deal(buyer, product_id);
        buyer.recount();

        self.store.put_many(&[
            (PRODUCTS_KEY, serde_json::to_string(&next)?),
            (ACTIVITY_KEY, serde_json::to_string(&activity)?),
        ])?;
        *products = next;

        info!("Product {} sold to {}", product_id, buyer_id);
        Ok(updated)
    }

    /// A user's activity rollup, empty if they have none yet
    pub fn user_activity(&self, user_id: &str) -> Result<UserActivity> {
        let activity = self.load_activity()?;
        Ok(activity
            .get(user_id)
            .cloned()
            .unwrap_or_else(|| UserActivity::new(user_id)))
    }

    /// Derive marketplace aggregates from current state - never cached
    pub fn get_marketplace_stats(&self) -> Result<MarketplaceStats> {
        let products = self.lock_products()?;
        let active: Vec<&Product> = products
            .iter()
            .filter(|p| p.status == ProductStatus::Active)
            .collect();

        let total_views = active.iter().map(|p| p.views_count).sum();
        let mut sellers: Vec<&str> = active.iter().map(|p| p.seller_id.as_str()).collect();
        sellers.sort_unstable();
        sellers.dedup();
        let mean_price = if active.is_empty() {
            0.0
        } else {
            active.iter().map(|p| p.price).sum::<f64>() / active.len() as f64
        };

        Ok(MarketplaceStats {
            active_products: active.len(),
            total_views,
            distinct_sellers: sellers.len(),
            mean_price,
        })
    }
}

fn close_deal(activity: &mut UserActivity, product_id: &str) {
    for deal in activity
        .active_deals
        .iter_mut()
        .filter(|d| d.product_id == product_id)
    {
        deal.status = DealStatus::Completed;
    }
    activity
        .active_deals
        .retain(|d| d.status != DealStatus::Completed);
}

/// Active-only, then category / price window / search, then paging.
/// Search is a case-insensitive substring match over title, description and
/// tags - a hit on any of them keeps the product.
pub fn apply_filters(products: &[Product], filters: &ProductFilters) -> Vec<Product> {
    let needle = filters
        .search_query
        .as_ref()
        .map(|q| q.trim().to_lowercase())
        .filter(|q| !q.is_empty());

    let mut out: Vec<Product> = products
        .iter()
        .filter(|p| p.status == ProductStatus::Active)
        .filter(|p| {
            filters
                .category
                .as_ref()
                .map(|c| p.category.eq_ignore_ascii_case(c))
                .unwrap_or(true)
        })
        .filter(|p| filters.min_price.map(|min| p.price >= min).unwrap_or(true))
        .filter(|p| filters.max_price.map(|max| p.price <= max).unwrap_or(true))
        .filter(|p| match &needle {
            Some(q) => {
                p.title.to_lowercase().contains(q)
                    || p.description.to_lowercase().contains(q)
                    || p.tags.iter().any(|t| t.to_lowercase().contains(q))
            }
            None => true,
        })
        .cloned()
        .collect();

    if let Some(offset) = filters.offset {
        out = out.into_iter().skip(offset).collect();
    }
    if let Some(limit) = filters.limit {
        out.truncate(limit);
    }
    out
}

/// `prod-{millis}-{random}` - the uuid fragment keeps rapid creations from
/// ever colliding
fn product_id(now: DateTime<Utc>) -> String {
    let frag = uuid::Uuid::new_v4().simple().to_string();
    format!("prod-{}-{}", now.timestamp_millis(), &frag[..8])
}

#[cfg(test)]
mod tests {
    use super::*;
    use maison_store::{MemoryStore, StoreError};
    use std::sync::atomic::{AtomicBool, Ordering};

    fn manager() -> CatalogManager {
        CatalogManager::new(Arc::new(MemoryStore::new())).unwrap()
    }

    fn draft(title: &str, price: f64, category: &str, seller: &str) -> ProductDraft {
        let mut d = ProductDraft::new(title, price, category, seller);
        d.description = format!("{} description", title);
        d
    }

    #[test]
    fn seeds_builtin_catalog_on_first_run() {
        let m = manager();
        let products = m.get_all_products(&ProductFilters::new()).unwrap();
        assert!(!products.is_empty());
    }

    #[test]
    fn create_assigns_distinct_ids_and_keeps_newest_first() {
        let m = manager();
        let mut ids = Vec::new();
        for i in 0..50 {
            let p = m
                .create_product(draft(&format!("Item {}", i), 100.0, "art", "u1"))
                .unwrap();
            assert!(p.id.starts_with("prod-"));
            assert_eq!(p.views_count, 0);
            assert_eq!(p.favorites_count, 0);
            assert_eq!(p.status, ProductStatus::Active);
            ids.push(p.id);
        }
        let mut unique = ids.clone();
        unique.sort();
        unique.dedup();
        assert_eq!(unique.len(), ids.len());

        // The most recent creation is listed first
        let products = m.get_all_products(&ProductFilters::new()).unwrap();
        assert_eq!(products[0].id, *ids.last().unwrap());
    }

    #[test]
    fn created_product_survives_a_reload() {
        let store: Arc<dyn BlobStore> = Arc::new(MemoryStore::new());
        let p = {
            let m = CatalogManager::new(store.clone()).unwrap();
            m.create_product(draft("Persisted", 50.0, "art", "u1")).unwrap()
        };
        let m2 = CatalogManager::new(store).unwrap();
        assert_eq!(m2.get_product(&p.id).unwrap().unwrap().title, "Persisted");
    }

    #[test]
    fn listing_is_not_selling() {
        let m = manager();
        let p = m.create_product(draft("Watch", 100.0, "watches", "u1")).unwrap();

        let activity = m.user_activity("u1").unwrap();
        assert!(activity.products_listed.contains(&p.id));
        assert!(activity.products_sold.is_empty());
        assert_eq!(activity.total_sales, 0);
    }

    #[test]
    fn mark_sold_updates_both_parties() {
        let m = manager();
        let p = m.create_product(draft("Watch", 100.0, "watches", "u1")).unwrap();
        m.open_deal(&p.id, "u2").unwrap();

        let sold = m.mark_sold(&p.id, "u2").unwrap();
        assert_eq!(sold.status, ProductStatus::Sold);

        let seller = m.user_activity("u1").unwrap();
        assert!(seller.products_sold.contains(&p.id));
        assert_eq!(seller.total_sales, 1);
        assert!(seller.active_deals.is_empty());

        let buyer = m.user_activity("u2").unwrap();
        assert!(buyer.products_bought.contains(&p.id));
        assert_eq!(buyer.total_purchases, 1);

        // Selling twice is a validation error, not a double count
        assert!(m.mark_sold(&p.id, "u3").is_err());
        assert_eq!(m.user_activity("u1").unwrap().total_sales, 1);
    }

    #[test]
    fn sold_products_leave_the_listings_but_not_the_record() {
        let m = manager();
        let p = m.create_product(draft("Watch", 100.0, "watches", "u1")).unwrap();
        m.mark_sold(&p.id, "u2").unwrap();

        let listed = m.get_all_products(&ProductFilters::new()).unwrap();
        assert!(listed.iter().all(|q| q.id != p.id));
        assert!(m.get_product(&p.id).unwrap().is_some());
    }

    #[test]
    fn pause_and_reactivate() {
        let m = manager();
        let p = m.create_product(draft("Pen", 300.0, "accessories", "u1")).unwrap();

        m.set_status(&p.id, ProductStatus::Paused).unwrap();
        let listed = m.get_all_products(&ProductFilters::new()).unwrap();
        assert!(listed.iter().all(|q| q.id != p.id));

        m.set_status(&p.id, ProductStatus::Active).unwrap();
        let listed = m.get_all_products(&ProductFilters::new()).unwrap();
        assert!(listed.iter().any(|q| q.id == p.id));

        // Sold is terminal
        m.set_status(&p.id, ProductStatus::Sold).unwrap();
        assert!(m.set_status(&p.id, ProductStatus::Active).is_err());
    }

    #[test]
    fn increment_views_is_monotonic() {
        let m = manager();
        let p = m.create_product(draft("Vase", 400.0, "art", "u1")).unwrap();

        for expected in 1..=5u64 {
            assert_eq!(m.increment_views(&p.id).unwrap(), expected);
        }
        let after = m.get_product(&p.id).unwrap().unwrap();
        assert_eq!(after.views_count, 5);
        assert!(after.updated_at >= after.created_at);
    }

    #[test]
    fn increment_views_on_unknown_id_is_not_found() {
        let m = manager();
        match m.increment_views("prod-does-not-exist") {
            Err(Error::NotFound(_)) => {}
            other => panic!("expected NotFound, got {:?}", other),
        }
    }

    #[test]
    fn toggle_favorite_round_trips() {
        let m = manager();
        let p = m.create_product(draft("Ring", 900.0, "jewelry", "u1")).unwrap();
        let before = m.get_product(&p.id).unwrap().unwrap().favorites_count;

        assert!(m.toggle_favorite(&p.id, "u2").unwrap());
        assert_eq!(m.favorites("u2").unwrap(), vec![p.id.clone()]);
        assert_eq!(
            m.get_product(&p.id).unwrap().unwrap().favorites_count,
            before + 1
        );

        assert!(!m.toggle_favorite(&p.id, "u2").unwrap());
        assert!(m.favorites("u2").unwrap().is_empty());
        assert_eq!(m.get_product(&p.id).unwrap().unwrap().favorites_count, before);
    }

    #[test]
    fn favorites_count_never_goes_negative() {
        let store: Arc<dyn BlobStore> = Arc::new(MemoryStore::new());
        // Hand-craft a corrupt state: favorited per the user blob but the
        // counter already at zero
        let m = CatalogManager::new(store.clone()).unwrap();
        let p = m
            .create_product(draft("Brooch", 150.0, "jewelry", "u1"))
            .unwrap();
        store
            .put(&favorites_key("u2"), &format!("[\"{}\"]", p.id))
            .unwrap();

        assert!(!m.toggle_favorite(&p.id, "u2").unwrap());
        assert_eq!(m.get_product(&p.id).unwrap().unwrap().favorites_count, 0);
    }

    /// Store whose writes can be switched off, for the failure-mid-toggle case
    struct FlakyStore {
        inner: MemoryStore,
        failing: AtomicBool,
    }

    impl FlakyStore {
        fn new() -> Self {
            Self {
                inner: MemoryStore::new(),
                failing: AtomicBool::new(false),
            }
        }

        fn fail_writes(&self, fail: bool) {
            self.failing.store(fail, Ordering::SeqCst);
        }

        fn check(&self) -> maison_store::store::Result<()> {
            if self.failing.load(Ordering::SeqCst) {
                Err(StoreError::Backend("disk full".into()))
            } else {
                Ok(())
            }
        }
    }

    impl BlobStore for FlakyStore {
        fn get(&self, key: &str) -> maison_store::store::Result<Option<String>> {
            self.inner.get(key)
        }
        fn put(&self, key: &str, value: &str) -> maison_store::store::Result<()> {
            self.check()?;
            self.inner.put(key, value)
        }
        fn put_many(&self, entries: &[(&str, String)]) -> maison_store::store::Result<()> {
            self.check()?;
            self.inner.put_many(entries)
        }
        fn delete(&self, key: &str) -> maison_store::store::Result<()> {
            self.inner.delete(key)
        }
    }

    #[test]
    fn failed_toggle_leaves_both_pieces_of_state_untouched() {
        let store = Arc::new(FlakyStore::new());
        let m = CatalogManager::new(store.clone() as Arc<dyn BlobStore>).unwrap();
        let p = m.create_product(draft("Clock", 2000.0, "art", "u1")).unwrap();

        store.fail_writes(true);
        assert!(m.toggle_favorite(&p.id, "u2").is_err());
        store.fail_writes(false);

        // Neither the membership nor the counter moved
        assert!(m.favorites("u2").unwrap().is_empty());
        assert_eq!(m.get_product(&p.id).unwrap().unwrap().favorites_count, 0);

        // And the call can simply be retried
        assert!(m.toggle_favorite(&p.id, "u2").unwrap());
    }

    #[test]
    fn filters_compose() {
        let m = manager();
        let mut cheap = draft("Small Print", 800.0, "art", "u1");
        cheap.tags = vec!["print".into()];
        m.create_product(cheap).unwrap();
        let mut pricey = draft("Large Canvas", 5000.0, "art", "u2");
        pricey.tags = vec!["canvas".into()];
        m.create_product(pricey).unwrap();
        m.create_product(draft("Necklace", 700.0, "jewelry", "u3")).unwrap();

        let results = m
            .get_all_products(&ProductFilters::new().category("art").max_price(1000.0))
            .unwrap();
        assert!(results
            .iter()
            .all(|p| p.category == "art" && p.price <= 1000.0));
        assert!(results.iter().any(|p| p.title == "Small Print"));
        assert!(results.iter().all(|p| p.title != "Large Canvas"));
        assert!(results.iter().all(|p| p.title != "Necklace"));
    }

    #[test]
    fn search_is_case_insensitive_union_over_fields() {
        let m = manager();
        let mut a = draft("Silk Scarf", 250.0, "accessories", "u1");
        a.description = "Hand-rolled edges".into();
        m.create_product(a).unwrap();
        let mut b = draft("Cufflinks", 400.0, "accessories", "u1");
        b.description = "Sterling silver with silk knots".into();
        m.create_product(b).unwrap();
        let mut c = draft("Tie Pin", 120.0, "accessories", "u1");
        c.tags = vec!["silk".into()];
        m.create_product(c).unwrap();

        let results = m
            .get_all_products(&ProductFilters::new().search("SILK"))
            .unwrap();
        let titles: Vec<_> = results.iter().map(|p| p.title.as_str()).collect();
        assert!(titles.contains(&"Silk Scarf")); // title hit
        assert!(titles.contains(&"Cufflinks")); // description hit
        assert!(titles.contains(&"Tie Pin")); // tag hit
    }

    #[test]
    fn paging_windows_the_filtered_set() {
        let m = manager();
        for i in 0..10 {
            m.create_product(draft(&format!("Lot {}", i), 100.0, "auction", "u1"))
                .unwrap();
        }

        let page = m
            .get_all_products(&ProductFilters::new().category("auction").offset(4).limit(3))
            .unwrap();
        assert_eq!(page.len(), 3);
        assert_eq!(page[0].title, "Lot 5"); // newest-first, so Lot 9 is index 0
    }

    #[test]
    fn stats_recompute_from_current_state() {
        let store: Arc<dyn BlobStore> = Arc::new(MemoryStore::new());
        // Empty the seed so the numbers are exact
        store.put(PRODUCTS_KEY, "[]").unwrap();
        let m = CatalogManager::new(store).unwrap();

        m.create_product(draft("A", 100.0, "art", "u1")).unwrap();
        let p = m.create_product(draft("B", 300.0, "art", "u2")).unwrap();
        m.increment_views(&p.id).unwrap();

        let stats = m.get_marketplace_stats().unwrap();
        assert_eq!(stats.active_products, 2);
        assert_eq!(stats.total_views, 1);
        assert_eq!(stats.distinct_sellers, 2);
        assert!((stats.mean_price - 200.0).abs() < f64::EPSILON);

        // Selling one changes the next call's numbers - nothing is cached
        m.mark_sold(&p.id, "u3").unwrap();
        let stats = m.get_marketplace_stats().unwrap();
        assert_eq!(stats.active_products, 1);
        assert_eq!(stats.total_views, 0);
    }
}
