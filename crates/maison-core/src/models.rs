use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Product listing - the star of the show
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub title: String,
    pub description: String,
    /// Non-negative; enforced at creation
    pub price: f64,
    pub currency: String,
    pub category: String,
    #[serde(default)]
    pub subcategory: Option<String>,
    /// Ordered; the first entry is the primary image
    #[serde(default)]
    pub images: Vec<String>,
    pub condition: Condition,
    #[serde(default)]
    pub shipping: ShippingTerms,
    #[serde(default)]
    pub tags: Vec<String>,
    pub status: ProductStatus,
    pub seller_id: String,
    /// Mutated only through increment_views, never by direct write
    #[serde(default)]
    pub views_count: u64,
    /// Mutated only through toggle_favorite, floored at zero
    #[serde(default)]
    pub favorites_count: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    pub fn primary_image(&self) -> Option<&str> {
        self.images.first().map(|s| s.as_str())
    }
}

/// Lifecycle state of a listing
///
/// Draft -> Active -> {Sold, Paused, Removed}; Paused -> Active is allowed.
/// Sold and Removed are terminal for marketplace visibility but the record
/// itself sticks around.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ProductStatus {
    Draft,
    Active,
    Paused,
    Sold,
    Removed,
}

impl ProductStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProductStatus::Draft => "draft",
            ProductStatus::Active => "active",
            ProductStatus::Paused => "paused",
            ProductStatus::Sold => "sold",
            ProductStatus::Removed => "removed",
        }
    }

    /// Parse a wire value; anything unrecognized counts as active so a
    /// newer backend can't make listings vanish
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "draft" => ProductStatus::Draft,
            "paused" => ProductStatus::Paused,
            "sold" | "archived" => ProductStatus::Sold,
            "removed" => ProductStatus::Removed,
            _ => ProductStatus::Active,
        }
    }

    /// Whether a transition is one of the explicit owner actions
    pub fn can_transition_to(&self, next: ProductStatus) -> bool {
        use ProductStatus::*;
        matches!(
            (*self, next),
            (Draft, Active) | (Active, Paused) | (Active, Sold) | (Active, Removed)
                | (Paused, Active)
                | (Paused, Removed)
        )
    }
}

impl std::fmt::Display for ProductStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Physical condition of the item
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    New,
    LikeNew,
    Excellent,
    Good,
    Fair,
}

impl Condition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Condition::New => "new",
            Condition::LikeNew => "like_new",
            Condition::Excellent => "excellent",
            Condition::Good => "good",
            Condition::Fair => "fair",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "new" => Condition::New,
            "like_new" | "like-new" => Condition::LikeNew,
            "excellent" => Condition::Excellent,
            "fair" => Condition::Fair,
            _ => Condition::Good,
        }
    }
}

impl std::fmt::Display for Condition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Shipping terms attached to a listing
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default)]
pub struct ShippingTerms {
    pub included: bool,
    pub cost: f64,
}

/// What a seller hands us to create a listing
#[derive(Debug, Clone)]
pub struct ProductDraft {
    pub title: String,
    pub description: String,
    pub price: f64,
    pub currency: String,
    pub category: String,
    pub subcategory: Option<String>,
    pub images: Vec<String>,
    pub condition: Condition,
    pub shipping: ShippingTerms,
    pub tags: Vec<String>,
    /// Defaults to Active when unset
    pub status: Option<ProductStatus>,
    pub seller_id: String,
}

impl ProductDraft {
    pub fn new(title: &str, price: f64, category: &str, seller_id: &str) -> Self {
        Self {
            title: title.to_string(),
            description: String::new(),
            price,
            currency: "USD".to_string(),
            category: category.to_string(),
            subcategory: None,
            images: Vec::new(),
            condition: Condition::Good,
            shipping: ShippingTerms::default(),
            tags: Vec::new(),
            status: None,
            seller_id: seller_id.to_string(),
        }
    }

    pub fn validate(&self) -> crate::Result<()> {
        if self.title.trim().is_empty() {
            return Err(crate::Error::Validation("title must not be empty".into()));
        }
        if self.seller_id.trim().is_empty() {
            return Err(crate::Error::Validation("seller_id must not be empty".into()));
        }
        if !self.price.is_finite() || self.price < 0.0 {
            return Err(crate::Error::Validation(
                "price must be a non-negative number".into(),
            ));
        }
        if self.currency.trim().is_empty() {
            return Err(crate::Error::Validation("currency must not be empty".into()));
        }
        Ok(())
    }
}

/// Filters accepted by the product listing operations
///
/// Unrecognized concerns simply have no field here; callers can't pass them.
#[derive(Debug, Clone, Default)]
pub struct ProductFilters {
    pub category: Option<String>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    /// Case-insensitive substring match over title, description and tags
    pub search_query: Option<String>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl ProductFilters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn category(mut self, category: &str) -> Self {
        self.category = Some(category.to_string());
        self
    }

    pub fn min_price(mut self, min: f64) -> Self {
        self.min_price = Some(min);
        self
    }

    pub fn max_price(mut self, max: f64) -> Self {
        self.max_price = Some(max);
        self
    }

    pub fn search(mut self, query: &str) -> Self {
        self.search_query = Some(query.to_string());
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }
}

/// Notification event categories - a closed set
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Inquiry,
    Deal,
    Payment,
    Verification,
    System,
    Marketing,
    /// Anything a newer backend sends that we don't recognize
    #[serde(other)]
    Other,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::Inquiry => "inquiry",
            NotificationKind::Deal => "deal",
            NotificationKind::Payment => "payment",
            NotificationKind::Verification => "verification",
            NotificationKind::System => "system",
            NotificationKind::Marketing => "marketing",
            NotificationKind::Other => "other",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "inquiry" => NotificationKind::Inquiry,
            "deal" => NotificationKind::Deal,
            "payment" => NotificationKind::Payment,
            "verification" => NotificationKind::Verification,
            "system" => NotificationKind::System,
            "marketing" => NotificationKind::Marketing,
            _ => NotificationKind::Other,
        }
    }

    /// Label for UI consumption; unrecognized kinds degrade to "Info"
    pub fn label(&self) -> &'static str {
        match self {
            NotificationKind::Inquiry => "Inquiry",
            NotificationKind::Deal => "Deal",
            NotificationKind::Payment => "Payment",
            NotificationKind::Verification => "Verification",
            NotificationKind::System => "System",
            NotificationKind::Marketing => "Marketing",
            NotificationKind::Other => "Info",
        }
    }
}

impl std::fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Urgency of a notification
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Default)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    High,
    Urgent,
    #[default]
    #[serde(other)]
    Medium,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
            Priority::Urgent => "urgent",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Priority::Low,
            "high" => Priority::High,
            "urgent" => Priority::Urgent,
            _ => Priority::Medium,
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Optional pointer to the entity a notification talks about, used by the
/// UI for navigation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelatedEntity {
    pub kind: String,
    pub id: String,
}

/// A message to exactly one user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: String,
    pub user_id: String,
    pub kind: NotificationKind,
    pub priority: Priority,
    pub title: String,
    #[serde(default)]
    pub body: String,
    pub read: bool,
    /// Set exactly once, on the unread-to-read transition, never cleared
    #[serde(default)]
    pub read_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub related: Option<RelatedEntity>,
    pub created_at: DateTime<Utc>,
}

/// What callers hand us to create a notification
#[derive(Debug, Clone)]
pub struct NotificationDraft {
    pub user_id: String,
    pub kind: NotificationKind,
    pub priority: Priority,
    pub title: String,
    pub body: String,
    pub related: Option<RelatedEntity>,
}

impl NotificationDraft {
    pub fn validate(&self) -> crate::Result<()> {
        if self.user_id.trim().is_empty() {
            return Err(crate::Error::Validation("user_id must not be empty".into()));
        }
        if self.title.trim().is_empty() {
            return Err(crate::Error::Validation("title must not be empty".into()));
        }
        Ok(())
    }
}

/// Query window for notification listings
#[derive(Debug, Clone, Default)]
pub struct NotificationQuery {
    pub unread_only: bool,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl NotificationQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn unread_only(mut self) -> Self {
        self.unread_only = true;
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }
}

/// Sub-status of an in-flight deal
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DealStatus {
    Negotiating,
    AwaitingPayment,
    Shipping,
    Completed,
}

/// A deal in progress, recorded on both parties' activity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActiveDeal {
    pub product_id: String,
    pub counterparty_id: String,
    pub status: DealStatus,
    pub opened_at: DateTime<Utc>,
}

/// Per-user marketplace rollup
///
/// The counters always equal the cardinality of their id sets; `recount`
/// re-derives them after every mutation so the invariant is structural
/// rather than bookkept by hand.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserActivity {
    pub user_id: String,
    /// Every product this user has put on the marketplace
    #[serde(default)]
    pub products_listed: Vec<String>,
    /// Only products with a completed sale land here
    #[serde(default)]
    pub products_sold: Vec<String>,
    #[serde(default)]
    pub products_bought: Vec<String>,
    #[serde(default)]
    pub active_deals: Vec<ActiveDeal>,
    #[serde(default)]
    pub total_sales: u64,
    #[serde(default)]
    pub total_purchases: u64,
    pub updated_at: DateTime<Utc>,
}

impl UserActivity {
    pub fn new(user_id: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            products_listed: Vec::new(),
            products_sold: Vec::new(),
            products_bought: Vec::new(),
            active_deals: Vec::new(),
            total_sales: 0,
            total_purchases: 0,
            updated_at: Utc::now(),
        }
    }

    /// Re-derive the counters from the id sets
    pub fn recount(&mut self) {
        self.total_sales = self.products_sold.len() as u64;
        self.total_purchases = self.products_bought.len() as u64;
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_transitions() {
        use ProductStatus::*;
        assert!(Draft.can_transition_to(Active));
        assert!(Active.can_transition_to(Sold));
        assert!(Active.can_transition_to(Paused));
        assert!(Paused.can_transition_to(Active));
        assert!(!Sold.can_transition_to(Active));
        assert!(!Removed.can_transition_to(Active));
        assert!(!Draft.can_transition_to(Sold));
    }

    #[test]
    fn unknown_kind_degrades_to_info() {
        assert_eq!(NotificationKind::parse("flash_sale"), NotificationKind::Other);
        assert_eq!(NotificationKind::Other.label(), "Info");

        // Same behavior through serde, thanks to #[serde(other)]
        let kind: NotificationKind = serde_json::from_str("\"flash_sale\"").unwrap();
        assert_eq!(kind, NotificationKind::Other);
    }

    #[test]
    fn unknown_priority_degrades_to_medium() {
        assert_eq!(Priority::parse("catastrophic"), Priority::Medium);
        assert_eq!(Priority::parse("urgent"), Priority::Urgent);
    }

    #[test]
    fn draft_validation() {
        let mut draft = ProductDraft::new("Vintage Watch", 100.0, "watches", "u1");
        assert!(draft.validate().is_ok());

        draft.price = -1.0;
        assert!(draft.validate().is_err());

        draft.price = f64::NAN;
        assert!(draft.validate().is_err());

        draft.price = 0.0;
        draft.title = "  ".into();
        assert!(draft.validate().is_err());
    }

    #[test]
    fn recount_keeps_counters_in_step_with_sets() {
        let mut activity = UserActivity::new("u1");
        activity.products_sold.push("p1".into());
        activity.products_sold.push("p2".into());
        activity.products_bought.push("p3".into());
        activity.recount();

        assert_eq!(activity.total_sales, 2);
        assert_eq!(activity.total_purchases, 1);
    }
}
