// Built-in fallback data - what the marketplace shows when no backend is
// configured or reachable. A degraded page beats a broken one.

use crate::models::{
    Condition, Notification, NotificationKind, Priority, Product, ProductStatus, RelatedEntity,
    ShippingTerms,
};
use chrono::{Duration, Utc};

/// The built-in catalog, newest first
///
/// Ids are stable so favorites and view counts survive re-seeding within a
/// session; timestamps are staggered so ordering stays deterministic.
pub fn mock_products() -> Vec<Product> {
    let now = Utc::now();
    let item = |days_ago: i64,
                id: &str,
                title: &str,
                description: &str,
                price: f64,
                category: &str,
                subcategory: &str,
                condition: Condition,
                tags: &[&str],
                views: u64,
                favorites: u64| {
        let created = now - Duration::days(days_ago);
        Product {
            id: id.to_string(),
            title: title.to_string(),
            description: description.to_string(),
            price,
            currency: "USD".to_string(),
            category: category.to_string(),
            subcategory: Some(subcategory.to_string()),
            images: vec![format!("https://images.maison.market/{}/primary.jpg", id)],
            condition,
            shipping: ShippingTerms {
                included: price >= 5000.0,
                cost: if price >= 5000.0 { 0.0 } else { 45.0 },
            },
            tags: tags.iter().map(|t| t.to_string()).collect(),
            status: ProductStatus::Active,
            seller_id: format!("seller-{}", (days_ago % 3) + 1),
            views_count: views,
            favorites_count: favorites,
            created_at: created,
            updated_at: created,
        }
    };

    vec![
        item(
            1,
            "prod-mock-001",
            "Patek Philippe Calatrava 5227",
            "White gold dress watch, box and papers, serviced 2024.",
            32_500.0,
            "watches",
            "dress",
            Condition::Excellent,
            &["patek", "white gold", "calatrava"],
            412,
            37,
        ),
        item(
            3,
            "prod-mock-002",
            "Hermès Birkin 30 Togo",
            "Gold hardware, étoupe leather, full set with receipt.",
            18_900.0,
            "bags",
            "handbags",
            Condition::LikeNew,
            &["hermes", "birkin", "togo"],
            389,
            54,
        ),
        item(
            5,
            "prod-mock-003",
            "Marc Chagall Lithograph",
            "Signed and numbered 58/90, framed, certificate of authenticity.",
            7_400.0,
            "art",
            "prints",
            Condition::Good,
            &["chagall", "lithograph", "signed"],
            233,
            19,
        ),
        item(
            8,
            "prod-mock-004",
            "Cartier Love Bracelet",
            "Yellow gold, size 17, screwdriver included.",
            5_600.0,
            "jewelry",
            "bracelets",
            Condition::Excellent,
            &["cartier", "love", "gold"],
            178,
            22,
        ),
        item(
            12,
            "prod-mock-005",
            "Montblanc Meisterstück 149",
            "Platinum-coated, 18k bicolor nib, near mint.",
            680.0,
            "accessories",
            "pens",
            Condition::LikeNew,
            &["montblanc", "fountain pen"],
            95,
            8,
        ),
        item(
            15,
            "prod-mock-006",
            "Bronze Horse Sculpture",
            "Early 20th century French bronze, dark patina, 34cm.",
            2_950.0,
            "art",
            "sculpture",
            Condition::Good,
            &["bronze", "sculpture", "french"],
            141,
            11,
        ),
    ]
}

/// Seed notifications for a user, newest first
///
/// Three unread and one read, which is the state several tests and the
/// badge-count scenario lean on.
pub fn mock_notifications(user_id: &str) -> Vec<Notification> {
    let now = Utc::now();
    vec![
        Notification {
            id: format!("ntf-mock-{}-001", user_id),
            user_id: user_id.to_string(),
            kind: NotificationKind::Inquiry,
            priority: Priority::Medium,
            title: "New inquiry on your Calatrava".to_string(),
            body: "A verified buyer asked about service history.".to_string(),
            read: false,
            read_at: None,
            related: Some(RelatedEntity {
                kind: "product".to_string(),
                id: "prod-mock-001".to_string(),
            }),
            created_at: now - Duration::hours(2),
        },
        Notification {
            id: format!("ntf-mock-{}-002", user_id),
            user_id: user_id.to_string(),
            kind: NotificationKind::Deal,
            priority: Priority::High,
            title: "Offer received: Birkin 30".to_string(),
            body: "Buyer offered $17,500. Respond within 48 hours.".to_string(),
            read: false,
            read_at: None,
            related: Some(RelatedEntity {
                kind: "product".to_string(),
                id: "prod-mock-002".to_string(),
            }),
            created_at: now - Duration::hours(8),
        },
        Notification {
            id: format!("ntf-mock-{}-003", user_id),
            user_id: user_id.to_string(),
            kind: NotificationKind::Verification,
            priority: Priority::Urgent,
            title: "Seller verification pending".to_string(),
            body: "Upload one more proof of address to finish verification.".to_string(),
            read: false,
            read_at: None,
            related: None,
            created_at: now - Duration::days(1),
        },
        Notification {
            id: format!("ntf-mock-{}-004", user_id),
            user_id: user_id.to_string(),
            kind: NotificationKind::System,
            priority: Priority::Low,
            title: "Welcome to the marketplace".to_string(),
            body: "Tips for your first listing.".to_string(),
            read: true,
            read_at: Some(now - Duration::days(2)),
            related: None,
            created_at: now - Duration::days(3),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_is_nonempty_active_and_newest_first() {
        let products = mock_products();
        assert!(!products.is_empty());
        assert!(products.iter().all(|p| p.status == ProductStatus::Active));
        for pair in products.windows(2) {
            assert!(pair[0].created_at >= pair[1].created_at);
        }
    }

    #[test]
    fn catalog_ids_are_distinct() {
        let products = mock_products();
        let mut ids: Vec<_> = products.iter().map(|p| p.id.as_str()).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), products.len());
    }

    #[test]
    fn seed_notifications_have_three_unread() {
        let notifications = mock_notifications("u1");
        assert_eq!(notifications.iter().filter(|n| !n.read).count(), 3);
        assert!(notifications.iter().all(|n| n.user_id == "u1"));
        // read_at only on read ones
        assert!(notifications
            .iter()
            .all(|n| n.read == n.read_at.is_some()));
    }
}
