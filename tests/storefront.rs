//! Storefront read path against a seeded in-memory store.

use chrono::{DateTime, Duration, Utc};
use serde_json::{json, Value};
use std::sync::Arc;
use storefront_ingest::model::{PRODUCTS, STORES};
use storefront_ingest::view::{categories, is_new, view};
use storefront_ingest::{
    order_link, order_message, CatalogReader, CategoryFilter, InMemoryDocumentStore, Product,
    SortMode, StorefrontError, ViewQuery,
};

fn now() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2026-10-16T12:00:00Z")
        .unwrap()
        .with_timezone(&Utc)
}

fn obj(v: Value) -> serde_json::Map<String, Value> {
    v.as_object().cloned().unwrap()
}

fn seeded() -> Arc<InMemoryDocumentStore> {
    let mem = Arc::new(InMemoryDocumentStore::new());
    mem.insert_with_id(
        STORES,
        "s1",
        obj(json!({
            "name": "Football House",
            "handle": "football-house",
            "whatsapp": "+91 98765 43210",
            "themeColor": "#0f766e",
            "ownerId": "u1"
        })),
    );
    mem.insert_with_id(
        STORES,
        "s2",
        obj(json!({ "name": "Other", "whatsapp": "15550001111" })),
    );
    mem.insert_with_id(
        PRODUCTS,
        "p-shirt",
        obj(json!({
            "storeId": "s1", "name": "Shirt", "price": 200, "category": "tops",
            "image": "https://i.example/shirt.jpg",
            "createdAt": now().to_rfc3339()
        })),
    );
    mem.insert_with_id(
        PRODUCTS,
        "p-pants",
        obj(json!({
            "storeId": "s1", "name": "Pants", "price": 500, "category": "bottoms",
            "image": "https://i.example/pants.jpg",
            "createdAt": (now() - Duration::days(10)).to_rfc3339()
        })),
    );
    mem.insert_with_id(
        PRODUCTS,
        "p-other",
        obj(json!({
            "storeId": "s2", "name": "Shirt elsewhere", "price": 1,
            "image": "https://i.example/x.jpg"
        })),
    );
    mem
}

fn names(cards: &[storefront_ingest::ProductCard]) -> Vec<&str> {
    cards.iter().map(|c| c.product.name.as_str()).collect()
}

#[tokio::test]
async fn price_desc_over_all_categories() {
    let reader = CatalogReader::new(seeded());
    let q = ViewQuery::new("", "all", SortMode::PriceDesc);
    let front = reader.load_storefront("s1", &q, now()).await.unwrap();
    assert_eq!(names(&front.cards), vec!["Pants", "Shirt"]);
}

#[tokio::test]
async fn search_with_newest_sort() {
    let reader = CatalogReader::new(seeded());
    let q = ViewQuery::new("shi", "all", SortMode::Newest);
    let front = reader
        .load_storefront("football-house", &q, now())
        .await
        .unwrap();
    assert_eq!(names(&front.cards), vec!["Shirt"]);
    assert!(front.cards[0].is_new);
}

#[tokio::test]
async fn storefront_carries_theme_categories_and_badges() {
    let reader = CatalogReader::new(seeded());
    let front = reader
        .load_storefront("s1", &ViewQuery::default(), now())
        .await
        .unwrap();

    assert_eq!(front.theme.color, "#0f766e");
    assert_eq!(front.categories, vec!["all", "tops", "bottoms"]);
    assert_eq!(names(&front.cards), vec!["Shirt", "Pants"]);
    assert_eq!(
        front.cards.iter().map(|c| c.is_new).collect::<Vec<_>>(),
        vec![true, false]
    );

    let other = reader
        .load_storefront("s2", &ViewQuery::default(), now())
        .await
        .unwrap();
    assert_eq!(other.theme.color, "#6366f1");
    assert_eq!(other.categories, vec!["all"]);
}

#[tokio::test]
async fn unknown_store_is_not_found() {
    let reader = CatalogReader::new(seeded());
    let err = reader
        .load_storefront("no-such-shop", &ViewQuery::default(), now())
        .await
        .unwrap_err();
    assert!(matches!(err, StorefrontError::NotFound { .. }));
}

#[tokio::test]
async fn order_link_is_encoded_deep_link() {
    let reader = CatalogReader::new(seeded());
    let store = reader.resolve_store("football-house").await.unwrap();
    let product = reader.product("p-shirt").await.unwrap();
    let page = "https://shop.example/s/football-house";

    let message = order_message(&store, &product, page);
    assert_eq!(
        message,
        "Hi Football House, I want to order:\n\n*Shirt*\nPrice: ₹200\n\nLink: https://shop.example/s/football-house"
    );

    let link = order_link(&store, &product, page).unwrap();
    assert_eq!(link.host_str(), Some("wa.me"));
    assert_eq!(link.path(), "/919876543210");
    let text: Vec<_> = link
        .query_pairs()
        .filter(|(k, _)| k == "text")
        .map(|(_, v)| v.into_owned())
        .collect();
    assert_eq!(text, vec![message]);
}

// ── Pure view properties ─────────────────────────────────────────────────

fn product(name: &str, price: f64, category: Option<&str>, desc: Option<&str>) -> Product {
    Product {
        id: name.to_string(),
        store_id: "s1".into(),
        name: name.into(),
        price,
        description: desc.map(str::to_string),
        category: category.map(str::to_string),
        image: "u".into(),
        created_at: None,
    }
}

fn catalog() -> Vec<Product> {
    vec![
        product("Red Cap", 150.0, Some("hats"), None),
        product("Jersey", 900.0, Some("tops"), Some("red home kit")),
        product("Scarf", 300.0, None, Some("wool")),
        product("Tee", 250.0, Some(""), None),
        product("Beanie", 120.0, Some("hats"), Some("RED knit")),
    ]
}

fn ids(v: &[&Product]) -> Vec<String> {
    v.iter().map(|p| p.id.clone()).collect()
}

#[test]
fn filters_are_a_conjunction() {
    let ps = catalog();
    let q = ViewQuery::new("red", "hats", SortMode::PriceAsc);
    assert_eq!(ids(&view(&ps, &q)), vec!["Beanie", "Red Cap"]);

    // Same result whichever filter runs first.
    let by_search: Vec<Product> = view(&ps, &ViewQuery::new("red", "all", SortMode::PriceAsc))
        .into_iter()
        .cloned()
        .collect();
    let by_both = view(&by_search, &ViewQuery::new("", "hats", SortMode::PriceAsc));
    assert_eq!(ids(&by_both), vec!["Beanie", "Red Cap"]);
}

#[test]
fn all_category_equals_no_category_filter() {
    let ps = catalog();
    let all = view(&ps, &ViewQuery::new("", CategoryFilter::All, SortMode::Newest));
    assert_eq!(all.len(), ps.len());
    assert_eq!(categories(&ps), vec!["all", "hats", "tops"]);
}

#[test]
fn sort_is_idempotent_and_reversible() {
    let ps = catalog();
    let asc = view(&ps, &ViewQuery::new("", "all", SortMode::PriceAsc));
    let resorted: Vec<Product> = asc.iter().map(|p| (*p).clone()).collect();
    let again = view(&resorted, &ViewQuery::new("", "all", SortMode::PriceAsc));
    assert_eq!(ids(&asc), ids(&again));

    let mut reversed = ids(&asc);
    reversed.reverse();
    let desc = view(&ps, &ViewQuery::new("", "all", SortMode::PriceDesc));
    assert_eq!(ids(&desc), reversed);
}

#[test]
fn new_badge_boundaries() {
    let mut p = product("x", 1.0, None, None);
    p.created_at = Some(now());
    assert!(is_new(&p, now()));
    p.created_at = Some(now() - Duration::days(8));
    assert!(!is_new(&p, now()));
}
