//! Integration tests for the menu CSV import command.

use async_trait::async_trait;
use sunville_cli::commands::import::{
    DirectImages, ImageResolver, ImportError, ImportSummary, import_menu, read_menu,
};
use sunville_integration_tests::FakePayments;
use sunville_storefront::services::PaymentProcessor;

const MENU: &str = "\
Category,Name (Enlgish),Name (Chinese),Price,Image URL
Buns,Ube Cheese Bun,紫薯芝士包,3.25,https://i.ibb.co/ube.jpg
Bread,Pandesal,,4.50,
";

/// Image host that is always down.
struct UnreachableImages;

#[async_trait]
impl ImageResolver for UnreachableImages {
    async fn resolve(&self, url: &str) -> Result<String, ImportError> {
        Err(ImportError::Image {
            url: url.to_string(),
            reason: "connection refused".to_string(),
        })
    }
}

// =============================================================================
// Fresh catalog
// =============================================================================

#[tokio::test]
async fn test_import_creates_products_with_default_prices() {
    let payments = FakePayments::default();
    let items = read_menu(MENU.as_bytes()).expect("valid menu");

    let summary = import_menu(&payments, &DirectImages, &items)
        .await
        .expect("import runs");

    assert_eq!(
        summary,
        ImportSummary {
            created: 2,
            ..ImportSummary::default()
        }
    );

    let products = payments.list_products(false).await.expect("list products");
    assert_eq!(products.len(), 2);
    let ube = &products[0];
    assert_eq!(ube.name, "Ube Cheese Bun 紫薯芝士包");
    assert_eq!(ube.category, "Buns");
    assert_eq!(ube.price, "3.25");
    assert!(ube.price_id.starts_with("price_"));
    assert_eq!(ube.image, "https://i.ibb.co/ube.jpg");
    assert_eq!(products[1].image, "/placeholder.svg");

    let calls = payments.calls();
    assert!(calls.contains(&format!("create_price {} 325", ube.id)));
    assert!(calls.contains(&format!("set_default_price {} {}", ube.id, ube.price_id)));
    assert!(!calls.iter().any(|c| c.starts_with("archive_price")));
}

#[tokio::test]
async fn test_unresolvable_image_falls_back_to_placeholder() {
    let payments = FakePayments::default();
    let items = read_menu(MENU.as_bytes()).expect("valid menu");

    let summary = import_menu(&payments, &UnreachableImages, &items)
        .await
        .expect("import runs");

    assert_eq!(summary.created, 2);
    assert_eq!(summary.failed, 0);
    let products = payments.list_products(false).await.expect("list products");
    assert_eq!(products[0].image, "/placeholder.svg");
}

#[tokio::test]
async fn test_duplicate_rows_update_the_first_product() {
    let payments = FakePayments::default();
    let menu = "\
Category,Name (Enlgish),Name (Chinese),Price,Image URL
Buns,Taro Bun,,3.00,
Buns,Taro Bun,,3.50,
";
    let items = read_menu(menu.as_bytes()).expect("valid menu");

    let summary = import_menu(&payments, &DirectImages, &items)
        .await
        .expect("import runs");

    assert_eq!(summary.created, 1);
    assert_eq!(summary.updated, 1);
    assert_eq!(summary.repriced, 1);
    let products = payments.list_products(false).await.expect("list products");
    assert_eq!(products.len(), 1);
    assert_eq!(products[0].price, "3.50");
}

// =============================================================================
// Existing catalog
// =============================================================================

#[tokio::test]
async fn test_reimport_with_same_price_only_updates_fields() {
    let payments = FakePayments::default();
    payments.add_product("prod_ube", "Ube Cheese Bun 紫薯芝士包", "price_ube", "3.25", true);
    let items = read_menu(MENU.as_bytes()).expect("valid menu");

    let summary = import_menu(&payments, &DirectImages, &items)
        .await
        .expect("import runs");

    assert_eq!(summary.updated, 1);
    assert_eq!(summary.repriced, 0);
    assert_eq!(summary.created, 1);

    let calls = payments.calls();
    assert!(calls.contains(&"update_product prod_ube".to_string()));
    assert!(!calls.iter().any(|c| c.starts_with("create_price prod_ube")));
    assert!(!calls.iter().any(|c| c.starts_with("archive_price")));
}

#[tokio::test]
async fn test_reimport_with_new_price_replaces_it() {
    let payments = FakePayments::default();
    payments.add_product("prod_ube", "Ube Cheese Bun 紫薯芝士包", "price_ube", "2.75", true);
    let items = read_menu(MENU.as_bytes()).expect("valid menu");

    let summary = import_menu(&payments, &DirectImages, &items)
        .await
        .expect("import runs");

    assert_eq!(summary.repriced, 1);
    let calls = payments.calls();
    assert!(calls.contains(&"archive_price price_ube".to_string()));
    assert!(calls.contains(&"create_price prod_ube 325".to_string()));

    let ube = payments.product("prod_ube").expect("product exists");
    assert_eq!(ube.price, "3.25");
    assert_ne!(ube.price_id, "price_ube");
}

// =============================================================================
// Validation
// =============================================================================

#[test]
fn test_invalid_menu_is_rejected_before_import() {
    let menu = "\
Category,Name (Enlgish),Name (Chinese),Price,Image URL
Buns,Ube Cheese Bun,,abc,
";
    let result = read_menu(menu.as_bytes());
    assert!(matches!(result, Err(ImportError::InvalidRows(rows)) if rows.len() == 1));
}
