//! End-to-end cart and checkout flows against a file-backed storefront.

#![allow(clippy::unwrap_used)]

use leather_shop_core::ProductId;
use leather_shop_integration_tests::{TestShop, fill, valid_form};
use leather_shop_storefront::cart::CartView;
use leather_shop_storefront::checkout::{CheckoutError, CheckoutPhase, Field, derive_summary};
use leather_shop_storefront::orders::SimulatedOrderPlacer;
use rust_decimal::Decimal;
use tokio_util::sync::CancellationToken;

const ONE_JACKET: &str = r#"[
    {"id": 1, "title": "Classic Biker Jacket", "price": 100.00,
     "image": "/images/biker.jpg", "category": "men"}
]"#;

#[tokio::test]
async fn test_two_jackets_total_with_tax() {
    let shop = TestShop::with_catalog(ONE_JACKET).await;
    shop.storefront
        .cart()
        .add(ProductId::new(1), "M", 2)
        .unwrap();

    let reconciler = shop.storefront.reconciler();
    assert_eq!(reconciler.subtotal().unwrap(), Decimal::new(200, 0));

    let summary = derive_summary(&reconciler.materialize().unwrap()).unwrap();
    assert_eq!(summary.tax, Decimal::new(20, 0));
    assert_eq!(summary.shipping, Decimal::ZERO);
    assert_eq!(summary.total, Decimal::new(220, 0));
}

#[tokio::test]
async fn test_checkout_places_order_and_empties_cart() {
    let shop = TestShop::new().await;
    shop.storefront.cart().add(ProductId::new(5), "S", 1).unwrap();
    shop.storefront.cart().add(ProductId::new(10), "One Size", 2).unwrap();

    let mut session = shop.storefront.checkout(SimulatedOrderPlacer);
    fill(&mut session, &valid_form());
    assert_eq!(session.form().state, "California");
    assert_eq!(session.form().country, "United States");

    let confirmation = session.submit(&CancellationToken::new()).await.unwrap();
    assert!(confirmation.order_id.starts_with("LS-"));
    assert!(matches!(session.phase(), CheckoutPhase::Success(_)));

    assert!(shop.storefront.cart().is_empty().unwrap());
    assert!(shop.reopen().cart().is_empty().unwrap());
}

#[tokio::test]
async fn test_invalid_form_leaves_cart_untouched() {
    let shop = TestShop::new().await;
    shop.storefront.cart().add(ProductId::new(1), "L", 1).unwrap();

    let mut session = shop.storefront.checkout(SimulatedOrderPlacer);
    let mut form = valid_form();
    form.email = "ada@localhost".to_string();
    form.terms_accepted = false;
    fill(&mut session, &form);

    let Err(CheckoutError::Invalid(errors)) = session.submit(&CancellationToken::new()).await
    else {
        panic!("expected validation errors");
    };
    assert_eq!(errors.len(), 2);
    assert!(errors.contains(Field::Email));
    assert!(errors.contains(Field::TermsAccepted));
    assert_eq!(shop.storefront.cart().item_count().unwrap(), 1);
}

#[tokio::test]
async fn test_cart_survives_reopen() {
    let shop = TestShop::new().await;
    shop.storefront.cart().add(ProductId::new(2), "M", 1).unwrap();
    shop.storefront.cart().add(ProductId::new(2), "XL", 2).unwrap();
    shop.storefront.cart().add(ProductId::new(4), "L", 1).unwrap();

    let reopened = shop.reopen();
    let entries = reopened.cart().list().unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].product_id, ProductId::new(2));
    assert_eq!(entries[0].size, "XL");
    assert_eq!(entries[0].quantity, 3);
    assert_eq!(reopened.cart().item_count().unwrap(), 4);
}

#[tokio::test]
async fn test_two_tabs_writing_the_cart_never_fail() {
    let shop = TestShop::new().await;
    let tabs = [shop.storefront.clone(), shop.reopen()];

    let handles: Vec<_> = tabs
        .into_iter()
        .zip([1, 2])
        .map(|(tab, id)| {
            std::thread::spawn(move || {
                for _ in 0..25 {
                    tab.cart().add(ProductId::new(id), "M", 1).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    // Interleaved writes may overwrite each other, but the cart stays readable.
    let entries = shop.reopen().cart().list().unwrap();
    assert!(!entries.is_empty());
    assert!(entries.iter().all(|e| e.quantity >= 1));
}

#[tokio::test]
async fn test_catalog_snapshot_is_not_refetched() {
    let shop = TestShop::with_catalog(ONE_JACKET).await;

    // Once persisted, the bootstrap document is never read again.
    std::fs::remove_file(shop.catalog_path()).unwrap();

    let reopened = shop.reopen();
    let products = reopened.catalog().load(&shop.catalog_source()).await.unwrap();
    assert_eq!(products.len(), 1);
    assert_eq!(products[0].title, "Classic Biker Jacket");
}

#[tokio::test]
async fn test_stale_cart_entry_is_hidden_but_removable() {
    let shop = TestShop::with_catalog(ONE_JACKET).await;
    shop.storefront.cart().add(ProductId::new(1), "M", 1).unwrap();
    shop.storefront.cart().add(ProductId::new(42), "M", 5).unwrap();

    let view = shop.storefront.reconciler().view().unwrap();
    assert_eq!(view.items.len(), 1);
    assert_eq!(view.item_count, 1);
    assert_eq!(view.subtotal, "$100.00");

    assert!(shop.storefront.cart().remove(ProductId::new(42)).unwrap());
    assert_eq!(shop.storefront.cart().list().unwrap().len(), 1);
    assert_eq!(shop.storefront.reconciler().view().unwrap(), view);
}

#[tokio::test]
async fn test_empty_cart_checkout_is_refused() {
    let shop = TestShop::new().await;
    assert_eq!(shop.storefront.reconciler().view().unwrap(), CartView::empty());

    let mut session = shop.storefront.checkout(SimulatedOrderPlacer);
    fill(&mut session, &valid_form());

    assert!(matches!(
        session.submit(&CancellationToken::new()).await,
        Err(CheckoutError::EmptyCart)
    ));
    let CheckoutPhase::Editing {
        submission_error, ..
    } = session.phase()
    else {
        panic!("expected editing phase");
    };
    assert!(submission_error.is_some());
}
