//! End-to-end tests through the client crate against a running storefront.
//!
//! These tests require:
//! - A migrated `PostgreSQL` database
//! - The storefront running (`cargo run -p virtual-craft-storefront`) with
//!   its image container provisioned
//!
//! Run with: `cargo test -p virtual-craft-integration-tests -- --ignored`

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use std::sync::Arc;

use virtual_craft_client::{ApiClient, ClientError, ClientSession, ImageUpload, StorefrontApi};
use virtual_craft_core::{ExternalIdentity, ImagePatch, NewProduct, Price, ProductId};
use virtual_craft_integration_tests::{storefront_base_url, unique};

fn session() -> ClientSession {
    let api: Arc<dyn StorefrontApi> = Arc::new(ApiClient::new(&storefront_base_url()).unwrap());
    ClientSession::new(api)
}

fn upload(name: &str) -> ImageUpload {
    ImageUpload {
        bytes: vec![0xFF, 0xD8, 0xFF, 0xE0, 9, 9, 9],
        filename: name.to_string(),
        content_type: "image/jpeg".to_string(),
    }
}

#[tokio::test]
#[ignore = "Requires running storefront server"]
async fn test_product_and_gallery_round_trip() {
    let mut session = session();
    let created = session
        .products
        .create(&NewProduct {
            name: Some(unique("e2e-vase")),
            price: Some(Price::from_cents(2999)),
            ..NewProduct::default()
        })
        .await
        .unwrap();
    let id = created.product.id;

    let uploaded = session
        .products
        .upload_images(id, vec![upload("a.jpg"), upload("b.jpg")])
        .await
        .unwrap();
    assert!(uploaded[0].is_primary);

    session
        .products
        .update_image(id, uploaded[1].id, ImagePatch::promote())
        .await
        .unwrap();
    let gallery = session.products.fetch_images(id).await.unwrap();
    assert_eq!(gallery.iter().filter(|i| i.is_primary).count(), 1);

    session.products.delete(id).await.unwrap();
    assert!(session.products.fetch_by_id(id).await.is_err());
}

#[tokio::test]
#[ignore = "Requires running storefront server"]
async fn test_missing_product_surfaces_server_message() {
    let mut session = session();
    let err = session
        .products
        .fetch_by_id(ProductId::generate())
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Api { status: 404, .. }));
    assert!(session.products.error().unwrap().contains("not found"));
}

#[tokio::test]
#[ignore = "Requires running storefront server"]
async fn test_login_and_lookup() {
    let mut session = session();
    let email = format!("{}@example.com", unique("e2e"));

    assert!(session.users.find_by_email(&email).await.unwrap().is_none());
    let user = session
        .users
        .login_with_identity(&ExternalIdentity {
            email: email.clone(),
            name: "E2E".to_string(),
            picture: None,
        })
        .await
        .unwrap();
    assert!(!session.users.is_admin(user.id).await.unwrap());

    session.clear();
    let found = session.users.find_by_email(&email).await.unwrap().unwrap();
    assert_eq!(found.id, user.id);
}
