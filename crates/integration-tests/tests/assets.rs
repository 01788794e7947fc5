//! Catalog asset transaction: accept-all-or-discard-all uploads, per-field
//! replacement on update, and file release on delete.

use std::sync::Arc;

use maplemart_api::models::DetailBlock;
use maplemart_api::services::assets::{AssetField, AssetStaging, DetailBlockInput};
use maplemart_api::services::blobs::MemoryBlobStore;
use maplemart_api::services::catalog::{CatalogError, ProductUpdateForm};
use maplemart_integration_tests::{catalog_service, product_form, stores};
use rust_decimal::Decimal;

async fn stage_files(
    staging: &mut AssetStaging,
    field: AssetField,
    count: usize,
    content_type: &str,
) {
    for i in 0..count {
        staging
            .stage(field, &format!("file-{i}.bin"), content_type, vec![i as u8])
            .await
            .unwrap();
    }
}

#[tokio::test]
async fn create_with_three_main_images_discards_every_staged_file() {
    let stores = stores();
    let blobs = MemoryBlobStore::new();
    let service = catalog_service(&stores, &blobs);

    let mut staging = AssetStaging::new(Arc::new(blobs.clone()));
    stage_files(&mut staging, AssetField::MainImages, 3, "image/jpeg").await;
    stage_files(&mut staging, AssetField::MediaGallery, 2, "image/png").await;

    let err = service
        .create(
            product_form("Kettle", Decimal::new(100, 0), Decimal::new(80, 0)),
            staging,
        )
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        CatalogError::InvalidAssetCount {
            field: "mainImages",
            expected: 4,
            actual: 3,
        }
    ));

    // No product was created and no file survived.
    assert!(stores.catalog.list(false).await.unwrap().is_empty());
    assert!(blobs.is_empty());
}

#[tokio::test]
async fn create_links_every_staged_file_on_success() {
    let stores = stores();
    let blobs = MemoryBlobStore::new();
    let service = catalog_service(&stores, &blobs);

    let mut staging = AssetStaging::new(Arc::new(blobs.clone()));
    stage_files(&mut staging, AssetField::MainImages, 4, "image/jpeg").await;
    stage_files(&mut staging, AssetField::MediaGallery, 2, "video/mp4").await;
    stage_files(&mut staging, AssetField::BenefitImages, 2, "image/png").await;
    stage_files(&mut staging, AssetField::DetailMedia, 1, "video/mp4").await;

    let mut form = product_form("Kettle", Decimal::new(100, 0), Decimal::new(80, 0));
    form.detail_blocks = vec![
        DetailBlockInput::Text {
            content: "intro".to_owned(),
        },
        DetailBlockInput::Video {
            content: "demo".to_owned(),
            media: None,
        },
    ];

    let product = service.create(form, staging).await.unwrap();

    assert_eq!(product.main_images.len(), 4);
    assert!(product.main_images[0].featured);
    assert_eq!(product.gallery.len(), 2);
    assert_eq!(product.key_benefits.len(), 4);
    assert!(product.key_benefits[0].image.is_some());
    assert!(product.key_benefits[2].image.is_none());
    assert!(matches!(product.detail_blocks[1], DetailBlock::Video { .. }));

    // Every file the product references is exactly what the blob store holds.
    let files = product.asset_files();
    assert_eq!(files.len(), blobs.len());
    for file in &files {
        assert!(blobs.contains(file), "missing blob {file}");
    }
}

#[tokio::test]
async fn create_with_inverted_prices_discards_staged_files() {
    let stores = stores();
    let blobs = MemoryBlobStore::new();
    let service = catalog_service(&stores, &blobs);

    let mut staging = AssetStaging::new(Arc::new(blobs.clone()));
    stage_files(&mut staging, AssetField::MainImages, 4, "image/jpeg").await;

    let err = service
        .create(
            product_form("Kettle", Decimal::new(80, 0), Decimal::new(80, 0)),
            staging,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, CatalogError::InvalidPrice { .. }));
    assert!(blobs.is_empty());
}

#[tokio::test]
async fn create_with_wrong_benefit_count_discards_staged_files() {
    let stores = stores();
    let blobs = MemoryBlobStore::new();
    let service = catalog_service(&stores, &blobs);

    let mut staging = AssetStaging::new(Arc::new(blobs.clone()));
    stage_files(&mut staging, AssetField::MainImages, 4, "image/jpeg").await;

    let mut form = product_form("Kettle", Decimal::new(100, 0), Decimal::new(80, 0));
    form.key_benefits.pop();

    let err = service.create(form, staging).await.unwrap_err();
    assert!(matches!(
        err,
        CatalogError::InvalidAssetCount {
            field: "keyBenefits",
            expected: 4,
            actual: 3,
        }
    ));
    assert!(blobs.is_empty());
}

#[tokio::test]
async fn update_replaces_a_field_and_releases_only_its_old_files() {
    let stores = stores();
    let blobs = MemoryBlobStore::new();
    let service = catalog_service(&stores, &blobs);

    let mut staging = AssetStaging::new(Arc::new(blobs.clone()));
    stage_files(&mut staging, AssetField::MainImages, 4, "image/jpeg").await;
    stage_files(&mut staging, AssetField::MediaGallery, 2, "image/png").await;
    let product = service
        .create(
            product_form("Kettle", Decimal::new(100, 0), Decimal::new(80, 0)),
            staging,
        )
        .await
        .unwrap();
    let old_gallery: Vec<String> = product.gallery.iter().map(|a| a.url.clone()).collect();
    let old_mains: Vec<String> = product.main_images.iter().map(|a| a.url.clone()).collect();

    // Replace the gallery only.
    let mut staging = AssetStaging::new(Arc::new(blobs.clone()));
    stage_files(&mut staging, AssetField::MediaGallery, 3, "image/png").await;
    let updated = service
        .update(product.id, ProductUpdateForm::default(), staging)
        .await
        .unwrap();

    assert_eq!(updated.gallery.len(), 3);
    for old in &old_gallery {
        assert!(!blobs.contains(old), "old gallery file {old} not released");
    }
    for main in &old_mains {
        assert!(blobs.contains(main), "main image {main} must survive");
    }
}

#[tokio::test]
async fn failed_update_discards_staged_files_and_keeps_the_product_intact() {
    let stores = stores();
    let blobs = MemoryBlobStore::new();
    let service = catalog_service(&stores, &blobs);

    let mut staging = AssetStaging::new(Arc::new(blobs.clone()));
    stage_files(&mut staging, AssetField::MainImages, 4, "image/jpeg").await;
    let product = service
        .create(
            product_form("Kettle", Decimal::new(100, 0), Decimal::new(80, 0)),
            staging,
        )
        .await
        .unwrap();
    let files_before = blobs.len();

    // Re-upload only two main images: invalid, and must change nothing.
    let mut staging = AssetStaging::new(Arc::new(blobs.clone()));
    stage_files(&mut staging, AssetField::MainImages, 2, "image/jpeg").await;
    let err = service
        .update(product.id, ProductUpdateForm::default(), staging)
        .await
        .unwrap_err();
    assert!(matches!(err, CatalogError::InvalidAssetCount { .. }));

    assert_eq!(blobs.len(), files_before);
    let unchanged = service.get(product.id).await.unwrap();
    assert_eq!(
        unchanged.main_images.iter().map(|a| &a.url).collect::<Vec<_>>(),
        product.main_images.iter().map(|a| &a.url).collect::<Vec<_>>()
    );
}

#[tokio::test]
async fn deleting_a_product_releases_every_referenced_file() {
    let stores = stores();
    let blobs = MemoryBlobStore::new();
    let service = catalog_service(&stores, &blobs);

    let mut staging = AssetStaging::new(Arc::new(blobs.clone()));
    stage_files(&mut staging, AssetField::MainImages, 4, "image/jpeg").await;
    stage_files(&mut staging, AssetField::MediaGallery, 2, "video/mp4").await;
    stage_files(&mut staging, AssetField::BenefitImages, 4, "image/png").await;
    let product = service
        .create(
            product_form("Kettle", Decimal::new(100, 0), Decimal::new(80, 0)),
            staging,
        )
        .await
        .unwrap();
    assert!(!blobs.is_empty());

    service.delete(product.id).await.unwrap();
    assert!(blobs.is_empty());
    assert!(matches!(
        service.get(product.id).await.unwrap_err(),
        CatalogError::NotFound
    ));
}
