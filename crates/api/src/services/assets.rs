//! Staged upload handling for catalog assets.
//!
//! A create/update request uploads files under four logical fields. Files are
//! staged into the blob store as they arrive; nothing is linked to a product
//! until the whole set has validated. On any failure every staged file is
//! discarded (best-effort), so neither orphaned files nor dangling references
//! survive a failed request.

use std::sync::Arc;

use maplemart_core::AssetKind;
use serde::Deserialize;
use tracing::warn;

use super::blobs::BlobStore;
use super::catalog::CatalogError;
use crate::models::product::{
    DetailBlock, KEY_BENEFIT_COUNT, KeyBenefit, MAIN_IMAGE_COUNT, Product, ProductAsset,
};

/// Logical upload field an asset was submitted under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetField {
    MainImages,
    MediaGallery,
    BenefitImages,
    DetailMedia,
}

impl AssetField {
    /// Resolve a multipart field name.
    #[must_use]
    pub fn from_multipart(name: &str) -> Option<Self> {
        match name {
            "mainImages" => Some(Self::MainImages),
            "mediaGallery" => Some(Self::MediaGallery),
            "keyBenefitImages" => Some(Self::BenefitImages),
            "productDetailMedia" => Some(Self::DetailMedia),
            _ => None,
        }
    }

    /// Wire name of this field.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::MainImages => "mainImages",
            Self::MediaGallery => "mediaGallery",
            Self::BenefitImages => "keyBenefitImages",
            Self::DetailMedia => "productDetailMedia",
        }
    }

    /// Upper bound on files accepted under this field in one request.
    #[must_use]
    pub const fn max_files(self) -> usize {
        match self {
            Self::MainImages | Self::BenefitImages => 4,
            Self::MediaGallery | Self::DetailMedia => 10,
        }
    }
}

/// A file accepted into the blob store but not yet linked to a product.
#[derive(Debug, Clone)]
pub struct StagedAsset {
    pub field: AssetField,
    pub name: String,
    pub kind: AssetKind,
}

/// The staged files of one create/update request.
///
/// Ordinal position within a field is the order the files arrived in, which
/// is how benefit images and detail media pair with their payload entries.
pub struct AssetStaging {
    blobs: Arc<dyn BlobStore>,
    staged: Vec<StagedAsset>,
}

impl AssetStaging {
    /// Start an empty staging set against the given blob store.
    #[must_use]
    pub fn new(blobs: Arc<dyn BlobStore>) -> Self {
        Self {
            blobs,
            staged: Vec::new(),
        }
    }

    /// Accept one uploaded file into the blob store.
    ///
    /// # Errors
    ///
    /// Fails with `InvalidAssetCount` when the field is already at its file
    /// cap, or with a storage error if the blob cannot be written.
    pub async fn stage(
        &mut self,
        field: AssetField,
        original_name: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<(), CatalogError> {
        let current = self.count(field);
        if current >= field.max_files() {
            return Err(CatalogError::InvalidAssetCount {
                field: field.as_str(),
                expected: field.max_files(),
                actual: current + 1,
            });
        }
        let kind = AssetKind::from_content_type(content_type);
        let name = self.blobs.put(field.as_str(), original_name, bytes).await?;
        self.staged.push(StagedAsset { field, name, kind });
        Ok(())
    }

    /// Staged assets of one field, in arrival order.
    #[must_use]
    pub fn of(&self, field: AssetField) -> Vec<&StagedAsset> {
        self.staged
            .iter()
            .filter(|asset| asset.field == field)
            .collect()
    }

    /// Number of staged assets under one field.
    #[must_use]
    pub fn count(&self, field: AssetField) -> usize {
        self.staged
            .iter()
            .filter(|asset| asset.field == field)
            .count()
    }

    /// Delete every staged file, best-effort.
    ///
    /// Individual deletion failures are logged and swallowed: cleanup must
    /// never mask the validation error that triggered it.
    pub async fn discard(&self) {
        for asset in &self.staged {
            if let Err(e) = self.blobs.delete(&asset.name).await {
                warn!(blob = %asset.name, error = %e, "failed to discard staged asset");
            }
        }
    }
}

/// A key-benefit entry from the structured payload.
#[derive(Debug, Clone, Deserialize)]
pub struct KeyBenefitInput {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
}

/// A detail-block entry from the structured payload.
///
/// `media` carries an already-linked file name when a client round-trips an
/// existing block through an update; it is ignored on create.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum DetailBlockInput {
    Text {
        #[serde(default)]
        content: String,
    },
    Image {
        #[serde(default)]
        content: String,
        #[serde(default)]
        media: Option<String>,
    },
    Video {
        #[serde(default)]
        content: String,
        #[serde(default)]
        media: Option<String>,
    },
}

impl DetailBlockInput {
    const fn wants_media(&self) -> bool {
        !matches!(self, Self::Text { .. })
    }

    fn existing_media(&self) -> Option<&str> {
        match self {
            Self::Text { .. } => None,
            Self::Image { media, .. } | Self::Video { media, .. } => media.as_deref(),
        }
    }

    fn into_block(self, media: Option<String>) -> DetailBlock {
        match self {
            Self::Text { content } => DetailBlock::Text { content },
            Self::Image { content, .. } => DetailBlock::Image {
                content,
                media: media.unwrap_or_default(),
            },
            Self::Video { content, .. } => DetailBlock::Video {
                content,
                media: media.unwrap_or_default(),
            },
        }
    }
}

/// Asset lists ready to be linked into a new product.
#[derive(Debug)]
pub struct LinkedAssets {
    pub main_images: Vec<ProductAsset>,
    pub gallery: Vec<ProductAsset>,
    pub key_benefits: Vec<KeyBenefit>,
    pub detail_blocks: Vec<DetailBlock>,
}

fn main_image_asset(index: usize, name: &str) -> ProductAsset {
    ProductAsset {
        kind: AssetKind::Image,
        url: name.to_owned(),
        caption: format!("Main Image {}", index + 1),
        featured: index == 0,
    }
}

/// Validate a create request's staged files against its structured payload
/// and produce the asset lists for the new product.
///
/// Validation order: main image count, key benefit count, price ordering,
/// detail-media correspondence. Nothing is linked unless all of it holds.
///
/// # Errors
///
/// `InvalidAssetCount` or `InvalidPrice` naming the offending field/values.
pub fn link_new(
    original_price: rust_decimal::Decimal,
    current_price: rust_decimal::Decimal,
    benefits: &[KeyBenefitInput],
    details: &[DetailBlockInput],
    staging: &AssetStaging,
) -> Result<LinkedAssets, CatalogError> {
    let main = staging.of(AssetField::MainImages);
    if main.len() != MAIN_IMAGE_COUNT {
        return Err(CatalogError::InvalidAssetCount {
            field: AssetField::MainImages.as_str(),
            expected: MAIN_IMAGE_COUNT,
            actual: main.len(),
        });
    }

    if benefits.len() != KEY_BENEFIT_COUNT {
        return Err(CatalogError::InvalidAssetCount {
            field: "keyBenefits",
            expected: KEY_BENEFIT_COUNT,
            actual: benefits.len(),
        });
    }

    if current_price >= original_price {
        return Err(CatalogError::InvalidPrice {
            original: original_price,
            current: current_price,
        });
    }

    let detail_media = staging.of(AssetField::DetailMedia);
    let wanted = details.iter().filter(|d| d.wants_media()).count();
    if detail_media.len() != wanted {
        return Err(CatalogError::InvalidAssetCount {
            field: AssetField::DetailMedia.as_str(),
            expected: wanted,
            actual: detail_media.len(),
        });
    }

    let benefit_images = staging.of(AssetField::BenefitImages);
    let key_benefits = benefits
        .iter()
        .enumerate()
        .map(|(i, benefit)| KeyBenefit {
            title: benefit.title.clone(),
            description: benefit.description.clone(),
            image: benefit_images.get(i).map(|asset| asset.name.clone()),
        })
        .collect();

    let mut media = detail_media.into_iter();
    let detail_blocks = details
        .iter()
        .cloned()
        .map(|block| {
            let staged = if block.wants_media() {
                media.next().map(|asset| asset.name.clone())
            } else {
                None
            };
            block.into_block(staged)
        })
        .collect();

    Ok(LinkedAssets {
        main_images: main
            .iter()
            .enumerate()
            .map(|(i, asset)| main_image_asset(i, &asset.name))
            .collect(),
        gallery: staging
            .of(AssetField::MediaGallery)
            .into_iter()
            .map(|asset| ProductAsset {
                kind: asset.kind,
                url: asset.name.clone(),
                caption: String::new(),
                featured: false,
            })
            .collect(),
        key_benefits,
        detail_blocks,
    })
}

/// Replacement asset lists computed for an update request.
///
/// `None` fields keep the stored lists; `replaced_files` are the previously
/// linked files to delete once the update has persisted.
#[derive(Debug, Default)]
pub struct UpdatePlan {
    pub main_images: Option<Vec<ProductAsset>>,
    pub gallery: Option<Vec<ProductAsset>>,
    pub key_benefits: Option<Vec<KeyBenefit>>,
    pub detail_blocks: Option<Vec<DetailBlock>>,
    pub replaced_files: Vec<String>,
}

/// Validate an update request's staged files and payload against the stored
/// product, producing per-field replacements.
///
/// Asset fields are replaced as a whole; files of a replaced field are
/// deleted only after the new set has validated and persisted. Benefit
/// images and detail media not re-uploaded fall back to the stored ones by
/// ordinal position.
///
/// # Errors
///
/// `InvalidAssetCount` naming the offending field.
pub fn link_update(
    existing: &Product,
    benefits: Option<&[KeyBenefitInput]>,
    details: Option<&[DetailBlockInput]>,
    staging: &AssetStaging,
) -> Result<UpdatePlan, CatalogError> {
    let mut plan = UpdatePlan::default();

    let main = staging.of(AssetField::MainImages);
    if !main.is_empty() {
        if main.len() != MAIN_IMAGE_COUNT {
            return Err(CatalogError::InvalidAssetCount {
                field: AssetField::MainImages.as_str(),
                expected: MAIN_IMAGE_COUNT,
                actual: main.len(),
            });
        }
        plan.replaced_files
            .extend(existing.main_images.iter().map(|a| a.url.clone()));
        plan.main_images = Some(
            main.iter()
                .enumerate()
                .map(|(i, asset)| main_image_asset(i, &asset.name))
                .collect(),
        );
    }

    let gallery = staging.of(AssetField::MediaGallery);
    if !gallery.is_empty() {
        plan.replaced_files
            .extend(existing.gallery.iter().map(|a| a.url.clone()));
        plan.gallery = Some(
            gallery
                .into_iter()
                .map(|asset| ProductAsset {
                    kind: asset.kind,
                    url: asset.name.clone(),
                    caption: String::new(),
                    featured: false,
                })
                .collect(),
        );
    }

    let benefit_images = staging.of(AssetField::BenefitImages);
    if let Some(benefits) = benefits {
        if benefits.len() != KEY_BENEFIT_COUNT {
            return Err(CatalogError::InvalidAssetCount {
                field: "keyBenefits",
                expected: KEY_BENEFIT_COUNT,
                actual: benefits.len(),
            });
        }
        let key_benefits: Vec<KeyBenefit> = benefits
            .iter()
            .enumerate()
            .map(|(i, benefit)| KeyBenefit {
                title: benefit.title.clone(),
                description: benefit.description.clone(),
                image: benefit_images.get(i).map_or_else(
                    || existing.key_benefits.get(i).and_then(|b| b.image.clone()),
                    |asset| Some(asset.name.clone()),
                ),
            })
            .collect();
        // Old benefit images displaced by a re-upload at the same position.
        for (i, old) in existing.key_benefits.iter().enumerate() {
            if benefit_images.get(i).is_some()
                && let Some(old_image) = &old.image
            {
                plan.replaced_files.push(old_image.clone());
            }
        }
        plan.key_benefits = Some(key_benefits);
    } else if !benefit_images.is_empty() {
        // Uploaded benefit images with no benefit payload to attach to.
        return Err(CatalogError::InvalidAssetCount {
            field: AssetField::BenefitImages.as_str(),
            expected: 0,
            actual: benefit_images.len(),
        });
    }

    let detail_media = staging.of(AssetField::DetailMedia);
    if let Some(details) = details {
        let wanted = details.iter().filter(|d| d.wants_media()).count();
        if detail_media.len() > wanted {
            return Err(CatalogError::InvalidAssetCount {
                field: AssetField::DetailMedia.as_str(),
                expected: wanted,
                actual: detail_media.len(),
            });
        }

        let mut staged = detail_media.iter();
        let mut blocks = Vec::with_capacity(details.len());
        for block in details {
            let media = if block.wants_media() {
                match staged.next() {
                    Some(asset) => Some(asset.name.clone()),
                    None => match block.existing_media() {
                        Some(name) => Some(name.to_owned()),
                        None => {
                            return Err(CatalogError::InvalidAssetCount {
                                field: AssetField::DetailMedia.as_str(),
                                expected: wanted,
                                actual: detail_media.len(),
                            });
                        }
                    },
                }
            } else {
                None
            };
            blocks.push(block.clone().into_block(media));
        }

        // Old detail media no longer referenced by any new block.
        let kept: std::collections::HashSet<&str> =
            blocks.iter().filter_map(DetailBlock::media).collect();
        plan.replaced_files.extend(
            existing
                .detail_blocks
                .iter()
                .filter_map(DetailBlock::media)
                .filter(|old| !kept.contains(old))
                .map(str::to_owned),
        );
        plan.detail_blocks = Some(blocks);
    } else if !detail_media.is_empty() {
        return Err(CatalogError::InvalidAssetCount {
            field: AssetField::DetailMedia.as_str(),
            expected: 0,
            actual: detail_media.len(),
        });
    }

    Ok(plan)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use rust_decimal::Decimal;

    use super::*;
    use crate::services::blobs::MemoryBlobStore;

    async fn staged(files: &[(AssetField, &str)]) -> (AssetStaging, MemoryBlobStore) {
        let blobs = MemoryBlobStore::new();
        let mut staging = AssetStaging::new(Arc::new(blobs.clone()));
        for (field, name) in files {
            staging
                .stage(*field, name, "image/jpeg", vec![0u8])
                .await
                .unwrap();
        }
        (staging, blobs)
    }

    fn four_benefits() -> Vec<KeyBenefitInput> {
        (0..4)
            .map(|i| KeyBenefitInput {
                title: format!("Benefit {i}"),
                description: "because".to_owned(),
            })
            .collect()
    }

    fn four_mains() -> Vec<(AssetField, &'static str)> {
        vec![
            (AssetField::MainImages, "a.jpg"),
            (AssetField::MainImages, "b.jpg"),
            (AssetField::MainImages, "c.jpg"),
            (AssetField::MainImages, "d.jpg"),
        ]
    }

    #[tokio::test]
    async fn link_new_requires_exactly_four_main_images() {
        let (staging, _) = staged(&[
            (AssetField::MainImages, "a.jpg"),
            (AssetField::MainImages, "b.jpg"),
            (AssetField::MainImages, "c.jpg"),
        ])
        .await;
        let err = link_new(
            Decimal::new(100, 0),
            Decimal::new(50, 0),
            &four_benefits(),
            &[],
            &staging,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            CatalogError::InvalidAssetCount {
                field: "mainImages",
                expected: 4,
                actual: 3,
            }
        ));
    }

    #[tokio::test]
    async fn link_new_rejects_price_inversion() {
        let (staging, _) = staged(&four_mains()).await;
        let err = link_new(
            Decimal::new(50, 0),
            Decimal::new(50, 0),
            &four_benefits(),
            &[],
            &staging,
        )
        .unwrap_err();
        assert!(matches!(err, CatalogError::InvalidPrice { .. }));
    }

    #[tokio::test]
    async fn link_new_pairs_detail_media_by_ordinal() {
        let mut files = four_mains();
        files.push((AssetField::DetailMedia, "vid.mp4"));
        let (staging, _) = staged(&files).await;

        let details = vec![
            DetailBlockInput::Text {
                content: "intro".to_owned(),
            },
            DetailBlockInput::Video {
                content: "demo".to_owned(),
                media: None,
            },
        ];
        let linked = link_new(
            Decimal::new(100, 0),
            Decimal::new(50, 0),
            &four_benefits(),
            &details,
            &staging,
        )
        .unwrap();

        assert_eq!(linked.main_images.len(), 4);
        assert!(linked.main_images[0].featured);
        assert_eq!(linked.main_images[1].caption, "Main Image 2");
        match &linked.detail_blocks[1] {
            DetailBlock::Video { media, .. } => assert!(media.starts_with("productDetailMedia-")),
            other => panic!("expected video block, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn link_new_rejects_unconsumed_detail_media() {
        let mut files = four_mains();
        files.push((AssetField::DetailMedia, "vid.mp4"));
        let (staging, _) = staged(&files).await;

        // Only text blocks, so the staged video would be orphaned.
        let details = vec![DetailBlockInput::Text {
            content: "intro".to_owned(),
        }];
        let err = link_new(
            Decimal::new(100, 0),
            Decimal::new(50, 0),
            &four_benefits(),
            &details,
            &staging,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            CatalogError::InvalidAssetCount {
                field: "productDetailMedia",
                expected: 0,
                actual: 1,
            }
        ));
    }

    #[tokio::test]
    async fn staging_enforces_per_field_caps() {
        let blobs = MemoryBlobStore::new();
        let mut staging = AssetStaging::new(Arc::new(blobs));
        for i in 0..4 {
            staging
                .stage(
                    AssetField::MainImages,
                    &format!("{i}.jpg"),
                    "image/jpeg",
                    vec![],
                )
                .await
                .unwrap();
        }
        let err = staging
            .stage(AssetField::MainImages, "extra.jpg", "image/jpeg", vec![])
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::InvalidAssetCount { .. }));
    }

    #[tokio::test]
    async fn discard_removes_every_staged_file() {
        let (staging, blobs) = staged(&four_mains()).await;
        assert_eq!(blobs.len(), 4);
        staging.discard().await;
        assert!(blobs.is_empty());
    }
}
