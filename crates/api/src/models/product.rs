//! Catalog entry model.
//!
//! A product carries four structured asset groups: exactly four main images,
//! a free-form media gallery, exactly four key benefits (each with an
//! optional image), and an ordered list of typed detail blocks. Asset `url`
//! fields are blob names handed out by the blob store, served under
//! `/uploads/{name}`.

use chrono::{DateTime, Utc};
use maplemart_core::{AssetKind, ProductId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Number of main images every product must carry.
pub const MAIN_IMAGE_COUNT: usize = 4;

/// Number of key benefits every product must carry.
pub const KEY_BENEFIT_COUNT: usize = 4;

/// A stored media asset referenced by a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductAsset {
    pub kind: AssetKind,
    pub url: String,
    #[serde(default)]
    pub caption: String,
    #[serde(default)]
    pub featured: bool,
}

impl ProductAsset {
    /// An image asset with no caption.
    #[must_use]
    pub fn image(url: impl Into<String>) -> Self {
        Self {
            kind: AssetKind::Image,
            url: url.into(),
            caption: String::new(),
            featured: false,
        }
    }
}

/// One of the four selling points shown on a product page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyBenefit {
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub image: Option<String>,
}

/// A typed block of long-form product detail content.
///
/// Non-text blocks reference a stored media file; the upload transaction
/// pairs them with staged files by ordinal position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum DetailBlock {
    Text { content: String },
    Image { content: String, media: String },
    Video { content: String, media: String },
}

impl DetailBlock {
    /// Whether this block consumes a staged media asset.
    #[must_use]
    pub const fn wants_media(&self) -> bool {
        !matches!(self, Self::Text { .. })
    }

    /// The referenced media file, if any.
    #[must_use]
    pub fn media(&self) -> Option<&str> {
        match self {
            Self::Text { .. } => None,
            Self::Image { media, .. } | Self::Video { media, .. } => Some(media.as_str()),
        }
    }
}

/// A catalog entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub title: String,
    pub description: String,
    pub categories: Vec<String>,
    pub original_price: Decimal,
    pub current_price: Decimal,
    pub tax_rate: Decimal,
    pub in_stock: bool,
    pub visible: bool,
    /// Available quantity; decremented by reservations, restored on cancel.
    #[serde(rename = "countInStock")]
    pub stock: i32,
    pub main_images: Vec<ProductAsset>,
    pub gallery: Vec<ProductAsset>,
    pub key_benefits: Vec<KeyBenefit>,
    pub detail_blocks: Vec<DetailBlock>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Every blob name this product references, across all asset groups.
    ///
    /// Used when deleting a product to release its files.
    #[must_use]
    pub fn asset_files(&self) -> Vec<String> {
        let mut files: Vec<String> = self
            .main_images
            .iter()
            .chain(&self.gallery)
            .map(|asset| asset.url.clone())
            .collect();
        files.extend(self.key_benefits.iter().filter_map(|b| b.image.clone()));
        files.extend(
            self.detail_blocks
                .iter()
                .filter_map(|block| block.media().map(str::to_owned)),
        );
        files
    }
}

/// Fields for a new catalog entry, with assets already validated and linked.
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub title: String,
    pub description: String,
    pub categories: Vec<String>,
    pub original_price: Decimal,
    pub current_price: Decimal,
    pub tax_rate: Decimal,
    pub in_stock: bool,
    pub stock: i32,
    pub main_images: Vec<ProductAsset>,
    pub gallery: Vec<ProductAsset>,
    pub key_benefits: Vec<KeyBenefit>,
    pub detail_blocks: Vec<DetailBlock>,
}

/// Partial update for an existing catalog entry.
///
/// `None` leaves the stored value untouched; asset groups are replaced as a
/// whole when present (per-field replacement semantics).
#[derive(Debug, Clone, Default)]
pub struct ProductPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub categories: Option<Vec<String>>,
    pub original_price: Option<Decimal>,
    pub current_price: Option<Decimal>,
    pub tax_rate: Option<Decimal>,
    pub in_stock: Option<bool>,
    pub main_images: Option<Vec<ProductAsset>>,
    pub gallery: Option<Vec<ProductAsset>>,
    pub key_benefits: Option<Vec<KeyBenefit>>,
    pub detail_blocks: Option<Vec<DetailBlock>>,
}

impl ProductPatch {
    /// Apply this patch on top of an existing product, bumping `updated_at`.
    #[must_use]
    pub fn apply(self, mut product: Product, now: DateTime<Utc>) -> Product {
        if let Some(title) = self.title {
            product.title = title;
        }
        if let Some(description) = self.description {
            product.description = description;
        }
        if let Some(categories) = self.categories {
            product.categories = categories;
        }
        if let Some(original_price) = self.original_price {
            product.original_price = original_price;
        }
        if let Some(current_price) = self.current_price {
            product.current_price = current_price;
        }
        if let Some(tax_rate) = self.tax_rate {
            product.tax_rate = tax_rate;
        }
        if let Some(in_stock) = self.in_stock {
            product.in_stock = in_stock;
        }
        if let Some(main_images) = self.main_images {
            product.main_images = main_images;
        }
        if let Some(gallery) = self.gallery {
            product.gallery = gallery;
        }
        if let Some(key_benefits) = self.key_benefits {
            product.key_benefits = key_benefits;
        }
        if let Some(detail_blocks) = self.detail_blocks {
            product.detail_blocks = detail_blocks;
        }
        product.updated_at = now;
        product
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detail_blocks_use_tagged_wire_format() {
        let block: DetailBlock =
            serde_json::from_str(r#"{"type":"image","content":"close-up","media":"detail-1.jpg"}"#)
                .unwrap();
        assert_eq!(
            block,
            DetailBlock::Image {
                content: "close-up".to_owned(),
                media: "detail-1.jpg".to_owned(),
            }
        );
        assert!(block.wants_media());

        let text: DetailBlock = serde_json::from_str(r#"{"type":"text","content":"hi"}"#).unwrap();
        assert!(!text.wants_media());
        assert_eq!(text.media(), None);
    }

    #[test]
    fn asset_files_collects_every_group() {
        let product = Product {
            id: ProductId::new(1),
            title: "Kettle".to_owned(),
            description: String::new(),
            categories: vec![],
            original_price: Decimal::new(4999, 2),
            current_price: Decimal::new(3999, 2),
            tax_rate: Decimal::ZERO,
            in_stock: true,
            visible: true,
            stock: 5,
            main_images: vec![ProductAsset::image("m1.jpg"), ProductAsset::image("m2.jpg")],
            gallery: vec![ProductAsset::image("g1.jpg")],
            key_benefits: vec![
                KeyBenefit {
                    title: "Fast".to_owned(),
                    description: "boils quick".to_owned(),
                    image: Some("b1.jpg".to_owned()),
                },
                KeyBenefit {
                    title: "Quiet".to_owned(),
                    description: "whisper".to_owned(),
                    image: None,
                },
            ],
            detail_blocks: vec![
                DetailBlock::Text {
                    content: "intro".to_owned(),
                },
                DetailBlock::Video {
                    content: "demo".to_owned(),
                    media: "d1.mp4".to_owned(),
                },
            ],
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let files = product.asset_files();
        assert_eq!(files, vec!["m1.jpg", "m2.jpg", "g1.jpg", "b1.jpg", "d1.mp4"]);
    }
}
