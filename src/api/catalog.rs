//! Supplier catalog endpoints: products, variants, images and FAQs.

use async_trait::async_trait;
use reqwest::Method;
use serde::{Deserialize, Serialize};
use crate::domain::aggregates::{CollectionKind, Faq, ImageRecord, ProductDetail, ProductDraft, Variant};
use crate::domain::sequence::PositionUpdate;
use crate::domain::value_objects::RecordId;
use super::{ApiClient, ApiError};

/// Where an image collection lives on the backend.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ImageScope {
    Product { product_id: String },
    APlusContent { product_id: String },
    Variant { product_id: String, variant_id: String },
}

impl ImageScope {
    pub fn kind(&self) -> CollectionKind {
        match self {
            Self::Product { .. } => CollectionKind::Product,
            Self::APlusContent { .. } => CollectionKind::APlusContent,
            Self::Variant { .. } => CollectionKind::Variant,
        }
    }

    pub fn collection_path(&self) -> String {
        match self {
            Self::Product { product_id } => format!("/api/v1/products/{}/images", product_id),
            Self::APlusContent { product_id } => format!("/api/v1/products/{}/aplus-images", product_id),
            Self::Variant { product_id, variant_id } => format!("/api/v1/products/{}/variants/{}/images", product_id, variant_id),
        }
    }

    pub fn positions_path(&self) -> String {
        match self {
            Self::Product { product_id } => format!("/api/v1/products/{}/image-positions", product_id),
            Self::APlusContent { product_id } => format!("/api/v1/products/{}/aplus-image-positions", product_id),
            Self::Variant { product_id, variant_id } => format!("/api/v1/products/{}/variants/{}/image-positions", product_id, variant_id),
        }
    }
}

/// Image metadata sent after the binary is in storage.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewImage {
    pub url: String,
    pub alt_text: String,
    pub position: u32,
    pub is_primary: bool,
    pub file_name: String,
    pub file_size: u64,
    pub content_type: String,
}

#[derive(Serialize)]
struct PositionsBody<'a> { positions: &'a [PositionUpdate] }

#[async_trait]
pub trait CatalogApi: Send + Sync {
    async fn create_product(&self, draft: &ProductDraft) -> Result<ProductDraft, ApiError>;
    async fn update_product(&self, product_id: &str, draft: &ProductDraft) -> Result<ProductDraft, ApiError>;
    async fn get_product(&self, product_id: &str) -> Result<ProductDetail, ApiError>;

    async fn list_variants(&self, product_id: &str) -> Result<Vec<Variant>, ApiError>;
    async fn create_variant(&self, product_id: &str, variant: &Variant) -> Result<Variant, ApiError>;
    async fn update_variant(&self, product_id: &str, variant: &Variant) -> Result<Variant, ApiError>;
    async fn delete_variant(&self, product_id: &str, variant_id: &str) -> Result<(), ApiError>;
    async fn update_variant_positions(&self, product_id: &str, positions: &[PositionUpdate]) -> Result<(), ApiError>;

    async fn list_images(&self, scope: &ImageScope) -> Result<Vec<ImageRecord>, ApiError>;
    async fn create_image(&self, scope: &ImageScope, image: &NewImage) -> Result<ImageRecord, ApiError>;
    async fn update_image(&self, scope: &ImageScope, image: &ImageRecord) -> Result<ImageRecord, ApiError>;
    async fn delete_image(&self, scope: &ImageScope, image_id: &str) -> Result<(), ApiError>;
    async fn update_image_positions(&self, scope: &ImageScope, positions: &[PositionUpdate]) -> Result<(), ApiError>;

    async fn list_faqs(&self, product_id: &str) -> Result<Vec<Faq>, ApiError>;
    async fn create_faq(&self, product_id: &str, faq: &Faq) -> Result<Faq, ApiError>;
    async fn update_faq(&self, product_id: &str, faq: &Faq) -> Result<Faq, ApiError>;
    async fn delete_faq(&self, product_id: &str, faq_id: &str) -> Result<(), ApiError>;
}

fn server_id(id: &RecordId) -> Result<&str, ApiError> {
    id.server_id().ok_or_else(|| ApiError::Unsaved(id.to_string()))
}

#[async_trait]
impl CatalogApi for ApiClient {
    async fn create_product(&self, draft: &ProductDraft) -> Result<ProductDraft, ApiError> {
        self.send_json(Method::POST, "/api/v1/products", draft).await
    }

    async fn update_product(&self, product_id: &str, draft: &ProductDraft) -> Result<ProductDraft, ApiError> {
        self.send_json(Method::PUT, &format!("/api/v1/products/{}", product_id), draft).await
    }

    async fn get_product(&self, product_id: &str) -> Result<ProductDetail, ApiError> {
        self.get(&format!("/api/v1/products/{}", product_id), &[]).await
    }

    async fn list_variants(&self, product_id: &str) -> Result<Vec<Variant>, ApiError> {
        self.get(&format!("/api/v1/products/{}/variants", product_id), &[]).await
    }

    async fn create_variant(&self, product_id: &str, variant: &Variant) -> Result<Variant, ApiError> {
        self.send_json(Method::POST, &format!("/api/v1/products/{}/variants", product_id), variant).await
    }

    async fn update_variant(&self, product_id: &str, variant: &Variant) -> Result<Variant, ApiError> {
        let id = server_id(&variant.id)?;
        self.send_json(Method::PUT, &format!("/api/v1/products/{}/variants/{}", product_id, id), variant).await
    }

    async fn delete_variant(&self, product_id: &str, variant_id: &str) -> Result<(), ApiError> {
        let id = RecordId::from(variant_id);
        self.delete(&format!("/api/v1/products/{}/variants/{}", product_id, server_id(&id)?)).await
    }

    async fn update_variant_positions(&self, product_id: &str, positions: &[PositionUpdate]) -> Result<(), ApiError> {
        self.send_json(Method::PUT, &format!("/api/v1/products/{}/variant-positions", product_id), &PositionsBody { positions }).await
    }

    async fn list_images(&self, scope: &ImageScope) -> Result<Vec<ImageRecord>, ApiError> {
        self.get(&scope.collection_path(), &[]).await
    }

    async fn create_image(&self, scope: &ImageScope, image: &NewImage) -> Result<ImageRecord, ApiError> {
        self.send_json(Method::POST, &scope.collection_path(), image).await
    }

    async fn update_image(&self, scope: &ImageScope, image: &ImageRecord) -> Result<ImageRecord, ApiError> {
        let id = server_id(&image.id)?;
        self.send_json(Method::PUT, &format!("{}/{}", scope.collection_path(), id), image).await
    }

    async fn delete_image(&self, scope: &ImageScope, image_id: &str) -> Result<(), ApiError> {
        let id = RecordId::from(image_id);
        self.delete(&format!("{}/{}", scope.collection_path(), server_id(&id)?)).await
    }

    async fn update_image_positions(&self, scope: &ImageScope, positions: &[PositionUpdate]) -> Result<(), ApiError> {
        self.send_json(Method::PUT, &scope.positions_path(), &PositionsBody { positions }).await
    }

    async fn list_faqs(&self, product_id: &str) -> Result<Vec<Faq>, ApiError> {
        self.get(&format!("/api/v1/products/{}/faqs", product_id), &[]).await
    }

    async fn create_faq(&self, product_id: &str, faq: &Faq) -> Result<Faq, ApiError> {
        self.send_json(Method::POST, &format!("/api/v1/products/{}/faqs", product_id), faq).await
    }

    async fn update_faq(&self, product_id: &str, faq: &Faq) -> Result<Faq, ApiError> {
        let id = server_id(&faq.id)?;
        self.send_json(Method::PUT, &format!("/api/v1/products/{}/faqs/{}", product_id, id), faq).await
    }

    async fn delete_faq(&self, product_id: &str, faq_id: &str) -> Result<(), ApiError> {
        let id = RecordId::from(faq_id);
        self.delete(&format!("/api/v1/products/{}/faqs/{}", product_id, server_id(&id)?)).await
    }
}
