//! In-process fakes for the catalog and storage seams.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use crate::api::{ApiError, CatalogApi, ImageScope, LocalFile, NewImage, ObjectStorage};
use crate::domain::aggregates::{Faq, ImageRecord, ProductDetail, ProductDraft, Variant};
use crate::domain::sequence::PositionUpdate;
use crate::domain::value_objects::{RecordId, Sku};

#[derive(Default)]
struct CatalogState {
    calls: HashMap<&'static str, usize>,
    failing: HashSet<&'static str>,
    next_id: u64,
    products: Vec<ProductDraft>,
    variants: Vec<Variant>,
    created_images: Vec<NewImage>,
    updated_images: Vec<ImageRecord>,
    position_batches: Vec<Vec<PositionUpdate>>,
    faqs: Vec<Faq>,
}

#[derive(Default)]
pub(crate) struct FakeCatalog {
    state: Mutex<CatalogState>,
}

impl FakeCatalog {
    pub fn with_variants(variants: Vec<Variant>) -> Self {
        let fake = Self::default();
        fake.state.lock().unwrap().variants = variants;
        fake
    }

    /// Makes the next call to `method` fail with a 500.
    pub fn fail_next(&self, method: &'static str) { self.state.lock().unwrap().failing.insert(method); }

    pub fn calls(&self, method: &str) -> usize { self.state.lock().unwrap().calls.get(method).copied().unwrap_or(0) }
    pub fn total_calls(&self) -> usize { self.state.lock().unwrap().calls.values().sum() }
    pub fn created_images(&self) -> Vec<NewImage> { self.state.lock().unwrap().created_images.clone() }
    pub fn last_updated_image(&self) -> Option<ImageRecord> { self.state.lock().unwrap().updated_images.last().cloned() }
    pub fn position_batches(&self) -> Vec<Vec<PositionUpdate>> { self.state.lock().unwrap().position_batches.clone() }
    pub fn products(&self) -> Vec<ProductDraft> { self.state.lock().unwrap().products.clone() }
    pub fn faqs(&self) -> Vec<Faq> { self.state.lock().unwrap().faqs.clone() }

    fn record(&self, method: &'static str) -> Result<u64, ApiError> {
        let mut state = self.state.lock().unwrap();
        *state.calls.entry(method).or_insert(0) += 1;
        if state.failing.remove(method) {
            return Err(ApiError::Server { status: 500, message: Some(format!("{} failed", method)) });
        }
        state.next_id += 1;
        Ok(state.next_id)
    }
}

#[async_trait]
impl CatalogApi for FakeCatalog {
    async fn create_product(&self, draft: &ProductDraft) -> Result<ProductDraft, ApiError> {
        let n = self.record("create_product")?;
        let mut created = draft.clone();
        created.id = Some(format!("prod-{}", n));
        self.state.lock().unwrap().products.push(created.clone());
        Ok(created)
    }

    async fn update_product(&self, _product_id: &str, draft: &ProductDraft) -> Result<ProductDraft, ApiError> {
        self.record("update_product")?;
        self.state.lock().unwrap().products.push(draft.clone());
        Ok(draft.clone())
    }

    async fn get_product(&self, product_id: &str) -> Result<ProductDetail, ApiError> {
        self.record("get_product")?;
        Err(ApiError::Server { status: 404, message: Some(format!("Product {} not found", product_id)) })
    }

    async fn list_variants(&self, _product_id: &str) -> Result<Vec<Variant>, ApiError> {
        self.record("list_variants")?;
        Ok(self.state.lock().unwrap().variants.clone())
    }

    async fn create_variant(&self, _product_id: &str, variant: &Variant) -> Result<Variant, ApiError> {
        let n = self.record("create_variant")?;
        let mut created = variant.clone();
        created.id = RecordId::server(format!("var-{}", n));
        if created.sku.is_none() {
            created.sku = Sku::new(format!("SKU-{}", n)).ok();
        }
        self.state.lock().unwrap().variants.push(created.clone());
        Ok(created)
    }

    async fn update_variant(&self, _product_id: &str, variant: &Variant) -> Result<Variant, ApiError> {
        self.record("update_variant")?;
        let mut state = self.state.lock().unwrap();
        if let Some(slot) = state.variants.iter_mut().find(|v| v.id == variant.id) {
            *slot = variant.clone();
        }
        Ok(variant.clone())
    }

    async fn delete_variant(&self, _product_id: &str, variant_id: &str) -> Result<(), ApiError> {
        self.record("delete_variant")?;
        self.state.lock().unwrap().variants.retain(|v| v.id.as_str() != variant_id);
        Ok(())
    }

    async fn update_variant_positions(&self, _product_id: &str, positions: &[PositionUpdate]) -> Result<(), ApiError> {
        self.record("update_variant_positions")?;
        self.state.lock().unwrap().position_batches.push(positions.to_vec());
        Ok(())
    }

    async fn list_images(&self, _scope: &ImageScope) -> Result<Vec<ImageRecord>, ApiError> {
        self.record("list_images")?;
        Ok(vec![])
    }

    async fn create_image(&self, _scope: &ImageScope, image: &NewImage) -> Result<ImageRecord, ApiError> {
        let n = self.record("create_image")?;
        self.state.lock().unwrap().created_images.push(image.clone());
        Ok(ImageRecord {
            id: RecordId::server(format!("img-{}", n)),
            url: image.url.clone(),
            alt_text: image.alt_text.clone(),
            position: image.position,
            is_primary: image.is_primary,
            file_name: image.file_name.clone(),
            file_size: image.file_size,
            content_type: image.content_type.clone(),
        })
    }

    async fn update_image(&self, _scope: &ImageScope, image: &ImageRecord) -> Result<ImageRecord, ApiError> {
        self.record("update_image")?;
        self.state.lock().unwrap().updated_images.push(image.clone());
        Ok(image.clone())
    }

    async fn delete_image(&self, _scope: &ImageScope, _image_id: &str) -> Result<(), ApiError> {
        self.record("delete_image")?;
        Ok(())
    }

    async fn update_image_positions(&self, _scope: &ImageScope, positions: &[PositionUpdate]) -> Result<(), ApiError> {
        self.record("update_image_positions")?;
        self.state.lock().unwrap().position_batches.push(positions.to_vec());
        Ok(())
    }

    async fn list_faqs(&self, _product_id: &str) -> Result<Vec<Faq>, ApiError> {
        self.record("list_faqs")?;
        Ok(self.state.lock().unwrap().faqs.clone())
    }

    async fn create_faq(&self, _product_id: &str, faq: &Faq) -> Result<Faq, ApiError> {
        let n = self.record("create_faq")?;
        let mut created = faq.clone();
        created.id = RecordId::server(format!("faq-{}", n));
        self.state.lock().unwrap().faqs.push(created.clone());
        Ok(created)
    }

    async fn update_faq(&self, _product_id: &str, faq: &Faq) -> Result<Faq, ApiError> {
        self.record("update_faq")?;
        Ok(faq.clone())
    }

    async fn delete_faq(&self, _product_id: &str, faq_id: &str) -> Result<(), ApiError> {
        self.record("delete_faq")?;
        self.state.lock().unwrap().faqs.retain(|f| f.id.as_str() != faq_id);
        Ok(())
    }
}

#[derive(Default)]
pub(crate) struct FakeStorage {
    delays: HashMap<String, u64>,
    failing: Mutex<HashSet<String>>,
    uploads: AtomicUsize,
}

impl FakeStorage {
    /// Per-file upload latency in milliseconds.
    pub fn with_delays(delays: &[(&str, u64)]) -> Self {
        Self { delays: delays.iter().map(|(n, ms)| (n.to_string(), *ms)).collect(), ..Default::default() }
    }

    pub fn fail_on(&self, file_name: &str) { self.failing.lock().unwrap().insert(file_name.to_string()); }
    pub fn upload_count(&self) -> usize { self.uploads.load(Ordering::SeqCst) }
}

#[async_trait]
impl ObjectStorage for FakeStorage {
    async fn upload(&self, file: &LocalFile) -> Result<String, ApiError> {
        self.uploads.fetch_add(1, Ordering::SeqCst);
        let name = &file.meta.file_name;
        if let Some(ms) = self.delays.get(name).filter(|ms| **ms > 0) {
            tokio::time::sleep(Duration::from_millis(*ms)).await;
        }
        if self.failing.lock().unwrap().remove(name) {
            return Err(ApiError::Server { status: 503, message: Some("storage unavailable".into()) });
        }
        Ok(format!("https://cdn.test/{}", name))
    }
}
