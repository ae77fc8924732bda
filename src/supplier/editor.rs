//! Product editor
//!
//! A new product is first saved as a draft listing (basic and pricing fields
//! only); galleries and variants attach once the backend has assigned an id.
//! `submit` runs the full gate and persists everything that changed.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use crate::api::{CatalogApi, ImageScope, ObjectStorage, TokenProvider};
use crate::config::ImagePolicy;
use crate::domain::aggregates::{Faq, ProductDraft, VariantList};
use crate::domain::sequence;
use crate::domain::value_objects::RecordId;
use crate::{Result, StoreError};
use super::gallery::GalleryManager;
use super::validation::{check_listing, check_product, Section, ValidationReport};
use super::variants::{SaveSummary, VariantEditor};

/// Services an editor talks to.
#[derive(Clone)]
pub struct EditorDeps {
    pub catalog: Arc<dyn CatalogApi>,
    pub storage: Arc<dyn ObjectStorage>,
    pub tokens: Arc<dyn TokenProvider>,
    pub images: ImagePolicy,
    pub alt_text_debounce: Duration,
}

impl EditorDeps {
    fn gallery(&self, scope: ImageScope) -> GalleryManager {
        GalleryManager::new(scope, self.catalog.clone(), self.storage.clone(), &self.images, self.alt_text_debounce)
    }
}

#[derive(Debug, Default)]
pub struct SubmitOutcome {
    pub product_id: String,
    pub created: bool,
    pub variants: SaveSummary,
    pub faqs_saved: usize,
    pub warnings: BTreeMap<Section, Vec<String>>,
}

struct Attached {
    variants: VariantEditor,
    images: GalleryManager,
    aplus: GalleryManager,
    variant_images: HashMap<String, GalleryManager>,
}

pub struct ProductEditor {
    deps: EditorDeps,
    draft: ProductDraft,
    attached: Option<Attached>,
    faq_baseline: Vec<Faq>,
}

impl ProductEditor {
    pub fn new(deps: EditorDeps, currency: &str) -> Self {
        Self { deps, draft: ProductDraft::new(currency), attached: None, faq_baseline: vec![] }
    }

    /// Opens an existing product and loads its variants, galleries and FAQs.
    pub async fn open(deps: EditorDeps, draft: ProductDraft) -> Result<Self> {
        let product_id = draft.id.clone().ok_or_else(|| crate::ApiError::Unsaved("product".into()))?;
        let mut editor = Self { deps, draft, attached: None, faq_baseline: vec![] };
        let variants = VariantEditor::load(&product_id, editor.deps.catalog.clone(), &editor.draft.currency).await?;
        let attached = editor.attach_with(&product_id, variants);
        attached.images.load().await?;
        attached.aplus.load().await?;
        let mut faqs = editor.deps.catalog.list_faqs(&product_id).await?;
        sequence::normalize(&mut faqs);
        editor.faq_baseline = faqs.clone();
        editor.draft.faqs = faqs;
        Ok(editor)
    }

    fn attach_with(&mut self, product_id: &str, variants: VariantEditor) -> &Attached {
        let product_id = product_id.to_string();
        let attached = Attached {
            variants,
            images: self.deps.gallery(ImageScope::Product { product_id: product_id.clone() }),
            aplus: self.deps.gallery(ImageScope::APlusContent { product_id }),
            variant_images: HashMap::new(),
        };
        self.attached.insert(attached)
    }

    pub fn draft(&self) -> &ProductDraft { &self.draft }
    pub fn draft_mut(&mut self) -> &mut ProductDraft { &mut self.draft }
    pub fn product_id(&self) -> Option<&str> { self.draft.id.as_deref() }

    pub fn variants(&self) -> Option<&VariantEditor> { self.attached.as_ref().map(|a| &a.variants) }
    pub fn variants_mut(&mut self) -> Option<&mut VariantEditor> { self.attached.as_mut().map(|a| &mut a.variants) }
    pub fn images(&self) -> Option<&GalleryManager> { self.attached.as_ref().map(|a| &a.images) }
    pub fn aplus_images(&self) -> Option<&GalleryManager> { self.attached.as_ref().map(|a| &a.aplus) }

    /// Gallery for one saved variant, created on first use.
    pub fn variant_gallery(&mut self, variant_id: &RecordId) -> Result<&GalleryManager> {
        let server_id = variant_id.server_id()
            .ok_or_else(|| crate::ApiError::Unsaved(variant_id.to_string()))?
            .to_string();
        let attached = self.attached.as_mut().ok_or_else(|| crate::ApiError::Unsaved("product".into()))?;
        let product_id = attached.variants.product_id().to_string();
        let deps = &self.deps;
        Ok(attached.variant_images.entry(server_id.clone())
            .or_insert_with(|| deps.gallery(ImageScope::Variant { product_id, variant_id: server_id })))
    }

    pub fn add_faq(&mut self) -> RecordId {
        let faq = Faq::draft(self.draft.faqs.len() as u32);
        let id = faq.id.clone();
        self.draft.faqs.push(faq);
        id
    }

    pub fn remove_faq(&mut self, id: &RecordId) {
        self.draft.faqs.retain(|f| &f.id != id);
        sequence::renumber(&mut self.draft.faqs);
    }

    /// Full gate over the current editor state.
    pub fn validate(&self) -> ValidationReport {
        let Some(attached) = &self.attached else {
            let mut report = check_listing(&self.draft);
            report.error(Section::Images, "Add at least one product image");
            return report;
        };
        let images = attached.images.snapshot();
        check_product(&self.draft, &images, attached.variants.list().variants(), |v| {
            v.image_id.is_some()
                || v.id.server_id().and_then(|id| attached.variant_images.get(id)).is_some_and(|g| !g.is_empty())
        })
    }

    fn require_auth(&self) -> Result<()> {
        if self.deps.tokens.bearer_token().is_some() { Ok(()) } else { Err(StoreError::NotAuthenticated) }
    }

    /// Creates or updates the listing with only basic and pricing checks, so
    /// images and variants have a product to attach to.
    pub async fn save_basics(&mut self) -> Result<String> {
        let report = check_listing(&self.draft);
        if !report.is_ok() { return Err(StoreError::Validation(report)); }
        self.require_auth()?;
        let (product_id, _) = self.persist_listing().await?;
        Ok(product_id)
    }

    async fn persist_listing(&mut self) -> Result<(String, bool)> {
        let saved = match self.draft.id.clone() {
            Some(id) => self.deps.catalog.update_product(&id, &self.draft).await?,
            None => self.deps.catalog.create_product(&self.draft).await?,
        };
        let created = self.draft.id.is_none();
        let product_id = saved.id.ok_or_else(|| crate::ApiError::Unsaved("product".into()))?;
        self.draft.id = Some(product_id.clone());
        if self.attached.is_none() {
            let variants = VariantEditor::new(&product_id, self.deps.catalog.clone(), VariantList::new(&self.draft.currency));
            self.attach_with(&product_id, variants);
        } else if let Some(attached) = self.attached.as_mut() {
            attached.variants.set_product_id(&product_id);
        }
        if created {
            info!(product = %product_id, "Created product listing");
        }
        Ok((product_id, created))
    }

    /// Runs the gate; a failing gate never reaches the network.
    pub async fn submit(&mut self) -> Result<SubmitOutcome> {
        let report = self.validate();
        if !report.is_ok() {
            warn!(section = ?report.first_failing_section(), "Submit blocked by validation");
            return Err(StoreError::Validation(report));
        }
        self.require_auth()?;

        let (product_id, created) = self.persist_listing().await?;
        let variants = match self.attached.as_mut() {
            Some(attached) => attached.variants.save().await?,
            None => SaveSummary::default(),
        };
        let faqs_saved = self.save_faqs(&product_id).await?;
        Ok(SubmitOutcome { product_id, created, variants, faqs_saved, warnings: report.warnings().clone() })
    }

    async fn save_faqs(&mut self, product_id: &str) -> Result<usize> {
        let catalog = self.deps.catalog.clone();
        let mut saved = 0;
        for gone in self.faq_baseline.iter().filter(|b| !self.draft.faqs.iter().any(|f| f.id == b.id)) {
            if let Some(id) = gone.id.server_id() {
                catalog.delete_faq(product_id, id).await?;
                saved += 1;
            }
        }
        sequence::renumber(&mut self.draft.faqs);
        for i in 0..self.draft.faqs.len() {
            let faq = self.draft.faqs[i].clone();
            if faq.id.is_temporary() {
                let mut created = catalog.create_faq(product_id, &faq).await?;
                created.position = faq.position;
                self.draft.faqs[i] = created;
                saved += 1;
            } else if self.faq_baseline.iter().find(|b| b.id == faq.id) != Some(&faq) {
                catalog.update_faq(product_id, &faq).await?;
                saved += 1;
            }
        }
        self.faq_baseline = self.draft.faqs.clone();
        Ok(saved)
    }
}
