//! Variant editor
//!
//! Drives a `VariantList` against the catalog backend. Active/default toggles
//! save instantly with rollback; everything else waits for `save`.

use std::sync::Arc;
use tracing::{debug, info, warn};
use crate::api::CatalogApi;
use crate::domain::aggregates::{variants_modified, Variant, VariantEdit, VariantList};
use crate::domain::value_objects::RecordId;
use crate::Result;
use super::ReorderOutcome;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SaveSummary {
    pub created: usize,
    pub updated: usize,
    pub deleted: usize,
}

impl SaveSummary {
    pub fn is_noop(&self) -> bool { self.created + self.updated + self.deleted == 0 }
}

pub struct VariantEditor {
    product_id: String,
    catalog: Arc<dyn CatalogApi>,
    list: VariantList,
    baseline: Vec<Variant>,
}

impl VariantEditor {
    /// Starts editing `list`; its current content is the modification baseline.
    pub fn new(product_id: impl Into<String>, catalog: Arc<dyn CatalogApi>, list: VariantList) -> Self {
        let baseline = list.variants().to_vec();
        Self { product_id: product_id.into(), catalog, list, baseline }
    }

    pub async fn load(product_id: impl Into<String>, catalog: Arc<dyn CatalogApi>, currency: &str) -> Result<Self> {
        let product_id = product_id.into();
        let variants = catalog.list_variants(&product_id).await?;
        debug!(product = %product_id, count = variants.len(), "Loaded variants");
        Ok(Self::new(product_id, catalog, VariantList::from_server(currency, variants)))
    }

    pub fn product_id(&self) -> &str { &self.product_id }
    pub fn list(&self) -> &VariantList { &self.list }
    pub fn is_modified(&self) -> bool { variants_modified(&self.baseline, self.list.variants()) }

    /// Product was created after the editor opened with a placeholder id.
    pub(crate) fn set_product_id(&mut self, product_id: impl Into<String>) { self.product_id = product_id.into(); }

    pub fn add(&mut self) -> RecordId { self.list.add().id.clone() }

    /// Local edit; persisted by `save`.
    pub fn edit(&mut self, id: &RecordId, edit: VariantEdit) -> Result<()> {
        self.list.apply(id, edit)?;
        Ok(())
    }

    /// Last saved copy of `id` with one flag changed. Pending field edits stay
    /// local until `save`.
    fn saved_with(&self, id: &RecordId, change: impl FnOnce(&mut Variant)) -> Option<Variant> {
        let mut record = self.baseline.iter().find(|b| &b.id == id).or_else(|| self.list.get(id))?.clone();
        change(&mut record);
        Some(record)
    }

    pub async fn toggle_active(&mut self, id: &RecordId) -> Result<()> {
        let active = self.list.get(id).map(|v| !v.active)
            .ok_or_else(|| crate::domain::aggregates::VariantError::NotFound(id.to_string()))?;
        let snapshot = self.list.apply(id, VariantEdit::Active(active))?;
        if id.is_temporary() { return Ok(()); }
        let Some(record) = self.saved_with(id, |v| v.active = active) else { return Ok(()) };
        match self.catalog.update_variant(&self.product_id, &record).await {
            Ok(_) => {
                if let Some(base) = self.baseline.iter_mut().find(|b| &b.id == id) { base.active = active; }
                Ok(())
            }
            Err(e) => {
                warn!(variant = %id, error = %e, "Active toggle failed, rolling back");
                self.list.restore(snapshot)?;
                Err(e.into())
            }
        }
    }

    pub async fn set_default(&mut self, id: &RecordId) -> Result<()> {
        let previous = self.list.set_default(id)?;
        if previous.as_ref() == Some(id) || id.is_temporary() { return Ok(()); }
        let Some(record) = self.saved_with(id, |v| v.is_default = true) else { return Ok(()) };
        if let Err(e) = self.catalog.update_variant(&self.product_id, &record).await {
            warn!(variant = %id, error = %e, "Default change failed, rolling back");
            if let Some(prev) = previous {
                self.list.set_default(&prev)?;
            }
            return Err(e.into());
        }
        for base in &mut self.baseline { base.is_default = &base.id == id; }
        Ok(())
    }

    pub async fn reorder(&mut self, from: usize, to: usize) -> Result<ReorderOutcome> {
        let updates = self.list.move_variant(from, to)?;
        if updates.is_empty() { return Ok(ReorderOutcome::local_only()); }
        match self.catalog.update_variant_positions(&self.product_id, &updates).await {
            Ok(()) => {
                for u in &updates {
                    if let Some(base) = self.baseline.iter_mut().find(|b| b.id.as_str() == u.id) { base.position = u.position; }
                }
                self.baseline.sort_by_key(|b| self.list.index_of(&b.id).unwrap_or(usize::MAX));
                Ok(ReorderOutcome::saved())
            }
            Err(e) => {
                warn!(product = %self.product_id, error = %e, "Variant positions not saved");
                Ok(ReorderOutcome::unsaved(e.user_message()))
            }
        }
    }

    /// Deletes on the server first for persisted records; drafts just vanish.
    /// A removed default hands the flag on, persisted best-effort.
    pub async fn remove(&mut self, id: &RecordId) -> Result<()> {
        if self.list.get(id).is_none() {
            return Err(crate::domain::aggregates::VariantError::NotFound(id.to_string()).into());
        }
        if let Some(server_id) = id.server_id() {
            self.catalog.delete_variant(&self.product_id, server_id).await?;
        }
        let removed = self.list.remove(id)?;
        self.baseline.retain(|b| &b.id != id);
        if removed.is_default {
            self.persist_promoted_default().await;
        }
        Ok(())
    }

    async fn persist_promoted_default(&mut self) {
        let Some(promoted) = self.list.default_variant().map(|v| v.id.clone()) else { return };
        if promoted.is_temporary() { return; }
        let Some(record) = self.saved_with(&promoted, |v| v.is_default = true) else { return };
        match self.catalog.update_variant(&self.product_id, &record).await {
            Ok(_) => {
                for base in &mut self.baseline { base.is_default = base.id == promoted; }
            }
            Err(e) => warn!(variant = %promoted, error = %e, "Promoted default not saved"),
        }
    }

    /// Sends only what changed since the baseline; no-op when nothing did.
    pub async fn save(&mut self) -> Result<SaveSummary> {
        let mut summary = SaveSummary::default();
        if !self.is_modified() {
            debug!(product = %self.product_id, "Variants unchanged, nothing to save");
            return Ok(summary);
        }

        // The baseline follows each confirmed call so a retry after a failure
        // only sends what is still outstanding.
        for id in self.list.removed_since(&self.baseline) {
            if let Some(server_id) = id.server_id() {
                self.catalog.delete_variant(&self.product_id, server_id).await?;
                summary.deleted += 1;
            }
            self.baseline.retain(|b| b.id != id);
        }

        let (creates, updates) = self.list.pending_changes(&self.baseline);
        for draft in creates {
            let created = self.catalog.create_variant(&self.product_id, &draft).await?;
            let server_id = created.id.clone();
            self.list.confirm_created(&draft.id, created)?;
            if let Some(confirmed) = self.list.get(&server_id) { self.baseline.push(confirmed.clone()); }
            summary.created += 1;
        }
        for variant in updates {
            self.catalog.update_variant(&self.product_id, &variant).await?;
            match self.baseline.iter_mut().find(|b| b.id == variant.id) {
                Some(base) => *base = variant,
                None => self.baseline.push(variant),
            }
            summary.updated += 1;
        }

        self.baseline = self.list.variants().to_vec();
        info!(product = %self.product_id, created = summary.created, updated = summary.updated, deleted = summary.deleted, "Variants saved");
        Ok(summary)
    }
}
