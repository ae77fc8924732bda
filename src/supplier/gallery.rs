//! Image gallery manager
//!
//! One manager per collection (product images, A+ content images, or one
//! variant's images). Uploads go storage first, then metadata create, then
//! the record returned by the backend is spliced into local state.

use futures::future::join_all;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use crate::api::{ApiError, CatalogApi, ImageScope, LocalFile, NewImage, ObjectStorage};
use crate::config::ImagePolicy;
use crate::domain::aggregates::{ImageCollection, ImageError, ImageRecord, UploadMeta};
use crate::domain::sequence::PositionUpdate;
use crate::domain::value_objects::RecordId;
use crate::{Result, StoreError};
use super::debounce::Debouncer;
use super::ReorderOutcome;

/// Result of one batch. Rejections happen before any network call; failures
/// are uploads that were attempted.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub uploaded: Vec<ImageRecord>,
    pub rejected: Vec<StoreError>,
    pub failed: Vec<StoreError>,
}

struct PlannedUpload {
    file: LocalFile,
    position: u32,
    is_primary: bool,
}

/// Uploads that have been planned but not yet spliced. Overlapping batches
/// plan against the collection plus these reservations.
#[derive(Default)]
struct InFlight {
    files: HashSet<UploadMeta>,
    slots: u32,
    primary_claimed: bool,
    needs_repair: bool,
}

pub struct GalleryManager {
    scope: ImageScope,
    catalog: Arc<dyn CatalogApi>,
    storage: Arc<dyn ObjectStorage>,
    max_bytes: u64,
    collection: Mutex<ImageCollection>,
    in_flight: Mutex<InFlight>,
    alt_text: Debouncer<RecordId>,
}

fn guard<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl GalleryManager {
    pub fn new(
        scope: ImageScope,
        catalog: Arc<dyn CatalogApi>,
        storage: Arc<dyn ObjectStorage>,
        policy: &ImagePolicy,
        alt_text_debounce: Duration,
    ) -> Self {
        let kind = scope.kind();
        Self {
            scope, catalog, storage,
            max_bytes: policy.max_bytes(kind),
            collection: Mutex::new(ImageCollection::new(kind)),
            in_flight: Mutex::new(InFlight::default()),
            alt_text: Debouncer::new(alt_text_debounce),
        }
    }

    pub fn scope(&self) -> &ImageScope { &self.scope }

    /// Copy of the current collection for rendering.
    pub fn snapshot(&self) -> ImageCollection { guard(&self.collection).clone() }

    pub fn is_empty(&self) -> bool { guard(&self.collection).is_empty() }

    pub fn primary(&self) -> Option<ImageRecord> { guard(&self.collection).primary().cloned() }

    /// Replaces local state with the server's list.
    pub async fn load(&self) -> Result<()> {
        let images = self.catalog.list_images(&self.scope).await?;
        *guard(&self.collection) = ImageCollection::from_server(self.scope.kind(), images);
        Ok(())
    }

    fn check_file(&self, file: &LocalFile, collection: &ImageCollection, in_flight: &InFlight, batch: &HashSet<UploadMeta>) -> Result<()> {
        let meta = &file.meta;
        if !file.is_image() {
            return Err(StoreError::RejectedFile { file_name: meta.file_name.clone(), reason: format!("{} is not an image", meta.content_type) });
        }
        if meta.file_size >= self.max_bytes {
            return Err(StoreError::RejectedFile {
                file_name: meta.file_name.clone(),
                reason: format!("must be smaller than {} MB", self.max_bytes / (1024 * 1024)),
            });
        }
        if collection.is_duplicate(meta) || batch.contains(meta) {
            return Err(StoreError::DuplicateImage(meta.file_name.clone()));
        }
        if in_flight.files.contains(meta) {
            return Err(StoreError::UploadInProgress(meta.file_name.clone()));
        }
        Ok(())
    }

    /// Validates, uploads and records a batch of files.
    ///
    /// Primary and positions are reserved under the lock in submission order,
    /// counting batches still in flight; completion order never matters. When
    /// the last overlapping batch lands after any failure, positions and the
    /// primary are pushed to the server once.
    pub async fn upload_batch(&self, files: Vec<LocalFile>) -> BatchReport {
        let mut report = BatchReport::default();
        let plans = {
            let collection = guard(&self.collection);
            let mut in_flight = guard(&self.in_flight);
            let mut primary_claimed = !collection.is_empty() || in_flight.primary_claimed;
            let mut next_position = collection.next_position() + in_flight.slots;
            let mut accepted = HashSet::new();
            let mut plans = vec![];
            for file in files {
                if let Err(e) = self.check_file(&file, &collection, &in_flight, &accepted) {
                    warn!(scope = ?self.scope, error = %e, "Rejected upload");
                    report.rejected.push(e);
                    continue;
                }
                accepted.insert(file.meta.clone());
                plans.push(PlannedUpload { file, position: next_position, is_primary: !primary_claimed });
                primary_claimed = true;
                next_position += 1;
            }
            if !plans.is_empty() {
                in_flight.slots += plans.len() as u32;
                in_flight.primary_claimed = true;
                in_flight.files.extend(accepted);
            }
            plans
        };
        if plans.is_empty() { return report; }

        let signatures: Vec<UploadMeta> = plans.iter().map(|p| p.file.meta.clone()).collect();
        let outcomes = join_all(plans.into_iter().map(|plan| self.upload_one(plan))).await;

        let repair = {
            let mut collection = guard(&self.collection);
            for outcome in outcomes {
                match outcome {
                    Ok(record) => {
                        collection.insert(record.clone());
                        report.uploaded.push(record);
                    }
                    Err(e) => report.failed.push(e),
                }
            }
            let mut in_flight = guard(&self.in_flight);
            for s in &signatures { in_flight.files.remove(s); }
            in_flight.slots -= signatures.len() as u32;
            in_flight.needs_repair |= !report.failed.is_empty();
            if in_flight.slots == 0 {
                in_flight.primary_claimed = false;
                std::mem::take(&mut in_flight.needs_repair) && !collection.is_empty()
            } else {
                false
            }
        };
        info!(scope = ?self.scope, uploaded = report.uploaded.len(), failed = report.failed.len(), "Upload batch finished");

        if repair {
            self.repair_after_partial_batch().await;
        }
        report
    }

    async fn upload_one(&self, plan: PlannedUpload) -> Result<ImageRecord> {
        let PlannedUpload { file, position, is_primary } = plan;
        let url = self.storage.upload(&file).await?;
        let meta = file.meta;
        let new_image = NewImage {
            url: url.clone(),
            alt_text: meta.base_name().to_string(),
            position,
            is_primary,
            file_name: meta.file_name.clone(),
            file_size: meta.file_size,
            content_type: meta.content_type.clone(),
        };
        self.catalog.create_image(&self.scope, &new_image).await.map_err(|source| {
            warn!(file = %meta.file_name, url = %url, error = %source, "Stored file but metadata create failed");
            StoreError::UploadedNotSaved { file_name: meta.file_name.clone(), url: url.clone(), source }
        })
    }

    /// After some planned files failed, local positions were closed up and
    /// the primary may have moved; push both to the server.
    async fn repair_after_partial_batch(&self) {
        let (positions, primary) = {
            let collection = guard(&self.collection);
            let positions: Vec<_> = collection.images().iter()
                .filter_map(|i| i.id.server_id().map(|id| PositionUpdate { id: id.to_string(), position: i.position }))
                .collect();
            (positions, collection.primary().cloned())
        };
        if let Err(e) = self.catalog.update_image_positions(&self.scope, &positions).await {
            warn!(error = %e, "Could not persist positions after partial batch");
        }
        if let Some(primary) = primary.filter(|p| !p.id.is_temporary()) {
            if let Err(e) = self.catalog.update_image(&self.scope, &primary).await {
                warn!(error = %e, "Could not persist primary after partial batch");
            }
        }
    }

    /// Deletes an image. A removed primary is replaced by the image at
    /// position 0, which is persisted best-effort.
    pub async fn remove(&self, id: &RecordId) -> Result<()> {
        if guard(&self.collection).get(id).is_none() {
            return Err(ImageError::NotFound(id.to_string()).into());
        }
        if let Some(server_id) = id.server_id() {
            self.catalog.delete_image(&self.scope, server_id).await?;
        }
        let promoted = {
            let mut collection = guard(&self.collection);
            let (_, promoted) = collection.remove(id)?;
            promoted.and_then(|p| collection.get(&p).cloned())
        };
        if let Some(record) = promoted.filter(|r| !r.id.is_temporary()) {
            if let Err(e) = self.catalog.update_image(&self.scope, &record).await {
                warn!(image = %record.id, error = %e, "Promoted primary not persisted");
            }
        }
        Ok(())
    }

    /// Instant-save: flips the primary locally, persists, and puts the old
    /// primary back if the call fails.
    pub async fn set_primary(&self, id: &RecordId) -> Result<()> {
        let (previous, record) = {
            let mut collection = guard(&self.collection);
            let previous = collection.set_primary(id)?;
            (previous, collection.get(id).cloned())
        };
        let Some(record) = record else { return Ok(()) };
        if previous.as_ref() == Some(id) { return Ok(()); }
        match self.catalog.update_image(&self.scope, &record).await {
            Ok(_) => Ok(()),
            Err(e) => {
                warn!(image = %id, error = %e, "Primary change failed, rolling back");
                let mut collection = guard(&self.collection);
                if let Some(prev) = previous {
                    collection.set_primary(&prev)?;
                }
                Err(e.into())
            }
        }
    }

    /// Drag reorder. A failed positions call is reported, not raised.
    pub async fn reorder(&self, from: usize, to: usize) -> Result<ReorderOutcome> {
        let updates = guard(&self.collection).move_image(from, to)?;
        if updates.is_empty() { return Ok(ReorderOutcome::local_only()); }
        match self.catalog.update_image_positions(&self.scope, &updates).await {
            Ok(()) => Ok(ReorderOutcome::saved()),
            Err(e) => {
                warn!(scope = ?self.scope, error = %e, "Image positions not saved");
                Ok(ReorderOutcome::unsaved(e.user_message()))
            }
        }
    }

    /// Updates alt text locally right away; the server write happens once
    /// typing pauses.
    pub fn edit_alt_text(&self, id: &RecordId, text: impl Into<String>) -> Result<JoinHandle<Option<std::result::Result<ImageRecord, ApiError>>>> {
        let record = {
            let mut collection = guard(&self.collection);
            collection.set_alt_text(id, text)?;
            collection.get(id).cloned()
        };
        let record = record.ok_or_else(|| ImageError::NotFound(id.to_string()))?;
        let catalog = self.catalog.clone();
        let scope = self.scope.clone();
        Ok(self.alt_text.call(id.clone(), move || async move {
            let result = catalog.update_image(&scope, &record).await;
            if let Err(e) = &result {
                warn!(image = %record.id, error = %e, "Alt text not saved");
            }
            result
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::supplier::testing::{FakeCatalog, FakeStorage};

    fn manager(catalog: Arc<FakeCatalog>, storage: Arc<FakeStorage>, scope: ImageScope) -> GalleryManager {
        GalleryManager::new(scope, catalog, storage, &ImagePolicy::default(), Duration::from_millis(400))
    }

    fn product_scope() -> ImageScope { ImageScope::Product { product_id: "p1".into() } }

    fn png(name: &str, size: usize) -> LocalFile { LocalFile::new(name, "image/png", vec![7u8; size]) }

    #[tokio::test]
    async fn test_batch_primary_is_first_submitted_regardless_of_completion() {
        let catalog = Arc::new(FakeCatalog::default());
        // First file finishes last.
        let storage = Arc::new(FakeStorage::with_delays(&[("a.png", 50), ("b.png", 10), ("c.png", 0)]));
        let gallery = manager(catalog.clone(), storage, product_scope());

        let report = gallery.upload_batch(vec![png("a.png", 10), png("b.png", 20), png("c.png", 30)]).await;
        assert_eq!(report.uploaded.len(), 3);
        let snapshot = gallery.snapshot();
        let primaries: Vec<_> = snapshot.images().iter().filter(|i| i.is_primary).collect();
        assert_eq!(primaries.len(), 1);
        assert_eq!(primaries[0].file_name, "a.png");
        assert_eq!(snapshot.images().iter().map(|i| i.file_name.as_str()).collect::<Vec<_>>(), ["a.png", "b.png", "c.png"]);
        assert_eq!(catalog.created_images().iter().filter(|i| i.is_primary).count(), 1);
    }

    #[tokio::test]
    async fn test_overlapping_batches_share_one_primary() {
        let catalog = Arc::new(FakeCatalog::default());
        let storage = Arc::new(FakeStorage::with_delays(&[("a.png", 40), ("b.png", 0)]));
        let gallery = manager(catalog.clone(), storage, product_scope());

        let (first, second) = tokio::join!(
            gallery.upload_batch(vec![png("a.png", 10)]),
            gallery.upload_batch(vec![png("b.png", 10)]),
        );
        assert_eq!(first.uploaded.len() + second.uploaded.len(), 2);

        let created = catalog.created_images();
        assert_eq!(created.iter().filter(|i| i.is_primary).count(), 1);
        let mut positions: Vec<u32> = created.iter().map(|i| i.position).collect();
        positions.sort();
        assert_eq!(positions, vec![0, 1]);

        let snapshot = gallery.snapshot();
        assert_eq!(snapshot.images().iter().filter(|i| i.is_primary).count(), 1);
        assert_eq!(snapshot.primary().unwrap().file_name, "a.png");
        assert_eq!(snapshot.images().iter().map(|i| i.file_name.as_str()).collect::<Vec<_>>(), ["a.png", "b.png"]);
        assert_eq!(catalog.calls("update_image_positions"), 0);
    }

    #[tokio::test]
    async fn test_failed_primary_in_overlap_is_repaired_once_settled() {
        let catalog = Arc::new(FakeCatalog::default());
        let storage = Arc::new(FakeStorage::with_delays(&[("a.png", 10), ("b.png", 40)]));
        storage.fail_on("a.png");
        let gallery = manager(catalog.clone(), storage, product_scope());

        let (first, second) = tokio::join!(
            gallery.upload_batch(vec![png("a.png", 10)]),
            gallery.upload_batch(vec![png("b.png", 10)]),
        );
        assert_eq!(first.failed.len(), 1);
        assert_eq!(second.uploaded.len(), 1);
        assert_eq!(catalog.calls("update_image_positions"), 1);
        let primary = gallery.primary().unwrap();
        assert_eq!(primary.file_name, "b.png");
        assert_eq!(primary.position, 0);
        assert!(catalog.last_updated_image().unwrap().is_primary);
    }

    #[tokio::test]
    async fn test_non_empty_collection_never_gets_new_primary() {
        let catalog = Arc::new(FakeCatalog::default());
        let gallery = manager(catalog.clone(), Arc::new(FakeStorage::default()), product_scope());
        gallery.upload_batch(vec![png("a.png", 10)]).await;
        gallery.upload_batch(vec![png("b.png", 10), png("c.png", 10)]).await;
        assert_eq!(gallery.primary().unwrap().file_name, "a.png");
        assert_eq!(catalog.created_images().iter().filter(|i| i.is_primary).count(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_upload_is_rejected() {
        let catalog = Arc::new(FakeCatalog::default());
        let storage = Arc::new(FakeStorage::default());
        let gallery = manager(catalog.clone(), storage.clone(), product_scope());
        gallery.upload_batch(vec![png("a.png", 10)]).await;
        let report = gallery.upload_batch(vec![png("a.png", 10)]).await;
        assert!(report.uploaded.is_empty());
        assert!(matches!(report.rejected.as_slice(), [StoreError::DuplicateImage(name)] if name == "a.png"));
        assert_eq!(gallery.snapshot().len(), 1);
        assert_eq!(storage.upload_count(), 1);

        let report = gallery.upload_batch(vec![png("b.png", 10), png("b.png", 10)]).await;
        assert_eq!(report.uploaded.len(), 1);
        assert_eq!(report.rejected.len(), 1);
    }

    #[tokio::test]
    async fn test_type_and_size_checked_before_network() {
        let storage = Arc::new(FakeStorage::default());
        let gallery = manager(Arc::new(FakeCatalog::default()), storage.clone(), product_scope());
        let report = gallery.upload_batch(vec![
            LocalFile::new("sizing.pdf", "application/pdf", vec![1; 10]),
            png("huge.png", 5 * 1024 * 1024),
        ]).await;
        assert_eq!(report.rejected.len(), 2);
        assert!(report.rejected.iter().all(|e| matches!(e, StoreError::RejectedFile { .. })));
        assert_eq!(storage.upload_count(), 0);
    }

    #[tokio::test]
    async fn test_aplus_ceiling_is_larger() {
        let gallery = manager(Arc::new(FakeCatalog::default()), Arc::new(FakeStorage::default()),
            ImageScope::APlusContent { product_id: "p1".into() });
        let report = gallery.upload_batch(vec![png("banner.png", 6 * 1024 * 1024)]).await;
        assert_eq!(report.uploaded.len(), 1);
    }

    #[tokio::test]
    async fn test_metadata_failure_is_reported_as_uploaded_not_saved() {
        let catalog = Arc::new(FakeCatalog::default());
        catalog.fail_next("create_image");
        let gallery = manager(catalog.clone(), Arc::new(FakeStorage::default()), product_scope());
        let report = gallery.upload_batch(vec![png("a.png", 10), png("b.png", 10)]).await;
        assert_eq!(report.uploaded.len(), 1);
        assert!(matches!(report.failed.as_slice(), [StoreError::UploadedNotSaved { url, .. }] if url.contains("a.png")));
        // The surviving image became primary and sits at position 0.
        let primary = gallery.primary().unwrap();
        assert_eq!(primary.file_name, "b.png");
        assert_eq!(primary.position, 0);
        assert_eq!(catalog.calls("update_image_positions"), 1);
    }

    #[tokio::test]
    async fn test_storage_failure_is_plain_api_error() {
        let storage = Arc::new(FakeStorage::default());
        storage.fail_on("a.png");
        let catalog = Arc::new(FakeCatalog::default());
        let gallery = manager(catalog.clone(), storage, product_scope());
        let report = gallery.upload_batch(vec![png("a.png", 10)]).await;
        assert!(matches!(report.failed.as_slice(), [StoreError::Api(_)]));
        assert_eq!(catalog.calls("create_image"), 0);
        // The signature is free again.
        let report = gallery.upload_batch(vec![png("a.png", 10)]).await;
        assert!(report.rejected.is_empty());
    }

    #[tokio::test]
    async fn test_remove_primary_promotes_and_persists() {
        let catalog = Arc::new(FakeCatalog::default());
        let gallery = manager(catalog.clone(), Arc::new(FakeStorage::default()), product_scope());
        gallery.upload_batch(vec![png("a.png", 10), png("b.png", 10), png("c.png", 10)]).await;
        let first = gallery.primary().unwrap().id;
        gallery.remove(&first).await.unwrap();
        let primary = gallery.primary().unwrap();
        assert_eq!(primary.file_name, "b.png");
        assert_eq!(catalog.calls("delete_image"), 1);
        assert_eq!(catalog.calls("update_image"), 1);
    }

    #[tokio::test]
    async fn test_set_primary_rolls_back_on_failure() {
        let catalog = Arc::new(FakeCatalog::default());
        let gallery = manager(catalog.clone(), Arc::new(FakeStorage::default()), product_scope());
        gallery.upload_batch(vec![png("a.png", 10), png("b.png", 10)]).await;
        let b = gallery.snapshot().images()[1].id.clone();
        catalog.fail_next("update_image");
        assert!(gallery.set_primary(&b).await.is_err());
        assert_eq!(gallery.primary().unwrap().file_name, "a.png");
        gallery.set_primary(&b).await.unwrap();
        assert_eq!(gallery.primary().unwrap().file_name, "b.png");
    }

    #[tokio::test]
    async fn test_reorder_failure_is_a_warning() {
        let catalog = Arc::new(FakeCatalog::default());
        let gallery = manager(catalog.clone(), Arc::new(FakeStorage::default()), product_scope());
        gallery.upload_batch(vec![png("a.png", 10), png("b.png", 10)]).await;
        catalog.fail_next("update_image_positions");
        let outcome = gallery.reorder(1, 0).await.unwrap();
        assert!(!outcome.persisted);
        assert!(outcome.warning.is_some());
        assert_eq!(gallery.snapshot().images()[0].file_name, "b.png");
    }

    #[tokio::test(start_paused = true)]
    async fn test_alt_text_is_debounced() {
        let catalog = Arc::new(FakeCatalog::default());
        let gallery = manager(catalog.clone(), Arc::new(FakeStorage::default()), product_scope());
        gallery.upload_batch(vec![png("a.png", 10)]).await;
        let id = gallery.primary().unwrap().id;
        let mut handles = vec![];
        for text in ["F", "Fr", "Front"] {
            handles.push(gallery.edit_alt_text(&id, text).unwrap());
            tokio::time::advance(Duration::from_millis(50)).await;
        }
        assert_eq!(gallery.primary().unwrap().alt_text, "Front");
        for h in handles { h.await.unwrap(); }
        assert_eq!(catalog.calls("update_image"), 1);
        assert_eq!(catalog.last_updated_image().unwrap().alt_text, "Front");
    }
}
