//! Image collections
//!
//! Product images, A+ content images and per-variant images share one shape:
//! a position-ordered list with exactly one primary entry whenever it is
//! non-empty.

use serde::{Deserialize, Serialize};
use std::fmt;
use crate::domain::sequence::{self, PositionUpdate, Positioned, SequenceError};
use crate::domain::value_objects::RecordId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollectionKind { Product, APlusContent, Variant }

impl CollectionKind {
    pub fn as_str(&self) -> &'static str {
        match self { Self::Product => "product", Self::APlusContent => "aplus_content", Self::Variant => "variant" }
    }
}

impl fmt::Display for CollectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

/// What we know about a local file before it is uploaded.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UploadMeta {
    pub file_name: String,
    pub file_size: u64,
    pub content_type: String,
}

impl UploadMeta {
    /// File name without its extension, used as the default alt text.
    pub fn base_name(&self) -> &str {
        match self.file_name.rsplit_once('.') {
            Some((stem, _)) if !stem.is_empty() => stem,
            _ => &self.file_name,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ImageRecord {
    pub id: RecordId,
    pub url: String,
    pub alt_text: String,
    pub position: u32,
    pub is_primary: bool,
    pub file_name: String,
    pub file_size: u64,
    pub content_type: String,
}

impl ImageRecord {
    pub fn same_file(&self, meta: &UploadMeta) -> bool {
        self.file_name == meta.file_name && self.file_size == meta.file_size && self.content_type == meta.content_type
    }
}

impl Positioned for ImageRecord {
    fn position(&self) -> u32 { self.position }
    fn set_position(&mut self, position: u32) { self.position = position; }
}

#[derive(Clone, Debug)]
pub struct ImageCollection {
    kind: CollectionKind,
    images: Vec<ImageRecord>,
}

impl ImageCollection {
    pub fn new(kind: CollectionKind) -> Self { Self { kind, images: vec![] } }

    pub fn from_server(kind: CollectionKind, images: Vec<ImageRecord>) -> Self {
        let mut collection = Self { kind, images };
        sequence::normalize(&mut collection.images);
        collection.ensure_single_primary();
        collection
    }

    pub fn kind(&self) -> CollectionKind { self.kind }
    pub fn images(&self) -> &[ImageRecord] { &self.images }
    pub fn len(&self) -> usize { self.images.len() }
    pub fn is_empty(&self) -> bool { self.images.is_empty() }
    pub fn get(&self, id: &RecordId) -> Option<&ImageRecord> { self.images.iter().find(|i| &i.id == id) }
    pub fn primary(&self) -> Option<&ImageRecord> { self.images.iter().find(|i| i.is_primary) }
    pub fn next_position(&self) -> u32 { self.images.len() as u32 }

    pub fn is_duplicate(&self, meta: &UploadMeta) -> bool { self.images.iter().any(|i| i.same_file(meta)) }

    /// Splices a record returned by the backend in at its position.
    pub fn insert(&mut self, record: ImageRecord) {
        let makes_primary = record.is_primary;
        let id = record.id.clone();
        let at = (record.position as usize).min(self.images.len());
        self.images.insert(at, record);
        sequence::renumber(&mut self.images);
        if makes_primary {
            for image in &mut self.images { image.is_primary = image.id == id; }
        }
        self.ensure_single_primary();
    }

    /// Removes an image. If it was primary, the image now at position 0 takes
    /// over; the new primary's id is returned so the caller can persist it.
    pub fn remove(&mut self, id: &RecordId) -> Result<(ImageRecord, Option<RecordId>), ImageError> {
        let index = self.images.iter().position(|i| &i.id == id).ok_or_else(|| ImageError::NotFound(id.to_string()))?;
        let removed = self.images.remove(index);
        sequence::renumber(&mut self.images);
        let promoted = if removed.is_primary {
            self.images.first_mut().map(|first| { first.is_primary = true; first.id.clone() })
        } else {
            None
        };
        Ok((removed, promoted))
    }

    /// Makes `id` the primary image and returns the previous primary.
    pub fn set_primary(&mut self, id: &RecordId) -> Result<Option<RecordId>, ImageError> {
        if self.get(id).is_none() { return Err(ImageError::NotFound(id.to_string())); }
        let previous = self.primary().map(|i| i.id.clone());
        for image in &mut self.images { image.is_primary = &image.id == id; }
        Ok(previous)
    }

    pub fn set_alt_text(&mut self, id: &RecordId, alt_text: impl Into<String>) -> Result<String, ImageError> {
        let image = self.images.iter_mut().find(|i| &i.id == id).ok_or_else(|| ImageError::NotFound(id.to_string()))?;
        Ok(std::mem::replace(&mut image.alt_text, alt_text.into()))
    }

    pub fn move_image(&mut self, from: usize, to: usize) -> Result<Vec<PositionUpdate>, ImageError> {
        sequence::move_item(&mut self.images, from, to).map_err(ImageError::Sequence)?;
        Ok(self.images.iter()
            .filter_map(|i| i.id.server_id().map(|id| PositionUpdate { id: id.to_string(), position: i.position }))
            .collect())
    }

    fn ensure_single_primary(&mut self) {
        let mut seen = false;
        for image in &mut self.images {
            if image.is_primary && seen { image.is_primary = false; }
            seen |= image.is_primary;
        }
        if !seen {
            if let Some(first) = self.images.first_mut() { first.is_primary = true; }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageError { NotFound(String), Sequence(SequenceError) }
impl std::error::Error for ImageError {}
impl fmt::Display for ImageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound(id) => write!(f, "Image {} not found", id),
            Self::Sequence(e) => write!(f, "{}", e),
        }
    }
}
