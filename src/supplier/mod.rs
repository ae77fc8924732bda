//! Supplier back-office: product editor, variants, galleries.

pub mod debounce;
pub mod editor;
pub mod gallery;
pub mod validation;
pub mod variants;

#[cfg(test)]
pub(crate) mod testing;

pub use editor::{EditorDeps, ProductEditor, SubmitOutcome};
pub use gallery::{BatchReport, GalleryManager};
pub use validation::{check_listing, check_product, Section, ValidationReport};
pub use variants::{SaveSummary, VariantEditor};

/// Result of a drag reorder. The local order always stands; a failed
/// positions call only produces a warning.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReorderOutcome {
    pub persisted: bool,
    pub warning: Option<String>,
}

impl ReorderOutcome {
    /// Nothing server-backed moved.
    pub fn local_only() -> Self { Self::default() }
    pub fn saved() -> Self { Self { persisted: true, warning: None } }
    pub fn unsaved(warning: impl Into<String>) -> Self { Self { persisted: false, warning: Some(warning.into()) } }
}
