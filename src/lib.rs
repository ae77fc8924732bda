//! Marketplace client
//!
//! Client-side state and REST plumbing for the marketplace storefront and the
//! supplier back-office. The remote backend owns persistence, payments,
//! inventory and order transitions; this crate keeps local edit state
//! consistent with it.
//!
//! ## Features
//! - Variant/option reconciliation with drag reordering and change detection
//! - Image galleries (product, A+ content, variant) with single-primary and
//!   de-duplicated batch uploads
//! - Product editor validation gate
//! - Order cancel/refund requests
//! - Persisted shopping cart
//! - In-memory development backend speaking the same REST surface

pub mod api;
pub mod config;
pub mod dev_server;
pub mod domain;
pub mod session;
pub mod storefront;
pub mod supplier;

pub use api::{ApiClient, ApiError, Paginated};
pub use config::{ClientConfig, ImagePolicy};
pub use session::{AppContext, LocationContext, Session};

use thiserror::Error;
use domain::aggregates::{CartError, ImageError, OrderError, VariantError};
use domain::sequence::SequenceError;
use supplier::validation::ValidationReport;

// =============================================================================
// Error Types
// =============================================================================

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Please fix the highlighted sections: {0}")]
    Validation(ValidationReport),

    #[error("Sign in to continue")]
    NotAuthenticated,

    #[error(transparent)]
    Api(#[from] ApiError),

    /// The binary reached storage but the backend never recorded it.
    #[error("{file_name} was uploaded but could not be saved: {source}")]
    UploadedNotSaved { file_name: String, url: String, #[source] source: ApiError },

    #[error("{0} already exists in this gallery")]
    DuplicateImage(String),

    #[error("{0} is already uploading")]
    UploadInProgress(String),

    #[error("{file_name} was rejected: {reason}")]
    RejectedFile { file_name: String, reason: String },

    #[error("{0}")]
    Variant(#[from] VariantError),

    #[error("{0}")]
    Image(#[from] ImageError),

    #[error("{0}")]
    Cart(#[from] CartError),

    #[error("{0}")]
    Order(#[from] OrderError),

    #[error("{0}")]
    Sequence(#[from] SequenceError),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl StoreError {
    /// Message for the user. Server text is passed through verbatim when the
    /// server sent any.
    pub fn user_message(&self) -> String {
        match self {
            Self::Api(e) => e.user_message(),
            other => other.to_string(),
        }
    }

    /// Errors that stop the action before any network call.
    pub fn is_blocking(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::NotAuthenticated | Self::RejectedFile { .. } | Self::DuplicateImage(_))
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;
