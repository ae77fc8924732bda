//! Aggregates module
pub mod variant;
pub mod image;
pub mod product;
pub mod order;
pub mod cart;

pub use variant::{variants_modified, OptionGroup, Variant, VariantEdit, VariantError, VariantList};
pub use image::{CollectionKind, ImageCollection, ImageError, ImageRecord, UploadMeta};
pub use product::{APlusSection, Faq, ProductDetail, ProductDraft, ProductStatus, Review};
pub use order::{Address, CancelRequest, LineItem, Order, OrderAction, OrderError, OrderStatus, OrderSummary, RefundMethod, RefundRequest};
pub use cart::{Cart, CartError, CartItem, LineKey};
