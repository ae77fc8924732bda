//! Customer storefront: cart, product page, orders.

pub mod cart_store;
pub mod orders;
pub mod product_view;

pub use cart_store::{CartStore, FileStore, KeyValueStore, MemoryStore};
pub use orders::{ActionOutcome, OrdersPage, OrdersState};
pub use product_view::ProductView;
