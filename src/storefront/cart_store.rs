//! Persisted shopping cart
//!
//! The cart is one JSON array under a single key. Every mutation reads the
//! whole array, changes it, writes it back and then announces the change,
//! since writes to the store are not observable on their own.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex, RwLock};
use tracing::{debug, warn};
use crate::domain::aggregates::{Cart, CartError, CartItem, LineKey};
use crate::domain::events::CartEvent;
use crate::domain::value_objects::Money;
use crate::{Result, StoreError};

pub const CART_KEY: &str = "cart";

/// String key/value persistence with local-storage semantics.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;
    async fn set(&self, key: &str, value: String) -> Result<()>;
    async fn remove(&self, key: &str) -> Result<()>;
}

/// One file per key under a directory.
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self { Self { dir: dir.into() } }
    fn path(&self, key: &str) -> PathBuf { self.dir.join(format!("{}.json", key)) }
}

fn storage_err(e: std::io::Error) -> StoreError { StoreError::Storage(e.to_string()) }

#[async_trait]
impl KeyValueStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        match tokio::fs::read_to_string(self.path(key)).await {
            Ok(s) => Ok(Some(s)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(storage_err(e)),
        }
    }

    async fn set(&self, key: &str, value: String) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir).await.map_err(storage_err)?;
        tokio::fs::write(self.path(key), value).await.map_err(storage_err)
    }

    async fn remove(&self, key: &str) -> Result<()> {
        match tokio::fs::remove_file(self.path(key)).await {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(storage_err(e)),
            _ => Ok(()),
        }
    }
}

#[derive(Default)]
pub struct MemoryStore {
    values: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self { Self::default() }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>> { Ok(self.values.read().await.get(key).cloned()) }
    async fn set(&self, key: &str, value: String) -> Result<()> {
        self.values.write().await.insert(key.to_string(), value);
        Ok(())
    }
    async fn remove(&self, key: &str) -> Result<()> {
        self.values.write().await.remove(key);
        Ok(())
    }
}

pub struct CartStore {
    store: Arc<dyn KeyValueStore>,
    events: broadcast::Sender<CartEvent>,
    write: Mutex<()>,
    currency: String,
}

impl CartStore {
    pub fn new(store: Arc<dyn KeyValueStore>, currency: &str) -> Self {
        let (events, _) = broadcast::channel(32);
        Self { store, events, write: Mutex::new(()), currency: currency.to_string() }
    }

    /// Change notifications for the badge, cart page and anything else showing
    /// cart state.
    pub fn subscribe(&self) -> broadcast::Receiver<CartEvent> { self.events.subscribe() }

    /// Absent storage reads as an empty cart. Unreadable storage is reset.
    pub async fn load(&self) -> Result<Cart> {
        let Some(raw) = self.store.get(CART_KEY).await? else { return Ok(Cart::new()) };
        match serde_json::from_str::<Cart>(&raw) {
            Ok(cart) => Ok(cart),
            Err(e) => {
                warn!(error = %e, "Stored cart is corrupted, resetting");
                self.store.remove(CART_KEY).await?;
                let _ = self.events.send(CartEvent::Reset);
                Ok(Cart::new())
            }
        }
    }

    async fn mutate(&self, change: impl FnOnce(&mut Cart) -> std::result::Result<(), CartError>) -> Result<Cart> {
        let _guard = self.write.lock().await;
        let mut cart = self.load().await?;
        change(&mut cart)?;
        let raw = serde_json::to_string(&cart).map_err(|e| StoreError::Storage(e.to_string()))?;
        self.store.set(CART_KEY, raw).await?;
        debug!(lines = cart.item_count(), quantity = cart.total_quantity(), "Cart written");
        let _ = self.events.send(CartEvent::Changed { line_count: cart.item_count(), total_quantity: cart.total_quantity() });
        Ok(cart)
    }

    pub async fn add_item(&self, item: CartItem) -> Result<Cart> { self.mutate(|cart| cart.add_item(item)).await }

    /// Zero removes the line.
    pub async fn update_quantity(&self, key: &LineKey, quantity: u32) -> Result<Cart> {
        self.mutate(|cart| cart.update_quantity(key, quantity)).await
    }

    pub async fn remove_item(&self, key: &LineKey) -> Result<Cart> { self.mutate(|cart| cart.remove_item(key)).await }

    pub async fn clear(&self) -> Result<Cart> {
        self.mutate(|cart| { cart.clear(); Ok(()) }).await
    }

    /// Total quantity across lines, as shown on the header badge.
    pub async fn badge_count(&self) -> Result<u32> { Ok(self.load().await?.total_quantity()) }

    pub async fn subtotal(&self) -> Result<Money> { Ok(self.load().await?.subtotal(&self.currency)) }
}
