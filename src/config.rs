//! Client configuration loaded from the environment

use std::env;
use std::path::PathBuf;
use std::time::Duration;
use dotenvy::dotenv;
use crate::domain::aggregates::CollectionKind;
use crate::{Result, StoreError};

const MIB: u64 = 1024 * 1024;

/// Upload limits per image collection. Product and variant images share the
/// storefront thumbnail ceiling; A+ content allows large banners.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePolicy {
    pub product_max_bytes: u64,
    pub aplus_max_bytes: u64,
    pub variant_max_bytes: u64,
}

impl ImagePolicy {
    pub fn max_bytes(&self, kind: CollectionKind) -> u64 {
        match kind {
            CollectionKind::Product => self.product_max_bytes,
            CollectionKind::APlusContent => self.aplus_max_bytes,
            CollectionKind::Variant => self.variant_max_bytes,
        }
    }
}

impl Default for ImagePolicy {
    fn default() -> Self {
        Self { product_max_bytes: 5 * MIB, aplus_max_bytes: 50 * MIB, variant_max_bytes: 5 * MIB }
    }
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub api_base_url: String,
    pub storage_upload_url: String,
    pub api_token: Option<String>,
    pub currency: String,
    pub request_timeout: Duration,
    pub cart_dir: PathBuf,
    pub alt_text_debounce: Duration,
    pub cache_retry_delay: Duration,
    pub images: ImagePolicy,
}

impl Default for ClientConfig {
    fn default() -> Self {
        let api_base_url = "http://127.0.0.1:8083".to_string();
        Self {
            storage_upload_url: format!("{}/storage/upload", api_base_url),
            api_base_url,
            api_token: None,
            currency: "INR".to_string(),
            request_timeout: Duration::from_secs(30),
            cart_dir: PathBuf::from(".storefront"),
            alt_text_debounce: Duration::from_millis(400),
            cache_retry_delay: Duration::from_millis(500),
            images: ImagePolicy::default(),
        }
    }
}

impl ClientConfig {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds the config from any variable source; `from_env` passes the
    /// process environment.
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();
        let api_base_url = get("STORE_API_URL").unwrap_or(defaults.api_base_url).trim_end_matches('/').to_string();
        let storage_upload_url = get("STORE_STORAGE_URL").unwrap_or_else(|| format!("{}/storage/upload", api_base_url));
        let api_token = get("STORE_API_TOKEN").filter(|t| !t.trim().is_empty());

        let number = |name: &str, default: u64| -> Result<u64> {
            match get(name) {
                Some(raw) => raw.trim().parse::<u64>()
                    .map_err(|e| StoreError::Config(format!("Invalid {}: {}", name, e))),
                None => Ok(default),
            }
        };

        let request_timeout = Duration::from_secs(number("STORE_REQUEST_TIMEOUT_SECS", defaults.request_timeout.as_secs())?);
        let alt_text_debounce = Duration::from_millis(number("STORE_ALT_TEXT_DEBOUNCE_MS", defaults.alt_text_debounce.as_millis() as u64)?);
        let cache_retry_delay = Duration::from_millis(number("STORE_CACHE_RETRY_DELAY_MS", defaults.cache_retry_delay.as_millis() as u64)?);
        let images = ImagePolicy {
            product_max_bytes: number("STORE_PRODUCT_IMAGE_MAX_BYTES", defaults.images.product_max_bytes)?,
            aplus_max_bytes: number("STORE_APLUS_IMAGE_MAX_BYTES", defaults.images.aplus_max_bytes)?,
            variant_max_bytes: number("STORE_VARIANT_IMAGE_MAX_BYTES", defaults.images.variant_max_bytes)?,
        };
        let currency = get("STORE_CURRENCY").map(|c| c.trim().to_ascii_uppercase()).filter(|c| !c.is_empty()).unwrap_or(defaults.currency);
        let cart_dir = get("STORE_CART_DIR").map(PathBuf::from).unwrap_or(defaults.cart_dir);

        tracing::info!(api = %api_base_url, "Client configuration loaded");
        Ok(Self { api_base_url, storage_upload_url, api_token, currency, request_timeout, cart_dir, alt_text_debounce, cache_retry_delay, images })
    }
}
