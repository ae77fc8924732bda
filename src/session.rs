//! Application context
//!
//! Session, location and cart are explicit objects created by
//! `AppContext::init` and handed to whatever needs them.

use std::fmt;
use std::sync::{Arc, RwLock};
use tracing::info;
use crate::api::{ApiClient, HttpStorage, TokenProvider};
use crate::config::ClientConfig;
use crate::storefront::{CartStore, FileStore, OrdersPage};
use crate::supplier::EditorDeps;
use crate::Result;

/// Holds the bearer token issued by the external auth provider.
#[derive(Default)]
pub struct Session {
    token: RwLock<Option<String>>,
}

impl Session {
    pub fn new(token: Option<String>) -> Self { Self { token: RwLock::new(token) } }

    pub fn sign_in(&self, token: impl Into<String>) {
        *self.token.write().unwrap_or_else(|p| p.into_inner()) = Some(token.into());
        info!("Session signed in");
    }

    pub fn sign_out(&self) {
        *self.token.write().unwrap_or_else(|p| p.into_inner()) = None;
        info!("Session signed out");
    }

    pub fn is_signed_in(&self) -> bool { self.bearer_token().is_some() }
}

impl TokenProvider for Session {
    fn bearer_token(&self) -> Option<String> {
        self.token.read().unwrap_or_else(|p| p.into_inner()).clone()
    }
}

/// Six-digit Indian postal code.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Pincode(String);

impl Pincode {
    pub fn parse(raw: &str) -> std::result::Result<Self, PincodeError> {
        let raw = raw.trim();
        if raw.len() != 6 || !raw.chars().all(|c| c.is_ascii_digit()) { return Err(PincodeError::Format); }
        if raw.starts_with('0') { return Err(PincodeError::LeadingZero); }
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for Pincode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

#[derive(Debug, Clone, PartialEq, Eq)] pub enum PincodeError { Format, LeadingZero }
impl std::error::Error for PincodeError {}
impl fmt::Display for PincodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Format => write!(f, "Pincode must be 6 digits"),
            Self::LeadingZero => write!(f, "Pincode cannot start with 0"),
        }
    }
}

/// Delivery location chosen by the shopper.
#[derive(Default)]
pub struct LocationContext {
    pincode: RwLock<Option<Pincode>>,
}

impl LocationContext {
    pub fn pincode(&self) -> Option<Pincode> { self.pincode.read().unwrap_or_else(|p| p.into_inner()).clone() }

    pub fn set_pincode(&self, raw: &str) -> std::result::Result<Pincode, PincodeError> {
        let pincode = Pincode::parse(raw)?;
        *self.pincode.write().unwrap_or_else(|p| p.into_inner()) = Some(pincode.clone());
        Ok(pincode)
    }

    pub fn clear(&self) { *self.pincode.write().unwrap_or_else(|p| p.into_inner()) = None; }
}

pub struct AppContext {
    pub config: ClientConfig,
    pub session: Arc<Session>,
    pub location: Arc<LocationContext>,
    pub api: ApiClient,
    pub storage: Arc<HttpStorage>,
    pub cart: Arc<CartStore>,
}

impl AppContext {
    pub fn init(config: ClientConfig) -> Result<Self> {
        let session = Arc::new(Session::new(config.api_token.clone()));
        let api = ApiClient::new(&config, session.clone())?;
        let storage = Arc::new(HttpStorage::new(api.http().clone(), config.storage_upload_url.clone(), session.clone()));
        let cart = Arc::new(CartStore::new(Arc::new(FileStore::new(&config.cart_dir)), &config.currency));
        info!(api = %config.api_base_url, signed_in = session.is_signed_in(), "App context initialised");
        Ok(Self { config, session, location: Arc::new(LocationContext::default()), api, storage, cart })
    }

    pub fn editor_deps(&self) -> EditorDeps {
        EditorDeps {
            catalog: Arc::new(self.api.clone()),
            storage: self.storage.clone(),
            tokens: self.session.clone(),
            images: self.config.images.clone(),
            alt_text_debounce: self.config.alt_text_debounce,
        }
    }

    pub fn orders_page(&self) -> OrdersPage { OrdersPage::new(Arc::new(self.api.clone()), self.session.clone()) }

    /// Drops the session and location; the persisted cart stays for the next
    /// visit.
    pub fn shutdown(self) {
        self.session.sign_out();
        self.location.clear();
        info!("App context shut down");
    }
}
