#![allow(dead_code)]

use std::path::Path;
use std::time::Duration;
use axum::Router;
use tokio::net::TcpListener;
use marketplace_client::dev_server::{self, DevState};
use marketplace_client::{AppContext, ClientConfig};

/// Serves `router` on an ephemeral port and returns its base URL.
pub async fn spawn_router(router: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, router).await });
    format!("http://{}", addr)
}

pub async fn spawn_dev_server(state: DevState) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(dev_server::serve(listener, state));
    format!("http://{}", addr)
}

pub fn config(base_url: &str, token: Option<&str>, cart_dir: &Path) -> ClientConfig {
    ClientConfig {
        api_base_url: base_url.to_string(),
        storage_upload_url: format!("{}/storage/upload", base_url),
        api_token: token.map(str::to_string),
        cart_dir: cart_dir.to_path_buf(),
        alt_text_debounce: Duration::from_millis(20),
        cache_retry_delay: Duration::from_millis(20),
        ..ClientConfig::default()
    }
}

pub fn context(base_url: &str, token: Option<&str>, cart_dir: &Path) -> AppContext {
    AppContext::init(config(base_url, token, cart_dir)).unwrap()
}

/// A few bytes tagged as PNG; the backend never decodes them.
pub fn png(name: &str, seed: u8) -> marketplace_client::api::LocalFile {
    marketplace_client::api::LocalFile::new(name, "image/png", vec![seed; 128])
}
