//! In-memory development backend
//!
//! Serves the same REST surface the client speaks so the storefront and the
//! supplier editor can run without the real platform. Nothing is persisted;
//! order transitions are enforced here, not by the client.

use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, Query, Request, State},
    http::{header, Method, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use chrono::Utc;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::RwLock;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use uuid::Uuid;
use validator::Validate;
use crate::api::{NewImage, Paginated};
use crate::domain::aggregates::order::StatusCount;
use crate::domain::aggregates::{
    Address, CancelRequest, CollectionKind, Faq, ImageRecord, LineItem, Order, OrderAction, OrderStatus,
    OrderSummary, ProductDetail, ProductDraft, RefundRequest, Variant,
};
use crate::domain::sequence::{self, PositionUpdate};
use crate::domain::value_objects::{Money, RecordId, Sku};

// =============================================================================
// State
// =============================================================================

#[derive(Default)]
struct ProductRecord {
    draft: ProductDraft,
    variants: Vec<Variant>,
    images: HashMap<String, Vec<ImageRecord>>,
    faqs: Vec<Faq>,
}

struct StoredFile { content_type: String, bytes: Vec<u8> }

#[derive(Default)]
struct DevStore {
    products: HashMap<String, ProductRecord>,
    orders: Vec<Order>,
    files: HashMap<String, StoredFile>,
}

#[derive(Clone, Default)]
pub struct DevState {
    store: Arc<RwLock<DevStore>>,
}

impl DevState {
    pub fn new() -> Self { Self::default() }

    pub fn with_orders(orders: Vec<Order>) -> Self {
        Self { store: Arc::new(RwLock::new(DevStore { orders, ..Default::default() })) }
    }

    /// A handful of orders in different states for manual testing.
    pub fn seeded() -> Self {
        Self::with_orders(vec![
            sample_order(1, OrderStatus::Pending, 1499),
            sample_order(2, OrderStatus::Processing, 2598),
            sample_order(3, OrderStatus::Shipped, 799),
            sample_order(4, OrderStatus::Delivered, 3499),
            sample_order(5, OrderStatus::Cancelled, 499),
        ])
    }
}

pub fn sample_order(n: u32, status: OrderStatus, total: i64) -> Order {
    let now = Utc::now();
    let total = Money::inr(Decimal::new(total, 0));
    Order {
        id: Uuid::now_v7().to_string(),
        order_number: format!("ORD-{:06}", n),
        status,
        line_items: vec![LineItem {
            id: Uuid::now_v7().to_string(), product_id: "sample".into(), variant_id: None, name: "Sample item".into(),
            sku: None, quantity: 1, unit_price: total.clone(), total: total.clone(),
        }],
        subtotal: total.clone(),
        shipping: Money::inr(Decimal::ZERO),
        tax: Money::inr(Decimal::ZERO),
        total,
        shipping_address: Some(Address { name: "Dev Customer".into(), city: "Bengaluru".into(), zip: "560001".into(), country: "IN".into(), ..Default::default() }),
        billing_address: None,
        created_at: now,
        updated_at: now,
    }
}

// =============================================================================
// Errors
// =============================================================================

#[derive(Debug)]
pub struct DevError { status: StatusCode, message: String }

impl DevError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self { Self { status, message: message.into() } }
    fn not_found(what: &str) -> Self { Self::new(StatusCode::NOT_FOUND, format!("{} not found", what)) }
    fn unprocessable(message: impl Into<String>) -> Self { Self::new(StatusCode::UNPROCESSABLE_ENTITY, message) }
}

impl IntoResponse for DevError {
    fn into_response(self) -> Response {
        (self.status, Json(serde_json::json!({ "message": self.message }))).into_response()
    }
}

type ApiResult<T> = Result<T, DevError>;
type Params = Path<HashMap<String, String>>;

fn param<'a>(params: &'a HashMap<String, String>, name: &str) -> ApiResult<&'a str> {
    params.get(name).map(String::as_str).ok_or_else(|| DevError::new(StatusCode::BAD_REQUEST, format!("missing {}", name)))
}

fn new_id() -> String { Uuid::now_v7().to_string() }

// =============================================================================
// Router
// =============================================================================

pub fn router(state: DevState) -> Router {
    let api = Router::new()
        .route("/api/v1/products", post(create_product))
        .route("/api/v1/products/:id", get(get_product).put(update_product))
        .route("/api/v1/products/:id/variants", get(list_variants).post(create_variant))
        .route("/api/v1/products/:id/variants/:vid", put(update_variant).delete(delete_variant))
        .route("/api/v1/products/:id/variant-positions", put(update_variant_positions))
        .route("/api/v1/products/:id/faqs", get(list_faqs).post(create_faq))
        .route("/api/v1/products/:id/faqs/:fid", put(update_faq).delete(delete_faq))
        .route("/api/v1/orders", get(list_orders))
        .route("/api/v1/orders/:id", get(get_order))
        .route("/api/v1/orders/:id/cancel", post(cancel_order))
        .route("/api/v1/orders/:id/refund", post(refund_order))
        .route("/api/v1/account/order-summary", get(order_summary))
        .route("/storage/upload", post(upload_file));
    let api = mount_images(api, "/api/v1/products/:id/images", "/api/v1/products/:id/image-positions", CollectionKind::Product);
    let api = mount_images(api, "/api/v1/products/:id/aplus-images", "/api/v1/products/:id/aplus-image-positions", CollectionKind::APlusContent);
    let api = mount_images(api, "/api/v1/products/:id/variants/:vid/images", "/api/v1/products/:id/variants/:vid/image-positions", CollectionKind::Variant);

    Router::new()
        .route("/health", get(|| async { Json(serde_json::json!({"status": "healthy", "service": "marketplace-dev-server"})) }))
        .route("/storage/files/:file", get(get_file))
        .merge(api.route_layer(middleware::from_fn(require_bearer)))
        .layer(DefaultBodyLimit::max(64 * 1024 * 1024))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn mount_images(router: Router<DevState>, collection: &str, positions: &str, kind: CollectionKind) -> Router<DevState> {
    router
        .route(collection, get(move |s: State<DevState>, p: Params| list_images(s, p, kind))
            .post(move |s: State<DevState>, p: Params, b: Json<NewImage>| create_image(s, p, kind, b)))
        .route(&format!("{}/:img", collection), put(move |s: State<DevState>, p: Params, b: Json<ImageRecord>| update_image(s, p, kind, b))
            .delete(move |s: State<DevState>, p: Params| delete_image(s, p, kind)))
        .route(positions, put(move |s: State<DevState>, p: Params, b: Json<PositionsBody>| update_image_positions(s, p, kind, b)))
}

pub async fn serve(listener: TcpListener, state: DevState) -> std::io::Result<()> {
    axum::serve(listener, router(state)).await
}

/// Reads pass through; every mutation needs a bearer token.
async fn require_bearer(req: Request, next: Next) -> ApiResult<Response> {
    if req.method() != Method::GET {
        let authorized = req.headers().get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .is_some_and(|token| !token.trim().is_empty());
        if !authorized {
            return Err(DevError::new(StatusCode::UNAUTHORIZED, "Not authenticated"));
        }
    }
    Ok(next.run(req).await)
}

// =============================================================================
// Products
// =============================================================================

fn check_draft(draft: &ProductDraft) -> ApiResult<()> {
    draft.validate().map_err(|e| DevError::unprocessable(e.to_string()))
}

async fn create_product(State(s): State<DevState>, Json(mut draft): Json<ProductDraft>) -> ApiResult<(StatusCode, Json<ProductDraft>)> {
    check_draft(&draft)?;
    let id = new_id();
    draft.id = Some(id.clone());
    s.store.write().await.products.insert(id, ProductRecord { draft: draft.clone(), ..Default::default() });
    Ok((StatusCode::CREATED, Json(draft)))
}

async fn update_product(State(s): State<DevState>, Path(id): Path<String>, Json(mut draft): Json<ProductDraft>) -> ApiResult<Json<ProductDraft>> {
    check_draft(&draft)?;
    let mut store = s.store.write().await;
    let record = store.products.get_mut(&id).ok_or_else(|| DevError::not_found("Product"))?;
    draft.id = Some(id);
    record.draft = draft.clone();
    Ok(Json(draft))
}

async fn get_product(State(s): State<DevState>, Path(id): Path<String>) -> ApiResult<Json<ProductDetail>> {
    let store = s.store.read().await;
    let record = store.products.get(&id).ok_or_else(|| DevError::not_found("Product"))?;
    let draft = &record.draft;
    Ok(Json(ProductDetail {
        id,
        title: draft.title.clone(),
        description: draft.description.clone(),
        price: Money::new(draft.selling_price, &draft.currency),
        compare_at_price: draft.compare_at_price.map(|p| Money::new(p, &draft.currency)),
        images: record.images.get(CollectionKind::Product.as_str()).cloned().unwrap_or_default(),
        variants: record.variants.clone(),
        reviews: vec![],
        faqs: record.faqs.iter().filter(|f| f.active).cloned().collect(),
    }))
}

// =============================================================================
// Variants
// =============================================================================

#[derive(Deserialize)]
struct PositionsBody { positions: Vec<PositionUpdate> }

fn apply_positions<T: sequence::Positioned>(items: &mut [T], id_of: impl Fn(&T) -> &str, positions: &[PositionUpdate]) {
    for update in positions {
        if let Some(index) = items.iter().position(|i| id_of(i) == update.id) {
            items[index].set_position(update.position);
        }
    }
    sequence::normalize(items);
}

async fn list_variants(State(s): State<DevState>, Path(id): Path<String>) -> ApiResult<Json<Vec<Variant>>> {
    let store = s.store.read().await;
    let record = store.products.get(&id).ok_or_else(|| DevError::not_found("Product"))?;
    Ok(Json(record.variants.clone()))
}

async fn create_variant(State(s): State<DevState>, Path(id): Path<String>, Json(mut variant): Json<Variant>) -> ApiResult<(StatusCode, Json<Variant>)> {
    let mut store = s.store.write().await;
    let record = store.products.get_mut(&id).ok_or_else(|| DevError::not_found("Product"))?;
    let vid = new_id();
    if variant.sku.is_none() {
        let raw = format!("SKU-{}", vid.replace('-', "")[..10].to_ascii_uppercase());
        variant.sku = Sku::new(raw).ok();
    }
    variant.id = RecordId::server(vid);
    record.variants.push(variant.clone());
    sequence::normalize(&mut record.variants);
    Ok((StatusCode::CREATED, Json(variant)))
}

async fn update_variant(State(s): State<DevState>, Path((id, vid)): Path<(String, String)>, Json(mut variant): Json<Variant>) -> ApiResult<Json<Variant>> {
    let mut store = s.store.write().await;
    let record = store.products.get_mut(&id).ok_or_else(|| DevError::not_found("Product"))?;
    let stored = record.variants.iter_mut().find(|v| v.id.as_str() == vid).ok_or_else(|| DevError::not_found("Variant"))?;
    variant.id = stored.id.clone();
    if stored.sku.is_some() { variant.sku = stored.sku.clone(); }
    let makes_default = variant.is_default && !stored.is_default;
    *stored = variant.clone();
    if makes_default {
        for v in &mut record.variants { v.is_default = v.id.as_str() == vid; }
    }
    Ok(Json(variant))
}

async fn delete_variant(State(s): State<DevState>, Path((id, vid)): Path<(String, String)>) -> ApiResult<StatusCode> {
    let mut store = s.store.write().await;
    let record = store.products.get_mut(&id).ok_or_else(|| DevError::not_found("Product"))?;
    let before = record.variants.len();
    record.variants.retain(|v| v.id.as_str() != vid);
    if record.variants.len() == before { return Err(DevError::not_found("Variant")); }
    sequence::renumber(&mut record.variants);
    record.images.remove(&format!("variant:{}", vid));
    Ok(StatusCode::NO_CONTENT)
}

async fn update_variant_positions(State(s): State<DevState>, Path(id): Path<String>, Json(body): Json<PositionsBody>) -> ApiResult<StatusCode> {
    let mut store = s.store.write().await;
    let record = store.products.get_mut(&id).ok_or_else(|| DevError::not_found("Product"))?;
    apply_positions(&mut record.variants, |v| v.id.as_str(), &body.positions);
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// Images
// =============================================================================

fn image_key(params: &HashMap<String, String>, kind: CollectionKind) -> ApiResult<String> {
    Ok(match kind {
        CollectionKind::Variant => format!("variant:{}", param(params, "vid")?),
        other => other.as_str().to_string(),
    })
}

async fn list_images(State(s): State<DevState>, Path(params): Params, kind: CollectionKind) -> ApiResult<Json<Vec<ImageRecord>>> {
    let key = image_key(&params, kind)?;
    let store = s.store.read().await;
    let record = store.products.get(param(&params, "id")?).ok_or_else(|| DevError::not_found("Product"))?;
    Ok(Json(record.images.get(&key).cloned().unwrap_or_default()))
}

async fn create_image(State(s): State<DevState>, Path(params): Params, kind: CollectionKind, Json(body): Json<NewImage>) -> ApiResult<(StatusCode, Json<ImageRecord>)> {
    let key = image_key(&params, kind)?;
    let mut store = s.store.write().await;
    let record = store.products.get_mut(param(&params, "id")?).ok_or_else(|| DevError::not_found("Product"))?;
    if kind == CollectionKind::Variant && !record.variants.iter().any(|v| v.id.as_str() == param(&params, "vid").unwrap_or_default()) {
        return Err(DevError::not_found("Variant"));
    }
    let images = record.images.entry(key).or_default();
    let image = ImageRecord {
        id: RecordId::server(new_id()),
        url: body.url,
        alt_text: body.alt_text,
        position: body.position,
        is_primary: body.is_primary,
        file_name: body.file_name,
        file_size: body.file_size,
        content_type: body.content_type,
    };
    if image.is_primary {
        for other in images.iter_mut() { other.is_primary = false; }
    }
    images.push(image.clone());
    images.sort_by_key(|i| i.position);
    Ok((StatusCode::CREATED, Json(image)))
}

async fn update_image(State(s): State<DevState>, Path(params): Params, kind: CollectionKind, Json(mut body): Json<ImageRecord>) -> ApiResult<Json<ImageRecord>> {
    let key = image_key(&params, kind)?;
    let img = param(&params, "img")?;
    let mut store = s.store.write().await;
    let record = store.products.get_mut(param(&params, "id")?).ok_or_else(|| DevError::not_found("Product"))?;
    let images = record.images.get_mut(&key).ok_or_else(|| DevError::not_found("Image"))?;
    let index = images.iter().position(|i| i.id.as_str() == img).ok_or_else(|| DevError::not_found("Image"))?;
    body.id = images[index].id.clone();
    if body.is_primary {
        for other in images.iter_mut() { other.is_primary = false; }
    }
    images[index] = body.clone();
    Ok(Json(body))
}

async fn delete_image(State(s): State<DevState>, Path(params): Params, kind: CollectionKind) -> ApiResult<StatusCode> {
    let key = image_key(&params, kind)?;
    let img = param(&params, "img")?;
    let mut store = s.store.write().await;
    let record = store.products.get_mut(param(&params, "id")?).ok_or_else(|| DevError::not_found("Product"))?;
    let images = record.images.get_mut(&key).ok_or_else(|| DevError::not_found("Image"))?;
    let index = images.iter().position(|i| i.id.as_str() == img).ok_or_else(|| DevError::not_found("Image"))?;
    let removed = images.remove(index);
    sequence::normalize(images);
    if removed.is_primary {
        if let Some(first) = images.first_mut() { first.is_primary = true; }
    }
    Ok(StatusCode::NO_CONTENT)
}

async fn update_image_positions(State(s): State<DevState>, Path(params): Params, kind: CollectionKind, Json(body): Json<PositionsBody>) -> ApiResult<StatusCode> {
    let key = image_key(&params, kind)?;
    let mut store = s.store.write().await;
    let record = store.products.get_mut(param(&params, "id")?).ok_or_else(|| DevError::not_found("Product"))?;
    let images = record.images.entry(key).or_default();
    apply_positions(images, |i| i.id.as_str(), &body.positions);
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// FAQs
// =============================================================================

async fn list_faqs(State(s): State<DevState>, Path(id): Path<String>) -> ApiResult<Json<Vec<Faq>>> {
    let store = s.store.read().await;
    let record = store.products.get(&id).ok_or_else(|| DevError::not_found("Product"))?;
    Ok(Json(record.faqs.clone()))
}

async fn create_faq(State(s): State<DevState>, Path(id): Path<String>, Json(mut faq): Json<Faq>) -> ApiResult<(StatusCode, Json<Faq>)> {
    if faq.active && !faq.is_complete() { return Err(DevError::unprocessable("Question and answer are required")); }
    let mut store = s.store.write().await;
    let record = store.products.get_mut(&id).ok_or_else(|| DevError::not_found("Product"))?;
    faq.id = RecordId::server(new_id());
    record.faqs.push(faq.clone());
    sequence::normalize(&mut record.faqs);
    Ok((StatusCode::CREATED, Json(faq)))
}

async fn update_faq(State(s): State<DevState>, Path((id, fid)): Path<(String, String)>, Json(mut faq): Json<Faq>) -> ApiResult<Json<Faq>> {
    let mut store = s.store.write().await;
    let record = store.products.get_mut(&id).ok_or_else(|| DevError::not_found("Product"))?;
    let stored = record.faqs.iter_mut().find(|f| f.id.as_str() == fid).ok_or_else(|| DevError::not_found("FAQ"))?;
    faq.id = stored.id.clone();
    *stored = faq.clone();
    sequence::normalize(&mut record.faqs);
    Ok(Json(faq))
}

async fn delete_faq(State(s): State<DevState>, Path((id, fid)): Path<(String, String)>) -> ApiResult<StatusCode> {
    let mut store = s.store.write().await;
    let record = store.products.get_mut(&id).ok_or_else(|| DevError::not_found("Product"))?;
    record.faqs.retain(|f| f.id.as_str() != fid);
    sequence::renumber(&mut record.faqs);
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// Orders
// =============================================================================

#[derive(Debug, Deserialize)] pub struct ListParams { pub page: Option<u32>, pub limit: Option<u32> }

async fn list_orders(State(s): State<DevState>, Query(p): Query<ListParams>) -> Json<Paginated<Order>> {
    let page = p.page.unwrap_or(1).max(1);
    let limit = p.limit.unwrap_or(10).clamp(1, 100);
    let store = s.store.read().await;
    let mut orders: Vec<&Order> = store.orders.iter().collect();
    orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    let items = orders.into_iter().skip(((page - 1) * limit) as usize).take(limit as usize).cloned().collect();
    Json(Paginated { items, total: store.orders.len() as u64, page, limit })
}

async fn get_order(State(s): State<DevState>, Path(id): Path<String>) -> ApiResult<Json<Order>> {
    let store = s.store.read().await;
    store.orders.iter().find(|o| o.id == id).cloned().map(Json).ok_or_else(|| DevError::not_found("Order"))
}

fn transition(order: &mut Order, action: OrderAction) -> ApiResult<()> {
    if !action.allowed_from(order.status) {
        return Err(DevError::unprocessable(format!("Order cannot be {} while {}", match action {
            OrderAction::Cancel => "cancelled", OrderAction::Refund => "refunded",
        }, order.status)));
    }
    order.status = match action { OrderAction::Cancel => OrderStatus::Cancelled, OrderAction::Refund => OrderStatus::Refunded };
    order.updated_at = Utc::now();
    Ok(())
}

async fn cancel_order(State(s): State<DevState>, Path(id): Path<String>, Json(r): Json<CancelRequest>) -> ApiResult<Json<Order>> {
    let mut store = s.store.write().await;
    let order = store.orders.iter_mut().find(|o| o.id == id).ok_or_else(|| DevError::not_found("Order"))?;
    transition(order, OrderAction::Cancel)?;
    tracing::info!(order = %order.order_number, reason = %r.reason, "Order cancelled");
    Ok(Json(order.clone()))
}

async fn refund_order(State(s): State<DevState>, Path(id): Path<String>, Json(r): Json<RefundRequest>) -> ApiResult<Json<Order>> {
    let mut store = s.store.write().await;
    let order = store.orders.iter_mut().find(|o| o.id == id).ok_or_else(|| DevError::not_found("Order"))?;
    r.check(order).map_err(|e| DevError::unprocessable(e.to_string()))?;
    transition(order, OrderAction::Refund)?;
    tracing::info!(order = %order.order_number, method = ?r.method, "Order refunded");
    Ok(Json(order.clone()))
}

async fn order_summary(State(s): State<DevState>) -> Json<OrderSummary> {
    let store = s.store.read().await;
    let total_spent = store.orders.iter()
        .filter(|o| !o.status.is_terminal())
        .map(|o| o.total.amount())
        .sum();
    let by_status = OrderStatus::ALL.iter()
        .map(|status| StatusCount { status: *status, count: store.orders.iter().filter(|o| o.status == *status).count() as u64 })
        .filter(|c| c.count > 0)
        .collect();
    Json(OrderSummary { total_orders: store.orders.len() as u64, total_spent, by_status })
}

// =============================================================================
// Object storage
// =============================================================================

async fn upload_file(State(s): State<DevState>, mut multipart: Multipart) -> ApiResult<Json<serde_json::Value>> {
    while let Some(field) = multipart.next_field().await.map_err(|e| DevError::new(StatusCode::BAD_REQUEST, e.to_string()))? {
        if field.name() != Some("file") { continue; }
        let file_name = field.file_name().unwrap_or("upload").to_string();
        let content_type = field.content_type().unwrap_or("application/octet-stream").to_string();
        let bytes = field.bytes().await.map_err(|e| DevError::new(StatusCode::BAD_REQUEST, e.to_string()))?;
        let key = format!("{}-{}", new_id(), file_name);
        s.store.write().await.files.insert(key.clone(), StoredFile { content_type, bytes: bytes.to_vec() });
        return Ok(Json(serde_json::json!({ "url": format!("/storage/files/{}", key) })));
    }
    Err(DevError::new(StatusCode::BAD_REQUEST, "No file part"))
}

async fn get_file(State(s): State<DevState>, Path(key): Path<String>) -> ApiResult<Response> {
    let store = s.store.read().await;
    let file = store.files.get(&key).ok_or_else(|| DevError::not_found("File"))?;
    Ok(([(header::CONTENT_TYPE, file.content_type.clone())], file.bytes.clone()).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request as HttpRequest;
    use tower::ServiceExt;

    async fn call(app: Router, method: &str, uri: &str, token: Option<&str>, body: Option<serde_json::Value>) -> (StatusCode, serde_json::Value) {
        let mut req = HttpRequest::builder().method(method).uri(uri);
        if let Some(t) = token { req = req.header(header::AUTHORIZATION, format!("Bearer {}", t)); }
        let req = match body {
            Some(b) => req.header(header::CONTENT_TYPE, "application/json").body(Body::from(b.to_string())).unwrap(),
            None => req.body(Body::empty()).unwrap(),
        };
        let res = app.oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() { serde_json::Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
        (status, value)
    }

    #[tokio::test]
    async fn test_health() {
        let (status, body) = call(router(DevState::new()), "GET", "/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
    }

    #[tokio::test]
    async fn test_mutation_without_token_is_rejected() {
        let (status, body) = call(router(DevState::new()), "POST", "/api/v1/products", None, Some(serde_json::json!({}))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "Not authenticated");
    }

    #[tokio::test]
    async fn test_delivered_order_cannot_be_cancelled() {
        let order = sample_order(1, OrderStatus::Delivered, 100);
        let uri = format!("/api/v1/orders/{}/cancel", order.id);
        let app = router(DevState::with_orders(vec![order]));
        let (status, body) = call(app, "POST", &uri, Some("t"), Some(serde_json::json!({"reason": ""}))).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["message"], "Order cannot be cancelled while delivered");
    }

    #[tokio::test]
    async fn test_summary_counts_by_status() {
        let app = router(DevState::seeded());
        let (status, body) = call(app, "GET", "/api/v1/account/order-summary", None, None).await;
        assert_eq!(status, StatusCode::OK);
        let summary: OrderSummary = serde_json::from_value(body).unwrap();
        assert_eq!(summary.total_orders, 5);
        assert_eq!(summary.count(OrderStatus::Cancelled), 1);
    }
}
