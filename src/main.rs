//! Poster Shop - storefront HTTP service

use anyhow::Result;
use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use poster_shop::admin::AdminSessions;
use poster_shop::analytics::AnalyticsStore;
use poster_shop::cart::{composite_id, CartStore, NewCartItem};
use poster_shop::catalog::{CatalogStore, NewPoster, Poster, PosterPatch};
use poster_shop::checkout::{CartSummary, CheckoutFlow, PaymentCallback, ShippingDetails};
use poster_shop::config::Config;
use poster_shop::payment::PaymentGateway;
use poster_shop::pricing::{resolve_price, PosterSize};
use poster_shop::storage::JsonStore;
use poster_shop::ShopError;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Clone)]
struct AppState {
    catalog: Arc<Mutex<CatalogStore>>,
    cart: Arc<Mutex<CartStore>>,
    analytics: Arc<Mutex<AnalyticsStore>>,
    checkout: Arc<CheckoutFlow>,
    admin: Arc<Mutex<AdminSessions>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    let storage = JsonStore::new(&config.data_dir);
    let mut analytics = AnalyticsStore::new(storage.clone());
    analytics.hydrate();
    let state = AppState {
        catalog: Arc::new(Mutex::new(CatalogStore::load(storage.clone()))),
        cart: Arc::new(Mutex::new(CartStore::load(storage))),
        analytics: Arc::new(Mutex::new(analytics)),
        checkout: Arc::new(CheckoutFlow::new(PaymentGateway::new(&config.gateway))),
        admin: Arc::new(Mutex::new(AdminSessions::new(config.admin.clone()))),
    };

    let app = Router::new()
        .route("/health", get(|| async { Json(serde_json::json!({"status": "healthy", "service": "poster-shop"})) }))
        .route("/api/v1/posters", get(list_posters).post(create_poster))
        .route("/api/v1/posters/:id", get(get_poster).put(update_poster).delete(delete_poster))
        .route("/api/v1/posters/slug/:slug", get(get_poster_by_slug))
        .route("/api/v1/categories/:slug/posters", get(posters_by_category))
        .route("/api/v1/featured", get(featured_posters))
        .route("/api/v1/cart", get(get_cart).post(add_to_cart).delete(clear_cart))
        .route("/api/v1/cart/:id", axum::routing::put(update_cart_item).delete(remove_cart_item))
        .route("/api/v1/analytics", get(analytics_dashboard).delete(clear_analytics))
        .route("/api/v1/analytics/views", post(track_view))
        .route("/api/v1/analytics/clicks", post(track_click))
        .route("/api/v1/analytics/timeseries", get(analytics_timeseries))
        .route("/api/v1/checkout", post(begin_checkout))
        .route("/api/v1/checkout/verify", post(verify_checkout))
        .route("/api/v1/admin/login", post(admin_login))
        .route("/api/v1/admin/logout", post(admin_logout))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state);

    tracing::info!("poster-shop listening on 0.0.0.0:{}", config.port);
    axum::serve(
        tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port)).await?,
        app,
    )
    .await?;
    Ok(())
}

// =============================================================================
// Error mapping
// =============================================================================

struct ApiError(ShopError);

impl From<ShopError> for ApiError {
    fn from(err: ShopError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match &self.0 {
            ShopError::PosterNotFound | ShopError::UnknownOrder => {
                (StatusCode::NOT_FOUND, serde_json::json!({"error": self.0.to_string()}))
            }
            ShopError::Validation(fields) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                serde_json::json!({"error": "validation failed", "fields": fields}),
            ),
            ShopError::EmptyCart | ShopError::BelowMinimumOrder { .. } => {
                (StatusCode::BAD_REQUEST, serde_json::json!({"error": self.0.to_string()}))
            }
            ShopError::PaymentDeclined => {
                (StatusCode::PAYMENT_REQUIRED, serde_json::json!({"error": self.0.to_string()}))
            }
            ShopError::Unauthorized => {
                (StatusCode::UNAUTHORIZED, serde_json::json!({"error": self.0.to_string()}))
            }
            ShopError::Gateway(e) => {
                tracing::error!(error = %e, "payment gateway call failed");
                (StatusCode::BAD_GATEWAY, serde_json::json!({"error": "payment gateway unavailable"}))
            }
        };
        (status, Json(body)).into_response()
    }
}

type ApiResult<T> = std::result::Result<T, ApiError>;

fn require_admin(state: &AppState, headers: &HeaderMap) -> ApiResult<()> {
    let token = headers
        .get("x-admin-token")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if lock(&state.admin).is_valid(token) {
        Ok(())
    } else {
        Err(ShopError::Unauthorized.into())
    }
}

// =============================================================================
// Catalog
// =============================================================================

/// Poster record plus the resolver-derived display prices, so cards, the
/// detail page and add-to-cart all quote the same numbers.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PosterView {
    #[serde(flatten)]
    poster: Poster,
    display_price: i64,
    display_price_a3: i64,
}

fn poster_view(poster: &Poster) -> PosterView {
    PosterView {
        display_price: resolve_price(&poster.category, &poster.title, PosterSize::A4),
        display_price_a3: resolve_price(&poster.category, &poster.title, PosterSize::A3),
        poster: poster.clone(),
    }
}

async fn list_posters(State(s): State<AppState>) -> Json<Vec<PosterView>> {
    Json(lock(&s.catalog).posters().iter().map(poster_view).collect())
}

async fn get_poster(State(s): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<PosterView>> {
    lock(&s.catalog)
        .get(&id)
        .map(poster_view)
        .map(Json)
        .ok_or_else(|| ShopError::PosterNotFound.into())
}

async fn get_poster_by_slug(State(s): State<AppState>, Path(slug): Path<String>) -> ApiResult<Json<PosterView>> {
    lock(&s.catalog)
        .get_by_slug(&slug)
        .map(poster_view)
        .map(Json)
        .ok_or_else(|| ShopError::PosterNotFound.into())
}

async fn posters_by_category(State(s): State<AppState>, Path(slug): Path<String>) -> Json<Vec<PosterView>> {
    Json(lock(&s.catalog).by_category(&slug).into_iter().map(poster_view).collect())
}

async fn featured_posters(State(s): State<AppState>) -> Json<Vec<PosterView>> {
    Json(lock(&s.catalog).featured().into_iter().map(poster_view).collect())
}

async fn create_poster(
    State(s): State<AppState>,
    headers: HeaderMap,
    Json(new): Json<NewPoster>,
) -> ApiResult<(StatusCode, Json<Poster>)> {
    require_admin(&s, &headers)?;
    Ok((StatusCode::CREATED, Json(lock(&s.catalog).add(new))))
}

async fn update_poster(
    State(s): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(patch): Json<PosterPatch>,
) -> ApiResult<Json<Poster>> {
    require_admin(&s, &headers)?;
    lock(&s.catalog)
        .update(&id, patch)
        .map(Json)
        .ok_or_else(|| ShopError::PosterNotFound.into())
}

async fn delete_poster(
    State(s): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    require_admin(&s, &headers)?;
    lock(&s.catalog).delete(&id);
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// Cart
// =============================================================================

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CartResponse {
    items: Vec<poster_shop::cart::CartItem>,
    item_count: u32,
    subtotal: i64,
}

fn cart_response(cart: &CartStore) -> CartResponse {
    CartResponse {
        items: cart.items().to_vec(),
        item_count: cart.item_count(),
        subtotal: cart.subtotal(),
    }
}

async fn get_cart(State(s): State<AppState>) -> Json<CartResponse> {
    Json(cart_response(&lock(&s.cart)))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AddToCartRequest {
    poster_id: String,
    #[serde(default)]
    size: PosterSize,
}

async fn add_to_cart(State(s): State<AppState>, Json(r): Json<AddToCartRequest>) -> ApiResult<Json<CartResponse>> {
    let line = {
        let catalog = lock(&s.catalog);
        let poster = catalog.get(&r.poster_id).ok_or(ShopError::PosterNotFound)?;
        NewCartItem {
            id: composite_id(&poster.id, r.size),
            title: poster.title.clone(),
            // The resolver quotes the price, not the catalog record.
            price: resolve_price(&poster.category, &poster.title, r.size),
            category: poster.category.clone(),
            image_url: Some(poster.image_url.clone()),
            size: Some(r.size),
        }
    };
    let mut cart = lock(&s.cart);
    cart.add(line);
    Ok(Json(cart_response(&cart)))
}

#[derive(Deserialize)]
struct UpdateQuantityRequest {
    quantity: i64,
}

async fn update_cart_item(
    State(s): State<AppState>,
    Path(id): Path<String>,
    Json(r): Json<UpdateQuantityRequest>,
) -> Json<CartResponse> {
    let mut cart = lock(&s.cart);
    cart.set_quantity(&id, r.quantity);
    Json(cart_response(&cart))
}

async fn remove_cart_item(State(s): State<AppState>, Path(id): Path<String>) -> Json<CartResponse> {
    let mut cart = lock(&s.cart);
    cart.remove(&id);
    Json(cart_response(&cart))
}

async fn clear_cart(State(s): State<AppState>) -> Json<CartResponse> {
    let mut cart = lock(&s.cart);
    cart.clear();
    Json(cart_response(&cart))
}

// =============================================================================
// Analytics
// =============================================================================

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TrackViewRequest {
    poster_id: String,
    source: String,
}

async fn track_view(State(s): State<AppState>, Json(r): Json<TrackViewRequest>) -> StatusCode {
    lock(&s.analytics).track_view(r.poster_id, r.source);
    StatusCode::ACCEPTED
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TrackClickRequest {
    poster_id: String,
    action: String,
}

async fn track_click(State(s): State<AppState>, Json(r): Json<TrackClickRequest>) -> StatusCode {
    lock(&s.analytics).track_click(r.poster_id, r.action);
    StatusCode::ACCEPTED
}

async fn analytics_dashboard(State(s): State<AppState>) -> Json<serde_json::Value> {
    let analytics = lock(&s.analytics);
    let catalog = lock(&s.catalog);
    Json(serde_json::json!({
        "totalViews": analytics.total_views(),
        "totalClicks": analytics.total_clicks(),
        "uniqueViews": analytics.unique_views(),
        "topPosters": analytics.top_posters(5, &catalog),
        "categoryStats": analytics.category_stats(&catalog),
        "views": analytics.views(),
        "clicks": analytics.clicks(),
    }))
}

#[derive(Deserialize)]
struct TimeseriesParams {
    days: Option<u64>,
}

async fn analytics_timeseries(
    State(s): State<AppState>,
    Query(p): Query<TimeseriesParams>,
) -> Json<Vec<poster_shop::analytics::DailyEngagement>> {
    Json(lock(&s.analytics).views_over_time(p.days.unwrap_or(7).min(90)))
}

async fn clear_analytics(State(s): State<AppState>, headers: HeaderMap) -> ApiResult<StatusCode> {
    require_admin(&s, &headers)?;
    lock(&s.analytics).clear();
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// Checkout
// =============================================================================

async fn begin_checkout(
    State(s): State<AppState>,
    Json(details): Json<ShippingDetails>,
) -> ApiResult<Json<poster_shop::checkout::PaymentSession>> {
    let summary = CartSummary::of(&lock(&s.cart));
    let session = s.checkout.begin(details, summary).await?;
    Ok(Json(session))
}

async fn verify_checkout(
    State(s): State<AppState>,
    Json(callback): Json<PaymentCallback>,
) -> ApiResult<Json<poster_shop::checkout::OrderConfirmation>> {
    let confirmation = s.checkout.complete(callback).await?;
    // Cart survives any failure above; only a verified payment clears it.
    lock(&s.cart).clear();
    Ok(Json(confirmation))
}

// =============================================================================
// Admin
// =============================================================================

#[derive(Deserialize)]
struct LoginRequest {
    username: String,
    password: String,
}

async fn admin_login(State(s): State<AppState>, Json(r): Json<LoginRequest>) -> ApiResult<Json<serde_json::Value>> {
    match lock(&s.admin).login(&r.username, &r.password) {
        Some(token) => Ok(Json(serde_json::json!({"token": token}))),
        None => Err(ShopError::Unauthorized.into()),
    }
}

async fn admin_logout(State(s): State<AppState>, headers: HeaderMap) -> StatusCode {
    if let Some(token) = headers.get("x-admin-token").and_then(|v| v.to_str().ok()) {
        lock(&s.admin).logout(token);
    }
    StatusCode::NO_CONTENT
}
