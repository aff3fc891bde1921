use std::sync::Arc;

use axum::{
    body::Body,
    extract::{rejection::JsonRejection, rejection::PathRejection, FromRef, Path, State},
    http::{Request, StatusCode},
    middleware,
    response::Response,
    routing::{get, post, put},
    Json, Router,
};
use common_auth::{JwtVerifier, TokenSigner};
use common_http_errors::ApiError;
use common_observability::StockMetrics;
use prometheus::{Encoder, TextEncoder};
use sqlx::PgPool;

use crate::category_handlers::{
    create_category, delete_category, list_categories, set_category_status, update_category,
};
use crate::dashboard_handlers::{low_stock, sales_trend, stats, stock_by_category};
use crate::engine::StockEngine;
use crate::product_handlers::{
    create_product, delete_product, get_product, list_products, replenish_product, update_product,
};
use crate::sale_handlers::{list_sales, sell_product};
use crate::user_handlers::{check_auth, edit_user, get_user, login, refresh_token, register, reset_password};

pub(crate) const SERVICE_NAME: &str = "stock-service";

#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub engine: StockEngine,
    pub jwt_verifier: Arc<JwtVerifier>,
    pub token_signer: Arc<TokenSigner>,
    pub metrics: Arc<StockMetrics>,
}

impl FromRef<AppState> for Arc<JwtVerifier> {
    fn from_ref(state: &AppState) -> Self {
        state.jwt_verifier.clone()
    }
}

impl FromRef<AppState> for Arc<StockMetrics> {
    fn from_ref(state: &AppState) -> Self {
        state.metrics.clone()
    }
}

async fn health() -> &'static str {
    "ok"
}

async fn metrics_endpoint(State(metrics): State<Arc<StockMetrics>>) -> (StatusCode, String) {
    let encoder = TextEncoder::new();
    let families = metrics.registry.gather();
    let mut buf = Vec::new();
    if let Err(e) = encoder.encode(&families, &mut buf) {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("metrics encode error: {e}"),
        );
    }
    (StatusCode::OK, String::from_utf8_lossy(&buf).to_string())
}

/// Counts every error response by the code carried in `X-Error-Code`.
async fn error_metrics_mw(
    State(metrics): State<Arc<StockMetrics>>,
    req: Request<Body>,
    next: middleware::Next,
) -> Response {
    let resp = next.run(req).await;
    let status = resp.status();
    if status.as_u16() >= 400 {
        let code = resp
            .headers()
            .get("x-error-code")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("unknown");
        metrics
            .http_errors_total
            .with_label_values(&[SERVICE_NAME, code, status.as_str()])
            .inc();
    }
    resp
}

pub fn build_router(state: AppState) -> Router {
    let metrics = state.metrics.clone();
    Router::new()
        .route("/healthz", get(health))
        .route("/metrics", get(metrics_endpoint))
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/check-auth", get(check_auth))
        .route("/refresh-token", post(refresh_token))
        .route("/reset-pass", put(reset_password))
        .route("/edit-user", put(edit_user))
        .route("/get-user", get(get_user))
        .route("/products", get(list_products).post(create_product))
        .route(
            "/products/:id",
            get(get_product).put(update_product).delete(delete_product),
        )
        .route("/products/:id/replenish", post(replenish_product))
        .route("/products/:id/sell", post(sell_product))
        .route("/sales", get(list_sales))
        .route("/categories", get(list_categories).post(create_category))
        .route(
            "/categories/:id",
            put(update_category).delete(delete_category),
        )
        .route("/categories/:id/status", put(set_category_status))
        .route("/api/dashboard/stats", get(stats))
        .route("/api/dashboard/stock-by-category", get(stock_by_category))
        .route("/api/dashboard/sales-trend", get(sales_trend))
        .route("/api/dashboard/low-stock", get(low_stock))
        .with_state(state)
        .layer(middleware::from_fn_with_state(metrics, error_metrics_mw))
}

/// Unwraps a JSON body, turning axum's rejection into the shared error envelope.
pub(crate) fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload.map(|Json(value)| value).map_err(|rejection| ApiError::BadRequest {
        code: "invalid_body",
        message: Some(rejection.body_text()),
    })
}

pub(crate) fn path_id(path: Result<Path<i64>, PathRejection>) -> Result<i64, ApiError> {
    path.map(|Path(id)| id).map_err(|rejection| ApiError::BadRequest {
        code: "invalid_id",
        message: Some(rejection.body_text()),
    })
}
