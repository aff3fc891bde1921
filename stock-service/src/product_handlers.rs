use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use common_auth::AuthContext;
use common_http_errors::{ApiError, ApiResult};
use serde::{Deserialize, Serialize};

use crate::app::{json_body, path_id, AppState};
use crate::engine::{ProductInput, StockChange};
use crate::status::StockStatus;
use crate::store::ProductRecord;

#[derive(Debug, Serialize)]
pub struct ProductList {
    pub success: bool,
    pub products: Vec<ProductRecord>,
}

#[derive(Debug, Serialize)]
pub struct ProductEnvelope {
    pub product: ProductRecord,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductCreated {
    pub success: bool,
    pub product_id: i64,
}

#[derive(Debug, Serialize)]
pub struct ProductUpdated {
    pub success: bool,
    pub status: StockStatus,
}

#[derive(Debug, Serialize)]
pub struct Deleted {
    pub success: bool,
}

#[derive(Debug, Deserialize)]
pub struct ReplenishRequest {
    pub quantity: Option<i32>,
}

pub async fn list_products(
    State(state): State<AppState>,
    auth: AuthContext,
) -> ApiResult<Json<ProductList>> {
    let products = state.engine.list_products(auth.user_id()).await?;
    Ok(Json(ProductList { success: true, products }))
}

pub async fn create_product(
    State(state): State<AppState>,
    auth: AuthContext,
    payload: Result<Json<ProductInput>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<ProductCreated>)> {
    let input = json_body(payload)?;
    let product_id = state.engine.create_product(auth.user_id(), input).await?;
    Ok((
        StatusCode::CREATED,
        Json(ProductCreated { success: true, product_id }),
    ))
}

pub async fn get_product(
    State(state): State<AppState>,
    auth: AuthContext,
    path: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<ProductEnvelope>> {
    let product_id = path_id(path)?;
    let product = state.engine.get_product(auth.user_id(), product_id).await?;
    Ok(Json(ProductEnvelope { product }))
}

pub async fn update_product(
    State(state): State<AppState>,
    auth: AuthContext,
    path: Result<Path<i64>, PathRejection>,
    payload: Result<Json<ProductInput>, JsonRejection>,
) -> ApiResult<Json<ProductUpdated>> {
    let product_id = path_id(path)?;
    let input = json_body(payload)?;
    let status = state
        .engine
        .edit_product(auth.user_id(), product_id, input)
        .await?;
    Ok(Json(ProductUpdated { success: true, status }))
}

pub async fn delete_product(
    State(state): State<AppState>,
    auth: AuthContext,
    path: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<Deleted>> {
    let product_id = path_id(path)?;
    state.engine.delete_product(auth.user_id(), product_id).await?;
    Ok(Json(Deleted { success: true }))
}

pub async fn replenish_product(
    State(state): State<AppState>,
    auth: AuthContext,
    path: Result<Path<i64>, PathRejection>,
    payload: Result<Json<ReplenishRequest>, JsonRejection>,
) -> ApiResult<Json<StockChange>> {
    let product_id = path_id(path)?;
    let delta = json_body(payload)?
        .quantity
        .ok_or_else(|| ApiError::validation("quantity is required"))?;
    let change = state
        .engine
        .replenish(auth.user_id(), product_id, delta)
        .await?;
    Ok(Json(change))
}
