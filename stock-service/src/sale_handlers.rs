use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{NaiveDate, Utc};
use common_auth::AuthContext;
use common_http_errors::{ApiError, ApiResult};
use serde::{Deserialize, Serialize};

use crate::app::{json_body, path_id, AppState};
use crate::engine::SaleReceipt;
use crate::store::SaleRecord;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SellRequest {
    pub quantity: Option<i32>,
    /// Defaults to today (UTC).
    pub sale_date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SalesQuery {
    pub product_id: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct SalesList {
    pub success: bool,
    pub sales: Vec<SaleRecord>,
}

pub async fn sell_product(
    State(state): State<AppState>,
    auth: AuthContext,
    path: Result<Path<i64>, PathRejection>,
    payload: Result<Json<SellRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<SaleReceipt>)> {
    let product_id = path_id(path)?;
    let request = json_body(payload)?;
    let quantity = request
        .quantity
        .ok_or_else(|| ApiError::validation("quantity is required"))?;
    let sale_date = request.sale_date.unwrap_or_else(|| Utc::now().date_naive());

    let receipt = state
        .engine
        .sell_product(auth.user_id(), product_id, quantity, sale_date)
        .await?;
    Ok((StatusCode::CREATED, Json(receipt)))
}

pub async fn list_sales(
    State(state): State<AppState>,
    auth: AuthContext,
    Query(query): Query<SalesQuery>,
) -> ApiResult<Json<SalesList>> {
    let sales = state
        .engine
        .list_sales(auth.user_id(), query.product_id)
        .await?;
    Ok(Json(SalesList { success: true, sales }))
}
