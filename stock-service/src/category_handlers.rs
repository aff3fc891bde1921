use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use common_auth::AuthContext;
use common_http_errors::ApiResult;
use serde::{Deserialize, Serialize};

use crate::app::{json_body, path_id, AppState};
use crate::status::CategoryStatus;
use crate::store::CategoryRecord;

#[derive(Debug, Deserialize)]
pub struct CategoryRequest {
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CategoryStatusRequest {
    pub status: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CategoryList {
    pub success: bool,
    pub categories: Vec<CategoryRecord>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryCreated {
    pub success: bool,
    pub category_id: i64,
}

#[derive(Debug, Serialize)]
pub struct CategoryUpdated {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<CategoryStatus>,
}

pub async fn list_categories(
    State(state): State<AppState>,
    auth: AuthContext,
) -> ApiResult<Json<CategoryList>> {
    let categories = state.engine.list_categories(auth.user_id()).await?;
    Ok(Json(CategoryList { success: true, categories }))
}

pub async fn create_category(
    State(state): State<AppState>,
    auth: AuthContext,
    payload: Result<Json<CategoryRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<CategoryCreated>)> {
    let request = json_body(payload)?;
    let category_id = state
        .engine
        .create_category(auth.user_id(), request.name)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(CategoryCreated { success: true, category_id }),
    ))
}

pub async fn update_category(
    State(state): State<AppState>,
    auth: AuthContext,
    path: Result<Path<i64>, PathRejection>,
    payload: Result<Json<CategoryRequest>, JsonRejection>,
) -> ApiResult<Json<CategoryUpdated>> {
    let category_id = path_id(path)?;
    let request = json_body(payload)?;
    state
        .engine
        .rename_category(auth.user_id(), category_id, request.name)
        .await?;
    Ok(Json(CategoryUpdated { success: true, status: None }))
}

pub async fn set_category_status(
    State(state): State<AppState>,
    auth: AuthContext,
    path: Result<Path<i64>, PathRejection>,
    payload: Result<Json<CategoryStatusRequest>, JsonRejection>,
) -> ApiResult<Json<CategoryUpdated>> {
    let category_id = path_id(path)?;
    let request = json_body(payload)?;
    let status = state
        .engine
        .set_category_status(auth.user_id(), category_id, request.status)
        .await?;
    Ok(Json(CategoryUpdated { success: true, status: Some(status) }))
}

pub async fn delete_category(
    State(state): State<AppState>,
    auth: AuthContext,
    path: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<CategoryUpdated>> {
    let category_id = path_id(path)?;
    state
        .engine
        .delete_category(auth.user_id(), category_id)
        .await?;
    Ok(Json(CategoryUpdated { success: true, status: None }))
}
