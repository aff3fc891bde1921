use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use common_auth::AuthContext;
use common_http_errors::{ApiError, ApiResult};
use rand_core::OsRng;
use serde::{Deserialize, Serialize};
use sqlx::{query, query_as, query_scalar, FromRow};
use tracing::{info, warn};

use crate::app::{json_body, AppState};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    pub old_password: Option<String>,
    pub new_password: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct EditUserRequest {
    pub firstname: Option<String>,
    pub lastname: Option<String>,
    pub username: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
    pub token: String,
    pub expires_in: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthStatus {
    pub authenticated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<i64>,
}

#[derive(Debug, FromRow, Serialize)]
pub struct UserProfile {
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct UserEnvelope {
    pub success: bool,
    pub user: UserProfile,
}

#[derive(FromRow)]
struct Credentials {
    id: i64,
    username: String,
    password_hash: String,
}

pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<TokenResponse>)> {
    let request = json_body(payload)?;
    let (full_name, email, username, password) = match (
        required(request.full_name),
        required(request.email),
        required(request.username),
        request.password.filter(|p| !p.trim().is_empty()),
    ) {
        (Some(f), Some(e), Some(u), Some(p)) => (f, e, u, p),
        _ => return Err(ApiError::validation("All fields are required.")),
    };

    if username_taken(&state, &username, None).await? {
        return Err(username_conflict());
    }

    let (first_name, last_name) = split_full_name(&full_name);
    let password_hash = hash_password(&password)?;
    let user_id = query_scalar::<_, i64>(
        "INSERT INTO users (first_name, last_name, email, username, password_hash) \
         VALUES ($1, $2, $3, $4, $5) RETURNING id",
    )
    .bind(&first_name)
    .bind(&last_name)
    .bind(&email)
    .bind(&username)
    .bind(&password_hash)
    .fetch_one(&state.db)
    .await
    .map_err(map_unique_violation)?;

    info!(user_id, username = %username, "user registered");
    let body = issue_token(&state, user_id, &username, Some("User registered successfully"))?;
    Ok((StatusCode::CREATED, Json(body)))
}

pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<Json<TokenResponse>> {
    let request = json_body(payload)?;
    let (username, password) = match (required(request.username), request.password) {
        (Some(u), Some(p)) if !p.is_empty() => (u, p),
        _ => return Err(ApiError::validation("username and password are required.")),
    };

    let creds = query_as::<_, Credentials>(
        "SELECT id, username, password_hash FROM users WHERE username = $1",
    )
    .bind(&username)
    .fetch_optional(&state.db)
    .await
    .map_err(ApiError::internal)?;

    let creds = match creds {
        Some(c) if verify_password(&password, &c.password_hash) => c,
        _ => {
            warn!(username = %username, "login rejected");
            return Err(invalid_credentials());
        }
    };

    let body = issue_token(&state, creds.id, &creds.username, Some("Login successful."))?;
    Ok(Json(body))
}

/// Reports whether the caller holds a valid token. Never rejects.
pub async fn check_auth(auth: Option<AuthContext>) -> Json<AuthStatus> {
    Json(AuthStatus {
        authenticated: auth.is_some(),
        user_id: auth.map(|a| a.user_id()),
    })
}

pub async fn refresh_token(
    State(state): State<AppState>,
    auth: AuthContext,
) -> ApiResult<Json<TokenResponse>> {
    let body = issue_token(&state, auth.user_id(), &auth.claims.username, None)?;
    Ok(Json(body))
}

pub async fn reset_password(
    State(state): State<AppState>,
    auth: AuthContext,
    payload: Result<Json<ResetPasswordRequest>, JsonRejection>,
) -> ApiResult<Json<TokenResponse>> {
    let request = json_body(payload)?;
    let (old_password, new_password) = match (request.old_password, request.new_password) {
        (Some(o), Some(n)) if !o.is_empty() && !n.trim().is_empty() => (o, n),
        _ => {
            return Err(ApiError::validation(
                "Old password and new password are required.",
            ))
        }
    };

    let user_id = auth.user_id();
    let creds = query_as::<_, Credentials>(
        "SELECT id, username, password_hash FROM users WHERE id = $1",
    )
    .bind(user_id)
    .fetch_optional(&state.db)
    .await
    .map_err(ApiError::internal)?
    .ok_or(ApiError::NotFound { code: "user_not_found" })?;

    if !verify_password(&old_password, &creds.password_hash) {
        return Err(ApiError::BadRequest {
            code: "invalid_password",
            message: Some("Old password is incorrect.".into()),
        });
    }

    let password_hash = hash_password(&new_password)?;
    query("UPDATE users SET password_hash = $1 WHERE id = $2")
        .bind(&password_hash)
        .bind(user_id)
        .execute(&state.db)
        .await
        .map_err(ApiError::internal)?;

    info!(user_id, "password updated");
    let body = issue_token(&state, user_id, &creds.username, Some("Password updated successfully."))?;
    Ok(Json(body))
}

pub async fn edit_user(
    State(state): State<AppState>,
    auth: AuthContext,
    payload: Result<Json<EditUserRequest>, JsonRejection>,
) -> ApiResult<Json<TokenResponse>> {
    let request = json_body(payload)?;
    let (first_name, last_name, username) = match (
        required(request.firstname),
        required(request.lastname),
        required(request.username),
    ) {
        (Some(f), Some(l), Some(u)) => (f, l, u),
        _ => return Err(ApiError::validation("All fields are required.")),
    };

    let user_id = auth.user_id();
    if username_taken(&state, &username, Some(user_id)).await? {
        return Err(username_conflict());
    }

    let result = query(
        "UPDATE users SET first_name = $1, last_name = $2, username = $3 WHERE id = $4",
    )
    .bind(&first_name)
    .bind(&last_name)
    .bind(&username)
    .bind(user_id)
    .execute(&state.db)
    .await
    .map_err(map_unique_violation)?;

    if result.rows_affected() == 0 {
        return Err(ApiError::NotFound { code: "user_not_found" });
    }

    let body = issue_token(&state, user_id, &username, Some("User details updated successfully."))?;
    Ok(Json(body))
}

pub async fn get_user(
    State(state): State<AppState>,
    auth: AuthContext,
) -> ApiResult<Json<UserEnvelope>> {
    let user = query_as::<_, UserProfile>(
        "SELECT first_name, last_name, username, email FROM users WHERE id = $1",
    )
    .bind(auth.user_id())
    .fetch_optional(&state.db)
    .await
    .map_err(ApiError::internal)?
    .ok_or(ApiError::NotFound { code: "user_not_found" })?;

    Ok(Json(UserEnvelope { success: true, user }))
}

fn issue_token(
    state: &AppState,
    user_id: i64,
    username: &str,
    message: Option<&'static str>,
) -> ApiResult<TokenResponse> {
    let issued = state
        .token_signer
        .issue(user_id, username)
        .map_err(ApiError::internal)?;
    Ok(TokenResponse {
        success: true,
        message,
        token: issued.token,
        expires_in: issued.expires_in_label,
    })
}

async fn username_taken(state: &AppState, username: &str, except: Option<i64>) -> ApiResult<bool> {
    let existing = query_scalar::<_, i64>(
        "SELECT id FROM users WHERE username = $1 AND ($2::BIGINT IS NULL OR id <> $2)",
    )
    .bind(username)
    .bind(except)
    .fetch_optional(&state.db)
    .await
    .map_err(ApiError::internal)?;
    Ok(existing.is_some())
}

fn username_conflict() -> ApiError {
    ApiError::Conflict {
        code: "username_taken",
        message: Some("Username already exists.".into()),
    }
}

fn invalid_credentials() -> ApiError {
    ApiError::Unauthorized {
        code: "invalid_credentials",
        message: Some("Invalid username or password.".into()),
    }
}

/// A concurrent insert can still trip the unique index after the pre-check.
fn map_unique_violation(err: sqlx::Error) -> ApiError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.code().as_deref() == Some("23505") {
            return username_conflict();
        }
    }
    ApiError::internal(err)
}

fn required(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Splits on the first space: "Ada King Lovelace" becomes ("Ada", "King Lovelace").
pub(crate) fn split_full_name(full_name: &str) -> (String, String) {
    let trimmed = full_name.trim();
    match trimmed.split_once(' ') {
        Some((first, rest)) => (first.to_string(), rest.trim().to_string()),
        None => (trimmed.to_string(), String::new()),
    }
}

fn hash_password(password: &str) -> ApiResult<String> {
    if password.trim().is_empty() {
        return Err(ApiError::validation("Password must not be empty"));
    }

    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(ApiError::internal)
}

fn verify_password(password: &str, stored_hash: &str) -> bool {
    match PasswordHash::new(stored_hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(err) => {
            warn!(?err, "stored password hash is not a PHC string");
            false
        }
    }
}
