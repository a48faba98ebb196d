use std::sync::Arc;

use axum::{
    extract::{Extension, State, Json},
    http::HeaderMap,
};
use reqwest::Method;
use serde_json::{json, Value};
use tracing::debug;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;
use shared_models::auth::{CredentialsRequest, TokenResponse, User};
use shared_models::error::AppError;
use shared_utils::jwt;

fn extract_bearer_token(headers: &HeaderMap) -> Result<String, AppError> {
    let auth_header = headers
        .get("Authorization")
        .ok_or_else(|| AppError::Auth("Missing authorization header".to_string()))?;

    let auth_value = auth_header
        .to_str()
        .map_err(|_| AppError::Auth("Invalid authorization header format".to_string()))?;

    if !auth_value.starts_with("Bearer ") {
        return Err(AppError::Auth("Invalid authorization header format".to_string()));
    }

    Ok(auth_value[7..].to_string())
}

/// Proxy signup to the Supabase auth API.
pub async fn signup(
    State(config): State<Arc<AppConfig>>,
    Json(request): Json<CredentialsRequest>,
) -> Result<Json<Value>, AppError> {
    debug!("Signing up user: {}", request.email);

    if request.email.trim().is_empty() || request.password.is_empty() {
        return Err(AppError::ValidationError("Email and password are required".to_string()));
    }

    let client = SupabaseClient::new(&config);
    let response: Value = client.request(
        Method::POST,
        "/auth/v1/signup",
        None,
        Some(json!({
            "email": request.email,
            "password": request.password
        })),
    ).await.map_err(|e| AppError::ExternalService(e.to_string()))?;

    Ok(Json(response))
}

/// Password grant against the Supabase auth API.
pub async fn signin(
    State(config): State<Arc<AppConfig>>,
    Json(request): Json<CredentialsRequest>,
) -> Result<Json<Value>, AppError> {
    debug!("Signing in user: {}", request.email);

    let client = SupabaseClient::new(&config);
    let response: Value = client.request(
        Method::POST,
        "/auth/v1/token?grant_type=password",
        None,
        Some(json!({
            "email": request.email,
            "password": request.password
        })),
    ).await.map_err(|e| AppError::Auth(format!("Sign in failed: {}", e)))?;

    Ok(Json(response))
}

pub async fn validate_token(
    State(config): State<Arc<AppConfig>>,
    headers: HeaderMap,
) -> Result<Json<TokenResponse>, AppError> {
    debug!("Validating token");

    let token = extract_bearer_token(&headers)?;

    match jwt::validate_token(&token, &config.supabase_jwt_secret) {
        Ok(user) => Ok(Json(TokenResponse {
            valid: true,
            user_id: user.id,
            email: user.email,
            role: user.role,
        })),
        Err(err) => Err(AppError::Auth(err)),
    }
}

/// Boolean check only; an invalid token is a `false`, not an error.
pub async fn verify_token(
    State(config): State<Arc<AppConfig>>,
    headers: HeaderMap,
) -> Result<Json<Value>, AppError> {
    debug!("Verifying token");

    let token = extract_bearer_token(&headers)?;

    match jwt::validate_token(&token, &config.supabase_jwt_secret) {
        Ok(_) => Ok(Json(json!({ "valid": true }))),
        Err(_) => Ok(Json(json!({ "valid": false }))),
    }
}

pub async fn me(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    headers: HeaderMap,
) -> Result<Json<Value>, AppError> {
    debug!("Getting profile for user: {}", user.id);

    let token = extract_bearer_token(&headers)?;

    let client = SupabaseClient::new(&config);
    let auth_profile = client.get_user_profile(&user.id, &token)
        .await
        .map_err(|e| AppError::ExternalService(e.to_string()))?;

    Ok(Json(json!({
        "user_id": user.id,
        "email": user.email,
        "role": user.role,
        "auth_profile": auth_profile
    })))
}
