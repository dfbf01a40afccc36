use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};

use evosaas_types::api::{
    AuthResponse, LoginRequest, ProfileResponse, RegisterRequest, UserProfile,
};

use crate::AppState;
use crate::error::ApiError;
use crate::extract::AuthUser;
use crate::validate;

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let (email, password, name) = match (req.email, req.password, req.name) {
        (Some(email), Some(password), Some(name)) => (email, password, name),
        _ => return Err(ApiError::Validation("Missing required fields".into())),
    };

    if !validate::valid_email(&email) {
        return Err(ApiError::Validation("Invalid email address".into()));
    }
    if !validate::valid_password(&password) {
        return Err(ApiError::Validation(
            "Password must be at least 8 characters".into(),
        ));
    }

    let password_hash = hash_password(&password)?;
    let user = state.store.create_user(&email, &name, &password_hash)?;

    let token = state
        .tokens
        .issue(&user)
        .map_err(|e| ApiError::Internal(anyhow::Error::new(e)))?;

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            message: "User registered successfully".into(),
            user: UserProfile::from(&user),
            token,
        }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let (email, password) = match (req.email, req.password) {
        (Some(email), Some(password)) => (email, password),
        _ => return Err(ApiError::Validation("Email and password required".into())),
    };

    // Unknown email and wrong password take the same exit so the response
    // cannot be used to probe which emails are registered.
    let user = state
        .store
        .user_by_email(&email)?
        .ok_or(ApiError::InvalidCredentials)?;

    if !verify_password(&password, &user.password_hash)? {
        return Err(ApiError::InvalidCredentials);
    }

    let token = state
        .tokens
        .issue(&user)
        .map_err(|e| ApiError::Internal(anyhow::Error::new(e)))?;

    Ok(Json(AuthResponse {
        message: "Login successful".into(),
        user: UserProfile::from(&user),
        token,
    }))
}

pub async fn profile(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    let user = state
        .store
        .user_by_id(claims.sub)?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;

    Ok(Json(ProfileResponse {
        user: UserProfile::from(&user),
    }))
}

/// Argon2id with a fresh random salt. Verification below is constant-time,
/// as provided by the hashing primitive.
fn hash_password(plain: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(plain.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("password hashing failed: {e}")))
}

fn verify_password(plain: &str, hash: &str) -> Result<bool, ApiError> {
    let parsed = PasswordHash::new(hash)
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("stored password hash unreadable: {e}")))?;

    Ok(Argon2::default()
        .verify_password(plain.as_bytes(), &parsed)
        .is_ok())
}
