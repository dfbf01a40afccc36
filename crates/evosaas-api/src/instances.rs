use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use evosaas_types::api::{
    CreateInstanceRequest, CreateInstanceResponse, InstanceListResponse, InstanceStatusResponse,
};

use crate::AppState;
use crate::error::ApiError;
use crate::extract::AuthUser;
use crate::validate;

pub async fn create_instance(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    Json(req): Json<CreateInstanceRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let name = req
        .instance_name
        .ok_or_else(|| ApiError::Validation("Instance name required".into()))?;

    if !validate::valid_instance_name(&name) {
        return Err(ApiError::Validation(
            "Instance name must be between 3 and 50 characters".into(),
        ));
    }

    let instance = state.store.create_instance(claims.sub, &name)?;

    Ok((
        StatusCode::CREATED,
        Json(CreateInstanceResponse {
            message: "Instance created successfully".into(),
            instance,
        }),
    ))
}

pub async fn list_instances(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    let instances = state.store.instances_for_owner(claims.sub)?;
    Ok(Json(InstanceListResponse { instances }))
}

pub async fn get_instance_status(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    Path(instance_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    // A malformed id cannot name an instance the caller owns, so it gets the
    // same not-found as an unknown or foreign-owned one.
    let instance_id = Uuid::parse_str(&instance_id)
        .map_err(|_| ApiError::NotFound("Instance not found".into()))?;

    let instance = state
        .store
        .instance_for_owner(claims.sub, instance_id)?
        .ok_or_else(|| ApiError::NotFound("Instance not found".into()))?;

    Ok(Json(InstanceStatusResponse { instance }))
}
