use axum::{
    Json,
    extract::{Query, State},
    response::IntoResponse,
};
use serde::Deserialize;
use uuid::Uuid;

use evosaas_types::api::{MessageListResponse, SendMessageRequest, SendMessageResponse};

use crate::AppState;
use crate::error::ApiError;
use crate::extract::AuthUser;
use crate::validate;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageQuery {
    pub instance_id: Option<String>,
}

/// No gateway call happens here: the record is appended with status `sent`
/// and the handler returns immediately.
pub async fn send_message(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    Json(req): Json<SendMessageRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let (instance_id, phone_number, body) = match (req.instance_id, req.phone_number, req.message)
    {
        (Some(instance_id), Some(phone_number), Some(body)) => (instance_id, phone_number, body),
        _ => return Err(ApiError::Validation("Missing required fields".into())),
    };

    if !validate::valid_phone_number(&phone_number) {
        return Err(ApiError::Validation("Invalid phone number".into()));
    }
    if !validate::valid_message(&body) {
        return Err(ApiError::Validation(
            "Message must be between 1 and 4096 characters".into(),
        ));
    }

    // Same not-found for malformed, unknown and foreign-owned instance ids.
    let instance_id = Uuid::parse_str(&instance_id)
        .map_err(|_| ApiError::NotFound("Instance not found".into()))?;

    let message = state
        .store
        .create_message(claims.sub, instance_id, &phone_number, &body)?;

    Ok(Json(SendMessageResponse {
        message: "Message sent successfully".into(),
        data: message,
    }))
}

pub async fn list_messages(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    Query(query): Query<MessageQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let filter = match query.instance_id.as_deref() {
        Some(raw) => Some(
            Uuid::parse_str(raw)
                .map_err(|_| ApiError::Validation("instanceId must be a valid id".into()))?,
        ),
        None => None,
    };

    let messages = state.store.messages_for_owner(claims.sub, filter)?;
    Ok(Json(MessageListResponse { messages }))
}
