use axum::Json;
use serde_json::Value;
use tracing::info;

use evosaas_types::api::WebhookAck;

/// Gateway callbacks land here. Instance connection-status and message
/// delivery-status updates are not wired up; the payload is logged and
/// acknowledged so the gateway does not retry.
pub async fn evolution_webhook(Json(payload): Json<Value>) -> Json<WebhookAck> {
    info!(%payload, "evolution webhook received");

    Json(WebhookAck {
        status: "received".into(),
        message: "Webhook processed".into(),
    })
}
