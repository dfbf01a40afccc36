use axum::{
    Json, Router,
    extract::{Request, State},
    http::{HeaderValue, Method, StatusCode, Uri},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde_json::json;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;
use uuid::Uuid;

use evosaas_types::api::HealthResponse;

use crate::{AppState, auth, instances, messages, webhooks};

/// Builds the full application router. `cors_origin` is a comma-separated
/// origin allowlist; `*` means permissive.
pub fn router(state: AppState, cors_origin: &str) -> Router {
    let public = Router::new()
        .route("/health", get(health))
        .route("/api/v1", get(api_index))
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/webhooks/evolution", post(webhooks::evolution_webhook))
        .with_state(state.clone());

    // Identity is enforced per-handler by the AuthUser extractor.
    let protected = Router::new()
        .route("/auth/profile", get(auth::profile))
        .route(
            "/whatsapp/instances",
            post(instances::create_instance).get(instances::list_instances),
        )
        .route(
            "/whatsapp/instances/{instance_id}",
            get(instances::get_instance_status),
        )
        .route("/whatsapp/messages/send", post(messages::send_message))
        .route("/whatsapp/messages", get(messages::list_messages))
        .with_state(state);

    Router::new()
        .merge(public)
        .merge(protected)
        .fallback(not_found)
        .layer(middleware::from_fn(request_id))
        .layer(cors_layer(cors_origin))
        .layer(TraceLayer::new_for_http())
}

fn cors_layer(origin: &str) -> CorsLayer {
    if origin == "*" {
        return CorsLayer::permissive();
    }

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(parse_origins(origin)))
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Parses a comma-separated origin allowlist. Entries that are not valid
/// header values are dropped with a warning; an all-invalid allowlist would
/// otherwise silently block every origin.
fn parse_origins(origin: &str) -> Vec<HeaderValue> {
    origin
        .split(',')
        .filter_map(|entry| {
            let entry = entry.trim();
            match entry.parse::<HeaderValue>() {
                Ok(value) => Some(value),
                Err(_) => {
                    warn!("ignoring invalid CORS origin entry: {entry:?}");
                    None
                }
            }
        })
        .collect()
}

/// Stamps every response with a freshly generated id for log correlation.
/// Not persisted anywhere.
async fn request_id(req: Request, next: Next) -> Response {
    let mut response = next.run(req).await;
    if let Ok(value) = HeaderValue::from_str(&Uuid::new_v4().to_string()) {
        response.headers_mut().insert("x-request-id", value);
    }
    response
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".into(),
        timestamp: chrono::Utc::now(),
        environment: state.environment.clone(),
        uptime: state.started_at.elapsed().as_secs(),
    })
}

async fn api_index() -> impl IntoResponse {
    Json(json!({
        "name": "Evosaas API",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "WhatsApp Integration SaaS Platform",
        "endpoints": {
            "auth": "/auth",
            "whatsapp": "/whatsapp",
            "webhooks": "/webhooks",
            "health": "/health",
        },
    }))
}

async fn not_found(method: Method, uri: Uri) -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "error": "Not Found",
            "path": uri.path(),
            "method": method.as_str(),
        })),
    )
}
