pub mod auth;
pub mod error;
pub mod extract;
pub mod instances;
pub mod messages;
pub mod routes;
pub mod token;
pub mod validate;
pub mod webhooks;

use std::sync::Arc;
use std::time::Instant;

use evosaas_store::Store;

use crate::token::TokenService;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub store: Store,
    pub tokens: TokenService,
    pub environment: String,
    pub started_at: Instant,
}
