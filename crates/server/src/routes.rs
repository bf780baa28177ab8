use std::sync::Arc;

use axum::{routing::get, Router};
use printchat_core::catalog::Catalog;
use tera::Tera;

use crate::{chat, chat::SessionRegistry, health, web};

#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<Catalog>,
    pub sessions: Arc<SessionRegistry>,
    pub templates: Arc<Tera>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(web::index))
        .route("/ws", get(chat::websocket))
        .route("/health", get(health::health))
        .with_state(state)
}
