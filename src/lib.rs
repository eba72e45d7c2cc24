//! Replicated state engine for icebreaker minigames (two truths and a lie,
//! drawing guessing and music guessing).
//!
//! Clients share one JSON document per session through a [`sync::SyncChannel`]
//! and derive everything else, the phase included, from its contents.

pub mod api;
pub mod client;
pub mod config;
pub mod engine;
pub mod error;
pub mod patch;
pub mod protocol;
pub mod roster;
pub mod store;
pub mod sync;
pub mod types;
pub mod variant;
pub mod ws;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Relay routes over `store`
pub fn router(store: store::DocumentStore) -> Router {
    Router::new()
        .route("/ws", get(ws::ws_handler))
        .route("/api/sessions", post(api::create_session))
        .route("/api/sessions/{id}", get(api::get_session))
        .route("/health", get(api::health))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(store)
}
