//! HTTP surface of the call hub.
//!
//! Route-for-route: the provider webhook and test harness under the root,
//! token issuance and the customer directory under `/api`, and the
//! persistent event channel at `/hubs/calls`.

pub mod customers;
pub mod hub_ws;
pub mod twilio;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::broadcaster::EventBroadcaster;
use crate::customers::CustomerDirectory;
use crate::token::AccessTokenIssuer;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub broadcaster: Arc<EventBroadcaster>,
    pub directory: Arc<dyn CustomerDirectory>,
    pub tokens: Arc<AccessTokenIssuer>,
    pub hold_music_url: Option<String>,
}

/// Build the hub router over the shared state.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/voice/webhook", post(twilio::voice_webhook))
        .route("/test/incoming-call", post(twilio::test_incoming_call))
        .route("/api/twilio/token", get(twilio::token))
        .route("/api/customers/by-phone", get(customers::by_phone))
        .route(
            "/api/customers",
            get(customers::list).post(customers::create),
        )
        .route("/hubs/calls", get(hub_ws::ws_handler))
        // Browser operator UIs run on a different origin in development
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
