//! Provider-facing endpoints: call webhook, test harness, token issuance.

use axum::extract::{Query, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::{Form, Json};
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info, warn};

use callpop_call_events::CallArrivalEvent;

use crate::error::{HubError, HubResult};
use crate::twiml::VoiceResponse;

use super::AppState;

/// Form fields the provider posts on an inbound call.
#[derive(Debug, Deserialize)]
pub struct VoiceWebhookRequest {
    #[serde(rename = "From", default)]
    pub from: String,
    #[serde(rename = "CallSid", default)]
    pub call_sid: String,
    #[serde(rename = "CallStatus", default)]
    pub call_status: String,
    #[serde(rename = "Direction", default)]
    pub direction: String,
}

#[derive(Debug, Deserialize)]
pub struct TestCallRequest {
    #[serde(rename = "fromNumber")]
    pub from_number: String,
}

#[derive(Debug, Deserialize)]
pub struct TokenQuery {
    #[serde(default)]
    pub identity: String,
}

/// `POST /voice/webhook`: provider call notification.
///
/// Always answers 200 with a voice-response document: the calling party is
/// listening to this response, so an internal failure yields an apology
/// document, never an HTTP error.
pub async fn voice_webhook(
    State(state): State<AppState>,
    Form(request): Form<VoiceWebhookRequest>,
) -> impl IntoResponse {
    info!(
        from = %request.from,
        call_sid = %request.call_sid,
        status = %request.call_status,
        direction = %request.direction,
        "Received incoming call webhook"
    );

    let xml = match ingest_provider_call(&state, &request) {
        Ok(delivered) => {
            info!(call_sid = %request.call_sid, delivered, "Broadcast incoming call");
            let mut response = VoiceResponse::new()
                .say_in("Please hold while we connect you to an operator.", "en-IE");
            if let Some(url) = &state.hold_music_url {
                response = response.play(url.clone());
            }
            response.to_xml()
        }
        Err(e) => {
            error!(error = %e, "Error processing incoming call");
            VoiceResponse::new()
                .say("Sorry, an error occurred. Please try again later.")
                .to_xml()
        }
    };

    ([(header::CONTENT_TYPE, "application/xml")], xml)
}

fn ingest_provider_call(state: &AppState, request: &VoiceWebhookRequest) -> HubResult<usize> {
    if request.call_sid.is_empty() {
        return Err(HubError::invalid_state(
            "provider webhook carried no CallSid",
        ));
    }
    let event = CallArrivalEvent::new(request.from.clone(), request.call_sid.clone());
    Ok(state.broadcaster.publish(&event))
}

/// `POST /test/incoming-call`: harness entry point, synthesizes a call sid.
pub async fn test_incoming_call(
    State(state): State<AppState>,
    Json(request): Json<TestCallRequest>,
) -> impl IntoResponse {
    info!(from = %request.from_number, "Test incoming call");

    let event = CallArrivalEvent::test_call(request.from_number);
    let delivered = state.broadcaster.publish(&event);
    info!(call_sid = %event.call_sid, delivered, "Broadcast test call");

    (StatusCode::OK, Json(json!({ "message": "Test call sent" })))
}

/// `GET /api/twilio/token?identity=`: device access credential.
pub async fn token(
    State(state): State<AppState>,
    Query(query): Query<TokenQuery>,
) -> impl IntoResponse {
    if query.identity.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            "Identity is a required parameter".to_string(),
        );
    }

    match state.tokens.issue(&query.identity) {
        Ok(jwt) => (StatusCode::OK, jwt),
        Err(e) => {
            warn!(identity = %query.identity, error = %e, "Error creating access token");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Error creating token".to_string(),
            )
        }
    }
}
