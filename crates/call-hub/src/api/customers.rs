//! Customer directory endpoints.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use tracing::info;

use super::AppState;

#[derive(Debug, Deserialize)]
pub struct ByPhoneQuery {
    #[serde(default)]
    pub number: String,
}

/// Fields accepted by `POST /api/customers`.
///
/// The shape is part of the API even though the in-memory directory rejects
/// creation; see [`create`].
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCustomerRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub phone: String,
    pub email: Option<String>,
    pub account_id: Option<String>,
    pub notes: Option<String>,
}

/// `GET /api/customers/by-phone?number=`: 200 record, 404 unknown, 400 when
/// the number parameter is missing. A missing parameter is the caller's
/// mistake, so it is never logged as a server error.
pub async fn by_phone(
    State(state): State<AppState>,
    Query(query): Query<ByPhoneQuery>,
) -> Response {
    if query.number.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            "Phone number is a required parameter",
        )
            .into_response();
    }

    info!(number = %query.number, "Searching customer by phone");

    match state.directory.get_by_phone(&query.number) {
        Some(customer) => {
            info!(number = %query.number, name = %customer.name, "Found customer");
            Json(customer).into_response()
        }
        None => {
            info!(number = %query.number, "Customer not found");
            StatusCode::NOT_FOUND.into_response()
        }
    }
}

/// `GET /api/customers`: the full directory.
pub async fn list(State(state): State<AppState>) -> Response {
    Json(state.directory.get_all()).into_response()
}

/// `POST /api/customers`: recognized but intentionally unsupported by the
/// in-memory directory, so it answers 501 rather than pretending to succeed.
pub async fn create(Json(request): Json<CreateCustomerRequest>) -> Response {
    info!(name = %request.name, "Rejected customer creation request");
    (
        StatusCode::NOT_IMPLEMENTED,
        "Customer creation is not supported by the in-memory directory",
    )
        .into_response()
}
