//! Request handlers and the OpenAPI document.

use crate::error::{ApiError, ErrorBody, ErrorDetail};
use crate::idempotency::{body_hash, Claim, IdempotencyStore, StoredResponse};
use crate::relay::MessageRelay;
use axum::{
    body::{Body, Bytes},
    extract::{rejection::BytesRejection, State},
    http::{header::CONTENT_TYPE, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Json, Response},
};
use gpupdate_core::request::{
    AttachmentInput, AuthorInput, CategoryInput, ClinicalSummary, CodedItem, ComponentInput,
    CompositionInput, DosageInput, EncounterInput, Gender, IdentifierInput, MedicationSupplied,
    MessageHeaderOptions, NarrativeBlock, ObservationInput, PatientInput, Provenance,
    QuantityInput, RatioInput, Routing, SystemInput, TimingInput,
};
use gpupdate_core::{Composer, UpdateRecordRequest};
use serde::Serialize;
use std::sync::Arc;
use utoipa::{OpenApi, ToSchema};

pub const UPDATE_RECORD_PATH: &str = "/v1/update-record/messages";
pub const HEADER_IDEMPOTENCY_KEY: &str = "idempotency-key";
pub const HEADER_CORRELATION_ID: &str = "x-correlation-id";
pub const HEADER_MESSAGE_ID: &str = "x-message-id";
pub const FHIR_XML: &str = "application/fhir+xml; charset=utf-8";

/// Shared state for the REST handlers.
#[derive(Clone)]
pub struct AppState {
    composer: Arc<Composer>,
    idempotency: IdempotencyStore,
    relay: Arc<dyn MessageRelay>,
    pub(crate) body_limit: usize,
}

impl AppState {
    pub fn new(composer: Composer, relay: Arc<dyn MessageRelay>) -> Self {
        Self {
            composer: Arc::new(composer),
            idempotency: IdempotencyStore::new(),
            relay,
            body_limit: crate::config::DEFAULT_MAX_BODY_BYTES,
        }
    }

    pub fn idempotency(&self) -> &IdempotencyStore {
        &self.idempotency
    }
}

#[derive(Serialize, ToSchema)]
pub struct HealthRes {
    pub ok: bool,
    pub message: String,
}

#[derive(OpenApi)]
#[openapi(
    paths(health, submit_update_record),
    components(schemas(
        HealthRes,
        ErrorBody,
        ErrorDetail,
        UpdateRecordRequest,
        PatientInput,
        Gender,
        Provenance,
        AuthorInput,
        SystemInput,
        IdentifierInput,
        Routing,
        CodedItem,
        ClinicalSummary,
        MedicationSupplied,
        DosageInput,
        TimingInput,
        RatioInput,
        QuantityInput,
        EncounterInput,
        ObservationInput,
        CategoryInput,
        ComponentInput,
        NarrativeBlock,
        AttachmentInput,
        CompositionInput,
        MessageHeaderOptions,
    ))
)]
pub struct ApiDoc;

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Health check response", body = HealthRes)
    )
)]
/// Health check endpoint.
#[axum::debug_handler]
pub async fn health() -> Json<HealthRes> {
    Json(HealthRes {
        ok: true,
        message: "GP update-record API is alive".into(),
    })
}

#[utoipa::path(
    post,
    path = "/v1/update-record/messages",
    request_body(content = UpdateRecordRequest, content_type = "application/json"),
    params(
        ("Idempotency-Key" = Option<String>, Header, description = "Replays the stored response for a repeated identical request"),
        ("X-Correlation-ID" = Option<String>, Header, description = "Echoed back; generated when absent"),
    ),
    responses(
        (status = 202, description = "Message bundle accepted", body = String, content_type = "application/fhir+xml"),
        (status = 400, description = "Malformed JSON or missing required fields", body = ErrorBody),
        (status = 409, description = "Idempotency key reused with a different body, or still in flight", body = ErrorBody),
        (status = 413, description = "Request body too large", body = ErrorBody),
        (status = 422, description = "A resource construction rule failed", body = ErrorBody),
        (status = 500, description = "Internal error", body = ErrorBody)
    )
)]
/// Compose an ITK3 update-record message bundle.
///
/// Every response carries `X-Correlation-ID`. Successful responses also carry `X-Message-Id`,
/// the id of the outer message bundle.
///
/// # Errors
///
/// Failures are returned as the JSON error envelope; see [`ApiError`].
#[axum::debug_handler]
pub async fn submit_update_record(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    let correlation_id = correlation_id(&headers);
    let span = tracing::info_span!(
        "update_record",
        correlation_id = %correlation_id
            .as_ref()
            .map(|v| String::from_utf8_lossy(v.as_bytes()))
            .unwrap_or_default()
    );

    let mut response = span.in_scope(|| {
        process(&state, &headers, body).unwrap_or_else(IntoResponse::into_response)
    });

    if let Some(value) = correlation_id {
        response.headers_mut().insert(HEADER_CORRELATION_ID, value);
    }
    response
}

fn process(
    state: &AppState,
    headers: &HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Result<Response, ApiError> {
    let body = body.map_err(|rejection| {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::PayloadTooLarge {
                limit: state.body_limit,
            }
        } else {
            ApiError::Validation(rejection.body_text())
        }
    })?;

    let reservation = match idempotency_key(headers) {
        Some(key) => match state.idempotency.claim(&key, &body_hash(&body)) {
            Claim::Fresh(reservation) => Some(reservation),
            Claim::Replay(stored) => {
                tracing::info!(
                    idempotency_key = %key,
                    message_id = %stored.message_id,
                    "replaying stored response"
                );
                return stored_response(&stored);
            }
            Claim::Conflict => {
                return Err(ApiError::IdempotencyConflict {
                    key,
                    reason: "was already used with a different request body",
                })
            }
            Claim::InFlight => {
                return Err(ApiError::IdempotencyConflict {
                    key,
                    reason: "is still being processed",
                })
            }
        },
        None => None,
    };

    let message = state.composer.compose_json(&body)?;
    let xml = message.to_xml()?;
    let message_id = message.message_id();

    state
        .relay
        .hand_off(&message_id, &xml)
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    tracing::info!(message_id = %message_id, bytes = xml.len(), "accepted update-record message");

    let status = StatusCode::ACCEPTED;
    if let Some(reservation) = reservation {
        reservation.complete(message_id.clone(), status.as_u16(), xml.clone());
    }
    xml_response(status, &message_id, xml)
}

fn stored_response(stored: &StoredResponse) -> Result<Response, ApiError> {
    let status =
        StatusCode::from_u16(stored.status).map_err(|e| ApiError::Internal(e.to_string()))?;
    xml_response(status, &stored.message_id, stored.body.clone())
}

fn xml_response(status: StatusCode, message_id: &str, body: Vec<u8>) -> Result<Response, ApiError> {
    Response::builder()
        .status(status)
        .header(CONTENT_TYPE, FHIR_XML)
        .header(HEADER_MESSAGE_ID, message_id)
        .body(Body::from(body))
        .map_err(|e| ApiError::Internal(e.to_string()))
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

fn idempotency_key(headers: &HeaderMap) -> Option<String> {
    header_str(headers, HEADER_IDEMPOTENCY_KEY).map(str::to_owned)
}

/// The caller's correlation id byte for byte, or a fresh v4 UUID when none was sent.
fn correlation_id(headers: &HeaderMap) -> Option<HeaderValue> {
    match headers.get(HEADER_CORRELATION_ID) {
        Some(value) if !value.is_empty() => Some(value.clone()),
        _ => HeaderValue::from_str(&uuid::Uuid::new_v4().to_string()).ok(),
    }
}
