use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::json;
use tracing::error;

use super::domain::{Actor, ActorRole, ExtractedAttributes, VerificationId};
use super::extractor::OcrEngine;
use super::repository::{DecisionLedger, DocumentVault};
use super::service::{VerificationError, VerificationService};
use super::strategies::{RegistrySeed, VerificationRequest};
use super::upload::UploadedDocument;

pub const ACTOR_ID_HEADER: &str = "x-actor-id";
pub const ACTOR_ROLE_HEADER: &str = "x-actor-role";
pub const FILE_NAME_HEADER: &str = "x-file-name";

// Room above the upload limit so oversized files reach the policy check and
// get a descriptive `invalid_upload` instead of a bare 413.
const BODY_LIMIT_SLACK: usize = 1024 * 1024;

type SharedService<L, E, V> = Arc<VerificationService<L, E, V>>;

/// Router builder exposing the verification endpoints.
pub fn verification_router<L, E, V>(service: SharedService<L, E, V>) -> Router
where
    L: DecisionLedger + 'static,
    E: OcrEngine + 'static,
    V: DocumentVault + 'static,
{
    let body_limit = usize::try_from(service.settings().max_upload_bytes)
        .unwrap_or(usize::MAX)
        .saturating_add(BODY_LIMIT_SLACK);

    Router::new()
        .route(
            "/api/v1/verifications/document",
            post(document_handler::<L, E, V>),
        )
        .route(
            "/api/v1/verifications/registry",
            post(registry_handler::<L, E, V>),
        )
        .route(
            "/api/v1/verifications/manual",
            post(manual_handler::<L, E, V>),
        )
        .route(
            "/api/v1/verifications/validate",
            post(validate_handler::<L, E, V>),
        )
        .route(
            "/api/v1/verifications/status",
            get(status_handler::<L, E, V>),
        )
        .route(
            "/api/v1/verifications/pending",
            get(pending_handler::<L, E, V>),
        )
        .route(
            "/api/v1/verifications/:verification_id/review",
            post(review_handler::<L, E, V>),
        )
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(service)
}

/// Caller identity as forwarded by the authentication layer in front of this router.
/// A missing role header means the least privileged role.
pub(crate) fn actor_from_headers(headers: &HeaderMap) -> Result<Actor, Response> {
    let id = headers
        .get(ACTOR_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| unauthenticated("missing caller identity"))?;

    let role = match headers.get(ACTOR_ROLE_HEADER) {
        None => ActorRole::Professional,
        Some(value) => value
            .to_str()
            .ok()
            .and_then(ActorRole::parse)
            .ok_or_else(|| unauthenticated("unrecognized caller role"))?,
    };

    Ok(Actor::new(id, role))
}

fn unauthenticated(reason: &str) -> Response {
    let payload = json!({
        "success": false,
        "error": reason,
        "kind": "unauthenticated",
        "message": "Authentication required.",
    });
    (StatusCode::UNAUTHORIZED, axum::Json(payload)).into_response()
}

/// Status code for each failure kind: caller mistakes are 4xx, store faults 500.
pub fn status_for(error: &VerificationError) -> StatusCode {
    match error {
        VerificationError::InvalidUpload(_) => StatusCode::BAD_REQUEST,
        VerificationError::Extraction(_) | VerificationError::Attributes(_) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        VerificationError::InvalidTransition(_) => StatusCode::CONFLICT,
        VerificationError::Authorization { .. } => StatusCode::FORBIDDEN,
        VerificationError::NotFound(_) => StatusCode::NOT_FOUND,
        VerificationError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn guidance(error: &VerificationError) -> &'static str {
    match error {
        VerificationError::InvalidUpload(_) => {
            "Upload a PDF, JPG, or PNG certificate within the size limit."
        }
        VerificationError::Extraction(_) => {
            "The certificate could not be read. Try a clearer scan or another verification method."
        }
        VerificationError::Attributes(_) => "Check the submitted details and try again.",
        VerificationError::InvalidTransition(_) => "This verification can no longer be changed.",
        VerificationError::Authorization { .. } => "Only administrators can review verifications.",
        VerificationError::NotFound(_) => "Verification not found.",
        VerificationError::Internal(_) => "Temporary failure. Please retry.",
    }
}

pub(crate) fn failure_response(error: &VerificationError) -> Response {
    let payload = json!({
        "success": false,
        "error": error.to_string(),
        "kind": error.kind(),
        "retryable": error.is_retryable(),
        "message": guidance(error),
    });
    (status_for(error), axum::Json(payload)).into_response()
}

fn respond<T: serde::Serialize>(
    status: StatusCode,
    outcome: Result<T, VerificationError>,
) -> Response {
    match outcome {
        Ok(body) => (status, axum::Json(body)).into_response(),
        Err(err) => failure_response(&err),
    }
}

pub(crate) async fn document_handler<L, E, V>(
    State(service): State<SharedService<L, E, V>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response
where
    L: DecisionLedger + 'static,
    E: OcrEngine + 'static,
    V: DocumentVault + 'static,
{
    let actor = match actor_from_headers(&headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };

    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string();
    let file_name = headers
        .get(FILE_NAME_HEADER)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string();
    let declared_size = headers
        .get(header::CONTENT_LENGTH)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse::<u64>().ok());

    let mut upload = UploadedDocument::new(body.to_vec(), content_type, file_name);
    if let Some(declared) = declared_size {
        upload.declared_size = declared;
    }

    // OCR shells out and can take seconds; keep it off the async workers.
    let subject = actor.subject();
    let outcome = tokio::task::spawn_blocking(move || {
        service.submit(&subject, VerificationRequest::Document(upload))
    })
    .await;

    match outcome {
        Ok(result) => respond(StatusCode::CREATED, result),
        Err(join_error) => {
            error!(error = %join_error, "document verification task aborted");
            let payload = json!({
                "success": false,
                "error": "document processing aborted",
                "kind": "internal_error",
                "retryable": true,
                "message": "Temporary failure. Please retry.",
            });
            (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response()
        }
    }
}

pub(crate) async fn registry_handler<L, E, V>(
    State(service): State<SharedService<L, E, V>>,
    headers: HeaderMap,
    axum::Json(seed): axum::Json<RegistrySeed>,
) -> Response
where
    L: DecisionLedger + 'static,
    E: OcrEngine + 'static,
    V: DocumentVault + 'static,
{
    match actor_from_headers(&headers) {
        Ok(actor) => respond(
            StatusCode::CREATED,
            service.submit(&actor.subject(), VerificationRequest::SimulatedRegistry(seed)),
        ),
        Err(response) => response,
    }
}

pub(crate) async fn manual_handler<L, E, V>(
    State(service): State<SharedService<L, E, V>>,
    headers: HeaderMap,
    axum::Json(claim): axum::Json<ExtractedAttributes>,
) -> Response
where
    L: DecisionLedger + 'static,
    E: OcrEngine + 'static,
    V: DocumentVault + 'static,
{
    match actor_from_headers(&headers) {
        Ok(actor) => respond(
            StatusCode::CREATED,
            service.submit(&actor.subject(), VerificationRequest::Manual(claim)),
        ),
        Err(response) => response,
    }
}

pub(crate) async fn validate_handler<L, E, V>(
    State(service): State<SharedService<L, E, V>>,
    headers: HeaderMap,
    axum::Json(attributes): axum::Json<ExtractedAttributes>,
) -> Response
where
    L: DecisionLedger + 'static,
    E: OcrEngine + 'static,
    V: DocumentVault + 'static,
{
    if let Err(response) = actor_from_headers(&headers) {
        return response;
    }

    match service.validate(&attributes) {
        Ok(()) => (StatusCode::OK, axum::Json(json!({ "valid": true }))).into_response(),
        Err(err) => failure_response(&err),
    }
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct StatusQuery {
    limit: Option<usize>,
}

pub(crate) async fn status_handler<L, E, V>(
    State(service): State<SharedService<L, E, V>>,
    headers: HeaderMap,
    Query(query): Query<StatusQuery>,
) -> Response
where
    L: DecisionLedger + 'static,
    E: OcrEngine + 'static,
    V: DocumentVault + 'static,
{
    match actor_from_headers(&headers) {
        Ok(actor) => respond(StatusCode::OK, service.status(&actor.subject(), query.limit)),
        Err(response) => response,
    }
}

pub(crate) async fn pending_handler<L, E, V>(
    State(service): State<SharedService<L, E, V>>,
    headers: HeaderMap,
) -> Response
where
    L: DecisionLedger + 'static,
    E: OcrEngine + 'static,
    V: DocumentVault + 'static,
{
    match actor_from_headers(&headers) {
        Ok(actor) => respond(StatusCode::OK, service.pending(&actor)),
        Err(response) => response,
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ReviewBody {
    action: String,
    #[serde(default)]
    comments: String,
}

pub(crate) async fn review_handler<L, E, V>(
    State(service): State<SharedService<L, E, V>>,
    headers: HeaderMap,
    Path(verification_id): Path<String>,
    axum::Json(body): axum::Json<ReviewBody>,
) -> Response
where
    L: DecisionLedger + 'static,
    E: OcrEngine + 'static,
    V: DocumentVault + 'static,
{
    let actor = match actor_from_headers(&headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };

    let id = VerificationId(verification_id);
    respond(
        StatusCode::OK,
        service.review(&actor, &id, &body.action, &body.comments),
    )
}
