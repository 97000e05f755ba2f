//! Attendant endpoints: live subscription, check-in, roster admin.

use std::convert::Infallible;

use axum::extract::{Multipart, Path, State};
use axum::http::{StatusCode, header};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::IntoResponse;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use futures_util::Stream;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::ReceiverStream;
use uuid::Uuid;

use crate::api::auth::{AuthUser, require_event_staff};
use crate::api::dto::{
    AddParticipantsRequest, MessageResponse, RemoveParticipantsRequest, RemovedResponse,
};
use crate::app_state::AppState;
use crate::error::{ErrorResponse, GatewayError};

/// `GET /attendants/subscribe/:event_id` — Live check-in stream.
///
/// Emits an `INIT` frame on connect, then one `participant-checked-in`
/// frame per successful check-in for the event. No history: frames
/// published before the subscription are never replayed.
#[utoipa::path(
    get,
    path = "/api/v1/attendants/subscribe/{event_id}",
    tag = "Attendants",
    summary = "Subscribe to live check-in notifications",
    description = "Server-sent event stream for one event. Opens with an INIT frame, then pushes a participant-checked-in frame with the updated participant view after every successful check-in.",
    params(
        ("event_id" = uuid::Uuid, Path, description = "Event UUID"),
    ),
    responses(
        (status = 200, description = "SSE stream established", content_type = "text/event-stream"),
    )
)]
pub async fn subscribe(
    State(state): State<AppState>,
    Path(event_id): Path<Uuid>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    tracing::debug!(%event_id, "live subscriber connected");
    let rx = state.hub.subscribe(event_id).await;
    let stream = ReceiverStream::new(rx).map(|frame| Ok(frame.into_sse_event()));
    Sse::new(stream).keep_alive(KeepAlive::default())
}

/// `GET /attendants/:event_id` — List the event's participants.
///
/// # Errors
///
/// Returns [`GatewayError`] when the caller lacks a staff role or the
/// roster cannot be loaded.
#[utoipa::path(
    get,
    path = "/api/v1/attendants/{event_id}",
    tag = "Attendants",
    summary = "List participants",
    description = "Returns every participant of the event with the embedded user summary and check-in timestamp. Requires a per-event staff role or global admin.",
    params(
        ("event_id" = uuid::Uuid, Path, description = "Event UUID"),
    ),
    responses(
        (status = 200, description = "Participant list", body = Vec<crate::domain::ParticipantView>),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 403, description = "No staff role for this event", body = ErrorResponse),
    )
)]
pub async fn list_participants(
    State(state): State<AppState>,
    Path(event_id): Path<Uuid>,
    auth: AuthUser,
) -> Result<impl IntoResponse, GatewayError> {
    require_event_staff(&state, &auth, event_id).await?;
    let views = state.roster_service.list_participants(event_id).await?;
    Ok(Json(views))
}

/// `POST /attendants/check-in/:join_token` — Check the caller in.
///
/// # Errors
///
/// Returns [`GatewayError`] when the token or registration is unknown or
/// the caller already checked in.
#[utoipa::path(
    post,
    path = "/api/v1/attendants/check-in/{join_token}",
    tag = "Attendants",
    summary = "Check in with a join token",
    description = "Marks the authenticated caller as present at the event identified by the join token. Idempotency is rejected, not silent: a second attempt returns 409.",
    params(
        ("join_token" = String, Path, description = "Opaque event join token"),
    ),
    responses(
        (status = 200, description = "Checked in; updated participant view", body = crate::domain::ParticipantView),
        (status = 404, description = "Unknown token, user, or registration", body = ErrorResponse),
        (status = 409, description = "Already checked in", body = ErrorResponse),
    )
)]
pub async fn check_in(
    State(state): State<AppState>,
    Path(join_token): Path<String>,
    auth: AuthUser,
) -> Result<impl IntoResponse, GatewayError> {
    let view = state
        .check_in_service
        .check_in(&join_token, &auth.email)
        .await?;
    Ok(Json(view))
}

/// `GET /attendants/get-qr-check/:event_id` — Check-in QR image.
///
/// # Errors
///
/// Returns [`GatewayError`] when the event is unknown or rendering fails.
#[utoipa::path(
    get,
    path = "/api/v1/attendants/get-qr-check/{event_id}",
    tag = "Attendants",
    summary = "Render the check-in QR code",
    description = "Returns a PNG QR code encoding the event's check-in URL. Requires a per-event staff role or global admin.",
    params(
        ("event_id" = uuid::Uuid, Path, description = "Event UUID"),
    ),
    responses(
        (status = 200, description = "PNG image", content_type = "image/png"),
        (status = 404, description = "Event not found", body = ErrorResponse),
    )
)]
pub async fn check_in_qr(
    State(state): State<AppState>,
    Path(event_id): Path<Uuid>,
    auth: AuthUser,
) -> Result<impl IntoResponse, GatewayError> {
    require_event_staff(&state, &auth, event_id).await?;
    let png = state.roster_service.check_in_qr(event_id).await?;
    Ok(([(header::CONTENT_TYPE, "image/png")], png))
}

/// `POST /attendants/:event_id` — Bulk-add participants by email.
///
/// # Errors
///
/// Returns [`GatewayError`] on unknown emails, a closed event, or a
/// batch that would exceed capacity.
#[utoipa::path(
    post,
    path = "/api/v1/attendants/{event_id}",
    tag = "Attendants",
    summary = "Add participants",
    description = "Admits the listed emails to the roster. All-or-nothing: one unknown email, a started or cancelled event, or a capacity overflow rejects the whole batch. Requires a per-event staff role or global admin.",
    params(
        ("event_id" = uuid::Uuid, Path, description = "Event UUID"),
    ),
    request_body = AddParticipantsRequest,
    responses(
        (status = 201, description = "Newly admitted participants", body = Vec<crate::domain::ParticipantView>),
        (status = 404, description = "Event or email not found", body = ErrorResponse),
        (status = 409, description = "Event closed or capacity exceeded", body = ErrorResponse),
    )
)]
pub async fn add_participants(
    State(state): State<AppState>,
    Path(event_id): Path<Uuid>,
    auth: AuthUser,
    Json(req): Json<AddParticipantsRequest>,
) -> Result<impl IntoResponse, GatewayError> {
    require_event_staff(&state, &auth, event_id).await?;
    let views = state
        .roster_service
        .add_participants(event_id, &req.emails, &auth.email)
        .await?;
    Ok((StatusCode::CREATED, Json(views)))
}

/// `POST /attendants/import/:event_id` — Import participants from a file.
///
/// # Errors
///
/// Returns [`GatewayError`] on a missing or unreadable file part, a
/// closed event, or a capacity overflow.
#[utoipa::path(
    post,
    path = "/api/v1/attendants/import/{event_id}",
    tag = "Attendants",
    summary = "Import participants from a roster file",
    description = "Accepts a multipart upload of a delimited text file of emails. Malformed, unknown, and already-registered entries are counted and skipped; the response summarizes the outcome. Requires a per-event staff role or global admin.",
    params(
        ("event_id" = uuid::Uuid, Path, description = "Event UUID"),
    ),
    responses(
        (status = 200, description = "Import summary", body = crate::domain::ImportSummary),
        (status = 400, description = "Missing or unreadable file", body = ErrorResponse),
        (status = 409, description = "Event closed or capacity exceeded", body = ErrorResponse),
    )
)]
pub async fn import_participants(
    State(state): State<AppState>,
    Path(event_id): Path<Uuid>,
    auth: AuthUser,
    multipart: Multipart,
) -> Result<impl IntoResponse, GatewayError> {
    require_event_staff(&state, &auth, event_id).await?;
    let file = read_file_part(multipart).await?;
    let summary = state
        .roster_service
        .import_participants(event_id, &file, &auth.email)
        .await?;
    Ok(Json(summary))
}

/// `DELETE /attendants/:event_id/:user_id` — Remove one participant.
///
/// # Errors
///
/// Returns [`GatewayError::RegistrationNotFound`] when no such row
/// exists.
#[utoipa::path(
    delete,
    path = "/api/v1/attendants/{event_id}/{user_id}",
    tag = "Attendants",
    summary = "Remove one participant",
    description = "Deletes a single roster row. Requires a per-event staff role or global admin; no role hierarchy applies on this path.",
    params(
        ("event_id" = uuid::Uuid, Path, description = "Event UUID"),
        ("user_id" = uuid::Uuid, Path, description = "User UUID"),
    ),
    responses(
        (status = 200, description = "Participant removed", body = MessageResponse),
        (status = 404, description = "Participant not found", body = ErrorResponse),
    )
)]
pub async fn delete_participant(
    State(state): State<AppState>,
    Path((event_id, user_id)): Path<(Uuid, Uuid)>,
    auth: AuthUser,
) -> Result<impl IntoResponse, GatewayError> {
    require_event_staff(&state, &auth, event_id).await?;
    state
        .roster_service
        .delete_participant(event_id, user_id)
        .await?;
    Ok(Json(MessageResponse {
        message: "participant removed from the event".to_string(),
    }))
}

/// `DELETE /attendants/:event_id` — Bulk-remove participants by email.
///
/// # Errors
///
/// Returns [`GatewayError`] when the caller lacks a staff role or the
/// deletion fails.
#[utoipa::path(
    delete,
    path = "/api/v1/attendants/{event_id}",
    tag = "Attendants",
    summary = "Bulk-remove participants",
    description = "Removes the listed emails from the roster, filtered by the role hierarchy: managers cannot remove other managers, staff can remove only ordinary participants. Filtered and unresolvable targets are skipped silently.",
    params(
        ("event_id" = uuid::Uuid, Path, description = "Event UUID"),
    ),
    request_body = RemoveParticipantsRequest,
    responses(
        (status = 200, description = "Number of rows removed", body = RemovedResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
    )
)]
pub async fn remove_participants_bulk(
    State(state): State<AppState>,
    Path(event_id): Path<Uuid>,
    auth: AuthUser,
    Json(req): Json<RemoveParticipantsRequest>,
) -> Result<impl IntoResponse, GatewayError> {
    require_event_staff(&state, &auth, event_id).await?;
    let removed = state
        .roster_service
        .remove_participants_bulk(event_id, &req.emails, &auth.email)
        .await?;
    Ok(Json(RemovedResponse { removed }))
}

/// `DELETE /attendants/my-registration/:event_id` — Cancel own
/// registration.
///
/// # Errors
///
/// Returns [`GatewayError::NotUpcoming`] outside the upcoming window and
/// [`GatewayError::RegistrationNotFound`] when the caller never joined.
#[utoipa::path(
    delete,
    path = "/api/v1/attendants/my-registration/{event_id}",
    tag = "Attendants",
    summary = "Cancel own registration",
    description = "Deletes the caller's own roster row. Allowed only while the event has not started and is not cancelled.",
    params(
        ("event_id" = uuid::Uuid, Path, description = "Event UUID"),
    ),
    responses(
        (status = 200, description = "Registration cancelled", body = MessageResponse),
        (status = 404, description = "Registration not found", body = ErrorResponse),
        (status = 409, description = "Event no longer upcoming", body = ErrorResponse),
    )
)]
pub async fn cancel_my_registration(
    State(state): State<AppState>,
    Path(event_id): Path<Uuid>,
    auth: AuthUser,
) -> Result<impl IntoResponse, GatewayError> {
    state
        .roster_service
        .cancel_my_registration(event_id, &auth.email)
        .await?;
    Ok(Json(MessageResponse {
        message: "your registration has been cancelled".to_string(),
    }))
}

/// Attendant routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/attendants/subscribe/{event_id}", get(subscribe))
        .route("/attendants/check-in/{join_token}", post(check_in))
        .route("/attendants/get-qr-check/{event_id}", get(check_in_qr))
        .route("/attendants/import/{event_id}", post(import_participants))
        .route(
            "/attendants/my-registration/{event_id}",
            delete(cancel_my_registration),
        )
        .route(
            "/attendants/{event_id}",
            get(list_participants)
                .post(add_participants)
                .delete(remove_participants_bulk),
        )
        .route(
            "/attendants/{event_id}/{user_id}",
            delete(delete_participant),
        )
}

/// Pulls the uploaded roster file out of the multipart body. Prefers the
/// part named `file`, falls back to the first part present.
async fn read_file_part(mut multipart: Multipart) -> Result<Vec<u8>, GatewayError> {
    let mut fallback: Option<Vec<u8>> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| GatewayError::InvalidRequest(format!("malformed multipart body: {e}")))?
    {
        let is_file_part = field.name() == Some("file");
        let bytes = field
            .bytes()
            .await
            .map_err(|e| GatewayError::InvalidRequest(format!("unreadable file part: {e}")))?
            .to_vec();
        if is_file_part {
            return Ok(bytes);
        }
        fallback.get_or_insert(bytes);
    }
    fallback.ok_or_else(|| GatewayError::InvalidRequest("missing file part".to_string()))
}
