//! REST API layer: route handlers, DTOs, auth boundary, and router
//! composition.
//!
//! All attendant endpoints are mounted under `/api/v1`.

pub mod auth;
pub mod dto;
pub mod handlers;

use axum::Router;
use utoipa::OpenApi;

use crate::app_state::AppState;

/// OpenAPI document covering every REST endpoint.
#[derive(Debug, OpenApi)]
#[openapi(
    info(
        title = "attendance-gateway",
        description = "Live event-attendance gateway: QR check-in, roster administration, and real-time check-in notifications."
    ),
    paths(
        handlers::attendants::subscribe,
        handlers::attendants::list_participants,
        handlers::attendants::check_in,
        handlers::attendants::check_in_qr,
        handlers::attendants::add_participants,
        handlers::attendants::import_participants,
        handlers::attendants::delete_participant,
        handlers::attendants::remove_participants_bulk,
        handlers::attendants::cancel_my_registration,
        handlers::system::health_handler,
    ),
    components(schemas(
        crate::domain::ParticipantView,
        crate::domain::UserRecord,
        crate::domain::UnitSummary,
        crate::domain::ImportSummary,
        dto::AddParticipantsRequest,
        dto::RemoveParticipantsRequest,
        dto::RemovedResponse,
        dto::MessageResponse,
    ))
)]
pub struct ApiDoc;

/// Builds the complete API router with all REST endpoints.
pub fn build_router() -> Router<AppState> {
    let router = Router::new()
        .nest("/api/v1", handlers::routes())
        .merge(handlers::system::routes());

    #[cfg(feature = "swagger-ui")]
    let router = router.merge(
        utoipa_swagger_ui::SwaggerUi::new("/swagger-ui")
            .url("/api-docs/openapi.json", ApiDoc::openapi()),
    );

    router
}
