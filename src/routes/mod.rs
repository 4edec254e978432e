pub mod applications;
pub mod docs;
pub mod extract;
pub mod health;
pub mod invitations;

use axum::{
    routing::{get, patch, post},
    Router,
};

use crate::middleware::{auth::require_auth, rate_limit};
use crate::AppState;

/// Every endpoint, authenticated where needed and behind the shared
/// requests-per-second limiter.
pub fn router(state: AppState, rps: u32) -> Router {
    let base_routes = Router::new()
        .route("/health", get(health::health))
        .route("/api-docs/openapi.json", get(docs::openapi_json));

    let application_api = Router::new()
        .route(
            "/api/applications",
            get(applications::list_for_job).post(applications::apply),
        )
        .route("/api/applications/my", get(applications::list_mine))
        .route(
            "/api/applications/my/interviews/upcoming/count",
            get(applications::student_upcoming_count),
        )
        .route(
            "/api/applications/employer/my",
            get(applications::list_for_employer),
        )
        .route(
            "/api/applications/employer/interviews",
            get(applications::list_interviews),
        )
        .route(
            "/api/applications/employer/interviews/upcoming/count",
            get(applications::employer_upcoming_count),
        )
        .route(
            "/api/applications/employer/funnel",
            get(applications::funnel),
        )
        .route(
            "/api/applications/bulk",
            patch(applications::bulk_update_status),
        )
        .route(
            "/api/applications/:id",
            patch(applications::update_status).delete(applications::withdraw),
        )
        .route(
            "/api/applications/:id/interview",
            patch(applications::schedule_interview),
        )
        .route(
            "/api/applications/:id/interview/cancel",
            patch(applications::cancel_interview),
        )
        .route(
            "/api/applications/:id/offer",
            patch(applications::send_offer),
        )
        .route("/api/applications/:id/logs", get(applications::get_logs));

    let invitation_api = Router::new()
        .route("/api/invitations", post(invitations::create_invitation))
        .route("/api/invitations/my", get(invitations::list_my_invitations));

    let protected = application_api
        .merge(invitation_api)
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            require_auth,
        ));

    base_routes
        .merge(protected)
        .layer(axum::middleware::from_fn_with_state(
            rate_limit::new_rps_state(rps),
            rate_limit::rps_middleware,
        ))
        .with_state(state)
}
