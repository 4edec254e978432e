use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use validator::Validate;

use crate::{
    dto::invitation_dto::CreateInvitationPayload,
    error::Result,
    models::user::Actor,
    routes::extract::ApiJson,
    AppState,
};

#[utoipa::path(
    post,
    path = "/api/invitations",
    request_body = CreateInvitationPayload,
    responses(
        (status = 201, description = "Invitation created", body = crate::models::invitation::Invitation),
        (status = 400, description = "Missing student or target is not a student"),
        (status = 403, description = "Not your job"),
        (status = 404, description = "Student or job not found")
    ),
    security(("bearer" = []))
)]
#[axum::debug_handler]
pub async fn create_invitation(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    ApiJson(payload): ApiJson<CreateInvitationPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let invitation = state
        .invitation_service
        .create(&actor, payload.student_id.unwrap_or_default(), payload.job_id)
        .await?;
    Ok((StatusCode::CREATED, Json(invitation)))
}

#[utoipa::path(
    get,
    path = "/api/invitations/my",
    responses(
        (status = 200, description = "The student's invitations, newest first", body = [crate::models::invitation::InvitationDetails])
    ),
    security(("bearer" = []))
)]
#[axum::debug_handler]
pub async fn list_my_invitations(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
) -> Result<impl IntoResponse> {
    let items = state.invitation_service.list_mine(&actor).await?;
    Ok(Json(items))
}
