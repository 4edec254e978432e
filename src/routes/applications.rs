use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use validator::Validate;

use crate::{
    dto::application_dto::{
        ApplyPayload, BulkUpdatePayload, BulkUpdateResponse, CountResponse, ListForJobQuery,
        MessageResponse, ScheduleInterviewPayload, UpdateStatusPayload,
    },
    error::{Error, Result},
    models::user::{Actor, Role},
    routes::extract::{ApiJson, ApiPath, ApiQuery},
    utils::validation::{normalize_ids, require_id},
    AppState,
};

#[utoipa::path(
    post,
    path = "/api/applications",
    request_body = ApplyPayload,
    responses(
        (status = 201, description = "Application submitted", body = crate::models::application::Application),
        (status = 400, description = "Missing job or deadline passed"),
        (status = 404, description = "Job not found"),
        (status = 409, description = "Already applied")
    ),
    security(("bearer" = []))
)]
#[axum::debug_handler]
pub async fn apply(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    ApiJson(payload): ApiJson<ApplyPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let application = state
        .application_service
        .apply(&actor, payload.job_id.unwrap_or_default())
        .await?;
    Ok((StatusCode::CREATED, Json(application)))
}

#[utoipa::path(
    get,
    path = "/api/applications",
    params(ListForJobQuery),
    responses(
        (status = 200, description = "Applications for the job", body = [crate::models::application::ApplicationDetails]),
        (status = 403, description = "Not your job"),
        (status = 404, description = "Job not found")
    ),
    security(("bearer" = []))
)]
#[axum::debug_handler]
pub async fn list_for_job(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    ApiQuery(query): ApiQuery<ListForJobQuery>,
) -> Result<impl IntoResponse> {
    let items = state
        .application_service
        .list_for_job(&actor, query.job_id.unwrap_or_default())
        .await?;
    Ok(Json(items))
}

#[utoipa::path(
    get,
    path = "/api/applications/my",
    responses(
        (status = 200, description = "The student's applications", body = [crate::models::application::ApplicationDetails])
    ),
    security(("bearer" = []))
)]
#[axum::debug_handler]
pub async fn list_mine(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
) -> Result<impl IntoResponse> {
    let items = state.application_service.list_mine(&actor).await?;
    Ok(Json(items))
}

#[utoipa::path(
    get,
    path = "/api/applications/employer/my",
    responses(
        (status = 200, description = "Applications on the employer's jobs", body = [crate::models::application::ApplicationDetails])
    ),
    security(("bearer" = []))
)]
#[axum::debug_handler]
pub async fn list_for_employer(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
) -> Result<impl IntoResponse> {
    let items = state.application_service.list_for_employer(&actor).await?;
    Ok(Json(items))
}

#[utoipa::path(
    get,
    path = "/api/applications/employer/interviews",
    responses(
        (status = 200, description = "Scheduled interviews, soonest first", body = [crate::models::application::ApplicationDetails])
    ),
    security(("bearer" = []))
)]
#[axum::debug_handler]
pub async fn list_interviews(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
) -> Result<impl IntoResponse> {
    let items = state.application_service.list_interviews(&actor).await?;
    Ok(Json(items))
}

#[utoipa::path(
    get,
    path = "/api/applications/employer/funnel",
    responses(
        (status = 200, description = "Hiring funnel counts", body = crate::services::application_service::FunnelStats)
    ),
    security(("bearer" = []))
)]
#[axum::debug_handler]
pub async fn funnel(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
) -> Result<impl IntoResponse> {
    let stats = state.application_service.funnel(&actor).await?;
    Ok(Json(stats))
}

#[utoipa::path(
    get,
    path = "/api/applications/employer/interviews/upcoming/count",
    responses(
        (status = 200, description = "Upcoming interviews on the employer's jobs", body = CountResponse),
        (status = 403, description = "Employer role required")
    ),
    security(("bearer" = []))
)]
#[axum::debug_handler]
pub async fn employer_upcoming_count(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
) -> Result<impl IntoResponse> {
    actor.require_role(Role::Employer)?;
    let count = state
        .application_service
        .upcoming_interviews_count(&actor)
        .await?;
    Ok(Json(CountResponse { count }))
}

#[utoipa::path(
    get,
    path = "/api/applications/my/interviews/upcoming/count",
    responses(
        (status = 200, description = "The student's upcoming interviews", body = CountResponse),
        (status = 403, description = "Student role required")
    ),
    security(("bearer" = []))
)]
#[axum::debug_handler]
pub async fn student_upcoming_count(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
) -> Result<impl IntoResponse> {
    actor.require_role(Role::Student)?;
    let count = state
        .application_service
        .upcoming_interviews_count(&actor)
        .await?;
    Ok(Json(CountResponse { count }))
}

#[utoipa::path(
    patch,
    path = "/api/applications/bulk",
    request_body = BulkUpdatePayload,
    responses(
        (status = 200, description = "Applications updated", body = BulkUpdateResponse),
        (status = 400, description = "No applications selected or bad status"),
        (status = 403, description = "Some applications do not belong to the employer")
    ),
    security(("bearer" = []))
)]
#[axum::debug_handler]
pub async fn bulk_update_status(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    ApiJson(payload): ApiJson<BulkUpdatePayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    if payload.application_ids.is_empty() {
        return Err(Error::BadRequest("No applications selected".into()));
    }
    let status = payload.status()?;
    let ids = normalize_ids(&payload.application_ids);

    let count = state
        .application_service
        .bulk_update_status(&actor, &ids, status)
        .await?;
    Ok(Json(BulkUpdateResponse {
        message: format!("Updated {} application(s)", count),
        count,
    }))
}

#[utoipa::path(
    delete,
    path = "/api/applications/{id}",
    params(("id" = i32, Path, description = "Application ID")),
    responses(
        (status = 200, description = "Application withdrawn", body = MessageResponse),
        (status = 400, description = "Status no longer allows withdrawal"),
        (status = 403, description = "Not your application"),
        (status = 404, description = "Application not found")
    ),
    security(("bearer" = []))
)]
#[axum::debug_handler]
pub async fn withdraw(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    ApiPath(id): ApiPath<i32>,
) -> Result<impl IntoResponse> {
    let id = require_id(id, "application")?;
    state.application_service.withdraw(&actor, id).await?;
    Ok(Json(MessageResponse {
        message: "Application withdrawn successfully".into(),
    }))
}

#[utoipa::path(
    patch,
    path = "/api/applications/{id}",
    params(("id" = i32, Path, description = "Application ID")),
    request_body = UpdateStatusPayload,
    responses(
        (status = 200, description = "Status updated", body = crate::models::application::Application),
        (status = 400, description = "Missing or unknown status, bad date"),
        (status = 403, description = "Not your application"),
        (status = 404, description = "Application not found")
    ),
    security(("bearer" = []))
)]
#[axum::debug_handler]
pub async fn update_status(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    ApiPath(id): ApiPath<i32>,
    ApiJson(payload): ApiJson<UpdateStatusPayload>,
) -> Result<impl IntoResponse> {
    let id = require_id(id, "application")?;
    payload.validate()?;
    let status = payload.status()?;
    let interview_date = payload.interview_date()?;

    let application = state
        .application_service
        .update_status(&actor, id, status, interview_date)
        .await?;
    Ok(Json(application))
}

#[utoipa::path(
    patch,
    path = "/api/applications/{id}/interview",
    params(("id" = i32, Path, description = "Application ID")),
    request_body = ScheduleInterviewPayload,
    responses(
        (status = 200, description = "Interview scheduled", body = crate::models::application::Application),
        (status = 400, description = "Invalid interview date"),
        (status = 403, description = "Not your application"),
        (status = 404, description = "Application not found")
    ),
    security(("bearer" = []))
)]
#[axum::debug_handler]
pub async fn schedule_interview(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    ApiPath(id): ApiPath<i32>,
    ApiJson(payload): ApiJson<ScheduleInterviewPayload>,
) -> Result<impl IntoResponse> {
    let id = require_id(id, "application")?;
    payload.validate()?;
    let interview_date = payload.interview_date()?;

    let application = state
        .application_service
        .schedule_interview(&actor, id, interview_date)
        .await?;
    Ok(Json(application))
}

#[utoipa::path(
    patch,
    path = "/api/applications/{id}/interview/cancel",
    params(("id" = i32, Path, description = "Application ID")),
    responses(
        (status = 200, description = "Interview cancelled", body = crate::models::application::Application),
        (status = 404, description = "Application not found")
    ),
    security(("bearer" = []))
)]
#[axum::debug_handler]
pub async fn cancel_interview(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    ApiPath(id): ApiPath<i32>,
) -> Result<impl IntoResponse> {
    let id = require_id(id, "application")?;
    let application = state.application_service.cancel_interview(&actor, id).await?;
    Ok(Json(application))
}

#[utoipa::path(
    patch,
    path = "/api/applications/{id}/offer",
    params(("id" = i32, Path, description = "Application ID")),
    responses(
        (status = 200, description = "Offer sent", body = crate::models::application::Application),
        (status = 403, description = "Not your application"),
        (status = 404, description = "Application not found")
    ),
    security(("bearer" = []))
)]
#[axum::debug_handler]
pub async fn send_offer(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    ApiPath(id): ApiPath<i32>,
) -> Result<impl IntoResponse> {
    let id = require_id(id, "application")?;
    let application = state.application_service.send_offer(&actor, id).await?;
    Ok(Json(application))
}

#[utoipa::path(
    get,
    path = "/api/applications/{id}/logs",
    params(("id" = i32, Path, description = "Application ID")),
    responses(
        (status = 200, description = "Audit trail, newest first", body = [crate::models::application::ApplicationLog]),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Application not found")
    ),
    security(("bearer" = []))
)]
#[axum::debug_handler]
pub async fn get_logs(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    ApiPath(id): ApiPath<i32>,
) -> Result<impl IntoResponse> {
    let id = require_id(id, "application")?;
    let logs = state.application_service.get_logs(&actor, id).await?;
    Ok(Json(logs))
}
