use axum::{response::IntoResponse, Json};
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};

use crate::dto::application_dto::{
    ApplyPayload, BulkUpdatePayload, BulkUpdateResponse, CountResponse, MessageResponse,
    ScheduleInterviewPayload, UpdateStatusPayload,
};
use crate::dto::invitation_dto::CreateInvitationPayload;
use crate::models::application::{Application, ApplicationDetails, ApplicationLog, ApplicationStatus};
use crate::models::invitation::{Invitation, InvitationDetails};
use crate::models::job::Job;
use crate::models::user::{EmployerSummary, Role, StudentSummary};
use crate::routes::{applications, health, invitations};
use crate::services::application_service::FunnelStats;

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health,
        applications::apply,
        applications::list_for_job,
        applications::list_mine,
        applications::list_for_employer,
        applications::list_interviews,
        applications::funnel,
        applications::employer_upcoming_count,
        applications::student_upcoming_count,
        applications::bulk_update_status,
        applications::withdraw,
        applications::update_status,
        applications::schedule_interview,
        applications::cancel_interview,
        applications::send_offer,
        applications::get_logs,
        invitations::create_invitation,
        invitations::list_my_invitations,
    ),
    components(schemas(
        Application,
        ApplicationDetails,
        ApplicationLog,
        ApplicationStatus,
        Job,
        Role,
        StudentSummary,
        EmployerSummary,
        Invitation,
        InvitationDetails,
        FunnelStats,
        ApplyPayload,
        UpdateStatusPayload,
        ScheduleInterviewPayload,
        BulkUpdatePayload,
        BulkUpdateResponse,
        CountResponse,
        MessageResponse,
        CreateInvitationPayload,
    )),
    modifiers(&BearerAuth),
    tags((name = "applications", description = "Application lifecycle"))
)]
pub struct ApiDoc;

pub async fn openapi_json() -> impl IntoResponse {
    Json(ApiDoc::openapi())
}
