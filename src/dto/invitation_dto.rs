use serde::Deserialize;
use utoipa::ToSchema;
use validator::Validate;

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateInvitationPayload {
    #[validate(range(min = 1, message = "studentId required"))]
    pub student_id: Option<i32>,
    #[validate(range(min = 1, message = "Invalid job id"))]
    pub job_id: Option<i32>,
}
