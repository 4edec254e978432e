use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::error::{Error, Result};
use crate::models::application::ApplicationStatus;
use crate::utils::time;

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApplyPayload {
    #[validate(range(min = 1, message = "jobId is required"))]
    pub job_id: Option<i32>,
}

#[derive(Debug, Clone, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ListForJobQuery {
    pub job_id: Option<i32>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStatusPayload {
    #[schema(example = "IN_REVIEW")]
    pub status: Option<String>,
    #[schema(example = "2026-11-02T10:00:00.000Z")]
    pub interview_date: Option<String>,
}

impl UpdateStatusPayload {
    pub fn status(&self) -> Result<ApplicationStatus> {
        parse_status(self.status.as_deref())
    }

    pub fn interview_date(&self) -> Result<Option<DateTime<Utc>>> {
        match self.interview_date.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(raw) => time::parse_timestamp(raw)
                .map(Some)
                .ok_or_else(|| Error::BadRequest("Invalid interview date".to_string())),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleInterviewPayload {
    #[validate(length(min = 1, message = "Invalid interview date"))]
    pub interview_date: Option<String>,
}

impl ScheduleInterviewPayload {
    pub fn interview_date(&self) -> Result<DateTime<Utc>> {
        self.interview_date
            .as_deref()
            .and_then(time::parse_timestamp)
            .ok_or_else(|| Error::BadRequest("Invalid interview date".to_string()))
    }
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BulkUpdatePayload {
    #[serde(default, alias = "ids")]
    pub application_ids: Vec<i64>,
    #[schema(example = "REJECTED")]
    pub status: Option<String>,
}

impl BulkUpdatePayload {
    pub fn status(&self) -> Result<ApplicationStatus> {
        parse_status(self.status.as_deref())
    }
}

fn parse_status(raw: Option<&str>) -> Result<ApplicationStatus> {
    let raw = raw
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| Error::BadRequest("status is required".to_string()))?;
    raw.parse::<ApplicationStatus>()
        .map_err(|e| Error::BadRequest(e.to_string()))
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BulkUpdateResponse {
    pub message: String,
    pub count: u64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CountResponse {
    pub count: i64,
}
