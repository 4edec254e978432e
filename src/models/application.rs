use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use crate::models::job::Job;
use crate::models::user::StudentSummary;

/// Lifecycle stage of an application.
///
/// `APPLIED -> IN_REVIEW -> INTERVIEW -> OFFERED | REJECTED`, with
/// `INTERVIEW -> APPLIED` when a student cancels the interview.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "application_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApplicationStatus {
    Applied,
    InReview,
    Interview,
    Offered,
    Rejected,
}

impl ApplicationStatus {
    pub const ALL: [ApplicationStatus; 5] = [
        ApplicationStatus::Applied,
        ApplicationStatus::InReview,
        ApplicationStatus::Interview,
        ApplicationStatus::Offered,
        ApplicationStatus::Rejected,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ApplicationStatus::Applied => "APPLIED",
            ApplicationStatus::InReview => "IN_REVIEW",
            ApplicationStatus::Interview => "INTERVIEW",
            ApplicationStatus::Offered => "OFFERED",
            ApplicationStatus::Rejected => "REJECTED",
        }
    }

    /// A student may delete their own application only from these states.
    pub const WITHDRAWABLE: [ApplicationStatus; 2] =
        [ApplicationStatus::Applied, ApplicationStatus::InReview];

    pub fn is_withdrawable(&self) -> bool {
        Self::WITHDRAWABLE.contains(self)
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown application status: {0}")]
pub struct UnknownStatus(pub String);

impl FromStr for ApplicationStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        ApplicationStatus::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| UnknownStatus(trimmed.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Application {
    pub id: i32,
    pub job_id: i32,
    pub student_id: i32,
    pub status: ApplicationStatus,
    pub interview_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// An application together with the employer that owns its job.
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct OwnedApplication {
    #[sqlx(flatten)]
    pub application: Application,
    pub employer_id: i32,
}

/// Listing row: the application joined with its job and, for employer
/// views, the applicant's profile summary.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationDetails {
    #[serde(flatten)]
    pub application: Application,
    pub job: Job,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub student: Option<StudentSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationLog {
    pub id: i32,
    pub application_id: i32,
    pub status: ApplicationStatus,
    pub changed_by: i32,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Audit entry to append alongside a mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub status: ApplicationStatus,
    pub changed_by: i32,
    pub notes: String,
}

impl LogEntry {
    pub fn new(status: ApplicationStatus, changed_by: i32, notes: impl Into<String>) -> Self {
        Self {
            status,
            changed_by,
            notes: notes.into(),
        }
    }

    /// Entry for one row of a bulk status change.
    pub fn bulk_change(from: ApplicationStatus, to: ApplicationStatus, changed_by: i32) -> Self {
        Self::new(
            to,
            changed_by,
            format!("Bulk status update from {} to {}", from, to),
        )
    }
}
