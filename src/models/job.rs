use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

/// Job posting. Owned and edited elsewhere; read here for ownership and
/// deadline checks and joined into application listings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: i32,
    pub employer_id: i32,
    pub title: String,
    pub location: Option<String>,
    #[serde(rename = "type")]
    pub job_type: Option<String>,
    pub work_mode: Option<String>,
    pub application_deadline: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Job {
    pub fn is_owned_by(&self, employer_id: i32) -> bool {
        self.employer_id == employer_id
    }

    /// Open when there is no deadline or the deadline has not passed yet.
    pub fn accepts_applications_at(&self, now: DateTime<Utc>) -> bool {
        match self.application_deadline {
            Some(deadline) => deadline >= now,
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn job(deadline: Option<DateTime<Utc>>) -> Job {
        Job {
            id: 1,
            employer_id: 7,
            title: "Backend intern".into(),
            location: None,
            job_type: None,
            work_mode: None,
            application_deadline: deadline,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn open_without_deadline() {
        assert!(job(None).accepts_applications_at(Utc::now()));
    }

    #[test]
    fn closed_after_deadline() {
        let now = Utc::now();
        assert!(!job(Some(now - Duration::hours(1))).accepts_applications_at(now));
        assert!(job(Some(now + Duration::hours(1))).accepts_applications_at(now));
    }
}
