use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::models::application::{
    Application, ApplicationDetails, ApplicationLog, ApplicationStatus, LogEntry, OwnedApplication,
};
use crate::models::invitation::{Invitation, InvitationDetails, NewInvitation};
use crate::models::job::Job;
use crate::models::user::User;

/// Row predicate for application listings and counts. All set fields are
/// combined with AND.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ApplicationFilter {
    pub job_id: Option<i32>,
    pub student_id: Option<i32>,
    /// Owner of the application's job.
    pub employer_id: Option<i32>,
    pub statuses: Option<Vec<ApplicationStatus>>,
    /// `status = INTERVIEW OR interview_date IS NOT NULL`.
    pub interviewing: bool,
    pub has_interview_date: bool,
    pub interview_from: Option<DateTime<Utc>>,
}

impl ApplicationFilter {
    pub fn for_job(job_id: i32) -> Self {
        Self {
            job_id: Some(job_id),
            ..Default::default()
        }
    }

    pub fn for_student(student_id: i32) -> Self {
        Self {
            student_id: Some(student_id),
            ..Default::default()
        }
    }

    pub fn for_employer(employer_id: i32) -> Self {
        Self {
            employer_id: Some(employer_id),
            ..Default::default()
        }
    }

    pub fn with_statuses(mut self, statuses: &[ApplicationStatus]) -> Self {
        self.statuses = Some(statuses.to_vec());
        self
    }

    pub fn interviewing(mut self) -> Self {
        self.interviewing = true;
        self
    }

    pub fn with_interview_date(mut self) -> Self {
        self.has_interview_date = true;
        self
    }

    pub fn interview_from(mut self, from: DateTime<Utc>) -> Self {
        self.interview_from = Some(from);
        self
    }

    /// In-process evaluation, mirroring the SQL built by the Postgres store.
    pub fn matches(&self, app: &Application, employer_id: i32) -> bool {
        if self.job_id.is_some_and(|id| id != app.job_id) {
            return false;
        }
        if self.student_id.is_some_and(|id| id != app.student_id) {
            return false;
        }
        if self.employer_id.is_some_and(|id| id != employer_id) {
            return false;
        }
        if let Some(statuses) = &self.statuses {
            if !statuses.contains(&app.status) {
                return false;
            }
        }
        if self.interviewing
            && app.status != ApplicationStatus::Interview
            && app.interview_date.is_none()
        {
            return false;
        }
        if self.has_interview_date && app.interview_date.is_none() {
            return false;
        }
        if let Some(from) = self.interview_from {
            match app.interview_date {
                Some(date) if date >= from => {}
                _ => return false,
            }
        }
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ApplicationOrder {
    /// `created_at DESC`, ties broken by id.
    #[default]
    Newest,
    /// `interview_date ASC`.
    InterviewDate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterviewDateChange {
    Keep,
    Set(DateTime<Utc>),
    Clear,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApplicationChange {
    pub status: ApplicationStatus,
    pub interview_date: InterviewDateChange,
}

impl ApplicationChange {
    pub fn status(status: ApplicationStatus) -> Self {
        Self {
            status,
            interview_date: InterviewDateChange::Keep,
        }
    }

    pub fn with_interview_date(mut self, change: InterviewDateChange) -> Self {
        self.interview_date = change;
        self
    }
}

/// Record store behind the application lifecycle. Every method that takes a
/// [`LogEntry`] writes the row change and the log append atomically.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait JobBoardStore: Send + Sync {
    async fn ping(&self) -> Result<()>;

    async fn find_user(&self, id: i32) -> Result<Option<User>>;

    async fn find_job(&self, id: i32) -> Result<Option<Job>>;

    async fn find_application(&self, id: i32) -> Result<Option<OwnedApplication>>;

    async fn find_applications(&self, ids: &[i32]) -> Result<Vec<OwnedApplication>>;

    async fn find_application_for(&self, job_id: i32, student_id: i32)
        -> Result<Option<Application>>;

    /// Fails with `Error::Conflict` when `(job_id, student_id)` already exists.
    async fn create_application(
        &self,
        job_id: i32,
        student_id: i32,
        initial: LogEntry,
    ) -> Result<Application>;

    async fn list_applications(
        &self,
        filter: &ApplicationFilter,
        order: ApplicationOrder,
        with_student: bool,
    ) -> Result<Vec<ApplicationDetails>>;

    async fn count_applications(&self, filter: &ApplicationFilter) -> Result<i64>;

    async fn update_application(
        &self,
        id: i32,
        change: ApplicationChange,
        log: Option<LogEntry>,
    ) -> Result<Application>;

    /// Sets `status` on every listed row. Prior statuses are read under the
    /// same lock as the write, and a [`LogEntry::bulk_change`] is appended
    /// for each row whose prior status differs. Returns the number of rows
    /// updated.
    async fn update_status_many(
        &self,
        ids: &[i32],
        status: ApplicationStatus,
        changed_by: i32,
    ) -> Result<u64>;

    /// Removes the application and its logs, but only while its status is
    /// one of `allowed`. Returns the number of rows removed.
    async fn delete_application(&self, id: i32, allowed: &[ApplicationStatus]) -> Result<u64>;

    /// Newest first.
    async fn list_logs(&self, application_id: i32) -> Result<Vec<ApplicationLog>>;

    async fn create_invitation(&self, invitation: NewInvitation) -> Result<Invitation>;

    /// Newest first.
    async fn list_invitations_for_student(&self, student_id: i32)
        -> Result<Vec<InvitationDetails>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn app(status: ApplicationStatus, interview_date: Option<DateTime<Utc>>) -> Application {
        Application {
            id: 1,
            job_id: 10,
            student_id: 20,
            status,
            interview_date,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn interviewing_matches_status_or_date() {
        let filter = ApplicationFilter::for_employer(5).interviewing();
        assert!(filter.matches(&app(ApplicationStatus::Interview, None), 5));
        assert!(filter.matches(&app(ApplicationStatus::Applied, Some(Utc::now())), 5));
        assert!(!filter.matches(&app(ApplicationStatus::Applied, None), 5));
        assert!(!filter.matches(&app(ApplicationStatus::Interview, None), 6));
    }

    #[test]
    fn interview_from_excludes_past_and_missing_dates() {
        let now = Utc::now();
        let filter = ApplicationFilter::for_student(20).interview_from(now);
        assert!(filter.matches(&app(ApplicationStatus::Interview, Some(now + Duration::days(1))), 1));
        assert!(!filter.matches(&app(ApplicationStatus::Interview, Some(now - Duration::days(1))), 1));
        assert!(!filter.matches(&app(ApplicationStatus::Interview, None), 1));
    }

    #[test]
    fn status_set_filters() {
        let filter = ApplicationFilter::for_job(10)
            .with_statuses(&[ApplicationStatus::Applied, ApplicationStatus::InReview]);
        assert!(filter.matches(&app(ApplicationStatus::InReview, None), 1));
        assert!(!filter.matches(&app(ApplicationStatus::Offered, None), 1));
    }
}
