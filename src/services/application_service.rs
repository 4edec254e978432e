use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::database::store::{
    ApplicationChange, ApplicationFilter, ApplicationOrder, InterviewDateChange, JobBoardStore,
};
use crate::error::{Error, Result};
use crate::models::application::{
    Application, ApplicationDetails, ApplicationLog, ApplicationStatus, LogEntry, OwnedApplication,
};
use crate::models::user::{Actor, Role};
use crate::utils::time;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FunnelStats {
    pub applications_received: i64,
    pub in_review: i64,
    pub interviews: i64,
    pub offers_made: i64,
}

/// Owns the application state machine. Role and ownership checks run
/// before any write; every write that produces an audit entry hands both to
/// the store in a single call.
#[derive(Clone)]
pub struct ApplicationService {
    store: Arc<dyn JobBoardStore>,
}

fn ensure_student_owner(actor: &Actor, application: &Application) -> Result<()> {
    if actor.role == Role::Student && application.student_id == actor.id {
        Ok(())
    } else {
        Err(Error::Forbidden("Forbidden: not your application".to_string()))
    }
}

fn not_withdrawable(status: ApplicationStatus) -> Error {
    Error::BadRequest(format!(
        "Cannot withdraw application with status: {}. Only applications with status APPLIED or IN_REVIEW can be withdrawn.",
        status
    ))
}

fn ensure_employer_owner(actor: &Actor, owned: &OwnedApplication) -> Result<()> {
    if actor.role == Role::Employer && owned.employer_id == actor.id {
        Ok(())
    } else {
        Err(Error::Forbidden("Forbidden: not your application".to_string()))
    }
}

impl ApplicationService {
    pub fn new(store: Arc<dyn JobBoardStore>) -> Self {
        Self { store }
    }

    async fn load(&self, application_id: i32) -> Result<OwnedApplication> {
        self.store
            .find_application(application_id)
            .await?
            .ok_or_else(|| Error::NotFound("Application not found".to_string()))
    }

    async fn load_for_employer(&self, actor: &Actor, application_id: i32) -> Result<OwnedApplication> {
        actor.require_role(Role::Employer)?;
        let owned = self.load(application_id).await?;
        ensure_employer_owner(actor, &owned)?;
        Ok(owned)
    }

    pub async fn apply(&self, actor: &Actor, job_id: i32) -> Result<Application> {
        actor.require_role(Role::Student)?;
        if job_id <= 0 {
            return Err(Error::BadRequest("jobId is required".to_string()));
        }

        let job = self
            .store
            .find_job(job_id)
            .await?
            .ok_or_else(|| Error::NotFound("Job not found".to_string()))?;

        if !job.accepts_applications_at(time::now()) {
            return Err(Error::BadRequest(
                "Application deadline has passed for this job".to_string(),
            ));
        }

        if self
            .store
            .find_application_for(job_id, actor.id)
            .await?
            .is_some()
        {
            return Err(Error::Conflict(
                "You have already applied to this job. Each student can only apply once per job posting."
                    .to_string(),
            ));
        }

        let application = self
            .store
            .create_application(
                job_id,
                actor.id,
                LogEntry::new(ApplicationStatus::Applied, actor.id, "Application submitted"),
            )
            .await?;

        tracing::info!(
            application_id = application.id,
            job_id,
            student_id = actor.id,
            "application submitted"
        );
        Ok(application)
    }

    pub async fn list_for_job(&self, actor: &Actor, job_id: i32) -> Result<Vec<ApplicationDetails>> {
        actor.require_role(Role::Employer)?;
        if job_id <= 0 {
            return Err(Error::BadRequest("jobId query param is required".to_string()));
        }

        let job = self
            .store
            .find_job(job_id)
            .await?
            .ok_or_else(|| Error::NotFound("Job not found".to_string()))?;
        if !job.is_owned_by(actor.id) {
            return Err(Error::Forbidden("Forbidden: not your job".to_string()));
        }

        self.store
            .list_applications(&ApplicationFilter::for_job(job_id), ApplicationOrder::Newest, true)
            .await
    }

    pub async fn list_mine(&self, actor: &Actor) -> Result<Vec<ApplicationDetails>> {
        actor.require_role(Role::Student)?;
        self.store
            .list_applications(
                &ApplicationFilter::for_student(actor.id),
                ApplicationOrder::Newest,
                false,
            )
            .await
    }

    pub async fn list_for_employer(&self, actor: &Actor) -> Result<Vec<ApplicationDetails>> {
        actor.require_role(Role::Employer)?;
        self.store
            .list_applications(
                &ApplicationFilter::for_employer(actor.id),
                ApplicationOrder::Newest,
                true,
            )
            .await
    }

    /// Applications on the employer's jobs that carry an interview date,
    /// soonest first.
    pub async fn list_interviews(&self, actor: &Actor) -> Result<Vec<ApplicationDetails>> {
        actor.require_role(Role::Employer)?;
        self.store
            .list_applications(
                &ApplicationFilter::for_employer(actor.id).with_interview_date(),
                ApplicationOrder::InterviewDate,
                true,
            )
            .await
    }

    pub async fn withdraw(&self, actor: &Actor, application_id: i32) -> Result<()> {
        actor.require_role(Role::Student)?;
        let owned = self.load(application_id).await?;
        let application = &owned.application;
        ensure_student_owner(actor, application)?;

        if !application.status.is_withdrawable() {
            return Err(not_withdrawable(application.status));
        }

        // The status guard is re-applied by the delete itself, so an employer
        // transition landing after the read above keeps the row.
        let removed = self
            .store
            .delete_application(application_id, &ApplicationStatus::WITHDRAWABLE)
            .await?;
        if removed == 0 {
            let current = self.load(application_id).await?;
            return Err(not_withdrawable(current.application.status));
        }

        tracing::info!(application_id, student_id = actor.id, "application withdrawn");
        Ok(())
    }

    /// Generic employer transition. Logs only when the status actually
    /// changes; a supplied interview date replaces the stored one.
    pub async fn update_status(
        &self,
        actor: &Actor,
        application_id: i32,
        new_status: ApplicationStatus,
        interview_date: Option<DateTime<Utc>>,
    ) -> Result<Application> {
        let owned = self.load_for_employer(actor, application_id).await?;
        let old_status = owned.application.status;

        let change = ApplicationChange::status(new_status).with_interview_date(
            interview_date.map_or(InterviewDateChange::Keep, InterviewDateChange::Set),
        );
        let log = (old_status != new_status).then(|| {
            LogEntry::new(
                new_status,
                actor.id,
                format!("Status changed from {} to {}", old_status, new_status),
            )
        });

        let updated = self
            .store
            .update_application(application_id, change, log)
            .await?;
        tracing::info!(
            application_id,
            employer_id = actor.id,
            from = %old_status,
            to = %new_status,
            "application status updated"
        );
        Ok(updated)
    }

    /// Always logs, even when the application is already in `INTERVIEW`.
    pub async fn schedule_interview(
        &self,
        actor: &Actor,
        application_id: i32,
        interview_date: DateTime<Utc>,
    ) -> Result<Application> {
        self.load_for_employer(actor, application_id).await?;

        let change = ApplicationChange::status(ApplicationStatus::Interview)
            .with_interview_date(InterviewDateChange::Set(interview_date));
        let log = LogEntry::new(
            ApplicationStatus::Interview,
            actor.id,
            format!("Interview scheduled for {}", time::to_iso_millis(interview_date)),
        );

        let updated = self
            .store
            .update_application(application_id, change, Some(log))
            .await?;
        tracing::info!(
            application_id,
            employer_id = actor.id,
            interview_date = %interview_date,
            "interview scheduled"
        );
        Ok(updated)
    }

    /// Student-side cancellation. Resets to `APPLIED` from any status and
    /// writes no audit entry. Foreign applications are reported as missing.
    pub async fn cancel_interview(&self, actor: &Actor, application_id: i32) -> Result<Application> {
        actor.require_role(Role::Student)?;
        let owned = self.load(application_id).await?;
        if ensure_student_owner(actor, &owned.application).is_err() {
            return Err(Error::NotFound("Application not found".to_string()));
        }

        let change = ApplicationChange::status(ApplicationStatus::Applied)
            .with_interview_date(InterviewDateChange::Clear);
        let updated = self
            .store
            .update_application(application_id, change, None)
            .await?;
        tracing::info!(application_id, student_id = actor.id, "interview cancelled");
        Ok(updated)
    }

    pub async fn send_offer(&self, actor: &Actor, application_id: i32) -> Result<Application> {
        self.load_for_employer(actor, application_id).await?;

        let log = LogEntry::new(
            ApplicationStatus::Offered,
            actor.id,
            "Job offer sent to applicant",
        );
        let updated = self
            .store
            .update_application(
                application_id,
                ApplicationChange::status(ApplicationStatus::Offered),
                Some(log),
            )
            .await?;
        tracing::info!(application_id, employer_id = actor.id, "offer sent");
        Ok(updated)
    }

    /// Ownership of every referenced application is verified before the
    /// batch write; ids that do not exist are ignored. The store logs each
    /// row whose status actually changed. Returns the number of rows the
    /// batch touched, which can exceed the number of log entries.
    pub async fn bulk_update_status(
        &self,
        actor: &Actor,
        application_ids: &[i32],
        new_status: ApplicationStatus,
    ) -> Result<u64> {
        actor.require_role(Role::Employer)?;
        if application_ids.is_empty() {
            return Err(Error::BadRequest("No applications selected".to_string()));
        }

        let found = self.store.find_applications(application_ids).await?;
        if found.iter().any(|owned| owned.employer_id != actor.id) {
            return Err(Error::Forbidden(
                "Some applications do not belong to you".to_string(),
            ));
        }

        let count = self
            .store
            .update_status_many(application_ids, new_status, actor.id)
            .await?;
        tracing::info!(
            employer_id = actor.id,
            status = %new_status,
            count,
            "bulk status update"
        );
        Ok(count)
    }

    pub async fn get_logs(&self, actor: &Actor, application_id: i32) -> Result<Vec<ApplicationLog>> {
        let owned = self.load(application_id).await?;
        let allowed = match actor.role {
            Role::Student => ensure_student_owner(actor, &owned.application),
            Role::Employer => ensure_employer_owner(actor, &owned),
        };
        allowed.map_err(|_| Error::Forbidden("Forbidden".to_string()))?;

        self.store.list_logs(application_id).await
    }

    pub async fn funnel(&self, actor: &Actor) -> Result<FunnelStats> {
        actor.require_role(Role::Employer)?;
        let base = ApplicationFilter::for_employer(actor.id);

        let applications_received = self.store.count_applications(&base).await?;
        let in_review = self
            .store
            .count_applications(
                &base
                    .clone()
                    .with_statuses(&[ApplicationStatus::Applied, ApplicationStatus::InReview]),
            )
            .await?;
        let interviews = self
            .store
            .count_applications(&base.clone().interviewing())
            .await?;
        let offers_made = self
            .store
            .count_applications(&base.with_statuses(&[ApplicationStatus::Offered]))
            .await?;

        Ok(FunnelStats {
            applications_received,
            in_review,
            interviews,
            offers_made,
        })
    }

    /// Interviews at or after now: the student's own, or those on the
    /// employer's jobs.
    pub async fn upcoming_interviews_count(&self, actor: &Actor) -> Result<i64> {
        let scope = match actor.role {
            Role::Student => ApplicationFilter::for_student(actor.id),
            Role::Employer => ApplicationFilter::for_employer(actor.id),
        };
        self.store
            .count_applications(&scope.interview_from(time::now()))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::memory_store::MemoryStore;
    use crate::database::store::MockJobBoardStore;
    use crate::models::job::Job;
    use crate::models::user::User;
    use chrono::Duration;

    const EMPLOYER: i32 = 1;
    const OTHER_EMPLOYER: i32 = 2;
    const STUDENT: i32 = 10;
    const OTHER_STUDENT: i32 = 11;

    fn user(id: i32, role: Role) -> User {
        User {
            id,
            email: format!("user{}@example.com", id),
            role,
            first_name: Some(format!("First{}", id)),
            last_name: None,
            username: None,
            university: Some("SDU".into()),
            major: None,
            study_year: None,
            city: None,
            skills: None,
            github: None,
            linkedin: None,
            portfolio: None,
        }
    }

    fn job(id: i32, employer_id: i32, deadline: Option<DateTime<Utc>>) -> Job {
        Job {
            id,
            employer_id,
            title: format!("Job {}", id),
            location: Some("Almaty".into()),
            job_type: None,
            work_mode: None,
            application_deadline: deadline,
            created_at: Utc::now(),
        }
    }

    fn application(id: i32, job_id: i32, student_id: i32, status: ApplicationStatus) -> Application {
        Application {
            id,
            job_id,
            student_id,
            status,
            interview_date: None,
            created_at: Utc::now(),
        }
    }

    async fn fixture() -> (Arc<MemoryStore>, ApplicationService) {
        let store = Arc::new(MemoryStore::new());
        store.insert_user(user(EMPLOYER, Role::Employer)).await;
        store.insert_user(user(OTHER_EMPLOYER, Role::Employer)).await;
        store.insert_user(user(STUDENT, Role::Student)).await;
        store.insert_user(user(OTHER_STUDENT, Role::Student)).await;
        store.insert_job(job(100, EMPLOYER, None)).await;
        store.insert_job(job(200, OTHER_EMPLOYER, None)).await;
        let service = ApplicationService::new(store.clone());
        (store, service)
    }

    #[tokio::test]
    async fn apply_twice_conflicts_and_keeps_one_row() {
        let (store, service) = fixture().await;
        let student = Actor::student(STUDENT);

        let app = service.apply(&student, 100).await.unwrap();
        assert_eq!(app.status, ApplicationStatus::Applied);
        assert_eq!(store.log_count(app.id).await, 1);

        let err = service.apply(&student, 100).await.unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
        assert_eq!(store.application_count().await, 1);
    }

    #[tokio::test]
    async fn apply_writes_submission_log() {
        let (store, service) = fixture().await;
        let app = service.apply(&Actor::student(STUDENT), 100).await.unwrap();

        let logs = store.list_logs(app.id).await.unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].status, ApplicationStatus::Applied);
        assert_eq!(logs[0].changed_by, STUDENT);
        assert_eq!(logs[0].notes.as_deref(), Some("Application submitted"));
    }

    #[tokio::test]
    async fn apply_after_deadline_is_rejected() {
        let (store, service) = fixture().await;
        store
            .insert_job(job(300, EMPLOYER, Some(Utc::now() - Duration::days(1))))
            .await;

        let err = service.apply(&Actor::student(STUDENT), 300).await.unwrap_err();
        assert!(matches!(err, Error::BadRequest(_)));
        assert_eq!(store.application_count().await, 0);
    }

    #[tokio::test]
    async fn apply_before_deadline_succeeds() {
        let (store, service) = fixture().await;
        store
            .insert_job(job(300, EMPLOYER, Some(Utc::now() + Duration::days(1))))
            .await;
        assert!(service.apply(&Actor::student(STUDENT), 300).await.is_ok());
    }

    #[tokio::test]
    async fn apply_to_missing_job_is_not_found() {
        let (_, service) = fixture().await;
        let err = service.apply(&Actor::student(STUDENT), 999).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn employers_cannot_apply() {
        let (_, service) = fixture().await;
        let err = service.apply(&Actor::employer(EMPLOYER), 100).await.unwrap_err();
        assert!(matches!(err, Error::Forbidden(_)));
    }

    #[tokio::test]
    async fn withdraw_depends_on_status_and_owner() {
        let (store, service) = fixture().await;
        let student = Actor::student(STUDENT);
        store
            .insert_application(application(1, 100, STUDENT, ApplicationStatus::InReview))
            .await;
        store
            .insert_application(application(2, 200, STUDENT, ApplicationStatus::Interview))
            .await;
        store
            .insert_application(application(3, 100, OTHER_STUDENT, ApplicationStatus::Applied))
            .await;

        let err = service.withdraw(&student, 2).await.unwrap_err();
        match err {
            Error::BadRequest(msg) => assert!(msg.contains("INTERVIEW")),
            other => panic!("expected BadRequest, got {:?}", other),
        }
        assert_eq!(
            store.application(2).await.unwrap().status,
            ApplicationStatus::Interview
        );

        let err = service.withdraw(&student, 3).await.unwrap_err();
        assert!(matches!(err, Error::Forbidden(_)));
        assert!(store.application(3).await.is_some());

        service.withdraw(&student, 1).await.unwrap();
        assert!(store.application(1).await.is_none());
        assert_eq!(store.log_count(1).await, 0);
    }

    #[tokio::test]
    async fn withdraw_cascades_logs() {
        let (store, service) = fixture().await;
        let student = Actor::student(STUDENT);
        let app = service.apply(&student, 100).await.unwrap();
        assert_eq!(store.log_count(app.id).await, 1);

        service.withdraw(&student, app.id).await.unwrap();
        assert_eq!(store.log_count(app.id).await, 0);
    }

    #[tokio::test]
    async fn update_status_logs_only_on_change() {
        let (store, service) = fixture().await;
        let employer = Actor::employer(EMPLOYER);
        store
            .insert_application(application(1, 100, STUDENT, ApplicationStatus::InReview))
            .await;

        let updated = service
            .update_status(&employer, 1, ApplicationStatus::Interview, None)
            .await
            .unwrap();
        assert_eq!(updated.status, ApplicationStatus::Interview);
        let logs = store.list_logs(1).await.unwrap();
        assert_eq!(logs.len(), 1);
        let notes = logs[0].notes.clone().unwrap();
        assert!(notes.contains("IN_REVIEW") && notes.contains("INTERVIEW"));

        service
            .update_status(&employer, 1, ApplicationStatus::Interview, None)
            .await
            .unwrap();
        assert_eq!(store.log_count(1).await, 1);
    }

    #[tokio::test]
    async fn update_status_keeps_interview_date_unless_given() {
        let (store, service) = fixture().await;
        let employer = Actor::employer(EMPLOYER);
        let date = Utc::now() + Duration::days(3);
        let mut app = application(1, 100, STUDENT, ApplicationStatus::Interview);
        app.interview_date = Some(date);
        store.insert_application(app).await;

        let updated = service
            .update_status(&employer, 1, ApplicationStatus::Rejected, None)
            .await
            .unwrap();
        assert_eq!(updated.interview_date, Some(date));

        let later = date + Duration::days(1);
        let updated = service
            .update_status(&employer, 1, ApplicationStatus::Interview, Some(later))
            .await
            .unwrap();
        assert_eq!(updated.interview_date, Some(later));
    }

    #[tokio::test]
    async fn update_status_requires_job_owner() {
        let (store, service) = fixture().await;
        store
            .insert_application(application(1, 200, STUDENT, ApplicationStatus::Applied))
            .await;

        let err = service
            .update_status(&Actor::employer(EMPLOYER), 1, ApplicationStatus::Rejected, None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Forbidden(_)));
        assert_eq!(
            store.application(1).await.unwrap().status,
            ApplicationStatus::Applied
        );
    }

    #[tokio::test]
    async fn schedule_interview_always_logs() {
        let (store, service) = fixture().await;
        let employer = Actor::employer(EMPLOYER);
        store
            .insert_application(application(1, 100, STUDENT, ApplicationStatus::Interview))
            .await;
        let date = Utc::now() + Duration::days(2);

        let updated = service.schedule_interview(&employer, 1, date).await.unwrap();
        assert_eq!(updated.status, ApplicationStatus::Interview);
        assert_eq!(updated.interview_date, Some(date));
        assert_eq!(store.log_count(1).await, 1);

        service.schedule_interview(&employer, 1, date).await.unwrap();
        assert_eq!(store.log_count(1).await, 2);
        let logs = store.list_logs(1).await.unwrap();
        assert!(logs[0]
            .notes
            .as_deref()
            .unwrap()
            .starts_with("Interview scheduled for "));
    }

    #[tokio::test]
    async fn cancel_interview_resets_without_logging() {
        let (store, service) = fixture().await;
        let mut app = application(1, 100, STUDENT, ApplicationStatus::Offered);
        app.interview_date = Some(Utc::now() + Duration::days(1));
        store.insert_application(app).await;

        let updated = service
            .cancel_interview(&Actor::student(STUDENT), 1)
            .await
            .unwrap();
        assert_eq!(updated.status, ApplicationStatus::Applied);
        assert_eq!(updated.interview_date, None);
        assert_eq!(store.log_count(1).await, 0);
    }

    #[tokio::test]
    async fn cancel_interview_hides_foreign_applications() {
        let (store, service) = fixture().await;
        store
            .insert_application(application(1, 100, OTHER_STUDENT, ApplicationStatus::Interview))
            .await;

        let err = service
            .cancel_interview(&Actor::student(STUDENT), 1)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn send_offer_sets_status_and_logs() {
        let (store, service) = fixture().await;
        store
            .insert_application(application(1, 100, STUDENT, ApplicationStatus::Interview))
            .await;

        let updated = service
            .send_offer(&Actor::employer(EMPLOYER), 1)
            .await
            .unwrap();
        assert_eq!(updated.status, ApplicationStatus::Offered);
        let logs = store.list_logs(1).await.unwrap();
        assert_eq!(logs[0].notes.as_deref(), Some("Job offer sent to applicant"));
    }

    #[tokio::test]
    async fn bulk_update_rejects_mixed_ownership_without_mutation() {
        let (store, service) = fixture().await;
        store
            .insert_application(application(1, 100, STUDENT, ApplicationStatus::Applied))
            .await;
        store
            .insert_application(application(2, 200, OTHER_STUDENT, ApplicationStatus::Applied))
            .await;

        let err = service
            .bulk_update_status(&Actor::employer(EMPLOYER), &[1, 2], ApplicationStatus::Rejected)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Forbidden(_)));
        for id in [1, 2] {
            assert_eq!(
                store.application(id).await.unwrap().status,
                ApplicationStatus::Applied
            );
            assert_eq!(store.log_count(id).await, 0);
        }
    }

    #[tokio::test]
    async fn bulk_update_counts_rows_and_logs_changes_only() {
        let (store, service) = fixture().await;
        store
            .insert_application(application(1, 100, STUDENT, ApplicationStatus::Applied))
            .await;
        store
            .insert_application(application(2, 100, OTHER_STUDENT, ApplicationStatus::Rejected))
            .await;

        let count = service
            .bulk_update_status(&Actor::employer(EMPLOYER), &[1, 2, 42], ApplicationStatus::Rejected)
            .await
            .unwrap();
        assert_eq!(count, 2);
        assert_eq!(store.log_count(1).await, 1);
        assert_eq!(store.log_count(2).await, 0);
        let logs = store.list_logs(1).await.unwrap();
        assert_eq!(
            logs[0].notes.as_deref(),
            Some("Bulk status update from APPLIED to REJECTED")
        );
    }

    #[tokio::test]
    async fn bulk_update_requires_ids() {
        let (_, service) = fixture().await;
        let err = service
            .bulk_update_status(&Actor::employer(EMPLOYER), &[], ApplicationStatus::Rejected)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::BadRequest(_)));
    }

    #[tokio::test]
    async fn logs_visible_to_both_owners_only() {
        let (store, service) = fixture().await;
        let app = service.apply(&Actor::student(STUDENT), 100).await.unwrap();
        service
            .send_offer(&Actor::employer(EMPLOYER), app.id)
            .await
            .unwrap();

        let logs = service
            .get_logs(&Actor::student(STUDENT), app.id)
            .await
            .unwrap();
        assert_eq!(logs.len(), 2);
        assert_eq!(logs[0].status, ApplicationStatus::Offered);

        assert!(service
            .get_logs(&Actor::employer(EMPLOYER), app.id)
            .await
            .is_ok());
        for outsider in [Actor::student(OTHER_STUDENT), Actor::employer(OTHER_EMPLOYER)] {
            let err = service.get_logs(&outsider, app.id).await.unwrap_err();
            assert!(matches!(err, Error::Forbidden(_)));
        }
        assert_eq!(store.log_count(app.id).await, 2);
    }

    #[tokio::test]
    async fn funnel_counts_each_stage() {
        let (store, service) = fixture().await;
        let statuses = [
            ApplicationStatus::Applied,
            ApplicationStatus::InReview,
            ApplicationStatus::Interview,
            ApplicationStatus::Offered,
        ];
        for (i, status) in statuses.into_iter().enumerate() {
            store
                .insert_application(application(i as i32 + 1, 100, STUDENT + i as i32, status))
                .await;
        }
        store
            .insert_application(application(9, 200, STUDENT, ApplicationStatus::Offered))
            .await;

        let stats = service.funnel(&Actor::employer(EMPLOYER)).await.unwrap();
        assert_eq!(
            stats,
            FunnelStats {
                applications_received: 4,
                in_review: 2,
                interviews: 1,
                offers_made: 1,
            }
        );
    }

    #[tokio::test]
    async fn funnel_counts_dated_interviews_regardless_of_status() {
        let (store, service) = fixture().await;
        let mut app = application(1, 100, STUDENT, ApplicationStatus::Applied);
        app.interview_date = Some(Utc::now());
        store.insert_application(app).await;

        let stats = service.funnel(&Actor::employer(EMPLOYER)).await.unwrap();
        assert_eq!(stats.interviews, 1);
        assert_eq!(stats.in_review, 1);
    }

    #[tokio::test]
    async fn upcoming_interviews_are_scoped_to_actor() {
        let (store, service) = fixture().await;
        let future = Utc::now() + Duration::days(1);
        let past = Utc::now() - Duration::days(1);
        for (id, job_id, student_id, date) in [
            (1, 100, STUDENT, Some(future)),
            (2, 100, OTHER_STUDENT, Some(past)),
            (3, 200, STUDENT, Some(future)),
            (4, 100, OTHER_STUDENT, None),
        ] {
            let mut app = application(id, job_id, student_id, ApplicationStatus::Interview);
            app.interview_date = date;
            store.insert_application(app).await;
        }

        assert_eq!(
            service
                .upcoming_interviews_count(&Actor::student(STUDENT))
                .await
                .unwrap(),
            2
        );
        assert_eq!(
            service
                .upcoming_interviews_count(&Actor::employer(EMPLOYER))
                .await
                .unwrap(),
            1
        );
    }

    #[tokio::test]
    async fn listings_are_scoped_and_newest_first() {
        let (store, service) = fixture().await;
        service.apply(&Actor::student(STUDENT), 100).await.unwrap();
        service.apply(&Actor::student(OTHER_STUDENT), 100).await.unwrap();
        service.apply(&Actor::student(STUDENT), 200).await.unwrap();

        let mine = service.list_mine(&Actor::student(STUDENT)).await.unwrap();
        assert_eq!(mine.len(), 2);
        assert!(mine.iter().all(|d| d.student.is_none()));
        assert!(mine[0].application.id > mine[1].application.id);

        let for_job = service
            .list_for_job(&Actor::employer(EMPLOYER), 100)
            .await
            .unwrap();
        assert_eq!(for_job.len(), 2);
        assert_eq!(for_job[0].student.as_ref().unwrap().id, OTHER_STUDENT);

        let all = service
            .list_for_employer(&Actor::employer(OTHER_EMPLOYER))
            .await
            .unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(store.application_count().await, 3);
    }

    #[tokio::test]
    async fn list_for_job_checks_ownership() {
        let (_, service) = fixture().await;
        let err = service
            .list_for_job(&Actor::employer(EMPLOYER), 200)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Forbidden(_)));
        let err = service
            .list_for_job(&Actor::employer(EMPLOYER), 404)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn interviews_listing_orders_by_date() {
        let (store, service) = fixture().await;
        let soon = Utc::now() + Duration::hours(2);
        let later = Utc::now() + Duration::days(5);
        for (id, date) in [(1, Some(later)), (2, None), (3, Some(soon))] {
            let mut app = application(id, 100, STUDENT + id, ApplicationStatus::Interview);
            app.interview_date = date;
            store.insert_application(app).await;
        }
        for id in [STUDENT + 1, STUDENT + 3] {
            store.insert_user(user(id, Role::Student)).await;
        }

        let items = service
            .list_interviews(&Actor::employer(EMPLOYER))
            .await
            .unwrap();
        let ids: Vec<i32> = items.iter().map(|d| d.application.id).collect();
        assert_eq!(ids, vec![3, 1]);
    }

    #[tokio::test]
    async fn store_failures_propagate_before_any_write() {
        let mut store = MockJobBoardStore::new();
        store
            .expect_find_application()
            .returning(|_| Err(Error::Internal("connection reset".into())));
        store.expect_update_application().never();
        let service = ApplicationService::new(Arc::new(store));

        let err = service
            .send_offer(&Actor::employer(EMPLOYER), 1)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Internal(_)));
    }

    #[tokio::test]
    async fn withdraw_loses_to_a_concurrent_transition() {
        let mut store = MockJobBoardStore::new();
        let mut seq = mockall::Sequence::new();
        store
            .expect_find_application()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|id| {
                Ok(Some(OwnedApplication {
                    application: application(id, 100, STUDENT, ApplicationStatus::Applied),
                    employer_id: EMPLOYER,
                }))
            });
        // The employer moves the row to INTERVIEW before the delete runs.
        store
            .expect_delete_application()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, allowed| {
                assert_eq!(allowed, &ApplicationStatus::WITHDRAWABLE[..]);
                Ok(0)
            });
        store
            .expect_find_application()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|id| {
                Ok(Some(OwnedApplication {
                    application: application(id, 100, STUDENT, ApplicationStatus::Interview),
                    employer_id: EMPLOYER,
                }))
            });
        let service = ApplicationService::new(Arc::new(store));

        let err = service.withdraw(&Actor::student(STUDENT), 1).await.unwrap_err();
        match err {
            Error::BadRequest(msg) => assert!(msg.contains("INTERVIEW")),
            other => panic!("expected BadRequest, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn duplicate_detected_by_store_surfaces_as_conflict() {
        let mut store = MockJobBoardStore::new();
        store
            .expect_find_job()
            .returning(|id| Ok(Some(job(id, EMPLOYER, None))));
        store.expect_find_application_for().returning(|_, _| Ok(None));
        store
            .expect_create_application()
            .times(1)
            .returning(|_, _, _| Err(Error::Conflict("duplicate".into())));
        let service = ApplicationService::new(Arc::new(store));

        let err = service.apply(&Actor::student(STUDENT), 100).await.unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
    }
}
