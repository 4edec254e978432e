use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;

use crate::database::store::{
    ApplicationChange, ApplicationFilter, ApplicationOrder, InterviewDateChange, JobBoardStore,
};
use crate::error::{Error, Result};
use crate::models::application::{
    Application, ApplicationDetails, ApplicationLog, ApplicationStatus, LogEntry, OwnedApplication,
};
use crate::models::invitation::{Invitation, InvitationDetails, NewInvitation};
use crate::models::job::Job;
use crate::models::user::{EmployerSummary, StudentSummary, User};

#[derive(Default)]
struct Tables {
    users: HashMap<i32, User>,
    jobs: HashMap<i32, Job>,
    applications: BTreeMap<i32, Application>,
    logs: Vec<ApplicationLog>,
    invitations: Vec<Invitation>,
    next_application_id: i32,
    next_log_id: i32,
    next_invitation_id: i32,
}

impl Tables {
    fn owned(&self, app: &Application) -> Option<OwnedApplication> {
        self.jobs.get(&app.job_id).map(|job| OwnedApplication {
            application: app.clone(),
            employer_id: job.employer_id,
        })
    }

    fn append_log(&mut self, application_id: i32, entry: LogEntry) {
        self.next_log_id += 1;
        self.logs.push(ApplicationLog {
            id: self.next_log_id,
            application_id,
            status: entry.status,
            changed_by: entry.changed_by,
            notes: Some(entry.notes),
            created_at: Utc::now(),
        });
    }
}

/// Process-local store with the same uniqueness and cascade rules as the
/// Postgres schema. Users and jobs are seeded directly.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_user(&self, user: User) {
        self.tables.lock().await.users.insert(user.id, user);
    }

    pub async fn insert_job(&self, job: Job) {
        self.tables.lock().await.jobs.insert(job.id, job);
    }

    /// Places an application in an arbitrary state, bypassing the lifecycle.
    pub async fn insert_application(&self, application: Application) {
        let mut tables = self.tables.lock().await;
        tables.next_application_id = tables.next_application_id.max(application.id);
        tables.applications.insert(application.id, application);
    }

    pub async fn application(&self, id: i32) -> Option<Application> {
        self.tables.lock().await.applications.get(&id).cloned()
    }

    pub async fn application_count(&self) -> usize {
        self.tables.lock().await.applications.len()
    }

    pub async fn log_count(&self, application_id: i32) -> usize {
        self.tables
            .lock()
            .await
            .logs
            .iter()
            .filter(|log| log.application_id == application_id)
            .count()
    }
}

#[async_trait]
impl JobBoardStore for MemoryStore {
    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    async fn find_user(&self, id: i32) -> Result<Option<User>> {
        Ok(self.tables.lock().await.users.get(&id).cloned())
    }

    async fn find_job(&self, id: i32) -> Result<Option<Job>> {
        Ok(self.tables.lock().await.jobs.get(&id).cloned())
    }

    async fn find_application(&self, id: i32) -> Result<Option<OwnedApplication>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .applications
            .get(&id)
            .and_then(|app| tables.owned(app)))
    }

    async fn find_applications(&self, ids: &[i32]) -> Result<Vec<OwnedApplication>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .applications
            .values()
            .filter(|app| ids.contains(&app.id))
            .filter_map(|app| tables.owned(app))
            .collect())
    }

    async fn find_application_for(
        &self,
        job_id: i32,
        student_id: i32,
    ) -> Result<Option<Application>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .applications
            .values()
            .find(|app| app.job_id == job_id && app.student_id == student_id)
            .cloned())
    }

    async fn create_application(
        &self,
        job_id: i32,
        student_id: i32,
        initial: LogEntry,
    ) -> Result<Application> {
        let mut tables = self.tables.lock().await;
        if tables
            .applications
            .values()
            .any(|app| app.job_id == job_id && app.student_id == student_id)
        {
            return Err(Error::Conflict(
                "You have already applied to this job.".to_string(),
            ));
        }

        tables.next_application_id += 1;
        let application = Application {
            id: tables.next_application_id,
            job_id,
            student_id,
            status: ApplicationStatus::Applied,
            interview_date: None,
            created_at: Utc::now(),
        };
        tables
            .applications
            .insert(application.id, application.clone());
        tables.append_log(application.id, initial);
        Ok(application)
    }

    async fn list_applications(
        &self,
        filter: &ApplicationFilter,
        order: ApplicationOrder,
        with_student: bool,
    ) -> Result<Vec<ApplicationDetails>> {
        let tables = self.tables.lock().await;
        let mut items: Vec<ApplicationDetails> = tables
            .applications
            .values()
            .filter_map(|app| {
                let job = tables.jobs.get(&app.job_id)?;
                if !filter.matches(app, job.employer_id) {
                    return None;
                }
                let student = if with_student {
                    Some(StudentSummary::from(tables.users.get(&app.student_id)?.clone()))
                } else {
                    None
                };
                Some(ApplicationDetails {
                    application: app.clone(),
                    job: job.clone(),
                    student,
                })
            })
            .collect();

        match order {
            ApplicationOrder::Newest => items.sort_by(|a, b| {
                (b.application.created_at, b.application.id)
                    .cmp(&(a.application.created_at, a.application.id))
            }),
            // Missing dates sort last, as with Postgres `ASC`.
            ApplicationOrder::InterviewDate => items.sort_by_key(|d| {
                (
                    d.application.interview_date.is_none(),
                    d.application.interview_date,
                    d.application.id,
                )
            }),
        }
        Ok(items)
    }

    async fn count_applications(&self, filter: &ApplicationFilter) -> Result<i64> {
        let tables = self.tables.lock().await;
        let count = tables
            .applications
            .values()
            .filter(|app| {
                tables
                    .jobs
                    .get(&app.job_id)
                    .is_some_and(|job| filter.matches(app, job.employer_id))
            })
            .count();
        Ok(count as i64)
    }

    async fn update_application(
        &self,
        id: i32,
        change: ApplicationChange,
        log: Option<LogEntry>,
    ) -> Result<Application> {
        let mut tables = self.tables.lock().await;
        let app = tables
            .applications
            .get_mut(&id)
            .ok_or_else(|| Error::NotFound("Application not found".to_string()))?;

        app.status = change.status;
        match change.interview_date {
            InterviewDateChange::Keep => {}
            InterviewDateChange::Set(date) => app.interview_date = Some(date),
            InterviewDateChange::Clear => app.interview_date = None,
        }
        let updated = app.clone();

        if let Some(entry) = log {
            tables.append_log(id, entry);
        }
        Ok(updated)
    }

    async fn update_status_many(
        &self,
        ids: &[i32],
        status: ApplicationStatus,
        changed_by: i32,
    ) -> Result<u64> {
        let mut tables = self.tables.lock().await;
        let mut changed = Vec::new();
        let mut affected = 0u64;
        for app in tables.applications.values_mut() {
            if ids.contains(&app.id) {
                if app.status != status {
                    changed.push((app.id, app.status));
                }
                app.status = status;
                affected += 1;
            }
        }
        for (application_id, prior) in changed {
            tables.append_log(application_id, LogEntry::bulk_change(prior, status, changed_by));
        }
        Ok(affected)
    }

    async fn delete_application(&self, id: i32, allowed: &[ApplicationStatus]) -> Result<u64> {
        let mut tables = self.tables.lock().await;
        let removable = tables
            .applications
            .get(&id)
            .is_some_and(|app| allowed.contains(&app.status));
        if !removable {
            return Ok(0);
        }
        tables.applications.remove(&id);
        tables.logs.retain(|log| log.application_id != id);
        Ok(1)
    }

    async fn list_logs(&self, application_id: i32) -> Result<Vec<ApplicationLog>> {
        let tables = self.tables.lock().await;
        let mut logs: Vec<ApplicationLog> = tables
            .logs
            .iter()
            .filter(|log| log.application_id == application_id)
            .cloned()
            .collect();
        logs.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        Ok(logs)
    }

    async fn create_invitation(&self, invitation: NewInvitation) -> Result<Invitation> {
        let mut tables = self.tables.lock().await;
        tables.next_invitation_id += 1;
        let row = Invitation {
            id: tables.next_invitation_id,
            employer_id: invitation.employer_id,
            student_id: invitation.student_id,
            job_id: invitation.job_id,
            created_at: Utc::now(),
        };
        tables.invitations.push(row.clone());
        Ok(row)
    }

    async fn list_invitations_for_student(
        &self,
        student_id: i32,
    ) -> Result<Vec<InvitationDetails>> {
        let tables = self.tables.lock().await;
        let mut items: Vec<InvitationDetails> = tables
            .invitations
            .iter()
            .filter(|inv| inv.student_id == student_id)
            .filter_map(|inv| {
                let employer = tables.users.get(&inv.employer_id)?.clone();
                Some(InvitationDetails {
                    invitation: inv.clone(),
                    employer: EmployerSummary::from(employer),
                    job: inv.job_id.and_then(|id| tables.jobs.get(&id).cloned()),
                })
            })
            .collect();
        items.sort_by(|a, b| {
            (b.invitation.created_at, b.invitation.id).cmp(&(a.invitation.created_at, a.invitation.id))
        });
        Ok(items)
    }
}
