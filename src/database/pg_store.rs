use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder, Row};

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

const APPLICATION_COLUMNS: &str =
    "a.id, a.job_id, a.student_id, a.status, a.interview_date, a.created_at";

const RETURNING_APPLICATION: &str =
    " RETURNING id, job_id, student_id, status, interview_date, created_at";

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

async fn insert_log(
    conn: &mut PgConnection,
    application_id: i32,
    entry: &LogEntry,
) -> std::result::Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO application_logs (application_id, status, changed_by, notes)
        VALUES ($1, $2, $3, $4)
        "#,
    )
    .bind(application_id)
    .bind(entry.status)
    .bind(entry.changed_by)
    .bind(&entry.notes)
    .execute(conn)
    .await?;
    Ok(())
}

fn push_filter(qb: &mut QueryBuilder<'_, Postgres>, filter: &ApplicationFilter) {
    qb.push(" WHERE TRUE");
    if let Some(job_id) = filter.job_id {
        qb.push(" AND a.job_id = ").push_bind(job_id);
    }
    if let Some(student_id) = filter.student_id {
        qb.push(" AND a.student_id = ").push_bind(student_id);
    }
    if let Some(employer_id) = filter.employer_id {
        qb.push(" AND j.employer_id = ").push_bind(employer_id);
    }
    if let Some(statuses) = &filter.statuses {
        if statuses.is_empty() {
            qb.push(" AND FALSE");
        } else {
            qb.push(" AND a.status IN (");
            let mut list = qb.separated(", ");
            for status in statuses {
                list.push_bind(*status);
            }
            list.push_unseparated(")");
        }
    }
    if filter.interviewing {
        qb.push(" AND (a.status = ")
            .push_bind(ApplicationStatus::Interview)
            .push(" OR a.interview_date IS NOT NULL)");
    }
    if filter.has_interview_date {
        qb.push(" AND a.interview_date IS NOT NULL");
    }
    if let Some(from) = filter.interview_from {
        qb.push(" AND a.interview_date >= ").push_bind(from);
    }
}

fn details_from_row(
    row: &PgRow,
    with_student: bool,
) -> std::result::Result<ApplicationDetails, sqlx::Error> {
    let application = Application {
        id: row.try_get("id")?,
        job_id: row.try_get("job_id")?,
        student_id: row.try_get("student_id")?,
        status: row.try_get("status")?,
        interview_date: row.try_get("interview_date")?,
        created_at: row.try_get("created_at")?,
    };
    let job = Job {
        id: row.try_get("job_ref_id")?,
        employer_id: row.try_get("job_employer_id")?,
        title: row.try_get("job_title")?,
        location: row.try_get("job_location")?,
        job_type: row.try_get("job_type")?,
        work_mode: row.try_get("job_work_mode")?,
        application_deadline: row.try_get("job_application_deadline")?,
        created_at: row.try_get("job_created_at")?,
    };
    let student = if with_student {
        Some(StudentSummary {
            id: row.try_get("student_ref_id")?,
            email: row.try_get("student_email")?,
            first_name: row.try_get("student_first_name")?,
            last_name: row.try_get("student_last_name")?,
            username: row.try_get("student_username")?,
            university: row.try_get("student_university")?,
            major: row.try_get("student_major")?,
            study_year: row.try_get("student_study_year")?,
            city: row.try_get("student_city")?,
            skills: row.try_get("student_skills")?,
            github: row.try_get("student_github")?,
            linkedin: row.try_get("student_linkedin")?,
            portfolio: row.try_get("student_portfolio")?,
        })
    } else {
        None
    };
    Ok(ApplicationDetails {
        application,
        job,
        student,
    })
}

fn invitation_from_row(row: &PgRow) -> std::result::Result<InvitationDetails, sqlx::Error> {
    let invitation = Invitation {
        id: row.try_get("id")?,
        employer_id: row.try_get("employer_id")?,
        student_id: row.try_get("student_id")?,
        job_id: row.try_get("job_id")?,
        created_at: row.try_get("created_at")?,
    };
    let employer = EmployerSummary {
        id: row.try_get("employer_ref_id")?,
        email: row.try_get("employer_email")?,
        first_name: row.try_get("employer_first_name")?,
        last_name: row.try_get("employer_last_name")?,
    };
    let job_ref: Option<i32> = row.try_get("job_ref_id")?;
    let job = match job_ref {
        Some(id) => Some(Job {
            id,
            employer_id: row.try_get("job_employer_id")?,
            title: row.try_get("job_title")?,
            location: row.try_get("job_location")?,
            job_type: row.try_get("job_type")?,
            work_mode: row.try_get("job_work_mode")?,
            application_deadline: row.try_get("job_application_deadline")?,
            created_at: row.try_get("job_created_at")?,
        }),
        None => None,
    };
    Ok(InvitationDetails {
        invitation,
        employer,
        job,
    })
}

#[async_trait]
impl JobBoardStore for PgStore {
    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn find_user(&self, id: i32) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, role, first_name, last_name, username, university, major,
                   study_year, city, skills, github, linkedin, portfolio
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn find_job(&self, id: i32) -> Result<Option<Job>> {
        let job = sqlx::query_as::<_, Job>(
            r#"
            SELECT id, employer_id, title, location, job_type, work_mode,
                   application_deadline, created_at
            FROM jobs
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(job)
    }

    async fn find_application(&self, id: i32) -> Result<Option<OwnedApplication>> {
        let sql = format!(
            "SELECT {APPLICATION_COLUMNS}, j.employer_id \
             FROM applications a JOIN jobs j ON j.id = a.job_id \
             WHERE a.id = $1"
        );
        let row = sqlx::query_as::<_, OwnedApplication>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn find_applications(&self, ids: &[i32]) -> Result<Vec<OwnedApplication>> {
        let sql = format!(
            "SELECT {APPLICATION_COLUMNS}, j.employer_id \
             FROM applications a JOIN jobs j ON j.id = a.job_id \
             WHERE a.id = ANY($1) \
             ORDER BY a.id"
        );
        let rows = sqlx::query_as::<_, OwnedApplication>(&sql)
            .bind(ids.to_vec())
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn find_application_for(
        &self,
        job_id: i32,
        student_id: i32,
    ) -> Result<Option<Application>> {
        let sql = format!(
            "SELECT {APPLICATION_COLUMNS} FROM applications a \
             WHERE a.job_id = $1 AND a.student_id = $2"
        );
        let row = sqlx::query_as::<_, Application>(&sql)
            .bind(job_id)
            .bind(student_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn create_application(
        &self,
        job_id: i32,
        student_id: i32,
        initial: LogEntry,
    ) -> Result<Application> {
        let mut tx = self.pool.begin().await?;

        let sql = format!(
            "INSERT INTO applications (job_id, student_id, status) VALUES ($1, $2, $3){RETURNING_APPLICATION}"
        );
        let application = sqlx::query_as::<_, Application>(&sql)
            .bind(job_id)
            .bind(student_id)
            .bind(ApplicationStatus::Applied)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(db) if db.is_unique_violation() => Error::Conflict(
                    "You have already applied to this job.".to_string(),
                ),
                other => Error::from(other),
            })?;

        insert_log(&mut tx, application.id, &initial).await?;
        tx.commit().await?;
        Ok(application)
    }

    async fn list_applications(
        &self,
        filter: &ApplicationFilter,
        order: ApplicationOrder,
        with_student: bool,
    ) -> Result<Vec<ApplicationDetails>> {
        let mut qb: QueryBuilder<'_, Postgres> = QueryBuilder::new("SELECT ");
        qb.push(APPLICATION_COLUMNS);
        qb.push(
            ", j.id AS job_ref_id, j.employer_id AS job_employer_id, j.title AS job_title, \
             j.location AS job_location, j.job_type AS job_type, j.work_mode AS job_work_mode, \
             j.application_deadline AS job_application_deadline, j.created_at AS job_created_at",
        );
        if with_student {
            qb.push(
                ", u.id AS student_ref_id, u.email AS student_email, \
                 u.first_name AS student_first_name, u.last_name AS student_last_name, \
                 u.username AS student_username, u.university AS student_university, \
                 u.major AS student_major, u.study_year AS student_study_year, \
                 u.city AS student_city, u.skills AS student_skills, \
                 u.github AS student_github, u.linkedin AS student_linkedin, \
                 u.portfolio AS student_portfolio",
            );
        }
        qb.push(" FROM applications a JOIN jobs j ON j.id = a.job_id");
        if with_student {
            qb.push(" JOIN users u ON u.id = a.student_id");
        }
        push_filter(&mut qb, filter);
        qb.push(match order {
            ApplicationOrder::Newest => " ORDER BY a.created_at DESC, a.id DESC",
            ApplicationOrder::InterviewDate => " ORDER BY a.interview_date ASC, a.id ASC",
        });

        let rows = qb.build().fetch_all(&self.pool).await?;
        let items = rows
            .iter()
            .map(|row| details_from_row(row, with_student))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(items)
    }

    async fn count_applications(&self, filter: &ApplicationFilter) -> Result<i64> {
        let mut qb: QueryBuilder<'_, Postgres> = QueryBuilder::new(
            "SELECT COUNT(*) FROM applications a JOIN jobs j ON j.id = a.job_id",
        );
        push_filter(&mut qb, filter);
        let count = qb.build_query_scalar::<i64>().fetch_one(&self.pool).await?;
        Ok(count)
    }

    async fn update_application(
        &self,
        id: i32,
        change: ApplicationChange,
        log: Option<LogEntry>,
    ) -> Result<Application> {
        let mut tx = self.pool.begin().await?;

        let mut qb: QueryBuilder<'_, Postgres> = QueryBuilder::new("UPDATE applications SET status = ");
        qb.push_bind(change.status);
        match change.interview_date {
            InterviewDateChange::Keep => {}
            InterviewDateChange::Set(date) => {
                qb.push(", interview_date = ").push_bind(date);
            }
            InterviewDateChange::Clear => {
                qb.push(", interview_date = NULL");
            }
        }
        qb.push(" WHERE id = ").push_bind(id);
        qb.push(RETURNING_APPLICATION);

        let application = qb
            .build_query_as::<Application>()
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| Error::NotFound("Application not found".to_string()))?;

        if let Some(entry) = log {
            insert_log(&mut tx, id, &entry).await?;
        }
        tx.commit().await?;
        Ok(application)
    }

    async fn update_status_many(
        &self,
        ids: &[i32],
        status: ApplicationStatus,
        changed_by: i32,
    ) -> Result<u64> {
        let mut tx = self.pool.begin().await?;

        let prior = sqlx::query_as::<_, (i32, ApplicationStatus)>(
            "SELECT id, status FROM applications WHERE id = ANY($1) ORDER BY id FOR UPDATE",
        )
        .bind(ids.to_vec())
        .fetch_all(&mut *tx)
        .await?;

        let result = sqlx::query("UPDATE applications SET status = $1 WHERE id = ANY($2)")
            .bind(status)
            .bind(ids.to_vec())
            .execute(&mut *tx)
            .await?;

        for (application_id, from) in prior.into_iter().filter(|(_, from)| *from != status) {
            insert_log(&mut tx, application_id, &LogEntry::bulk_change(from, status, changed_by))
                .await?;
        }
        tx.commit().await?;
        Ok(result.rows_affected())
    }

    async fn delete_application(&self, id: i32, allowed: &[ApplicationStatus]) -> Result<u64> {
        let allowed: Vec<&str> = allowed.iter().map(ApplicationStatus::as_str).collect();
        let result = sqlx::query("DELETE FROM applications WHERE id = $1 AND status::text = ANY($2)")
            .bind(id)
            .bind(allowed)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn list_logs(&self, application_id: i32) -> Result<Vec<ApplicationLog>> {
        let logs = sqlx::query_as::<_, ApplicationLog>(
            r#"
            SELECT id, application_id, status, changed_by, notes, created_at
            FROM application_logs
            WHERE application_id = $1
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(application_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(logs)
    }

    async fn create_invitation(&self, invitation: NewInvitation) -> Result<Invitation> {
        let row = sqlx::query_as::<_, Invitation>(
            r#"
            INSERT INTO invitations (employer_id, student_id, job_id)
            VALUES ($1, $2, $3)
            RETURNING id, employer_id, student_id, job_id, created_at
            "#,
        )
        .bind(invitation.employer_id)
        .bind(invitation.student_id)
        .bind(invitation.job_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn list_invitations_for_student(
        &self,
        student_id: i32,
    ) -> Result<Vec<InvitationDetails>> {
        let rows = sqlx::query(
            r#"
            SELECT i.id, i.employer_id, i.student_id, i.job_id, i.created_at,
                   e.id AS employer_ref_id, e.email AS employer_email,
                   e.first_name AS employer_first_name, e.last_name AS employer_last_name,
                   j.id AS job_ref_id, j.employer_id AS job_employer_id, j.title AS job_title,
                   j.location AS job_location, j.job_type AS job_type, j.work_mode AS job_work_mode,
                   j.application_deadline AS job_application_deadline, j.created_at AS job_created_at
            FROM invitations i
            JOIN users e ON e.id = i.employer_id
            LEFT JOIN jobs j ON j.id = i.job_id
            WHERE i.student_id = $1
            ORDER BY i.created_at DESC, i.id DESC
            "#,
        )
        .bind(student_id)
        .fetch_all(&self.pool)
        .await?;

        let items = rows
            .iter()
            .map(invitation_from_row)
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(items)
    }
}
