use std::sync::Arc;

use crate::database::store::JobBoardStore;
use crate::error::{Error, Result};
use crate::models::invitation::{Invitation, InvitationDetails, NewInvitation};
use crate::models::user::{Actor, Role};

#[derive(Clone)]
pub struct InvitationService {
    store: Arc<dyn JobBoardStore>,
}

impl InvitationService {
    pub fn new(store: Arc<dyn JobBoardStore>) -> Self {
        Self { store }
    }

    pub async fn create(
        &self,
        actor: &Actor,
        student_id: i32,
        job_id: Option<i32>,
    ) -> Result<Invitation> {
        actor.require_role(Role::Employer)?;
        if student_id <= 0 {
            return Err(Error::BadRequest("studentId required".to_string()));
        }

        let student = self
            .store
            .find_user(student_id)
            .await?
            .ok_or_else(|| Error::NotFound("Student not found".to_string()))?;
        if student.role != Role::Student {
            return Err(Error::BadRequest("Target user is not a student".to_string()));
        }

        if let Some(job_id) = job_id {
            let job = self
                .store
                .find_job(job_id)
                .await?
                .ok_or_else(|| Error::NotFound("Job not found".to_string()))?;
            if !job.is_owned_by(actor.id) {
                return Err(Error::Forbidden("Forbidden: not your job".to_string()));
            }
        }

        let invitation = self
            .store
            .create_invitation(NewInvitation {
                employer_id: actor.id,
                student_id,
                job_id,
            })
            .await?;
        tracing::info!(
            invitation_id = invitation.id,
            employer_id = actor.id,
            student_id,
            "invitation created"
        );
        Ok(invitation)
    }

    pub async fn list_mine(&self, actor: &Actor) -> Result<Vec<InvitationDetails>> {
        actor.require_role(Role::Student)?;
        self.store.list_invitations_for_student(actor.id).await
    }
}
