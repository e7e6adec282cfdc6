use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{Application, ApplicationId, ApplicationStatus};
use crate::applicants::ApplicantId;
use crate::programs::ProgramId;

/// Storage abstraction so the service module can be exercised in isolation.
pub trait ApplicationRepository: Send + Sync {
    fn insert(&self, application: Application) -> Result<Application, RepositoryError>;
    fn update(&self, application: Application) -> Result<(), RepositoryError>;
    fn fetch(&self, id: &ApplicationId) -> Result<Option<Application>, RepositoryError>;
    /// All applications for one applicant and program, any status.
    fn for_applicant(
        &self,
        applicant_id: ApplicantId,
        program_id: ProgramId,
    ) -> Result<Vec<Application>, RepositoryError>;
    /// Submitted (non-obsolete) applications for a program, for export.
    fn submitted(&self, program_id: ProgramId) -> Result<Vec<Application>, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Trait describing outbound notification hooks (caseworker queues, e-mail
/// adapters). Submissions and obsoletions flow through here.
pub trait EventPublisher: Send + Sync {
    fn publish(&self, event: ApplicationEvent) -> Result<(), EventError>;
}

/// Notification payload so routes and tests can assert integration
/// boundaries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationEvent {
    pub template: String,
    pub application_id: ApplicationId,
    pub details: BTreeMap<String, String>,
}

/// Event dispatch error.
#[derive(Debug, thiserror::Error)]
pub enum EventError {
    #[error("event transport unavailable: {0}")]
    Transport(String),
}

/// Sanitized representation of an application's exposed status.
#[derive(Debug, Clone, Serialize)]
pub struct ApplicationStatusView {
    pub application_id: ApplicationId,
    pub program_id: ProgramId,
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submitted_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eligible: Option<bool>,
}

impl ApplicationStatusView {
    pub fn from_application(application: &Application) -> Self {
        Self {
            application_id: application.id.clone(),
            program_id: application.program_id,
            status: application.status.label(),
            submitted_at: application.submitted_at,
            eligible: application.eligible,
        }
    }
}

impl Application {
    pub fn is_submitted(&self) -> bool {
        self.status == ApplicationStatus::Submitted
    }
}
