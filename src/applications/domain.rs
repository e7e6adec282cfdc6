use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::applicants::{AccountId, ApplicantData, ApplicantId};
use crate::programs::ProgramId;

/// Identifier wrapper for applications.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ApplicationId(pub String);

/// Lifecycle stage of an application. A new submission for the same
/// applicant and program obsoletes the previous one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApplicationStatus {
    Draft,
    Submitted,
    Obsolete,
}

impl ApplicationStatus {
    pub const fn label(self) -> &'static str {
        match self {
            ApplicationStatus::Draft => "draft",
            ApplicationStatus::Submitted => "submitted",
            ApplicationStatus::Obsolete => "obsolete",
        }
    }
}

/// Who sent the application in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum Submitter {
    Applicant,
    TrustedIntermediary { account_id: AccountId },
}

impl Submitter {
    pub const fn label(self) -> &'static str {
        match self {
            Submitter::Applicant => "applicant",
            Submitter::TrustedIntermediary { .. } => "trusted_intermediary",
        }
    }
}

/// An applicant's answers against one program version, draft or submitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Application {
    pub id: ApplicationId,
    pub applicant_id: ApplicantId,
    pub program_id: ProgramId,
    pub status: ApplicationStatus,
    pub submitter: Submitter,
    pub data: ApplicantData,
    pub submitted_at: Option<DateTime<Utc>>,
    /// Eligibility computed at submission time; drafts have none yet.
    pub eligible: Option<bool>,
}

impl Application {
    pub fn draft(id: ApplicationId, applicant_id: ApplicantId, program_id: ProgramId) -> Self {
        Self {
            id,
            applicant_id,
            program_id,
            status: ApplicationStatus::Draft,
            submitter: Submitter::Applicant,
            data: ApplicantData::default(),
            submitted_at: None,
            eligible: None,
        }
    }
}

/// What the applicant gets back after submitting.
#[derive(Debug, Clone, Serialize)]
pub struct SubmissionReceipt {
    pub application_id: ApplicationId,
    pub program_title: String,
    pub confirmation_message: String,
    pub submitted_at: DateTime<Utc>,
    pub eligible: bool,
}

/// Program listing entry shown before an applicant starts.
#[derive(Debug, Clone, Serialize)]
pub struct ProgramCard {
    pub program_id: ProgramId,
    pub title: String,
    pub description: String,
    pub block_count: usize,
    pub application_steps: Vec<ApplicationStepView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ApplicationStepView {
    pub title: String,
    pub description: String,
}

/// Where an applicant currently stands in a program.
#[derive(Debug, Clone, Serialize)]
pub struct ProgressView {
    pub program_id: ProgramId,
    pub completion_percent: u8,
    pub active_block_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_block_id: Option<String>,
    pub eligible_so_far: bool,
}
