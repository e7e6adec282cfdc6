//! Application intake: drafts, block-by-block answer updates, submission
//! with eligibility screening, and export of submitted applications.

pub mod domain;
pub mod export;
pub mod repository;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use domain::{
    Application, ApplicationId, ApplicationStatus, ApplicationStepView, ProgramCard, ProgressView,
    SubmissionReceipt, Submitter,
};
pub use export::{export_submitted_csv, ExportError};
pub use repository::{
    ApplicationEvent, ApplicationRepository, ApplicationStatusView, EventError, EventPublisher,
    RepositoryError,
};
pub use router::application_router;
pub use service::{
    AnswerProblem, AnswerUpdate, ApplicationService, ApplicationServiceError, BlockUpdateOutcome,
};
