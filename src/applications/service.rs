use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{
    Application, ApplicationId, ApplicationStatus, ApplicationStepView, ProgramCard, ProgressView,
    SubmissionReceipt, Submitter,
};
use super::repository::{
    ApplicationEvent, ApplicationRepository, ApplicationStatusView, EventError, EventPublisher,
    RepositoryError,
};
use crate::applicants::{
    Answer, AnswerKey, AnswerSummaryRow, ApplicantData, ApplicantId, ProgramProgressReader,
};
use crate::locale::DEFAULT_LOCALE;
use crate::programs::{ProgramDefinition, ProgramId, ProgramRegistry};
use crate::questions::{validate_answer, QuestionId, QuestionType, Scalar, ScalarValue};

/// Service composing the program registry, application repository, and
/// notification publisher.
pub struct ApplicationService<R, P> {
    programs: Arc<ProgramRegistry>,
    repository: Arc<R>,
    events: Arc<P>,
}

static APPLICATION_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_application_id() -> ApplicationId {
    let id = APPLICATION_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    ApplicationId(format!("app-{id:06}"))
}

/// One question's worth of scalar updates for a block.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerUpdate {
    pub question_id: QuestionId,
    /// Empty means the applicant submitted the question blank.
    pub scalars: BTreeMap<Scalar, ScalarValue>,
}

/// A rejected answer within a block update.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnswerProblem {
    pub question_id: QuestionId,
    pub message: String,
}

/// Result of a block update: either validation problems, or the applicant's
/// new position.
#[derive(Debug, Clone, Serialize)]
pub struct BlockUpdateOutcome {
    pub errors: Vec<AnswerProblem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_block_id: Option<String>,
    pub completion_percent: u8,
}

impl<R, P> ApplicationService<R, P>
where
    R: ApplicationRepository + 'static,
    P: EventPublisher + 'static,
{
    pub fn new(programs: Arc<ProgramRegistry>, repository: Arc<R>, events: Arc<P>) -> Self {
        Self {
            programs,
            repository,
            events,
        }
    }

    /// Cards for every program currently accepting applications.
    pub fn program_cards(&self) -> Vec<ProgramCard> {
        self.programs
            .active()
            .into_iter()
            .map(|program| ProgramCard {
                program_id: program.id,
                title: program.display_name.default_text().to_string(),
                description: program.description.default_text().to_string(),
                block_count: program.blocks.len(),
                application_steps: program
                    .application_steps
                    .iter()
                    .map(|step| ApplicationStepView {
                        title: step.title.default_text().to_string(),
                        description: step.description.default_text().to_string(),
                    })
                    .collect(),
            })
            .collect()
    }

    /// The applicant's draft for this program, creating one on first touch.
    pub fn get_or_create_draft(
        &self,
        applicant_id: ApplicantId,
        program_id: ProgramId,
    ) -> Result<Application, ApplicationServiceError> {
        let program = self.active_program(program_id)?;
        let existing = self.repository.for_applicant(applicant_id, program.id)?;
        if let Some(draft) = existing
            .into_iter()
            .find(|application| application.status == ApplicationStatus::Draft)
        {
            return Ok(draft);
        }

        let draft = Application::draft(next_application_id(), applicant_id, program.id);
        let stored = self.repository.insert(draft)?;
        Ok(stored)
    }

    /// Where the applicant stands without mutating anything.
    pub fn progress(
        &self,
        applicant_id: ApplicantId,
        program_id: ProgramId,
        now: DateTime<Utc>,
    ) -> Result<ProgressView, ApplicationServiceError> {
        let program = self.active_program(program_id)?;
        let existing = self.repository.for_applicant(applicant_id, program.id)?;
        let empty = ApplicantData::default();
        let data = existing
            .iter()
            .find(|application| application.status == ApplicationStatus::Draft)
            .map(|application| &application.data)
            .unwrap_or(&empty);

        let reader = ProgramProgressReader::new(program, data, now.date_naive());
        Ok(ProgressView {
            program_id: program.id,
            completion_percent: reader.completion_percent(),
            active_block_count: reader.active_blocks().len(),
            current_block_id: reader.next_incomplete_block().map(|block| block.id),
            eligible_so_far: reader.ineligible_questions().is_empty(),
        })
    }

    /// Validate and store one block's answers, returning the applicant's new
    /// position or the validation problems that kept the block unsaved.
    pub fn update_block_answers(
        &self,
        applicant_id: ApplicantId,
        program_id: ProgramId,
        block_id: &str,
        updates: Vec<AnswerUpdate>,
        now: DateTime<Utc>,
    ) -> Result<BlockUpdateOutcome, ApplicationServiceError> {
        let program = self.active_program(program_id)?;
        let mut draft = self.get_or_create_draft(applicant_id, program_id)?;
        let today = now.date_naive();

        let block = {
            let reader = ProgramProgressReader::new(program, &draft.data, today);
            reader
                .block(block_id)
                .ok_or_else(|| ApplicationServiceError::UnknownBlock(block_id.to_string()))?
        };

        let mut problems = Vec::new();
        let mut staged: Vec<(AnswerKey, Answer, QuestionType)> = Vec::new();
        for update in updates {
            let Some(question) = block.question(update.question_id) else {
                problems.push(AnswerProblem {
                    question_id: update.question_id,
                    message: "question is not part of this screen".to_string(),
                });
                continue;
            };
            if question.is_static() {
                problems.push(AnswerProblem {
                    question_id: update.question_id,
                    message: "static content cannot be answered".to_string(),
                });
                continue;
            }
            let Some(key) = question.key.clone() else {
                problems.push(AnswerProblem {
                    question_id: update.question_id,
                    message: "question cannot be answered in this context".to_string(),
                });
                continue;
            };

            if update.scalars.is_empty() {
                if question.optional {
                    staged.push((
                        key,
                        Answer::skipped(program.id, now.timestamp()),
                        question.definition.question_type,
                    ));
                } else {
                    problems.push(AnswerProblem {
                        question_id: update.question_id,
                        message: "answer is required".to_string(),
                    });
                }
                continue;
            }

            let issues = validate_answer(&question.definition, &update.scalars);
            if issues.is_empty() {
                staged.push((
                    key,
                    Answer::new(update.scalars, program.id, now.timestamp()),
                    question.definition.question_type,
                ));
            } else {
                problems.extend(issues.into_iter().map(|issue| AnswerProblem {
                    question_id: update.question_id,
                    message: issue.to_string(),
                }));
            }
        }

        if !problems.is_empty() {
            let reader = ProgramProgressReader::new(program, &draft.data, today);
            return Ok(BlockUpdateOutcome {
                errors: problems,
                next_block_id: None,
                completion_percent: reader.completion_percent(),
            });
        }

        for (key, answer, question_type) in staged {
            if question_type == QuestionType::Enumerator {
                let kept = match answer.scalars.get(&Scalar::EntityName) {
                    Some(ScalarValue::List(names)) => names.len(),
                    _ => 0,
                };
                prune_removed_entities(program, &mut draft.data, key.question_id, &key.entity_path, kept);
            }
            draft.data.put_answer(key, answer);
        }
        self.repository.update(draft.clone())?;

        let reader = ProgramProgressReader::new(program, &draft.data, today);
        Ok(BlockUpdateOutcome {
            errors: Vec::new(),
            next_block_id: reader.block_after(block_id).map(|block| block.id),
            completion_percent: reader.completion_percent(),
        })
    }

    /// Submit the draft. Every visible block must be complete; eligibility is
    /// computed and recorded but an ineligible application is still accepted.
    pub fn submit(
        &self,
        applicant_id: ApplicantId,
        program_id: ProgramId,
        submitter: Submitter,
        now: DateTime<Utc>,
    ) -> Result<SubmissionReceipt, ApplicationServiceError> {
        let program = self.active_program(program_id)?;
        let applications = self.repository.for_applicant(applicant_id, program.id)?;
        let mut draft = applications
            .iter()
            .find(|application| application.status == ApplicationStatus::Draft)
            .cloned()
            .ok_or(ApplicationServiceError::NoDraft)?;

        let eligible = {
            let reader = ProgramProgressReader::new(program, &draft.data, now.date_naive());
            if let Some(block) = reader.next_incomplete_block() {
                return Err(ApplicationServiceError::Incomplete { block_id: block.id });
            }
            reader.is_application_eligible()
        };

        for application in applications {
            if application.status == ApplicationStatus::Submitted {
                let mut obsolete = application;
                obsolete.status = ApplicationStatus::Obsolete;
                self.repository.update(obsolete)?;
            }
        }

        draft.status = ApplicationStatus::Submitted;
        draft.submitter = submitter;
        draft.submitted_at = Some(now);
        draft.eligible = Some(eligible);
        self.repository.update(draft.clone())?;

        let mut details = BTreeMap::new();
        details.insert("program".to_string(), program.admin_name.clone());
        details.insert("eligible".to_string(), eligible.to_string());
        details.insert("submitter".to_string(), submitter.label().to_string());
        self.events.publish(ApplicationEvent {
            template: "application_submitted".to_string(),
            application_id: draft.id.clone(),
            details,
        })?;

        Ok(SubmissionReceipt {
            application_id: draft.id,
            program_title: program.display_name.get(DEFAULT_LOCALE).to_string(),
            confirmation_message: program.confirmation_message.get(DEFAULT_LOCALE).to_string(),
            submitted_at: now,
            eligible,
        })
    }

    /// Review-screen rows over the applicant's latest answers: the open
    /// draft if one exists, otherwise the most recent submission.
    pub fn summary(
        &self,
        applicant_id: ApplicantId,
        program_id: ProgramId,
        now: DateTime<Utc>,
    ) -> Result<Vec<AnswerSummaryRow>, ApplicationServiceError> {
        let program = self.active_program(program_id)?;
        let applications = self.repository.for_applicant(applicant_id, program.id)?;
        let empty = ApplicantData::default();
        let data = applications
            .iter()
            .find(|application| application.status == ApplicationStatus::Draft)
            .or_else(|| {
                applications
                    .iter()
                    .find(|application| application.status == ApplicationStatus::Submitted)
            })
            .map(|application| &application.data)
            .unwrap_or(&empty);

        let reader = ProgramProgressReader::new(program, data, now.date_naive());
        Ok(reader.default_locale_summary())
    }

    /// Fetch an application's current status for API responses.
    pub fn status(
        &self,
        application_id: &ApplicationId,
    ) -> Result<ApplicationStatusView, ApplicationServiceError> {
        let application = self
            .repository
            .fetch(application_id)?
            .ok_or(RepositoryError::NotFound)?;
        Ok(ApplicationStatusView::from_application(&application))
    }

    fn active_program(
        &self,
        program_id: ProgramId,
    ) -> Result<&ProgramDefinition, ApplicationServiceError> {
        self.programs
            .get_active(program_id)
            .ok_or(ApplicationServiceError::UnknownProgram(program_id))
    }
}

/// Drop answers for entities removed from an enumerator, cascading through
/// nested enumerators.
fn prune_removed_entities(
    program: &ProgramDefinition,
    data: &mut ApplicantData,
    enumerator_id: QuestionId,
    parent_path: &[usize],
    kept: usize,
) {
    let removable: Vec<AnswerKey> = data
        .answers()
        .filter_map(|(key, _)| {
            let question = program.question(key.question_id)?;
            if question.enumerator_id != Some(enumerator_id) {
                return None;
            }
            let (last, prefix) = key.entity_path.split_last()?;
            if prefix == parent_path && *last >= kept {
                Some(key.clone())
            } else {
                None
            }
        })
        .collect();

    for key in &removable {
        data.remove_answer(key);
    }

    for key in &removable {
        if let Some(question) = program.question(key.question_id) {
            if question.question_type == QuestionType::Enumerator {
                // Everything under the removed nested enumerator goes too.
                prune_removed_entities(program, data, question.id, &key.entity_path, 0);
            }
        }
    }
}

/// Error raised by the application service.
#[derive(Debug, thiserror::Error)]
pub enum ApplicationServiceError {
    #[error("program {0} is not accepting applications")]
    UnknownProgram(ProgramId),
    #[error("screen {0} not found")]
    UnknownBlock(String),
    #[error("no draft application to submit")]
    NoDraft,
    #[error("application incomplete: screen {block_id} still needs answers")]
    Incomplete { block_id: String },
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Event(#[from] EventError),
}
