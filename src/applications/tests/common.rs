use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use axum::response::Response;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde_json::Value;

use crate::applicants::ApplicantId;
use crate::applications::domain::{Application, ApplicationId, ApplicationStatus};
use crate::applications::repository::{
    ApplicationEvent, ApplicationRepository, EventError, EventPublisher, RepositoryError,
};
use crate::applications::service::{AnswerUpdate, ApplicationService};
use crate::programs::{standard_program, ProgramId, ProgramRegistry};
use crate::questions::{Scalar, ScalarValue, ServiceAreaInclusion, ServiceAreaState};

pub(super) const PROGRAM_ID: ProgramId = 1;
pub(super) const APPLICANT_ID: ApplicantId = 11;

pub(super) fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap()
}

pub(super) fn registry() -> Arc<ProgramRegistry> {
    let mut registry = ProgramRegistry::default();
    registry
        .insert_draft(standard_program())
        .expect("blueprint inserts");
    registry.publish(PROGRAM_ID).expect("blueprint publishes");
    Arc::new(registry)
}

pub(super) fn build_service() -> (
    Arc<ApplicationService<MemoryRepository, MemoryEvents>>,
    Arc<MemoryRepository>,
    Arc<MemoryEvents>,
) {
    let repository = Arc::new(MemoryRepository::default());
    let events = Arc::new(MemoryEvents::default());
    let service = Arc::new(ApplicationService::new(
        registry(),
        repository.clone(),
        events.clone(),
    ));
    (service, repository, events)
}

pub(super) fn update(question_id: u64, pairs: Vec<(Scalar, ScalarValue)>) -> AnswerUpdate {
    let mut scalars = BTreeMap::new();
    for (scalar, value) in pairs {
        scalars.insert(scalar, value);
    }
    AnswerUpdate {
        question_id,
        scalars,
    }
}

pub(super) fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
}

/// Walk a well-formed applicant through every visible screen of the
/// standard program. `monthly_income_cents` controls income eligibility.
pub(super) fn fill_standard_program(
    service: &ApplicationService<MemoryRepository, MemoryEvents>,
    applicant_id: ApplicantId,
    monthly_income_cents: i64,
) {
    let answer_block = |block_id: &str, updates: Vec<AnswerUpdate>| {
        let outcome = service
            .update_block_answers(applicant_id, PROGRAM_ID, block_id, updates, now())
            .expect("block update succeeds");
        assert!(
            outcome.errors.is_empty(),
            "unexpected validation errors on screen {block_id}: {:?}",
            outcome.errors
        );
    };

    answer_block(
        "1",
        vec![
            update(
                1,
                vec![
                    (Scalar::FirstName, ScalarValue::Text("Ana".to_string())),
                    (Scalar::LastName, ScalarValue::Text("Silva".to_string())),
                ],
            ),
            update(2, vec![(Scalar::Date, ScalarValue::Date(date(1988, 3, 2)))]),
        ],
    );
    answer_block(
        "2",
        vec![
            update(3, vec![(Scalar::Number, ScalarValue::Long(2))]),
            update(
                4,
                vec![(Scalar::Selection, ScalarValue::Text("no".to_string()))],
            ),
        ],
    );
    answer_block(
        "3",
        vec![update(
            5,
            vec![(Scalar::CurrencyCents, ScalarValue::Long(monthly_income_cents))],
        )],
    );
    answer_block(
        "5",
        vec![update(
            6,
            vec![
                (Scalar::Street, ScalarValue::Text("100 Main St".to_string())),
                (Scalar::City, ScalarValue::Text("Springfield".to_string())),
                (Scalar::State, ScalarValue::Text("WA".to_string())),
                (Scalar::Zip, ScalarValue::Text("98101".to_string())),
                (
                    Scalar::ServiceAreas,
                    ScalarValue::ServiceAreas(vec![ServiceAreaInclusion {
                        area_id: "metro_county".to_string(),
                        state: ServiceAreaState::InArea,
                        timestamp: now().timestamp(),
                    }]),
                ),
            ],
        )],
    );
    // The utilities question is optional; submitting it blank records a skip.
    answer_block("6", vec![update(10, Vec::new())]);
    answer_block(
        "7",
        vec![update(
            7,
            vec![(
                Scalar::EntityName,
                ScalarValue::List(vec!["Luis".to_string()]),
            )],
        )],
    );
    answer_block(
        "8-0",
        vec![
            update(8, vec![(Scalar::Text, ScalarValue::Text("Son".to_string()))]),
            update(9, vec![(Scalar::Date, ScalarValue::Date(date(2010, 1, 5)))]),
        ],
    );
}

#[derive(Default, Clone)]
pub(super) struct MemoryRepository {
    records: Arc<Mutex<HashMap<ApplicationId, Application>>>,
}

impl MemoryRepository {
    pub(super) fn draft_for(
        &self,
        applicant_id: ApplicantId,
        program_id: ProgramId,
    ) -> Option<Application> {
        self.for_applicant(applicant_id, program_id)
            .expect("memory repository is infallible")
            .into_iter()
            .find(|application| application.status == ApplicationStatus::Draft)
    }
}

impl ApplicationRepository for MemoryRepository {
    fn insert(&self, application: Application) -> Result<Application, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        if guard.contains_key(&application.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(application.id.clone(), application.clone());
        Ok(application)
    }

    fn update(&self, application: Application) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        if guard.contains_key(&application.id) {
            guard.insert(application.id.clone(), application);
            Ok(())
        } else {
            Err(RepositoryError::NotFound)
        }
    }

    fn fetch(&self, id: &ApplicationId) -> Result<Option<Application>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn for_applicant(
        &self,
        applicant_id: ApplicantId,
        program_id: ProgramId,
    ) -> Result<Vec<Application>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        let mut matches: Vec<Application> = guard
            .values()
            .filter(|application| {
                application.applicant_id == applicant_id && application.program_id == program_id
            })
            .cloned()
            .collect();
        matches.sort_by(|a, b| a.id.0.cmp(&b.id.0));
        Ok(matches)
    }

    fn submitted(&self, program_id: ProgramId) -> Result<Vec<Application>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        let mut matches: Vec<Application> = guard
            .values()
            .filter(|application| {
                application.program_id == program_id
                    && application.status == ApplicationStatus::Submitted
            })
            .cloned()
            .collect();
        matches.sort_by(|a, b| a.id.0.cmp(&b.id.0));
        Ok(matches)
    }
}

#[derive(Default, Clone)]
pub(super) struct MemoryEvents {
    events: Arc<Mutex<Vec<ApplicationEvent>>>,
}

impl MemoryEvents {
    pub(super) fn events(&self) -> Vec<ApplicationEvent> {
        self.events.lock().expect("event mutex poisoned").clone()
    }
}

impl EventPublisher for MemoryEvents {
    fn publish(&self, event: ApplicationEvent) -> Result<(), EventError> {
        self.events
            .lock()
            .expect("event mutex poisoned")
            .push(event);
        Ok(())
    }
}

pub(super) struct UnavailableRepository;

impl ApplicationRepository for UnavailableRepository {
    fn insert(&self, _application: Application) -> Result<Application, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn update(&self, _application: Application) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn fetch(&self, _id: &ApplicationId) -> Result<Option<Application>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn for_applicant(
        &self,
        _applicant_id: ApplicantId,
        _program_id: ProgramId,
    ) -> Result<Vec<Application>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn submitted(&self, _program_id: ProgramId) -> Result<Vec<Application>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
