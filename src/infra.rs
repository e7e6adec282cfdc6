//! In-memory adapters backing the server until a database tier lands, also
//! used by the end-to-end tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tracing::info;

use crate::applicants::ApplicantId;
use crate::applications::{
    Application, ApplicationEvent, ApplicationId, ApplicationRepository, ApplicationStatus,
    EventError, EventPublisher, RepositoryError,
};
use crate::intermediaries::{
    TiClient, TiGroupId, TiRepository, TiRepositoryError, TrustedIntermediaryGroup,
};
use crate::programs::ProgramId;

#[derive(Default, Clone)]
pub struct InMemoryApplicationRepository {
    records: Arc<Mutex<HashMap<ApplicationId, Application>>>,
}

impl ApplicationRepository for InMemoryApplicationRepository {
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

/// Publishes submission events to the log until a notification transport
/// is wired up, retaining them for inspection.
#[derive(Default, Clone)]
pub struct RecordingEventPublisher {
    events: Arc<Mutex<Vec<ApplicationEvent>>>,
}

impl RecordingEventPublisher {
    pub fn events(&self) -> Vec<ApplicationEvent> {
        self.events.lock().expect("event mutex poisoned").clone()
    }
}

impl EventPublisher for RecordingEventPublisher {
    fn publish(&self, event: ApplicationEvent) -> Result<(), EventError> {
        info!(
            template = %event.template,
            application_id = %event.application_id.0,
            "application event"
        );
        self.events
            .lock()
            .expect("event mutex poisoned")
            .push(event);
        Ok(())
    }
}

#[derive(Default, Clone)]
pub struct InMemoryTiRepository {
    groups: Arc<Mutex<HashMap<TiGroupId, TrustedIntermediaryGroup>>>,
    clients: Arc<Mutex<HashMap<TiGroupId, Vec<TiClient>>>>,
}

impl InMemoryTiRepository {
    pub fn add_group(&self, group: TrustedIntermediaryGroup) {
        self.groups
            .lock()
            .expect("group mutex poisoned")
            .insert(group.id, group);
    }
}

impl TiRepository for InMemoryTiRepository {
    fn group(
        &self,
        group_id: TiGroupId,
    ) -> Result<Option<TrustedIntermediaryGroup>, TiRepositoryError> {
        let guard = self.groups.lock().expect("group mutex poisoned");
        Ok(guard.get(&group_id).cloned())
    }

    fn clients(&self, group_id: TiGroupId) -> Result<Vec<TiClient>, TiRepositoryError> {
        let guard = self.clients.lock().expect("client mutex poisoned");
        Ok(guard.get(&group_id).cloned().unwrap_or_default())
    }

    fn insert_client(
        &self,
        group_id: TiGroupId,
        client: TiClient,
    ) -> Result<TiClient, TiRepositoryError> {
        let mut guard = self.clients.lock().expect("client mutex poisoned");
        let group_clients = guard.entry(group_id).or_default();
        if group_clients
            .iter()
            .any(|existing| existing.account.id == client.account.id)
        {
            return Err(TiRepositoryError::Conflict);
        }
        group_clients.push(client.clone());
        Ok(client)
    }
}
