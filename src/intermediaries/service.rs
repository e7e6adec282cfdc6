use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::NaiveDate;
use serde::Deserialize;

use super::{TiClient, TiClientView, TiGroupId, TiRepository, TiRepositoryError};
use crate::applicants::{Account, Applicant};

static CLIENT_SEQUENCE: AtomicU64 = AtomicU64::new(1_000);

#[derive(Debug, Clone, Deserialize)]
pub struct AddClientRequest {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub date_of_birth: Option<NaiveDate>,
}

/// Client management for trusted-intermediary groups.
pub struct TiService<T> {
    repository: Arc<T>,
}

impl<T> TiService<T>
where
    T: TiRepository + 'static,
{
    pub fn new(repository: Arc<T>) -> Self {
        Self { repository }
    }

    /// Create a client account and applicant under the group.
    pub fn add_client(
        &self,
        group_id: TiGroupId,
        request: AddClientRequest,
    ) -> Result<TiClientView, TiServiceError> {
        self.repository
            .group(group_id)?
            .ok_or(TiServiceError::UnknownGroup(group_id))?;

        let email = request.email.trim().to_string();
        if !email.contains('@') || email.starts_with('@') || email.ends_with('@') {
            return Err(TiServiceError::InvalidEmail(email));
        }

        let existing = self.repository.clients(group_id)?;
        if existing
            .iter()
            .any(|client| client.account.email.eq_ignore_ascii_case(&email))
        {
            return Err(TiServiceError::DuplicateClientEmail(email));
        }

        let account_id = CLIENT_SEQUENCE.fetch_add(1, Ordering::Relaxed);
        let applicant_id = CLIENT_SEQUENCE.fetch_add(1, Ordering::Relaxed);
        let display_name = format!("{} {}", request.first_name.trim(), request.last_name.trim());
        let client = TiClient {
            account: Account {
                id: account_id,
                email,
            },
            applicant: Applicant {
                id: applicant_id,
                account_id,
                display_name: Some(display_name),
                date_of_birth: request.date_of_birth,
            },
        };

        let stored = self.repository.insert_client(group_id, client)?;
        Ok(TiClientView::from_client(&stored))
    }

    /// Clients managed by the group, in insertion order.
    pub fn clients(&self, group_id: TiGroupId) -> Result<Vec<TiClientView>, TiServiceError> {
        self.repository
            .group(group_id)?
            .ok_or(TiServiceError::UnknownGroup(group_id))?;
        let clients = self.repository.clients(group_id)?;
        Ok(clients.iter().map(TiClientView::from_client).collect())
    }
}

/// Error raised by the TI service.
#[derive(Debug, thiserror::Error)]
pub enum TiServiceError {
    #[error("trusted intermediary group {0} not found")]
    UnknownGroup(TiGroupId),
    #[error("a client with email '{0}' already exists in this group")]
    DuplicateClientEmail(String),
    #[error("'{0}' is not a valid email address")]
    InvalidEmail(String),
    #[error(transparent)]
    Repository(#[from] TiRepositoryError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::InMemoryTiRepository;
    use crate::intermediaries::TrustedIntermediaryGroup;

    fn service_with_group() -> TiService<InMemoryTiRepository> {
        let repository = Arc::new(InMemoryTiRepository::default());
        repository.add_group(TrustedIntermediaryGroup {
            id: 1,
            name: "Community Action Partnership".to_string(),
            description: "Regional assistance organization".to_string(),
            members: vec![77],
        });
        TiService::new(repository)
    }

    fn request(email: &str) -> AddClientRequest {
        AddClientRequest {
            email: email.to_string(),
            first_name: "Maria".to_string(),
            last_name: "Gomez".to_string(),
            date_of_birth: NaiveDate::from_ymd_opt(1975, 9, 12),
        }
    }

    #[test]
    fn add_client_creates_account_and_applicant() {
        let service = service_with_group();
        let view = service
            .add_client(1, request("maria@example.com"))
            .expect("client adds");
        assert_eq!(view.email, "maria@example.com");
        assert_eq!(view.display_name.as_deref(), Some("Maria Gomez"));
        assert_ne!(view.account_id, view.applicant_id);

        let listed = service.clients(1).expect("clients list");
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].applicant_id, view.applicant_id);
    }

    #[test]
    fn duplicate_client_emails_are_rejected_case_insensitively() {
        let service = service_with_group();
        service
            .add_client(1, request("maria@example.com"))
            .expect("first client adds");
        let result = service.add_client(1, request("Maria@Example.com"));
        assert!(matches!(
            result,
            Err(TiServiceError::DuplicateClientEmail(_))
        ));
    }

    #[test]
    fn unknown_groups_are_rejected() {
        let service = service_with_group();
        assert!(matches!(
            service.clients(9),
            Err(TiServiceError::UnknownGroup(9))
        ));
        assert!(matches!(
            service.add_client(9, request("maria@example.com")),
            Err(TiServiceError::UnknownGroup(9))
        ));
    }

    #[test]
    fn malformed_emails_are_rejected() {
        let service = service_with_group();
        assert!(matches!(
            service.add_client(1, request("not-an-email")),
            Err(TiServiceError::InvalidEmail(_))
        ));
    }
}
