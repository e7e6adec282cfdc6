//! Trusted intermediaries: community organizations whose staff apply to
//! programs on behalf of their clients.

pub mod router;
pub mod service;

pub use router::ti_router;
pub use service::{AddClientRequest, TiService, TiServiceError};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::applicants::{Account, AccountId, Applicant, ApplicantId};

pub type TiGroupId = u64;

/// An organization authorized to manage clients and submit on their behalf.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrustedIntermediaryGroup {
    pub id: TiGroupId,
    pub name: String,
    pub description: String,
    pub members: Vec<AccountId>,
}

impl TrustedIntermediaryGroup {
    pub fn is_member(&self, account_id: AccountId) -> bool {
        self.members.contains(&account_id)
    }
}

/// A client managed by a group: the login account plus the applicant record
/// applications are filed under.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TiClient {
    pub account: Account,
    pub applicant: Applicant,
}

/// Client listing entry exposed over the API.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TiClientView {
    pub applicant_id: ApplicantId,
    pub account_id: AccountId,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_of_birth: Option<NaiveDate>,
}

impl TiClientView {
    pub fn from_client(client: &TiClient) -> Self {
        Self {
            applicant_id: client.applicant.id,
            account_id: client.account.id,
            email: client.account.email.clone(),
            display_name: client.applicant.display_name.clone(),
            date_of_birth: client.applicant.date_of_birth,
        }
    }
}

/// Storage abstraction for groups and their clients.
pub trait TiRepository: Send + Sync {
    fn group(&self, group_id: TiGroupId) -> Result<Option<TrustedIntermediaryGroup>, TiRepositoryError>;
    fn clients(&self, group_id: TiGroupId) -> Result<Vec<TiClient>, TiRepositoryError>;
    fn insert_client(
        &self,
        group_id: TiGroupId,
        client: TiClient,
    ) -> Result<TiClient, TiRepositoryError>;
}

#[derive(Debug, thiserror::Error)]
pub enum TiRepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}
