use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Named answer fields a question exposes to the applicant form and to
/// screening predicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scalar {
    Text,
    FirstName,
    MiddleName,
    LastName,
    Email,
    PhoneNumber,
    Number,
    CurrencyCents,
    Date,
    Selection,
    Selections,
    Street,
    City,
    State,
    Zip,
    ServiceAreas,
    EntityName,
    FileKey,
}

impl Scalar {
    pub const fn scalar_type(self) -> ScalarType {
        match self {
            Scalar::Text
            | Scalar::FirstName
            | Scalar::MiddleName
            | Scalar::LastName
            | Scalar::Email
            | Scalar::PhoneNumber
            | Scalar::Selection
            | Scalar::Street
            | Scalar::City
            | Scalar::State
            | Scalar::Zip
            | Scalar::FileKey => ScalarType::String,
            Scalar::Number | Scalar::CurrencyCents => ScalarType::Long,
            Scalar::Date => ScalarType::Date,
            Scalar::Selections | Scalar::EntityName => ScalarType::ListOfStrings,
            Scalar::ServiceAreas => ScalarType::ServiceArea,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Scalar::Text => "text",
            Scalar::FirstName => "first_name",
            Scalar::MiddleName => "middle_name",
            Scalar::LastName => "last_name",
            Scalar::Email => "email",
            Scalar::PhoneNumber => "phone_number",
            Scalar::Number => "number",
            Scalar::CurrencyCents => "currency_cents",
            Scalar::Date => "date",
            Scalar::Selection => "selection",
            Scalar::Selections => "selections",
            Scalar::Street => "street",
            Scalar::City => "city",
            Scalar::State => "state",
            Scalar::Zip => "zip",
            Scalar::ServiceAreas => "service_areas",
            Scalar::EntityName => "entity_name",
            Scalar::FileKey => "file_key",
        }
    }
}

/// Storage type backing a scalar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScalarType {
    String,
    Long,
    Date,
    ListOfStrings,
    ServiceArea,
}

/// A typed answer value stored against a scalar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScalarValue {
    Text(String),
    Long(i64),
    Date(NaiveDate),
    List(Vec<String>),
    ServiceAreas(Vec<ServiceAreaInclusion>),
}

impl ScalarValue {
    pub const fn scalar_type(&self) -> ScalarType {
        match self {
            ScalarValue::Text(_) => ScalarType::String,
            ScalarValue::Long(_) => ScalarType::Long,
            ScalarValue::Date(_) => ScalarType::Date,
            ScalarValue::List(_) => ScalarType::ListOfStrings,
            ScalarValue::ServiceAreas(_) => ScalarType::ServiceArea,
        }
    }

    /// Human-readable rendering used by the review summary and CSV export.
    pub fn display(&self) -> String {
        match self {
            ScalarValue::Text(value) => value.clone(),
            ScalarValue::Long(value) => value.to_string(),
            ScalarValue::Date(value) => value.format("%Y-%m-%d").to_string(),
            ScalarValue::List(values) => values.join(", "),
            ScalarValue::ServiceAreas(inclusions) => inclusions
                .iter()
                .map(|inclusion| {
                    format!("{} ({})", inclusion.area_id, inclusion.state.label())
                })
                .collect::<Vec<_>>()
                .join(", "),
        }
    }
}

/// Result of checking an address against a configured service area.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceAreaInclusion {
    pub area_id: String,
    pub state: ServiceAreaState,
    pub timestamp: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceAreaState {
    InArea,
    NotInArea,
    Failed,
}

impl ServiceAreaState {
    pub const fn label(self) -> &'static str {
        match self {
            ServiceAreaState::InArea => "in_area",
            ServiceAreaState::NotInArea => "not_in_area",
            ServiceAreaState::Failed => "failed",
        }
    }
}
