//! Question definitions: the reusable form fields programs assemble into
//! screens, each exposing typed scalars and validation rules.

mod scalar;

pub use scalar::{Scalar, ScalarType, ScalarValue, ServiceAreaInclusion, ServiceAreaState};

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::locale::LocalizedStrings;

pub type QuestionId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    Text,
    Number,
    Currency,
    Date,
    Dropdown,
    Checkbox,
    Radio,
    Address,
    Name,
    Email,
    Phone,
    Enumerator,
    FileUpload,
    Static,
}

impl QuestionType {
    pub const fn label(self) -> &'static str {
        match self {
            QuestionType::Text => "text",
            QuestionType::Number => "number",
            QuestionType::Currency => "currency",
            QuestionType::Date => "date",
            QuestionType::Dropdown => "dropdown",
            QuestionType::Checkbox => "checkbox",
            QuestionType::Radio => "radio",
            QuestionType::Address => "address",
            QuestionType::Name => "name",
            QuestionType::Email => "email",
            QuestionType::Phone => "phone",
            QuestionType::Enumerator => "enumerator",
            QuestionType::FileUpload => "file_upload",
            QuestionType::Static => "static",
        }
    }

    pub const fn is_multi_option(self) -> bool {
        matches!(
            self,
            QuestionType::Dropdown | QuestionType::Checkbox | QuestionType::Radio
        )
    }

    /// Scalars an applicant must fill in for the question to count as answered.
    pub const fn required_scalars(self) -> &'static [Scalar] {
        match self {
            QuestionType::Text => &[Scalar::Text],
            QuestionType::Number => &[Scalar::Number],
            QuestionType::Currency => &[Scalar::CurrencyCents],
            QuestionType::Date => &[Scalar::Date],
            QuestionType::Dropdown | QuestionType::Radio => &[Scalar::Selection],
            QuestionType::Checkbox => &[Scalar::Selections],
            QuestionType::Address => &[Scalar::Street, Scalar::City, Scalar::State, Scalar::Zip],
            QuestionType::Name => &[Scalar::FirstName, Scalar::LastName],
            QuestionType::Email => &[Scalar::Email],
            QuestionType::Phone => &[Scalar::PhoneNumber],
            QuestionType::Enumerator => &[Scalar::EntityName],
            QuestionType::FileUpload => &[Scalar::FileKey],
            QuestionType::Static => &[],
        }
    }

    /// All scalars the question accepts, including optional ones.
    pub const fn allowed_scalars(self) -> &'static [Scalar] {
        match self {
            QuestionType::Address => &[
                Scalar::Street,
                Scalar::City,
                Scalar::State,
                Scalar::Zip,
                Scalar::ServiceAreas,
            ],
            QuestionType::Name => &[Scalar::FirstName, Scalar::MiddleName, Scalar::LastName],
            other => other.required_scalars(),
        }
    }
}

/// One selectable choice on a multi-option question. Predicates and stored
/// answers reference choices by `admin_name`, never by translated text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionOption {
    pub id: u64,
    pub admin_name: String,
    pub text: LocalizedStrings,
}

/// Per-type validation dials, all optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationRules {
    pub min_length: Option<u32>,
    pub max_length: Option<u32>,
    pub min_value: Option<i64>,
    pub max_value: Option<i64>,
    pub min_choices: Option<u32>,
    pub max_choices: Option<u32>,
    pub min_entities: Option<u32>,
    pub max_entities: Option<u32>,
}

/// A versioned, reusable question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionDefinition {
    pub id: QuestionId,
    pub admin_name: String,
    pub question_text: LocalizedStrings,
    pub help_text: LocalizedStrings,
    pub question_type: QuestionType,
    /// Enumerator question this one repeats under, if any.
    pub enumerator_id: Option<QuestionId>,
    pub validation: ValidationRules,
    pub options: Vec<QuestionOption>,
}

impl QuestionDefinition {
    pub fn new(
        id: QuestionId,
        admin_name: impl Into<String>,
        question_text: LocalizedStrings,
        question_type: QuestionType,
    ) -> Self {
        Self {
            id,
            admin_name: admin_name.into(),
            question_text,
            help_text: LocalizedStrings::of(""),
            question_type,
            enumerator_id: None,
            validation: ValidationRules::default(),
            options: Vec::new(),
        }
    }

    pub fn with_help_text(mut self, help_text: LocalizedStrings) -> Self {
        self.help_text = help_text;
        self
    }

    pub fn with_enumerator(mut self, enumerator_id: QuestionId) -> Self {
        self.enumerator_id = Some(enumerator_id);
        self
    }

    pub fn with_validation(mut self, validation: ValidationRules) -> Self {
        self.validation = validation;
        self
    }

    pub fn with_options(mut self, options: Vec<QuestionOption>) -> Self {
        self.options = options;
        self
    }

    fn option_names(&self) -> Vec<&str> {
        self.options
            .iter()
            .map(|option| option.admin_name.as_str())
            .collect()
    }
}

/// A validation failure for a single scalar of an answer.
#[derive(Debug, Clone, PartialEq, Serialize, thiserror::Error)]
pub enum AnswerIssue {
    #[error("{scalar:?} is required")]
    Missing { scalar: Scalar },
    #[error("{scalar:?} is not accepted by this question")]
    Unexpected { scalar: Scalar },
    #[error("{scalar:?} expected {expected:?} but got {actual:?}")]
    TypeMismatch {
        scalar: Scalar,
        expected: ScalarType,
        actual: ScalarType,
    },
    #[error("answer must be at least {min} characters")]
    TooShort { min: u32 },
    #[error("answer must be at most {max} characters")]
    TooLong { max: u32 },
    #[error("number must be at least {min}")]
    TooSmall { min: i64 },
    #[error("number must be at most {max}")]
    TooLarge { max: i64 },
    #[error("select at least {min} options")]
    TooFewChoices { min: u32 },
    #[error("select at most {max} options")]
    TooManyChoices { max: u32 },
    #[error("'{name}' is not one of this question's options")]
    UnknownOption { name: String },
    #[error("add at least {min} entries")]
    TooFewEntities { min: u32 },
    #[error("add at most {max} entries")]
    TooManyEntities { max: u32 },
    #[error("entries must have non-empty, unique names")]
    InvalidEntityNames,
    #[error("'{value}' is not a valid email address")]
    InvalidEmail { value: String },
}

/// Validate the filled scalars of an answer against a question.
///
/// An empty scalar map is an unanswered question, not an invalid one, and
/// yields no issues. Once any scalar is present, all required scalars must be.
pub fn validate_answer(
    question: &QuestionDefinition,
    scalars: &BTreeMap<Scalar, ScalarValue>,
) -> Vec<AnswerIssue> {
    let mut issues = Vec::new();
    if scalars.is_empty() {
        return issues;
    }

    let allowed = question.question_type.allowed_scalars();
    for scalar in scalars.keys() {
        if !allowed.contains(scalar) {
            issues.push(AnswerIssue::Unexpected { scalar: *scalar });
        }
    }

    for scalar in question.question_type.required_scalars() {
        if !scalars.contains_key(scalar) {
            issues.push(AnswerIssue::Missing { scalar: *scalar });
        }
    }

    for (scalar, value) in scalars {
        if !allowed.contains(scalar) {
            continue;
        }
        if value.scalar_type() != scalar.scalar_type() {
            issues.push(AnswerIssue::TypeMismatch {
                scalar: *scalar,
                expected: scalar.scalar_type(),
                actual: value.scalar_type(),
            });
            continue;
        }
        validate_scalar(question, *scalar, value, &mut issues);
    }

    issues
}

fn validate_scalar(
    question: &QuestionDefinition,
    scalar: Scalar,
    value: &ScalarValue,
    issues: &mut Vec<AnswerIssue>,
) {
    let rules = &question.validation;
    match (scalar, value) {
        (Scalar::Text, ScalarValue::Text(text)) => {
            let length = text.chars().count() as u32;
            if let Some(min) = rules.min_length {
                if length < min {
                    issues.push(AnswerIssue::TooShort { min });
                }
            }
            if let Some(max) = rules.max_length {
                if length > max {
                    issues.push(AnswerIssue::TooLong { max });
                }
            }
        }
        (Scalar::Number | Scalar::CurrencyCents, ScalarValue::Long(number)) => {
            if let Some(min) = rules.min_value {
                if *number < min {
                    issues.push(AnswerIssue::TooSmall { min });
                }
            }
            if let Some(max) = rules.max_value {
                if *number > max {
                    issues.push(AnswerIssue::TooLarge { max });
                }
            }
        }
        (Scalar::Selection, ScalarValue::Text(choice)) => {
            if !question.option_names().contains(&choice.as_str()) {
                issues.push(AnswerIssue::UnknownOption {
                    name: choice.clone(),
                });
            }
        }
        (Scalar::Selections, ScalarValue::List(choices)) => {
            let count = choices.len() as u32;
            if let Some(min) = rules.min_choices {
                if count < min {
                    issues.push(AnswerIssue::TooFewChoices { min });
                }
            }
            if let Some(max) = rules.max_choices {
                if count > max {
                    issues.push(AnswerIssue::TooManyChoices { max });
                }
            }
            let known = question.option_names();
            for choice in choices {
                if !known.contains(&choice.as_str()) {
                    issues.push(AnswerIssue::UnknownOption {
                        name: choice.clone(),
                    });
                }
            }
        }
        (Scalar::EntityName, ScalarValue::List(names)) => {
            let count = names.len() as u32;
            if let Some(min) = rules.min_entities {
                if count < min {
                    issues.push(AnswerIssue::TooFewEntities { min });
                }
            }
            if let Some(max) = rules.max_entities {
                if count > max {
                    issues.push(AnswerIssue::TooManyEntities { max });
                }
            }
            let mut seen = Vec::with_capacity(names.len());
            for name in names {
                let trimmed = name.trim();
                if trimmed.is_empty() || seen.contains(&trimmed) {
                    issues.push(AnswerIssue::InvalidEntityNames);
                    break;
                }
                seen.push(trimmed);
            }
        }
        (Scalar::Email, ScalarValue::Text(address)) => {
            if !address.contains('@') || address.starts_with('@') || address.ends_with('@') {
                issues.push(AnswerIssue::InvalidEmail {
                    value: address.clone(),
                });
            }
        }
        _ => {}
    }
}
