//! Applicant identity and answer storage: the scalar answers an applicant
//! has provided, keyed by question and repeated-entity position, plus the
//! metadata needed to tell which program an answer was given in.

mod block;
mod progress;

pub use block::{ApplicantQuestion, Block};
pub use progress::{AnswerSummaryRow, ProgramProgressReader};

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::predicates::{AnswerLookup, PredicateDefinition};
use crate::programs::{ProgramDefinition, ProgramId};
use crate::questions::{QuestionDefinition, QuestionId, Scalar, ScalarValue};

pub type ApplicantId = u64;
pub type AccountId = u64;

/// Login identity. Trusted-intermediary membership and managed clients are
/// tracked by the intermediaries module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub email: String,
}

/// A person applying to programs. Answers live on the draft application,
/// not here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Applicant {
    pub id: ApplicantId,
    pub account_id: AccountId,
    pub display_name: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
}

/// Where an answer lives: the question plus the repeated-entity indices
/// leading to it. Top-level answers have an empty path; an answer for the
/// second job of the first household member has path `[0, 1]`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AnswerKey {
    pub question_id: QuestionId,
    pub entity_path: Vec<usize>,
}

impl AnswerKey {
    pub fn top(question_id: QuestionId) -> Self {
        Self {
            question_id,
            entity_path: Vec::new(),
        }
    }

    pub fn nested(question_id: QuestionId, entity_path: Vec<usize>) -> Self {
        Self {
            question_id,
            entity_path,
        }
    }
}

/// The scalar values an applicant supplied for one question, plus metadata.
///
/// An answer with no scalars but metadata present records an optional
/// question the applicant intentionally left blank.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    pub scalars: BTreeMap<Scalar, ScalarValue>,
    pub updated_in_program: Option<ProgramId>,
    pub updated_at: i64,
}

impl Answer {
    pub fn new(
        scalars: BTreeMap<Scalar, ScalarValue>,
        program_id: ProgramId,
        updated_at: i64,
    ) -> Self {
        Self {
            scalars,
            updated_in_program: Some(program_id),
            updated_at,
        }
    }

    /// Marker for an optional question submitted blank.
    pub fn skipped(program_id: ProgramId, updated_at: i64) -> Self {
        Self {
            scalars: BTreeMap::new(),
            updated_in_program: Some(program_id),
            updated_at,
        }
    }

    pub fn is_skipped(&self) -> bool {
        self.scalars.is_empty()
    }
}

/// All answers an applicant has given, across programs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApplicantData {
    answers: BTreeMap<AnswerKey, Answer>,
    pub preferred_locale: Option<String>,
}

impl ApplicantData {
    pub fn put_answer(&mut self, key: AnswerKey, answer: Answer) {
        self.answers.insert(key, answer);
    }

    pub fn answer(&self, key: &AnswerKey) -> Option<&Answer> {
        self.answers.get(key)
    }

    pub fn remove_answer(&mut self, key: &AnswerKey) -> Option<Answer> {
        self.answers.remove(key)
    }

    pub fn scalar(&self, key: &AnswerKey, scalar: Scalar) -> Option<&ScalarValue> {
        self.answers.get(key).and_then(|answer| answer.scalars.get(&scalar))
    }

    /// An answer exists and carries at least one scalar value.
    pub fn has_answer(&self, key: &AnswerKey) -> bool {
        self.answers
            .get(key)
            .is_some_and(|answer| !answer.scalars.is_empty())
    }

    /// Entity names enumerated by an enumerator question, in entry order.
    pub fn entity_names(&self, enumerator_id: QuestionId, parent_path: &[usize]) -> Vec<String> {
        let key = AnswerKey::nested(enumerator_id, parent_path.to_vec());
        match self.scalar(&key, Scalar::EntityName) {
            Some(ScalarValue::List(names)) => names.clone(),
            _ => Vec::new(),
        }
    }

    pub fn answers(&self) -> impl Iterator<Item = (&AnswerKey, &Answer)> {
        self.answers.iter()
    }
}

/// One repeated entity (e.g. a household member) an applicant enumerated,
/// with the chain of enclosing entities and the visibility predicates
/// inherited from enclosing enumerator blocks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepeatedEntity {
    pub enumerator_id: QuestionId,
    pub index: usize,
    pub name: String,
    pub parent: Option<Box<RepeatedEntity>>,
    pub nested_visibility: Vec<PredicateDefinition>,
}

impl RepeatedEntity {
    /// Entities enumerated by `enumerator` under `parent` (top level when
    /// `parent` is `None`). Each carries the enclosing blocks' visibility
    /// predicates so hidden enumerators hide their nested screens too.
    pub fn create_all(
        enumerator: &QuestionDefinition,
        visibility: Option<&PredicateDefinition>,
        data: &ApplicantData,
        parent: Option<&RepeatedEntity>,
    ) -> Vec<RepeatedEntity> {
        let parent_path = parent.map(RepeatedEntity::entity_path).unwrap_or_default();
        let mut nested_visibility =
            parent.map(|entity| entity.nested_visibility.clone()).unwrap_or_default();
        if let Some(predicate) = visibility {
            nested_visibility.push(predicate.clone());
        }

        data.entity_names(enumerator.id, &parent_path)
            .into_iter()
            .enumerate()
            .map(|(index, name)| RepeatedEntity {
                enumerator_id: enumerator.id,
                index,
                name,
                parent: parent.cloned().map(Box::new),
                nested_visibility: nested_visibility.clone(),
            })
            .collect()
    }

    /// Index path from the outermost entity down to this one.
    pub fn entity_path(&self) -> Vec<usize> {
        let mut path = self
            .parent
            .as_deref()
            .map(RepeatedEntity::entity_path)
            .unwrap_or_default();
        path.push(self.index);
        path
    }
}

/// Resolves predicate lookups against an applicant's answers within an
/// optional repeated-entity context.
pub struct ContextualAnswers<'a> {
    program: &'a ProgramDefinition,
    data: &'a ApplicantData,
    entity: Option<&'a RepeatedEntity>,
}

impl<'a> ContextualAnswers<'a> {
    pub fn new(
        program: &'a ProgramDefinition,
        data: &'a ApplicantData,
        entity: Option<&'a RepeatedEntity>,
    ) -> Self {
        Self {
            program,
            data,
            entity,
        }
    }

    /// The answer key for a question in this context. A repeated question is
    /// resolved against the nearest enclosing entity of its enumerator; a
    /// repeated question referenced outside its enumerator has no key.
    pub fn key_for(&self, question: &QuestionDefinition) -> Option<AnswerKey> {
        match question.enumerator_id {
            None => Some(AnswerKey::top(question.id)),
            Some(enumerator_id) => {
                let mut current = self.entity;
                while let Some(entity) = current {
                    if entity.enumerator_id == enumerator_id {
                        return Some(AnswerKey::nested(question.id, entity.entity_path()));
                    }
                    current = entity.parent.as_deref();
                }
                None
            }
        }
    }
}

impl AnswerLookup for ContextualAnswers<'_> {
    fn scalar(&self, question_id: QuestionId, scalar: Scalar) -> Option<ScalarValue> {
        let question = self.program.question(question_id)?;
        let key = self.key_for(question)?;
        self.data.scalar(&key, scalar).cloned()
    }
}
