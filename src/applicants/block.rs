use super::{Answer, AnswerKey, ApplicantData, ContextualAnswers, RepeatedEntity};
use crate::programs::{BlockDefinition, ProgramDefinition, ProgramId};
use crate::questions::{
    validate_answer, AnswerIssue, QuestionDefinition, QuestionType, Scalar, ScalarValue,
};

/// A question resolved against one applicant's answers in a block context.
#[derive(Debug, Clone)]
pub struct ApplicantQuestion {
    pub definition: QuestionDefinition,
    pub optional: bool,
    pub key: Option<AnswerKey>,
    answer: Option<Answer>,
}

impl ApplicantQuestion {
    pub fn is_static(&self) -> bool {
        self.definition.question_type == QuestionType::Static
    }

    /// Static content has nothing to answer and always counts as answered.
    pub fn is_answered(&self) -> bool {
        self.is_static()
            || self
                .answer
                .as_ref()
                .is_some_and(|answer| !answer.scalars.is_empty())
    }

    /// Answered, or an optional question the applicant submitted blank.
    pub fn is_answered_or_skipped_optional(&self) -> bool {
        self.is_answered() || (self.optional && self.answer.is_some())
    }

    pub fn issues(&self) -> Vec<AnswerIssue> {
        match &self.answer {
            Some(answer) => validate_answer(&self.definition, &answer.scalars),
            None => Vec::new(),
        }
    }

    pub fn has_errors(&self) -> bool {
        !self.issues().is_empty()
    }

    pub fn updated_in_program(&self) -> Option<ProgramId> {
        self.answer.as_ref().and_then(|answer| answer.updated_in_program)
    }

    pub fn scalar(&self, scalar: Scalar) -> Option<&ScalarValue> {
        self.answer.as_ref().and_then(|answer| answer.scalars.get(&scalar))
    }

    /// Human-readable answer for the review summary, in `locale`.
    pub fn answer_text(&self, locale: &str) -> String {
        let Some(answer) = &self.answer else {
            return String::new();
        };
        match self.definition.question_type {
            QuestionType::Static => String::new(),
            QuestionType::Name => {
                let parts = [Scalar::FirstName, Scalar::MiddleName, Scalar::LastName];
                parts
                    .iter()
                    .filter_map(|scalar| answer.scalars.get(scalar))
                    .map(ScalarValue::display)
                    .collect::<Vec<_>>()
                    .join(" ")
            }
            QuestionType::Address => {
                let parts = [Scalar::Street, Scalar::City, Scalar::State, Scalar::Zip];
                parts
                    .iter()
                    .filter_map(|scalar| answer.scalars.get(scalar))
                    .map(ScalarValue::display)
                    .collect::<Vec<_>>()
                    .join(", ")
            }
            QuestionType::Dropdown | QuestionType::Radio => {
                match answer.scalars.get(&Scalar::Selection) {
                    Some(ScalarValue::Text(choice)) => self.option_text(choice, locale),
                    _ => String::new(),
                }
            }
            QuestionType::Checkbox => match answer.scalars.get(&Scalar::Selections) {
                Some(ScalarValue::List(choices)) => choices
                    .iter()
                    .map(|choice| self.option_text(choice, locale))
                    .collect::<Vec<_>>()
                    .join(", "),
                _ => String::new(),
            },
            _ => answer
                .scalars
                .values()
                .map(ScalarValue::display)
                .collect::<Vec<_>>()
                .join(", "),
        }
    }

    fn option_text(&self, admin_name: &str, locale: &str) -> String {
        self.definition
            .options
            .iter()
            .find(|option| option.admin_name == admin_name)
            .map(|option| option.text.get(locale).to_string())
            .unwrap_or_else(|| admin_name.to_string())
    }
}

/// A block in the context of one applicant's application.
///
/// Block ids are the definition id plus dash-separated entity indices:
/// id `"8-0-1"` is definition 8 for the first entity's second nested entity.
#[derive(Debug, Clone)]
pub struct Block {
    pub id: String,
    pub definition: BlockDefinition,
    pub repeated_entity: Option<RepeatedEntity>,
    questions: Vec<ApplicantQuestion>,
    enumerator: bool,
}

impl Block {
    pub(crate) fn new(
        id: String,
        definition: &BlockDefinition,
        program: &ProgramDefinition,
        data: &ApplicantData,
        repeated_entity: Option<&RepeatedEntity>,
    ) -> Self {
        let context = ContextualAnswers::new(program, data, repeated_entity);
        let questions = definition
            .questions
            .iter()
            .filter_map(|program_question| program.question(program_question.question_id).map(
                |question| {
                    let key = context.key_for(question);
                    let answer = key.as_ref().and_then(|key| data.answer(key)).cloned();
                    ApplicantQuestion {
                        definition: question.clone(),
                        optional: program_question.optional,
                        key,
                        answer,
                    }
                },
            ))
            .collect();

        Self {
            id,
            definition: definition.clone(),
            repeated_entity: repeated_entity.cloned(),
            questions,
            enumerator: program.is_enumerator_block(definition),
        }
    }

    pub fn name(&self) -> &str {
        &self.definition.name
    }

    pub fn localized_name(&self, locale: &str) -> &str {
        self.definition.localized_name.get(locale)
    }

    pub fn questions(&self) -> &[ApplicantQuestion] {
        &self.questions
    }

    pub fn question(&self, question_id: u64) -> Option<&ApplicantQuestion> {
        self.questions
            .iter()
            .find(|question| question.definition.id == question_id)
    }

    pub fn is_enumerator(&self) -> bool {
        self.enumerator
    }

    pub fn contains_static(&self) -> bool {
        self.questions.iter().any(ApplicantQuestion::is_static)
    }

    pub fn has_errors(&self) -> bool {
        self.questions.iter().any(ApplicantQuestion::has_errors)
    }

    /// Every question has a value and none of the values fail validation.
    pub fn is_answered_without_errors(&self) -> bool {
        self.questions.iter().all(ApplicantQuestion::is_answered) && !self.has_errors()
    }

    /// Complete for submission: required questions answered, optional ones
    /// answered or deliberately skipped, and no validation errors. A block
    /// with no questions never holds up submission.
    pub fn is_complete_without_errors(&self) -> bool {
        self.questions.is_empty()
            || (self
                .questions
                .iter()
                .all(ApplicantQuestion::is_answered_or_skipped_optional)
                && !self.has_errors())
    }

    /// Complete, and at least one answer was given while filling out the
    /// given program rather than carried over from another application.
    pub fn was_answered_in_program(&self, program_id: ProgramId) -> bool {
        self.is_answered_without_errors()
            && self
                .questions
                .iter()
                .any(|question| question.updated_in_program() == Some(program_id))
    }

    pub fn answered_count(&self) -> usize {
        self.questions
            .iter()
            .filter(|question| !question.is_static() && question.is_answered())
            .count()
    }

    pub fn answerable_count(&self) -> usize {
        self.questions
            .iter()
            .filter(|question| !question.is_static())
            .count()
    }
}
