//! Program definitions: ordered screens of questions with visibility and
//! eligibility predicates, versioned through a draft/active/obsolete
//! lifecycle.

mod blueprint;

pub use blueprint::standard_program;

use serde::{Deserialize, Serialize};

use crate::locale::LocalizedStrings;
use crate::predicates::{PredicateAction, PredicateDefinition};
use crate::questions::{QuestionDefinition, QuestionId, QuestionType};

pub type ProgramId = u64;
pub type BlockDefinitionId = u64;

/// A question's placement within a block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgramQuestion {
    pub question_id: QuestionId,
    pub optional: bool,
}

impl ProgramQuestion {
    pub fn required(question_id: QuestionId) -> Self {
        Self {
            question_id,
            optional: false,
        }
    }

    pub fn optional(question_id: QuestionId) -> Self {
        Self {
            question_id,
            optional: true,
        }
    }
}

/// One screen within a program.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockDefinition {
    pub id: BlockDefinitionId,
    pub name: String,
    pub description: String,
    pub localized_name: LocalizedStrings,
    pub localized_description: LocalizedStrings,
    /// Enumerator block this one repeats under, if any.
    pub repeater_id: Option<BlockDefinitionId>,
    pub questions: Vec<ProgramQuestion>,
    pub visibility: Option<PredicateDefinition>,
    pub eligibility: Option<PredicateDefinition>,
}

impl BlockDefinition {
    pub fn new(id: BlockDefinitionId, name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            id,
            localized_name: LocalizedStrings::of(name.clone()),
            localized_description: LocalizedStrings::of(""),
            name,
            description: String::new(),
            repeater_id: None,
            questions: Vec::new(),
            visibility: None,
            eligibility: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        let description = description.into();
        self.localized_description = LocalizedStrings::of(description.clone());
        self.description = description;
        self
    }

    pub fn with_questions(mut self, questions: Vec<ProgramQuestion>) -> Self {
        self.questions = questions;
        self
    }

    pub fn with_repeater(mut self, repeater_id: BlockDefinitionId) -> Self {
        self.repeater_id = Some(repeater_id);
        self
    }

    pub fn with_visibility(mut self, predicate: PredicateDefinition) -> Self {
        self.visibility = Some(predicate);
        self
    }

    pub fn with_eligibility(mut self, predicate: PredicateDefinition) -> Self {
        self.eligibility = Some(predicate);
        self
    }
}

/// Short step shown on the program card ("1. Tell us about yourself", ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationStep {
    pub title: LocalizedStrings,
    pub description: LocalizedStrings,
}

/// A complete program definition: the question bank plus the ordered blocks
/// referencing it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgramDefinition {
    pub id: ProgramId,
    pub admin_name: String,
    pub display_name: LocalizedStrings,
    pub description: LocalizedStrings,
    pub confirmation_message: LocalizedStrings,
    pub application_steps: Vec<ApplicationStep>,
    pub blocks: Vec<BlockDefinition>,
    pub questions: Vec<QuestionDefinition>,
}

impl ProgramDefinition {
    pub fn question(&self, id: QuestionId) -> Option<&QuestionDefinition> {
        self.questions.iter().find(|question| question.id == id)
    }

    pub fn block(&self, id: BlockDefinitionId) -> Option<&BlockDefinition> {
        self.blocks.iter().find(|block| block.id == id)
    }

    /// Blocks that are not nested under an enumerator, in program order.
    pub fn non_repeated_blocks(&self) -> Vec<&BlockDefinition> {
        self.blocks
            .iter()
            .filter(|block| block.repeater_id.is_none())
            .collect()
    }

    /// Blocks repeating under the given enumerator block, in program order.
    pub fn repeated_blocks_of(&self, repeater_id: BlockDefinitionId) -> Vec<&BlockDefinition> {
        self.blocks
            .iter()
            .filter(|block| block.repeater_id == Some(repeater_id))
            .collect()
    }

    /// An enumerator block hosts exactly one enumerator question.
    pub fn is_enumerator_block(&self, block: &BlockDefinition) -> bool {
        self.enumerator_question(block).is_some()
    }

    pub fn enumerator_question(&self, block: &BlockDefinition) -> Option<&QuestionDefinition> {
        if block.questions.len() != 1 {
            return None;
        }
        self.question(block.questions[0].question_id)
            .filter(|question| question.question_type == QuestionType::Enumerator)
    }

    fn validate(&self) -> Result<(), ProgramConfigError> {
        let mut block_ids = Vec::with_capacity(self.blocks.len());
        for block in &self.blocks {
            if block_ids.contains(&block.id) {
                return Err(ProgramConfigError::DuplicateBlockId { block_id: block.id });
            }
            block_ids.push(block.id);

            for program_question in &block.questions {
                if self.question(program_question.question_id).is_none() {
                    return Err(ProgramConfigError::UnknownQuestion {
                        block_id: block.id,
                        question_id: program_question.question_id,
                    });
                }
            }

            if let Some(repeater_id) = block.repeater_id {
                let repeater = self
                    .block(repeater_id)
                    .ok_or(ProgramConfigError::UnknownRepeater {
                        block_id: block.id,
                        repeater_id,
                    })?;
                if !self.is_enumerator_block(repeater) {
                    return Err(ProgramConfigError::RepeaterNotEnumerator {
                        block_id: block.id,
                        repeater_id,
                    });
                }
            }

            for predicate in block.visibility.iter().chain(block.eligibility.iter()) {
                for question_id in predicate.questions() {
                    if self.question(question_id).is_none() {
                        return Err(ProgramConfigError::UnknownQuestion {
                            block_id: block.id,
                            question_id,
                        });
                    }
                }
            }
            if let Some(visibility) = &block.visibility {
                if visibility.action == PredicateAction::Eligible {
                    return Err(ProgramConfigError::MisplacedPredicateAction {
                        block_id: block.id,
                    });
                }
            }
            if let Some(eligibility) = &block.eligibility {
                if eligibility.action != PredicateAction::Eligible {
                    return Err(ProgramConfigError::MisplacedPredicateAction {
                        block_id: block.id,
                    });
                }
            }
        }
        Ok(())
    }
}

/// Where a program version sits in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleStage {
    Draft,
    Active,
    Obsolete,
}

impl LifecycleStage {
    pub const fn label(self) -> &'static str {
        match self {
            LifecycleStage::Draft => "draft",
            LifecycleStage::Active => "active",
            LifecycleStage::Obsolete => "obsolete",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgramVersion {
    pub stage: LifecycleStage,
    pub definition: ProgramDefinition,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ProgramConfigError {
    #[error("program id {program_id} already exists")]
    DuplicateProgramId { program_id: ProgramId },
    #[error("block {block_id} appears twice in the program")]
    DuplicateBlockId { block_id: BlockDefinitionId },
    #[error("block {block_id} references unknown question {question_id}")]
    UnknownQuestion {
        block_id: BlockDefinitionId,
        question_id: QuestionId,
    },
    #[error("block {block_id} repeats under unknown block {repeater_id}")]
    UnknownRepeater {
        block_id: BlockDefinitionId,
        repeater_id: BlockDefinitionId,
    },
    #[error("block {block_id} repeats under block {repeater_id}, which is not an enumerator")]
    RepeaterNotEnumerator {
        block_id: BlockDefinitionId,
        repeater_id: BlockDefinitionId,
    },
    #[error("block {block_id} has a predicate with the wrong action for its slot")]
    MisplacedPredicateAction { block_id: BlockDefinitionId },
    #[error("program {program_id} not found")]
    UnknownProgram { program_id: ProgramId },
    #[error("program {program_id} is not a draft")]
    NotADraft { program_id: ProgramId },
}

/// Versioned store of program definitions.
///
/// At most one Active version exists per program admin-name; publishing a
/// draft obsoletes the previously active version of the same name.
#[derive(Debug, Default)]
pub struct ProgramRegistry {
    versions: Vec<ProgramVersion>,
}

impl ProgramRegistry {
    pub fn insert_draft(&mut self, definition: ProgramDefinition) -> Result<(), ProgramConfigError> {
        if self
            .versions
            .iter()
            .any(|version| version.definition.id == definition.id)
        {
            return Err(ProgramConfigError::DuplicateProgramId {
                program_id: definition.id,
            });
        }
        definition.validate()?;
        self.versions.push(ProgramVersion {
            stage: LifecycleStage::Draft,
            definition,
        });
        Ok(())
    }

    pub fn publish(&mut self, program_id: ProgramId) -> Result<(), ProgramConfigError> {
        let draft_index = self
            .versions
            .iter()
            .position(|version| version.definition.id == program_id)
            .ok_or(ProgramConfigError::UnknownProgram { program_id })?;
        if self.versions[draft_index].stage != LifecycleStage::Draft {
            return Err(ProgramConfigError::NotADraft { program_id });
        }

        let admin_name = self.versions[draft_index].definition.admin_name.clone();
        for version in &mut self.versions {
            if version.stage == LifecycleStage::Active && version.definition.admin_name == admin_name
            {
                version.stage = LifecycleStage::Obsolete;
            }
        }
        self.versions[draft_index].stage = LifecycleStage::Active;
        Ok(())
    }

    /// Active program definitions, in insertion order.
    pub fn active(&self) -> Vec<&ProgramDefinition> {
        self.versions
            .iter()
            .filter(|version| version.stage == LifecycleStage::Active)
            .map(|version| &version.definition)
            .collect()
    }

    pub fn get_active(&self, program_id: ProgramId) -> Option<&ProgramDefinition> {
        self.versions
            .iter()
            .find(|version| {
                version.stage == LifecycleStage::Active && version.definition.id == program_id
            })
            .map(|version| &version.definition)
    }

    pub fn get(&self, program_id: ProgramId) -> Option<&ProgramVersion> {
        self.versions
            .iter()
            .find(|version| version.definition.id == program_id)
    }
}
