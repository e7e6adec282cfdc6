use chrono::NaiveDate;
use serde::Serialize;

use super::{ApplicantData, ApplicantQuestion, Block, ContextualAnswers, RepeatedEntity};
use crate::locale::DEFAULT_LOCALE;
use crate::predicates::{PredicateAction, PredicateDefinition, PredicateEvaluator};
use crate::programs::{BlockDefinition, ProgramDefinition, ProgramId};
use crate::questions::QuestionId;

/// One row of the review-screen summary.
#[derive(Debug, Clone, Serialize)]
pub struct AnswerSummaryRow {
    pub block_id: String,
    pub question_id: QuestionId,
    pub question_text: String,
    pub answer_text: String,
    pub is_answered: bool,
    pub is_eligible: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_name: Option<String>,
}

/// Read-only view over one applicant's position in a program: which screens
/// are visible, which are complete, what comes next, and whether the answers
/// so far satisfy the program's eligibility predicates.
pub struct ProgramProgressReader<'a> {
    program: &'a ProgramDefinition,
    data: &'a ApplicantData,
    today: NaiveDate,
}

impl<'a> ProgramProgressReader<'a> {
    pub fn new(program: &'a ProgramDefinition, data: &'a ApplicantData, today: NaiveDate) -> Self {
        Self {
            program,
            data,
            today,
        }
    }

    pub fn program(&self) -> &ProgramDefinition {
        self.program
    }

    /// All visible blocks, in program order, with enumerator blocks expanded
    /// once per repeated entity.
    pub fn active_blocks(&self) -> Vec<Block> {
        self.blocks_matching(&|_| true)
    }

    /// Blocks the applicant still interacts with in this program: incomplete
    /// ones, ones answered while filling out this program, and static
    /// content screens.
    pub fn in_progress_blocks(&self) -> Vec<Block> {
        let program_id: ProgramId = self.program.id;
        self.blocks_matching(&|block| {
            !block.is_answered_without_errors()
                || block.was_answered_in_program(program_id)
                || block.contains_static()
        })
    }

    pub fn block(&self, block_id: &str) -> Option<Block> {
        self.active_blocks()
            .into_iter()
            .find(|block| block.id == block_id)
    }

    pub fn block_index(&self, block_id: &str) -> Option<usize> {
        self.active_blocks()
            .iter()
            .position(|block| block.id == block_id)
    }

    /// The in-progress block following `block_id`, for "save and next".
    pub fn block_after(&self, block_id: &str) -> Option<Block> {
        let blocks = self.in_progress_blocks();
        let index = blocks.iter().position(|block| block.id == block_id)?;
        blocks.into_iter().nth(index + 1)
    }

    /// First block with an unanswered question, skipping hidden blocks.
    pub fn next_incomplete_block(&self) -> Option<Block> {
        self.in_progress_blocks()
            .into_iter()
            .find(|block| !block.is_complete_without_errors())
    }

    /// First block still needing attention, counting static screens the
    /// applicant has not paged through yet.
    pub fn first_incomplete_or_static_block(&self) -> Option<Block> {
        self.in_progress_blocks()
            .into_iter()
            .find(|block| !block.is_complete_without_errors() || block.contains_static())
    }

    /// Share of visible blocks completed without errors, 0-100.
    pub fn completion_percent(&self) -> u8 {
        let blocks = self.active_blocks();
        if blocks.is_empty() {
            return 100;
        }
        let completed = blocks
            .iter()
            .filter(|block| block.is_complete_without_errors())
            .count();
        ((completed * 100) / blocks.len()) as u8
    }

    /// No eligibility predicate means the block is eligible.
    pub fn is_block_eligible(&self, block: &Block) -> bool {
        match &block.definition.eligibility {
            None => true,
            Some(predicate) => self.evaluate(block, predicate),
        }
    }

    pub fn is_application_eligible(&self) -> bool {
        self.active_blocks()
            .iter()
            .all(|block| self.is_block_eligible(block))
    }

    /// Answered questions referenced by a failing eligibility predicate.
    pub fn ineligible_questions(&self) -> Vec<ApplicantQuestion> {
        let mut seen = Vec::new();
        let mut questions = Vec::new();
        for block in self.active_blocks() {
            let Some(eligibility) = &block.definition.eligibility else {
                continue;
            };
            if self.evaluate(&block, eligibility) {
                continue;
            }
            for question_id in eligibility.questions() {
                if seen.contains(&question_id) {
                    continue;
                }
                if let Some(question) = block.question(question_id) {
                    if question.is_answered() {
                        seen.push(question_id);
                        questions.push(question.clone());
                    }
                }
            }
        }
        questions
    }

    /// Per-question answer rows for the review screen, skipping static
    /// content. An answered question is flagged ineligible only when it is
    /// part of a failing eligibility predicate on its block.
    pub fn summary(&self, locale: &str) -> Vec<AnswerSummaryRow> {
        let mut rows = Vec::new();
        for block in self.active_blocks() {
            for question in block.questions() {
                if question.is_static() {
                    continue;
                }
                rows.push(AnswerSummaryRow {
                    block_id: block.id.clone(),
                    question_id: question.definition.id,
                    question_text: question.definition.question_text.get(locale).to_string(),
                    answer_text: question.answer_text(locale),
                    is_answered: question.is_answered(),
                    is_eligible: self.is_question_eligible_in_block(&block, question),
                    entity_name: block
                        .repeated_entity
                        .as_ref()
                        .map(|entity| entity.name.clone()),
                });
            }
        }
        rows
    }

    pub fn default_locale_summary(&self) -> Vec<AnswerSummaryRow> {
        self.summary(DEFAULT_LOCALE)
    }

    fn is_question_eligible_in_block(&self, block: &Block, question: &ApplicantQuestion) -> bool {
        if self.is_block_eligible(block) {
            return true;
        }
        let referenced = block
            .definition
            .eligibility
            .as_ref()
            .map(PredicateDefinition::questions)
            .unwrap_or_default();
        !referenced.contains(&question.definition.id)
    }

    fn blocks_matching(&self, include: &dyn Fn(&Block) -> bool) -> Vec<Block> {
        let mut blocks = Vec::new();
        self.collect_blocks(
            &self.program.non_repeated_blocks(),
            "",
            None,
            include,
            &mut blocks,
        );
        blocks
    }

    /// Depth-first expansion mirroring program order: each enumerator block
    /// is followed by its repeated blocks, once per enumerated entity.
    fn collect_blocks(
        &self,
        definitions: &[&BlockDefinition],
        id_suffix: &str,
        entity: Option<&RepeatedEntity>,
        include: &dyn Fn(&Block) -> bool,
        out: &mut Vec<Block>,
    ) {
        for definition in definitions.iter().copied() {
            let block_id = format!("{}{}", definition.id, id_suffix);
            let block = Block::new(block_id, definition, self.program, self.data, entity);
            let visible = self.show_block(&block);
            if visible && include(&block) {
                out.push(block.clone());
            }

            if let Some(enumerator) = self.program.enumerator_question(definition) {
                let entities = RepeatedEntity::create_all(
                    enumerator,
                    definition.visibility.as_ref(),
                    self.data,
                    entity,
                );
                let repeated = self.program.repeated_blocks_of(definition.id);
                for repeated_entity in &entities {
                    let next_suffix = format!("{id_suffix}-{}", repeated_entity.index);
                    self.collect_blocks(
                        &repeated,
                        &next_suffix,
                        Some(repeated_entity),
                        include,
                        out,
                    );
                }
            }
        }
    }

    fn show_block(&self, block: &Block) -> bool {
        if let Some(entity) = &block.repeated_entity {
            // A hidden enumerator hides every screen nested under it.
            if entity
                .nested_visibility
                .iter()
                .any(|predicate| !self.evaluate_visibility(block, predicate))
            {
                return false;
            }
        }
        match &block.definition.visibility {
            None => true,
            Some(predicate) => self.evaluate_visibility(block, predicate),
        }
    }

    fn evaluate_visibility(&self, block: &Block, predicate: &PredicateDefinition) -> bool {
        let result = self.evaluate(block, predicate);
        match predicate.action {
            PredicateAction::HideBlock => !result,
            PredicateAction::ShowBlock => result,
            PredicateAction::Eligible => true,
        }
    }

    fn evaluate(&self, block: &Block, predicate: &PredicateDefinition) -> bool {
        let answers =
            ContextualAnswers::new(self.program, self.data, block.repeated_entity.as_ref());
        PredicateEvaluator::new(&answers, self.today).evaluate(&predicate.root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::applicants::{Answer, AnswerKey};
    use crate::predicates::{LeafOperationNode, Operator, PredicateValue};
    use crate::programs::standard_program;
    use crate::questions::{Scalar, ScalarValue, ServiceAreaInclusion, ServiceAreaState};
    use std::collections::BTreeMap;

    const PROGRAM_ID: ProgramId = 1;
    const OTHER_PROGRAM_ID: ProgramId = 99;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 15).expect("valid date")
    }

    fn answer(pairs: Vec<(Scalar, ScalarValue)>) -> Answer {
        answer_in_program(pairs, PROGRAM_ID)
    }

    fn answer_in_program(pairs: Vec<(Scalar, ScalarValue)>, program_id: ProgramId) -> Answer {
        let mut scalars = BTreeMap::new();
        for (scalar, value) in pairs {
            scalars.insert(scalar, value);
        }
        Answer::new(scalars, program_id, 1_700_000_000)
    }

    fn name_and_dob(data: &mut ApplicantData) {
        data.put_answer(
            AnswerKey::top(1),
            answer(vec![
                (Scalar::FirstName, ScalarValue::Text("Ana".to_string())),
                (Scalar::LastName, ScalarValue::Text("Silva".to_string())),
            ]),
        );
        data.put_answer(
            AnswerKey::top(2),
            answer(vec![(
                Scalar::Date,
                ScalarValue::Date(NaiveDate::from_ymd_opt(1988, 3, 2).expect("valid date")),
            )]),
        );
    }

    #[test]
    fn veteran_block_is_hidden_until_selected() {
        let program = standard_program();
        let mut data = ApplicantData::default();
        let reader = ProgramProgressReader::new(&program, &data, today());
        let ids: Vec<String> = reader.active_blocks().iter().map(|b| b.id.clone()).collect();
        assert!(!ids.contains(&"4".to_string()));

        data.put_answer(
            AnswerKey::top(4),
            answer(vec![(Scalar::Selection, ScalarValue::Text("yes".to_string()))]),
        );
        let reader = ProgramProgressReader::new(&program, &data, today());
        let ids: Vec<String> = reader.active_blocks().iter().map(|b| b.id.clone()).collect();
        assert!(ids.contains(&"4".to_string()));
    }

    #[test]
    fn enumerator_expands_one_block_per_entity() {
        let program = standard_program();
        let mut data = ApplicantData::default();
        data.put_answer(
            AnswerKey::top(7),
            answer(vec![(
                Scalar::EntityName,
                ScalarValue::List(vec!["Ana".to_string(), "Luis".to_string()]),
            )]),
        );

        let reader = ProgramProgressReader::new(&program, &data, today());
        let ids: Vec<String> = reader.active_blocks().iter().map(|b| b.id.clone()).collect();
        let expected_first = "8-0".to_string();
        let expected_second = "8-1".to_string();
        assert!(ids.contains(&expected_first));
        assert!(ids.contains(&expected_second));

        let member_block = reader.block("8-1").expect("repeated block exists");
        assert_eq!(
            member_block
                .repeated_entity
                .as_ref()
                .map(|entity| entity.name.as_str()),
            Some("Luis")
        );
    }

    #[test]
    fn hidden_enumerator_hides_repeated_blocks() {
        let mut program = standard_program();
        // Hide the household-members enumerator for one-person households.
        let members_index = program
            .blocks
            .iter()
            .position(|block| block.id == 7)
            .expect("enumerator block present");
        program.blocks[members_index].visibility =
            Some(PredicateDefinition::single_question(
                LeafOperationNode::new(
                    3,
                    Scalar::Number,
                    Operator::GreaterThan,
                    PredicateValue::Long(1),
                ),
                PredicateAction::ShowBlock,
            ));

        let mut data = ApplicantData::default();
        data.put_answer(
            AnswerKey::top(3),
            answer(vec![(Scalar::Number, ScalarValue::Long(1))]),
        );
        data.put_answer(
            AnswerKey::top(7),
            answer(vec![(
                Scalar::EntityName,
                ScalarValue::List(vec!["Ana".to_string()]),
            )]),
        );

        let reader = ProgramProgressReader::new(&program, &data, today());
        let ids: Vec<String> = reader.active_blocks().iter().map(|b| b.id.clone()).collect();
        assert!(!ids.contains(&"7".to_string()));
        assert!(!ids.contains(&"8-0".to_string()));
    }

    #[test]
    fn next_incomplete_block_walks_in_order() {
        let program = standard_program();
        let mut data = ApplicantData::default();
        let reader = ProgramProgressReader::new(&program, &data, today());
        assert_eq!(
            reader.next_incomplete_block().map(|block| block.id),
            Some("1".to_string())
        );

        name_and_dob(&mut data);
        let reader = ProgramProgressReader::new(&program, &data, today());
        assert_eq!(
            reader.next_incomplete_block().map(|block| block.id),
            Some("2".to_string())
        );
        assert_eq!(reader.block_after("1").map(|block| block.id), Some("2".to_string()));
        assert_eq!(reader.block_index("2"), Some(1));
        assert_eq!(reader.block_index("4"), None);
        assert_eq!(
            reader
                .first_incomplete_or_static_block()
                .map(|block| block.id),
            Some("2".to_string())
        );
    }

    #[test]
    fn completion_percent_counts_visible_blocks_only() {
        let program = standard_program();
        let mut data = ApplicantData::default();
        // Six visible blocks: the veteran screen is hidden and the repeated
        // member-details block has no entities yet.
        let reader = ProgramProgressReader::new(&program, &data, today());
        assert_eq!(reader.active_blocks().len(), 6);
        assert_eq!(reader.completion_percent(), 0);

        name_and_dob(&mut data);
        let reader = ProgramProgressReader::new(&program, &data, today());
        assert_eq!(reader.completion_percent(), (100 / 6) as u8);
    }

    #[test]
    fn blocks_answered_in_another_program_leave_the_in_progress_list() {
        let program = standard_program();
        let mut data = ApplicantData::default();
        data.put_answer(
            AnswerKey::top(1),
            answer_in_program(
                vec![
                    (Scalar::FirstName, ScalarValue::Text("Ana".to_string())),
                    (Scalar::LastName, ScalarValue::Text("Silva".to_string())),
                ],
                OTHER_PROGRAM_ID,
            ),
        );
        data.put_answer(
            AnswerKey::top(2),
            answer_in_program(
                vec![(
                    Scalar::Date,
                    ScalarValue::Date(NaiveDate::from_ymd_opt(1988, 3, 2).expect("valid date")),
                )],
                OTHER_PROGRAM_ID,
            ),
        );

        let reader = ProgramProgressReader::new(&program, &data, today());
        let in_progress: Vec<String> = reader
            .in_progress_blocks()
            .iter()
            .map(|block| block.id.clone())
            .collect();
        // Block 1 was imported from another program, so it is skipped; block
        // 2 is still unanswered and stays.
        assert!(!in_progress.contains(&"1".to_string()));
        assert!(in_progress.contains(&"2".to_string()));
        // The active list still shows it.
        assert!(reader.block("1").is_some());
    }

    #[test]
    fn income_over_the_cap_marks_the_application_ineligible() {
        let program = standard_program();
        let mut data = ApplicantData::default();
        data.put_answer(
            AnswerKey::top(5),
            answer(vec![(Scalar::CurrencyCents, ScalarValue::Long(500_000))]),
        );

        let reader = ProgramProgressReader::new(&program, &data, today());
        let income_block = reader.block("3").expect("income block visible");
        assert!(!reader.is_block_eligible(&income_block));
        assert!(!reader.is_application_eligible());

        let ineligible = reader.ineligible_questions();
        assert_eq!(ineligible.len(), 1);
        assert_eq!(ineligible[0].definition.admin_name, "monthly_income");
    }

    #[test]
    fn unanswered_eligibility_questions_do_not_flag_ineligibility() {
        let program = standard_program();
        let data = ApplicantData::default();
        let reader = ProgramProgressReader::new(&program, &data, today());
        // The income predicate evaluates false while unanswered, but no
        // answered question is implicated yet.
        assert!(!reader.is_application_eligible());
        assert!(reader.ineligible_questions().is_empty());
    }

    #[test]
    fn service_area_inclusion_satisfies_address_eligibility() {
        let program = standard_program();
        let mut data = ApplicantData::default();
        data.put_answer(
            AnswerKey::top(6),
            answer(vec![
                (Scalar::Street, ScalarValue::Text("100 Main St".to_string())),
                (Scalar::City, ScalarValue::Text("Springfield".to_string())),
                (Scalar::State, ScalarValue::Text("WA".to_string())),
                (Scalar::Zip, ScalarValue::Text("98101".to_string())),
                (
                    Scalar::ServiceAreas,
                    ScalarValue::ServiceAreas(vec![ServiceAreaInclusion {
                        area_id: "metro_county".to_string(),
                        state: ServiceAreaState::InArea,
                        timestamp: 1_700_000_000,
                    }]),
                ),
            ]),
        );

        let reader = ProgramProgressReader::new(&program, &data, today());
        let address_block = reader.block("5").expect("address block visible");
        assert!(reader.is_block_eligible(&address_block));
    }

    #[test]
    fn summary_includes_repeated_entities_and_skips_static_content() {
        let program = standard_program();
        let mut data = ApplicantData::default();
        name_and_dob(&mut data);
        data.put_answer(
            AnswerKey::top(7),
            answer(vec![(
                Scalar::EntityName,
                ScalarValue::List(vec!["Luis".to_string()]),
            )]),
        );
        data.put_answer(
            AnswerKey::nested(8, vec![0]),
            answer(vec![(Scalar::Text, ScalarValue::Text("Son".to_string()))]),
        );

        let reader = ProgramProgressReader::new(&program, &data, today());
        let rows = reader.default_locale_summary();

        assert!(rows.iter().all(|row| row.question_id != 12));
        let name_row = rows
            .iter()
            .find(|row| row.question_id == 1)
            .expect("name row present");
        assert_eq!(name_row.answer_text, "Ana Silva");

        let relationship_row = rows
            .iter()
            .find(|row| row.question_id == 8)
            .expect("repeated row present");
        assert_eq!(relationship_row.entity_name.as_deref(), Some("Luis"));
        assert_eq!(relationship_row.answer_text, "Son");
    }
}
