use std::io::Write;

use super::domain::Application;
use crate::applicants::ApplicantData;
use crate::programs::ProgramDefinition;
use crate::questions::{QuestionDefinition, QuestionType, ScalarValue};

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("csv write failed: {0}")]
    Csv(#[from] csv::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Flatten a program's submitted applications into CSV rows.
///
/// The column set is derived from the program definition: fixed metadata
/// columns first, then one column per answerable question in screen
/// order. Repeated questions aggregate their entities into one cell,
/// prefixed by entity name.
pub fn export_submitted_csv<W: Write>(
    program: &ProgramDefinition,
    applications: &[Application],
    writer: W,
) -> Result<(), ExportError> {
    let questions = exportable_questions(program);

    let mut csv_writer = csv::Writer::from_writer(writer);
    let mut header = vec![
        "application_id".to_string(),
        "program".to_string(),
        "applicant_id".to_string(),
        "submitter".to_string(),
        "submitted_at".to_string(),
        "eligible".to_string(),
    ];
    header.extend(questions.iter().map(|question| question.admin_name.clone()));
    csv_writer.write_record(&header)?;

    for application in applications.iter().filter(|application| application.is_submitted()) {
        let mut row = vec![
            application.id.0.clone(),
            program.admin_name.clone(),
            application.applicant_id.to_string(),
            application.submitter.label().to_string(),
            application
                .submitted_at
                .map(|at| at.to_rfc3339())
                .unwrap_or_default(),
            application
                .eligible
                .map(|eligible| eligible.to_string())
                .unwrap_or_default(),
        ];
        for question in &questions {
            row.push(answer_cell(question, &application.data));
        }
        csv_writer.write_record(&row)?;
    }

    csv_writer.flush()?;
    Ok(())
}

/// Questions in screen order, skipping static content.
fn exportable_questions(program: &ProgramDefinition) -> Vec<&QuestionDefinition> {
    let mut questions = Vec::new();
    for block in &program.blocks {
        for program_question in &block.questions {
            if let Some(question) = program.question(program_question.question_id) {
                if question.question_type != QuestionType::Static {
                    questions.push(question);
                }
            }
        }
    }
    questions
}

fn answer_cell(question: &QuestionDefinition, data: &ApplicantData) -> String {
    let mut parts = Vec::new();
    for (key, answer) in data.answers() {
        if key.question_id != question.id || answer.scalars.is_empty() {
            continue;
        }
        let value = answer
            .scalars
            .values()
            .map(ScalarValue::display)
            .collect::<Vec<_>>()
            .join(", ");
        match entity_label(question, data, &key.entity_path) {
            Some(name) => parts.push(format!("{name}: {value}")),
            None => parts.push(value),
        }
    }
    parts.join("; ")
}

/// Entity name for a repeated answer, resolved through the enumerator.
fn entity_label(
    question: &QuestionDefinition,
    data: &ApplicantData,
    entity_path: &[usize],
) -> Option<String> {
    let enumerator_id = question.enumerator_id?;
    let (index, parent_path) = entity_path.split_last()?;
    data.entity_names(enumerator_id, parent_path)
        .get(*index)
        .cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::applicants::{Answer, AnswerKey};
    use crate::applications::domain::{ApplicationId, ApplicationStatus, Submitter};
    use crate::programs::standard_program;
    use crate::questions::{Scalar, ScalarValue};
    use chrono::{TimeZone, Utc};
    use std::collections::BTreeMap;

    fn answer(pairs: Vec<(Scalar, ScalarValue)>) -> Answer {
        let mut scalars = BTreeMap::new();
        for (scalar, value) in pairs {
            scalars.insert(scalar, value);
        }
        Answer::new(scalars, 1, 1_700_000_000)
    }

    fn submitted_application() -> Application {
        let mut application = Application::draft(ApplicationId("app-000101".to_string()), 11, 1);
        application.status = ApplicationStatus::Submitted;
        application.submitter = Submitter::Applicant;
        application.submitted_at = Some(Utc.with_ymd_and_hms(2024, 6, 15, 17, 30, 0).unwrap());
        application.eligible = Some(true);
        application.data.put_answer(
            AnswerKey::top(1),
            answer(vec![
                (Scalar::FirstName, ScalarValue::Text("Ana".to_string())),
                (Scalar::LastName, ScalarValue::Text("Silva".to_string())),
            ]),
        );
        application.data.put_answer(
            AnswerKey::top(7),
            answer(vec![(
                Scalar::EntityName,
                ScalarValue::List(vec!["Luis".to_string()]),
            )]),
        );
        application.data.put_answer(
            AnswerKey::nested(8, vec![0]),
            answer(vec![(Scalar::Text, ScalarValue::Text("Son".to_string()))]),
        );
        application
    }

    #[test]
    fn exports_one_row_per_submitted_application() {
        let program = standard_program();
        let draft = Application::draft(ApplicationId("app-000102".to_string()), 12, 1);
        let applications = vec![submitted_application(), draft];

        let mut buffer = Vec::new();
        export_submitted_csv(&program, &applications, &mut buffer).expect("export succeeds");
        let output = String::from_utf8(buffer).expect("valid utf8");

        let mut lines = output.lines();
        let header = lines.next().expect("header row");
        assert!(header.starts_with(
            "application_id,program,applicant_id,submitter,submitted_at,eligible"
        ));
        assert!(header.contains("applicant_name"));
        assert!(header.contains("member_relationship"));
        assert!(!header.contains("document_notice"));

        let row = lines.next().expect("one data row");
        assert!(row.starts_with("app-000101,utility_assistance,11,applicant"));
        assert!(row.contains("Ana, Silva"));
        assert!(row.contains("Luis: Son"));
        assert!(lines.next().is_none());
    }
}
