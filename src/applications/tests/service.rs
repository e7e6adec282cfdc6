use super::common::*;
use std::sync::Arc;

use crate::applicants::AnswerKey;
use crate::applications::domain::{ApplicationStatus, Submitter};
use crate::applications::export::export_submitted_csv;
use crate::applications::repository::ApplicationRepository;
use crate::applications::service::{ApplicationService, ApplicationServiceError};
use crate::programs::standard_program;
use crate::questions::{Scalar, ScalarValue};

#[test]
fn draft_is_created_once_and_reused() {
    let (service, _, _) = build_service();
    let first = service
        .get_or_create_draft(APPLICANT_ID, PROGRAM_ID)
        .expect("draft creates");
    let second = service
        .get_or_create_draft(APPLICANT_ID, PROGRAM_ID)
        .expect("draft fetch succeeds");
    assert_eq!(first.id, second.id);
    assert_eq!(first.status, ApplicationStatus::Draft);
}

#[test]
fn unknown_program_is_rejected() {
    let (service, _, _) = build_service();
    let result = service.get_or_create_draft(APPLICANT_ID, 404);
    assert!(matches!(
        result,
        Err(ApplicationServiceError::UnknownProgram(404))
    ));
}

#[test]
fn invalid_answers_are_reported_and_not_persisted() {
    let (service, repository, _) = build_service();
    let outcome = service
        .update_block_answers(
            APPLICANT_ID,
            PROGRAM_ID,
            "2",
            vec![update(
                3,
                vec![(Scalar::Number, ScalarValue::Text("two".to_string()))],
            )],
            now(),
        )
        .expect("update call succeeds");

    assert!(!outcome.errors.is_empty());
    assert!(outcome.next_block_id.is_none());

    let draft = repository
        .draft_for(APPLICANT_ID, PROGRAM_ID)
        .expect("draft exists");
    assert!(draft.data.answer(&AnswerKey::top(3)).is_none());
}

#[test]
fn required_question_cannot_be_submitted_blank() {
    let (service, _, _) = build_service();
    let outcome = service
        .update_block_answers(
            APPLICANT_ID,
            PROGRAM_ID,
            "2",
            vec![update(3, Vec::new())],
            now(),
        )
        .expect("update call succeeds");
    assert_eq!(outcome.errors.len(), 1);
    assert_eq!(outcome.errors[0].question_id, 3);
}

#[test]
fn unknown_block_is_an_error() {
    let (service, _, _) = build_service();
    let result = service.update_block_answers(APPLICANT_ID, PROGRAM_ID, "42", Vec::new(), now());
    assert!(matches!(
        result,
        Err(ApplicationServiceError::UnknownBlock(block)) if block == "42"
    ));
}

#[test]
fn block_update_reports_the_next_screen() {
    let (service, _, _) = build_service();
    let outcome = service
        .update_block_answers(
            APPLICANT_ID,
            PROGRAM_ID,
            "1",
            vec![
                update(
                    1,
                    vec![
                        (Scalar::FirstName, ScalarValue::Text("Ana".to_string())),
                        (Scalar::LastName, ScalarValue::Text("Silva".to_string())),
                    ],
                ),
                update(2, vec![(Scalar::Date, ScalarValue::Date(date(1988, 3, 2)))]),
            ],
            now(),
        )
        .expect("update succeeds");

    assert!(outcome.errors.is_empty());
    assert_eq!(outcome.next_block_id.as_deref(), Some("2"));
    assert!(outcome.completion_percent > 0);
}

#[test]
fn submit_requires_every_visible_screen_complete() {
    let (service, _, events) = build_service();
    service
        .get_or_create_draft(APPLICANT_ID, PROGRAM_ID)
        .expect("draft creates");

    let result = service.submit(APPLICANT_ID, PROGRAM_ID, Submitter::Applicant, now());
    assert!(matches!(
        result,
        Err(ApplicationServiceError::Incomplete { block_id }) if block_id == "1"
    ));
    assert!(events.events().is_empty());
}

#[test]
fn complete_application_submits_and_notifies() {
    let (service, repository, events) = build_service();
    fill_standard_program(&service, APPLICANT_ID, 250_000);

    let receipt = service
        .submit(APPLICANT_ID, PROGRAM_ID, Submitter::Applicant, now())
        .expect("submission succeeds");
    assert!(receipt.eligible);
    assert_eq!(receipt.program_title, "Utility Assistance Program");

    let stored = repository
        .fetch(&receipt.application_id)
        .expect("fetch succeeds")
        .expect("record exists");
    assert_eq!(stored.status, ApplicationStatus::Submitted);
    assert_eq!(stored.eligible, Some(true));
    assert_eq!(stored.submitted_at, Some(now()));

    let published = events.events();
    assert_eq!(published.len(), 1);
    assert_eq!(published[0].template, "application_submitted");
    assert_eq!(
        published[0].details.get("program").map(String::as_str),
        Some("utility_assistance")
    );
}

#[test]
fn income_above_the_cap_submits_as_ineligible() {
    let (service, _, _) = build_service();
    fill_standard_program(&service, APPLICANT_ID, 500_000);

    let receipt = service
        .submit(APPLICANT_ID, PROGRAM_ID, Submitter::Applicant, now())
        .expect("ineligible applications are still accepted");
    assert!(!receipt.eligible);

    let view = service
        .status(&receipt.application_id)
        .expect("status resolves");
    assert_eq!(view.status, "submitted");
    assert_eq!(view.eligible, Some(false));
}

#[test]
fn resubmission_obsoletes_the_previous_application() {
    let (service, repository, _) = build_service();
    fill_standard_program(&service, APPLICANT_ID, 250_000);
    let first = service
        .submit(APPLICANT_ID, PROGRAM_ID, Submitter::Applicant, now())
        .expect("first submission succeeds");

    fill_standard_program(&service, APPLICANT_ID, 260_000);
    let second = service
        .submit(
            APPLICANT_ID,
            PROGRAM_ID,
            Submitter::TrustedIntermediary { account_id: 77 },
            now(),
        )
        .expect("second submission succeeds");
    assert_ne!(first.application_id, second.application_id);

    let first_stored = repository
        .fetch(&first.application_id)
        .expect("fetch succeeds")
        .expect("record exists");
    assert_eq!(first_stored.status, ApplicationStatus::Obsolete);

    let second_stored = repository
        .fetch(&second.application_id)
        .expect("fetch succeeds")
        .expect("record exists");
    assert_eq!(second_stored.status, ApplicationStatus::Submitted);
    assert_eq!(
        second_stored.submitter,
        Submitter::TrustedIntermediary { account_id: 77 }
    );
}

#[test]
fn shrinking_an_enumerator_drops_orphaned_answers() {
    let (service, repository, _) = build_service();
    service
        .update_block_answers(
            APPLICANT_ID,
            PROGRAM_ID,
            "7",
            vec![update(
                7,
                vec![(
                    Scalar::EntityName,
                    ScalarValue::List(vec!["Luis".to_string(), "Mia".to_string()]),
                )],
            )],
            now(),
        )
        .expect("enumerator update succeeds");
    for index in 0..2 {
        service
            .update_block_answers(
                APPLICANT_ID,
                PROGRAM_ID,
                &format!("8-{index}"),
                vec![
                    update(8, vec![(Scalar::Text, ScalarValue::Text("Child".to_string()))]),
                    update(9, vec![(Scalar::Date, ScalarValue::Date(date(2012, 7, 1)))]),
                ],
                now(),
            )
            .expect("member details update succeeds");
    }

    service
        .update_block_answers(
            APPLICANT_ID,
            PROGRAM_ID,
            "7",
            vec![update(
                7,
                vec![(
                    Scalar::EntityName,
                    ScalarValue::List(vec!["Luis".to_string()]),
                )],
            )],
            now(),
        )
        .expect("enumerator shrink succeeds");

    let draft = repository
        .draft_for(APPLICANT_ID, PROGRAM_ID)
        .expect("draft exists");
    assert!(draft.data.answer(&AnswerKey::nested(8, vec![0])).is_some());
    assert!(draft.data.answer(&AnswerKey::nested(8, vec![1])).is_none());
    assert!(draft.data.answer(&AnswerKey::nested(9, vec![1])).is_none());
}

#[test]
fn repository_failures_surface_as_service_errors() {
    let service = ApplicationService::new(
        registry(),
        Arc::new(UnavailableRepository),
        Arc::new(MemoryEvents::default()),
    );
    let result = service.get_or_create_draft(APPLICANT_ID, PROGRAM_ID);
    assert!(matches!(
        result,
        Err(ApplicationServiceError::Repository(_))
    ));
}

#[test]
fn export_includes_only_submitted_applications() {
    let (service, repository, _) = build_service();
    fill_standard_program(&service, APPLICANT_ID, 250_000);
    service
        .submit(APPLICANT_ID, PROGRAM_ID, Submitter::Applicant, now())
        .expect("submission succeeds");

    // A second applicant with an unfinished draft must not show up.
    service
        .get_or_create_draft(12, PROGRAM_ID)
        .expect("draft creates");

    let program = standard_program();
    let submitted = repository.submitted(PROGRAM_ID).expect("query succeeds");
    let mut buffer = Vec::new();
    export_submitted_csv(&program, &submitted, &mut buffer).expect("export succeeds");
    let output = String::from_utf8(buffer).expect("valid utf8");

    let data_rows: Vec<&str> = output.lines().skip(1).collect();
    assert_eq!(data_rows.len(), 1);
    assert!(data_rows[0].contains("utility_assistance"));
    assert!(data_rows[0].contains("Luis: Son"));
}
