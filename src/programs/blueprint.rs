use super::{ApplicationStep, BlockDefinition, ProgramDefinition, ProgramQuestion};
use crate::locale::LocalizedStrings;
use crate::predicates::{
    LeafOperationNode, Operator, PredicateAction, PredicateDefinition, PredicateValue,
};
use crate::questions::{
    QuestionDefinition, QuestionOption, QuestionType, Scalar, ValidationRules,
};

/// The standard utility-assistance program used by the CLI demo and the
/// workflow tests: predicate-gated screens, an income eligibility cap, a
/// service-area check, and a household-member enumerator.
pub fn standard_program() -> ProgramDefinition {
    ProgramDefinition {
        id: 1,
        admin_name: "utility_assistance".to_string(),
        display_name: LocalizedStrings::of("Utility Assistance Program")
            .with("es-US", "Programa de Asistencia de Servicios Públicos"),
        description: LocalizedStrings::of(
            "Help with electric, gas, and water bills for qualifying households.",
        ),
        confirmation_message: LocalizedStrings::of(
            "Your application has been received. A caseworker will contact you within ten business days.",
        ),
        application_steps: vec![
            ApplicationStep {
                title: LocalizedStrings::of("Tell us about yourself"),
                description: LocalizedStrings::of("Name, date of birth, and household details."),
            },
            ApplicationStep {
                title: LocalizedStrings::of("Share your income and address"),
                description: LocalizedStrings::of(
                    "Monthly income and where you live determine what you qualify for.",
                ),
            },
            ApplicationStep {
                title: LocalizedStrings::of("Review and submit"),
                description: LocalizedStrings::of("Check your answers and send the application."),
            },
        ],
        blocks: standard_blocks(),
        questions: standard_questions(),
    }
}

fn standard_blocks() -> Vec<BlockDefinition> {
    vec![
        BlockDefinition::new(1, "Your information")
            .with_description("Who is applying")
            .with_questions(vec![
                ProgramQuestion::required(1),
                ProgramQuestion::required(2),
            ]),
        BlockDefinition::new(2, "Household")
            .with_description("Household size and service history")
            .with_questions(vec![
                ProgramQuestion::required(3),
                ProgramQuestion::required(4),
            ]),
        BlockDefinition::new(3, "Income")
            .with_description("Monthly household income")
            .with_questions(vec![ProgramQuestion::required(5)])
            .with_eligibility(PredicateDefinition::single_question(
                LeafOperationNode::new(
                    5,
                    Scalar::CurrencyCents,
                    Operator::LessThanOrEqualTo,
                    PredicateValue::Long(350_000),
                ),
                PredicateAction::Eligible,
            )),
        BlockDefinition::new(4, "Veteran details")
            .with_description("Additional benefits for veterans")
            .with_questions(vec![ProgramQuestion::required(11)])
            .with_visibility(PredicateDefinition::single_question(
                LeafOperationNode::new(
                    4,
                    Scalar::Selection,
                    Operator::EqualTo,
                    PredicateValue::Text("yes".to_string()),
                ),
                PredicateAction::ShowBlock,
            )),
        BlockDefinition::new(5, "Address")
            .with_description("Where you receive utility service")
            .with_questions(vec![ProgramQuestion::required(6)])
            .with_eligibility(PredicateDefinition::single_question(
                LeafOperationNode::new(
                    6,
                    Scalar::ServiceAreas,
                    Operator::InServiceArea,
                    PredicateValue::ServiceArea("metro_county".to_string()),
                ),
                PredicateAction::Eligible,
            )),
        BlockDefinition::new(6, "Utilities")
            .with_description("Bills you are responsible for")
            .with_questions(vec![
                ProgramQuestion::optional(10),
                ProgramQuestion::required(12),
            ]),
        BlockDefinition::new(7, "Household members")
            .with_description("People who live with you")
            .with_questions(vec![ProgramQuestion::required(7)]),
        BlockDefinition::new(8, "Household member details")
            .with_description("Details for each household member")
            .with_repeater(7)
            .with_questions(vec![
                ProgramQuestion::required(8),
                ProgramQuestion::required(9),
            ]),
    ]
}

fn standard_questions() -> Vec<QuestionDefinition> {
    vec![
        QuestionDefinition::new(
            1,
            "applicant_name",
            LocalizedStrings::of("What is your full name?"),
            QuestionType::Name,
        ),
        QuestionDefinition::new(
            2,
            "applicant_dob",
            LocalizedStrings::of("What is your date of birth?"),
            QuestionType::Date,
        ),
        QuestionDefinition::new(
            3,
            "household_size",
            LocalizedStrings::of("How many people live in your household?"),
            QuestionType::Number,
        )
        .with_validation(ValidationRules {
            min_value: Some(1),
            max_value: Some(15),
            ..ValidationRules::default()
        }),
        QuestionDefinition::new(
            4,
            "veteran_status",
            LocalizedStrings::of("Have you served in the U.S. armed forces?"),
            QuestionType::Radio,
        )
        .with_options(vec![
            QuestionOption {
                id: 1,
                admin_name: "yes".to_string(),
                text: LocalizedStrings::of("Yes"),
            },
            QuestionOption {
                id: 2,
                admin_name: "no".to_string(),
                text: LocalizedStrings::of("No"),
            },
        ]),
        QuestionDefinition::new(
            5,
            "monthly_income",
            LocalizedStrings::of("What is your household's total monthly income?"),
            QuestionType::Currency,
        )
        .with_help_text(LocalizedStrings::of(
            "Include wages, benefits, and any other regular income before taxes.",
        )),
        QuestionDefinition::new(
            6,
            "home_address",
            LocalizedStrings::of("Where do you live?"),
            QuestionType::Address,
        ),
        QuestionDefinition::new(
            7,
            "household_members",
            LocalizedStrings::of("Who else lives in your household?"),
            QuestionType::Enumerator,
        )
        .with_validation(ValidationRules {
            max_entities: Some(10),
            ..ValidationRules::default()
        }),
        QuestionDefinition::new(
            8,
            "member_relationship",
            LocalizedStrings::of("What is this person's relationship to you?"),
            QuestionType::Text,
        )
        .with_enumerator(7),
        QuestionDefinition::new(
            9,
            "member_dob",
            LocalizedStrings::of("What is this person's date of birth?"),
            QuestionType::Date,
        )
        .with_enumerator(7),
        QuestionDefinition::new(
            10,
            "utility_bills",
            LocalizedStrings::of("Which utility bills are in your name?"),
            QuestionType::Checkbox,
        )
        .with_options(vec![
            QuestionOption {
                id: 1,
                admin_name: "electric".to_string(),
                text: LocalizedStrings::of("Electric"),
            },
            QuestionOption {
                id: 2,
                admin_name: "gas".to_string(),
                text: LocalizedStrings::of("Gas"),
            },
            QuestionOption {
                id: 3,
                admin_name: "water".to_string(),
                text: LocalizedStrings::of("Water"),
            },
        ]),
        QuestionDefinition::new(
            11,
            "service_branch",
            LocalizedStrings::of("Which branch did you serve in?"),
            QuestionType::Text,
        ),
        QuestionDefinition::new(
            12,
            "document_notice",
            LocalizedStrings::of(
                "Keep copies of your utility bills from the last three months. A caseworker may ask for them during review.",
            ),
            QuestionType::Static,
        ),
    ]
}
