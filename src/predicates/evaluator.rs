use chrono::NaiveDate;

use super::{LeafOperationNode, Operator, PredicateExpressionNode, PredicateValue};
use crate::questions::{QuestionId, Scalar, ScalarValue, ServiceAreaState};

/// Source of applicant answers for predicate evaluation. Implementations
/// resolve the question against the current repeated-entity context.
pub trait AnswerLookup {
    fn scalar(&self, question_id: QuestionId, scalar: Scalar) -> Option<ScalarValue>;
}

/// Bottom-up walk of a predicate tree against one applicant's answers.
///
/// A leaf whose question is unanswered, or whose answer does not fit the
/// operator, evaluates to false rather than erroring: an applicant who has
/// not reached the referenced question never satisfies the predicate.
pub struct PredicateEvaluator<'a, L: AnswerLookup> {
    answers: &'a L,
    today: NaiveDate,
}

impl<'a, L: AnswerLookup> PredicateEvaluator<'a, L> {
    pub fn new(answers: &'a L, today: NaiveDate) -> Self {
        Self { answers, today }
    }

    pub fn evaluate(&self, node: &PredicateExpressionNode) -> bool {
        match node {
            PredicateExpressionNode::Leaf(leaf) => self.evaluate_leaf(leaf),
            PredicateExpressionNode::And(children) => {
                children.iter().all(|child| self.evaluate(child))
            }
            PredicateExpressionNode::Or(children) => {
                children.iter().any(|child| self.evaluate(child))
            }
        }
    }

    fn evaluate_leaf(&self, leaf: &LeafOperationNode) -> bool {
        let Some(answer) = self.answers.scalar(leaf.question_id, leaf.scalar) else {
            return false;
        };

        match leaf.operator {
            Operator::EqualTo => compare_equal(&answer, &leaf.value),
            Operator::NotEqualTo => {
                comparable(&answer, &leaf.value) && !compare_equal(&answer, &leaf.value)
            }
            Operator::GreaterThan => compare_order(&answer, &leaf.value, |ord| ord.is_gt()),
            Operator::GreaterThanOrEqualTo => compare_order(&answer, &leaf.value, |ord| ord.is_ge()),
            Operator::LessThan => compare_order(&answer, &leaf.value, |ord| ord.is_lt()),
            Operator::LessThanOrEqualTo => compare_order(&answer, &leaf.value, |ord| ord.is_le()),
            Operator::Between => match (&answer, &leaf.value) {
                (ScalarValue::Long(number), PredicateValue::PairOfLongs(low, high)) => {
                    low <= number && number <= high
                }
                (ScalarValue::Date(date), PredicateValue::PairOfDates(start, end)) => {
                    start <= date && date <= end
                }
                _ => false,
            },
            Operator::In => match (&answer, &leaf.value) {
                (ScalarValue::Text(text), PredicateValue::ListOfText(values)) => {
                    values.contains(text)
                }
                (ScalarValue::Long(number), PredicateValue::ListOfLongs(values)) => {
                    values.contains(number)
                }
                _ => false,
            },
            Operator::NotIn => match (&answer, &leaf.value) {
                (ScalarValue::Text(text), PredicateValue::ListOfText(values)) => {
                    !values.contains(text)
                }
                (ScalarValue::Long(number), PredicateValue::ListOfLongs(values)) => {
                    !values.contains(number)
                }
                _ => false,
            },
            Operator::AnyOf => match (&answer, &leaf.value) {
                (ScalarValue::List(selected), PredicateValue::ListOfText(values)) => {
                    selected.iter().any(|choice| values.contains(choice))
                }
                _ => false,
            },
            Operator::NoneOf => match (&answer, &leaf.value) {
                (ScalarValue::List(selected), PredicateValue::ListOfText(values)) => {
                    !selected.iter().any(|choice| values.contains(choice))
                }
                _ => false,
            },
            Operator::SubsetOf => match (&answer, &leaf.value) {
                (ScalarValue::List(selected), PredicateValue::ListOfText(values)) => {
                    selected.iter().all(|choice| values.contains(choice))
                }
                _ => false,
            },
            Operator::AgeOlderThan => match (&answer, &leaf.value) {
                (ScalarValue::Date(dob), PredicateValue::Long(years)) => self
                    .age_in_years(*dob)
                    .is_some_and(|age| i64::from(age) >= *years),
                _ => false,
            },
            Operator::AgeYoungerThan => match (&answer, &leaf.value) {
                (ScalarValue::Date(dob), PredicateValue::Long(years)) => self
                    .age_in_years(*dob)
                    .is_some_and(|age| i64::from(age) < *years),
                _ => false,
            },
            Operator::AgeBetween => match (&answer, &leaf.value) {
                (ScalarValue::Date(dob), PredicateValue::PairOfLongs(min, max)) => self
                    .age_in_years(*dob)
                    .is_some_and(|age| *min <= i64::from(age) && i64::from(age) <= *max),
                _ => false,
            },
            Operator::InServiceArea => {
                service_area_state(&answer, &leaf.value) == Some(ServiceAreaState::InArea)
            }
            Operator::NotInServiceArea => {
                service_area_state(&answer, &leaf.value) == Some(ServiceAreaState::NotInArea)
            }
        }
    }

    fn age_in_years(&self, date_of_birth: NaiveDate) -> Option<u32> {
        self.today.years_since(date_of_birth)
    }
}

fn compare_equal(answer: &ScalarValue, value: &PredicateValue) -> bool {
    match (answer, value) {
        (ScalarValue::Text(text), PredicateValue::Text(expected)) => text == expected,
        (ScalarValue::Long(number), PredicateValue::Long(expected)) => number == expected,
        (ScalarValue::Date(date), PredicateValue::Date(expected)) => date == expected,
        (ScalarValue::List(selected), PredicateValue::ListOfText(expected)) => {
            selected.len() == expected.len()
                && selected.iter().all(|choice| expected.contains(choice))
        }
        _ => false,
    }
}

/// Whether the answer/value pair is of a kind `compare_equal` understands.
/// NOT_EQUAL_TO must not report true for a type mismatch.
fn comparable(answer: &ScalarValue, value: &PredicateValue) -> bool {
    matches!(
        (answer, value),
        (ScalarValue::Text(_), PredicateValue::Text(_))
            | (ScalarValue::Long(_), PredicateValue::Long(_))
            | (ScalarValue::Date(_), PredicateValue::Date(_))
            | (ScalarValue::List(_), PredicateValue::ListOfText(_))
    )
}

fn compare_order(
    answer: &ScalarValue,
    value: &PredicateValue,
    check: fn(std::cmp::Ordering) -> bool,
) -> bool {
    match (answer, value) {
        (ScalarValue::Long(number), PredicateValue::Long(expected)) => check(number.cmp(expected)),
        (ScalarValue::Date(date), PredicateValue::Date(expected)) => check(date.cmp(expected)),
        _ => false,
    }
}

fn service_area_state(answer: &ScalarValue, value: &PredicateValue) -> Option<ServiceAreaState> {
    match (answer, value) {
        (ScalarValue::ServiceAreas(inclusions), PredicateValue::ServiceArea(area_id)) => inclusions
            .iter()
            .find(|inclusion| &inclusion.area_id == area_id)
            .map(|inclusion| inclusion.state),
        _ => None,
    }
}
