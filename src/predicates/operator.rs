use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Comparison applied by a leaf predicate node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    EqualTo,
    NotEqualTo,
    GreaterThan,
    GreaterThanOrEqualTo,
    LessThan,
    LessThanOrEqualTo,
    Between,
    In,
    NotIn,
    AnyOf,
    NoneOf,
    SubsetOf,
    AgeOlderThan,
    AgeYoungerThan,
    AgeBetween,
    InServiceArea,
    NotInServiceArea,
}

impl Operator {
    /// Phrase used when rendering a predicate for operators and applicants.
    pub const fn label(self) -> &'static str {
        match self {
            Operator::EqualTo => "is equal to",
            Operator::NotEqualTo => "is not equal to",
            Operator::GreaterThan => "is greater than",
            Operator::GreaterThanOrEqualTo => "is greater than or equal to",
            Operator::LessThan => "is less than",
            Operator::LessThanOrEqualTo => "is less than or equal to",
            Operator::Between => "is between",
            Operator::In => "is one of",
            Operator::NotIn => "is not one of",
            Operator::AnyOf => "contains any of",
            Operator::NoneOf => "contains none of",
            Operator::SubsetOf => "is a subset of",
            Operator::AgeOlderThan => "age is older than",
            Operator::AgeYoungerThan => "age is younger than",
            Operator::AgeBetween => "age is between",
            Operator::InServiceArea => "is in service area",
            Operator::NotInServiceArea => "is not in service area",
        }
    }
}

/// The literal on the right-hand side of a leaf comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PredicateValue {
    Long(i64),
    Text(String),
    Date(NaiveDate),
    ListOfText(Vec<String>),
    ListOfLongs(Vec<i64>),
    PairOfLongs(i64, i64),
    PairOfDates(NaiveDate, NaiveDate),
    ServiceArea(String),
}

impl PredicateValue {
    /// Human-readable rendering for admin views and the demo walkthrough.
    pub fn display(&self) -> String {
        match self {
            PredicateValue::Long(value) => value.to_string(),
            PredicateValue::Text(value) => format!("\"{value}\""),
            PredicateValue::Date(value) => value.format("%Y-%m-%d").to_string(),
            PredicateValue::ListOfText(values) => {
                let quoted: Vec<String> =
                    values.iter().map(|value| format!("\"{value}\"")).collect();
                format!("[{}]", quoted.join(", "))
            }
            PredicateValue::ListOfLongs(values) => {
                let rendered: Vec<String> = values.iter().map(i64::to_string).collect();
                format!("[{}]", rendered.join(", "))
            }
            PredicateValue::PairOfLongs(low, high) => format!("{low} and {high}"),
            PredicateValue::PairOfDates(start, end) => format!(
                "{} and {}",
                start.format("%Y-%m-%d"),
                end.format("%Y-%m-%d")
            ),
            PredicateValue::ServiceArea(area_id) => area_id.clone(),
        }
    }
}
