//! Predicate expression trees gating block visibility and eligibility.
//!
//! Admins author predicates as an OR of ANDs over leaf comparisons (or a
//! single leaf); the tree shape is preserved so stored predicates round-trip.

mod evaluator;
mod operator;

pub use evaluator::{AnswerLookup, PredicateEvaluator};
pub use operator::{Operator, PredicateValue};

use serde::{Deserialize, Serialize};

use crate::questions::{QuestionId, Scalar};

/// Comparison of one question scalar against a literal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeafOperationNode {
    pub question_id: QuestionId,
    pub scalar: Scalar,
    pub operator: Operator,
    pub value: PredicateValue,
}

impl LeafOperationNode {
    pub fn new(
        question_id: QuestionId,
        scalar: Scalar,
        operator: Operator,
        value: PredicateValue,
    ) -> Self {
        Self {
            question_id,
            scalar,
            operator,
            value,
        }
    }
}

/// A node in a predicate expression tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PredicateExpressionNode {
    Leaf(LeafOperationNode),
    And(Vec<PredicateExpressionNode>),
    Or(Vec<PredicateExpressionNode>),
}

impl PredicateExpressionNode {
    /// Question ids referenced anywhere in the tree, in first-seen order.
    pub fn questions(&self) -> Vec<QuestionId> {
        let mut ids = Vec::new();
        self.collect_questions(&mut ids);
        ids
    }

    fn collect_questions(&self, ids: &mut Vec<QuestionId>) {
        match self {
            PredicateExpressionNode::Leaf(leaf) => {
                if !ids.contains(&leaf.question_id) {
                    ids.push(leaf.question_id);
                }
            }
            PredicateExpressionNode::And(children) | PredicateExpressionNode::Or(children) => {
                for child in children {
                    child.collect_questions(ids);
                }
            }
        }
    }
}

/// How a `true` evaluation is applied to the block carrying the predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PredicateAction {
    HideBlock,
    ShowBlock,
    Eligible,
}

impl PredicateAction {
    pub const fn label(self) -> &'static str {
        match self {
            PredicateAction::HideBlock => "hidden if",
            PredicateAction::ShowBlock => "shown if",
            PredicateAction::Eligible => "eligible if",
        }
    }
}

/// Stored shape of the tree, used by admin tooling to re-render the editor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PredicateFormat {
    SingleQuestion,
    OrOfSingleLayerAnds,
}

/// A complete predicate: expression tree plus the action it drives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredicateDefinition {
    pub root: PredicateExpressionNode,
    pub action: PredicateAction,
    pub format: PredicateFormat,
}

impl PredicateDefinition {
    pub fn single_question(leaf: LeafOperationNode, action: PredicateAction) -> Self {
        Self {
            root: PredicateExpressionNode::Leaf(leaf),
            action,
            format: PredicateFormat::SingleQuestion,
        }
    }

    /// Build the OR-of-ANDs tree the predicate editor produces: each inner
    /// vec is one AND group, the groups are OR'd together.
    pub fn or_of_ands(groups: Vec<Vec<LeafOperationNode>>, action: PredicateAction) -> Self {
        let ands = groups
            .into_iter()
            .map(|group| {
                PredicateExpressionNode::And(
                    group.into_iter().map(PredicateExpressionNode::Leaf).collect(),
                )
            })
            .collect();
        Self {
            root: PredicateExpressionNode::Or(ands),
            action,
            format: PredicateFormat::OrOfSingleLayerAnds,
        }
    }

    pub fn questions(&self) -> Vec<QuestionId> {
        self.root.questions()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(question_id: QuestionId) -> LeafOperationNode {
        LeafOperationNode::new(
            question_id,
            Scalar::Number,
            Operator::EqualTo,
            PredicateValue::Long(1),
        )
    }

    #[test]
    fn single_question_format_is_recorded() {
        let predicate =
            PredicateDefinition::single_question(leaf(7), PredicateAction::ShowBlock);
        assert_eq!(predicate.format, PredicateFormat::SingleQuestion);
        assert_eq!(predicate.questions(), vec![7]);
    }

    #[test]
    fn or_of_ands_collects_questions_without_duplicates() {
        let predicate = PredicateDefinition::or_of_ands(
            vec![vec![leaf(1), leaf(2)], vec![leaf(2), leaf(3)]],
            PredicateAction::Eligible,
        );
        assert_eq!(predicate.format, PredicateFormat::OrOfSingleLayerAnds);
        assert_eq!(predicate.questions(), vec![1, 2, 3]);
    }
}
