use std::collections::HashSet;

use serde_json::Value;

use super::{roadmap::RoadmapGraph, QuizQuestion, QuizRequest, OPTIONS_PER_QUESTION};
use crate::error::GenerationError;

fn mismatch(reason: impl Into<String>) -> GenerationError {
    GenerationError::SchemaMismatch(reason.into())
}

/// Checks that `value` is exactly the quiz `request` asked for.
///
/// Count must match, every question needs text and four distinct, non-blank
/// options, and the correct answer has to be one of those options.
pub fn validate_quiz(
    value: Value,
    request: &QuizRequest,
) -> Result<Vec<QuizQuestion>, GenerationError> {
    let Value::Array(items) = value else {
        return Err(mismatch("expected a JSON array of questions"));
    };

    if items.len() != request.count {
        return Err(mismatch(format!(
            "asked for {} questions, got {}",
            request.count,
            items.len()
        )));
    }

    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| validate_question(index, item, request))
        .collect()
}

fn validate_question(
    index: usize,
    item: Value,
    request: &QuizRequest,
) -> Result<QuizQuestion, GenerationError> {
    let number = index + 1;
    let mut question: QuizQuestion = serde_json::from_value(item)
        .map_err(|e| mismatch(format!("question {number}: {e}")))?;

    if question.question.trim().is_empty() {
        return Err(mismatch(format!("question {number} has no text")));
    }
    if question.options.len() != OPTIONS_PER_QUESTION {
        return Err(mismatch(format!(
            "question {number} has {} options, expected {OPTIONS_PER_QUESTION}",
            question.options.len()
        )));
    }
    if question.options.iter().any(|o| o.trim().is_empty()) {
        return Err(mismatch(format!("question {number} has a blank option")));
    }
    let distinct: HashSet<&str> = question.options.iter().map(|o| o.trim()).collect();
    if distinct.len() != question.options.len() {
        return Err(mismatch(format!("question {number} repeats an option")));
    }
    if !question.options.contains(&question.correct_answer) {
        return Err(mismatch(format!(
            "question {number}: correct answer {:?} is not one of the options",
            question.correct_answer
        )));
    }

    if question.topic.trim().is_empty() {
        question.topic = request.topic.clone();
    }
    if question.difficulty.trim().is_empty() {
        question.difficulty = request.difficulty.to_string();
    }
    Ok(question)
}

/// Checks that `value` is a usable roadmap graph.
pub fn validate_roadmap(value: Value) -> Result<RoadmapGraph, GenerationError> {
    let graph: RoadmapGraph =
        serde_json::from_value(value).map_err(|e| mismatch(format!("roadmap: {e}")))?;

    if graph.nodes.is_empty() {
        return Err(mismatch("roadmap has no nodes"));
    }

    let mut node_ids = HashSet::new();
    for node in &graph.nodes {
        if !node_ids.insert(node.id.as_str()) {
            return Err(mismatch(format!("duplicate node id {:?}", node.id)));
        }
    }

    let mut edge_ids = HashSet::new();
    for edge in &graph.edges {
        if !edge_ids.insert(edge.id.as_str()) {
            return Err(mismatch(format!("duplicate edge id {:?}", edge.id)));
        }
        for endpoint in [&edge.source, &edge.target] {
            if !node_ids.contains(endpoint.as_str()) {
                return Err(mismatch(format!(
                    "edge {:?} references unknown node {endpoint:?}",
                    edge.id
                )));
            }
        }
    }

    Ok(graph)
}
