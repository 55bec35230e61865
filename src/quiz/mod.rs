pub mod ai_helper;
pub mod extract;
pub mod prompt;
pub mod roadmap;
pub mod session;
pub mod validate;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::GenerationError;

/// Number of answer options every generated question carries.
pub const OPTIONS_PER_QUESTION: usize = 4;

pub const QUESTION_COUNT_CHOICES: [usize; 4] = [5, 10, 15, 20];
pub const TIME_LIMIT_CHOICES: [u64; 4] = [60, 120, 180, 300];
pub const DEFAULT_TIME_LIMIT: u64 = 180;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
    Other(String),
}

impl From<String> for Difficulty {
    fn from(value: String) -> Self {
        match value.trim().to_lowercase().as_str() {
            "easy" => Difficulty::Easy,
            "medium" => Difficulty::Medium,
            "hard" => Difficulty::Hard,
            _ => Difficulty::Other(value.trim().to_string()),
        }
    }
}

impl From<Difficulty> for String {
    fn from(value: Difficulty) -> Self {
        value.to_string()
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Difficulty::Easy => f.write_str("easy"),
            Difficulty::Medium => f.write_str("medium"),
            Difficulty::Hard => f.write_str("hard"),
            Difficulty::Other(other) => f.write_str(other),
        }
    }
}

/// What the user asked a quiz to be about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizRequest {
    pub topic: String,
    pub count: usize,
    #[serde(default)]
    pub difficulty: Difficulty,
}

impl QuizRequest {
    pub fn new(topic: impl Into<String>, count: usize, difficulty: Difficulty) -> Self {
        Self {
            topic: topic.into(),
            count,
            difficulty,
        }
    }

    /// Rejects requests that must never reach the provider.
    pub fn validated(mut self) -> Result<Self, GenerationError> {
        self.topic = self.topic.trim().to_string();
        if self.topic.is_empty() {
            return Err(GenerationError::InvalidRequest(
                "Please enter a quiz topic".to_string(),
            ));
        }
        if self.count == 0 {
            return Err(GenerationError::InvalidRequest(
                "Number of questions can't be 0".to_string(),
            ));
        }
        Ok(self)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizQuestion {
    pub question: String,
    pub options: Vec<String>,
    pub correct_answer: String,
    #[serde(default)]
    pub topic: String,
    #[serde(default)]
    pub difficulty: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

impl QuizQuestion {
    pub fn is_correct(&self, answer: Option<&str>) -> bool {
        answer.is_some_and(|answer| answer == self.correct_answer)
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn difficulty_parses_known_levels_case_insensitively() {
        assert_eq!(Difficulty::from("Hard".to_string()), Difficulty::Hard);
        assert_eq!(Difficulty::from(" easy ".to_string()), Difficulty::Easy);
        assert_eq!(
            Difficulty::from("expert".to_string()),
            Difficulty::Other("expert".to_string())
        );
    }

    #[test]
    fn difficulty_defaults_to_medium_on_the_wire() {
        let request: QuizRequest = serde_json::from_str(r#"{"topic":"Math","count":3}"#).unwrap();
        assert_eq!(request.difficulty, Difficulty::Medium);

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["difficulty"], "medium");
    }

    #[test]
    fn request_validation() {
        let ok = QuizRequest::new("  Math ", 3, Difficulty::Medium)
            .validated()
            .unwrap();
        assert_eq!(ok.topic, "Math");

        assert!(matches!(
            QuizRequest::new("   ", 3, Difficulty::Medium).validated(),
            Err(GenerationError::InvalidRequest(_))
        ));
        assert!(matches!(
            QuizRequest::new("Math", 0, Difficulty::Medium).validated(),
            Err(GenerationError::InvalidRequest(_))
        ));
    }

    #[test]
    fn unanswered_never_matches() {
        let question = fixtures::question(1);
        assert!(!question.is_correct(None));
        assert!(!question.is_correct(Some("")));
        assert!(question.is_correct(Some("Q1 option 2")));
    }

    #[test]
    fn question_uses_camel_case_on_the_wire() {
        let json = serde_json::to_value(fixtures::question(1)).unwrap();
        assert_eq!(json["correctAnswer"], "Q1 option 2");
    }
}
