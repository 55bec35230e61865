use log::{info, warn};
use rand::{seq::SliceRandom, thread_rng};

use super::{
    extract::{extract_json, Shape},
    prompt::{quiz_prompt, roadmap_prompt},
    roadmap::{RoadmapGraph, RoadmapRequest},
    validate::{validate_quiz, validate_roadmap},
    QuizQuestion, QuizRequest,
};
use crate::{error::GenerationError, llm::TextGenerator};

/// Runs the whole generation chain: prompt, model call, JSON extraction and
/// validation. Any failure abandons the attempt; nothing partial comes back.
pub struct QuizHelper {
    generator: Box<dyn TextGenerator>,
    shuffle_options: bool,
}

impl QuizHelper {
    pub fn new(generator: Box<dyn TextGenerator>, shuffle_options: bool) -> Self {
        Self {
            generator,
            shuffle_options,
        }
    }

    pub fn model(&self) -> &str {
        self.generator.model()
    }

    pub async fn generate_questions(
        &self,
        request: QuizRequest,
    ) -> Result<Vec<QuizQuestion>, GenerationError> {
        let request = request.validated()?;
        info!(
            "Generating {} {} questions about {:?}",
            request.count, request.difficulty, request.topic
        );

        let text = self.generator.complete(&quiz_prompt(&request)).await?;
        let value = extract_json(&text, Shape::Array)?;
        let mut questions = validate_quiz(value, &request).map_err(|e| {
            warn!("Rejected generated quiz: {e}");
            e
        })?;

        // Spread correct answers across option slots.
        if self.shuffle_options {
            let mut rng = thread_rng();
            for question in &mut questions {
                question.options.shuffle(&mut rng);
            }
        }

        Ok(questions)
    }

    pub async fn generate_roadmap(
        &self,
        request: RoadmapRequest,
    ) -> Result<RoadmapGraph, GenerationError> {
        let request = request.validated()?;
        info!(
            "Generating {} roadmap for {:?}",
            request.level, request.subject
        );

        let text = self.generator.complete(&roadmap_prompt(&request)).await?;
        let value = extract_json(&text, Shape::Object)?;
        validate_roadmap(value).map_err(|e| {
            warn!("Rejected generated roadmap: {e}");
            e
        })
    }
}
