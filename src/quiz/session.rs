use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use super::{QuizQuestion, QuizRequest, DEFAULT_TIME_LIMIT};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    Setup,
    Active,
    Completed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizConfig {
    pub request: QuizRequest,
    pub time_limit_secs: u64,
}

impl QuizConfig {
    pub fn new(request: QuizRequest, time_limit_secs: u64) -> Self {
        Self {
            request,
            time_limit_secs,
        }
    }
}

impl From<QuizRequest> for QuizConfig {
    fn from(request: QuizRequest) -> Self {
        Self::new(request, DEFAULT_TIME_LIMIT)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionAction {
    /// Generation succeeded; these are the questions to play.
    Begin(Vec<QuizQuestion>),
    Select(String),
    Next,
    Previous,
    GoTo(usize),
    /// Countdown update carrying the seconds still left.
    Tick { remaining: u64 },
    Submit,
    /// The time limit ran out.
    Expire,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    Started,
    Selected { index: usize },
    Moved { index: usize },
    Ticked,
    Completed(Score),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("The quiz has already started")]
    NotInSetup,

    #[error("The quiz is not in progress")]
    NotActive,

    #[error("Expected {expected} questions, got {got}")]
    QuestionCountMismatch { expected: usize, got: usize },

    #[error("A quiz needs at least one question")]
    EmptyQuiz,

    #[error("{0:?} is not one of the options")]
    UnknownOption(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Score {
    pub correct: usize,
    pub total: usize,
    pub percentage: f64,
    pub elapsed_seconds: u64,
}

impl Score {
    /// Pure scoring: an answer counts only when it equals the correct one.
    pub fn compute(
        questions: &[QuizQuestion],
        selected: &[Option<String>],
        elapsed_seconds: u64,
    ) -> Self {
        let correct = questions
            .iter()
            .zip(selected)
            .filter(|(question, answer)| question.is_correct(answer.as_deref()))
            .count();
        let total = questions.len();
        let percentage = if total == 0 {
            0.0
        } else {
            100.0 * correct as f64 / total as f64
        };

        Self {
            correct,
            total,
            percentage,
            elapsed_seconds,
        }
    }

    pub fn feedback(&self) -> &'static str {
        match self.percentage {
            p if p >= 90.0 => "Excellent!",
            p if p >= 70.0 => "Good job!",
            p if p >= 50.0 => "Nice try!",
            _ => "Keep practicing!",
        }
    }

    /// Elapsed time as `m:ss`.
    pub fn time_string(&self) -> String {
        format!("{}:{:02}", self.elapsed_seconds / 60, self.elapsed_seconds % 60)
    }
}

/// One attempt at a quiz, from setup until it is scored.
///
/// The session is plain data. Whoever owns it drives it through
/// [`QuizSession::apply`], and throws it away with [`QuizSession::restart`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizSession {
    id: Uuid,
    config: QuizConfig,
    questions: Vec<QuizQuestion>,
    selected: Vec<Option<String>>,
    current: usize,
    elapsed_seconds: u64,
    phase: Phase,
    score: Option<Score>,
}

impl QuizSession {
    pub fn new(config: QuizConfig) -> Self {
        Self {
            id: Uuid::new_v4(),
            config,
            questions: Vec::new(),
            selected: Vec::new(),
            current: 0,
            elapsed_seconds: 0,
            phase: Phase::Setup,
            score: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn config(&self) -> &QuizConfig {
        &self.config
    }

    pub fn questions(&self) -> &[QuizQuestion] {
        &self.questions
    }

    pub fn selected(&self) -> &[Option<String>] {
        &self.selected
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn current_question(&self) -> Option<&QuizQuestion> {
        self.questions.get(self.current)
    }

    pub fn current_answer(&self) -> Option<&str> {
        self.selected.get(self.current).and_then(|a| a.as_deref())
    }

    pub fn is_last(&self) -> bool {
        self.current + 1 >= self.questions.len()
    }

    pub fn elapsed_seconds(&self) -> u64 {
        self.elapsed_seconds
    }

    pub fn score(&self) -> Option<&Score> {
        self.score.as_ref()
    }

    /// Answers in question order, with unanswered questions as empty strings.
    pub fn answers(&self) -> Vec<String> {
        self.selected
            .iter()
            .map(|answer| answer.clone().unwrap_or_default())
            .collect()
    }

    /// Throws this attempt away. Only the settings survive; questions,
    /// answers and timing start from scratch.
    pub fn restart(self) -> Self {
        Self::new(self.config)
    }

    pub fn apply(&mut self, action: SessionAction) -> Result<Transition, SessionError> {
        match action {
            SessionAction::Begin(questions) => self.begin(questions),
            SessionAction::Select(option) => self.select(option),
            SessionAction::Next => self.move_to(self.current.saturating_add(1)),
            SessionAction::Previous => self.move_to(self.current.saturating_sub(1)),
            SessionAction::GoTo(index) => self.move_to(index),
            SessionAction::Tick { remaining } => {
                self.require_active()?;
                self.elapsed_seconds = self.config.time_limit_secs.saturating_sub(remaining);
                Ok(Transition::Ticked)
            }
            SessionAction::Submit => self.complete(),
            SessionAction::Expire => {
                self.require_active()?;
                self.elapsed_seconds = self.config.time_limit_secs;
                self.complete()
            }
        }
    }

    fn require_active(&self) -> Result<(), SessionError> {
        match self.phase {
            Phase::Active => Ok(()),
            _ => Err(SessionError::NotActive),
        }
    }

    fn begin(&mut self, questions: Vec<QuizQuestion>) -> Result<Transition, SessionError> {
        if self.phase != Phase::Setup {
            return Err(SessionError::NotInSetup);
        }
        if questions.is_empty() {
            return Err(SessionError::EmptyQuiz);
        }
        let expected = self.config.request.count;
        if questions.len() != expected {
            return Err(SessionError::QuestionCountMismatch {
                expected,
                got: questions.len(),
            });
        }

        self.selected = vec![None; questions.len()];
        self.questions = questions;
        self.current = 0;
        self.elapsed_seconds = 0;
        self.phase = Phase::Active;
        Ok(Transition::Started)
    }

    fn select(&mut self, option: String) -> Result<Transition, SessionError> {
        self.require_active()?;
        let index = self.current;
        let offered = self
            .questions
            .get(index)
            .is_some_and(|question| question.options.contains(&option));
        if !offered {
            return Err(SessionError::UnknownOption(option));
        }

        self.selected[index] = Some(option);
        Ok(Transition::Selected { index })
    }

    fn move_to(&mut self, index: usize) -> Result<Transition, SessionError> {
        self.require_active()?;
        self.current = index.min(self.questions.len().saturating_sub(1));
        Ok(Transition::Moved {
            index: self.current,
        })
    }

    fn complete(&mut self) -> Result<Transition, SessionError> {
        self.require_active()?;
        let score = Score::compute(&self.questions, &self.selected, self.elapsed_seconds);
        self.score = Some(score.clone());
        self.phase = Phase::Completed;
        Ok(Transition::Completed(score))
    }
}
