use serde::{Deserialize, Serialize};

use super::{HintCategory, Pokemon, TierId};
use crate::error::QuizError;

pub const DEFAULT_NUMBER_OF_CHOICES: usize = 4;
pub const DEFAULT_QUESTION_COUNT: u32 = 10;
pub const DEFAULT_TIME_PER_QUESTION: u32 = 30;
pub const ALLOWED_CHOICE_COUNTS: [usize; 2] = [4, 6];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameMode {
    /// Guess from the silhouette.
    #[default]
    Visual,
    /// Guess from the cry.
    Audio,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameSettings {
    pub mode: GameMode,
    pub difficulty: TierId,
    pub number_of_choices: usize,
    pub question_count: u32,
    /// Seconds per question; `None` disables the countdown.
    pub time_per_question: Option<u32>,
}

impl Default for GameSettings {
    fn default() -> Self {
        Self {
            mode: GameMode::Visual,
            difficulty: 1,
            number_of_choices: DEFAULT_NUMBER_OF_CHOICES,
            question_count: DEFAULT_QUESTION_COUNT,
            time_per_question: Some(DEFAULT_TIME_PER_QUESTION),
        }
    }
}

impl GameSettings {
    pub fn validate(&self) -> Result<(), QuizError> {
        if !ALLOWED_CHOICE_COUNTS.contains(&self.number_of_choices) {
            return Err(QuizError::InvalidSettings(format!(
                "number_of_choices must be one of {:?}, got {}",
                ALLOWED_CHOICE_COUNTS, self.number_of_choices
            )));
        }
        if self.question_count == 0 {
            return Err(QuizError::InvalidSettings(
                "question_count must be at least 1".to_string(),
            ));
        }
        if self.time_per_question == Some(0) {
            return Err(QuizError::InvalidSettings(
                "time_per_question must be positive when set".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Question {
    pub target: Pokemon,
    pub options: Vec<Pokemon>,
    pub answered: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SessionState {
    pub question_index: u32,
    pub score: u32,
    pub streak: u32,
    pub hints_remaining: u32,
    pub hints_used: u32,
    pub correct_count: u32,
    pub wrong_count: u32,
    pub is_over: bool,
}

impl SessionState {
    pub fn fresh(hints: u32) -> Self {
        Self {
            hints_remaining: hints,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    #[default]
    NotStarted,
    InProgress,
    Over,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Progress {
    pub current: u32,
    pub total: u32,
    pub percentage: f64,
}

/// Read-only view of a session handed to the presentation layer.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub phase: SessionPhase,
    pub state: SessionState,
    pub question: Option<Question>,
    pub is_loading: bool,
    pub error: Option<String>,
    pub revealed_hints: Vec<HintCategory>,
    pub progress: Progress,
    pub time_remaining: Option<u32>,
}
