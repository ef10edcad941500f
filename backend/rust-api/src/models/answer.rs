use serde::{Deserialize, Serialize};

/// Input to a question. A countdown expiry is its own variant rather than
/// an empty selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "pokemon_id", rename_all = "snake_case")]
pub enum Answer {
    Choice(u32),
    TimedOut,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnswerOutcome {
    pub correct: bool,
    pub timed_out: bool,
    pub points_awarded: u32,
    pub correct_id: u32,
    pub streak: u32,
}
