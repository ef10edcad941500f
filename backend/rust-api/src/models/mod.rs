use serde::{Deserialize, Serialize};

pub mod answer;
pub mod game;
pub mod hint;
pub mod score;

pub use answer::{Answer, AnswerOutcome};
pub use game::{GameMode, GameSettings, Progress, Question, SessionPhase, SessionSnapshot, SessionState};
pub use hint::{HintCategory, HintValue};
pub use score::{HighScoresQuery, SaveScoreRequest, UserScore};

/// Difficulty tier identifier (a generation bucket).
pub type TierId = u8;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pokemon {
    pub id: u32,
    pub name: String,
    pub sprite: String,
    pub cry_url: String,
    pub types: Vec<String>,
    pub stats: Vec<Stat>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stat {
    pub name: String,
    pub value: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PokemonRange {
    pub start: u32,
    pub end: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Generation {
    pub id: TierId,
    pub name: String,
    pub pokemon_range: PokemonRange,
}

#[derive(Debug, Deserialize)]
pub struct RandomPokemonQuery {
    pub generation_id: Option<TierId>,
}

#[derive(Debug, Deserialize)]
pub struct PokemonListQuery {
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}
