use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

pub const MAX_PLAYER_NAME_LENGTH: usize = 50;
pub const MIN_SCORE: i64 = 0;
pub const MAX_SCORE: i64 = 1_000_000;

pub const INVALID_NAME_MESSAGE: &str = "Name is required and must be between 1-50 characters";
pub const INVALID_SCORE_MESSAGE: &str = "Score must be between 0 and 1000000";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserScore {
    pub id: String,
    pub name: String,
    pub score: u32,
    pub date: DateTime<Utc>,
}

/// Request to submit a high score
#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct SaveScoreRequest {
    #[validate(custom(function = "validate_player_name"))]
    pub name: String,

    #[validate(range(min = 0, max = 1_000_000, message = "Score must be between 0 and 1000000"))]
    pub score: i64,
}

#[derive(Debug, Deserialize)]
pub struct HighScoresQuery {
    pub limit: Option<usize>,
}

fn validate_player_name(name: &str) -> Result<(), ValidationError> {
    let trimmed = name.trim();
    if trimmed.is_empty() || trimmed.chars().count() > MAX_PLAYER_NAME_LENGTH {
        return Err(ValidationError::new("player_name").with_message(INVALID_NAME_MESSAGE.into()));
    }
    Ok(())
}
