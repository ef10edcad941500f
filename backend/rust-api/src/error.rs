//! Error types shared by the quiz core, the data source and the score store.

use thiserror::Error;

/// Failures of a single remote Pokémon lookup.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum ItemSourceError {
    #[error("Pokemon not found: {0}")]
    NotFound(String),
    #[error("Network error: {message}")]
    Network {
        message: String,
        status: Option<u16>,
    },
}

impl ItemSourceError {
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
            status: None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

impl From<reqwest::Error> for ItemSourceError {
    fn from(err: reqwest::Error) -> Self {
        Self::Network {
            message: err.to_string(),
            status: err.status().map(|s| s.as_u16()),
        }
    }
}

/// Errors emitted by the unique-item fetcher.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum FetchError {
    #[error(
        "Failed to load enough unique Pokemon. Got {got} out of {needed} needed after {attempts} attempts."
    )]
    InsufficientUniqueItems {
        needed: usize,
        got: usize,
        attempts: usize,
    },
    #[error(transparent)]
    Source(#[from] ItemSourceError),
}

/// Errors emitted by the quiz session.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum QuizError {
    #[error("Failed to start game: {0}")]
    SessionStart(#[source] FetchError),
    #[error("Failed to load question: {0}")]
    QuestionLoad(#[source] FetchError),
    #[error("no game in progress")]
    NotActive,
    #[error("invalid game settings: {0}")]
    InvalidSettings(String),
}

/// Errors emitted by `ScoreService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ScoreError {
    #[error("{0}")]
    Validation(String),
    #[error("{message}")]
    Persistence {
        message: String,
        #[source]
        source: std::io::Error,
    },
}
