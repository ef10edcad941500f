use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::Utc;
use tokio::sync::Mutex;
use uuid::Uuid;
use validator::Validate;

use crate::error::ScoreError;
use crate::metrics::SCORES_SAVED_TOTAL;
use crate::models::{SaveScoreRequest, UserScore};

pub const MAX_HIGH_SCORES: usize = 100;
pub const DEFAULT_HIGH_SCORES_DISPLAY: usize = 10;

/// High scores kept in a single pretty-printed JSON file.
///
/// All file access goes through one async mutex so concurrent saves cannot
/// interleave their read-modify-write cycles.
pub struct ScoreService {
    path: PathBuf,
    guard: Mutex<()>,
}

impl ScoreService {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            guard: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Validates and stores a score, keeping only the best `MAX_HIGH_SCORES`.
    pub async fn save_score(&self, name: &str, score: i64) -> Result<UserScore, ScoreError> {
        let request = SaveScoreRequest {
            name: name.to_string(),
            score,
        };
        if let Err(errors) = request.validate() {
            SCORES_SAVED_TOTAL.with_label_values(&["invalid"]).inc();
            return Err(ScoreError::Validation(first_message(&errors)));
        }

        let entry = UserScore {
            id: Uuid::new_v4().to_string(),
            name: name.trim().to_string(),
            // Range-validated above.
            score: score as u32,
            date: Utc::now(),
        };

        let _guard = self.guard.lock().await;
        let mut scores = self.load_scores().await;
        scores.push(entry.clone());
        sort_descending(&mut scores);
        scores.truncate(MAX_HIGH_SCORES);

        if let Err(err) = self.write_scores(&scores).await {
            SCORES_SAVED_TOTAL.with_label_values(&["error"]).inc();
            return Err(err);
        }

        SCORES_SAVED_TOTAL.with_label_values(&["success"]).inc();
        tracing::info!("Saved score: {} - {} points", entry.name, entry.score);
        Ok(entry)
    }

    pub async fn high_scores(&self, limit: usize) -> Vec<UserScore> {
        let _guard = self.guard.lock().await;
        let mut scores = self.load_scores().await;
        sort_descending(&mut scores);
        scores.truncate(limit);
        scores
    }

    pub async fn score_count(&self) -> usize {
        let _guard = self.guard.lock().await;
        self.load_scores().await.len()
    }

    pub async fn clear_scores(&self) -> Result<(), ScoreError> {
        let _guard = self.guard.lock().await;
        self.write_scores(&[]).await?;
        tracing::info!("All scores cleared");
        Ok(())
    }

    async fn load_scores(&self) -> Vec<UserScore> {
        let data = match tokio::fs::read_to_string(&self.path).await {
            Ok(data) => data,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                tracing::info!("Scores file {} not found, starting empty", self.path.display());
                return Vec::new();
            }
            Err(err) => {
                tracing::error!("Error loading scores from {}: {}", self.path.display(), err);
                return Vec::new();
            }
        };

        match serde_json::from_str(&data) {
            Ok(scores) => scores,
            Err(err) => {
                tracing::error!("Corrupt scores file {}: {}", self.path.display(), err);
                Vec::new()
            }
        }
    }

    async fn write_scores(&self, scores: &[UserScore]) -> Result<(), ScoreError> {
        let persistence = |source: std::io::Error| {
            tracing::error!("Error saving scores to {}: {}", self.path.display(), source);
            ScoreError::Persistence {
                message: "Failed to save score".to_string(),
                source,
            }
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(persistence)?;
        }
        let body = serde_json::to_string_pretty(scores)
            .map_err(|e| persistence(std::io::Error::new(ErrorKind::InvalidData, e)))?;
        tokio::fs::write(&self.path, body).await.map_err(persistence)
    }
}

fn sort_descending(scores: &mut [UserScore]) {
    // Stable: equal scores keep insertion order.
    scores.sort_by(|a, b| b.score.cmp(&a.score));
}

fn first_message(errors: &validator::ValidationErrors) -> String {
    errors
        .field_errors()
        .values()
        .flat_map(|errs| errs.iter())
        .find_map(|err| err.message.as_ref().map(|m| m.to_string()))
        .unwrap_or_else(|| errors.to_string())
}
