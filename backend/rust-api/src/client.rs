//! Typed client for the quiz HTTP API.
//!
//! `QuizApiClient` implements [`ItemSource`], so a [`crate::quiz::QuizSession`]
//! can be driven against a running backend.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;

use crate::error::ItemSourceError;
use crate::models::{Generation, Pokemon, SaveScoreRequest, TierId, UserScore};
use crate::quiz::ItemSource;
use crate::services::pokeapi::USER_AGENT;

#[derive(Debug, Clone)]
pub struct QuizApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl QuizApiClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ItemSourceError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/v1/{}", self.base_url, path)
    }

    pub async fn random_pokemon(
        &self,
        generation_id: Option<TierId>,
    ) -> Result<Option<Pokemon>, ItemSourceError> {
        let mut request = self.http.get(self.url("pokemon/random"));
        if let Some(id) = generation_id {
            request = request.query(&[("generation_id", id)]);
        }
        decode(request.send().await?, "random").await
    }

    pub async fn pokemon_by_id(&self, id: u32) -> Result<Pokemon, ItemSourceError> {
        let response = self.http.get(self.url(&format!("pokemon/{}", id))).send().await?;
        decode(response, &id.to_string()).await
    }

    pub async fn generations(&self) -> Result<Vec<Generation>, ItemSourceError> {
        decode(self.http.get(self.url("generations")).send().await?, "generations").await
    }

    pub async fn high_scores(&self, limit: Option<usize>) -> Result<Vec<UserScore>, ItemSourceError> {
        let mut request = self.http.get(self.url("high-scores"));
        if let Some(limit) = limit {
            request = request.query(&[("limit", limit)]);
        }
        decode(request.send().await?, "high-scores").await
    }

    /// Rejected submissions surface as `Network` with status 400 and the
    /// server's message.
    pub async fn save_score(&self, name: &str, score: i64) -> Result<UserScore, ItemSourceError> {
        let body = SaveScoreRequest {
            name: name.to_string(),
            score,
        };
        let response = self
            .http
            .post(self.url("high-scores"))
            .json(&body)
            .send()
            .await?;
        decode(response, "high-scores").await
    }
}

async fn decode<T: DeserializeOwned>(response: Response, subject: &str) -> Result<T, ItemSourceError> {
    let status = response.status();
    if status == StatusCode::NOT_FOUND {
        return Err(ItemSourceError::NotFound(subject.to_string()));
    }
    if !status.is_success() {
        let message = response.text().await.unwrap_or_default();
        return Err(ItemSourceError::Network {
            message: if message.is_empty() {
                status.to_string()
            } else {
                message
            },
            status: Some(status.as_u16()),
        });
    }
    Ok(response.json::<T>().await?)
}

#[async_trait]
impl ItemSource for QuizApiClient {
    async fn random_item(&self, tier: Option<TierId>) -> Result<Option<Pokemon>, ItemSourceError> {
        self.random_pokemon(tier).await
    }
}
