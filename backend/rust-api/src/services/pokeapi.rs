use std::fmt;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::join_all;
use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};
use reqwest::{header, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use super::tiers;
use crate::error::ItemSourceError;
use crate::metrics::POKEAPI_REQUESTS_TOTAL;
use crate::models::{Pokemon, Stat, TierId};
use crate::quiz::{lock, ItemSource};
use crate::utils::retry::{retry_async_when, RetryConfig};

pub const USER_AGENT: &str = "PokemonQuizGame/1.0";
pub const DEFAULT_LIST_LIMIT: u32 = 20;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApiMode {
    #[default]
    Real,
    Mock,
}

impl fmt::Display for ApiMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiMode::Real => write!(f, "real"),
            ApiMode::Mock => write!(f, "mock"),
        }
    }
}

/// Read side of the Pokémon data exposed over HTTP.
#[async_trait]
pub trait PokemonCatalog: Send + Sync {
    async fn pokemon_by_id(&self, id: u32) -> Result<Pokemon, ItemSourceError>;
    async fn pokemon_by_name(&self, name: &str) -> Result<Pokemon, ItemSourceError>;
    /// `Ok(None)` when the drawn id does not exist upstream.
    async fn random_pokemon(&self, tier: Option<TierId>)
        -> Result<Option<Pokemon>, ItemSourceError>;
    async fn pokemon_list(&self, limit: u32, offset: u32) -> Result<Vec<Pokemon>, ItemSourceError>;
}

/// PokéAPI client working against the public API or a local mock server.
pub struct PokeApiDataSource {
    client: reqwest::Client,
    base_url: String,
    mode: ApiMode,
    retry: RetryConfig,
    rng: Mutex<Box<dyn RngCore + Send>>,
}

impl PokeApiDataSource {
    pub fn new(
        mode: ApiMode,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ItemSourceError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            mode,
            retry: RetryConfig::default(),
            rng: Mutex::new(Box::new(StdRng::from_os_rng())),
        })
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_rng(mut self, rng: impl RngCore + Send + 'static) -> Self {
        self.rng = Mutex::new(Box::new(rng));
        self
    }

    pub fn mode(&self) -> ApiMode {
        self.mode
    }

    pub fn mode_label(&self) -> String {
        match self.mode {
            ApiMode::Real => format!("Real PokéAPI ({})", self.base_url),
            ApiMode::Mock => format!("Mock server ({})", self.base_url),
        }
    }

    /// Uniform id within the tier's range.
    pub fn random_id(&self, tier: Option<TierId>) -> u32 {
        let range = tiers::range_for(tier);
        lock(&self.rng).random_range(range.start..=range.end)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        subject: &str,
    ) -> Result<T, ItemSourceError> {
        let url = format!("{}/{}", self.base_url, path);
        retry_async_when(&self.retry, || self.get_once(&url, subject), is_transient).await
    }

    async fn get_once<T: DeserializeOwned>(
        &self,
        url: &str,
        subject: &str,
    ) -> Result<T, ItemSourceError> {
        tracing::debug!("GET {}", url);
        let result = self.send(url, subject).await;

        let outcome = match &result {
            Ok(_) => "success",
            Err(ItemSourceError::NotFound(_)) => "not_found",
            Err(_) => "error",
        };
        POKEAPI_REQUESTS_TOTAL.with_label_values(&[outcome]).inc();

        result
    }

    async fn send<T: DeserializeOwned>(&self, url: &str, subject: &str) -> Result<T, ItemSourceError> {
        let response = self
            .client
            .get(url)
            .header(header::ACCEPT, "application/json")
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(ItemSourceError::NotFound(subject.to_string()));
        }
        if !status.is_success() {
            return Err(ItemSourceError::Network {
                message: format!("Failed to fetch Pokemon {}: {}", subject, status),
                status: Some(status.as_u16()),
            });
        }

        response.json::<T>().await.map_err(|e| {
            ItemSourceError::network(format!("Malformed response for Pokemon {}: {}", subject, e))
        })
    }
}

#[async_trait]
impl PokemonCatalog for PokeApiDataSource {
    async fn pokemon_by_id(&self, id: u32) -> Result<Pokemon, ItemSourceError> {
        let raw: RawPokemon = self
            .get_json(&format!("pokemon/{}", id), &id.to_string())
            .await?;
        Ok(raw.into())
    }

    async fn pokemon_by_name(&self, name: &str) -> Result<Pokemon, ItemSourceError> {
        let name = name.trim().to_lowercase();
        let raw: RawPokemon = self.get_json(&format!("pokemon/{}", name), &name).await?;
        Ok(raw.into())
    }

    async fn random_pokemon(
        &self,
        tier: Option<TierId>,
    ) -> Result<Option<Pokemon>, ItemSourceError> {
        let id = self.random_id(tier);
        match self.pokemon_by_id(id).await {
            Ok(pokemon) => Ok(Some(pokemon)),
            Err(ItemSourceError::NotFound(_)) => {
                tracing::warn!("Random Pokemon {} not found upstream", id);
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    async fn pokemon_list(&self, limit: u32, offset: u32) -> Result<Vec<Pokemon>, ItemSourceError> {
        let page: RawPokemonPage = self
            .get_json(
                &format!("pokemon?limit={}&offset={}", limit, offset),
                "list",
            )
            .await?;

        let ids: Vec<u32> = page
            .results
            .iter()
            .filter_map(|entry| id_from_resource_url(&entry.url))
            .collect();

        let details = join_all(ids.iter().map(|&id| self.pokemon_by_id(id))).await;
        let list: Vec<Pokemon> = details
            .into_iter()
            .zip(ids)
            .filter_map(|(result, id)| match result {
                Ok(pokemon) => Some(pokemon),
                Err(err) => {
                    tracing::warn!("Dropping Pokemon {} from list: {}", id, err);
                    None
                }
            })
            .collect();

        tracing::debug!(
            "Fetched Pokemon list: limit={}, offset={}, returned={}",
            limit,
            offset,
            list.len()
        );
        Ok(list)
    }
}

#[async_trait]
impl ItemSource for PokeApiDataSource {
    async fn random_item(&self, tier: Option<TierId>) -> Result<Option<Pokemon>, ItemSourceError> {
        self.random_pokemon(tier).await
    }
}

/// Transport failures, throttling and upstream 5xx are worth another try.
fn is_transient(err: &ItemSourceError) -> bool {
    match err {
        ItemSourceError::Network { status: None, .. } => true,
        ItemSourceError::Network {
            status: Some(code), ..
        } => *code == 429 || *code >= 500,
        _ => false,
    }
}

fn id_from_resource_url(url: &str) -> Option<u32> {
    url.trim_end_matches('/').rsplit('/').next()?.parse().ok()
}

fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[derive(Debug, Deserialize)]
struct RawPokemon {
    id: u32,
    name: String,
    sprites: RawSprites,
    #[serde(default)]
    cries: RawCries,
    #[serde(default)]
    types: Vec<RawTypeSlot>,
    #[serde(default)]
    stats: Vec<RawStat>,
}

#[derive(Debug, Deserialize)]
struct RawSprites {
    front_default: Option<String>,
    #[serde(default)]
    other: Option<RawOtherSprites>,
}

#[derive(Debug, Deserialize)]
struct RawOtherSprites {
    #[serde(rename = "official-artwork")]
    official_artwork: Option<RawArtwork>,
}

#[derive(Debug, Deserialize)]
struct RawArtwork {
    front_default: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RawCries {
    latest: Option<String>,
    legacy: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawTypeSlot {
    #[serde(rename = "type")]
    kind: NamedResource,
}

#[derive(Debug, Deserialize)]
struct RawStat {
    stat: NamedResource,
    base_stat: u32,
}

#[derive(Debug, Deserialize)]
struct NamedResource {
    name: String,
}

#[derive(Debug, Deserialize)]
struct RawPokemonPage {
    results: Vec<RawPageEntry>,
}

#[derive(Debug, Deserialize)]
struct RawPageEntry {
    url: String,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.is_empty())
}

impl From<RawPokemon> for Pokemon {
    fn from(raw: RawPokemon) -> Self {
        let artwork = raw
            .sprites
            .other
            .and_then(|other| other.official_artwork)
            .and_then(|art| non_empty(art.front_default));
        let sprite = artwork
            .or_else(|| non_empty(raw.sprites.front_default))
            .unwrap_or_default();
        let cry_url = non_empty(raw.cries.latest)
            .or_else(|| non_empty(raw.cries.legacy))
            .unwrap_or_default();

        Pokemon {
            id: raw.id,
            name: capitalize(&raw.name),
            sprite,
            cry_url,
            types: raw.types.into_iter().map(|slot| slot.kind.name).collect(),
            stats: raw
                .stats
                .into_iter()
                .map(|s| Stat {
                    name: s.stat.name,
                    value: s.base_stat,
                })
                .collect(),
        }
    }
}
