use std::sync::Arc;

use crate::config::Config;
use crate::error::ItemSourceError;
use pokeapi::{PokeApiDataSource, PokemonCatalog};
use score_service::ScoreService;

pub struct AppState {
    pub config: Config,
    pub catalog: Arc<dyn PokemonCatalog>,
    pub scores: Arc<ScoreService>,
}

impl AppState {
    pub fn new(config: Config) -> Result<Self, ItemSourceError> {
        let source =
            PokeApiDataSource::new(config.api_mode, config.data_source_url(), config.api_timeout())?;
        tracing::info!("Pokemon data source: {}", source.mode_label());

        let scores = ScoreService::new(config.scores_file.clone());
        tracing::info!("High scores stored in {}", scores.path().display());

        Ok(Self {
            config,
            catalog: Arc::new(source),
            scores: Arc::new(scores),
        })
    }

    /// State over caller-supplied parts, for tests and embedding.
    pub fn with_parts(
        config: Config,
        catalog: Arc<dyn PokemonCatalog>,
        scores: Arc<ScoreService>,
    ) -> Self {
        Self {
            config,
            catalog,
            scores,
        }
    }
}

pub mod pokeapi;
pub mod score_service;
pub mod tiers;
