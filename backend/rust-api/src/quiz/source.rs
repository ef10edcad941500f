use async_trait::async_trait;

use crate::error::ItemSourceError;
use crate::models::{Pokemon, TierId};

/// One random Pokémon per call. Not-found yields `Ok(None)`; network
/// failures are returned as errors.
#[async_trait]
pub trait ItemSource: Send + Sync {
    async fn random_item(&self, tier: Option<TierId>) -> Result<Option<Pokemon>, ItemSourceError>;
}
