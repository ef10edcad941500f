use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use std::sync::Arc;

use crate::{
    error::ItemSourceError,
    models::{PokemonListQuery, RandomPokemonQuery},
    services::{pokeapi::DEFAULT_LIST_LIMIT, tiers, AppState},
};

pub const MAX_LIST_LIMIT: u32 = 100;

/// NotFound → 404, everything else upstream → 502.
fn upstream_error(err: ItemSourceError) -> (StatusCode, String) {
    match err {
        ItemSourceError::NotFound(_) => (StatusCode::NOT_FOUND, err.to_string()),
        _ => {
            tracing::error!("Upstream request failed: {}", err);
            (StatusCode::BAD_GATEWAY, err.to_string())
        }
    }
}

pub async fn get_pokemon(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u32>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    tracing::debug!("Fetching Pokemon ID: {}", id);

    let pokemon = state.catalog.pokemon_by_id(id).await.map_err(upstream_error)?;
    Ok((StatusCode::OK, Json(pokemon)))
}

pub async fn get_pokemon_by_name(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    tracing::debug!("Fetching Pokemon name: {}", name);

    let pokemon = state
        .catalog
        .pokemon_by_name(&name)
        .await
        .map_err(upstream_error)?;
    Ok((StatusCode::OK, Json(pokemon)))
}

/// Body is `null` when the drawn id does not exist upstream.
pub async fn random_pokemon(
    State(state): State<Arc<AppState>>,
    Query(query): Query<RandomPokemonQuery>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let pokemon = state
        .catalog
        .random_pokemon(query.generation_id)
        .await
        .map_err(upstream_error)?;
    Ok((StatusCode::OK, Json(pokemon)))
}

pub async fn list_pokemon(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PokemonListQuery>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let limit = query.limit.unwrap_or(DEFAULT_LIST_LIMIT).min(MAX_LIST_LIMIT);
    let offset = query.offset.unwrap_or(0);

    let list = state
        .catalog
        .pokemon_list(limit, offset)
        .await
        .map_err(upstream_error)?;
    Ok((StatusCode::OK, Json(list)))
}

pub async fn list_generations() -> impl IntoResponse {
    Json(tiers::all_tiers())
}
