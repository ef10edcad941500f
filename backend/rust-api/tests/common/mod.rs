#![allow(dead_code)]

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use pokequiz_api::{
    config::Config,
    create_router,
    error::ItemSourceError,
    models::{Pokemon, Stat, TierId},
    services::{pokeapi::PokemonCatalog, score_service::ScoreService, tiers, AppState},
};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

pub fn fake_pokemon(id: u32) -> Pokemon {
    Pokemon {
        id,
        name: format!("Pokemon{}", id),
        sprite: format!("https://sprites.test/{}.png", id),
        cry_url: format!("https://cries.test/{}.ogg", id),
        types: vec!["normal".to_string()],
        stats: vec![Stat {
            name: "hp".to_string(),
            value: 50,
        }],
    }
}

/// In-memory catalog: every id in 1..=1025 exists, `pikachu` is #25.
#[derive(Default)]
pub struct FakeCatalog {
    pub unreachable: AtomicBool,
    pub random_misses: AtomicBool,
    next_random: AtomicU32,
}

impl FakeCatalog {
    fn check_reachable(&self) -> Result<(), ItemSourceError> {
        if self.unreachable.load(Ordering::SeqCst) {
            return Err(ItemSourceError::network("connection refused"));
        }
        Ok(())
    }
}

#[async_trait]
impl PokemonCatalog for FakeCatalog {
    async fn pokemon_by_id(&self, id: u32) -> Result<Pokemon, ItemSourceError> {
        self.check_reachable()?;
        if id == 0 || id > 1025 {
            return Err(ItemSourceError::NotFound(id.to_string()));
        }
        Ok(fake_pokemon(id))
    }

    async fn pokemon_by_name(&self, name: &str) -> Result<Pokemon, ItemSourceError> {
        self.check_reachable()?;
        match name.to_lowercase().as_str() {
            "pikachu" => Ok(Pokemon {
                name: "Pikachu".to_string(),
                types: vec!["electric".to_string()],
                ..fake_pokemon(25)
            }),
            other => Err(ItemSourceError::NotFound(other.to_string())),
        }
    }

    async fn random_pokemon(
        &self,
        tier: Option<TierId>,
    ) -> Result<Option<Pokemon>, ItemSourceError> {
        self.check_reachable()?;
        if self.random_misses.load(Ordering::SeqCst) {
            return Ok(None);
        }
        // Deterministic walk through the tier range.
        let range = tiers::range_for(tier);
        let n = self.next_random.fetch_add(1, Ordering::SeqCst);
        Ok(Some(fake_pokemon(range.start + n % (range.end - range.start + 1))))
    }

    async fn pokemon_list(&self, limit: u32, offset: u32) -> Result<Vec<Pokemon>, ItemSourceError> {
        self.check_reachable()?;
        Ok((offset + 1..=offset + limit).map(fake_pokemon).collect())
    }
}

pub struct TestApp {
    pub router: Router,
    pub state: Arc<AppState>,
    pub catalog: Arc<FakeCatalog>,
    // Keeps the scores directory alive for the test's duration.
    pub scores_dir: TempDir,
}

pub fn create_test_app() -> TestApp {
    init_tracing();

    let scores_dir = TempDir::new().expect("Failed to create scores dir");
    let config = Config {
        scores_file: scores_dir.path().join("highscores.json"),
        ..Config::default()
    };
    let catalog = Arc::new(FakeCatalog::default());
    let scores = Arc::new(ScoreService::new(config.scores_file.clone()));
    let state = Arc::new(AppState::with_parts(config, catalog.clone(), scores));

    TestApp {
        router: create_router(state.clone()),
        state,
        catalog,
        scores_dir,
    }
}

pub async fn get(app: &Router, uri: &str) -> (StatusCode, Vec<u8>) {
    let response = app
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, body.to_vec())
}

pub async fn post_json(app: &Router, uri: &str, json: serde_json::Value) -> (StatusCode, Vec<u8>) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(serde_json::to_string(&json).unwrap()))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    (status, body.to_vec())
}

/// Serves `router` on an ephemeral local port and returns its base URL.
pub async fn spawn_server(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}
