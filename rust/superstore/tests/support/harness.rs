use axum::{
    body::{self, Body},
    http::{self, Request, StatusCode},
    Router,
};
use serde_json::Value;
use std::{
    future::Future,
    path::{Path, PathBuf},
    sync::Once,
    time::Duration,
};
use superstore::{config::AppConfig, db, server::Server};
use tokio::time::sleep;
use tokio_postgres::{Client, Config as PgConfig, NoTls};
use tower::ServiceExt;

const DB_CONNECT_RETRIES: usize = 40;
const DB_CONNECT_DELAY_MS: u64 = 250;
const OFFLINE_DATABASE_URL: &str = "postgres://superstore@127.0.0.1:1/superstore";
const OFFLINE_POOL_TIMEOUT_MS: u64 = 250;

static TRACING_INIT: Once = Once::new();

fn init_tracing() {
    TRACING_INIT.call_once(|| {
        let _ = tracing_subscriber::fmt::try_init();
    });
}

/// Runs a test closure against the API backed by the seeded fixture database.
///
/// Skips (with a note on stderr) when `SUPERSTORE_TEST_DATABASE_URL` is unset.
pub async fn with_superstore_harness<F, Fut>(test: F)
where
    F: FnOnce(SuperstoreTestHarness) -> Fut,
    Fut: Future<Output = ()>,
{
    init_tracing();

    let database_url = match std::env::var("SUPERSTORE_TEST_DATABASE_URL") {
        Ok(url) if !url.trim().is_empty() => url,
        _ => {
            eprintln!(
                "[superstore-test] skipping database harness: SUPERSTORE_TEST_DATABASE_URL is not set"
            );
            return;
        }
    };

    seed_fixture_database(&database_url)
        .await
        .expect("failed to seed fixture database");

    let server = Server::new(AppConfig::embedded(database_url))
        .await
        .expect("failed to boot server for harness");

    test(SuperstoreTestHarness {
        router: server.router(),
    })
    .await;
}

/// A router whose pool points at an unreachable store. Requests rejected before
/// checkout behave normally; anything reaching the pool fails within
/// `OFFLINE_POOL_TIMEOUT_MS`.
pub fn offline_harness() -> SuperstoreTestHarness {
    offline_harness_with(|_| {})
}

pub fn offline_harness_with(configure: impl FnOnce(&mut AppConfig)) -> SuperstoreTestHarness {
    init_tracing();
    let mut config = AppConfig::embedded(OFFLINE_DATABASE_URL.to_string());
    config.pool_timeout = Duration::from_millis(OFFLINE_POOL_TIMEOUT_MS);
    configure(&mut config);
    let pool = db::lazy_pool(&config).expect("offline pool should build");
    SuperstoreTestHarness {
        router: Server::with_pool(config, pool).router(),
    }
}

async fn seed_fixture_database(database_url: &str) -> anyhow::Result<()> {
    let client = connect_with_retries(database_url).await?;
    client.batch_execute(&load_fixture("schema.sql")?).await?;
    client.batch_execute(&load_fixture("seed.sql")?).await?;
    Ok(())
}

async fn connect_with_retries(database_url: &str) -> anyhow::Result<Client> {
    let config: PgConfig = database_url.parse()?;
    let mut attempts = 0usize;
    loop {
        match config.connect(NoTls).await {
            Ok((client, connection)) => {
                tokio::spawn(async move {
                    if let Err(err) = connection.await {
                        eprintln!("fixture connection closed with error: {err}");
                    }
                });
                return Ok(client);
            }
            Err(err) => {
                attempts += 1;
                if attempts >= DB_CONNECT_RETRIES {
                    return Err(err.into());
                }
                sleep(Duration::from_millis(DB_CONNECT_DELAY_MS)).await;
            }
        }
    }
}

fn load_fixture(name: &str) -> anyhow::Result<String> {
    let path = fixture_root().join(name);
    std::fs::read_to_string(&path)
        .map_err(|err| anyhow::anyhow!("failed to read fixture {name} from {:?}: {err}", path))
}

fn fixture_root() -> PathBuf {
    if let Ok(root) = std::env::var("SUPERSTORE_FIXTURE_ROOT") {
        let candidate = PathBuf::from(root);
        if candidate.exists() {
            return candidate;
        }
    }

    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
}

#[derive(Clone)]
pub struct SuperstoreTestHarness {
    router: Router,
}

impl SuperstoreTestHarness {
    pub async fn get(&self, uri: &str) -> http::Response<Body> {
        self.send("GET", uri).await
    }

    pub async fn send(&self, method: &str, uri: &str) -> http::Response<Body> {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .expect("failed to build harness request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router should handle harness request")
    }

    pub async fn get_json(&self, uri: &str) -> (StatusCode, Value) {
        read_json(self.get(uri).await).await
    }
}

pub async fn read_json(response: http::Response<Body>) -> (StatusCode, Value) {
    let status = response.status();
    let bytes = body::to_bytes(response.into_body(), 4 * 1024 * 1024)
        .await
        .expect("response body should be readable");
    let value =
        serde_json::from_slice::<Value>(&bytes).expect("response body should be valid JSON");
    (status, value)
}
