use std::env;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{Level, info};
use tracing_subscriber::EnvFilter;

use biolex_extractor::extract::extract_frequencies;
use biolex_extractor::{AppState, ModelCatalog, entity_list, router, schema};

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_MODELS_DIR: &str = "models";
const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 30;

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let config = load_config();

    let catalog = Arc::new(ModelCatalog::new(&config.models_dir));
    catalog
        .preflight()
        .with_context(|| format!("model preflight under {}", config.models_dir.display()))?;

    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.fetch_timeout_secs))
        .build()
        .context("build http client")?;

    if let Some(path) = &config.request_file {
        return run_once(path, &catalog, &http).await;
    }

    info!("binding to {}:{}", config.host, config.port);
    info!("using models at {}", config.models_dir.display());
    info!("entity list fetch timeout: {} s", config.fetch_timeout_secs);

    let state = AppState {
        catalog,
        http,
    };
    let app = router(state).layer(TraceLayer::new_for_http());
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .context("invalid listen address")?;
    let listener = TcpListener::bind(addr).await?;

    axum::serve(listener, app).await?;
    Ok(())
}

/// Run a single request document from disk and print the result.
async fn run_once(path: &Path, catalog: &ModelCatalog, http: &reqwest::Client) -> Result<()> {
    let bytes =
        std::fs::read(path).with_context(|| format!("read request file {}", path.display()))?;
    let request = schema::parse_request(&bytes)?;

    let model = catalog.get(request.language)?;
    let resolved = entity_list::resolve(request.entity_list, request.language);
    let document = entity_list::load(http, resolved).await?;

    let start = Instant::now();
    let result = extract_frequencies(&request.segments, document, |text| model.annotate(text));
    info!(
        "extracted {} records in {} ms",
        result.entity_list.len(),
        start.elapsed().as_millis()
    );

    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

#[derive(Debug, Clone)]
struct Config {
    host: String,
    port: u16,
    models_dir: PathBuf,
    fetch_timeout_secs: u64,
    request_file: Option<PathBuf>,
}

fn load_config() -> Config {
    let mut request_file: Option<PathBuf> = None;
    let mut cli_models_dir: Option<PathBuf> = None;
    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--request" => {
                if let Some(path) = args.next() {
                    request_file = Some(PathBuf::from(path));
                }
            }
            "--models-dir" => {
                if let Some(path) = args.next() {
                    cli_models_dir = Some(PathBuf::from(path));
                }
            }
            _ => {
                if let Some(path) = arg.strip_prefix("--request=") {
                    request_file = Some(PathBuf::from(path));
                } else if let Some(path) = arg.strip_prefix("--models-dir=") {
                    cli_models_dir = Some(PathBuf::from(path));
                }
            }
        }
    }

    let host = env::var("HOST").unwrap_or_else(|_| DEFAULT_HOST.to_string());
    let port = env::var("PORT")
        .ok()
        .and_then(|p| p.parse::<u16>().ok())
        .unwrap_or(DEFAULT_PORT);
    let models_dir = cli_models_dir
        .or_else(|| env::var("MODELS_DIR").ok().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_MODELS_DIR));
    let fetch_timeout_secs = env::var("ENTITY_LIST_TIMEOUT_SECS")
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .filter(|v| *v > 0)
        .unwrap_or(DEFAULT_FETCH_TIMEOUT_SECS);

    Config {
        host,
        port,
        models_dir,
        fetch_timeout_secs,
        request_file,
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let max_level = env_filter
        .max_level_hint()
        .and_then(|hint| hint.into_level())
        .unwrap_or(Level::INFO);
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_level(true)
        .with_max_level(max_level)
        .init();
}
