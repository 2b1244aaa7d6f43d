use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::signal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use movimate::{
    config::Config,
    db::{create_redis_client, Cache, CacheWriterHandle},
    routes::{create_router, AppState},
    services::{
        evaluation::{self, DEFAULT_SAMPLE_SIZE},
        pipeline,
        recommendations::{self, DEFAULT_K},
        ArtifactStore, MetadataProvider, OfflineProvider, TmdbProvider,
    },
};

/// Content-based movie recommender
#[derive(Parser, Debug)]
#[command(name = "movimate")]
#[command(about = "Build, evaluate and serve a content-based movie recommender")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Rebuild the model artifacts from the raw CSV tables
    Build {
        /// Vocabulary cap for the TF-IDF vectorizer
        #[arg(long)]
        max_features: Option<usize>,
    },
    /// Print offline retrieval metrics for the saved model
    Evaluate {
        #[arg(short, long, default_value_t = evaluation::DEFAULT_K)]
        k: usize,
        /// Number of leading rows to evaluate
        #[arg(long, default_value_t = DEFAULT_SAMPLE_SIZE)]
        sample_size: usize,
    },
    /// Show the saved model's shape and its first and last rows
    Inspect {
        #[arg(long, default_value_t = 5)]
        rows: usize,
    },
    /// Recommend movies similar to a title
    Recommend {
        title: String,
        #[arg(short, long, default_value_t = DEFAULT_K)]
        k: usize,
    },
    /// Serve the JSON API
    Serve {
        #[arg(short, long, env = "PORT")]
        port: Option<u16>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "movimate=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let mut config = Config::from_env()?;

    match cli.command {
        Command::Build { max_features } => {
            if let Some(max_features) = max_features {
                config.max_features = max_features;
            }
            let (_, report, manifest) = pipeline::build(&config)?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            println!("Artifacts written to {} at {}", config.model_dir.display(), manifest.built_at);
        }
        Command::Evaluate { k, sample_size } => {
            let (model, _) = ArtifactStore::new(&config.model_dir).load()?;
            println!("Evaluating recommendation model...\n");
            println!("{}", evaluation::evaluate(model.matrix(), k, sample_size)?);
        }
        Command::Inspect { rows } => inspect(&config, rows)?,
        Command::Recommend { title, k } => recommend(&config, &title, k).await?,
        Command::Serve { port } => {
            if let Some(port) = port {
                config.port = port;
            }
            serve(config).await?;
        }
    }

    Ok(())
}

fn inspect(config: &Config, rows: usize) -> Result<()> {
    let store = ArtifactStore::new(&config.model_dir);
    let (model, manifest) = store.load()?;

    println!("Artifact directory : {}", store.dir().display());
    println!("Built at           : {}", manifest.built_at);
    println!("Movies             : {}", model.len());
    println!("Similarity shape   : {0}x{0}", model.matrix().dimension());
    println!("Vocabulary size    : {}", manifest.vocabulary_size);

    let movies = model.movies();
    println!("\nFirst {} movies:", rows.min(movies.len()));
    for movie in movies.iter().take(rows) {
        println!("{:>8}  {}", movie.id, movie.title);
    }
    println!("\nLast {} movies:", rows.min(movies.len()));
    for movie in movies.iter().skip(movies.len().saturating_sub(rows)) {
        println!("{:>8}  {}", movie.id, movie.title);
    }
    Ok(())
}

async fn recommend(config: &Config, title: &str, k: usize) -> Result<()> {
    let (model, _) = ArtifactStore::new(&config.model_dir).load()?;

    let Some(api_key) = config.tmdb_api_key.clone() else {
        tracing::info!("TMDB_API_KEY not set, ranking by similarity only");
        for (rank, rec) in recommendations::ranked(&model, title, k)?.iter().enumerate() {
            println!("{}. {} ({:.3})", rank + 1, rec.movie.title, rec.score);
        }
        return Ok(());
    };

    let (cache, cache_handle) = connect_cache(config).await?.unzip();
    let provider = TmdbProvider::new(api_key, config, cache);
    let recs = recommendations::recommend(&model, &provider, title, k).await?;

    for (rank, rec) in recs.items.iter().enumerate() {
        println!("{}. {} ({:.3})", rank + 1, rec.movie.title, rec.score);
        if let Some(poster) = &rec.poster {
            println!("   poster:  {}", poster);
        }
        if let Some(trailer) = &rec.trailer {
            println!("   trailer: {}", trailer);
        }
    }
    if recs.is_partial() {
        println!("Only {} of {} recommendations had posters", recs.items.len(), recs.requested);
    }

    drop(provider);
    if let Some(handle) = cache_handle {
        handle.shutdown().await;
    }
    Ok(())
}

async fn connect_cache(config: &Config) -> Result<Option<(Cache, CacheWriterHandle)>> {
    match &config.redis_url {
        Some(url) => {
            let client = create_redis_client(url).context("Failed to create Redis client")?;
            tracing::info!("Redis cache enabled for metadata lookups");
            Ok(Some(Cache::new(client).await))
        }
        None => Ok(None),
    }
}

async fn serve(config: Config) -> Result<()> {
    let (model, manifest) = ArtifactStore::new(&config.model_dir)
        .load()
        .context("Failed to load model artifacts; run `movimate build` first")?;

    let (cache, cache_handle) = connect_cache(&config).await?.unzip();
    let provider: Arc<dyn MetadataProvider> = match config.tmdb_api_key.clone() {
        Some(api_key) => Arc::new(TmdbProvider::new(api_key, &config, cache)),
        None => {
            tracing::warn!("TMDB_API_KEY not set; posters are unavailable and recommendations will be empty");
            Arc::new(OfflineProvider)
        }
    };

    tracing::info!(
        movies = model.len(),
        built_at = %manifest.built_at,
        provider = provider.name(),
        "Model loaded"
    );

    let app = create_router(AppState::new(model, provider));

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .context("Invalid HOST/PORT")?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    tracing::info!("Server running on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    if let Some(handle) = cache_handle {
        handle.shutdown().await;
    }
    tracing::info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
