//! gtrk-map - Groupie Trackers concert map
//!
//! Command line front end over the library: artist search, detail panels,
//! the geocoded concert map, preview lookup, the geocode cache and the
//! stored subscription. `serve` exposes the same views over HTTP.

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use gtrk_common::config::TomlConfig;
use gtrk_common::db::init_database;
use gtrk_map::fetcher::{ArtistCatalog, DataFetcher, Supplementary};
use gtrk_map::geocode::{CachedGeocoder, Geocoder, NominatimClient};
use gtrk_map::pipeline::build_map;
use gtrk_map::preview::PreviewResolver;
use gtrk_map::render::{self, ArtistCard, ArtistDetail};
use gtrk_map::search::{self, QuickFilter};
use gtrk_map::{build_router, subscription, AppState};
use sqlx::SqlitePool;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "gtrk-map")]
#[command(about = "Groupie Trackers artists and concert map")]
#[command(version)]
struct Cli {
    /// Configuration file (defaults to the per-user config path)
    #[arg(long, global = true, env = "GTRK_CONFIG")]
    config: Option<PathBuf>,

    /// Directory holding gtrk.db
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Base URL of the local proxy
    #[arg(long, global = true)]
    proxy_url: Option<String>,

    /// Base URL of the public API used as fallback
    #[arg(long, global = true)]
    remote_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List or search artists
    Artists {
        /// Case-insensitive name search
        #[arg(short, long)]
        query: Option<String>,

        /// Quick filter: rock, seventies, usa, month
        #[arg(short, long)]
        filter: Option<String>,

        /// Print cards as JSON
        #[arg(long)]
        json: bool,
    },

    /// Autocomplete artist names
    Suggest { prefix: String },

    /// Show one artist with locations, dates and relations
    Show { id: u32 },

    /// Geocode concert locations and print the markers
    Map {
        /// Also write a GeoJSON FeatureCollection here
        #[arg(long)]
        geojson: Option<PathBuf>,

        /// Only geocode the first N locations
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Look up an audio preview URL
    Preview { name: String },

    /// Geocode cache maintenance
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },

    /// Stored subscription record
    Subscription {
        #[command(subcommand)]
        action: SubscriptionAction,
    },

    /// Run the read-only view server
    Serve {
        /// Defaults to the configured port
        #[arg(short, long)]
        port: Option<u16>,
    },
}

#[derive(Subcommand, Debug)]
enum CacheAction {
    Stats,
    Clear,
}

#[derive(Subcommand, Debug)]
enum SubscriptionAction {
    Show,
    Cancel,
    Subscribe {
        #[arg(long)]
        plan: String,

        #[arg(long)]
        plan_name: Option<String>,

        #[arg(long)]
        amount: f64,

        #[arg(long)]
        email: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = TomlConfig::load(cli.config.as_deref())
        .context("Failed to load configuration")?
        .apply_env()
        .context("Invalid environment override")?;
    if let Some(dir) = cli.data_dir.clone() {
        config.data_dir = dir;
    }
    if let Some(url) = cli.proxy_url.clone() {
        config.proxy_base_url = url;
    }
    if let Some(url) = cli.remote_url.clone() {
        config.remote_base_url = url;
    }

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("gtrk_map={0},gtrk_common={0}", config.logging.level).into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!("gtrk-map v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Command::Artists { query, filter, json } => {
            let catalog = catalog(&config)?;
            list_artists(&catalog, query, filter, json).await
        }
        Command::Suggest { prefix } => {
            let catalog = catalog(&config)?;
            let artists = catalog.ensure_loaded().await?;
            for name in search::suggestions(artists, &prefix) {
                println!("{}", name);
            }
            Ok(())
        }
        Command::Show { id } => {
            let catalog = catalog(&config)?;
            show_artist(&catalog, id).await
        }
        Command::Map { geojson, limit } => {
            let catalog = catalog(&config)?;
            let pool = open_database(&config).await?;
            let geocoder = CachedGeocoder::new(NominatimClient::from_config(&config)?, pool);
            draw_map(&catalog, &geocoder, limit, geojson).await
        }
        Command::Preview { name } => {
            let resolver = PreviewResolver::from_config(&config)?;
            match resolver.resolve(&name).await {
                Some(url) => println!("{}", url),
                None => println!("No preview available for {}", name),
            }
            Ok(())
        }
        Command::Cache { action } => {
            let pool = open_database(&config).await?;
            let geocoder = CachedGeocoder::new(NominatimClient::from_config(&config)?, pool);
            match action {
                CacheAction::Stats => {
                    println!("Cached locations: {}", geocoder.cached_count().await?)
                }
                CacheAction::Clear => {
                    println!("Removed {} cached locations", geocoder.clear_cache().await?)
                }
            }
            Ok(())
        }
        Command::Subscription { action } => {
            let pool = open_database(&config).await?;
            manage_subscription(&pool, action).await
        }
        Command::Serve { port } => serve(&config, port.unwrap_or(config.port)).await,
    }
}

fn catalog(config: &TomlConfig) -> Result<ArtistCatalog> {
    let fetcher = DataFetcher::from_config(config)?;
    Ok(ArtistCatalog::new(Arc::new(fetcher)))
}

async fn open_database(config: &TomlConfig) -> Result<SqlitePool> {
    let db_path = config.database_path();
    info!("Database path: {}", db_path.display());
    init_database(&db_path)
        .await
        .with_context(|| format!("Failed to open database at {}", db_path.display()))
}

async fn list_artists(
    catalog: &ArtistCatalog,
    query: Option<String>,
    filter: Option<String>,
    json: bool,
) -> Result<()> {
    let filter = filter
        .map(|f| f.parse::<QuickFilter>().map_err(|e| anyhow!(e)))
        .transpose()?;
    let artists = catalog
        .ensure_loaded()
        .await
        .inspect_err(|_| error!("{}", render::STATUS_LOAD_ERROR))?;

    let (cards, more) = match (query.as_deref(), filter) {
        (None, None) => {
            let (shown, more) = search::home_listing(artists);
            (render::render_cards(shown), more)
        }
        (q, f) => {
            let found = search::search(artists, q.unwrap_or(""), f);
            let cards: Vec<ArtistCard> = found.into_iter().filter_map(ArtistCard::from_artist).collect();
            (cards, false)
        }
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&cards)?);
        return Ok(());
    }

    if cards.is_empty() {
        println!("No artists found");
    }
    for card in &cards {
        let created = card
            .creation_date
            .map(|y| y.to_string())
            .unwrap_or_else(|| "?".to_string());
        println!(
            "{:>3}  {}  (created {}, {} members)",
            card.id, card.name, created, card.member_count
        );
    }
    if more {
        println!("… more artists available, use --query to search");
    }
    Ok(())
}

async fn show_artist(catalog: &ArtistCatalog, id: u32) -> Result<()> {
    let Some(artist) = catalog.find(id).await? else {
        bail!("Artist {} not found", id);
    };
    let extra = Supplementary::load(catalog.fetcher()).await;
    let detail = ArtistDetail::build(artist, &extra);

    println!("{} (#{})", detail.name, detail.id);
    if let Some(year) = detail.creation_date {
        println!("Created: {}", year);
    }
    if let Some(album) = &detail.first_album {
        println!("First album: {}", album);
    }
    if !detail.members.is_empty() {
        println!("Members: {}", detail.members.join(", "));
    }

    match &detail.relations {
        Some(rows) if !rows.is_empty() => {
            println!("Concerts:");
            for row in rows {
                println!("  {}: {}", row.location, row.dates.join(", "));
            }
        }
        _ => {
            if let Some(locations) = &detail.locations {
                println!("Locations: {}", locations.join(", "));
            }
            if let Some(dates) = &detail.dates {
                println!("Dates: {}", dates.join(", "));
            }
        }
    }
    Ok(())
}

async fn draw_map<G: Geocoder>(
    catalog: &ArtistCatalog,
    geocoder: &CachedGeocoder<G>,
    limit: Option<usize>,
    geojson: Option<PathBuf>,
) -> Result<()> {
    let view = build_map(catalog, geocoder, limit)
        .await
        .inspect_err(|_| error!("{}", render::STATUS_LOAD_ERROR))?;

    for marker in &view.markers {
        println!(
            "{:>9.4} {:>9.4}  {}  [{} artists, {} dates]",
            marker.lat,
            marker.lon,
            marker.label,
            marker.artists.len(),
            marker.dates.len()
        );
    }
    println!("{}", view.status);

    if let Some(path) = geojson {
        let body = serde_json::to_string_pretty(&view.to_geojson())?;
        tokio::fs::write(&path, body)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
        println!("GeoJSON written to {}", path.display());
    }
    Ok(())
}

async fn manage_subscription(pool: &SqlitePool, action: SubscriptionAction) -> Result<()> {
    let record = match action {
        SubscriptionAction::Show => match subscription::current(pool).await? {
            Some(s) => s,
            None => {
                println!("No subscription");
                return Ok(());
            }
        },
        SubscriptionAction::Cancel => subscription::cancel(pool).await?,
        SubscriptionAction::Subscribe {
            plan,
            plan_name,
            amount,
            email,
        } => {
            let plan_name = plan_name.unwrap_or_else(|| plan.clone());
            subscription::subscribe(pool, &plan, &plan_name, amount, &email).await?
        }
    };

    println!("{}", serde_json::to_string_pretty(&record)?);
    Ok(())
}

async fn serve(config: &TomlConfig, port: u16) -> Result<()> {
    let pool = open_database(config).await?;
    let geocoder: Box<dyn Geocoder> = Box::new(NominatimClient::from_config(config)?);

    let state = AppState::new(
        Arc::new(catalog(config)?),
        Arc::new(CachedGeocoder::new(geocoder, pool)),
        Arc::new(PreviewResolver::from_config(config)?),
    );
    let app = build_router(state);

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    info!("gtrk-map listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
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
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received terminate signal, shutting down"),
    }
}
