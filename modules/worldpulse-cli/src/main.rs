use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use worldpulse_client::{fetch_with_retries, RetryPolicy, WorldLoader, WorldPulseClient};
use worldpulse_common::{AppConfig, CountryKey, FileConfig, WorldAtlas};
use worldpulse_pipeline::{
    ChannelPublisher, JsonFileStore, KeyValueStore, MemoryStore, NoopPublisher, PipelineEvent,
    Session, TopicHistory,
};

#[derive(Parser)]
#[command(name = "worldpulse")]
#[command(about = "Per-country sentiment on a topic, painted onto the world")]
#[command(version)]
struct Cli {
    /// Pipeline config (TOML). Built-in defaults apply when the file is missing.
    #[arg(long, global = true, default_value = "config/worldpulse.toml")]
    config: PathBuf,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Analyse a topic across countries
    Analyze(AnalyzeArgs),

    /// List the country keys the backend understands
    Countries,

    /// Find a country by name and show where it is
    FlyTo { name: String },

    /// Show recent topics and bookmarks
    History,

    /// Toggle the bookmark on a topic
    Bookmark { topic: String },

    /// Reset results and record the reset in history
    Clear,
}

#[derive(Args)]
struct AnalyzeArgs {
    topic: String,

    /// One batch call instead of progressive per-country calls
    #[arg(long)]
    batch: bool,

    /// Simultaneous per-country requests
    #[arg(long)]
    concurrency: Option<usize>,

    /// Upper bound on countries analysed
    #[arg(long)]
    limit: Option<usize>,

    /// Comma-separated country keys to analyse instead of the backend's list
    #[arg(long, value_delimiter = ',')]
    countries: Option<Vec<String>>,

    /// Print the run manifest as JSON
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.json_logs)?;

    let file_config = load_file_config(&cli.config)?;

    match cli.command {
        Command::Analyze(args) => analyze(file_config, args).await,
        Command::Countries => countries(&file_config).await,
        Command::FlyTo { name } => fly_to(&file_config, &name).await,
        Command::History => history(&file_config),
        Command::Bookmark { topic } => bookmark(&file_config, &topic),
        Command::Clear => clear(&file_config).await,
    }
}

fn init_tracing(json: bool) -> Result<()> {
    let filter = EnvFilter::from_default_env().add_directive("worldpulse=info".parse()?);
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
    Ok(())
}

fn load_file_config(path: &Path) -> Result<FileConfig> {
    if path.exists() {
        info!(path = %path.display(), "Loading config file");
        Ok(FileConfig::load(path)?)
    } else {
        info!(path = %path.display(), "No config file, using defaults");
        Ok(FileConfig::default())
    }
}

fn open_store(app: &AppConfig) -> Result<Arc<dyn KeyValueStore>> {
    let store: Arc<dyn KeyValueStore> = match &app.state_file {
        Some(path) => Arc::new(
            JsonFileStore::open(path.clone())
                .with_context(|| format!("opening state file {}", path.display()))?,
        ),
        None => {
            warn!("WORLDPULSE_STATE_FILE not set, history will not outlive this process");
            Arc::new(MemoryStore::new())
        }
    };
    Ok(store)
}

fn client(app: &AppConfig) -> Result<WorldPulseClient> {
    WorldPulseClient::with_timeout(&app.api_url, app.request_timeout)
        .context("building HTTP client")
}

/// Without geometry there is nothing to paint, so this is fatal.
async fn load_world(config: &FileConfig) -> Result<WorldAtlas> {
    let loader = WorldLoader::new(config.retries.world.into());
    match loader.load(&config.world.sources).await {
        Ok(atlas) => Ok(atlas),
        Err(e) => {
            eprintln!("SYSTEM OFFLINE");
            Err(anyhow::Error::new(e).context("loading world geometry"))
        }
    }
}

async fn analyze(mut file_config: FileConfig, args: AnalyzeArgs) -> Result<()> {
    if args.batch {
        file_config.pipeline.progressive = false;
    }
    if let Some(concurrency) = args.concurrency {
        file_config.pipeline.concurrency = concurrency;
    }
    if let Some(limit) = args.limit {
        file_config.pipeline.max_countries = limit;
    }

    let app = AppConfig::from_env()?;
    let store = open_store(&app)?;
    let atlas = load_world(&file_config).await?;

    let (publisher, rx) = ChannelPublisher::new();
    let printer = tokio::spawn(print_progress(rx));
    let session = Session::new(
        Arc::new(client(&app)?),
        Arc::new(publisher),
        atlas,
        store,
        &file_config,
    );

    let outcome = match args.countries {
        Some(names) => {
            let keys = names
                .iter()
                .map(|n| n.trim())
                .filter(|n| !n.is_empty())
                .map(CountryKey::from)
                .collect();
            session.analyze_countries(&args.topic, keys).await
        }
        None => session.analyze(&args.topic).await,
    };
    let snapshot = session.snapshot();

    // Last publisher goes with the session; the printer drains and exits.
    drop(session);
    printer.await?;

    let Some(manifest) = outcome.context("sentiment analysis failed")? else {
        return Ok(());
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&manifest)?);
        return Ok(());
    }

    println!();
    for record in snapshot.iter() {
        println!(
            "{:<28} {:>6.2}  {:<8}  {}",
            record.country_key.as_str(),
            record.score,
            record.band().as_str(),
            record.summary
        );
    }
    Ok(())
}

async fn print_progress(mut rx: UnboundedReceiver<PipelineEvent>) {
    let (mut settled, mut total) = (0usize, 0usize);
    while let Some(event) = rx.recv().await {
        match event {
            PipelineEvent::RunStarted { topic, total: n, .. } => {
                (settled, total) = (0, n);
                println!("Analyzing \"{topic}\" across {n} countries");
            }
            PipelineEvent::RecordAccepted { record, .. } => {
                settled += 1;
                println!(
                    "[{settled}/{total}] {:<28} {:>6.2}  {}",
                    record.country_key.as_str(),
                    record.score,
                    record.band().as_str()
                );
            }
            PipelineEvent::KeyFailed { key, error, .. } => {
                settled += 1;
                println!("[{settled}/{total}] {:<28} failed: {error}", key.as_str());
            }
            PipelineEvent::RunCompleted {
                succeeded, failed, ..
            } => println!("READY: {succeeded} succeeded, {failed} failed"),
            PipelineEvent::RunFailed { error, .. } => println!("FAILED: {error}"),
            PipelineEvent::Cleared => println!("Cleared results"),
            PipelineEvent::HighlightChanged { .. } => {}
        }
    }
}

async fn countries(file_config: &FileConfig) -> Result<()> {
    let app = AppConfig::from_env()?;
    let client = client(&app)?;
    let policy = RetryPolicy::from(file_config.retries.countries);

    match fetch_with_retries("countries", policy, || client.countries()).await {
        Ok(keys) => {
            for key in keys {
                println!("{key}");
            }
        }
        Err(e) => {
            warn!(error = %e, "Backend country list unavailable, listing geometry names");
            for key in load_world(file_config).await?.suggestions() {
                println!("{key}");
            }
        }
    }
    Ok(())
}

async fn fly_to(file_config: &FileConfig, name: &str) -> Result<()> {
    let atlas = load_world(file_config).await?;
    let Some(country) = atlas.find(name).and_then(|f| atlas.feature(f)) else {
        bail!("no country matches {name:?}");
    };
    println!(
        "{} ({}) lat {:.2}, lng {:.2}",
        country.label, country.key, country.centroid.lat, country.centroid.lng
    );
    Ok(())
}

fn topic_history(file_config: &FileConfig) -> Result<TopicHistory<Arc<dyn KeyValueStore>>> {
    let app = AppConfig::from_env()?;
    Ok(TopicHistory::new(
        open_store(&app)?,
        file_config.history.max_entries,
    ))
}

fn history(file_config: &FileConfig) -> Result<()> {
    let history = topic_history(file_config)?;

    println!("Recent topics:");
    for topic in history.entries()? {
        let mark = if history.is_bookmarked(&topic)? { "★" } else { " " };
        println!("  {mark} {topic}");
    }
    println!("Bookmarks:");
    for topic in history.bookmarks()? {
        println!("  ★ {topic}");
    }
    Ok(())
}

fn bookmark(file_config: &FileConfig, topic: &str) -> Result<()> {
    let topic = topic.trim();
    if topic.is_empty() {
        bail!("cannot bookmark an empty topic");
    }
    if topic_history(file_config)?.toggle_bookmark(topic)? {
        println!("★ Bookmarked \"{topic}\"");
    } else {
        println!("☆ Removed bookmark \"{topic}\"");
    }
    Ok(())
}

async fn clear(file_config: &FileConfig) -> Result<()> {
    let app = AppConfig::from_env()?;
    let session = Session::new(
        Arc::new(client(&app)?),
        Arc::new(NoopPublisher),
        WorldAtlas::default(),
        open_store(&app)?,
        file_config,
    );
    session.analyze("").await?;
    println!("Cleared results and highlight");
    Ok(())
}
