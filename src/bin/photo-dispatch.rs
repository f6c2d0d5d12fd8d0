//! photo-dispatch CLI: run the dispatcher, run a worker, inspect posts.

use clap::{Parser, Subcommand, ValueEnum};
use photo_dispatch::config::Config;
use photo_dispatch::config::secrets::ExposeSecret;
use photo_dispatch::db::Db;
use photo_dispatch::model::post::{NewPost, PostId, PostStatus};
use photo_dispatch::server::{AppState, serve};
use photo_dispatch::telemetry::{TelemetryConfig, init_telemetry};
use photo_dispatch::worker::{WorkerConfig, run as run_worker};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "photo-dispatch", about = "Lease-based photo classification dispatcher")]
struct Cli {
    /// TOML config file (defaults to environment variables)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Accept worker connections and dispatch posts
    Serve {
        /// Override the configured listen address
        #[arg(long)]
        listen: Option<String>,
    },
    /// Connect to a dispatcher as a worker
    Work {
        /// Dispatcher WebSocket URL
        #[arg(long, default_value = "ws://127.0.0.1:8080/ws")]
        url: String,
        /// Seconds to wait before reconnecting
        #[arg(long, default_value_t = 5)]
        reconnect_secs: u64,
        /// Classifier command and its arguments; gets PHOTO_REF in its environment
        #[arg(required = true, num_args = 1.., trailing_var_arg = true, allow_hyphen_values = true)]
        classifier: Vec<String>,
    },
    /// Post operations
    Post {
        #[command(subcommand)]
        action: PostAction,
    },
}

#[derive(Subcommand)]
enum PostAction {
    /// Queue a new post
    Submit {
        /// Photo reference (repeatable, order is kept)
        #[arg(long = "photo")]
        photos: Vec<String>,
        /// Number of non-photo attachments to append
        #[arg(long, default_value_t = 0)]
        other: usize,
    },
    /// List posts
    List {
        /// Filter by status
        #[arg(long, value_enum)]
        status: Option<StatusArg>,
        /// Maximum posts to show
        #[arg(long, default_value_t = 20)]
        limit: i64,
    },
    /// Show a post
    Show {
        /// Post ID (full UUID)
        id: String,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum StatusArg {
    Pending,
    Leased,
    Resolved,
}

impl From<StatusArg> for PostStatus {
    fn from(arg: StatusArg) -> Self {
        match arg {
            StatusArg::Pending => PostStatus::Pending,
            StatusArg::Leased => PostStatus::Leased,
            StatusArg::Resolved => PostStatus::Resolved,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    match cli.command {
        Command::Serve { listen } => cmd_serve(load_config(cli.config.as_deref())?, listen).await,
        Command::Work {
            url,
            reconnect_secs,
            classifier,
        } => cmd_work(url, reconnect_secs, classifier).await,
        Command::Post { action } => {
            let config = load_config(cli.config.as_deref())?;
            let db = connect_store(&config).await?;

            match action {
                PostAction::Submit { photos, other } => cmd_post_submit(&db, photos, other).await,
                PostAction::List { status, limit } => {
                    cmd_post_list(&db, &config, status.map(Into::into), limit).await
                }
                PostAction::Show { id } => cmd_post_show(&db, &config, id).await,
            }
        }
    }
}

fn load_config(path: Option<&std::path::Path>) -> anyhow::Result<Config> {
    Ok(match path {
        Some(path) => Config::from_file(path)?,
        None => Config::from_env()?,
    })
}

/// Open the post store and bring its schema up to date.
async fn connect_store(config: &Config) -> anyhow::Result<Db> {
    let db = Db::connect(config.database_url.expose_secret(), config.db_max_connections).await?;
    db.migrate().await?;
    Ok(db)
}

async fn cmd_serve(config: Config, listen: Option<String>) -> anyhow::Result<()> {
    let _guard = init_telemetry(TelemetryConfig {
        endpoint: config.otel_endpoint.clone(),
        service_name: "photo-dispatch".to_string(),
        default_filter: config.log_level.clone(),
    })?;

    let db = connect_store(&config).await?;
    db.health_check().await?;

    let state = AppState {
        queue: Arc::new(db),
        lease: config.lease(),
    };

    let addr = listen.unwrap_or_else(|| config.listen_addr.clone());
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    serve(listener, state, async {
        tokio::signal::ctrl_c().await.ok();
    })
    .await?;
    Ok(())
}

async fn cmd_work(url: String, reconnect_secs: u64, classifier: Vec<String>) -> anyhow::Result<()> {
    let _guard = init_telemetry(TelemetryConfig {
        endpoint: std::env::var("OTEL_ENDPOINT").ok(),
        service_name: "photo-dispatch-worker".to_string(),
        default_filter: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
    })?;

    let mut classifier = classifier.into_iter();
    let program = classifier
        .next()
        .ok_or_else(|| anyhow::anyhow!("classifier command is required"))?;

    let config = WorkerConfig {
        url,
        classifier: PathBuf::from(program),
        classifier_args: classifier.collect(),
        reconnect_delay: Duration::from_secs(reconnect_secs),
    };

    tokio::select! {
        _ = run_worker(&config) => {}
        _ = tokio::signal::ctrl_c() => tracing::info!("worker interrupted"),
    }
    Ok(())
}

async fn cmd_post_submit(db: &Db, photos: Vec<String>, other: usize) -> anyhow::Result<()> {
    if photos.is_empty() && other == 0 {
        anyhow::bail!("a post needs at least one attachment (--photo or --other)");
    }

    let mut new = NewPost::new();
    for photo in photos {
        new = new.photo(photo);
    }
    for _ in 0..other {
        new = new.other();
    }

    let post = db.submit_post(new).await?;
    println!(
        "Created: {} ({} attachment(s))",
        post.id,
        post.attachments.len()
    );
    Ok(())
}

async fn cmd_post_list(
    db: &Db,
    config: &Config,
    status: Option<PostStatus>,
    limit: i64,
) -> anyhow::Result<()> {
    let ttl = config.lease().ttl;
    let posts = db.list_posts(status, ttl, limit).await?;

    if posts.is_empty() {
        println!("No posts found.");
        return Ok(());
    }

    println!(
        "{:<36}  {:<8}  {:<6}  {:<7}  CREATED",
        "ID", "STATUS", "PHOTOS", "VERDICT"
    );
    println!("{}", "-".repeat(84));

    let now = chrono::Utc::now();
    for post in &posts {
        let verdict = match post.verdict {
            Some(true) => "yes",
            Some(false) => "no",
            None => "-",
        };
        println!(
            "{:<36}  {:<8}  {:<6}  {:<7}  {}",
            post.id,
            post.status(now, ttl),
            post.photos().len(),
            verdict,
            post.created_at.format("%Y-%m-%d %H:%M")
        );
    }

    println!("\n{} post(s)", posts.len());
    Ok(())
}

async fn cmd_post_show(db: &Db, config: &Config, id: String) -> anyhow::Result<()> {
    let id = PostId(uuid::Uuid::parse_str(&id)?);
    let post = db.get_post(id).await?;
    let ttl = config.lease().ttl;

    println!("ID:          {}", post.id);
    println!("Status:      {}", post.status(chrono::Utc::now(), ttl));
    println!(
        "Verdict:     {}",
        post.verdict.map(|v| v.to_string()).unwrap_or("-".to_string())
    );
    println!(
        "Lease Begin: {}",
        post.lease_begin
            .map(|t| t.to_string())
            .unwrap_or("-".to_string())
    );
    println!("Created:     {}", post.created_at);
    println!("Attachments:");
    for (i, attachment) in post.attachments.iter().enumerate() {
        match attachment.photo_ref() {
            Some(photo_ref) => println!("  {i:>2}. photo  {photo_ref}"),
            None => println!("  {i:>2}. other"),
        }
    }
    Ok(())
}
