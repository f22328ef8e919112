//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, WrapErr};
use soilscope_core::{KnowledgeStore, RuleSource, knowledge, seed};
use soilscope_shared::{
    AppConfig, LoadError, SourceKind, admin_token, expand_home, init_config, load_config,
};
use soilscope_storage::Storage;
use tracing::{info, warn};

use crate::server::{self, AppState};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// SoilScope: answers soil, crop, and fertilizer questions.
#[derive(Parser)]
#[command(
    name = "soilscope",
    version,
    about = "Rule-based soil and crop advice assistant.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Where to read rules from, overriding `[knowledge]` in the config file.
#[derive(clap::Args, Debug, Clone, Default)]
pub(crate) struct SourceArgs {
    /// Rule source: file, database, or builtin.
    #[arg(long)]
    pub source: Option<SourceKind>,

    /// Path to the knowledge-base JSON file or database. Implies
    /// `--source file` when no source is given.
    #[arg(long)]
    pub kb: Option<PathBuf>,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Start the HTTP API.
    Serve {
        /// Address to bind (defaults to `[server] host`).
        #[arg(long)]
        host: Option<String>,

        /// Port to bind (defaults to `[server] port`).
        #[arg(short, long)]
        port: Option<u16>,

        #[command(flatten)]
        source: SourceArgs,
    },

    /// Answer a single message and exit.
    Ask {
        /// The question to answer.
        message: String,

        #[command(flatten)]
        source: SourceArgs,
    },

    /// Validate a JSON knowledge base without serving it.
    Check {
        /// Knowledge-base file (defaults to `[knowledge] path`).
        #[arg(long)]
        kb: Option<PathBuf>,
    },

    /// Write the built-in rules into the configured database.
    Seed,

    /// Knowledge-base utilities.
    Kb {
        #[command(subcommand)]
        action: KbAction,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Knowledge-base subcommands.
#[derive(Subcommand)]
pub(crate) enum KbAction {
    /// Write the built-in rules as a JSON knowledge base.
    Export {
        /// Destination file.
        path: PathBuf,
    },
    /// List rules tagged with a keyword or filed under a category.
    Search {
        /// Keyword or category name (case-insensitive).
        keyword: String,

        #[command(flatten)]
        source: SourceArgs,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "soilscope=info",
        1 => "soilscope=debug",
        _ => "soilscope=trace",
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Serve { host, port, source } => cmd_serve(host, port, &source).await,
        Command::Ask { message, source } => cmd_ask(&message, &source).await,
        Command::Check { kb } => cmd_check(kb.as_deref()).await,
        Command::Seed => cmd_seed().await,
        Command::Kb { action } => match action {
            KbAction::Export { path } => cmd_kb_export(&path).await,
            KbAction::Search { keyword, source } => cmd_kb_search(&keyword, &source).await,
        },
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show().await,
        },
    }
}

/// Pick the rule source: explicit flags first, then the config file.
fn rule_source(config: &AppConfig, args: &SourceArgs) -> Result<RuleSource> {
    let kind = match (args.source, &args.kb) {
        (Some(kind), _) => kind,
        (None, Some(_)) => SourceKind::File,
        (None, None) => config.knowledge.source,
    };
    Ok(RuleSource::from_kind(kind, config, args.kb.as_deref())?)
}

/// Turn a load failure into a report that names the offending rule.
fn load_failure(source: &RuleSource, err: LoadError) -> color_eyre::Report {
    let context = match err.rule_index() {
        Some(index) => format!("knowledge base {source} rejected at rule #{index}"),
        None => format!("knowledge base {source} could not be loaded"),
    };
    color_eyre::Report::new(err).wrap_err(context)
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_serve(host: Option<String>, port: Option<u16>, args: &SourceArgs) -> Result<()> {
    let config = load_config()?;
    let source = rule_source(&config, args)?;
    let store = KnowledgeStore::open(source.clone())
        .await
        .map_err(|e| load_failure(&source, e))?;
    let store = Arc::new(store);

    let db_path = expand_home(&config.storage.database_path)?;
    let storage = Storage::open(&db_path).await?;

    let admin_token = admin_token(&config);
    if admin_token.is_none() {
        warn!(
            env = %config.admin.token_env,
            "admin token not set, admin routes will reject every request"
        );
    }

    let state = Arc::new(AppState {
        store: Arc::clone(&store),
        storage,
        admin_token,
    });
    let app = server::build_app(state);

    let host = host.unwrap_or(config.server.host);
    let port = port.unwrap_or(config.server.port);
    let listener = tokio::net::TcpListener::bind((host.as_str(), port))
        .await
        .wrap_err_with(|| format!("cannot bind {host}:{port}"))?;
    info!(%host, port, source = %store.source(), "serving SoilScope API");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    store.shutdown().await;
    Ok(())
}

async fn cmd_ask(message: &str, args: &SourceArgs) -> Result<()> {
    let config = load_config()?;
    let source = rule_source(&config, args)?;
    let store = KnowledgeStore::open(source.clone())
        .await
        .map_err(|e| load_failure(&source, e))?;

    let reply = store.resolve(message);
    info!(source = reply.source.label(), "resolved");
    println!("{}", reply.text);
    Ok(())
}

async fn cmd_check(kb: Option<&Path>) -> Result<()> {
    let config = load_config()?;
    let source = RuleSource::from_kind(SourceKind::File, &config, kb)?;
    let descriptors = source
        .fetch()
        .await
        .map_err(|e| load_failure(&source, e))?;
    let loaded = knowledge::load(&descriptors, &source.to_string())
        .map_err(|e| load_failure(&source, e))?;

    println!("{source}: {} rules OK", loaded.len());
    Ok(())
}

async fn cmd_seed() -> Result<()> {
    let config = load_config()?;
    let db_path = expand_home(&config.storage.database_path)?;
    let storage = Storage::open(&db_path).await?;
    let count = storage.replace_rules(&seed::builtin_rules()).await?;
    println!("Seeded {count} rules into {}", db_path.display());
    Ok(())
}

async fn cmd_kb_export(path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(&seed::builtin_rules())?;
    tokio::fs::write(path, json)
        .await
        .wrap_err_with(|| format!("cannot write {}", path.display()))?;
    println!("Wrote {} rules to {}", seed::builtin_rules().len(), path.display());
    Ok(())
}

async fn cmd_kb_search(keyword: &str, args: &SourceArgs) -> Result<()> {
    let config = load_config()?;
    let source = rule_source(&config, args)?;
    let store = KnowledgeStore::open(source.clone())
        .await
        .map_err(|e| load_failure(&source, e))?;

    let snapshot = store.snapshot();
    let hits = snapshot.knowledge().search(keyword);
    if hits.is_empty() {
        println!("No rules match '{keyword}'.");
        return Ok(());
    }

    for (index, rule) in hits {
        println!(
            "#{index} [{} / {}] {}",
            rule.category(),
            rule.level(),
            rule.matcher().source()
        );
    }
    Ok(())
}

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}
