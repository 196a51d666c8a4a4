use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use futures::future::join_all;
use serde_json::{Value, json};

use update_resolver::cache::{KeyValueStore, MemoryStore, SqliteStore};
use update_resolver::component::ComponentConfig;
use update_resolver::config::{self, AppConfig, CacheBackend};
use update_resolver::engine::{
    NoDecision, RecheckRequest, Resolution, SharedSecretGuard, UpdateResolutionEngine,
};
use update_resolver::fetch::HttpFetcher;
use update_resolver::fetch::json::site_host;
use update_resolver::logging;
use update_resolver::policy::ConfigPolicy;
use update_resolver::source::{SourceMode, decide_mode};

#[derive(Parser)]
#[command(name = "update-resolver")]
#[command(version, about = "Resolve plugin and theme updates from JSON endpoints or GitHub Releases")]
struct Cli {
    /// Configuration file (JSON)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Also log to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Resolve every tracked component, or only the named ones
    Check { slugs: Vec<String> },
    /// Clear the cached state of a component, then resolve it again
    Recheck {
        slug: String,
        #[arg(long)]
        nonce: Option<String>,
    },
    /// Show cached details of a component
    Info { slug: String },
    /// Show which fetch strategy a source URL selects
    Mode {
        url: String,
        #[arg(long, default_value = "auto")]
        mode: String,
    },
}

type Engine = UpdateResolutionEngine<Box<dyn KeyValueStore>>;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let _guard = logging::init(&config::log_dir(), cli.verbose)?;

    let app_config = match &cli.config {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::default(),
    };

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(run(cli.command, app_config))
}

async fn run(command: Command, app_config: AppConfig) -> anyhow::Result<()> {
    let output = match command {
        Command::Check { slugs } => {
            let engine = &build_engine(&app_config)?;
            let components: Vec<&ComponentConfig> = if slugs.is_empty() {
                app_config.components.iter().collect()
            } else {
                slugs
                    .iter()
                    .map(|slug| find_component(&app_config, slug))
                    .collect::<anyhow::Result<_>>()?
            };

            let results = join_all(components.into_iter().map(|component| async move {
                let resolution = engine.resolve(component).await;
                report(component, resolution)
            }))
            .await;
            Value::Array(results)
        }
        Command::Recheck { slug, nonce } => {
            let engine = build_engine(&app_config)?;
            let component = find_component(&app_config, &slug)?;
            let guard = SharedSecretGuard::new(app_config.recheck_secret.clone());
            let mut request = RecheckRequest::new(&slug);
            request.nonce = nonce;

            engine.manual_recheck(component, &request, &guard)?;
            report(component, engine.resolve(component).await)
        }
        Command::Info { slug } => {
            let engine = build_engine(&app_config)?;
            let component = find_component(&app_config, &slug)?;
            serde_json::to_value(engine.details(component))?
        }
        Command::Mode { url, mode } => {
            json!({ "url": url, "mode": decide_mode(&url, SourceMode::parse_lenient(&mode)) })
        }
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn build_engine(app_config: &AppConfig) -> anyhow::Result<Engine> {
    let store: Box<dyn KeyValueStore> = match app_config.cache.backend {
        CacheBackend::Memory => Box::new(MemoryStore::default()),
        CacheBackend::Sqlite => {
            let db_path = app_config.cache.path.clone().unwrap_or_else(config::db_path);
            if let Some(parent) = db_path.parent() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
            let store = SqliteStore::new(&db_path)?;
            store.purge_expired()?;
            Box::new(store)
        }
    };

    Ok(UpdateResolutionEngine::new(store, Arc::new(HttpFetcher::new()?))
        .with_policy(Arc::new(ConfigPolicy::from_config(app_config)))
        .with_github_api_base(&app_config.github_api_base)
        .with_site_host(&site_host(&app_config.site.host))
        .with_ttls(app_config.cache.success_ttl, app_config.cache.error_ttl))
}

fn find_component<'a>(app_config: &'a AppConfig, slug: &str) -> anyhow::Result<&'a ComponentConfig> {
    app_config
        .component(slug)
        .with_context(|| format!("No tracked component with slug {slug:?}"))
}

fn report(component: &ComponentConfig, resolution: Resolution) -> Value {
    match resolution {
        Resolution::Decided(decision) => json!({ "slug": component.slug, "result": decision }),
        Resolution::NoDecision(NoDecision::CachedFailure) => json!({
            "slug": component.slug,
            "result": null,
            "reason": "previous failure cached"
        }),
        Resolution::NoDecision(NoDecision::FetchFailed(e)) => json!({
            "slug": component.slug,
            "result": null,
            "reason": e.to_string()
        }),
    }
}
