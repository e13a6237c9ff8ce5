use anyhow::{Context, Result};
use clap::Parser;
use hippo::backend::{AzureDevOps, Backend, DummyBackend};
use hippo::{auth, config, tui};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "hippo")]
#[command(about = "Terminal triage for Azure DevOps work items")]
#[command(version)]
struct Args {
    /// Azure DevOps organization URL (e.g. https://dev.azure.com/contoso)
    #[arg(long)]
    org: Option<String>,

    /// Project name
    #[arg(long)]
    project: Option<String>,

    /// Team name (defaults to "<project> Team")
    #[arg(long)]
    team: Option<String>,

    /// Path to config file
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// Initialize configuration
    #[arg(long)]
    init: bool,

    /// Use built-in sample data instead of Azure DevOps
    #[arg(long, hide = true)]
    dummy: bool,
}

/// Log to a file; the terminal belongs to the UI.
fn init_logging() -> Result<()> {
    let dir = dirs::cache_dir()
        .context("could not determine the cache directory")?
        .join("hippo");
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create {}", dir.display()))?;
    let log_path = dir.join("hippo.log");
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("failed to open {}", log_path.display()))?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("hippo=info".parse()?),
        )
        .with_ansi(false)
        .with_writer(std::sync::Mutex::new(file))
        .init();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_logging()?;

    if args.init {
        config::init_wizard(args.config.as_deref())?;
        return Ok(());
    }

    if args.dummy {
        tracing::info!("Using dummy backend");
        let backend: Arc<dyn Backend> = Arc::new(DummyBackend::seeded());
        return tui::run(backend, "dummy".to_string()).await;
    }

    let flags = config::Overrides {
        organization_url: args.org,
        project: args.project,
        team: args.team,
    };
    let config = config::load(args.config.as_deref(), &flags).inspect_err(|e| {
        tracing::error!("Failed to load configuration: {:#}", e);
    })?;

    let token = auth::fetch_token()
        .await
        .context("failed to get an Azure DevOps access token (is `az login` done?)")
        .inspect_err(|e| tracing::error!("{:#}", e))?;

    let title = format!(
        "{} / {} / {}",
        config.organization_url.value, config.project.value, config.team.value
    );
    let backend: Arc<dyn Backend> = Arc::new(AzureDevOps::new(
        &config.organization_url.value,
        &config.project.value,
        &config.team.value,
        token,
    ));

    tui::run(backend, title).await
}
