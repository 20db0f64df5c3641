use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mirror_relay::config::RelayConfig;
use mirror_relay::git::LocalGit;
use mirror_relay::github::OctocrabClient;
use mirror_relay::gitlab::{GitLabClient, http_client};
use mirror_relay::server::{AppState, build_router};
use mirror_relay::worker::Dispatcher;

/// Mirrors GitHub repositories to GitLab and relays GitLab CI status back.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// Path to the YAML configuration file.
    config: PathBuf,

    /// Address to listen on; overrides the configuration file and
    /// MIRROR_RELAY_LISTEN.
    #[arg(long)]
    listen: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mirror_relay=debug,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let config = RelayConfig::load(&cli.config)
        .and_then(RelayConfig::with_env_overrides)
        .and_then(|c| c.with_listen_override(cli.listen.as_deref()))
        .with_context(|| format!("loading {}", cli.config.display()))?;
    let sessions = config.sessions()?;
    let settings = config.worker_settings();

    let shutdown = CancellationToken::new();
    let dispatcher = Arc::new(Dispatcher::new(shutdown.clone()));
    let http = http_client();

    for session in sessions {
        let upstream = session.upstream();
        let github = OctocrabClient::from_token(
            &upstream.token,
            upstream.repo.clone(),
            upstream.api_url.as_deref(),
        )
        .with_context(|| format!("building GitHub client for {}", session.name()))?;

        let downstream = session.downstream();
        let gitlab = GitLabClient::new(
            http.clone(),
            downstream.api_url.clone(),
            downstream.project.clone(),
            downstream.token.clone(),
        );

        let git = LocalGit::new(session.mirror_path());

        tracing::info!(
            repo = %session.name(),
            upstream = %upstream.repo,
            downstream = %format!("{}/{}", downstream.host, downstream.project),
            "Starting repository workers"
        );
        dispatcher
            .spawn_repo(session.clone(), git, github, gitlab, settings)
            .await;
    }

    let app = build_router(AppState::new(dispatcher.clone()));

    let listener = tokio::net::TcpListener::bind(config.listen)
        .await
        .with_context(|| format!("binding {}", config.listen))?;
    tracing::info!("listening on {}", config.listen);

    let signal = shutdown.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            return;
        }
        tracing::info!("Ctrl-C received, shutting down");
        signal.cancel();
    });

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown.clone().cancelled_owned())
        .await
        .context("serving webhooks")?;

    dispatcher.shutdown().await;
    Ok(())
}
