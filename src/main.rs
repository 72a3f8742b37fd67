use anyhow::{Context as _, Result};
use broxy_config::{Config, LogConfig, LogFormat};
use broxy_proxy::BrokerProxy;
use clap::{Parser, Subcommand};
use std::{net::SocketAddr, path::PathBuf, sync::Arc};

#[derive(Parser, Debug)]
#[command(name = "broxy", about = "broxy: credential-injecting reverse proxy for service brokers")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Check the broker, then start the proxy server.
    Serve {
        /// Path to the YAML configuration file.
        #[arg(short, long, value_name = "FILE")]
        config: Option<PathBuf>,
        /// Override the listening port (default: 8080).
        #[arg(short, long)]
        port: Option<u16>,
        /// Override the listening address (default: 127.0.0.1).
        #[arg(long)]
        host: Option<String>,
        /// Override the broker base URL.
        #[arg(long, value_name = "URL")]
        backend_url: Option<String>,
    },
    /// Only run the broker startup check and report the result.
    Check {
        /// Path to the YAML configuration file.
        #[arg(short, long, value_name = "FILE")]
        config: Option<PathBuf>,
        /// Override the broker base URL.
        #[arg(long, value_name = "URL")]
        backend_url: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            config,
            port,
            host,
            backend_url,
        } => {
            let mut config = load_config(config, backend_url)?;
            if let Some(p) = port {
                config.port = p;
            }
            if let Some(h) = host {
                config.host = h;
            }
            cmd_serve(config).await
        }
        Commands::Check {
            config,
            backend_url,
        } => cmd_check(load_config(config, backend_url)?).await,
    }
}

async fn cmd_serve(config: Config) -> Result<()> {
    let proxy = Arc::new(build_proxy(&config)?);

    // The listener is only bound once the broker has accepted our credentials.
    proxy
        .perform_startup_check()
        .await
        .inspect_err(|e| tracing::error!(error = %e, "broker startup check failed"))
        .context("startup check failed")?;

    let addr = config.listen_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!(addr = %addr, backend = %proxy.backend(), "broxy listening");

    let app = proxy.router();
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;
    tracing::info!("broxy stopped");
    Ok(())
}

async fn cmd_check(config: Config) -> Result<()> {
    let proxy = build_proxy(&config)?;
    proxy
        .perform_startup_check()
        .await
        .context("startup check failed")?;
    println!("{}: ok", proxy.backend());
    Ok(())
}

fn load_config(path: Option<PathBuf>, backend_url: Option<String>) -> Result<Config> {
    if let Some(path) = &path {
        anyhow::ensure!(path.exists(), "config file {} not found", path.display());
    }
    let mut config =
        Config::load(path.as_deref()).map_err(|e| anyhow::anyhow!("config error: {e}"))?;
    if let Some(url) = backend_url {
        config.backend_url = Some(url);
    }
    init_tracing(&config.log);
    config.validate()?;
    Ok(config)
}

fn build_proxy(config: &Config) -> Result<BrokerProxy> {
    let backend = config.backend_endpoint()?;
    let transport =
        broxy_proxy::build_http_client(config.proxy_url.as_deref(), config.timeout())?;
    let token_source = config
        .token_source
        .as_ref()
        .context("token_source is not configured")?;
    let tokens = broxy_auth::build_token_source(token_source, reqwest::Client::new());
    Ok(BrokerProxy::new(backend, tokens, Arc::new(transport)))
}

/// Initializes structured logging.
///
/// `RUST_LOG` wins over the configured level.
fn init_tracing(log: &LogConfig) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log.level));

    match log.format {
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .init();
        }
        LogFormat::Pretty => {
            fmt().with_env_filter(filter).with_target(false).init();
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "failed to listen for ctrl-c");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    tracing::info!("shutdown signal received");
}
