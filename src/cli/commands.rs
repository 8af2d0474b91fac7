use crate::error::ErrorKind;
use crate::forwarder::{Forwarder, ForwarderConfig};
use crate::router::Router;
use crate::runtime_config::{normalize_upstream_url, RuntimeConfig};
use crate::server::{build_app, AppService, AppState, HttpServer};
use crate::spec::{load_spec, Specification};
use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info};

/// Command line arguments for the `oasgate` binary.
#[derive(Parser, Debug)]
#[command(name = "oasgate", version)]
#[command(about = "API gateway enforcing an OpenAPI contract", long_about = None)]
pub struct Cli {
    /// The subcommand to execute (default: serve)
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Run the gateway
    Serve {
        /// OpenAPI specification (overrides OPENAPI_SPEC_PATH)
        #[arg(short, long)]
        spec: Option<PathBuf>,

        /// Upstream base URL (overrides UPSTREAM_SERVER_URL)
        #[arg(short, long)]
        upstream: Option<String>,

        /// Listen address (overrides GATEWAY_BIND_ADDR)
        #[arg(long)]
        addr: Option<String>,
    },
    /// Load and structurally validate a specification, then exit
    Validate {
        /// OpenAPI specification (default: OPENAPI_SPEC_PATH)
        #[arg(short, long)]
        spec: Option<PathBuf>,
    },
    /// Print the dispatch entries a specification registers, in match order
    Routes {
        /// OpenAPI specification (default: OPENAPI_SPEC_PATH)
        #[arg(short, long)]
        spec: Option<PathBuf>,
    },
}

/// Execute the parsed command line.
///
/// # Errors
///
/// Configuration errors, specification load failures and listener failures.
pub async fn run_cli(cli: Cli) -> anyhow::Result<()> {
    let mut config = RuntimeConfig::from_env().context("Invalid configuration")?;

    match cli.command.unwrap_or(Commands::Serve {
        spec: None,
        upstream: None,
        addr: None,
    }) {
        Commands::Serve {
            spec,
            upstream,
            addr,
        } => {
            if let Some(spec) = spec {
                config.spec_path = spec;
            }
            if let Some(upstream) = upstream {
                config.upstream_url = normalize_upstream_url("--upstream", &upstream)?;
            }
            if let Some(addr) = addr {
                config.bind_addr = addr;
            }
            serve(config).await
        }
        Commands::Validate { spec } => {
            let path = spec.unwrap_or(config.spec_path);
            let spec = load_for_cli(&path)?;
            println!(
                "✅ {} is valid: {} {} (OpenAPI {}), {} path(s), {} operation(s)",
                path.display(),
                spec.title,
                spec.version,
                spec.openapi,
                spec.paths.len(),
                spec.operation_count()
            );
            Ok(())
        }
        Commands::Routes { spec } => {
            let path = spec.unwrap_or(config.spec_path);
            let spec = load_for_cli(&path)?;
            let router = Router::from_spec(&spec);
            println!("[routes] count={}", router.len());
            for route in router.routes() {
                println!(
                    "[route] {} {} -> {}",
                    route.method,
                    route.path_pattern,
                    route.operation_id.as_deref().unwrap_or("-")
                );
            }
            Ok(())
        }
    }
}

fn load_for_cli(path: &Path) -> anyhow::Result<Arc<Specification>> {
    match load_spec(path) {
        Ok(spec) => Ok(spec),
        Err(e) => {
            eprintln!("\n❌ {e}\n");
            bail!("{}: {}", ErrorKind::SpecLoadFailure, path.display())
        }
    }
}

/// Start the listener, load the specification and install the gateway.
///
/// `/health` answers as soon as the listener is bound; `/ready` turns 200 once
/// the gateway is installed. A specification that fails to load stops the
/// server and is returned as the error.
///
/// # Errors
///
/// Client construction, bind, specification load and serve failures.
pub async fn serve(config: RuntimeConfig) -> anyhow::Result<()> {
    info!(
        spec = %config.spec_path.display(),
        upstream = %config.upstream_url,
        addr = %config.bind_addr,
        timeout_secs = config.upstream_timeout.as_secs(),
        max_body_bytes = config.max_body_bytes,
        "Starting gateway"
    );

    let forwarder = Forwarder::new(
        &ForwarderConfig::new(config.upstream_url.as_str()).with_timeout(config.upstream_timeout),
    )
    .context("Failed to build upstream HTTP client")?;

    let state = AppState::new();
    let app = build_app(state.clone(), config.max_body_bytes);
    let server = HttpServer(app)
        .start(&config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_addr))?;

    let spec_path = config.spec_path.clone();
    let loaded = tokio::task::spawn_blocking(move || load_spec(spec_path))
        .await
        .context("Specification loader task failed")?;

    let spec = match loaded {
        Ok(spec) => spec,
        Err(e) => {
            error!(
                kind = %ErrorKind::SpecLoadFailure,
                error = %e,
                "Failed to load OpenAPI specification"
            );
            server.abort();
            return Err(anyhow::Error::new(e).context(ErrorKind::SpecLoadFailure));
        }
    };

    if state
        .install(AppService::new(spec, Arc::new(forwarder)))
        .is_err()
    {
        bail!("gateway was already installed");
    }

    server.join().await.context("HTTP server failed")
}
