use std::{net::SocketAddr, path::Path, sync::Arc, time::Duration};

use axum::{Router, extract::Request, middleware, routing::any};
use clap::Parser;
use color_eyre::{
    Result,
    eyre::{Context, eyre},
};
use inkgate::{
    adapters::{
        EdgeRouter, GitHubSource, HttpClientAdapter, request_id_middleware,
        request_timing_middleware,
    },
    config::{
        ServerConfigValidator,
        loader::{DEFAULT_CONFIG_TEMPLATE, load_config},
        models::ServerConfig,
    },
    core::GovernorRateLimiter,
    metrics,
    ports::{article_source::ArticleSource, http_client::HttpClient, rate_limit::RateLimitService},
    tracing_setup,
    utils::GracefulShutdown,
};
use tower_http::trace::TraceLayer;

#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    #[clap(subcommand)]
    command: Option<Commands>,

    #[clap(short, long, default_value = "config.toml")]
    config: String,
}

#[derive(Parser, Debug)]
enum Commands {
    /// Validate configuration file
    Validate {
        /// Configuration file to validate
        #[clap(short, long, default_value = "config.toml")]
        config: String,
    },
    /// Initialize a new configuration file
    Init {
        /// Output path for the new config file
        #[clap(short, long, default_value = "config.toml")]
        config: String,
    },
    /// Start the edge router (default)
    Serve {
        /// Configuration file to use
        #[clap(short, long, default_value = "config.toml")]
        config: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let args = Args::parse();

    match args.command {
        Some(Commands::Validate { config }) => validate_config_command(&config).await,
        Some(Commands::Init { config }) => init_config_command(&config).await,
        Some(Commands::Serve { config }) => serve(&config).await,
        None => serve(&args.config).await,
    }
}

async fn serve(config_path: &str) -> Result<()> {
    let config: ServerConfig = load_config(config_path)
        .await
        .with_context(|| format!("Failed to load config from {config_path}"))?;

    tracing_setup::init_tracing(&config.logging)
        .map_err(|e| eyre!("Failed to initialize tracing: {}", e))?;
    metrics::init_metrics().map_err(|e| eyre!("Failed to initialize metrics: {}", e))?;

    ServerConfigValidator::validate(&config).context("Invalid configuration")?;
    tracing::info!("Loaded configuration from {config_path}");

    let timeout = Duration::from_secs(config.upstream.timeout_secs);

    let source: Arc<dyn ArticleSource> = Arc::new(
        GitHubSource::new(&config.repository, timeout)
            .context("Failed to create repository source")?,
    );
    let origin_client: Arc<dyn HttpClient> = Arc::new(
        HttpClientAdapter::new(timeout).context("Failed to create origin client adapter")?,
    );
    let governor =
        GovernorRateLimiter::new(&config.rate_limit).context("Failed to create rate limiter")?;
    let limiter_cleanup = governor.spawn_cleanup();
    let rate_limiter: Arc<dyn RateLimitService> = Arc::new(governor);

    let edge_router = Arc::new(EdgeRouter::new(
        &config,
        source,
        origin_client,
        rate_limiter,
    )?);

    let make_request_route = |router: Arc<EdgeRouter>| {
        any(move |req: Request| {
            let router = router.clone();
            async move { router.handle_request(req).await }
        })
    };

    let app = Router::new()
        .route("/{*path}", make_request_route(edge_router.clone()))
        .route("/", make_request_route(edge_router))
        .layer(middleware::from_fn(request_id_middleware))
        .layer(middleware::from_fn(request_timing_middleware))
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = config
        .listen_addr
        .parse()
        .with_context(|| format!("Invalid listen address: {}", config.listen_addr))?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {addr}"))?;

    let graceful_shutdown = GracefulShutdown::new();
    let signal_listener = graceful_shutdown.clone();
    tokio::spawn(async move {
        if let Err(e) = signal_listener.run_signal_handler().await {
            tracing::error!("Signal handler error: {}", e);
        }
    });

    tracing::info!(
        origin = %config.origin.base_url,
        repository = %format!("{}/{}@{}", config.repository.owner, config.repository.repo, config.repository.branch),
        "inkgate listening on {}",
        addr
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let reason = graceful_shutdown.wait_for_shutdown_signal().await;
            tracing::info!("Shutdown signal received: {:?}", reason);
        })
        .await
        .context("Server error")?;

    limiter_cleanup.abort();
    tracing::info!("Graceful shutdown completed");
    Ok(())
}

/// Validate configuration file and exit
async fn validate_config_command(config_path: &str) -> Result<()> {
    println!("🔍 Validating configuration file: {config_path}");

    if !Path::new(config_path).exists() {
        eprintln!("❌ Error: Configuration file '{config_path}' not found");
        std::process::exit(1);
    }

    let config = match load_config(config_path).await {
        Ok(config) => {
            println!("✅ Configuration parsing: OK");
            config
        }
        Err(e) => {
            eprintln!("❌ Configuration parsing failed:");
            eprintln!("   {e}");
            std::process::exit(1);
        }
    };

    match ServerConfigValidator::validate(&config) {
        Ok(()) => {
            println!("✅ Configuration validation: OK");
            println!();
            println!("📋 Configuration Summary:");
            println!("   • Listen Address: {}", config.listen_addr);
            println!("   • Origin: {}", config.origin.base_url);
            println!(
                "   • Articles: {}/{}@{}:{}",
                config.repository.owner,
                config.repository.repo,
                config.repository.branch,
                config.repository.articles_path
            );
            println!(
                "   • Token Configured: {}",
                config.repository.token.is_some()
            );
            println!(
                "   • Rate Limit: {} per {}",
                config.rate_limit.requests, config.rate_limit.period
            );
            println!();
            println!("🎉 Configuration is valid and ready to use!");
            Ok(())
        }
        Err(e) => {
            eprintln!("❌ Configuration validation failed:");
            eprintln!("{e}");
            println!();
            println!("💡 Common fixes:");
            println!("   • Ensure the origin URL starts with http:// or https:// without a trailing '/'");
            println!("   • Fill in repository owner and repo");
            println!("   • Verify listen address format (e.g., '127.0.0.1:3000')");
            println!("   • Ensure rate limit periods use valid units (s, m, h)");
            std::process::exit(1);
        }
    }
}

/// Initialize a new configuration file
async fn init_config_command(config_path: &str) -> Result<()> {
    let path = Path::new(config_path);
    if path.exists() {
        eprintln!("❌ Error: Configuration file '{config_path}' already exists");
        std::process::exit(1);
    }

    tokio::fs::write(path, DEFAULT_CONFIG_TEMPLATE)
        .await
        .context("Failed to write config file")?;
    println!("✅ Created default configuration at: {config_path}");
    println!("   Run 'inkgate serve --config {config_path}' to start the server");
    Ok(())
}
