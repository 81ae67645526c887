use std::{sync::Arc, time::Instant};

use actix_web::{dev::Service, middleware::Logger, web, App, HttpServer};
use anyhow::Context;
use clap::{Parser, Subcommand};
use common::{
    db::{establish_connection, PgStore},
    memory::MemoryStore,
    store::ProgressStore,
};
use progress::ProgressService;
use tracing::info;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

mod auth;
mod config;
mod handlers;
mod metrics;
mod security;

use auth::{
    middleware::{GateRoutes, SessionGate},
    SessionKeys,
};
use config::Config;
use handlers::AppState;
use security::{configure_cors, RateLimiter};

#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
struct Cli {
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP service
    Serve {
        /// Use the seeded in-memory store instead of Postgres
        #[clap(long)]
        memory: bool,
    },

    /// Mint a session token for local development
    IssueToken {
        #[clap(long)]
        user: Uuid,
        #[clap(long)]
        email: Option<String>,
        #[clap(long, default_value_t = 86400)]
        ttl: u64,
    },
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::from_env()?;
    let keys = SessionKeys::new(
        config.session_secret.clone(),
        config.session_audience.clone(),
    );

    match cli.command {
        Commands::Serve { memory } => serve(config, keys, memory).await,
        Commands::IssueToken { user, email, ttl } => {
            println!("{}", keys.create_token(user, email, ttl)?);
            Ok(())
        }
    }
}

async fn serve(config: Config, keys: SessionKeys, memory: bool) -> anyhow::Result<()> {
    let store: Arc<dyn ProgressStore> = if memory {
        info!("Using the in-memory store");
        Arc::new(MemoryStore::seeded())
    } else {
        let database_url = config
            .database_url
            .as_deref()
            .context("DATABASE_URL must be set unless --memory is given")?;
        Arc::new(PgStore::new(establish_connection(database_url).await?))
    };

    let app_state = web::Data::new(AppState {
        service: ProgressService::new(store),
        auth_provider_url: config.auth_provider_url.clone(),
    });

    let rate_limiter = RateLimiter::new(config.rate_limit);
    let address = config.server_address();
    info!("Starting HTTP server on {}", address);
    HttpServer::new(move || {
        App::new()
            .app_data(app_state.clone())
            .wrap(SessionGate::new(keys.clone(), GateRoutes::default()))
            .wrap_fn(|req, srv| {
                let start = Instant::now();
                let endpoint = req
                    .match_pattern()
                    .unwrap_or_else(|| req.path().to_string());
                let method = req.method().to_string();
                let fut = srv.call(req);
                async move {
                    let res = fut.await?;
                    metrics::record_http_request(
                        &endpoint,
                        &method,
                        res.status().as_u16(),
                        start.elapsed().as_secs_f64(),
                    );
                    Ok(res)
                }
            })
            .wrap(rate_limiter.clone())
            .wrap(configure_cors(&config.allowed_origins))
            .wrap(Logger::default())
            .configure(handlers::configure)
    })
    .bind(&address)?
    .run()
    .await?;

    Ok(())
}
